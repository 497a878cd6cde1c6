//! CSV export of scenario records and run summaries.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::report::{RunSummary, ScenarioRecord};

/// Column header of the record table.
pub const RECORD_HEADER: &str = "house_type,floor_area_sqm,occupants,floor_heating,insulation,\
                                 roof_area_sqm,climate_control,wallbox,scenario,pv_kwp,battery_kwh,\
                                 grid_import,feed_in,autarky_pct,pv_generation,co2_today,co2_after,\
                                 co2_saving,break_even_years,annual_cost_post,total_cost,\
                                 household_block,climate_block,ev_block,heatpump_block,\
                                 heating_demand,ev_from_batt,issues,warnings,rules,status";

/// Column header of the issue overview.
pub const OVERVIEW_HEADER: &str = "kind,message,count";

/// Separator between messages inside one cell.
pub const MESSAGE_DELIMITER: &str = "; ";

/// Exports records to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_records_csv(records: &[ScenarioRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_records_csv(records, buf)
}

/// Writes records as CSV to any writer, one row per record.
///
/// A missing break-even is written as an empty cell; messages of one row
/// are joined with `"; "`.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_records_csv(records: &[ScenarioRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(RECORD_HEADER.split(',').map(str::trim))?;

    for r in records {
        let rules: Vec<&str> = r.rules.iter().map(|rule| rule.code()).collect();
        wtr.write_record(&[
            r.house_type.to_string(),
            r.floor_area_sqm.to_string(),
            r.occupants.to_string(),
            r.floor_heating.to_string(),
            r.insulation.to_string(),
            r.roof_area_sqm.to_string(),
            r.climate_control.to_string(),
            r.wallbox.to_string(),
            r.scenario.label().to_string(),
            r.pv_kwp.to_string(),
            r.battery_kwh.to_string(),
            r.grid_import.to_string(),
            r.feed_in.to_string(),
            r.autarky_pct.to_string(),
            r.pv_generation.to_string(),
            r.co2_today.to_string(),
            r.co2_after.to_string(),
            r.co2_saving.to_string(),
            r.break_even_years.map(|y| y.to_string()).unwrap_or_default(),
            r.annual_cost_post.to_string(),
            r.total_cost.to_string(),
            r.household_block.to_string(),
            r.climate_block.to_string(),
            r.ev_block.to_string(),
            r.heatpump_block.to_string(),
            r.heating_demand.to_string(),
            r.ev_from_batt.to_string(),
            r.issues.join(MESSAGE_DELIMITER),
            r.warnings.join(MESSAGE_DELIMITER),
            rules.join(";"),
            r.status.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports the issue and warning overview to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_issue_overview_csv(summary: &RunSummary, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_issue_overview_csv(summary, io::BufWriter::new(file))
}

/// Writes message counts, issues before warnings, most frequent first.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_issue_overview_csv(summary: &RunSummary, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(OVERVIEW_HEADER.split(','))?;

    for (kind, counts) in [("issue", &summary.issue_counts), ("warning", &summary.warning_counts)] {
        let mut rows: Vec<(&String, &usize)> = counts.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (message, count) in rows {
            wtr.write_record([kind, message.as_str(), count.to_string().as_str()])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
