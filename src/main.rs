//! Retrofit matrix runner: CLI wiring, config loading, and report output.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use retrofit_sim::building::HouseType;
use retrofit_sim::config::MarketConfig;
use retrofit_sim::io::export::{export_issue_overview_csv, export_records_csv};
use retrofit_sim::market::{DEFAULT_TOLERANCE, FileQuoteProvider, refresh_prices};
use retrofit_sim::report::{RecordFilter, rank_by_break_even};
use retrofit_sim::runner::run_full_matrix;
use retrofit_sim::sim::scenario::Scenario;
use retrofit_sim::sim::validation::Status;

#[derive(Parser)]
#[command(name = "retrofit-sim")]
#[command(version, about = "Sizes PV, battery, and heat-pump retrofits over a building matrix")]
#[command(
    long_about = "Evaluates 972 building configurations under three retrofit scenarios,\n\
    validates every result against plausibility rules, and prints a run summary.\n\
    \nExamples:\n  \
    retrofit-sim\n  \
    retrofit-sim --market data/market.toml --out results.csv --issues-out issues.csv\n  \
    retrofit-sim --price-quotes quotes.json --write-market data/market.toml\n  \
    retrofit-sim --top 10 --scenario pv_battery --status ok"
)]
struct Cli {
    /// Market configuration (TOML); built-in baseline when omitted
    #[arg(long, value_name = "PATH")]
    market: Option<PathBuf>,

    /// Price quotes to merge into the market configuration (JSON, prose allowed)
    #[arg(long, value_name = "PATH")]
    price_quotes: Option<PathBuf>,

    /// Relative deviation above which a quote replaces a configured price
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    price_tolerance: f64,

    /// Save the effective market configuration to this path
    #[arg(long, value_name = "PATH")]
    write_market: Option<PathBuf>,

    /// Export all scenario records to CSV
    #[arg(long, value_name = "CSV")]
    out: Option<PathBuf>,

    /// Export issue and warning counts to CSV
    #[arg(long, value_name = "CSV")]
    issues_out: Option<PathBuf>,

    /// Print the N records with the shortest break-even
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Restrict the ranking to one house type
    #[arg(long)]
    house_type: Option<HouseType>,

    /// Restrict the ranking to one scenario
    #[arg(long)]
    scenario: Option<Scenario>,

    /// Restrict the ranking to one status (ok, warning, error)
    #[arg(long)]
    status: Option<Status>,

    /// Start the REST API after the run
    #[cfg(feature = "api")]
    #[arg(long)]
    serve: bool,

    /// API server port
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("retrofit_sim=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let mut market = match cli.market {
        Some(ref path) => match MarketConfig::from_toml_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => MarketConfig::baseline(),
    };

    if let Some(ref path) = cli.price_quotes {
        let provider = FileQuoteProvider::new(path);
        match refresh_prices(&provider, &mut market, cli.price_tolerance) {
            Ok(updates) => info!(updates = updates.len(), "price quotes applied"),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }

    let errors = market.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    if let Some(ref path) = cli.write_market {
        if let Err(e) = market.save_toml_file(path) {
            eprintln!("error: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), "market configuration written");
    }

    let run = run_full_matrix(&market);
    let summary = run.summary();
    println!("{summary}");

    if let Some(n) = cli.top {
        let filter = RecordFilter {
            house_type: cli.house_type,
            scenario: cli.scenario,
            status: cli.status,
            ..RecordFilter::default()
        };
        println!("--- Shortest break-even ---");
        for r in rank_by_break_even(&run.records, &filter, n) {
            println!(
                "{:>5.1} a  {:<26} {} {} m², {} p, {}, roof {} m², wallbox={}  [{}]",
                r.break_even_years.unwrap_or(f64::NAN),
                r.scenario.label(),
                r.house_type,
                r.floor_area_sqm,
                r.occupants,
                r.insulation,
                r.roof_area_sqm,
                r.wallbox,
                r.status
            );
        }
    }

    if let Some(ref path) = cli.out {
        if let Err(e) = export_records_csv(&run.records, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), rows = run.records.len(), "records written");
    }

    if let Some(ref path) = cli.issues_out {
        if let Err(e) = export_issue_overview_csv(&summary, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), "issue overview written");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(retrofit_sim::api::AppState {
            market,
            summary,
            records: run.records,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(retrofit_sim::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
