//! Enumeration of the building configurations under test.

use crate::building::{BuildingInput, HouseType, Insulation};

/// Floor areas evaluated (m²).
pub const FLOOR_AREAS_SQM: [f64; 3] = [100.0, 150.0, 200.0];
/// Occupant counts evaluated.
pub const OCCUPANTS: [u32; 3] = [1, 3, 5];
/// Roof areas evaluated (m²).
pub const ROOF_AREAS_SQM: [f64; 3] = [30.0, 50.0, 80.0];
const FLAGS: [bool; 2] = [false, true];

/// Number of combinations produced by [`build_input_matrix`].
pub const MATRIX_SIZE: usize = 972;

/// Returns the Cartesian product of all building attributes.
///
/// Ordering is stable: house type varies slowest, then floor area,
/// occupants, floor heating, insulation, roof area, climate control, and
/// wallbox fastest.
pub fn build_input_matrix() -> Vec<BuildingInput> {
    let mut matrix = Vec::with_capacity(MATRIX_SIZE);
    for house_type in HouseType::ALL {
        for floor_area_sqm in FLOOR_AREAS_SQM {
            for occupants in OCCUPANTS {
                for has_floor_heating in FLAGS {
                    for insulation in Insulation::ALL {
                        for roof_area_sqm in ROOF_AREAS_SQM {
                            for has_climate_control in FLAGS {
                                for has_wallbox in FLAGS {
                                    matrix.push(BuildingInput {
                                        house_type,
                                        floor_area_sqm,
                                        occupants,
                                        has_floor_heating,
                                        insulation,
                                        roof_area_sqm,
                                        has_climate_control,
                                        has_wallbox,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_has_all_combinations() {
        let matrix = build_input_matrix();
        assert_eq!(matrix.len(), MATRIX_SIZE);
    }

    #[test]
    fn matrix_order_is_stable() {
        let matrix = build_input_matrix();
        let first = matrix[0];
        assert_eq!(first.house_type, HouseType::Rowhouse);
        assert_eq!(first.floor_area_sqm, 100.0);
        assert!(!first.has_wallbox);
        assert!(matrix[1].has_wallbox);
        assert!(matrix[2].has_climate_control);
        assert_eq!(matrix[MATRIX_SIZE - 1].house_type, HouseType::Detached);
        assert_eq!(matrix, build_input_matrix());
    }

    #[test]
    fn matrix_has_no_duplicates() {
        let matrix = build_input_matrix();
        for (i, a) in matrix.iter().enumerate() {
            assert!(
                matrix[i + 1..].iter().all(|b| b != a),
                "duplicate combination at {i}: {a}"
            );
        }
    }
}
