//! Conversion of model scores into a canonical percentage scale.
//!
//! Remote models report scores either as fractions (`0.0..=1.0`) or as
//! percentages (`0.0..=100.0`), and label casing is not stable. Every
//! consumer of a [`ClassificationResult`](crate::ClassificationResult)
//! goes through this module instead of guessing units on its own.
//!
//! The unit heuristic is lossy at `1.0`: a value of exactly `1.0` is read
//! as a fraction (100%), never as "1%".

use std::collections::HashMap;

/// Convert a single score to a percentage in `[0, 100]`.
///
/// Values `> 1` are taken to be percentages already; values `<= 1` are
/// fractions and get scaled by 100. Out-of-range values are clamped and
/// NaN maps to zero.
pub fn to_percentage(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }

    let percent = if value > 1.0 { value } else { value * 100.0 };
    percent.clamp(0.0, 100.0)
}

/// Normalize a label → score mapping.
///
/// Keys are lowercased and values converted with [`to_percentage`]. When
/// two labels differ only by case, the larger percentage is kept.
pub fn normalize(raw: &HashMap<String, f64>) -> HashMap<String, f64> {
    let mut normalized: HashMap<String, f64> = HashMap::with_capacity(raw.len());

    for (label, score) in raw {
        let percent = to_percentage(*score);
        normalized
            .entry(label.to_lowercase())
            .and_modify(|existing| *existing = existing.max(percent))
            .or_insert(percent);
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(label: &str, score: f64) -> HashMap<String, f64> {
        HashMap::from([(label.to_string(), score)])
    }

    #[test]
    fn test_fractions_are_scaled() {
        for x in [0.0, 0.01, 0.25, 0.5, 0.92, 0.999, 1.0] {
            let out = normalize(&single("a", x));
            assert!((out["a"] - x * 100.0).abs() < 1e-9, "x = {x}");
        }
    }

    #[test]
    fn test_percentages_pass_through() {
        for x in [1.0001, 1.5, 5.0, 42.0, 92.0, 100.0] {
            let out = normalize(&single("a", x));
            assert!((out["a"] - x).abs() < 1e-9, "x = {x}");
        }
    }

    #[test]
    fn test_boundary_one_is_a_fraction() {
        assert_eq!(to_percentage(1.0), 100.0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        assert_eq!(to_percentage(-0.2), 0.0);
        assert_eq!(to_percentage(250.0), 100.0);
        assert_eq!(to_percentage(f64::NAN), 0.0);
    }

    #[test]
    fn test_keys_are_lowercased() {
        let raw = HashMap::from([
            ("Plastic".to_string(), 0.92),
            ("GLASS".to_string(), 0.05),
        ]);

        let out = normalize(&raw);

        assert_eq!(out.len(), 2);
        assert!((out["plastic"] - 92.0).abs() < 1e-9);
        assert!((out["glass"] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_case_collision_keeps_larger_value() {
        let raw = HashMap::from([
            ("Metal".to_string(), 0.10),
            ("metal".to_string(), 0.30),
        ]);

        let out = normalize(&raw);

        assert_eq!(out.len(), 1);
        assert!((out["metal"] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_yields_empty_mapping() {
        assert!(normalize(&HashMap::new()).is_empty());
    }
}
