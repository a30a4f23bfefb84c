//! Downloadable classification report.
//!
//! The report is a pure function of a [`ClassificationResult`], the
//! material knowledge base and the generation time. All scores are routed
//! through the normalizer, so the document always shows percentages.

use crate::config::ReportConfig;
use crate::inference::ClassificationResult;
use crate::materials;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while rendering a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Output document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    /// Conventional file extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// Recyclability section of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecyclabilityStatus {
    pub recyclable: bool,
    /// "Recyclable Material" or "Not Recyclable Material"
    pub status: String,
    pub details: String,
    pub tip: String,
}

/// One row of the per-material breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialShare {
    pub material: String,
    pub percent: f64,
}

/// Finalized classification report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub category: String,
    /// Confidence as a percentage
    pub confidence_percent: f64,
    pub recyclability: RecyclabilityStatus,
    /// Normalized probabilities, highest first
    pub breakdown: Vec<MaterialShare>,
}

/// Build a report for a classification result
pub fn generate(
    result: &ClassificationResult,
    config: &ReportConfig,
    generated_at: DateTime<Utc>,
) -> ClassificationReport {
    let info = materials::lookup(&result.category);

    let status = if info.is_recyclable {
        "Recyclable Material"
    } else {
        "Not Recyclable Material"
    };

    let mut breakdown: Vec<MaterialShare> = result
        .normalized_probabilities()
        .into_iter()
        .map(|(material, percent)| MaterialShare {
            material: capitalize(&material),
            percent,
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.percent
            .partial_cmp(&a.percent)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.material.cmp(&b.material))
    });

    ClassificationReport {
        title: config.title.clone(),
        generated_at,
        category: result.category.clone(),
        confidence_percent: result.confidence_percent(),
        recyclability: RecyclabilityStatus {
            recyclable: info.is_recyclable,
            status: status.to_string(),
            details: info.message.to_string(),
            tip: info.tips.to_string(),
        },
        breakdown,
    }
}

impl ClassificationReport {
    /// Render in the requested format
    pub fn render(&self, format: ReportFormat) -> Result<String, ReportError> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    /// Plain-text document
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(
            f,
            "Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f)?;

        writeln!(f, "Classification Results")?;
        writeln!(f, "  Category: {}", self.category)?;
        writeln!(f, "  Confidence: {:.2}%", self.confidence_percent)?;
        writeln!(f)?;

        writeln!(f, "Recyclability Status")?;
        writeln!(f, "  Status: {}", self.recyclability.status)?;
        writeln!(f, "  Details: {}", self.recyclability.details)?;
        writeln!(f, "  Tip: {}", self.recyclability.tip)?;
        writeln!(f)?;

        writeln!(f, "Detailed Analysis")?;
        if self.breakdown.is_empty() {
            writeln!(f, "  No per-material scores available")?;
        }
        for share in &self.breakdown {
            writeln!(f, "  {}: {:.2}%", share.material, share.percent)?;
        }

        Ok(())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    }

    fn result(category: &str, confidence: f64, probs: &[(&str, f64)]) -> ClassificationResult {
        ClassificationResult {
            category: category.to_string(),
            confidence,
            probabilities: probs
                .iter()
                .map(|(label, score)| (label.to_string(), *score))
                .collect::<HashMap<_, _>>(),
        }
    }

    /// Pull a `Key: value` field out of a rendered text report
    fn field<'a>(doc: &'a str, key: &str) -> &'a str {
        doc.lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix(key)?.strip_prefix(": "))
            .unwrap_or_else(|| panic!("missing field {key}"))
    }

    #[test]
    fn test_generate_recyclable_material() {
        let report = generate(
            &result("plastic", 0.92, &[("plastic", 0.92), ("glass", 0.05)]),
            &ReportConfig::default(),
            generated_at(),
        );

        assert_eq!(report.title, "Waste Classification Report");
        assert_eq!(report.category, "plastic");
        assert!((report.confidence_percent - 92.0).abs() < 1e-9);
        assert!(report.recyclability.recyclable);
        assert_eq!(report.recyclability.status, "Recyclable Material");
        assert_eq!(report.recyclability.details, "Most plastics are recyclable");
        assert_eq!(report.breakdown[0].material, "Plastic");
        assert_eq!(report.breakdown[1].material, "Glass");
    }

    #[test]
    fn test_generate_unknown_category_uses_default_guidance() {
        let report = generate(
            &ClassificationResult::unknown(),
            &ReportConfig::default(),
            generated_at(),
        );

        assert!(!report.recyclability.recyclable);
        assert_eq!(report.recyclability.status, "Not Recyclable Material");
        assert_eq!(report.recyclability.tip, "Please consult your local recycling guidelines");
        assert_eq!(report.confidence_percent, 0.0);
        assert!(report.breakdown.is_empty());
        assert!(report.to_text().contains("No per-material scores available"));
    }

    #[test]
    fn test_text_round_trip_of_category_and_confidence() {
        let cases = [
            result("plastic", 0.92, &[("plastic", 0.92)]),
            result("Glass", 87.456, &[("Glass", 87.456)]),
            result("metal", 1.0, &[]),
            result("cardboard", 0.123456, &[]),
        ];

        for input in cases {
            let doc = generate(&input, &ReportConfig::default(), generated_at()).to_text();

            assert_eq!(field(&doc, "Category"), input.category);
            let confidence: f64 = field(&doc, "Confidence")
                .trim_end_matches('%')
                .parse()
                .unwrap();
            assert!(
                (confidence - input.confidence_percent()).abs() <= 0.01,
                "{confidence} vs {}",
                input.confidence_percent()
            );
        }
    }

    #[test]
    fn test_text_layout() {
        let report = generate(
            &result("Paper", 0.7, &[("Paper", 0.7), ("plastic", 0.2), ("metal", 0.2)]),
            &ReportConfig::default(),
            generated_at(),
        );
        let doc = report.to_text();

        assert!(doc.starts_with("Waste Classification Report\nGenerated: 2024-03-09 14:05:00 UTC\n"));
        assert_eq!(field(&doc, "Status"), "Recyclable Material");
        assert_eq!(field(&doc, "Tip"), "Keep paper clean and dry. Remove any plastic coating");

        let analysis: Vec<&str> = doc
            .lines()
            .skip_while(|l| *l != "Detailed Analysis")
            .skip(1)
            .collect();
        // Ties are ordered by name
        assert_eq!(
            analysis,
            vec!["  Paper: 70.00%", "  Metal: 20.00%", "  Plastic: 20.00%"]
        );
    }

    #[test]
    fn test_json_rendering() {
        let report = generate(
            &result("glass", 0.8, &[("glass", 0.8)]),
            &ReportConfig::default(),
            generated_at(),
        );

        let json = report.render(ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["category"], "glass");
        assert_eq!(value["recyclability"]["recyclable"], true);
        assert_eq!(value["breakdown"][0]["material"], "Glass");
        assert!((value["confidence_percent"].as_f64().unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_text_matches_display() {
        let report = generate(
            &result("metal", 0.66, &[("metal", 0.66)]),
            &ReportConfig::default(),
            generated_at(),
        );

        assert_eq!(report.render(ReportFormat::Text).unwrap(), report.to_string());
        assert_eq!(ReportFormat::default().extension(), "txt");
        assert_eq!(ReportFormat::Json.extension(), "json");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("plastic"), "Plastic");
        assert_eq!(capitalize(""), "");
    }
}
