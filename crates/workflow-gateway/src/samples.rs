//! Representative results for local execution and preview
//!
//! Local backends do not process data. They attach plausible result
//! fragments shaped exactly like each payload's result field, so the rest of
//! the system (merging, rendering, round trips) is exercised end to end.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use workflow_graph::payload::{
    BinSummary, BinningStrategy, ClassifierMetrics, ColumnStats, Correlation, DataBinningPayload,
    EdaSummary, EngineeredFeature, FeatureScore, MergeSummary, QualityIssue, QualityReport,
    ReportArtifact, ReportFormat, Severity, StructuralSummary, TablePreview,
};
use workflow_graph::NodePayload;

const SAMPLE_ROWS: u64 = 1_200;

fn fragment<T: Serialize>(field: &str, value: &T) -> serde_json::Result<Map<String, Value>> {
    let mut map = Map::new();
    map.insert(field.to_string(), serde_json::to_value(value)?);
    Ok(map)
}

/// Result fragment for a payload, keyed by that payload's result field
pub fn sample_results(payload: &NodePayload) -> serde_json::Result<Map<String, Value>> {
    match payload {
        NodePayload::DatasetLoader(_) => fragment("preview", &table_preview()),
        NodePayload::StructuralAnalysis(_) => fragment(
            "results",
            &StructuralSummary {
                row_count: SAMPLE_ROWS,
                column_count: 4,
                column_types: BTreeMap::from([
                    ("age".to_string(), "integer".to_string()),
                    ("churned".to_string(), "boolean".to_string()),
                    ("customer_id".to_string(), "string".to_string()),
                    ("monthly_spend".to_string(), "float".to_string()),
                ]),
            },
        ),
        NodePayload::QualityChecker(_) => fragment(
            "results",
            &QualityReport {
                score: 87.5,
                issues: vec![
                    QualityIssue {
                        column: "monthly_spend".to_string(),
                        issue: "missing values".to_string(),
                        severity: Severity::Medium,
                        affected_rows: 42,
                    },
                    QualityIssue {
                        column: "age".to_string(),
                        issue: "outliers".to_string(),
                        severity: Severity::Low,
                        affected_rows: 7,
                    },
                ],
            },
        ),
        NodePayload::DataMerger(_) => fragment(
            "results",
            &MergeSummary {
                row_count: SAMPLE_ROWS - 35,
                column_count: 7,
                unmatched_rows: 35,
            },
        ),
        NodePayload::DataBinning(p) => {
            fragment("results", &bins(p.strategy, p.bin_count, &p.custom_edges))
        }
        NodePayload::LambdaFunction(p) => fragment(
            "results",
            &json!({ "language": p.language, "rowsOut": SAMPLE_ROWS, "stdout": "" }),
        ),
        NodePayload::FeatureEngineer(_) => fragment(
            "results",
            &vec![
                EngineeredFeature {
                    name: "spend_per_year".to_string(),
                    expression: "monthly_spend * 12".to_string(),
                },
                EngineeredFeature {
                    name: "is_senior".to_string(),
                    expression: "age >= 65".to_string(),
                },
            ],
        ),
        NodePayload::EdaAnalysis(_) => fragment("results", &eda_summary()),
        NodePayload::FeatureImportance(_) => fragment(
            "results",
            &vec![
                FeatureScore {
                    feature: "monthly_spend".to_string(),
                    score: 0.46,
                },
                FeatureScore {
                    feature: "age".to_string(),
                    score: 0.31,
                },
                FeatureScore {
                    feature: "tenure".to_string(),
                    score: 0.23,
                },
            ],
        ),
        NodePayload::BinaryClassifier(_) => fragment(
            "metrics",
            &ClassifierMetrics {
                accuracy: 0.91,
                precision: 0.88,
                recall: 0.84,
                f1_score: 0.86,
                roc_auc: 0.94,
            },
        ),
        NodePayload::ReportGenerator(p) => {
            let extension = match p.format {
                ReportFormat::Html => "html",
                ReportFormat::Pdf => "pdf",
                ReportFormat::Markdown => "md",
            };
            fragment(
                "results",
                &ReportArtifact {
                    location: format!("reports/{}.{}", slug(&p.title), extension),
                    generated_at: chrono::Utc::now().to_rfc3339(),
                    page_count: p.sections.len().max(1) as u32,
                },
            )
        }
        NodePayload::Source(_)
        | NodePayload::Transform(_)
        | NodePayload::Analysis(_)
        | NodePayload::Visualization(_) => fragment(
            "results",
            &json!({ "kind": payload.kind().as_str(), "rows": SAMPLE_ROWS }),
        ),
    }
}

fn table_preview() -> TablePreview {
    TablePreview {
        columns: vec![
            "customer_id".to_string(),
            "age".to_string(),
            "monthly_spend".to_string(),
            "churned".to_string(),
        ],
        rows: vec![
            vec![json!("C-0001"), json!(34), json!(52.5), json!(false)],
            vec![json!("C-0002"), json!(61), json!(18.0), json!(true)],
            vec![json!("C-0003"), json!(27), json!(75.25), json!(false)],
        ],
        total_rows: SAMPLE_ROWS,
    }
}

fn eda_summary() -> EdaSummary {
    EdaSummary {
        column_stats: BTreeMap::from([
            (
                "age".to_string(),
                ColumnStats {
                    mean: 41.3,
                    std_dev: 12.8,
                    min: 18.0,
                    max: 89.0,
                    missing: 0,
                },
            ),
            (
                "monthly_spend".to_string(),
                ColumnStats {
                    mean: 48.9,
                    std_dev: 21.4,
                    min: 0.0,
                    max: 199.0,
                    missing: 42,
                },
            ),
        ]),
        correlations: vec![Correlation {
            left: "age".to_string(),
            right: "monthly_spend".to_string(),
            coefficient: -0.18,
        }],
    }
}

fn bins(strategy: BinningStrategy, bin_count: u32, custom_edges: &[f64]) -> Vec<BinSummary> {
    let max = DataBinningPayload::MAX_BIN_COUNT;
    let edges: Vec<f64> = match strategy {
        BinningStrategy::Custom => custom_edges.iter().copied().take(max as usize + 1).collect(),
        _ => {
            let count = bin_count.clamp(1, max);
            let width = 100.0 / f64::from(count);
            (0..=count).map(|i| f64::from(i) * width).collect()
        }
    };
    let bin_total = edges.len().saturating_sub(1).max(1) as u64;

    edges
        .windows(2)
        .enumerate()
        .map(|(index, pair)| BinSummary {
            label: format!("bin_{}", index + 1),
            lower: pair[0],
            upper: pair[1],
            count: SAMPLE_ROWS / bin_total,
        })
        .collect()
}

fn slug(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_graph::{NodeKind, NodeTypeRegistry};

    #[test]
    fn test_every_sample_merges_into_its_payload() {
        let registry = NodeTypeRegistry::with_builtins();
        for kind in NodeKind::all() {
            let payload = registry.empty_payload(*kind);
            let sample = sample_results(&payload).unwrap();
            let merged = payload
                .merged(&sample)
                .unwrap_or_else(|e| panic!("sample for {} does not fit: {}", kind, e));
            assert!(merged.has_results(), "no results recorded for {}", kind);
        }
    }

    #[test]
    fn test_binning_sample_follows_configuration() {
        assert_eq!(bins(BinningStrategy::EqualWidth, 4, &[]).len(), 4);
        let custom = bins(BinningStrategy::Custom, 0, &[0.0, 18.0, 65.0, 120.0]);
        assert_eq!(custom.len(), 3);
        assert_eq!(custom[1].lower, 18.0);
        assert_eq!(custom[1].upper, 65.0);
    }

    #[test]
    fn test_binning_sample_is_clamped() {
        let max = DataBinningPayload::MAX_BIN_COUNT as usize;
        assert_eq!(bins(BinningStrategy::EqualFrequency, u32::MAX, &[]).len(), max);

        let edges: Vec<f64> = (0..5_000).map(f64::from).collect();
        assert_eq!(bins(BinningStrategy::Custom, 0, &edges).len(), max);
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Analysis Report"), "analysis-report");
        assert_eq!(slug("  "), "report");
    }
}
