//! Per-kind node payloads
//!
//! Every node carries a payload whose shape is fixed by its [`NodeKind`].
//! The payload is a sum type with one case per kind, so a node can never be
//! observed with a payload that disagrees with its kind. Payload structs
//! reject unknown fields, which keeps patches from smuggling in keys that
//! the kind does not define.
//!
//! Configuration fields and last-known results live side by side: a result
//! field (`preview`, `results`, `metrics`) is `None` until an execution or
//! preview run fills it in.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GraphError;

/// Closed set of node kinds known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    DatasetLoader,
    StructuralAnalysis,
    QualityChecker,
    DataMerger,
    DataBinning,
    LambdaFunction,
    FeatureEngineer,
    EdaAnalysis,
    FeatureImportance,
    BinaryClassifier,
    ReportGenerator,
    Source,
    Transform,
    Analysis,
    Visualization,
}

impl NodeKind {
    const ALL: [NodeKind; 15] = [
        NodeKind::DatasetLoader,
        NodeKind::StructuralAnalysis,
        NodeKind::QualityChecker,
        NodeKind::DataMerger,
        NodeKind::DataBinning,
        NodeKind::LambdaFunction,
        NodeKind::FeatureEngineer,
        NodeKind::EdaAnalysis,
        NodeKind::FeatureImportance,
        NodeKind::BinaryClassifier,
        NodeKind::ReportGenerator,
        NodeKind::Source,
        NodeKind::Transform,
        NodeKind::Analysis,
        NodeKind::Visualization,
    ];

    /// Every kind, in palette order
    pub fn all() -> &'static [NodeKind] {
        &Self::ALL
    }

    /// Wire identifier of this kind (e.g. `"datasetLoader"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DatasetLoader => "datasetLoader",
            Self::StructuralAnalysis => "structuralAnalysis",
            Self::QualityChecker => "qualityChecker",
            Self::DataMerger => "dataMerger",
            Self::DataBinning => "dataBinning",
            Self::LambdaFunction => "lambdaFunction",
            Self::FeatureEngineer => "featureEngineer",
            Self::EdaAnalysis => "edaAnalysis",
            Self::FeatureImportance => "featureImportance",
            Self::BinaryClassifier => "binaryClassifier",
            Self::ReportGenerator => "reportGenerator",
            Self::Source => "source",
            Self::Transform => "transform",
            Self::Analysis => "analysis",
            Self::Visualization => "visualization",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GraphError::UnknownNodeKind(s.to_string()))
    }
}

// ─── SHARED RESULT SHAPES ───────────────────────────────────────────

/// Tabular sample of a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub total_rows: u64,
}

/// Where a dataset loader reads from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    #[default]
    Upload,
    Url,
    Database,
}

/// Source descriptor for a dataset loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DatasetSource {
    pub source_type: SourceType,
    /// File name, URL or table name depending on `source_type`
    pub location: String,
    pub format: String,
    pub has_header: bool,
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self {
            source_type: SourceType::Upload,
            location: String::new(),
            format: "csv".to_string(),
            has_header: true,
        }
    }
}

// ─── PER-KIND PAYLOADS ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DatasetLoaderPayload {
    pub label: String,
    pub source: DatasetSource,
    pub preview: Option<TablePreview>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct StructuralSummary {
    pub row_count: u64,
    pub column_count: u64,
    pub column_types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct StructuralAnalysisPayload {
    pub label: String,
    pub infer_types: bool,
    pub results: Option<StructuralSummary>,
}

impl Default for StructuralAnalysisPayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            infer_types: true,
            results: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct QualityIssue {
    pub column: String,
    pub issue: String,
    pub severity: Severity,
    pub affected_rows: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct QualityReport {
    /// Overall quality score in `0.0..=100.0`
    pub score: f64,
    pub issues: Vec<QualityIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct QualityCheckerPayload {
    pub label: String,
    pub checks: Vec<String>,
    /// Fraction of missing values above which a column is flagged
    pub missing_threshold: f64,
    pub results: Option<QualityReport>,
}

impl Default for QualityCheckerPayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            checks: vec![
                "missingValues".to_string(),
                "duplicates".to_string(),
                "outliers".to_string(),
            ],
            missing_threshold: 0.2,
            results: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MergeSummary {
    pub row_count: u64,
    pub column_count: u64,
    pub unmatched_rows: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DataMergerPayload {
    pub label: String,
    pub join_type: JoinType,
    pub left_key: String,
    pub right_key: String,
    pub results: Option<MergeSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinningStrategy {
    #[default]
    EqualWidth,
    EqualFrequency,
    Custom,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BinSummary {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DataBinningPayload {
    pub label: String,
    pub column: String,
    pub strategy: BinningStrategy,
    pub bin_count: u32,
    /// Explicit edges, only used with [`BinningStrategy::Custom`]
    pub custom_edges: Vec<f64>,
    pub results: Option<Vec<BinSummary>>,
}

impl DataBinningPayload {
    /// Largest number of bins a node may ask for
    pub const MAX_BIN_COUNT: u32 = 1_000;
}

impl Default for DataBinningPayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            column: String::new(),
            strategy: BinningStrategy::EqualWidth,
            bin_count: 5,
            custom_edges: Vec::new(),
            results: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LambdaFunctionPayload {
    pub label: String,
    pub language: String,
    pub code: String,
    pub results: Option<Value>,
}

impl Default for LambdaFunctionPayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            language: "python".to_string(),
            code: "def transform(df):\n    return df\n".to_string(),
            results: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineeredFeature {
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureEngineerPayload {
    pub label: String,
    pub operations: Vec<String>,
    pub results: Option<Vec<EngineeredFeature>>,
}

impl Default for FeatureEngineerPayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            operations: vec!["scaling".to_string(), "encoding".to_string()],
            results: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub missing: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Correlation {
    pub left: String,
    pub right: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EdaSummary {
    pub column_stats: BTreeMap<String, ColumnStats>,
    pub correlations: Vec<Correlation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EdaAnalysisPayload {
    pub label: String,
    pub analyses: Vec<String>,
    pub results: Option<EdaSummary>,
}

impl Default for EdaAnalysisPayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            analyses: vec!["distribution".to_string(), "correlation".to_string()],
            results: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureScore {
    pub feature: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureImportancePayload {
    pub label: String,
    pub method: String,
    pub target_column: String,
    pub results: Option<Vec<FeatureScore>>,
}

impl Default for FeatureImportancePayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            method: "permutation".to_string(),
            target_column: String::new(),
            results: None,
        }
    }
}

/// Model settings for a binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ModelDescriptor {
    pub algorithm: String,
    pub target_column: String,
    /// Held-out fraction in `0.0..1.0`
    pub test_size: f64,
    pub hyperparameters: BTreeMap<String, Value>,
}

impl Default for ModelDescriptor {
    fn default() -> Self {
        Self {
            algorithm: "logisticRegression".to_string(),
            target_column: String::new(),
            test_size: 0.2,
            hyperparameters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClassifierMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BinaryClassifierPayload {
    pub label: String,
    pub model: ModelDescriptor,
    pub metrics: Option<ClassifierMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportFormat {
    #[default]
    Html,
    Pdf,
    Markdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportArtifact {
    pub location: String,
    pub generated_at: String,
    pub page_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportGeneratorPayload {
    pub label: String,
    pub title: String,
    pub format: ReportFormat,
    pub sections: Vec<String>,
    pub results: Option<ReportArtifact>,
}

impl Default for ReportGeneratorPayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            title: "Analysis Report".to_string(),
            format: ReportFormat::Html,
            sections: vec![
                "summary".to_string(),
                "quality".to_string(),
                "model".to_string(),
            ],
            results: None,
        }
    }
}

/// Payload shared by the generic source/transform/analysis/visualization kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GenericPayload {
    pub label: String,
    pub config: Map<String, Value>,
    pub results: Option<Value>,
}

// ─── THE UNION ──────────────────────────────────────────────────────

/// Kind-specific data attached to a node
///
/// Serializes as the bare inner object; decoding requires the kind, see
/// [`NodePayload::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodePayload {
    DatasetLoader(DatasetLoaderPayload),
    StructuralAnalysis(StructuralAnalysisPayload),
    QualityChecker(QualityCheckerPayload),
    DataMerger(DataMergerPayload),
    DataBinning(DataBinningPayload),
    LambdaFunction(LambdaFunctionPayload),
    FeatureEngineer(FeatureEngineerPayload),
    EdaAnalysis(EdaAnalysisPayload),
    FeatureImportance(FeatureImportancePayload),
    BinaryClassifier(BinaryClassifierPayload),
    ReportGenerator(ReportGeneratorPayload),
    Source(GenericPayload),
    Transform(GenericPayload),
    Analysis(GenericPayload),
    Visualization(GenericPayload),
}

impl NodePayload {
    /// The kind this payload belongs to
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::DatasetLoader(_) => NodeKind::DatasetLoader,
            Self::StructuralAnalysis(_) => NodeKind::StructuralAnalysis,
            Self::QualityChecker(_) => NodeKind::QualityChecker,
            Self::DataMerger(_) => NodeKind::DataMerger,
            Self::DataBinning(_) => NodeKind::DataBinning,
            Self::LambdaFunction(_) => NodeKind::LambdaFunction,
            Self::FeatureEngineer(_) => NodeKind::FeatureEngineer,
            Self::EdaAnalysis(_) => NodeKind::EdaAnalysis,
            Self::FeatureImportance(_) => NodeKind::FeatureImportance,
            Self::BinaryClassifier(_) => NodeKind::BinaryClassifier,
            Self::ReportGenerator(_) => NodeKind::ReportGenerator,
            Self::Source(_) => NodeKind::Source,
            Self::Transform(_) => NodeKind::Transform,
            Self::Analysis(_) => NodeKind::Analysis,
            Self::Visualization(_) => NodeKind::Visualization,
        }
    }

    /// Decode a payload for a known kind
    pub fn from_value(kind: NodeKind, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            NodeKind::DatasetLoader => Self::DatasetLoader(serde_json::from_value(value)?),
            NodeKind::StructuralAnalysis => {
                Self::StructuralAnalysis(serde_json::from_value(value)?)
            }
            NodeKind::QualityChecker => Self::QualityChecker(serde_json::from_value(value)?),
            NodeKind::DataMerger => Self::DataMerger(serde_json::from_value(value)?),
            NodeKind::DataBinning => Self::DataBinning(serde_json::from_value(value)?),
            NodeKind::LambdaFunction => Self::LambdaFunction(serde_json::from_value(value)?),
            NodeKind::FeatureEngineer => Self::FeatureEngineer(serde_json::from_value(value)?),
            NodeKind::EdaAnalysis => Self::EdaAnalysis(serde_json::from_value(value)?),
            NodeKind::FeatureImportance => Self::FeatureImportance(serde_json::from_value(value)?),
            NodeKind::BinaryClassifier => Self::BinaryClassifier(serde_json::from_value(value)?),
            NodeKind::ReportGenerator => Self::ReportGenerator(serde_json::from_value(value)?),
            NodeKind::Source => Self::Source(serde_json::from_value(value)?),
            NodeKind::Transform => Self::Transform(serde_json::from_value(value)?),
            NodeKind::Analysis => Self::Analysis(serde_json::from_value(value)?),
            NodeKind::Visualization => Self::Visualization(serde_json::from_value(value)?),
        })
    }

    /// Encode this payload as a JSON object
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Serialize for the wire, refusing output that would not decode again
    ///
    /// serde_json writes non-finite floats as `null`, which no `f64` field
    /// accepts back.
    pub fn to_wire_value(&self) -> std::result::Result<Value, String> {
        let value = self.to_value().map_err(|e| e.to_string())?;
        Self::from_value(self.kind(), value.clone())
            .map_err(|e| format!("payload does not survive serialization: {}", e))?;
        Ok(value)
    }

    /// Human-readable label shown on the node
    pub fn label(&self) -> &str {
        match self {
            Self::DatasetLoader(p) => &p.label,
            Self::StructuralAnalysis(p) => &p.label,
            Self::QualityChecker(p) => &p.label,
            Self::DataMerger(p) => &p.label,
            Self::DataBinning(p) => &p.label,
            Self::LambdaFunction(p) => &p.label,
            Self::FeatureEngineer(p) => &p.label,
            Self::EdaAnalysis(p) => &p.label,
            Self::FeatureImportance(p) => &p.label,
            Self::BinaryClassifier(p) => &p.label,
            Self::ReportGenerator(p) => &p.label,
            Self::Source(p) | Self::Transform(p) | Self::Analysis(p) | Self::Visualization(p) => {
                &p.label
            }
        }
    }

    /// Shallow-merge `patch` into this payload
    ///
    /// Top-level keys in `patch` replace the corresponding fields. The
    /// merged object must still decode as the same kind; otherwise the
    /// payload is left untouched and the decode failure is returned.
    pub fn merged(&self, patch: &Map<String, Value>) -> serde_json::Result<Self> {
        let mut object = match self.to_value()? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            object.insert(key.clone(), value.clone());
        }
        Self::from_value(self.kind(), Value::Object(object))
    }

    /// Check whether the configuration is complete enough to run
    ///
    /// Returns the reason when it is not.
    pub fn readiness(&self) -> std::result::Result<(), String> {
        let missing = |what: &str| Err(format!("{} is not configured", what));
        match self {
            Self::DatasetLoader(p) if p.source.location.trim().is_empty() => {
                missing("data source")
            }
            Self::DataMerger(p) if p.left_key.is_empty() || p.right_key.is_empty() => {
                missing("join key")
            }
            Self::DataBinning(p) if p.column.is_empty() => missing("binning column"),
            Self::DataBinning(p) => binning_readiness(p),
            Self::LambdaFunction(p) if p.code.trim().is_empty() => missing("function body"),
            Self::FeatureImportance(p) if p.target_column.is_empty() => missing("target column"),
            Self::BinaryClassifier(p) if p.model.target_column.is_empty() => {
                missing("target column")
            }
            Self::BinaryClassifier(p) if !(0.0..1.0).contains(&p.model.test_size) => {
                Err(format!("test size {} is outside 0..1", p.model.test_size))
            }
            _ => Ok(()),
        }
    }

    /// Whether the payload carries results from a previous run
    pub fn has_results(&self) -> bool {
        match self {
            Self::DatasetLoader(p) => p.preview.is_some(),
            Self::StructuralAnalysis(p) => p.results.is_some(),
            Self::QualityChecker(p) => p.results.is_some(),
            Self::DataMerger(p) => p.results.is_some(),
            Self::DataBinning(p) => p.results.is_some(),
            Self::LambdaFunction(p) => p.results.is_some(),
            Self::FeatureEngineer(p) => p.results.is_some(),
            Self::EdaAnalysis(p) => p.results.is_some(),
            Self::FeatureImportance(p) => p.results.is_some(),
            Self::BinaryClassifier(p) => p.metrics.is_some(),
            Self::ReportGenerator(p) => p.results.is_some(),
            Self::Source(p) | Self::Transform(p) | Self::Analysis(p) | Self::Visualization(p) => {
                p.results.is_some()
            }
        }
    }
}

fn binning_readiness(p: &DataBinningPayload) -> std::result::Result<(), String> {
    let max = DataBinningPayload::MAX_BIN_COUNT;
    match p.strategy {
        BinningStrategy::Custom => {
            if p.custom_edges.len() < 2 {
                return Err("custom binning needs at least two edges".to_string());
            }
            if p.custom_edges.len() > max as usize + 1 {
                return Err(format!("custom binning allows at most {} bins", max));
            }
            if p.custom_edges.iter().any(|edge| !edge.is_finite()) {
                return Err("custom bin edges must be finite".to_string());
            }
            if p.custom_edges.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err("custom bin edges must be strictly increasing".to_string());
            }
            Ok(())
        }
        _ if p.bin_count == 0 => Err("bin count must be positive".to_string()),
        _ if p.bin_count > max => Err(format!("bin count {} exceeds {}", p.bin_count, max)),
        _ => Ok(()),
    }
}
