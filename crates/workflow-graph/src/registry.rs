//! Node type registry
//!
//! Static catalog mapping each [`NodeKind`] to its descriptor (label,
//! category, ports) and to a default payload constructor. Every new node is
//! built from the registry, so it is valid against its kind from the moment
//! it exists.
//!
//! # Usage
//!
//! ```ignore
//! use workflow_graph::{NodeKind, NodeTypeRegistry, Position};
//!
//! let registry = NodeTypeRegistry::with_builtins();
//! let node = registry.create_node(NodeKind::DatasetLoader, Position::new(0.0, 0.0));
//! assert_eq!(node.payload().label(), "Dataset Loader");
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payload::{
    BinaryClassifierPayload, DataBinningPayload, DataMergerPayload, DatasetLoaderPayload,
    EdaAnalysisPayload, FeatureEngineerPayload, FeatureImportancePayload, GenericPayload,
    LambdaFunctionPayload, NodeKind, NodePayload, QualityCheckerPayload, ReportGeneratorPayload,
    StructuralAnalysisPayload,
};
use crate::types::{Node, Position};

/// Category of a node, for palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Nodes that bring data into the workflow
    Input,
    /// Cleaning, merging and reshaping
    Processing,
    /// Statistics and exploration
    Analysis,
    /// Model training and evaluation
    Modeling,
    /// Reports and visualizations
    Output,
}

/// Static description of a node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub kind: NodeKind,
    /// Label given to freshly created nodes
    pub label: String,
    pub category: NodeCategory,
    pub description: String,
    /// Input handle ids; more than one means edges must name a target handle
    pub inputs: Vec<String>,
    /// Output handle ids
    pub outputs: Vec<String>,
}

impl NodeDescriptor {
    fn new(
        kind: NodeKind,
        label: &str,
        category: NodeCategory,
        description: &str,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Self {
        Self {
            kind,
            label: label.to_string(),
            category,
            description: description.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Registry of node kinds and their default payloads
#[derive(Debug, Clone)]
pub struct NodeTypeRegistry {
    entries: HashMap<NodeKind, NodeDescriptor>,
}

impl NodeTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in kind
    #[rustfmt::skip]
    pub fn with_builtins() -> Self {
        use NodeCategory::*;
        use NodeKind as K;

        let mut registry = Self::new();
        for descriptor in [
            NodeDescriptor::new(K::DatasetLoader, "Dataset Loader", Input,
                "Loads a dataset from an upload, URL or database", &[], &["data"]),
            NodeDescriptor::new(K::StructuralAnalysis, "Structural Analysis", Analysis,
                "Infers row/column counts and column types", &["data"], &["data", "summary"]),
            NodeDescriptor::new(K::QualityChecker, "Quality Checker", Processing,
                "Flags missing values, duplicates and outliers", &["data"], &["data", "report"]),
            NodeDescriptor::new(K::DataMerger, "Data Merger", Processing,
                "Joins two datasets on a key", &["left", "right"], &["data"]),
            NodeDescriptor::new(K::DataBinning, "Data Binning", Processing,
                "Buckets a numeric column into bins", &["data"], &["data"]),
            NodeDescriptor::new(K::LambdaFunction, "Custom Function", Processing,
                "Runs a user-supplied transformation", &["data"], &["data"]),
            NodeDescriptor::new(K::FeatureEngineer, "Feature Engineer", Processing,
                "Derives new features from existing columns", &["data"], &["data"]),
            NodeDescriptor::new(K::EdaAnalysis, "EDA Analysis", Analysis,
                "Distribution and correlation statistics", &["data"], &["summary"]),
            NodeDescriptor::new(K::FeatureImportance, "Feature Importance", Analysis,
                "Ranks features against a target column", &["data"], &["scores"]),
            NodeDescriptor::new(K::BinaryClassifier, "Binary Classifier", Modeling,
                "Trains and evaluates a two-class model", &["data"], &["model", "metrics"]),
            NodeDescriptor::new(K::ReportGenerator, "Report Generator", Output,
                "Assembles upstream results into a report", &["results"], &[]),
            NodeDescriptor::new(K::Source, "Source", Input,
                "Generic data source", &[], &["output"]),
            NodeDescriptor::new(K::Transform, "Transform", Processing,
                "Generic transformation step", &["input"], &["output"]),
            NodeDescriptor::new(K::Analysis, "Analysis", Analysis,
                "Generic analysis step", &["input"], &["output"]),
            NodeDescriptor::new(K::Visualization, "Visualization", Output,
                "Generic chart or view", &["input"], &[]),
        ] {
            registry.register(descriptor);
        }
        registry
    }

    /// Register (or replace) a descriptor
    pub fn register(&mut self, descriptor: NodeDescriptor) {
        self.entries.insert(descriptor.kind, descriptor);
    }

    /// Describe a kind
    ///
    /// # Panics
    ///
    /// Panics if the kind was never registered. The set of kinds is
    /// compiled in, so a missing entry is a build-time contract violation.
    pub fn describe(&self, kind: NodeKind) -> &NodeDescriptor {
        self.try_describe(kind)
            .unwrap_or_else(|| panic!("node kind '{}' is not registered", kind))
    }

    /// Describe a kind, if registered
    pub fn try_describe(&self, kind: NodeKind) -> Option<&NodeDescriptor> {
        self.entries.get(&kind)
    }

    /// Fully populated default payload for a kind
    ///
    /// # Panics
    ///
    /// Panics if the kind was never registered.
    pub fn empty_payload(&self, kind: NodeKind) -> NodePayload {
        let label = self.describe(kind).label.clone();
        match kind {
            NodeKind::DatasetLoader => NodePayload::DatasetLoader(DatasetLoaderPayload {
                label,
                ..Default::default()
            }),
            NodeKind::StructuralAnalysis => {
                NodePayload::StructuralAnalysis(StructuralAnalysisPayload {
                    label,
                    ..Default::default()
                })
            }
            NodeKind::QualityChecker => NodePayload::QualityChecker(QualityCheckerPayload {
                label,
                ..Default::default()
            }),
            NodeKind::DataMerger => NodePayload::DataMerger(DataMergerPayload {
                label,
                ..Default::default()
            }),
            NodeKind::DataBinning => NodePayload::DataBinning(DataBinningPayload {
                label,
                ..Default::default()
            }),
            NodeKind::LambdaFunction => NodePayload::LambdaFunction(LambdaFunctionPayload {
                label,
                ..Default::default()
            }),
            NodeKind::FeatureEngineer => NodePayload::FeatureEngineer(FeatureEngineerPayload {
                label,
                ..Default::default()
            }),
            NodeKind::EdaAnalysis => NodePayload::EdaAnalysis(EdaAnalysisPayload {
                label,
                ..Default::default()
            }),
            NodeKind::FeatureImportance => {
                NodePayload::FeatureImportance(FeatureImportancePayload {
                    label,
                    ..Default::default()
                })
            }
            NodeKind::BinaryClassifier => NodePayload::BinaryClassifier(BinaryClassifierPayload {
                label,
                ..Default::default()
            }),
            NodeKind::ReportGenerator => NodePayload::ReportGenerator(ReportGeneratorPayload {
                label,
                ..Default::default()
            }),
            NodeKind::Source => NodePayload::Source(generic(label)),
            NodeKind::Transform => NodePayload::Transform(generic(label)),
            NodeKind::Analysis => NodePayload::Analysis(generic(label)),
            NodeKind::Visualization => NodePayload::Visualization(generic(label)),
        }
    }

    /// Build a new node with a fresh id and the default payload for `kind`
    pub fn create_node(&self, kind: NodeKind, position: Position) -> Node {
        Node::new(Uuid::new_v4().to_string(), position, self.empty_payload(kind))
    }

    /// All descriptors, in palette order
    pub fn palette(&self) -> Vec<&NodeDescriptor> {
        NodeKind::all()
            .iter()
            .filter_map(|kind| self.entries.get(kind))
            .collect()
    }

    /// Descriptors in one category, in palette order
    pub fn by_category(&self, category: NodeCategory) -> Vec<&NodeDescriptor> {
        self.palette()
            .into_iter()
            .filter(|d| d.category == category)
            .collect()
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn generic(label: String) -> GenericPayload {
    GenericPayload {
        label,
        ..Default::default()
    }
}
