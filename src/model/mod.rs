use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encode::FeatureMatrix;

pub mod forest;
pub mod store;

pub use forest::ForestClassifier;
pub use store::{Artifacts, ModelStoreError, SchemaArtifacts};

/// Raw classifier output. Models trained on binarized labels emit numbers, models trained on
/// NSL-KDD attack names emit text; downstream code only looks at the string form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ClassLabel {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Int(v) => write!(f, "{}", v),
            // Debug keeps the trailing ".0" on whole floats
            ClassLabel::Float(v) => write!(f, "{:?}", v),
            ClassLabel::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ClassLabel {
    fn from(s: &str) -> Self {
        ClassLabel::Text(s.to_string())
    }
}

impl From<i64> for ClassLabel {
    fn from(v: i64) -> Self {
        ClassLabel::Int(v)
    }
}

#[derive(Debug, PartialEq)]
pub enum InferenceError {
    FeatureCountMismatch { expected: usize, found: usize },
    /// The classifier returned a different number of labels than rows it was given.
    LabelCountMismatch { expected: usize, found: usize },
    UnknownClass(usize),
    Model(String),
}

impl std::error::Error for InferenceError {}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::FeatureCountMismatch { expected, found } => write!(
                f,
                "X has {} features, but the classifier is expecting {} features as input.",
                found, expected
            ),
            InferenceError::LabelCountMismatch { expected, found } =>
                write!(f, "classifier returned {} labels for {} rows", found, expected),
            InferenceError::UnknownClass(idx) => write!(f, "classifier predicted unknown class index {}", idx),
            InferenceError::Model(msg) => write!(f, "{}", msg),
        }
    }
}

/// A pre-trained model bound to one schema.
pub trait Classifier: Send + Sync {
    /// Width of the feature matrix the model was trained on.
    fn n_features(&self) -> usize;

    /// One raw label per matrix row.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<ClassLabel>, InferenceError>;

    /// Output vocabulary, in model order.
    fn classes(&self) -> &[ClassLabel];
}
