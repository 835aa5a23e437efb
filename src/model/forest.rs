use std::fmt;

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{RandomForestClassifier, RandomForestClassifierParameters};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::encode::FeatureMatrix;
use crate::model::{ClassLabel, Classifier, InferenceError};

/// Trained random forest. Targets are indices into the artifact's class vocabulary.
pub type Forest = RandomForestClassifier<f64, usize, DenseMatrix<f64>, Vec<usize>>;

#[derive(Debug, PartialEq)]
pub enum ForestError {
    NoClasses,
    NoFeatures,
    TargetOutOfRange { row: usize, target: usize },
    Fit(String),
}

impl std::error::Error for ForestError {}

impl fmt::Display for ForestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForestError::NoClasses => write!(f, "classifier has no output classes"),
            ForestError::NoFeatures => write!(f, "classifier declares zero input features"),
            ForestError::TargetOutOfRange { row, target } =>
                write!(f, "training row {} has target {} outside the class vocabulary", row, target),
            ForestError::Fit(msg) => write!(f, "could not fit forest: {}", msg),
        }
    }
}

/// Random forest over a fixed-width numeric input, plus the vocabulary its predicted indices
/// map into.
#[derive(Serialize, Deserialize)]
pub struct ForestClassifier {
    pub n_features: usize,
    pub classes: Vec<ClassLabel>,
    pub forest: Forest,
}

impl fmt::Debug for ForestClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForestClassifier<features={}, classes={:?}>", self.n_features, self.classes)
    }
}

impl ForestClassifier {
    /// Fit on `features`, where `targets[i]` is the index in `classes` of row `i`'s label.
    /// Every split considers all features and the bootstrap is seeded, so fits are repeatable.
    pub fn fit(classes: Vec<ClassLabel>, features: &FeatureMatrix, targets: &[usize], n_trees: u16) -> Result<Self, ForestError> {
        if classes.is_empty() { return Err(ForestError::NoClasses); }
        if features.n_cols() == 0 { return Err(ForestError::NoFeatures); }
        if let Some((row, &target)) = targets.iter().enumerate().find(|(_, t)| **t >= classes.len()) {
            return Err(ForestError::TargetOutOfRange { row, target });
        }

        let x = to_dense(features).map_err(ForestError::Fit)?;
        let y = targets.to_vec();
        let params = RandomForestClassifierParameters::default()
            .with_n_trees(n_trees)
            .with_m(features.n_cols())
            .with_seed(42);

        let forest: Forest = RandomForestClassifier::fit(&x, &y, params)
            .map_err(|e| ForestError::Fit(e.to_string()))?;

        Ok(ForestClassifier { n_features: features.n_cols(), classes, forest })
    }

    /// Checks run on every freshly loaded artifact.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.classes.is_empty() { return Err(ForestError::NoClasses); }
        if self.n_features == 0 { return Err(ForestError::NoFeatures); }
        Ok(())
    }
}

fn to_dense(features: &FeatureMatrix) -> Result<DenseMatrix<f64>, String> {
    DenseMatrix::new(features.n_rows(), features.n_cols(), features.as_slice().to_vec(), false)
        .map_err(|e| e.to_string())
}

impl Classifier for ForestClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<ClassLabel>, InferenceError> {
        if features.n_cols() != self.n_features {
            return Err(InferenceError::FeatureCountMismatch { expected: self.n_features, found: features.n_cols() });
        }

        let x = to_dense(features).map_err(InferenceError::Model)?;
        let predicted = self.forest.predict(&x).map_err(|e| InferenceError::Model(e.to_string()))?;

        predicted.into_iter()
            .map(|idx| self.classes.get(idx).cloned().ok_or(InferenceError::UnknownClass(idx)))
            .collect()
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }
}

/// Forest that sends `x[feature]` well below `threshold` to `classes[0]` and well above it
/// (beyond 1.5x) to `classes[1]`. Every other feature is constant in training.
#[cfg(test)]
pub(crate) fn threshold_forest(n_features: usize, feature: usize, threshold: f64, classes: Vec<ClassLabel>) -> ForestClassifier {
    let n = 60;
    let mut data = Vec::with_capacity(2 * n * n_features);
    let mut targets = Vec::with_capacity(2 * n);

    for i in 0..n {
        for (value, target) in [(threshold * 0.5 * i as f64 / n as f64, 0), (threshold * (2. + 0.5 * i as f64 / n as f64), 1)].iter() {
            data.extend((0..n_features).map(|f| if f == feature { *value } else { 0. }));
            targets.push(*target);
        }
    }

    ForestClassifier::fit(classes, &FeatureMatrix::new(n_features, data), &targets, 10).unwrap()
}

#[cfg(test)]
mod tests {
    use crate::encode::FeatureMatrix;
    use crate::model::{ClassLabel, Classifier, InferenceError};
    use crate::model::forest::{ForestClassifier, ForestError, threshold_forest};

    #[test]
    fn predicts_vocabulary_labels() {
        let forest = threshold_forest(2, 0, 10., vec!["normal".into(), "neptune".into()]);
        let x = FeatureMatrix::new(2, vec![1., 7., 4., 0., 40., 3.]);

        let labels: Vec<String> = forest.predict(&x).unwrap().iter().map(|l| l.to_string()).collect();
        assert_eq!(vec!["normal", "normal", "neptune"], labels);
    }

    #[test]
    fn integer_vocabulary() {
        let forest = threshold_forest(3, 2, 0.5, vec![ClassLabel::Int(0), ClassLabel::Int(1)]);
        let x = FeatureMatrix::new(3, vec![9., 9., 0.1, 9., 9., 0.95]);

        assert_eq!(vec![ClassLabel::Int(0), ClassLabel::Int(1)], forest.predict(&x).unwrap());
    }

    #[test]
    fn width_mismatch() {
        let forest = threshold_forest(3, 0, 1., vec![ClassLabel::Int(0), ClassLabel::Int(1)]);
        let x = FeatureMatrix::new(2, vec![0., 0.]);

        assert_eq!(Err(InferenceError::FeatureCountMismatch { expected: 3, found: 2 }), forest.predict(&x));
    }

    #[test]
    fn rejects_bad_training_input() {
        let x = FeatureMatrix::new(1, vec![0., 1.]);

        assert_eq!(Some(ForestError::NoClasses), ForestClassifier::fit(vec![], &x, &[0, 0], 3).err());
        assert_eq!(Some(ForestError::TargetOutOfRange { row: 1, target: 2 }),
                   ForestClassifier::fit(vec![ClassLabel::Int(0), ClassLabel::Int(1)], &x, &[0, 2], 3).err());
    }

    #[test]
    fn validate_loaded_artifact() {
        let mut forest = threshold_forest(2, 0, 1., vec![ClassLabel::Int(0), ClassLabel::Int(1)]);
        assert_eq!(Ok(()), forest.validate());

        forest.classes.clear();
        assert_eq!(Err(ForestError::NoClasses), forest.validate());
    }
}
