use std::fmt;

use counter::Counter;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::encode::FeatureMatrix;
use crate::model::{ClassLabel, Classifier, InferenceError};
use crate::schema::LABEL_COLUMN;

/// Tokens (lowercased, trimmed) that count as benign traffic. Anything else is an attack.
const BENIGN_TOKENS: [&str; 4] = ["normal", "0", "0.0", "benign"];

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Benign,
    Attack,
}

impl Decision {
    /// The single normalization rule, shared by predictions, ground truth and severity.
    pub fn from_token(raw: &str) -> Self {
        let token = raw.trim().to_lowercase();
        if BENIGN_TOKENS.contains(&token.as_str()) {
            Decision::Benign
        } else {
            Decision::Attack
        }
    }

    pub fn from_label(label: &ClassLabel) -> Self {
        Self::from_token(&label.to_string())
    }

    pub fn as_binary(&self) -> u8 {
        match self {
            Decision::Benign => 0,
            Decision::Attack => 1,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Decision::Benign => Severity::Low,
            Decision::Attack => Severity::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Benign => "Benign",
            Decision::Attack => "Attack",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 { 0. } else { self.correct as f64 / self.total as f64 }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.ratio() * 100.)
    }
}

/// Hits for one raw ground-truth label value.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LabelBreakdown {
    pub label: String,
    pub count: usize,
    pub correct: usize,
}

impl LabelBreakdown {
    pub fn accuracy(&self) -> Accuracy {
        Accuracy { correct: self.correct, total: self.count }
    }
}

#[derive(Debug, Clone)]
pub struct Scoring {
    pub raw_labels: Vec<ClassLabel>,
    pub decisions: Vec<Decision>,
    pub accuracy: Option<Accuracy>,
    /// Per ground-truth label, worst accuracy first. Empty without a label column.
    pub breakdown: Vec<LabelBreakdown>,
}

impl Scoring {
    pub fn total_attacks(&self) -> usize {
        self.decisions.iter().filter(|d| **d == Decision::Attack).count()
    }

    /// Occurrences of each raw classifier output, most frequent first.
    pub fn raw_tally(&self) -> Vec<(String, usize)> {
        let mut tally: Counter<String> = Counter::new();
        for label in self.raw_labels.iter() {
            *tally.entry(label.to_string()).or_insert(0) += 1;
        }

        let mut entries: Vec<(String, usize)> = tally.iter().map(|(label, n)| (label.clone(), *n)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

/// Run the classifier once over the whole matrix and normalize what comes back.
pub fn score(features: &FeatureMatrix, classifier: &dyn Classifier, dataset: &Dataset) -> Result<Scoring, InferenceError> {
    let raw_labels = classifier.predict(features)?;
    if raw_labels.len() != features.n_rows() {
        return Err(InferenceError::LabelCountMismatch { expected: features.n_rows(), found: raw_labels.len() });
    }
    let decisions: Vec<Decision> = raw_labels.iter().map(Decision::from_label).collect();

    let (accuracy, breakdown) = match dataset.column(LABEL_COLUMN) {
        Some(truth) => {
            let truth: Vec<&str> = truth.collect();
            (Some(accuracy(&decisions, &truth)), label_breakdown(&decisions, &truth))
        }
        None => (None, Vec::new()),
    };

    Ok(Scoring { raw_labels, decisions, accuracy, breakdown })
}

/// Share of rows where the normalized prediction matches the normalized ground truth.
pub fn accuracy(decisions: &[Decision], truth: &[&str]) -> Accuracy {
    let truth_decisions: Vec<Decision> = truth.iter().map(|t| Decision::from_token(t)).collect();
    let correct = decisions.iter().zip(truth_decisions.iter()).filter(|(p, t)| p == t).count();

    let truth_attacks = truth_decisions.iter().filter(|d| **d == Decision::Attack).count();
    let predicted_attacks = decisions.iter().filter(|d| **d == Decision::Attack).count();
    log::debug!("Ground truth attacks: {}, predicted attacks: {}", truth_attacks, predicted_attacks);

    Accuracy { correct, total: truth.len() }
}

fn label_breakdown(decisions: &[Decision], truth: &[&str]) -> Vec<LabelBreakdown> {
    let mut counts: Counter<&str> = Counter::new();
    let mut hits: Counter<&str> = Counter::new();

    for (prediction, label) in decisions.iter().zip(truth.iter()) {
        let label = label.trim();
        *counts.entry(label).or_insert(0) += 1;
        if *prediction == Decision::from_token(label) {
            *hits.entry(label).or_insert(0) += 1;
        }
    }

    let mut breakdown: Vec<LabelBreakdown> = counts.iter()
        .map(|(label, count)| LabelBreakdown {
            label: label.to_string(),
            count: *count,
            correct: hits.get(label).copied().unwrap_or(0),
        })
        .collect();

    breakdown.sort_by(|a, b| {
        a.accuracy().ratio().partial_cmp(&b.accuracy().ratio())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    breakdown
}
