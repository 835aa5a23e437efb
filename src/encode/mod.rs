use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::schema::Schema;

/// Code substituted for categories never seen while fitting.
pub const UNKNOWN_CATEGORY: i64 = -1;

/// Category -> integer code table fitted offline. Codes are positions in `classes`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Encoder {
    classes: Vec<String>,
    codes: HashMap<String, i64>,
}

impl Encoder {
    /// Build from an ordered vocabulary; repeated entries keep their first code.
    pub fn from_classes(classes: Vec<String>) -> Self {
        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            codes.entry(class.clone()).or_insert(code as i64);
        }
        Encoder { classes, codes }
    }

    /// Fit in discovery order.
    pub fn fit<'a, I>(values: I) -> Self
        where I: IntoIterator<Item = &'a str>
    {
        let mut seen = HashSet::new();
        let mut classes: Vec<String> = Vec::new();
        for v in values {
            if seen.insert(v) {
                classes.push(v.to_string());
            }
        }
        Self::from_classes(classes)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn code(&self, value: &str) -> Option<i64> {
        self.codes.get(value).copied()
    }

    pub fn transform(&self, value: &str) -> i64 {
        self.code(value).unwrap_or(UNKNOWN_CATEGORY)
    }
}

impl From<Vec<String>> for Encoder {
    fn from(classes: Vec<String>) -> Self {
        Encoder::from_classes(classes)
    }
}

impl From<Encoder> for Vec<String> {
    fn from(encoder: Encoder) -> Self {
        encoder.classes
    }
}

impl PartialEq for Encoder {
    fn eq(&self, other: &Self) -> bool {
        self.classes == other.classes
    }
}

/// Fitted encoders for one schema, keyed by categorical column.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EncoderSet {
    encoders: BTreeMap<String, Encoder>,
}

impl EncoderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: &str, encoder: Encoder) {
        self.encoders.insert(column.to_string(), encoder);
    }

    pub fn get(&self, column: &str) -> Option<&Encoder> {
        self.encoders.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Encoder)> {
        self.encoders.iter()
    }

    /// Categorical features of `schema` with no fitted encoder.
    pub fn missing_for(&self, schema: &Schema) -> Vec<&'static str> {
        schema.categorical_feature_names.iter()
            .filter(|name| !self.encoders.contains_key(**name))
            .copied()
            .collect()
    }
}

/// Dense row-major numeric matrix, one row per dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    pub fn new(n_cols: usize, data: Vec<f64>) -> Self {
        debug_assert!(n_cols == 0 || data.len() % n_cols == 0);
        FeatureMatrix { n_cols, data }
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn n_rows(&self) -> usize {
        if self.n_cols == 0 { 0 } else { self.data.len() / self.n_cols }
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        &self.data[idx * self.n_cols..(idx + 1) * self.n_cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.n_cols.max(1))
    }
}

#[derive(Debug, PartialEq)]
pub enum EncodeError {
    MissingColumn(String),
    MissingEncoder(String),
    InvalidNumber { column: String, row: usize, value: String },
}

impl std::error::Error for EncodeError {}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::MissingColumn(col) => write!(f, "column \"{}\" not present in dataset", col),
            EncodeError::MissingEncoder(col) => write!(f, "no fitted encoder for categorical column \"{}\"", col),
            EncodeError::InvalidNumber { column, row, value } =>
                write!(f, "could not convert \"{}\" to a number (column \"{}\", row {})", value, column, row),
        }
    }
}

enum ColumnPlan<'a> {
    Categorical(&'a Encoder),
    Numeric,
}

/// Build the classifier input for a validated dataset: the schema's features, in schema order,
/// categorical columns replaced by their codes.
pub fn encode_features(dataset: &Dataset, schema: &Schema, encoders: &EncoderSet) -> Result<FeatureMatrix, EncodeError> {
    let mut plan = Vec::with_capacity(schema.n_features());
    for &name in schema.ordered_feature_names {
        let idx = dataset.column_index(name).ok_or_else(|| EncodeError::MissingColumn(name.to_string()))?;
        let kind = if schema.is_categorical(name) {
            ColumnPlan::Categorical(encoders.get(name).ok_or_else(|| EncodeError::MissingEncoder(name.to_string()))?)
        } else {
            ColumnPlan::Numeric
        };
        plan.push((name, idx, kind));
    }

    let mut data = Vec::with_capacity(dataset.n_rows() * plan.len());
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        for (name, col_idx, kind) in plan.iter() {
            let cell = row[*col_idx].as_str();
            let value = match kind {
                ColumnPlan::Categorical(encoder) => encoder.transform(cell) as f64,
                ColumnPlan::Numeric => parse_numeric(cell).ok_or_else(|| EncodeError::InvalidNumber {
                    column: name.to_string(),
                    row: row_idx + 1,
                    value: cell.to_string(),
                })?,
            };
            data.push(value);
        }
    }

    Ok(FeatureMatrix::new(plan.len(), data))
}

/// Finite float, or a boolean literal as 0/1.
fn parse_numeric(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("true") { return Some(1.); }
    if cell.eq_ignore_ascii_case("false") { return Some(0.); }

    match fast_float::parse::<f64, _>(cell) {
        Ok(v) if v.is_finite() => Some(v),
        _ => None
    }
}
