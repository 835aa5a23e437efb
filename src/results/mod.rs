use serde::Serialize;

use crate::dataset::Dataset;
use crate::schema::SchemaName;
use crate::scoring::{LabelBreakdown, Scoring};

pub mod store;

pub use store::{PersistenceError, ResultStore};

pub const DECISION_COLUMN: &str = "decision";
pub const SEVERITY_COLUMN: &str = "severity";

/// Rows returned for display. The persisted file always holds every row.
pub const DEFAULT_PREVIEW_ROWS: usize = 500;

#[derive(Serialize, Debug, Clone)]
pub struct AnalysisResult {
    pub requested_schema: SchemaName,
    pub schema: SchemaName,
    /// Set when the upload was re-routed to another schema.
    pub notice: Option<String>,
    pub columns: Vec<String>,
    pub preview: Vec<Vec<String>>,
    pub total_rows: usize,
    pub total_attacks: usize,
    pub total_benign: usize,
    pub accuracy: Option<String>,
    pub truncation_notice: Option<String>,
    pub label_breakdown: Vec<LabelBreakdown>,
    pub raw_prediction_tally: Vec<(String, usize)>,
    pub result_file: String,
}

/// Original rows with `decision` and `severity` appended.
pub fn annotate(mut dataset: Dataset, scoring: &Scoring) -> Dataset {
    let decisions = scoring.decisions.iter().map(|d| d.to_string()).collect();
    let severities = scoring.decisions.iter().map(|d| d.severity().to_string()).collect();
    dataset.push_column(DECISION_COLUMN, decisions);
    dataset.push_column(SEVERITY_COLUMN, severities);
    dataset
}

/// Summarise an annotated table. Counts cover every row, the preview only the first
/// `preview_rows`.
pub fn summarize(table: &Dataset, scoring: &Scoring, schema: SchemaName, preview_rows: usize) -> AnalysisResult {
    let total_rows = table.n_rows();
    let total_attacks = scoring.total_attacks();

    let truncation_notice = if total_rows > preview_rows {
        Some(format!("Showing first {} rows of {}. Download CSV for full results.", preview_rows, total_rows))
    } else {
        None
    };

    AnalysisResult {
        requested_schema: schema,
        schema,
        notice: None,
        columns: table.columns().to_vec(),
        preview: table.rows().iter().take(preview_rows).cloned().collect(),
        total_rows,
        total_attacks,
        total_benign: total_rows - total_attacks,
        accuracy: scoring.accuracy.map(|a| a.to_string()),
        truncation_notice,
        label_breakdown: scoring.breakdown.clone(),
        raw_prediction_tally: scoring.raw_tally(),
        result_file: String::new(),
    }
}
