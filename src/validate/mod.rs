use std::fmt;

use crate::dataset::Dataset;
use crate::schema::Schema;

pub mod hints;

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMismatch {
    /// Required columns absent from the upload, in schema order.
    pub missing: Vec<String>,
    pub hint: Option<&'static str>,
}

impl std::error::Error for SchemaMismatch {}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Missing columns: {}.", self.missing.join(", "))?;
        if let Some(hint) = self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

/// All-or-nothing check that every feature of `schema` is present. Extra columns are fine.
pub fn validate(dataset: &Dataset, schema: &Schema) -> Result<(), SchemaMismatch> {
    let missing: Vec<String> = schema.ordered_feature_names.iter()
        .filter(|name| !dataset.has_column(name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    log::debug!("Validation against {} failed, {} columns missing", schema.name, missing.len());
    Err(SchemaMismatch { missing, hint: hints::hint_for(schema.name, dataset) })
}
