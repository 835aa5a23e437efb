use std::path::PathBuf;

use crate::results::DEFAULT_PREVIEW_ROWS;

pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_RESULT_DIR: &str = "uploads";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Holds `<schema>_model.bin` and `<schema>_encoders.bin` for each schema.
    pub model_dir: PathBuf,
    /// Receives `result_<schema>.csv` after every successful analysis.
    pub result_dir: PathBuf,
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            result_dir: PathBuf::from(DEFAULT_RESULT_DIR),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl PipelineConfig {
    /// Override defaults with whatever was given on the command line.
    pub fn from_args(models: Option<&str>, results: Option<&str>, preview_rows: Option<usize>) -> Self {
        let default = Self::default();
        PipelineConfig {
            model_dir: models.map(PathBuf::from).unwrap_or(default.model_dir),
            result_dir: results.map(PathBuf::from).unwrap_or(default.result_dir),
            preview_rows: preview_rows.unwrap_or(default.preview_rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::PipelineConfig;

    #[test]
    fn defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(PathBuf::from("models"), cfg.model_dir);
        assert_eq!(PathBuf::from("uploads"), cfg.result_dir);
        assert_eq!(500, cfg.preview_rows);
    }

    #[test]
    fn partial_override() {
        let cfg = PipelineConfig::from_args(None, Some("/tmp/out"), Some(10));
        assert_eq!(PathBuf::from("models"), cfg.model_dir);
        assert_eq!(PathBuf::from("/tmp/out"), cfg.result_dir);
        assert_eq!(10, cfg.preview_rows);
    }
}
