use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::dataset::Dataset;
use crate::schema::SchemaName;

#[derive(Debug)]
pub enum PersistenceError {
    NotFound(SchemaName, PathBuf),
    IO(PathBuf, std::io::Error),
    Csv(PathBuf, csv::Error),
}

impl std::error::Error for PersistenceError {}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::NotFound(schema, path) =>
                write!(f, "No {} result available yet (expected \"{}\").", schema, path.display()),
            PersistenceError::IO(path, err) => write!(f, "I/O error for {}: {}.", path.display(), err),
            PersistenceError::Csv(path, err) => write!(f, "Could not write result file {}: {}.", path.display(), err),
        }
    }
}

/// One result file per schema. Each write replaces the previous result; concurrent writers of
/// the same schema race and the last rename wins.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ResultStore { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self, schema: SchemaName) -> PathBuf {
        self.dir.join(format!("result_{}.csv", schema))
    }

    /// Stage the table in a temporary file next to the target, then rename it into place, so
    /// readers only ever see a complete result.
    pub fn write(&self, schema: SchemaName, table: &Dataset) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::IO(self.dir.clone(), e))?;

        let path = self.path(schema);
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(|e| PersistenceError::IO(self.dir.clone(), e))?;
        {
            let mut writer = csv::Writer::from_writer(staged.as_file_mut());
            writer.write_record(table.columns()).map_err(|e| PersistenceError::Csv(path.clone(), e))?;
            for row in table.rows() {
                writer.write_record(row).map_err(|e| PersistenceError::Csv(path.clone(), e))?;
            }
            writer.flush().map_err(|e| PersistenceError::IO(path.clone(), e))?;
        }
        staged.persist(&path).map_err(|e| PersistenceError::IO(path.clone(), e.error))?;

        log::info!("Wrote {} result rows to {}", table.n_rows(), path.display());
        Ok(path)
    }

    pub fn read(&self, schema: SchemaName) -> Result<Vec<u8>, PersistenceError> {
        let path = self.path(schema);
        if !path.is_file() {
            return Err(PersistenceError::NotFound(schema, path));
        }
        fs::read(&path).map_err(|e| PersistenceError::IO(path, e))
    }
}
