use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encode::EncoderSet;
use crate::model::{Classifier, ForestClassifier};
use crate::model::forest::ForestError;
use crate::schema::SchemaName;

#[derive(Debug)]
pub enum ModelStoreError {
    NotFound(PathBuf),
    IO(PathBuf, std::io::Error),
    Corrupt(PathBuf, bincode::Error),
    InvalidForest(PathBuf, ForestError),
    IncompleteEncoders(SchemaName, Vec<&'static str>),
}

impl std::error::Error for ModelStoreError {}

impl fmt::Display for ModelStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStoreError::NotFound(path) => write!(f, "Model artifact \"{}\" not found.", path.display()),
            ModelStoreError::IO(path, err) => write!(f, "I/O error for {}: {}.", path.display(), err),
            ModelStoreError::Corrupt(path, err) => write!(f, "Model artifact \"{}\" is corrupt: {}.", path.display(), err),
            ModelStoreError::InvalidForest(path, err) => write!(f, "Model artifact \"{}\" is invalid: {}.", path.display(), err),
            ModelStoreError::IncompleteEncoders(schema, missing) =>
                write!(f, "Encoder set for {} lacks encoders for: {}.", schema, missing.join(", ")),
        }
    }
}

pub fn classifier_path(dir: &Path, schema: SchemaName) -> PathBuf {
    dir.join(format!("{}_model.bin", schema))
}

pub fn encoders_path(dir: &Path, schema: SchemaName) -> PathBuf {
    dir.join(format!("{}_encoders.bin", schema))
}

/// Classifier and fitted encoders for one schema.
pub struct SchemaArtifacts {
    pub classifier: Box<dyn Classifier>,
    pub encoders: EncoderSet,
}

impl fmt::Debug for SchemaArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaArtifacts<features={}, classes={}, encoders={}>",
               self.classifier.n_features(), self.classifier.classes().len(), self.encoders.iter().count())
    }
}

/// Read-only model artifacts for every schema, built once at start-up and shared between
/// requests.
#[derive(Debug)]
pub struct Artifacts {
    by_schema: HashMap<SchemaName, SchemaArtifacts>,
}

impl Artifacts {
    /// Load both schemas from `dir`. Any missing or corrupt artifact is fatal.
    pub fn load(dir: &Path) -> Result<Self, ModelStoreError> {
        let mut artifacts = Artifacts { by_schema: HashMap::new() };
        for schema in SchemaName::ALL.iter() {
            let classifier = load_classifier(dir, *schema)?;
            let encoders = load_encoder_set(dir, *schema)?;
            artifacts = artifacts.with(*schema, Box::new(classifier), encoders)?;
        }
        Ok(artifacts)
    }

    pub fn empty() -> Self {
        Artifacts { by_schema: HashMap::new() }
    }

    /// Register in-memory artifacts for a schema.
    pub fn with(mut self, schema: SchemaName, classifier: Box<dyn Classifier>, encoders: EncoderSet) -> Result<Self, ModelStoreError> {
        let missing = encoders.missing_for(schema.schema());
        if !missing.is_empty() {
            return Err(ModelStoreError::IncompleteEncoders(schema, missing));
        }

        let expected = schema.schema().n_features();
        if classifier.n_features() != expected {
            log::warn!("{} classifier expects {} features but the schema defines {}; requests will fail",
                       schema, classifier.n_features(), expected);
        }

        log::info!("Loaded {} artifacts: {} classes, {} encoders",
                   schema, classifier.classes().len(), encoders.iter().count());
        self.by_schema.insert(schema, SchemaArtifacts { classifier, encoders });
        Ok(self)
    }

    pub fn get(&self, schema: SchemaName) -> Option<&SchemaArtifacts> {
        self.by_schema.get(&schema)
    }
}

pub fn load_classifier(dir: &Path, schema: SchemaName) -> Result<ForestClassifier, ModelStoreError> {
    let path = classifier_path(dir, schema);
    let forest: ForestClassifier = read_artifact(&path)?;
    forest.validate().map_err(|e| ModelStoreError::InvalidForest(path, e))?;
    Ok(forest)
}

pub fn load_encoder_set(dir: &Path, schema: SchemaName) -> Result<EncoderSet, ModelStoreError> {
    read_artifact(&encoders_path(dir, schema))
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ModelStoreError> {
    if !path.is_file() {
        return Err(ModelStoreError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| ModelStoreError::IO(path.to_path_buf(), e))?;
    bincode::deserialize_from(BufReader::new(file)).map_err(|e| ModelStoreError::Corrupt(path.to_path_buf(), e))
}

/// Write an artifact in the format `Artifacts::load` reads.
pub fn write_artifact<T: Serialize>(path: &Path, artifact: &T) -> Result<(), ModelStoreError> {
    let file = File::create(path).map_err(|e| ModelStoreError::IO(path.to_path_buf(), e))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, artifact).map_err(|e| ModelStoreError::Corrupt(path.to_path_buf(), e))?;
    writer.flush().map_err(|e| ModelStoreError::IO(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::encode::{Encoder, EncoderSet, FeatureMatrix};
    use crate::model::ClassLabel;
    use crate::model::forest::{ForestClassifier, threshold_forest};
    use crate::model::store::{Artifacts, classifier_path, encoders_path, ModelStoreError, write_artifact};
    use crate::schema::{NETWORK_CATEGORICAL, SchemaName, WEB_CATEGORICAL};

    fn small_forest(n_features: usize) -> ForestClassifier {
        threshold_forest(n_features, 0, 1., vec![ClassLabel::Int(0), ClassLabel::Int(1)])
    }

    fn encoders(columns: &[&str]) -> EncoderSet {
        let mut set = EncoderSet::new();
        for col in columns {
            set.insert(col, Encoder::fit(vec!["a", "b"]));
        }
        set
    }

    fn write_all(dir: &std::path::Path) {
        write_artifact(&classifier_path(dir, SchemaName::Network), &small_forest(41)).unwrap();
        write_artifact(&encoders_path(dir, SchemaName::Network), &encoders(&NETWORK_CATEGORICAL)).unwrap();
        write_artifact(&classifier_path(dir, SchemaName::Web), &small_forest(24)).unwrap();
        write_artifact(&encoders_path(dir, SchemaName::Web), &encoders(&WEB_CATEGORICAL)).unwrap();
    }

    #[test]
    fn load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());

        let artifacts = Artifacts::load(dir.path()).unwrap();
        let web = artifacts.get(SchemaName::Web).unwrap();
        assert_eq!(24, web.classifier.n_features());
        assert_eq!(&[ClassLabel::Int(0), ClassLabel::Int(1)][..], web.classifier.classes());

        let mut data = vec![0.; 41];
        data.extend(std::iter::once(5.).chain(std::iter::repeat(0.).take(40)));
        let predicted = artifacts.get(SchemaName::Network).unwrap().classifier.predict(&FeatureMatrix::new(41, data)).unwrap();
        assert_eq!(vec![ClassLabel::Int(0), ClassLabel::Int(1)], predicted);
        assert_eq!(&["a".to_string(), "b".to_string()][..], web.encoders.get("http_method").unwrap().classes());
    }

    #[test]
    fn missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());
        fs::remove_file(encoders_path(dir.path(), SchemaName::Web)).unwrap();

        assert!(matches!(Artifacts::load(dir.path()), Err(ModelStoreError::NotFound(_))));
    }

    #[test]
    fn corrupt_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());
        fs::write(classifier_path(dir.path(), SchemaName::Network), b"\x01\x02").unwrap();

        assert!(matches!(Artifacts::load(dir.path()), Err(ModelStoreError::Corrupt(_, _))));
    }

    #[test]
    fn forest_without_vocabulary_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());
        let mut broken = small_forest(41);
        broken.classes.clear();
        write_artifact(&classifier_path(dir.path(), SchemaName::Network), &broken).unwrap();

        assert!(matches!(Artifacts::load(dir.path()), Err(ModelStoreError::InvalidForest(_, _))));
    }

    #[test]
    fn encoder_set_must_cover_categoricals() {
        let result = Artifacts::empty().with(SchemaName::Network, Box::new(small_forest(41)), encoders(&["service"]));
        match result {
            Err(ModelStoreError::IncompleteEncoders(SchemaName::Network, missing)) => assert_eq!(vec!["protocol_type", "flag"], missing),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
