use std::fmt;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::dataset::{load_dataset, LoadError, LoadedDataset};
use crate::encode::{encode_features, EncodeError};
use crate::model::{Artifacts, InferenceError, ModelStoreError};
use crate::results::{annotate, AnalysisResult, PersistenceError, ResultStore, summarize};
use crate::schema::SchemaName;
use crate::scoring::score;
use crate::validate::{validate, SchemaMismatch};

/// Machine-readable failure class of an analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    EmptyDataset,
    SchemaMismatch,
    DataProcessing,
    Inference,
    Persistence,
}

#[derive(Debug)]
pub enum PipelineError {
    Load(LoadError),
    SchemaMismatch(SchemaMismatch),
    DataProcessing(EncodeError),
    Inference(InferenceError),
    ModelUnavailable(SchemaName),
    Persistence(PersistenceError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Load(LoadError::Parse(_)) => ErrorKind::Parse,
            PipelineError::Load(LoadError::Empty) => ErrorKind::EmptyDataset,
            PipelineError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            PipelineError::DataProcessing(_) => ErrorKind::DataProcessing,
            PipelineError::Inference(_) | PipelineError::ModelUnavailable(_) => ErrorKind::Inference,
            PipelineError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl std::error::Error for PipelineError {}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Load(err) => write!(f, "{}", err),
            PipelineError::SchemaMismatch(err) => write!(f, "{}", err),
            PipelineError::DataProcessing(err) => write!(f, "Data processing error: {}", err),
            PipelineError::Inference(err) => write!(f, "Inference error (model and schema out of sync): {}", err),
            PipelineError::ModelUnavailable(schema) => write!(f, "No model loaded for {}.", schema.module_title()),
            PipelineError::Persistence(err) => write!(f, "{}", err),
        }
    }
}

impl From<LoadError> for PipelineError {
    fn from(err: LoadError) -> Self { PipelineError::Load(err) }
}

impl From<SchemaMismatch> for PipelineError {
    fn from(err: SchemaMismatch) -> Self { PipelineError::SchemaMismatch(err) }
}

impl From<EncodeError> for PipelineError {
    fn from(err: EncodeError) -> Self { PipelineError::DataProcessing(err) }
}

impl From<InferenceError> for PipelineError {
    fn from(err: InferenceError) -> Self { PipelineError::Inference(err) }
}

impl From<PersistenceError> for PipelineError {
    fn from(err: PersistenceError) -> Self { PipelineError::Persistence(err) }
}

/// Upload-to-verdict pipeline. Cheap to clone; clones share the loaded artifacts.
#[derive(Clone)]
pub struct Pipeline {
    artifacts: Arc<Artifacts>,
    results: ResultStore,
    preview_rows: usize,
}

impl Pipeline {
    /// Load artifacts for every schema from the configured model directory.
    pub fn load(config: &PipelineConfig) -> Result<Self, ModelStoreError> {
        let artifacts = Artifacts::load(&config.model_dir)?;
        Ok(Self::with_artifacts(Arc::new(artifacts), config))
    }

    pub fn with_artifacts(artifacts: Arc<Artifacts>, config: &PipelineConfig) -> Self {
        Pipeline {
            artifacts,
            results: ResultStore::new(&config.result_dir),
            preview_rows: config.preview_rows,
        }
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Analyse one upload. The result file is only written once scoring has succeeded.
    pub fn analyze(&self, bytes: &[u8], hint: SchemaName) -> Result<AnalysisResult, PipelineError> {
        let LoadedDataset { dataset, requested, effective, notice } = load_dataset(bytes, hint)?;

        let schema = effective.schema();
        validate(&dataset, schema)?;

        let artifacts = self.artifacts.get(effective).ok_or(PipelineError::ModelUnavailable(effective))?;
        let features = encode_features(&dataset, schema, &artifacts.encoders)?;
        let scoring = score(&features, artifacts.classifier.as_ref(), &dataset)?;

        let table = annotate(dataset, &scoring);
        let path = self.results.write(effective, &table)?;

        let mut result = summarize(&table, &scoring, effective, self.preview_rows);
        result.requested_schema = requested;
        result.notice = notice;
        result.result_file = path.display().to_string();

        log::info!("{} analysis: {} rows, {} attacks, {} benign, accuracy {}",
                   effective, result.total_rows, result.total_attacks, result.total_benign,
                   result.accuracy.as_deref().unwrap_or("n/a"));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::PipelineConfig;
    use crate::encode::{Encoder, EncoderSet, FeatureMatrix};
    use crate::model::{Artifacts, ClassLabel, Classifier, ForestClassifier, InferenceError};
    use crate::model::forest::threshold_forest;
    use crate::pipeline::{ErrorKind, Pipeline};
    use crate::schema::{NETWORK_FEATURES, SchemaName, WEB_FEATURES};

    /// Flags long connections (500 and up) as `neptune`, short ones (under 100) as `normal`.
    fn network_forest() -> ForestClassifier {
        threshold_forest(41, 0, 100., vec!["normal".into(), "neptune".into()])
    }

    /// Flags requests with a high bot_score, emitting integer labels.
    fn web_forest(n_features: usize) -> ForestClassifier {
        threshold_forest(n_features, 13, 0.5, vec![ClassLabel::Int(0), ClassLabel::Int(1)])
    }

    fn encoders(columns: Vec<(&str, Vec<&str>)>) -> EncoderSet {
        let mut set = EncoderSet::new();
        for (column, classes) in columns {
            set.insert(column, Encoder::fit(classes));
        }
        set
    }

    fn artifacts(web_width: usize) -> Arc<Artifacts> {
        let network = encoders(vec![
            ("protocol_type", vec!["tcp", "udp", "icmp"]),
            ("service", vec!["http", "ftp"]),
            ("flag", vec!["SF", "S0"]),
        ]);
        let web = encoders(vec![
            ("http_method", vec!["GET", "POST"]),
            ("user_agent_type", vec!["Chrome", "Bot"]),
            ("referrer_type", vec!["internal", "none"]),
        ]);

        Arc::new(Artifacts::empty()
            .with(SchemaName::Network, Box::new(network_forest()), network).unwrap()
            .with(SchemaName::Web, Box::new(web_forest(web_width)), web).unwrap())
    }

    fn pipeline(dir: &std::path::Path, web_width: usize) -> Pipeline {
        let config = PipelineConfig::from_args(None, Some(dir.to_str().unwrap()), None);
        Pipeline::with_artifacts(artifacts(web_width), &config)
    }

    fn network_row(duration: u32, label: &str) -> String {
        let mut cells = vec![duration.to_string(), "tcp".into(), "http".into(), "SF".into()];
        cells.extend((4..41).map(|_| "0".to_string()));
        cells.push(label.to_string());
        cells.join(",")
    }

    fn network_csv(rows: &[(u32, &str)]) -> String {
        let mut header: Vec<&str> = NETWORK_FEATURES.to_vec();
        header.push("label");
        let mut lines = vec![header.join(",")];
        lines.extend(rows.iter().map(|(d, l)| network_row(*d, l)));
        lines.join("\n")
    }

    fn web_csv(bot_scores: &[&str]) -> String {
        let mut lines = vec![WEB_FEATURES.join(",")];
        for score in bot_scores {
            let row: Vec<&str> = WEB_FEATURES.iter().map(|f| match *f {
                "http_method" => "DELETE",
                "user_agent_type" => "Bot",
                "referrer_type" => "none",
                "bot_score" => *score,
                _ => "3",
            }).collect();
            lines.push(row.join(","));
        }
        lines.join("\n")
    }

    #[test]
    fn network_with_ground_truth() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 24);

        let mut rows = vec![(5, "normal"); 7];
        rows.extend(vec![(500, "neptune"); 3]);
        let result = p.analyze(network_csv(&rows).as_bytes(), SchemaName::Network).unwrap();

        assert_eq!((10, 3, 7), (result.total_rows, result.total_attacks, result.total_benign));
        assert_eq!(Some("100.00%".to_string()), result.accuracy);
        assert!(result.notice.is_none());

        // One ground-truth label flipped
        rows[0] = (5, "smurf");
        let result = p.analyze(network_csv(&rows).as_bytes(), SchemaName::Network).unwrap();
        assert_eq!(Some("90.00%".to_string()), result.accuracy);
        assert_eq!("smurf", result.label_breakdown[0].label);
    }

    #[test]
    fn persisted_file_has_every_row_and_verdicts() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 24);

        p.analyze(network_csv(&[(5, "normal"), (500, "neptune")]).as_bytes(), SchemaName::Network).unwrap();
        let written = String::from_utf8(p.results().read(SchemaName::Network).unwrap()).unwrap();
        let lines: Vec<&str> = written.lines().collect();

        assert_eq!(3, lines.len());
        assert!(lines[0].ends_with("label,decision,severity"));
        assert!(lines[1].ends_with("normal,Benign,Low"));
        assert!(lines[2].ends_with("neptune,Attack,High"));
    }

    #[test]
    fn web_with_unknown_categories_and_no_labels() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 24);

        let result = p.analyze(web_csv(&["0.9", "0.1", "1.0"]).as_bytes(), SchemaName::Web).unwrap();
        assert_eq!((3, 2, 1), (result.total_rows, result.total_attacks, result.total_benign));
        assert!(result.accuracy.is_none());
        assert!(result.label_breakdown.is_empty());
        assert_eq!(vec![("1".to_string(), 2), ("0".to_string(), 1)], result.raw_prediction_tally);
    }

    #[test]
    fn headerless_dump_on_web_route_is_rerouted() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 24);

        let input = format!("{}\n{}\n", network_row(5, "normal"), network_row(900, "back"));
        let result = p.analyze(input.as_bytes(), SchemaName::Web).unwrap();

        assert_eq!(SchemaName::Web, result.requested_schema);
        assert_eq!(SchemaName::Network, result.schema);
        assert!(result.notice.is_some());
        assert_eq!(Some("100.00%".to_string()), result.accuracy);
        assert!(result.result_file.ends_with("result_network.csv"));
    }

    #[test]
    fn idempotent_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 24);
        let input = network_csv(&[(5, "normal"), (500, "normal"), (700, "neptune")]);

        let a = p.analyze(input.as_bytes(), SchemaName::Network).unwrap();
        let b = p.analyze(input.as_bytes(), SchemaName::Network).unwrap();
        assert_eq!((a.total_rows, a.total_attacks, a.total_benign, a.accuracy.clone()),
                   (b.total_rows, b.total_attacks, b.total_benign, b.accuracy.clone()));
        assert_eq!(Some("66.67%".to_string()), a.accuracy);
    }

    #[test]
    fn large_upload_preview_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 24);
        let rows: Vec<(u32, &str)> = (0..10_000).map(|i| if i % 10 == 0 { (500, "neptune") } else { (1, "normal") }).collect();

        let result = p.analyze(network_csv(&rows).as_bytes(), SchemaName::Network).unwrap();
        assert_eq!(500, result.preview.len());
        assert_eq!(10_000, result.total_rows);
        assert_eq!(1_000, result.total_attacks);
        assert_eq!(9_000, result.total_benign);
        assert!(result.truncation_notice.unwrap().contains("10000"));

        let written = p.results().read(SchemaName::Network).unwrap();
        assert_eq!(10_001, written.split(|b| *b == b'\n').filter(|l| !l.is_empty()).count());
    }

    #[test]
    fn error_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 24);

        assert_eq!(ErrorKind::EmptyDataset, p.analyze(b"", SchemaName::Network).unwrap_err().kind());
        assert_eq!(ErrorKind::Parse, p.analyze(b"a,b\n1\n", SchemaName::Network).unwrap_err().kind());

        let err = p.analyze(web_csv(&["0.2"]).as_bytes(), SchemaName::Network).unwrap_err();
        assert_eq!(ErrorKind::SchemaMismatch, err.kind());
        assert!(err.to_string().contains("Web Analysis"));

        let err = p.analyze(web_csv(&["high"]).as_bytes(), SchemaName::Web).unwrap_err();
        assert_eq!(ErrorKind::DataProcessing, err.kind());
        assert!(err.to_string().contains("bot_score"));

        // Nothing was persisted for the failed requests
        assert!(p.results().read(SchemaName::Web).is_err());
        assert!(p.results().read(SchemaName::Network).is_err());
    }

    #[test]
    fn classifier_out_of_sync_is_inference_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 30);

        let err = p.analyze(web_csv(&["0.2"]).as_bytes(), SchemaName::Web).unwrap_err();
        assert_eq!(ErrorKind::Inference, err.kind());
        assert!(err.to_string().contains("expecting 30 features"));
        assert!(p.results().read(SchemaName::Web).is_err());
    }

    /// Emits two labels per row.
    struct Doubling;

    impl Classifier for Doubling {
        fn n_features(&self) -> usize { 41 }

        fn predict(&self, features: &FeatureMatrix) -> Result<Vec<ClassLabel>, InferenceError> {
            Ok(vec![ClassLabel::Int(0); 2 * features.n_rows()])
        }

        fn classes(&self) -> &[ClassLabel] { &[] }
    }

    #[test]
    fn wrong_label_count_is_inference_error() {
        let dir = tempfile::tempdir().unwrap();
        let network = encoders(vec![("protocol_type", vec!["tcp"]), ("service", vec!["http"]), ("flag", vec!["SF"])]);
        let artifacts = Artifacts::empty().with(SchemaName::Network, Box::new(Doubling), network).unwrap();
        let config = PipelineConfig::from_args(None, Some(dir.path().to_str().unwrap()), None);
        let p = Pipeline::with_artifacts(Arc::new(artifacts), &config);

        let err = p.analyze(network_csv(&[(5, "normal"), (500, "neptune")]).as_bytes(), SchemaName::Network).unwrap_err();
        assert_eq!(ErrorKind::Inference, err.kind());
        assert!(p.results().read(SchemaName::Network).is_err());
    }
}
