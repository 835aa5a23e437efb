use std::fmt;
use std::io::Read;
use std::ops::RangeInclusive;

use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;

use crate::dataset::Dataset;
use crate::schema::{LABEL_COLUMN, NETWORK_CANONICAL_COLUMNS, NETWORK_FEATURES, SchemaName};

/// Widths at which an upload may be a raw NSL-KDD dump without a header row.
pub const HEADERLESS_NETWORK_WIDTHS: RangeInclusive<usize> = 40..=44;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug)]
pub enum LoadError {
    Parse(String),
    Empty,
}

impl std::error::Error for LoadError {}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Parse(diag) => write!(f, "CSV read error: {}", diag),
            LoadError::Empty => write!(f, "Uploaded CSV is empty"),
        }
    }
}

/// A parsed upload plus the schema it will actually be analysed under.
#[derive(Debug)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub requested: SchemaName,
    pub effective: SchemaName,
    pub notice: Option<String>,
}

/// Parse raw upload bytes into a dataset.
///
/// The first row is taken as a header unless the width looks like a raw NSL-KDD dump and the
/// first cell is not `duration`; in that case every row is data, canonical network column
/// names are assigned positionally and the label column is binarized. Such a dump uploaded
/// under the web hint is re-routed to the network schema with a notice.
pub fn load_dataset(bytes: &[u8], hint: SchemaName) -> Result<LoadedDataset, LoadError> {
    let bytes = decompress(bytes)?;
    let mut records = read_records(&bytes)?;

    if records.is_empty() {
        return Err(LoadError::Empty);
    }

    let first = records.remove(0);
    let width = first.len();
    let mut effective = hint;
    let mut notice = None;

    let dataset = if looks_headerless_network(&first) {
        log::debug!("Detected headerless network dataset ({} columns), assigning canonical headers", width);
        records.insert(0, first);

        let mut dataset = Dataset::new(canonical_network_columns(width), into_rows(records));
        dataset.map_column(LABEL_COLUMN, binarize_kdd_label);

        if hint == SchemaName::Web {
            effective = SchemaName::Network;
            let msg = format!("Auto-detected Network dataset. Switched to {} mode.", SchemaName::Network.module_title());
            log::warn!("{}", msg);
            notice = Some(msg);
        }
        dataset
    } else {
        let columns = first.iter().map(|name| name.trim().to_string()).collect();
        Dataset::new(columns, into_rows(records))
    };

    if dataset.is_empty() {
        return Err(LoadError::Empty);
    }

    log::debug!("Uploaded file columns: {:?}", dataset.columns());

    Ok(LoadedDataset { dataset, requested: hint, effective, notice })
}

fn looks_headerless_network(first: &StringRecord) -> bool {
    HEADERLESS_NETWORK_WIDTHS.contains(&first.len())
        && first.get(0).map(str::trim) != Some(NETWORK_FEATURES[0])
}

/// Raw NSL-KDD labels: `normal` is 0, every other token (numeric ones included) is 1.
fn binarize_kdd_label(raw: &str) -> String {
    if raw.trim().eq_ignore_ascii_case("normal") { "0" } else { "1" }.to_string()
}

fn canonical_network_columns(width: usize) -> Vec<String> {
    (0..width)
        .map(|i| match NETWORK_CANONICAL_COLUMNS.get(i) {
            Some(name) => name.to_string(),
            None => format!("column_{}", i + 1),
        })
        .collect()
}

/// Inflate gzip uploads, pass anything else through untouched.
fn decompress(bytes: &[u8]) -> Result<Vec<u8>, LoadError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes.to_owned());
    }

    let mut inflated = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut inflated)
        .map_err(|e| LoadError::Parse(format!("invalid gzip stream: {}", e)))?;
    Ok(inflated)
}

fn read_records(bytes: &[u8]) -> Result<Vec<StringRecord>, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(bytes);

    reader.records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::Parse(e.to_string()))
}

fn into_rows(records: Vec<StringRecord>) -> Vec<Vec<String>> {
    records.into_iter()
        .map(|record| record.iter().map(str::to_string).collect())
        .collect()
}
