use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two record layouts the pipeline knows how to score.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SchemaName {
    Network,
    Web,
}

impl SchemaName {
    pub const ALL: [SchemaName; 2] = [SchemaName::Network, SchemaName::Web];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaName::Network => "network",
            SchemaName::Web => "web",
        }
    }

    /// Name of the analysis module as shown to users.
    pub fn module_title(&self) -> &'static str {
        match self {
            SchemaName::Network => "Network Analysis",
            SchemaName::Web => "Web Analysis",
        }
    }

    pub fn schema(&self) -> &'static Schema {
        match self {
            SchemaName::Network => &NETWORK_SCHEMA,
            SchemaName::Web => &WEB_SCHEMA,
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq)]
pub struct UnknownSchema(pub String);

impl std::error::Error for UnknownSchema {}

impl fmt::Display for UnknownSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown analysis mode \"{}\" (expected \"network\" or \"web\").", self.0)
    }
}

impl FromStr for SchemaName {
    type Err = UnknownSchema;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(SchemaName::Network),
            "web" => Ok(SchemaName::Web),
            _ => Err(UnknownSchema(s.to_string())),
        }
    }
}

pub struct Schema {
    pub name: SchemaName,
    /// Column order fed to the classifier.
    pub ordered_feature_names: &'static [&'static str],
    pub categorical_feature_names: &'static [&'static str],
    categorical: HashSet<&'static str>,
}

impl Schema {
    fn new(name: SchemaName, ordered: &'static [&'static str], categorical: &'static [&'static str]) -> Self {
        Schema {
            name,
            ordered_feature_names: ordered,
            categorical_feature_names: categorical,
            categorical: categorical.iter().copied().collect(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.ordered_feature_names.len()
    }

    pub fn is_categorical(&self, feature: &str) -> bool {
        self.categorical.contains(feature)
    }

    pub fn first_feature(&self) -> &'static str {
        self.ordered_feature_names[0]
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema<name={}, features={}, categorical={:?}>", self.name, self.n_features(), self.categorical_feature_names)
    }
}

/// NSL-KDD connection record features, in classifier order.
pub const NETWORK_FEATURES: [&str; 41] = [
    "duration", "protocol_type", "service", "flag", "src_bytes", "dst_bytes",
    "land", "wrong_fragment", "urgent", "hot", "num_failed_logins", "logged_in",
    "num_compromised", "root_shell", "su_attempted", "num_root", "num_file_creations",
    "num_shells", "num_access_files", "num_outbound_cmds", "is_host_login",
    "is_guest_login", "count", "srv_count", "serror_rate", "srv_serror_rate",
    "rerror_rate", "srv_rerror_rate", "same_srv_rate", "diff_srv_rate",
    "srv_diff_host_rate", "dst_host_count", "dst_host_srv_count",
    "dst_host_same_srv_rate", "dst_host_diff_srv_rate", "dst_host_same_src_port_rate",
    "dst_host_srv_diff_host_rate", "dst_host_serror_rate", "dst_host_srv_serror_rate",
    "dst_host_rerror_rate", "dst_host_srv_rerror_rate",
];

pub const NETWORK_CATEGORICAL: [&str; 3] = ["protocol_type", "service", "flag"];

/// Trailing columns of a raw NSL-KDD dump, following the 41 features.
pub const NETWORK_TRAILING: [&str; 2] = [LABEL_COLUMN, "difficulty"];

pub const WEB_FEATURES: [&str; 24] = [
    "request_duration", "http_method", "user_agent_type", "url_length", "param_count",
    "special_chars_query", "content_length", "cookie_size", "referrer_type",
    "is_auth_header_present", "num_redirects", "response_code", "response_time",
    "bot_score", "ip_reputation", "geo_location_id", "session_lifetime",
    "db_query_count", "file_upload_count", "api_endpoint_id", "is_ajax",
    "header_entropy", "payload_entropy", "malicious_signatures_count",
];

pub const WEB_CATEGORICAL: [&str; 3] = ["http_method", "user_agent_type", "referrer_type"];

/// Ground-truth column, optional in uploads.
pub const LABEL_COLUMN: &str = "label";

lazy_static! {
    pub static ref NETWORK_SCHEMA: Schema = Schema::new(SchemaName::Network, &NETWORK_FEATURES, &NETWORK_CATEGORICAL);
    pub static ref WEB_SCHEMA: Schema = Schema::new(SchemaName::Web, &WEB_FEATURES, &WEB_CATEGORICAL);

    /// Column names assigned positionally to headerless network dumps.
    pub static ref NETWORK_CANONICAL_COLUMNS: Vec<&'static str> = NETWORK_FEATURES.iter()
        .chain(NETWORK_TRAILING.iter())
        .copied()
        .collect();
}
