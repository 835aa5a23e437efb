use crate::dataset::Dataset;
use crate::schema::{NETWORK_FEATURES, SchemaName, WEB_FEATURES};

/// Guess at why an upload lacks required columns. Rules are tried in order; the first whose
/// target matches and whose marker columns appear in the dataset wins.
pub struct HintRule {
    /// Schema being validated against, `None` for any.
    pub target: Option<SchemaName>,
    /// Any one of these columns triggers the rule.
    pub markers: &'static [&'static str],
    pub hint: &'static str,
}

impl HintRule {
    pub fn applies(&self, target: SchemaName, dataset: &Dataset) -> bool {
        self.target.map_or(true, |t| t == target)
            && self.markers.iter().any(|m| dataset.has_column(m))
    }
}

pub const HINT_RULES: [HintRule; 3] = [
    HintRule {
        target: Some(SchemaName::Web),
        markers: &[NETWORK_FEATURES[0]],
        hint: "It looks like you uploaded a Network CSV to the Web module. Please switch to Network Analysis.",
    },
    HintRule {
        target: Some(SchemaName::Network),
        markers: &[WEB_FEATURES[0]],
        hint: "It looks like you uploaded a Web CSV to the Network module. Please switch to Web Analysis.",
    },
    HintRule {
        target: None,
        markers: &["Flow Duration", "Dst Port"],
        hint: "It looks like you are uploading a raw CIC-IDS2017 dataset. Only the bundled demo files \
               ('demo_network.csv', 'demo_web.csv') are supported.",
    },
];

pub fn hint_for(target: SchemaName, dataset: &Dataset) -> Option<&'static str> {
    HINT_RULES.iter()
        .find(|rule| rule.applies(target, dataset))
        .map(|rule| rule.hint)
}
