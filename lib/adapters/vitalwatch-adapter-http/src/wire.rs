use serde::{Deserialize, Serialize};

use vitalwatch_domain::Reading;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AcknowledgeBody<'a> {
    pub acknowledged_by: &'a str,
}

/// The history endpoint answers either `{"records": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum HistoryBody {
    Bare(Vec<Reading>),
    Wrapped { records: Vec<Reading> },
}

impl HistoryBody {
    pub fn into_records(self) -> Vec<Reading> {
        match self {
            HistoryBody::Bare(records) => records,
            HistoryBody::Wrapped { records } => records,
        }
    }
}
