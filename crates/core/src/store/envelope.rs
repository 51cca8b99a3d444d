//! Response envelopes returned by the record store.
//!
//! Every call answers with `{success, data|results, message}`. Fields the store omits
//! default to empty so an envelope with only `success` still decodes.

use super::Record;
use serde::{Deserialize, Serialize};

/// Answer to `fetchRecords`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<Record>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Answer to `getRecordById`. Older store versions omit `success` and signal a miss with
/// `data: null`, so `success` defaults to true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Record>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Per-record outcome inside a create/update/delete answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Record>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RecordOutcome {
    pub fn ok(data: Option<Record>) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Answer to `createRecord`, `updateRecord` and `deleteRecord`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<RecordOutcome>>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MutationResponse {
    pub fn with_results(results: Vec<RecordOutcome>) -> Self {
        Self {
            success: true,
            results: Some(results),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            results: None,
            message: Some(message.into()),
        }
    }
}

fn default_true() -> bool {
    true
}
