use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Body returned for every submission, success or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IngestResponse {
    Success { row: u64 },
    Error { error: IngestError },
}

impl IngestResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn row(&self) -> Option<u64> {
        match self {
            Self::Success { row } => Some(*row),
            Self::Error { .. } => None,
        }
    }
}

impl From<Result<u64, IngestError>> for IngestResponse {
    fn from(value: Result<u64, IngestError>) -> Self {
        match value {
            Ok(row) => Self::Success { row },
            Err(error) => Self::Error { error },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}
