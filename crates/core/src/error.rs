use ward_types::RecordId;

/// Coarse classification of a [`RecordError`], for callers that branch on the failure mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    RemoteRejected,
    PartialFailure,
    Transport,
    Malformed,
    InvalidInput,
    Conflict,
    RollbackFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::RemoteRejected => "remote_rejected",
            ErrorKind::PartialFailure => "partial_failure",
            ErrorKind::Transport => "transport",
            ErrorKind::Malformed => "malformed",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RollbackFailed => "rollback_failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{table} record {id} not found")]
    NotFound { table: &'static str, id: RecordId },
    #[error("record store rejected the request: {0}")]
    RemoteRejected(String),
    #[error(
        "{failed} of {total} records failed: {}",
        messages.join("; ")
    )]
    PartialFailure {
        failed: usize,
        total: usize,
        messages: Vec<String>,
    },
    #[error("record store unreachable: {0}")]
    Transport(String),
    #[error("malformed record store response: {0}")]
    Malformed(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("operation failed and rollback also failed: op={source}; rollback={rollback}")]
    RollbackFailed {
        #[source]
        source: Box<RecordError>,
        rollback: Box<RecordError>,
    },
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordError::NotFound { .. } => ErrorKind::NotFound,
            RecordError::RemoteRejected(_) => ErrorKind::RemoteRejected,
            RecordError::PartialFailure { .. } => ErrorKind::PartialFailure,
            RecordError::Transport(_) => ErrorKind::Transport,
            RecordError::Malformed(_) => ErrorKind::Malformed,
            RecordError::InvalidInput(_) => ErrorKind::InvalidInput,
            RecordError::Conflict(_) => ErrorKind::Conflict,
            RecordError::RollbackFailed { .. } => ErrorKind::RollbackFailed,
        }
    }

    /// Messages worth showing to a user, one per failed record where the store supplied them.
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            RecordError::PartialFailure { messages, .. } if !messages.is_empty() => {
                messages.clone()
            }
            other => vec![other.to_string()],
        }
    }
}

impl From<reqwest::Error> for RecordError {
    fn from(e: reqwest::Error) -> Self {
        RecordError::Transport(e.to_string())
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
