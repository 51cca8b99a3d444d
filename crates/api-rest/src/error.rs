//! HTTP mapping for record failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use ward_core::{ErrorKind, RecordError};

/// Error body returned by every handler: `{"error": kind, "message": text, "messages": [..]}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    messages: Vec<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: ErrorKind::InvalidInput.as_str(),
            messages: vec![message.clone()],
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Transport => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::RemoteRejected
        | ErrorKind::PartialFailure
        | ErrorKind::Malformed
        | ErrorKind::RollbackFailed => StatusCode::BAD_GATEWAY,
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        let kind = err.kind();
        Self {
            status: status_for(kind),
            kind: kind.as_str(),
            message: err.to_string(),
            messages: err.user_messages(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, kind = self.kind, "{}", self.message);
        }
        let body = json!({
            "error": self.kind,
            "message": self.message,
            "messages": self.messages,
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_core::RecordId;

    #[test]
    fn record_failures_map_to_statuses() {
        let cases = [
            (
                RecordError::NotFound {
                    table: "bed_c",
                    id: RecordId::new(3).unwrap(),
                },
                StatusCode::NOT_FOUND,
            ),
            (RecordError::Conflict("bed 3 is Occupied".into()), StatusCode::CONFLICT),
            (RecordError::Transport("timed out".into()), StatusCode::SERVICE_UNAVAILABLE),
            (RecordError::Malformed("no data".into()), StatusCode::BAD_GATEWAY),
            (RecordError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn partial_failure_keeps_per_record_messages() {
        let err = ApiError::from(RecordError::PartialFailure {
            failed: 1,
            total: 1,
            messages: vec!["ward_c is required".into()],
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.messages, vec!["ward_c is required".to_string()]);
    }
}
