use reqwest::StatusCode;
use serde::Deserialize;

use crate::firestore::error::{
    already_exists, deadline_exceeded, failed_precondition, internal_error, invalid_argument, not_found,
    permission_denied, resource_exhausted, unauthenticated, unavailable, FirestoreError,
    FirestoreErrorCode,
};

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a failed REST response onto a Firestore error, preferring the canonical
/// status carried in the body over the HTTP status line.
pub fn map_http_error(status: StatusCode, body: &str) -> FirestoreError {
    let payload = extract_error_payload(body);
    let message = payload
        .as_ref()
        .and_then(|payload| payload.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());

    if let Some(code) = payload.as_ref().and_then(|payload| payload.status.as_deref()) {
        if let Some(code) = FirestoreErrorCode::from_canonical_status(code) {
            return FirestoreError::new(code, message);
        }
    }

    match status {
        StatusCode::BAD_REQUEST => invalid_argument(message),
        StatusCode::UNAUTHORIZED => unauthenticated(message),
        StatusCode::FORBIDDEN => permission_denied(message),
        StatusCode::NOT_FOUND => not_found(message),
        StatusCode::CONFLICT => already_exists(message),
        StatusCode::PRECONDITION_FAILED => failed_precondition(message),
        StatusCode::TOO_MANY_REQUESTS => resource_exhausted(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => deadline_exceeded(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => unavailable(message),
        status if status.is_client_error() => invalid_argument(message),
        _ => internal_error(message),
    }
}

fn extract_error_payload(body: &str) -> Option<GoogleError> {
    serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_status_wins_over_http_status() {
        let body = r#"{"error":{"code":400,"message":"no doc","status":"NOT_FOUND"}}"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, FirestoreErrorCode::NotFound);
        assert_eq!(err.message(), "no doc");
    }

    #[test]
    fn falls_back_to_http_status() {
        let err = map_http_error(StatusCode::FORBIDDEN, "not json");
        assert_eq!(err.code, FirestoreErrorCode::PermissionDenied);
        assert_eq!(err.message(), "Forbidden");
    }
}
