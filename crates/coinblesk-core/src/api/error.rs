use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{method} on {url} failed with status {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Request failed")]
    RequestFailed,

    #[error("{0}")]
    Backend(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request was discarded before it could be replayed")]
    ReplayDiscarded,

    #[error("Gave up waiting for re-authentication after {}s", .0.as_secs())]
    ReplayTimedOut(Duration),

    #[error("Evicted from the pending queue by newer requests")]
    Evicted,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build the rejection for a non-success response that was not an auth lapse.
    pub fn from_status(method: &str, url: &str, status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::Status {
            method: method.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    /// Status code carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Collapse raw HTTP failures into what the console shows a user.
    ///
    /// A JSON object body with a string `message` becomes `Backend(message)`;
    /// any other failure payload (or a transport error) becomes `RequestFailed`.
    /// Queue outcomes pass through untouched.
    pub fn normalize(self) -> Self {
        match self {
            ApiError::Status { body, .. } => {
                match serde_json::from_str::<serde_json::Value>(&body) {
                    Ok(serde_json::Value::Object(map)) => match map.get("message") {
                        Some(serde_json::Value::String(message)) if !message.is_empty() => {
                            ApiError::Backend(message.clone())
                        }
                        _ => ApiError::RequestFailed,
                    },
                    _ => ApiError::RequestFailed,
                }
            }
            ApiError::NetworkError(_) | ApiError::InvalidResponse(_) => ApiError::RequestFailed,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_error_message() {
        let err = ApiError::from_status("POST", "http://host/relation/accounts", StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(
            err.to_string(),
            "POST on http://host/relation/accounts failed with status 500"
        );
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_normalize_uses_backend_message() {
        let err = ApiError::from_status("GET", "u", StatusCode::BAD_REQUEST, r#"{"message":"Account not found"}"#);
        assert!(matches!(err.normalize(), ApiError::Backend(m) if m == "Account not found"));
    }

    #[test]
    fn test_normalize_falls_back_to_request_failed() {
        for body in ["", "not json", "[1,2]", r#"{"error":"x"}"#, r#"{"message":42}"#] {
            let err = ApiError::from_status("GET", "u", StatusCode::BAD_REQUEST, body);
            assert!(matches!(err.normalize(), ApiError::RequestFailed), "body: {}", body);
        }
    }

    #[test]
    fn test_normalize_keeps_queue_outcomes() {
        assert!(matches!(ApiError::Evicted.normalize(), ApiError::Evicted));
        assert!(matches!(ApiError::ReplayDiscarded.normalize(), ApiError::ReplayDiscarded));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated, 510 total bytes"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
