//! Error body returned by the stream API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by the stream API for any non-success status.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. `chat_disabled`, `not_found`).
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details about the error.
    #[serde(default)]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Creates an error body carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches a machine-readable code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attaches free-form details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Best-effort decode of a response body; falls back to the raw text so a
    /// proxy's HTML error page still yields a readable message.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                Self::new("empty error response")
            } else {
                Self::new(trimmed)
            }
        })
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "[{code}] ")?;
        }
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ErrorResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_display_with_code_and_details() {
        let error = ErrorResponse::new("chat is off")
            .with_code("chat_disabled")
            .with_details("subject paused by host");
        assert_eq!(
            error.to_string(),
            "[chat_disabled] chat is off: subject paused by host"
        );
    }

    #[test]
    fn test_error_response_display_plain() {
        assert_eq!(ErrorResponse::new("Simple error").to_string(), "Simple error");
    }

    #[test]
    fn test_error_response_missing_optional_fields() {
        let error: ErrorResponse = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert_eq!(error, ErrorResponse::new("boom"));
    }

    #[test]
    fn test_from_body_falls_back_to_text() {
        let error = ErrorResponse::from_body("<html>bad gateway</html>\n");
        assert_eq!(error.message, "<html>bad gateway</html>");

        let empty = ErrorResponse::from_body("   ");
        assert_eq!(empty.message, "empty error response");
    }

    #[test]
    fn test_from_body_decodes_json() {
        let error =
            ErrorResponse::from_body(r#"{"code":"not_found","message":"no such message"}"#);
        assert_eq!(error.code.as_deref(), Some("not_found"));
        assert_eq!(error.message, "no such message");
    }
}
