use std::time::Duration;

use serde::Deserialize;

use crate::error::NexusError;

use super::provider::PROVIDER_NAME;

/// Parses error responses returned by the Generative Language API.
///
/// Gemini wraps failures in a gRPC-style `{"error": {code, message, status}}`
/// envelope.
pub(crate) fn parse_gemini_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> NexusError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        status: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(code) = error.status {
                message = format!("{message} ({code})");
            }
            return match status {
                401 | 403 => NexusError::Auth { message },
                429 => NexusError::RateLimit {
                    message,
                    retry_after,
                },
                _ => NexusError::provider(PROVIDER_NAME, message),
            };
        }
    }

    NexusError::provider(PROVIDER_NAME, format!("status {status}: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grpc_style_envelopes_are_classified_by_status() {
        let body =
            r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        match parse_gemini_error(403, body, None) {
            NexusError::Auth { message } => {
                assert!(message.contains("API key not valid"));
                assert!(message.contains("PERMISSION_DENIED"));
            }
            other => panic!("expected Auth error, got {other:?}"),
        }

        let body =
            r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        match parse_gemini_error(429, body, Some(Duration::from_secs(30))) {
            NexusError::RateLimit { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(30)));
            }
            other => panic!("expected RateLimit error, got {other:?}"),
        }

        let body =
            r#"{"error": {"code": 400, "message": "Invalid JSON payload", "status": "INVALID_ARGUMENT"}}"#;
        match parse_gemini_error(400, body, None) {
            NexusError::Provider { provider, message } => {
                assert_eq!(provider, "google_gemini");
                assert!(message.contains("Invalid JSON payload"));
            }
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[test]
    fn unparsable_bodies_fall_back_to_the_raw_payload() {
        match parse_gemini_error(503, "<html>overloaded</html>", None) {
            NexusError::Provider { message, .. } => {
                assert!(message.contains("status 503"));
            }
            other => panic!("expected Provider fallback, got {other:?}"),
        }
    }
}
