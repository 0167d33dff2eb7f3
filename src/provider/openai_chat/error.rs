use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::NexusError;

use super::provider::PROVIDER_NAME;

/// Parses error responses returned by the Chat Completions API.
///
/// Only the auth and throttling statuses are split out; every other failure,
/// including vendor-side 400s, stays a [`NexusError::Provider`] so it is never
/// confused with this crate's own pre-flight validation.
pub(crate) fn parse_openai_error(
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
        #[allow(dead_code)]
        r#type: Option<String>,
        code: Option<Value>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(code) = error.code {
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
