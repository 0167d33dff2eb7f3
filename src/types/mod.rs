//! Shared data structures modeling canonical generation requests and responses.
//!
//! These types normalize provider-specific payloads so the rest of the crate can stay
//! agnostic of individual API differences.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NexusError, Violation};

mod file;

pub use file::{FileContent, MediaType};

/// Upper bound on the prompt length, measured in characters.
pub const PROMPT_MAX_CHARS: usize = 1_000_000;
/// Inclusive bounds on `max_tokens`.
pub const MAX_TOKENS_RANGE: std::ops::RangeInclusive<u32> = 1..=1_000_000;
/// Inclusive bounds on the sampling temperature.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

/// Canonical generation request shared across all providers.
///
/// A `GenerateRequest` carries the prompt, optional tuning knobs, opaque
/// provider-specific parameters, and an ordered list of [`FileContent`]
/// attachments. Every adapter converts this one shape into its own wire
/// format, so callers never touch vendor SDKs or JSON schemas.
///
/// # Examples
///
/// ```
/// # use nexus_llm::types::GenerateRequest;
/// let request = GenerateRequest::from_prompt("Summarize Rust traits.")
///     .with_system_message("You are concise.")
///     .with_max_tokens(256)
///     .with_temperature(0.3);
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// User prompt sent to the model. Required, 1–1,000,000 characters,
    /// non-blank after trimming.
    pub prompt: String,
    /// Optional system message / instructions.
    pub system_message: Option<String>,
    /// Maximum number of output tokens; the provider's configured default
    /// applies when unset.
    pub max_tokens: Option<u32>,
    /// Sampling temperature within `0.0..=2.0`.
    pub temperature: Option<f64>,
    /// Provider-specific parameters forwarded untouched into the request body.
    #[serde(default)]
    pub additional_parameters: HashMap<String, Value>,
    /// Ordered file/media attachments included with the request.
    #[serde(default)]
    pub files: Vec<FileContent>,
}

impl GenerateRequest {
    /// Builds a minimal request around a prompt string.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the system message.
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Sets the output token ceiling.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Appends an attachment, preserving insertion order.
    pub fn with_file(mut self, file: FileContent) -> Self {
        self.files.push(file);
        self
    }

    /// Adds an opaque provider-specific parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional_parameters.insert(key.into(), value);
        self
    }

    /// Checks every field constraint and reports all violations together.
    ///
    /// Adapters call this again before translating (defense in depth), so a
    /// malformed request never reaches the network regardless of entry point.
    ///
    /// # Examples
    ///
    /// ```
    /// # use nexus_llm::types::GenerateRequest;
    /// # use nexus_llm::error::NexusError;
    /// let request = GenerateRequest {
    ///     prompt: "   ".to_string(),
    ///     temperature: Some(2.5),
    ///     ..GenerateRequest::default()
    /// };
    /// match request.validate() {
    ///     Err(NexusError::Validation { violations }) => assert_eq!(violations.len(), 2),
    ///     other => panic!("expected validation failure, got {other:?}"),
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`NexusError::Validation`] carrying one [`Violation`] per
    /// broken constraint.
    pub fn validate(&self) -> Result<(), NexusError> {
        let mut violations = Vec::new();

        if self.prompt.trim().is_empty() {
            violations.push(Violation::new(
                "prompt",
                "must not be blank or whitespace-only",
            ));
        } else if self.prompt.chars().count() > PROMPT_MAX_CHARS {
            violations.push(Violation::new(
                "prompt",
                format!("must be at most {PROMPT_MAX_CHARS} characters"),
            ));
        }

        if let Some(max_tokens) = self.max_tokens {
            if !MAX_TOKENS_RANGE.contains(&max_tokens) {
                violations.push(Violation::new(
                    "max_tokens",
                    format!(
                        "{max_tokens} is outside {}..={}",
                        MAX_TOKENS_RANGE.start(),
                        MAX_TOKENS_RANGE.end()
                    ),
                ));
            }
        }

        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || !TEMPERATURE_RANGE.contains(&temperature) {
                violations.push(Violation::new(
                    "temperature",
                    format!(
                        "{temperature} is outside {:.1}..={:.1}",
                        TEMPERATURE_RANGE.start(),
                        TEMPERATURE_RANGE.end()
                    ),
                ));
            }
        }

        for (index, file) in self.files.iter().enumerate() {
            if file.mime_type.trim().is_empty() {
                violations.push(Violation::new(
                    "files",
                    format!("attachment #{index} is missing a mime type"),
                ));
            }
            if !file.is_usable() {
                violations.push(Violation::new(
                    "files",
                    format!("attachment #{index} carries neither inline data nor a url"),
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(NexusError::validation(violations))
        }
    }
}

/// Canonical response returned by a provider adapter.
///
/// # Examples
///
/// ```
/// # use chrono::Utc;
/// # use nexus_llm::types::{GenerateResponse, UsageInfo};
/// let response = GenerateResponse {
///     content: "Hello".to_string(),
///     id: "msg_1".to_string(),
///     model: "claude-sonnet-4-5".to_string(),
///     provider: "anthropic_messages".to_string(),
///     usage: UsageInfo::with_total(12, 3, None),
///     timestamp: Utc::now(),
///     finish_reason: "end_turn".to_string(),
///     stop_sequence: None,
/// };
/// assert_eq!(response.usage.total_tokens, 15);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Generated text content.
    pub content: String,
    /// Provider-assigned response identifier, synthesized when the vendor
    /// omits one.
    pub id: String,
    /// Effective model identifier reported by the provider.
    pub model: String,
    /// Name of the adapter that produced the response, such as `openai_chat`.
    pub provider: String,
    /// Token accounting for the exchange.
    pub usage: UsageInfo,
    /// UTC capture time of the response.
    pub timestamp: DateTime<Utc>,
    /// Why the model stopped generating (vendor vocabulary, forwarded as-is).
    pub finish_reason: String,
    /// Stop sequence that terminated generation, when the vendor reports one.
    pub stop_sequence: Option<String>,
}

/// Token usage metrics collected from the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens produced in the completion.
    pub completion_tokens: u32,
    /// Total tokens across prompt and completion.
    pub total_tokens: u32,
}

impl UsageInfo {
    /// Builds usage metrics, computing the total as prompt + completion when
    /// the vendor does not report one.
    pub fn with_total(prompt_tokens: u32, completion_tokens: u32, total: Option<u32>) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: total.unwrap_or(prompt_tokens + completion_tokens),
        }
    }
}
