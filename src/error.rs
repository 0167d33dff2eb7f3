use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A single request-field constraint violation.
///
/// Validation collects every violation before failing, so callers can surface
/// the full list to the user instead of fixing fields one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the offending request field.
    pub field: &'static str,
    /// Human-readable description of the constraint that was broken.
    pub message: String,
}

impl Violation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Aggregates every failure mode exposed by the unified client.
///
/// Callers can match on the specific variant to decide whether to retry, fall
/// back to another provider, or surface an actionable message to the user
/// interface. The crate itself never retries: `Argument`, `Validation` and
/// `Config` are deterministic local failures, while the vendor-origin variants
/// (see [`NexusError::is_provider_fault`]) are handed to the caller unwrapped.
#[derive(Debug, Error)]
pub enum NexusError {
    /// A caller-supplied argument is unusable (blank or unknown provider name,
    /// missing file path).
    #[error("invalid argument: {message}")]
    Argument { message: String },
    /// One or more request fields violate their constraints; every violation
    /// is reported together.
    #[error("invalid request: {}", format_violations(.violations))]
    Validation { violations: Vec<Violation> },
    /// Raised when validating settings at factory construction fails.
    #[error("invalid configuration for {field}: {reason}")]
    Config {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Reports invalid or missing credentials.
    #[error("auth failure: {message}")]
    Auth { message: String },
    /// Indicates that the provider throttled the request.
    #[error("rate limited: {message}")]
    RateLimit {
        /// Raw message returned by the upstream provider.
        message: String,
        /// Optional wait duration suggested by the provider before retrying.
        retry_after: Option<Duration>,
    },
    /// Wraps provider-defined errors that cannot be classified further.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Name of the provider, such as `openai_chat`.
        provider: &'static str,
        /// Human-readable error message returned by the provider.
        message: String,
    },
    /// Declares that a capability is not supported by the selected provider.
    #[error("feature unsupported by {provider}: {feature}")]
    UnsupportedFeature {
        provider: &'static str,
        feature: &'static str,
    },
    /// Surfaces cancellations triggered explicitly by the caller.
    #[error("request cancelled: {message}")]
    Cancelled { message: String },
}

impl NexusError {
    /// Creates a [`NexusError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_llm::error::NexusError;
    ///
    /// let err = NexusError::transport("dns lookup failed");
    /// assert!(matches!(err, NexusError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a [`NexusError::Provider`] with the given provider name and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_llm::error::NexusError;
    ///
    /// let err = NexusError::provider("openai_chat", "bad JSON payload");
    /// assert!(matches!(err, NexusError::Provider { provider: "openai_chat", .. }));
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Creates a [`NexusError::Argument`] from a textual description.
    pub fn argument<T: Into<String>>(message: T) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// Creates a [`NexusError::Config`] for the named settings field.
    pub fn config<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`NexusError::Cancelled`] describing who aborted the call.
    pub fn cancelled<T: Into<String>>(message: T) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Builds a [`NexusError::Validation`] from collected violations.
    pub fn validation(violations: Vec<Violation>) -> Self {
        Self::Validation { violations }
    }

    /// Returns `true` when the error originated in the vendor transport or
    /// API rather than in this crate's own pre-flight checks.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_llm::error::NexusError;
    ///
    /// assert!(NexusError::transport("timed out").is_provider_fault());
    /// assert!(!NexusError::argument("blank name").is_provider_fault());
    /// ```
    pub fn is_provider_fault(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Auth { .. }
                | Self::RateLimit { .. }
                | Self::Provider { .. }
        )
    }
}
