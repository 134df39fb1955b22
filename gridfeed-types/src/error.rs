use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`FetchError`], used for messaging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// DNS, connect, transport, or timeout failure.
    Network,
    /// Credential invalid or plan-restricted (401/403).
    Auth,
    /// Throttled by the provider (429) or by the local quota.
    RateLimit,
    /// Payload present but structurally wrong.
    Protocol,
    /// The provider's own error or acknowledgement document.
    Provider,
    /// The connector does not implement the requested role.
    Unsupported,
}

/// Typed failure of a single connector call.
///
/// Every variant is absorbed by the aggregator and converted into a synthetic
/// result; none of these reach the caller as a hard error.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    /// Transport-level failure or a 5xx status.
    #[error("{provider}: network error: {message}")]
    Network {
        /// Connector name.
        provider: String,
        /// Human-readable detail.
        message: String,
    },

    /// The call exceeded its time budget.
    #[error("{provider}: timed out after {after_ms} ms")]
    Timeout {
        /// Connector name.
        provider: String,
        /// Budget that elapsed, in milliseconds.
        after_ms: u64,
    },

    /// 401 or 403.
    #[error("{provider}: authorization failed (status {status})")]
    Auth {
        /// Connector name.
        provider: String,
        /// HTTP status returned.
        status: u16,
    },

    /// 429, or a local request budget was exhausted.
    #[error("{provider}: rate limited")]
    RateLimit {
        /// Connector name.
        provider: String,
        /// Suggested wait before retrying, if known.
        retry_after_ms: Option<u64>,
    },

    /// Malformed or unexpected payload.
    #[error("{provider}: protocol error: {message}")]
    Protocol {
        /// Connector name.
        provider: String,
        /// Human-readable detail.
        message: String,
    },

    /// The provider answered with its own error document.
    #[error("{provider}: provider error: {reason}")]
    Provider {
        /// Connector name.
        provider: String,
        /// Reason text reported by the provider.
        reason: String,
    },

    /// The connector does not implement the requested role.
    #[error("{provider}: unsupported capability: {capability}")]
    Unsupported {
        /// Connector name.
        provider: String,
        /// Capability label.
        capability: String,
    },
}

impl FetchError {
    /// Helper: build a `Network` error.
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Helper: build a `Timeout` error.
    pub fn timeout(provider: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Helper: build an `Auth` error.
    pub fn auth(provider: impl Into<String>, status: u16) -> Self {
        Self::Auth {
            provider: provider.into(),
            status,
        }
    }

    /// Helper: build a `RateLimit` error.
    pub fn rate_limit(provider: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        Self::RateLimit {
            provider: provider.into(),
            retry_after_ms,
        }
    }

    /// Helper: build a `Protocol` error.
    pub fn protocol(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Helper: build a `Provider` error.
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Helper: build an `Unsupported` error.
    pub fn unsupported(provider: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::Unsupported {
            provider: provider.into(),
            capability: capability.into(),
        }
    }

    /// Classify a non-success HTTP status.
    ///
    /// 401/403 map to `Auth`, 429 to `RateLimit`, 5xx to `Network`, and any
    /// other non-2xx status to `Provider` carrying a truncated body.
    pub fn from_status(provider: impl Into<String>, status: u16, body: &str) -> Self {
        let provider = provider.into();
        match status {
            401 | 403 => Self::auth(provider, status),
            429 => Self::rate_limit(provider, None),
            500..=599 => Self::network(provider, format!("server error (status {status})")),
            _ => {
                let snippet: String = body.chars().take(200).collect();
                Self::provider(provider, format!("status {status}: {snippet}"))
            }
        }
    }

    /// Coarse classification.
    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => FetchErrorKind::Network,
            Self::Auth { .. } => FetchErrorKind::Auth,
            Self::RateLimit { .. } => FetchErrorKind::RateLimit,
            Self::Protocol { .. } => FetchErrorKind::Protocol,
            Self::Provider { .. } => FetchErrorKind::Provider,
            Self::Unsupported { .. } => FetchErrorKind::Unsupported,
        }
    }

    /// Connector name the error is attributed to.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        match self {
            Self::Network { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Auth { provider, .. }
            | Self::RateLimit { provider, .. }
            | Self::Protocol { provider, .. }
            | Self::Provider { provider, .. }
            | Self::Unsupported { provider, .. } => provider,
        }
    }

    /// Returns true if a later retry could plausibly succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            FetchErrorKind::Network | FetchErrorKind::RateLimit
        )
    }
}

/// Caller-visible error of the orchestrator itself.
///
/// Connector failures never appear here; they are converted into synthetic
/// data with provenance attached.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GridfeedError {
    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The site id is not in the registry.
    #[error("unknown site: {id}")]
    UnknownSite {
        /// Requested id.
        id: String,
    },

    /// The orchestrator was built without any connectors and synthesis is not forced.
    #[error("no connectors registered")]
    NoConnectors,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GridfeedError {
    /// Helper: build an `UnknownSite` error.
    pub fn unknown_site(id: impl Into<String>) -> Self {
        Self::UnknownSite { id: id.into() }
    }
}
