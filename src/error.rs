//! Error types for the unified wallet session.
//!
//! Provisioning failures are captured into the session snapshot; operation
//! failures (`WalletError`) are returned to the caller of that operation.

use std::time::Duration;

use serde::Serialize;

use crate::backend::AuthBackend;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Wallet API transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by a signer capability.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Signature request rejected: {0}")]
    Rejected(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Signer backend failure: {0}")]
    Backend(String),
}

/// Failure reported by a credential backend's own session procedures.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct BackendError {
    pub reason: String,
}

impl BackendError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors while deriving or provisioning the smart account.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Account request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Wallet API returned an invalid account address: {address}")]
    InvalidAccount { address: String },
}

impl ProvisioningError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "provisioning.config_missing",
            Self::Transport(_) => "provisioning.transport_failed",
            Self::InvalidAccount { .. } => "provisioning.invalid_account",
        }
    }

    /// Configuration defects must be fixed externally; everything else may
    /// succeed on the next evaluation.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

/// Errors returned by the unified wallet operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet not ready")]
    NotReady,

    #[error("Invalid transaction request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Sponsored transaction submission failed: {0}")]
    Submission(#[source] TransportError),

    #[error("Call status lookup failed: {0}")]
    Confirmation(#[source] TransportError),

    #[error("Call batch {id} not confirmed within {timeout:?}")]
    ConfirmationTimeout { id: String, timeout: Duration },

    #[error("Call batch {id} failed with status {status}")]
    CallFailed { id: String, status: u16 },

    #[error("Failed to disconnect {backend} backend: {source}")]
    Disconnect {
        backend: AuthBackend,
        #[source]
        source: BackendError,
    },
}

/// Structured failure domains for callers rendering operation errors.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WalletErrorDomain {
    Session,
    Signing,
    Submission,
    Confirmation,
    Backend,
}

/// Stable, serializable view of an error for status surfaces.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WalletErrorPayload {
    pub domain: WalletErrorDomain,
    pub code: &'static str,
    pub retryable: bool,
    pub message: String,
}

impl WalletError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotReady => "wallet.not_ready",
            Self::InvalidRequest { .. } => "wallet.invalid_request",
            Self::Signing(_) => "wallet.signing_failed",
            Self::Submission(_) => "wallet.submission_failed",
            Self::Confirmation(_) => "wallet.status_lookup_failed",
            Self::ConfirmationTimeout { .. } => "wallet.confirmation_timeout",
            Self::CallFailed { .. } => "wallet.call_failed",
            Self::Disconnect { .. } => "wallet.disconnect_failed",
        }
    }

    /// Whether re-issuing the same operation could succeed. The orchestrator
    /// never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotReady
            | Self::Submission(_)
            | Self::Confirmation(_)
            | Self::ConfirmationTimeout { .. }
            | Self::Disconnect { .. } => true,
            Self::Signing(SignerError::Rejected(_)) => true,
            Self::Signing(_) | Self::InvalidRequest { .. } | Self::CallFailed { .. } => false,
        }
    }

    pub fn domain(&self) -> WalletErrorDomain {
        match self {
            Self::NotReady => WalletErrorDomain::Session,
            Self::Signing(_) => WalletErrorDomain::Signing,
            Self::InvalidRequest { .. } | Self::Submission(_) => WalletErrorDomain::Submission,
            Self::Confirmation(_) | Self::ConfirmationTimeout { .. } | Self::CallFailed { .. } => {
                WalletErrorDomain::Confirmation
            }
            Self::Disconnect { .. } => WalletErrorDomain::Backend,
        }
    }

    pub fn to_payload(&self) -> WalletErrorPayload {
        WalletErrorPayload {
            domain: self.domain(),
            code: self.code(),
            retryable: self.is_retryable(),
            message: self.to_string(),
        }
    }
}
