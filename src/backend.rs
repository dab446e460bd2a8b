//! Credential backend contracts consumed by the orchestrator.
//!
//! Both backends are external collaborators: the orchestrator only reads their
//! connection flags, borrows their signer handles, and calls their own
//! session-termination procedure on disconnect.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::signer::SignerHandle;

/// Which credential backend authenticated the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthBackend {
    /// Embedded key-custody signer (email, passkey, social login).
    Embedded,
    /// Externally connected wallet (browser extension, WalletConnect).
    External,
}

impl AuthBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::External => "external",
        }
    }
}

impl fmt::Display for AuthBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile reported by the embedded credential service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

/// Embedded key-custody credential service.
#[async_trait]
pub trait EmbeddedCredentialService: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// Signer for the authenticated user; may lag behind `is_authenticated`.
    fn signer(&self) -> Option<SignerHandle>;

    fn user(&self) -> Option<UserProfile>;

    async fn logout(&self) -> Result<(), BackendError>;
}

/// Externally connected wallet.
#[async_trait]
pub trait ExternalWalletConnector: Send + Sync {
    fn is_connected(&self) -> bool;

    fn address(&self) -> Option<String>;

    /// Network-capable signing handle; may lag behind `is_connected`.
    fn signer(&self) -> Option<SignerHandle>;

    async fn disconnect(&self) -> Result<(), BackendError>;
}

/// Pending-authentication surface (e.g. a login modal) owned by the host
/// application.
pub trait AuthSurface: Send + Sync {
    fn is_open(&self) -> bool;

    fn close(&self);
}
