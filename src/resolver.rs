//! Signer resolution across the two credential backends.
//!
//! The embedded backend always wins when it reports authenticated; the
//! external connection is only used while the embedded backend is signed out.

use std::fmt;

use crate::backend::{
    AuthBackend, EmbeddedCredentialService, ExternalWalletConnector, UserProfile,
};
use crate::signer::SignerHandle;

/// Identity of one active signer; provisioning runs once per identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignerIdentity {
    pub backend: AuthBackend,
    pub address: String,
}

/// The signer the session should operate through.
#[derive(Clone)]
pub struct ActiveSigner {
    pub backend: AuthBackend,
    pub signer: SignerHandle,
}

impl ActiveSigner {
    pub fn address(&self) -> &str {
        self.signer.address()
    }

    pub fn identity(&self) -> SignerIdentity {
        SignerIdentity {
            backend: self.backend,
            address: self.address().to_ascii_lowercase(),
        }
    }
}

impl fmt::Debug for ActiveSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSigner")
            .field("backend", &self.backend)
            .field("address", &self.address())
            .finish()
    }
}

/// Point-in-time read of both backends' connection flags.
#[derive(Clone, Default)]
pub struct BackendStatus {
    pub embedded_authenticated: bool,
    pub embedded_signer: Option<SignerHandle>,
    pub embedded_user: Option<UserProfile>,
    pub external_connected: bool,
    pub external_address: Option<String>,
    pub external_signer: Option<SignerHandle>,
}

impl BackendStatus {
    pub fn capture(
        embedded: &dyn EmbeddedCredentialService,
        external: &dyn ExternalWalletConnector,
    ) -> Self {
        let embedded_authenticated = embedded.is_authenticated();
        let external_connected = external.is_connected();
        Self {
            embedded_authenticated,
            embedded_signer: embedded_authenticated.then(|| embedded.signer()).flatten(),
            embedded_user: embedded_authenticated.then(|| embedded.user()).flatten(),
            external_connected,
            external_address: external_connected.then(|| external.address()).flatten(),
            external_signer: external_connected.then(|| external.signer()).flatten(),
        }
    }
}

impl fmt::Debug for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendStatus")
            .field("embedded_authenticated", &self.embedded_authenticated)
            .field("embedded_signer", &self.embedded_signer.as_ref().map(|s| s.address()))
            .field("external_connected", &self.external_connected)
            .field("external_address", &self.external_address)
            .field("external_signer", &self.external_signer.as_ref().map(|s| s.address()))
            .finish()
    }
}

/// Outcome of one resolver evaluation.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Backend the user is connected through, even before a signer is usable.
    pub backend: Option<AuthBackend>,
    /// At most one usable `(backend, signer)` pair.
    pub active: Option<ActiveSigner>,
}

impl Resolution {
    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }
}

pub fn resolve(status: &BackendStatus) -> Resolution {
    if status.embedded_authenticated {
        // External stays suppressed while embedded is signed in, even if the
        // embedded signer is not available yet.
        return Resolution {
            backend: Some(AuthBackend::Embedded),
            active: status.embedded_signer.clone().map(|signer| ActiveSigner {
                backend: AuthBackend::Embedded,
                signer,
            }),
        };
    }

    if status.external_connected {
        return Resolution {
            backend: Some(AuthBackend::External),
            active: status.external_signer.clone().map(|signer| ActiveSigner {
                backend: AuthBackend::External,
                signer,
            }),
        };
    }

    Resolution::default()
}

/// Whether a pending authentication surface should be closed because the
/// external wallet finished connecting while embedded login was still open.
pub fn should_close_auth_surface(status: &BackendStatus, surface_open: bool) -> bool {
    surface_open && status.external_connected && !status.embedded_authenticated
}
