//! Read-only session view published to consumers.

use serde::Serialize;

use crate::backend::AuthBackend;
use crate::resolver::{BackendStatus, Resolution};
use crate::session::guard::SetupState;

/// How the user signed in, as shown to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    Email,
    PasskeyOrSocial,
    ExternalWallet,
    #[default]
    NotConnected,
}

impl LoginMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::PasskeyOrSocial => "Passkey / Social",
            Self::ExternalWallet => "External Wallet",
            Self::NotConnected => "Not connected",
        }
    }
}

impl std::fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// True iff a backend is active, whether or not provisioning finished.
    pub connected: bool,
    pub backend: Option<AuthBackend>,
    pub account_address: Option<String>,
    pub signer_address: Option<String>,
    pub login_method: LoginMethod,
    pub email: Option<String>,
    /// True only while provisioning is in progress.
    pub loading: bool,
    /// Last provisioning error; operation errors are never stored here.
    pub error: Option<String>,
    pub setup_state: SetupState,
}

impl SessionSnapshot {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Recompute the view from its inputs. Never mutated in place.
    pub fn derive(
        status: &BackendStatus,
        resolution: &Resolution,
        setup_state: SetupState,
        account_address: Option<&str>,
        error: Option<&str>,
    ) -> Self {
        let Some(backend) = resolution.backend else {
            return Self {
                error: error.map(str::to_string),
                ..Self::disconnected()
            };
        };

        let (signer_address, login_method, email) = match backend {
            AuthBackend::Embedded => {
                let email = status
                    .embedded_user
                    .as_ref()
                    .and_then(|user| user.email.clone());
                let method = if email.is_some() {
                    LoginMethod::Email
                } else {
                    LoginMethod::PasskeyOrSocial
                };
                let signer = status
                    .embedded_signer
                    .as_ref()
                    .map(|signer| signer.address().to_string());
                (signer, method, email)
            }
            AuthBackend::External => {
                let signer = status.external_address.clone().or_else(|| {
                    status
                        .external_signer
                        .as_ref()
                        .map(|signer| signer.address().to_string())
                });
                (signer, LoginMethod::ExternalWallet, None)
            }
        };

        let account_address = match setup_state {
            SetupState::Done => account_address.map(str::to_string),
            SetupState::Idle | SetupState::InProgress => None,
        };

        Self {
            connected: true,
            backend: Some(backend),
            account_address,
            signer_address,
            login_method,
            email,
            loading: setup_state == SetupState::InProgress,
            error: error.map(str::to_string),
            setup_state,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.setup_state == SetupState::Done && self.account_address.is_some()
    }
}
