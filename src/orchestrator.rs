//! Unified wallet orchestrator.
//!
//! One long-lived context object per session. It resolves the active signer
//! across both credential backends, provisions exactly one account client per
//! signer identity, exposes backend-agnostic operations against that client,
//! and publishes a recomputed [`SessionSnapshot`] after every change.

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use crate::account::{
    AccountClient, Call, ClientFactory, ProvisionedAccount, RpcClientFactory, provision,
};
use crate::backend::{
    AuthBackend, AuthSurface, EmbeddedCredentialService, ExternalWalletConnector,
};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::resolver::{ActiveSigner, BackendStatus, resolve, should_close_auth_surface};
use crate::session::{Begin, Generation, SessionSnapshot, SetupGuard, SetupState};
use crate::signer::{decode_hex_prefixed, normalize_address};

/// Host-provided credential backends.
#[derive(Clone)]
pub struct Collaborators {
    pub embedded: Arc<dyn EmbeddedCredentialService>,
    pub external: Arc<dyn ExternalWalletConnector>,
    pub auth_surface: Option<Arc<dyn AuthSurface>>,
}

/// One call in a sponsored transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsoredTransaction {
    pub target: String,
    pub data: String,
    /// Wei to send; zero when absent.
    pub value: Option<u128>,
}

impl SponsoredTransaction {
    pub fn new(target: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            data: data.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = Some(value);
        self
    }

    fn to_call(&self) -> Result<Call, WalletError> {
        let target =
            normalize_address(&self.target).ok_or_else(|| WalletError::InvalidRequest {
                reason: format!("target '{}' is not a 20-byte hex address", self.target),
            })?;
        decode_hex_prefixed(&self.data).map_err(|e| WalletError::InvalidRequest {
            reason: format!("call data: {e}"),
        })?;
        Ok(Call::new(target, self.data.trim(), self.value))
    }
}

/// What a single [`WalletOrchestrator::evaluate`] pass did.
#[derive(Debug)]
pub enum Evaluation {
    /// No usable signer; state was forced to Idle.
    NoActiveSigner,
    /// Another pass already owns provisioning for this signer.
    InProgress,
    /// The account client for this signer already exists.
    Ready,
    /// This pass started provisioning.
    Provisioning {
        generation: Generation,
        task: JoinHandle<()>,
    },
}

#[derive(Debug, Default)]
struct OrchestratorState {
    guard: SetupGuard,
    account: Option<ProvisionedAccount>,
    error: Option<String>,
}

impl OrchestratorState {
    fn clear(&mut self) {
        self.guard.reset();
        self.account = None;
        self.error = None;
    }
}

pub struct WalletOrchestrator {
    config: WalletConfig,
    collaborators: Collaborators,
    factory: Arc<dyn ClientFactory>,
    state: RwLock<OrchestratorState>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl WalletOrchestrator {
    pub fn new(config: WalletConfig, collaborators: Collaborators) -> Arc<Self> {
        let factory = Arc::new(RpcClientFactory::new(config.request_timeout));
        Self::with_client_factory(config, collaborators, factory)
    }

    pub fn with_client_factory(
        config: WalletConfig,
        collaborators: Collaborators,
        factory: Arc<dyn ClientFactory>,
    ) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::disconnected());
        Arc::new(Self {
            config,
            collaborators,
            factory,
            state: RwLock::new(OrchestratorState::default()),
            snapshot_tx,
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Re-read both backends and react: close the auth surface, force Idle
    /// when no signer is usable, or start provisioning for a new signer.
    ///
    /// Safe to call on every authentication-status change; concurrent calls
    /// start at most one provisioning task per signer identity.
    pub async fn evaluate(self: &Arc<Self>) -> Evaluation {
        let status = self.capture();
        self.notify_auth_surface(&status);
        let resolution = resolve(&status);

        let mut state = self.state.write().await;
        let Some(active) = resolution.active else {
            if state.guard.identity().is_some() || state.account.is_some() {
                tracing::info!(
                    backend = ?resolution.backend,
                    previous_state = %state.guard.state(),
                    "No active signer; clearing wallet account"
                );
                state.clear();
            }
            self.publish(&state);
            return Evaluation::NoActiveSigner;
        };

        let identity = active.identity();
        let evaluation = match state.guard.begin(&identity) {
            Begin::AlreadyInProgress => Evaluation::InProgress,
            Begin::AlreadyDone => Evaluation::Ready,
            Begin::Started {
                generation,
                superseded,
            } => {
                if superseded {
                    tracing::info!(
                        backend = %identity.backend,
                        signer = %identity.address,
                        "Active signer changed; discarding previous wallet account"
                    );
                }
                state.account = None;
                state.error = None;
                tracing::info!(
                    backend = %identity.backend,
                    signer = %identity.address,
                    generation = generation.get(),
                    "Wallet account provisioning started"
                );

                let svc = Arc::clone(self);
                let task = tokio::spawn(async move {
                    svc.run_provision(generation, active).await;
                });
                Evaluation::Provisioning { generation, task }
            }
        };
        self.publish(&state);
        evaluation
    }

    async fn run_provision(self: Arc<Self>, generation: Generation, active: ActiveSigner) {
        let result = provision(self.factory.as_ref(), &self.config, &active).await;

        let mut state = self.state.write().await;
        if !state.guard.is_current(generation) {
            tracing::debug!(
                backend = %active.backend,
                generation = generation.get(),
                "Discarding superseded provisioning result"
            );
            return;
        }

        match result {
            Ok(account) => {
                state.guard.complete(generation);
                tracing::info!(
                    backend = %active.backend,
                    signer = %active.address(),
                    account = %account.address(),
                    kind = account.kind().as_str(),
                    generation = generation.get(),
                    "Wallet account provisioned"
                );
                state.account = Some(account);
                state.error = None;
            }
            Err(err) => {
                state.guard.fail(generation);
                tracing::warn!(
                    backend = %active.backend,
                    signer = %active.address(),
                    code = err.code(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "Wallet account provisioning failed"
                );
                state.account = None;
                state.error = Some(err.to_string());
            }
        }
        self.publish(&state);
    }

    /// Sign `message` with the provisioned account's signer.
    pub async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let client = self.ready_client().await?;
        client.inner().sign_message(message).await
    }

    /// Submit one sponsored call and wait for it to confirm. Returns the chain
    /// transaction hash, or the call-batch id when no hash is reported.
    pub async fn send_sponsored_transaction(
        &self,
        transaction: SponsoredTransaction,
    ) -> Result<String, WalletError> {
        self.send_sponsored_calls(std::slice::from_ref(&transaction)).await
    }

    /// Submit several calls as one sponsored batch.
    pub async fn send_sponsored_calls(
        &self,
        transactions: &[SponsoredTransaction],
    ) -> Result<String, WalletError> {
        let client = self.ready_client().await?;
        if transactions.is_empty() {
            return Err(WalletError::InvalidRequest {
                reason: "at least one call is required".to_string(),
            });
        }
        let calls = transactions
            .iter()
            .map(SponsoredTransaction::to_call)
            .collect::<Result<Vec<_>, _>>()?;

        let batch_id = client.inner().send_calls(&calls).await?;
        tracing::info!(
            account = %client.address(),
            batch_id = %batch_id,
            calls = calls.len(),
            "Sponsored call batch submitted"
        );

        let status = client
            .inner()
            .wait_for_calls_status(
                &batch_id,
                self.config.confirmation_timeout,
                self.config.status_poll_interval,
            )
            .await
            .inspect_err(|err| {
                tracing::warn!(
                    batch_id = %batch_id,
                    error = %err,
                    "Sponsored call batch not confirmed"
                );
            })?;
        if !status.is_success() {
            tracing::warn!(
                batch_id = %batch_id,
                status = status.status,
                "Sponsored call batch failed"
            );
            return Err(WalletError::CallFailed {
                id: batch_id,
                status: status.status,
            });
        }

        let reference = status
            .transaction_hash()
            .map(str::to_string)
            .unwrap_or(batch_id);
        tracing::info!(
            account = %client.address(),
            reference = %reference,
            "Sponsored call batch confirmed"
        );
        Ok(reference)
    }

    /// Terminate the active backend's session, then clear the account and
    /// force Idle whether or not the backend call succeeded.
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        let backend = resolve(&self.capture()).backend;
        let result = match backend {
            Some(AuthBackend::Embedded) => self.collaborators.embedded.logout().await,
            Some(AuthBackend::External) => self.collaborators.external.disconnect().await,
            None => Ok(()),
        };

        let mut state = self.state.write().await;
        state.clear();
        self.publish(&state);
        drop(state);

        match (backend, result) {
            (Some(backend), Err(source)) => {
                tracing::warn!(backend = %backend, error = %source, "Backend disconnect failed");
                Err(WalletError::Disconnect { backend, source })
            }
            (backend, _) => {
                tracing::info!(backend = ?backend, "Wallet disconnected");
                Ok(())
            }
        }
    }

    /// Recompute and publish the snapshot without changing any state.
    pub async fn invalidate(&self) {
        let state = self.state.read().await;
        self.publish(&state);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn setup_state(&self) -> SetupState {
        self.state.read().await.guard.state()
    }

    /// The provisioned client, once setup is done.
    pub async fn account_client(&self) -> Option<AccountClient> {
        self.ready_client().await.ok()
    }

    pub fn transaction_url(&self, tx_hash: &str) -> String {
        self.config.chain.transaction_url(tx_hash)
    }

    async fn ready_client(&self) -> Result<AccountClient, WalletError> {
        let state = self.state.read().await;
        match (state.guard.state(), &state.account) {
            (SetupState::Done, Some(account)) => Ok(account.client.clone()),
            _ => Err(WalletError::NotReady),
        }
    }

    fn capture(&self) -> BackendStatus {
        BackendStatus::capture(
            self.collaborators.embedded.as_ref(),
            self.collaborators.external.as_ref(),
        )
    }

    fn notify_auth_surface(&self, status: &BackendStatus) {
        let Some(surface) = &self.collaborators.auth_surface else {
            return;
        };
        if should_close_auth_surface(status, surface.is_open()) {
            tracing::debug!("External wallet connected; closing auth surface");
            surface.close();
        }
    }

    fn publish(&self, state: &OrchestratorState) {
        let status = self.capture();
        let resolution = resolve(&status);

        // Only show the guard's progress when it belongs to the signer the
        // backends currently report.
        let current = resolution
            .active
            .as_ref()
            .map(ActiveSigner::identity)
            .is_some_and(|identity| state.guard.identity() == Some(&identity));
        let (setup_state, account) = if current {
            (
                state.guard.state(),
                state.account.as_ref().map(ProvisionedAccount::address),
            )
        } else {
            (SetupState::Idle, None)
        };

        let next = SessionSnapshot::derive(
            &status,
            &resolution,
            setup_state,
            account,
            state.error.as_deref(),
        );
        self.snapshot_tx.send_if_modified(|snapshot| {
            if *snapshot == next {
                return false;
            }
            *snapshot = next;
            true
        });
    }
}
