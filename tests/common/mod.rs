//! In-memory collaborators for driving the orchestrator end to end.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use unified_wallet::account::transport::{CallReceipt, PreparedCalls, STATUS_PENDING};
use unified_wallet::account::{
    Call, CallCapabilities, CallsStatus, ClientFactory, ClientParams, SmartWalletClient,
    WalletTransport,
};
use unified_wallet::backend::{
    AuthSurface, EmbeddedCredentialService, ExternalWalletConnector, UserProfile,
};
use unified_wallet::error::{BackendError, ProvisioningError, TransportError};
use unified_wallet::orchestrator::{Collaborators, WalletOrchestrator};
use unified_wallet::{LocalSigner, SignerHandle, WalletConfig};

pub const CONTRACT_ACCOUNT: &str = "0x5CA0000000000000000000000000000000000001";

pub fn signer() -> SignerHandle {
    LocalSigner::random().expect("random signer").into_handle()
}

pub fn config() -> WalletConfig {
    WalletConfig::default().with_credentials("test-key", "policy-test")
}

#[derive(Default)]
struct EmbeddedState {
    authenticated: bool,
    signer: Option<SignerHandle>,
    user: Option<UserProfile>,
}

#[derive(Default)]
pub struct FakeEmbedded {
    state: Mutex<EmbeddedState>,
    logouts: AtomicUsize,
}

impl FakeEmbedded {
    pub fn login(&self, signer: SignerHandle, email: Option<&str>) {
        let mut state = self.state.lock().expect("lock");
        state.authenticated = true;
        state.signer = Some(signer);
        state.user = Some(UserProfile {
            user_id: Some("user-1".to_string()),
            email: email.map(str::to_string),
        });
    }

    /// Authenticated, but the signer has not been handed out yet.
    pub fn login_pending(&self) {
        let mut state = self.state.lock().expect("lock");
        state.authenticated = true;
        state.signer = None;
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddedCredentialService for FakeEmbedded {
    fn is_authenticated(&self) -> bool {
        self.state.lock().expect("lock").authenticated
    }

    fn signer(&self) -> Option<SignerHandle> {
        self.state.lock().expect("lock").signer.clone()
    }

    fn user(&self) -> Option<UserProfile> {
        self.state.lock().expect("lock").user.clone()
    }

    async fn logout(&self) -> Result<(), BackendError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().expect("lock") = EmbeddedState::default();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeExternal {
    signer: Mutex<Option<SignerHandle>>,
    disconnects: AtomicUsize,
    fail_disconnect: AtomicBool,
}

impl FakeExternal {
    pub fn connect(&self, signer: SignerHandle) {
        *self.signer.lock().expect("lock") = Some(signer);
    }

    /// The wallet dropped the connection on its own.
    pub fn disconnect_now(&self) {
        *self.signer.lock().expect("lock") = None;
    }

    pub fn fail_disconnect(&self) {
        self.fail_disconnect.store(true, Ordering::SeqCst);
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalWalletConnector for FakeExternal {
    fn is_connected(&self) -> bool {
        self.signer.lock().expect("lock").is_some()
    }

    fn address(&self) -> Option<String> {
        self.signer
            .lock()
            .expect("lock")
            .as_ref()
            .map(|signer| signer.address().to_string())
    }

    fn signer(&self) -> Option<SignerHandle> {
        self.signer.lock().expect("lock").clone()
    }

    async fn disconnect(&self) -> Result<(), BackendError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(BackendError::new("connector refused to disconnect"));
        }
        *self.signer.lock().expect("lock") = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAuthSurface {
    open: AtomicBool,
    closes: AtomicUsize,
}

impl FakeAuthSurface {
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl AuthSurface for FakeAuthSurface {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wallet API fake with call counters, scripted statuses and an optional
/// gate that holds account requests until released.
#[derive(Default)]
pub struct FakeTransport {
    account_failures: Mutex<VecDeque<TransportError>>,
    statuses: Mutex<VecDeque<CallsStatus>>,
    submissions: Mutex<Vec<(PreparedCalls, String)>>,
    prepared_calls: Mutex<Vec<Vec<Call>>>,
    gated: AtomicBool,
    gate: Notify,
    request_account_calls: AtomicUsize,
    prepare_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl FakeTransport {
    pub fn hold_account_requests(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release_account_requests(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.notify_waiters();
        self.gate.notify_one();
    }

    pub fn fail_next_account_request(&self, error: TransportError) {
        self.account_failures
            .lock()
            .expect("lock")
            .push_back(error);
    }

    pub fn push_status(&self, status: u16, tx_hash: Option<&str>) {
        self.statuses.lock().expect("lock").push_back(CallsStatus {
            status,
            receipts: vec![CallReceipt {
                transaction_hash: tx_hash.map(str::to_string),
                status: None,
            }],
        });
    }

    pub fn request_account_count(&self) -> usize {
        self.request_account_calls.load(Ordering::SeqCst)
    }

    pub fn prepare_count(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn last_submission(&self) -> Option<(PreparedCalls, String)> {
        self.submissions.lock().expect("lock").last().cloned()
    }

    pub fn last_calls(&self) -> Option<Vec<Call>> {
        self.prepared_calls.lock().expect("lock").last().cloned()
    }
}

#[async_trait]
impl WalletTransport for FakeTransport {
    async fn request_account(&self, _signer_address: &str) -> Result<String, TransportError> {
        self.request_account_calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        if let Some(error) = self.account_failures.lock().expect("lock").pop_front() {
            return Err(error);
        }
        Ok(CONTRACT_ACCOUNT.to_string())
    }

    async fn prepare_calls(
        &self,
        from: &str,
        calls: &[Call],
        capabilities: &CallCapabilities,
    ) -> Result<PreparedCalls, TransportError> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        self.prepared_calls
            .lock()
            .expect("lock")
            .push(calls.to_vec());
        PreparedCalls::from_response(json!({
            "type": "user-operation-v070",
            "data": { "sender": from, "callCount": calls.len() },
            "capabilities": capabilities,
            "signatureRequest": { "type": "personal_sign", "data": { "raw": "0xc0ffee" } }
        }))
    }

    async fn send_prepared_calls(
        &self,
        prepared: &PreparedCalls,
        signature: &str,
    ) -> Result<String, TransportError> {
        let mut submissions = self.submissions.lock().expect("lock");
        submissions.push((prepared.clone(), signature.to_string()));
        Ok(format!("0xbatch-{}", submissions.len()))
    }

    async fn get_calls_status(&self, _batch_id: &str) -> Result<CallsStatus, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(CallsStatus {
                status: STATUS_PENDING,
                receipts: Vec::new(),
            }))
    }
}

/// Client factory over a shared [`FakeTransport`] that counts constructions.
pub struct CountingFactory {
    pub transport: Arc<FakeTransport>,
    created: AtomicUsize,
}

impl CountingFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for CountingFactory {
    async fn create(&self, params: ClientParams) -> Result<SmartWalletClient, ProvisioningError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(SmartWalletClient::new(
            self.transport.clone(),
            params.signer,
            params.credentials.policy_id,
            params.account,
        ))
    }
}

pub struct Harness {
    pub orchestrator: Arc<WalletOrchestrator>,
    pub embedded: Arc<FakeEmbedded>,
    pub external: Arc<FakeExternal>,
    pub surface: Arc<FakeAuthSurface>,
    pub factory: Arc<CountingFactory>,
    pub transport: Arc<FakeTransport>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: WalletConfig) -> Self {
        let embedded = Arc::new(FakeEmbedded::default());
        let external = Arc::new(FakeExternal::default());
        let surface = Arc::new(FakeAuthSurface::default());
        let transport = Arc::new(FakeTransport::default());
        let factory = Arc::new(CountingFactory {
            transport: transport.clone(),
            created: AtomicUsize::new(0),
        });
        let orchestrator = WalletOrchestrator::with_client_factory(
            config,
            Collaborators {
                embedded: embedded.clone(),
                external: external.clone(),
                auth_surface: Some(surface.clone() as Arc<dyn AuthSurface>),
            },
            factory.clone(),
        );
        Self {
            orchestrator,
            embedded,
            external,
            surface,
            factory,
            transport,
        }
    }
}
