//! Account-bound smart wallet client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::account::transport::{Call, CallCapabilities, CallsStatus, WalletTransport};
use crate::error::{TransportError, WalletError};
use crate::signer::SignerHandle;

/// Low-level client over one transport and one signer.
///
/// A client without an account can only request one; operations that submit
/// or sign require the account to be bound.
#[derive(Clone)]
pub struct SmartWalletClient {
    transport: Arc<dyn WalletTransport>,
    signer: SignerHandle,
    policy_id: String,
    account: Option<String>,
}

impl SmartWalletClient {
    pub fn new(
        transport: Arc<dyn WalletTransport>,
        signer: SignerHandle,
        policy_id: impl Into<String>,
        account: Option<String>,
    ) -> Self {
        Self {
            transport,
            signer,
            policy_id: policy_id.into(),
            account,
        }
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn signer_address(&self) -> &str {
        self.signer.address()
    }

    pub fn policy_id(&self) -> &str {
        &self.policy_id
    }

    /// Same transport, signer and policy, bound to `account`.
    pub fn bind(&self, account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            ..self.clone()
        }
    }

    /// Ask the wallet API for the account scoped to this client's signer.
    pub async fn request_account(&self) -> Result<String, TransportError> {
        self.transport.request_account(self.signer.address()).await
    }

    pub async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        self.bound_account()?;
        Ok(self.signer.sign_message(message.as_bytes()).await?)
    }

    /// Prepare, sign and submit a sponsored call batch. Returns the batch id.
    pub async fn send_calls(&self, calls: &[Call]) -> Result<String, WalletError> {
        let account = self.bound_account()?;
        let capabilities = CallCapabilities::sponsored(self.policy_id.clone());
        let prepared = self
            .transport
            .prepare_calls(account, calls, &capabilities)
            .await
            .map_err(WalletError::Submission)?;
        let signature = self.signer.sign_message(&prepared.signing_payload).await?;
        self.transport
            .send_prepared_calls(&prepared, &signature)
            .await
            .map_err(WalletError::Submission)
    }

    /// Poll until the batch reaches a terminal status or `timeout` elapses.
    pub async fn wait_for_calls_status(
        &self,
        batch_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<CallsStatus, WalletError> {
        tokio::time::timeout(timeout, self.poll_until_terminal(batch_id, poll_interval))
            .await
            .map_err(|_| WalletError::ConfirmationTimeout {
                id: batch_id.to_string(),
                timeout,
            })?
    }

    async fn poll_until_terminal(
        &self,
        batch_id: &str,
        poll_interval: Duration,
    ) -> Result<CallsStatus, WalletError> {
        loop {
            let status = self
                .transport
                .get_calls_status(batch_id)
                .await
                .map_err(WalletError::Confirmation)?;
            if status.is_terminal() {
                return Ok(status);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    fn bound_account(&self) -> Result<&str, WalletError> {
        self.account.as_deref().ok_or(WalletError::NotReady)
    }
}

impl fmt::Debug for SmartWalletClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartWalletClient")
            .field("signer", &self.signer.address())
            .field("policy_id", &self.policy_id)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// How the account address relates to the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    /// The signer's own address, upgraded by delegation.
    Delegated,
    /// A smart contract account assigned by the wallet API.
    ContractAccount,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delegated => "delegated",
            Self::ContractAccount => "contract_account",
        }
    }
}

/// The session's account-bound client.
#[derive(Debug, Clone)]
pub struct AccountClient {
    inner: SmartWalletClient,
    address: String,
    kind: AccountKind,
}

impl AccountClient {
    pub(crate) fn new(inner: SmartWalletClient, address: String, kind: AccountKind) -> Self {
        Self {
            inner,
            address,
            kind,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn signer_address(&self) -> &str {
        self.inner.signer_address()
    }

    pub fn inner(&self) -> &SmartWalletClient {
        &self.inner
    }
}
