//! Account provisioning per backend.
//!
//! External wallets are upgraded in place: the account is the signer's own
//! address and no network round trip is needed. Embedded signers get a smart
//! contract account requested from the wallet API with a temporary client,
//! then a second client bound to the returned address.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::account::client::{AccountClient, AccountKind, SmartWalletClient};
use crate::account::transport::RpcWalletTransport;
use crate::backend::AuthBackend;
use crate::config::{ChainConfig, Credentials, WalletConfig};
use crate::error::ProvisioningError;
use crate::resolver::ActiveSigner;
use crate::signer::{SignerHandle, normalize_address};

/// Inputs for building one smart wallet client.
#[derive(Clone)]
pub struct ClientParams {
    pub chain: ChainConfig,
    pub credentials: Credentials,
    pub signer: SignerHandle,
    pub account: Option<String>,
}

/// Builds smart wallet clients. Swapped out in tests to count constructions.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(&self, params: ClientParams) -> Result<SmartWalletClient, ProvisioningError>;
}

/// Factory backed by the JSON-RPC wallet API.
#[derive(Debug, Clone)]
pub struct RpcClientFactory {
    request_timeout: Duration,
}

impl RpcClientFactory {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl ClientFactory for RpcClientFactory {
    async fn create(&self, params: ClientParams) -> Result<SmartWalletClient, ProvisioningError> {
        let transport = RpcWalletTransport::new(
            &params.chain,
            &params.credentials.api_key,
            self.request_timeout,
        )?;
        Ok(SmartWalletClient::new(
            Arc::new(transport),
            params.signer,
            params.credentials.policy_id,
            params.account,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStrategy {
    Delegated,
    ContractAccount,
}

impl ProvisioningStrategy {
    pub fn for_backend(backend: AuthBackend) -> Self {
        match backend {
            AuthBackend::External => Self::Delegated,
            AuthBackend::Embedded => Self::ContractAccount,
        }
    }
}

/// Result of a successful provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionedAccount {
    pub client: AccountClient,
    pub provisioned_at: DateTime<Utc>,
}

impl ProvisionedAccount {
    pub fn address(&self) -> &str {
        self.client.address()
    }

    pub fn kind(&self) -> AccountKind {
        self.client.kind()
    }
}

/// Provision the account for `active`. Credentials are checked before any
/// client is built.
pub async fn provision(
    factory: &dyn ClientFactory,
    config: &WalletConfig,
    active: &ActiveSigner,
) -> Result<ProvisionedAccount, ProvisioningError> {
    let credentials = config.require_credentials()?;
    let params = ClientParams {
        chain: config.chain.clone(),
        credentials,
        signer: active.signer.clone(),
        account: None,
    };

    let client = match ProvisioningStrategy::for_backend(active.backend) {
        ProvisioningStrategy::Delegated => provision_delegated(factory, params).await?,
        ProvisioningStrategy::ContractAccount => {
            provision_contract_account(factory, params).await?
        }
    };

    Ok(ProvisionedAccount {
        client,
        provisioned_at: Utc::now(),
    })
}

async fn provision_delegated(
    factory: &dyn ClientFactory,
    params: ClientParams,
) -> Result<AccountClient, ProvisioningError> {
    let address = normalize_address(params.signer.address()).ok_or_else(|| {
        ProvisioningError::InvalidAccount {
            address: params.signer.address().to_string(),
        }
    })?;
    let client = factory
        .create(ClientParams {
            account: Some(address.clone()),
            ..params
        })
        .await?;
    Ok(AccountClient::new(client, address, AccountKind::Delegated))
}

async fn provision_contract_account(
    factory: &dyn ClientFactory,
    params: ClientParams,
) -> Result<AccountClient, ProvisioningError> {
    let temporary = factory.create(params.clone()).await?;
    let returned = temporary.request_account().await?;
    let address = normalize_address(&returned)
        .ok_or(ProvisioningError::InvalidAccount { address: returned })?;

    let client = factory
        .create(ClientParams {
            account: Some(address.clone()),
            ..params
        })
        .await?;
    Ok(AccountClient::new(client, address, AccountKind::ContractAccount))
}
