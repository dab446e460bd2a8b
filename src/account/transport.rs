//! Wallet API transport.
//!
//! JSON-RPC surface shared by both provisioning strategies:
//! `wallet_requestAccount`, `wallet_prepareCalls`, `wallet_sendPreparedCalls`
//! and `wallet_getCallsStatus` (EIP-5792 status codes).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::ChainConfig;
use crate::error::TransportError;
use crate::signer::decode_hex_prefixed;

pub const STATUS_PENDING: u16 = 100;
pub const STATUS_CONFIRMED: u16 = 200;
pub const STATUS_OFFCHAIN_FAILURE: u16 = 400;
pub const STATUS_REVERTED: u16 = 500;
pub const STATUS_PARTIALLY_REVERTED: u16 = 600;

/// One target-contract invocation inside a call batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Call {
    pub to: String,
    pub data: String,
    /// Hex-encoded wei amount.
    pub value: String,
}

impl Call {
    pub fn new(to: impl Into<String>, data: impl Into<String>, value: Option<u128>) -> Self {
        Self {
            to: to.into(),
            data: data.into(),
            value: format!("0x{:x}", value.unwrap_or(0)),
        }
    }
}

/// Request capabilities attached to every submitted call batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCapabilities {
    pub paymaster_service: PaymasterService,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterService {
    pub policy_id: String,
}

impl CallCapabilities {
    pub fn sponsored(policy_id: impl Into<String>) -> Self {
        Self {
            paymaster_service: PaymasterService {
                policy_id: policy_id.into(),
            },
        }
    }
}

/// A call batch prepared by the wallet API, awaiting the account's signature.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCalls {
    /// Prepared payload as returned, minus the signature request.
    pub payload: Value,
    /// Raw bytes the signer must `personal_sign`.
    pub signing_payload: Vec<u8>,
}

impl PreparedCalls {
    pub fn from_response(mut response: Value) -> Result<Self, TransportError> {
        let request = response
            .as_object_mut()
            .and_then(|obj| obj.remove("signatureRequest"))
            .ok_or_else(|| {
                TransportError::InvalidResponse("prepared calls missing signatureRequest".into())
            })?;
        let raw = request
            .get("data")
            .and_then(|data| data.get("raw").or(Some(data)))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                TransportError::InvalidResponse("signatureRequest missing raw payload".into())
            })?;
        let signing_payload = decode_hex_prefixed(raw).map_err(TransportError::InvalidResponse)?;
        Ok(Self {
            payload: response,
            signing_payload,
        })
    }

    /// Payload for `wallet_sendPreparedCalls` with the account signature attached.
    pub fn with_signature(&self, signature: &str) -> Value {
        let mut payload = self.payload.clone();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "signature".to_string(),
                json!({ "type": "secp256k1", "data": signature }),
            );
        }
        payload
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallReceipt {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Status of a submitted call batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallsStatus {
    pub status: u16,
    #[serde(default)]
    pub receipts: Vec<CallReceipt>,
}

impl CallsStatus {
    pub fn is_terminal(&self) -> bool {
        self.status >= STATUS_CONFIRMED
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_CONFIRMED
    }

    /// Chain transaction hash of the first receipt, when one exists.
    pub fn transaction_hash(&self) -> Option<&str> {
        self.receipts
            .first()
            .and_then(|receipt| receipt.transaction_hash.as_deref())
    }
}

/// Chain/wallet API seam used by account clients.
#[async_trait]
pub trait WalletTransport: Send + Sync {
    /// Create or look up the smart contract account scoped to a signer.
    async fn request_account(&self, signer_address: &str) -> Result<String, TransportError>;

    async fn prepare_calls(
        &self,
        from: &str,
        calls: &[Call],
        capabilities: &CallCapabilities,
    ) -> Result<PreparedCalls, TransportError>;

    /// Returns the call-batch identifier.
    async fn send_prepared_calls(
        &self,
        prepared: &PreparedCalls,
        signature: &str,
    ) -> Result<String, TransportError>;

    async fn get_calls_status(&self, batch_id: &str) -> Result<CallsStatus, TransportError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestAccountResult {
    account_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendPreparedCallsResult {
    #[serde(default)]
    prepared_call_ids: Vec<String>,
    #[serde(default)]
    id: Option<String>,
}

/// JSON-RPC wallet API client over HTTPS.
pub struct RpcWalletTransport {
    client: Client,
    endpoint: SecretString,
    chain_id_hex: String,
    next_id: AtomicU64,
}

impl RpcWalletTransport {
    pub fn new(
        chain: &ChainConfig,
        api_key: &SecretString,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        let endpoint = format!(
            "{}/{}",
            chain.rpc_base_url.trim_end_matches('/'),
            api_key.expose_secret()
        );
        Ok(Self {
            client,
            endpoint: SecretString::from(endpoint),
            chain_id_hex: chain.chain_id_hex(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call. The endpoint embeds the API key and is never logged.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, rpc_id = id, "wallet RPC request");

        let response = self
            .client
            .post(self.endpoint.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;
        let status = response.status();
        let payload: RpcResponse = response.json().await.map_err(|e| {
            TransportError::InvalidResponse(format!("HTTP {status}: {}", e.without_url()))
        })?;

        if let Some(error) = payload.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        payload
            .result
            .ok_or_else(|| TransportError::InvalidResponse(format!("{method}: missing result")))
    }
}

#[async_trait]
impl WalletTransport for RpcWalletTransport {
    async fn request_account(&self, signer_address: &str) -> Result<String, TransportError> {
        let result = self
            .call(
                "wallet_requestAccount",
                json!([{ "signerAddress": signer_address }]),
            )
            .await?;
        let parsed: RequestAccountResult = serde_json::from_value(result)
            .map_err(|e| TransportError::InvalidResponse(format!("wallet_requestAccount: {e}")))?;
        Ok(parsed.account_address)
    }

    async fn prepare_calls(
        &self,
        from: &str,
        calls: &[Call],
        capabilities: &CallCapabilities,
    ) -> Result<PreparedCalls, TransportError> {
        let result = self
            .call(
                "wallet_prepareCalls",
                json!([{
                    "calls": calls,
                    "from": from,
                    "chainId": self.chain_id_hex,
                    "capabilities": capabilities,
                }]),
            )
            .await?;
        PreparedCalls::from_response(result)
    }

    async fn send_prepared_calls(
        &self,
        prepared: &PreparedCalls,
        signature: &str,
    ) -> Result<String, TransportError> {
        let result = self
            .call(
                "wallet_sendPreparedCalls",
                json!([prepared.with_signature(signature)]),
            )
            .await?;
        let parsed: SendPreparedCallsResult = serde_json::from_value(result).map_err(|e| {
            TransportError::InvalidResponse(format!("wallet_sendPreparedCalls: {e}"))
        })?;
        parsed
            .prepared_call_ids
            .into_iter()
            .next()
            .or(parsed.id)
            .ok_or_else(|| {
                TransportError::InvalidResponse("wallet_sendPreparedCalls: no call id".into())
            })
    }

    async fn get_calls_status(&self, batch_id: &str) -> Result<CallsStatus, TransportError> {
        let result = self
            .call("wallet_getCallsStatus", json!([batch_id]))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| TransportError::InvalidResponse(format!("wallet_getCallsStatus: {e}")))
    }
}
