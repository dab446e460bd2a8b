//! Configuration for the unified wallet session.
//!
//! Settings are loaded with priority: env var > `./.env` >
//! `~/.unified-wallet/.env` > default. The API credential and sponsorship
//! policy are optional at load time; their absence only becomes an error at
//! the first provisioning attempt (see [`WalletConfig::require_credentials`]).

pub(crate) mod helpers;

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

use self::helpers::{first_non_empty_env, optional_env, parse_env};

const API_KEY_ENV: &[&str] = &[
    "WALLET_API_KEY",
    "ALCHEMY_API_KEY",
    "NEXT_PUBLIC_ALCHEMY_API_KEY",
];
const POLICY_ID_ENV: &[&str] = &[
    "WALLET_POLICY_ID",
    "ALCHEMY_POLICY_ID",
    "NEXT_PUBLIC_ALCHEMY_POLICY_ID",
];

pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84_532;
pub const DEFAULT_RPC_BASE_URL: &str = "https://api.g.alchemy.com/v2";
pub const DEFAULT_EXPLORER_BASE_URL: &str = "https://sepolia.basescan.org";
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Target chain and its wallet API / explorer endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_base_url: String,
    pub explorer_base_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: BASE_SEPOLIA_CHAIN_ID,
            rpc_base_url: DEFAULT_RPC_BASE_URL.to_string(),
            explorer_base_url: DEFAULT_EXPLORER_BASE_URL.to_string(),
        }
    }
}

impl ChainConfig {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// Block-explorer page for a confirmed transaction hash.
    pub fn transaction_url(&self, tx_hash: &str) -> String {
        format!(
            "{}/tx/{}",
            self.explorer_base_url.trim_end_matches('/'),
            tx_hash.trim()
        )
    }

    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let chain_id = parse_env(
            "WALLET_CHAIN_ID",
            BASE_SEPOLIA_CHAIN_ID,
            "must be a positive integer",
        )?;
        if chain_id == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WALLET_CHAIN_ID".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let rpc_base_url = optional_env("WALLET_RPC_URL")?
            .map(|s| helpers::normalize_env_value(&s))
            .unwrap_or_else(|| DEFAULT_RPC_BASE_URL.to_string());
        validate_http_url(&rpc_base_url, "WALLET_RPC_URL")?;

        let explorer_base_url = optional_env("WALLET_EXPLORER_URL")?
            .map(|s| helpers::normalize_env_value(&s))
            .unwrap_or_else(|| DEFAULT_EXPLORER_BASE_URL.to_string());
        validate_http_url(&explorer_base_url, "WALLET_EXPLORER_URL")?;

        Ok(Self {
            chain_id,
            rpc_base_url,
            explorer_base_url,
        })
    }
}

/// API credential and sponsorship policy, both required to provision.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: SecretString,
    pub policy_id: String,
}

/// Main configuration for the wallet session.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub api_key: Option<SecretString>,
    pub policy_id: Option<String>,
    pub chain: ChainConfig,
    /// Upper bound on waiting for a submitted call batch to reach a terminal status.
    pub confirmation_timeout: Duration,
    pub status_poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            policy_id: None,
            chain: ChainConfig::default(),
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            status_poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl WalletConfig {
    /// Load configuration from `.env` files and environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        crate::bootstrap::load_wallet_env();
        Self::resolve()
    }

    pub fn with_credentials(
        mut self,
        api_key: impl Into<String>,
        policy_id: impl Into<String>,
    ) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self.policy_id = Some(policy_id.into());
        self
    }

    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let confirmation_timeout_secs = parse_env(
            "WALLET_CONFIRMATION_TIMEOUT_SECS",
            DEFAULT_CONFIRMATION_TIMEOUT.as_secs(),
            "must be a positive integer",
        )?;
        if confirmation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WALLET_CONFIRMATION_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let poll_interval_ms = parse_env(
            "WALLET_STATUS_POLL_INTERVAL_MS",
            DEFAULT_STATUS_POLL_INTERVAL.as_millis() as u64,
            "must be a positive integer",
        )?;
        if poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WALLET_STATUS_POLL_INTERVAL_MS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let request_timeout_secs = parse_env(
            "WALLET_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
            "must be a positive integer",
        )?;

        Ok(Self {
            api_key: first_non_empty_env(API_KEY_ENV)?.map(SecretString::from),
            policy_id: first_non_empty_env(POLICY_ID_ENV)?,
            chain: ChainConfig::resolve()?,
            confirmation_timeout: Duration::from_secs(confirmation_timeout_secs),
            status_poll_interval: Duration::from_millis(poll_interval_ms),
            request_timeout: Duration::from_secs(request_timeout_secs.max(1)),
        })
    }

    /// Credentials needed to provision; missing values are a configuration
    /// defect surfaced to the caller, never retried automatically.
    pub fn require_credentials(&self) -> Result<Credentials, ConfigError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: API_KEY_ENV[0].to_string(),
                hint: format!("Set one of {}.", API_KEY_ENV.join(", ")),
            })?;
        let policy_id = self
            .policy_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: POLICY_ID_ENV[0].to_string(),
                hint: format!("Set one of {}.", POLICY_ID_ENV.join(", ")),
            })?;
        Ok(Credentials { api_key, policy_id })
    }
}

fn validate_http_url(value: &str, key: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("must be a valid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(())
}
