//! `unified-wallet doctor` - configuration and reachability diagnostics.
//!
//! Validates the wallet configuration and probes the wallet API so that
//! problems surface before the first provisioning attempt. Each check reports
//! pass/fail with actionable guidance on failures.

use secrecy::ExposeSecret;
use serde_json::json;

use crate::account::RpcWalletTransport;
use crate::bootstrap::wallet_env_path;
use crate::config::WalletConfig;

/// Run diagnostic checks and print results.
pub async fn run_doctor_command(strict: bool) -> anyhow::Result<()> {
    println!("Unified Wallet Doctor");
    println!("=====================\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    check("Env file", check_env_file(), &mut passed, &mut failed);

    match WalletConfig::from_env() {
        Ok(config) => {
            check(
                "Wallet API credential",
                check_api_key(&config),
                &mut passed,
                &mut failed,
            );

            check(
                "Sponsorship policy",
                check_policy_id(&config),
                &mut passed,
                &mut failed,
            );

            check(
                "Chain settings",
                check_chain(&config),
                &mut passed,
                &mut failed,
            );

            check(
                "Wallet API reachability",
                check_wallet_api_reachability(&config).await,
                &mut passed,
                &mut failed,
            );
        }
        Err(e) => check(
            "Configuration",
            CheckResult::Fail(e.to_string()),
            &mut passed,
            &mut failed,
        ),
    }

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Some checks failed. Provisioning will not succeed until they are fixed.");
        if strict {
            anyhow::bail!("doctor strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_env_file() -> CheckResult {
    let path = wallet_env_path();
    if path.exists() {
        CheckResult::Pass(format!("{}", path.display()))
    } else {
        CheckResult::Skip(format!("{} not found; using process env only", path.display()))
    }
}

fn check_api_key(config: &WalletConfig) -> CheckResult {
    match &config.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => {
            CheckResult::Pass("configured".to_string())
        }
        _ => CheckResult::Fail(
            "not set. Set WALLET_API_KEY (or ALCHEMY_API_KEY / NEXT_PUBLIC_ALCHEMY_API_KEY)"
                .to_string(),
        ),
    }
}

fn check_policy_id(config: &WalletConfig) -> CheckResult {
    match config.policy_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => CheckResult::Pass(format!("policy {id}")),
        _ => CheckResult::Fail(
            "not set. Set WALLET_POLICY_ID (or ALCHEMY_POLICY_ID / NEXT_PUBLIC_ALCHEMY_POLICY_ID)"
                .to_string(),
        ),
    }
}

fn check_chain(config: &WalletConfig) -> CheckResult {
    let chain = &config.chain;
    match url::Url::parse(&chain.rpc_base_url) {
        Ok(url) => CheckResult::Pass(format!(
            "chain {} via {}, explorer {}",
            chain.chain_id,
            url.host_str().unwrap_or("<no host>"),
            chain.explorer_base_url
        )),
        Err(e) => CheckResult::Fail(format!("WALLET_RPC_URL is invalid: {e}")),
    }
}

async fn check_wallet_api_reachability(config: &WalletConfig) -> CheckResult {
    let Some(api_key) = &config.api_key else {
        return CheckResult::Skip("no API credential configured".to_string());
    };

    let transport =
        match RpcWalletTransport::new(&config.chain, api_key, config.request_timeout) {
            Ok(transport) => transport,
            Err(e) => return CheckResult::Fail(format!("cannot construct HTTP client: {e}")),
        };

    match transport.call("eth_chainId", json!([])).await {
        Ok(value) => {
            let expected = config.chain.chain_id_hex();
            match value.as_str() {
                Some(reported) if reported.eq_ignore_ascii_case(&expected) => {
                    CheckResult::Pass(format!("reachable, chain {reported}"))
                }
                Some(reported) => CheckResult::Fail(format!(
                    "endpoint serves chain {reported}, expected {expected}"
                )),
                None => CheckResult::Fail(format!("unexpected eth_chainId result: {value}")),
            }
        }
        Err(e) => CheckResult::Fail(format!("wallet API unreachable: {e}")),
    }
}

#[cfg(test)]
fn format_result(result: &CheckResult) -> String {
    match result {
        CheckResult::Pass(s) => format!("Pass({s})"),
        CheckResult::Fail(s) => format!("Fail({s})"),
        CheckResult::Skip(s) => format!("Skip({s})"),
    }
}

#[cfg(test)]
mod tests {
    use crate::cli::doctor::*;
    use crate::config::ChainConfig;

    #[test]
    fn missing_credentials_fail() {
        let config = WalletConfig::default();
        match check_api_key(&config) {
            CheckResult::Fail(detail) => assert!(detail.contains("WALLET_API_KEY")),
            other => panic!("expected Fail, got: {}", format_result(&other)),
        }
        match check_policy_id(&config) {
            CheckResult::Fail(detail) => assert!(detail.contains("WALLET_POLICY_ID")),
            other => panic!("expected Fail, got: {}", format_result(&other)),
        }
    }

    #[test]
    fn configured_credentials_pass() {
        let config = WalletConfig::default().with_credentials("key", "policy-1");
        assert!(matches!(check_api_key(&config), CheckResult::Pass(_)));
        match check_policy_id(&config) {
            CheckResult::Pass(detail) => assert_eq!(detail, "policy policy-1"),
            other => panic!("expected Pass, got: {}", format_result(&other)),
        }
    }

    #[tokio::test]
    async fn reachability_skips_without_credential() {
        match check_wallet_api_reachability(&WalletConfig::default()).await {
            CheckResult::Skip(_) => {}
            other => panic!("expected Skip, got: {}", format_result(&other)),
        }
    }

    #[tokio::test]
    async fn reachability_compares_chain_id() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/key")
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x14a34"}"#)
            .create_async()
            .await;

        let mut config = WalletConfig::default().with_credentials("key", "policy-1");
        config.chain = ChainConfig {
            rpc_base_url: server.url(),
            ..ChainConfig::default()
        };
        match check_wallet_api_reachability(&config).await {
            CheckResult::Pass(detail) => assert!(detail.contains("0x14a34")),
            other => panic!("expected Pass, got: {}", format_result(&other)),
        }

        config.chain.chain_id = 1;
        match check_wallet_api_reachability(&config).await {
            CheckResult::Fail(detail) => assert!(detail.contains("expected 0x1")),
            other => panic!("expected Fail, got: {}", format_result(&other)),
        }
    }
}
