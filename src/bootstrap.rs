//! Bootstrap helpers for locating wallet environment files.
//!
//! File: `~/.unified-wallet/.env` (standard dotenvy format)

use std::path::{Path, PathBuf};

/// Path to the wallet-specific `.env` file: `~/.unified-wallet/.env`.
pub fn wallet_env_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".unified-wallet")
        .join(".env")
}

/// Load `./.env` and then `~/.unified-wallet/.env`.
///
/// dotenvy never overwrites existing env vars, so the effective priority is:
///
///   explicit env vars > `./.env` > `~/.unified-wallet/.env`
pub fn load_wallet_env() {
    let _ = dotenvy::dotenv();
    load_env_file(&wallet_env_path());
}

/// Load one `.env` file if it exists. Returns whether the file was applied.
pub fn load_env_file(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match dotenvy::from_path(path) {
        Ok(()) => {
            tracing::debug!("Loaded wallet env from {}", path.display());
            true
        }
        Err(e) => {
            tracing::warn!("Failed to load {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn env_file_does_not_override_existing_vars() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "UW_BOOTSTRAP_TEST_FRESH=\"from-file\"\nUW_BOOTSTRAP_TEST_SET=from-file\n",
        )
        .expect("write env");

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::remove_var("UW_BOOTSTRAP_TEST_FRESH");
            std::env::set_var("UW_BOOTSTRAP_TEST_SET", "explicit");
        }

        assert!(load_env_file(&path));
        assert_eq!(
            std::env::var("UW_BOOTSTRAP_TEST_FRESH").as_deref(),
            Ok("from-file")
        );
        assert_eq!(
            std::env::var("UW_BOOTSTRAP_TEST_SET").as_deref(),
            Ok("explicit")
        );

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::remove_var("UW_BOOTSTRAP_TEST_FRESH");
            std::env::remove_var("UW_BOOTSTRAP_TEST_SET");
        }
    }

    #[test]
    fn missing_env_file_is_ignored() {
        let dir = tempdir().expect("tempdir");
        assert!(!load_env_file(&dir.path().join("absent.env")));
        assert!(wallet_env_path().ends_with(".unified-wallet/.env"));
    }
}
