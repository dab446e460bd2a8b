//! Signer capability and EIP-191 helpers.
//!
//! A [`SignerHandle`] is owned by whichever credential backend produced it;
//! the orchestrator only references it for the lifetime of the session.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::error::SignerError;

/// A capability that can produce signatures on behalf of a user.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Lowercase, 0x-prefixed EVM address of the signing key.
    fn address(&self) -> &str;

    /// Produce an EIP-191 `personal_sign` signature over `message`.
    ///
    /// Returns the 65-byte signature as 0x-prefixed hex (`r || s || v`).
    async fn sign_message(&self, message: &[u8]) -> Result<String, SignerError>;
}

pub type SignerHandle = Arc<dyn Signer>;

/// In-process secp256k1 signer, used for development and tests.
pub struct LocalSigner {
    key: SigningKey,
    address: String,
}

impl LocalSigner {
    pub fn from_hex(private_key: &str) -> Result<Self, SignerError> {
        let bytes = decode_hex_prefixed(private_key).map_err(SignerError::InvalidKey)?;
        let key =
            SigningKey::from_slice(&bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Self::from_signing_key(key)
    }

    pub fn random() -> Result<Self, SignerError> {
        Self::from_signing_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    fn from_signing_key(key: SigningKey) -> Result<Self, SignerError> {
        let address = address_from_verifying_key(key.verifying_key())?;
        Ok(Self { key, address })
    }

    pub fn into_handle(self) -> SignerHandle {
        Arc::new(self)
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<String, SignerError> {
        let prehash = hash_message(message);
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(&prehash)
            .map_err(|e| SignerError::Backend(e.to_string()))?;
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recid.to_byte() + 27);
        Ok(format!("0x{}", hex::encode(bytes)))
    }
}

/// EIP-191 `personal_sign` digest of `message`.
pub fn hash_message(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(message);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Recover the address that produced an EIP-191 signature over `message`.
pub fn recover_address(message: &[u8], signature: &str) -> Result<String, SignerError> {
    let bytes = decode_hex_prefixed(signature).map_err(SignerError::InvalidSignature)?;
    if bytes.len() != 65 {
        return Err(SignerError::InvalidSignature(
            "signature must decode to 65 bytes".to_string(),
        ));
    }

    let sig = EcdsaSignature::try_from(&bytes[..64])
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    let recovery_id = normalize_recovery_id(bytes[64])?;
    let key = VerifyingKey::recover_from_prehash(&hash_message(message), &sig, recovery_id)
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    address_from_verifying_key(&key)
}

fn normalize_recovery_id(raw: u8) -> Result<RecoveryId, SignerError> {
    let id = match raw {
        27 | 28 => raw - 27,
        0 | 1 => raw,
        _ => {
            return Err(SignerError::InvalidSignature(
                "recovery id must be 0/1 or 27/28".to_string(),
            ));
        }
    };
    RecoveryId::try_from(id)
        .map_err(|_| SignerError::InvalidSignature("recovery id is invalid".to_string()))
}

fn address_from_verifying_key(key: &VerifyingKey) -> Result<String, SignerError> {
    let encoded = key.to_encoded_point(false);
    let pubkey = encoded.as_bytes();
    if pubkey.len() != 65 || pubkey[0] != 0x04 {
        return Err(SignerError::InvalidKey(
            "unexpected public key encoding".to_string(),
        ));
    }
    let digest = Keccak256::digest(&pubkey[1..]);
    Ok(format!("0x{}", hex::encode(&digest[12..])))
}

/// Lowercase a 0x-prefixed 20-byte address, or `None` if it is malformed.
pub fn normalize_address(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let hex_part = trimmed.strip_prefix("0x")?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

/// Decode 0x-prefixed hex. An empty payload (`"0x"`) decodes to no bytes.
pub fn decode_hex_prefixed(value: &str) -> Result<Vec<u8>, String> {
    let body = value
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| "hex string must be 0x-prefixed".to_string())?;
    hex::decode(body).map_err(|e| format!("invalid hex: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn address_normalization() {
        assert_eq!(
            normalize_address("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266").as_deref(),
            Some(DEV_ADDRESS)
        );
        assert!(normalize_address("0x123").is_none());
        assert!(normalize_address("f39fd6e51aad88f6f4ce6ab8827279cfffb92266").is_none());
        assert!(normalize_address(&format!("0x{}", "z".repeat(40))).is_none());
    }

    #[test]
    fn local_signer_derives_known_address() {
        let signer = LocalSigner::from_hex(DEV_KEY).expect("dev key");
        assert_eq!(signer.address(), DEV_ADDRESS);
        assert!(LocalSigner::from_hex("0xdeadbeef").is_err());
    }

    #[tokio::test]
    async fn signature_recovers_to_signer() {
        let signer = LocalSigner::from_hex(DEV_KEY).expect("dev key");
        let signature = signer
            .sign_message(b"Hello from a smart wallet")
            .await
            .expect("sign");
        assert_eq!(signature.len(), 132);

        let recovered = recover_address(b"Hello from a smart wallet", &signature).expect("recover");
        assert_eq!(recovered, DEV_ADDRESS);

        let other = recover_address(b"tampered", &signature).expect("recover other");
        assert_ne!(other, DEV_ADDRESS);
    }

    #[test]
    fn recover_rejects_malformed_signatures() {
        assert!(recover_address(b"msg", "0xabc").is_err());
        assert!(recover_address(b"msg", &format!("0x{}", "a".repeat(130))).is_err());
        assert!(recover_address(b"msg", "no-prefix").is_err());
    }

    #[test]
    fn personal_sign_digest_matches_reference() {
        // keccak256("\x19Ethereum Signed Message:\n11hello world")
        assert_eq!(
            hex::encode(hash_message(b"hello world")),
            "d9eba16ed0ecae432b71fe008c98cc872bb4cc214d3220a36f365326cf807d68"
        );
    }
}
