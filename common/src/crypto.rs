//! Ed25519 key material for sandbox identities.
//!
//! Keys travel in the validator's text encoding: `ed25519:` followed by the
//! base58 encoding of the raw bytes. Secret keys accept both the 32-byte seed
//! form and the 64-byte expanded form (seed followed by public key) found in
//! `validator_key.json`.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix used by the text encoding of every key and signature.
pub const ED25519_PREFIX: &str = "ed25519:";

/// Error type for key parsing and key file access.
#[derive(Error, Debug)]
pub enum KeyError {
    /// Encoded key did not start with `ed25519:`.
    #[error("key is missing the `{ED25519_PREFIX}` prefix: {0}")]
    MissingPrefix(String),

    /// Base58 payload could not be decoded.
    #[error("invalid base58 in key: {0}")]
    InvalidBase58(#[from] bs58::decode::Error),

    /// Decoded payload had an unexpected size.
    #[error("invalid key length: expected 32 or 64 bytes, got {0}")]
    InvalidLength(usize),

    /// Public key bytes were not a valid curve point.
    #[error("invalid public key bytes")]
    InvalidPublicKey,

    /// Key file could not be read.
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),

    /// Key file was not valid JSON or was missing required fields.
    #[error("malformed key file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// An ed25519 public key in the validator's text encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(format!(
            "{}{}",
            ED25519_PREFIX,
            bs58::encode(key.as_bytes()).into_string()
        ))
    }

    /// Raw 32-byte representation.
    pub fn to_bytes(&self) -> Result<[u8; 32], KeyError> {
        let bytes = decode_payload(&self.0)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))
    }

    /// Verify `signature` (in `ed25519:<base58>` form) over `message`.
    pub fn verify(&self, message: &[u8], signature: &str) -> Result<bool, KeyError> {
        let key = VerifyingKey::from_bytes(&self.to_bytes()?)
            .map_err(|_| KeyError::InvalidPublicKey)?;
        let sig_bytes = decode_payload(signature)?;
        let sig_len = sig_bytes.len();
        let sig_bytes: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| KeyError::InvalidLength(sig_len))?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        Ok(key.verify_strict(message, &signature).is_ok())
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_payload(s)?;
        if bytes.len() != 32 {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        Ok(Self(s.to_string()))
    }
}

/// An ed25519 signing key pair.
///
/// Never mutated after creation; rotating a key means constructing a fresh
/// pair.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Deterministic pair from a 32-byte seed. Intended for tests.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    /// Parse a secret key in the `ed25519:<base58>` encoding.
    ///
    /// Accepts the 32-byte seed form and the 64-byte expanded form written by
    /// the validator's `init` subcommand.
    pub fn from_secret_key(encoded: &str) -> Result<Self, KeyError> {
        let bytes = decode_payload(encoded)?;
        let mut seed = [0u8; 32];
        match bytes.len() {
            32 => seed.copy_from_slice(&bytes),
            64 => seed.copy_from_slice(&bytes[..32]),
            n => return Err(KeyError::InvalidLength(n)),
        }
        Ok(Self::from_seed(seed))
    }

    /// Public half of the pair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(&self.signing.verifying_key())
    }

    /// Secret key in the 64-byte expanded text encoding.
    pub fn secret_key(&self) -> String {
        let mut expanded = Vec::with_capacity(64);
        expanded.extend_from_slice(&self.signing.to_bytes());
        expanded.extend_from_slice(self.signing.verifying_key().as_bytes());
        format!("{}{}", ED25519_PREFIX, bs58::encode(expanded).into_string())
    }

    /// Sign `message`, returning the signature in text encoding.
    pub fn sign(&self, message: &[u8]) -> String {
        let signature = self.signing.sign(message);
        format!(
            "{}{}",
            ED25519_PREFIX,
            bs58::encode(signature.to_bytes()).into_string()
        )
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // Never print secret material
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish()
    }
}

fn decode_payload(encoded: &str) -> Result<Vec<u8>, KeyError> {
    let payload = encoded
        .strip_prefix(ED25519_PREFIX)
        .ok_or_else(|| KeyError::MissingPrefix(encoded.to_string()))?;
    Ok(bs58::decode(payload).into_vec()?)
}

/// Contents of the validator's `validator_key.json`.
///
/// Only `secret_key` is required; the other fields are carried when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    /// Account the key belongs to, when recorded.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Public key in text encoding, when recorded.
    #[serde(default)]
    pub public_key: Option<String>,
    /// Secret key in text encoding.
    pub secret_key: String,
}

impl KeyFile {
    /// Read and parse a key file from disk.
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Signing pair derived from the stored secret key.
    pub fn signing_pair(&self) -> Result<KeyPair, KeyError> {
        KeyPair::from_secret_key(&self.secret_key)
    }
}
