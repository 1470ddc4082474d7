pub mod privkey_provider;
pub mod service;
pub mod store;
pub mod swapper;

use bitcoin::hashes::{Hash as _, sha256};
use bitcoin::secp256k1::SecretKey;
use bitcoin::{Address, PublicKey, ScriptBuf};
use thiserror::Error;

pub const PAYMENT_HASH_LEN: usize = 32;
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Swap information known to both the payer and the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPublicInfo {
    pub payment_hash: sha256::Hash,
    pub payer_pubkey: PublicKey,
    pub service_pubkey: PublicKey,
    pub lock_time: u32,
    pub script: ScriptBuf,
    pub address: Address,
}

/// Swap information known only to the service. Persisted to the store and
/// never returned to callers.
#[derive(Clone)]
pub struct SwapPrivateInfo {
    pub service_privkey: SecretKey,
}

impl std::fmt::Debug for SwapPrivateInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapPrivateInfo")
            .field("service_privkey", &"redacted")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} length must be {expected} bytes, got {got}")]
    BadLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{field} is not a valid compressed public key")]
    BadPubKey { field: &'static str },
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("random number generator failure")]
    Rng,
    #[error("generated key is invalid: {0}")]
    InvalidKey(#[from] bitcoin::secp256k1::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("swap already exists")]
    AlreadyExists,
    #[error(transparent)]
    General(#[from] anyhow::Error),
}

/// Error taxonomy surfaced by swap registration. Conflicts look the same to
/// callers whether they were detected before or after key generation.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("swap already in progress")]
    AlreadyExists,
    #[error("failed to create service key: {0}")]
    Crypto(#[from] KeyError),
    #[error("swap storage failed: {0}")]
    Storage(#[source] anyhow::Error),
}

pub fn validate_pubkey(field: &'static str, pubkey: &[u8]) -> Result<PublicKey, ValidationError> {
    if pubkey.len() != COMPRESSED_PUBKEY_LEN {
        return Err(ValidationError::BadLength {
            field,
            expected: COMPRESSED_PUBKEY_LEN,
            got: pubkey.len(),
        });
    }

    PublicKey::from_slice(pubkey).map_err(|_| ValidationError::BadPubKey { field })
}

pub fn validate_payment_hash(payment_hash: &[u8]) -> Result<sha256::Hash, ValidationError> {
    if payment_hash.len() != PAYMENT_HASH_LEN {
        return Err(ValidationError::BadLength {
            field: "payment_hash",
            expected: PAYMENT_HASH_LEN,
            got: payment_hash.len(),
        });
    }

    sha256::Hash::from_slice(payment_hash).map_err(|_| ValidationError::BadLength {
        field: "payment_hash",
        expected: PAYMENT_HASH_LEN,
        got: payment_hash.len(),
    })
}
