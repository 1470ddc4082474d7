use bitcoin::secp256k1::SecretKey;
use ring::rand::{SecureRandom as _, SystemRandom};

use super::KeyError;

/// Source of fresh service keys. Every swap gets its own key; providers must
/// never hand out the same key twice.
pub trait PrivateKeyProvider: Send + Sync {
    fn new_private_key(&self) -> Result<SecretKey, KeyError>;
}

#[derive(Debug)]
pub struct RandomPrivateKeyProvider {
    rnd: SystemRandom,
}

impl RandomPrivateKeyProvider {
    pub fn new() -> Self {
        Self {
            rnd: SystemRandom::new(),
        }
    }
}

impl Default for RandomPrivateKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivateKeyProvider for RandomPrivateKeyProvider {
    fn new_private_key(&self) -> Result<SecretKey, KeyError> {
        let mut key = [0u8; 32];
        self.rnd.fill(&mut key).map_err(|_| KeyError::Rng)?;
        Ok(SecretKey::from_slice(&key)?)
    }
}
