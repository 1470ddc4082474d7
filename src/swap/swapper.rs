use std::sync::Arc;

use tracing::info;

use super::privkey_provider::PrivateKeyProvider;
use super::service::SwapService;
use super::store::SwapStore;
use super::{StoreError, SwapError, SwapPublicInfo, validate_payment_hash, validate_pubkey};

/// Registers swaps, enforcing exactly one swap per payment hash across the
/// validate, build and persist steps.
pub struct Swapper<P, S> {
    service: SwapService<P>,
    store: Arc<S>,
}

impl<P, S> Swapper<P, S>
where
    P: PrivateKeyProvider,
    S: SwapStore,
{
    pub fn new(service: SwapService<P>, store: Arc<S>) -> Self {
        Self { service, store }
    }

    /// Creates a new swap for the payment hash and persists it. Returns the
    /// public half only; the service private key goes to the store and
    /// nowhere else.
    pub fn register(
        &self,
        payer_pubkey: &[u8],
        payment_hash: &[u8],
    ) -> Result<SwapPublicInfo, SwapError> {
        validate_pubkey("payer_pubkey", payer_pubkey)?;
        let hash = validate_payment_hash(payment_hash)?;

        let existing = self
            .store
            .find_by_payment_hash(&hash)
            .map_err(storage_error)?;
        if existing.is_some() {
            return Err(SwapError::AlreadyExists);
        }

        let (public, private) = self.service.create_swap(payer_pubkey, payment_hash)?;

        // The insert is conditional on the payment hash still being free, so
        // a concurrent registration that won the race between the lookup
        // above and this write surfaces as a conflict here. The key pair
        // generated for the losing attempt is dropped.
        match self.store.insert_if_absent(&public, &private) {
            Ok(()) => {}
            Err(e) => return Err(storage_error(e)),
        }

        info!(
            payment_hash = %public.payment_hash,
            address = %public.address,
            "registered submarine swap"
        );
        Ok(public)
    }
}

fn storage_error(err: StoreError) -> SwapError {
    match err {
        StoreError::AlreadyExists => SwapError::AlreadyExists,
        StoreError::General(e) => SwapError::Storage(e),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::collections::hash_map::Entry;
    use std::sync::Mutex;

    use bitcoin::Network;
    use bitcoin::hashes::sha256;
    use bitcoin::key::Secp256k1;
    use bitcoin::secp256k1::SecretKey;

    use super::*;
    use crate::swap::privkey_provider::RandomPrivateKeyProvider;
    use crate::swap::{SwapPrivateInfo, ValidationError};

    struct MemSwapStore {
        swaps: Mutex<HashMap<sha256::Hash, SwapPublicInfo>>,
    }

    impl MemSwapStore {
        fn new() -> Self {
            Self {
                swaps: Mutex::new(HashMap::new()),
            }
        }
    }

    impl SwapStore for MemSwapStore {
        fn find_by_payment_hash(
            &self,
            payment_hash: &sha256::Hash,
        ) -> Result<Option<SwapPublicInfo>, StoreError> {
            Ok(self.swaps.lock().unwrap().get(payment_hash).cloned())
        }

        fn insert_if_absent(
            &self,
            public: &SwapPublicInfo,
            _private: &SwapPrivateInfo,
        ) -> Result<(), StoreError> {
            match self.swaps.lock().unwrap().entry(public.payment_hash) {
                Entry::Occupied(_) => Err(StoreError::AlreadyExists),
                Entry::Vacant(v) => {
                    v.insert(public.clone());
                    Ok(())
                }
            }
        }
    }

    /// Misses every lookup and rejects every insert, modelling a writer that
    /// lost the race between the existence check and the atomic write.
    struct RacedStore;

    impl SwapStore for RacedStore {
        fn find_by_payment_hash(
            &self,
            _payment_hash: &sha256::Hash,
        ) -> Result<Option<SwapPublicInfo>, StoreError> {
            Ok(None)
        }

        fn insert_if_absent(
            &self,
            _public: &SwapPublicInfo,
            _private: &SwapPrivateInfo,
        ) -> Result<(), StoreError> {
            Err(StoreError::AlreadyExists)
        }
    }

    struct FailingStore;

    impl SwapStore for FailingStore {
        fn find_by_payment_hash(
            &self,
            _payment_hash: &sha256::Hash,
        ) -> Result<Option<SwapPublicInfo>, StoreError> {
            Err(StoreError::General(anyhow::anyhow!("connection refused")))
        }

        fn insert_if_absent(
            &self,
            _public: &SwapPublicInfo,
            _private: &SwapPrivateInfo,
        ) -> Result<(), StoreError> {
            Err(StoreError::General(anyhow::anyhow!("connection refused")))
        }
    }

    struct PanickingStore;

    impl SwapStore for PanickingStore {
        fn find_by_payment_hash(
            &self,
            _payment_hash: &sha256::Hash,
        ) -> Result<Option<SwapPublicInfo>, StoreError> {
            panic!("storage accessed for invalid input");
        }

        fn insert_if_absent(
            &self,
            _public: &SwapPublicInfo,
            _private: &SwapPrivateInfo,
        ) -> Result<(), StoreError> {
            panic!("storage accessed for invalid input");
        }
    }

    fn swapper_with<S: SwapStore>(store: S) -> Swapper<RandomPrivateKeyProvider, S> {
        let service = SwapService::new(Network::Regtest, RandomPrivateKeyProvider::new(), 288);
        Swapper::new(service, Arc::new(store))
    }

    fn payer_pubkey_bytes(seed: u8) -> Vec<u8> {
        let secp = Secp256k1::new();
        let key = SecretKey::from_slice(&[seed; 32]).expect("payer secret key");
        bitcoin::PublicKey::new(key.public_key(&secp)).to_bytes()
    }

    #[test]
    fn register_then_duplicate_is_conflict() {
        let swapper = swapper_with(MemSwapStore::new());
        let payer = payer_pubkey_bytes(7);
        let hash = [9u8; 32];

        let public = swapper.register(&payer, &hash).expect("first register");
        assert_eq!(public.lock_time, 288);
        assert_eq!(public.payer_pubkey.to_bytes(), payer);

        let err = swapper.register(&payer, &hash).unwrap_err();
        assert!(matches!(err, SwapError::AlreadyExists));

        // A different payer under the same hash conflicts too.
        let err = swapper
            .register(&payer_pubkey_bytes(8), &hash)
            .unwrap_err();
        assert!(matches!(err, SwapError::AlreadyExists));
    }

    #[test]
    fn late_conflict_looks_like_early_conflict() {
        let swapper = swapper_with(RacedStore);

        let err = swapper
            .register(&payer_pubkey_bytes(7), &[9u8; 32])
            .unwrap_err();
        assert!(matches!(err, SwapError::AlreadyExists));
    }

    #[test]
    fn storage_failure_is_propagated() {
        let swapper = swapper_with(FailingStore);

        let err = swapper
            .register(&payer_pubkey_bytes(7), &[9u8; 32])
            .unwrap_err();
        assert!(matches!(err, SwapError::Storage(_)));
    }

    #[test]
    fn invalid_input_never_touches_storage() {
        let swapper = swapper_with(PanickingStore);

        let err = swapper
            .register(&payer_pubkey_bytes(7), &[9u8; 20])
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Validation(ValidationError::BadLength {
                field: "payment_hash",
                expected: 32,
                got: 20,
            })
        ));

        let err = swapper.register(&[1u8; 10], &[9u8; 32]).unwrap_err();
        assert!(matches!(
            err,
            SwapError::Validation(ValidationError::BadLength {
                field: "payer_pubkey",
                expected: 33,
                got: 10,
            })
        ));
    }
}
