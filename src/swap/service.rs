use bitcoin::hashes::{Hash as _, ripemd160, sha256};
use bitcoin::key::Secp256k1;
use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CSV, OP_DROP, OP_ELSE, OP_ENDIF, OP_EQUAL, OP_HASH160, OP_IF,
};
use bitcoin::secp256k1::All;
use bitcoin::{Address, Network, PublicKey, Script, ScriptBuf};

use super::privkey_provider::PrivateKeyProvider;
use super::{SwapError, SwapPrivateInfo, SwapPublicInfo, validate_payment_hash, validate_pubkey};

/// Builds submarine swap redeem scripts and the P2WSH addresses committing
/// to them. Pure computation apart from the service key draw.
#[derive(Debug)]
pub struct SwapService<P> {
    network: Network,
    secp: Secp256k1<All>,
    privkey_provider: P,
    default_lock_time: u32,
}

impl<P> SwapService<P>
where
    P: PrivateKeyProvider,
{
    pub fn new(network: Network, privkey_provider: P, default_lock_time: u32) -> Self {
        Self {
            network,
            secp: Secp256k1::new(),
            privkey_provider,
            default_lock_time,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn default_lock_time(&self) -> u32 {
        self.default_lock_time
    }

    /// Constructs a new submarine swap for the given payer key and payment
    /// hash, generating a one-time service key for the claim path. Returns
    /// both halves fully populated or nothing at all.
    pub fn create_swap(
        &self,
        payer_pubkey: &[u8],
        payment_hash: &[u8],
    ) -> Result<(SwapPublicInfo, SwapPrivateInfo), SwapError> {
        let payer_pubkey = validate_pubkey("payer_pubkey", payer_pubkey)?;
        let payment_hash = validate_payment_hash(payment_hash)?;

        let service_privkey = self.privkey_provider.new_private_key()?;
        let service_pubkey = PublicKey::new(service_privkey.public_key(&self.secp));

        let script = swap_script(
            &service_pubkey,
            &payer_pubkey,
            &payment_hash,
            self.default_lock_time,
        );
        let address = Address::p2wsh(&script, self.network);

        Ok((
            SwapPublicInfo {
                payment_hash,
                payer_pubkey,
                service_pubkey,
                lock_time: self.default_lock_time,
                script,
                address,
            },
            SwapPrivateInfo { service_privkey },
        ))
    }
}

/// Redeem script with two mutually exclusive spending paths: the service
/// claims with its signature once it has obtained the payment preimage by
/// paying out off-chain, the payer reclaims by signature after `lock_time`
/// sequence blocks.
///
/// The payment hash is `sha256(preimage)`. The script commits to
/// `ripemd160(payment_hash)` so that `OP_HASH160` over the revealed
/// preimage reproduces the committed digest.
pub fn swap_script(
    service_pubkey: &PublicKey,
    payer_pubkey: &PublicKey,
    payment_hash: &sha256::Hash,
    lock_time: u32,
) -> ScriptBuf {
    Script::builder()
        .push_opcode(OP_HASH160)
        .push_slice(ripemd160::Hash::hash(payment_hash.as_byte_array()).as_byte_array())
        .push_opcode(OP_EQUAL)
        .push_opcode(OP_IF)
        .push_key(service_pubkey)
        .push_opcode(OP_ELSE)
        .push_int(lock_time as i64)
        .push_opcode(OP_CSV)
        .push_opcode(OP_DROP)
        .push_key(payer_pubkey)
        .push_opcode(OP_ENDIF)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}
