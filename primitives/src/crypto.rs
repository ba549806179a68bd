//! Reference cryptographic operations for host implementations.
//!
//! Production hosts bring their own (possibly accelerated) implementations
//! behind the host API; these functions back the in-memory host and give
//! tests a ground truth.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::types::{Address, Hash};

/// Compute the Keccak-256 hash of `data`.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Recover the signing address from a 65-byte `r || s || v` signature over
/// a 32-byte message hash.
///
/// `v` is accepted both raw (0/1) and in the legacy 27/28 form. Returns
/// `None` for malformed or unrecoverable signatures; recovery failure is
/// not an error condition, it just means "no signer".
pub fn ecrecover(msg_hash: &Hash, sig: &[u8]) -> Option<Address> {
    if sig.len() != 65 {
        return None;
    }
    let v = match sig[64] {
        v @ 0..=1 => v,
        v @ 27..=28 => v - 27,
        _ => return None,
    };
    let recovery_id = RecoveryId::from_byte(v)?;
    let signature = Signature::from_slice(&sig[..64]).ok()?;
    let key = VerifyingKey::recover_from_prehash(msg_hash, &signature, recovery_id).ok()?;
    Some(pubkey_to_address(&key))
}

/// Derive the 20-byte address of a public key: the low 20 bytes of the
/// keccak256 of the uncompressed key (without the 0x04 prefix).
pub fn pubkey_to_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    addr
}
