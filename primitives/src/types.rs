//! Core type aliases and boundary size constants for the Basalt runtime.
//!
//! These types are used across the host API, the execution engine, and the
//! boundary codec.

/// 20-byte account or contract address.
pub type Address = [u8; 20];

/// 32-byte hash (code hashes, keccak256 output).
pub type Hash = [u8; 32];

/// Gas units.
pub type Gas = u64;

/// Coin amount as opaque big-endian integer bytes.
///
/// The runtime never does arithmetic on amounts; interpretation belongs to
/// the host's ledger. Empty bytes mean zero.
pub type Amount = Vec<u8>;

/// Length of an [`Address`] in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Version of the host operation set. Bumped whenever an import's name or
/// signature changes, so hosts and contracts can detect a mismatch.
pub const HOST_API_VERSION: u32 = 1;

/// Maximum size of the encoded action result returned to the host.
/// Exceeding it is a reportable failure, never a silent truncation.
pub const MAX_ACTION_RESULT_SIZE: usize = 64 * 1024;

/// Maximum storage key length accepted from a contract.
pub const MAX_STORAGE_KEY_SIZE: usize = 128 * 1024;

/// Maximum storage value length accepted from a contract.
pub const MAX_STORAGE_VALUE_SIZE: usize = 128 * 1024;

/// Maximum contract code size accepted for deploys.
pub const MAX_CODE_SIZE: usize = 1024 * 1024;

/// Maximum length of an amount in bytes (256-bit integers).
pub const MAX_AMOUNT_SIZE: usize = 32;

/// Maximum length of method names, event names, and other short strings.
pub const MAX_STRING_SIZE: usize = 4 * 1024;

/// Maximum length of serialized call arguments.
pub const MAX_ARGS_SIZE: usize = 10 * 1024;

/// A zero-valued address (20 zero bytes).
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Parse an address from a byte slice. Returns `None` on length mismatch.
pub fn address_from_slice(bytes: &[u8]) -> Option<Address> {
    if bytes.len() != ADDRESS_LEN {
        return None;
    }
    let mut addr = [0u8; ADDRESS_LEN];
    addr.copy_from_slice(bytes);
    Some(addr)
}
