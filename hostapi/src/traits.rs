//! The host capability interface.
//!
//! `HostApi` is the engine's only window onto world state. The host node
//! supplies a concrete implementation per execution; the engine routes every
//! contract-visible capability through it and charges gas before each call.
//!
//! Optional byte results are returned as [`OwnedBuffer`]s: ownership moves
//! to the engine, which releases each buffer exactly once by consuming it.

use basalt_primitives::{
    ActionResult, Address, Amount, Hash, OwnedBuffer,
};

use crate::error::HostResult;

/// Host-side implementation of the runtime's capability set.
///
/// One instance serves exactly one execution request; implementations
/// needing shared state own their interior synchronization. Methods that
/// mutate world state take `&mut self`.
pub trait HostApi {
    // ── Storage ──

    /// Read a value from the executing contract's storage.
    ///
    /// Returns an absent buffer if the key does not exist.
    fn storage_get(&self, key: &[u8]) -> HostResult<OwnedBuffer>;

    /// Write a key-value pair to the executing contract's storage.
    fn storage_set(&mut self, key: &[u8], value: &[u8]) -> HostResult<()>;

    /// Remove a key from the executing contract's storage.
    fn storage_remove(&mut self, key: &[u8]) -> HostResult<()>;

    // ── Chain context ──

    /// Height of the block this execution runs in.
    fn block_number(&self) -> HostResult<u64>;

    /// Timestamp of the current block (unix seconds).
    fn block_timestamp(&self) -> HostResult<i64>;

    /// Random seed of the current block.
    fn block_seed(&self) -> HostResult<Vec<u8>>;

    /// Number of validated identities in the network.
    fn network_size(&self) -> HostResult<u64>;

    /// Current epoch.
    fn epoch(&self) -> HostResult<u16>;

    /// Minimal fee per gas unit, as amount bytes.
    fn min_fee_per_gas(&self) -> HostResult<Amount>;

    /// Serialized header of the block at `height`.
    ///
    /// Returns an absent buffer if the block is unknown.
    fn block_header(&self, height: u64) -> HostResult<OwnedBuffer>;

    // ── Identity / account ──

    /// Address of the immediate caller (account or contract).
    fn caller(&self) -> HostResult<Address>;

    /// Address of the account that started the outermost call chain.
    fn original_caller(&self) -> HostResult<Address>;

    /// Address of the executing contract.
    fn contract(&self) -> HostResult<Address>;

    /// Serialized identity record for `addr`, absent if none exists.
    fn identity(&self, addr: &Address) -> HostResult<OwnedBuffer>;

    /// Bytecode of the executing contract.
    fn own_code(&self) -> HostResult<Vec<u8>>;

    /// Code hash of the executing contract.
    fn code_hash(&self) -> HostResult<Hash>;

    /// Serialized global state record of the chain.
    fn global_state(&self) -> HostResult<Vec<u8>>;

    // ── Value transfer ──

    /// Balance of the executing contract.
    fn balance(&self) -> HostResult<Amount>;

    /// Deduct from the executing contract's balance.
    ///
    /// Insufficient funds is a contract error, not a host failure.
    fn deduct_balance(&mut self, amount: &Amount) -> HostResult<()>;

    /// Credit `amount` to `to`.
    fn add_balance(&mut self, to: &Address, amount: &Amount) -> HostResult<()>;

    /// Burn `amount` from the executing contract's balance.
    fn burn(&mut self, amount: &Amount) -> HostResult<()>;

    /// The amount attached to the current invocation.
    fn pay_amount(&self) -> HostResult<Amount>;

    // ── Cross-contract ──

    /// Synchronously execute a method on another contract under its own gas
    /// sub-limit. `invocation_ctx` is the serialized invocation context.
    fn call(
        &mut self,
        to: &Address,
        method: &str,
        args: &[u8],
        deposit: &Amount,
        gas_limit: u64,
        invocation_ctx: &[u8],
    ) -> HostResult<ActionResult>;

    /// Synchronously deploy a contract under its own gas sub-limit.
    fn deploy(
        &mut self,
        code: &[u8],
        args: &[u8],
        nonce: &[u8],
        deposit: &Amount,
        gas_limit: u64,
    ) -> HostResult<ActionResult>;

    /// Derive the address a deploy of `code` would land on.
    fn contract_addr(
        &self,
        code: &[u8],
        args: &[u8],
        nonce: &[u8],
    ) -> HostResult<Address>;

    /// Derive a contract address from a code hash instead of full code.
    fn contract_addr_by_hash(
        &self,
        hash: &Hash,
        args: &[u8],
        nonce: &[u8],
    ) -> HostResult<Address>;

    /// Read a key from another contract's storage, absent if missing.
    fn read_contract_data(
        &self,
        addr: &Address,
        key: &[u8],
    ) -> HostResult<OwnedBuffer>;

    // ── Crypto ──

    /// Keccak-256 hash of `data`.
    fn keccak256(&self, data: &[u8]) -> HostResult<Hash>;

    /// Recover a signer address from a 65-byte signature over `msg_hash`.
    ///
    /// Returns an absent buffer when no signer can be recovered.
    fn ecrecover(&self, msg_hash: &Hash, sig: &[u8]) -> HostResult<OwnedBuffer>;

    // ── Observability ──

    /// Emit an event with a name and opaque payload.
    fn event(&mut self, name: &[u8], payload: &[u8]) -> HostResult<()>;
}
