//! In-memory host implementation for tests.
//!
//! `MemHost` backs the full `HostApi` surface with `BTreeMap`s and fixed
//! chain context. Clones share one inner state, so a test can keep a handle,
//! hand a clone to the engine, and inspect storage, balances, events, and
//! recorded cross-contract calls afterwards.
//!
//! Amounts are interpreted as big-endian unsigned integers of at most 16
//! bytes; that is enough for tests while keeping the trait's opaque-bytes
//! contract.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use basalt_primitives::{
    crypto, Action, ActionResult, Address, Amount, DeployContractAction,
    FunctionCallAction, Hash, OwnedBuffer,
};

use crate::error::{HostError, HostResult};
use crate::traits::HostApi;

/// A cross-contract call the host was asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub to: Address,
    pub method: String,
    pub args: Vec<u8>,
    pub deposit: Amount,
    pub gas_limit: u64,
    pub invocation_ctx: Vec<u8>,
}

/// A deploy the host was asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDeploy {
    pub code: Vec<u8>,
    pub args: Vec<u8>,
    pub nonce: Vec<u8>,
    pub deposit: Amount,
    pub gas_limit: u64,
}

#[derive(Debug, Default)]
struct MemHostInner {
    storage: BTreeMap<Vec<u8>, Vec<u8>>,
    contract_data: BTreeMap<(Address, Vec<u8>), Vec<u8>>,
    balances: BTreeMap<Address, u128>,
    identities: BTreeMap<Address, Vec<u8>>,
    events: Vec<(Vec<u8>, Vec<u8>)>,
    calls: Vec<RecordedCall>,
    deploys: Vec<RecordedDeploy>,
    burned: u128,

    block_number: u64,
    block_timestamp: i64,
    block_seed: Vec<u8>,
    network_size: u64,
    epoch: u16,
    min_fee_per_gas: Amount,
    pay_amount: Amount,

    caller: Address,
    original_caller: Address,
    contract: Address,
    own_code: Vec<u8>,
    global_state: Vec<u8>,

    // Failure injection for tests.
    storage_failure: Option<HostError>,
    call_failure: Option<HostError>,
    call_output: Vec<u8>,
}

/// In-memory `HostApi` implementation. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemHost {
    inner: Arc<Mutex<MemHostInner>>,
}

/// Parse big-endian amount bytes. Empty means zero.
fn amount_to_u128(amount: &[u8]) -> HostResult<u128> {
    if amount.len() > 16 {
        return Err(HostError::bad_argument("amount too large"));
    }
    let mut value = 0u128;
    for &byte in amount {
        value = (value << 8) | byte as u128;
    }
    Ok(value)
}

/// Encode a value as minimal big-endian amount bytes.
fn u128_to_amount(value: u128) -> Amount {
    if value == 0 {
        return Vec::new();
    }
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

impl MemHost {
    pub fn new() -> Self {
        let host = Self::default();
        {
            let mut inner = host.lock();
            inner.block_number = 1;
            inner.block_timestamp = 1_700_000_000;
            inner.block_seed = vec![0x5E; 32];
            inner.network_size = 1000;
            inner.epoch = 10;
            inner.min_fee_per_gas = u128_to_amount(1);
        }
        host
    }

    fn lock(&self) -> MutexGuard<'_, MemHostInner> {
        self.inner.lock().expect("mem host lock poisoned")
    }

    // ── Test configuration ──

    pub fn set_contract(&self, addr: Address) {
        self.lock().contract = addr;
    }

    pub fn set_caller(&self, addr: Address) {
        let mut inner = self.lock();
        inner.caller = addr;
        inner.original_caller = addr;
    }

    pub fn set_balance(&self, addr: Address, value: u128) {
        self.lock().balances.insert(addr, value);
    }

    pub fn set_pay_amount(&self, value: u128) {
        self.lock().pay_amount = u128_to_amount(value);
    }

    pub fn set_block_number(&self, height: u64) {
        self.lock().block_number = height;
    }

    pub fn insert_identity(&self, addr: Address, record: Vec<u8>) {
        self.lock().identities.insert(addr, record);
    }

    pub fn insert_contract_data(&self, addr: Address, key: Vec<u8>, value: Vec<u8>) {
        self.lock().contract_data.insert((addr, key), value);
    }

    pub fn insert_storage(&self, key: Vec<u8>, value: Vec<u8>) {
        self.lock().storage.insert(key, value);
    }

    pub fn set_own_code(&self, code: Vec<u8>) {
        self.lock().own_code = code;
    }

    pub fn fail_storage_with(&self, err: HostError) {
        self.lock().storage_failure = Some(err);
    }

    pub fn fail_calls_with(&self, err: HostError) {
        self.lock().call_failure = Some(err);
    }

    pub fn set_call_output(&self, output: Vec<u8>) {
        self.lock().call_output = output;
    }

    // ── Test inspection ──

    pub fn balance_of(&self, addr: &Address) -> u128 {
        self.lock().balances.get(addr).copied().unwrap_or(0)
    }

    pub fn storage_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.lock().storage.get(key).cloned()
    }

    pub fn events(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.lock().events.clone()
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn recorded_deploys(&self) -> Vec<RecordedDeploy> {
        self.lock().deploys.clone()
    }

    pub fn burned(&self) -> u128 {
        self.lock().burned
    }
}

impl HostApi for MemHost {
    fn storage_get(&self, key: &[u8]) -> HostResult<OwnedBuffer> {
        let inner = self.lock();
        if let Some(err) = &inner.storage_failure {
            return Err(err.clone());
        }
        Ok(OwnedBuffer::from(inner.storage.get(key).cloned()))
    }

    fn storage_set(&mut self, key: &[u8], value: &[u8]) -> HostResult<()> {
        let mut inner = self.lock();
        if let Some(err) = &inner.storage_failure {
            return Err(err.clone());
        }
        inner.storage.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn storage_remove(&mut self, key: &[u8]) -> HostResult<()> {
        let mut inner = self.lock();
        if let Some(err) = &inner.storage_failure {
            return Err(err.clone());
        }
        inner.storage.remove(key);
        Ok(())
    }

    fn block_number(&self) -> HostResult<u64> {
        Ok(self.lock().block_number)
    }

    fn block_timestamp(&self) -> HostResult<i64> {
        Ok(self.lock().block_timestamp)
    }

    fn block_seed(&self) -> HostResult<Vec<u8>> {
        Ok(self.lock().block_seed.clone())
    }

    fn network_size(&self) -> HostResult<u64> {
        Ok(self.lock().network_size)
    }

    fn epoch(&self) -> HostResult<u16> {
        Ok(self.lock().epoch)
    }

    fn min_fee_per_gas(&self) -> HostResult<Amount> {
        Ok(self.lock().min_fee_per_gas.clone())
    }

    fn block_header(&self, height: u64) -> HostResult<OwnedBuffer> {
        let inner = self.lock();
        if height > inner.block_number {
            return Ok(OwnedBuffer::none());
        }
        // Synthetic header: height plus the block seed.
        let mut header = height.to_le_bytes().to_vec();
        header.extend_from_slice(&inner.block_seed);
        Ok(OwnedBuffer::some(header))
    }

    fn caller(&self) -> HostResult<Address> {
        Ok(self.lock().caller)
    }

    fn original_caller(&self) -> HostResult<Address> {
        Ok(self.lock().original_caller)
    }

    fn contract(&self) -> HostResult<Address> {
        Ok(self.lock().contract)
    }

    fn identity(&self, addr: &Address) -> HostResult<OwnedBuffer> {
        Ok(OwnedBuffer::from(self.lock().identities.get(addr).cloned()))
    }

    fn own_code(&self) -> HostResult<Vec<u8>> {
        Ok(self.lock().own_code.clone())
    }

    fn code_hash(&self) -> HostResult<Hash> {
        Ok(crypto::keccak256(&self.lock().own_code))
    }

    fn global_state(&self) -> HostResult<Vec<u8>> {
        Ok(self.lock().global_state.clone())
    }

    fn balance(&self) -> HostResult<Amount> {
        let inner = self.lock();
        let value = inner.balances.get(&inner.contract).copied().unwrap_or(0);
        Ok(u128_to_amount(value))
    }

    fn deduct_balance(&mut self, amount: &Amount) -> HostResult<()> {
        let value = amount_to_u128(amount)?;
        let mut inner = self.lock();
        let contract = inner.contract;
        let balance = inner.balances.entry(contract).or_insert(0);
        if *balance < value {
            return Err(HostError::contract_error("insufficient funds"));
        }
        *balance -= value;
        Ok(())
    }

    fn add_balance(&mut self, to: &Address, amount: &Amount) -> HostResult<()> {
        let value = amount_to_u128(amount)?;
        let mut inner = self.lock();
        *inner.balances.entry(*to).or_insert(0) += value;
        Ok(())
    }

    fn burn(&mut self, amount: &Amount) -> HostResult<()> {
        let value = amount_to_u128(amount)?;
        let mut inner = self.lock();
        let contract = inner.contract;
        let balance = inner.balances.entry(contract).or_insert(0);
        if *balance < value {
            return Err(HostError::contract_error("insufficient funds"));
        }
        *balance -= value;
        inner.burned += value;
        Ok(())
    }

    fn pay_amount(&self) -> HostResult<Amount> {
        Ok(self.lock().pay_amount.clone())
    }

    fn call(
        &mut self,
        to: &Address,
        method: &str,
        args: &[u8],
        deposit: &Amount,
        gas_limit: u64,
        invocation_ctx: &[u8],
    ) -> HostResult<ActionResult> {
        let mut inner = self.lock();
        inner.calls.push(RecordedCall {
            to: *to,
            method: method.to_string(),
            args: args.to_vec(),
            deposit: deposit.clone(),
            gas_limit,
            invocation_ctx: invocation_ctx.to_vec(),
        });
        if let Some(err) = &inner.call_failure {
            return Err(err.clone());
        }
        let gas_used = gas_limit.min(1000);
        Ok(ActionResult {
            input_action: Action::FunctionCall(FunctionCallAction {
                method: method.to_string(),
                args: args.to_vec(),
                deposit: deposit.clone(),
                gas_limit,
            }),
            gas_used,
            remaining_gas: gas_limit - gas_used,
            success: true,
            error: String::new(),
            output_data: inner.call_output.clone(),
            sub_results: vec![],
            contract: *to,
        })
    }

    fn deploy(
        &mut self,
        code: &[u8],
        args: &[u8],
        nonce: &[u8],
        deposit: &Amount,
        gas_limit: u64,
    ) -> HostResult<ActionResult> {
        let addr = self.contract_addr(code, args, nonce)?;
        let mut inner = self.lock();
        inner.deploys.push(RecordedDeploy {
            code: code.to_vec(),
            args: args.to_vec(),
            nonce: nonce.to_vec(),
            deposit: deposit.clone(),
            gas_limit,
        });
        if let Some(err) = &inner.call_failure {
            return Err(err.clone());
        }
        let gas_used = gas_limit.min(1000);
        Ok(ActionResult {
            input_action: Action::DeployContract(DeployContractAction {
                code: code.to_vec(),
                args: args.to_vec(),
                nonce: nonce.to_vec(),
                deposit: deposit.clone(),
                gas_limit,
            }),
            gas_used,
            remaining_gas: gas_limit - gas_used,
            success: true,
            error: String::new(),
            output_data: vec![],
            sub_results: vec![],
            contract: addr,
        })
    }

    fn contract_addr(
        &self,
        code: &[u8],
        args: &[u8],
        nonce: &[u8],
    ) -> HostResult<Address> {
        let mut preimage = code.to_vec();
        preimage.extend_from_slice(args);
        preimage.extend_from_slice(nonce);
        let hash = crypto::keccak256(&preimage);
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&hash[12..]);
        Ok(addr)
    }

    fn contract_addr_by_hash(
        &self,
        hash: &Hash,
        args: &[u8],
        nonce: &[u8],
    ) -> HostResult<Address> {
        let mut preimage = hash.to_vec();
        preimage.extend_from_slice(args);
        preimage.extend_from_slice(nonce);
        let digest = crypto::keccak256(&preimage);
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&digest[12..]);
        Ok(addr)
    }

    fn read_contract_data(
        &self,
        addr: &Address,
        key: &[u8],
    ) -> HostResult<OwnedBuffer> {
        let inner = self.lock();
        Ok(OwnedBuffer::from(
            inner.contract_data.get(&(*addr, key.to_vec())).cloned(),
        ))
    }

    fn keccak256(&self, data: &[u8]) -> HostResult<Hash> {
        Ok(crypto::keccak256(data))
    }

    fn ecrecover(&self, msg_hash: &Hash, sig: &[u8]) -> HostResult<OwnedBuffer> {
        Ok(OwnedBuffer::from(
            crypto::ecrecover(msg_hash, sig).map(|addr| addr.to_vec()),
        ))
    }

    fn event(&mut self, name: &[u8], payload: &[u8]) -> HostResult<()> {
        self.lock()
            .events
            .push((name.to_vec(), payload.to_vec()));
        Ok(())
    }
}
