//! Host function registration — the bridge contracts call through.
//!
//! Every import under the `env` namespace follows the same steps:
//!
//! 1. Read argument regions out of guest linear memory
//! 2. Sync the evaluator's fuel into the gas meter and charge the operation
//! 3. Invoke the host capability
//! 4. Write any result through the bump allocator, returning a packed region
//! 5. On failure, record the typed cause and trap the guest
//!
//! Region-valued results come back as `(ptr << 32) | len`, `0` = absent.

use wasmtime::{Caller, Linker, Memory};

use basalt_hostapi::HostApi;
use basalt_primitives::types::{
    address_from_slice, MAX_AMOUNT_SIZE, MAX_ARGS_SIZE, MAX_CODE_SIZE,
    MAX_STORAGE_KEY_SIZE, MAX_STORAGE_VALUE_SIZE, MAX_STRING_SIZE,
};
use basalt_primitives::{Address, Amount, Hash, OwnedBuffer, PromiseResult};

use crate::error::VmError;
use crate::host_env::HostState;
use crate::memory::{self, pack_region};
use crate::validation::HOST_MODULE;

type Ctx<'a, H> = Caller<'a, HostState<H>>;

/// Register every host function with the linker.
pub fn register_host_functions<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    register_storage(linker)?;
    register_chain_context(linker)?;
    register_account(linker)?;
    register_value_transfer(linker)?;
    register_address_derivation(linker)?;
    register_crypto(linker)?;
    register_promises(linker)?;
    register_diagnostics(linker)?;
    Ok(())
}

fn link_err(e: anyhow::Error) -> VmError {
    VmError::internal(format!("linker registration: {e}"))
}

// ── Shared plumbing ──

fn guest_memory<H: HostApi>(caller: &mut Ctx<'_, H>) -> Result<Memory, VmError> {
    caller
        .get_export("memory")
        .and_then(|e| e.into_memory())
        .ok_or_else(|| VmError::internal("guest memory export disappeared"))
}

/// Read a guest region, enforcing a size limit.
fn read_region<H: HostApi>(
    caller: &mut Ctx<'_, H>,
    ptr: i32,
    len: i32,
    max: usize,
) -> Result<Vec<u8>, VmError> {
    if len >= 0 && len as usize > max {
        return Err(VmError::contract_trap(format!(
            "region of {len} bytes exceeds limit of {max}"
        )));
    }
    let mem = guest_memory(caller)?;
    memory::read_bytes(mem.data(&caller), ptr, len)
}

/// Like [`read_region`], but a zero pointer means "absent" and reads empty.
fn read_region_opt<H: HostApi>(
    caller: &mut Ctx<'_, H>,
    ptr: i32,
    len: i32,
    max: usize,
) -> Result<Vec<u8>, VmError> {
    if ptr == 0 {
        Ok(Vec::new())
    } else {
        read_region(caller, ptr, len, max)
    }
}

fn read_address<H: HostApi>(
    caller: &mut Ctx<'_, H>,
    ptr: i32,
    len: i32,
) -> Result<Address, VmError> {
    let bytes = read_region(caller, ptr, len, basalt_primitives::ADDRESS_LEN)?;
    address_from_slice(&bytes)
        .ok_or_else(|| VmError::contract_trap("address must be 20 bytes"))
}

fn read_amount<H: HostApi>(
    caller: &mut Ctx<'_, H>,
    ptr: i32,
    len: i32,
) -> Result<Amount, VmError> {
    read_region_opt(caller, ptr, len, MAX_AMOUNT_SIZE)
}

fn read_hash<H: HostApi>(
    caller: &mut Ctx<'_, H>,
    ptr: i32,
    len: i32,
) -> Result<Hash, VmError> {
    let bytes = read_region(caller, ptr, len, 32)?;
    if bytes.len() != 32 {
        return Err(VmError::contract_trap("hash must be 32 bytes"));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Sync fuel into the meter, then charge `amount`.
///
/// The meter is the source of truth; fuel is pushed back down so the
/// evaluator keeps metering instructions against the reduced budget. On
/// exhaustion the meter pins at the limit — gas_used never overshoots.
fn charge<H: HostApi>(caller: &mut Ctx<'_, H>, amount: u64) -> Result<(), VmError> {
    let fuel = caller
        .get_fuel()
        .map_err(|e| VmError::internal(format!("fuel read: {e}")))?;
    let limit = caller.data().meter.limit();
    caller.data_mut().meter.absorb(limit.saturating_sub(fuel));
    match caller.data_mut().meter.charge(amount) {
        Ok(()) => {
            let remaining = caller.data().meter.remaining();
            caller
                .set_fuel(remaining)
                .map_err(|e| VmError::internal(format!("fuel write: {e}")))?;
            Ok(())
        }
        Err(_) => {
            caller.data_mut().meter.absorb(limit);
            let _ = caller.set_fuel(0);
            Err(VmError::OutOfGas)
        }
    }
}

fn charge_host_op<H: HostApi>(
    caller: &mut Ctx<'_, H>,
    bytes: usize,
) -> Result<(), VmError> {
    let cost = caller.data().costs.host_op(bytes);
    charge(caller, cost)
}

/// Allocate space in the host region of guest memory and write `data`,
/// returning the packed region.
fn write_region<H: HostApi>(
    caller: &mut Ctx<'_, H>,
    data: &[u8],
) -> Result<i64, VmError> {
    let mem = guest_memory(caller)?;
    let (ptr, new_bump, new_cap, grow_pages) =
        caller.data().alloc.compute_alloc(data.len());

    if grow_pages > 0 {
        mem.grow(&mut *caller, grow_pages)
            .map_err(|e| VmError::internal(format!("memory grow: {e}")))?;
    }

    let mem_data = mem.data_mut(&mut *caller);
    let end = ptr
        .checked_add(data.len())
        .filter(|&end| end <= mem_data.len())
        .ok_or_else(|| VmError::internal("host allocation out of bounds"))?;
    mem_data[ptr..end].copy_from_slice(data);
    caller.data_mut().alloc.commit(new_bump, new_cap);

    Ok(pack_region(ptr, data.len()))
}

/// Write an optional buffer; absent maps to 0.
fn write_optional<H: HostApi>(
    caller: &mut Ctx<'_, H>,
    value: OwnedBuffer,
) -> Result<i64, VmError> {
    match value.consume() {
        Some(data) => write_region(caller, &data),
        None => Ok(0),
    }
}

/// Convert a typed failure into the trap that unwinds the guest, recording
/// the cause for classification by the engine.
fn seal<H: HostApi, T>(
    caller: &mut Ctx<'_, H>,
    res: Result<T, VmError>,
) -> anyhow::Result<T> {
    res.map_err(|err| caller.data_mut().fail(err))
}

// ── Storage ──

fn register_storage<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "storage_set",
            |mut caller: Ctx<'_, H>,
             key_ptr: i32,
             key_len: i32,
             val_ptr: i32,
             val_len: i32|
             -> anyhow::Result<()> {
                let res = (|| {
                    let key =
                        read_region(&mut caller, key_ptr, key_len, MAX_STORAGE_KEY_SIZE)?;
                    let value = read_region(
                        &mut caller,
                        val_ptr,
                        val_len,
                        MAX_STORAGE_VALUE_SIZE,
                    )?;
                    charge_host_op(&mut caller, key.len() + value.len())?;
                    caller
                        .data_mut()
                        .host
                        .storage_set(&key, &value)
                        .map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "storage_get",
            |mut caller: Ctx<'_, H>, key_ptr: i32, key_len: i32| -> anyhow::Result<i64> {
                let res = (|| {
                    let key =
                        read_region(&mut caller, key_ptr, key_len, MAX_STORAGE_KEY_SIZE)?;
                    charge_host_op(&mut caller, key.len())?;
                    let value = caller.data().host.storage_get(&key)?;
                    write_optional(&mut caller, value)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "storage_remove",
            |mut caller: Ctx<'_, H>, key_ptr: i32, key_len: i32| -> anyhow::Result<()> {
                let res = (|| {
                    let key =
                        read_region(&mut caller, key_ptr, key_len, MAX_STORAGE_KEY_SIZE)?;
                    charge_host_op(&mut caller, key.len())?;
                    caller
                        .data_mut()
                        .host
                        .storage_remove(&key)
                        .map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    Ok(())
}

// ── Chain context ──

fn register_chain_context<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "block_number",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<u64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    caller.data().host.block_number().map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "block_timestamp",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    caller.data().host.block_timestamp().map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "block_seed",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    let seed = caller.data().host.block_seed()?;
                    charge_host_op(&mut caller, seed.len())?;
                    write_region(&mut caller, &seed)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "network_size",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<u64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    caller.data().host.network_size().map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "epoch",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<u32> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    let epoch = caller.data().host.epoch()?;
                    Ok(epoch as u32)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "min_fee_per_gas",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    let fee = caller.data().host.min_fee_per_gas()?;
                    charge_host_op(&mut caller, fee.len())?;
                    write_region(&mut caller, &fee)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "block_header",
            |mut caller: Ctx<'_, H>, height: u64| -> anyhow::Result<i64> {
                let res = (|| {
                    let header = caller.data().host.block_header(height)?;
                    charge_host_op(&mut caller, header.len())?;
                    write_optional(&mut caller, header)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    Ok(())
}

// ── Identity / account ──

fn register_account<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "caller",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    let addr = caller.data().host.caller()?;
                    write_region(&mut caller, &addr)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "original_caller",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    let addr = caller.data().host.original_caller()?;
                    write_region(&mut caller, &addr)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "contract",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    let addr = caller.data().host.contract()?;
                    write_region(&mut caller, &addr)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "identity",
            |mut caller: Ctx<'_, H>, addr_ptr: i32, addr_len: i32| -> anyhow::Result<i64> {
                let res = (|| {
                    let addr = read_address(&mut caller, addr_ptr, addr_len)?;
                    charge_host_op(&mut caller, addr.len())?;
                    let record = caller.data().host.identity(&addr)?;
                    write_optional(&mut caller, record)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "own_code",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    let code = caller.data().host.own_code()?;
                    charge_host_op(&mut caller, code.len())?;
                    write_region(&mut caller, &code)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "code_hash",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    let hash = caller.data().host.code_hash()?;
                    write_region(&mut caller, &hash)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "global_state",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    let state = caller.data().host.global_state()?;
                    charge_host_op(&mut caller, state.len())?;
                    write_region(&mut caller, &state)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    Ok(())
}

// ── Value transfer ──

fn register_value_transfer<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "balance",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    let balance = caller.data().host.balance()?;
                    write_region(&mut caller, &balance)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "deduct_balance",
            |mut caller: Ctx<'_, H>, amt_ptr: i32, amt_len: i32| -> anyhow::Result<()> {
                let res = (|| {
                    let amount = read_amount(&mut caller, amt_ptr, amt_len)?;
                    charge_host_op(&mut caller, amount.len())?;
                    caller
                        .data_mut()
                        .host
                        .deduct_balance(&amount)
                        .map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "add_balance",
            |mut caller: Ctx<'_, H>,
             addr_ptr: i32,
             addr_len: i32,
             amt_ptr: i32,
             amt_len: i32|
             -> anyhow::Result<()> {
                let res = (|| {
                    let to = read_address(&mut caller, addr_ptr, addr_len)?;
                    let amount = read_amount(&mut caller, amt_ptr, amt_len)?;
                    charge_host_op(&mut caller, amount.len())?;
                    caller
                        .data_mut()
                        .host
                        .add_balance(&to, &amount)
                        .map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "burn",
            |mut caller: Ctx<'_, H>, amt_ptr: i32, amt_len: i32| -> anyhow::Result<()> {
                let res = (|| {
                    let amount = read_amount(&mut caller, amt_ptr, amt_len)?;
                    charge_host_op(&mut caller, amount.len())?;
                    caller.data_mut().host.burn(&amount).map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "pay_amount",
            |mut caller: Ctx<'_, H>| -> anyhow::Result<i64> {
                let res = (|| {
                    charge_host_op(&mut caller, 0)?;
                    let amount = caller.data().host.pay_amount()?;
                    write_region(&mut caller, &amount)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    Ok(())
}

// ── Contract address derivation ──

fn register_address_derivation<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "contract_addr",
            |mut caller: Ctx<'_, H>,
             code_ptr: i32,
             code_len: i32,
             args_ptr: i32,
             args_len: i32,
             nonce_ptr: i32,
             nonce_len: i32|
             -> anyhow::Result<i64> {
                let res = (|| {
                    let code = read_region(&mut caller, code_ptr, code_len, MAX_CODE_SIZE)?;
                    let args =
                        read_region_opt(&mut caller, args_ptr, args_len, MAX_ARGS_SIZE)?;
                    let nonce =
                        read_region_opt(&mut caller, nonce_ptr, nonce_len, MAX_STRING_SIZE)?;
                    charge_host_op(&mut caller, code.len() + args.len() + nonce.len())?;
                    let addr = caller.data().host.contract_addr(&code, &args, &nonce)?;
                    write_region(&mut caller, &addr)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "contract_addr_by_hash",
            |mut caller: Ctx<'_, H>,
             hash_ptr: i32,
             hash_len: i32,
             args_ptr: i32,
             args_len: i32,
             nonce_ptr: i32,
             nonce_len: i32|
             -> anyhow::Result<i64> {
                let res = (|| {
                    let hash = read_hash(&mut caller, hash_ptr, hash_len)?;
                    let args =
                        read_region_opt(&mut caller, args_ptr, args_len, MAX_ARGS_SIZE)?;
                    let nonce =
                        read_region_opt(&mut caller, nonce_ptr, nonce_len, MAX_STRING_SIZE)?;
                    charge_host_op(&mut caller, hash.len() + args.len() + nonce.len())?;
                    let addr = caller
                        .data()
                        .host
                        .contract_addr_by_hash(&hash, &args, &nonce)?;
                    write_region(&mut caller, &addr)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    Ok(())
}

// ── Crypto ──

fn register_crypto<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "keccak256",
            |mut caller: Ctx<'_, H>, ptr: i32, len: i32| -> anyhow::Result<i64> {
                let res = (|| {
                    let data = read_region(&mut caller, ptr, len, MAX_ARGS_SIZE)?;
                    charge_host_op(&mut caller, data.len())?;
                    let hash = caller.data().host.keccak256(&data)?;
                    write_region(&mut caller, &hash)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "ecrecover",
            |mut caller: Ctx<'_, H>,
             hash_ptr: i32,
             hash_len: i32,
             sig_ptr: i32,
             sig_len: i32|
             -> anyhow::Result<i64> {
                let res = (|| {
                    let hash = read_hash(&mut caller, hash_ptr, hash_len)?;
                    let sig = read_region(&mut caller, sig_ptr, sig_len, 65)?;
                    charge_host_op(&mut caller, sig.len())?;
                    let recovered = caller.data().host.ecrecover(&hash, &sig)?;
                    write_optional(&mut caller, recovered)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "bytes_to_hex",
            |mut caller: Ctx<'_, H>, ptr: i32, len: i32| -> anyhow::Result<i64> {
                let res = (|| {
                    let data = read_region(&mut caller, ptr, len, MAX_ARGS_SIZE)?;
                    let cost = caller.data().costs.bytes_to_hex(data.len());
                    charge(&mut caller, cost)?;
                    let encoded = hex::encode(&data);
                    write_region(&mut caller, encoded.as_bytes())
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "emit_event",
            |mut caller: Ctx<'_, H>,
             name_ptr: i32,
             name_len: i32,
             payload_ptr: i32,
             payload_len: i32|
             -> anyhow::Result<()> {
                let res = (|| {
                    let name = read_region(&mut caller, name_ptr, name_len, MAX_STRING_SIZE)?;
                    let payload = read_region_opt(
                        &mut caller,
                        payload_ptr,
                        payload_len,
                        MAX_ARGS_SIZE,
                    )?;
                    charge_host_op(&mut caller, name.len() + payload.len())?;
                    caller
                        .data_mut()
                        .host
                        .event(&name, &payload)
                        .map_err(VmError::from)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    Ok(())
}

// ── Deferred actions ──

fn register_promises<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "create_transfer_promise",
            |mut caller: Ctx<'_, H>,
             addr_ptr: i32,
             addr_len: i32,
             amt_ptr: i32,
             amt_len: i32|
             -> anyhow::Result<()> {
                let res = (|| {
                    let to = read_address(&mut caller, addr_ptr, addr_len)?;
                    let amount = read_region(&mut caller, amt_ptr, amt_len, MAX_AMOUNT_SIZE)?;
                    let cost = caller.data().costs.promise_base;
                    charge(&mut caller, cost)?;
                    charge_host_op(&mut caller, amount.len())?;
                    caller.data_mut().host.deduct_balance(&amount)?;
                    caller.data_mut().queue_transfer(to, amount)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "create_call_promise",
            |mut caller: Ctx<'_, H>,
             addr_ptr: i32,
             addr_len: i32,
             method_ptr: i32,
             method_len: i32,
             args_ptr: i32,
             args_len: i32,
             amt_ptr: i32,
             amt_len: i32,
             gas_limit: u64|
             -> anyhow::Result<u32> {
                let res = (|| {
                    let to = read_address(&mut caller, addr_ptr, addr_len)?;
                    let method =
                        read_region(&mut caller, method_ptr, method_len, MAX_STRING_SIZE)?;
                    let args =
                        read_region_opt(&mut caller, args_ptr, args_len, MAX_ARGS_SIZE)?;
                    let amount = read_amount(&mut caller, amt_ptr, amt_len)?;

                    let cost = caller.data().costs.promise_base;
                    charge(&mut caller, cost)?;
                    // Reserve the sub-call's budget from the caller's gas; a
                    // sub-limit beyond remaining gas fails here, before the
                    // sub-execution could start.
                    charge(&mut caller, gas_limit)?;
                    if !amount.is_empty() {
                        charge_host_op(&mut caller, amount.len())?;
                        caller.data_mut().host.deduct_balance(&amount)?;
                    }
                    let method = String::from_utf8_lossy(&method).into_owned();
                    caller
                        .data_mut()
                        .queue_call(to, method, args, amount, gas_limit)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "create_deploy_promise",
            |mut caller: Ctx<'_, H>,
             code_ptr: i32,
             code_len: i32,
             args_ptr: i32,
             args_len: i32,
             nonce_ptr: i32,
             nonce_len: i32,
             amt_ptr: i32,
             amt_len: i32,
             gas_limit: u64|
             -> anyhow::Result<u32> {
                let res = (|| {
                    let code = read_region(&mut caller, code_ptr, code_len, MAX_CODE_SIZE)?;
                    let args =
                        read_region_opt(&mut caller, args_ptr, args_len, MAX_ARGS_SIZE)?;
                    let nonce =
                        read_region_opt(&mut caller, nonce_ptr, nonce_len, MAX_STRING_SIZE)?;
                    let amount = read_amount(&mut caller, amt_ptr, amt_len)?;

                    let cost = caller.data().costs.promise_base;
                    charge(&mut caller, cost)?;
                    charge(&mut caller, gas_limit)?;
                    if !amount.is_empty() {
                        charge_host_op(&mut caller, amount.len())?;
                        caller.data_mut().host.deduct_balance(&amount)?;
                    }
                    caller
                        .data_mut()
                        .queue_deploy(code, args, nonce, amount, gas_limit)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "create_read_contract_data_promise",
            |mut caller: Ctx<'_, H>,
             addr_ptr: i32,
             addr_len: i32,
             key_ptr: i32,
             key_len: i32,
             gas_limit: u64|
             -> anyhow::Result<u32> {
                let res = (|| {
                    let to = read_address(&mut caller, addr_ptr, addr_len)?;
                    let key =
                        read_region(&mut caller, key_ptr, key_len, MAX_STORAGE_KEY_SIZE)?;
                    let cost = caller.data().costs.promise_base;
                    charge(&mut caller, cost)?;
                    charge(&mut caller, gas_limit)?;
                    caller.data_mut().queue_read_contract_data(to, key, gas_limit)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "create_read_identity_promise",
            |mut caller: Ctx<'_, H>,
             addr_ptr: i32,
             addr_len: i32,
             gas_limit: u64|
             -> anyhow::Result<u32> {
                let res = (|| {
                    let addr = read_address(&mut caller, addr_ptr, addr_len)?;
                    let cost = caller.data().costs.promise_base;
                    charge(&mut caller, cost)?;
                    charge(&mut caller, gas_limit)?;
                    caller.data_mut().queue_read_identity(addr, gas_limit)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "promise_then",
            |mut caller: Ctx<'_, H>,
             idx: u32,
             method_ptr: i32,
             method_len: i32,
             args_ptr: i32,
             args_len: i32,
             amt_ptr: i32,
             amt_len: i32,
             gas_limit: u64|
             -> anyhow::Result<()> {
                let res = (|| {
                    let method =
                        read_region(&mut caller, method_ptr, method_len, MAX_STRING_SIZE)?;
                    let args =
                        read_region_opt(&mut caller, args_ptr, args_len, MAX_ARGS_SIZE)?;
                    let amount = read_amount(&mut caller, amt_ptr, amt_len)?;

                    let cost = caller.data().costs.promise_base;
                    charge(&mut caller, cost)?;
                    charge(&mut caller, gas_limit)?;
                    if !amount.is_empty() {
                        charge_host_op(&mut caller, amount.len())?;
                        caller.data_mut().host.deduct_balance(&amount)?;
                    }
                    let method = String::from_utf8_lossy(&method).into_owned();
                    caller
                        .data_mut()
                        .attach_callback(idx, method, args, amount, gas_limit)
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "promise_result",
            |mut caller: Ctx<'_, H>, status_ptr: i32| -> anyhow::Result<i64> {
                let res = (|| {
                    let result = caller.data().promise_result.clone();
                    let (status, value) = match result {
                        None | Some(PromiseResult::Empty) => (1u8, None),
                        Some(PromiseResult::Failed) => (0u8, None),
                        Some(PromiseResult::Value(data)) => (2u8, Some(data)),
                    };
                    {
                        let mem = guest_memory(&mut caller)?;
                        memory::write_bytes(
                            mem.data_mut(&mut caller),
                            status_ptr,
                            &[status],
                        )?;
                    }
                    match value {
                        Some(data) => write_region(&mut caller, &data),
                        None => Ok(0),
                    }
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    Ok(())
}

// ── Diagnostics ──

fn register_diagnostics<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), VmError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "debug",
            |mut caller: Ctx<'_, H>, msg_ptr: i32, msg_len: i32| -> anyhow::Result<()> {
                if !caller.data().debug {
                    return Ok(());
                }
                let res = (|| {
                    let msg = read_region(&mut caller, msg_ptr, msg_len, MAX_STRING_SIZE)?;
                    tracing::debug!(
                        target: "basalt_runtime::guest",
                        message = %String::from_utf8_lossy(&msg),
                        "contract debug print"
                    );
                    Ok(())
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "panic",
            |mut caller: Ctx<'_, H>, msg_ptr: i32, msg_len: i32| -> anyhow::Result<()> {
                let res = (|| -> Result<(), VmError> {
                    let msg = read_region(&mut caller, msg_ptr, msg_len, MAX_STRING_SIZE)?;
                    Err(VmError::ContractTrap(
                        String::from_utf8_lossy(&msg).into_owned(),
                    ))
                })();
                seal(&mut caller, res)
            },
        )
        .map_err(link_err)?;

    Ok(())
}
