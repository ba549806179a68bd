//! Shared test helpers for integration tests.
//!
//! Provides WAT contract fixtures, a configured in-memory host, and small
//! wrappers for driving the engine.

#![allow(dead_code)]

use basalt_hostapi::MemHost;
use basalt_primitives::{Address, ByteView, InvocationContext};
use basalt_runtime::{DeployRequest, ExecuteRequest, ExecutionOutcome, Runtime};

/// Address of the executing contract in all tests.
pub const CONTRACT: Address = [1u8; 20];

/// The account invoking the contract.
pub const ALICE: Address = [0xA1; 20];

/// Transfer target; matches the address data segment in the fixtures.
pub const BOB: Address = [2u8; 20];

pub const DEFAULT_GAS: u64 = 10_000_000;

/// A host with the standard test contract and caller configured.
pub fn test_host() -> MemHost {
    let host = MemHost::new();
    host.set_contract(CONTRACT);
    host.set_caller(ALICE);
    host
}

pub fn run(host: MemHost, wat: &str, method: &str, args: &[u8]) -> ExecutionOutcome {
    run_with_gas(host, wat, method, args, DEFAULT_GAS)
}

pub fn run_with_gas(
    host: MemHost,
    wat: &str,
    method: &str,
    args: &[u8],
    gas_limit: u64,
) -> ExecutionOutcome {
    Runtime::default().execute(
        host,
        &ExecuteRequest {
            code: wat.as_bytes(),
            method,
            args: ByteView::new(args),
            context: None,
            contract: CONTRACT,
            gas_limit,
            debug: false,
        },
    )
}

pub fn run_with_context(
    host: MemHost,
    wat: &str,
    method: &str,
    args: &[u8],
    context: InvocationContext,
) -> ExecutionOutcome {
    Runtime::default().execute(
        host,
        &ExecuteRequest {
            code: wat.as_bytes(),
            method,
            args: ByteView::new(args),
            context: Some(context),
            contract: CONTRACT,
            gas_limit: DEFAULT_GAS,
            debug: false,
        },
    )
}

pub fn run_deploy(host: MemHost, wat: &str, args: &[u8]) -> ExecutionOutcome {
    Runtime::default().deploy(
        host,
        &DeployRequest {
            code: wat.as_bytes(),
            args: ByteView::new(args),
            contract: CONTRACT,
            gas_limit: DEFAULT_GAS,
            debug: false,
        },
    )
}

// ── Contract fixtures ──

/// Sends 40 coin units to BOB through a transfer promise.
pub const TRANSFER_WAT: &str = r#"
    (module
        (import "env" "create_transfer_promise"
            (func $transfer (param i32 i32 i32 i32)))
        (memory (export "memory") 1)
        (data (i32.const 16)
            "\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02")
        (data (i32.const 48) "\28")
        (func (export "transfer") (param i32 i32) (result i64)
            i32.const 16 i32.const 20
            i32.const 48 i32.const 1
            call $transfer
            i64.const 0)
    )
"#;

/// Writes and reads the key "counter".
pub const STORAGE_WAT: &str = r#"
    (module
        (import "env" "storage_set"
            (func $set (param i32 i32 i32 i32)))
        (import "env" "storage_get"
            (func $get (param i32 i32) (result i64)))
        (import "env" "storage_remove"
            (func $remove (param i32 i32)))
        (memory (export "memory") 1)
        (data (i32.const 0) "counter")
        (data (i32.const 16) "hello world")
        (func (export "put") (param i32 i32) (result i64)
            i32.const 0 i32.const 7
            i32.const 16 i32.const 11
            call $set
            i64.const 0)
        (func (export "get") (param i32 i32) (result i64)
            i32.const 0 i32.const 7
            call $get)
        (func (export "del") (param i32 i32) (result i64)
            i32.const 0 i32.const 7
            call $remove
            i64.const 0)
    )
"#;

/// Assorted pass-through and failure entry points.
pub const UTIL_WAT: &str = r#"
    (module
        (import "env" "keccak256"
            (func $keccak (param i32 i32) (result i64)))
        (import "env" "bytes_to_hex"
            (func $hex (param i32 i32) (result i64)))
        (import "env" "caller"
            (func $caller (result i64)))
        (import "env" "block_seed"
            (func $seed (result i64)))
        (import "env" "panic"
            (func $panic (param i32 i32)))
        (memory (export "memory") 2)
        (data (i32.const 0) "boom")
        (func (export "echo") (param i32 i32) (result i64)
            (i64.or
                (i64.shl (i64.extend_i32_u (local.get 0)) (i64.const 32))
                (i64.extend_i32_u (local.get 1))))
        (func (export "hash") (param i32 i32) (result i64)
            local.get 0 local.get 1
            call $keccak)
        (func (export "hex") (param i32 i32) (result i64)
            local.get 0 local.get 1
            call $hex)
        (func (export "who") (param i32 i32) (result i64)
            call $caller)
        (func (export "seed") (param i32 i32) (result i64)
            call $seed)
        (func (export "big") (param i32 i32) (result i64)
            i64.const 65536)
        (func (export "too_big") (param i32 i32) (result i64)
            i64.const 65537)
        (func (export "spin") (param i32 i32) (result i64)
            (loop $forever
                br $forever)
            i64.const 0)
        (func (export "crash") (param i32 i32) (result i64)
            unreachable)
        (func (export "fail") (param i32 i32) (result i64)
            i32.const 0 i32.const 4
            call $panic
            i64.const 0)
    )
"#;

/// Cross-contract calls with small and oversized gas sub-limits, plus a
/// callback chain.
pub const PROMISE_WAT: &str = r#"
    (module
        (import "env" "create_call_promise"
            (func $call (param i32 i32 i32 i32 i32 i32 i32 i32 i64) (result i32)))
        (import "env" "promise_then"
            (func $then (param i32 i32 i32 i32 i32 i32 i32 i64)))
        (memory (export "memory") 1)
        (data (i32.const 16)
            "\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02")
        (data (i32.const 48) "ping")
        (data (i32.const 64) "_on_ping")
        (func (export "call_small") (param i32 i32) (result i64)
            i32.const 16 i32.const 20
            i32.const 48 i32.const 4
            i32.const 0 i32.const 0
            i32.const 0 i32.const 0
            i64.const 50000
            call $call
            drop
            i64.const 0)
        (func (export "call_huge") (param i32 i32) (result i64)
            i32.const 16 i32.const 20
            i32.const 48 i32.const 4
            i32.const 0 i32.const 0
            i32.const 0 i32.const 0
            i64.const 9000000000
            call $call
            drop
            i64.const 0)
        (func (export "call_then") (param i32 i32) (result i64)
            i32.const 16 i32.const 20
            i32.const 48 i32.const 4
            i32.const 0 i32.const 0
            i32.const 0 i32.const 0
            i64.const 50000
            call $call
            i32.const 64 i32.const 8
            i32.const 0 i32.const 0
            i32.const 0 i32.const 0
            i64.const 30000
            call $then
            i64.const 0)
    )
"#;

/// Queues reads of another contract's data and of an identity record.
pub const READ_WAT: &str = r#"
    (module
        (import "env" "create_read_contract_data_promise"
            (func $read (param i32 i32 i32 i32 i64) (result i32)))
        (import "env" "create_read_identity_promise"
            (func $ident (param i32 i32 i64) (result i32)))
        (memory (export "memory") 1)
        (data (i32.const 16)
            "\03\03\03\03\03\03\03\03\03\03\03\03\03\03\03\03\03\03\03\03")
        (data (i32.const 48) "price")
        (func (export "read_data") (param i32 i32) (result i64)
            i32.const 16 i32.const 20
            i32.const 48 i32.const 5
            i64.const 20000
            call $read
            drop
            i64.const 0)
        (func (export "read_identity") (param i32 i32) (result i64)
            i32.const 16 i32.const 20
            i64.const 20000
            call $ident
            drop
            i64.const 0)
    )
"#;

/// The other contract whose data READ_WAT asks for.
pub const CAROL: Address = [3u8; 20];

/// Queues a deploy of a new contract.
pub const DEPLOY_PROMISE_WAT: &str = r#"
    (module
        (import "env" "create_deploy_promise"
            (func $deploy (param i32 i32 i32 i32 i32 i32 i32 i32 i64) (result i32)))
        (memory (export "memory") 1)
        (data (i32.const 0) "\00asm")
        (func (export "spawn") (param i32 i32) (result i64)
            i32.const 0 i32.const 4
            i32.const 0 i32.const 0
            i32.const 0 i32.const 0
            i32.const 0 i32.const 0
            i64.const 100000
            call $deploy
            drop
            i64.const 0)
    )
"#;

/// Exposes the awaited promise result to a callback entry point.
pub const CALLBACK_WAT: &str = r#"
    (module
        (import "env" "promise_result"
            (func $result (param i32) (result i64)))
        (memory (export "memory") 1)
        (func (export "_on_ping") (param i32 i32) (result i64)
            i32.const 8
            call $result)
    )
"#;

/// Constructor that writes an "init" marker into storage.
pub const DEPLOY_WAT: &str = r#"
    (module
        (import "env" "storage_set"
            (func $set (param i32 i32 i32 i32)))
        (memory (export "memory") 1)
        (data (i32.const 0) "init")
        (func (export "deploy") (param i32 i32) (result i64)
            i32.const 0 i32.const 4
            i32.const 0 i32.const 4
            call $set
            i64.const 0)
    )
"#;

/// Emits one event named "minted" with a two-byte payload.
pub const EVENT_WAT: &str = r#"
    (module
        (import "env" "emit_event"
            (func $event (param i32 i32 i32 i32)))
        (memory (export "memory") 1)
        (data (i32.const 0) "minted")
        (data (i32.const 8) "\00\2a")
        (func (export "mint") (param i32 i32) (result i64)
            i32.const 0 i32.const 6
            i32.const 8 i32.const 2
            call $event
            i64.const 0)
    )
"#;
