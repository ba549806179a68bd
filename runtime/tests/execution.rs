//! End-to-end execution tests: entry-point dispatch, host calls, deferred
//! actions, callbacks, and deploys.

mod common;

use basalt_primitives::{
    codec, crypto, Action, InvocationContext, PromiseResult, StatusCode,
};
use common::*;

// ── Scenario: transfer with sufficient balance ──

#[test]
fn test_transfer_emits_one_transfer_action() {
    let host = test_host();
    host.set_balance(CONTRACT, 100);

    let outcome = run(host.clone(), TRANSFER_WAT, "transfer", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);

    let result = outcome.decoded().expect("well-formed action result");
    assert!(result.success);
    assert_eq!(result.sub_results.len(), 1);
    assert!(matches!(
        result.sub_results[0].input_action,
        Action::Transfer(_)
    ));
    assert!(result.sub_results[0].success);

    // The amount moved: 40 out of the contract, 40 into BOB.
    assert_eq!(host.balance_of(&CONTRACT), 60);
    assert_eq!(host.balance_of(&BOB), 40);
}

#[test]
fn test_transfer_with_insufficient_balance_is_contract_error() {
    let host = test_host();
    host.set_balance(CONTRACT, 10); // transfer wants 40

    let outcome = run(host.clone(), TRANSFER_WAT, "transfer", &[]);
    assert_eq!(outcome.status, StatusCode::ContractError);

    let result = outcome.decoded().expect("well-formed action result");
    assert!(!result.success);
    assert_eq!(result.output_data, b"insufficient funds");

    // Nothing moved.
    assert_eq!(host.balance_of(&CONTRACT), 10);
    assert_eq!(host.balance_of(&BOB), 0);
}

// ── Storage ──

#[test]
fn test_storage_put_then_get() {
    let host = test_host();

    let outcome = run(host.clone(), STORAGE_WAT, "put", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(host.storage_value(b"counter"), Some(b"hello world".to_vec()));

    let outcome = run(host.clone(), STORAGE_WAT, "get", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    let result = outcome.decoded().unwrap();
    assert_eq!(result.output_data, b"hello world");
}

#[test]
fn test_storage_get_missing_returns_no_payload() {
    let outcome = run(test_host(), STORAGE_WAT, "get", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    assert!(outcome.decoded().unwrap().output_data.is_empty());
}

#[test]
fn test_storage_remove() {
    let host = test_host();
    host.insert_storage(b"counter".to_vec(), b"1".to_vec());

    let outcome = run(host.clone(), STORAGE_WAT, "del", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(host.storage_value(b"counter"), None);
}

// ── Entry-point dispatch and results ──

#[test]
fn test_echo_returns_arguments() {
    let outcome = run(test_host(), UTIL_WAT, "echo", b"payload bytes");
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(outcome.decoded().unwrap().output_data, b"payload bytes");
}

#[test]
fn test_keccak_through_host() {
    let outcome = run(test_host(), UTIL_WAT, "hash", b"abc");
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(
        outcome.decoded().unwrap().output_data,
        crypto::keccak256(b"abc").to_vec()
    );
}

#[test]
fn test_bytes_to_hex() {
    let outcome = run(test_host(), UTIL_WAT, "hex", &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(outcome.decoded().unwrap().output_data, b"deadbeef");
}

#[test]
fn test_caller_visible_to_contract() {
    let outcome = run(test_host(), UTIL_WAT, "who", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(outcome.decoded().unwrap().output_data, ALICE.to_vec());
}

#[test]
fn test_block_seed_visible_to_contract() {
    let outcome = run(test_host(), UTIL_WAT, "seed", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(outcome.decoded().unwrap().output_data, vec![0x5E; 32]);
}

// ── Scenario: unknown entry point ──

#[test]
fn test_unknown_entry_point_is_bad_argument_with_zero_gas() {
    let outcome = run(test_host(), UTIL_WAT, "does_not_exist", &[]);
    assert_eq!(outcome.status, StatusCode::BadArgument);
    assert_eq!(outcome.gas_used, 0);

    let result = outcome.decoded().expect("failure outcome is well-formed");
    assert!(!result.success);
}

#[test]
fn test_calling_deploy_directly_is_forbidden() {
    let outcome = run(test_host(), DEPLOY_WAT, "deploy", &[]);
    assert_eq!(outcome.status, StatusCode::BadArgument);
    assert_eq!(outcome.gas_used, 0);
}

#[test]
fn test_calling_callback_directly_is_forbidden() {
    let outcome = run(test_host(), CALLBACK_WAT, "_on_ping", &[]);
    assert_eq!(outcome.status, StatusCode::BadArgument);
}

#[test]
fn test_garbage_code_is_bad_argument() {
    let host = test_host();
    let outcome = basalt_runtime::execute(
        host,
        &basalt_runtime::ExecuteRequest {
            code: b"this is not wasm",
            method: "run",
            args: basalt_primitives::ByteView::nil(),
            context: None,
            contract: CONTRACT,
            gas_limit: DEFAULT_GAS,
            debug: false,
        },
    );
    assert_eq!(outcome.status, StatusCode::BadArgument);
    assert_eq!(outcome.gas_used, 0);
}

// ── Traps ──

#[test]
fn test_unreachable_is_contract_error() {
    let outcome = run(test_host(), UTIL_WAT, "crash", &[]);
    assert_eq!(outcome.status, StatusCode::ContractError);
    let result = outcome.decoded().unwrap();
    assert!(!result.success);
    assert!(!result.error.is_empty());
}

#[test]
fn test_guest_panic_is_contract_error_with_message() {
    let outcome = run(test_host(), UTIL_WAT, "fail", &[]);
    assert_eq!(outcome.status, StatusCode::ContractError);
    let result = outcome.decoded().unwrap();
    assert!(result.error.contains("boom"), "error: {}", result.error);
}

// ── Cross-contract calls and callbacks ──

#[test]
fn test_call_promise_applied_through_host() {
    let host = test_host();
    let outcome = run(host.clone(), PROMISE_WAT, "call_small", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);

    let calls = host.recorded_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].to, BOB);
    assert_eq!(calls[0].method, "ping");
    assert_eq!(calls[0].gas_limit, 50_000);

    let result = outcome.decoded().unwrap();
    assert_eq!(result.sub_results.len(), 1);
    assert!(result.sub_results[0].success);
}

#[test]
fn test_callback_runs_after_call_with_context() {
    let host = test_host();
    let outcome = run(host.clone(), PROMISE_WAT, "call_then", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);

    let calls = host.recorded_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, "ping");
    // The callback targets the issuing contract.
    assert_eq!(calls[1].to, CONTRACT);
    assert_eq!(calls[1].method, "_on_ping");

    let ctx = codec::decode_invocation_context(&calls[1].invocation_ctx).unwrap();
    assert!(ctx.is_callback);
    assert_eq!(ctx.promise_result, Some(PromiseResult::Empty));

    // One result for the call, one for its callback, order preserved.
    let result = outcome.decoded().unwrap();
    assert_eq!(result.sub_results.len(), 2);
}

#[test]
fn test_callback_sees_call_output_as_value() {
    let host = test_host();
    host.set_call_output(b"pong".to_vec());
    let _ = run(host.clone(), PROMISE_WAT, "call_then", &[]);

    let calls = host.recorded_calls();
    let ctx = codec::decode_invocation_context(&calls[1].invocation_ctx).unwrap();
    assert_eq!(ctx.promise_result, Some(PromiseResult::Value(b"pong".to_vec())));
}

#[test]
fn test_promise_result_reaches_callback_entry_point() {
    let outcome = run_with_context(
        test_host(),
        CALLBACK_WAT,
        "_on_ping",
        &[],
        InvocationContext {
            is_callback: true,
            promise_result: Some(PromiseResult::Value(b"42".to_vec())),
        },
    );
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(outcome.decoded().unwrap().output_data, b"42");
}

#[test]
fn test_failed_sub_call_produces_failed_sub_result() {
    let host = test_host();
    host.fail_calls_with(basalt_hostapi::HostError::contract_error("nope"));

    let outcome = run(host.clone(), PROMISE_WAT, "call_small", &[]);
    // The entry point itself completed; the failure lives in the sub-result.
    assert_eq!(outcome.status, StatusCode::Ok);
    let result = outcome.decoded().unwrap();
    assert_eq!(result.sub_results.len(), 1);
    assert!(!result.sub_results[0].success);
}

// ── Sharded reads ──

#[test]
fn test_read_contract_data_action() {
    let host = test_host();
    host.insert_contract_data(CAROL, b"price".to_vec(), b"99".to_vec());

    let outcome = run(host, READ_WAT, "read_data", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);

    let result = outcome.decoded().unwrap();
    assert_eq!(result.sub_results.len(), 1);
    let sub = &result.sub_results[0];
    assert!(matches!(sub.input_action, Action::ReadContractData(_)));
    assert!(sub.success);
    assert_eq!(sub.output_data, b"99");
    assert_eq!(sub.contract, CAROL);
}

#[test]
fn test_read_missing_contract_data_succeeds_empty() {
    let outcome = run(test_host(), READ_WAT, "read_data", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    let result = outcome.decoded().unwrap();
    assert!(result.sub_results[0].success);
    assert!(result.sub_results[0].output_data.is_empty());
}

#[test]
fn test_read_identity_action() {
    let host = test_host();
    host.insert_identity(CAROL, b"verified".to_vec());

    let outcome = run(host, READ_WAT, "read_identity", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);

    let result = outcome.decoded().unwrap();
    let sub = &result.sub_results[0];
    assert!(matches!(sub.input_action, Action::ReadIdentity(_)));
    assert_eq!(sub.output_data, b"verified");
}

// ── Deploy promises ──

#[test]
fn test_deploy_promise_applied_through_host() {
    let host = test_host();
    let outcome = run(host.clone(), DEPLOY_PROMISE_WAT, "spawn", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);

    let deploys = host.recorded_deploys();
    assert_eq!(deploys.len(), 1);
    assert_eq!(deploys[0].code, b"\x00asm");
    assert_eq!(deploys[0].gas_limit, 100_000);

    let result = outcome.decoded().unwrap();
    assert!(matches!(
        result.sub_results[0].input_action,
        Action::DeployContract(_)
    ));
}

// ── Events ──

#[test]
fn test_emit_event_reaches_host() {
    let host = test_host();
    let outcome = run(host.clone(), EVENT_WAT, "mint", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);

    let events = host.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, b"minted");
    assert_eq!(events[0].1, vec![0x00, 0x2A]);
}

// ── Deploy ──

#[test]
fn test_deploy_runs_constructor() {
    let host = test_host();
    let outcome = run_deploy(host.clone(), DEPLOY_WAT, &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(host.storage_value(b"init"), Some(b"init".to_vec()));

    let result = outcome.decoded().unwrap();
    assert!(matches!(result.input_action, Action::DeployContract(_)));
}

#[test]
fn test_deploy_without_constructor_is_bad_argument() {
    let outcome = run_deploy(test_host(), STORAGE_WAT, &[]);
    assert_eq!(outcome.status, StatusCode::BadArgument);
    assert_eq!(outcome.gas_used, 0);
}

#[test]
fn test_deploy_charges_deploy_base_cost() {
    let outcome = run_deploy(test_host(), DEPLOY_WAT, &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    assert!(outcome.gas_used >= 3_000_000);
}
