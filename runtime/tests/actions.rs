//! Action result encoding at the boundary: round-trips of real execution
//! output and the fixed result-size cap.

mod common;

use basalt_primitives::{codec, Action, StatusCode, MAX_ACTION_RESULT_SIZE};
use common::*;

// ── Round-trips of engine-produced buffers ──

#[test]
fn test_outcome_with_no_actions_roundtrips() {
    let outcome = run(test_host(), STORAGE_WAT, "put", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);

    let bytes = outcome.action_result.as_slice().unwrap();
    let decoded = codec::decode_action_result(bytes).unwrap();
    assert!(decoded.success);
    assert!(decoded.sub_results.is_empty());
    assert_eq!(codec::encode_action_result(&decoded), bytes);
}

#[test]
fn test_outcome_with_one_action_roundtrips() {
    let host = test_host();
    host.set_balance(CONTRACT, 100);
    let outcome = run(host, TRANSFER_WAT, "transfer", &[]);

    let bytes = outcome.action_result.as_slice().unwrap();
    let decoded = codec::decode_action_result(bytes).unwrap();
    assert_eq!(decoded.sub_results.len(), 1);
    assert_eq!(codec::encode_action_result(&decoded), bytes);
}

#[test]
fn test_outcome_with_action_chain_preserves_order() {
    let host = test_host();
    let outcome = run(host, PROMISE_WAT, "call_then", &[]);

    let bytes = outcome.action_result.as_slice().unwrap();
    let decoded = codec::decode_action_result(bytes).unwrap();
    assert_eq!(decoded.sub_results.len(), 2);
    // Call first, callback second — insertion order survives encoding.
    assert!(matches!(
        decoded.sub_results[0].input_action,
        Action::FunctionCall(_)
    ));
    assert_eq!(codec::encode_action_result(&decoded), bytes);
}

#[test]
fn test_input_action_records_the_request() {
    let outcome = run(test_host(), UTIL_WAT, "echo", b"xyz");
    let decoded = outcome.decoded().unwrap();
    match decoded.input_action {
        Action::FunctionCall(call) => {
            assert_eq!(call.method, "echo");
            assert_eq!(call.args, b"xyz");
            assert_eq!(call.gas_limit, DEFAULT_GAS);
        }
        other => panic!("expected FunctionCall, got {other:?}"),
    }
    assert_eq!(decoded.contract, CONTRACT);
}

// ── Result size cap ──

#[test]
fn test_result_of_exactly_max_size_succeeds() {
    let outcome = run(test_host(), UTIL_WAT, "big", &[]);
    assert_eq!(outcome.status, StatusCode::Ok);
    let decoded = outcome.decoded().unwrap();
    assert_eq!(decoded.output_data.len(), MAX_ACTION_RESULT_SIZE);
}

#[test]
fn test_result_one_byte_over_max_fails_not_truncates() {
    let outcome = run(test_host(), UTIL_WAT, "too_big", &[]);
    assert_eq!(outcome.status, StatusCode::ContractError);

    let decoded = outcome.decoded().unwrap();
    assert!(!decoded.success);
    assert!(
        decoded.error.contains("result too large"),
        "error: {}",
        decoded.error
    );
    // Failure, not a truncated payload.
    assert!(decoded.output_data.is_empty());
}

// ── Failure outcomes stay well-formed ──

#[test]
fn test_failure_outcomes_decode() {
    let cases = [
        ("missing", StatusCode::BadArgument),
        ("crash", StatusCode::ContractError),
    ];
    for (method, expected) in cases {
        let outcome = run(test_host(), UTIL_WAT, method, &[]);
        assert_eq!(outcome.status, expected);
        let decoded = outcome
            .decoded()
            .expect("every failure outcome must still decode");
        assert!(!decoded.success);
    }
}

#[test]
fn test_out_of_gas_outcome_decodes() {
    let outcome = run_with_gas(test_host(), UTIL_WAT, "spin", &[], 300_000);
    assert_eq!(outcome.status, StatusCode::OutOfGas);
    let decoded = outcome.decoded().unwrap();
    assert!(!decoded.success);
    assert_eq!(decoded.gas_used, 300_000);
    assert_eq!(decoded.remaining_gas, 0);
}
