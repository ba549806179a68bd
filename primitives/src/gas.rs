//! Gas accounting for the Basalt runtime.
//!
//! Gas is consumed for guest compute (via the evaluator's fuel metering) and
//! for host calls (a base cost per operation, plus per-byte charges where
//! the operation moves data). The [`GasMeter`] is the single source of truth
//! for the budget of one execution.

use crate::error::StatusCode;

/// Base cost of queueing any deferred action (promise).
pub const BASE_PROMISE_COST: u64 = 100_000;

/// Base cost of a contract deploy.
pub const BASE_DEPLOY_COST: u64 = 3_000_000;

/// Base cost of a contract call.
pub const BASE_CALL_COST: u64 = 100_000;

/// Base cost of the bytes-to-hex host operation.
pub const BASE_BYTES_TO_HEX_COST: u64 = 10_000;

/// Default base cost of a plain host call (storage, chain context, crypto).
pub const BASE_HOST_OP_COST: u64 = 100;

/// Default per-byte cost added to host operations that move data.
pub const PER_BYTE_COST: u64 = 1;

/// Gas cost policy for one execution.
///
/// These are policy constants, not mechanism: the defaults match the
/// boundary contract, but a host may tune them per network upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostSchedule {
    /// Charged up front for every `execute`.
    pub call_base: u64,
    /// Charged up front for every `deploy`.
    pub deploy_base: u64,
    /// Charged when a deferred action is queued.
    pub promise_base: u64,
    /// Charged for the bytes-to-hex operation.
    pub bytes_to_hex_base: u64,
    /// Charged for every other host operation.
    pub host_op_base: u64,
    /// Added per byte moved across the host boundary.
    pub per_byte: u64,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            call_base: BASE_CALL_COST,
            deploy_base: BASE_DEPLOY_COST,
            promise_base: BASE_PROMISE_COST,
            bytes_to_hex_base: BASE_BYTES_TO_HEX_COST,
            host_op_base: BASE_HOST_OP_COST,
            per_byte: PER_BYTE_COST,
        }
    }
}

impl CostSchedule {
    /// Cost of a host operation that moves `bytes` across the boundary.
    pub fn host_op(&self, bytes: usize) -> u64 {
        self.host_op_base
            .saturating_add((bytes as u64).saturating_mul(self.per_byte))
    }

    /// Cost of hex-encoding `bytes` for the guest.
    pub fn bytes_to_hex(&self, bytes: usize) -> u64 {
        self.bytes_to_hex_base.saturating_add(bytes as u64)
    }
}

/// Tracks gas consumption during one execution.
///
/// A meter is exclusive to one in-flight execution request; it is never
/// shared across concurrent requests.
#[derive(Debug, Clone)]
pub struct GasMeter {
    limit: u64,
    consumed: u64,
}

/// Error returned when a charge would exceed the gas limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("out of gas")]
pub struct OutOfGas;

impl OutOfGas {
    /// The wire status for gas exhaustion.
    pub fn status_code(self) -> StatusCode {
        StatusCode::OutOfGas
    }
}

impl GasMeter {
    /// Create a new gas meter with the given limit.
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Charge gas. Returns `Err(OutOfGas)` if the limit would be exceeded.
    ///
    /// The charge is checked before it is applied: on error the consumed
    /// count is unchanged, never half-applied.
    pub fn charge(&mut self, amount: u64) -> Result<(), OutOfGas> {
        let new_consumed = match self.consumed.checked_add(amount) {
            Some(v) if v <= self.limit => v,
            _ => return Err(OutOfGas),
        };
        self.consumed = new_consumed;
        Ok(())
    }

    /// Fold in gas accounted for elsewhere (the evaluator's instruction
    /// metering). `total_consumed` is the overall figure for this execution;
    /// the meter takes the maximum of both views, clamped to the limit.
    ///
    /// Consumption never decreases and never exceeds the limit, so
    /// `gas_used <= gas_limit` holds at every checkpoint.
    pub fn absorb(&mut self, total_consumed: u64) {
        let clamped = total_consumed.min(self.limit);
        if clamped > self.consumed {
            self.consumed = clamped;
        }
    }

    /// Refund gas that was reserved but not spent (e.g. a sub-call's unused
    /// budget). Saturates at zero.
    pub fn refund(&mut self, amount: u64) {
        self.consumed = self.consumed.saturating_sub(amount);
    }

    /// Returns the total gas consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns the remaining gas before the limit is reached.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed)
    }

    /// Returns the gas limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns true if all gas has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.consumed >= self.limit
    }
}
