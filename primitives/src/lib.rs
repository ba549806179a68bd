//! `basalt-primitives` — foundational types for the Basalt contract runtime.
//!
//! This crate provides the canonical types shared by the host API and the
//! execution engine:
//!
//! - `StatusCode` — the wire status enumeration for the engine/host boundary
//! - `GasMeter` / `CostSchedule` — gas accounting and cost policy
//! - `Action` / `ActionResult` — the deferred-action model and its result tree
//! - `OwnedBuffer` / `ByteView` — move-only and borrowed boundary buffers
//! - `codec` — deterministic, self-describing serialization for boundary types
//! - `crypto` — reference keccak256 and ECDSA recovery

pub mod types;
pub mod error;
pub mod gas;
pub mod buffer;
pub mod action;
pub mod codec;
pub mod crypto;

// Re-export commonly used types at the crate root for convenience.
pub use types::{Address, Amount, Gas, Hash, ADDRESS_LEN, MAX_ACTION_RESULT_SIZE};
pub use error::{DecodeError, StatusCode};
pub use gas::{CostSchedule, GasMeter, OutOfGas};
pub use buffer::{ByteView, OwnedBuffer};
pub use action::{
    Action, ActionResult, DeployContractAction, FunctionCallAction,
    InvocationContext, Promise, PromiseResult, ReadContractDataAction,
    ReadIdentityAction, TransferAction,
};
