//! `basalt-runtime` — wasmtime-based gas-metered contract execution engine.
//!
//! The engine loads contract bytecode, binds the host capability bridge and
//! the gas meter, invokes a named entry point, applies the actions the
//! contract queued, and returns an encoded action result plus gas usage.
//! It enforces:
//!
//! - **Determinism:** no SIMD, no threads, NaN canonicalization
//! - **Gas metering:** instruction-level fuel plus per-operation host call
//!   costs, reconciled through a single per-request meter
//! - **Import whitelisting:** only `env` function imports, no WASI
//! - **ABI validation:** memory export and entry-point signatures checked
//!   before execution
//! - **Result bounds:** payloads over the fixed maximum fail, never truncate
//!
//! The primary entry points are [`Runtime::execute`] and [`Runtime::deploy`].

pub mod error;
pub mod config;
pub mod memory;
pub mod host_env;
pub mod validation;
pub mod linker;
pub mod runtime;

pub use config::VmConfig;
pub use error::VmError;
pub use runtime::{
    deploy, execute, DeployRequest, ExecuteRequest, ExecutionOutcome, Runtime,
};
