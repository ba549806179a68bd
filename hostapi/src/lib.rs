//! `basalt-hostapi` — host capability interface for the Basalt runtime.
//!
//! This crate defines the contract between the execution engine and the
//! blockchain node hosting it:
//!
//! - `HostApi` trait — one method per host capability (storage, chain
//!   context, identities, value transfer, cross-contract calls, crypto,
//!   events); the engine only ever touches world state through it
//! - `HostError` — the failure taxonomy a host call can produce, flattened
//!   to wire status codes only at the boundary
//! - `MemHost` — an in-memory host implementation for tests

pub mod error;
pub mod traits;
pub mod mem_host;

// Re-export commonly used types at the crate root.
pub use error::{HostError, HostResult};
pub use traits::HostApi;
pub use mem_host::MemHost;
