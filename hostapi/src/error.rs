//! Host-side error types.
//!
//! Every host callback resolves to one of these variants. Internally the
//! engine works with the typed error; the numeric status code appears only
//! when an outcome crosses the boundary.

use basalt_primitives::StatusCode;

/// Failure of a single host callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The host crashed unexpectedly inside the callback. Engine-fatal,
    /// logged distinctly from ordinary host failures.
    #[error("host panicked: {0}")]
    Panic(String),

    /// The host rejected an argument the engine passed.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// The host's own metering ran out of gas during the callback.
    #[error("out of gas")]
    OutOfGas,

    /// The callback failed for reasons outside the contract's control
    /// (storage backend failure, inconsistent node state). Engine-fatal;
    /// must not be retried transparently.
    #[error("host failure: {0}")]
    Failure(String),

    /// The operation failed for a reason attributable to the contract
    /// (insufficient balance, missing identity). The payload travels back
    /// to the contract's caller.
    #[error("contract error")]
    ContractError(Vec<u8>),
}

/// Convenience result type for host callbacks.
pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    /// Create a host failure from any message.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self::Failure(msg.into())
    }

    /// Create a bad-argument error.
    pub fn bad_argument(msg: impl Into<String>) -> Self {
        Self::BadArgument(msg.into())
    }

    /// Create a contract error from a UTF-8 message payload.
    pub fn contract_error(msg: impl Into<String>) -> Self {
        Self::ContractError(msg.into().into_bytes())
    }

    /// The wire status this error flattens to at the boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Panic(_) => StatusCode::Panic,
            Self::BadArgument(_) => StatusCode::BadArgument,
            Self::OutOfGas => StatusCode::OutOfGas,
            Self::Failure(_) => StatusCode::HostError,
            Self::ContractError(_) => StatusCode::ContractError,
        }
    }

    /// True for errors that abort the whole engine instance rather than
    /// just the contract call.
    pub fn is_engine_fatal(&self) -> bool {
        matches!(self, Self::Panic(_) | Self::Failure(_))
    }
}
