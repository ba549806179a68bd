//! Engine error types.
//!
//! `VmError` is the typed failure taxonomy used everywhere inside the
//! engine; it flattens to a [`StatusCode`] only when an outcome crosses the
//! boundary back to the host.

use basalt_hostapi::HostError;
use basalt_primitives::{OutOfGas, StatusCode};

/// Failure of one execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    /// The request was malformed: unknown entry point, forbidden method,
    /// uncompilable code, oversized arguments. No gas beyond validation.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// The gas budget is exhausted. Terminal, no refund.
    #[error("out of gas")]
    OutOfGas,

    /// The bytecode raised a runtime fault: memory fault, unreachable,
    /// explicit guest panic. Gas already spent is not refunded.
    #[error("contract trap: {0}")]
    ContractTrap(String),

    /// The contract signaled failure with a payload for its caller.
    #[error("contract error: {}", String::from_utf8_lossy(.0))]
    ContractError(Vec<u8>),

    /// A host callback failed outside the contract's control. Engine-fatal.
    #[error("host failure: {0}")]
    HostFailure(String),

    /// A host callback panicked. Engine-fatal, logged distinctly.
    #[error("host panicked: {0}")]
    HostPanic(String),

    /// The result payload exceeded the fixed maximum.
    #[error("result too large: {actual} bytes exceeds maximum of {max}")]
    ResultTooLarge { actual: usize, max: usize },

    /// An engine invariant broke. Engine-fatal.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VmError {
    pub fn bad_argument(msg: impl Into<String>) -> Self {
        Self::BadArgument(msg.into())
    }

    pub fn contract_trap(msg: impl Into<String>) -> Self {
        Self::ContractTrap(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The wire status this error flattens to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadArgument(_) => StatusCode::BadArgument,
            Self::OutOfGas => StatusCode::OutOfGas,
            Self::ContractTrap(_)
            | Self::ContractError(_)
            | Self::ResultTooLarge { .. } => StatusCode::ContractError,
            Self::HostFailure(_) | Self::Internal(_) => StatusCode::HostError,
            Self::HostPanic(_) => StatusCode::Panic,
        }
    }

    /// True for failures that abort the engine instance itself. The host
    /// must not reuse this execution's state and gets no partial result.
    pub fn is_engine_fatal(&self) -> bool {
        matches!(
            self,
            Self::HostFailure(_) | Self::HostPanic(_) | Self::Internal(_)
        )
    }
}

impl From<HostError> for VmError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Panic(msg) => Self::HostPanic(msg),
            HostError::BadArgument(msg) => Self::BadArgument(msg),
            HostError::OutOfGas => Self::OutOfGas,
            HostError::Failure(msg) => Self::HostFailure(msg),
            HostError::ContractError(payload) => Self::ContractError(payload),
        }
    }
}

impl From<OutOfGas> for VmError {
    fn from(_: OutOfGas) -> Self {
        Self::OutOfGas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_flattening() {
        assert_eq!(
            VmError::bad_argument("x").status_code(),
            StatusCode::BadArgument
        );
        assert_eq!(VmError::OutOfGas.status_code(), StatusCode::OutOfGas);
        assert_eq!(
            VmError::contract_trap("unreachable").status_code(),
            StatusCode::ContractError
        );
        assert_eq!(
            VmError::ContractError(b"err".to_vec()).status_code(),
            StatusCode::ContractError
        );
        assert_eq!(
            VmError::ResultTooLarge { actual: 1, max: 0 }.status_code(),
            StatusCode::ContractError
        );
        assert_eq!(
            VmError::HostFailure("db".into()).status_code(),
            StatusCode::HostError
        );
        assert_eq!(
            VmError::HostPanic("crash".into()).status_code(),
            StatusCode::Panic
        );
        assert_eq!(
            VmError::internal("bug").status_code(),
            StatusCode::HostError
        );
    }

    #[test]
    fn test_host_error_conversion() {
        let err: VmError = HostError::OutOfGas.into();
        assert_eq!(err, VmError::OutOfGas);

        let err: VmError = HostError::contract_error("no funds").into();
        assert_eq!(err, VmError::ContractError(b"no funds".to_vec()));

        let err: VmError = HostError::Panic("boom".into()).into();
        assert!(err.is_engine_fatal());
    }

    #[test]
    fn test_engine_fatal() {
        assert!(VmError::HostFailure("x".into()).is_engine_fatal());
        assert!(VmError::HostPanic("x".into()).is_engine_fatal());
        assert!(VmError::internal("x").is_engine_fatal());
        assert!(!VmError::OutOfGas.is_engine_fatal());
        assert!(!VmError::contract_trap("x").is_engine_fatal());
    }
}
