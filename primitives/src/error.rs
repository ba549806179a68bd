//! Status codes and decode errors for the Basalt runtime boundary.

use std::fmt;

/// Status of one execution or host call, as seen across the engine/host
/// boundary.
///
/// The numeric values are the wire contract between the engine and the host
/// and must never change: any persisted outcome or cross-process log relies
/// on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    /// Completed successfully.
    Ok = 0,
    /// A host callback failed unexpectedly. Treated like a host error but
    /// reported separately so operators can tell crashes from failures.
    Panic = 1,
    /// The request or a callback argument was malformed. Caller's fault; no
    /// gas is charged beyond validation.
    BadArgument = 2,
    /// The gas budget was exhausted. Terminal, no refund.
    OutOfGas = 3,
    /// A host callback failed for reasons outside the contract's control.
    /// Engine-fatal; the host must not transparently retry.
    HostError = 4,
    /// The contract failed: an explicit error signal, a bytecode trap, or an
    /// oversized result. The payload (if any) travels in the action result.
    ContractError = 5,
}

impl StatusCode {
    /// Convert from the u8 wire value.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Ok),
            1 => Some(Self::Panic),
            2 => Some(Self::BadArgument),
            3 => Some(Self::OutOfGas),
            4 => Some(Self::HostError),
            5 => Some(Self::ContractError),
            _ => None,
        }
    }

    /// Return the u8 wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns true if this is the `Ok` variant.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Panic => write!(f, "PANIC"),
            Self::BadArgument => write!(f, "BAD_ARGUMENT"),
            Self::OutOfGas => write!(f, "OUT_OF_GAS"),
            Self::HostError => write!(f, "HOST_ERROR"),
            Self::ContractError => write!(f, "CONTRACT_ERROR"),
        }
    }
}

/// Error raised when decoding a boundary buffer fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("decode error: {0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(msg: impl Into<String>) -> Self {
        DecodeError(msg.into())
    }
}
