use thiserror::Error;

/// Failure reported by a call across the native core boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("native call `{call}` failed: {reason}")]
pub struct NativeError {
    /// Name of the boundary function that failed.
    pub call: &'static str,
    /// Host-provided failure description.
    pub reason: String,
}

impl NativeError {
    /// Creates a boundary failure for `call`.
    #[must_use]
    pub fn new(call: &'static str, reason: impl Into<String>) -> Self {
        Self {
            call,
            reason: reason.into(),
        }
    }
}

/// Rejected session configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConfigError {
    /// The per-tick time slice must be non-zero.
    #[error("time slice must be greater than zero")]
    ZeroTimeSlice,
    /// The per-tick instruction cap must allow at least one step.
    #[error("per-tick instruction cap must be at least 1")]
    ZeroInstructionCap,
    /// The refresh timer period must be non-zero.
    #[error("refresh interval must be greater than zero")]
    ZeroRefreshInterval,
}

/// Caller-visible failure of a facade or controller operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Address input outside `0x0000..=0xFFFF`.
    #[error("address {0} is outside 0x0000..=0xFFFF")]
    AddressOutOfRange(i64),
    /// Byte value input outside `0x00..=0xFF`.
    #[error("value {0} is outside 0x00..=0xFF")]
    ValueOutOfRange(i64),
    /// Text input that is not a hexadecimal number.
    #[error("`{0}` is not a hexadecimal number")]
    InvalidHex(String),
    /// A block load would run past the end of the address space.
    #[error("block of {len} bytes at ${start:04X} runs past $FFFF")]
    BlockOverflow {
        /// First address of the block.
        start: u16,
        /// Block length in bytes.
        len: usize,
    },
    /// Command is not accepted in the current session state.
    #[error("cannot {command} while {state}")]
    InvalidTransition {
        /// Rejected command name.
        command: &'static str,
        /// Session state at the time of the command.
        state: &'static str,
    },
    /// Program text contained a token that is not a hex byte.
    #[error("Invalid opcode format: {0}")]
    InvalidOpcodeText(String),
    /// Program load with no bytes.
    #[error("program contains no bytes")]
    EmptyProgram,
    /// No bundled example program with this name.
    #[error("unknown example program `{0}`")]
    UnknownProgram(String),
    /// Session configuration rejected.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    /// Native core call failed.
    #[error(transparent)]
    Native(#[from] NativeError),
}

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
