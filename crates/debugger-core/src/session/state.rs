//! Session lifecycle states.

use std::fmt;

/// Why execution left `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HaltCause {
    /// The core stopped with PC on a registered breakpoint.
    Breakpoint(u16),
    /// The core stopped on its own (halting opcode or external stop).
    Program,
    /// The user issued `stop`.
    User,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SessionState {
    /// Waiting for a command.
    #[default]
    Idle,
    /// Executing a single instruction.
    Stepping,
    /// Continuous execution loop active.
    Running,
    /// Execution ended; observers are being notified before `Idle`.
    Halted(HaltCause),
}

impl SessionState {
    /// Short lowercase name used in rejection messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Stepping => "stepping",
            Self::Running => "running",
            Self::Halted(_) => "halted",
        }
    }

    /// Returns `true` while the continuous loop is active.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Halt cause, when halted.
    #[must_use]
    pub const fn halt_cause(self) -> Option<HaltCause> {
        match self {
            Self::Halted(cause) => Some(cause),
            Self::Idle | Self::Stepping | Self::Running => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
