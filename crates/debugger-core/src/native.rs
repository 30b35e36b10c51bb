//! Foreign-function boundary of the native 6502 emulation core.
//!
//! The core executes instructions, owns the memory array and computes flags.
//! The session only ever talks to it through [`NativeCore`]; every call can
//! fail when the host module is unavailable, so each returns a `Result`.

use crate::NativeError;

/// Result alias for boundary calls.
pub type NativeResult<T> = Result<T, NativeError>;

/// Status register bit, in the fixed hardware bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum StatusFlag {
    /// Bit 0.
    Carry = 0,
    /// Bit 1.
    Zero = 1,
    /// Bit 2.
    InterruptDisable = 2,
    /// Bit 3.
    Decimal = 3,
    /// Bit 4.
    Break = 4,
    /// Bit 5.
    Unused = 5,
    /// Bit 6.
    Overflow = 6,
    /// Bit 7.
    Negative = 7,
}

impl StatusFlag {
    /// All flags ordered by bit index.
    pub const ALL: [Self; 8] = [
        Self::Carry,
        Self::Zero,
        Self::InterruptDisable,
        Self::Decimal,
        Self::Break,
        Self::Unused,
        Self::Overflow,
        Self::Negative,
    ];

    /// Bit index inside the status register.
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Mask of this flag inside the status register.
    #[must_use]
    pub const fn mask(self) -> u8 {
        1 << self.bit()
    }

    /// Conventional one-letter name (`C Z I D B U V N`).
    #[must_use]
    pub const fn short_name(self) -> char {
        match self {
            Self::Carry => 'C',
            Self::Zero => 'Z',
            Self::InterruptDisable => 'I',
            Self::Decimal => 'D',
            Self::Break => 'B',
            Self::Unused => 'U',
            Self::Overflow => 'V',
            Self::Negative => 'N',
        }
    }
}

/// Host adapter for the native emulation core.
///
/// Implementations forward each call to the core unchanged. The disassembly
/// queries return the raw delimited wire string; decoding it is the
/// session's job.
pub trait NativeCore {
    /// Executes exactly one instruction.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn step(&mut self) -> NativeResult<()>;

    /// Sets the core's running flag.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn run(&mut self) -> NativeResult<()>;

    /// Clears the core's running flag.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn stop(&mut self) -> NativeResult<()>;

    /// Resets the CPU through the reset vector and clears statistics.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn reset(&mut self) -> NativeResult<()>;

    /// Reports whether the core still considers itself running.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn is_running(&mut self) -> NativeResult<bool>;

    /// Registers a halting breakpoint inside the core.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn add_breakpoint(&mut self, addr: u16) -> NativeResult<()>;

    /// Removes a halting breakpoint from the core.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn remove_breakpoint(&mut self, addr: u16) -> NativeResult<()>;

    /// Removes every breakpoint from the core.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn clear_breakpoints(&mut self) -> NativeResult<()>;

    /// Accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn register_a(&mut self) -> NativeResult<u8>;

    /// X index register.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn register_x(&mut self) -> NativeResult<u8>;

    /// Y index register.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn register_y(&mut self) -> NativeResult<u8>;

    /// Stack pointer (offset into page `0x01`).
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn register_sp(&mut self) -> NativeResult<u8>;

    /// Program counter.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn register_pc(&mut self) -> NativeResult<u16>;

    /// Overwrites the program counter.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn set_register_pc(&mut self, pc: u16) -> NativeResult<()>;

    /// Raw status register.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn register_status(&mut self) -> NativeResult<u8>;

    /// Single status flag.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn status_flag(&mut self, flag: StatusFlag) -> NativeResult<bool>;

    /// Reads one byte from the core's address space.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn read_memory(&mut self, addr: u16) -> NativeResult<u8>;

    /// Writes one byte into the core's address space.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn write_memory(&mut self, addr: u16, value: u8) -> NativeResult<()>;

    /// Instructions retired since the last reset.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn instruction_count(&mut self) -> NativeResult<u64>;

    /// Cycles elapsed since the last reset.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn cycle_count(&mut self) -> NativeResult<u64>;

    /// Wire-format disassembly of `before` instructions ahead of PC and
    /// `after` instructions from PC on.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn disassemble_around_pc(&mut self, before: u16, after: u16) -> NativeResult<String>;

    /// Wire-format disassembly of the inclusive range `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the boundary call fails.
    fn disassemble_range(&mut self, start: u16, end: u16) -> NativeResult<String>;
}
