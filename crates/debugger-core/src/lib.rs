//! Debugger session controller for a 6502 native emulation core.

/// Error taxonomy for facade, decoder inputs and controller commands.
pub mod error;
pub use error::{ConfigError, NativeError, SessionError, SessionResult};

/// Address/value validation at the host boundary.
pub mod address;
pub use address::{
    address_from, byte_from, parse_hex_address, parse_hex_byte, ADDRESS_SPACE_BYTES,
    RESET_VECTOR_HI, RESET_VECTOR_LO, STACK_PAGE_END, STACK_PAGE_START,
};

/// Foreign-function boundary of the native core.
pub mod native;
pub use native::{NativeCore, NativeResult, StatusFlag};

/// Memory facade and display windows.
pub mod memory;
pub use memory::{
    MemoryDump, MemoryFacade, MemoryPage, MemoryPageView, MemoryRow, BRK_OPCODE, BYTES_PER_ROW,
    PAGE_BYTES,
};

/// Wire-format disassembly decoder.
pub mod decoder;
pub use decoder::{
    decode_disassembly, Instruction, COMPENSATED_OPCODES, FIELD_DELIMITER, RECORD_DELIMITER,
    RECORD_FIELD_COUNT,
};

/// Operand rendering and addressing-mode classification.
pub mod disasm;
pub use disasm::{
    branch_target, is_branch_opcode, render_operand, AddressingMode, RenderedOperand,
    IMMEDIATE_OPCODES,
};

/// Breakpoint set mirrored into the core.
pub mod breakpoints;
pub use breakpoints::BreakpointSet;

/// CPU snapshot types.
pub mod snapshot;
pub use snapshot::{CpuSnapshot, ExecutionStats, Registers, StatusFlags};

/// Hex listings and bundled example programs.
pub mod program;
pub use program::{parse_opcode_text, ExampleProgram};

/// Run-loop budgets and time sources.
pub mod timing;
pub use timing::{
    Clock, MonotonicClock, SliceBudget, DEFAULT_MAX_INSTRUCTIONS_PER_TICK,
    DEFAULT_REFRESH_INTERVAL, DEFAULT_TIME_SLICE,
};

/// Session configuration.
pub mod config;
pub use config::{
    SessionConfig, DEFAULT_DISASSEMBLY_AFTER, DEFAULT_DISASSEMBLY_BEFORE, DEFAULT_LOAD_ADDRESS,
};

/// Session controller and state machine.
pub mod session;
pub use session::{
    FrameHandle, HaltCause, HostScheduler, InstructionRow, ManualScheduler, ObservableState,
    SchedulerStats, Session, SessionEvent, SessionObserver, SessionState, TickOutcome,
    TimerHandle,
};

#[cfg(test)]
mod testing;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
