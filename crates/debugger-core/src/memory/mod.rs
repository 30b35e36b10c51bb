//! Memory access through the native core and display windows over it.

/// Byte-level read/write facade and program loading.
pub mod facade;
/// Page presets and hex dump rows.
pub mod view;

pub use facade::{MemoryFacade, BRK_OPCODE};
pub use view::{MemoryDump, MemoryPage, MemoryPageView, MemoryRow, BYTES_PER_ROW, PAGE_BYTES};
