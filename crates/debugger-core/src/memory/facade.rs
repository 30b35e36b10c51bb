//! Typed byte access into the native core's address space.

use crate::{
    MemoryDump, MemoryPageView, NativeCore, SessionError, SessionResult, ADDRESS_SPACE_BYTES,
    RESET_VECTOR_HI, RESET_VECTOR_LO, STACK_PAGE_END, STACK_PAGE_START,
};

/// Opcode byte of `BRK`.
pub const BRK_OPCODE: u8 = 0x00;

/// Thin wrapper delegating every byte access to the native core.
///
/// Reads and writes are passed through unchanged; typed `u16`/`u8`
/// arguments already carry the range guarantee, and multi-byte helpers
/// refuse to wrap past `0xFFFF`.
pub struct MemoryFacade<'a, C: NativeCore + ?Sized> {
    core: &'a mut C,
}

impl<'a, C: NativeCore + ?Sized> MemoryFacade<'a, C> {
    /// Borrows `core` for memory access.
    pub fn new(core: &'a mut C) -> Self {
        Self { core }
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Propagates the native read failure.
    pub fn read(&mut self, addr: u16) -> SessionResult<u8> {
        Ok(self.core.read_memory(addr)?)
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Propagates the native write failure.
    pub fn write(&mut self, addr: u16, value: u8) -> SessionResult<()> {
        Ok(self.core.write_memory(addr, value)?)
    }

    /// Writes `bytes` sequentially from `start`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BlockOverflow`] when the block would run past
    /// `0xFFFF`, before any byte is written. Propagates native write
    /// failures.
    pub fn load_block(&mut self, bytes: &[u8], start: u16) -> SessionResult<()> {
        if usize::from(start) + bytes.len() > ADDRESS_SPACE_BYTES {
            return Err(SessionError::BlockOverflow {
                start,
                len: bytes.len(),
            });
        }

        for (addr, byte) in (start..=u16::MAX).zip(bytes) {
            self.core.write_memory(addr, *byte)?;
        }
        Ok(())
    }

    /// Loads a program, points the reset vector at `start` and resets.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyProgram`] for an empty program and the
    /// [`Self::load_block`] errors otherwise.
    pub fn load_program(&mut self, bytes: &[u8], start: u16) -> SessionResult<()> {
        if bytes.is_empty() {
            return Err(SessionError::EmptyProgram);
        }

        self.load_block(bytes, start)?;
        let [lo, hi] = start.to_le_bytes();
        self.core.write_memory(RESET_VECTOR_LO, lo)?;
        self.core.write_memory(RESET_VECTOR_HI, hi)?;
        self.core.reset()?;
        Ok(())
    }

    /// Reads the inclusive range `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AddressOutOfRange`] when `start > end`.
    /// Propagates native read failures.
    pub fn read_range(&mut self, start: u16, end: u16) -> SessionResult<Vec<u8>> {
        if start > end {
            return Err(SessionError::AddressOutOfRange(i64::from(start)));
        }

        (start..=end)
            .map(|addr| self.core.read_memory(addr).map_err(SessionError::from))
            .collect()
    }

    /// Bytes currently pushed on the stack, innermost first.
    ///
    /// # Errors
    ///
    /// Propagates native read failures.
    pub fn stack_contents(&mut self, sp: u8) -> SessionResult<Vec<u8>> {
        let top = STACK_PAGE_START + u16::from(sp) + 1;
        if top > STACK_PAGE_END {
            return Ok(Vec::new());
        }
        self.read_range(top, STACK_PAGE_END)
    }

    /// Returns `true` when the instruction at `pc` is `BRK`.
    ///
    /// # Errors
    ///
    /// Propagates the native read failure.
    pub fn is_at_break(&mut self, pc: u16) -> SessionResult<bool> {
        Ok(self.read(pc)? == BRK_OPCODE)
    }

    /// Reads the window described by `view` into display rows.
    ///
    /// # Errors
    ///
    /// Propagates native read failures.
    pub fn dump(&mut self, view: MemoryPageView) -> SessionResult<MemoryDump> {
        let bytes = self.read_range(view.base, view.last())?;
        Ok(MemoryDump::from_bytes(view.base, &bytes))
    }
}
