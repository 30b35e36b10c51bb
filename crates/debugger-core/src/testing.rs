//! In-memory stand-in for the native core used by unit tests.

use std::collections::BTreeSet;

use crate::{NativeCore, NativeError, NativeResult, StatusFlag, ADDRESS_SPACE_BYTES};

/// Boundary call counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub step: usize,
    pub run: usize,
    pub stop: usize,
    pub reset: usize,
    pub add_breakpoint: usize,
    pub remove_breakpoint: usize,
    pub disassemble: usize,
}

/// Minimal core: BRK halts, `LDA #`/`LDX #` load, `JMP abs` jumps, anything
/// else advances one byte.
pub struct FakeCore {
    pub memory: Box<[u8]>,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub running: bool,
    pub breakpoints: BTreeSet<u16>,
    pub instructions: u64,
    pub cycles: u64,
    pub calls: CallCounts,
    pub disassembly: String,
    pub fail_step_at: Option<u64>,
    pub fail_breakpoints: bool,
}

impl Default for FakeCore {
    fn default() -> Self {
        Self {
            memory: vec![0; ADDRESS_SPACE_BYTES].into_boxed_slice(),
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: 0x24,
            running: false,
            breakpoints: BTreeSet::new(),
            instructions: 0,
            cycles: 0,
            calls: CallCounts::default(),
            disassembly: String::new(),
            fail_step_at: None,
            fail_breakpoints: false,
        }
    }
}

impl FakeCore {
    pub fn with_program(start: u16, bytes: &[u8]) -> Self {
        let mut core = Self::default();
        for (offset, byte) in bytes.iter().enumerate() {
            core.memory[usize::from(start) + offset] = *byte;
        }
        core.pc = start;
        core
    }

    fn byte_at(&self, addr: u16) -> u8 {
        self.memory[usize::from(addr)]
    }
}

impl NativeCore for FakeCore {
    fn step(&mut self) -> NativeResult<()> {
        self.calls.step += 1;
        if self.fail_step_at == Some(self.instructions) {
            return Err(NativeError::new("debugger_step", "injected failure"));
        }

        let opcode = self.byte_at(self.pc);
        let operand = self.byte_at(self.pc.wrapping_add(1));
        match opcode {
            0x00 => {
                self.pc = self.pc.wrapping_add(1);
                self.running = false;
            }
            0xA9 => {
                self.a = operand;
                self.pc = self.pc.wrapping_add(2);
            }
            0xA2 => {
                self.x = operand;
                self.pc = self.pc.wrapping_add(2);
            }
            0x4C => {
                let hi = self.byte_at(self.pc.wrapping_add(2));
                self.pc = u16::from_le_bytes([operand, hi]);
            }
            _ => self.pc = self.pc.wrapping_add(1),
        }
        self.instructions += 1;
        self.cycles += 2;

        if self.breakpoints.contains(&self.pc) {
            self.running = false;
        }
        Ok(())
    }

    fn run(&mut self) -> NativeResult<()> {
        self.calls.run += 1;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> NativeResult<()> {
        self.calls.stop += 1;
        self.running = false;
        Ok(())
    }

    fn reset(&mut self) -> NativeResult<()> {
        self.calls.reset += 1;
        self.pc = u16::from_le_bytes([self.byte_at(0xFFFC), self.byte_at(0xFFFD)]);
        self.sp = 0xFD;
        self.instructions = 0;
        self.cycles = 0;
        self.running = false;
        Ok(())
    }

    fn is_running(&mut self) -> NativeResult<bool> {
        Ok(self.running)
    }

    fn add_breakpoint(&mut self, addr: u16) -> NativeResult<()> {
        self.calls.add_breakpoint += 1;
        if self.fail_breakpoints {
            return Err(NativeError::new("debugger_add_breakpoint", "injected failure"));
        }
        self.breakpoints.insert(addr);
        Ok(())
    }

    fn remove_breakpoint(&mut self, addr: u16) -> NativeResult<()> {
        self.calls.remove_breakpoint += 1;
        if self.fail_breakpoints {
            return Err(NativeError::new(
                "debugger_remove_breakpoint",
                "injected failure",
            ));
        }
        self.breakpoints.remove(&addr);
        Ok(())
    }

    fn clear_breakpoints(&mut self) -> NativeResult<()> {
        self.breakpoints.clear();
        Ok(())
    }

    fn register_a(&mut self) -> NativeResult<u8> {
        Ok(self.a)
    }

    fn register_x(&mut self) -> NativeResult<u8> {
        Ok(self.x)
    }

    fn register_y(&mut self) -> NativeResult<u8> {
        Ok(self.y)
    }

    fn register_sp(&mut self) -> NativeResult<u8> {
        Ok(self.sp)
    }

    fn register_pc(&mut self) -> NativeResult<u16> {
        Ok(self.pc)
    }

    fn set_register_pc(&mut self, pc: u16) -> NativeResult<()> {
        self.pc = pc;
        Ok(())
    }

    fn register_status(&mut self) -> NativeResult<u8> {
        Ok(self.status)
    }

    fn status_flag(&mut self, flag: StatusFlag) -> NativeResult<bool> {
        Ok(self.status & flag.mask() != 0)
    }

    fn read_memory(&mut self, addr: u16) -> NativeResult<u8> {
        Ok(self.byte_at(addr))
    }

    fn write_memory(&mut self, addr: u16, value: u8) -> NativeResult<()> {
        self.memory[usize::from(addr)] = value;
        Ok(())
    }

    fn instruction_count(&mut self) -> NativeResult<u64> {
        Ok(self.instructions)
    }

    fn cycle_count(&mut self) -> NativeResult<u64> {
        Ok(self.cycles)
    }

    fn disassemble_around_pc(&mut self, _before: u16, _after: u16) -> NativeResult<String> {
        self.calls.disassemble += 1;
        Ok(self.disassembly.clone())
    }

    fn disassemble_range(&mut self, _start: u16, _end: u16) -> NativeResult<String> {
        self.calls.disassemble += 1;
        Ok(self.disassembly.clone())
    }
}
