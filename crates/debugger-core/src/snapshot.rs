//! Host-visible CPU state read through the native boundary.

use crate::{NativeCore, NativeResult, StatusFlag};

/// Register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Registers {
    /// Accumulator.
    pub a: u8,
    /// X index.
    pub x: u8,
    /// Y index.
    pub y: u8,
    /// Stack pointer.
    pub sp: u8,
    /// Program counter.
    pub pc: u16,
    /// Raw status register.
    pub status: u8,
}

/// Decoded status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusFlags {
    /// C, bit 0.
    pub carry: bool,
    /// Z, bit 1.
    pub zero: bool,
    /// I, bit 2.
    pub interrupt_disable: bool,
    /// D, bit 3.
    pub decimal: bool,
    /// B, bit 4.
    pub brk: bool,
    /// U, bit 5.
    pub unused: bool,
    /// V, bit 6.
    pub overflow: bool,
    /// N, bit 7.
    pub negative: bool,
}

impl StatusFlags {
    /// Flag value by bit.
    #[must_use]
    pub const fn get(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::Carry => self.carry,
            StatusFlag::Zero => self.zero,
            StatusFlag::InterruptDisable => self.interrupt_disable,
            StatusFlag::Decimal => self.decimal,
            StatusFlag::Break => self.brk,
            StatusFlag::Unused => self.unused,
            StatusFlag::Overflow => self.overflow,
            StatusFlag::Negative => self.negative,
        }
    }

    fn set(&mut self, flag: StatusFlag, value: bool) {
        match flag {
            StatusFlag::Carry => self.carry = value,
            StatusFlag::Zero => self.zero = value,
            StatusFlag::InterruptDisable => self.interrupt_disable = value,
            StatusFlag::Decimal => self.decimal = value,
            StatusFlag::Break => self.brk = value,
            StatusFlag::Unused => self.unused = value,
            StatusFlag::Overflow => self.overflow = value,
            StatusFlag::Negative => self.negative = value,
        }
    }

    /// Flags set in a raw status byte.
    #[must_use]
    pub fn from_status(status: u8) -> Self {
        let mut flags = Self::default();
        for flag in StatusFlag::ALL {
            flags.set(flag, status & flag.mask() != 0);
        }
        flags
    }

    /// `NV-BDIZC` style rendering, lowercase for clear flags.
    #[must_use]
    pub fn to_compact_string(&self) -> String {
        StatusFlag::ALL
            .iter()
            .rev()
            .map(|flag| {
                let name = flag.short_name();
                if self.get(*flag) {
                    name
                } else {
                    name.to_ascii_lowercase()
                }
            })
            .collect()
    }
}

/// Execution statistics since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExecutionStats {
    /// Instructions retired.
    pub instruction_count: u64,
    /// Cycles elapsed.
    pub cycle_count: u64,
}

/// Complete CPU view handed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuSnapshot {
    /// Register file.
    pub registers: Registers,
    /// Flags, queried bit by bit from the core.
    pub flags: StatusFlags,
    /// Counters.
    pub stats: ExecutionStats,
    /// Whether the core reports itself running.
    pub running: bool,
}

impl CpuSnapshot {
    /// Reads a snapshot from `core`.
    ///
    /// # Errors
    ///
    /// Returns the first failing boundary call.
    pub fn capture<C: NativeCore + ?Sized>(core: &mut C) -> NativeResult<Self> {
        let registers = Registers {
            a: core.register_a()?,
            x: core.register_x()?,
            y: core.register_y()?,
            sp: core.register_sp()?,
            pc: core.register_pc()?,
            status: core.register_status()?,
        };

        let mut flags = StatusFlags::default();
        for flag in StatusFlag::ALL {
            flags.set(flag, core.status_flag(flag)?);
        }

        Ok(Self {
            registers,
            flags,
            stats: ExecutionStats {
                instruction_count: core.instruction_count()?,
                cycle_count: core.cycle_count()?,
            },
            running: core.is_running()?,
        })
    }
}
