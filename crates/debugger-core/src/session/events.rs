//! Notifications delivered to session observers.

use std::sync::mpsc::Sender;

use crate::{
    CpuSnapshot, Instruction, MemoryDump, MemoryPageView, RenderedOperand, SessionState,
};

/// Render-ready disassembly row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionRow {
    /// Decoded record.
    pub instruction: Instruction,
    /// Operand text and addressing mode.
    pub operand: RenderedOperand,
    /// Row sits at the current PC.
    pub is_current: bool,
    /// A breakpoint is set on this row.
    pub has_breakpoint: bool,
}

/// Everything a front end redraws after a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ObservableState {
    /// Session state at refresh time.
    pub state: SessionState,
    /// Registers, flags and counters.
    pub cpu: CpuSnapshot,
    /// Disassembly around PC.
    pub disassembly: Vec<InstructionRow>,
    /// Selected memory window.
    pub memory_view: MemoryPageView,
    /// Contents of the selected window.
    pub memory: MemoryDump,
    /// Breakpoints in ascending order.
    pub breakpoints: Vec<u16>,
    /// Stack bytes above SP, innermost first.
    pub stack: Vec<u8>,
}

/// Session notification, delivered synchronously in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SessionEvent {
    /// Observable state was refreshed.
    StateChanged(Box<ObservableState>),
    /// Execution halted on a registered breakpoint.
    BreakpointHit {
        /// Breakpoint address (PC at halt).
        address: u16,
    },
    /// Execution halted without a breakpoint or user stop.
    ProgramHalted {
        /// PC at halt.
        address: u16,
    },
    /// Breakpoint set changed; carries the new sorted list.
    BreakpointsChanged(Vec<u16>),
    /// A program was written to memory and the core reset.
    ProgramLoaded {
        /// Load address.
        start: u16,
        /// Program length in bytes.
        len: usize,
    },
}

/// Receiver of session notifications.
pub trait SessionObserver {
    /// Records an event in emission order.
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F: FnMut(&SessionEvent)> SessionObserver for F {
    fn on_event(&mut self, event: &SessionEvent) {
        self(event);
    }
}

/// Forwards events into a channel; a dropped receiver silently ends delivery.
impl SessionObserver for Sender<SessionEvent> {
    fn on_event(&mut self, event: &SessionEvent) {
        // A disconnected receiver means nobody is listening any more.
        let _ = self.send(event.clone());
    }
}
