//! Debugger session controller.
//!
//! [`Session`] owns the native core handle and the breakpoint set, runs the
//! run/step/stop/reset lifecycle and drives continuous execution in bounded
//! bursts scheduled by the host. Between bursts it publishes refreshed
//! observable state to its observers.

/// Observer notifications and render-ready state.
pub mod events;
/// Host frame/interval scheduling seam.
pub mod scheduler;
/// Lifecycle states.
pub mod state;

use log::{debug, info, warn};

pub use events::{InstructionRow, ObservableState, SessionEvent, SessionObserver};
pub use scheduler::{FrameHandle, HostScheduler, ManualScheduler, SchedulerStats, TimerHandle};
pub use state::{HaltCause, SessionState};

use crate::{
    decode_disassembly, parse_opcode_text, render_operand, BreakpointSet, Clock, CpuSnapshot,
    ExampleProgram, Instruction, MemoryFacade, MemoryPage, NativeCore, SessionConfig,
    SessionError, SessionResult, SliceBudget,
};

/// Result of delivering a frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TickOutcome {
    /// The callback was not the active frame or the session is not running.
    Stale,
    /// A burst ran and another frame was requested.
    Continued {
        /// Instructions executed in the burst.
        executed: u32,
    },
    /// The core stopped during or before the burst.
    Halted {
        /// Why execution ended.
        cause: HaltCause,
        /// Instructions executed in the burst.
        executed: u32,
    },
}

/// Controller for one debugging session over a native core.
pub struct Session<C: NativeCore, S: HostScheduler, K: Clock> {
    core: C,
    scheduler: S,
    clock: K,
    config: SessionConfig,
    breakpoints: BreakpointSet,
    state: SessionState,
    last_halt: Option<HaltCause>,
    frame: Option<FrameHandle>,
    refresh_timer: Option<TimerHandle>,
    memory_page: MemoryPage,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl<C: NativeCore, S: HostScheduler, K: Clock> Session<C, S, K> {
    /// Creates an idle session with the default configuration.
    #[must_use]
    pub fn new(core: C, scheduler: S, clock: K) -> Self {
        let config = SessionConfig::default();
        Self {
            core,
            scheduler,
            clock,
            memory_page: config.memory_page,
            config,
            breakpoints: BreakpointSet::new(),
            state: SessionState::Idle,
            last_halt: None,
            frame: None,
            refresh_timer: None,
            observers: Vec::new(),
        }
    }

    /// Creates an idle session with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when `config` fails validation.
    pub fn with_config(
        core: C,
        scheduler: S,
        clock: K,
        config: SessionConfig,
    ) -> SessionResult<Self> {
        config.validate()?;
        let mut session = Self::new(core, scheduler, clock);
        session.memory_page = config.memory_page;
        session.config = config;
        Ok(session)
    }

    /// Registers an observer for all subsequent events.
    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Cause of the most recent halt.
    #[must_use]
    pub const fn last_halt(&self) -> Option<HaltCause> {
        self.last_halt
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Breakpoint set, for membership queries.
    #[must_use]
    pub const fn breakpoints(&self) -> &BreakpointSet {
        &self.breakpoints
    }

    /// Selected memory page.
    #[must_use]
    pub const fn memory_page(&self) -> MemoryPage {
        self.memory_page
    }

    /// Native core handle.
    #[must_use]
    pub const fn core(&self) -> &C {
        &self.core
    }

    /// Host scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Host scheduler, for hosts that pump callbacks themselves.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Executes exactly one instruction and refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless idle, and native
    /// failures. The session is idle afterwards in every case.
    pub fn step(&mut self) -> SessionResult<()> {
        self.require_idle("step")?;
        self.state = SessionState::Stepping;
        let result = self
            .core
            .step()
            .map_err(SessionError::from)
            .and_then(|()| self.refresh());
        self.state = SessionState::Idle;
        if result.is_ok() {
            debug!("stepped one instruction");
        }
        result
    }

    /// Starts continuous execution. A no-op while already running.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] from a non-idle state and
    /// the native `run` failure, in which case nothing was scheduled.
    pub fn run(&mut self) -> SessionResult<()> {
        if self.state.is_running() {
            debug!("run ignored: loop already active");
            return Ok(());
        }
        self.require_idle("run")?;

        self.core.run()?;
        self.state = SessionState::Running;
        self.last_halt = None;
        self.frame = Some(self.scheduler.request_frame());
        self.refresh_timer = Some(self.scheduler.start_interval(self.config.refresh_interval));
        info!("execution started");
        Ok(())
    }

    /// Stops continuous execution on user request.
    ///
    /// The frame and the refresh timer are cancelled before the core is
    /// told to stop, so neither fires again even if that call fails.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless running, and
    /// native failures.
    pub fn stop(&mut self) -> SessionResult<()> {
        if !self.state.is_running() {
            return Err(self.rejected("stop"));
        }

        self.cancel_loop();
        self.state = SessionState::Halted(HaltCause::User);
        self.last_halt = Some(HaltCause::User);
        let result = self
            .core
            .stop()
            .map_err(SessionError::from)
            .and_then(|()| self.refresh());
        self.state = SessionState::Idle;
        info!("execution stopped by user");
        result
    }

    /// Resets the core. From `Running` the loop is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns native failures; the session is idle afterwards.
    pub fn reset(&mut self) -> SessionResult<()> {
        if self.state.is_running() {
            self.cancel_loop();
            self.last_halt = Some(HaltCause::User);
            if let Err(err) = self.core.stop() {
                self.state = SessionState::Idle;
                return Err(err.into());
            }
        }

        self.state = SessionState::Idle;
        self.core.reset()?;
        info!("core reset");
        self.refresh()
    }

    /// Delivers a frame callback: runs one burst of the continuous loop.
    ///
    /// # Errors
    ///
    /// Returns native failures. The loop is cancelled and the session is
    /// idle afterwards.
    pub fn on_frame(&mut self, handle: FrameHandle) -> SessionResult<TickOutcome> {
        if !self.state.is_running() || self.frame != Some(handle) {
            debug!("ignoring stale frame {handle:?} while {}", self.state);
            return Ok(TickOutcome::Stale);
        }
        self.frame = None;

        let (executed, still_running) = match self.run_burst() {
            Ok(burst) => burst,
            Err(err) => {
                self.abort_loop(&err);
                return Err(err);
            }
        };

        if still_running {
            self.frame = Some(self.scheduler.request_frame());
            return Ok(TickOutcome::Continued { executed });
        }

        let cause = self.finish_halt()?;
        Ok(TickOutcome::Halted { cause, executed })
    }

    /// Delivers a refresh-timer callback.
    ///
    /// Returns `false` for a stale timer or when not running.
    ///
    /// # Errors
    ///
    /// Returns native failures from the refresh; the loop keeps running.
    pub fn on_refresh(&mut self, handle: TimerHandle) -> SessionResult<bool> {
        if !self.state.is_running() || self.refresh_timer != Some(handle) {
            debug!("ignoring stale refresh timer {handle:?}");
            return Ok(false);
        }
        self.refresh()?;
        Ok(true)
    }

    fn run_burst(&mut self) -> SessionResult<(u32, bool)> {
        let mut budget = SliceBudget::new(
            self.clock.now(),
            self.config.time_slice,
            self.config.max_instructions_per_tick,
        );
        while self.core.is_running()? && budget.admits(self.clock.now()) {
            self.core.step()?;
            budget.record_step();
        }
        Ok((budget.executed(), self.core.is_running()?))
    }

    /// Notifies observers of the halt, leaves `Running` and refreshes.
    fn finish_halt(&mut self) -> SessionResult<HaltCause> {
        let pc = match self.core.register_pc() {
            Ok(pc) => pc,
            Err(err) => {
                let err = SessionError::from(err);
                self.abort_loop(&err);
                return Err(err);
            }
        };

        let cause = if self.breakpoints.contains(pc) {
            info!("Breakpoint hit at address 0x{pc:04X}");
            self.emit(&SessionEvent::BreakpointHit { address: pc });
            HaltCause::Breakpoint(pc)
        } else {
            info!("program halted at address 0x{pc:04X}");
            self.emit(&SessionEvent::ProgramHalted { address: pc });
            HaltCause::Program
        };

        self.cancel_loop();
        self.state = SessionState::Halted(cause);
        self.last_halt = Some(cause);
        let refreshed = self.refresh();
        self.state = SessionState::Idle;
        refreshed.map(|()| cause)
    }

    /// Cancels the pending frame and the refresh timer together.
    fn cancel_loop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.scheduler.cancel_frame(frame);
        }
        if let Some(timer) = self.refresh_timer.take() {
            self.scheduler.clear_interval(timer);
        }
    }

    fn abort_loop(&mut self, err: &SessionError) {
        warn!("execution loop aborted: {err}");
        self.cancel_loop();
        if let Err(stop_err) = self.core.stop() {
            warn!("core did not acknowledge stop: {stop_err}");
        }
        self.state = SessionState::Idle;
    }

    /// Adds a breakpoint in both the session and the core.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] while running, and native
    /// failures, leaving the set unchanged.
    pub fn add_breakpoint(&mut self, addr: u16) -> SessionResult<()> {
        self.require_not_running("change breakpoints")?;
        self.breakpoints.add(&mut self.core, addr)?;
        self.emit_breakpoints();
        Ok(())
    }

    /// Removes a breakpoint from both the session and the core.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_breakpoint`].
    pub fn remove_breakpoint(&mut self, addr: u16) -> SessionResult<()> {
        self.require_not_running("change breakpoints")?;
        self.breakpoints.remove(&mut self.core, addr)?;
        self.emit_breakpoints();
        Ok(())
    }

    /// Flips a breakpoint and returns whether it is now set.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_breakpoint`].
    pub fn toggle_breakpoint(&mut self, addr: u16) -> SessionResult<bool> {
        self.require_not_running("change breakpoints")?;
        let set = self.breakpoints.toggle(&mut self.core, addr)?;
        self.emit_breakpoints();
        Ok(set)
    }

    /// Removes every breakpoint.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_breakpoint`].
    pub fn clear_breakpoints(&mut self) -> SessionResult<()> {
        self.require_not_running("change breakpoints")?;
        self.breakpoints.clear(&mut self.core)?;
        self.emit_breakpoints();
        Ok(())
    }

    fn emit_breakpoints(&mut self) {
        let event = SessionEvent::BreakpointsChanged(self.breakpoints.list_sorted());
        self.emit(&event);
    }

    /// Loads `bytes` at `start`, points the reset vector there and resets.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] while running, load
    /// validation errors and native failures.
    pub fn load_program(&mut self, bytes: &[u8], start: u16) -> SessionResult<()> {
        self.require_not_running("load a program")?;
        MemoryFacade::new(&mut self.core).load_program(bytes, start)?;
        info!("loaded {} bytes at ${start:04X}", bytes.len());
        self.emit(&SessionEvent::ProgramLoaded {
            start,
            len: bytes.len(),
        });
        self.refresh()
    }

    /// Parses a hex listing and loads it at the configured address.
    ///
    /// # Errors
    ///
    /// Returns listing parse errors and [`Self::load_program`] errors.
    pub fn load_opcode_text(&mut self, text: &str) -> SessionResult<()> {
        let bytes = parse_opcode_text(text)?;
        self.load_program(&bytes, self.config.load_address)
    }

    /// Loads a bundled example at the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`Self::load_program`] errors.
    pub fn load_example(&mut self, program: ExampleProgram) -> SessionResult<()> {
        let bytes = program.bytes()?;
        self.load_program(&bytes, self.config.load_address)
    }

    /// Moves PC.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] while running and native
    /// failures.
    pub fn set_pc(&mut self, addr: u16) -> SessionResult<()> {
        self.require_not_running("set PC")?;
        self.core.set_register_pc(addr)?;
        self.refresh()
    }

    /// Writes one byte and refreshes.
    ///
    /// # Errors
    ///
    /// Returns native failures.
    pub fn write_memory(&mut self, addr: u16, value: u8) -> SessionResult<()> {
        MemoryFacade::new(&mut self.core).write(addr, value)?;
        self.refresh()
    }

    /// Reads the inclusive range `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AddressOutOfRange`] for a reversed range and
    /// native failures.
    pub fn read_memory_range(&mut self, start: u16, end: u16) -> SessionResult<Vec<u8>> {
        MemoryFacade::new(&mut self.core).read_range(start, end)
    }

    /// Selects the memory page shown on refresh.
    ///
    /// # Errors
    ///
    /// Returns native failures from the refresh.
    pub fn select_memory_page(&mut self, page: MemoryPage) -> SessionResult<()> {
        self.memory_page = page;
        self.refresh()
    }

    /// Shows the page containing `addr`.
    ///
    /// # Errors
    ///
    /// Returns native failures from the refresh.
    pub fn jump_to_address(&mut self, addr: u16) -> SessionResult<()> {
        self.select_memory_page(MemoryPage::containing(addr))
    }

    /// Reads registers, flags and counters.
    ///
    /// # Errors
    ///
    /// Returns native failures.
    pub fn snapshot(&mut self) -> SessionResult<CpuSnapshot> {
        Ok(CpuSnapshot::capture(&mut self.core)?)
    }

    /// Decoded disassembly around PC.
    ///
    /// # Errors
    ///
    /// Returns native failures; decoding itself never fails.
    pub fn disassemble_around_pc(
        &mut self,
        before: u16,
        after: u16,
    ) -> SessionResult<Vec<Instruction>> {
        let raw = self.core.disassemble_around_pc(before, after)?;
        Ok(decode_disassembly(&raw))
    }

    /// Decoded disassembly of `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns native failures; decoding itself never fails.
    pub fn disassemble_range(&mut self, start: u16, end: u16) -> SessionResult<Vec<Instruction>> {
        let raw = self.core.disassemble_range(start, end)?;
        Ok(decode_disassembly(&raw))
    }

    /// Builds render rows, marking PC and breakpoints.
    #[must_use]
    pub fn instruction_rows(&self, instructions: Vec<Instruction>, pc: u16) -> Vec<InstructionRow> {
        instructions
            .into_iter()
            .map(|instruction| InstructionRow {
                operand: render_operand(&instruction),
                is_current: instruction.address == pc,
                has_breakpoint: self.breakpoints.contains(instruction.address),
                instruction,
            })
            .collect()
    }

    /// Collects the full observable state.
    ///
    /// # Errors
    ///
    /// Returns native failures.
    pub fn observable_state(&mut self) -> SessionResult<ObservableState> {
        let cpu = self.snapshot()?;
        let instructions =
            self.disassemble_around_pc(self.config.disassembly_before, self.config.disassembly_after)?;
        let disassembly = self.instruction_rows(instructions, cpu.registers.pc);

        let memory_view = self.memory_page.view();
        let mut memory = MemoryFacade::new(&mut self.core);
        let dump = memory.dump(memory_view)?;
        let stack = memory.stack_contents(cpu.registers.sp)?;

        Ok(ObservableState {
            state: self.state,
            cpu,
            disassembly,
            memory_view,
            memory: dump,
            breakpoints: self.breakpoints.list_sorted(),
            stack,
        })
    }

    fn refresh(&mut self) -> SessionResult<()> {
        let observable = self.observable_state()?;
        self.emit(&SessionEvent::StateChanged(Box::new(observable)));
        Ok(())
    }

    fn emit(&mut self, event: &SessionEvent) {
        for observer in &mut self.observers {
            observer.on_event(event);
        }
    }

    fn rejected(&self, command: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            command,
            state: self.state.name(),
        }
    }

    fn require_idle(&self, command: &'static str) -> SessionResult<()> {
        if self.state == SessionState::Idle {
            Ok(())
        } else {
            Err(self.rejected(command))
        }
    }

    fn require_not_running(&self, command: &'static str) -> SessionResult<()> {
        if self.state.is_running() {
            Err(self.rejected(command))
        } else {
            Ok(())
        }
    }
}
