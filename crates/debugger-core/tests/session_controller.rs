//! Session controller lifecycle, run loop and cancellation suite.

#![allow(clippy::pedantic, clippy::nursery, clippy::too_many_lines)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use debugger_core::{
    AddressingMode, Clock, ExampleProgram, HaltCause, HostScheduler, ManualScheduler, MemoryPage,
    NativeCore, NativeError, NativeResult, Session, SessionConfig, SessionError, SessionEvent,
    SessionState, StatusFlag, TickOutcome,
};
use log as _;
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Calls {
    step: usize,
    run: usize,
    stop: usize,
    reset: usize,
    add_breakpoint: usize,
    remove_breakpoint: usize,
}

/// Tiny core: `BRK` halts, `JMP abs` jumps, `LDA #` loads A, everything else
/// is a one-byte no-op.
struct ScriptedCore {
    memory: Vec<u8>,
    a: u8,
    pc: u16,
    running: bool,
    breakpoints: BTreeSet<u16>,
    instructions: u64,
    calls: Calls,
    fail_step_at: Option<u64>,
}

impl ScriptedCore {
    fn new() -> Self {
        Self {
            memory: vec![0; 0x1_0000],
            a: 0,
            pc: 0,
            running: false,
            breakpoints: BTreeSet::new(),
            instructions: 0,
            calls: Calls::default(),
            fail_step_at: None,
        }
    }

    fn with_program(start: u16, bytes: &[u8]) -> Self {
        let mut core = Self::new();
        core.memory[usize::from(start)..usize::from(start) + bytes.len()].copy_from_slice(bytes);
        core.pc = start;
        core
    }

    fn byte(&self, addr: u16) -> u8 {
        self.memory[usize::from(addr)]
    }

    fn length_of(opcode: u8) -> u16 {
        match opcode {
            0x4C => 3,
            0xA9 => 2,
            _ => 1,
        }
    }

    fn wire_from(&self, mut addr: u16, count: u16) -> String {
        let mut out = String::new();
        for _ in 0..count {
            let opcode = self.byte(addr);
            let len = Self::length_of(opcode);
            let (mnemonic, operand, formatted) = match opcode {
                0x00 => ("BRK", 0, "BRK".to_string()),
                0xEA => ("NOP", 0, "NOP".to_string()),
                0xA9 => {
                    let value = self.byte(addr.wrapping_add(1));
                    ("LDA", u16::from(value), format!("LDA #${value:02X}"))
                }
                0x4C => {
                    let target = u16::from_le_bytes([
                        self.byte(addr.wrapping_add(1)),
                        self.byte(addr.wrapping_add(2)),
                    ]);
                    ("JMP", target, format!("JMP ${target:04X}"))
                }
                _ => ("???", 0, "???".to_string()),
            };
            out.push_str(&format!("{addr}|{opcode}|{mnemonic}|{operand}|{formatted}|{len}|2#"));
            addr = addr.wrapping_add(len);
        }
        out
    }
}

impl NativeCore for ScriptedCore {
    fn step(&mut self) -> NativeResult<()> {
        self.calls.step += 1;
        if self.fail_step_at == Some(self.instructions) {
            return Err(NativeError::new("debugger_step", "core trapped"));
        }
        let opcode = self.byte(self.pc);
        match opcode {
            0x00 => {
                self.pc = self.pc.wrapping_add(1);
                self.running = false;
            }
            0x4C => {
                self.pc = u16::from_le_bytes([
                    self.byte(self.pc.wrapping_add(1)),
                    self.byte(self.pc.wrapping_add(2)),
                ]);
            }
            0xA9 => {
                self.a = self.byte(self.pc.wrapping_add(1));
                self.pc = self.pc.wrapping_add(2);
            }
            _ => self.pc = self.pc.wrapping_add(1),
        }
        self.instructions += 1;
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
        self.pc = u16::from_le_bytes([self.byte(0xFFFC), self.byte(0xFFFD)]);
        self.instructions = 0;
        self.running = false;
        Ok(())
    }

    fn is_running(&mut self) -> NativeResult<bool> {
        Ok(self.running)
    }

    fn add_breakpoint(&mut self, addr: u16) -> NativeResult<()> {
        self.calls.add_breakpoint += 1;
        self.breakpoints.insert(addr);
        Ok(())
    }

    fn remove_breakpoint(&mut self, addr: u16) -> NativeResult<()> {
        self.calls.remove_breakpoint += 1;
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
        Ok(0)
    }

    fn register_y(&mut self) -> NativeResult<u8> {
        Ok(0)
    }

    fn register_sp(&mut self) -> NativeResult<u8> {
        Ok(0xFD)
    }

    fn register_pc(&mut self) -> NativeResult<u16> {
        Ok(self.pc)
    }

    fn set_register_pc(&mut self, pc: u16) -> NativeResult<()> {
        self.pc = pc;
        Ok(())
    }

    fn register_status(&mut self) -> NativeResult<u8> {
        Ok(0x24)
    }

    fn status_flag(&mut self, flag: StatusFlag) -> NativeResult<bool> {
        Ok(0x24 & flag.mask() != 0)
    }

    fn read_memory(&mut self, addr: u16) -> NativeResult<u8> {
        Ok(self.byte(addr))
    }

    fn write_memory(&mut self, addr: u16, value: u8) -> NativeResult<()> {
        self.memory[usize::from(addr)] = value;
        Ok(())
    }

    fn instruction_count(&mut self) -> NativeResult<u64> {
        Ok(self.instructions)
    }

    fn cycle_count(&mut self) -> NativeResult<u64> {
        Ok(self.instructions * 2)
    }

    fn disassemble_around_pc(&mut self, _before: u16, after: u16) -> NativeResult<String> {
        Ok(self.wire_from(self.pc, after))
    }

    fn disassemble_range(&mut self, start: u16, end: u16) -> NativeResult<String> {
        Ok(self.wire_from(start, end.saturating_sub(start) + 1))
    }
}

/// Clock that advances by a fixed amount on every read.
#[derive(Clone)]
struct TickingClock {
    now: Rc<Cell<Duration>>,
    per_read: Duration,
}

impl TickingClock {
    fn frozen() -> Self {
        Self::advancing(Duration::ZERO)
    }

    fn advancing(per_read: Duration) -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
            per_read,
        }
    }
}

impl Clock for TickingClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now + self.per_read);
        now
    }
}

type TestSession = Session<ScriptedCore, ManualScheduler, TickingClock>;

fn session_with(core: ScriptedCore) -> (TestSession, Rc<RefCell<Vec<SessionEvent>>>) {
    let mut session = Session::new(core, ManualScheduler::new(), TickingClock::frozen());
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    session.subscribe(move |event: &SessionEvent| sink.borrow_mut().push(event.clone()));
    (session, events)
}

/// `JMP $0200` forever.
fn spin_loop() -> ScriptedCore {
    ScriptedCore::with_program(0x0200, &[0x4C, 0x00, 0x02])
}

fn pump_until_idle(session: &mut TestSession, max_ticks: usize) -> Vec<TickOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..max_ticks {
        let Some(frame) = session.scheduler_mut().take_frame() else {
            break;
        };
        outcomes.push(session.on_frame(frame).expect("tick should succeed"));
    }
    outcomes
}

fn event_kinds(events: &[SessionEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            SessionEvent::StateChanged(_) => "state",
            SessionEvent::BreakpointHit { .. } => "breakpoint",
            SessionEvent::ProgramHalted { .. } => "halted",
            SessionEvent::BreakpointsChanged(_) => "breakpoints",
            SessionEvent::ProgramLoaded { .. } => "loaded",
        })
        .collect()
}

#[test]
fn step_issues_one_native_step_and_refreshes() {
    let (mut session, events) = session_with(ScriptedCore::with_program(0x0200, &[0xEA, 0xEA]));

    session.step().expect("step should succeed");

    assert_eq!(session.core().calls.step, 1);
    assert_eq!(session.core().pc, 0x0201);
    assert_eq!(session.state(), SessionState::Idle);

    let events = events.borrow();
    assert_eq!(event_kinds(&events), vec!["state"]);
    let SessionEvent::StateChanged(observable) = &events[0] else {
        panic!("expected state change");
    };
    assert_eq!(observable.state, SessionState::Stepping);
    assert_eq!(observable.cpu.registers.pc, 0x0201);
}

#[test]
fn failed_step_reports_the_error_and_returns_to_idle() {
    let mut core = ScriptedCore::with_program(0x0200, &[0xEA]);
    core.fail_step_at = Some(0);
    let (mut session, events) = session_with(core);

    let result = session.step();

    assert_eq!(
        result,
        Err(SessionError::Native(NativeError::new(
            "debugger_step",
            "core trapped"
        )))
    );
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.core().pc, 0x0200);
    assert!(events.borrow().is_empty());
}

#[test]
fn program_that_halts_reaches_idle_within_bounded_ticks() {
    let core = ScriptedCore::with_program(0x0200, &[0xEA, 0xEA, 0xEA, 0x00]);
    let (mut session, events) = session_with(core);

    session.run().expect("run should start");
    assert_eq!(session.state(), SessionState::Running);

    let outcomes = pump_until_idle(&mut session, 10);

    assert_eq!(
        outcomes,
        vec![TickOutcome::Halted {
            cause: HaltCause::Program,
            executed: 4
        }]
    );
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.last_halt(), Some(HaltCause::Program));
    assert_eq!(event_kinds(&events.borrow()), vec!["halted", "state"]);

    let steps = session.core().calls.step;
    assert_eq!(session.scheduler().pending_frame(), None);
    assert_eq!(session.scheduler().interval(), None);
    assert_eq!(session.core().calls.step, steps);
}

#[test]
fn breakpoint_hit_is_reported_before_leaving_running() {
    let core = ScriptedCore::with_program(0x0200, &[0xEA, 0xEA, 0xEA, 0xEA, 0x00]);
    let (mut session, events) = session_with(core);
    session.add_breakpoint(0x0202).expect("breakpoint should be set");
    events.borrow_mut().clear();

    session.run().expect("run should start");
    let outcomes = pump_until_idle(&mut session, 10);

    assert_eq!(
        outcomes,
        vec![TickOutcome::Halted {
            cause: HaltCause::Breakpoint(0x0202),
            executed: 2
        }]
    );
    let events = events.borrow();
    assert_eq!(events[0], SessionEvent::BreakpointHit { address: 0x0202 });
    let SessionEvent::StateChanged(observable) = &events[1] else {
        panic!("expected state change after breakpoint");
    };
    assert_eq!(
        observable.state,
        SessionState::Halted(HaltCause::Breakpoint(0x0202))
    );
    assert!(observable
        .disassembly
        .iter()
        .any(|row| row.is_current && row.has_breakpoint));
}

#[test]
fn bursts_are_capped_per_tick() {
    let config = SessionConfig {
        max_instructions_per_tick: 25,
        ..SessionConfig::default()
    };
    let mut session = Session::with_config(
        spin_loop(),
        ManualScheduler::new(),
        TickingClock::frozen(),
        config,
    )
    .expect("config should be valid");

    session.run().expect("run should start");
    let outcomes = pump_until_idle(&mut session, 3);

    assert_eq!(outcomes, vec![TickOutcome::Continued { executed: 25 }; 3]);
    assert_eq!(session.core().calls.step, 75);
    assert!(session.scheduler().pending_frame().is_some());
}

#[test]
fn default_cap_is_one_thousand_instructions() {
    let (mut session, _events) = session_with(spin_loop());

    session.run().expect("run should start");
    let outcomes = pump_until_idle(&mut session, 1);

    assert_eq!(outcomes, vec![TickOutcome::Continued { executed: 1000 }]);
}

#[test]
fn bursts_end_when_time_slice_elapses() {
    let mut session = Session::new(
        spin_loop(),
        ManualScheduler::new(),
        TickingClock::advancing(Duration::from_millis(1)),
    );

    session.run().expect("run should start");
    let outcomes = pump_until_idle(&mut session, 1);

    let [TickOutcome::Continued { executed }] = outcomes.as_slice() else {
        panic!("expected one continued tick, got {outcomes:?}");
    };
    assert!(*executed < 10, "executed {executed} steps in a 10 ms slice");
    assert!(*executed > 0);
}

#[test]
fn stop_cancels_frame_and_refresh_timer_together() {
    let (mut session, _events) = session_with(spin_loop());
    session.run().expect("run should start");
    pump_until_idle(&mut session, 2);

    let stale_frame = session.scheduler().pending_frame().expect("frame pending");
    let (stale_timer, _) = session.scheduler().interval().expect("timer active");

    session.stop().expect("stop should succeed");
    let steps_at_stop = session.core().calls.step;

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.last_halt(), Some(HaltCause::User));
    assert_eq!(session.scheduler().pending_frame(), None);
    assert_eq!(session.scheduler().interval(), None);
    let stats = session.scheduler().stats();
    assert_eq!(stats.frames_cancelled, 1);
    assert_eq!(stats.intervals_cleared, 1);

    assert_eq!(session.on_frame(stale_frame), Ok(TickOutcome::Stale));
    assert_eq!(session.on_refresh(stale_timer), Ok(false));
    assert_eq!(session.core().calls.step, steps_at_stop);
    assert_eq!(session.core().calls.stop, 1);
}

#[test]
fn refresh_timer_publishes_state_only_while_running() {
    let (mut session, events) = session_with(spin_loop());
    session.run().expect("run should start");
    let (timer, period) = session.scheduler().interval().expect("timer active");
    assert_eq!(period, Duration::from_millis(16));

    assert_eq!(session.on_refresh(timer), Ok(true));
    assert_eq!(event_kinds(&events.borrow()), vec!["state"]);

    session.stop().expect("stop should succeed");
    let published = events.borrow().len();
    assert_eq!(session.on_refresh(timer), Ok(false));
    assert_eq!(events.borrow().len(), published);
}

#[test]
fn run_while_running_never_starts_a_second_loop() {
    let (mut session, _events) = session_with(spin_loop());
    session.run().expect("run should start");
    let frame = session.scheduler().pending_frame();

    session.run().expect("second run should be a no-op");

    assert_eq!(session.scheduler().pending_frame(), frame);
    let stats = session.scheduler().stats();
    assert_eq!(stats.frames_requested, 1);
    assert_eq!(stats.intervals_started, 1);
    assert_eq!(session.core().calls.run, 1);
}

#[test]
fn frames_with_foreign_handles_are_ignored() {
    let (mut session, _events) = session_with(spin_loop());
    session.run().expect("run should start");
    let frame = session.scheduler().pending_frame().expect("frame pending");

    let foreign = debugger_core::FrameHandle(frame.0 + 100);
    assert_eq!(session.on_frame(foreign), Ok(TickOutcome::Stale));
    assert_eq!(session.core().calls.step, 0);
}

#[rstest]
#[case::step("step")]
#[case::stop("stop")]
fn commands_outside_their_state_are_rejected(#[case] command: &str) {
    let (mut session, _events) = session_with(spin_loop());
    let result = if command == "step" {
        session.run().expect("run should start");
        session.step()
    } else {
        session.stop()
    };

    assert!(matches!(result, Err(SessionError::InvalidTransition { .. })));
}

#[test]
fn mutations_are_rejected_while_running_without_side_effects() {
    let (mut session, _events) = session_with(spin_loop());
    session.run().expect("run should start");

    let expected = Err(SessionError::InvalidTransition {
        command: "change breakpoints",
        state: "running",
    });
    assert_eq!(session.add_breakpoint(0x0200), expected.clone());
    assert_eq!(session.toggle_breakpoint(0x0200).map(|_| ()), expected);
    assert!(session.load_example(ExampleProgram::Loop).is_err());
    assert!(session.set_pc(0x0300).is_err());

    assert_eq!(session.state(), SessionState::Running);
    assert!(session.breakpoints().is_empty());
    assert_eq!(session.core().calls.add_breakpoint, 0);
}

#[test]
fn reset_while_running_cancels_loop_first() {
    let (mut session, _events) = session_with(spin_loop());
    session.run().expect("run should start");
    let frame = session.scheduler().pending_frame().expect("frame pending");

    session.reset().expect("reset should succeed");

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.core().calls.stop, 1);
    assert_eq!(session.core().calls.reset, 1);
    assert_eq!(session.scheduler().interval(), None);
    assert_eq!(session.on_frame(frame), Ok(TickOutcome::Stale));
}

#[test]
fn native_failure_mid_burst_leaves_session_idle() {
    let mut core = spin_loop();
    core.fail_step_at = Some(5);
    let (mut session, _events) = session_with(core);
    session.run().expect("run should start");
    let frame = session.scheduler_mut().take_frame().expect("frame pending");

    let result = session.on_frame(frame);

    assert_eq!(
        result,
        Err(SessionError::Native(NativeError::new(
            "debugger_step",
            "core trapped"
        )))
    );
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.scheduler().pending_frame(), None);
    assert_eq!(session.scheduler().interval(), None);
    assert!(!session.core().running);
}

#[test]
fn load_program_round_trips_through_memory() {
    let program = [0xA9, 0x42, 0xEA, 0x00];
    let (mut session, events) = session_with(ScriptedCore::new());

    session
        .load_program(&program, 0x0200)
        .expect("program should load");

    assert_eq!(session.read_memory_range(0x0200, 0x0203), Ok(program.to_vec()));
    assert_eq!(session.read_memory_range(0xFFFC, 0xFFFD), Ok(vec![0x00, 0x02]));
    assert_eq!(session.core().pc, 0x0200);
    assert_eq!(event_kinds(&events.borrow()), vec!["loaded", "state"]);
}

#[test]
fn observable_state_renders_recovered_immediate_loads() {
    let (mut session, _events) = session_with(ScriptedCore::new());
    session
        .load_opcode_text("A9 42 ; LDA #$42\nEA 00")
        .expect("listing should load");

    let observable = session.observable_state().expect("state should build");

    let first = &observable.disassembly[0];
    assert_eq!(first.instruction.address, 0x0200);
    assert_eq!(first.instruction.formatted, "LDA #$42");
    assert_eq!(first.operand.text, "#0x42");
    assert_eq!(first.operand.mode, Some(AddressingMode::Immediate));
    assert!(first.is_current);
    assert_eq!(observable.disassembly[1].instruction.address, 0x0202);
    assert_eq!(observable.memory_view.base, 0x0200);
    assert_eq!(observable.memory.rows[0].bytes[..2], [0xA9, 0x42]);
    assert_eq!(observable.stack.len(), 2);
}

#[test]
fn memory_page_selection_follows_jumps() {
    let (mut session, _events) = session_with(ScriptedCore::new());

    session.jump_to_address(0xC0DE).expect("jump should refresh");
    assert_eq!(session.memory_page(), MemoryPage::Page(0xC000));

    session
        .select_memory_page(MemoryPage::Vectors)
        .expect("selection should refresh");
    let observable = session.observable_state().expect("state should build");
    assert_eq!(observable.memory_view.size, 6);
}

#[test]
fn breakpoint_mutations_publish_sorted_lists() {
    let (mut session, events) = session_with(ScriptedCore::new());

    session.add_breakpoint(0x9000).expect("add");
    session.add_breakpoint(0x8000).expect("add");
    session.add_breakpoint(0x8000).expect("re-add");
    assert_eq!(session.toggle_breakpoint(0x9000), Ok(false));

    assert_eq!(
        events.borrow().last(),
        Some(&SessionEvent::BreakpointsChanged(vec![0x8000]))
    );
    assert_eq!(session.core().calls.add_breakpoint, 2);
    assert_eq!(session.core().calls.remove_breakpoint, 1);
    assert_eq!(
        session.core().breakpoints.iter().copied().collect::<Vec<_>>(),
        session.breakpoints().list_sorted()
    );
}

#[test]
fn invalid_config_is_rejected() {
    let config = SessionConfig {
        refresh_interval: Duration::ZERO,
        ..SessionConfig::default()
    };
    let result = Session::with_config(
        ScriptedCore::new(),
        ManualScheduler::new(),
        TickingClock::frozen(),
        config,
    );
    assert!(matches!(result, Err(SessionError::InvalidConfig(_))));
}

#[test]
fn scheduler_trait_is_object_safe_for_hosts() {
    let mut scheduler: Box<dyn HostScheduler> = Box::new(ManualScheduler::new());
    let frame = scheduler.request_frame();
    scheduler.cancel_frame(frame);
}
