#![allow(clippy::missing_errors_doc)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use debugger_core::{
    parse_hex_address, parse_hex_byte, Clock, ExampleProgram, HaltCause, ManualScheduler,
    MemoryPage, NativeCore, NativeError, NativeResult, Session, SessionError, SessionEvent,
    StatusFlag, TickOutcome, TimerHandle,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format!($($t)*)))
}

// Exports of the Emscripten-compiled 6502 core.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_step)]
    fn debugger_step() -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_run)]
    fn debugger_run() -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_stop)]
    fn debugger_stop() -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_reset)]
    fn debugger_reset() -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_is_running)]
    fn debugger_is_running() -> Result<u32, JsValue>;

    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_add_breakpoint)]
    fn debugger_add_breakpoint(addr: u16) -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_remove_breakpoint)]
    fn debugger_remove_breakpoint(addr: u16) -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_clear_breakpoints)]
    fn debugger_clear_breakpoints() -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_register_a)]
    fn debugger_get_register_a() -> Result<u32, JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_register_x)]
    fn debugger_get_register_x() -> Result<u32, JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_register_y)]
    fn debugger_get_register_y() -> Result<u32, JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_register_sp)]
    fn debugger_get_register_sp() -> Result<u32, JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_register_pc)]
    fn debugger_get_register_pc() -> Result<u32, JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_set_pc)]
    fn debugger_set_pc(pc: u16) -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_register_status)]
    fn debugger_get_register_status() -> Result<u32, JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_status_flag)]
    fn debugger_get_status_flag(bit: u8) -> Result<u32, JsValue>;

    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_read_memory)]
    fn debugger_read_memory(addr: u16) -> Result<u32, JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_write_memory)]
    fn debugger_write_memory(addr: u16, value: u8) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_instruction_count)]
    fn debugger_get_instruction_count() -> Result<f64, JsValue>;
    #[wasm_bindgen(catch, js_namespace = Module, js_name = _debugger_get_cycle_count)]
    fn debugger_get_cycle_count() -> Result<f64, JsValue>;

    // String-returning exports go through ccall so Emscripten copies the C string out.
    #[wasm_bindgen(catch, js_namespace = Module)]
    fn ccall(
        ident: &str,
        return_type: &str,
        arg_types: &js_sys::Array,
        args: &js_sys::Array,
    ) -> Result<JsValue, JsValue>;
}

fn native_error(call: &'static str, err: &JsValue) -> NativeError {
    let reason = err.as_string().unwrap_or_else(|| format!("{err:?}"));
    NativeError::new(call, reason)
}

fn narrow<T: TryFrom<u32>>(call: &'static str, value: u32) -> NativeResult<T> {
    T::try_from(value).map_err(|_| NativeError::new(call, format!("value {value} out of range")))
}

// JS numbers carry the 64-bit counters as doubles.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn counter(call: &'static str, value: f64) -> NativeResult<u64> {
    if !value.is_finite() || value < 0.0 {
        return Err(NativeError::new(call, format!("bad counter {value}")));
    }
    Ok(value as u64)
}

/// Native core reached through the Emscripten `Module` object.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmscriptenCore;

impl EmscriptenCore {
    fn disassemble(call: &'static str, first: u16, second: u16) -> NativeResult<String> {
        let number = JsValue::from_str("number");
        let arg_types = js_sys::Array::of2(&number, &number);
        let args = js_sys::Array::of2(&JsValue::from(first), &JsValue::from(second));
        let text = ccall(call, "string", &arg_types, &args).map_err(|e| native_error(call, &e))?;
        text.as_string()
            .ok_or_else(|| NativeError::new(call, "core returned a non-string"))
    }
}

impl NativeCore for EmscriptenCore {
    fn step(&mut self) -> NativeResult<()> {
        debugger_step().map_err(|e| native_error("debugger_step", &e))
    }

    fn run(&mut self) -> NativeResult<()> {
        debugger_run().map_err(|e| native_error("debugger_run", &e))
    }

    fn stop(&mut self) -> NativeResult<()> {
        debugger_stop().map_err(|e| native_error("debugger_stop", &e))
    }

    fn reset(&mut self) -> NativeResult<()> {
        debugger_reset().map_err(|e| native_error("debugger_reset", &e))
    }

    fn is_running(&mut self) -> NativeResult<bool> {
        debugger_is_running()
            .map(|flag| flag != 0)
            .map_err(|e| native_error("debugger_is_running", &e))
    }

    fn add_breakpoint(&mut self, addr: u16) -> NativeResult<()> {
        debugger_add_breakpoint(addr).map_err(|e| native_error("debugger_add_breakpoint", &e))
    }

    fn remove_breakpoint(&mut self, addr: u16) -> NativeResult<()> {
        debugger_remove_breakpoint(addr)
            .map_err(|e| native_error("debugger_remove_breakpoint", &e))
    }

    fn clear_breakpoints(&mut self) -> NativeResult<()> {
        debugger_clear_breakpoints().map_err(|e| native_error("debugger_clear_breakpoints", &e))
    }

    fn register_a(&mut self) -> NativeResult<u8> {
        let call = "debugger_get_register_a";
        narrow(call, debugger_get_register_a().map_err(|e| native_error(call, &e))?)
    }

    fn register_x(&mut self) -> NativeResult<u8> {
        let call = "debugger_get_register_x";
        narrow(call, debugger_get_register_x().map_err(|e| native_error(call, &e))?)
    }

    fn register_y(&mut self) -> NativeResult<u8> {
        let call = "debugger_get_register_y";
        narrow(call, debugger_get_register_y().map_err(|e| native_error(call, &e))?)
    }

    fn register_sp(&mut self) -> NativeResult<u8> {
        let call = "debugger_get_register_sp";
        narrow(call, debugger_get_register_sp().map_err(|e| native_error(call, &e))?)
    }

    fn register_pc(&mut self) -> NativeResult<u16> {
        let call = "debugger_get_register_pc";
        narrow(call, debugger_get_register_pc().map_err(|e| native_error(call, &e))?)
    }

    fn set_register_pc(&mut self, pc: u16) -> NativeResult<()> {
        debugger_set_pc(pc).map_err(|e| native_error("debugger_set_pc", &e))
    }

    fn register_status(&mut self) -> NativeResult<u8> {
        let call = "debugger_get_register_status";
        narrow(call, debugger_get_register_status().map_err(|e| native_error(call, &e))?)
    }

    fn status_flag(&mut self, flag: StatusFlag) -> NativeResult<bool> {
        debugger_get_status_flag(flag.bit())
            .map(|set| set != 0)
            .map_err(|e| native_error("debugger_get_status_flag", &e))
    }

    fn read_memory(&mut self, addr: u16) -> NativeResult<u8> {
        let call = "debugger_read_memory";
        narrow(call, debugger_read_memory(addr).map_err(|e| native_error(call, &e))?)
    }

    fn write_memory(&mut self, addr: u16, value: u8) -> NativeResult<()> {
        debugger_write_memory(addr, value).map_err(|e| native_error("debugger_write_memory", &e))
    }

    fn instruction_count(&mut self) -> NativeResult<u64> {
        let call = "debugger_get_instruction_count";
        counter(call, debugger_get_instruction_count().map_err(|e| native_error(call, &e))?)
    }

    fn cycle_count(&mut self) -> NativeResult<u64> {
        let call = "debugger_get_cycle_count";
        counter(call, debugger_get_cycle_count().map_err(|e| native_error(call, &e))?)
    }

    fn disassemble_around_pc(&mut self, before: u16, after: u16) -> NativeResult<String> {
        Self::disassemble("debugger_disassemble_around_pc", before, after)
    }

    fn disassemble_range(&mut self, start: u16, end: u16) -> NativeResult<String> {
        Self::disassemble("debugger_disassemble_range", start, end)
    }
}

/// Browser wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateClock;

impl Clock for DateClock {
    fn now(&self) -> Duration {
        Duration::from_secs_f64(js_sys::Date::now().max(0.0) / 1000.0)
    }
}

/// JS-compatible summary of one `pump` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmPumpReport {
    pub executed: u32,
    pub halted: Option<HaltCause>,
    pub refreshed: bool,
}

impl WasmPumpReport {
    fn from_tick(outcome: TickOutcome) -> Self {
        match outcome {
            TickOutcome::Stale => Self::default(),
            TickOutcome::Continued { executed } => Self {
                executed,
                ..Self::default()
            },
            TickOutcome::Halted { cause, executed } => Self {
                executed,
                halted: Some(cause),
                refreshed: true,
            },
        }
    }
}

fn to_js(err: &SessionError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub struct WasmSession {
    session: Session<EmscriptenCore, ManualScheduler, DateClock>,
    events: Rc<RefCell<Vec<SessionEvent>>>,
    refresh_due: Option<(TimerHandle, Duration)>,
}

#[wasm_bindgen]
impl WasmSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        let mut session = Session::new(EmscriptenCore, ManualScheduler::new(), DateClock);
        let events = Rc::new(RefCell::new(Vec::new()));
        let queue = Rc::clone(&events);
        session.subscribe(move |event: &SessionEvent| queue.borrow_mut().push(event.clone()));
        Self {
            session,
            events,
            refresh_due: None,
        }
    }

    pub fn step(&mut self) -> Result<(), JsValue> {
        self.session.step().map_err(|e| to_js(&e))
    }

    pub fn run(&mut self) -> Result<(), JsValue> {
        self.session.run().map_err(|e| to_js(&e))
    }

    pub fn stop(&mut self) -> Result<(), JsValue> {
        self.refresh_due = None;
        self.session.stop().map_err(|e| to_js(&e))
    }

    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.refresh_due = None;
        self.session.reset().map_err(|e| to_js(&e))
    }

    /// Call once per animation frame. Delivers the pending burst and, when
    /// its period has elapsed, the refresh timer.
    pub fn pump(&mut self) -> Result<JsValue, JsValue> {
        let mut report = WasmPumpReport::default();
        if let Some(frame) = self.session.scheduler_mut().take_frame() {
            let outcome = self.session.on_frame(frame).map_err(|e| to_js(&e))?;
            report = WasmPumpReport::from_tick(outcome);
            if let Some(cause) = report.halted {
                console_log!("Execution halted: {:?}", cause);
            }
        }

        match self.session.scheduler().interval() {
            Some((timer, period)) => {
                let now = DateClock.now();
                let due = match self.refresh_due {
                    Some((active, due)) if active == timer => due,
                    _ => now + period,
                };
                if now >= due {
                    report.refreshed |= self.session.on_refresh(timer).map_err(|e| to_js(&e))?;
                    self.refresh_due = Some((timer, now + period));
                } else {
                    self.refresh_due = Some((timer, due));
                }
            }
            None => self.refresh_due = None,
        }

        serialize(&report)
    }

    pub fn add_breakpoint(&mut self, addr: u16) -> Result<(), JsValue> {
        self.session.add_breakpoint(addr).map_err(|e| to_js(&e))
    }

    /// Adds a breakpoint typed as hex text (`$8000`, `0x8000` or `8000`).
    pub fn add_breakpoint_hex(&mut self, text: &str) -> Result<(), JsValue> {
        let addr = parse_hex_address(text).map_err(|e| to_js(&e))?;
        self.add_breakpoint(addr)
    }

    pub fn remove_breakpoint(&mut self, addr: u16) -> Result<(), JsValue> {
        self.session.remove_breakpoint(addr).map_err(|e| to_js(&e))
    }

    pub fn toggle_breakpoint(&mut self, addr: u16) -> Result<bool, JsValue> {
        self.session.toggle_breakpoint(addr).map_err(|e| to_js(&e))
    }

    pub fn clear_breakpoints(&mut self) -> Result<(), JsValue> {
        self.session.clear_breakpoints().map_err(|e| to_js(&e))
    }

    #[must_use]
    pub fn breakpoints(&self) -> Vec<u16> {
        self.session.breakpoints().list_sorted()
    }

    /// Loads a whitespace-separated hex listing at `$0200`.
    pub fn load_opcodes(&mut self, text: &str) -> Result<(), JsValue> {
        self.session.load_opcode_text(text).map_err(|e| to_js(&e))?;
        console_log!("Loaded opcode listing");
        Ok(())
    }

    pub fn load_example(&mut self, name: &str) -> Result<(), JsValue> {
        let program: ExampleProgram = name.parse().map_err(|e| to_js(&e))?;
        self.session.load_example(program).map_err(|e| to_js(&e))?;
        console_log!("Loaded example program {}", program);
        Ok(())
    }

    pub fn write_memory(&mut self, addr: &str, value: &str) -> Result<(), JsValue> {
        let addr = parse_hex_address(addr).map_err(|e| to_js(&e))?;
        let value = parse_hex_byte(value).map_err(|e| to_js(&e))?;
        self.session.write_memory(addr, value).map_err(|e| to_js(&e))
    }

    /// Selects `zeropage`, `stack`, `ram` or `vectors`.
    pub fn select_memory_page(&mut self, name: &str) -> Result<(), JsValue> {
        let page: MemoryPage = name.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.session.select_memory_page(page).map_err(|e| to_js(&e))
    }

    pub fn jump_to_address(&mut self, text: &str) -> Result<(), JsValue> {
        let addr = parse_hex_address(text).map_err(|e| to_js(&e))?;
        self.session.jump_to_address(addr).map_err(|e| to_js(&e))
    }

    pub fn set_pc(&mut self, text: &str) -> Result<(), JsValue> {
        let addr = parse_hex_address(text).map_err(|e| to_js(&e))?;
        self.session.set_pc(addr).map_err(|e| to_js(&e))
    }

    /// Returns the full observable state as a JSON object.
    pub fn state(&mut self) -> Result<JsValue, JsValue> {
        let observable = self.session.observable_state().map_err(|e| to_js(&e))?;
        serialize(&observable)
    }

    /// Returns and clears the events queued since the last call.
    pub fn drain_events(&mut self) -> Result<JsValue, JsValue> {
        let events: Vec<SessionEvent> = self.events.borrow_mut().drain(..).collect();
        serialize(&events)
    }
}

impl Default for WasmSession {
    fn default() -> Self {
        Self::new()
    }
}
