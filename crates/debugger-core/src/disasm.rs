//! Operand rendering and 6502 addressing-mode classification.

use crate::Instruction;

/// Immediate-mode load/compare opcodes recognised structurally:
/// `LDA #`, `LDX #`, `LDY #`, `CMP #`, `CPX #`, `CPY #`.
pub const IMMEDIATE_OPCODES: [u8; 6] = [0xA9, 0xA2, 0xA0, 0xC9, 0xE0, 0xC0];

/// Operand-encoding category of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressingMode {
    /// No operand, or the accumulator.
    Implied,
    /// Literal byte operand.
    Immediate,
    /// One-byte address into page zero.
    ZeroPage,
    /// Full 16-bit address.
    Absolute,
    /// Signed branch displacement.
    Relative,
    /// Address plus an index register.
    Indexed,
    /// Address read through a pointer.
    Indirect,
}

/// Display-ready operand with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RenderedOperand {
    /// Operand text without the mnemonic.
    pub text: String,
    /// Classification, `None` when the text could not be classified.
    pub mode: Option<AddressingMode>,
}

impl RenderedOperand {
    fn new(text: String, mode: AddressingMode) -> Self {
        Self {
            text,
            mode: Some(mode),
        }
    }
}

/// Returns `true` for conditional branch opcodes (`xxx10000`).
#[must_use]
pub const fn is_branch_opcode(opcode: u8) -> bool {
    opcode & 0x1F == 0x10
}

/// Absolute target of a branch at `address` with displacement byte `offset`.
#[must_use]
pub fn branch_target(address: u16, offset: u8) -> u16 {
    let displacement = i16::from(i8::from_ne_bytes([offset]));
    address.wrapping_add(2).wrapping_add_signed(displacement)
}

/// Renders and classifies the operand of `instruction`.
///
/// Never fails: text the formatter cannot make sense of is returned
/// unchanged with no classification.
#[must_use]
pub fn render_operand(instruction: &Instruction) -> RenderedOperand {
    let Some(baseline) = baseline(instruction) else {
        return render_structural(instruction);
    };

    if let Some(rendered) = render_known_opcode(instruction) {
        return rendered;
    }

    let normalized = normalize_hex(baseline);
    match classify_surface(&normalized) {
        Some(mode) => RenderedOperand::new(normalized, mode),
        None => RenderedOperand {
            text: baseline.to_string(),
            mode: None,
        },
    }
}

/// Operand part of the core's formatted text, if it supplied one.
fn baseline(instruction: &Instruction) -> Option<&str> {
    instruction
        .formatted
        .strip_prefix(instruction.mnemonic.as_str())
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
}

/// Opcodes whose mode is fixed regardless of what the core printed.
fn render_known_opcode(instruction: &Instruction) -> Option<RenderedOperand> {
    if instruction.bytes != 2 {
        return None;
    }
    if IMMEDIATE_OPCODES.contains(&instruction.opcode) || is_branch_opcode(instruction.opcode) {
        return Some(render_structural(instruction));
    }
    None
}

fn render_structural(instruction: &Instruction) -> RenderedOperand {
    let [lo, _] = instruction.operand.to_le_bytes();
    match instruction.bytes {
        2 if IMMEDIATE_OPCODES.contains(&instruction.opcode) => {
            RenderedOperand::new(format!("#0x{lo:02X}"), AddressingMode::Immediate)
        }
        2 if is_branch_opcode(instruction.opcode) => RenderedOperand::new(
            format!("${:04X}", branch_target(instruction.address, lo)),
            AddressingMode::Relative,
        ),
        2 => RenderedOperand::new(format!("${lo:02X}"), AddressingMode::ZeroPage),
        3 => RenderedOperand::new(
            format!("${:04X}", instruction.operand),
            AddressingMode::Absolute,
        ),
        _ => RenderedOperand::new(String::new(), AddressingMode::Implied),
    }
}

fn classify_surface(text: &str) -> Option<AddressingMode> {
    if text.contains('#') {
        Some(AddressingMode::Immediate)
    } else if text.contains(',') {
        Some(AddressingMode::Indexed)
    } else if text.contains('(') && text.contains(')') {
        Some(AddressingMode::Indirect)
    } else if text.starts_with('$') && text.len() <= 5 {
        Some(if text.len() <= 3 {
            AddressingMode::ZeroPage
        } else {
            AddressingMode::Absolute
        })
    } else if text.eq_ignore_ascii_case("a") {
        Some(AddressingMode::Implied)
    } else {
        None
    }
}

/// Rewrites numeric literals: `#$2a`/`#42` become `#0x2A`, `$$c000` and
/// `0xc000` become `$C000`.
fn normalize_hex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '#' {
            let literal = &rest[1..];
            if let Some((value, used)) = immediate_literal(literal) {
                out.push_str(&format!("#0x{value:02X}"));
                rest = &literal[used..];
                continue;
            }
        } else if c == '$' || rest.starts_with("0x") || rest.starts_with("0X") {
            let digits_at = if c == '$' {
                rest.len() - rest.trim_start_matches('$').len()
            } else {
                2
            };
            let digits = hex_prefix(&rest[digits_at..]);
            if !digits.is_empty() {
                out.push('$');
                out.push_str(&digits.to_ascii_uppercase());
                rest = &rest[digits_at + digits.len()..];
                continue;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Parses the literal after `#`: `$hh`, `0xhh` or decimal up to 255.
fn immediate_literal(text: &str) -> Option<(u8, usize)> {
    let (digits_at, radix) = if text.starts_with('$') {
        (1, 16)
    } else if text.starts_with("0x") || text.starts_with("0X") {
        (2, 16)
    } else {
        (0, 10)
    };

    let body = &text[digits_at..];
    let digits = if radix == 16 {
        hex_prefix(body)
    } else {
        &body[..body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len()]
    };
    let value = u8::from_str_radix(digits, radix).ok()?;
    Some((value, digits_at + digits.len()))
}

fn hex_prefix(text: &str) -> &str {
    let len = text.len() - text.trim_start_matches(|c: char| c.is_ascii_hexdigit()).len();
    &text[..len]
}
