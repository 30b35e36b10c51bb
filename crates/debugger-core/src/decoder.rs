//! Decoder for the native core's textual disassembly stream.
//!
//! The core reports instructions as `#`-separated records of seven
//! `|`-separated decimal fields:
//!
//! ```text
//! address|opcode|mnemonic|operand|formatted|bytes|cycles
//! ```
//!
//! The format is lossy. Fields go missing, addresses come back blank and
//! immediate-mode text such as `LDA #$42` collides with the record
//! delimiter. Decoding is therefore best effort: bad records are dropped or
//! repaired, never reported.

use std::fmt;
use std::ops::Range;

use log::trace;

/// Separator between records.
pub const RECORD_DELIMITER: char = '#';
/// Separator between fields inside a record.
pub const FIELD_DELIMITER: char = '|';
/// Field count of a conforming record.
pub const RECORD_FIELD_COUNT: usize = 7;

/// Fewest fields that still identify an instruction.
const MIN_FIELD_COUNT: usize = 3;

/// Opcodes whose formatted text is known to collide with the record
/// delimiter, with the mnemonic the targeted scan matches on.
pub const COMPENSATED_OPCODES: [(u8, &str); 2] = [(162, "LDX"), (169, "LDA")];

/// Byte length and cycle count assumed for compensated records.
const COMPENSATED_DEFAULT_LEN: u8 = 2;
const COMPENSATED_DEFAULT_CYCLES: u32 = 2;

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    /// Address of the opcode byte.
    pub address: u16,
    /// Opcode byte.
    pub opcode: u8,
    /// Mnemonic, `UNK` when the core sent none.
    pub mnemonic: String,
    /// Raw operand value; width follows `bytes`.
    pub operand: u16,
    /// Display text produced by the core.
    pub formatted: String,
    /// Encoded length, `1..=3`.
    pub bytes: u8,
    /// Base cycle count.
    pub cycles: u32,
}

impl Instruction {
    /// Address of the instruction that follows this one.
    #[must_use]
    pub fn next_address(&self) -> u16 {
        self.address.wrapping_add(u16::from(self.bytes))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:04X}: {}", self.address, self.formatted)
    }
}

/// Decodes a wire-format disassembly string.
///
/// Returns records sorted ascending by address. Empty input yields an empty
/// vector; malformed records are repaired or dropped.
#[must_use]
pub fn decode_disassembly(raw: &str) -> Vec<Instruction> {
    let (superseding, standalone): (Vec<_>, Vec<_>) = scan_compensated(raw)
        .into_iter()
        .partition(|record| record.collided);

    let mut pending = Vec::new();
    for (offset, text) in fragments(raw) {
        if superseding.iter().any(|record| record.span.contains(&offset)) {
            trace!("fragment at offset {offset} superseded by targeted scan");
            continue;
        }
        match parse_record(text) {
            Some(record) => pending.push((offset, record)),
            None => trace!("dropping record with too few fields: {text:?}"),
        }
    }

    // Recovered records keep their wire position so they take part in fix-up.
    for record in superseding {
        trace!(
            "recovered {} at offset {} from targeted scan",
            record.pending.mnemonic,
            record.span.start
        );
        pending.push((record.span.start, record.pending));
    }
    pending.sort_by_key(|(offset, _)| *offset);

    let mut instructions =
        resolve_addresses(pending.into_iter().map(|(_, record)| record).collect());

    for record in standalone {
        let Some(address) = record.pending.address else {
            continue;
        };
        if instructions.iter().any(|existing| existing.address == address) {
            continue;
        }
        trace!("recovered {} at ${address:04X} from targeted scan", record.pending.mnemonic);
        instructions.push(record.pending.resolve(address));
    }

    instructions.sort_by_key(|instruction| instruction.address);
    instructions
}

/// Record as parsed, before address fix-up.
struct PendingRecord {
    address: Option<u16>,
    opcode: u8,
    mnemonic: String,
    operand: u16,
    formatted: String,
    bytes: u8,
    cycles: u32,
}

impl PendingRecord {
    fn resolve(self, address: u16) -> Instruction {
        Instruction {
            address,
            opcode: self.opcode,
            mnemonic: self.mnemonic,
            operand: self.operand,
            formatted: self.formatted,
            bytes: self.bytes,
            cycles: self.cycles,
        }
    }
}

/// Non-empty `#`-separated fragments with their byte offsets in `raw`.
fn fragments(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    raw.split(RECORD_DELIMITER).filter_map(move |text| {
        let start = offset;
        offset += text.len() + RECORD_DELIMITER.len_utf8();
        (!text.trim().is_empty()).then_some((start, text))
    })
}

fn parse_record(text: &str) -> Option<PendingRecord> {
    let fields: Vec<&str> = text.split(FIELD_DELIMITER).map(str::trim).collect();
    if fields.len() < MIN_FIELD_COUNT {
        return None;
    }
    let field = |index: usize| fields.get(index).copied().unwrap_or("");

    let mnemonic = match field(2) {
        "" => "UNK".to_string(),
        text => text.to_string(),
    };
    let formatted = match field(4) {
        "" => mnemonic.clone(),
        text => text.to_string(),
    };

    Some(PendingRecord {
        address: parse_address(field(0)),
        opcode: field(1).parse().unwrap_or(0),
        mnemonic,
        operand: field(3).parse().unwrap_or(0),
        formatted,
        bytes: parse_length(field(5)).unwrap_or(1),
        cycles: field(6).parse().unwrap_or(0),
    })
}

/// Positive in-range decimal address; anything else needs fix-up.
fn parse_address(text: &str) -> Option<u16> {
    text.parse::<u16>().ok().filter(|address| *address > 0)
}

fn parse_length(text: &str) -> Option<u8> {
    text.parse::<u8>().ok().filter(|len| (1..=3).contains(len))
}

/// Fills missing addresses, first from the running prediction and then by
/// linking each leftover to its predecessor.
fn resolve_addresses(pending: Vec<PendingRecord>) -> Vec<Instruction> {
    let mut predicted: Option<u16> = None;
    let mut partial: Vec<(Option<u16>, PendingRecord)> = Vec::with_capacity(pending.len());
    for record in pending {
        let address = record.address.or(predicted);
        predicted = address.map(|address| address.wrapping_add(u16::from(record.bytes)));
        partial.push((address, record));
    }

    let mut instructions: Vec<Instruction> = Vec::with_capacity(partial.len());
    for (address, record) in partial {
        let address = address.unwrap_or_else(|| {
            instructions
                .last()
                .map_or(0, Instruction::next_address)
        });
        instructions.push(record.resolve(address));
    }
    instructions
}

/// Record recovered by the opcode-targeted scan.
struct CompensatedRecord {
    span: Range<usize>,
    collided: bool,
    pending: PendingRecord,
}

fn scan_compensated(raw: &str) -> Vec<CompensatedRecord> {
    COMPENSATED_OPCODES
        .iter()
        .flat_map(|&(opcode, mnemonic)| {
            let needle = format!("|{opcode}|{mnemonic}|");
            raw.match_indices(needle.as_str())
                .filter_map(|(index, matched)| {
                    scan_record_at(raw, index, index + matched.len(), opcode, mnemonic)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Matches `<addr>|<opcode>|<MNEMONIC>|<operand>|<formatted>|<bytes>|<cycles>`
/// around a needle hit. The formatted text may contain `#`; the record ends
/// at end of input or at a `#` that opens another record.
fn scan_record_at(
    raw: &str,
    needle_start: usize,
    needle_end: usize,
    opcode: u8,
    mnemonic: &str,
) -> Option<CompensatedRecord> {
    let before = &raw[..needle_start];
    let preceding = before.trim_end_matches(|c: char| c.is_ascii_digit());
    let start = preceding.len();
    if start > 0 && !preceding.ends_with(RECORD_DELIMITER) {
        return None;
    }
    // Any digits anchor the record; invalid values such as 0 are fixed up later.
    let address_text = &raw[start..needle_start];
    if address_text.is_empty() {
        return None;
    }
    let address = parse_address(address_text);

    let rest = &raw[needle_end..];
    let operand_len = rest.find(FIELD_DELIMITER)?;
    let operand_text = &rest[..operand_len];
    if operand_text.is_empty() || !operand_text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let operand: u16 = operand_text.parse().ok()?;

    let body_start = needle_end + operand_len + FIELD_DELIMITER.len_utf8();
    let (end, formatted, bytes, cycles) = record_tail(raw, body_start)?;

    let [operand_lo, _] = operand.to_le_bytes();
    Some(CompensatedRecord {
        span: start..end,
        collided: formatted.contains(RECORD_DELIMITER),
        pending: PendingRecord {
            address,
            opcode,
            mnemonic: mnemonic.to_string(),
            operand,
            formatted: format!("{mnemonic} #${operand_lo:02X}"),
            bytes: parse_length(bytes).unwrap_or(COMPENSATED_DEFAULT_LEN),
            cycles: match cycles.parse() {
                Ok(0) | Err(_) => COMPENSATED_DEFAULT_CYCLES,
                Ok(cycles) => cycles,
            },
        },
    })
}

/// Finds the earliest record end after `body_start` whose text ends in
/// `|<bytes>|<cycles>`.
fn record_tail(raw: &str, body_start: usize) -> Option<(usize, &str, &str, &str)> {
    let ends = raw[body_start..]
        .match_indices(RECORD_DELIMITER)
        .map(|(index, _)| body_start + index)
        .filter(|&index| {
            let next = &raw[index + RECORD_DELIMITER.len_utf8()..];
            next.is_empty() || opens_record(next)
        })
        .chain(std::iter::once(raw.len()));

    for end in ends {
        let body = &raw[body_start..end];
        let mut parts = body.rsplitn(3, FIELD_DELIMITER);
        let (Some(cycles), Some(bytes), Some(formatted)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        if is_decimal(bytes) && is_decimal(cycles) {
            return Some((end, formatted, bytes, cycles));
        }
    }
    None
}

fn opens_record(text: &str) -> bool {
    text.trim_start_matches(|c: char| c.is_ascii_digit())
        .starts_with(FIELD_DELIMITER)
}

fn is_decimal(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}
