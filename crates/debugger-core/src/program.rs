//! Hex opcode listings and the bundled example programs.

use std::fmt;
use std::str::FromStr;

use crate::{SessionError, SessionResult};

/// Parses a whitespace/comma separated listing of hex bytes.
///
/// `;` starts a comment that runs to the end of the line.
///
/// # Errors
///
/// Returns [`SessionError::InvalidOpcodeText`] for a token that is not one
/// or two hex digits and [`SessionError::EmptyProgram`] when no bytes remain.
pub fn parse_opcode_text(text: &str) -> SessionResult<Vec<u8>> {
    let mut bytes = Vec::new();
    for line in text.lines() {
        let code = line.split(';').next().unwrap_or("");
        for token in code
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
        {
            let valid = (1..=2).contains(&token.len())
                && token.chars().all(|c| c.is_ascii_hexdigit());
            let byte = u8::from_str_radix(token, 16)
                .ok()
                .filter(|_| valid)
                .ok_or_else(|| SessionError::InvalidOpcodeText(token.to_string()))?;
            bytes.push(byte);
        }
    }

    if bytes.is_empty() {
        return Err(SessionError::EmptyProgram);
    }
    Ok(bytes)
}

/// Small demonstration programs shipped with the debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExampleProgram {
    /// Multiplies 10 by 3 through repeated addition into `$0002`.
    Counter,
    /// Fibonacci numbers in zero page until the value reaches `$55`.
    Fibonacci,
    /// Counts X down from 10, storing each value at `$0200`.
    Loop,
}

impl ExampleProgram {
    /// Every bundled program.
    pub const ALL: [Self; 3] = [Self::Counter, Self::Fibonacci, Self::Loop];

    /// Lowercase name used for lookup.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Fibonacci => "fibonacci",
            Self::Loop => "loop",
        }
    }

    /// Program listing in hex.
    #[must_use]
    pub const fn source(self) -> &'static str {
        match self {
            Self::Counter => {
                "A2 0A 8E 00 00 A2 03 8E 01 00 AC 00 00 A9 00 18 6D 01 00 88 D0 FA 8D 02 00 EA EA EA"
            }
            Self::Fibonacci => {
                "A9 01 85 00 A9 01 85 01 A5 00 18 65 01 85 02 A5 01 85 00 A5 02 85 01 A5 01 C9 55 90 EF 00"
            }
            Self::Loop => "A2 0A CA 8E 00 02 E0 00 D0 F8 EA EA EA",
        }
    }

    /// Assembled bytes.
    ///
    /// # Errors
    ///
    /// Never fails for the bundled listings; the signature follows
    /// [`parse_opcode_text`].
    pub fn bytes(self) -> SessionResult<Vec<u8>> {
        parse_opcode_text(self.source())
    }
}

impl fmt::Display for ExampleProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExampleProgram {
    type Err = SessionError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|program| program.name() == wanted)
            .ok_or_else(|| SessionError::UnknownProgram(name.to_string()))
    }
}
