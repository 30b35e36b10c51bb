//! Display windows over the address space.

use std::fmt;
use std::str::FromStr;

/// Bytes per hex dump row.
pub const BYTES_PER_ROW: usize = 16;

/// Size of a full memory page.
pub const PAGE_BYTES: u16 = 0x100;

/// Named page presets offered to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryPage {
    /// `$0000-$00FF`.
    ZeroPage,
    /// `$0100-$01FF`.
    Stack,
    /// `$0200-$02FF`, the default program area.
    #[default]
    Ram,
    /// `$FFFA-$FFFF`: NMI, reset and IRQ vectors.
    Vectors,
    /// Arbitrary page containing the given base.
    Page(u16),
}

impl MemoryPage {
    /// Page containing `addr`.
    #[must_use]
    pub const fn containing(addr: u16) -> Self {
        Self::Page(addr & 0xFF00)
    }

    /// Resolves the preset into a concrete window.
    #[must_use]
    pub const fn view(self) -> MemoryPageView {
        match self {
            Self::ZeroPage => MemoryPageView::page(0x0000),
            Self::Stack => MemoryPageView::page(0x0100),
            Self::Ram => MemoryPageView::page(0x0200),
            Self::Vectors => MemoryPageView {
                base: 0xFFFA,
                size: 6,
            },
            Self::Page(base) => MemoryPageView::page(base & 0xFF00),
        }
    }
}

impl FromStr for MemoryPage {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "zeropage" | "zero" => Ok(Self::ZeroPage),
            "stack" => Ok(Self::Stack),
            "ram" => Ok(Self::Ram),
            "vectors" => Ok(Self::Vectors),
            other => Err(format!("unknown memory page `{other}`")),
        }
    }
}

/// Concrete window: base address and byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryPageView {
    /// First address shown.
    pub base: u16,
    /// Number of bytes shown (6 or 256).
    pub size: u16,
}

impl MemoryPageView {
    const fn page(base: u16) -> Self {
        Self {
            base,
            size: PAGE_BYTES,
        }
    }

    /// Last address inside the window.
    #[must_use]
    pub const fn last(self) -> u16 {
        self.base.saturating_add(self.size.saturating_sub(1))
    }
}

/// One hex dump row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryRow {
    /// Address of the first byte in the row.
    pub base: u16,
    /// Up to [`BYTES_PER_ROW`] bytes.
    pub bytes: Vec<u8>,
    /// Printable rendering, `.` for non-printable bytes.
    pub ascii: String,
}

/// Rows of a memory window, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryDump {
    /// Rows in address order.
    pub rows: Vec<MemoryRow>,
}

impl MemoryDump {
    /// Splits `bytes` read from `base` into rows.
    #[must_use]
    pub fn from_bytes(base: u16, bytes: &[u8]) -> Self {
        let rows = bytes
            .chunks(BYTES_PER_ROW)
            .zip((0_u16..).step_by(BYTES_PER_ROW))
            .map(|(chunk, offset)| MemoryRow {
                base: base.wrapping_add(offset),
                bytes: chunk.to_vec(),
                ascii: chunk.iter().map(|byte| printable(*byte)).collect(),
            })
            .collect();
        Self { rows }
    }
}

impl fmt::Display for MemoryDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            write!(f, "{:04X}:", row.base)?;
            for byte in &row.bytes {
                write!(f, " {byte:02X}")?;
            }
            writeln!(f, "  {}", row.ascii)?;
        }
        Ok(())
    }
}

const fn printable(byte: u8) -> char {
    if matches!(byte, 0x20..=0x7E) {
        byte as char
    } else {
        '.'
    }
}
