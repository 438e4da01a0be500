use std::fmt::Write;
use std::str::FromStr;

use thiserror::Error;

use crate::machine::Memory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("start address {start} is after end address {end}")]
    InvertedRange { start: usize, end: usize },
    #[error("end address {end} is outside memory (size {size})")]
    OutOfBounds { end: usize, size: usize },
    #[error("invalid address range '{0}', expected START-END")]
    Syntax(String),
}

/// An inclusive address range, written `START-END`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    pub start: usize,
    pub end: usize,
}

impl AddressRange {
    pub fn new(start: usize, end: usize) -> Result<Self, SnapshotError> {
        if start > end {
            return Err(SnapshotError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }
}

impl FromStr for AddressRange {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || SnapshotError::Syntax(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(syntax)?;
        let start = start.trim().parse::<usize>().map_err(|_| syntax())?;
        let end = end.trim().parse::<usize>().map_err(|_| syntax())?;
        Self::new(start, end)
    }
}

/// One memory cell in a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub address: usize,
    pub value: u8,
}

impl Cell {
    /// `0x` followed by exactly two lowercase hex digits.
    pub fn hex(&self) -> String {
        format!("0x{:02x}", self.value)
    }
}

/// A copy of a contiguous memory range, one cell per address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub range: AddressRange,
    pub cells: Vec<Cell>,
}

impl Snapshot {
    /// Capture `range` of `memory`. Every address in the range must exist.
    pub fn capture(memory: &Memory, range: AddressRange) -> Result<Self, SnapshotError> {
        let bytes = memory.as_slice();
        let window = bytes
            .get(range.start..=range.end)
            .ok_or(SnapshotError::OutOfBounds {
                end: range.end,
                size: bytes.len(),
            })?;
        let cells = window
            .iter()
            .enumerate()
            .map(|(i, &value)| Cell {
                address: range.start + i,
                value,
            })
            .collect();
        Ok(Self { range, cells })
    }
}

/// Renders a snapshot into a document.
pub trait Exporter {
    fn export(&self, snapshot: &Snapshot) -> String;
}

/// XML document with one `<byte>` element per cell:
///
/// ```text
/// <?xml version="1.0" ?>
/// <memory_dump start="100" end="101">
///   <byte address="100" value="5">0x05</byte>
///   <byte address="101" value="0">0x00</byte>
/// </memory_dump>
/// ```
pub struct XmlExporter;

impl Exporter for XmlExporter {
    fn export(&self, snapshot: &Snapshot) -> String {
        let mut out = String::from("<?xml version=\"1.0\" ?>\n");
        let _ = writeln!(
            out,
            "<memory_dump start=\"{}\" end=\"{}\">",
            snapshot.range.start, snapshot.range.end
        );
        for cell in &snapshot.cells {
            let _ = writeln!(
                out,
                "  <byte address=\"{}\" value=\"{}\">{}</byte>",
                cell.address,
                cell.value,
                cell.hex()
            );
        }
        out.push_str("</memory_dump>\n");
        out
    }
}
