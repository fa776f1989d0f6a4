// pandacan/src/dump.rs
//
// Implements the CSV frame-log format written by gmlan-log.
//
// This file is part of the Rust 'pandacan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CSV frame-log reading and writing.
//!
//! The `gmlan-log` tool records traffic as a four-column CSV file:
//!
//! ```text
//! Bus,MessageID,Message,MessageLength
//! 3,0x1aa,0xaaaaaaaaaaaaaaaa,8
//! 0,0x7df,0x0209,2
//! ```
//!
//! One header row, then exactly one row per received frame. `MessageID` and
//! `Message` are hexadecimal with a `0x` prefix; `MessageLength` is the
//! payload byte count. The `Reader` parses the same format back, mainly for
//! tests and offline tooling. The API is inspired by the
//! [csv](https://crates.io/crates/csv) crate.

use crate::frame::CanFrame;
use hex::FromHex;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use thiserror::Error;

/// The fixed header row.
pub const CSV_HEADER: &str = "Bus,MessageID,Message,MessageLength";

/// CSV log line parse error.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O Error
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A row with the wrong number of columns
    #[error("Expected 4 columns, got {0}")]
    WrongColumnCount(usize),
    /// Invalid bus id
    #[error("Invalid bus id")]
    InvalidBus,
    /// Invalid message id
    #[error("Invalid message ID")]
    InvalidMessageId,
    /// Invalid payload hex
    #[error("Invalid payload")]
    InvalidPayload,
    /// The length column contradicts the payload column
    #[error("Length column does not match payload")]
    LengthMismatch,
}

/// One parsed row of a CSV frame log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// The source bus.
    pub bus: u8,
    /// The message address.
    pub id: u32,
    /// The payload bytes.
    pub data: Vec<u8>,
}

/// Writes frames to a CSV log.
///
/// Rows ride the underlying writer's buffering; call [`flush`] on the exit
/// path to get everything on disk.
///
/// [`flush`]: Self::flush
pub struct Writer<W: Write> {
    wtr: W,
    rows: u64,
}

impl Writer<BufWriter<File>> {
    /// Creates a log file at the given path, truncating any previous one,
    /// and writes the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> Writer<W> {
    /// Wraps a writer and emits the header row.
    pub fn new(mut wtr: W) -> io::Result<Self> {
        writeln!(wtr, "{}", CSV_HEADER)?;
        Ok(Self { wtr, rows: 0 })
    }

    /// Appends one row for a received frame.
    pub fn write_frame(&mut self, frame: &CanFrame) -> io::Result<()> {
        writeln!(
            self.wtr,
            "{},{:#x},0x{},{}",
            frame.bus(),
            frame.raw_id(),
            hex::encode(frame.data()),
            frame.len()
        )?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far (the header is not counted).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes buffered rows to the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

/// Reads frames back out of a CSV log.
pub struct Reader<R> {
    rdr: R,
    line_buf: String,
    header_seen: bool,
}

impl Reader<BufReader<File>> {
    /// Opens a log file for parsing.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::from_reader(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Reader<R> {
    /// Wraps a buffered reader.
    pub fn from_reader(rdr: R) -> Self {
        Self {
            rdr,
            line_buf: String::new(),
            header_seen: false,
        }
    }

    /// Parses the next data row, skipping the header. `Ok(None)` at EOF.
    pub fn next_record(&mut self) -> Result<Option<CsvRecord>, ParseError> {
        loop {
            self.line_buf.clear();
            if self.rdr.read_line(&mut self.line_buf)? == 0 {
                return Ok(None);
            }
            let line = self.line_buf.trim_end();
            if line.is_empty() {
                continue;
            }
            if !self.header_seen && line == CSV_HEADER {
                self.header_seen = true;
                continue;
            }
            return parse_row(line).map(Some);
        }
    }

    /// Iterates over all remaining records.
    pub fn records(mut self) -> impl Iterator<Item = Result<CsvRecord, ParseError>> {
        std::iter::from_fn(move || self.next_record().transpose())
    }
}

fn parse_row(line: &str) -> Result<CsvRecord, ParseError> {
    let cols: Vec<&str> = line.split(',').collect();
    if cols.len() != 4 {
        return Err(ParseError::WrongColumnCount(cols.len()));
    }

    let bus = cols[0].parse::<u8>().map_err(|_| ParseError::InvalidBus)?;

    let id_hex = cols[1]
        .strip_prefix("0x")
        .ok_or(ParseError::InvalidMessageId)?;
    let id = u32::from_str_radix(id_hex, 16).map_err(|_| ParseError::InvalidMessageId)?;

    let data_hex = cols[2]
        .strip_prefix("0x")
        .ok_or(ParseError::InvalidPayload)?;
    let data = if data_hex.is_empty() {
        Vec::new()
    } else {
        Vec::from_hex(data_hex).map_err(|_| ParseError::InvalidPayload)?
    };

    let dlen = cols[3]
        .parse::<usize>()
        .map_err(|_| ParseError::LengthMismatch)?;
    if dlen != data.len() {
        return Err(ParseError::LengthMismatch);
    }

    Ok(CsvRecord { bus, id, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_can::StandardId;

    fn frame(id: u16, data: &[u8], bus: u8) -> CanFrame {
        CanFrame::new(StandardId::new(id).unwrap(), data, bus).unwrap()
    }

    #[test]
    fn test_header_and_row_format() {
        let mut wtr = Writer::new(Vec::new()).unwrap();
        wtr.write_frame(&frame(0x1aa, &[0xaa; 8], 3)).unwrap();
        wtr.write_frame(&frame(0x7df, &[0x02, 0x09], 0)).unwrap();
        assert_eq!(wtr.rows(), 2);

        let text = String::from_utf8(wtr.wtr).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Bus,MessageID,Message,MessageLength",
                "3,0x1aa,0xaaaaaaaaaaaaaaaa,8",
                "0,0x7df,0x0209,2",
            ]
        );
    }

    #[test]
    fn test_one_row_per_frame_roundtrip() {
        let frames = vec![
            frame(0x100, &[1, 2, 3], 0),
            frame(0x200, &[], 1),
            frame(0x3ff, &[0xde, 0xad, 0xbe, 0xef], 2),
        ];

        let mut wtr = Writer::new(Vec::new()).unwrap();
        for f in &frames {
            wtr.write_frame(f).unwrap();
        }
        let text = wtr.wtr;

        // Exactly one header plus one row per frame.
        let line_count = text.iter().filter(|&&b| b == b'\n').count();
        assert_eq!(line_count, frames.len() + 1);

        let records: Vec<CsvRecord> = Reader::from_reader(text.as_slice())
            .records()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), frames.len());
        for (rec, f) in records.iter().zip(&frames) {
            assert_eq!(rec.bus, f.bus());
            assert_eq!(rec.id, f.raw_id());
            assert_eq!(rec.data, f.data());
        }
    }

    #[test]
    fn test_length_column_checked() {
        let line = "3,0x1aa,0xaabb,3";
        assert!(matches!(parse_row(line), Err(ParseError::LengthMismatch)));

        let line = "3,0x1aa,0xaabb,2";
        let rec = parse_row(line).unwrap();
        assert_eq!(rec.data.len(), 2);
    }

    #[test]
    fn test_bad_rows() {
        assert!(matches!(
            parse_row("3,0x1aa,0xaabb"),
            Err(ParseError::WrongColumnCount(3))
        ));
        assert!(matches!(
            parse_row("cow,0x1aa,0xaabb,2"),
            Err(ParseError::InvalidBus)
        ));
        assert!(matches!(
            parse_row("3,1aa,0xaabb,2"),
            Err(ParseError::InvalidMessageId)
        ));
        assert!(matches!(
            parse_row("3,0x1aa,zz,2"),
            Err(ParseError::InvalidPayload)
        ));
    }
}
