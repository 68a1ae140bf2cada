//! Synchronous CSV journal reader
//!
//! Streams journal records one at a time through an iterator, so memory use
//! stays flat regardless of file size.
//!
//! # Iterator Interface
//!
//! `SyncReader` yields `Result<JournalRecord, String>` per data row:
//!
//! ```no_run
//! use std::path::Path;
//! use wager_engine::io::SyncReader;
//!
//! let reader = SyncReader::new(Path::new("journal.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("line {}: {:?}", record.line, record.action),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Failing to open the file is returned from `new()`
//! - Rows that fail to parse or convert are yielded as `Err` with their line
//!   number, and iteration carries on with the next row

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::JournalRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming reader over a journal file
///
/// Each item is either a journal record or a message naming the offending
/// line. Errors do not stop iteration.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    /// Data rows read so far; the header is line 1
    rows_read: u64,
}

impl SyncReader {
    /// Open a journal file
    ///
    /// The reader trims whitespace around fields and accepts rows with
    /// trailing columns left out.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the journal CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` positioned before the first data row
    /// * `Err(String)` if the file cannot be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            rows_read: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<JournalRecord, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;

        self.rows_read += 1;
        let line = self.rows_read + 1;
        Some(match next {
            Ok(csv_record) => {
                convert_csv_record(csv_record, line).map_err(|e| format!("Line {}: {}", line, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}
