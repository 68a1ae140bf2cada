//! Asynchronous CSV journal reader with batch interface
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of JournalRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```
//!
//! Rows that fail to parse are logged and left out of the batch.

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::JournalRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous journal reader
///
/// Reads the journal in batches for the async strategy. Line numbers are
/// tracked across batches so rejections can still name the row.
///
/// # Examples
///
/// ```no_run
/// use tokio_util::compat::TokioAsyncReadCompatExt;
/// use wager_engine::io::AsyncReader;
///
/// # async fn run() -> std::io::Result<()> {
/// let file = tokio::fs::File::open("journal.csv").await?;
/// let mut reader = AsyncReader::new(file.compat());
/// loop {
///     let batch = reader.read_batch(500).await;
///     if batch.is_empty() {
///         break;
///     }
///     println!("read {} records", batch.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    /// Data rows read so far; the header is line 1
    rows_read: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a reader over any `futures` async source
    ///
    /// # Arguments
    ///
    /// * `reader` - Async source of journal CSV, header row first
    ///
    /// # Returns
    ///
    /// A new `AsyncReader` that has not read anything yet
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            rows_read: 0,
        }
    }

    /// Read up to `batch_size` valid records
    ///
    /// Malformed rows are logged with their line number and do not count
    /// towards the batch.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Maximum number of records to return
    ///
    /// # Returns
    ///
    /// The converted records in file order. An empty batch means the input
    /// is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<JournalRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(next) = records.next().await else {
                break;
            };
            self.rows_read += 1;
            let line = self.rows_read + 1;

            match next {
                Ok(csv_record) => match convert_csv_record(csv_record, line) {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!(line, error = %e, "skipping malformed journal record"),
                },
                Err(e) => warn!(line, error = %e, "CSV parse error"),
            }
        }

        batch
    }
}
