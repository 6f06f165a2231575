use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::domain::Location;
use crate::error::{ImportError, Result};
use crate::infrastructure::MessageAggregator;

/// One CSV row materialized as an ordered field map.
///
/// Keeping the whole map rather than a typed struct preserves unanticipated
/// columns for row hashing and lets error messages quote the raw row.
#[derive(Debug, Clone)]
pub struct CsvRow {
    fields: BTreeMap<String, String>,
}

impl CsvRow {
    pub fn new(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        CsvRow { fields }
    }

    /// Fetches a required field. Absence means the file schema is not what
    /// the venue documents, which aborts the import.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ImportError::MissingKey {
                key: key.to_string(),
                row: self.to_sorted_json(),
            })
    }

    /// Fetches an optional field, treating an empty value as absent.
    pub fn opt(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(value) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// Deterministic digest of the full row, used to build idempotent event
    /// identifiers. Sorted-key serialization makes the digest independent of
    /// column order.
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(self.to_sorted_json().as_bytes()))
    }

    fn to_sorted_json(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_default()
    }
}

/// Builds the user-facing warning for a recoverable row skip.
pub(crate) fn warning_for(source: &str, error: &ImportError) -> String {
    match error {
        ImportError::UnknownAsset(symbol) => {
            format!("During {source} found action with unknown asset {symbol}. Ignoring entry")
        }
        ImportError::UnsupportedAsset(symbol) => {
            format!("During {source} found action with unsupported asset {symbol}. Ignoring entry")
        }
        ImportError::UnsupportedEntry(_) => {
            format!("Unsupported entry during {source}. {error}. Ignoring entry")
        }
        _ => format!("Deserialization error during {source}. {error}. Ignoring entry"),
    }
}

/// Shared CSV import loop. A venue importer implements [`consume_row`] (and
/// [`flush`] when it batches records); the loop owns BOM handling, error
/// routing and the end-of-input flush.
///
/// [`consume_row`]: CsvImport::consume_row
/// [`flush`]: CsvImport::flush
pub trait CsvImport {
    fn location(&self) -> Location;

    fn messages(&mut self) -> &mut MessageAggregator;

    /// Maps one row into canonical records, submitting or buffering them.
    /// No record may reach the sink before the row has fully deserialized.
    fn consume_row(&mut self, row: &CsvRow) -> Result<()>;

    /// Pushes batched records to the sink. Called exactly once per import,
    /// on the success path and on the abort path alike.
    fn flush(&mut self) {}

    fn import_file(&mut self, path: &Path) -> Result<()> {
        info!(
            "Importing {} data from {}",
            self.location().venue_name(),
            path.display()
        );
        let raw = fs::read_to_string(path)?;
        self.import_str(&raw)
    }

    fn import_reader<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        self.import_str(&raw)
    }

    fn import_str(&mut self, raw: &str) -> Result<()> {
        let venue = self.location().venue_name();
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut reader = csv::ReaderBuilder::new().from_reader(raw.as_bytes());
        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => {
                self.flush();
                return Err(e.into());
            }
        };

        let mut imported = 0usize;
        let mut skipped = 0usize;
        let mut outcome = Ok(());
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    outcome = Err(ImportError::from(e));
                    break;
                }
            };
            let row = CsvRow::new(&headers, &record);
            match self.consume_row(&row) {
                Ok(()) => imported += 1,
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {venue} row: {e}");
                    let message = warning_for(&format!("{venue} CSV import"), &e);
                    self.messages().add_warning(message);
                    skipped += 1;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        // Rows parsed before an abort must not be lost, so batched records
        // reach the sink on both paths.
        self.flush();

        match &outcome {
            Ok(()) => info!("{venue} import finished: {imported} rows imported, {skipped} skipped"),
            Err(e) => warn!("{venue} import aborted: {e}"),
        }
        outcome
    }
}
