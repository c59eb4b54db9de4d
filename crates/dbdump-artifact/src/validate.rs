use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use dbdump_core::{Error, Result, TableDescriptor};

use crate::layout::ArtifactLayout;
use crate::manifest::Manifest;

/// Row count (as `COPY` counts rows) and checksum of a flat file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileStats {
    pub row_count: u64,
    pub sha256: String,
}

/// Check that a flat file exists and its header row is exactly the
/// descriptor's column list, then measure it.
pub fn validate_data_file(path: &Path, descriptor: &TableDescriptor) -> Result<DataFileStats> {
    if !path.is_file() {
        return Err(Error::MissingArtifact(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let header = reader.byte_headers()?.clone();

    if header.len() != descriptor.columns.len() {
        return Err(Error::SchemaMismatch(format!(
            "{} has {} columns but table `{}` declares {}",
            path.display(),
            header.len(),
            descriptor.name,
            descriptor.columns.len()
        )));
    }
    for (position, (found, expected)) in header.iter().zip(&descriptor.columns).enumerate() {
        if found != expected.as_bytes() {
            return Err(Error::SchemaMismatch(format!(
                "{} column {} is `{}` but table `{}` declares `{expected}`",
                path.display(),
                position + 1,
                String::from_utf8_lossy(found),
                descriptor.name
            )));
        }
    }

    for record in reader.byte_records() {
        record.map_err(|err| {
            if matches!(err.kind(), csv::ErrorKind::UnequalLengths { .. }) {
                Error::SchemaMismatch(format!("{}: {err}", path.display()))
            } else {
                Error::Csv(err)
            }
        })?;
    }

    measure(path)
}

/// Measure a flat file without checking it against a descriptor.
pub fn inspect_data_file(path: &Path) -> Result<DataFileStats> {
    if !path.is_file() {
        return Err(Error::MissingArtifact(path.to_path_buf()));
    }
    measure(path)
}

/// Validate every flat file an artifact declares against its descriptor and
/// the row count and checksum recorded at export time.
pub fn validate_artifact(layout: &ArtifactLayout, manifest: &Manifest) -> Result<()> {
    for table in &manifest.tables {
        let descriptor = &table.descriptor;
        if table.file.path != descriptor.data_file() {
            return Err(Error::SchemaMismatch(format!(
                "table `{}` points at `{}` instead of `{}`",
                descriptor.name,
                table.file.path,
                descriptor.data_file()
            )));
        }

        let stats = validate_data_file(&layout.data_file(descriptor), descriptor)?;
        if stats.row_count != table.file.row_count {
            return Err(Error::ArtifactIntegrity(format!(
                "{} holds {} rows but the manifest records {}",
                table.file.path, stats.row_count, table.file.row_count
            )));
        }
        if stats.sha256 != table.file.sha256 {
            return Err(Error::ArtifactIntegrity(format!(
                "{} checksum {} does not match the manifest ({})",
                table.file.path, stats.sha256, table.file.sha256
            )));
        }

        debug!(
            event = "data_file_validated",
            table = %descriptor.name,
            rows = stats.row_count
        );
    }
    Ok(())
}

/// Count data rows and hash the file in one pass.
///
/// Rows are counted the way `COPY ... FROM` reads CSV: every newline outside
/// a quoted field ends a record, so a blank line (a single NULL column) is a
/// row. The `csv` reader skips blank lines and cannot be used for this.
fn measure(path: &Path) -> Result<DataFileStats> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut counter = RecordCounter::default();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        counter.feed(&buffer[..read]);
    }
    Ok(DataFileStats {
        row_count: counter.rows(),
        sha256: hex::encode(hasher.finalize()),
    })
}

/// CSV record terminators seen outside quotes, header included.
#[derive(Debug, Default)]
struct RecordCounter {
    records: u64,
    in_quotes: bool,
    open_record: bool,
}

impl RecordCounter {
    fn feed(&mut self, bytes: &[u8]) {
        for byte in bytes {
            match *byte {
                b'"' => {
                    self.in_quotes = !self.in_quotes;
                    self.open_record = true;
                }
                b'\n' if !self.in_quotes => {
                    self.records += 1;
                    self.open_record = false;
                }
                _ => self.open_record = true,
            }
        }
    }

    /// Data rows, excluding the header record.
    fn rows(&self) -> u64 {
        let records = self.records + u64::from(self.open_record);
        records.saturating_sub(1)
    }
}
