// Local Table Store
//
// Keeps the whole loan table in memory and rewrites the file on
// every append. The file is CSV with a `first-name,last-name,
// barcode-number,date` header.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::{LoanStore, StoreError};
use crate::record::{LoanRecord, COLUMNS};

#[derive(Debug)]
pub struct LocalTableStore {
    path: PathBuf,
    rows: Vec<LoanRecord>,
}

impl LocalTableStore {
    /// Load the table at `path`.
    ///
    /// A missing file yields an empty table. Anything unreadable is
    /// reported as [`StoreError::Corrupt`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let rows = load_rows(&path)?;
        Ok(Self { path, rows })
    }

    /// Startup variant of [`open`](Self::open): on corruption, fall back
    /// to an empty table and hand the error back for display.
    pub fn open_or_recover(path: impl Into<PathBuf>) -> (Self, Option<StoreError>) {
        let path = path.into();
        match load_rows(&path) {
            Ok(rows) => (Self { path, rows }, None),
            Err(err) => {
                warn!(%err, "starting with an empty dataset");
                (
                    Self {
                        path,
                        rows: Vec::new(),
                    },
                    Some(err),
                )
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// In-memory rows, oldest first.
    pub fn rows(&self) -> &[LoanRecord] {
        &self.rows
    }

    fn rewrite(&self) -> Result<(), StoreError> {
        let write_err = |reason: String| StoreError::StoreWrite {
            path: self.path.display().to_string(),
            reason,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(COLUMNS)
            .map_err(|e| write_err(e.to_string()))?;
        for row in &self.rows {
            writer.serialize(row).map_err(|e| write_err(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| write_err(e.to_string()))?;

        // A half-written or unrenamed staging file is never left behind.
        let staging = staging_path(&self.path);
        fs::write(&staging, bytes)
            .and_then(|()| fs::rename(&staging, &self.path))
            .map_err(|e| {
                let _ = fs::remove_file(&staging);
                write_err(e.to_string())
            })
    }
}

impl LoanStore for LocalTableStore {
    /// The record stays in memory even if the rewrite fails, so the
    /// table can run ahead of the file until the next good write.
    fn append(&mut self, record: &LoanRecord) -> Result<(), StoreError> {
        self.rows.push(record.clone());

        match self.rewrite() {
            Ok(()) => {
                info!(path = %self.path.display(), rows = self.rows.len(), "table saved");
                Ok(())
            }
            Err(err) => {
                error!(%err, "table rewrite failed");
                Err(err)
            }
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

fn load_rows(path: &Path) -> Result<Vec<LoanRecord>, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.display().to_string(),
        reason,
    };

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "table not found, creating a new one");
            return Ok(Vec::new());
        }
        Err(e) => return Err(corrupt(e.to_string())),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .map_err(|e| corrupt(e.to_string()))?
        .clone();
    if !headers.iter().eq(COLUMNS) {
        return Err(corrupt(format!(
            "unexpected columns {:?}, expected {:?}",
            headers.iter().collect::<Vec<_>>(),
            COLUMNS
        )));
    }

    let rows = reader
        .deserialize::<LoanRecord>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| corrupt(e.to_string()))?;

    info!(path = %path.display(), rows = rows.len(), "loaded records");
    Ok(rows)
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate, RawEntry};
    use tempfile::tempdir;

    fn record(first: &str, barcode: &str) -> LoanRecord {
        validate(&RawEntry::new(first, "Doe", barcode, "09-01-2025")).unwrap()
    }

    #[test]
    fn absent_file_starts_empty() {
        let dir = tempdir().unwrap();
        let (store, err) = LocalTableStore::open_or_recover(dir.path().join("loaners.csv"));

        assert!(err.is_none());
        assert!(store.rows().is_empty());
    }

    #[test]
    fn append_writes_header_and_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loaners.csv");
        let mut store = LocalTableStore::open(&path).unwrap();

        store.append(&record("Jane", "1042")).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("first-name,last-name,barcode-number,date"));
        assert_eq!(lines.next(), Some("Jane,Doe,1042,09-01-2025"));
        assert_eq!(lines.next(), None);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn names_with_commas_survive_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loaners.csv");
        let mut store = LocalTableStore::open(&path).unwrap();

        store.append(&record("Mary, Jr.", "7")).unwrap();

        let reloaded = LocalTableStore::open(&path).unwrap();
        assert_eq!(reloaded.rows()[0].first_name(), "Mary, Jr.");
    }

    #[test]
    fn wrong_columns_are_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loaners.csv");
        fs::write(&path, "name,code\nJane,1\n").unwrap();

        let err = LocalTableStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn corrupt_file_recovers_to_empty_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loaners.csv");
        fs::write(&path, "first-name,last-name,barcode-number,date\nJane,Doe,abc,x\n").unwrap();

        let (store, err) = LocalTableStore::open_or_recover(&path);
        assert!(matches!(err, Some(StoreError::Corrupt { .. })));
        assert!(store.rows().is_empty());
    }

    #[test]
    fn failed_rewrite_removes_staging_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loaners.csv");
        fs::create_dir(&path).unwrap();
        let (mut store, _) = LocalTableStore::open_or_recover(&path);

        let err = store.append(&record("Jane", "1")).unwrap_err();

        assert!(matches!(err, StoreError::StoreWrite { .. }));
        assert!(!staging_path(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn failed_rewrite_keeps_row_in_memory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("loaners.csv");
        let mut store = LocalTableStore::open(&path).unwrap();

        let err = store.append(&record("Jane", "1")).unwrap_err();

        assert!(matches!(err, StoreError::StoreWrite { .. }));
        assert_eq!(store.rows().len(), 1);
        assert!(!path.exists());
    }
}
