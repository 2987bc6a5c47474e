use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use super::models::{MissingRow, ResumeKey};
use crate::errors::AppError;

/// Append-only CSV output that remembers which units it already holds.
///
/// On open, every existing row is read back as a `K`; those keys are
/// reported as completed so the driving loop can skip them without fetching.
/// Each call to `append` writes one unit's rows and flushes before returning.
pub struct CsvSink<K: ResumeKey> {
    file: AppendFile,
    completed: HashSet<K>,
}

impl<K: ResumeKey> CsvSink<K> {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        ensure_parent_dir(path)?;
        let completed = read_completed_keys(path)?;
        let file = AppendFile::open(path)?;

        if !completed.is_empty() {
            tracing::info!(
                "Resuming {}: {} completed unit(s) will be skipped",
                path.display(),
                completed.len()
            );
        }

        Ok(Self { file, completed })
    }

    pub fn is_completed(&self, key: &K) -> bool {
        self.completed.contains(key)
    }

    /// Write all rows of one completed unit and flush.
    ///
    /// Either every row of the unit reaches the file or none does. A unit
    /// with no rows is remembered for this run only; nothing on disk records
    /// it, so it is fetched again on the next run.
    pub fn append<T: Serialize>(&mut self, key: K, rows: &[T]) -> Result<(), AppError> {
        self.file.write_rows(rows)?;
        self.completed.insert(key);
        Ok(())
    }
}

/// Side log of skipped units (`Stage, Season, Round, Reason`).
pub struct MissingLog {
    file: AppendFile,
}

impl MissingLog {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        ensure_parent_dir(path)?;
        Ok(Self {
            file: AppendFile::open(path)?,
        })
    }

    pub fn record(
        &mut self,
        stage: &str,
        season: i32,
        round: Option<u32>,
        reason: &str,
    ) -> Result<(), AppError> {
        self.file.write_rows(&[MissingRow {
            stage: stage.to_string(),
            season,
            round,
            reason: reason.to_string(),
        }])
    }
}

/// A CSV file opened for appending. The header row is emitted with the first
/// rows written to a new or empty file.
struct AppendFile {
    file: File,
    header_pending: bool,
}

impl AppendFile {
    fn open(path: &Path) -> Result<Self, AppError> {
        let has_content = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            header_pending: !has_content,
        })
    }

    /// Serialize `rows` in memory, then append them with a single write.
    fn write_rows<T: Serialize>(&mut self, rows: &[T]) -> Result<(), AppError> {
        let mut buffer = csv::WriterBuilder::new()
            .has_headers(self.header_pending)
            .from_writer(Vec::new());
        for row in rows {
            buffer.serialize(row)?;
        }
        let bytes = buffer
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))?;
        if bytes.is_empty() {
            return Ok(());
        }

        self.file.write_all(&bytes)?;
        self.file.flush()?;
        self.header_pending = false;
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn read_completed_keys<K: ResumeKey>(path: &Path) -> Result<HashSet<K>, AppError> {
    let mut keys = HashSet::new();
    if !fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false) {
        return Ok(keys);
    }

    let mut reader = csv::Reader::from_path(path)?;
    for (i, record) in reader.deserialize::<K>().enumerate() {
        match record {
            Ok(key) => {
                keys.insert(key);
            }
            Err(e) => {
                // Line 1 is the header
                tracing::warn!(
                    "{}: ignoring unreadable row at line {}: {}",
                    path.display(),
                    i + 2,
                    e
                );
            }
        }
    }
    Ok(keys)
}
