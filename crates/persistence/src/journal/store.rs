//! JSONL audit journal - append-only writer
//!
//! Files are organised by day: `data/journal/2026-10-19.jsonl`

use crate::error::PersistenceResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// One journal line. `payload` is the serialized audit entry, sealed by
/// whatever cipher the audit log runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub entry_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub payload: String,
}

/// Day-partitioned JSONL writer.
pub struct AuditJournal {
    base_path: PathBuf,
    current_writer: Mutex<Option<DayWriter>>,
}

struct DayWriter {
    date: String,
    writer: BufWriter<File>,
}

impl AuditJournal {
    /// Open a journal rooted at `base_path`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(base_path: P) -> PersistenceResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            current_writer: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_path(&self, date: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", date))
    }

    fn date_of(at: DateTime<Utc>) -> String {
        at.format("%Y-%m-%d").to_string()
    }

    // A panic while holding the lock leaves at worst a partial line behind
    fn writer(&self) -> MutexGuard<'_, Option<DayWriter>> {
        self.current_writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append one line to the file for the line's day
    pub fn append(&self, line: &JournalLine) -> PersistenceResult<()> {
        let date = Self::date_of(line.recorded_at);
        let json = serde_json::to_string(line)?;

        let mut guard = self.writer();

        let needs_new_file = guard.as_ref().map_or(true, |w| w.date != date);
        if needs_new_file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.file_path(&date))?;
            *guard = Some(DayWriter {
                date,
                writer: BufWriter::new(file),
            });
        }

        if let Some(ref mut w) = *guard {
            writeln!(w.writer, "{}", json)?;
            w.writer.flush()?;
        }

        Ok(())
    }

    /// All journal files, oldest day first
    pub fn list_files(&self) -> PersistenceResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "jsonl") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Lines written on `date` (`YYYY-MM-DD`). Unparseable lines are skipped.
    pub fn read_day(&self, date: &str) -> PersistenceResult<Vec<JournalLine>> {
        let path = self.file_path(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalLine>(&line) {
                Ok(parsed) => lines.push(parsed),
                Err(err) => tracing::warn!(error = %err, "skipping malformed journal line"),
            }
        }
        Ok(lines)
    }

    pub fn flush(&self) -> PersistenceResult<()> {
        if let Some(ref mut w) = *self.writer() {
            w.writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for AuditJournal {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn line(entry_id: i64, recorded_at: DateTime<Utc>) -> JournalLine {
        JournalLine {
            entry_id,
            recorded_at,
            payload: format!("{{\"id\":{}}}", entry_id),
        }
    }

    #[test]
    fn test_journal_append_and_read() {
        let dir = tempdir().unwrap();
        let journal = AuditJournal::new(dir.path()).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();

        journal.append(&line(1, at)).unwrap();
        journal.append(&line(2, at)).unwrap();
        journal.flush().unwrap();

        let files = journal.list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("2026-10-19.jsonl"));

        let lines = journal.read_day("2026-10-19").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].entry_id, 2);
    }

    #[test]
    fn test_journal_rolls_over_by_day() {
        let dir = tempdir().unwrap();
        let journal = AuditJournal::new(dir.path()).unwrap();

        let day_one = Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 0).unwrap();
        let day_two = Utc.with_ymd_and_hms(2026, 10, 20, 0, 1, 0).unwrap();
        journal.append(&line(1, day_one)).unwrap();
        journal.append(&line(2, day_two)).unwrap();

        assert_eq!(journal.list_files().unwrap().len(), 2);
        assert_eq!(journal.read_day("2026-10-20").unwrap()[0].entry_id, 2);
        assert!(journal.read_day("2026-01-01").unwrap().is_empty());
    }

    #[test]
    fn test_journal_reopens_existing_file() {
        let dir = tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();

        {
            let journal = AuditJournal::new(dir.path()).unwrap();
            journal.append(&line(1, at)).unwrap();
        }
        {
            let journal = AuditJournal::new(dir.path()).unwrap();
            journal.append(&line(2, at)).unwrap();
            assert_eq!(journal.read_day("2026-10-19").unwrap().len(), 2);
        }
    }
}
