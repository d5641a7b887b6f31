//! Append-only CSV attendance log.

use chrono::Local;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::PathBuf;
use thiserror::Error;

const ATTENDANCE_HEADER: [&str; 3] = ["Name", "Date", "Time"];

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Duplicate-row handling for [`AttendanceLog::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Every call appends a row.
    EveryCall,
    /// At most one row per (name, date) pair.
    PerDay,
}

/// Append-only CSV log of (name, date, time) rows.
///
/// Each mark re-opens the file and appends; nothing is cached between
/// calls. The header row is written exactly once, when the file is
/// created.
pub struct AttendanceLog {
    path: PathBuf,
    dedup: DedupPolicy,
}

impl AttendanceLog {
    pub fn new(path: impl Into<PathBuf>, dedup: DedupPolicy) -> Self {
        Self { path: path.into(), dedup }
    }

    /// Append a row for `name` stamped with the current local date and
    /// time, creating the file (and parent directories) on first use.
    /// Returns `false` when the dedup policy suppressed the row.
    pub fn mark(&self, name: &str) -> Result<bool, AttendanceError> {
        let now = Local::now();
        let date = now.format("%Y-%m-%d").to_string();
        let time = now.format("%H:%M:%S").to_string();
        self.append(name, &date, &time)
    }

    fn append(&self, name: &str, date: &str, time: &str) -> Result<bool, AttendanceError> {
        if self.dedup == DedupPolicy::PerDay && self.contains(name, date)? {
            tracing::debug!(name, date, "attendance already recorded today");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| self.io_err(source))?;
        }

        let new_file = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_err(source))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if new_file {
            writer
                .write_record(ATTENDANCE_HEADER)
                .map_err(|source| self.csv_err(source))?;
        }
        writer
            .write_record([name, date, time])
            .map_err(|source| self.csv_err(source))?;
        writer.flush().map_err(|source| self.io_err(source))?;

        Ok(true)
    }

    /// Whether a (name, date) row already exists in the log.
    fn contains(&self, name: &str, date: &str) -> Result<bool, AttendanceError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let mut reader =
            csv::Reader::from_path(&self.path).map_err(|source| self.csv_err(source))?;
        for record in reader.records() {
            let record = record.map_err(|source| self.csv_err(source))?;
            if record.get(0) == Some(name) && record.get(1) == Some(date) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn io_err(&self, source: std::io::Error) -> AttendanceError {
        AttendanceError::Io { path: self.path.display().to_string(), source }
    }

    fn csv_err(&self, source: csv::Error) -> AttendanceError {
        AttendanceError::Csv { path: self.path.display().to_string(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn temp_log(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rollcall-attendance-{label}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("attendance.csv")
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_two_marks_two_rows_header_once() {
        let path = temp_log("double-mark");
        let log = AttendanceLog::new(&path, DedupPolicy::EveryCall);

        assert!(log.mark("alice").unwrap());
        assert!(log.mark("alice").unwrap());

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Name,Date,Time");
        assert_eq!(lines.iter().filter(|l| *l == "Name,Date,Time").count(), 1);
        assert!(lines[1].starts_with("alice,"));
        assert!(lines[2].starts_with("alice,"));
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let path = temp_log("timestamps");
        let log = AttendanceLog::new(&path, DedupPolicy::EveryCall);

        log.mark("alice").unwrap();
        log.mark("alice").unwrap();

        let lines = read_lines(&path);
        let stamp = |line: &str| {
            let fields: Vec<&str> = line.split(',').collect();
            (fields[1].to_string(), fields[2].to_string())
        };
        assert!(stamp(&lines[1]) <= stamp(&lines[2]));
    }

    #[test]
    fn test_row_format() {
        let path = temp_log("format");
        let log = AttendanceLog::new(&path, DedupPolicy::EveryCall);
        log.append("bob", "2026-08-05", "09:30:00").unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[1], "bob,2026-08-05,09:30:00");
    }

    #[test]
    fn test_per_day_suppresses_second_mark() {
        let path = temp_log("per-day");
        let log = AttendanceLog::new(&path, DedupPolicy::PerDay);

        assert!(log.append("alice", "2026-08-05", "09:00:00").unwrap());
        assert!(!log.append("alice", "2026-08-05", "09:00:05").unwrap());
        assert!(log.append("alice", "2026-08-06", "09:00:00").unwrap());

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_per_day_keeps_distinct_names() {
        let path = temp_log("per-day-names");
        let log = AttendanceLog::new(&path, DedupPolicy::PerDay);

        assert!(log.append("alice", "2026-08-05", "09:00:00").unwrap());
        assert!(log.append("bob", "2026-08-05", "09:00:01").unwrap());

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_creates_parent_directories() {
        let path = temp_log("nested");
        let nested = path.parent().unwrap().join("a/b/attendance.csv");
        let log = AttendanceLog::new(&nested, DedupPolicy::EveryCall);

        assert!(log.mark("alice").unwrap());
        assert!(nested.exists());
    }

    #[test]
    fn test_header_survives_existing_file() {
        let path = temp_log("existing");
        let log = AttendanceLog::new(&path, DedupPolicy::EveryCall);
        log.mark("alice").unwrap();

        // A fresh handle over the same file must not add a second header.
        let log = AttendanceLog::new(&path, DedupPolicy::EveryCall);
        log.mark("bob").unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.iter().filter(|l| *l == "Name,Date,Time").count(), 1);
        assert_eq!(lines.len(), 3);
    }
}
