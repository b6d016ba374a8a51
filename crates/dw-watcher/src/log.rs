//! Append-only log of accepted change events.
//!
//! One file per day under the log directory:
//!
//! ```text
//! logs/file_watcher_logs_2024-03-09.txt
//!
//! 14:02:11, src/math.go, WRITE
//! 14:02:15, src/pkg/util.go, CREATE
//! ```
//!
//! Each line is flushed as it is written, so the file can be tailed.

use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Local, NaiveDate};

use crate::error::WatchError;
use crate::events::ChangeEvent;

/// Writer for the daily accepted-event log.
#[derive(Debug)]
pub struct EventLog {
    path: Utf8PathBuf,
    writer: LineWriter<File>,
}

impl EventLog {
    /// Opens (creating if needed) today's log file under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::EventLog`] if the directory or the file cannot
    /// be created.
    pub fn open_today(dir: &Utf8Path) -> Result<Self, WatchError> {
        Self::open(dir, Local::now().date_naive())
    }

    /// Opens the log file for `date` under `dir` in append mode.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::EventLog`] if the directory or the file cannot
    /// be created.
    pub fn open(dir: &Utf8Path, date: NaiveDate) -> Result<Self, WatchError> {
        fs::create_dir_all(dir).map_err(|e| WatchError::event_log(dir, e))?;

        let path = dir.join(Self::file_name(date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| WatchError::event_log(&path, e))?;

        tracing::debug!(path = %path, "Opened event log");

        Ok(Self {
            path,
            writer: LineWriter::new(file),
        })
    }

    /// Name of the log file for `date`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dw_watcher::EventLog;
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    /// assert_eq!(EventLog::file_name(date), "file_watcher_logs_2024-03-09.txt");
    /// ```
    #[must_use]
    pub fn file_name(date: NaiveDate) -> String {
        format!("file_watcher_logs_{}.txt", date.format("%Y-%m-%d"))
    }

    /// Formats one log line, without the trailing newline.
    #[must_use]
    pub fn format_line(event: &ChangeEvent) -> String {
        format!(
            "{}, {}, {}",
            event.observed_at.format("%H:%M:%S"),
            event.path,
            event.operation
        )
    }

    /// Appends one event.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::EventLog`] if the write fails.
    pub fn record(&mut self, event: &ChangeEvent) -> Result<(), WatchError> {
        writeln!(self.writer, "{}", Self::format_line(event))
            .map_err(|e| WatchError::event_log(&self.path, e))
    }

    /// Path of the open log file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Flushes and closes the log.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::EventLog`] if the final flush fails.
    pub fn close(mut self) -> Result<(), WatchError> {
        self.writer
            .flush()
            .map_err(|e| WatchError::event_log(&self.path, e))?;
        tracing::debug!(path = %self.path, "Closed event log");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Operation;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn event(path: &str, operation: Operation, h: u32, m: u32, s: u32) -> ChangeEvent {
        let at = Local
            .with_ymd_and_hms(2024, 3, 9, h, m, s)
            .single()
            .expect("valid local time");
        ChangeEvent::with_time(Utf8PathBuf::from(path), operation, at)
    }

    fn log_dir(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().join("logs")).expect("UTF-8 temp path")
    }

    #[test]
    fn test_format_line() {
        let line = EventLog::format_line(&event("src/math.go", Operation::Write, 9, 5, 7));
        assert_eq!(line, "09:05:07, src/math.go, WRITE");
    }

    #[test]
    fn test_lines_are_visible_before_close() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("date");
        let mut log = EventLog::open(&log_dir(&temp), date).expect("open");

        log.record(&event("a.go", Operation::Create, 10, 0, 0)).expect("record");
        log.record(&event("a.go", Operation::Write, 10, 0, 1)).expect("record");

        let contents = fs::read_to_string(log.path()).expect("read");
        assert_eq!(contents, "10:00:00, a.go, CREATE\n10:00:01, a.go, WRITE\n");
        assert!(log.path().as_str().ends_with("file_watcher_logs_2024-03-09.txt"));
        log.close().expect("close");
    }

    #[test]
    fn test_reopen_appends() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("date");

        for second in 0..2 {
            let mut log = EventLog::open(&log_dir(&temp), date).expect("open");
            log.record(&event("a.go", Operation::Write, 10, 0, second)).expect("record");
            log.close().expect("close");
        }

        let path = log_dir(&temp).join(EventLog::file_name(date));
        let contents = fs::read_to_string(path).expect("read");
        assert_eq!(contents.lines().count(), 2);
    }
}
