//! Per-run log file.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::LogSink;

/// Appends timestamped entries to a file.
///
/// Each line reads `INFO: <date> <time> <entry>`.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Create a fresh `feeder_<timestamp>.log` inside `directory`.
    pub fn for_run(directory: &Path) -> io::Result<Self> {
        fs::create_dir_all(directory)?;
        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S%.9f");
        Self::open(directory.join(format!("feeder_{}.log", stamp)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append(&self, entry: &str) -> io::Result<()> {
        let now = Local::now().format("%Y/%m/%d %H:%M:%S");
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "INFO: {} {}", now, entry)
    }

    fn flush(&self) -> io::Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_prefixed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::open(dir.path().join("run.log")).unwrap();

        sink.append("Added sku: KASL-3").unwrap();
        sink.append("Added sku: KASL-300").unwrap();
        sink.flush().unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("INFO: "));
        assert!(lines[0].ends_with(" Added sku: KASL-3"));
        assert!(lines[1].ends_with(" Added sku: KASL-300"));
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        for entry in ["first", "second"] {
            let sink = FileSink::open(&path).unwrap();
            sink.append(entry).unwrap();
            sink.flush().unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn for_run_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");

        let sink = FileSink::for_run(&logs).unwrap();

        assert!(sink.path().starts_with(&logs));
        assert!(sink.path().exists());
        let name = sink.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("feeder_") && name.ends_with(".log"));
    }
}
