//! Request log
//!
//! Appends one JSON line per answered request so that real traffic can be
//! replayed and analysed offline:
//! - JSON-lines format for append-only writes
//! - Size-based rotation of the current file
//! - Buffered writes flushed every `flush_interval` records

use namescreen_core::DetectionResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

const CURRENT_FILE: &str = "requests_current.jsonl";

/// Configuration for the request log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogConfig {
    /// Directory holding log files
    pub log_dir: PathBuf,

    /// Maximum file size before rotation (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Flush to disk after this many records
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,
}

impl RequestLogConfig {
    /// Config with defaults for the given directory
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            max_file_size: default_max_file_size(),
            flush_interval: default_flush_interval(),
        }
    }
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_flush_interval() -> usize {
    1
}

/// One logged request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Unix time in milliseconds
    pub timestamp_ms: u64,

    /// Comment as received
    pub comment: String,

    #[serde(flatten)]
    pub result: DetectionResult,

    /// Whether the result came from the cache
    #[serde(default)]
    pub cached: bool,

    /// Processing time in microseconds
    pub latency_us: u64,
}

impl RequestRecord {
    /// Create a record stamped with the current time
    pub fn new(comment: impl Into<String>, result: DetectionResult, cached: bool, latency_us: u64) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            timestamp_ms,
            comment: comment.into(),
            result,
            cached,
            latency_us,
        }
    }
}

/// Log file writer with rotation support
pub struct RequestLogWriter {
    config: RequestLogConfig,
    current_file: Option<BufWriter<File>>,
    current_size: u64,
    records_since_flush: usize,
}

impl RequestLogWriter {
    /// Create a writer, creating the directory if needed
    pub fn new(config: RequestLogConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.log_dir)?;

        let mut writer = Self {
            config,
            current_file: None,
            current_size: 0,
            records_since_flush: 0,
        };

        writer.open_current()?;
        Ok(writer)
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> PathBuf {
        self.config.log_dir.join(CURRENT_FILE)
    }

    /// Append one record
    pub fn write(&mut self, record: &RequestRecord) -> std::io::Result<()> {
        if self.current_size >= self.config.max_file_size {
            self.rotate()?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(ref mut file) = self.current_file {
            file.write_all(line.as_bytes())?;
            self.current_size += line.len() as u64;
            self.records_since_flush += 1;

            if self.records_since_flush >= self.config.flush_interval {
                file.flush()?;
                self.records_since_flush = 0;
            }
        }

        Ok(())
    }

    /// Force flush to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut file) = self.current_file {
            file.flush()?;
            self.records_since_flush = 0;
        }
        Ok(())
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        self.flush()?;
        self.current_file = None;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let rotated = self.config.log_dir.join(format!("requests_{}.jsonl", timestamp));

        match std::fs::rename(self.current_path(), &rotated) {
            Ok(()) => info!("Rotated request log to: {:?}", rotated),
            Err(e) => warn!("Failed to rotate request log: {}", e),
        }

        self.open_current()
    }

    fn open_current(&mut self) -> std::io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path())?;

        self.current_size = file.metadata()?.len();
        self.current_file = Some(BufWriter::new(file));
        self.records_since_flush = 0;
        Ok(())
    }
}

impl Drop for RequestLogWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush request log: {}", e);
        }
    }
}

/// Read every record of a log file, skipping lines that do not parse
pub fn read_records(path: impl AsRef<Path>) -> std::io::Result<Vec<RequestRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping unreadable request log line: {}", e),
        }
    }

    Ok(records)
}

/// Shareable handle; write failures are logged, never surfaced to requests
#[derive(Clone)]
pub struct RequestLog {
    writer: Arc<Mutex<RequestLogWriter>>,
}

impl RequestLog {
    /// Open the log described by `config`
    pub fn open(config: RequestLogConfig) -> std::io::Result<Self> {
        let writer = RequestLogWriter::new(config)?;
        info!(path = ?writer.current_path(), "Request log opened");
        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
        })
    }

    /// Append a record
    pub fn record(&self, record: &RequestRecord) {
        if let Err(e) = self.writer.lock().write(record) {
            warn!("Failed to write request log: {}", e);
        }
    }

    /// Flush buffered records
    pub fn flush(&self) {
        if let Err(e) = self.writer.lock().flush() {
            warn!("Failed to flush request log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namescreen_core::{NameParts, SanctionsVerdict, Tier};
    use tempfile::TempDir;

    fn sample(comment: &str) -> RequestRecord {
        let result = DetectionResult::from_parts(&NameParts::parse("Шевченко Тарас"), 0.8, Tier::FastNer)
            .with_sanctions(SanctionsVerdict::clear());
        RequestRecord::new(comment, result, false, 1200)
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let log = RequestLog::open(RequestLogConfig::new(dir.path())).unwrap();

        log.record(&sample("Переказ Шевченко Тарас"));
        log.record(&sample("Оплата - Шевченко Тарас"));
        log.flush();

        let records = read_records(dir.path().join(CURRENT_FILE)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].comment, "Переказ Шевченко Тарас");
        assert_eq!(records[1].result.detected_name.as_deref(), Some("Шевченко Тарас"));
    }

    #[test]
    fn test_rotation() {
        let dir = TempDir::new().unwrap();
        let config = RequestLogConfig {
            log_dir: dir.path().to_path_buf(),
            max_file_size: 64,
            flush_interval: 1,
        };

        let mut writer = RequestLogWriter::new(config).unwrap();
        for i in 0..3 {
            writer.write(&sample(&format!("Переказ {}", i))).unwrap();
        }
        writer.flush().unwrap();

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(files >= 2);
    }

    #[test]
    fn test_flattened_shape() {
        let json = serde_json::to_value(sample("Переказ")).unwrap();
        assert_eq!(json["has_name"], true);
        assert_eq!(json["tier_used"], "fast_ner");
        assert_eq!(json["sanctions_check"]["checked"], true);
        assert_eq!(json["cached"], false);
    }
}
