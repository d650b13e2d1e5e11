//! File-backed record store.
//!
//! The full record set lives in one pretty-printed JSON document. Every
//! mutation rewrites the whole document and then re-derives the CSV export,
//! all while holding a single writer lock so concurrent submissions are
//! applied one at a time.
//!
//! Entries are carried through updates as raw JSON values, so fields this
//! service does not know about, or entries it cannot read as a `Record`,
//! are never dropped from the document.

use crate::error::StoreError;
use crate::export;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use student_records_types::{Record, RecordSubmission};

pub struct RecordStore {
    json_path: PathBuf,
    csv_path: PathBuf,
    writer: Mutex<()>,
}

impl RecordStore {
    /// Opens a store backed by the given files, creating their parent
    /// directories if needed. Existing content is left untouched.
    pub fn open(json_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> io::Result<Self> {
        let json_path = json_path.into();
        let csv_path = csv_path.into();
        for path in [&json_path, &csv_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(Self {
            json_path,
            csv_path,
            writer: Mutex::new(()),
        })
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Reads the full record set for display. Never fails: a missing or
    /// unparseable document reads as empty, and any other read problem is
    /// logged and also reads as empty.
    pub fn load(&self) -> Vec<Record> {
        match self.load_document() {
            Ok(document) => to_records(&document),
            Err(e) => {
                log::warn!(
                    "Could not read record store {}: {}",
                    self.json_path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Reads the raw document entries. A missing file, or content that is not
    /// valid JSON, reads as empty (the latter with a warning). I/O errors and
    /// a valid JSON value that is not a list are returned, so an update never
    /// overwrites a document it could not read.
    pub fn load_document(&self) -> Result<Vec<Value>, StoreError> {
        let data = match fs::read(&self.json_path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(other) => Err(StoreError::UnexpectedDocument(format!(
                "found {}",
                json_kind(&other)
            ))),
            Err(e) => {
                log::warn!(
                    "Record store {} is not valid JSON, treating as empty: {}",
                    self.json_path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Number of entries in the document; 0 if it cannot be read.
    pub fn count(&self) -> usize {
        self.load_document().map(|d| d.len()).unwrap_or(0)
    }

    /// Validates and appends a submission, assigning its id (and timestamp
    /// when the client sent none), then regenerates the CSV export.
    pub fn append(&self, submission: RecordSubmission) -> Result<Record, StoreError> {
        submission.validate().map_err(StoreError::InvalidRecord)?;

        let _guard = self.writer.lock();
        let mut document = self.load_document()?;

        let now = Utc::now();
        let last_id = document
            .iter()
            .filter_map(|entry| entry.get("id").and_then(Value::as_i64))
            .max();
        let id = next_id(now.timestamp_millis(), last_id).ok_or(StoreError::IdSpaceExhausted)?;
        let timestamp = match submission.timestamp.as_deref().map(str::trim) {
            Some(ts) if !ts.is_empty() => ts.to_string(),
            _ => now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let record = submission.into_record(id, timestamp);
        document.push(serde_json::to_value(&record)?);

        self.save(&document)?;
        export::write(&to_records(&document), &self.csv_path)?;

        log::info!(
            "Stored record {} ({} subjects), {} total",
            record.id,
            record.marks.len(),
            document.len()
        );
        Ok(record)
    }

    /// Irreversibly replaces the record set with an empty one and removes the
    /// CSV export. Clearing an empty store succeeds.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.writer.lock();
        self.save(&[])?;
        export::remove_if_exists(&self.csv_path)?;
        log::info!("Cleared record store {}", self.json_path.display());
        Ok(())
    }

    /// Re-derives the CSV export from the current document and returns its
    /// bytes, or `None` when there are no records.
    pub fn refresh_tabular(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let _guard = self.writer.lock();
        let document = self.load_document()?;
        Ok(export::write(&to_records(&document), &self.csv_path)?)
    }

    fn save(&self, document: &[Value]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(document)?;
        write_atomic(&self.json_path, json.as_bytes())?;
        Ok(())
    }
}

/// Reads each entry leniently; entries that are not records at all (not an
/// object, or a mark that is not a small integer) are skipped.
fn to_records(document: &[Value]) -> Vec<Record> {
    document
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| match Record::deserialize(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping unreadable record store entry {}: {}", i, e);
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Millisecond-timestamp id that is strictly greater than every id already
/// in the store, even when the clock stalls or goes backwards. `None` once
/// the highest stored id is `i64::MAX`.
fn next_id(now_millis: i64, last_id: Option<i64>) -> Option<i64> {
    match last_id {
        Some(last) if last >= now_millis => last.checked_add(1),
        _ => Some(now_millis),
    }
}

/// Writes `bytes` to a sibling temp file, fsyncs it, then renames it over
/// `path` so readers never observe a partially written file. The temp file
/// is removed if any step fails.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    if let Err(e) = write_synced(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
