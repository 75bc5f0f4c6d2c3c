//! JSON-file persistence — enrollment records and the attendance ledger.
//!
//! Both stores load the whole file at open and rewrite it atomically
//! (temp file + rename) on every mutation. The files are small and the
//! CLI is single-shot, so there is no in-process locking.

use chrono::{DateTime, Local, Utc};
use facemark_core::{Candidate, Fingerprint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store file {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One enrolled person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    pub name: String,
    pub fingerprint: Fingerprint,
    pub enrolled_at: DateTime<Utc>,
}

/// The enrollment roster, backed by one JSON array file.
#[derive(Debug)]
pub struct EnrollmentStore {
    path: PathBuf,
    records: Vec<Enrollment>,
}

impl EnrollmentStore {
    /// Open the store; a missing file is an empty roster.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records: Vec<Enrollment> = load_json(&path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), count = records.len(), "enrollments loaded");
        Ok(Self { path, records })
    }

    /// Add and persist a new enrollment, returning the stored record.
    pub fn add(&mut self, name: &str, fingerprint: Fingerprint) -> Result<Enrollment, StoreError> {
        let record = Enrollment {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            fingerprint,
            enrolled_at: Utc::now(),
        };
        self.records.push(record.clone());
        self.save()?;
        Ok(record)
    }

    /// Remove an enrollment by id. Returns false if the id was unknown.
    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        if self.records.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn records(&self) -> &[Enrollment] {
        &self.records
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.as_str())
    }

    /// Immutable snapshot of the roster for the match scan.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.records
            .iter()
            .map(|r| Candidate {
                identity: r.id.clone(),
                fingerprint: r.fingerprint.clone(),
            })
            .collect()
    }

    fn save(&self) -> Result<(), StoreError> {
        save_json(&self.path, &self.records)
    }
}

/// One attendance entry: who, and at what wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub id: String,
    pub time: String,
}

/// Per-day attendance ledger, backed by one JSON object file keyed by
/// `YYYY-MM-DD`.
pub struct AttendanceLog {
    path: PathBuf,
    days: BTreeMap<String, Vec<AttendanceEntry>>,
}

impl AttendanceLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let days = load_json(&path)?.unwrap_or_default();
        Ok(Self { path, days })
    }

    /// Record attendance for `id` at `now`, once per person per day.
    /// Returns false when today's entry already exists.
    pub fn mark(&mut self, id: &str, now: DateTime<Local>) -> Result<bool, StoreError> {
        let day = now.format("%Y-%m-%d").to_string();
        let entries = self.days.entry(day).or_default();
        if entries.iter().any(|e| e.id == id) {
            return Ok(false);
        }
        entries.push(AttendanceEntry {
            id: id.to_string(),
            time: now.format("%H:%M:%S").to_string(),
        });
        self.save()?;
        Ok(true)
    }

    pub fn days(&self) -> &BTreeMap<String, Vec<AttendanceEntry>> {
        &self.days
    }

    fn save(&self) -> Result<(), StoreError> {
        save_json(&self.path, &self.days)
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
