//! Recognition engine — wires the fingerprinter, the stores, and the
//! match scan into the two operations the CLI exposes.

use crate::config::Config;
use crate::store::{AttendanceEntry, AttendanceLog, Enrollment, EnrollmentStore, StoreError};
use facemark_core::{
    matcher, Decision, ExtractError, Fingerprinter, PixelFingerprinter, ScoreWeights,
};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    /// Maps to "reject the input and ask for a recapture" at the surface.
    #[error("no usable face image: {0}")]
    Unreadable(#[from] ExtractError),
}

/// Outcome of a recognition attempt.
#[derive(Debug)]
pub enum RecognizeOutcome {
    Recognized {
        id: String,
        name: String,
        score: f32,
        /// False when attendance for today was already on record.
        new_attendance: bool,
    },
    NoMatch {
        /// Best (identity, score) seen, for operability; `None` when
        /// nothing could be compared (empty roster or all skipped).
        closest: Option<(String, f32)>,
        skipped: usize,
    },
}

pub struct Engine {
    fingerprinter: Box<dyn Fingerprinter>,
    weights: ScoreWeights,
    tolerance: f32,
    enrollments: EnrollmentStore,
    attendance: AttendanceLog,
}

impl Engine {
    /// Open both stores under the configured data directory.
    pub fn open(config: &Config) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.data_dir).map_err(StoreError::Io)?;
        Ok(Self {
            fingerprinter: Box::new(PixelFingerprinter::default()),
            weights: config.weights,
            tolerance: config.tolerance,
            enrollments: EnrollmentStore::open(&config.enrollments_path)?,
            attendance: AttendanceLog::open(&config.attendance_path)?,
        })
    }

    /// Fingerprint `bytes` and persist a new enrollment under `name`.
    pub fn enroll(&mut self, name: &str, bytes: &[u8]) -> Result<Enrollment, EngineError> {
        let fingerprint = self.fingerprinter.extract(bytes)?;
        let record = self.enrollments.add(name, fingerprint)?;
        tracing::info!(id = %record.id, name, "enrolled");
        Ok(record)
    }

    /// Fingerprint `bytes`, scan the roster, and on a match record
    /// today's attendance.
    pub fn recognize(&mut self, bytes: &[u8]) -> Result<RecognizeOutcome, EngineError> {
        let query = self.fingerprinter.extract(bytes)?;
        let candidates = self.enrollments.candidates();
        let selection = matcher::select_best(&query, &candidates, self.tolerance, &self.weights);

        match selection.decision {
            Decision::Match { identity, score } => {
                let name = self
                    .enrollments
                    .name_of(&identity)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("unknown ({identity})"));
                let new_attendance = self.attendance.mark(&identity, chrono::Local::now())?;
                tracing::info!(id = %identity, name = %name, score, new_attendance, "recognized");
                Ok(RecognizeOutcome::Recognized {
                    id: identity,
                    name,
                    score,
                    new_attendance,
                })
            }
            Decision::NoMatch => {
                tracing::info!(
                    closest = ?selection.closest,
                    skipped = selection.skipped,
                    "no match above tolerance"
                );
                Ok(RecognizeOutcome::NoMatch {
                    closest: selection.closest,
                    skipped: selection.skipped,
                })
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Result<bool, EngineError> {
        Ok(self.enrollments.remove(id)?)
    }

    pub fn enrollments(&self) -> &[Enrollment] {
        self.enrollments.records()
    }

    pub fn attendance_days(&self) -> &BTreeMap<String, Vec<AttendanceEntry>> {
        self.attendance.days()
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.enrollments.name_of(id)
    }
}
