//! Client-side submission tracking
//!
//! A presentation state machine over the upload/transcription/analysis
//! /save stages, the fabricated progress timers that animate it, and
//! the mirror-store write that follows a successful response. Purely
//! observational: the server pipeline is authoritative for
//! transcription and analysis; this side owns only the save stage.

pub mod mirror;
pub mod submit;

pub use mirror::{MirrorDocument, MirrorError, MirrorStore, MirrorStoreConfig};
pub use submit::{submit_pitch, SubmitError, SubmitOptions};

use serde::{Deserialize, Serialize};

use crate::storage::PitchAnalysis;

/// Status of one tracked stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// Snapshot of the four tracked stages plus fabricated progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub upload: StageStatus,
    pub upload_progress: u8,
    pub transcription: StageStatus,
    pub analysis: StageStatus,
    pub analysis_progress: u8,
    pub save: StageStatus,
}

/// Upload progress is capped here until the response actually lands,
/// then snaps to 100.
const UPLOAD_PROGRESS_CAP: u8 = 95;

/// Tracks one in-flight submission. The upload percentage and the
/// analysis animation are fabricated for perceived latency, not
/// measured.
#[derive(Debug)]
pub struct StageTracker {
    upload: StageStatus,
    upload_progress: u8,
    transcription: StageStatus,
    analysis: StageStatus,
    analysis_progress: u8,
    save: StageStatus,
    file_name: Option<String>,
    result: Option<PitchAnalysis>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            upload: StageStatus::Pending,
            upload_progress: 0,
            transcription: StageStatus::Pending,
            analysis: StageStatus::Pending,
            analysis_progress: 0,
            save: StageStatus::Pending,
            file_name: None,
            result: None,
        }
    }

    /// A submission starts: the upload begins, and the whole server
    /// round trip is treated as the transcription stage.
    pub fn start(&mut self, file_name: String) {
        self.upload = StageStatus::Processing;
        self.upload_progress = 0;
        self.transcription = StageStatus::Processing;
        self.file_name = Some(file_name);
    }

    /// Advance the fabricated upload percentage. Monotonic, capped
    /// below 100 until the response arrives.
    pub fn tick_upload(&mut self, step: u8) {
        if self.upload == StageStatus::Processing {
            self.upload_progress = self
                .upload_progress
                .saturating_add(step)
                .min(UPLOAD_PROGRESS_CAP);
        }
    }

    /// The HTTP response arrived successfully: upload and
    /// transcription complete, the synthetic analysis animation
    /// begins.
    pub fn response_received(&mut self, record: PitchAnalysis) {
        self.upload_progress = 100;
        self.upload = StageStatus::Completed;
        self.transcription = StageStatus::Completed;
        self.analysis = StageStatus::Processing;
        self.analysis_progress = 0;
        self.result = Some(record);
    }

    /// Advance the synthetic analysis animation. Returns true once the
    /// stage completed.
    pub fn tick_analysis(&mut self, step: u8) -> bool {
        if self.analysis != StageStatus::Processing {
            return self.analysis == StageStatus::Completed;
        }
        self.analysis_progress = self.analysis_progress.saturating_add(step).min(100);
        if self.analysis_progress >= 100 {
            self.analysis = StageStatus::Completed;
            return true;
        }
        false
    }

    /// The mirror-store write started.
    pub fn save_started(&mut self) {
        self.save = StageStatus::Processing;
    }

    /// Outcome of the mirror-store write. Failure degrades only this
    /// stage; the completed analysis is untouched and the submission
    /// still counts as a success.
    pub fn save_finished(&mut self, ok: bool) {
        self.save = if ok {
            StageStatus::Completed
        } else {
            StageStatus::Error
        };
    }

    /// The server reported a failure: every downstream stage shows it.
    pub fn submission_failed(&mut self) {
        self.transcription = StageStatus::Error;
        self.analysis = StageStatus::Error;
        self.save = StageStatus::Error;
    }

    /// "Analyze another": all stages back to pending, held references
    /// dropped.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn result(&self) -> Option<&PitchAnalysis> {
        self.result.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            upload: self.upload,
            upload_progress: self.upload_progress,
            transcription: self.transcription,
            analysis: self.analysis,
            analysis_progress: self.analysis_progress,
            save: self.save,
        }
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
