//! Submission driver
//!
//! Drives one submission end to end: HTTP upload with a fabricated
//! progress timer, the synthetic analysis animation after the response
//! lands, then the mirror-store save. The mirror save runs as its own
//! task and reports back by result value; its failure degrades the
//! save stage only.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::storage::PitchAnalysis;

use super::mirror::MirrorStore;
use super::{ProgressSnapshot, StageTracker};

/// Cadence and step of the fabricated upload percentage.
pub const UPLOAD_TICK: Duration = Duration::from_millis(200);
pub const UPLOAD_STEP: u8 = 7;

/// Cadence and step of the synthetic analysis animation.
pub const ANALYSIS_TICK: Duration = Duration::from_millis(300);
pub const ANALYSIS_STEP: u8 = 12;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Failed to read audio file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to reach the analysis server: {0}")]
    Http(String),
    #[error("{0}")]
    Server(String),
}

type ProgressCallback = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

pub struct SubmitOptions {
    pub server_url: String,
    /// When set, the completed record is also written here.
    pub mirror: Option<MirrorStore>,
    /// Called with a fresh snapshot after every tracker transition.
    pub on_progress: Option<Box<dyn Fn(ProgressSnapshot) + Send + Sync>>,
}

/// Submit one audio file and track every stage. Returns the persisted
/// record and the final stage snapshot; a degraded mirror save still
/// returns `Ok`, with the save stage marked as the failure.
pub async fn submit_pitch(
    audio_path: &Path,
    options: SubmitOptions,
) -> Result<(PitchAnalysis, ProgressSnapshot), SubmitError> {
    let bytes = tokio::fs::read(audio_path).await?;
    let file_name = audio_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("recording.wav")
        .to_string();
    let mime = guess_mime(&file_name);

    let tracker = Arc::new(Mutex::new(StageTracker::new()));
    let notify: Option<ProgressCallback> = options.on_progress.map(Arc::from);

    tracker.lock().await.start(file_name.clone());
    emit(&tracker, &notify).await;

    // Fabricated upload percentage until the response lands; the timer
    // is cancelled no matter how the request ends.
    let cancel = CancellationToken::new();
    let timer = spawn_upload_timer(tracker.clone(), notify.clone(), cancel.clone());

    let result = post_audio(&options.server_url, &file_name, mime, bytes).await;

    cancel.cancel();
    let _ = timer.await;

    let record = match result {
        Ok(record) => record,
        Err(err) => {
            tracker.lock().await.submission_failed();
            emit(&tracker, &notify).await;
            return Err(err);
        }
    };

    tracker.lock().await.response_received(record.clone());
    emit(&tracker, &notify).await;

    // The server already finished analysis; this animation exists only
    // so the stage is visible.
    run_analysis_animation(&tracker, &notify).await;

    tracker.lock().await.save_started();
    emit(&tracker, &notify).await;

    let saved = match options.mirror.as_ref() {
        Some(mirror) => {
            let mirror = mirror.clone();
            let record_for_save = record.clone();
            let save_task: JoinHandle<Result<String, super::MirrorError>> =
                tokio::spawn(async move { mirror.save_analysis(&record_for_save).await });
            match save_task.await {
                Ok(Ok(document_id)) => {
                    log::info!("Mirrored analysis {} as document {}", record.id, document_id);
                    true
                }
                Ok(Err(e)) => {
                    log::warn!("Analysis completed but the mirror save failed: {}", e);
                    false
                }
                Err(e) => {
                    log::warn!("Mirror save task failed: {}", e);
                    false
                }
            }
        }
        // No mirror configured: nothing to save.
        None => true,
    };

    tracker.lock().await.save_finished(saved);
    emit(&tracker, &notify).await;

    let snapshot = tracker.lock().await.snapshot();
    Ok((record, snapshot))
}

async fn emit(tracker: &Arc<Mutex<StageTracker>>, notify: &Option<ProgressCallback>) {
    if let Some(callback) = notify {
        let snapshot = tracker.lock().await.snapshot();
        callback(snapshot);
    }
}

fn spawn_upload_timer(
    tracker: Arc<Mutex<StageTracker>>,
    notify: Option<ProgressCallback>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPLOAD_TICK);
        // The first tick fires immediately; skip it so the first
        // visible step lands after one full period.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let snapshot = {
                        let mut guard = tracker.lock().await;
                        guard.tick_upload(UPLOAD_STEP);
                        guard.snapshot()
                    };
                    if let Some(callback) = notify.as_ref() {
                        callback(snapshot);
                    }
                }
            }
        }
    })
}

async fn run_analysis_animation(
    tracker: &Arc<Mutex<StageTracker>>,
    notify: &Option<ProgressCallback>,
) {
    let mut interval = tokio::time::interval(ANALYSIS_TICK);
    interval.tick().await;
    loop {
        interval.tick().await;
        let (snapshot, done) = {
            let mut guard = tracker.lock().await;
            let done = guard.tick_analysis(ANALYSIS_STEP);
            (guard.snapshot(), done)
        };
        if let Some(callback) = notify.as_ref() {
            callback(snapshot);
        }
        if done {
            break;
        }
    }
}

async fn post_audio(
    server_url: &str,
    file_name: &str,
    mime: &str,
    bytes: Vec<u8>,
) -> Result<PitchAnalysis, SubmitError> {
    let part = multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .map_err(|e| SubmitError::Http(e.to_string()))?;
    let form = multipart::Form::new().part("audio", part);

    let client = reqwest::Client::new();
    let url = format!("{}/api/analyze-pitch", server_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| SubmitError::Http(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| format!("server returned {}", status));
        return Err(SubmitError::Server(message));
    }

    response
        .json::<PitchAnalysis>()
        .await
        .map_err(|e| SubmitError::Http(format!("invalid response: {}", e)))
}

fn guess_mime(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".mp3") {
        "audio/mpeg"
    } else {
        "audio/wav"
    }
}
