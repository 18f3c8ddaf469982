//! Server-side pipeline
//!
//! Drives one uploaded audio file through intake validation,
//! transcription, analysis and persistence. The temporary on-disk copy
//! of the upload is owned by the request and removed on every exit
//! path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::analysis::{AnalysisError, PitchAnalyzer};
use crate::storage::{NewPitchAnalysis, PitchAnalysis, Storage};
use crate::transcription::{Transcriber, TranscriptionError};

/// Media types accepted for upload: MP3 and WAV.
pub const ACCEPTED_AUDIO_TYPES: [&str; 3] = ["audio/mpeg", "audio/mp3", "audio/wav"];

/// Upload size ceiling in bytes (25 MB).
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// One uploaded audio file as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Failed to store uploaded audio: {0}")]
    Intake(#[from] std::io::Error),
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("Failed to save analysis: {0}")]
    Persistence(String),
}

/// Pipeline position for one request. A request moves through these
/// states in order, with any failure aborting the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Transcribing,
    Analyzing,
    Persisting,
    Done,
}

/// Owns the on-disk copy of an upload for the duration of one request.
/// Dropping the guard removes the file, so every exit path cleans up
/// exactly once; removal failures are logged, never escalated.
struct TempAudio {
    path: PathBuf,
}

impl TempAudio {
    async fn write(dir: &Path, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(Uuid::new_v4().to_string());
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!(
                "Failed to remove temporary audio file {:?}: {}",
                self.path,
                e
            );
        }
    }
}

/// Sequences intake, transcription, analysis and persistence for one
/// submitted audio file per request. Concurrent requests share only
/// the injected store.
pub struct PitchPipeline {
    transcriber: Arc<dyn Transcriber>,
    analyzer: Arc<dyn PitchAnalyzer>,
    storage: Arc<dyn Storage>,
    upload_dir: PathBuf,
}

impl PitchPipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        analyzer: Arc<dyn PitchAnalyzer>,
        storage: Arc<dyn Storage>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            transcriber,
            analyzer,
            storage,
            upload_dir,
        }
    }

    /// Run the full pipeline for one upload and return the persisted
    /// record. No partial record is persisted on failure.
    pub async fn run(&self, upload: AudioUpload) -> Result<PitchAnalysis, PipelineError> {
        self.validate(&upload)?;
        enter(Stage::Received, &upload.file_name);

        let temp = TempAudio::write(&self.upload_dir, &upload.bytes).await?;

        enter(Stage::Transcribing, &upload.file_name);
        let audio = tokio::fs::read(temp.path()).await?;
        let transcript = self.transcriber.transcribe(&audio).await?;

        enter(Stage::Analyzing, &upload.file_name);
        let verdict = self.analyzer.analyze(&transcript.text).await?;

        enter(Stage::Persisting, &upload.file_name);
        let words_per_minute = words_per_minute(transcript.word_count, transcript.duration);
        let record = self
            .storage
            .create_pitch_analysis(NewPitchAnalysis {
                user_id: None,
                file_name: upload.file_name.clone(),
                file_size: upload.bytes.len() as i64,
                duration: Some(transcript.duration),
                transcription: Some(transcript.text),
                word_count: Some(transcript.word_count),
                confidence: Some(transcript.confidence),
                words_per_minute: Some(words_per_minute),
                overall_score: Some(verdict.score),
                summary: Some(verdict.summary),
                strengths: Some(verdict.strengths),
                improvements: Some(verdict.improvements),
            })
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        enter(Stage::Done, &upload.file_name);
        Ok(record)
    }

    /// Intake checks, performed before the temp file is written and
    /// before any external call.
    fn validate(&self, upload: &AudioUpload) -> Result<(), PipelineError> {
        if upload.bytes.is_empty() {
            return Err(PipelineError::InvalidInput(
                "No audio file provided".to_string(),
            ));
        }
        if !ACCEPTED_AUDIO_TYPES.contains(&upload.content_type.as_str()) {
            return Err(PipelineError::InvalidInput(
                "Invalid file type. Only MP3 and WAV files are allowed.".to_string(),
            ));
        }
        if upload.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(PipelineError::InvalidInput(
                "Audio file exceeds the 25MB limit".to_string(),
            ));
        }
        Ok(())
    }
}

fn enter(stage: Stage, file_name: &str) {
    log::info!("'{}': {:?} stage", file_name, stage);
}

/// Words per minute, zero when the service reported no duration.
pub fn words_per_minute(word_count: i64, duration: i64) -> i64 {
    if duration > 0 {
        ((word_count * 60) as f64 / duration as f64).round() as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::analysis::Verdict;
    use crate::storage::MemStorage;
    use crate::transcription::Transcript;

    struct FakeTranscriber {
        calls: AtomicUsize,
        fail: bool,
        transcript: Transcript,
    }

    impl FakeTranscriber {
        fn succeeding(transcript: Transcript) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                transcript,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
                transcript: Transcript::from_remote(String::new(), None, None),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<Transcript, TranscriptionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TranscriptionError::Failed("audio too noisy".to_string()))
            } else {
                Ok(self.transcript.clone())
            }
        }
    }

    struct FakeAnalyzer {
        calls: AtomicUsize,
        verdict: Verdict,
    }

    impl FakeAnalyzer {
        fn returning(verdict: Verdict) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                verdict,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PitchAnalyzer for FakeAnalyzer {
        async fn analyze(&self, _transcript: &str) -> Result<Verdict, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.verdict.clone())
        }
    }

    fn sample_verdict() -> Verdict {
        Verdict {
            score: 7,
            summary: "Decent opener".to_string(),
            strengths: vec!["clear tone".to_string(), "good pace".to_string()],
            improvements: vec![
                "add a call to action".to_string(),
                "shorten intro".to_string(),
            ],
        }
    }

    fn wav_upload(bytes: Vec<u8>) -> AudioUpload {
        AudioUpload {
            file_name: "pitch.wav".to_string(),
            content_type: "audio/wav".to_string(),
            bytes,
        }
    }

    fn upload_dir_is_empty(dir: &Path) -> bool {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.count() == 0,
            // Never created: nothing was left behind either.
            Err(_) => true,
        }
    }

    #[tokio::test]
    async fn test_successful_run_persists_expected_record() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = Arc::new(FakeTranscriber::succeeding(Transcript::from_remote(
            "hello world hello world".to_string(),
            Some(0.90),
            Some(10.0),
        )));
        let analyzer = Arc::new(FakeAnalyzer::returning(sample_verdict()));
        let storage = Arc::new(MemStorage::new());
        let pipeline = PitchPipeline::new(
            transcriber.clone(),
            analyzer.clone(),
            storage.clone(),
            dir.path().to_path_buf(),
        );

        let record = pipeline.run(wav_upload(vec![1, 2, 3, 4])).await.unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(record.file_name, "pitch.wav");
        assert_eq!(record.file_size, 4);
        assert_eq!(record.word_count, Some(4));
        assert_eq!(record.confidence, Some(90));
        assert_eq!(record.duration, Some(10));
        assert_eq!(record.words_per_minute, Some(24));
        assert_eq!(record.overall_score, Some(7));
        assert_eq!(record.summary.as_deref(), Some("Decent opener"));
        assert_eq!(
            record.strengths,
            Some(vec!["clear tone".to_string(), "good pace".to_string()])
        );
        assert_eq!(
            record.improvements,
            Some(vec![
                "add a call to action".to_string(),
                "shorten intro".to_string()
            ])
        );

        assert_eq!(transcriber.call_count(), 1);
        assert_eq!(analyzer.call_count(), 1);
        assert!(upload_dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_transcription_failure_persists_nothing_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = Arc::new(FakeTranscriber::failing());
        let analyzer = Arc::new(FakeAnalyzer::returning(sample_verdict()));
        let storage = Arc::new(MemStorage::new());
        let pipeline = PitchPipeline::new(
            transcriber.clone(),
            analyzer.clone(),
            storage.clone(),
            dir.path().to_path_buf(),
        );

        let err = pipeline.run(wav_upload(vec![9; 16])).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transcription(_)));
        assert!(err.to_string().contains("audio too noisy"));

        assert_eq!(analyzer.call_count(), 0);
        assert!(storage.list_pitch_analyses(None).await.unwrap().is_empty());
        assert!(upload_dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_wrong_media_type_is_rejected_before_any_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = Arc::new(FakeTranscriber::failing());
        let analyzer = Arc::new(FakeAnalyzer::returning(sample_verdict()));
        let pipeline = PitchPipeline::new(
            transcriber.clone(),
            analyzer.clone(),
            Arc::new(MemStorage::new()),
            dir.path().to_path_buf(),
        );

        let upload = AudioUpload {
            file_name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: vec![1, 2, 3],
        };
        let err = pipeline.run(upload).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        assert_eq!(transcriber.call_count(), 0);
        assert_eq!(analyzer.call_count(), 0);
        assert!(upload_dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected_before_any_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = Arc::new(FakeTranscriber::failing());
        let analyzer = Arc::new(FakeAnalyzer::returning(sample_verdict()));
        let pipeline = PitchPipeline::new(
            transcriber.clone(),
            analyzer.clone(),
            Arc::new(MemStorage::new()),
            dir.path().to_path_buf(),
        );

        let err = pipeline
            .run(wav_upload(vec![0; MAX_UPLOAD_BYTES + 1]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(transcriber.call_count(), 0);
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = PitchPipeline::new(
            Arc::new(FakeTranscriber::failing()),
            Arc::new(FakeAnalyzer::returning(sample_verdict())),
            Arc::new(MemStorage::new()),
            dir.path().to_path_buf(),
        );

        let err = pipeline.run(wav_upload(Vec::new())).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_words_per_minute() {
        assert_eq!(words_per_minute(150, 60), 150);
        assert_eq!(words_per_minute(4, 10), 24);
        assert_eq!(words_per_minute(1000, 0), 0);
        assert_eq!(words_per_minute(0, 30), 0);
        assert_eq!(words_per_minute(7, 90), 5);
    }
}
