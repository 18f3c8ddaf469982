//! Remote transcription API client
//!
//! Talks to an AssemblyAI-style service: upload the audio bytes,
//! create a transcript job, then poll the job until it reaches a
//! terminal state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Transcriber, Transcript, TranscriptionError};

/// Remote transcriber configuration
#[derive(Debug, Clone)]
pub struct RemoteTranscriberConfig {
    pub base_url: String,
    pub api_key: String,
    /// Delay between status checks.
    pub poll_interval: Duration,
    /// Maximum number of status checks before giving up. `None` keeps
    /// polling until the service reports a terminal state.
    pub max_polls: Option<u32>,
}

impl Default for RemoteTranscriberConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.assemblyai.com/v2".to_string(),
            api_key: String::new(),
            poll_interval: Duration::from_secs(5),
            max_polls: Some(120),
        }
    }
}

/// Upload response
#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

/// Transcript job creation request
#[derive(Debug, Serialize)]
struct CreateJobRequest {
    audio_url: String,
    language_model: String,
}

/// Transcript job creation response
#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    id: String,
}

/// Transcript job status response
#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: JobStatus,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    audio_duration: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

/// Remote transcription client
pub struct RemoteTranscriber {
    config: RemoteTranscriberConfig,
    client: Client,
}

impl RemoteTranscriber {
    pub fn new(config: RemoteTranscriberConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    async fn upload(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        let url = format!("{}/upload", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("authorization", &self.config.api_key)
            .header("content-type", "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| TranscriptionError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptionError::Upload(format!(
                "service returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Upload(format!("invalid response: {}", e)))?;

        Ok(body.upload_url)
    }

    async fn create_job(&self, audio_url: String) -> Result<String, TranscriptionError> {
        let url = format!("{}/transcript", self.config.base_url);

        let request = CreateJobRequest {
            audio_url,
            language_model: "default".to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("authorization", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptionError::Request(format!(
                "service returned {}",
                response.status()
            )));
        }

        let body: CreateJobResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Request(format!("invalid response: {}", e)))?;

        Ok(body.id)
    }

    async fn check_job(&self, job_id: &str) -> Result<JobStatusResponse, TranscriptionError> {
        let url = format!("{}/transcript/{}", self.config.base_url, job_id);

        let response = self
            .client
            .get(&url)
            .header("authorization", &self.config.api_key)
            .send()
            .await
            .map_err(|e| TranscriptionError::Status(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptionError::Status(format!(
                "service returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TranscriptionError::Status(format!("invalid response: {}", e)))
    }

    async fn poll_until_done(&self, job_id: &str) -> Result<JobStatusResponse, TranscriptionError> {
        let mut attempts: u32 = 0;

        loop {
            tokio::time::sleep(self.config.poll_interval).await;
            attempts += 1;

            let status = self.check_job(job_id).await?;
            match status.status {
                JobStatus::Queued | JobStatus::Processing => {
                    log::debug!(
                        "Transcript job {} still {:?} after {} checks",
                        job_id,
                        status.status,
                        attempts
                    );
                    if let Some(max) = self.config.max_polls {
                        if attempts >= max {
                            return Err(TranscriptionError::TimedOut { attempts });
                        }
                    }
                }
                JobStatus::Completed => return Ok(status),
                JobStatus::Error => {
                    return Err(TranscriptionError::Failed(
                        status
                            .error
                            .unwrap_or_else(|| "unknown transcription error".to_string()),
                    ));
                }
            }
        }
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcript, TranscriptionError> {
        let upload_url = self.upload(audio).await?;
        log::info!("Uploaded {} bytes of audio for transcription", audio.len());

        let job_id = self.create_job(upload_url).await?;
        log::info!(
            "Transcript job {} created, polling every {:?}",
            job_id,
            self.config.poll_interval
        );

        let done = self.poll_until_done(&job_id).await?;

        Ok(Transcript::from_remote(
            done.text.unwrap_or_default(),
            done.confidence,
            done.audio_duration,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_parses_service_payloads() {
        let done: JobStatusResponse = serde_json::from_str(
            r#"{"status":"completed","text":"hello world","confidence":0.9,"audio_duration":10}"#,
        )
        .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.text.as_deref(), Some("hello world"));

        let pending: JobStatusResponse = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(pending.status, JobStatus::Queued);
        assert_eq!(pending.text, None);

        let failed: JobStatusResponse =
            serde_json::from_str(r#"{"status":"error","error":"audio too noisy"}"#).unwrap();
        assert_eq!(failed.status, JobStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("audio too noisy"));
    }
}
