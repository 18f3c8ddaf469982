//! Mirror store client
//!
//! A secondary, independently-owned document store the client writes
//! completed analyses into after the primary request succeeds.
//! Documents are keyed by a generated id and timestamped at write
//! time.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::PitchAnalysis;

/// Mirror store configuration
#[derive(Debug, Clone)]
pub struct MirrorStoreConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Mirror request failed: {0}")]
    Request(String),
    #[error("Mirror service returned {status}: {body}")]
    Service { status: u16, body: String },
}

/// A mirrored analysis plus write-time metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorDocument {
    pub id: String,
    pub analysis: PitchAnalysis,
    pub saved_at: DateTime<Utc>,
}

/// Document-style mirror store client
#[derive(Clone)]
pub struct MirrorStore {
    config: MirrorStoreConfig,
    client: Client,
}

impl MirrorStore {
    pub fn new(config: MirrorStoreConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/pitch-analyses",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Write one analysis as a new document and return its generated
    /// id.
    pub async fn save_analysis(&self, analysis: &PitchAnalysis) -> Result<String, MirrorError> {
        let document = MirrorDocument {
            id: Uuid::new_v4().to_string(),
            analysis: analysis.clone(),
            saved_at: Utc::now(),
        };

        let url = format!("{}/{}", self.collection_url(), document.id);
        let mut request = self.client.put(&url).json(&document);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MirrorError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MirrorError::Service { status, body });
        }

        Ok(document.id)
    }

    /// List previously mirrored documents.
    pub async fn list_analyses(&self) -> Result<Vec<MirrorDocument>, MirrorError> {
        let mut request = self.client.get(self.collection_url());
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MirrorError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MirrorError::Service { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| MirrorError::Request(format!("invalid response: {}", e)))
    }
}
