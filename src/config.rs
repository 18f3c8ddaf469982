//! Environment-driven configuration for the server binary.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    /// SQLite file path; `None` selects the in-memory store.
    pub database_path: Option<PathBuf>,
    pub speech_api_key: String,
    pub speech_base_url: String,
    pub poll_interval: Duration,
    /// `None` polls the transcription service without bound.
    pub max_polls: Option<u32>,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("PITCH_LOCAL_ADDR", "127.0.0.1:5000")
            .parse()
            .context("Invalid PITCH_LOCAL_ADDR")?;

        let poll_secs: u64 = env_or("PITCH_LOCAL_POLL_SECS", "5")
            .parse()
            .context("Invalid PITCH_LOCAL_POLL_SECS")?;

        let max_polls: u32 = env_or("PITCH_LOCAL_MAX_POLLS", "120")
            .parse()
            .context("Invalid PITCH_LOCAL_MAX_POLLS")?;

        Ok(Self {
            bind_addr,
            upload_dir: PathBuf::from(env_or("PITCH_LOCAL_UPLOAD_DIR", "uploads")),
            database_path: env::var("PITCH_LOCAL_DB").ok().map(PathBuf::from),
            speech_api_key: first_env(&["SPEECH_API_KEY", "ASSEMBLY_AI_API_KEY"])
                .unwrap_or_default(),
            speech_base_url: env_or("SPEECH_API_BASE_URL", "https://api.assemblyai.com/v2"),
            poll_interval: Duration::from_secs(poll_secs),
            max_polls: if max_polls == 0 { None } else { Some(max_polls) },
            llm_api_key: first_env(&["LLM_API_KEY", "OPENAI_API_KEY"]).unwrap_or_default(),
            llm_base_url: env_or("LLM_API_BASE_URL", "https://api.openai.com/v1"),
            llm_model: env_or("LLM_MODEL", "gpt-4o"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| env::var(key).ok())
        .filter(|value| !value.is_empty())
}
