// pitch-local server binary

use std::sync::Arc;

use anyhow::{Context, Result};

use pitch_local::analysis::{ChatAnalyzer, ChatAnalyzerConfig};
use pitch_local::config::Config;
use pitch_local::pipeline::PitchPipeline;
use pitch_local::server::{build_router, AppState};
use pitch_local::storage::{MemStorage, SqliteStorage, Storage};
use pitch_local::transcription::{RemoteTranscriber, RemoteTranscriberConfig};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match &config.database_path {
        Some(path) => Arc::new(SqliteStorage::new(path.clone())?),
        None => {
            log::info!("No database path configured, using the in-memory store");
            Arc::new(MemStorage::new())
        }
    };

    let transcriber = Arc::new(RemoteTranscriber::new(RemoteTranscriberConfig {
        base_url: config.speech_base_url.clone(),
        api_key: config.speech_api_key.clone(),
        poll_interval: config.poll_interval,
        max_polls: config.max_polls,
    }));

    let analyzer = Arc::new(ChatAnalyzer::new(ChatAnalyzerConfig {
        base_url: config.llm_base_url.clone(),
        api_key: config.llm_api_key.clone(),
        model: config.llm_model.clone(),
    }));

    let pipeline = Arc::new(PitchPipeline::new(
        transcriber,
        analyzer,
        storage.clone(),
        config.upload_dir.clone(),
    ));

    let app = build_router(AppState { pipeline, storage });

    log::info!("Listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
