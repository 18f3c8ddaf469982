// pitch-local command-line client
//
// Submits a recording to the analysis server, renders stage progress,
// and mirrors the completed record when a mirror store is configured.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use pitch_local::client::{
    submit_pitch, MirrorStore, MirrorStoreConfig, ProgressSnapshot, StageStatus, SubmitOptions,
};

#[derive(Parser, Debug)]
#[command(
    name = "pitch-local-cli",
    about = "Submit a pitch recording for analysis",
    version
)]
struct Cli {
    /// Path to an MP3 or WAV recording.
    audio: PathBuf,

    /// Analysis server base URL.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    server: String,

    /// Mirror store base URL; when set, the completed analysis is also
    /// written there (API key via MIRROR_API_KEY).
    #[arg(long)]
    mirror_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mirror = cli.mirror_url.map(|base_url| {
        MirrorStore::new(MirrorStoreConfig {
            base_url,
            api_key: std::env::var("MIRROR_API_KEY").ok(),
        })
    });

    let options = SubmitOptions {
        server_url: cli.server,
        mirror,
        on_progress: Some(Box::new(render_progress)),
    };

    let (record, progress) = submit_pitch(&cli.audio, options).await?;

    println!();
    println!("Overall score: {}/10", record.overall_score.unwrap_or(0));
    if let Some(summary) = &record.summary {
        println!("Summary: {}", summary);
    }
    if let Some(transcription) = &record.transcription {
        println!(
            "Transcript ({} words, {} wpm, {}% confidence):",
            record.word_count.unwrap_or(0),
            record.words_per_minute.unwrap_or(0),
            record.confidence.unwrap_or(0)
        );
        println!("  {}", transcription);
    }
    if let Some(strengths) = &record.strengths {
        println!("Strengths:");
        for item in strengths {
            println!("  + {}", item);
        }
    }
    if let Some(improvements) = &record.improvements {
        println!("Improvements:");
        for item in improvements {
            println!("  - {}", item);
        }
    }
    if progress.save == StageStatus::Error {
        eprintln!("warning: analysis completed but the mirror save failed");
    }

    Ok(())
}

fn render_progress(snapshot: ProgressSnapshot) {
    eprintln!(
        "upload {:>3}% [{}]  transcription [{}]  analysis {:>3}% [{}]  save [{}]",
        snapshot.upload_progress,
        label(snapshot.upload),
        label(snapshot.transcription),
        snapshot.analysis_progress,
        label(snapshot.analysis),
        label(snapshot.save),
    );
}

fn label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Pending => "pending",
        StageStatus::Processing => "processing",
        StageStatus::Completed => "completed",
        StageStatus::Error => "error",
    }
}
