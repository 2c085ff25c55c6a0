//! Assembly Engine (ppp-ae) - command-line entry point
//!
//! Assembles an episode from a stored template and a main recording, or
//! suggests metadata for a finished file. Files live under the root folder:
//!
//! - `uploads/`   asset store (static segments, music beds, recordings)
//! - `templates/` `<template_id>.json` templates
//! - output directory from `[engine] output_dir` (relative to the root)

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ppp_ae::config::ConfigFile;
use ppp_ae::services::{
    ElevenLabsSynthesizer, JsonDirTemplateStore, LocalAssetStore, OpenAiTextGenerator,
    WhisperTranscriber,
};
use ppp_ae::{AssemblyEngine, AssemblyRequest, CleanupOptions, Services};
use ppp_common::config::{default_config_path, load_toml_config_or_default, resolve_api_key, resolve_root_folder};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for ppp-ae
#[derive(Parser, Debug)]
#[command(name = "ppp-ae")]
#[command(about = "Podcast Pro Plus episode assembly engine")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(short, long, env = "PPP_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder (falls back to PPP_ROOT_FOLDER, then the config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble an episode
    Assemble(AssembleArgs),

    /// Suggest a title and summary for an audio file in uploads/
    Metadata {
        /// File name in the asset store
        filename: String,
    },
}

#[derive(Args, Debug)]
struct AssembleArgs {
    /// Template id
    #[arg(short, long)]
    template: Uuid,

    /// Main content recording (file name in uploads/)
    #[arg(short = 'i', long)]
    content: String,

    /// Output file name (`.wav` added when no extension is given)
    #[arg(short, long)]
    output: String,

    /// Keep long pauses
    #[arg(long)]
    keep_pauses: bool,

    /// Keep filler words
    #[arg(long)]
    keep_fillers: bool,

    /// Skip the flubber keyword check
    #[arg(long)]
    no_flubber_check: bool,

    /// Skip the intern keyword check
    #[arg(long)]
    no_intern_check: bool,

    /// Replace a TTS segment's script: SEGMENT_ID=TEXT (repeatable)
    #[arg(long = "tts-override", value_name = "SEGMENT_ID=TEXT")]
    tts_overrides: Vec<String>,
}

impl AssembleArgs {
    fn into_request(self) -> Result<AssemblyRequest> {
        let mut tts_overrides = HashMap::new();
        for entry in &self.tts_overrides {
            let Some((id, text)) = entry.split_once('=') else {
                bail!("Invalid --tts-override '{}': expected SEGMENT_ID=TEXT", entry);
            };
            tts_overrides.insert(id.trim().to_string(), text.to_string());
        }

        Ok(AssemblyRequest {
            template_id: self.template,
            main_content_filename: self.content,
            output_filename: self.output,
            cleanup_options: CleanupOptions {
                remove_pauses: !self.keep_pauses,
                remove_fillers: !self.keep_fillers,
                check_for_flubber: !self.no_flubber_check,
                check_for_intern: !self.no_intern_check,
            },
            tts_overrides,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(default_config_path);
    let config: ConfigFile = load_toml_config_or_default(config_path.as_deref());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ppp_ae={}", config.common.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), &config.common);
    info!("Root folder: {}", root_folder.display());

    let engine = build_engine(&config, &root_folder)?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    match cli.command {
        Command::Assemble(args) => {
            let request = args.into_request()?;
            let result = engine
                .assemble(&request, &cancel)
                .await
                .context("Assembly failed")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for line in &result.log {
                    println!("{}", line);
                }
                println!(
                    "Episode written to {} ({:.2}s)",
                    result.output_path.display(),
                    result.duration_s
                );
            }
        }
        Command::Metadata { filename } => {
            let metadata = engine
                .generate_metadata(&filename, &cancel)
                .await
                .context("Metadata generation failed")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else {
                println!("Title: {}", metadata.title);
                println!("Summary: {}", metadata.summary);
            }
        }
    }

    Ok(())
}

fn build_engine(config: &ConfigFile, root_folder: &std::path::Path) -> Result<AssemblyEngine> {
    let openai_key = resolve_api_key(
        "OpenAI API key",
        "OPENAI_API_KEY",
        config.common.openai_api_key.as_deref(),
    )?;
    let elevenlabs_key = resolve_api_key(
        "ElevenLabs API key",
        "ELEVENLABS_API_KEY",
        config.common.elevenlabs_api_key.as_deref(),
    )?;

    let mut engine_config = config.engine.clone();
    if engine_config.output_dir.is_relative() {
        engine_config.output_dir = root_folder.join(&engine_config.output_dir);
    }
    if let Some(dir) = engine_config.ai_cache_dir.as_mut() {
        if dir.is_relative() {
            *dir = root_folder.join(&*dir);
        }
    }

    let services = Services {
        templates: Arc::new(JsonDirTemplateStore::new(root_folder.join("templates"))),
        assets: Arc::new(LocalAssetStore::new(root_folder.join("uploads"))),
        generator: Arc::new(
            OpenAiTextGenerator::new(openai_key.clone(), engine_config.generation_timeout())
                .context("Failed to create text generator")?,
        ),
        synthesizer: Arc::new(
            ElevenLabsSynthesizer::new(elevenlabs_key, engine_config.synthesis_timeout())
                .context("Failed to create speech synthesizer")?,
        ),
        transcriber: Arc::new(
            WhisperTranscriber::new(openai_key, engine_config.transcription_timeout())
                .context("Failed to create transcriber")?,
        ),
    };

    AssemblyEngine::new(engine_config, services).context("Failed to initialize assembly engine")
}

/// Cancel the running request on Ctrl+C or SIGTERM
async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, cancelling"),
        _ = terminate => info!("Received terminate signal, cancelling"),
    }
    cancel.cancel();
}
