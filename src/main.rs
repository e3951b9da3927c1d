// Transcript Booster - Viewport-driven virtualization for long chat transcripts
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::Context as _;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use transcript_booster::capture::transcript_from_capture;
use transcript_booster::config::BoosterConfig;
use transcript_booster::context::Booster;
use transcript_booster::dom::{Document, PageFixture};
use transcript_booster::error::AppError;
use transcript_booster::export::{ExportError, Transcript, write_transcript};
use transcript_booster::panel::{self, PanelPosition};
use transcript_booster::runtime::{self, ScheduledEvent};
use transcript_booster::{Cli, Command};

#[allow(clippy::exit)]
fn main() {
    if let Err(err) = run() {
        if let Some(app_error) = extract_app_error(&err) {
            eprintln!("{}", app_error.user_message());
            std::process::exit(app_error.exit_code());
        }
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let local_set = tokio::task::LocalSet::new();

    rt.block_on(local_set.run_until(async move {
        match &cli.command {
            Command::Simulate { page, events } => simulate(&cli, page, events.as_deref()).await,
            Command::Export { page, capture, out } => {
                export(&cli, page, capture.as_deref(), out).await
            }
            Command::Panel { left: Some(left), top: Some(top) } => {
                let path = panel::save(PanelPosition { left: *left, top: *top }).await?;
                println!("Saved panel position to {}", path.display());
                Ok(())
            }
            Command::Panel { .. } => {
                match panel::load().await {
                    Some(PanelPosition { left, top }) => println!("left: {left}px, top: {top}px"),
                    None => println!("No saved panel position"),
                }
                Ok(())
            }
        }
    }))
}

fn extract_app_error(err: &anyhow::Error) -> Option<AppError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AppError>().cloned())
}

fn load_config(cli: &Cli) -> anyhow::Result<BoosterConfig> {
    BoosterConfig::load(cli.config.as_deref(), cli).map_err(|err| {
        tracing::error!("invalid configuration: {err}");
        anyhow::Error::new(AppError::InvalidConfig).context(err.to_string())
    })
}

async fn load_page(path: &Path) -> anyhow::Result<Document> {
    let content = tokio::fs::read_to_string(path).await.map_err(|err| {
        tracing::error!("failed to read page fixture {}: {err}", path.display());
        anyhow::Error::new(AppError::PageLoad).context(format!("{}: {err}", path.display()))
    })?;
    let fixture = PageFixture::from_json(&content).map_err(|err| {
        tracing::error!("invalid page fixture {}: {err}", path.display());
        anyhow::Error::new(AppError::PageLoad).context(format!("{}: {err}", path.display()))
    })?;
    Ok(fixture.build())
}

async fn simulate(cli: &Cli, page: &Path, events: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let mut doc = load_page(page).await?;
    let scheduled = match events {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read events {}", path.display()))?;
            ScheduledEvent::list_from_json(&content)
                .with_context(|| format!("invalid events file {}", path.display()))?
        }
        None => Vec::new(),
    };
    let linger = config.initial_delay() + config.scan_interval();

    let mut booster = Booster::new(config).map_err(|err| {
        anyhow::Error::new(AppError::InvalidConfig).context(err.to_string())
    })?;
    booster.install(&mut doc, panel::load().await);
    eprintln!("session {}", booster.session_id());

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::task::spawn_local(runtime::replay(scheduled, tx, linger));
    let summary = runtime::run(&mut booster, &mut doc, rx, |status| println!("{status}")).await;
    println!(
        "{} scans, {} events, {} sections collapsed; final: {}",
        summary.scans, summary.events, summary.collapsed, summary.status
    );
    Ok(())
}

async fn export(cli: &Cli, page: &Path, capture: Option<&Path>, out: &Path) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let mut doc = load_page(page).await?;

    let captured = match capture {
        Some(path) => captured_transcript(path).await,
        None => None,
    };
    let result = match captured {
        Some(transcript) => write_transcript(&transcript, out).await.map(|()| transcript),
        None => {
            let mut booster = Booster::new(config).map_err(|err| {
                anyhow::Error::new(AppError::InvalidConfig).context(err.to_string())
            })?;
            booster.scan(&doc);
            booster.export_to_file(&mut doc, out).await
        }
    };
    let transcript = result.map_err(|err| {
        tracing::error!("export failed: {err}");
        let app_error = match err {
            ExportError::NoBlocks | ExportError::EmptyTranscript => AppError::NoBlocksFound,
            ExportError::Write { .. } => AppError::ExportWrite,
        };
        anyhow::Error::new(app_error).context(err.to_string())
    })?;
    println!("Exported {} turns to {}", transcript.turns.len(), out.display());
    Ok(())
}

/// Transcript from a captured response body, when it holds any turns.
async fn captured_transcript(path: &Path) -> Option<Transcript> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!("ignoring unreadable capture {}: {err}", path.display());
            return None;
        }
    };
    let payload: serde_json::Value = match serde_json::from_str(&content) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!("ignoring unparseable capture {}: {err}", path.display());
            return None;
        }
    };
    let transcript = transcript_from_capture(&payload);
    if transcript.turns.is_empty() {
        tracing::info!("capture holds no turns; falling back to the page");
        return None;
    }
    Some(transcript)
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let Some(path) = cli.log_file.as_ref() else {
        if std::env::var_os("RUST_LOG").is_some() {
            eprintln!(
                "RUST_LOG is set, but tracing is disabled without --log-file <PATH>. \
Use --log-file to enable diagnostics."
            );
        }
        return Ok(());
    };

    let directives = cli
        .log_filter
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_owned());
    let filter = tracing_subscriber::EnvFilter::try_new(directives.as_str())
        .map_err(|e| anyhow::anyhow!("invalid tracing filter `{directives}`: {e}"))?;

    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if cli.log_append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let file = options
        .open(path)
        .map_err(|e| anyhow::anyhow!("failed to open log file {}: {e}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;

    tracing::info!(
        target: "diagnostics",
        version = env!("CARGO_PKG_VERSION"),
        log_file = %path.display(),
        log_filter = %directives,
        log_append = cli.log_append,
        "tracing enabled"
    );

    Ok(())
}
