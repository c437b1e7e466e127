//! Live train departure board for 64x32 RGB LED matrix panels.
//!
//! Shows the next departures from one station, with a ticking clock, on a
//! panel backend: the terminal (default) or a desktop window (`simulator`
//! feature).
//!
//! # Usage
//!
//! ```text
//! departure-board                                # board for the default station
//! departure-board --station EUS --verbose        # another station, debug logging
//! departure-board --config board.toml            # settings from a TOML file
//! departure-board marquee "Hello panel"          # scroll a test message
//! ```
//!
//! # Shutdown
//!
//! Ctrl-C or SIGTERM cancels a shared token. The board stops between frames,
//! clears the panel and exits.
//!
//! # Logging
//!
//! `RUST_LOG` filters as usual (default `info`, `--verbose` for `debug`). The
//! terminal backend draws over the whole terminal, so with it the log goes to
//! a file (`departure-board.log` unless `--log-file` says otherwise).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use departure_board::config::{BoardConfig, PanelBackend};
use departure_board::fetcher::{HuxleyClient, spawn_poller};
use departure_board::marquee::Marquee;
use departure_board::orchestrator::{Orchestrator, RetryPolicy};
use departure_board::panel::{Panel, TerminalPanel};
use departure_board::scheduler::{FrameScheduler, SchedulerSettings};

/// Log file used when the terminal backend is drawing.
const DEFAULT_LOG_FILE: &str = "departure-board.log";

#[derive(Parser, Debug)]
#[command(author, version, about = "Live train departure board for RGB LED matrix panels")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// TOML configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Station code, overriding the configuration file
    #[arg(long, global = true)]
    station: Option<String>,

    /// Panel backend, overriding the configuration file
    #[arg(long, value_enum, global = true)]
    panel: Option<PanelBackend>,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Show live departures (default)
    Run,
    /// Scroll a message across the panel until interrupted
    Marquee {
        /// Text to scroll
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&cli, &config)?;

    info!(
        "departure board starting: station {}, panel {}x{} ({:?}, {}% brightness)",
        config.source.station, config.panel.width, config.panel.height, config.panel.backend, config.panel.brightness
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let command = cli.command.clone().unwrap_or(Command::Run);
    match config.panel.backend {
        PanelBackend::Terminal => {
            let panel = TerminalPanel::new(config.panel_size(), config.panel.brightness)?;
            drive(panel, &command, &config, &cancel).await
        }
        #[cfg(feature = "simulator")]
        PanelBackend::Simulator => {
            let panel = departure_board::panel::SimulatorPanel::new(config.panel_size(), config.panel.brightness);
            drive(panel, &command, &config, &cancel).await
        }
        #[cfg(not(feature = "simulator"))]
        PanelBackend::Simulator => anyhow::bail!("this build has no simulator backend (enable the `simulator` feature)"),
    }
}

/// Defaults, then the config file, then command line overrides.
fn load_config(cli: &Cli) -> Result<BoardConfig> {
    let mut config = BoardConfig::load(cli.config.as_deref())?;
    if let Some(station) = &cli.station {
        config.source.station = station.to_uppercase();
    }
    if let Some(backend) = cli.panel {
        config.panel.backend = backend;
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(
    cli: &Cli,
    config: &BoardConfig,
) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| (config.panel.backend == PanelBackend::Terminal).then(|| PathBuf::from(DEFAULT_LOG_FILE)));
    if let Some(path) = log_file {
        builder.target(env_logger::Target::Pipe(Box::new(open_log_file(&path)?)));
    }
    builder.init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))
}

/// Run `command` on `panel` until shutdown.
async fn drive<P: Panel>(
    panel: P,
    command: &Command,
    config: &BoardConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let result = match command {
        Command::Run => run_board(panel, config, cancel).await,
        Command::Marquee { text } => Marquee::new(panel, text.as_str(), config)
            .run(cancel)
            .await
            .context("panel failed"),
    };
    match &result {
        Ok(()) => info!("shut down cleanly"),
        Err(err) => error!("{err:#}"),
    }
    result
}

async fn run_board<P: Panel>(
    panel: P,
    config: &BoardConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let source = HuxleyClient::new(config).context("cannot build HTTP client")?;
    info!("polling {}", source.url());

    let policy = RetryPolicy::from_config(config);
    let (poller, mailbox) = spawn_poller(
        source,
        config.fetch_timeout(),
        move |outcome| policy.next_poll_delay(outcome),
        cancel.clone(),
    );

    let scheduler = FrameScheduler::new(panel, SchedulerSettings::from_config(config));
    let mut board = Orchestrator::new(scheduler, mailbox, config);
    let result = board.run(cancel).await;

    // A panel failure ends the board without a signal; stop the poller too.
    cancel.cancel();
    if let Err(err) = poller.await {
        warn!("poller task ended abnormally: {err}");
    }
    result.context("panel failed")
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    match wait_for_signal().await {
        Ok(name) => info!("received {name}, shutting down"),
        Err(err) => {
            warn!("cannot listen for shutdown signals: {err}");
            return;
        }
    }
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "Ctrl-C"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}
