use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser};
use log::LevelFilter;
use notebook_core::{update, Msg, RunPhase, RunState, SourcePayload};
use notebook_logging::{nb_info, nb_warn, LogDestination};

use super::config::{load_config, AppConfig};
use super::effects::EffectRunner;
use super::ui::render::TimelinePrinter;

/// Upload a source to the document-processing backend and follow its progress stream.
#[derive(Debug, Parser)]
#[command(name = "notebook", version)]
pub struct Cli {
    /// RON config file; missing file means defaults.
    #[arg(long, env = "NOTEBOOK_CONFIG", default_value = "notebook.ron")]
    config: PathBuf,

    /// Processing endpoint, overrides the config file.
    #[arg(long, env = "NOTEBOOK_PROCESSING_ENDPOINT")]
    endpoint: Option<String>,

    #[command(flatten)]
    source: SourceArgs,

    /// Write logs to this file instead of the terminal.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print thinking sections instead of hiding them.
    #[arg(long)]
    show_thinking: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Document to upload.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Web page to process.
    #[arg(long)]
    url: Option<String>,

    /// Text to process.
    #[arg(long)]
    text: Option<String>,
}

pub fn run_app() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }
    if init_logging(&config, cli.verbose).is_none() {
        eprintln!("warning: logging disabled");
    }

    let source = read_source(&cli.source)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    let phase = runtime.block_on(drive(&config, source, cli.show_thinking))?;

    Ok(match phase {
        RunPhase::Completed => ExitCode::SUCCESS,
        RunPhase::Cancelled => ExitCode::from(130),
        _ => ExitCode::FAILURE,
    })
}

/// Installs the global logger and returns where it writes. An unusable log
/// file falls back to the terminal; `None` means no logger could be installed.
fn init_logging(config: &AppConfig, verbose: bool) -> Option<LogDestination> {
    let destination = match &config.log_file {
        Some(path) if verbose => LogDestination::Both(path.clone()),
        Some(path) => LogDestination::File(path.clone()),
        None => LogDestination::Terminal,
    };
    if notebook_logging::initialize(destination.clone(), log_level(&destination, verbose)) {
        return Some(destination);
    }
    if destination == LogDestination::Terminal {
        return None;
    }

    let fallback = LogDestination::Terminal;
    if !notebook_logging::initialize(fallback.clone(), log_level(&fallback, verbose)) {
        return None;
    }
    nb_warn!(
        "Log file {:?} unusable; logging to the terminal",
        config.log_file
    );
    Some(fallback)
}

// The terminal also carries the timeline, so keep it quiet unless asked.
fn log_level(destination: &LogDestination, verbose: bool) -> LevelFilter {
    match (destination, verbose) {
        (_, true) => LevelFilter::Debug,
        (LogDestination::Terminal, false) => LevelFilter::Warn,
        _ => LevelFilter::Info,
    }
}

fn read_source(args: &SourceArgs) -> anyhow::Result<SourcePayload> {
    if let Some(path) = &args.file {
        let bytes = fs::read(path).with_context(|| format!("failed to read {path:?}"))?;
        return Ok(SourcePayload::file(file_name(path), bytes)?);
    }
    if let Some(url) = &args.url {
        return Ok(SourcePayload::url(url)?);
    }
    if let Some(text) = &args.text {
        return Ok(SourcePayload::text(text)?);
    }
    anyhow::bail!("one of --file, --url or --text is required")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Runs one processing run to its end on the current thread.
async fn drive(
    config: &AppConfig,
    source: SourcePayload,
    show_thinking: bool,
) -> anyhow::Result<RunPhase> {
    let mut runner = EffectRunner::new(config.processing_settings());
    let started = chrono::Local::now().format("%H:%M:%S").to_string();
    let mut printer = TimelinePrinter::new(started, show_thinking);
    let mut stdout = std::io::stdout();
    let clock = Instant::now();
    let now_ms = || clock.elapsed().as_millis() as u64;

    let mut state = RunState::new();
    dispatch(
        &mut state,
        Msg::RunRequested { source },
        now_ms(),
        &mut runner,
        &mut printer,
        &mut stdout,
    )?;

    while state.phase() == RunPhase::Running {
        let msg = tokio::select! {
            msg = runner.next_msg(now_ms) => match msg {
                Some(msg) => msg,
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                nb_info!("Interrupt received; cancelling");
                Msg::CancelRequested { at_ms: now_ms() }
            }
        };
        dispatch(&mut state, msg, now_ms(), &mut runner, &mut printer, &mut stdout)?;
    }

    dispatch(
        &mut state,
        Msg::Tick,
        now_ms(),
        &mut runner,
        &mut printer,
        &mut stdout,
    )?;
    Ok(state.phase())
}

/// Applies `msg` and anything the effect runner feeds back. Failures reach the
/// user through the rendered footer only.
fn dispatch(
    state: &mut RunState,
    msg: Msg,
    now_ms: u64,
    runner: &mut EffectRunner,
    printer: &mut TimelinePrinter,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut pending = VecDeque::from([msg]);
    while let Some(msg) = pending.pop_front() {
        let (mut next, effects) = update(std::mem::take(state), msg);
        if next.consume_dirty() {
            for line in printer.render(&next.view()) {
                writeln!(out, "{line}")?;
            }
            out.flush()?;
        }
        *state = next;
        pending.extend(runner.enqueue(effects, now_ms));
    }
    Ok(())
}
