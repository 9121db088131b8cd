use crate::{
    config::Config,
    document::Document,
    highlight::load_pages,
    history::HistoryLedger,
    report::TaskReport,
    session::{AnalysisTask, SessionState},
    transport::{HttpTransport, Transport},
    workflow::Workbench,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "legalease")]
#[command(about = "Contract analysis client: summary, clause risks and cited Q&A")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./legalease.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override the analysis service base URL.
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the analysis service is reachable.
    Health {},
    Summarize {
        #[arg(long)]
        input: PathBuf,
        /// Also write the summary text to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Risks {
        #[arg(long)]
        input: PathBuf,
        /// Rendered text runs to highlight: JSON array of pages of strings.
        #[arg(long)]
        runs: Option<PathBuf>,
    },
    Ask {
        #[arg(long)]
        input: PathBuf,
        /// Repeat to ask several questions in order.
        #[arg(long = "question", required = true)]
        questions: Vec<String>,
        #[arg(long)]
        runs: Option<PathBuf>,
    },
    History {
        #[arg(long)]
        clear: bool,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let mut cfg = Config::load_or_default(cfg_path.as_deref())?;
    cfg.apply_env();
    if let Some(base) = &args.base_url {
        cfg.apply_base_url(base);
    }

    let _guard = init_logging(&args, &cfg)?;
    info!(
        "config={} service={}",
        cfg_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<defaults>".into()),
        cfg.service.base_url
    );

    match &args.cmd {
        Command::Health {} => health(&cfg),
        Command::Summarize { input, out } => summarize(&cfg, input, out.as_deref()),
        Command::Risks { input, runs } => risks(&cfg, input, runs.as_deref()),
        Command::Ask {
            input,
            questions,
            runs,
        } => ask(&cfg, input, questions, runs.as_deref()),
        Command::History { clear } => history(&cfg, *clear),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("legalease.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the JSON reports, so console logs go to stderr.
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if cfg.logging.write_to_file && !cfg.logging.file_path.is_empty() {
        let path = Path::new(&cfg.logging.file_path);
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all {}", parent.display()))?;
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn print_json<S: Serialize>(cfg: &Config, value: &S) -> Result<()> {
    let out = if cfg.output.pretty_json {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn open_workbench(cfg: &Config, input: &Path, history: HistoryLedger) -> Result<Workbench<HttpTransport>> {
    let transport = HttpTransport::new(cfg)?;
    let document = Document::load(cfg, input)?;
    info!(
        "document={} bytes={} sha256={}",
        document.name(),
        document.byte_size(),
        document.fingerprint()
    );
    let mut wb = Workbench::new(cfg, transport, history);
    wb.select_document(Some(document))?;
    Ok(wb)
}

fn finish(state: &SessionState, task: AnalysisTask) -> Result<()> {
    match state.error() {
        Some(err) => Err(anyhow!("{task} failed: {}", err.message)),
        None => Ok(()),
    }
}

fn health(cfg: &Config) -> Result<()> {
    let transport = HttpTransport::new(cfg)?;
    let status = transport
        .health()
        .with_context(|| format!("health check against {}", cfg.service.base_url))?;
    print_json(
        cfg,
        &serde_json::json!({
            "service": cfg.service.base_url,
            "health": status,
        }),
    )
}

fn summarize(cfg: &Config, input: &Path, out: Option<&Path>) -> Result<()> {
    let task = AnalysisTask::Summarize;
    let mut wb = open_workbench(cfg, input, HistoryLedger::new())?;
    wb.run(task, None)?;

    if let (Some(out), Some(summary)) = (
        out,
        wb.state(task).result().and_then(|r| r.as_summary()),
    ) {
        std::fs::write(out, &summary.text)
            .with_context(|| format!("writing summary: {}", out.display()))?;
        info!("summary written to {}", out.display());
    }

    print_json(cfg, &TaskReport::build(cfg, wb.session(), task, Vec::new(), None))?;
    finish(wb.state(task), task)
}

fn risks(cfg: &Config, input: &Path, runs: Option<&Path>) -> Result<()> {
    let task = AnalysisTask::RiskAnalysis;
    let pages = runs.map(load_pages).transpose()?.unwrap_or_default();
    let mut wb = open_workbench(cfg, input, HistoryLedger::new())?;
    wb.run(task, None)?;

    let highlights = wb.highlights(task, &pages);
    print_json(cfg, &TaskReport::build(cfg, wb.session(), task, highlights, None))?;
    finish(wb.state(task), task)
}

fn ask(cfg: &Config, input: &Path, questions: &[String], runs: Option<&Path>) -> Result<()> {
    let task = AnalysisTask::QuestionAnswering;
    let pages = runs.map(load_pages).transpose()?.unwrap_or_default();
    let mut wb = open_workbench(cfg, input, open_history(cfg)?)?;

    wb.ask_all(questions)?;

    let highlights = wb.highlights(task, &pages);
    print_json(
        cfg,
        &TaskReport::build(cfg, wb.session(), task, highlights, Some(wb.history())),
    )?;
    finish(wb.state(task), task)
}

fn history(cfg: &Config, clear: bool) -> Result<()> {
    let mut ledger = open_history(cfg)?;
    if clear {
        ledger.clear()?;
        info!("history cleared");
    }
    let entries: Vec<_> = ledger.entries().collect();
    print_json(cfg, &entries)
}

fn open_history(cfg: &Config) -> Result<HistoryLedger> {
    if cfg.history.persist_session && !cfg.history.session_file.is_empty() {
        HistoryLedger::open(Path::new(&cfg.history.session_file))
    } else {
        Ok(HistoryLedger::new())
    }
}
