//! CLI entry point for the dispatcher.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use dispatch::core::classify::TokenClassifier;
use dispatch::core::types::Verdict;
use dispatch::exit_codes;
use dispatch::io::config::{DispatchConfig, load_config};
use dispatch::io::guardrail::load_guardrails;
use dispatch::io::invoker::AgentWorker;
use dispatch::io::paths::DispatchPaths;
use dispatch::io::pool_state::load_pool_state;
use dispatch::io::render::TemplateRenderer;
use dispatch::io::state::load_state;
use dispatch::io::verify::FileFingerprint;
use dispatch::pool::run_pool;
use dispatch::sequential::{ItemTerminal, run_sequential};

#[derive(Parser)]
#[command(
    name = "dispatch",
    version,
    about = "Resumable work-queue dispatcher for coding-agent review runs"
)]
struct Cli {
    /// Project root containing the `.dispatch/` directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process the worklist sequentially with retry and dead-lettering.
    Run,
    /// Process every not-yet-completed item once through a bounded pool.
    Sweep {
        /// Override the configured concurrency limit.
        #[arg(short = 'j', long)]
        workers: Option<usize>,
    },
    /// Print persisted dispatch progress.
    Status,
}

fn main() -> ExitCode {
    dispatch::logging::init();
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(exit_codes::INVALID as u8)
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = load_config(&DispatchPaths::new(&cli.root).config_path)?;
    let paths = DispatchPaths::with_state_dir(&cli.root, &cfg.state_dir);
    match cli.command {
        Command::Run => cmd_run(&paths, &cfg),
        Command::Sweep { workers } => cmd_sweep(&paths, cfg, workers),
        Command::Status => cmd_status(&paths),
    }
}

fn collaborators(
    paths: &DispatchPaths,
    cfg: &DispatchConfig,
) -> Result<(AgentWorker, TemplateRenderer)> {
    let worker = AgentWorker::new(cfg.agent.command.clone())?;
    let guardrails = load_guardrails(&paths.guardrail_path)?;
    Ok((worker, TemplateRenderer::new(&guardrails)))
}

fn cmd_run(paths: &DispatchPaths, cfg: &DispatchConfig) -> Result<i32> {
    let (worker, renderer) = collaborators(paths, cfg)?;
    let detector = FileFingerprint::new(&paths.root);

    let outcome = run_sequential(
        &paths.root,
        &worker,
        &TokenClassifier,
        &renderer,
        &detector,
        cfg,
        |item| match &item.terminal {
            ItemTerminal::Approved { attempts } => {
                println!("approved   {} (attempt {attempts})", item.item.id);
            }
            ItemTerminal::DeadLettered { attempts, reason } => {
                println!(
                    "dead-letter {} after {attempts} attempts: {reason}",
                    item.item.id
                );
            }
        },
    )?;

    println!(
        "run complete: {} processed, {} dead-lettered, {} total (resumed at {})",
        outcome.processed, outcome.dead_lettered, outcome.total, outcome.started_at_cursor
    );
    if outcome.dead_lettered > 0 {
        Ok(exit_codes::DEAD_LETTERED)
    } else {
        Ok(exit_codes::OK)
    }
}

fn cmd_sweep(paths: &DispatchPaths, mut cfg: DispatchConfig, workers: Option<usize>) -> Result<i32> {
    if let Some(workers) = workers {
        cfg.concurrency_limit = workers;
        cfg.validate()?;
    }
    let (worker, renderer) = collaborators(paths, &cfg)?;

    let outcome = run_pool(
        &paths.root,
        &worker,
        &TokenClassifier,
        &renderer,
        &cfg,
        |report| match &report.verdict {
            Verdict::Approved => println!("approved   {}", report.item.id),
            Verdict::Suspect { reason } => println!("suspect    {}: {reason}", report.item.id),
        },
    )?;

    println!(
        "sweep complete: {} newly completed, {} approved, {} suspect, {} total",
        outcome.newly_completed, outcome.approved_count, outcome.suspect_count, outcome.total
    );
    Ok(exit_codes::OK)
}

fn cmd_status(paths: &DispatchPaths) -> Result<i32> {
    let state = load_state(&paths.state_path)?;
    println!(
        "sequential: cursor {} | {} processed | {} items with pending failures",
        state.cursor,
        state.processed.len(),
        state.failure_counts.len()
    );

    let pool = load_pool_state(&paths.pool_state_path)?;
    println!(
        "pool: {:?} | {}/{} completed | {} approved | {} suspect",
        pool.phase,
        pool.completed.len(),
        pool.total,
        pool.approved_count,
        pool.suspect_count
    );

    let guardrails = load_guardrails(&paths.guardrail_path)?;
    println!("guardrails: {} entries", guardrails.len());
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run() {
        let cli = Cli::parse_from(["dispatch", "run"]);
        assert!(matches!(cli.command, Command::Run));
        assert_eq!(cli.root, PathBuf::from("."));
    }

    #[test]
    fn parse_sweep_with_workers() {
        let cli = Cli::parse_from(["dispatch", "sweep", "-j", "8"]);
        assert!(matches!(cli.command, Command::Sweep { workers: Some(8) }));
    }

    #[test]
    fn parse_status_with_root() {
        let cli = Cli::parse_from(["dispatch", "--root", "/work", "status"]);
        assert!(matches!(cli.command, Command::Status));
        assert_eq!(cli.root, PathBuf::from("/work"));
    }
}
