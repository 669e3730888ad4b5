//! Quality-gated task orchestrator CLI.
//!
//! Commands operate on the `.gatekeeper/` store in the current directory,
//! mirroring how the store would live at a research repo's root.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gatekeeper::core::stage::Stage;
use gatekeeper::exit_codes;
use gatekeeper::io::config::load_config;
use gatekeeper::io::executor::CommandExecutor;
use gatekeeper::io::layout::{StorePaths, init_store};
use gatekeeper::io::verifiers::for_kind;
use gatekeeper::logging;
use gatekeeper::run::run_to_terminal;
use gatekeeper::scheduler::{NewTask, Scheduler};

#[derive(Parser)]
#[command(
    name = "gatekeeper",
    version,
    about = "Quality-gated task orchestrator for research artifacts"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the `.gatekeeper/` store and default config if missing.
    Init {
        /// Overwrite an existing config with defaults.
        #[arg(short, long)]
        force: bool,
    },
    /// Register an artifact as a task and record its initial stage.
    Start {
        /// Path to the artifact under review.
        artifact: PathBuf,
        /// Artifact kind: document, numeric_script, manuscript, exploration_artifact.
        #[arg(long)]
        kind: String,
        /// Quality track: production or exploration.
        #[arg(long, default_value = "production")]
        track: String,
        /// Plan step; repeat for multiple steps. Omit to skip planning.
        #[arg(long = "plan")]
        plan: Vec<String>,
    },
    /// Execute the next stage transition for a task.
    Advance {
        task_id: String,
    },
    /// Advance a task until it commits, escalates, or is abandoned.
    Run {
        task_id: String,
    },
    /// Abandon a task, recording the cause.
    Cancel {
        task_id: String,
        #[arg(long, default_value = "cancelled by operator")]
        reason: String,
    },
    /// Print a task's session records, one JSON object per line.
    History {
        task_id: String,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INTERNAL
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Start {
            artifact,
            kind,
            track,
            plan,
        } => cmd_start(artifact, &kind, &track, plan),
        Command::Advance { task_id } => cmd_advance(&task_id),
        Command::Run { task_id } => cmd_run(&task_id),
        Command::Cancel { task_id, reason } => cmd_cancel(&task_id, &reason),
        Command::History { task_id } => cmd_history(&task_id),
    }
}

fn open_scheduler() -> Result<Scheduler> {
    let root = std::env::current_dir().context("resolve current directory")?;
    let paths = StorePaths::new(&root);
    let config = load_config(&paths.config_path)?;
    Ok(Scheduler::new(&root, config))
}

fn cmd_init(force: bool) -> Result<i32> {
    let root = std::env::current_dir().context("resolve current directory")?;
    let paths = init_store(&root, force)?;
    println!("{}", paths.store_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_start(artifact: PathBuf, kind: &str, track: &str, plan: Vec<String>) -> Result<i32> {
    let scheduler = open_scheduler()?;
    let task = scheduler.start(NewTask {
        artifact,
        kind: kind.parse()?,
        track: track.parse()?,
        plan,
    })?;
    println!("{}", task.id());
    Ok(exit_codes::OK)
}

fn cmd_advance(task_id: &str) -> Result<i32> {
    let scheduler = open_scheduler()?;
    let mut task = scheduler.load(task_id)?;
    let executor = CommandExecutor::new(scheduler.config().executor.command.clone());
    let verifiers = for_kind(scheduler.config(), task.manifest.kind);
    let stage = scheduler.advance(&mut task, &executor, &verifiers)?;
    println!("{stage}");
    Ok(stage_exit_code(stage))
}

fn cmd_run(task_id: &str) -> Result<i32> {
    let scheduler = open_scheduler()?;
    let mut task = scheduler.load(task_id)?;
    let executor = CommandExecutor::new(scheduler.config().executor.command.clone());
    let verifiers = for_kind(scheduler.config(), task.manifest.kind);
    let outcome = run_to_terminal(&scheduler, &mut task, &executor, &verifiers)?;
    println!("{}", outcome.stage);
    Ok(stage_exit_code(outcome.stage))
}

fn cmd_cancel(task_id: &str, reason: &str) -> Result<i32> {
    let scheduler = open_scheduler()?;
    let mut task = scheduler.load(task_id)?;
    let stage = scheduler.cancel(&mut task, reason)?;
    println!("{stage}");
    Ok(exit_codes::OK)
}

fn cmd_history(task_id: &str) -> Result<i32> {
    let scheduler = open_scheduler()?;
    // Validates that the task exists; unknown ids are errors, not empty output.
    scheduler.load(task_id)?;
    for record in scheduler.recorder().history(task_id)? {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(exit_codes::OK)
}

/// Blocked outcomes are distinguishable in shell pipelines.
fn stage_exit_code(stage: Stage) -> i32 {
    match stage {
        Stage::Retrying | Stage::Escalated | Stage::Abandoned => exit_codes::BLOCKED,
        _ => exit_codes::OK,
    }
}
