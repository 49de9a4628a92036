//! Tollgate license agent
//!
//! Runs the license engine from the command line:
//!   tollgate-agent status              validate (online first, cached record offline)
//!   tollgate-agent activate <KEY>      bind this machine to a license
//!   tollgate-agent verify              manual re-check, limited per day
//!   tollgate-agent transfer <KEY>      move a license to this machine
//!   tollgate-agent reset               clear the local record
//!   tollgate-agent log                 recent validations and audit entries
//!   tollgate-agent watch               validate in the background until Ctrl-C

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tollgate_agent::console::{render_audit, render_outcome, render_validation};
use tollgate_agent::{build_engine, AgentConfig, ConsoleVerifier};
use tollgate_license::{BackgroundValidator, LicenseEngine, ValidationOutcome};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Exit status when the license does not allow the application to run.
const EXIT_BLOCKED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "tollgate-agent")]
#[command(about = "Tollgate license validation agent")]
struct Args {
    /// Path to agent.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Confirm transfers without prompting
    #[arg(short, long)]
    yes: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the license as the application would at startup
    Status,
    /// Activate this machine with a license key
    Activate { key: String },
    /// Re-check the license on request
    Verify,
    /// Move a license to this machine
    Transfer { key: String },
    /// Delete the local license record
    Reset,
    /// Show recent validation and audit entries
    Log {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Validate periodically and report status changes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config_path = args.config.unwrap_or_else(AgentConfig::default_path);
    let config = AgentConfig::load(&config_path)?;
    let engine = build_engine(&config, Arc::new(ConsoleVerifier::new(args.yes)))?;

    match args.command {
        Command::Status => Ok(report(&engine.validate_startup().await)),
        Command::Activate { key } => {
            let outcome = engine.activate(&key).await.context("activation failed")?;
            Ok(report(&outcome))
        }
        Command::Verify => {
            let outcome = engine.validate_manual().await.context("verification failed")?;
            Ok(report(&outcome))
        }
        Command::Transfer { key } => {
            let transfer = engine
                .request_transfer(&key)
                .await
                .context("transfer request refused")?;
            info!(transfer = %transfer.id, "transfer requested");
            let outcome = engine
                .confirm_transfer(transfer.id)
                .await
                .context("transfer not completed")?;
            Ok(report(&outcome))
        }
        Command::Reset => {
            engine.reset().await.context("reset failed")?;
            println!("local license record cleared");
            Ok(ExitCode::SUCCESS)
        }
        Command::Log { limit } => {
            print_log(&engine, limit)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Watch => watch(engine).await,
    }
}

fn report(outcome: &ValidationOutcome) -> ExitCode {
    println!("{}", render_outcome(outcome));
    if outcome.is_blocked() {
        ExitCode::from(EXIT_BLOCKED)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_log(engine: &LicenseEngine, limit: usize) -> Result<()> {
    let log = engine.audit_log();

    println!("validations ({} total)", log.validation_count()?);
    for entry in log.recent_validations(limit)? {
        println!("  {}", render_validation(&entry));
    }
    println!("audit ({} total)", log.audit_count()?);
    for entry in log.recent_audit(limit)? {
        println!("  {}", render_audit(&entry));
    }
    Ok(())
}

async fn watch(engine: LicenseEngine) -> Result<ExitCode> {
    let mut status = engine.subscribe();
    println!("{}", render_outcome(&engine.validate_startup().await));

    let period = engine.config().revalidation_interval();
    let validator = BackgroundValidator::spawn(engine.clone(), period)?;
    info!(period_secs = period.as_secs(), "watching license, Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                println!("status changed: {current}");
            }
        }
    }

    validator.shutdown().await?;
    if engine.status().is_blocking() {
        Ok(ExitCode::from(EXIT_BLOCKED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
