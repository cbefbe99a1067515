//! PetQuest CLI - pet-care mission progression engine.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use petquest_core::{Evidence, MissionDefinition, ProgressId, StepId};
use petquest_engine::{MissionEngine, SubmitOutcome, TracingSink};
use petquest_storage::{JsonStore, ProgressStore};

#[derive(Parser)]
#[command(name = "petquest")]
#[command(about = "Pet-care mission progression engine", long_about = None)]
struct Cli {
    /// Storage directory
    #[arg(long, default_value = ".petquest")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a mission from a definition file
    Start {
        /// Mission definition JSON
        mission: PathBuf,
        /// User the instance belongs to
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Submit evidence for the active step
    Submit {
        /// Progress instance id
        progress_id: String,
        /// Step id to submit against
        step_id: String,
        /// Mission definition JSON
        #[arg(long)]
        mission: PathBuf,
        /// Evidence JSON file (array of payloads)
        #[arg(long)]
        evidence: PathBuf,
        /// Minutes spent on the step
        #[arg(long, default_value = "0")]
        minutes: u64,
    },
    /// Pause an active mission
    Pause {
        /// Progress instance id
        progress_id: String,
        /// Mission definition JSON
        #[arg(long)]
        mission: PathBuf,
    },
    /// Resume a paused mission
    Resume {
        /// Progress instance id
        progress_id: String,
        /// Mission definition JSON
        #[arg(long)]
        mission: PathBuf,
    },
    /// Abandon a mission
    Abandon {
        /// Progress instance id
        progress_id: String,
        /// Mission definition JSON
        #[arg(long)]
        mission: PathBuf,
    },
    /// Expire a mission past its deadline
    Expire {
        /// Progress instance id
        progress_id: String,
        /// Mission definition JSON
        #[arg(long)]
        mission: PathBuf,
    },
    /// Show a stored progress snapshot
    Status {
        /// Progress instance id
        progress_id: String,
    },
    /// List stored progress snapshots
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();
    let store = JsonStore::new(&cli.data_dir).await?;

    match cli.command {
        Commands::Start { mission, user } => {
            let def = read_definition(&mission)?;
            let engine = MissionEngine::new(store, Arc::new(TracingSink));
            let snapshot = engine.start(def, user).await?;
            println!("Started mission: {}", snapshot.id);
            println!(
                "Active step: {}",
                snapshot.active_step().map(|(i, _)| i).unwrap_or(0)
            );
        }
        Commands::Submit {
            progress_id,
            step_id,
            mission,
            evidence,
            minutes,
        } => {
            let progress_id: ProgressId = progress_id.parse().context("invalid progress id")?;
            let step_id: StepId = step_id.parse().context("invalid step id")?;
            let payloads: Vec<Evidence> = serde_json::from_str(
                &std::fs::read_to_string(&evidence).context("reading evidence file")?,
            )
            .context("parsing evidence file")?;

            let engine = attach(store, &mission, progress_id).await?;
            let outcome = engine
                .submit_step(progress_id, step_id, payloads, minutes * 60)
                .await?;
            match outcome {
                SubmitOutcome::StepCompleted {
                    quality_score,
                    rewards,
                    ..
                } => {
                    println!(
                        "Step completed (quality {:.2}), +{} XP",
                        quality_score,
                        rewards.total_xp()
                    );
                }
                SubmitOutcome::MissionCompleted {
                    quality_score,
                    step_rewards,
                    mission_rewards,
                    ..
                } => {
                    println!(
                        "Mission completed (quality {:.2}), +{} XP",
                        quality_score,
                        step_rewards.total_xp() + mission_rewards.total_xp()
                    );
                }
                SubmitOutcome::VerificationFailed {
                    reasons,
                    retry_count,
                } => {
                    let reasons: Vec<String> = reasons.iter().map(|r| r.to_string()).collect();
                    println!(
                        "Verification failed (attempt {}): {}",
                        retry_count,
                        reasons.join(", ")
                    );
                }
            }
        }
        Commands::Pause {
            progress_id,
            mission,
        } => {
            let progress_id: ProgressId = progress_id.parse().context("invalid progress id")?;
            let engine = attach(store, &mission, progress_id).await?;
            let snapshot = engine.pause(progress_id).await?;
            println!("Mission {} is now {}", snapshot.id, snapshot.status);
        }
        Commands::Resume {
            progress_id,
            mission,
        } => {
            let progress_id: ProgressId = progress_id.parse().context("invalid progress id")?;
            let engine = attach(store, &mission, progress_id).await?;
            let snapshot = engine.resume(progress_id).await?;
            println!("Mission {} is now {}", snapshot.id, snapshot.status);
        }
        Commands::Abandon {
            progress_id,
            mission,
        } => {
            let progress_id: ProgressId = progress_id.parse().context("invalid progress id")?;
            let engine = attach(store, &mission, progress_id).await?;
            let snapshot = engine.abandon(progress_id).await?;
            println!("Mission {} is now {}", snapshot.id, snapshot.status);
        }
        Commands::Expire {
            progress_id,
            mission,
        } => {
            let progress_id: ProgressId = progress_id.parse().context("invalid progress id")?;
            let engine = attach(store, &mission, progress_id).await?;
            let snapshot = engine.expire(progress_id).await?;
            println!("Mission {} is now {}", snapshot.id, snapshot.status);
        }
        Commands::Status { progress_id } => {
            let progress_id: ProgressId = progress_id.parse().context("invalid progress id")?;
            let snapshot = store
                .load(progress_id)
                .await?
                .context("no such progress instance")?;
            println!("Mission:    {}", snapshot.mission_id);
            println!("Status:     {}", snapshot.status);
            println!(
                "Progress:   {}/{} steps ({:.0}%)",
                snapshot.completed_steps,
                snapshot.total_steps(),
                snapshot.progress_percentage() * 100.0
            );
            println!("Difficulty: {}", snapshot.current_difficulty);
            println!("Quality:    {:.2}", snapshot.quality_score);
            println!("Efficiency: {:.2}", snapshot.efficiency);
            for adjustment in &snapshot.dda_adjustments {
                println!(
                    "  adjusted {} -> {} ({})",
                    adjustment.from_tier, adjustment.to_tier, adjustment.reason
                );
            }
        }
        Commands::List => {
            for snapshot in store.list().await? {
                println!(
                    "{}  {}  {}/{}  {}",
                    snapshot.id,
                    snapshot.status,
                    snapshot.completed_steps,
                    snapshot.total_steps(),
                    snapshot.user_id
                );
            }
        }
    }

    Ok(())
}

fn read_definition(path: &PathBuf) -> Result<MissionDefinition> {
    let json = std::fs::read_to_string(path).context("reading mission definition")?;
    serde_json::from_str(&json).context("parsing mission definition")
}

/// Build an engine with the stored snapshot re-attached under its definition.
async fn attach(
    store: JsonStore,
    mission: &PathBuf,
    progress_id: ProgressId,
) -> Result<MissionEngine<JsonStore>> {
    let def = read_definition(mission)?;
    let progress = store
        .load(progress_id)
        .await?
        .context("no such progress instance")?;
    let engine = MissionEngine::new(store, Arc::new(TracingSink));
    engine.attach(def, progress).await?;
    Ok(engine)
}
