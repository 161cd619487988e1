use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use timetable_solver::data::ScheduleEntry;
use timetable_solver::repair::Reassignment;
use timetable_solver::solver::Shortfall;
use timetable_solver::strategy::{DefaultAdvisor, StrategyHint};
use timetable_solver::{Pipeline, Problem, SchedulerMode, SchedulingConfig, SchedulingInput, Summary, Verification};

#[derive(Parser)]
#[command(about = "Builds a weekly course timetable from a JSON problem")]
struct Args {
    /// Problem file with courses, teachers and enrollments
    #[arg(long)]
    input: PathBuf,
    /// Grid and verifier settings, defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Report destination, stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
    /// Forbid any student double-booking and place labs first
    #[arg(long)]
    strict: bool,
    /// Try every strategy hint in parallel and keep the best schedule
    #[arg(long)]
    explore: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    algorithm: &'a str,
    hint: StrategyHint,
    summary: Summary,
    entries: &'a [ScheduleEntry],
    reassignments: &'a [Reassignment],
    unresolved: &'a [Shortfall],
    verification: &'a Verification,
    feedback: String,
    suggestions: Vec<String>,
    skipped: Vec<String>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let input: SchedulingInput = read_json(&args.input)?;
    let mut config: SchedulingConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => SchedulingConfig::default(),
    };
    if args.strict {
        config.mode = SchedulerMode::ConflictFree;
    }

    let problem = Problem::from_input(&input);
    if !problem.skipped().is_empty() {
        warn!("{} course-batches were skipped as malformed", problem.skipped().len());
    }

    let pipeline = Pipeline::new(&problem, &config, &input.enrollments).context("invalid scheduling config")?;
    info!(
        "Overlap index: {} students, {} conflicting pairs",
        pipeline.overlap().students(),
        pipeline.overlap().pair_count()
    );

    let outcome = if args.explore {
        pipeline
            .best_of(&StrategyHint::all())?
            .context("no strategy hints to explore")?
    } else {
        pipeline.run_with_advisor(&DefaultAdvisor)?
    };

    let report = Report {
        algorithm: &outcome.proposal.algorithm,
        hint: outcome.hint,
        summary: outcome.summary(),
        entries: &outcome.proposal.entries,
        reassignments: &outcome.repair.reassigned,
        unresolved: &outcome.repair.unresolved,
        verification: &outcome.verification,
        feedback: outcome.verification.feedback(),
        suggestions: outcome.verification.suggestions(),
        skipped: problem.skipped().iter().map(ToString::to_string).collect(),
    };
    let json = serde_json::to_string_pretty(&report)?;

    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
