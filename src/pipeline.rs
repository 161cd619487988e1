use log::info;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{SchedulerMode, SchedulingConfig};
use crate::data::Enrollment;
use crate::error::ScheduleError;
use crate::grid::SlotGrid;
use crate::overlap::StudentOverlapIndex;
use crate::problem::Problem;
use crate::repair::{GapRepair, RepairReport};
use crate::solver::{ConflictAwareScheduler, ConsecutiveLabScheduler, Proposal, Scheduler};
use crate::strategy::{StrategyAdvisor, StrategyHint};
use crate::verify::{verify, Verification, ViolationKind};

/// Counters for downstream reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub sessions_required: u32,
    pub sessions_placed: u32,
    pub total_conflict: u64,
    pub violations: BTreeMap<ViolationKind, usize>,
    pub reassigned: usize,
    pub score: f64,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub hint: StrategyHint,
    pub proposal: Proposal,
    pub repair: RepairReport,
    pub verification: Verification,
}

impl Outcome {
    pub fn summary(&self) -> Summary {
        Summary {
            sessions_required: self.proposal.sessions_required,
            sessions_placed: self.proposal.sessions_placed,
            total_conflict: self.proposal.total_conflict,
            violations: self.verification.counts(),
            reassigned: self.repair.reassigned.len(),
            score: self.verification.score,
            is_valid: self.verification.is_valid,
        }
    }

    /// Higher score wins, then fewer student conflicts.
    fn beats(&self, other: &Outcome) -> bool {
        let (a, b) = (self.verification.score, other.verification.score);
        a > b || (a == b && self.proposal.total_conflict < other.proposal.total_conflict)
    }
}

/// Holds what every run of one problem shares. Occupancy is never shared:
/// each run builds its own [`SlotGrid`].
#[derive(Debug)]
pub struct Pipeline<'a> {
    problem: &'a Problem,
    config: &'a SchedulingConfig,
    overlap: StudentOverlapIndex,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        problem: &'a Problem,
        config: &'a SchedulingConfig,
        enrollments: &[Enrollment],
    ) -> Result<Self, ScheduleError> {
        config.validate()?;
        Ok(Self {
            problem,
            config,
            overlap: StudentOverlapIndex::build(enrollments),
        })
    }

    pub fn overlap(&self) -> &StudentOverlapIndex {
        &self.overlap
    }

    pub fn run(&self, hint: &StrategyHint) -> Result<Outcome, ScheduleError> {
        match self.config.mode {
            SchedulerMode::ConflictAware => self.run_with(&ConflictAwareScheduler, hint),
            SchedulerMode::ConflictFree => self.run_with(&ConsecutiveLabScheduler, hint),
        }
    }

    pub fn run_with(&self, scheduler: &dyn Scheduler, hint: &StrategyHint) -> Result<Outcome, ScheduleError> {
        let mut grid = SlotGrid::new(self.config)?;
        let mut proposal = scheduler.schedule(self.problem, &self.overlap, &mut grid, hint);

        let repair = if self.config.gap_repair {
            GapRepair::new(scheduler.policy()).repair(self.problem, &self.overlap, &mut grid, &mut proposal)
        } else {
            RepairReport::default()
        };

        let verification = verify(&proposal.entries, self.problem, self.config);
        info!(
            "Run finished: {}/{} sessions, {} student conflicts, score {:.3}, valid {}",
            proposal.sessions_placed,
            proposal.sessions_required,
            proposal.total_conflict,
            verification.score,
            verification.is_valid
        );

        Ok(Outcome {
            hint: *hint,
            proposal,
            repair,
            verification,
        })
    }

    pub fn run_with_advisor(&self, advisor: &dyn StrategyAdvisor) -> Result<Outcome, ScheduleError> {
        let hint = advisor.suggest_strategy(&self.problem.summary(self.config));
        info!("Strategy hint: {:?}", hint);
        self.run(&hint)
    }

    /// Runs one independent pipeline per hint in parallel and keeps the best.
    /// Ties go to the earlier hint.
    pub fn best_of(&self, hints: &[StrategyHint]) -> Result<Option<Outcome>, ScheduleError> {
        let outcomes = hints
            .par_iter()
            .map(|hint| self.run(hint))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(outcomes
            .into_iter()
            .reduce(|best, next| if next.beats(&best) { next } else { best }))
    }
}
