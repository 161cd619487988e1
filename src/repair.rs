//! Completes short course-batches by handing them to another teacher.

use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

use crate::data::{CourseBatchId, ScheduleEntry, SessionType, TeacherName, TimeSlot};
use crate::grid::SlotGrid;
use crate::overlap::StudentOverlapIndex;
use crate::problem::{CourseBatch, Problem};
use crate::solver::{place_unit, units, PlacementPolicy, Proposal, Shortfall};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reassignment {
    pub course_batch: CourseBatchId,
    pub from: TeacherName,
    pub to: TeacherName,
    pub sessions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub reassigned: Vec<Reassignment>,
    /// Shortfalls no alternate teacher could close.
    pub unresolved: Vec<Shortfall>,
}

#[derive(Debug, Clone, Copy)]
pub struct GapRepair {
    policy: PlacementPolicy,
}

impl GapRepair {
    /// `policy` should match the scheduler that produced the proposal.
    pub fn new(policy: PlacementPolicy) -> Self {
        Self { policy }
    }

    /// `grid` must hold exactly the entries of `proposal`.
    pub fn repair(
        &self,
        problem: &Problem,
        overlap: &StudentOverlapIndex,
        grid: &mut SlotGrid,
        proposal: &mut Proposal,
    ) -> RepairReport {
        let mut report = RepairReport::default();
        if proposal.shortfalls.is_empty() {
            return report;
        }
        let start_time = Instant::now();
        info!(
            "Repairing {} short course-batches by teacher reassignment...",
            proposal.shortfalls.len()
        );

        let mut loads: HashMap<TeacherName, u32> = problem
            .teachers()
            .iter()
            .map(|t| (t.clone(), problem.workload(t)))
            .collect();
        let order = grid.slots().to_vec();

        for shortfall in proposal.shortfalls.clone() {
            let Some(batch) = problem.batch(&shortfall.course_batch) else {
                continue;
            };
            let previous: Vec<ScheduleEntry> = proposal.entries_for(&batch.id).cloned().collect();
            for entry in &previous {
                grid.remove(entry);
            }

            let candidates = problem
                .teachers()
                .iter()
                .filter(|t| **t != batch.teacher)
                .sorted_by_key(|t| loads.get(*t).copied().unwrap_or(0));

            let mut covered = None;
            for candidate in candidates {
                if let Some(entries) = self.cover(grid, overlap, batch, candidate, &order) {
                    covered = Some((candidate.clone(), entries));
                    break;
                }
            }

            match covered {
                Some((teacher, entries)) => {
                    info!(
                        "Reassigning {}: {} -> {} ({} sessions)",
                        batch.id,
                        batch.teacher,
                        teacher,
                        entries.len()
                    );
                    let hours = batch.total_hours();
                    let load = loads.entry(teacher.clone()).or_insert(0);
                    *load = load.saturating_add(hours);
                    if let Some(load) = loads.get_mut(&batch.teacher) {
                        *load = load.saturating_sub(hours);
                    }
                    proposal.entries.retain(|e| e.course_batch != batch.id);
                    proposal.entries.extend(entries);
                    report.reassigned.push(Reassignment {
                        course_batch: batch.id.clone(),
                        from: batch.teacher.clone(),
                        to: teacher,
                        sessions: hours,
                    });
                }
                None => {
                    for entry in &previous {
                        grid.place(entry);
                    }
                    warn!(
                        "No alternate teacher can cover {}, still {} hours short",
                        batch.id,
                        shortfall.total()
                    );
                    report.unresolved.push(shortfall);
                }
            }
        }

        if !report.reassigned.is_empty() {
            proposal.algorithm = format!("{}+gap_repair", proposal.algorithm);
        }
        proposal.refresh(problem, overlap);
        info!(
            "Gap repair reassigned {} course-batches, {} unresolved, in {:.2?}",
            report.reassigned.len(),
            report.unresolved.len(),
            start_time.elapsed()
        );
        report
    }

    /// Places the full requirement of `batch` under `teacher`, or nothing.
    fn cover(
        &self,
        grid: &mut SlotGrid,
        overlap: &StudentOverlapIndex,
        batch: &CourseBatch,
        teacher: &str,
        order: &[TimeSlot],
    ) -> Option<Vec<ScheduleEntry>> {
        let mut placed = Vec::with_capacity(batch.total_hours() as usize);
        for session in [SessionType::Lab, SessionType::Theory] {
            for _ in 0..units(batch, session) {
                match place_unit(grid, overlap, batch, teacher, session, self.policy, order) {
                    Some((entries, _)) => placed.extend(entries),
                    None => {
                        for entry in &placed {
                            grid.remove(entry);
                        }
                        return None;
                    }
                }
            }
        }
        Some(placed)
    }
}
