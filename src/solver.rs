use crate::data::{
    CourseBatchId, RoomId, RoomPool, ScheduleEntry, SessionType, TimeSlot,
};
use crate::grid::SlotGrid;
use crate::overlap::StudentOverlapIndex;
use crate::problem::{CourseBatch, Problem};
use crate::strategy::{Approach, StrategyHint};
use log::{debug, info, trace};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::Instant;

/// How a candidate slot's student-conflict cost is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPolicy {
    MinimizeConflict,
    ConflictFree,
}

impl PlacementPolicy {
    fn admits(self, cost: u64) -> bool {
        match self {
            PlacementPolicy::MinimizeConflict => true,
            PlacementPolicy::ConflictFree => cost == 0,
        }
    }
}

/// Hours a course-batch is still missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortfall {
    pub course_batch: CourseBatchId,
    pub theory_missing: u32,
    pub lab_missing: u32,
}

impl Shortfall {
    pub fn total(&self) -> u32 {
        self.theory_missing + self.lab_missing
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacedHours {
    pub theory: u32,
    pub lab: u32,
}

impl PlacedHours {
    pub fn of(&self, session: SessionType) -> u32 {
        match session {
            SessionType::Theory => self.theory,
            SessionType::Lab => self.lab,
        }
    }
}

pub fn placed_hours(entries: &[ScheduleEntry]) -> HashMap<&CourseBatchId, PlacedHours> {
    let mut placed: HashMap<&CourseBatchId, PlacedHours> = HashMap::new();
    for entry in entries {
        let hours = placed.entry(&entry.course_batch).or_default();
        match entry.session {
            SessionType::Theory => hours.theory += 1,
            SessionType::Lab => hours.lab += 1,
        }
    }
    placed
}

pub fn shortfalls(problem: &Problem, entries: &[ScheduleEntry]) -> Vec<Shortfall> {
    let placed = placed_hours(entries);
    problem
        .batches()
        .iter()
        .filter_map(|batch| {
            let done = placed.get(&batch.id).copied().unwrap_or_default();
            let shortfall = Shortfall {
                course_batch: batch.id.clone(),
                theory_missing: batch.theory_hours.saturating_sub(done.theory),
                lab_missing: batch.lab_hours.saturating_sub(done.lab),
            };
            (shortfall.total() > 0).then_some(shortfall)
        })
        .collect()
}

/// The result of one scheduling pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub algorithm: String,
    pub entries: Vec<ScheduleEntry>,
    pub total_conflict: u64,
    pub sessions_required: u32,
    pub sessions_placed: u32,
    pub shortfalls: Vec<Shortfall>,
}

impl Proposal {
    pub fn new(
        algorithm: impl Into<String>,
        problem: &Problem,
        entries: Vec<ScheduleEntry>,
        total_conflict: u64,
    ) -> Self {
        let shortfalls = shortfalls(problem, &entries);
        Proposal {
            algorithm: algorithm.into(),
            sessions_required: problem.sessions_required(),
            sessions_placed: entries.len() as u32,
            entries,
            total_conflict,
            shortfalls,
        }
    }

    pub fn refresh(&mut self, problem: &Problem, overlap: &StudentOverlapIndex) {
        self.sessions_placed = self.entries.len() as u32;
        self.total_conflict = overlap.realized_conflict(&self.entries);
        self.shortfalls = shortfalls(problem, &self.entries);
    }

    pub fn coverage(&self) -> f64 {
        if self.sessions_required == 0 {
            return 1.0;
        }
        let missing: u32 = self.shortfalls.iter().map(Shortfall::total).sum();
        f64::from(self.sessions_required - missing.min(self.sessions_required))
            / f64::from(self.sessions_required)
    }

    pub fn entries_for<'a, 'b>(&'a self, id: &'b CourseBatchId) -> impl Iterator<Item = &'a ScheduleEntry> + use<'a, 'b> {
        self.entries.iter().filter(move |e| &e.course_batch == id)
    }
}

/// A chosen room and hour(s) for one unit: a theory hour or a lab block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placement {
    pub slots: Vec<TimeSlot>,
    pub room: RoomId,
    pub cost: u64,
}

/// Keeps the first candidate at the lowest cost. Returns true once a
/// zero-cost candidate is held, which ends the scan.
fn consider(best: &mut Option<Placement>, candidate: Placement) -> bool {
    let zero = candidate.cost == 0;
    if best.as_ref().is_none_or(|b| candidate.cost < b.cost) {
        *best = Some(candidate);
    }
    zero
}

pub(crate) fn find_theory_slot(
    grid: &SlotGrid,
    overlap: &StudentOverlapIndex,
    cb: &CourseBatchId,
    teacher: &str,
    policy: PlacementPolicy,
    order: &[TimeSlot],
) -> Option<Placement> {
    let mut best = None;
    for &slot in order {
        if !grid.is_teacher_free(teacher, slot) || grid.holds(cb, slot) {
            continue;
        }
        let Some(room) = grid.first_free_room(RoomPool::Regular, slot) else {
            continue;
        };
        let cost = grid.marginal_cost(overlap, cb, slot);
        if !policy.admits(cost) {
            continue;
        }
        let candidate = Placement {
            slots: vec![slot],
            room: room.id.clone(),
            cost,
        };
        if consider(&mut best, candidate) {
            break;
        }
    }
    best
}

/// Two consecutive hours on one day, same lab room, teacher free in both.
pub(crate) fn find_lab_block(
    grid: &SlotGrid,
    overlap: &StudentOverlapIndex,
    cb: &CourseBatchId,
    teacher: &str,
    policy: PlacementPolicy,
) -> Option<Placement> {
    let mut best = None;
    for &first in grid.slots() {
        let Some(second) = grid.consecutive_pair(first) else {
            continue;
        };
        if !grid.is_teacher_free(teacher, first) || !grid.is_teacher_free(teacher, second) {
            continue;
        }
        if grid.holds(cb, first) || grid.holds(cb, second) {
            continue;
        }
        let Some(room) = grid.first_free_room_pair(RoomPool::Lab, first, second) else {
            continue;
        };
        let cost = grid.marginal_cost(overlap, cb, first) + grid.marginal_cost(overlap, cb, second);
        if !policy.admits(cost) {
            continue;
        }
        let candidate = Placement {
            slots: vec![first, second],
            room: room.id.clone(),
            cost,
        };
        if consider(&mut best, candidate) {
            break;
        }
    }
    best
}

pub(crate) fn commit(
    grid: &mut SlotGrid,
    batch: &CourseBatch,
    teacher: &str,
    session: SessionType,
    placement: &Placement,
) -> Vec<ScheduleEntry> {
    placement
        .slots
        .iter()
        .map(|&slot| {
            let entry = ScheduleEntry {
                course_batch: batch.id.clone(),
                slot,
                room: placement.room.clone(),
                teacher: teacher.to_string(),
                session,
                students: batch.students,
            };
            grid.place(&entry);
            entry
        })
        .collect()
}

pub(crate) fn place_unit(
    grid: &mut SlotGrid,
    overlap: &StudentOverlapIndex,
    batch: &CourseBatch,
    teacher: &str,
    session: SessionType,
    policy: PlacementPolicy,
    theory_order: &[TimeSlot],
) -> Option<(Vec<ScheduleEntry>, u64)> {
    let placement = match session {
        SessionType::Theory => find_theory_slot(grid, overlap, &batch.id, teacher, policy, theory_order),
        SessionType::Lab => find_lab_block(grid, overlap, &batch.id, teacher, policy),
    }?;
    trace!(
        "Placed {} {} at {} in {} (cost {})",
        batch.id, session, placement.slots[0], placement.room, placement.cost
    );
    Some((commit(grid, batch, teacher, session, &placement), placement.cost))
}

/// Number of placement units for a session type: hours for theory, blocks for
/// labs. An odd lab hour still takes a whole block.
pub(crate) fn units(batch: &CourseBatch, session: SessionType) -> u32 {
    match session {
        SessionType::Theory => batch.theory_hours,
        SessionType::Lab => batch.lab_hours.div_ceil(2),
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionGroup<'a> {
    batch: &'a CourseBatch,
    session: SessionType,
    priority: u64,
}

fn session_groups<'a>(
    problem: &'a Problem,
    overlap: &StudentOverlapIndex,
    hint: &StrategyHint,
    labs_before_theory: bool,
) -> Vec<SessionGroup<'a>> {
    let within_batch = if labs_before_theory {
        [SessionType::Lab, SessionType::Theory]
    } else {
        [SessionType::Theory, SessionType::Lab]
    };

    let mut groups: Vec<SessionGroup<'a>> = problem
        .batches()
        .iter()
        .flat_map(|batch| {
            let priority = overlap.weighted_degree(&batch.id);
            within_batch
                .into_iter()
                .filter(move |&session| batch.required(session) > 0)
                .map(move |session| SessionGroup {
                    batch,
                    session,
                    priority,
                })
        })
        .collect();

    // stable: equal keys keep input order
    groups.sort_by_key(|g| {
        let rank = match (hint.approach, g.session) {
            (Approach::Balanced, _) => 0,
            (Approach::TheoryFirst, SessionType::Theory) | (Approach::LabsFirst, SessionType::Lab) => 0,
            _ => 1,
        };
        (Reverse(g.priority), rank)
    });
    groups
}

/// A single greedy pass over all session groups, no backtracking.
fn greedy_pass(
    name: &str,
    policy: PlacementPolicy,
    labs_before_theory: bool,
    problem: &Problem,
    overlap: &StudentOverlapIndex,
    grid: &mut SlotGrid,
    hint: &StrategyHint,
) -> Proposal {
    let start_time = Instant::now();
    let groups = session_groups(problem, overlap, hint, labs_before_theory);
    info!(
        "Scheduling {} session groups for {} course-batches with {}...",
        groups.len(),
        problem.batches().len(),
        name
    );
    if let Some(first) = groups.first() {
        debug!("Most constrained: {} with weighted degree {}", first.batch.id, first.priority);
    }

    let theory_order = grid.scan_order(hint.morning_theory);
    let mut entries = Vec::new();
    let mut total_conflict = 0;

    for group in &groups {
        let batch = group.batch;
        for unit in 0..units(batch, group.session) {
            match place_unit(grid, overlap, batch, &batch.teacher, group.session, policy, &theory_order) {
                Some((placed, cost)) => {
                    entries.extend(placed);
                    total_conflict += cost;
                }
                None => {
                    // the grid only fills up, later units cannot fit either
                    debug!(
                        "No slot for {} {} unit {} of {}",
                        batch.id,
                        group.session,
                        unit + 1,
                        units(batch, group.session)
                    );
                    break;
                }
            }
        }
    }

    let proposal = Proposal::new(name, problem, entries, total_conflict);
    info!(
        "Placed {}/{} sessions, {} student conflicts, {} short course-batches in {:.2?}",
        proposal.sessions_placed,
        proposal.sessions_required,
        proposal.total_conflict,
        proposal.shortfalls.len(),
        start_time.elapsed()
    );
    proposal
}

pub trait Scheduler {
    fn name(&self) -> &'static str;

    /// The policy repairs must use to stay consistent with this scheduler.
    fn policy(&self) -> PlacementPolicy;

    fn schedule(
        &self,
        problem: &Problem,
        overlap: &StudentOverlapIndex,
        grid: &mut SlotGrid,
        hint: &StrategyHint,
    ) -> Proposal;
}

/// Most-constrained-first greedy that picks the least-conflicting slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConflictAwareScheduler;

impl Scheduler for ConflictAwareScheduler {
    fn name(&self) -> &'static str {
        "conflict_aware"
    }

    fn policy(&self) -> PlacementPolicy {
        PlacementPolicy::MinimizeConflict
    }

    fn schedule(
        &self,
        problem: &Problem,
        overlap: &StudentOverlapIndex,
        grid: &mut SlotGrid,
        hint: &StrategyHint,
    ) -> Proposal {
        greedy_pass(self.name(), self.policy(), false, problem, overlap, grid, hint)
    }
}

/// Strict variant: labs go first as consecutive-hour blocks and no placement
/// may double-book a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsecutiveLabScheduler;

impl Scheduler for ConsecutiveLabScheduler {
    fn name(&self) -> &'static str {
        "consecutive_lab"
    }

    fn policy(&self) -> PlacementPolicy {
        PlacementPolicy::ConflictFree
    }

    fn schedule(
        &self,
        problem: &Problem,
        overlap: &StudentOverlapIndex,
        grid: &mut SlotGrid,
        hint: &StrategyHint,
    ) -> Proposal {
        greedy_pass(self.name(), self.policy(), true, problem, overlap, grid, hint)
    }
}
