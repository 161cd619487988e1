use itertools::Itertools;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::config::SchedulingConfig;
use crate::data::{Day, RoomPool, ScheduleEntry, SessionType, TimeSlot};
use crate::problem::Problem;
use crate::solver::placed_hours;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationKind {
    TeacherConflict,
    RoomConflict,
    BatchClash,
    IncompleteCoverage,
    InvalidDay,
    InvalidTime,
    WrongRoomPool,
    BrokenLabBlock,
    PoorDistribution,
    TeacherOverload,
}

impl ViolationKind {
    pub fn severity(self) -> Severity {
        match self {
            ViolationKind::PoorDistribution | ViolationKind::TeacherOverload => Severity::Soft,
            _ => Severity::Hard,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::TeacherConflict => "teacher_conflict",
            ViolationKind::RoomConflict => "room_conflict",
            ViolationKind::BatchClash => "batch_clash",
            ViolationKind::IncompleteCoverage => "incomplete_coverage",
            ViolationKind::InvalidDay => "invalid_day",
            ViolationKind::InvalidTime => "invalid_time",
            ViolationKind::WrongRoomPool => "wrong_room_pool",
            ViolationKind::BrokenLabBlock => "broken_lab_block",
            ViolationKind::PoorDistribution => "poor_distribution",
            ViolationKind::TeacherOverload => "teacher_overload",
        };
        f.write_str(name)
    }
}

/// Describes a rule that the schedule breaks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub description: String,
    /// Course-batches involved, as `COURSE-BATCH`.
    pub entries: Vec<String>,
}

impl Violation {
    fn new(kind: ViolationKind, description: String, entries: Vec<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            description,
            entries,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub is_valid: bool,
    pub score: f64,
    pub coverage: f64,
    pub hard: Vec<Violation>,
    pub soft: Vec<Violation>,
}

impl Verification {
    pub fn counts(&self) -> BTreeMap<ViolationKind, usize> {
        self.hard.iter().chain(&self.soft).map(|v| v.kind).counts().into_iter().collect()
    }

    pub fn feedback(&self) -> String {
        let mut lines = Vec::new();
        if self.is_valid {
            lines.push("Schedule is valid with good coverage.".to_string());
        }
        if !self.hard.is_empty() {
            lines.push(format!("Found {} hard constraint violations:", self.hard.len()));
            lines.extend(self.hard.iter().take(5).map(|v| format!("  - {}", v.description)));
            if self.hard.len() > 5 {
                lines.push(format!("  ... and {} more", self.hard.len() - 5));
            }
        }
        if !self.is_valid && self.hard.is_empty() {
            lines.push(format!(
                "Coverage is only {:.1}% of required sessions",
                self.coverage * 100.0
            ));
        }
        if !self.soft.is_empty() {
            lines.push(format!("{} soft constraint issues:", self.soft.len()));
            lines.extend(self.soft.iter().take(3).map(|v| format!("  - {}", v.description)));
        }
        lines.join("\n")
    }

    pub fn suggestions(&self) -> Vec<String> {
        let kinds: HashSet<ViolationKind> = self.hard.iter().chain(&self.soft).map(|v| v.kind).collect();
        let advice = [
            (ViolationKind::TeacherConflict, "Reschedule conflicting teacher sessions to different time slots"),
            (ViolationKind::RoomConflict, "Assign conflicting sessions to different rooms"),
            (ViolationKind::BatchClash, "Spread the sessions of one course-batch over different hours"),
            (ViolationKind::IncompleteCoverage, "Find additional slots or rooms for unscheduled sessions"),
            (ViolationKind::BrokenLabBlock, "Place lab hours as two consecutive hours in one lab room"),
            (ViolationKind::PoorDistribution, "Spread course sessions across more days"),
            (ViolationKind::TeacherOverload, "Move sessions of overloaded teachers to lighter days"),
        ];
        advice
            .into_iter()
            .filter(|(kind, _)| kinds.contains(kind))
            .map(|(_, text)| text.to_string())
            .collect()
    }
}

fn names(entries: &[&ScheduleEntry]) -> Vec<String> {
    entries.iter().map(|e| e.course_batch.to_string()).collect()
}

fn teacher_conflicts(entries: &[ScheduleEntry]) -> Vec<Violation> {
    entries
        .iter()
        .map(|e| ((e.slot, e.teacher.as_str()), e))
        .into_group_map()
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .sorted_by_key(|(key, _)| *key)
        .map(|((slot, teacher), group)| {
            Violation::new(
                ViolationKind::TeacherConflict,
                format!("{} is scheduled for {} classes at {}", teacher, group.len(), slot),
                names(&group),
            )
        })
        .collect()
}

fn room_conflicts(entries: &[ScheduleEntry]) -> Vec<Violation> {
    entries
        .iter()
        .map(|e| ((e.slot, e.room.as_str()), e))
        .into_group_map()
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .sorted_by_key(|(key, _)| *key)
        .map(|((slot, room), group)| {
            Violation::new(
                ViolationKind::RoomConflict,
                format!("Room {} has {} classes at {}", room, group.len(), slot),
                names(&group),
            )
        })
        .collect()
}

/// A course-batch meets once per slot, whatever the teacher.
fn batch_clashes(entries: &[ScheduleEntry]) -> Vec<Violation> {
    entries
        .iter()
        .map(|e| ((e.slot, &e.course_batch), e))
        .into_group_map()
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .sorted_by_key(|(key, _)| *key)
        .map(|((slot, cb), group)| {
            Violation::new(
                ViolationKind::BatchClash,
                format!("{} meets {} times at {}", cb, group.len(), slot),
                names(&group),
            )
        })
        .collect()
}

fn coverage_gaps(entries: &[ScheduleEntry], problem: &Problem) -> Vec<Violation> {
    let placed = placed_hours(entries);
    let mut violations = Vec::new();
    for batch in problem.batches() {
        let done = placed.get(&batch.id).copied().unwrap_or_default();
        for session in [SessionType::Theory, SessionType::Lab] {
            let missing = batch.required(session).saturating_sub(done.of(session));
            if missing > 0 {
                violations.push(Violation::new(
                    ViolationKind::IncompleteCoverage,
                    format!("{} missing {} {} hour(s)", batch.id, missing, session),
                    vec![batch.id.to_string()],
                ));
            }
        }
    }
    violations
}

fn time_bounds(entries: &[ScheduleEntry], config: &SchedulingConfig) -> Vec<Violation> {
    let mut violations = Vec::new();
    for entry in entries {
        let TimeSlot { day, hour } = entry.slot;
        if !config.days.contains(&day) {
            violations.push(Violation::new(
                ViolationKind::InvalidDay,
                format!("{} scheduled on invalid day {}", entry.course_batch, day),
                vec![entry.course_batch.to_string()],
            ));
        }
        if hour < config.start_hour || hour >= config.end_hour {
            violations.push(Violation::new(
                ViolationKind::InvalidTime,
                format!("{} scheduled at invalid time {}:00", entry.course_batch, hour),
                vec![entry.course_batch.to_string()],
            ));
        }
    }
    violations
}

fn room_pools(entries: &[ScheduleEntry], config: &SchedulingConfig) -> Vec<Violation> {
    let pools: HashMap<String, RoomPool> = [RoomPool::Regular, RoomPool::Lab]
        .into_iter()
        .flat_map(|pool| config.rooms(pool))
        .map(|room| (room.id, room.pool))
        .collect();

    entries
        .iter()
        .filter(|e| pools.get(&e.room) != Some(&e.session.pool()))
        .map(|e| {
            Violation::new(
                ViolationKind::WrongRoomPool,
                format!("{} {} session is in room {}", e.course_batch, e.session, e.room),
                vec![e.course_batch.to_string()],
            )
        })
        .collect()
}

fn lab_blocks(entries: &[ScheduleEntry]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let labs = entries
        .iter()
        .filter(|e| e.session == SessionType::Lab)
        .map(|e| ((&e.course_batch, e.slot.day, e.room.as_str()), e.slot.hour))
        .into_group_map();

    for ((cb, day, room), hours) in labs.into_iter().sorted_by_key(|(key, _)| *key) {
        let hours: Vec<u8> = hours.into_iter().sorted().collect();
        let mut i = 0;
        while i < hours.len() {
            if i + 1 < hours.len() && u32::from(hours[i + 1]) == u32::from(hours[i]) + 1 {
                i += 2;
                continue;
            }
            violations.push(Violation::new(
                ViolationKind::BrokenLabBlock,
                format!("{} lab at {} {}:00 in {} has no consecutive partner", cb, day, hours[i], room),
                vec![cb.to_string()],
            ));
            i += 1;
        }
    }
    violations
}

fn soft_issues(entries: &[ScheduleEntry], problem: &Problem, config: &SchedulingConfig) -> Vec<Violation> {
    let mut issues = Vec::new();

    let days_by_batch = entries
        .iter()
        .map(|e| (&e.course_batch, e.slot.day))
        .into_group_map();
    for batch in problem.batches() {
        let Some(days) = days_by_batch.get(&batch.id) else {
            continue;
        };
        let distinct = days.iter().unique().count() as u32;
        if distinct < batch.total_hours().min(config.verifier.min_distinct_days) {
            issues.push(Violation::new(
                ViolationKind::PoorDistribution,
                format!(
                    "{} has its {} sessions on only {} day(s)",
                    batch.id,
                    days.len(),
                    distinct
                ),
                vec![batch.id.to_string()],
            ));
        }
    }

    let daily: HashMap<(&str, Day), usize> = entries.iter().map(|e| (e.teacher.as_str(), e.slot.day)).counts();
    for ((teacher, day), hours) in daily.into_iter().sorted() {
        if hours as u32 > config.verifier.max_teacher_hours_per_day {
            issues.push(Violation::new(
                ViolationKind::TeacherOverload,
                format!("{} has {} hours on {}", teacher, hours, day),
                Vec::new(),
            ));
        }
    }
    issues
}

/// Share of required hours that are placed, capped per course-batch and
/// session type so surplus entries never count.
pub fn coverage(entries: &[ScheduleEntry], problem: &Problem) -> f64 {
    let required = problem.sessions_required();
    if required == 0 {
        return 1.0;
    }
    let placed = placed_hours(entries);
    let matched: u32 = problem
        .batches()
        .iter()
        .map(|batch| {
            let done = placed.get(&batch.id).copied().unwrap_or_default();
            batch.theory_hours.min(done.theory) + batch.lab_hours.min(done.lab)
        })
        .sum();
    f64::from(matched) / f64::from(required)
}

/// Checks `entries` against every rule and scores the result.
pub fn verify(entries: &[ScheduleEntry], problem: &Problem, config: &SchedulingConfig) -> Verification {
    let mut hard = teacher_conflicts(entries);
    hard.extend(room_conflicts(entries));
    hard.extend(batch_clashes(entries));
    hard.extend(coverage_gaps(entries, problem));
    hard.extend(time_bounds(entries, config));
    hard.extend(room_pools(entries, config));
    hard.extend(lab_blocks(entries));
    let soft = soft_issues(entries, problem, config);

    let coverage = coverage(entries, problem);
    let penalty = hard.len() as f64 * config.verifier.hard_penalty
        + soft.len() as f64 * config.verifier.soft_penalty;
    let score = (1.0 - penalty).clamp(0.0, 1.0) * coverage;
    let is_valid = hard.is_empty() && coverage >= config.verifier.valid_coverage;

    debug!(
        "Verification: score={:.3}, valid={}, hard={}, soft={}",
        score,
        is_valid,
        hard.len(),
        soft.len()
    );
    Verification {
        is_valid,
        score,
        coverage,
        hard,
        soft,
    }
}
