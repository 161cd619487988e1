use itertools::Itertools;
use log::info;
use std::collections::{BTreeSet, HashMap};

use crate::data::{CourseBatchId, Enrollment, ScheduleEntry, TimeSlot};

#[derive(Debug, Clone, Default)]
pub struct StudentOverlapIndex {
    /// Keyed by the canonical (smaller, larger) pair.
    weights: HashMap<(CourseBatchId, CourseBatchId), u32>,
    adjacency: HashMap<CourseBatchId, BTreeSet<CourseBatchId>>,
    degrees: HashMap<CourseBatchId, u64>,
    students: usize,
}

fn pair_key(a: &CourseBatchId, b: &CourseBatchId) -> (CourseBatchId, CourseBatchId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl StudentOverlapIndex {
    pub fn build(enrollments: &[Enrollment]) -> Self {
        let mut index = StudentOverlapIndex {
            students: enrollments.len(),
            ..Default::default()
        };

        for enrollment in enrollments {
            // a student listed twice in one batch still counts once
            let taken: Vec<&CourseBatchId> = enrollment.courses.iter().unique().collect();
            for (a, b) in taken.into_iter().tuple_combinations() {
                *index.weights.entry(pair_key(a, b)).or_insert(0) += 1;
                index.adjacency.entry(a.clone()).or_default().insert(b.clone());
                index.adjacency.entry(b.clone()).or_default().insert(a.clone());
            }
        }

        for (cb, neighbors) in &index.adjacency {
            let degree = neighbors
                .iter()
                .map(|other| u64::from(index.conflict_weight(cb, other)))
                .sum();
            index.degrees.insert(cb.clone(), degree);
        }

        info!(
            "Built student overlap index: {} students, {} course-batches, {} conflicting pairs",
            index.students,
            index.adjacency.len(),
            index.weights.len()
        );
        index
    }

    /// Students enrolled in both `a` and `b`, zero when `a == b`.
    pub fn conflict_weight(&self, a: &CourseBatchId, b: &CourseBatchId) -> u32 {
        if a == b {
            return 0;
        }
        self.weights.get(&pair_key(a, b)).copied().unwrap_or(0)
    }

    pub fn weighted_degree(&self, cb: &CourseBatchId) -> u64 {
        self.degrees.get(cb).copied().unwrap_or(0)
    }

    pub fn neighbors(&self, cb: &CourseBatchId) -> impl Iterator<Item = &CourseBatchId> {
        self.adjacency.get(cb).into_iter().flatten()
    }

    pub fn pair_count(&self) -> usize {
        self.weights.len()
    }

    pub fn students(&self) -> usize {
        self.students
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Student double-bookings in a finished schedule: for every slot, the
    /// weights of all pairs of distinct course-batches placed there.
    pub fn realized_conflict(&self, entries: &[ScheduleEntry]) -> u64 {
        let by_slot: HashMap<TimeSlot, Vec<&CourseBatchId>> = entries
            .iter()
            .map(|e| (e.slot, &e.course_batch))
            .into_group_map();

        by_slot
            .values()
            .map(|placed| {
                placed
                    .iter()
                    .tuple_combinations()
                    .map(|(a, b)| u64::from(self.conflict_weight(a, b)))
                    .sum::<u64>()
            })
            .sum()
    }
}
