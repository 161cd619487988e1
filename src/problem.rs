use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;

use crate::data::{
    CourseBatchId, SchedulingInput, SessionType, TeacherName, UNASSIGNED_TEACHER,
};
use crate::error::ScheduleError;

/// Upper bound on the weekly hours of one course-batch: five days of 24 hours.
pub const MAX_WEEKLY_HOURS: u32 = 120;

/// One batch of one course together with its weekly requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBatch {
    pub id: CourseBatchId,
    pub theory_hours: u32,
    pub lab_hours: u32,
    pub teacher: TeacherName,
    pub students: u32,
}

impl CourseBatch {
    pub fn new(
        id: CourseBatchId,
        theory_hours: u32,
        lab_hours: u32,
        teacher: impl Into<TeacherName>,
        students: u32,
    ) -> Result<Self, ScheduleError> {
        if theory_hours == 0 && lab_hours == 0 {
            return Err(ScheduleError::EmptyRequirement(id));
        }
        let hours = theory_hours.saturating_add(lab_hours);
        if hours > MAX_WEEKLY_HOURS {
            return Err(ScheduleError::TooManyHours { id, hours });
        }
        Ok(Self {
            id,
            theory_hours,
            lab_hours,
            teacher: teacher.into(),
            students,
        })
    }

    pub fn total_hours(&self) -> u32 {
        self.theory_hours + self.lab_hours
    }

    pub fn required(&self, session: SessionType) -> u32 {
        match session {
            SessionType::Theory => self.theory_hours,
            SessionType::Lab => self.lab_hours,
        }
    }
}

/// Coarse description of a problem, handed to strategy advisors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSummary {
    pub courses: usize,
    pub course_batches: usize,
    pub teachers: usize,
    pub theory_sessions: u32,
    pub lab_sessions: u32,
    pub regular_rooms: u32,
    pub lab_rooms: u32,
    pub slots: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Problem {
    batches: Vec<CourseBatch>,
    index: HashMap<CourseBatchId, usize>,
    teachers: Vec<TeacherName>,
    loads: HashMap<TeacherName, u32>,
    skipped: Vec<ScheduleError>,
}

impl Problem {
    /// Builds the model. Malformed batches are skipped and kept in
    /// [`Problem::skipped`], teachers without a load record count as zero load.
    pub fn from_input(input: &SchedulingInput) -> Self {
        let mut problem = Problem::default();

        for teacher in &input.teachers {
            problem.add_teacher(&teacher.name);
            problem.loads.insert(teacher.name.clone(), teacher.load_hours);
        }

        for course in &input.courses {
            for batch in &course.batches {
                let id = CourseBatchId::new(course.code.clone(), batch.id.clone());
                let teacher = batch
                    .teacher
                    .clone()
                    .unwrap_or_else(|| UNASSIGNED_TEACHER.to_string());
                let built = CourseBatch::new(
                    id,
                    course.theory_hours,
                    course.lab_hours,
                    teacher,
                    batch.students,
                );
                match built {
                    Ok(batch) => {
                        if let Err(e) = problem.push(batch) {
                            warn!("Skipping input: {}", e);
                            problem.skipped.push(e);
                        }
                    }
                    Err(e) => {
                        warn!("Skipping input: {}", e);
                        problem.skipped.push(e);
                    }
                }
            }
        }

        debug!(
            "Built problem with {} course-batches, {} teachers, {} skipped",
            problem.batches.len(),
            problem.teachers.len(),
            problem.skipped.len()
        );
        problem
    }

    /// Appends a course-batch, keeping input order.
    pub fn push(&mut self, batch: CourseBatch) -> Result<(), ScheduleError> {
        if self.index.contains_key(&batch.id) {
            return Err(ScheduleError::DuplicateBatch(batch.id));
        }
        self.add_teacher(&batch.teacher);
        self.index.insert(batch.id.clone(), self.batches.len());
        self.batches.push(batch);
        Ok(())
    }

    fn add_teacher(&mut self, name: &str) {
        if name != UNASSIGNED_TEACHER && !self.teachers.iter().any(|t| t == name) {
            self.teachers.push(name.to_string());
        }
    }

    pub fn with_teacher_load(mut self, name: &str, hours: u32) -> Self {
        self.add_teacher(name);
        self.loads.insert(name.to_string(), hours);
        self
    }

    pub fn batches(&self) -> &[CourseBatch] {
        &self.batches
    }

    pub fn batch(&self, id: &CourseBatchId) -> Option<&CourseBatch> {
        self.index.get(id).map(|&i| &self.batches[i])
    }

    /// Known teachers: load records first, then teachers first seen on a batch.
    pub fn teachers(&self) -> &[TeacherName] {
        &self.teachers
    }

    pub fn teacher_load(&self, name: &str) -> u32 {
        self.loads.get(name).copied().unwrap_or(0)
    }

    /// Recorded load plus the hours of every course-batch assigned to `name`.
    pub fn workload(&self, name: &str) -> u32 {
        self.batches
            .iter()
            .filter(|b| b.teacher == name)
            .fold(self.teacher_load(name), |load, b| load.saturating_add(b.total_hours()))
    }

    pub fn skipped(&self) -> &[ScheduleError] {
        &self.skipped
    }

    pub fn sessions_required(&self) -> u32 {
        self.batches.iter().map(CourseBatch::total_hours).sum()
    }

    pub fn summary(&self, config: &crate::config::SchedulingConfig) -> ProblemSummary {
        let mut courses: Vec<&str> = self.batches.iter().map(|b| b.id.course.as_str()).collect();
        courses.sort_unstable();
        courses.dedup();
        ProblemSummary {
            courses: courses.len(),
            course_batches: self.batches.len(),
            teachers: self.teachers.len(),
            theory_sessions: self.batches.iter().map(|b| b.theory_hours).sum(),
            lab_sessions: self.batches.iter().map(|b| b.lab_hours).sum(),
            regular_rooms: config.regular_rooms,
            lab_rooms: config.lab_rooms,
            slots: config.total_slots(),
        }
    }
}
