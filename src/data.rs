use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ScheduleError;

// Type aliases for clarity
pub type RoomId = String;
pub type TeacherName = String;
pub type Hour = u8;

/// Teacher recorded for batches that come without an assignment.
pub const UNASSIGNED_TEACHER: &str = "TBA";

/// Enrolled students assumed for a batch whose size is unknown.
pub const DEFAULT_BATCH_SIZE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        };
        f.write_str(name)
    }
}

/// A one-hour slot in the weekly grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct TimeSlot {
    pub day: Day,
    pub hour: Hour,
}

impl TimeSlot {
    pub fn new(day: Day, hour: Hour) -> Result<Self, ScheduleError> {
        if hour >= 24 {
            return Err(ScheduleError::InvalidHour(hour));
        }
        Ok(Self { day, hour })
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:00-{}:00", self.day, self.hour, u32::from(self.hour) + 1)
    }
}

/// Which pool a room belongs to. The pools never lend rooms to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomPool {
    Regular,
    Lab,
}

/// Represents a physical room with a given capacity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub capacity: u32,
    pub pool: RoomPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum SessionType {
    Theory,
    Lab,
}

impl SessionType {
    pub fn pool(self) -> RoomPool {
        match self {
            SessionType::Theory => RoomPool::Regular,
            SessionType::Lab => RoomPool::Lab,
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Theory => f.write_str("theory"),
            SessionType::Lab => f.write_str("lab"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct CourseBatchId {
    pub course: String,
    pub batch: String,
}

impl CourseBatchId {
    pub fn new(course: impl Into<String>, batch: impl Into<String>) -> Self {
        Self {
            course: course.into(),
            batch: batch.into(),
        }
    }
}

impl fmt::Display for CourseBatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.course, self.batch)
    }
}

/// One scheduled contact hour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub course_batch: CourseBatchId,
    pub slot: TimeSlot,
    pub room: RoomId,
    pub teacher: TeacherName,
    pub session: SessionType,
    pub students: u32,
}

/// A batch of a course as it arrives from the input data.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInput {
    pub id: String,
    #[serde(default = "default_batch_size")]
    pub students: u32,
    #[serde(default)]
    pub teacher: Option<TeacherName>,
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub code: String,
    #[serde(default)]
    pub theory_hours: u32,
    #[serde(default)]
    pub lab_hours: u32,
    pub batches: Vec<BatchInput>,
}

/// Total teaching hours already carried by a teacher.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherInput {
    pub name: TeacherName,
    #[serde(default)]
    pub load_hours: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(default)]
    pub student: Option<String>,
    pub courses: Vec<CourseBatchId>,
}

/// The complete input for the scheduling problem.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingInput {
    pub courses: Vec<CourseInput>,
    #[serde(default)]
    pub teachers: Vec<TeacherInput>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}
