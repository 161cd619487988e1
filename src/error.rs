use thiserror::Error;

use crate::data::CourseBatchId;

/// Validation failures raised while building the scheduling model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("course-batch {0} requires no sessions")]
    EmptyRequirement(CourseBatchId),

    #[error("course-batch {id} asks for {hours} weekly hours, more than a week holds")]
    TooManyHours { id: CourseBatchId, hours: u32 },

    #[error("course-batch {0} is listed more than once")]
    DuplicateBatch(CourseBatchId),

    #[error("hour {0} is outside 0..24")]
    InvalidHour(u8),

    #[error("invalid grid configuration: {0}")]
    InvalidGrid(String),
}
