//! Conflict-aware weekly timetabling for university course batches.

pub mod config;
pub mod data;
pub mod error;
pub mod grid;
pub mod overlap;
pub mod pipeline;
pub mod problem;
pub mod repair;
pub mod solver;
pub mod strategy;
pub mod verify;

pub use config::{SchedulerMode, SchedulingConfig, VerifierConfig};
pub use data::{CourseBatchId, Day, ScheduleEntry, SchedulingInput, SessionType, TimeSlot};
pub use error::ScheduleError;
pub use grid::SlotGrid;
pub use overlap::StudentOverlapIndex;
pub use pipeline::{Outcome, Pipeline, Summary};
pub use problem::{CourseBatch, Problem};
pub use repair::{GapRepair, RepairReport};
pub use solver::{ConflictAwareScheduler, ConsecutiveLabScheduler, PlacementPolicy, Proposal, Scheduler};
pub use strategy::{StrategyAdvisor, StrategyHint};
pub use verify::{verify, Verification, Violation, ViolationKind};
