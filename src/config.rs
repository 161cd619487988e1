use serde::{Deserialize, Serialize};

use crate::data::{Day, Hour, Room, RoomPool, TimeSlot};
use crate::error::ScheduleError;

/// Which placement policy drives the greedy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerMode {
    #[default]
    ConflictAware,
    ConflictFree,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingConfig {
    pub days: Vec<Day>,
    /// First teaching hour, inclusive.
    pub start_hour: Hour,
    /// Last teaching hour, exclusive.
    pub end_hour: Hour,
    pub regular_rooms: u32,
    pub lab_rooms: u32,
    pub room_capacity: u32,
    pub mode: SchedulerMode,
    pub gap_repair: bool,
    pub verifier: VerifierConfig,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            days: Day::ALL.to_vec(),
            start_hour: 10,
            end_hour: 18,
            regular_rooms: 21,
            lab_rooms: 7,
            room_capacity: 90,
            mode: SchedulerMode::default(),
            gap_repair: true,
            verifier: VerifierConfig::default(),
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.days.is_empty() {
            return Err(ScheduleError::InvalidGrid("no teaching days".to_string()));
        }
        for (i, day) in self.days.iter().enumerate() {
            if self.days[..i].contains(day) {
                return Err(ScheduleError::InvalidGrid(format!("{day} is listed twice")));
            }
        }
        if self.end_hour > 24 {
            return Err(ScheduleError::InvalidHour(self.end_hour));
        }
        if self.start_hour >= self.end_hour {
            return Err(ScheduleError::InvalidGrid(format!(
                "hour range {}..{} is empty",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    pub fn hours_per_day(&self) -> u32 {
        u32::from(self.end_hour.saturating_sub(self.start_hour))
    }

    pub fn total_slots(&self) -> u32 {
        self.days.len() as u32 * self.hours_per_day()
    }

    pub fn contains(&self, slot: TimeSlot) -> bool {
        self.days.contains(&slot.day) && (self.start_hour..self.end_hour).contains(&slot.hour)
    }

    /// All slots in scan order: configured day order, hours ascending.
    pub fn time_slots(&self) -> Vec<TimeSlot> {
        self.days
            .iter()
            .flat_map(|&day| (self.start_hour..self.end_hour).map(move |hour| TimeSlot { day, hour }))
            .collect()
    }

    /// Regular rooms are `R1..Rn`, lab rooms `LAB1..LABm`.
    pub fn rooms(&self, pool: RoomPool) -> Vec<Room> {
        let (prefix, count) = match pool {
            RoomPool::Regular => ("R", self.regular_rooms),
            RoomPool::Lab => ("LAB", self.lab_rooms),
        };
        (1..=count)
            .map(|i| Room {
                id: format!("{prefix}{i}"),
                capacity: self.room_capacity,
                pool,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifierConfig {
    pub hard_penalty: f64,
    pub soft_penalty: f64,
    /// Coverage a schedule needs, on top of zero hard violations, to be valid.
    pub valid_coverage: f64,
    pub max_teacher_hours_per_day: u32,
    pub min_distinct_days: u32,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            hard_penalty: 0.1,
            soft_penalty: 0.02,
            valid_coverage: 0.95,
            max_teacher_hours_per_day: 6,
            min_distinct_days: 3,
        }
    }
}
