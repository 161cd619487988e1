use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::SchedulingConfig;
use crate::data::{CourseBatchId, Room, RoomId, RoomPool, ScheduleEntry, TeacherName, TimeSlot};
use crate::error::ScheduleError;
use crate::overlap::StudentOverlapIndex;

/// Occupancy for one scheduling run. Every run starts from a fresh grid.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    slots: Vec<TimeSlot>,
    universe: HashSet<TimeSlot>,
    regular_rooms: Vec<Room>,
    lab_rooms: Vec<Room>,
    teachers: HashMap<TimeSlot, HashSet<TeacherName>>,
    rooms: HashMap<TimeSlot, HashSet<RoomId>>,
    contents: HashMap<TimeSlot, BTreeMap<CourseBatchId, u32>>,
}

impl SlotGrid {
    pub fn new(config: &SchedulingConfig) -> Result<Self, ScheduleError> {
        config.validate()?;
        let slots = config.time_slots();
        Ok(Self {
            universe: slots.iter().copied().collect(),
            slots,
            regular_rooms: config.rooms(RoomPool::Regular),
            lab_rooms: config.rooms(RoomPool::Lab),
            teachers: HashMap::new(),
            rooms: HashMap::new(),
            contents: HashMap::new(),
        })
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Canonical order, or each day's hours reversed when `morning_first` is off.
    pub fn scan_order(&self, morning_first: bool) -> Vec<TimeSlot> {
        if morning_first {
            return self.slots.clone();
        }
        self.slots
            .chunk_by(|a, b| a.day == b.day)
            .flat_map(|day| day.iter().rev().copied())
            .collect()
    }

    pub fn rooms(&self, pool: RoomPool) -> &[Room] {
        match pool {
            RoomPool::Regular => &self.regular_rooms,
            RoomPool::Lab => &self.lab_rooms,
        }
    }

    pub fn contains(&self, slot: TimeSlot) -> bool {
        self.universe.contains(&slot)
    }

    pub fn is_teacher_free(&self, teacher: &str, slot: TimeSlot) -> bool {
        self.teachers
            .get(&slot)
            .is_none_or(|busy| !busy.contains(teacher))
    }

    pub fn is_room_free(&self, room: &str, slot: TimeSlot) -> bool {
        self.rooms.get(&slot).is_none_or(|taken| !taken.contains(room))
    }

    /// Whether `cb` already has a session at `slot`.
    pub fn holds(&self, cb: &CourseBatchId, slot: TimeSlot) -> bool {
        self.contents.get(&slot).is_some_and(|placed| placed.contains_key(cb))
    }

    pub fn first_free_room(&self, pool: RoomPool, slot: TimeSlot) -> Option<&Room> {
        self.rooms(pool)
            .iter()
            .find(|room| self.is_room_free(&room.id, slot))
    }

    /// First room of `pool` that is free in both slots.
    pub fn first_free_room_pair(&self, pool: RoomPool, a: TimeSlot, b: TimeSlot) -> Option<&Room> {
        self.rooms(pool)
            .iter()
            .find(|room| self.is_room_free(&room.id, a) && self.is_room_free(&room.id, b))
    }

    pub fn occupants(&self, slot: TimeSlot) -> impl Iterator<Item = &CourseBatchId> {
        self.contents.get(&slot).into_iter().flat_map(|m| m.keys())
    }

    /// Students of `cb` that would be double-booked by placing it at `slot`.
    pub fn marginal_cost(&self, overlap: &StudentOverlapIndex, cb: &CourseBatchId, slot: TimeSlot) -> u64 {
        self.occupants(slot)
            .map(|other| u64::from(overlap.conflict_weight(cb, other)))
            .sum()
    }

    /// The same hour one later on the same day, if the grid has it.
    pub fn consecutive_pair(&self, slot: TimeSlot) -> Option<TimeSlot> {
        let next = TimeSlot {
            day: slot.day,
            hour: slot.hour.checked_add(1)?,
        };
        self.contains(next).then_some(next)
    }

    /// Records an entry. Callers check teacher and room availability first.
    pub fn place(&mut self, entry: &ScheduleEntry) {
        debug_assert!(self.is_teacher_free(&entry.teacher, entry.slot));
        debug_assert!(self.is_room_free(&entry.room, entry.slot));

        self.teachers
            .entry(entry.slot)
            .or_default()
            .insert(entry.teacher.clone());
        self.rooms.entry(entry.slot).or_default().insert(entry.room.clone());
        *self
            .contents
            .entry(entry.slot)
            .or_default()
            .entry(entry.course_batch.clone())
            .or_insert(0) += 1;
    }

    pub fn remove(&mut self, entry: &ScheduleEntry) {
        if let Some(busy) = self.teachers.get_mut(&entry.slot) {
            busy.remove(&entry.teacher);
        }
        if let Some(taken) = self.rooms.get_mut(&entry.slot) {
            taken.remove(&entry.room);
        }
        if let Some(placed) = self.contents.get_mut(&entry.slot) {
            if let Some(count) = placed.get_mut(&entry.course_batch) {
                *count -= 1;
                if *count == 0 {
                    placed.remove(&entry.course_batch);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.values().all(HashSet::is_empty)
    }
}
