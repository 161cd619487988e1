use serde_json::json;
use std::collections::HashSet;

use timetable_solver::data::{BatchInput, CourseInput, Enrollment, TeacherInput};
use timetable_solver::solver::placed_hours;
use timetable_solver::{
    ConflictAwareScheduler, CourseBatch, CourseBatchId, Day, GapRepair, Pipeline, PlacementPolicy, Problem,
    SchedulerMode, SchedulingConfig, SchedulingInput, Scheduler, SessionType, SlotGrid, StrategyHint,
    StudentOverlapIndex, TimeSlot, ViolationKind,
};

fn cb(course: &str) -> CourseBatchId {
    CourseBatchId::new(course, "B1")
}

fn shared(courses: &[&str], students: usize) -> Vec<Enrollment> {
    (0..students)
        .map(|i| Enrollment {
            student: Some(format!("S{i}")),
            courses: courses.iter().map(|c| cb(c)).collect(),
        })
        .collect()
}

fn grid_config(days: Vec<Day>, start_hour: u8, end_hour: u8, regular: u32, labs: u32) -> SchedulingConfig {
    SchedulingConfig {
        days,
        start_hour,
        end_hour,
        regular_rooms: regular,
        lab_rooms: labs,
        ..SchedulingConfig::default()
    }
}

/// Six courses with two batches each, labs on every other course.
fn department() -> SchedulingInput {
    let courses = (0..6)
        .map(|c| CourseInput {
            code: format!("C{c}"),
            theory_hours: 3,
            lab_hours: if c % 2 == 0 { 2 } else { 0 },
            batches: (1..=2)
                .map(|b| BatchInput {
                    id: format!("B{b}"),
                    students: 40,
                    teacher: Some(format!("T{}", (c + b) % 4)),
                })
                .collect(),
        })
        .collect();
    let teachers = (0..5)
        .map(|t| TeacherInput {
            name: format!("T{t}"),
            load_hours: t * 3,
        })
        .collect();
    let enrollments = (0..60)
        .map(|s: usize| Enrollment {
            student: Some(format!("S{s}")),
            courses: [s % 6, (s + 1) % 6, (s + 3) % 6]
                .into_iter()
                .map(|c| CourseBatchId::new(format!("C{c}"), format!("B{}", s % 2 + 1)))
                .collect(),
        })
        .collect();
    SchedulingInput {
        courses,
        teachers,
        enrollments,
    }
}

fn scarce() -> SchedulingConfig {
    grid_config(vec![Day::Monday, Day::Tuesday], 10, 15, 2, 1)
}

#[test]
fn two_sharing_batches_never_meet() {
    let mut problem = Problem::default();
    problem.push(CourseBatch::new(cb("A"), 2, 0, "T1", 10).unwrap()).unwrap();
    problem.push(CourseBatch::new(cb("B"), 2, 0, "T2", 10).unwrap()).unwrap();
    let enrollments = shared(&["A", "B"], 10);
    let config = grid_config(vec![Day::Monday, Day::Tuesday], 10, 12, 1, 0);

    let outcome = Pipeline::new(&problem, &config, &enrollments)
        .unwrap()
        .run(&StrategyHint::default())
        .unwrap();

    assert_eq!(outcome.proposal.sessions_placed, 4);
    assert_eq!(outcome.proposal.total_conflict, 0);
    let slots: HashSet<TimeSlot> = outcome.proposal.entries.iter().map(|e| e.slot).collect();
    assert_eq!(slots.len(), 4);
    assert!(outcome.verification.is_valid);
}

#[test]
fn three_way_overlap_with_two_slots_leaves_one_short() {
    let mut problem = Problem::default();
    for (course, teacher) in [("A", "T1"), ("B", "T2"), ("C", "T3")] {
        problem.push(CourseBatch::new(cb(course), 1, 0, teacher, 10).unwrap()).unwrap();
    }
    let enrollments = shared(&["A", "B", "C"], 5);
    let config = grid_config(vec![Day::Monday], 10, 12, 1, 0);

    let outcome = Pipeline::new(&problem, &config, &enrollments)
        .unwrap()
        .run(&StrategyHint::default())
        .unwrap();

    assert_eq!(outcome.proposal.sessions_placed, 2);
    assert_eq!(outcome.proposal.total_conflict, 0);
    let missing: u32 = outcome.proposal.shortfalls.iter().map(|s| s.total()).sum();
    assert_eq!(missing, 1);
    assert_eq!(outcome.repair.unresolved.len(), 1);

    assert!(!outcome.verification.hard.is_empty());
    assert!(!outcome.verification.is_valid);
    assert!(outcome.verification.score < 1.0);
}

#[test]
fn lab_pair_skips_hour_where_teacher_is_busy() {
    let mut problem = Problem::default();
    problem.push(CourseBatch::new(cb("Other"), 1, 0, "Ada", 30).unwrap()).unwrap();
    problem.push(CourseBatch::new(cb("Lab"), 0, 2, "Ada", 30).unwrap()).unwrap();
    let config = grid_config(vec![Day::Monday, Day::Tuesday], 10, 13, 1, 1);

    let outcome = Pipeline::new(&problem, &config, &[])
        .unwrap()
        .run(&StrategyHint::default())
        .unwrap();

    let other: Vec<TimeSlot> = outcome.proposal.entries_for(&cb("Other")).map(|e| e.slot).collect();
    assert_eq!(other, vec![TimeSlot { day: Day::Monday, hour: 10 }]);

    let lab: Vec<(TimeSlot, &str)> = outcome
        .proposal
        .entries_for(&cb("Lab"))
        .map(|e| (e.slot, e.room.as_str()))
        .collect();
    assert_eq!(
        lab,
        vec![
            (TimeSlot { day: Day::Monday, hour: 11 }, "LAB1"),
            (TimeSlot { day: Day::Monday, hour: 12 }, "LAB1"),
        ]
    );
}

#[test]
fn gap_repair_moves_whole_batch_to_the_only_free_teacher() {
    let mut problem = Problem::default();
    problem.push(CourseBatch::new(cb("AdaBusy"), 4, 0, "Ada", 30).unwrap()).unwrap();
    problem.push(CourseBatch::new(cb("LinusBusy"), 4, 0, "Linus", 30).unwrap()).unwrap();
    problem.push(CourseBatch::new(cb("Short"), 4, 0, "Ada", 30).unwrap()).unwrap();
    // Linus is lighter but has no free hour left
    let problem = problem.with_teacher_load("Linus", 0).with_teacher_load("Grace", 8);
    let config = grid_config(vec![Day::Monday], 10, 14, 3, 0);
    let overlap = StudentOverlapIndex::default();

    let mut grid = SlotGrid::new(&config).unwrap();
    let mut proposal = ConflictAwareScheduler.schedule(&problem, &overlap, &mut grid, &StrategyHint::default());
    assert_eq!(proposal.shortfalls.len(), 1);
    assert_eq!(proposal.shortfalls[0].theory_missing, 4);

    let report = GapRepair::new(PlacementPolicy::MinimizeConflict).repair(&problem, &overlap, &mut grid, &mut proposal);

    assert_eq!(report.reassigned.len(), 1);
    assert_eq!(report.reassigned[0].from, "Ada");
    assert_eq!(report.reassigned[0].to, "Grace");
    assert_eq!(report.reassigned[0].sessions, 4);
    let teachers: Vec<&str> = proposal.entries_for(&cb("Short")).map(|e| e.teacher.as_str()).collect();
    assert_eq!(teachers, vec!["Grace"; 4]);
    assert!(proposal.shortfalls.is_empty());
    assert!(!proposal.entries.iter().any(|e| e.teacher == "Linus" && e.course_batch == cb("Short")));
}

#[test]
fn identical_runs_produce_identical_schedules() {
    let input = department();
    let problem = Problem::from_input(&input);
    let config = scarce();

    let first = Pipeline::new(&problem, &config, &input.enrollments)
        .unwrap()
        .run(&StrategyHint::default())
        .unwrap();
    let second = Pipeline::new(&problem, &config, &input.enrollments)
        .unwrap()
        .run(&StrategyHint::default())
        .unwrap();

    assert_eq!(
        serde_json::to_string(&first.proposal.entries).unwrap(),
        serde_json::to_string(&second.proposal.entries).unwrap()
    );
}

#[test]
fn schedules_never_double_book_teachers_or_rooms() {
    let input = department();
    let problem = Problem::from_input(&input);

    for config in [SchedulingConfig::default(), scarce()] {
        for mode in [SchedulerMode::ConflictAware, SchedulerMode::ConflictFree] {
            let config = SchedulingConfig { mode, ..config.clone() };
            let pipeline = Pipeline::new(&problem, &config, &input.enrollments).unwrap();
            for hint in StrategyHint::all() {
                let outcome = pipeline.run(&hint).unwrap();
                let entries = &outcome.proposal.entries;

                let teacher_slots: HashSet<(&str, TimeSlot)> =
                    entries.iter().map(|e| (e.teacher.as_str(), e.slot)).collect();
                let room_slots: HashSet<(&str, TimeSlot)> = entries.iter().map(|e| (e.room.as_str(), e.slot)).collect();
                assert_eq!(teacher_slots.len(), entries.len());
                assert_eq!(room_slots.len(), entries.len());

                let counts = outcome.verification.counts();
                for kind in [
                    ViolationKind::TeacherConflict,
                    ViolationKind::RoomConflict,
                    ViolationKind::BatchClash,
                    ViolationKind::InvalidDay,
                    ViolationKind::InvalidTime,
                    ViolationKind::WrongRoomPool,
                    ViolationKind::BrokenLabBlock,
                ] {
                    assert!(!counts.contains_key(&kind), "{kind} in {hint:?}");
                }

                assert_eq!(
                    outcome.proposal.total_conflict,
                    pipeline.overlap().realized_conflict(entries)
                );
                let score = outcome.verification.score;
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }
}

#[test]
fn lab_hours_come_in_consecutive_pairs() {
    let input = department();
    let problem = Problem::from_input(&input);
    let config = scarce();
    let outcome = Pipeline::new(&problem, &config, &input.enrollments)
        .unwrap()
        .run(&StrategyHint::default())
        .unwrap();

    let labs: Vec<_> = outcome
        .proposal
        .entries
        .iter()
        .filter(|e| e.session == SessionType::Lab)
        .collect();
    assert_eq!(labs.len() % 2, 0);
    for pair in labs.chunks(2) {
        assert_eq!(pair[0].course_batch, pair[1].course_batch);
        assert_eq!(pair[0].room, pair[1].room);
        assert!(pair[0].room.starts_with("LAB"));
        assert_eq!(pair[0].slot.day, pair[1].slot.day);
        assert_eq!(pair[0].slot.hour + 1, pair[1].slot.hour);
    }
}

#[test]
fn strict_mode_never_double_books_students() {
    let input = department();
    let problem = Problem::from_input(&input);
    let config = SchedulingConfig {
        mode: SchedulerMode::ConflictFree,
        ..scarce()
    };
    let pipeline = Pipeline::new(&problem, &config, &input.enrollments).unwrap();
    let outcome = pipeline.run(&StrategyHint::default()).unwrap();

    assert_eq!(outcome.proposal.total_conflict, 0);
    assert_eq!(pipeline.overlap().realized_conflict(&outcome.proposal.entries), 0);
}

#[test]
fn repair_never_lowers_coverage_of_any_batch() {
    let input = department();
    let problem = Problem::from_input(&input);
    let config = scarce();
    let overlap = StudentOverlapIndex::build(&input.enrollments);

    let mut grid = SlotGrid::new(&config).unwrap();
    let mut proposal = ConflictAwareScheduler.schedule(&problem, &overlap, &mut grid, &StrategyHint::default());
    assert!(!proposal.shortfalls.is_empty());
    let before = proposal.entries.clone();

    GapRepair::new(PlacementPolicy::MinimizeConflict).repair(&problem, &overlap, &mut grid, &mut proposal);

    let placed_before = placed_hours(&before);
    let placed_after = placed_hours(&proposal.entries);
    for batch in problem.batches() {
        let was = placed_before.get(&batch.id).copied().unwrap_or_default();
        let is = placed_after.get(&batch.id).copied().unwrap_or_default();
        for session in [SessionType::Theory, SessionType::Lab] {
            assert!(is.of(session) >= was.of(session), "{} {} lost hours", batch.id, session);
        }
    }
}

#[test]
fn conflict_weights_are_symmetric() {
    let input = department();
    let overlap = StudentOverlapIndex::build(&input.enrollments);
    let ids: Vec<CourseBatchId> = Problem::from_input(&input).batches().iter().map(|b| b.id.clone()).collect();

    for a in &ids {
        assert_eq!(overlap.conflict_weight(a, a), 0);
        for b in &ids {
            assert_eq!(overlap.conflict_weight(a, b), overlap.conflict_weight(b, a));
        }
    }
}

#[test]
fn json_input_runs_end_to_end() {
    let input: SchedulingInput = serde_json::from_value(json!({
        "courses": [
            { "code": "CS101", "theoryHours": 3, "labHours": 2, "batches": [{ "id": "B1", "teacher": "Ada" }] },
            { "code": "MA201", "theoryHours": 2, "batches": [{ "id": "B1" }] },
            { "code": "PH100", "theoryHours": 2, "labHours": 1, "batches": [{ "id": "B1", "teacher": "Ada" }] }
        ],
        "teachers": [{ "name": "Ada", "loadHours": 6 }],
        "enrollments": [
            { "student": "S1", "courses": [{ "course": "CS101", "batch": "B1" }, { "course": "MA201", "batch": "B1" }] }
        ]
    }))
    .unwrap();
    let problem = Problem::from_input(&input);
    let config = SchedulingConfig::default();

    let outcome = Pipeline::new(&problem, &config, &input.enrollments)
        .unwrap()
        .best_of(&StrategyHint::all())
        .unwrap()
        .unwrap();

    assert!(problem.skipped().is_empty());
    assert_eq!(outcome.proposal.sessions_required, 10);
    assert!(outcome.proposal.shortfalls.is_empty());
    assert!(outcome.verification.is_valid);

    let ma: Vec<(&str, TimeSlot)> = outcome
        .proposal
        .entries_for(&CourseBatchId::new("MA201", "B1"))
        .map(|e| (e.teacher.as_str(), e.slot))
        .collect();
    assert_eq!(ma.len(), 2);
    assert!(ma.iter().all(|(teacher, _)| *teacher == "TBA"));
    assert_ne!(ma[0].1, ma[1].1);

    // one odd lab hour still takes a full block, theory is kept
    let ph = CourseBatchId::new("PH100", "B1");
    let sessions: Vec<SessionType> = outcome.proposal.entries_for(&ph).map(|e| e.session).collect();
    assert_eq!(sessions.iter().filter(|s| **s == SessionType::Theory).count(), 2);
    assert_eq!(sessions.iter().filter(|s| **s == SessionType::Lab).count(), 2);
}

#[test]
fn unassigned_batch_never_meets_twice_in_one_hour() {
    let input: SchedulingInput = serde_json::from_value(json!({
        "courses": [{ "code": "GE100", "theoryHours": 3, "batches": [{ "id": "B1" }] }]
    }))
    .unwrap();
    let problem = Problem::from_input(&input);
    let config = grid_config(vec![Day::Monday, Day::Tuesday], 10, 14, 3, 0);

    let outcome = Pipeline::new(&problem, &config, &input.enrollments)
        .unwrap()
        .run(&StrategyHint::default())
        .unwrap();

    let distinct: HashSet<TimeSlot> = outcome.proposal.entries.iter().map(|e| e.slot).collect();
    assert_eq!(distinct.len(), 3);
    assert!(!outcome.verification.counts().contains_key(&ViolationKind::BatchClash));
    assert!(outcome.verification.is_valid);
}
