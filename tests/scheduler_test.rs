//! Leitner scheduling through the public API.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use studygym::core::interval::{DAY_MS, calculate_mastery, calculate_next_review_at, interval_days};
use studygym::core::leitner::FailurePolicy;
use studygym::core::models::AttemptResult;
use studygym::core::scheduler::{QueueStatus, Scheduler, get_difficulty};
use studygym::storage::progress::{MemoryProgressStore, ProgressStore};
use studygym::{TEST_NOW_MS, make_test_progress};

use common::logger::TestLogger;

fn scheduler(policy: FailurePolicy) -> (Scheduler, Arc<MemoryProgressStore>) {
    let store = Arc::new(MemoryProgressStore::new());
    (Scheduler::new(store.clone(), policy), store)
}

#[test]
fn mastery_and_intervals_follow_the_box_table() {
    let log = TestLogger::new("mastery_and_intervals_follow_the_box_table");
    let expected = [(1, 0, 1), (2, 25, 3), (3, 50, 7), (4, 75, 14), (5, 100, 30)];
    for (level, mastery, days) in expected {
        assert_eq!(calculate_mastery(level), mastery, "mastery of box {level}");
        assert_eq!(interval_days(level), days, "interval of box {level}");
        assert_eq!(
            calculate_next_review_at(level, TEST_NOW_MS),
            TEST_NOW_MS + days * DAY_MS
        );
    }
    // Levels outside the table use the level-1 interval.
    assert_eq!(interval_days(0), 1);
    assert_eq!(interval_days(9), 1);
    assert_eq!(calculate_mastery(0), 0);
    log.finish_ok();
}

#[test]
fn a_skill_climbs_to_elite_and_drops_on_a_miss() {
    let log = TestLogger::new("a_skill_climbs_to_elite_and_drops_on_a_miss");
    let (scheduler, store) = scheduler(FailurePolicy::Reset);

    let mut now = TEST_NOW_MS;
    let mut last = None;
    for _ in 0..6 {
        let p = scheduler.record_attempt("fractions", AttemptResult::Correct, now);
        now = p.next_review_at;
        last = Some(p);
    }
    let top = last.expect("attempted");
    assert_eq!(top.box_level, 5);
    assert!(top.is_elite());

    let dropped = scheduler.record_attempt("fractions", AttemptResult::Incorrect, now);
    assert_eq!(dropped.box_level, 1);
    assert_eq!(dropped.next_review_at, now + DAY_MS);
    assert_eq!(store.get_progress("fractions"), Some(dropped));
    log.finish_ok();
}

#[test]
fn box_three_transitions() {
    let log = TestLogger::new("box_three_transitions");
    for (result, policy, level, days) in [
        (AttemptResult::Correct, FailurePolicy::Reset, 4, 14),
        (AttemptResult::Incorrect, FailurePolicy::Reset, 1, 1),
        (AttemptResult::Incorrect, FailurePolicy::StepBack, 2, 3),
    ] {
        let (scheduler, store) = scheduler(policy);
        store.upsert_progress(make_test_progress("ratios", 3, TEST_NOW_MS));
        let p = scheduler.record_attempt("ratios", result, TEST_NOW_MS);
        assert_eq!(p.box_level, level, "{result:?} under {policy:?}");
        assert_eq!(p.next_review_at, TEST_NOW_MS + days * DAY_MS);
    }
    log.finish_ok();
}

#[test]
fn queue_orders_due_then_new_then_upcoming() {
    let log = TestLogger::new("queue_orders_due_then_new_then_upcoming");
    let (scheduler, store) = scheduler(FailurePolicy::Reset);
    store.upsert_progress(make_test_progress("later", 4, TEST_NOW_MS + 5 * DAY_MS));
    store.upsert_progress(make_test_progress("soon", 2, TEST_NOW_MS + DAY_MS));
    store.upsert_progress(make_test_progress("overdue", 3, TEST_NOW_MS - 2 * DAY_MS));
    store.upsert_progress(make_test_progress("just-due", 1, TEST_NOW_MS));

    let candidates = ["later", "soon", "overdue", "just-due", "fresh"];
    let queue = scheduler.queue(&candidates, TEST_NOW_MS);
    let order: Vec<(&str, QueueStatus)> = queue
        .iter()
        .map(|i| (i.skill_key.as_str(), i.status))
        .collect();
    assert_eq!(
        order,
        vec![
            ("overdue", QueueStatus::Due),
            ("just-due", QueueStatus::Due),
            ("fresh", QueueStatus::New),
            ("soon", QueueStatus::Upcoming),
            ("later", QueueStatus::Upcoming),
        ]
    );

    let session = scheduler.session(&candidates, TEST_NOW_MS, 2);
    assert_eq!(session.len(), 2);
    assert!(session.iter().all(|i| i.is_due()));
    log.finish_ok();
}

#[test]
fn difficulty_for_single_and_mixed_engines() {
    let log = TestLogger::new("difficulty_for_single_and_mixed_engines");
    let mut levels = BTreeMap::new();
    assert_eq!(get_difficulty(&levels, "mix-all"), 1);
    assert_eq!(get_difficulty(&levels, "fractions"), 1);

    levels.insert("fractions".to_string(), 4);
    levels.insert("decimals".to_string(), 1);
    assert_eq!(get_difficulty(&levels, "fractions"), 4);
    assert_eq!(get_difficulty(&levels, "ratios"), 1);
    // 2.5 rounds half up.
    assert_eq!(get_difficulty(&levels, "mix-numbers"), 3);

    let snapshot = levels.clone();
    let _ = get_difficulty(&levels, "mix-numbers");
    assert_eq!(levels, snapshot);
    log.finish_ok();
}
