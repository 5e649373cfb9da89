//! Practice scheduling over the progress store.
//!
//! Items are presented in three bands:
//! 1. **Due**: tracked skills whose review time has passed.
//! 2. **New**: skills with no record yet (box 1, immediately due).
//! 3. **Upcoming**: tracked skills not yet due.
//!
//! Within a band, earlier `next_review_at` goes first, then skill key order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::interval::{MIN_BOX_LEVEL, calculate_mastery};
use crate::core::leitner::{FailurePolicy, apply_attempt};
use crate::core::models::{AttemptResult, SkillProgress};
use crate::storage::progress::ProgressStore;

/// Engine ids with this prefix are composites of every tracked skill.
pub const MIX_PREFIX: &str = "mix-";

/// Difficulty level for a practice engine.
///
/// A `mix-` engine gets the rounded average of all tracked levels (1 when
/// nothing is tracked). Any other engine gets its own level, or 1.
#[must_use]
pub fn get_difficulty(levels: &BTreeMap<String, u8>, engine_id: &str) -> u8 {
    if engine_id.starts_with(MIX_PREFIX) {
        if levels.is_empty() {
            return MIN_BOX_LEVEL;
        }
        let sum: usize = levels.values().map(|&l| usize::from(l)).sum();
        let n = levels.len();
        // Integer round-half-up of sum / n.
        let avg = (2 * sum + n) / (2 * n);
        return u8::try_from(avg).unwrap_or(u8::MAX);
    }
    levels.get(engine_id).copied().unwrap_or(MIN_BOX_LEVEL)
}

/// Which band an item was placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Due,
    New,
    Upcoming,
}

impl QueueStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Due => "due",
            Self::New => "new",
            Self::Upcoming => "upcoming",
        }
    }
}

/// One entry of the practice queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledItem {
    pub skill_key: String,
    pub status: QueueStatus,
    pub box_level: u8,
    /// `None` for skills that were never attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_at: Option<i64>,
    pub mastery: u8,
}

impl ScheduledItem {
    fn from_progress(progress: &SkillProgress, now_ms: i64) -> Self {
        Self {
            skill_key: progress.skill_key.clone(),
            status: if progress.is_due(now_ms) {
                QueueStatus::Due
            } else {
                QueueStatus::Upcoming
            },
            box_level: progress.box_level,
            next_review_at: Some(progress.next_review_at),
            mastery: progress.mastery(),
        }
    }

    fn fresh(skill_key: &str) -> Self {
        Self {
            skill_key: skill_key.to_string(),
            status: QueueStatus::New,
            box_level: MIN_BOX_LEVEL,
            next_review_at: None,
            mastery: calculate_mastery(MIN_BOX_LEVEL),
        }
    }

    /// Whether the item may be practised now. New items always may.
    #[must_use]
    pub const fn is_due(&self) -> bool {
        matches!(self.status, QueueStatus::Due | QueueStatus::New)
    }
}

fn queue_order(a: &ScheduledItem, b: &ScheduledItem) -> Ordering {
    a.status
        .cmp(&b.status)
        .then_with(|| a.next_review_at.cmp(&b.next_review_at))
        .then_with(|| a.skill_key.cmp(&b.skill_key))
}

/// Leitner scheduler bound to a progress store.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn ProgressStore>,
    policy: FailurePolicy,
}

impl Scheduler {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressStore>, policy: FailurePolicy) -> Self {
        Self { store, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ProgressStore> {
        &self.store
    }

    /// Order `candidates` for practice. An empty slice means every tracked skill.
    #[must_use]
    pub fn queue<S: AsRef<str>>(&self, candidates: &[S], now_ms: i64) -> Vec<ScheduledItem> {
        let mut items: Vec<ScheduledItem> = if candidates.is_empty() {
            self.store
                .all_progress()
                .iter()
                .map(|p| ScheduledItem::from_progress(p, now_ms))
                .collect()
        } else {
            let keys: BTreeSet<&str> = candidates.iter().map(AsRef::as_ref).collect();
            keys.into_iter()
                .map(|key| {
                    self.store.get_progress(key).map_or_else(
                        || ScheduledItem::fresh(key),
                        |p| ScheduledItem::from_progress(&p, now_ms),
                    )
                })
                .collect()
        };
        items.sort_by(queue_order);
        items
    }

    /// The single item to present next.
    #[must_use]
    pub fn next_item<S: AsRef<str>>(&self, candidates: &[S], now_ms: i64) -> Option<ScheduledItem> {
        self.queue(candidates, now_ms).into_iter().next()
    }

    /// The first `size` items of the queue.
    #[must_use]
    pub fn session<S: AsRef<str>>(
        &self,
        candidates: &[S],
        now_ms: i64,
        size: usize,
    ) -> Vec<ScheduledItem> {
        let mut queue = self.queue(candidates, now_ms);
        queue.truncate(size);
        queue
    }

    /// Tracked skills that are due, most overdue first.
    #[must_use]
    pub fn due_items(&self, now_ms: i64) -> Vec<SkillProgress> {
        let mut due: Vec<_> = self
            .store
            .all_progress()
            .into_iter()
            .filter(|p| p.is_due(now_ms))
            .collect();
        due.sort_by(|a, b| {
            a.next_review_at
                .cmp(&b.next_review_at)
                .then_with(|| a.skill_key.cmp(&b.skill_key))
        });
        due
    }

    /// Current box level of every tracked skill.
    #[must_use]
    pub fn levels(&self) -> BTreeMap<String, u8> {
        self.store
            .all_progress()
            .into_iter()
            .map(|p| (p.skill_key, p.box_level))
            .collect()
    }

    /// Difficulty for an engine given the current levels.
    #[must_use]
    pub fn difficulty(&self, engine_id: &str) -> u8 {
        get_difficulty(&self.levels(), engine_id)
    }

    /// Apply a graded attempt and write the new record to the store.
    pub fn record_attempt(
        &self,
        skill_key: &str,
        result: AttemptResult,
        attempt_time_ms: i64,
    ) -> SkillProgress {
        let existing = self.store.get_progress(skill_key);
        let next = apply_attempt(
            skill_key,
            existing.as_ref(),
            result,
            attempt_time_ms,
            self.policy,
        );
        debug!(
            skill = skill_key,
            from = existing.as_ref().map_or(MIN_BOX_LEVEL, |p| p.box_level),
            to = next.box_level,
            result = result.as_str(),
            "Leitner transition"
        );
        self.store.upsert_progress(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interval::DAY_MS;
    use crate::storage::progress::MemoryProgressStore;

    const NOW: i64 = 1_700_000_000_000;

    fn levels(pairs: &[(&str, u8)]) -> BTreeMap<String, u8> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    fn scheduler_with(records: Vec<SkillProgress>) -> Scheduler {
        Scheduler::new(
            Arc::new(MemoryProgressStore::hydrate(records, Vec::new())),
            FailurePolicy::Reset,
        )
    }

    #[test]
    fn mix_engine_averages_levels() {
        assert_eq!(get_difficulty(&levels(&[("a", 2), ("b", 4)]), "mix-x"), 3);
    }

    #[test]
    fn mix_engine_rounds_half_up() {
        assert_eq!(get_difficulty(&levels(&[("a", 1), ("b", 2)]), "mix-all"), 2);
        assert_eq!(
            get_difficulty(&levels(&[("a", 1), ("b", 1), ("c", 2)]), "mix-all"),
            1
        );
    }

    #[test]
    fn mix_engine_defaults_to_one() {
        assert_eq!(get_difficulty(&BTreeMap::new(), "mix-empty"), 1);
    }

    #[test]
    fn single_engine_lookup() {
        let map = levels(&[("fractions", 4)]);
        assert_eq!(get_difficulty(&map, "fractions"), 4);
        assert_eq!(get_difficulty(&map, "decimals"), 1);
    }

    #[test]
    fn difficulty_is_pure() {
        let map = levels(&[("a", 3), ("b", 5)]);
        let first = get_difficulty(&map, "mix-y");
        let second = get_difficulty(&map, "mix-y");
        assert_eq!(first, second);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn due_before_new_before_upcoming() {
        let scheduler = scheduler_with(vec![
            SkillProgress::new("later", 3, NOW + DAY_MS, AttemptResult::Correct),
            SkillProgress::new("overdue", 2, NOW - DAY_MS, AttemptResult::Correct),
        ]);
        let queue = scheduler.queue(&["later", "fresh", "overdue"], NOW);
        let order: Vec<_> = queue.iter().map(|i| i.skill_key.as_str()).collect();
        assert_eq!(order, vec!["overdue", "fresh", "later"]);
        assert_eq!(queue[1].status, QueueStatus::New);
        assert_eq!(queue[1].box_level, 1);
        assert!(queue[1].is_due());
    }

    #[test]
    fn ties_break_by_time_then_key() {
        let scheduler = scheduler_with(vec![
            SkillProgress::new("b", 1, NOW - 10, AttemptResult::Correct),
            SkillProgress::new("a", 1, NOW - 10, AttemptResult::Correct),
            SkillProgress::new("c", 1, NOW - 20, AttemptResult::Correct),
        ]);
        let order: Vec<_> = scheduler
            .queue::<&str>(&[], NOW)
            .into_iter()
            .map(|i| i.skill_key)
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn new_items_sort_lexically() {
        let scheduler = scheduler_with(Vec::new());
        let order: Vec<_> = scheduler
            .queue(&["zeta", "alpha", "mu", "alpha"], NOW)
            .into_iter()
            .map(|i| i.skill_key)
            .collect();
        assert_eq!(order, vec!["alpha", "mu", "zeta"]);
    }

    #[test]
    fn due_exactly_at_review_time() {
        let scheduler = scheduler_with(vec![SkillProgress::new(
            "edge",
            2,
            NOW,
            AttemptResult::Correct,
        )]);
        assert_eq!(
            scheduler.next_item(&["edge"], NOW).unwrap().status,
            QueueStatus::Due
        );
        assert_eq!(
            scheduler.next_item(&["edge"], NOW - 1).unwrap().status,
            QueueStatus::Upcoming
        );
    }

    #[test]
    fn unknown_skill_is_fresh_and_due() {
        let scheduler = scheduler_with(Vec::new());
        let item = scheduler.next_item(&["nothing"], NOW).unwrap();
        assert_eq!(item.status, QueueStatus::New);
        assert_eq!(item.box_level, 1);
        assert!(item.is_due());
        assert!(scheduler.store().get_progress("nothing").is_none());
    }

    #[test]
    fn record_attempt_updates_store_synchronously() {
        let scheduler = scheduler_with(vec![SkillProgress::new(
            "algebra",
            3,
            NOW,
            AttemptResult::Correct,
        )]);
        let next = scheduler.record_attempt("algebra", AttemptResult::Correct, NOW);
        assert_eq!(next.box_level, 4);
        assert_eq!(
            scheduler.store().get_progress("algebra").unwrap().next_review_at,
            NOW + 14 * DAY_MS
        );
    }

    #[test]
    fn step_back_policy_is_honoured() {
        let scheduler = Scheduler::new(
            Arc::new(MemoryProgressStore::hydrate(
                vec![SkillProgress::new("s", 4, NOW, AttemptResult::Correct)],
                Vec::new(),
            )),
            FailurePolicy::StepBack,
        );
        let next = scheduler.record_attempt("s", AttemptResult::Incorrect, NOW);
        assert_eq!(next.box_level, 3);
        assert_eq!(next.next_review_at, NOW + 7 * DAY_MS);
    }

    #[test]
    fn session_truncates() {
        let scheduler = scheduler_with(Vec::new());
        assert_eq!(scheduler.session(&["a", "b", "c"], NOW, 2).len(), 2);
    }

    #[test]
    fn due_items_skip_future_records() {
        let scheduler = scheduler_with(vec![
            SkillProgress::new("past", 1, NOW - 5, AttemptResult::Correct),
            SkillProgress::new("future", 1, NOW + 5, AttemptResult::Correct),
        ]);
        let due = scheduler.due_items(NOW);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].skill_key, "past");
    }
}
