//! Progress store contract and the in-memory implementation.
//!
//! Writes happen in two steps. The scheduler and grading pipeline first update
//! a [`ProgressStore`] synchronously, so the new state is readable right away.
//! They then hand the same record to a [`ProgressSink`] for durable storage.
//! A sink failure is logged by the caller and never rolls back memory.
//!
//! Updates are read-modify-write on one record keyed by skill. Two concurrent
//! updates to the same skill are last-write-wins; callers that can
//! double-submit must serialize per skill themselves.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::core::interval::clamp_box_level;
use crate::core::models::{AttemptRecord, SkillProgress};
use crate::error::Result;

/// Synchronous progress state read by the scheduler.
pub trait ProgressStore: Send + Sync {
    /// Current record for a skill, if it was ever attempted.
    fn get_progress(&self, skill_key: &str) -> Option<SkillProgress>;

    /// Insert or replace a skill's record. The box level is clamped to `[1, 5]`.
    fn upsert_progress(&self, progress: SkillProgress) -> SkillProgress;

    /// Append an attempt to the log.
    fn append_attempt(&self, record: AttemptRecord);

    /// Every tracked record, ordered by skill key.
    fn all_progress(&self) -> Vec<SkillProgress>;

    /// The attempt log in insertion order.
    fn attempts(&self) -> Vec<AttemptRecord>;

    /// Remove a skill's record. Its attempts stay in the log.
    fn reset_skill(&self, skill_key: &str) -> Option<SkillProgress>;
}

/// Durable storage behind a [`ProgressStore`].
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Persist the latest record for a skill.
    async fn persist_progress(&self, progress: &SkillProgress) -> Result<()>;

    /// Persist one attempt.
    async fn persist_attempt(&self, record: &AttemptRecord) -> Result<()>;

    /// Delete a skill's record.
    async fn delete_progress(&self, skill_key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct Inner {
    progress: BTreeMap<String, SkillProgress>,
    attempts: Vec<AttemptRecord>,
}

/// Process-local progress state.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    inner: RwLock<Inner>,
}

impl MemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from previously persisted state.
    #[must_use]
    pub fn hydrate(progress: Vec<SkillProgress>, attempts: Vec<AttemptRecord>) -> Self {
        let progress = progress
            .into_iter()
            .map(|p| (p.skill_key.clone(), p))
            .collect();
        Self {
            inner: RwLock::new(Inner { progress, attempts }),
        }
    }

    /// Number of tracked skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .progress
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get_progress(&self, skill_key: &str) -> Option<SkillProgress> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .progress
            .get(skill_key)
            .cloned()
    }

    fn upsert_progress(&self, mut progress: SkillProgress) -> SkillProgress {
        progress.box_level = clamp_box_level(progress.box_level);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .progress
            .insert(progress.skill_key.clone(), progress.clone());
        progress
    }

    fn append_attempt(&self, record: AttemptRecord) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts
            .push(record);
    }

    fn all_progress(&self) -> Vec<SkillProgress> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .progress
            .values()
            .cloned()
            .collect()
    }

    fn attempts(&self) -> Vec<AttemptRecord> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts
            .clone()
    }

    fn reset_skill(&self, skill_key: &str) -> Option<SkillProgress> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .progress
            .remove(skill_key)
    }
}
