//! Tiered Memory Controller - Commit, Retrieve, Evict, Rebuild
//!
//! TigerStyle: Sim-first, deterministic, graceful degradation.
//!
//! # Overview
//!
//! `TieredMemory` orchestrates the three lesson tiers:
//! - Kernel: small always-injected set, held as an in-memory projection
//! - SkillCache: tool-keyed lessons, injected when the tool is in scope
//! - Archive: the durable store itself, queried on demand
//!
//! The durable store is the sole source of truth. The kernel projection and
//! the skill cache are disposable views that `rebuild` can reconstruct at
//! any time. Tier changes are metadata re-tags; eviction never deletes a
//! durable record.
//!
//! # Example
//!
//! ```rust,ignore
//! use lesson_memory::memory::TieredMemory;
//! use lesson_memory::failure::{FailureCategory, FailureRecord, SeverityLevel};
//! use lesson_memory::lesson::{Lesson, LessonType};
//!
//! #[tokio::main]
//! async fn main() {
//!     let memory = TieredMemory::sim(42);
//!
//!     let record = FailureRecord::new(
//!         "find Q3 revenue",
//!         "queried the wrong fiscal window",
//!         "no rows returned",
//!         FailureCategory::GaveUpEarly,
//!         SeverityLevel::Medium,
//!     );
//!     let lesson = Lesson::new(
//!         "tool:sql_query",
//!         "Fiscal year starts in February; use fiscal quarters",
//!         LessonType::Business,
//!         0.8,
//!         0,
//!     );
//!
//!     let result = memory.commit(&record, lesson).await.unwrap();
//!     println!("committed to {:?}", result.tier);
//! }
//! ```

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::cache::SkillCache;
use crate::constants::{
    KERNEL_LESSONS_COUNT_MAX, REBUILD_SCAN_CHUNK_SIZE, SKILL_CACHE_EVICT_UNUSED_DAYS_DEFAULT,
    STORAGE_QUERY_RESULTS_COUNT_MAX,
};
use crate::dst::SimClock;
use crate::lesson::{Lesson, LessonState, Tier};
use crate::resolver::{Resolution, ToolResolver};
use crate::rubric::{Evaluation, Rubric};
use crate::storage::{LessonStore, StorageError};
use crate::failure::FailureRecord;

// =============================================================================
// Error Types
// =============================================================================

/// Errors from tiered memory operations.
#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    /// Write-through to the durable store failed; nothing was cached
    #[error("durable persist failed: {message}")]
    DurablePersist {
        /// Underlying storage error
        message: String,
    },

    /// Durable store error outside the commit write path
    #[error("durable store error: {message}")]
    Durable {
        /// Underlying storage error
        message: String,
    },

    /// Lesson not found in the durable store
    #[error("lesson not found: {id}")]
    NotFound {
        /// Lesson ID
        id: Uuid,
    },

    /// Illegal lesson state transition
    #[error("illegal state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: LessonState,
        /// Requested state
        to: LessonState,
    },
}

impl MemoryError {
    /// Create a durable persist error.
    #[must_use]
    pub fn durable_persist(message: impl Into<String>) -> Self {
        Self::DurablePersist {
            message: message.into(),
        }
    }

    /// Check if the error came from the durable store.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::DurablePersist { .. } | Self::Durable { .. })
    }
}

impl From<StorageError> for MemoryError {
    fn from(err: StorageError) -> Self {
        MemoryError::Durable {
            message: err.to_string(),
        }
    }
}

/// Result type for tiered memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the tiered memory controller.
#[derive(Debug, Clone)]
pub struct TieredMemoryConfig {
    /// Staleness threshold for `evict` when the caller passes no override
    pub evict_unused_days_default: u32,
    /// Maximum lessons held in the kernel projection
    pub kernel_lessons_max: usize,
    /// Page size for rebuild scans
    pub rebuild_chunk_size: usize,
}

impl Default for TieredMemoryConfig {
    fn default() -> Self {
        Self {
            evict_unused_days_default: SKILL_CACHE_EVICT_UNUSED_DAYS_DEFAULT,
            kernel_lessons_max: KERNEL_LESSONS_COUNT_MAX,
            rebuild_chunk_size: REBUILD_SCAN_CHUNK_SIZE,
        }
    }
}

impl TieredMemoryConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default eviction staleness threshold.
    #[must_use]
    pub fn with_evict_unused_days(mut self, days: u32) -> Self {
        self.evict_unused_days_default = days;
        self
    }

    /// Set the kernel projection capacity.
    ///
    /// # Panics
    /// Panics if `max` is zero.
    #[must_use]
    pub fn with_kernel_lessons_max(mut self, max: usize) -> Self {
        assert!(max > 0, "kernel capacity must be positive");
        self.kernel_lessons_max = max;
        self
    }

    /// Set the rebuild scan page size.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    #[must_use]
    pub fn with_rebuild_chunk_size(mut self, size: usize) -> Self {
        assert!(size > 0, "chunk size must be positive");
        self.rebuild_chunk_size = size;
        self
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// Result of a commit operation.
#[derive(Debug, Clone)]
pub struct CommitResult {
    /// ID of the committed lesson
    pub lesson_id: Uuid,
    /// Tier the lesson landed in
    pub tier: Tier,
    /// Tool attribution outcome
    pub resolution: Resolution,
    /// Rubric evaluation with breakdown
    pub evaluation: Evaluation,
    /// The lesson is durable (always true on success)
    pub durable: bool,
    /// The lesson was bound into the skill cache
    pub cached: bool,
}

/// Result of an eviction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionStats {
    /// Lessons re-tagged to the archive
    pub lessons_evicted: usize,
    /// Tool keys dropped from the skill cache
    pub tools_evicted: usize,
    /// Staleness threshold used, in days
    pub threshold_days: u32,
}

/// Result of a rebuild run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildStats {
    /// Lessons loaded into the kernel projection
    pub kernel_lessons: usize,
    /// Tool keys restored in the skill cache
    pub cache_keys: usize,
    /// Lesson bindings restored across all keys
    pub cache_bindings: usize,
    /// Durable scan pages read
    pub chunks_scanned: usize,
}

/// Point-in-time counters for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    /// Lessons in the kernel projection
    pub kernel_lessons: usize,
    /// Tool keys in the skill cache
    pub cache_keys: usize,
    /// Lesson bindings across all cache keys
    pub cache_bindings: usize,
    /// Durable lessons tagged Kernel
    pub durable_kernel: usize,
    /// Durable lessons tagged SkillCache
    pub durable_skill_cache: usize,
    /// Durable lessons tagged Archive
    pub durable_archive: usize,
}

impl MemoryStats {
    /// Total durable lessons across tiers.
    #[must_use]
    pub fn durable_total(&self) -> usize {
        self.durable_kernel + self.durable_skill_cache + self.durable_archive
    }
}

// =============================================================================
// Tiered Memory Controller
// =============================================================================

/// Tiered lesson memory controller.
///
/// # Type Parameters
/// - `S`: Durable lesson store (`SimLessonStore` for testing)
///
/// TigerStyle:
/// - Durable write precedes any cache write
/// - Per-tool-key locks, no global lock
/// - Cache failures degrade, durable failures surface
pub struct TieredMemory<S: LessonStore> {
    /// Durable store, the sole source of truth
    store: Arc<S>,
    /// Tool-keyed projection of SkillCache-tier lessons
    cache: SkillCache,
    /// Always-injected projection of Kernel-tier lessons
    kernel: Arc<RwLock<Vec<Lesson>>>,
    /// Per-tool-key locks serializing same-key cache mutation
    key_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    /// Tool attribution
    resolver: ToolResolver,
    /// Deterministic scorer
    rubric: Rubric,
    /// Time source (simulated under DST)
    clock: SimClock,
    /// Controller configuration
    config: TieredMemoryConfig,
}

impl<S: LessonStore> TieredMemory<S> {
    /// Create a controller over a durable store with defaults.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: SkillCache::new(),
            kernel: Arc::new(RwLock::new(Vec::new())),
            key_locks: DashMap::new(),
            resolver: ToolResolver::default(),
            rubric: Rubric::default(),
            clock: SimClock::new(),
            config: TieredMemoryConfig::default(),
        }
    }

    /// Set the controller configuration.
    #[must_use]
    pub fn with_config(mut self, config: TieredMemoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a pre-built skill cache (e.g. one sharing a fault injector).
    #[must_use]
    pub fn with_cache(mut self, cache: SkillCache) -> Self {
        self.cache = cache;
        self
    }

    /// Use a custom tool resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ToolResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Use a custom rubric.
    #[must_use]
    pub fn with_rubric(mut self, rubric: Rubric) -> Self {
        self.rubric = rubric;
        self
    }

    /// Use a shared clock (for DST).
    #[must_use]
    pub fn with_clock(mut self, clock: SimClock) -> Self {
        self.clock = clock;
        self
    }

    /// Get the clock.
    #[must_use]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Get the durable store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.key_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn kernel_snapshot(&self) -> Vec<Lesson> {
        let kernel = self.kernel.read().unwrap_or_else(|e| e.into_inner());
        kernel.clone()
    }

    fn kernel_upsert(&self, lesson: &Lesson) {
        let mut kernel = self.kernel.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = kernel.iter_mut().find(|l| l.id == lesson.id) {
            *existing = lesson.clone();
            return;
        }
        if kernel.len() >= self.config.kernel_lessons_max {
            tracing::warn!(
                lesson_id = %lesson.id,
                capacity = self.config.kernel_lessons_max,
                "kernel projection full, lesson durable but not projected"
            );
            return;
        }
        kernel.push(lesson.clone());
        kernel.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    fn kernel_remove(&self, lesson_id: Uuid) {
        let mut kernel = self.kernel.write().unwrap_or_else(|e| e.into_inner());
        kernel.retain(|l| l.id != lesson_id);
    }

    /// Advance a lesson through its state machine into a tier.
    ///
    /// Newly proposed lessons pass through Committed; everything else
    /// re-tags directly.
    fn place(lesson: &mut Lesson, tier: Tier, target_state: LessonState, now_ms: u64) {
        if lesson.state == LessonState::Proposed {
            lesson.retag(tier, LessonState::Committed, now_ms);
        }
        lesson.retag(tier, target_state, now_ms);
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Commit a lesson derived from a failure record.
    ///
    /// Resolves tool attribution, scores the lesson, writes it through to
    /// the durable store, then updates the kernel projection or skill cache.
    /// A SkillCache score with no tool attribution demotes to Archive, since
    /// untagged lessons can only be found by explicit search.
    ///
    /// # Errors
    /// `MemoryError::DurablePersist` if the write-through fails. The failure
    /// is fatal for this commit: nothing is cached or projected.
    #[tracing::instrument(skip(self, record, lesson), fields(lesson_id = %lesson.id))]
    pub async fn commit(
        &self,
        record: &FailureRecord,
        mut lesson: Lesson,
    ) -> MemoryResult<CommitResult> {
        let now_ms = self.clock.now_ms();

        let resolution = self.resolver.resolve(record);
        let evaluation = self.rubric.evaluate(record, &lesson);

        // A trigger-bound key wins over the resolver: the lesson author
        // already named the tool.
        let tool_key: Option<String> = lesson
            .tool_key()
            .map(str::to_lowercase)
            .or_else(|| resolution.tool().map(str::to_lowercase));

        let tier = match evaluation.tier {
            Tier::SkillCache if tool_key.is_none() => {
                tracing::debug!(lesson_id = %lesson.id, "no tool attribution, demoting to archive");
                Tier::Archive
            }
            tier => tier,
        };

        let target_state = match tier {
            Tier::Kernel | Tier::SkillCache => LessonState::Active,
            Tier::Archive => LessonState::Archived,
        };
        if lesson.state != target_state && !lesson.state.can_transition_to(target_state) {
            return Err(MemoryError::InvalidTransition {
                from: lesson.state,
                to: target_state,
            });
        }
        Self::place(&mut lesson, tier, target_state, now_ms);

        // Durability boundary: nothing below runs if this fails.
        self.store
            .put_lesson(&lesson)
            .await
            .map_err(|e| MemoryError::durable_persist(e.to_string()))?;

        let mut cached = false;
        match tier {
            Tier::Kernel => {
                self.kernel_upsert(&lesson);
            }
            Tier::SkillCache => {
                // tool_key is Some here, the demotion arm handled None
                if let Some(key) = &tool_key {
                    let lock = self.key_lock(key);
                    let _guard = lock.lock().await;
                    match self.cache.insert(key, lesson.id, now_ms) {
                        Ok(()) => cached = true,
                        Err(e) => {
                            tracing::warn!(key = %key, error = %e, "cache insert failed, lesson durable only");
                        }
                    }
                }
            }
            Tier::Archive => {}
        }

        tracing::info!(
            lesson_id = %lesson.id,
            tier = tier.as_str(),
            score = evaluation.score,
            cached,
            "lesson committed"
        );

        Ok(CommitResult {
            lesson_id: lesson.id,
            tier,
            resolution,
            evaluation,
            durable: true,
            cached,
        })
    }

    // =========================================================================
    // Retrieve
    // =========================================================================

    /// Retrieve the injection set for a tool key.
    ///
    /// Kernel lessons always come first, then skill-cache lessons for the
    /// key in stored order. A cache hit refreshes the key's last access; a
    /// miss falls through to the durable store and repopulates the cache;
    /// a cache fault degrades to the durable path.
    ///
    /// # Errors
    /// Durable store errors surface.
    #[tracing::instrument(skip(self))]
    pub async fn retrieve(&self, tool_key: &str) -> MemoryResult<Vec<Lesson>> {
        assert!(!tool_key.is_empty(), "tool key must not be empty");

        let now_ms = self.clock.now_ms();
        let mut results = self.kernel_snapshot();

        let lock = self.key_lock(&tool_key.to_lowercase());
        let _guard = lock.lock().await;

        match self.cache.touch(tool_key, now_ms) {
            Ok(Some(ids)) => {
                for id in ids {
                    match self.store.get_lesson(id).await? {
                        Some(lesson) => results.push(lesson),
                        None => {
                            tracing::warn!(lesson_id = %id, key = %tool_key, "cache binding has no durable copy, dropping");
                            let _ = self.cache.remove_lesson(tool_key, id);
                        }
                    }
                }
            }
            Ok(None) => {
                let lessons = self.store.find_by_trigger(tool_key, Tier::SkillCache).await?;
                for lesson in &lessons {
                    if let Err(e) = self.cache.insert(tool_key, lesson.id, now_ms) {
                        tracing::warn!(key = %tool_key, error = %e, "cache repopulation failed");
                        break;
                    }
                }
                results.extend(lessons);
            }
            Err(e) => {
                tracing::warn!(key = %tool_key, error = %e, "cache unavailable, serving from durable store");
                let lessons = self.store.find_by_trigger(tool_key, Tier::SkillCache).await?;
                results.extend(lessons);
            }
        }

        Ok(results)
    }

    /// Search the archive tier on demand.
    ///
    /// Never auto-injected; this is the explicit lookup path.
    ///
    /// # Errors
    /// Durable store errors surface.
    pub async fn search_archive(&self, query: &str, limit: usize) -> MemoryResult<Vec<Lesson>> {
        assert!(!query.is_empty(), "query must not be empty");
        assert!(
            limit > 0 && limit <= STORAGE_QUERY_RESULTS_COUNT_MAX,
            "limit must be 1-{STORAGE_QUERY_RESULTS_COUNT_MAX}"
        );

        let mut results: Vec<Lesson> = self
            .store
            .search_lessons(query, STORAGE_QUERY_RESULTS_COUNT_MAX)
            .await?
            .into_iter()
            .filter(|l| l.tier == Tier::Archive)
            .collect();
        results.truncate(limit);

        Ok(results)
    }

    // =========================================================================
    // Evict
    // =========================================================================

    /// Evict skill-cache keys unused for at least `unused_days`.
    ///
    /// Each stale lesson is verified to have a durable copy, re-tagged to
    /// the archive as Evicted, and only then dropped from the cache. The
    /// durable record is never deleted.
    ///
    /// # Errors
    /// Durable store errors surface; cache faults end the run early with
    /// partial stats.
    #[tracing::instrument(skip(self))]
    pub async fn evict(&self, unused_days: u32) -> MemoryResult<EvictionStats> {
        let now_ms = self.clock.now_ms();
        let mut stats = EvictionStats {
            lessons_evicted: 0,
            tools_evicted: 0,
            threshold_days: unused_days,
        };

        let stale = match self.cache.stale_keys(unused_days, now_ms) {
            Ok(stale) => stale,
            Err(e) => {
                tracing::warn!(error = %e, "cache unavailable, eviction skipped");
                return Ok(stats);
            }
        };

        for (key, lesson_ids) in stale {
            let lock = self.key_lock(&key);
            let _guard = lock.lock().await;

            for id in lesson_ids {
                match self.store.get_lesson(id).await? {
                    Some(lesson) => {
                        // Same-state retag is a no-op for already archived copies
                        let state = if lesson.state.can_transition_to(LessonState::Evicted) {
                            LessonState::Evicted
                        } else {
                            lesson.state
                        };
                        self.store
                            .retag_lesson(id, Tier::Archive, state, now_ms)
                            .await?;
                        stats.lessons_evicted += 1;
                    }
                    None => {
                        tracing::warn!(lesson_id = %id, key = %key, "cache binding has no durable copy");
                    }
                }
            }

            match self.cache.remove(&key) {
                Ok(_) => stats.tools_evicted += 1,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "cache remove failed mid-eviction");
                    return Ok(stats);
                }
            }
        }

        tracing::info!(
            lessons_evicted = stats.lessons_evicted,
            tools_evicted = stats.tools_evicted,
            threshold_days = unused_days,
            "eviction complete"
        );

        Ok(stats)
    }

    /// Evict with the configured default threshold.
    ///
    /// # Errors
    /// Same as [`evict`](Self::evict).
    pub async fn evict_default(&self) -> MemoryResult<EvictionStats> {
        self.evict(self.config.evict_unused_days_default).await
    }

    // =========================================================================
    // Rebuild
    // =========================================================================

    /// Rebuild the kernel projection and skill cache from the durable store.
    ///
    /// Chunked scans keep each read bounded; the result replaces both
    /// projections wholesale. Idempotent and safe alongside live traffic.
    ///
    /// # Errors
    /// Durable store errors surface.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild(&self) -> MemoryResult<RebuildStats> {
        let now_ms = self.clock.now_ms();
        let chunk = self.config.rebuild_chunk_size;
        let mut chunks_scanned = 0;

        // Kernel projection
        let mut kernel_lessons: Vec<Lesson> = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.store.list_by_tier(Tier::Kernel, chunk, offset).await?;
            chunks_scanned += 1;
            let page_len = page.len();
            kernel_lessons.extend(page);
            if page_len < chunk {
                break;
            }
            offset += chunk;
        }
        if kernel_lessons.len() > self.config.kernel_lessons_max {
            tracing::warn!(
                count = kernel_lessons.len(),
                capacity = self.config.kernel_lessons_max,
                "kernel tier exceeds projection capacity, truncating oldest-first"
            );
            kernel_lessons.truncate(self.config.kernel_lessons_max);
        }

        // Skill cache grouped by cache key
        let mut groups: Vec<(String, Vec<Uuid>)> = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .store
                .list_by_tier(Tier::SkillCache, chunk, offset)
                .await?;
            chunks_scanned += 1;
            let page_len = page.len();
            for lesson in page {
                let key = lesson.cache_key();
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, ids)) => ids.push(lesson.id),
                    None => groups.push((key, vec![lesson.id])),
                }
            }
            if page_len < chunk {
                break;
            }
            offset += chunk;
        }

        let cache_keys = groups.len();
        let cache_bindings = groups.iter().map(|(_, ids)| ids.len()).sum();
        let kernel_count = kernel_lessons.len();

        if let Err(e) = self.cache.replace_all(groups, now_ms) {
            tracing::warn!(error = %e, "cache unavailable, kernel rebuilt without cache");
        }
        {
            let mut kernel = self.kernel.write().unwrap_or_else(|e| e.into_inner());
            *kernel = kernel_lessons;
        }

        let stats = RebuildStats {
            kernel_lessons: kernel_count,
            cache_keys,
            cache_bindings,
            chunks_scanned,
        };
        tracing::info!(
            kernel_lessons = stats.kernel_lessons,
            cache_keys = stats.cache_keys,
            cache_bindings = stats.cache_bindings,
            "projections rebuilt"
        );

        Ok(stats)
    }

    // =========================================================================
    // Operator Surfaces
    // =========================================================================

    /// Promote a lesson one tier up and re-activate it.
    ///
    /// Archive lessons move to SkillCache (re-binding their tool key);
    /// SkillCache lessons move to Kernel. Kernel lessons stay put.
    ///
    /// # Errors
    /// `MemoryError::NotFound` if the lesson does not exist; durable store
    /// errors surface.
    pub async fn promote(&self, lesson_id: Uuid) -> MemoryResult<Lesson> {
        let now_ms = self.clock.now_ms();
        let mut lesson = self
            .store
            .get_lesson(lesson_id)
            .await?
            .ok_or(MemoryError::NotFound { id: lesson_id })?;

        let target_tier = match lesson.tier {
            Tier::Archive => Tier::SkillCache,
            Tier::SkillCache | Tier::Kernel => Tier::Kernel,
        };
        if lesson.state != LessonState::Active
            && !lesson.state.can_transition_to(LessonState::Active)
        {
            return Err(MemoryError::InvalidTransition {
                from: lesson.state,
                to: LessonState::Active,
            });
        }
        Self::place(&mut lesson, target_tier, LessonState::Active, now_ms);
        self.store.put_lesson(&lesson).await?;

        match target_tier {
            Tier::Kernel => {
                let key = lesson.cache_key();
                let _ = self.cache.remove_lesson(&key, lesson.id);
                self.kernel_upsert(&lesson);
            }
            Tier::SkillCache => {
                let key = lesson.cache_key();
                let lock = self.key_lock(&key);
                let _guard = lock.lock().await;
                if let Err(e) = self.cache.insert(&key, lesson.id, now_ms) {
                    tracing::warn!(key = %key, error = %e, "cache insert failed during promote");
                }
            }
            Tier::Archive => {}
        }

        tracing::info!(lesson_id = %lesson_id, tier = target_tier.as_str(), "lesson promoted");
        Ok(lesson)
    }

    /// Re-score an existing lesson against a fresh failure record.
    ///
    /// This is the operator hook that can bring an archived lesson back:
    /// the rubric runs again and the lesson is re-placed by the new tier.
    ///
    /// # Errors
    /// `MemoryError::NotFound` if the lesson does not exist; durable store
    /// errors surface.
    pub async fn rescore(
        &self,
        record: &FailureRecord,
        lesson_id: Uuid,
    ) -> MemoryResult<CommitResult> {
        let lesson = self
            .store
            .get_lesson(lesson_id)
            .await?
            .ok_or(MemoryError::NotFound { id: lesson_id })?;

        // Leaving a tier cleans up the old projection slot; commit re-places
        self.kernel_remove(lesson_id);
        let _ = self.cache.remove_lesson(&lesson.cache_key(), lesson_id);

        self.commit(record, lesson).await
    }

    /// Permanently delete a lesson from the durable store. Operator-only.
    ///
    /// Returns true if the lesson existed.
    ///
    /// # Errors
    /// Durable store errors surface.
    pub async fn purge(&self, lesson_id: Uuid) -> MemoryResult<bool> {
        let lesson = self.store.get_lesson(lesson_id).await?;
        let existed = self.store.purge_lesson(lesson_id).await?;

        if let Some(lesson) = lesson {
            self.kernel_remove(lesson_id);
            let _ = self.cache.remove_lesson(&lesson.cache_key(), lesson_id);
            tracing::info!(lesson_id = %lesson_id, "lesson purged");
        }

        Ok(existed)
    }

    /// Tier counts and projection sizes for operators.
    ///
    /// # Errors
    /// Durable store errors surface.
    pub async fn stats(&self) -> MemoryResult<MemoryStats> {
        Ok(MemoryStats {
            kernel_lessons: self.kernel.read().unwrap_or_else(|e| e.into_inner()).len(),
            cache_keys: self.cache.len(),
            cache_bindings: self.cache.lesson_binding_count(),
            durable_kernel: self.store.count_by_tier(Some(Tier::Kernel)).await?,
            durable_skill_cache: self.store.count_by_tier(Some(Tier::SkillCache)).await?,
            durable_archive: self.store.count_by_tier(Some(Tier::Archive)).await?,
        })
    }
}

impl TieredMemory<crate::storage::SimLessonStore> {
    /// Create a fully simulated controller from a seed.
    ///
    /// Deterministic: same seed, same behavior.
    #[must_use]
    pub fn sim(seed: u64) -> Self {
        let store = Arc::new(crate::storage::SimLessonStore::new(
            crate::dst::SimConfig::with_seed(seed),
        ));
        Self::new(store)
    }
}

// =============================================================================
// Tests
// =============================================================================


// =============================================================================
// DST Tests - Fault Injection
// =============================================================================
