//! `SimLessonStore` - In-Memory Durable Store for Testing
//!
//! `TigerStyle`: Deterministic testing with fault injection.
//!
//! # Simulation-First
//!
//! This file follows simulation-first development: the store behaves like a
//! real durable backend (including injected failures) so the controller's
//! write-through and fallback paths can be exercised without infrastructure.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::dst::{DeterministicRng, FaultConfig, FaultInjector, SimClock, SimConfig};
use crate::lesson::{Lesson, LessonState, Tier};

use super::backend::LessonStore;
use super::error::{StorageError, StorageResult};

// =============================================================================
// SimLessonStore
// =============================================================================

/// In-memory durable lesson store for testing.
///
/// `TigerStyle`:
/// - Deterministic via `SimClock` and `DeterministicRng`
/// - Fault injection via `FaultInjector`
/// - Thread-safe with `RwLock`
#[derive(Debug, Clone)]
pub struct SimLessonStore {
    /// Stored lessons indexed by ID
    lessons: Arc<RwLock<HashMap<Uuid, Lesson>>>,
    /// Fault injector for simulating failures
    fault_injector: Arc<FaultInjector>,
    /// Simulated clock
    clock: SimClock,
}

impl SimLessonStore {
    /// Create a new `SimLessonStore` with given config.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let mut rng = DeterministicRng::new(config.seed());
        let fault_rng = rng.fork();

        Self {
            lessons: Arc::new(RwLock::new(HashMap::new())),
            fault_injector: Arc::new(FaultInjector::new(fault_rng)),
            clock: SimClock::new(),
        }
    }

    /// Create a new `SimLessonStore` with a shared fault injector.
    ///
    /// Accepts an external `FaultInjector` (typically shared from a
    /// `Simulation`) so one injector governs the store, the cache and the
    /// teacher in a test run.
    #[must_use]
    pub fn with_fault_injector(config: SimConfig, fault_injector: Arc<FaultInjector>) -> Self {
        let _ = config.seed();

        Self {
            lessons: Arc::new(RwLock::new(HashMap::new())),
            fault_injector,
            clock: SimClock::new(),
        }
    }

    /// Add fault configuration.
    ///
    /// Note: `FaultInjector` registration needs `&mut`, which Arc only allows
    /// before the store is shared. Register faults upfront.
    #[must_use]
    pub fn with_faults(mut self, config: FaultConfig) -> Self {
        Arc::get_mut(&mut self.fault_injector)
            .expect("cannot add faults after store is shared")
            .register(config);
        self
    }

    /// Get the simulated clock.
    #[must_use]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Get fault injector for inspection.
    #[must_use]
    pub fn fault_injector(&self) -> &Arc<FaultInjector> {
        &self.fault_injector
    }

    /// Check if a fault should be injected for an operation.
    fn maybe_inject_fault(&self, operation: &str) -> StorageResult<()> {
        if let Some(fault_type) = self.fault_injector.should_inject(operation) {
            Err(StorageError::simulated_fault(format!(
                "{} during {operation}",
                fault_type.as_str()
            )))
        } else {
            Ok(())
        }
    }

    /// Get lesson count (for testing).
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.lessons.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Deterministic ordering: creation time, then id for stable ties.
    fn sort_deterministic(results: &mut [Lesson]) {
        results.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

#[async_trait]
impl LessonStore for SimLessonStore {
    #[tracing::instrument(skip(self, lesson), fields(lesson_id = %lesson.id))]
    async fn put_lesson(&self, lesson: &Lesson) -> StorageResult<Uuid> {
        self.maybe_inject_fault("put_lesson")?;

        // Preconditions
        assert!(!lesson.trigger.is_empty(), "lesson must have a trigger");

        let mut lessons = self.lessons.write().unwrap_or_else(|e| e.into_inner());
        lessons.insert(lesson.id, lesson.clone());

        Ok(lesson.id)
    }

    #[tracing::instrument(skip(self))]
    async fn get_lesson(&self, id: Uuid) -> StorageResult<Option<Lesson>> {
        self.maybe_inject_fault("get_lesson")?;

        let lessons = self.lessons.read().unwrap_or_else(|e| e.into_inner());
        Ok(lessons.get(&id).cloned())
    }

    async fn purge_lesson(&self, id: Uuid) -> StorageResult<bool> {
        self.maybe_inject_fault("purge_lesson")?;

        let mut lessons = self.lessons.write().unwrap_or_else(|e| e.into_inner());
        Ok(lessons.remove(&id).is_some())
    }

    #[tracing::instrument(skip(self))]
    async fn retag_lesson(
        &self,
        id: Uuid,
        tier: Tier,
        state: LessonState,
        now_ms: u64,
    ) -> StorageResult<()> {
        self.maybe_inject_fault("retag_lesson")?;

        let mut lessons = self.lessons.write().unwrap_or_else(|e| e.into_inner());
        match lessons.get_mut(&id) {
            Some(lesson) => {
                lesson.retag(tier, state, now_ms);
                Ok(())
            }
            None => Err(StorageError::not_found(id.to_string())),
        }
    }

    #[tracing::instrument(skip(self), fields(tool_key))]
    async fn find_by_trigger(&self, tool_key: &str, tier: Tier) -> StorageResult<Vec<Lesson>> {
        self.maybe_inject_fault("find_by_trigger")?;

        let lessons = self.lessons.read().unwrap_or_else(|e| e.into_inner());
        let mut results: Vec<Lesson> = lessons
            .values()
            .filter(|l| l.tier == tier && l.matches_tool_key(tool_key))
            .cloned()
            .collect();

        Self::sort_deterministic(&mut results);
        Ok(results)
    }

    #[tracing::instrument(skip(self), fields(query_len = query.len()))]
    async fn search_lessons(&self, query: &str, limit: usize) -> StorageResult<Vec<Lesson>> {
        self.maybe_inject_fault("search_lessons")?;

        let lessons = self.lessons.read().unwrap_or_else(|e| e.into_inner());
        let query_lower = query.to_lowercase();

        let mut results: Vec<Lesson> = lessons
            .values()
            .filter(|l| {
                l.trigger.to_lowercase().contains(&query_lower)
                    || l.rule_text.to_lowercase().contains(&query_lower)
            })
            .cloned()
            .collect();

        Self::sort_deterministic(&mut results);
        results.truncate(limit);

        Ok(results)
    }

    async fn list_by_tier(
        &self,
        tier: Tier,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<Lesson>> {
        self.maybe_inject_fault("list_by_tier")?;

        let lessons = self.lessons.read().unwrap_or_else(|e| e.into_inner());
        let mut results: Vec<Lesson> = lessons
            .values()
            .filter(|l| l.tier == tier)
            .cloned()
            .collect();

        Self::sort_deterministic(&mut results);
        let results: Vec<Lesson> = results.into_iter().skip(offset).take(limit).collect();

        Ok(results)
    }

    async fn count_by_tier(&self, tier: Option<Tier>) -> StorageResult<usize> {
        self.maybe_inject_fault("count_by_tier")?;

        let lessons = self.lessons.read().unwrap_or_else(|e| e.into_inner());
        let count = lessons
            .values()
            .filter(|l| tier.map_or(true, |t| l.tier == t))
            .count();

        Ok(count)
    }

    async fn clear(&self) -> StorageResult<()> {
        self.maybe_inject_fault("clear")?;

        let mut lessons = self.lessons.write().unwrap_or_else(|e| e.into_inner());
        lessons.clear();
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::LessonType;

    fn lesson(trigger: &str, now_ms: u64) -> Lesson {
        Lesson::new(trigger, "some rule text", LessonType::Syntax, 0.8, now_ms)
    }

    // =========================================================================
    // Basic CRUD Tests
    // =========================================================================

    #[tokio::test]
    async fn test_put_and_get() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        let l = lesson("tool:sql_query", 0);

        let id = store.put_lesson(&l).await.unwrap();
        assert_eq!(id, l.id);

        let retrieved = store.get_lesson(id).await.unwrap().unwrap();
        assert_eq!(retrieved, l);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        let result = store.get_lesson(Uuid::nil()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_updates_existing() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        let mut l = lesson("tool:sql_query", 0);

        store.put_lesson(&l).await.unwrap();
        l.record_occurrence(100);
        store.put_lesson(&l).await.unwrap();

        let retrieved = store.get_lesson(l.id).await.unwrap().unwrap();
        assert_eq!(retrieved.occurrence_count, 2);
        assert_eq!(store.lesson_count(), 1);
    }

    #[tokio::test]
    async fn test_purge() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        let l = lesson("tool:sql_query", 0);

        store.put_lesson(&l).await.unwrap();
        assert!(store.purge_lesson(l.id).await.unwrap());
        assert_eq!(store.lesson_count(), 0);

        // Purging again returns false
        assert!(!store.purge_lesson(l.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_retag() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        let mut l = lesson("tool:sql_query", 0);
        l.retag(Tier::SkillCache, LessonState::Committed, 0);
        store.put_lesson(&l).await.unwrap();

        store
            .retag_lesson(l.id, Tier::Archive, LessonState::Archived, 500)
            .await
            .unwrap();

        let retrieved = store.get_lesson(l.id).await.unwrap().unwrap();
        assert_eq!(retrieved.tier, Tier::Archive);
        assert_eq!(retrieved.state, LessonState::Archived);
        assert_eq!(retrieved.updated_at_ms, 500);
    }

    #[tokio::test]
    async fn test_retag_missing_lesson() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        let result = store
            .retag_lesson(Uuid::nil(), Tier::Archive, LessonState::Archived, 0)
            .await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        store.put_lesson(&lesson("a", 0)).await.unwrap();
        store.put_lesson(&lesson("b", 1)).await.unwrap();
        assert_eq!(store.lesson_count(), 2);

        store.clear().await.unwrap();
        assert_eq!(store.lesson_count(), 0);
    }

    // =========================================================================
    // Query Tests
    // =========================================================================

    #[tokio::test]
    async fn test_find_by_trigger_matches_tool_binding() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));

        let mut bound = lesson("tool:sql_query", 0);
        bound.retag(Tier::SkillCache, LessonState::Committed, 0);
        store.put_lesson(&bound).await.unwrap();

        let mut other = lesson("tool:file_io", 1);
        other.retag(Tier::SkillCache, LessonState::Committed, 1);
        store.put_lesson(&other).await.unwrap();

        let results = store
            .find_by_trigger("sql_query", Tier::SkillCache)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, bound.id);
    }

    #[tokio::test]
    async fn test_find_by_trigger_respects_tier() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));

        // Same trigger binding, archive tier: invisible to the skill query
        let archived = lesson("tool:sql_query", 0);
        store.put_lesson(&archived).await.unwrap();

        let results = store
            .find_by_trigger("sql_query", Tier::SkillCache)
            .await
            .unwrap();
        assert!(results.is_empty());

        let results = store
            .find_by_trigger("sql_query", Tier::Archive)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_lessons() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        store
            .put_lesson(&Lesson::new(
                "fiscal year reporting",
                "Fiscal year starts in February",
                LessonType::Business,
                0.9,
                0,
            ))
            .await
            .unwrap();
        store.put_lesson(&lesson("tool:sql_query", 1)).await.unwrap();

        let results = store.search_lessons("fiscal", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].trigger, "fiscal year reporting");

        // Case-insensitive, matches rule text too
        let results = store.search_lessons("FEBRUARY", 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_limit() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        for i in 0..10 {
            store
                .put_lesson(&lesson(&format!("common trigger {i}"), i))
                .await
                .unwrap();
        }

        let results = store.search_lessons("common", 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_list_by_tier_ordering_and_offset() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));
        for i in 0..5u64 {
            store.put_lesson(&lesson(&format!("t{i}"), i)).await.unwrap();
        }

        let all = store.list_by_tier(Tier::Archive, 100, 0).await.unwrap();
        assert_eq!(all.len(), 5);
        // Ordered by creation time
        for pair in all.windows(2) {
            assert!(pair[0].created_at_ms <= pair[1].created_at_ms);
        }

        let tail = store.list_by_tier(Tier::Archive, 100, 2).await.unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].id, all[2].id);
    }

    #[tokio::test]
    async fn test_count_by_tier() {
        let store = SimLessonStore::new(SimConfig::with_seed(42));

        let mut kernel = lesson("never echo secrets", 0);
        kernel.retag(Tier::Kernel, LessonState::Committed, 0);
        store.put_lesson(&kernel).await.unwrap();
        store.put_lesson(&lesson("t1", 1)).await.unwrap();
        store.put_lesson(&lesson("t2", 2)).await.unwrap();

        assert_eq!(store.count_by_tier(None).await.unwrap(), 3);
        assert_eq!(store.count_by_tier(Some(Tier::Kernel)).await.unwrap(), 1);
        assert_eq!(store.count_by_tier(Some(Tier::Archive)).await.unwrap(), 2);
        assert_eq!(store.count_by_tier(Some(Tier::SkillCache)).await.unwrap(), 0);
    }
}

// =============================================================================
// DST Tests - Fault Injection
// =============================================================================


// =============================================================================
// Property-Based Tests
// =============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::dst::{DeterministicRng, PropertyTest, PropertyTestable, TimeAdvanceConfig};
    use crate::lesson::LessonType;

    /// Operations over the durable store
    #[derive(Debug, Clone)]
    enum StoreOp {
        Put { trigger: String },
        Get { id: Uuid },
        Purge { id: Uuid },
        Retag { id: Uuid, tier: Tier },
        List { tier: Tier },
    }

    struct StoreWrapper {
        store: SimLessonStore,
        known: Vec<Uuid>,
        now_ms: u64,
    }

    impl PropertyTestable for StoreWrapper {
        type Operation = StoreOp;

        fn generate_operation(&self, rng: &mut DeterministicRng) -> Self::Operation {
            let known_or_random = |rng: &mut DeterministicRng, known: &[Uuid]| {
                if !known.is_empty() && rng.next_bool(0.7) {
                    known[rng.next_usize(0, known.len() - 1)]
                } else {
                    Uuid::nil()
                }
            };

            match rng.next_usize(0, 4) {
                0 | 1 => StoreOp::Put {
                    trigger: format!("tool:tool_{}", rng.next_usize(0, 20)),
                },
                2 => StoreOp::Get {
                    id: known_or_random(rng, &self.known),
                },
                3 => StoreOp::Purge {
                    id: known_or_random(rng, &self.known),
                },
                _ => {
                    let tiers = Tier::all();
                    let tier = tiers[rng.next_usize(0, tiers.len() - 1)];
                    if rng.next_bool(0.5) {
                        StoreOp::Retag {
                            id: known_or_random(rng, &self.known),
                            tier,
                        }
                    } else {
                        StoreOp::List { tier }
                    }
                }
            }
        }

        fn apply_operation(&mut self, op: &Self::Operation, clock: &SimClock) {
            self.now_ms = clock.now_ms();
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                match op {
                    StoreOp::Put { trigger } => {
                        let l = Lesson::new(
                            trigger.clone(),
                            "rule",
                            LessonType::Syntax,
                            0.8,
                            self.now_ms,
                        );
                        if self.store.put_lesson(&l).await.is_ok() && !self.known.contains(&l.id) {
                            self.known.push(l.id);
                        }
                    }
                    StoreOp::Get { id } => {
                        let _ = self.store.get_lesson(*id).await;
                    }
                    StoreOp::Purge { id } => {
                        if self.store.purge_lesson(*id).await.unwrap_or(false) {
                            self.known.retain(|k| k != id);
                        }
                    }
                    StoreOp::Retag { id, tier } => {
                        // Archived is reachable from every durable state here
                        let state = if *tier == Tier::Archive {
                            LessonState::Archived
                        } else {
                            LessonState::Active
                        };
                        let _ = self.store.retag_lesson(*id, *tier, state, self.now_ms).await;
                    }
                    StoreOp::List { tier } => {
                        let _ = self.store.list_by_tier(*tier, 50, 0).await;
                    }
                }
            });
        }

        fn check_invariants(&self) -> Result<(), String> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let count = self
                    .store
                    .count_by_tier(None)
                    .await
                    .map_err(|e| e.to_string())?;
                if count != self.known.len() {
                    return Err(format!(
                        "count {} != tracked ids {}",
                        count,
                        self.known.len()
                    ));
                }

                // Tier counts must partition the total
                let mut by_tier = 0;
                for tier in Tier::all() {
                    by_tier += self
                        .store
                        .count_by_tier(Some(*tier))
                        .await
                        .map_err(|e| e.to_string())?;
                }
                if by_tier != count {
                    return Err(format!("tier counts {by_tier} do not partition {count}"));
                }

                Ok(())
            })
        }

        fn describe_state(&self) -> String {
            format!(
                "SimLessonStore {{ lessons: {}, tracked: {} }}",
                self.store.lesson_count(),
                self.known.len()
            )
        }
    }

    #[test]
    fn test_property_invariants() {
        let wrapper = StoreWrapper {
            store: SimLessonStore::new(SimConfig::with_seed(42)),
            known: Vec::new(),
            now_ms: 0,
        };

        PropertyTest::new(42)
            .with_max_operations(200)
            .with_time_advance(TimeAdvanceConfig::fixed(10))
            .run_and_assert(wrapper);
    }

    #[test]
    fn test_property_multi_seed() {
        for seed in [0, 1, 42, 12345, 99999] {
            let wrapper = StoreWrapper {
                store: SimLessonStore::new(SimConfig::with_seed(seed)),
                known: Vec::new(),
                now_ms: 0,
            };

            PropertyTest::new(seed)
                .with_max_operations(100)
                .with_time_advance(TimeAdvanceConfig::fixed(10))
                .run_and_assert(wrapper);
        }
    }
}
