//! Skill Cache - Tool-Keyed Projection of the Durable Store
//!
//! TigerStyle: Explicit limits, last-access tracking, simulation-first testing.
//!
//! # Design
//!
//! The skill cache maps lowercase tool keys to lesson IDs for conditional
//! injection when the matching tool is in scope. It holds no lesson content
//! of record: every entry points at a durable lesson, and the whole cache
//! can be dropped and rebuilt from the archive at any time.
//!
//! # Simulation-First
//!
//! The cache accepts a shared `FaultInjector` so tests can make it
//! unavailable and exercise the durable-fallback path.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::constants::{
    SKILL_CACHE_ENTRIES_COUNT_MAX, SKILL_CACHE_LESSONS_PER_KEY_COUNT_MAX, TIME_MS_PER_DAY,
};
use crate::dst::FaultInjector;

// =============================================================================
// Error Types
// =============================================================================

/// Errors from skill cache operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Too many tool keys
    #[error("skill cache full: {count} keys exceeds max {max_count}")]
    CacheFull {
        /// Current key count
        count: usize,
        /// Maximum allowed
        max_count: usize,
    },

    /// Too many lessons for one key
    #[error("too many lessons for key '{key}': {count} exceeds max {max_count}")]
    KeyFull {
        /// Tool key
        key: String,
        /// Current lesson count for the key
        count: usize,
        /// Maximum allowed
        max_count: usize,
    },

    /// Cache unavailable (injected fault)
    #[error("skill cache unavailable: {message}")]
    Unavailable {
        /// Failure detail
        message: String,
    },
}

/// Result type for skill cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// Entry Type
// =============================================================================

/// A single tool-keyed entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Lessons bound to this tool, in insertion order
    pub lesson_ids: Vec<Uuid>,
    /// Last retrieval timestamp (ms since epoch)
    pub last_access_ms: u64,
}

// =============================================================================
// Skill Cache
// =============================================================================

/// Tool-keyed lesson cache.
///
/// TigerStyle:
/// - Bounded keys and per-key lessons
/// - Last-access timestamps drive eviction
/// - Disposable: rebuildable from the durable store
#[derive(Debug, Clone, Default)]
pub struct SkillCache {
    /// Entries indexed by lowercase tool key
    entries: Arc<DashMap<String, CacheEntry>>,
    /// Optional shared fault injector
    fault_injector: Option<Arc<FaultInjector>>,
}

impl SkillCache {
    /// Create an empty skill cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a skill cache with a shared fault injector.
    #[must_use]
    pub fn with_fault_injector(fault_injector: Arc<FaultInjector>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            fault_injector: Some(fault_injector),
        }
    }

    fn maybe_inject_fault(&self, operation: &str) -> CacheResult<()> {
        if let Some(injector) = &self.fault_injector {
            if let Some(fault_type) = injector.should_inject(operation) {
                return Err(CacheError::Unavailable {
                    message: format!("{} during {operation}", fault_type.as_str()),
                });
            }
        }
        Ok(())
    }

    /// Bind a lesson to a tool key.
    ///
    /// Idempotent per (key, lesson) pair; refreshes the key's last access.
    ///
    /// # Errors
    /// Returns an error if the cache or the key is at capacity, or the cache
    /// is unavailable.
    pub fn insert(&self, tool_key: &str, lesson_id: Uuid, now_ms: u64) -> CacheResult<()> {
        assert!(!tool_key.is_empty(), "tool key must not be empty");

        self.maybe_inject_fault("cache_insert")?;
        let key = tool_key.to_lowercase();

        if !self.entries.contains_key(&key) && self.entries.len() >= SKILL_CACHE_ENTRIES_COUNT_MAX {
            return Err(CacheError::CacheFull {
                count: self.entries.len(),
                max_count: SKILL_CACHE_ENTRIES_COUNT_MAX,
            });
        }

        let mut entry = self.entries.entry(key.clone()).or_insert_with(|| CacheEntry {
            lesson_ids: Vec::new(),
            last_access_ms: now_ms,
        });

        if !entry.lesson_ids.contains(&lesson_id) {
            if entry.lesson_ids.len() >= SKILL_CACHE_LESSONS_PER_KEY_COUNT_MAX {
                return Err(CacheError::KeyFull {
                    key,
                    count: entry.lesson_ids.len(),
                    max_count: SKILL_CACHE_LESSONS_PER_KEY_COUNT_MAX,
                });
            }
            entry.lesson_ids.push(lesson_id);
        }
        entry.last_access_ms = now_ms;

        Ok(())
    }

    /// Get the lesson IDs bound to a tool key, without touching last access.
    ///
    /// # Errors
    /// Returns an error if the cache is unavailable.
    pub fn get(&self, tool_key: &str) -> CacheResult<Option<Vec<Uuid>>> {
        self.maybe_inject_fault("cache_get")?;

        let key = tool_key.to_lowercase();
        Ok(self.entries.get(&key).map(|e| e.lesson_ids.clone()))
    }

    /// Get the lesson IDs bound to a tool key and refresh its last access.
    ///
    /// # Errors
    /// Returns an error if the cache is unavailable.
    pub fn touch(&self, tool_key: &str, now_ms: u64) -> CacheResult<Option<Vec<Uuid>>> {
        self.maybe_inject_fault("cache_get")?;

        let key = tool_key.to_lowercase();
        Ok(self.entries.get_mut(&key).map(|mut e| {
            e.last_access_ms = now_ms;
            e.lesson_ids.clone()
        }))
    }

    /// Keys not accessed for at least `unused_days`, with their lesson IDs.
    ///
    /// # Errors
    /// Returns an error if the cache is unavailable.
    pub fn stale_keys(&self, unused_days: u32, now_ms: u64) -> CacheResult<Vec<(String, Vec<Uuid>)>> {
        self.maybe_inject_fault("cache_scan")?;

        let threshold_ms = u64::from(unused_days) * TIME_MS_PER_DAY;
        let mut stale: Vec<(String, Vec<Uuid>)> = self
            .entries
            .iter()
            .filter(|e| now_ms.saturating_sub(e.last_access_ms) >= threshold_ms)
            .map(|e| (e.key().clone(), e.lesson_ids.clone()))
            .collect();

        // Deterministic order for eviction runs
        stale.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(stale)
    }

    /// Remove a tool key. Returns true if it existed.
    ///
    /// # Errors
    /// Returns an error if the cache is unavailable.
    pub fn remove(&self, tool_key: &str) -> CacheResult<bool> {
        self.maybe_inject_fault("cache_remove")?;

        let key = tool_key.to_lowercase();
        Ok(self.entries.remove(&key).is_some())
    }

    /// Remove a single lesson binding from a key, dropping the key when it
    /// empties. Returns true if the binding existed.
    ///
    /// # Errors
    /// Returns an error if the cache is unavailable.
    pub fn remove_lesson(&self, tool_key: &str, lesson_id: Uuid) -> CacheResult<bool> {
        self.maybe_inject_fault("cache_remove")?;

        let key = tool_key.to_lowercase();
        let mut removed = false;
        let mut now_empty = false;

        if let Some(mut entry) = self.entries.get_mut(&key) {
            let before = entry.lesson_ids.len();
            entry.lesson_ids.retain(|id| *id != lesson_id);
            removed = entry.lesson_ids.len() < before;
            now_empty = entry.lesson_ids.is_empty();
        }
        if now_empty {
            self.entries.remove(&key);
        }

        Ok(removed)
    }

    /// Replace the entire cache contents. Used by rebuild.
    ///
    /// # Errors
    /// Returns an error if the cache is unavailable.
    pub fn replace_all(
        &self,
        new_entries: Vec<(String, Vec<Uuid>)>,
        now_ms: u64,
    ) -> CacheResult<()> {
        assert!(
            new_entries.len() <= SKILL_CACHE_ENTRIES_COUNT_MAX,
            "rebuild exceeds cache capacity"
        );

        self.maybe_inject_fault("cache_replace")?;

        self.entries.clear();
        for (key, lesson_ids) in new_entries {
            self.entries.insert(
                key.to_lowercase(),
                CacheEntry {
                    lesson_ids,
                    last_access_ms: now_ms,
                },
            );
        }

        Ok(())
    }

    /// Number of tool keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total lesson bindings across all keys.
    #[must_use]
    pub fn lesson_binding_count(&self) -> usize {
        self.entries.iter().map(|e| e.lesson_ids.len()).sum()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================


// =============================================================================
// DST Tests - Fault Injection
// =============================================================================

#[cfg(test)]
mod dst_tests {
    use super::*;
    use crate::dst::{DeterministicRng, FaultConfig, FaultInjector, FaultType};

    fn cache_with_fault(probability: f64, filter: &str) -> SkillCache {
        let mut injector = FaultInjector::new(DeterministicRng::new(42));
        injector.register(
            FaultConfig::new(FaultType::CacheUnavailable, probability).with_filter(filter),
        );
        SkillCache::with_fault_injector(Arc::new(injector))
    }

    #[test]
    fn test_cache_unavailable_on_get() {
        let cache = cache_with_fault(1.0, "cache_get");
        cache.insert("sql_query", Uuid::new_v4(), 0).unwrap();

        let result = cache.get("sql_query");
        assert!(matches!(result, Err(CacheError::Unavailable { .. })));
    }

    #[test]
    fn test_cache_unavailable_on_insert() {
        let cache = cache_with_fault(1.0, "cache_insert");
        let result = cache.insert("sql_query", Uuid::new_v4(), 0);
        assert!(result.is_err());
        assert!(cache.is_empty(), "failed insert must not bind");
    }

    #[test]
    fn test_fault_filter_scopes_operation() {
        let cache = cache_with_fault(1.0, "cache_remove");
        cache.insert("sql_query", Uuid::new_v4(), 0).unwrap();

        // Reads unaffected, removes fail
        assert!(cache.get("sql_query").unwrap().is_some());
        assert!(cache.remove("sql_query").is_err());
    }
}
