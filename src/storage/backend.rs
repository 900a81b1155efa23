//! Durable Lesson Store Trait
//!
//! TigerStyle: Abstract interface for the archive tier, the sole source of
//! truth for lessons (the skill cache is a disposable projection of it).
//!
//! # Simulation-First
//!
//! Tests are written against `SimLessonStore` before any production backend.
//! All implementations must satisfy the same trait contract.

use async_trait::async_trait;
use uuid::Uuid;

use super::error::StorageResult;
use crate::lesson::{Lesson, LessonState, Tier};

/// Abstract durable store for lessons.
///
/// TigerStyle: All operations are async, return explicit errors.
#[async_trait]
pub trait LessonStore: Send + Sync {
    /// Store or update a lesson.
    ///
    /// If a lesson with the same ID exists, it is replaced.
    /// Returns the lesson ID.
    async fn put_lesson(&self, lesson: &Lesson) -> StorageResult<Uuid>;

    /// Get a lesson by ID.
    ///
    /// Returns None if the lesson does not exist.
    async fn get_lesson(&self, id: Uuid) -> StorageResult<Option<Lesson>>;

    /// Delete a lesson by ID. Operator-only; normal eviction never calls this.
    ///
    /// Returns true if the lesson existed and was deleted.
    async fn purge_lesson(&self, id: Uuid) -> StorageResult<bool>;

    /// Re-tag a lesson's tier and state in place.
    ///
    /// Metadata-only update; the record itself stays durable.
    async fn retag_lesson(
        &self,
        id: Uuid,
        tier: Tier,
        state: LessonState,
        now_ms: u64,
    ) -> StorageResult<()>;

    /// Find lessons whose trigger matches a tool key, filtered by tier.
    ///
    /// The cache-miss fallback: case-insensitive containment match against
    /// normalized triggers.
    async fn find_by_trigger(&self, tool_key: &str, tier: Tier) -> StorageResult<Vec<Lesson>>;

    /// Search lessons by text query over trigger and rule text.
    ///
    /// Backs the explicit archive search; simple text matching for
    /// `SimLessonStore`.
    async fn search_lessons(&self, query: &str, limit: usize) -> StorageResult<Vec<Lesson>>;

    /// List lessons in a tier, paginated. Chunked scans for rebuild.
    async fn list_by_tier(
        &self,
        tier: Tier,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<Lesson>>;

    /// Count lessons with optional tier filter.
    async fn count_by_tier(&self, tier: Option<Tier>) -> StorageResult<usize>;

    /// Clear all lessons.
    ///
    /// Primarily for testing.
    async fn clear(&self) -> StorageResult<()>;
}
