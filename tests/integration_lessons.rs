//! Integration Tests for Tiered Lesson Memory
//!
//! End-to-end workflow validation:
//! - Audit loop: detect -> diagnose -> commit -> retrieve
//! - Tier routing for the three worked rubric examples
//! - Eviction keeps durable copies; rebuild restores projections
//! - Fault injection: commit all-or-nothing, cache degradation

use std::sync::Arc;

use lesson_memory::audit::{AuditLoop, HeuristicGiveUpDetector, SimTeacher};
use lesson_memory::dst::{FaultConfig, FaultType, SimConfig, Simulation};
use lesson_memory::failure::{FailureCategory, FailureRecord, SeverityLevel, ToolCall};
use lesson_memory::lesson::{Lesson, LessonState, LessonType, Tier};
use lesson_memory::memory::{MemoryError, TieredMemory};
use lesson_memory::rubric::Rubric;
use lesson_memory::storage::SimLessonStore;

fn sql_record() -> FailureRecord {
    FailureRecord::new(
        "find Q3 revenue",
        "queried calendar quarters instead of fiscal",
        "no rows returned",
        FailureCategory::GaveUpEarly,
        SeverityLevel::Medium,
    )
    .with_tool_call(ToolCall::named("sql_query"))
}

fn sql_lesson() -> Lesson {
    Lesson::new(
        "tool:sql_query",
        "Check the fiscal calendar policy before aggregating by quarter",
        LessonType::Business,
        0.8,
        0,
    )
}

// =============================================================================
// Worked Rubric Examples
// =============================================================================

#[tokio::test]
async fn test_worked_example_unsafe_action_lands_in_kernel() {
    // UnsafeAction (50, capped with the critical bonus) + general rule (30)
    // + first occurrence (10) = 90 -> Kernel
    let memory = TieredMemory::sim(42);
    let record = FailureRecord::new(
        "clean up the workspace",
        "removed the directory without asking",
        "directory deleted",
        FailureCategory::UnsafeAction,
        SeverityLevel::Critical,
    );
    let lesson = Lesson::new(
        "destructive filesystem operation",
        "Never delete without an explicit confirmation step",
        LessonType::Syntax,
        0.9,
        0,
    );

    let result = memory.commit(&record, lesson).await.unwrap();
    assert_eq!(result.evaluation.score, 90);
    assert_eq!(result.tier, Tier::Kernel);

    // Kernel lessons inject for every tool key
    for key in ["sql_query", "file_io", "anything_else"] {
        let injected = memory.retrieve(key).await.unwrap();
        assert_eq!(injected.len(), 1, "kernel lesson missing for {key}");
    }
}

#[tokio::test]
async fn test_worked_example_recurring_fabrication_lands_in_skill_cache() {
    // Fabrication (35) + specific identifiers (5) + recurring (20) = 60
    let memory = TieredMemory::sim(42);
    let record = FailureRecord::new(
        "what is the invoice total",
        "guessed the number from memory",
        "404 not found",
        FailureCategory::Fabrication,
        SeverityLevel::Medium,
    )
    .with_tool_call(ToolCall::named("http_request"));
    let mut lesson = Lesson::new(
        "tool:http_request",
        "Invoice 99817 must be fetched from '/billing/v2', not guessed",
        LessonType::OneOff,
        0.7,
        0,
    );
    lesson.record_occurrence(10);

    let result = memory.commit(&record, lesson).await.unwrap();
    assert_eq!(result.evaluation.score, 60);
    assert_eq!(result.tier, Tier::SkillCache);
    assert!(result.cached);
}

#[tokio::test]
async fn test_worked_example_one_off_lands_in_archive() {
    // GaveUpEarly (20) + specific identifiers (5) + first occurrence (10) = 35
    let memory = TieredMemory::sim(42);
    let record = FailureRecord::new(
        "generate the acme report",
        "stopped after the first empty page",
        "0 sections rendered",
        FailureCategory::GaveUpEarly,
        SeverityLevel::Low,
    );
    let lesson = Lesson::new(
        "report generation for 'acme corp'",
        "The 'acme corp' account uses invoice id 99817 for Q3",
        LessonType::OneOff,
        0.5,
        0,
    );

    let result = memory.commit(&record, lesson).await.unwrap();
    assert_eq!(result.evaluation.score, 35);
    assert_eq!(result.tier, Tier::Archive);
    assert!(!result.cached);

    // Archive lessons never auto-inject, only explicit search finds them
    assert!(memory.retrieve("sql_query").await.unwrap().is_empty());
    let found = memory.search_archive("acme", 10).await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn test_rubric_is_deterministic_across_instances() {
    let record = sql_record();
    let lesson = sql_lesson();

    let first = Rubric::default().evaluate(&record, &lesson);
    for _ in 0..10 {
        let again = Rubric::default().evaluate(&record, &lesson);
        assert_eq!(first.score, again.score);
        assert_eq!(first.tier, again.tier);
    }
}

// =============================================================================
// Full Audit Workflow
// =============================================================================

#[tokio::test]
async fn test_audit_full_workflow() {
    let memory = Arc::new(TieredMemory::sim(42));
    let audit = AuditLoop::new(
        Arc::clone(&memory),
        SimTeacher::with_seed(42),
        HeuristicGiveUpDetector::default(),
    );

    // A confident answer produces nothing
    let none = audit
        .on_response("find Q3 revenue", "Q3 revenue was 1.2M", "1 row", None)
        .await
        .unwrap();
    assert!(none.is_none());

    // A give-up with a tool call produces a committed, retrievable lesson
    let committed = audit
        .on_response(
            "find Q3 revenue by fiscal quarter",
            "I was unable to find any revenue data",
            "0 rows",
            Some(ToolCall::named("sql_query")),
        )
        .await
        .unwrap()
        .expect("give-up must produce a lesson");

    let injected = memory.retrieve("sql_query").await.unwrap();
    assert!(injected.iter().any(|l| l.id == committed.lesson_id));

    // The same failure recurring dedups into one lesson with a higher score
    let again = audit
        .on_response(
            "find Q4 revenue by fiscal quarter",
            "cannot find the revenue table",
            "0 rows",
            Some(ToolCall::named("sql_query")),
        )
        .await
        .unwrap()
        .expect("recurrence must re-commit");
    assert_eq!(again.lesson_id, committed.lesson_id);
    assert!(again.evaluation.score > committed.evaluation.score);
}

// =============================================================================
// Eviction and Rebuild
// =============================================================================

#[tokio::test]
async fn test_evict_zero_days_keeps_durable_archive_copies() {
    let memory = TieredMemory::sim(42);
    memory.commit(&sql_record(), sql_lesson()).await.unwrap();

    let before = memory.stats().await.unwrap();
    let evicted = memory.evict(0).await.unwrap();
    let after = memory.stats().await.unwrap();

    assert_eq!(evicted.tools_evicted, 1);
    assert_eq!(evicted.lessons_evicted, 1);
    assert_eq!(before.durable_total(), after.durable_total());
    assert_eq!(after.durable_archive, 1);
    assert_eq!(after.cache_keys, 0);

    // The durable record is an evicted archive copy, still searchable
    let found = memory.search_archive("fiscal", 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].state, LessonState::Evicted);
}

#[tokio::test]
async fn test_rebuild_retrieve_equivalence() {
    let memory = TieredMemory::sim(42);

    let kernel_record = FailureRecord::new(
        "clean up the workspace",
        "removed the directory without asking",
        "directory deleted",
        FailureCategory::UnsafeAction,
        SeverityLevel::Critical,
    );
    let kernel_lesson = Lesson::new(
        "destructive filesystem operation",
        "Never delete without an explicit confirmation step",
        LessonType::Syntax,
        0.9,
        0,
    );
    memory.commit(&kernel_record, kernel_lesson).await.unwrap();
    memory.commit(&sql_record(), sql_lesson()).await.unwrap();

    let before = memory.retrieve("sql_query").await.unwrap();

    // Rebuild must reproduce the same injection set from durable state alone
    memory.rebuild().await.unwrap();
    let after = memory.retrieve("sql_query").await.unwrap();

    let before_ids: Vec<_> = before.iter().map(|l| l.id).collect();
    let after_ids: Vec<_> = after.iter().map(|l| l.id).collect();
    assert_eq!(before_ids, after_ids);
}

#[tokio::test]
async fn test_evicted_lesson_recoverable_via_rescore() {
    let memory = TieredMemory::sim(42);
    let committed = memory.commit(&sql_record(), sql_lesson()).await.unwrap();

    memory.clock().advance_days(40);
    memory.evict(30).await.unwrap();
    assert!(memory.retrieve("sql_query").await.unwrap().is_empty());

    let rescored = memory.rescore(&sql_record(), committed.lesson_id).await.unwrap();
    assert_eq!(rescored.tier, Tier::SkillCache);
    assert_eq!(memory.retrieve("sql_query").await.unwrap().len(), 1);
}

// =============================================================================
// Resolver Properties
// =============================================================================

#[tokio::test]
async fn test_resolver_direct_hit_dominates_keywords() {
    let memory = TieredMemory::sim(42);

    // The text screams file_io, but the explicit tool call wins
    let record = FailureRecord::new(
        "read the config file and load the csv",
        "tried to open the file path",
        "file read failed",
        FailureCategory::GaveUpEarly,
        SeverityLevel::Medium,
    )
    .with_tool_call(ToolCall::named("sql_query"));

    let result = memory.commit(&record, sql_lesson()).await.unwrap();
    assert_eq!(result.resolution.tool(), Some("sql_query"));
}

#[tokio::test]
async fn test_resolver_keyword_fallback_needs_two_matches() {
    let memory = TieredMemory::sim(42);

    // One weak keyword hit resolves nothing; the skill-tier score demotes
    let record = FailureRecord::new(
        "summarize the meeting about the file",
        "missed the approval requirement",
        "done",
        FailureCategory::GaveUpEarly,
        SeverityLevel::Medium,
    );
    let lesson = Lesson::new(
        "meeting summaries",
        "Summaries need compliance approval before distribution",
        LessonType::Business,
        0.7,
        0,
    );

    let result = memory.commit(&record, lesson).await.unwrap();
    assert!(result.resolution.tool().is_none());
    assert_eq!(result.tier, Tier::Archive);
}

// =============================================================================
// Fault Injection
// =============================================================================

#[tokio::test]
async fn test_commit_all_or_nothing_under_durable_write_fault() {
    let sim = Simulation::new(SimConfig::with_seed(42))
        .with_fault(FaultConfig::new(FaultType::DurableWriteFail, 1.0).with_filter("put"));

    sim.run(|env| async move {
        let store = Arc::new(SimLessonStore::with_fault_injector(
            env.config,
            Arc::clone(&env.faults),
        ));
        let memory = TieredMemory::new(Arc::clone(&store));

        let result = memory.commit(&sql_record(), sql_lesson()).await;
        assert!(matches!(result, Err(MemoryError::DurablePersist { .. })));

        // Nothing durable, nothing retrievable
        assert_eq!(store.lesson_count(), 0);
        assert!(memory.retrieve("sql_query").await?.is_empty());
        Ok::<_, MemoryError>(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_multi_seed_end_to_end_determinism() {
    for seed in [0, 1, 42, 12345] {
        let run = |seed: u64| async move {
            let memory = Arc::new(TieredMemory::sim(seed));
            let audit = AuditLoop::new(
                Arc::clone(&memory),
                SimTeacher::with_seed(seed),
                HeuristicGiveUpDetector::default(),
            );
            let committed = audit
                .on_response(
                    "find Q3 revenue by fiscal quarter",
                    "I was unable to find any revenue data",
                    "0 rows",
                    Some(ToolCall::named("sql_query")),
                )
                .await
                .unwrap()
                .unwrap();
            (committed.lesson_id, committed.tier, committed.evaluation.score)
        };

        let a = run(seed).await;
        let b = run(seed).await;
        assert_eq!(a, b, "seed {seed} must reproduce the same outcome");
    }
}
