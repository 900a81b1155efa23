//! # Lesson Memory
//!
//! A tiered lesson-memory library for self-correcting AI agents, with
//! deterministic simulation testing.
//!
//! ## Features
//!
//! - **Three lesson tiers**: kernel (always injected), skill cache
//!   (injected when the matching tool is in scope), archive (durable,
//!   searched on demand)
//! - **Deterministic triage**: a pure severity/generality/frequency rubric
//!   places every lesson, no model in the loop
//! - **Two-phase tool attribution**: explicit tool calls win; keyword
//!   scoring falls back and fails closed on ties
//! - **Differential audit loop**: a give-up detector gates a
//!   timeout-bounded teacher diagnosis that becomes a committed lesson
//! - **Graceful degradation**: the cache and kernel are disposable
//!   projections; the durable store is the only source of truth
//! - **Deterministic testing**: full DST with seeded fault injection
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lesson_memory::memory::TieredMemory;
//! use lesson_memory::failure::{FailureCategory, FailureRecord, SeverityLevel, ToolCall};
//! use lesson_memory::lesson::{Lesson, LessonType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fully simulated controller (deterministic, seed 42)
//!     let memory = TieredMemory::sim(42);
//!
//!     let record = FailureRecord::new(
//!         "find Q3 revenue",
//!         "queried calendar quarters instead of fiscal",
//!         "no rows returned",
//!         FailureCategory::GaveUpEarly,
//!         SeverityLevel::Medium,
//!     )
//!     .with_tool_call(ToolCall::named("sql_query"));
//!
//!     let lesson = Lesson::new(
//!         "tool:sql_query",
//!         "Fiscal year starts in February; aggregate by fiscal quarter",
//!         LessonType::Business,
//!         0.8,
//!         0,
//!     );
//!
//!     let committed = memory.commit(&record, lesson).await?;
//!     println!("tier: {:?}", committed.tier);
//!
//!     // Kernel lessons plus anything bound to sql_query
//!     let injected = memory.retrieve("sql_query").await?;
//!     println!("injecting {} lessons", injected.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                AuditLoop (detect → diagnose)            │
//! ├─────────────────────────────────────────────────────────┤
//! │  ToolResolver     │  Rubric          │  sanitize        │
//! ├─────────────────────────────────────────────────────────┤
//! │  Kernel projection      │ Always injected, rebuildable │
//! │  SkillCache             │ Tool-keyed, evictable        │
//! │  LessonStore (durable)  │ Sole source of truth         │
//! ├─────────────────────────────────────────────────────────┤
//! │  DST Framework          │ Fault injection + simulation │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Simulation-First Philosophy
//!
//! > "If you're not testing with fault injection, you're not testing."
//!
//! Every external dependency has a deterministic simulation implementation:
//!
//! ```rust,ignore
//! use lesson_memory::dst::{Simulation, SimConfig, FaultConfig, FaultType};
//!
//! let sim = Simulation::new(SimConfig::with_seed(42))
//!     .with_fault(FaultConfig::new(FaultType::DurableWriteFail, 0.1));
//!
//! sim.run(|env| async move {
//!     // Same seed = same faults = reproducible bugs
//!     Ok::<_, lesson_memory::memory::MemoryError>(())
//! }).await.unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod audit;
pub mod cache;
pub mod constants;
pub mod dst;
pub mod failure;
pub mod lesson;
pub mod memory;
pub mod resolver;
pub mod rubric;
pub mod storage;
pub mod telemetry;

// Re-export common types
pub use constants::*;
pub use dst::{
    create_simulation,
    run_property_tests,
    test_seeds,
    DeterministicRng,
    FaultConfig,
    FaultInjector,
    FaultInjectorBuilder,
    FaultType,
    // Property-based testing
    PropertyTest,
    PropertyTestFailure,
    PropertyTestResult,
    PropertyTestable,
    SimClock,
    SimConfig,
    SimEnvironment,
    Simulation,
    TimeAdvanceConfig,
};

// Data model exports
pub use failure::{FailureCategory, FailureRecord, SeverityLevel, ToolCall};
pub use lesson::{Lesson, LessonState, LessonType, Tier};

// Resolver exports
pub use resolver::{Resolution, SignatureRegistry, ToolResolver, ToolSignature};

// Rubric exports
pub use rubric::{Evaluation, Rubric, RubricConfig, ScoreBreakdown};

// Storage exports
pub use storage::{LessonStore, SimLessonStore, StorageError, StorageResult};

// Cache exports
pub use cache::{CacheEntry, CacheError, SkillCache};

// Tiered memory exports (main API)
pub use memory::{
    CommitResult, EvictionStats, MemoryError, MemoryStats, RebuildStats, TieredMemory,
    TieredMemoryConfig,
};

// Audit loop exports
pub use audit::{
    AuditConfig, AuditError, AuditLoop, Diagnosis, DiagnosisRequest, GiveUpDetector,
    HeuristicGiveUpDetector, SimTeacher, Teacher, TeacherError,
};
