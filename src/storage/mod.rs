//! Storage - Durable Lesson Store Trait and Implementations
//!
//! TigerStyle: Abstract storage with simulation-first testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     LessonStore Trait                        │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                                ↑
//!          │                                │
//! ┌────────┴────────┐              ┌────────┴────────┐
//! │ SimLessonStore  │              │ production back │
//! │   (testing)     │              │ ends (external) │
//! └─────────────────┘              └─────────────────┘
//! ```
//!
//! # Simulation-First
//!
//! Tests are written BEFORE implementation. `SimLessonStore` enables
//! deterministic testing with fault injection.

mod backend;
mod error;
mod sim;

pub use backend::LessonStore;
pub use error::{StorageError, StorageResult};
pub use sim::SimLessonStore;
