//! Differential Audit Loop - Detect, Diagnose, Commit
//!
//! TigerStyle: Sim-first, bounded teacher calls, graceful degradation.
//!
//! # Overview
//!
//! The audit loop watches agent responses for give-up signals. When one
//! fires, the transcript is sanitized and sent to a stronger teacher model
//! for diagnosis under a hard timeout. A successful diagnosis becomes a
//! lesson committed through [`TieredMemory`]. Every failure short of a
//! durable commit error drops the audit silently: the agent's own response
//! path is never blocked on the teacher.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lesson_memory::audit::{AuditLoop, HeuristicGiveUpDetector, SimTeacher};
//! use lesson_memory::memory::TieredMemory;
//!
//! #[tokio::main]
//! async fn main() {
//!     let memory = Arc::new(TieredMemory::sim(42));
//!     let audit = AuditLoop::new(
//!         Arc::clone(&memory),
//!         SimTeacher::with_seed(42),
//!         HeuristicGiveUpDetector::default(),
//!     );
//!
//!     let outcome = audit
//!         .on_response(
//!             "find Q3 revenue",
//!             "I was unable to find any revenue data",
//!             "0 rows",
//!             None,
//!         )
//!         .await
//!         .unwrap();
//!     assert!(outcome.is_some());
//! }
//! ```

mod sanitize;
mod sim;

pub use sanitize::sanitize;
pub use sim::{HeuristicGiveUpDetector, SimTeacher};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    AUDIT_TEACHER_TIMEOUT_MS_DEFAULT, LESSON_RULE_TEXT_BYTES_MAX, LESSON_TRIGGER_BYTES_MAX,
};
use crate::failure::{FailureCategory, FailureRecord, SeverityLevel, ToolCall};
use crate::lesson::{Lesson, LessonType};
use crate::memory::{CommitResult, MemoryError, TieredMemory};
use crate::storage::{LessonStore, StorageError};

// =============================================================================
// Traits
// =============================================================================

/// Detects give-up signals in agent responses. Pure and synchronous.
pub trait GiveUpDetector: Send + Sync {
    /// Check whether a response looks like the agent gave up.
    fn is_give_up(&self, response: &str, tool_output: &str) -> bool;
}

/// A stronger model that diagnoses failures into lessons.
#[async_trait]
pub trait Teacher: Send + Sync {
    /// Diagnose a failure from its sanitized transcript.
    ///
    /// # Errors
    /// Returns `TeacherError` when no diagnosis can be produced.
    async fn diagnose(&self, request: &DiagnosisRequest) -> Result<Diagnosis, TeacherError>;

    /// Teacher name for logging.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Data Types
// =============================================================================

/// Sanitized transcript forwarded to the teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    /// The user request the agent was working on
    pub request: String,
    /// The agent's final response
    pub response: String,
    /// Output from the last tool call
    pub tool_output: String,
    /// Name of the tool involved, when known
    pub tool_name: Option<String>,
}

/// A teacher's diagnosis of a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    /// What went wrong
    pub cause: FailureCategory,
    /// The corrective rule to remember
    pub rule_text: String,
    /// How general the rule is
    pub lesson_type: LessonType,
    /// Teacher confidence in [0, 1]
    pub confidence: f64,
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors from teacher diagnosis.
#[derive(Debug, Clone, Error)]
pub enum TeacherError {
    /// The teacher cannot produce a diagnosis right now
    #[error("diagnosis unavailable: {message}")]
    DiagnosisUnavailable {
        /// Failure detail
        message: String,
    },

    /// The teacher call exceeded its deadline
    #[error("teacher timed out after {duration_ms}ms")]
    Timeout {
        /// Deadline in milliseconds
        duration_ms: u64,
    },

    /// The teacher returned something unusable
    #[error("invalid teacher response: {message}")]
    InvalidResponse {
        /// What was wrong with the response
        message: String,
    },
}

impl TeacherError {
    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::DiagnosisUnavailable {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Check if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors from the audit loop.
///
/// Teacher failures never surface here; they drop the audit. Only durable
/// commit and store failures propagate.
#[derive(Debug, Clone, Error)]
pub enum AuditError {
    /// Committing the diagnosed lesson failed at the durable boundary
    #[error("lesson commit failed: {message}")]
    Commit {
        /// Underlying memory error
        message: String,
    },

    /// Durable lookup during dedup failed
    #[error("durable lookup failed: {message}")]
    Storage {
        /// Underlying storage error
        message: String,
    },
}

impl From<MemoryError> for AuditError {
    fn from(err: MemoryError) -> Self {
        AuditError::Commit {
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for AuditError {
    fn from(err: StorageError) -> Self {
        AuditError::Storage {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the audit loop.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Hard deadline for a single teacher call, in milliseconds
    pub teacher_timeout_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            teacher_timeout_ms: AUDIT_TEACHER_TIMEOUT_MS_DEFAULT,
        }
    }
}

impl AuditConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the teacher call deadline.
    ///
    /// # Panics
    /// Panics if the timeout is zero.
    #[must_use]
    pub fn with_teacher_timeout_ms(mut self, timeout_ms: u64) -> Self {
        assert!(timeout_ms > 0, "teacher timeout must be positive");
        self.teacher_timeout_ms = timeout_ms;
        self
    }
}

// =============================================================================
// Audit Loop
// =============================================================================

/// The differential audit loop.
///
/// # Type Parameters
/// - `S`: Durable lesson store behind the memory controller
/// - `T`: Teacher model (`SimTeacher` for testing)
/// - `D`: Give-up detector (`HeuristicGiveUpDetector` for testing)
pub struct AuditLoop<S: LessonStore, T: Teacher, D: GiveUpDetector> {
    memory: Arc<TieredMemory<S>>,
    teacher: T,
    detector: D,
    config: AuditConfig,
}

impl<S: LessonStore, T: Teacher, D: GiveUpDetector> AuditLoop<S, T, D> {
    /// Create an audit loop with default configuration.
    #[must_use]
    pub fn new(memory: Arc<TieredMemory<S>>, teacher: T, detector: D) -> Self {
        Self {
            memory,
            teacher,
            detector,
            config: AuditConfig::default(),
        }
    }

    /// Set the audit configuration.
    #[must_use]
    pub fn with_config(mut self, config: AuditConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the memory controller.
    #[must_use]
    pub fn memory(&self) -> &Arc<TieredMemory<S>> {
        &self.memory
    }

    /// Audit one agent response.
    ///
    /// Returns `Ok(None)` when no lesson was produced: the detector did not
    /// fire, or the teacher timed out, failed, or answered unusably. Returns
    /// `Ok(Some(result))` when a lesson was committed.
    ///
    /// # Errors
    /// `AuditError::Commit` when the durable write-through fails;
    /// `AuditError::Storage` when the dedup lookup fails.
    #[tracing::instrument(skip_all, fields(teacher = self.teacher.name()))]
    pub async fn on_response(
        &self,
        request: &str,
        response: &str,
        tool_output: &str,
        tool_call: Option<ToolCall>,
    ) -> Result<Option<CommitResult>, AuditError> {
        if !self.detector.is_give_up(response, tool_output) {
            return Ok(None);
        }

        let diagnosis_request = DiagnosisRequest {
            request: sanitize(request),
            response: sanitize(response),
            tool_output: sanitize(tool_output),
            tool_name: tool_call.as_ref().map(|tc| tc.tool.clone()),
        };

        let deadline = Duration::from_millis(self.config.teacher_timeout_ms);
        let diagnosis = match tokio::time::timeout(
            deadline,
            self.teacher.diagnose(&diagnosis_request),
        )
        .await
        {
            Ok(Ok(diagnosis)) => diagnosis,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "teacher diagnosis failed, audit dropped");
                return Ok(None);
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.teacher_timeout_ms,
                    "teacher deadline exceeded, audit dropped"
                );
                return Ok(None);
            }
        };

        let now_ms = self.memory.clock().now_ms();
        let trigger = Self::build_trigger(&diagnosis_request);
        let rule_text = truncate_str(&diagnosis.rule_text, LESSON_RULE_TEXT_BYTES_MAX);
        if rule_text.trim().is_empty() {
            tracing::warn!("teacher produced an empty rule, audit dropped");
            return Ok(None);
        }

        let severity = match diagnosis.cause {
            FailureCategory::UnsafeAction => SeverityLevel::High,
            _ => SeverityLevel::Medium,
        };
        let mut record = FailureRecord::new(
            diagnosis_request.request.clone(),
            diagnosis_request.response.clone(),
            diagnosis_request.tool_output.clone(),
            diagnosis.cause,
            severity,
        )
        .with_recorded_at_ms(now_ms);
        if let Some(tc) = tool_call {
            record = record.with_tool_call(tc);
        }

        // Near-duplicate policy: the deterministic id makes the same
        // trigger + type collide, so a durable hit is the same lesson
        // recurring.
        let lesson_id = Lesson::deterministic_id(&trigger, diagnosis.lesson_type);
        let lesson = match self.memory.store().get_lesson(lesson_id).await? {
            Some(mut existing) => {
                existing.record_occurrence(now_ms);
                tracing::debug!(
                    lesson_id = %lesson_id,
                    occurrence_count = existing.occurrence_count,
                    "recurring lesson, occurrence recorded"
                );
                existing
            }
            None => Lesson::new(
                trigger,
                rule_text,
                diagnosis.lesson_type,
                diagnosis.confidence.clamp(0.0, 1.0),
                now_ms,
            ),
        };

        let result = self.memory.commit(&record, lesson).await?;
        Ok(Some(result))
    }

    /// Build the lesson trigger from the diagnosis context.
    ///
    /// A known tool yields a `tool:` binding the skill cache can key on;
    /// otherwise the request text itself is the trigger.
    fn build_trigger(request: &DiagnosisRequest) -> String {
        match &request.tool_name {
            Some(tool) if !tool.trim().is_empty() => {
                truncate_str(&format!("tool:{}", tool.trim()), LESSON_TRIGGER_BYTES_MAX)
            }
            _ => truncate_str(request.request.trim(), LESSON_TRIGGER_BYTES_MAX),
        }
    }
}

fn truncate_str(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

// =============================================================================
// Tests
// =============================================================================


// =============================================================================
// DST Tests - Teacher Fault Injection
// =============================================================================
