//! Failure Records - Immutable Evidence of Agent Failures
//!
//! `TigerStyle`: Type-safe enums, explicit validation, no invalid states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Failure Categories
// =============================================================================

/// Categories of agent failure.
///
/// `TigerStyle`: Exhaustive enum prevents invalid states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Agent performed a destructive or dangerous action
    UnsafeAction,
    /// Agent invented facts not supported by tool output
    Fabrication,
    /// Agent abandoned the task before exhausting its options
    GaveUpEarly,
    /// Any other failure
    #[default]
    Other,
}

impl FailureCategory {
    /// Get all failure categories in order.
    #[must_use]
    pub fn all() -> &'static [FailureCategory] {
        &[
            FailureCategory::UnsafeAction,
            FailureCategory::Fabrication,
            FailureCategory::GaveUpEarly,
            FailureCategory::Other,
        ]
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::UnsafeAction => "unsafe_action",
            FailureCategory::Fabrication => "fabrication",
            FailureCategory::GaveUpEarly => "gave_up_early",
            FailureCategory::Other => "other",
        }
    }

    /// Parse from string, defaulting to Other for unknown categories.
    #[must_use]
    pub fn from_str_or_other(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "unsafe_action" => FailureCategory::UnsafeAction,
            "fabrication" => FailureCategory::Fabrication,
            "gave_up_early" => FailureCategory::GaveUpEarly,
            _ => FailureCategory::Other,
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity Levels
// =============================================================================

/// Severity of an observed failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    /// Cosmetic or negligible impact
    Low,
    /// Wrong answer, recoverable
    #[default]
    Medium,
    /// Data loss risk or user-visible damage
    High,
    /// Irreversible damage or security impact
    Critical,
}

impl SeverityLevel {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Low => "low",
            SeverityLevel::Medium => "medium",
            SeverityLevel::High => "high",
            SeverityLevel::Critical => "critical",
        }
    }

    /// Check if this severity warrants the critical scoring bonus.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(self, SeverityLevel::Critical)
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tool Call
// =============================================================================

/// A tool invocation captured from the agent transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the invoked tool
    pub tool: String,
    /// Arguments as passed, structure depends on the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call.
    ///
    /// # Panics
    /// Panics if the tool name is empty.
    #[must_use]
    pub fn new(tool: impl Into<String>, arguments: serde_json::Value) -> Self {
        let tool = tool.into();

        // TigerStyle: Preconditions
        assert!(!tool.is_empty(), "tool name must not be empty");

        Self { tool, arguments }
    }

    /// Create a tool call with no arguments.
    #[must_use]
    pub fn named(tool: impl Into<String>) -> Self {
        Self::new(tool, serde_json::Value::Null)
    }
}

// =============================================================================
// Failure Record
// =============================================================================

/// Immutable record of a single agent failure.
///
/// `TigerStyle`: Constructed once, never mutated. The audit loop builds one
/// per diagnosed failure; the resolver and rubric read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// The user request that led to the failure
    pub request: String,
    /// The agent's reasoning trace
    pub reasoning_trace: String,
    /// Explicit tool call, if the transcript captured one
    pub tool_call: Option<ToolCall>,
    /// Raw output of the failing tool invocation
    pub tool_output: String,
    /// Failure category
    pub category: FailureCategory,
    /// Observed severity
    pub severity: SeverityLevel,
    /// When the failure was recorded
    pub recorded_at: DateTime<Utc>,
}

impl FailureRecord {
    /// Create a new failure record, stamped with the current wall clock.
    ///
    /// # Panics
    /// Panics if the request is empty.
    #[must_use]
    pub fn new(
        request: impl Into<String>,
        reasoning_trace: impl Into<String>,
        tool_output: impl Into<String>,
        category: FailureCategory,
        severity: SeverityLevel,
    ) -> Self {
        let request = request.into();

        // TigerStyle: Preconditions
        assert!(!request.is_empty(), "request must not be empty");

        Self {
            request,
            reasoning_trace: reasoning_trace.into(),
            tool_call: None,
            tool_output: tool_output.into(),
            category,
            severity,
            recorded_at: Utc::now(),
        }
    }

    /// Attach an explicit tool call.
    #[must_use]
    pub fn with_tool_call(mut self, tool_call: ToolCall) -> Self {
        self.tool_call = Some(tool_call);
        self
    }

    /// Override the recorded-at timestamp (simulated clocks pass ms).
    #[must_use]
    pub fn with_recorded_at_ms(mut self, now_ms: u64) -> Self {
        self.recorded_at = DateTime::from_timestamp_millis(now_ms.min(i64::MAX as u64) as i64)
            .unwrap_or_else(Utc::now);
        self
    }

    /// Name of the explicitly invoked tool, if any.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        self.tool_call.as_ref().map(|tc| tc.tool.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
