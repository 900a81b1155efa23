//! Lessons - Durable Rules Learned From Failures
//!
//! `TigerStyle`: Type-safe enums, explicit state machine, deterministic ids.
//!
//! A lesson's id is a UUID v5 over its normalized trigger and lesson type,
//! so the same lesson always maps to the same id. That makes near-duplicate
//! detection a plain key lookup.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    LESSON_CONFIDENCE_MAX, LESSON_CONFIDENCE_MIN, LESSON_RULE_TEXT_BYTES_MAX,
    LESSON_TRIGGER_BYTES_MAX,
};

/// Namespace for deterministic lesson ids.
const LESSON_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6c, 0x65, 0x73, 0x73, 0x6f, 0x6e, 0x2d, 0x6d, 0x65, 0x6d, 0x6f, 0x72, 0x79, 0x2d, 0x69,
    0x64,
]);

// =============================================================================
// Lesson Types
// =============================================================================

/// What kind of rule a lesson encodes.
///
/// `TigerStyle`: Exhaustive enum prevents invalid states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    /// Universally applicable usage rule (API shape, query syntax)
    Syntax,
    /// Domain- or deployment-specific rule
    Business,
    /// Tied to one specific instance, unlikely to recur
    #[default]
    OneOff,
}

impl LessonType {
    /// Get all lesson types in order.
    #[must_use]
    pub fn all() -> &'static [LessonType] {
        &[LessonType::Syntax, LessonType::Business, LessonType::OneOff]
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonType::Syntax => "syntax",
            LessonType::Business => "business",
            LessonType::OneOff => "one_off",
        }
    }

    /// Parse from string, defaulting to `OneOff` for unknown types.
    #[must_use]
    pub fn from_str_or_one_off(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "syntax" => LessonType::Syntax,
            "business" => LessonType::Business,
            _ => LessonType::OneOff,
        }
    }
}

impl std::fmt::Display for LessonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tiers
// =============================================================================

/// Storage tier of a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Always injected into every agent context
    Kernel,
    /// Injected only when the associated tool is in play
    SkillCache,
    /// Durable, surfaced on demand only
    #[default]
    Archive,
}

impl Tier {
    /// Get all tiers in order of privilege.
    #[must_use]
    pub fn all() -> &'static [Tier] {
        &[Tier::Kernel, Tier::SkillCache, Tier::Archive]
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Kernel => "kernel",
            Tier::SkillCache => "skill_cache",
            Tier::Archive => "archive",
        }
    }

    /// Parse from string, defaulting to Archive for unknown tiers.
    #[must_use]
    pub fn from_str_or_archive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "kernel" => Tier::Kernel,
            "skill_cache" => Tier::SkillCache,
            _ => Tier::Archive,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Lesson State Machine
// =============================================================================

/// Lifecycle state of a lesson.
///
/// Proposed -> Committed -> {Active, Evicted, Archived}.
/// Evicted only from Active, re-promotable. Archived is terminal unless an
/// operator re-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
    /// Diagnosed by the teacher, not yet persisted
    #[default]
    Proposed,
    /// Durably persisted
    Committed,
    /// Resident in kernel or skill cache
    Active,
    /// Dropped from the fast tier, durable copy retained
    Evicted,
    /// Archive tier, surfaced on demand
    Archived,
}

impl LessonState {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonState::Proposed => "proposed",
            LessonState::Committed => "committed",
            LessonState::Active => "active",
            LessonState::Evicted => "evicted",
            LessonState::Archived => "archived",
        }
    }

    /// Check whether a transition to `next` is legal.
    #[must_use]
    pub fn can_transition_to(&self, next: LessonState) -> bool {
        use LessonState::{Active, Archived, Committed, Evicted, Proposed};
        matches!(
            (self, next),
            (Proposed, Committed)
                | (Committed, Active | Archived)
                | (Active, Evicted | Archived)
                | (Evicted, Active | Archived)
                // Operator re-score is the only exit from Archived
                | (Archived, Active)
        )
    }
}

impl std::fmt::Display for LessonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Lesson
// =============================================================================

/// A durable lesson learned from an agent failure.
///
/// Mutated only via occurrence increment and tier re-tag; destroyed only by
/// operator purge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Deterministic id (UUID v5 over normalized trigger + type)
    pub id: Uuid,
    /// Condition under which the lesson applies
    pub trigger: String,
    /// The rule the agent should follow
    pub rule_text: String,
    /// Kind of rule
    pub lesson_type: LessonType,
    /// Teacher confidence in [0, 1]
    pub confidence: f64,
    /// How many times this failure has been observed
    pub occurrence_count: u32,
    /// Current storage tier
    pub tier: Tier,
    /// Lifecycle state
    pub state: LessonState,
    /// Creation time, ms since epoch
    pub created_at_ms: u64,
    /// Last mutation time, ms since epoch
    pub updated_at_ms: u64,
}

impl Lesson {
    /// Create a new proposed lesson.
    ///
    /// # Panics
    /// Panics if trigger or rule text are empty or oversized, or confidence
    /// is out of range.
    #[must_use]
    pub fn new(
        trigger: impl Into<String>,
        rule_text: impl Into<String>,
        lesson_type: LessonType,
        confidence: f64,
        now_ms: u64,
    ) -> Self {
        let trigger = trigger.into();
        let rule_text = rule_text.into();

        // TigerStyle: Preconditions
        assert!(!trigger.is_empty(), "trigger must not be empty");
        assert!(
            trigger.len() <= LESSON_TRIGGER_BYTES_MAX,
            "trigger too long: {} > {}",
            trigger.len(),
            LESSON_TRIGGER_BYTES_MAX
        );
        assert!(!rule_text.is_empty(), "rule text must not be empty");
        assert!(
            rule_text.len() <= LESSON_RULE_TEXT_BYTES_MAX,
            "rule text too long: {} > {}",
            rule_text.len(),
            LESSON_RULE_TEXT_BYTES_MAX
        );
        assert!(
            (LESSON_CONFIDENCE_MIN..=LESSON_CONFIDENCE_MAX).contains(&confidence),
            "confidence must be {LESSON_CONFIDENCE_MIN}-{LESSON_CONFIDENCE_MAX}, got {confidence}"
        );

        let id = Self::deterministic_id(&trigger, lesson_type);

        Self {
            id,
            trigger,
            rule_text,
            lesson_type,
            confidence,
            occurrence_count: 1,
            tier: Tier::Archive,
            state: LessonState::Proposed,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    /// Compute the deterministic id for a trigger/type pair.
    ///
    /// Normalization (lowercase, collapsed whitespace) means trivially
    /// reworded triggers dedup to the same lesson.
    #[must_use]
    pub fn deterministic_id(trigger: &str, lesson_type: LessonType) -> Uuid {
        let normalized = Self::normalize_trigger(trigger);
        let key = format!("{}:{}", lesson_type.as_str(), normalized);
        Uuid::new_v5(&LESSON_ID_NAMESPACE, key.as_bytes())
    }

    /// Normalize a trigger for id derivation and durable lookups.
    #[must_use]
    pub fn normalize_trigger(trigger: &str) -> String {
        trigger
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Record another occurrence of the same failure.
    pub fn record_occurrence(&mut self, now_ms: u64) {
        self.occurrence_count = self.occurrence_count.saturating_add(1);
        self.updated_at_ms = now_ms;
    }

    /// Re-tag tier and state. Tier changes are metadata only (I2 style);
    /// the record itself stays in the durable store.
    ///
    /// # Panics
    /// Panics on an illegal state transition.
    pub fn retag(&mut self, tier: Tier, state: LessonState, now_ms: u64) {
        // Precondition
        assert!(
            self.state.can_transition_to(state) || self.state == state,
            "illegal lesson state transition: {} -> {}",
            self.state,
            state
        );

        self.tier = tier;
        self.state = state;
        self.updated_at_ms = now_ms;
    }

    /// Check if this lesson is recurring.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.occurrence_count >= crate::constants::RUBRIC_FREQUENCY_RECURRING_COUNT_MIN
    }

    /// The tool binding encoded in the trigger, if any.
    ///
    /// Tool-attributed lessons carry a `tool:<name>` trigger prefix
    /// (the audit loop composes it from the resolver's attribution).
    #[must_use]
    pub fn tool_key(&self) -> Option<&str> {
        self.trigger
            .strip_prefix("tool:")
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// The skill-cache partition key for this lesson.
    ///
    /// The `tool:` binding when present, otherwise the normalized trigger
    /// itself (triggers may be bare tool identifiers or topic tags).
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self.tool_key() {
            Some(key) => key.to_lowercase(),
            None => Self::normalize_trigger(&self.trigger),
        }
    }

    /// Check whether this lesson's trigger matches a tool key.
    ///
    /// Case-insensitive containment, so both `tool:sql_query` and a topic
    /// trigger mentioning the tool match a lookup for `sql_query`.
    #[must_use]
    pub fn matches_tool_key(&self, tool_key: &str) -> bool {
        let key = tool_key.to_lowercase();
        !key.is_empty() && Self::normalize_trigger(&self.trigger).contains(&key)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson() -> Lesson {
        Lesson::new(
            "DELETE without WHERE",
            "Always include a WHERE clause in DELETE statements",
            LessonType::Syntax,
            0.9,
            1000,
        )
    }

    #[test]
    fn test_lesson_type_round_trip() {
        for lt in LessonType::all() {
            assert_eq!(LessonType::from_str_or_one_off(lt.as_str()), *lt);
        }
        assert_eq!(LessonType::from_str_or_one_off("junk"), LessonType::OneOff);
    }

    #[test]
    fn test_tier_round_trip() {
        for tier in Tier::all() {
            assert_eq!(Tier::from_str_or_archive(tier.as_str()), *tier);
        }
        assert_eq!(Tier::from_str_or_archive("junk"), Tier::Archive);
    }

    #[test]
    fn test_state_machine_legal_transitions() {
        use LessonState::{Active, Archived, Committed, Evicted, Proposed};

        assert!(Proposed.can_transition_to(Committed));
        assert!(Committed.can_transition_to(Active));
        assert!(Committed.can_transition_to(Archived));
        assert!(Active.can_transition_to(Evicted));
        assert!(Active.can_transition_to(Archived));
        assert!(Evicted.can_transition_to(Active));
        assert!(Evicted.can_transition_to(Archived));
        // Operator re-score hook
        assert!(Archived.can_transition_to(Active));
    }

    #[test]
    fn test_state_machine_illegal_transitions() {
        use LessonState::{Active, Archived, Committed, Evicted, Proposed};

        assert!(!Proposed.can_transition_to(Active));
        assert!(!Proposed.can_transition_to(Evicted));
        assert!(!Committed.can_transition_to(Proposed));
        assert!(!Committed.can_transition_to(Evicted));
        assert!(!Evicted.can_transition_to(Proposed));
        assert!(!Archived.can_transition_to(Evicted));
    }

    #[test]
    fn test_deterministic_id_stable() {
        let a = Lesson::deterministic_id("DELETE without WHERE", LessonType::Syntax);
        let b = Lesson::deterministic_id("delete   without  where", LessonType::Syntax);
        assert_eq!(a, b, "normalization must collapse case and whitespace");

        let c = Lesson::deterministic_id("DELETE without WHERE", LessonType::Business);
        assert_ne!(a, c, "different lesson types must get different ids");
    }

    #[test]
    fn test_new_lesson_defaults() {
        let l = lesson();
        assert_eq!(l.occurrence_count, 1);
        assert_eq!(l.tier, Tier::Archive);
        assert_eq!(l.state, LessonState::Proposed);
        assert_eq!(l.created_at_ms, 1000);
        assert_eq!(l.updated_at_ms, 1000);
        assert!(!l.is_recurring());
    }

    #[test]
    fn test_record_occurrence() {
        let mut l = lesson();
        l.record_occurrence(2000);
        assert_eq!(l.occurrence_count, 2);
        assert_eq!(l.updated_at_ms, 2000);
        assert_eq!(l.created_at_ms, 1000);
        assert!(l.is_recurring());
    }

    #[test]
    fn test_retag() {
        let mut l = lesson();
        l.retag(Tier::Kernel, LessonState::Committed, 2000);
        assert_eq!(l.tier, Tier::Kernel);
        assert_eq!(l.state, LessonState::Committed);
        assert_eq!(l.updated_at_ms, 2000);

        l.retag(Tier::Kernel, LessonState::Active, 3000);
        l.retag(Tier::Archive, LessonState::Evicted, 4000);
        assert_eq!(l.tier, Tier::Archive);
    }

    #[test]
    #[should_panic(expected = "illegal lesson state transition")]
    fn test_retag_illegal() {
        let mut l = lesson();
        l.retag(Tier::Kernel, LessonState::Evicted, 2000);
    }

    #[test]
    #[should_panic(expected = "trigger must not be empty")]
    fn test_empty_trigger() {
        let _ = Lesson::new("", "rule", LessonType::Syntax, 0.5, 0);
    }

    #[test]
    #[should_panic(expected = "confidence must be")]
    fn test_invalid_confidence() {
        let _ = Lesson::new("t", "rule", LessonType::Syntax, 1.5, 0);
    }

    #[test]
    fn test_tool_key_parsing() {
        let bound = Lesson::new("tool:sql_query", "rule", LessonType::Syntax, 0.5, 0);
        assert_eq!(bound.tool_key(), Some("sql_query"));
        assert_eq!(bound.cache_key(), "sql_query");
        assert!(bound.matches_tool_key("sql_query"));
        assert!(bound.matches_tool_key("SQL_QUERY"));

        let topical = Lesson::new("fiscal year reporting", "rule", LessonType::Business, 0.5, 0);
        assert_eq!(topical.tool_key(), None);
        assert_eq!(topical.cache_key(), "fiscal year reporting");
        assert!(!topical.matches_tool_key("sql_query"));
    }

    #[test]
    fn test_lesson_serde_round_trip() {
        let l = lesson();
        let json = serde_json::to_string(&l).unwrap();
        let parsed: Lesson = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, l);
    }

    #[test]
    fn test_tier_serde() {
        let json = serde_json::to_string(&Tier::SkillCache).unwrap();
        assert_eq!(json, r#""skill_cache""#);
    }
}
