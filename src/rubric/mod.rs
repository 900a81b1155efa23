//! Lesson Scoring Rubric
//!
//! Deterministic tier placement for lessons. Same record and lesson always
//! produce the same score, and the full breakdown is returned so operators
//! can audit any placement.
//!
//! `TigerStyle`: Pure function, explicit config, all magic numbers in
//! `constants.rs`.

use serde::{Deserialize, Serialize};

use crate::constants::{
    RUBRIC_FREQUENCY_FIRST_POINTS, RUBRIC_FREQUENCY_RECURRING_COUNT_MIN,
    RUBRIC_FREQUENCY_RECURRING_POINTS, RUBRIC_GENERALITY_BUSINESS_POINTS,
    RUBRIC_GENERALITY_SPECIFIC_POINTS, RUBRIC_GENERALITY_SYNTAX_POINTS,
    RUBRIC_SEVERITY_CRITICAL_BONUS_POINTS, RUBRIC_SEVERITY_FABRICATION_POINTS,
    RUBRIC_SEVERITY_GAVE_UP_EARLY_POINTS, RUBRIC_SEVERITY_OTHER_POINTS,
    RUBRIC_SEVERITY_POINTS_MAX, RUBRIC_SEVERITY_SECURITY_BONUS_POINTS,
    RUBRIC_SEVERITY_UNSAFE_ACTION_POINTS, TIER_KERNEL_SCORE_MIN, TIER_SKILL_CACHE_SCORE_MIN,
};
use crate::failure::{FailureCategory, FailureRecord};
use crate::lesson::{Lesson, LessonType, Tier};

// =============================================================================
// Score Breakdown
// =============================================================================

/// Per-component score, always returned for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Severity component (10-50)
    pub severity: u32,
    /// Generality component (5-30)
    pub generality: u32,
    /// Frequency component (10-20)
    pub frequency: u32,
}

impl ScoreBreakdown {
    /// Total score.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.severity + self.generality + self.frequency
    }
}

/// Result of scoring a lesson against a failure record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Total score
    pub score: u32,
    /// Tier the score maps to
    pub tier: Tier,
    /// Component breakdown
    pub breakdown: ScoreBreakdown,
}

// =============================================================================
// Rubric Configuration
// =============================================================================

/// Tunable rubric parameters.
///
/// Defaults come from `constants.rs`; deployments adjust thresholds and
/// keyword lists without touching the scoring algorithm.
#[derive(Debug, Clone)]
pub struct RubricConfig {
    /// Severity base per category: (unsafe, fabrication, gave-up, other)
    pub severity_unsafe_action: u32,
    /// Base for fabrication failures
    pub severity_fabrication: u32,
    /// Base for gave-up-early failures
    pub severity_gave_up_early: u32,
    /// Base for other failures
    pub severity_other: u32,
    /// Bonus when the record carries critical severity
    pub severity_critical_bonus: u32,
    /// Bonus when the trigger is security-relevant
    pub severity_security_bonus: u32,
    /// Cap on the severity subtotal
    pub severity_max: u32,
    /// Generality for rules with no concrete identifiers
    pub generality_syntax: u32,
    /// Generality for business rules without instance data
    pub generality_business: u32,
    /// Generality for rules embedding specific identifiers
    pub generality_specific: u32,
    /// Frequency for recurring lessons
    pub frequency_recurring: u32,
    /// Frequency for a first occurrence
    pub frequency_first: u32,
    /// Minimum score for kernel placement
    pub tier_kernel_min: u32,
    /// Minimum score for skill-cache placement
    pub tier_skill_cache_min: u32,
    /// Lowercase substrings marking a trigger as security-relevant
    pub security_keywords: Vec<String>,
    /// Lowercase substrings marking a rule as a business rule
    pub business_markers: Vec<String>,
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            severity_unsafe_action: RUBRIC_SEVERITY_UNSAFE_ACTION_POINTS,
            severity_fabrication: RUBRIC_SEVERITY_FABRICATION_POINTS,
            severity_gave_up_early: RUBRIC_SEVERITY_GAVE_UP_EARLY_POINTS,
            severity_other: RUBRIC_SEVERITY_OTHER_POINTS,
            severity_critical_bonus: RUBRIC_SEVERITY_CRITICAL_BONUS_POINTS,
            severity_security_bonus: RUBRIC_SEVERITY_SECURITY_BONUS_POINTS,
            severity_max: RUBRIC_SEVERITY_POINTS_MAX,
            generality_syntax: RUBRIC_GENERALITY_SYNTAX_POINTS,
            generality_business: RUBRIC_GENERALITY_BUSINESS_POINTS,
            generality_specific: RUBRIC_GENERALITY_SPECIFIC_POINTS,
            frequency_recurring: RUBRIC_FREQUENCY_RECURRING_POINTS,
            frequency_first: RUBRIC_FREQUENCY_FIRST_POINTS,
            tier_kernel_min: TIER_KERNEL_SCORE_MIN,
            tier_skill_cache_min: TIER_SKILL_CACHE_SCORE_MIN,
            security_keywords: [
                "password",
                "credential",
                "secret",
                "token",
                "sudo",
                "drop table",
                "rm -rf",
                "privilege",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            business_markers: [
                "policy",
                "invoice",
                "customer",
                "account",
                "billing",
                "approval",
                "compliance",
                "fiscal",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }
}

impl RubricConfig {
    /// Replace the security keyword list.
    #[must_use]
    pub fn with_security_keywords(mut self, keywords: Vec<String>) -> Self {
        self.security_keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Replace the business marker list.
    #[must_use]
    pub fn with_business_markers(mut self, markers: Vec<String>) -> Self {
        self.business_markers = markers.iter().map(|m| m.to_lowercase()).collect();
        self
    }

    /// Override tier thresholds.
    ///
    /// # Panics
    /// Panics unless `skill_cache_min < kernel_min`.
    #[must_use]
    pub fn with_tier_thresholds(mut self, kernel_min: u32, skill_cache_min: u32) -> Self {
        assert!(
            skill_cache_min < kernel_min,
            "skill-cache threshold ({skill_cache_min}) must be below kernel ({kernel_min})"
        );
        self.tier_kernel_min = kernel_min;
        self.tier_skill_cache_min = skill_cache_min;
        self
    }
}

// =============================================================================
// Rubric
// =============================================================================

/// Deterministic lesson scorer.
#[derive(Debug, Clone, Default)]
pub struct Rubric {
    config: RubricConfig,
}

impl Rubric {
    /// Create a rubric with the given configuration.
    #[must_use]
    pub fn new(config: RubricConfig) -> Self {
        Self { config }
    }

    /// Score a lesson against the failure record that produced it.
    ///
    /// Pure and deterministic: no clock, no randomness, no I/O.
    #[must_use]
    pub fn evaluate(&self, record: &FailureRecord, lesson: &Lesson) -> Evaluation {
        let breakdown = ScoreBreakdown {
            severity: self.severity_points(record, lesson),
            generality: self.generality_points(lesson),
            frequency: self.frequency_points(lesson),
        };
        let score = breakdown.total();

        let tier = if score >= self.config.tier_kernel_min {
            Tier::Kernel
        } else if score >= self.config.tier_skill_cache_min {
            Tier::SkillCache
        } else {
            Tier::Archive
        };

        // Postcondition
        assert!(
            breakdown.severity <= self.config.severity_max,
            "severity must be capped"
        );

        Evaluation {
            score,
            tier,
            breakdown,
        }
    }

    fn severity_points(&self, record: &FailureRecord, lesson: &Lesson) -> u32 {
        let base = match record.category {
            FailureCategory::UnsafeAction => self.config.severity_unsafe_action,
            FailureCategory::Fabrication => self.config.severity_fabrication,
            FailureCategory::GaveUpEarly => self.config.severity_gave_up_early,
            FailureCategory::Other => self.config.severity_other,
        };

        let mut points = base;
        if record.severity.is_critical() {
            points += self.config.severity_critical_bonus;
        }
        if self.is_security_relevant(&lesson.trigger) {
            points += self.config.severity_security_bonus;
        }

        points.min(self.config.severity_max)
    }

    fn generality_points(&self, lesson: &Lesson) -> u32 {
        let rule_lower = lesson.rule_text.to_lowercase();

        if Self::has_instance_identifiers(&lesson.rule_text) {
            return self.config.generality_specific;
        }
        if lesson.lesson_type == LessonType::Business
            || self
                .config
                .business_markers
                .iter()
                .any(|m| rule_lower.contains(m.as_str()))
        {
            return self.config.generality_business;
        }
        self.config.generality_syntax
    }

    fn frequency_points(&self, lesson: &Lesson) -> u32 {
        if lesson.occurrence_count >= RUBRIC_FREQUENCY_RECURRING_COUNT_MIN {
            self.config.frequency_recurring
        } else {
            self.config.frequency_first
        }
    }

    fn is_security_relevant(&self, trigger: &str) -> bool {
        let trigger_lower = trigger.to_lowercase();
        self.config
            .security_keywords
            .iter()
            .any(|k| trigger_lower.contains(k.as_str()))
    }

    /// Detect concrete instance identifiers in rule text.
    ///
    /// Deterministic text analysis: quoted literals, digit-bearing tokens,
    /// and path- or email-like tokens all count as instance data.
    fn has_instance_identifiers(rule_text: &str) -> bool {
        if rule_text.contains('\'') || rule_text.contains('"') {
            return true;
        }
        rule_text.split_whitespace().any(|token| {
            token.chars().any(|c| c.is_ascii_digit())
                || token.contains('/')
                || token.contains('@')
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::SeverityLevel;

    fn record(category: FailureCategory, severity: SeverityLevel) -> FailureRecord {
        FailureRecord::new("request", "trace", "output", category, severity)
            .with_recorded_at_ms(0)
    }

    fn lesson(trigger: &str, rule: &str, lesson_type: LessonType) -> Lesson {
        Lesson::new(trigger, rule, lesson_type, 0.8, 0)
    }

    #[test]
    fn test_kernel_placement_score_90() {
        // Unsafe action (50) + general rule (30) + first occurrence (10) = 90
        let rec = record(FailureCategory::UnsafeAction, SeverityLevel::High);
        let les = lesson(
            "destructive command requested",
            "Never run destructive commands without explicit confirmation",
            LessonType::Syntax,
        );

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.severity, 50);
        assert_eq!(eval.breakdown.generality, 30);
        assert_eq!(eval.breakdown.frequency, 10);
        assert_eq!(eval.score, 90);
        assert_eq!(eval.tier, Tier::Kernel);
    }

    #[test]
    fn test_skill_cache_placement_score_60() {
        // Fabrication (35) + business rule (15) + first occurrence (10) = 60
        let rec = record(FailureCategory::Fabrication, SeverityLevel::Medium);
        let les = lesson(
            "made up a refund total",
            "Refund amounts must come from the billing system, never estimated",
            LessonType::Business,
        );

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.severity, 35);
        assert_eq!(eval.breakdown.generality, 15);
        assert_eq!(eval.breakdown.frequency, 10);
        assert_eq!(eval.score, 60);
        assert_eq!(eval.tier, Tier::SkillCache);
    }

    #[test]
    fn test_archive_placement_score_35() {
        // Gave up early (20) + specific identifiers (5) + first (10) = 35
        let rec = record(FailureCategory::GaveUpEarly, SeverityLevel::Low);
        let les = lesson(
            "stopped retrying one host",
            "Retry the export for server-42 before reporting it unreachable",
            LessonType::OneOff,
        );

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.severity, 20);
        assert_eq!(eval.breakdown.generality, 5);
        assert_eq!(eval.breakdown.frequency, 10);
        assert_eq!(eval.score, 35);
        assert_eq!(eval.tier, Tier::Archive);
    }

    #[test]
    fn test_severity_capped_at_max() {
        // Unsafe (50) + critical (10) + security trigger (10) still caps at 50
        let rec = record(FailureCategory::UnsafeAction, SeverityLevel::Critical);
        let les = lesson(
            "leaked a password in logs",
            "Never echo secrets into tool output",
            LessonType::Syntax,
        );

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.severity, 50);
    }

    #[test]
    fn test_critical_bonus_applies_below_cap() {
        // Other (10) + critical (10) = 20
        let rec = record(FailureCategory::Other, SeverityLevel::Critical);
        let les = lesson("t", "A plainly worded general rule", LessonType::Syntax);

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.severity, 20);
    }

    #[test]
    fn test_security_bonus_from_trigger() {
        // Gave up (20) + security trigger (10) = 30
        let rec = record(FailureCategory::GaveUpEarly, SeverityLevel::Medium);
        let les = lesson(
            "sudo invocation refused",
            "Report elevation refusals instead of retrying",
            LessonType::Syntax,
        );

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.severity, 30);
    }

    #[test]
    fn test_frequency_recurring() {
        let rec = record(FailureCategory::Other, SeverityLevel::Low);
        let mut les = lesson("t", "A plainly worded general rule", LessonType::Syntax);
        les.record_occurrence(1);

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.frequency, 20);
    }

    #[test]
    fn test_generality_detects_quoted_literal() {
        let rec = record(FailureCategory::Other, SeverityLevel::Low);
        let les = lesson(
            "t",
            "Always quote the value 'alice' when filtering",
            LessonType::Syntax,
        );

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.generality, 5);
    }

    #[test]
    fn test_generality_detects_paths_and_emails() {
        let rubric = Rubric::default();
        let rec = record(FailureCategory::Other, SeverityLevel::Low);

        let path = lesson("t", "Check /var/log before deleting", LessonType::Syntax);
        assert_eq!(rubric.evaluate(&rec, &path).breakdown.generality, 5);

        let email = lesson("e", "Notify ops@example.com on failure", LessonType::Syntax);
        assert_eq!(rubric.evaluate(&rec, &email).breakdown.generality, 5);
    }

    #[test]
    fn test_generality_business_marker_in_text() {
        // Syntax-typed lesson whose text names a business concept
        let rec = record(FailureCategory::Other, SeverityLevel::Low);
        let les = lesson(
            "t",
            "Invoice lookups require the fiscal period",
            LessonType::Syntax,
        );

        let eval = Rubric::default().evaluate(&rec, &les);
        assert_eq!(eval.breakdown.generality, 15);
    }

    #[test]
    fn test_evaluate_deterministic() {
        let rec = record(FailureCategory::Fabrication, SeverityLevel::High);
        let les = lesson("t", "A plainly worded general rule", LessonType::Syntax);
        let rubric = Rubric::default();

        let first = rubric.evaluate(&rec, &les);
        for _ in 0..10 {
            assert_eq!(rubric.evaluate(&rec, &les), first);
        }
    }

    #[test]
    fn test_threshold_boundaries() {
        let config = RubricConfig::default();
        assert_eq!(config.tier_kernel_min, 75);
        assert_eq!(config.tier_skill_cache_min, 40);

        // Fabrication (35) + syntax (30) + recurring (20) = 85 -> kernel
        let rec = record(FailureCategory::Fabrication, SeverityLevel::Medium);
        let mut les = lesson("t", "A plainly worded general rule", LessonType::Syntax);
        les.record_occurrence(1);
        assert_eq!(Rubric::default().evaluate(&rec, &les).tier, Tier::Kernel);

        // Gave up (20) + specific (5) + recurring (20) = 45 -> skill cache
        let rec = record(FailureCategory::GaveUpEarly, SeverityLevel::Low);
        let mut les = lesson("t", "Use port 8080 for the probe", LessonType::OneOff);
        les.record_occurrence(1);
        assert_eq!(
            Rubric::default().evaluate(&rec, &les).tier,
            Tier::SkillCache
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let rubric = Rubric::new(RubricConfig::default().with_tier_thresholds(50, 20));
        let rec = record(FailureCategory::Fabrication, SeverityLevel::Medium);
        let les = lesson("t", "A plainly worded general rule", LessonType::Syntax);

        // 35 + 30 + 10 = 75 >= 50 -> kernel under the lowered threshold
        assert_eq!(rubric.evaluate(&rec, &les).tier, Tier::Kernel);
    }

    #[test]
    #[should_panic(expected = "must be below kernel")]
    fn test_invalid_thresholds() {
        let _ = RubricConfig::default().with_tier_thresholds(40, 75);
    }

    #[test]
    fn test_custom_security_keywords() {
        let rubric = Rubric::new(
            RubricConfig::default().with_security_keywords(vec!["vault".to_string()]),
        );
        let rec = record(FailureCategory::Other, SeverityLevel::Low);
        let les = lesson(
            "vault unsealed in test env",
            "A plainly worded general rule",
            LessonType::Syntax,
        );

        // Other (10) + security (10) = 20
        assert_eq!(rubric.evaluate(&rec, &les).breakdown.severity, 20);
    }
}
