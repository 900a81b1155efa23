//! `TigerStyle` Constants
//!
//! All limits use big-endian naming: `CATEGORY_SPECIFICS_UNIT_LIMIT`
//! Example: `RUBRIC_SEVERITY_POINTS_MAX` (not `MAX_SEVERITY`)
//!
//! Every constant includes units in the name:
//! - _`BYTES_MAX/MIN` for size limits
//! - _`MS` for milliseconds, _`DAYS` for days
//! - _`COUNT_MAX` for quantity limits
//! - _`POINTS` for rubric score components

// =============================================================================
// Rubric: Severity Component
// =============================================================================

/// Severity points for an unsafe-action failure
pub const RUBRIC_SEVERITY_UNSAFE_ACTION_POINTS: u32 = 50;

/// Severity points for a fabrication failure
pub const RUBRIC_SEVERITY_FABRICATION_POINTS: u32 = 35;

/// Severity points for a gave-up-early failure
pub const RUBRIC_SEVERITY_GAVE_UP_EARLY_POINTS: u32 = 20;

/// Severity points for any other failure
pub const RUBRIC_SEVERITY_OTHER_POINTS: u32 = 10;

/// Bonus when the failure record carries critical severity
pub const RUBRIC_SEVERITY_CRITICAL_BONUS_POINTS: u32 = 10;

/// Bonus when the lesson trigger is security-relevant
pub const RUBRIC_SEVERITY_SECURITY_BONUS_POINTS: u32 = 10;

/// Cap applied to the severity subtotal after bonuses
pub const RUBRIC_SEVERITY_POINTS_MAX: u32 = 50;

// =============================================================================
// Rubric: Generality Component
// =============================================================================

/// Generality points for a rule with no concrete identifiers
pub const RUBRIC_GENERALITY_SYNTAX_POINTS: u32 = 30;

/// Generality points for a named business rule without instance data
pub const RUBRIC_GENERALITY_BUSINESS_POINTS: u32 = 15;

/// Generality points for a rule embedding specific identifiers
pub const RUBRIC_GENERALITY_SPECIFIC_POINTS: u32 = 5;

// =============================================================================
// Rubric: Frequency Component
// =============================================================================

/// Frequency points for a recurring lesson (occurrence count >= 2)
pub const RUBRIC_FREQUENCY_RECURRING_POINTS: u32 = 20;

/// Frequency points for a first occurrence
pub const RUBRIC_FREQUENCY_FIRST_POINTS: u32 = 10;

/// Occurrence count at which a lesson counts as recurring
pub const RUBRIC_FREQUENCY_RECURRING_COUNT_MIN: u32 = 2;

// =============================================================================
// Rubric: Tier Thresholds
// =============================================================================

/// Minimum score for kernel tier placement
pub const TIER_KERNEL_SCORE_MIN: u32 = 75;

/// Minimum score for skill-cache tier placement
pub const TIER_SKILL_CACHE_SCORE_MIN: u32 = 40;

// =============================================================================
// Resolver Limits
// =============================================================================

/// Minimum keyword matches for a semantic-fallback resolution
pub const RESOLVER_KEYWORD_MATCHES_MIN: u32 = 2;

/// Maximum number of registered tool signatures
pub const RESOLVER_SIGNATURES_COUNT_MAX: usize = 256;

/// Maximum number of keywords per tool signature
pub const RESOLVER_SIGNATURE_KEYWORDS_COUNT_MAX: usize = 64;

// =============================================================================
// Lesson Limits
// =============================================================================

/// Maximum length of a lesson trigger pattern
pub const LESSON_TRIGGER_BYTES_MAX: usize = 256;

/// Maximum length of lesson rule text
pub const LESSON_RULE_TEXT_BYTES_MAX: usize = 4096;

/// Minimum lesson confidence
pub const LESSON_CONFIDENCE_MIN: f64 = 0.0;

/// Maximum lesson confidence
pub const LESSON_CONFIDENCE_MAX: f64 = 1.0;

/// Default confidence for a teacher-proposed lesson
pub const LESSON_CONFIDENCE_DEFAULT: f64 = 0.5;

// =============================================================================
// Skill Cache Limits
// =============================================================================

/// Maximum number of tool keys in the skill cache
pub const SKILL_CACHE_ENTRIES_COUNT_MAX: usize = 10_000;

/// Maximum number of lessons per cache entry
pub const SKILL_CACHE_LESSONS_PER_KEY_COUNT_MAX: usize = 256;

/// Default eviction threshold in days without access
pub const SKILL_CACHE_EVICT_UNUSED_DAYS_DEFAULT: u32 = 30;

// =============================================================================
// Kernel Tier Limits
// =============================================================================

/// Maximum number of lessons resident in the kernel set
pub const KERNEL_LESSONS_COUNT_MAX: usize = 128;

// =============================================================================
// Storage Limits
// =============================================================================

/// Maximum results for a single durable-store query
pub const STORAGE_QUERY_RESULTS_COUNT_MAX: usize = 1000;

/// Chunk size for rebuild scans of the durable store
pub const REBUILD_SCAN_CHUNK_SIZE: usize = 100;

// =============================================================================
// Audit Loop Limits
// =============================================================================

/// Default timeout for the single teacher round trip
pub const AUDIT_TEACHER_TIMEOUT_MS_DEFAULT: u64 = 30_000;

/// Maximum size of text forwarded to the teacher after sanitization
pub const AUDIT_SANITIZED_TEXT_BYTES_MAX: usize = 32 * 1024;

// =============================================================================
// DST (Deterministic Simulation Testing) Limits
// =============================================================================

/// Maximum number of simulation steps
pub const DST_SIMULATION_STEPS_MAX: u64 = 1_000_000;

/// Maximum probability for fault injection (1.0 = 100%)
pub const DST_FAULT_PROBABILITY_MAX: f64 = 1.0;

/// Maximum time advance per step in milliseconds
pub const DST_TIME_ADVANCE_MS_MAX: u64 = 365 * 86_400_000; // 1 year

// =============================================================================
// Time Constants
// =============================================================================

/// Milliseconds per second
pub const TIME_MS_PER_SEC: u64 = 1000;

/// Milliseconds per minute
pub const TIME_MS_PER_MIN: u64 = 60 * TIME_MS_PER_SEC;

/// Milliseconds per hour
pub const TIME_MS_PER_HOUR: u64 = 60 * TIME_MS_PER_MIN;

/// Milliseconds per day
pub const TIME_MS_PER_DAY: u64 = 24 * TIME_MS_PER_HOUR;

// =============================================================================
// Tests
// =============================================================================
