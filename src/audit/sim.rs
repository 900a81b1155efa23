//! `SimTeacher` - Simulation-First Teacher
//!
//! `TigerStyle`: Primary implementation for all tests and development.
//! Real teacher backends are secondary.
//!
//! `SimTeacher` routes on transcript content the way `HeuristicGiveUpDetector`
//! routes on phrases: deterministic templates, no external calls, shared
//! fault injection.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Diagnosis, DiagnosisRequest, GiveUpDetector, Teacher, TeacherError};
use crate::constants::AUDIT_TEACHER_TIMEOUT_MS_DEFAULT;
use crate::dst::{DeterministicRng, FaultInjector, FaultType};
use crate::failure::FailureCategory;
use crate::lesson::LessonType;

// =============================================================================
// HeuristicGiveUpDetector
// =============================================================================

/// Give-up phrases checked case-insensitively against the response.
const GIVE_UP_PHRASES: &[&str] = &["not found", "cannot", "give up", "unable to"];

/// Keyword-based give-up detector.
///
/// Fires when the agent's response carries a giving-up phrase. Tool output
/// alone never fires: an empty result set with a confident answer is not a
/// give-up.
#[derive(Debug, Clone)]
pub struct HeuristicGiveUpDetector {
    phrases: Vec<String>,
}

impl HeuristicGiveUpDetector {
    /// Create a detector with the default phrase list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with a custom phrase list.
    ///
    /// # Panics
    /// Panics if the list is empty.
    #[must_use]
    pub fn with_phrases(phrases: Vec<String>) -> Self {
        assert!(!phrases.is_empty(), "phrase list must not be empty");
        Self {
            phrases: phrases.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

impl Default for HeuristicGiveUpDetector {
    fn default() -> Self {
        Self {
            phrases: GIVE_UP_PHRASES.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl GiveUpDetector for HeuristicGiveUpDetector {
    fn is_give_up(&self, response: &str, _tool_output: &str) -> bool {
        let response_lower = response.to_lowercase();
        self.phrases.iter().any(|p| response_lower.contains(p))
    }
}

// =============================================================================
// SimTeacher
// =============================================================================

/// Deterministic simulated teacher.
///
/// `TigerStyle`:
/// - Same seed, same diagnosis sequence
/// - Fault injection via shared `FaultInjector`
/// - Content routing mirrors what a real teacher would infer
///
/// # Example
///
/// ```rust,ignore
/// use lesson_memory::audit::{SimTeacher, Teacher, DiagnosisRequest};
///
/// #[tokio::main]
/// async fn main() {
///     let teacher = SimTeacher::with_seed(42);
///     let request = DiagnosisRequest {
///         request: "find Q3 revenue".to_string(),
///         response: "unable to find it".to_string(),
///         tool_output: "0 rows".to_string(),
///         tool_name: Some("sql_query".to_string()),
///     };
///     let diagnosis = teacher.diagnose(&request).await.unwrap();
///     assert!(!diagnosis.rule_text.is_empty());
/// }
/// ```
#[derive(Debug)]
pub struct SimTeacher {
    rng: Mutex<DeterministicRng>,
    faults: Arc<FaultInjector>,
    seed: u64,
}

impl SimTeacher {
    /// Create a standalone `SimTeacher` with the given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = DeterministicRng::new(seed);
        let fault_rng = rng.fork();
        Self {
            rng: Mutex::new(rng),
            faults: Arc::new(FaultInjector::new(fault_rng)),
            seed,
        }
    }

    /// Create a `SimTeacher` sharing a fault injector.
    #[must_use]
    pub fn with_faults(seed: u64, faults: Arc<FaultInjector>) -> Self {
        Self {
            rng: Mutex::new(DeterministicRng::new(seed)),
            faults,
            seed,
        }
    }

    /// Get the seed (for replay hints in logs).
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn maybe_inject_fault(&self) -> Result<(), TeacherError> {
        match self.faults.should_inject("diagnose") {
            Some(FaultType::TeacherTimeout) => {
                Err(TeacherError::timeout(AUDIT_TEACHER_TIMEOUT_MS_DEFAULT))
            }
            Some(FaultType::TeacherUnavailable) => {
                Err(TeacherError::unavailable("simulated outage"))
            }
            Some(FaultType::TeacherInvalidResponse) => {
                Err(TeacherError::invalid_response("simulated malformed diagnosis"))
            }
            Some(other) => Err(TeacherError::unavailable(other.as_str())),
            None => Ok(()),
        }
    }

    /// Classify the failure cause from transcript content.
    fn classify_cause(request: &DiagnosisRequest) -> FailureCategory {
        let response = request.response.to_lowercase();
        let output = request.tool_output.to_lowercase();

        if output.contains("permission denied") || response.contains("deleted") {
            FailureCategory::UnsafeAction
        } else if response.contains("as far as i know") || response.contains("probably") {
            FailureCategory::Fabrication
        } else if GIVE_UP_PHRASES.iter().any(|p| response.contains(p)) {
            FailureCategory::GaveUpEarly
        } else {
            FailureCategory::Other
        }
    }

    /// Classify how general the corrective rule is.
    fn classify_lesson_type(request: &DiagnosisRequest) -> LessonType {
        let text = format!(
            "{} {}",
            request.request.to_lowercase(),
            request.tool_output.to_lowercase()
        );

        if text.contains("syntax") || text.contains("error:") {
            LessonType::Syntax
        } else if ["fiscal", "policy", "invoice", "billing", "approval"]
            .iter()
            .any(|m| text.contains(m))
        {
            LessonType::Business
        } else {
            LessonType::OneOff
        }
    }

    fn build_rule_text(request: &DiagnosisRequest) -> String {
        match &request.tool_name {
            Some(tool) => format!(
                "When {tool} returns an empty or failing result, verify the query assumptions before concluding the data does not exist"
            ),
            None => {
                "Before giving up, restate the goal and check whether an alternative source answers it".to_string()
            }
        }
    }
}

#[async_trait]
impl Teacher for SimTeacher {
    #[tracing::instrument(skip(self, request), fields(tool = ?request.tool_name))]
    async fn diagnose(&self, request: &DiagnosisRequest) -> Result<Diagnosis, TeacherError> {
        self.maybe_inject_fault()?;

        let confidence = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            0.6 + rng.next_float() * 0.3
        };

        Ok(Diagnosis {
            cause: Self::classify_cause(request),
            rule_text: Self::build_rule_text(request),
            lesson_type: Self::classify_lesson_type(request),
            confidence,
        })
    }

    fn name(&self) -> &'static str {
        "sim"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(response: &str, tool_output: &str, tool: Option<&str>) -> DiagnosisRequest {
        DiagnosisRequest {
            request: "find Q3 revenue by fiscal quarter".to_string(),
            response: response.to_string(),
            tool_output: tool_output.to_string(),
            tool_name: tool.map(str::to_string),
        }
    }

    // =========================================================================
    // Detector Tests
    // =========================================================================

    #[test]
    fn test_detector_fires_on_phrases() {
        let detector = HeuristicGiveUpDetector::default();
        assert!(detector.is_give_up("I was unable to find the table", ""));
        assert!(detector.is_give_up("the file was not found", ""));
        assert!(detector.is_give_up("I cannot answer this", ""));
        assert!(detector.is_give_up("I give up on this one", ""));
    }

    #[test]
    fn test_detector_is_case_insensitive() {
        let detector = HeuristicGiveUpDetector::default();
        assert!(detector.is_give_up("UNABLE TO proceed", ""));
        assert!(detector.is_give_up("Not Found anywhere", ""));
    }

    #[test]
    fn test_detector_ignores_confident_answers() {
        let detector = HeuristicGiveUpDetector::default();
        assert!(!detector.is_give_up("Q3 revenue was 1.2M", "1 row"));
    }

    #[test]
    fn test_detector_ignores_tool_output_alone() {
        let detector = HeuristicGiveUpDetector::default();
        assert!(!detector.is_give_up("Revenue was 1.2M", "row not found in cache"));
    }

    #[test]
    fn test_detector_custom_phrases() {
        let detector = HeuristicGiveUpDetector::with_phrases(vec!["No Luck".to_string()]);
        assert!(detector.is_give_up("no luck here", ""));
        assert!(!detector.is_give_up("unable to proceed", ""));
    }

    // =========================================================================
    // Teacher Tests
    // =========================================================================

    #[tokio::test]
    async fn test_determinism() {
        let t1 = SimTeacher::with_seed(42);
        let t2 = SimTeacher::with_seed(42);
        let req = request("unable to find it", "0 rows", Some("sql_query"));

        let d1 = t1.diagnose(&req).await.unwrap();
        let d2 = t2.diagnose(&req).await.unwrap();

        assert_eq!(d1.cause, d2.cause);
        assert_eq!(d1.rule_text, d2.rule_text);
        assert_eq!(d1.lesson_type, d2.lesson_type);
        assert!((d1.confidence - d2.confidence).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_confidence_in_range() {
        let teacher = SimTeacher::with_seed(42);
        let req = request("unable to find it", "0 rows", None);

        for _ in 0..20 {
            let d = teacher.diagnose(&req).await.unwrap();
            assert!((0.0..=1.0).contains(&d.confidence));
        }
    }

    #[tokio::test]
    async fn test_cause_classification() {
        let teacher = SimTeacher::with_seed(42);

        let d = teacher
            .diagnose(&request("unable to find it", "0 rows", None))
            .await
            .unwrap();
        assert_eq!(d.cause, FailureCategory::GaveUpEarly);

        let d = teacher
            .diagnose(&request("I deleted the staging table", "permission denied", None))
            .await
            .unwrap();
        assert_eq!(d.cause, FailureCategory::UnsafeAction);

        let d = teacher
            .diagnose(&request("as far as i know it is 5", "", None))
            .await
            .unwrap();
        assert_eq!(d.cause, FailureCategory::Fabrication);
    }

    #[tokio::test]
    async fn test_lesson_type_routing() {
        let teacher = SimTeacher::with_seed(42);

        // "fiscal" in the request routes to a business rule
        let d = teacher
            .diagnose(&request("unable to", "0 rows", Some("sql_query")))
            .await
            .unwrap();
        assert_eq!(d.lesson_type, LessonType::Business);

        let mut req = request("unable to", "error: unexpected token", None);
        req.request = "run the migration".to_string();
        let d = teacher.diagnose(&req).await.unwrap();
        assert_eq!(d.lesson_type, LessonType::Syntax);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let mut injector = FaultInjector::new(DeterministicRng::new(42));
        injector.register(crate::dst::FaultConfig::new(FaultType::TeacherTimeout, 1.0));

        let teacher = SimTeacher::with_faults(42, Arc::new(injector));
        let result = teacher
            .diagnose(&request("unable to", "0 rows", None))
            .await;
        assert!(matches!(result, Err(TeacherError::Timeout { .. })));
    }
}
