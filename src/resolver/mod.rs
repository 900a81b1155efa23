//! Tool Attribution Resolver
//!
//! Maps a failure record to the tool that caused it, so the lesson can be
//! partitioned into the right skill-cache key.
//!
//! `TigerStyle`:
//! - Phase 1: an explicit tool call in the transcript is authoritative
//! - Phase 2: keyword scoring over registered signatures, fail closed on ties
//! - Pure resolution, runtime-extensible registry

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::constants::{
    RESOLVER_KEYWORD_MATCHES_MIN, RESOLVER_SIGNATURES_COUNT_MAX,
    RESOLVER_SIGNATURE_KEYWORDS_COUNT_MAX,
};
use crate::failure::FailureRecord;

// =============================================================================
// Resolution
// =============================================================================

/// Outcome of tool attribution.
///
/// Ambiguous and Unmatched are both non-fatal: the lesson simply cannot be
/// partitioned to a tool key and falls back to the archive tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Attributed to a specific tool
    Tool(String),
    /// Multiple tools scored equally well; fail closed
    Ambiguous,
    /// No signature scored enough matches
    Unmatched,
}

impl Resolution {
    /// The attributed tool key, if any.
    #[must_use]
    pub fn tool(&self) -> Option<&str> {
        match self {
            Resolution::Tool(name) => Some(name.as_str()),
            Resolution::Ambiguous | Resolution::Unmatched => None,
        }
    }

    /// Check if attribution succeeded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Tool(_))
    }
}

// =============================================================================
// Tool Signatures
// =============================================================================

/// Keyword signature describing one tool's footprint in transcripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSignature {
    /// Tool name, becomes the skill-cache key
    pub name: String,
    /// Lowercase keywords that indicate this tool was in play
    pub keywords: Vec<String>,
    /// File extensions (without dot) counted as keyword hits
    pub extensions: Vec<String>,
}

impl ToolSignature {
    /// Create a new signature. Keywords and extensions are lowercased.
    ///
    /// # Panics
    /// Panics if the name is empty or the keyword list exceeds the limit.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        keywords: Vec<&str>,
        extensions: Vec<&str>,
    ) -> Self {
        let name = name.into();

        // TigerStyle: Preconditions
        assert!(!name.is_empty(), "signature name must not be empty");
        assert!(
            keywords.len() + extensions.len() <= RESOLVER_SIGNATURE_KEYWORDS_COUNT_MAX,
            "too many keywords for signature '{}'",
            name
        );

        Self {
            name,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Count how many of this signature's keywords appear in the text.
    ///
    /// Text must already be lowercased. Each keyword counts at most once;
    /// attribution asks "which tool's vocabulary is this", not "how often".
    #[must_use]
    fn score(&self, text_lower: &str) -> u32 {
        let keyword_hits = self
            .keywords
            .iter()
            .filter(|kw| text_lower.contains(kw.as_str()))
            .count();
        let extension_hits = self
            .extensions
            .iter()
            .filter(|ext| text_lower.contains(&format!(".{ext}")))
            .count();
        (keyword_hits + extension_hits) as u32
    }
}

// =============================================================================
// Signature Registry
// =============================================================================

/// Runtime-extensible set of tool signatures.
///
/// Interior `RwLock` so new tools can be registered without a restart while
/// the resolver is shared behind `Arc`.
#[derive(Debug)]
pub struct SignatureRegistry {
    signatures: RwLock<Vec<ToolSignature>>,
}

impl SignatureRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signatures: RwLock::new(Vec::new()),
        }
    }

    /// Create a registry preloaded with the default signature set.
    ///
    /// The defaults mirror the critical tools most deployments run with:
    /// sql, file, http and shell access.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(ToolSignature::new(
            "sql_query",
            vec![
                "select", "insert", "update", "delete", "sql", "query", "table", "database",
                "where",
            ],
            vec!["sql"],
        ));
        registry.register(ToolSignature::new(
            "file_io",
            vec![
                "file", "directory", "path", "read", "write", "permission denied", "no such file",
            ],
            vec!["txt", "csv", "json", "yaml", "log"],
        ));
        registry.register(ToolSignature::new(
            "http_request",
            vec![
                "http", "https", "url", "request", "response", "status code", "timeout", "404",
                "endpoint",
            ],
            vec![],
        ));
        registry.register(ToolSignature::new(
            "shell_exec",
            vec![
                "shell", "command", "bash", "exit code", "stdout", "stderr", "not found",
            ],
            vec!["sh"],
        ));
        registry
    }

    /// Register a signature at runtime.
    ///
    /// # Panics
    /// Panics if the registry is full.
    pub fn register(&self, signature: ToolSignature) {
        let mut signatures = self.signatures.write().unwrap_or_else(|e| e.into_inner());

        // Precondition
        assert!(
            signatures.len() < RESOLVER_SIGNATURES_COUNT_MAX,
            "signature registry full ({} max)",
            RESOLVER_SIGNATURES_COUNT_MAX
        );

        // Re-registering a name replaces the old signature
        signatures.retain(|s| s.name != signature.name);
        signatures.push(signature);
    }

    /// Number of registered signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the registered signatures.
    fn snapshot(&self) -> Vec<ToolSignature> {
        self.signatures
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// =============================================================================
// Tool Resolver
// =============================================================================

/// Two-phase tool attribution.
#[derive(Debug, Default)]
pub struct ToolResolver {
    registry: SignatureRegistry,
}

impl ToolResolver {
    /// Create a resolver over the given registry.
    #[must_use]
    pub fn new(registry: SignatureRegistry) -> Self {
        Self { registry }
    }

    /// Access the registry (for runtime registration).
    #[must_use]
    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    /// Resolve a failure record to a tool.
    ///
    /// Phase 1: explicit tool call in the transcript wins outright, even if
    /// keyword evidence points elsewhere.
    /// Phase 2: score every signature against request + reasoning trace +
    /// tool output; the max scorer wins only with at least
    /// `RESOLVER_KEYWORD_MATCHES_MIN` matches, and ties fail closed to
    /// Ambiguous.
    #[must_use]
    pub fn resolve(&self, record: &FailureRecord) -> Resolution {
        // Phase 1: direct hit is authoritative
        if let Some(tool) = record.tool_name() {
            return Resolution::Tool(tool.to_string());
        }

        // Phase 2: keyword fallback over the whole transcript
        let corpus = format!(
            "{} {} {}",
            record.request, record.reasoning_trace, record.tool_output
        )
        .to_lowercase();

        let signatures = self.registry.snapshot();
        let mut best_score: u32 = 0;
        let mut best_name: Option<&str> = None;
        let mut tied = false;

        for signature in &signatures {
            let score = signature.score(&corpus);
            if score > best_score {
                best_score = score;
                best_name = Some(signature.name.as_str());
                tied = false;
            } else if score == best_score && score > 0 {
                tied = true;
            }
        }

        if best_score < RESOLVER_KEYWORD_MATCHES_MIN {
            return Resolution::Unmatched;
        }
        if tied {
            return Resolution::Ambiguous;
        }

        match best_name {
            Some(name) => Resolution::Tool(name.to_string()),
            None => Resolution::Unmatched,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
