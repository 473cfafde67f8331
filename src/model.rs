use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single heuristic check. Indeterminate means the check could
/// not be completed (lookup timed out, network disabled) and must never be
/// treated as a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriState {
    Triggered,
    Clear,
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Fixed point contribution of a triggered hit. Summed directly and
    /// capped at 100; a single Critical hit alone reaches 70/100.
    pub fn points(self) -> u32 {
        match self {
            Severity::Low => 5,
            Severity::Medium => 15,
            Severity::High => 40,
            Severity::Critical => 70,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Domain,
    Path,
    Parameters,
    General,
}

/// Derived from the URL at the start of the pipeline; malformed URLs degrade
/// to empty components rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlComponents {
    pub host: String,
    pub path: String,
    pub query: String,
}

/// Result of one rule evaluation. Indeterminate outcomes are collapsed to
/// `triggered = false` but keep a distinguishing detail message so operators
/// can tell "checked-safe" apart from "could-not-check".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicHit {
    pub code: String,
    pub category: Category,
    pub severity: Severity,
    pub triggered: bool,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReputationStatus {
    Positive,
    Negative,
    Unknown,
}

impl ReputationStatus {
    pub fn label(self) -> &'static str {
        match self {
            ReputationStatus::Positive => "POSITIVE",
            ReputationStatus::Negative => "NEGATIVE",
            ReputationStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReputationSource {
    #[serde(rename = "GSB")]
    Gsb,
    #[serde(rename = "VIRUSTOTAL")]
    Virustotal,
}

impl ReputationSource {
    pub fn label(self) -> &'static str {
        match self {
            ReputationSource::Gsb => "GSB",
            ReputationSource::Virustotal => "VIRUSTOTAL",
        }
    }
}

/// Per-source outcome, retained for audit regardless of whether it
/// influenced the consolidated status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationCheckResult {
    pub source: ReputationSource,
    pub status: ReputationStatus,
    /// ok | no_key | timeout | not_checked | error:<kind>
    pub reason: String,
    pub elapsed_ms: Option<u64>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Safe,
    Suspicious,
    Malicious,
}

impl RiskBand {
    /// Band boundaries are inclusive on the lower bound: >= 80 malicious,
    /// >= 50 suspicious, everything below safe.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskBand::Malicious
        } else if score >= 50.0 {
            RiskBand::Suspicious
        } else {
            RiskBand::Safe
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskBand::Safe => "SAFE",
            RiskBand::Suspicious => "SUSPICIOUS",
            RiskBand::Malicious => "MALICIOUS",
        }
    }
}

/// Aggregate result of one analyzed URL. Immutable after construction;
/// re-analysis creates a new assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub url: String,
    pub normalized_url: String,
    pub reputation_score: f64,
    pub heuristic_score: Option<f64>,
    pub final_score: f64,
    pub band: RiskBand,
    pub reputation_status: ReputationStatus,
    /// Heuristic score was unavailable and fusion fell back to
    /// reputation-only weighting.
    pub fusion_degraded: bool,
    pub hits: Vec<HeuristicHit>,
    pub reputation_checks: Vec<ReputationCheckResult>,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
}
