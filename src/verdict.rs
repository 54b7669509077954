//! Verdict, risk-level, and finding types shared across the pipeline.
//!
//! `Verdict` is the closed set both threat-intel sources and AI models speak;
//! `RiskLevel` is the five-band output of the engine. Findings are immutable
//! once produced by a check.

use serde::{Deserialize, Serialize};

/// Closed verdict vocabulary for external opinions (TI sources, AI models).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Safe,
    Suspicious,
    Malicious,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Malicious => "MALICIOUS",
            Verdict::Unknown => "UNKNOWN",
        }
    }
}

/// Discrete risk band. Ordered so that overrides can only raise the level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One triggered check. Produced by a single pure check function; never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub check_id: String,
    pub category_id: String,
    pub severity: Severity,
    pub points: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_ref: Option<String>,
}

impl Finding {
    pub fn new(
        check_id: &str,
        category_id: &str,
        severity: Severity,
        points: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check_id: check_id.to_string(),
            category_id: category_id.to_string(),
            severity,
            points: points.max(0.0),
            message: message.into(),
            evidence_ref: None,
        }
    }

    pub fn with_evidence(mut self, evidence_ref: impl Into<String>) -> Self {
        self.evidence_ref = Some(evidence_ref.into());
        self
    }
}

/// Per-category outcome. `score` is clamped into `[0, max_weight]` even when
/// the raw finding sum exceeds the cap (checks overlap by design).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResult {
    pub id: String,
    pub name: String,
    pub score: f64,
    pub max_weight: f64,
    pub findings: Vec<Finding>,
    pub checks_run: usize,
    pub checks_total: usize,
}

impl CategoryResult {
    /// Build a result from triggered findings, clamping the summed points
    /// into the category cap.
    pub fn from_findings(
        id: &str,
        name: &str,
        max_weight: f64,
        findings: Vec<Finding>,
        checks_run: usize,
        checks_total: usize,
    ) -> Self {
        let raw: f64 = findings.iter().map(|f| f.points).sum();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            score: raw.clamp(0.0, max_weight.max(0.0)),
            max_weight: max_weight.max(0.0),
            findings,
            checks_run,
            checks_total,
        }
    }
}
