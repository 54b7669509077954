// src/report.rs
//! Terminal scan artifacts: confidence interval, decision trail, performance
//! metrics, and the `ScanResult` handed to the persistence collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::scoring::ScoringStrategy;
use crate::consensus::ConsensusResult;
use crate::intel::TiSummary;
use crate::mitigation::FpAdjustment;
use crate::overrides::OverrideRecord;
use crate::reachability::Branch;
use crate::verdict::{CategoryResult, RiskLevel};

/// Disagreement-derived confidence band over the fast-path signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub width: f64,
}

impl ConfidenceInterval {
    pub fn new(lower: f64, upper: f64) -> Self {
        let lower = lower.clamp(0.0, 1.0);
        let upper = upper.clamp(lower, 1.0);
        Self {
            lower,
            upper,
            width: upper - lower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Reachability,
    CategoryScoring,
    ThreatIntel,
    BaseAggregation,
    ConfidenceEstimate,
    ConsensusFast,
    DeepBlend,
    ConsensusDeep,
    AiAdjustment,
    Mitigation,
    Banding,
    PolicyOverride,
}

/// One pipeline stage in the audit trail, ordered by execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailEntry {
    pub stage: Stage,
    pub detail: String,
    pub score_before: f64,
    pub score_after: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_ms: u64,
    pub probe_ms: u64,
    pub checks_ms: u64,
    pub ti_ms: u64,
    pub consensus_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_ms: Option<u64>,
    pub models_queried: usize,
    pub models_responded: usize,
    pub sources_queried: usize,
    pub sources_responded: usize,
    pub escalated: bool,
}

/// The one result a completed scan produces. Never mutated afterwards;
/// `0 <= final_score <= active_max_score` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: String,
    pub target: String,
    pub branch: Branch,
    pub strategy: ScoringStrategy,
    pub base_score: f64,
    pub active_max_score: f64,
    pub ai_multiplier: f64,
    pub false_positive_adjustment: FpAdjustment,
    pub final_score: f64,
    /// Populated by the probability strategy; absent for weighted-category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    pub confidence: ConfidenceInterval,
    pub categories: Vec<CategoryResult>,
    pub ti: TiSummary,
    pub consensus: ConsensusResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_override: Option<OverrideRecord>,
    pub risk_level: RiskLevel,
    pub performance: PerformanceMetrics,
    pub decision_trail: Vec<TrailEntry>,
    pub config_id: String,
    pub config_version: u32,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_clamps_and_orders_bounds() {
        let ci = ConfidenceInterval::new(0.8, 0.3);
        assert_eq!(ci.lower, 0.8);
        assert_eq!(ci.upper, 0.8);
        assert_eq!(ci.width, 0.0);

        let ci = ConfidenceInterval::new(-0.2, 1.4);
        assert_eq!(ci.lower, 0.0);
        assert_eq!(ci.upper, 1.0);
        assert_eq!(ci.width, 1.0);
    }

    #[test]
    fn stage_serializes_snake_case() {
        let s = serde_json::to_string(&Stage::ConsensusFast).unwrap();
        assert_eq!(s, "\"consensus_fast\"");
    }
}
