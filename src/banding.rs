//! Risk banding: ordered threshold sets mapping a normalized score (0–100)
//! or a probability (0–1) onto the five discrete risk levels.
//!
//! A threshold set is exactly five strictly-ascending upper bounds, one per
//! band in ascending severity; banding picks the first band whose bound
//! exceeds the value, and critical catches the remainder. Validation rejects
//! anything not strictly increasing at save time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::reachability::Branch;
use crate::verdict::RiskLevel;

pub const BAND_COUNT: usize = 5;

const LEVELS: [RiskLevel; BAND_COUNT] = [
    RiskLevel::Safe,
    RiskLevel::Low,
    RiskLevel::Medium,
    RiskLevel::High,
    RiskLevel::Critical,
];

/// Five ascending upper bounds (safe, low, medium, high, critical).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdSet(pub Vec<f64>);

impl ThresholdSet {
    pub fn new(bounds: [f64; BAND_COUNT]) -> Self {
        Self(bounds.to_vec())
    }

    /// Save-time validation: five finite, positive, strictly ascending
    /// bounds, none above the scale ceiling.
    pub fn validate(&self, label: &str, scale_max: f64) -> Result<(), String> {
        if self.0.len() != BAND_COUNT {
            return Err(format!(
                "{label}: expected {BAND_COUNT} thresholds, got {}",
                self.0.len()
            ));
        }
        for (i, b) in self.0.iter().enumerate() {
            if !b.is_finite() || *b <= 0.0 {
                return Err(format!("{label}: threshold #{i} ({b}) must be finite and positive"));
            }
            if *b > scale_max {
                return Err(format!(
                    "{label}: threshold #{i} ({b}) exceeds the {scale_max} scale ceiling"
                ));
            }
        }
        for w in self.0.windows(2) {
            if w[1] <= w[0] {
                return Err(format!(
                    "{label}: thresholds must be strictly ascending ({} then {})",
                    w[0], w[1]
                ));
            }
        }
        Ok(())
    }

    pub fn band(&self, value: f64) -> RiskLevel {
        for (i, bound) in self.0.iter().enumerate() {
            if value < *bound {
                return LEVELS[i];
            }
        }
        RiskLevel::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandingMode {
    /// One threshold set for every branch.
    Global,
    /// The reachability branch selects its own set; parked and sinkholed
    /// targets warrant different cuts than live sites.
    PerBranch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub mode: BandingMode,
    pub global: ThresholdSet,
    #[serde(default)]
    pub branches: HashMap<Branch, ThresholdSet>,
    /// 0–1 scale set used by the probability strategy.
    pub probability: ThresholdSet,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let mut branches = HashMap::new();
        branches.insert(Branch::Online, ThresholdSet::new([10.0, 30.0, 50.0, 70.0, 100.0]));
        branches.insert(Branch::Offline, ThresholdSet::new([15.0, 35.0, 55.0, 75.0, 100.0]));
        branches.insert(Branch::Waf, ThresholdSet::new([10.0, 25.0, 45.0, 65.0, 100.0]));
        branches.insert(Branch::Parked, ThresholdSet::new([8.0, 25.0, 45.0, 65.0, 100.0]));
        branches.insert(Branch::Sinkhole, ThresholdSet::new([1.0, 5.0, 10.0, 20.0, 100.0]));
        branches.insert(Branch::Error, ThresholdSet::new([15.0, 35.0, 55.0, 75.0, 100.0]));
        Self {
            mode: BandingMode::Global,
            global: ThresholdSet::new([10.0, 30.0, 50.0, 70.0, 100.0]),
            branches,
            probability: ThresholdSet::new([0.1, 0.3, 0.5, 0.7, 1.0]),
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.global.validate("thresholds.global", 100.0)?;
        for (branch, set) in &self.branches {
            set.validate(&format!("thresholds.branches.{}", branch.as_str()), 100.0)?;
        }
        self.probability.validate("thresholds.probability", 1.0)?;
        Ok(())
    }
}

/// Maps adjusted scores / probabilities to risk levels per the configured
/// banding mode.
pub struct RiskBander<'a> {
    cfg: &'a ThresholdConfig,
}

impl<'a> RiskBander<'a> {
    pub fn new(cfg: &'a ThresholdConfig) -> Self {
        Self { cfg }
    }

    /// `normalized` is the final score scaled to 0–100 of the active max.
    pub fn band_score(&self, normalized: f64, branch: Branch) -> RiskLevel {
        let set = match self.cfg.mode {
            BandingMode::Global => &self.cfg.global,
            BandingMode::PerBranch => self.cfg.branches.get(&branch).unwrap_or(&self.cfg.global),
        };
        set.band(normalized.clamp(0.0, 100.0))
    }

    pub fn band_probability(&self, p: f64) -> RiskLevel {
        self.cfg.probability.band(p.clamp(0.0, 1.0))
    }
}
