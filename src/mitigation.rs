// src/mitigation.rs
//! False-positive mitigation: legitimacy signals folded into one ordered
//! adjustment `adjusted = clamp(score × damping + delta, 0, max)`, applied
//! strictly after the AI multiplier and before policy override.
//!
//! Signals are deterministic over the evidence; a missing signal simply
//! contributes no adjustment. The infrastructure book is embedded from
//! `known_infrastructure.json` at the crate root, extended per config.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::config::scoring::MitigationConfig;
use crate::evidence::Evidence;

#[derive(Debug, Deserialize)]
struct InfrastructureBook {
    cdn_suffixes: Vec<String>,
    government_suffixes: Vec<String>,
    platform_allowlist: Vec<String>,
}

static BOOK: Lazy<InfrastructureBook> = Lazy::new(|| {
    serde_json::from_str(include_str!("../known_infrastructure.json"))
        .expect("known_infrastructure.json must parse")
});

/// One legitimacy signal with its contribution to the adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegitimacySignal {
    pub name: String,
    pub damping: f64,
    pub delta: f64,
    pub detail: String,
}

/// The ordered adjustment recorded in the scan result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FpAdjustment {
    pub signals: Vec<LegitimacySignal>,
    /// Product of signal dampings, floored at the configured minimum; 1.0
    /// when no signal fires.
    pub damping_multiplier: f64,
    /// Sum of signal deltas, floored at -max_reduction; 0.0 when none fire.
    pub score_delta: f64,
}

impl Default for FpAdjustment {
    fn default() -> Self {
        Self {
            signals: Vec::new(),
            damping_multiplier: 1.0,
            score_delta: 0.0,
        }
    }
}

impl FpAdjustment {
    /// Multiplicative then additive, clamped into [0, active_max].
    pub fn apply(&self, score: f64, active_max: f64) -> f64 {
        (score * self.damping_multiplier + self.score_delta).clamp(0.0, active_max.max(0.0))
    }
}

fn host_under_suffix(host: &str, suffix: &str) -> bool {
    host == suffix || host.ends_with(&format!(".{suffix}"))
}

pub struct FalsePositiveMitigator;

impl FalsePositiveMitigator {
    pub fn assess(evidence: &Evidence, cfg: &MitigationConfig) -> FpAdjustment {
        if !cfg.enabled {
            return FpAdjustment::default();
        }

        let host = evidence.target.host.as_str();
        let registrable = evidence.target.registrable_domain.as_str();
        let mut signals = Vec::new();

        if let Some(suffix) = BOOK
            .cdn_suffixes
            .iter()
            .find(|s| host_under_suffix(host, s))
        {
            signals.push(LegitimacySignal {
                name: "known_cdn".into(),
                damping: 0.7,
                delta: -5.0,
                detail: format!("host sits under CDN suffix {suffix}"),
            });
        }

        if let Some(suffix) = BOOK
            .government_suffixes
            .iter()
            .find(|s| host_under_suffix(registrable, s) || host_under_suffix(host, s))
        {
            signals.push(LegitimacySignal {
                name: "government_domain".into(),
                damping: 0.6,
                delta: -10.0,
                detail: format!("government suffix {suffix}"),
            });
        }

        if BOOK
            .platform_allowlist
            .iter()
            .any(|d| d == registrable)
            || cfg.allow_domains.iter().any(|d| d == registrable)
        {
            signals.push(LegitimacySignal {
                name: "allowlisted_platform".into(),
                damping: 0.5,
                delta: -15.0,
                detail: format!("{registrable} is allow-listed infrastructure"),
            });
        }

        let mature = evidence.domain.age_days.is_some_and(|d| d >= 365 * 3);
        let tls_valid = evidence.tls.as_ref().is_some_and(|t| t.valid);
        if mature && tls_valid {
            signals.push(LegitimacySignal {
                name: "mature_domain_valid_tls".into(),
                damping: 0.85,
                delta: -5.0,
                detail: "domain older than three years with valid TLS".into(),
            });
        }

        if signals.is_empty() {
            return FpAdjustment::default();
        }

        let damping_multiplier = signals
            .iter()
            .map(|s| s.damping)
            .product::<f64>()
            .max(cfg.min_damping.clamp(0.0, 1.0));
        let score_delta = signals
            .iter()
            .map(|s| s.delta)
            .sum::<f64>()
            .max(-cfg.max_reduction.max(0.0));

        FpAdjustment {
            signals,
            damping_multiplier,
            score_delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::TlsEvidence;

    #[test]
    fn no_signals_means_identity_adjustment() {
        let ev = Evidence::for_target("https://random-shop.example/");
        let adj = FalsePositiveMitigator::assess(&ev, &MitigationConfig::default());
        assert!(adj.signals.is_empty());
        assert_eq!(adj.damping_multiplier, 1.0);
        assert_eq!(adj.score_delta, 0.0);
        assert_eq!(adj.apply(42.0, 100.0), 42.0);
    }

    #[test]
    fn cdn_membership_damps_the_score() {
        let ev = Evidence::for_target("https://d1234.cloudfront.net/asset.js");
        let adj = FalsePositiveMitigator::assess(&ev, &MitigationConfig::default());
        assert_eq!(adj.signals.len(), 1);
        assert_eq!(adj.signals[0].name, "known_cdn");
        assert!(adj.damping_multiplier < 1.0);
        assert!(adj.apply(50.0, 100.0) < 50.0);
    }

    #[test]
    fn government_suffix_is_recognized() {
        let ev = Evidence::for_target("https://revenue.service.gov.uk/login");
        let adj = FalsePositiveMitigator::assess(&ev, &MitigationConfig::default());
        assert!(adj.signals.iter().any(|s| s.name == "government_domain"));
    }

    #[test]
    fn allowlist_covers_embedded_and_config_domains() {
        let ev = Evidence::for_target("https://www.github.com/login");
        let adj = FalsePositiveMitigator::assess(&ev, &MitigationConfig::default());
        assert!(adj.signals.iter().any(|s| s.name == "allowlisted_platform"));

        let mut cfg = MitigationConfig::default();
        cfg.allow_domains.push("internal-portal.example".into());
        let ev = Evidence::for_target("https://internal-portal.example/");
        let adj = FalsePositiveMitigator::assess(&ev, &cfg);
        assert!(adj.signals.iter().any(|s| s.name == "allowlisted_platform"));
    }

    #[test]
    fn mature_domain_needs_valid_tls_too() {
        let mut ev = Evidence::for_target("https://old-timer.example/");
        ev.domain.age_days = Some(4_000);
        let adj = FalsePositiveMitigator::assess(&ev, &MitigationConfig::default());
        assert!(adj.signals.is_empty());

        ev.tls = Some(TlsEvidence {
            valid: true,
            ..TlsEvidence::default()
        });
        let adj = FalsePositiveMitigator::assess(&ev, &MitigationConfig::default());
        assert_eq!(adj.signals.len(), 1);
        assert_eq!(adj.damping_multiplier, 0.85);
    }

    #[test]
    fn damping_floor_and_reduction_cap_hold() {
        let mut ev = Evidence::for_target("https://assets.gstatic.com/x");
        ev.domain.age_days = Some(8_000);
        ev.tls = Some(TlsEvidence {
            valid: true,
            ..TlsEvidence::default()
        });
        let mut cfg = MitigationConfig::default();
        cfg.min_damping = 0.65;
        cfg.max_reduction = 8.0;
        let adj = FalsePositiveMitigator::assess(&ev, &cfg);
        assert!(adj.signals.len() >= 2);
        assert_eq!(adj.damping_multiplier, 0.65);
        assert_eq!(adj.score_delta, -8.0);
    }

    #[test]
    fn adjusted_score_never_goes_negative() {
        let adj = FpAdjustment {
            signals: Vec::new(),
            damping_multiplier: 0.5,
            score_delta: -30.0,
        };
        assert_eq!(adj.apply(10.0, 100.0), 0.0);
    }

    #[test]
    fn disabled_mitigation_is_inert() {
        let ev = Evidence::for_target("https://www.github.com/");
        let cfg = MitigationConfig {
            enabled: false,
            ..MitigationConfig::default()
        };
        let adj = FalsePositiveMitigator::assess(&ev, &cfg);
        assert!(adj.signals.is_empty());
    }
}
