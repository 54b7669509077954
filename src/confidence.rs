// src/confidence.rs
//! Confidence estimation over the fast-path signals.
//!
//! Each fast signal is a 0–1 ratio of points scored to points available;
//! the interval sits around their weighted mean and its width grows with
//! the spread between them. A narrow interval means the cheap signals
//! already agree and the deep pass can be skipped.

use serde::{Deserialize, Serialize};

use crate::config::scoring::BlendWeights;
use crate::intel::TiSummary;
use crate::report::ConfidenceInterval;
use crate::verdict::CategoryResult;

/// Named 0–1 signal entering the estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastSignal {
    pub name: String,
    pub ratio: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceEstimate {
    pub signals: Vec<FastSignal>,
    pub interval: ConfidenceInterval,
    pub escalate: bool,
}

pub struct ConfidenceEstimator;

impl ConfidenceEstimator {
    /// Derives the fast signals from the category results and TI summary.
    /// Categories that did not apply on this branch contribute no signal.
    pub fn signals(
        categories: &[CategoryResult],
        ti: &TiSummary,
        weights: &BlendWeights,
    ) -> Vec<FastSignal> {
        let ratio_of = |ids: &[&str]| -> Option<f64> {
            let mut score = 0.0;
            let mut max = 0.0;
            for cat in categories.iter().filter(|c| ids.contains(&c.id.as_str())) {
                score += cat.score;
                max += cat.max_weight;
            }
            (max > 0.0).then(|| (score / max).clamp(0.0, 1.0))
        };

        let mut signals = Vec::new();
        if let Some(ratio) = ratio_of(&["url_pattern"]) {
            signals.push(FastSignal {
                name: "lexical".into(),
                ratio,
                weight: weights.lexical,
            });
        }
        if let Some(ratio) = ratio_of(&["domain", "tls"]) {
            signals.push(FastSignal {
                name: "infrastructure".into(),
                ratio,
                weight: weights.infrastructure,
            });
        }
        if ti.max_score > 0.0 {
            signals.push(FastSignal {
                name: "reputation".into(),
                ratio: (ti.score / ti.max_score).clamp(0.0, 1.0),
                weight: weights.reputation,
            });
        }
        if let Some(ratio) = ratio_of(&["content", "phishing"]) {
            signals.push(FastSignal {
                name: "content".into(),
                ratio,
                weight: weights.content,
            });
        }
        signals
    }

    /// Interval around the weighted mean, widened by the largest deviation
    /// any single signal shows from it.
    pub fn estimate(signals: Vec<FastSignal>, escalation_width: f64) -> ConfidenceEstimate {
        let weight_sum: f64 = signals.iter().map(|s| s.weight).sum();
        let (mean, spread) = if signals.is_empty() || weight_sum <= 0.0 {
            // No usable signals: total uncertainty, always escalate.
            (0.5, 0.5)
        } else {
            let mean = signals
                .iter()
                .map(|s| s.weight * s.ratio)
                .sum::<f64>()
                / weight_sum;
            let spread = signals
                .iter()
                .map(|s| (s.ratio - mean).abs())
                .fold(0.0f64, f64::max);
            (mean, spread)
        };

        let interval = ConfidenceInterval::new(mean - spread / 2.0, mean + spread / 2.0);
        let escalate = interval.width >= escalation_width;
        ConfidenceEstimate {
            signals,
            interval,
            escalate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(name: &str, ratio: f64, weight: f64) -> FastSignal {
        FastSignal {
            name: name.into(),
            ratio,
            weight,
        }
    }

    #[test]
    fn agreeing_signals_yield_a_narrow_interval() {
        let est = ConfidenceEstimator::estimate(
            vec![
                signal("lexical", 0.72, 0.25),
                signal("infrastructure", 0.70, 0.20),
                signal("reputation", 0.74, 0.25),
            ],
            0.25,
        );
        assert!(est.interval.width < 0.1, "width {}", est.interval.width);
        assert!(!est.escalate);
    }

    #[test]
    fn disagreement_widens_the_interval_and_escalates() {
        let est = ConfidenceEstimator::estimate(
            vec![
                signal("lexical", 0.9, 0.25),
                signal("infrastructure", 0.1, 0.20),
                signal("reputation", 0.5, 0.25),
            ],
            0.25,
        );
        assert!(est.interval.width >= 0.25, "width {}", est.interval.width);
        assert!(est.escalate);
    }

    #[test]
    fn no_signals_means_total_uncertainty() {
        let est = ConfidenceEstimator::estimate(vec![], 0.25);
        assert_eq!(est.interval.width, 0.5);
        assert!(est.escalate);
    }

    #[test]
    fn signals_derive_from_categories_and_ti() {
        use crate::verdict::{CategoryResult, Finding, Severity};
        let categories = vec![
            CategoryResult::from_findings(
                "url_pattern",
                "URL Pattern Analysis",
                65.0,
                vec![Finding::new("x", "url_pattern", Severity::High, 32.5, "m")],
                5,
                5,
            ),
            CategoryResult::from_findings("domain", "Domain Analysis", 60.0, vec![], 4, 4),
            CategoryResult::from_findings("tls", "TLS Security", 40.0, vec![], 4, 4),
        ];
        let ti = TiSummary {
            score: 40.0,
            max_score: 80.0,
            ..TiSummary::default()
        };
        let signals =
            ConfidenceEstimator::signals(&categories, &ti, &BlendWeights::default());
        let by_name = |n: &str| signals.iter().find(|s| s.name == n).map(|s| s.ratio);
        assert_eq!(by_name("lexical"), Some(0.5));
        assert_eq!(by_name("infrastructure"), Some(0.0));
        assert_eq!(by_name("reputation"), Some(0.5));
        // No content/phishing category applied, so no content signal.
        assert_eq!(by_name("content"), None);
    }
}
