// src/overrides.rs
//! Policy override: ordered, independently toggleable hard rules evaluated
//! after all scoring. The first matching rule wins; overrides only raise
//! the banded level, never lower it.

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::config::scoring::{PolicyRuleConfig, PolicyRuleKind};
use crate::reachability::Branch;
use crate::verdict::{CategoryResult, RiskLevel};

/// Everything the rules may look at, assembled by the scanner after
/// scoring completes.
#[derive(Debug, Clone)]
pub struct OverrideContext<'a> {
    pub branch: Branch,
    pub tier1_hits: usize,
    pub categories: &'a [CategoryResult],
}

impl OverrideContext<'_> {
    fn finding_triggered(&self, check_id: &str) -> Option<&str> {
        self.categories
            .iter()
            .flat_map(|c| c.findings.iter())
            .find(|f| f.check_id == check_id)
            .map(|f| f.message.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub overridden: bool,
    pub rule: PolicyRuleKind,
    pub action: RiskLevel,
    pub reason: String,
}

pub struct PolicyOverrideEngine;

impl PolicyOverrideEngine {
    /// Walks the configured rule list in order and applies the first match
    /// whose action is at or above the computed band. Returns the record and
    /// the (possibly raised) final level.
    pub fn evaluate(
        rules: &[PolicyRuleConfig],
        ctx: &OverrideContext<'_>,
        computed: RiskLevel,
    ) -> (Option<OverrideRecord>, RiskLevel) {
        for rule in rules.iter().filter(|r| r.enabled) {
            let Some(reason) = Self::matches(rule.rule, ctx) else {
                continue;
            };
            if rule.action < computed {
                // A rule below the computed band would lower it; skip.
                continue;
            }
            tracing::info!(
                rule = rule.rule.as_str(),
                action = rule.action.as_str(),
                %reason,
                "policy override applied"
            );
            counter!("scan_override_total", "rule" => rule.rule.as_str()).increment(1);
            let record = OverrideRecord {
                overridden: true,
                rule: rule.rule,
                action: rule.action,
                reason,
            };
            return (Some(record), rule.action);
        }
        (None, computed)
    }

    fn matches(kind: PolicyRuleKind, ctx: &OverrideContext<'_>) -> Option<String> {
        match kind {
            PolicyRuleKind::DualTier1Ti => (ctx.tier1_hits >= 2).then(|| {
                format!(
                    "{} tier-1 threat-intel sources report malicious",
                    ctx.tier1_hits
                )
            }),
            PolicyRuleKind::SinkholeBranch => (ctx.branch == Branch::Sinkhole)
                .then(|| "target resolves to a known sinkhole".to_string()),
            PolicyRuleKind::BrandInfraMismatch => ctx
                .finding_triggered("brand_infra_divergence")
                .map(|m| m.to_string()),
            PolicyRuleKind::FormOriginMismatch => ctx
                .finding_triggered("form_origin_mismatch")
                .map(|m| m.to_string()),
            PolicyRuleKind::HomoglyphDomain => ctx
                .finding_triggered("homoglyph_lookalike")
                .or_else(|| ctx.finding_triggered("redirect_homoglyph"))
                .map(|m| m.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::scoring::ScoringConfig;
    use crate::verdict::{Finding, Severity};

    fn ctx(branch: Branch, tier1_hits: usize) -> OverrideContext<'static> {
        OverrideContext {
            branch,
            tier1_hits,
            categories: &[],
        }
    }

    fn default_rules() -> Vec<PolicyRuleConfig> {
        ScoringConfig::default().overrides
    }

    #[test]
    fn sinkhole_forces_critical_even_at_zero_score() {
        let (record, level) = PolicyOverrideEngine::evaluate(
            &default_rules(),
            &ctx(Branch::Sinkhole, 0),
            RiskLevel::Safe,
        );
        assert_eq!(level, RiskLevel::Critical);
        let record = record.unwrap();
        assert_eq!(record.rule, PolicyRuleKind::SinkholeBranch);
        assert!(record.overridden);
    }

    #[test]
    fn dual_tier1_hits_force_critical() {
        let (record, level) = PolicyOverrideEngine::evaluate(
            &default_rules(),
            &ctx(Branch::Online, 2),
            RiskLevel::Medium,
        );
        assert_eq!(level, RiskLevel::Critical);
        assert_eq!(record.unwrap().rule, PolicyRuleKind::DualTier1Ti);
    }

    #[test]
    fn single_tier1_hit_is_not_enough() {
        let (record, level) = PolicyOverrideEngine::evaluate(
            &default_rules(),
            &ctx(Branch::Online, 1),
            RiskLevel::Medium,
        );
        assert!(record.is_none());
        assert_eq!(level, RiskLevel::Medium);
    }

    #[test]
    fn first_matching_rule_wins_in_configured_order() {
        // Both dual-tier1 and sinkhole match; dual-tier1 is listed first.
        let (record, _) = PolicyOverrideEngine::evaluate(
            &default_rules(),
            &ctx(Branch::Sinkhole, 3),
            RiskLevel::Safe,
        );
        assert_eq!(record.unwrap().rule, PolicyRuleKind::DualTier1Ti);
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let mut rules = default_rules();
        for r in &mut rules {
            if r.rule == PolicyRuleKind::SinkholeBranch {
                r.enabled = false;
            }
        }
        let (record, level) = PolicyOverrideEngine::evaluate(
            &rules,
            &ctx(Branch::Sinkhole, 0),
            RiskLevel::Low,
        );
        assert!(record.is_none());
        assert_eq!(level, RiskLevel::Low);
    }

    #[test]
    fn overrides_never_lower_the_band() {
        let rules = vec![PolicyRuleConfig {
            rule: PolicyRuleKind::HomoglyphDomain,
            enabled: true,
            action: RiskLevel::High,
        }];
        let cats = vec![CategoryResult::from_findings(
            "url_pattern",
            "URL Pattern Analysis",
            65.0,
            vec![Finding::new(
                "homoglyph_lookalike",
                "url_pattern",
                Severity::High,
                30.0,
                "looks like paypal.com",
            )],
            1,
            1,
        )];
        let ctx = OverrideContext {
            branch: Branch::Online,
            tier1_hits: 0,
            categories: &cats,
        };
        let (record, level) =
            PolicyOverrideEngine::evaluate(&rules, &ctx, RiskLevel::Critical);
        assert!(record.is_none());
        assert_eq!(level, RiskLevel::Critical);

        let (record, level) = PolicyOverrideEngine::evaluate(&rules, &ctx, RiskLevel::Low);
        assert_eq!(level, RiskLevel::High);
        assert!(record.unwrap().reason.contains("paypal.com"));
    }

    #[test]
    fn form_origin_rule_reads_phishing_findings() {
        let cats = vec![CategoryResult::from_findings(
            "phishing",
            "Phishing Patterns",
            50.0,
            vec![Finding::new(
                "form_origin_mismatch",
                "phishing",
                Severity::High,
                30.0,
                "form posts to evil.example",
            )],
            1,
            1,
        )];
        let ctx = OverrideContext {
            branch: Branch::Online,
            tier1_hits: 0,
            categories: &cats,
        };
        let (record, level) =
            PolicyOverrideEngine::evaluate(&default_rules(), &ctx, RiskLevel::Safe);
        assert_eq!(level, RiskLevel::High);
        assert_eq!(record.unwrap().rule, PolicyRuleKind::FormOriginMismatch);
    }
}
