// src/config/scoring.rs
//! The versioned scoring configuration: category/check weights, threat-intel
//! source book, thresholds, AI model list, mitigation and override knobs.
//!
//! TOML shape (all sections optional, defaults fill the rest):
//! ```toml
//! id = "prod"
//! name = "Production"
//! strategy = "weighted_category"
//!
//! [[categories]]
//! id = "domain"
//! name = "Domain Analysis"
//! max_weight = 60.0
//!
//! [checks.young_domain]
//! weight = 35.0
//!
//! [ti]
//! max_score = 80.0
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::banding::ThresholdConfig;
use crate::reachability::Branch;
use crate::verdict::RiskLevel;

/// Hard ceilings enforced at save time; a configuration breaching them is
/// rejected before it can become active.
pub const MAX_CATEGORY_WEIGHT: f64 = 200.0;
pub const MAX_TI_SCORE: f64 = 200.0;
pub const MAX_ACTIVE_TOTAL: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Weighted category points banded on the 0–100 normalized scale.
    WeightedCategory,
    /// Blended 0–1 probability banded on the probability threshold set.
    Probability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub id: String,
    pub name: String,
    pub max_weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Branches this category is meaningful for.
    #[serde(default = "all_branches")]
    pub branches: Vec<Branch>,
}

impl CategoryConfig {
    pub fn applies_to(&self, branch: Branch) -> bool {
        self.enabled && self.branches.contains(&branch)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    pub weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CheckConfig {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiSourceConfig {
    pub weight: f64,
    /// Tier 1 sources are high-trust feeds; dual tier-1 hits can trigger a
    /// policy override.
    #[serde(default = "default_tier")]
    pub tier: u8,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiConfig {
    #[serde(default = "default_ti_max")]
    pub max_score: f64,
    #[serde(default = "default_ti_sources")]
    pub sources: HashMap<String, TiSourceConfig>,
    #[serde(default = "default_ti_timeout")]
    pub per_source_timeout_ms: u64,
    #[serde(default = "default_ti_concurrency")]
    pub max_concurrency: usize,
}

impl Default for TiConfig {
    fn default() -> Self {
        Self {
            max_score: default_ti_max(),
            sources: default_ti_sources(),
            per_source_timeout_ms: default_ti_timeout(),
            max_concurrency: default_ti_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    /// "openai-compatible" adapters cover the chat-completions dialect most
    /// hosted models speak; "mock" is for tests and offline runs.
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the API key; never the key itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_model_weight")]
    pub weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_models")]
    pub models: Vec<ModelConfig>,
    #[serde(default = "default_per_call_timeout")]
    pub per_call_timeout_ms: u64,
    #[serde(default = "default_aggregate_timeout")]
    pub aggregate_timeout_ms: u64,
    /// Confidence-interval width at or above which the deep pass runs.
    #[serde(default = "default_escalation_width")]
    pub escalation_width: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            per_call_timeout_ms: default_per_call_timeout(),
            aggregate_timeout_ms: default_aggregate_timeout(),
            escalation_width: default_escalation_width(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MitigationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Floor for the combined damping multiplier.
    #[serde(default = "default_min_damping")]
    pub min_damping: f64,
    /// Cap on the combined negative score delta (absolute value).
    #[serde(default = "default_max_reduction")]
    pub max_reduction: f64,
    /// Extra allow-listed registrable domains on top of the embedded book.
    #[serde(default)]
    pub allow_domains: Vec<String>,
}

impl Default for MitigationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_damping: default_min_damping(),
            max_reduction: default_max_reduction(),
            allow_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRuleKind {
    DualTier1Ti,
    SinkholeBranch,
    BrandInfraMismatch,
    FormOriginMismatch,
    HomoglyphDomain,
}

impl PolicyRuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyRuleKind::DualTier1Ti => "dual_tier1_ti",
            PolicyRuleKind::SinkholeBranch => "sinkhole_branch",
            PolicyRuleKind::BrandInfraMismatch => "brand_infra_mismatch",
            PolicyRuleKind::FormOriginMismatch => "form_origin_mismatch",
            PolicyRuleKind::HomoglyphDomain => "homoglyph_domain",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRuleConfig {
    pub rule: PolicyRuleKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub action: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeParams {
    #[serde(default = "default_dns_attempts")]
    pub dns_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
}

impl Default for ProbeParams {
    fn default() -> Self {
        Self {
            dns_attempts: default_dns_attempts(),
            backoff_base_ms: default_backoff_base(),
            connect_timeout_ms: default_connect_timeout(),
            http_timeout_ms: default_http_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLimits {
    #[serde(default = "default_wall_clock")]
    pub wall_clock_ms: u64,
    #[serde(default)]
    pub probe: ProbeParams,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            wall_clock_ms: default_wall_clock(),
            probe: ProbeParams::default(),
        }
    }
}

/// Signal weights for the probability strategy blend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendWeights {
    #[serde(default = "default_blend_lexical")]
    pub lexical: f64,
    #[serde(default = "default_blend_infrastructure")]
    pub infrastructure: f64,
    #[serde(default = "default_blend_reputation")]
    pub reputation: f64,
    #[serde(default = "default_blend_content")]
    pub content: f64,
    #[serde(default = "default_blend_consensus")]
    pub consensus: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            lexical: default_blend_lexical(),
            infrastructure: default_blend_infrastructure(),
            reputation: default_blend_reputation(),
            content: default_blend_content(),
            consensus: default_blend_consensus(),
        }
    }
}

/// One complete, versioned parameterization of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_strategy")]
    pub strategy: ScoringStrategy,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
    #[serde(default = "default_checks")]
    pub checks: HashMap<String, CheckConfig>,
    #[serde(default)]
    pub ti: TiConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub mitigation: MitigationConfig,
    #[serde(default = "default_overrides")]
    pub overrides: Vec<PolicyRuleConfig>,
    #[serde(default)]
    pub limits: ScanLimits,
    #[serde(default)]
    pub blend: BlendWeights,
    #[serde(default)]
    pub is_active: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            id: "balanced".to_string(),
            version: 0,
            name: default_name(),
            strategy: default_strategy(),
            categories: default_categories(),
            checks: default_checks(),
            ti: TiConfig::default(),
            thresholds: ThresholdConfig::default(),
            ai: AiConfig::default(),
            mitigation: MitigationConfig::default(),
            overrides: default_overrides(),
            limits: ScanLimits::default(),
            blend: BlendWeights::default(),
            is_active: false,
        }
    }
}

impl ScoringConfig {
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scoring config {}", path.display()))?;
        let cfg: Self =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing scoring config json")
    }

    /// Weight for a check, falling back to the built-in default when the
    /// config carries no entry. Disabled checks report `None`.
    pub fn check_weight(&self, check_id: &str, builtin_default: f64) -> Option<f64> {
        match self.checks.get(check_id) {
            Some(c) if !c.enabled => None,
            Some(c) => Some(c.weight),
            None => Some(builtin_default),
        }
    }

    pub fn category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Sum of enabled category caps plus the TI cap: the largest possible
    /// active max when every category applies.
    pub fn max_total(&self) -> f64 {
        let cats: f64 = self
            .categories
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.max_weight)
            .sum();
        cats + self.ti.max_score
    }

    /// Short stable fingerprint of the parameter bundle (id/version/flags
    /// excluded), used for derived identifiers.
    pub fn fingerprint(&self) -> String {
        let mut anon = self.clone();
        anon.id = String::new();
        anon.version = 0;
        anon.is_active = false;
        let json = serde_json::to_string(&anon).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        let digest = hasher.finalize();
        digest[..6].iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Save-time validation. Errors name the offending field; a failing
    /// configuration never becomes active.
    pub fn validate(&self) -> Result<(), String> {
        if self.categories.iter().filter(|c| c.enabled).count() == 0 {
            return Err("at least one category must be enabled".into());
        }
        for cat in &self.categories {
            if !cat.max_weight.is_finite() || cat.max_weight < 0.0 {
                return Err(format!("category {}: max_weight must be non-negative", cat.id));
            }
            if cat.max_weight > MAX_CATEGORY_WEIGHT {
                return Err(format!(
                    "category {}: max_weight {} exceeds ceiling {MAX_CATEGORY_WEIGHT}",
                    cat.id, cat.max_weight
                ));
            }
        }
        for (id, check) in &self.checks {
            if !check.weight.is_finite() || check.weight < 0.0 {
                return Err(format!("check {id}: weight must be non-negative"));
            }
        }
        if !self.ti.max_score.is_finite() || self.ti.max_score < 0.0 {
            return Err("ti.max_score must be non-negative".into());
        }
        if self.ti.max_score > MAX_TI_SCORE {
            return Err(format!(
                "ti.max_score {} exceeds ceiling {MAX_TI_SCORE}",
                self.ti.max_score
            ));
        }
        if self.max_total() > MAX_ACTIVE_TOTAL {
            return Err(format!(
                "combined score ceiling {} exceeds {MAX_ACTIVE_TOTAL}",
                self.max_total()
            ));
        }
        for (id, src) in &self.ti.sources {
            if !src.weight.is_finite() || src.weight < 0.0 {
                return Err(format!("ti source {id}: weight must be non-negative"));
            }
        }
        if self.ti.max_concurrency == 0 {
            return Err("ti.max_concurrency must be at least 1".into());
        }
        self.thresholds.validate()?;
        if self.ai.per_call_timeout_ms == 0 || self.ai.aggregate_timeout_ms == 0 {
            return Err("ai timeouts must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.ai.escalation_width) {
            return Err("ai.escalation_width must lie in [0, 1]".into());
        }
        for m in &self.ai.models {
            if !m.weight.is_finite() || m.weight < 0.0 {
                return Err(format!("model {}: weight must be non-negative", m.id));
            }
        }
        if !(0.0..=1.0).contains(&self.mitigation.min_damping) {
            return Err("mitigation.min_damping must lie in [0, 1]".into());
        }
        if self.mitigation.max_reduction < 0.0 {
            return Err("mitigation.max_reduction must be non-negative".into());
        }
        if self.limits.wall_clock_ms == 0 {
            return Err("limits.wall_clock_ms must be positive".into());
        }
        let blend_sum = self.blend.lexical
            + self.blend.infrastructure
            + self.blend.reputation
            + self.blend.content
            + self.blend.consensus;
        if blend_sum <= 0.0 {
            return Err("blend weights must sum to a positive value".into());
        }
        Ok(())
    }
}

/// Named built-in parameter bundles cloneable into stored configurations.
pub fn preset(name: &str) -> Option<ScoringConfig> {
    match name {
        "balanced" => Some(ScoringConfig::default()),
        "strict" => {
            let mut cfg = ScoringConfig {
                id: "strict".into(),
                name: "Strict".into(),
                ..ScoringConfig::default()
            };
            cfg.thresholds.global = crate::banding::ThresholdSet::new([8.0, 20.0, 40.0, 60.0, 100.0]);
            cfg.ti.max_score = 100.0;
            cfg.ai.escalation_width = 0.15;
            cfg.mitigation.min_damping = 0.6;
            cfg.mitigation.max_reduction = 15.0;
            Some(cfg)
        }
        "lenient" => {
            let mut cfg = ScoringConfig {
                id: "lenient".into(),
                name: "Lenient".into(),
                ..ScoringConfig::default()
            };
            cfg.thresholds.global = crate::banding::ThresholdSet::new([15.0, 40.0, 60.0, 80.0, 100.0]);
            cfg.ai.escalation_width = 0.35;
            cfg.mitigation.min_damping = 0.25;
            cfg.mitigation.max_reduction = 40.0;
            Some(cfg)
        }
        _ => None,
    }
}

pub fn preset_names() -> &'static [&'static str] {
    &["balanced", "strict", "lenient"]
}

fn default_true() -> bool {
    true
}

fn default_tier() -> u8 {
    2
}

fn all_branches() -> Vec<Branch> {
    use Branch::*;
    vec![Online, Offline, Waf, Parked, Sinkhole, Error]
}

fn default_name() -> String {
    "Balanced".to_string()
}

fn default_strategy() -> ScoringStrategy {
    ScoringStrategy::WeightedCategory
}

fn default_ti_max() -> f64 {
    80.0
}

fn default_ti_timeout() -> u64 {
    3_000
}

fn default_ti_concurrency() -> usize {
    4
}

fn default_model_weight() -> f64 {
    1.0
}

fn default_per_call_timeout() -> u64 {
    4_000
}

fn default_aggregate_timeout() -> u64 {
    5_000
}

fn default_escalation_width() -> f64 {
    0.25
}

fn default_min_damping() -> f64 {
    0.3
}

fn default_max_reduction() -> f64 {
    30.0
}

fn default_dns_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    250
}

fn default_connect_timeout() -> u64 {
    3_000
}

fn default_http_timeout() -> u64 {
    5_000
}

fn default_max_redirects() -> u32 {
    10
}

fn default_wall_clock() -> u64 {
    60_000
}

fn default_blend_lexical() -> f64 {
    0.25
}

fn default_blend_infrastructure() -> f64 {
    0.20
}

fn default_blend_reputation() -> f64 {
    0.25
}

fn default_blend_content() -> f64 {
    0.10
}

fn default_blend_consensus() -> f64 {
    0.20
}

fn default_categories() -> Vec<CategoryConfig> {
    use Branch::*;
    let all = vec![Online, Offline, Waf, Parked, Sinkhole, Error];
    vec![
        CategoryConfig {
            id: "domain".into(),
            name: "Domain Analysis".into(),
            max_weight: 60.0,
            enabled: true,
            branches: all.clone(),
        },
        CategoryConfig {
            id: "url_pattern".into(),
            name: "URL Pattern Analysis".into(),
            max_weight: 65.0,
            enabled: true,
            branches: all,
        },
        CategoryConfig {
            id: "tls".into(),
            name: "TLS Security".into(),
            max_weight: 40.0,
            enabled: true,
            branches: vec![Online, Waf, Parked],
        },
        CategoryConfig {
            id: "content".into(),
            name: "Content Analysis".into(),
            max_weight: 55.0,
            enabled: true,
            branches: vec![Online],
        },
        CategoryConfig {
            id: "phishing".into(),
            name: "Phishing Patterns".into(),
            max_weight: 50.0,
            enabled: true,
            branches: vec![Online, Waf],
        },
    ]
}

fn default_checks() -> HashMap<String, CheckConfig> {
    let seed: &[(&str, f64)] = &[
        ("young_domain", 35.0),
        ("free_hosting", 20.0),
        ("suspicious_tld", 15.0),
        ("punycode_domain", 20.0),
        ("brand_in_subdomain", 35.0),
        ("brand_in_path", 40.0),
        ("free_host_with_brand", 50.0),
        ("homoglyph_lookalike", 30.0),
        ("phishing_path_keywords", 15.0),
        ("ip_literal_host", 20.0),
        ("excessive_subdomains", 10.0),
        ("encoded_url_tricks", 12.0),
        ("tls_invalid", 30.0),
        ("cert_expired", 25.0),
        ("cert_hostname_mismatch", 25.0),
        ("cert_self_signed", 20.0),
        ("cert_very_new", 10.0),
        ("plain_http", 15.0),
        ("login_form", 10.0),
        ("password_on_http", 25.0),
        ("auto_download", 30.0),
        ("obfuscated_script", 20.0),
        ("meta_refresh", 10.0),
        ("persuasion_language", 20.0),
        ("screenshot_brand_spoof", 25.0),
        ("form_origin_mismatch", 30.0),
        ("brand_infra_divergence", 30.0),
        ("credential_keyword_density", 15.0),
        ("redirect_homoglyph", 25.0),
    ];
    seed.iter()
        .map(|(id, w)| (id.to_string(), CheckConfig::new(*w)))
        .collect()
}

fn default_ti_sources() -> HashMap<String, TiSourceConfig> {
    let mut m = HashMap::new();
    m.insert(
        "urlhaus".to_string(),
        TiSourceConfig {
            weight: 30.0,
            tier: 1,
            enabled: true,
        },
    );
    m.insert(
        "virustotal".to_string(),
        TiSourceConfig {
            weight: 25.0,
            tier: 1,
            enabled: true,
        },
    );
    m.insert(
        "phishtank".to_string(),
        TiSourceConfig {
            weight: 20.0,
            tier: 2,
            enabled: true,
        },
    );
    m.insert(
        "openphish".to_string(),
        TiSourceConfig {
            weight: 15.0,
            tier: 2,
            enabled: true,
        },
    );
    m
}

fn default_models() -> Vec<ModelConfig> {
    vec![
        ModelConfig {
            id: "gpt-4o-mini".into(),
            provider: "openai-compatible".into(),
            model: "gpt-4o-mini".into(),
            base_url: Some("https://api.openai.com/v1".into()),
            api_key_env: Some("OPENAI_API_KEY".into()),
            weight: 1.0,
            enabled: true,
        },
        ModelConfig {
            id: "claude-haiku".into(),
            provider: "openai-compatible".into(),
            model: "claude-3-5-haiku-latest".into(),
            base_url: Some("https://api.anthropic.com/v1".into()),
            api_key_env: Some("ANTHROPIC_API_KEY".into()),
            weight: 1.0,
            enabled: true,
        },
        ModelConfig {
            id: "llama-groq".into(),
            provider: "openai-compatible".into(),
            model: "llama-3.1-70b-versatile".into(),
            base_url: Some("https://api.groq.com/openai/v1".into()),
            api_key_env: Some("GROQ_API_KEY".into()),
            weight: 0.8,
            enabled: true,
        },
    ]
}

fn default_overrides() -> Vec<PolicyRuleConfig> {
    vec![
        PolicyRuleConfig {
            rule: PolicyRuleKind::DualTier1Ti,
            enabled: true,
            action: RiskLevel::Critical,
        },
        PolicyRuleConfig {
            rule: PolicyRuleKind::SinkholeBranch,
            enabled: true,
            action: RiskLevel::Critical,
        },
        PolicyRuleConfig {
            rule: PolicyRuleKind::BrandInfraMismatch,
            enabled: true,
            action: RiskLevel::High,
        },
        PolicyRuleConfig {
            rule: PolicyRuleKind::FormOriginMismatch,
            enabled: true,
            action: RiskLevel::High,
        },
        PolicyRuleConfig {
            rule: PolicyRuleKind::HomoglyphDomain,
            enabled: true,
            action: RiskLevel::High,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banding::ThresholdSet;

    #[test]
    fn defaults_validate() {
        assert!(ScoringConfig::default().validate().is_ok());
        for name in preset_names() {
            let cfg = preset(name).unwrap();
            assert!(cfg.validate().is_ok(), "preset {name} must validate");
        }
    }

    #[test]
    fn non_ascending_thresholds_fail_validation() {
        let mut cfg = ScoringConfig::default();
        cfg.thresholds.global = ThresholdSet(vec![10.0, 10.0, 30.0, 50.0, 70.0]);
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("strictly ascending"), "{err}");
    }

    #[test]
    fn category_cap_ceiling_is_enforced() {
        let mut cfg = ScoringConfig::default();
        cfg.categories[0].max_weight = 500.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn combined_ceiling_is_enforced() {
        let mut cfg = ScoringConfig::default();
        for c in &mut cfg.categories {
            c.max_weight = 190.0;
        }
        cfg.ti.max_score = 190.0;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("combined"), "{err}");
    }

    #[test]
    fn empty_category_roster_is_rejected() {
        let mut cfg = ScoringConfig::default();
        for c in &mut cfg.categories {
            c.enabled = false;
        }
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let raw = r#"
            id = "prod"
            name = "Production"

            [ti]
            max_score = 100.0

            [ai]
            per_call_timeout_ms = 2500
        "#;
        let cfg: ScoringConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.id, "prod");
        assert_eq!(cfg.ti.max_score, 100.0);
        assert_eq!(cfg.ai.per_call_timeout_ms, 2_500);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.ai.aggregate_timeout_ms, 5_000);
        assert_eq!(cfg.categories.len(), 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn check_weight_respects_disabled_entries() {
        let mut cfg = ScoringConfig::default();
        cfg.checks.insert(
            "young_domain".into(),
            CheckConfig {
                weight: 12.0,
                enabled: false,
            },
        );
        assert_eq!(cfg.check_weight("young_domain", 35.0), None);
        assert_eq!(cfg.check_weight("not_configured", 9.0), Some(9.0));
    }

    #[test]
    fn fingerprint_ignores_identity_fields() {
        let a = ScoringConfig::default();
        let mut b = ScoringConfig::default();
        b.id = "other".into();
        b.version = 7;
        assert_eq!(a.fingerprint(), b.fingerprint());
        let mut c = ScoringConfig::default();
        c.ti.max_score = 90.0;
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn presets_differ_in_sensitivity() {
        let strict = preset("strict").unwrap();
        let lenient = preset("lenient").unwrap();
        assert!(strict.thresholds.global.0[0] < lenient.thresholds.global.0[0]);
        assert!(strict.ai.escalation_width < lenient.ai.escalation_width);
        assert!(preset("nope").is_none());
    }
}
