// src/checks/mod.rs
//! Category scoring: a static registry of pure checks grouped into
//! categories, evaluated against immutable evidence under configured
//! weights. A check returns `None` for "not triggered"; failures inside
//! evidence collection surface as absent evidence, never as scoring errors.

pub mod content;
pub mod domain;
pub mod lexicon;
pub mod phishing;
pub mod tls;
pub mod url_pattern;

use crate::config::scoring::ScoringConfig;
use crate::evidence::Evidence;
use crate::reachability::Branch;
use crate::verdict::{CategoryResult, Finding};

/// One registered check: identity, category membership, default weight, and
/// the pure evaluation function. `deep` checks run only after escalation.
pub struct CheckDef {
    pub id: &'static str,
    pub category: &'static str,
    pub default_weight: f64,
    pub deep: bool,
    pub run: fn(&Evidence, f64) -> Option<Finding>,
}

pub static REGISTRY: &[CheckDef] = &[
    CheckDef {
        id: "young_domain",
        category: "domain",
        default_weight: 35.0,
        deep: false,
        run: domain::young_domain,
    },
    CheckDef {
        id: "free_hosting",
        category: "domain",
        default_weight: 20.0,
        deep: false,
        run: domain::free_hosting,
    },
    CheckDef {
        id: "suspicious_tld",
        category: "domain",
        default_weight: 15.0,
        deep: false,
        run: domain::suspicious_tld,
    },
    CheckDef {
        id: "punycode_domain",
        category: "domain",
        default_weight: 20.0,
        deep: false,
        run: domain::punycode_domain,
    },
    CheckDef {
        id: "brand_in_subdomain",
        category: "url_pattern",
        default_weight: 35.0,
        deep: false,
        run: url_pattern::brand_in_subdomain,
    },
    CheckDef {
        id: "brand_in_path",
        category: "url_pattern",
        default_weight: 40.0,
        deep: false,
        run: url_pattern::brand_in_path,
    },
    CheckDef {
        id: "free_host_with_brand",
        category: "url_pattern",
        default_weight: 50.0,
        deep: false,
        run: url_pattern::free_host_with_brand,
    },
    CheckDef {
        id: "homoglyph_lookalike",
        category: "url_pattern",
        default_weight: 30.0,
        deep: false,
        run: url_pattern::homoglyph_lookalike,
    },
    CheckDef {
        id: "phishing_path_keywords",
        category: "url_pattern",
        default_weight: 15.0,
        deep: false,
        run: url_pattern::phishing_path_keywords,
    },
    CheckDef {
        id: "ip_literal_host",
        category: "url_pattern",
        default_weight: 20.0,
        deep: false,
        run: url_pattern::ip_literal_host,
    },
    CheckDef {
        id: "excessive_subdomains",
        category: "url_pattern",
        default_weight: 10.0,
        deep: false,
        run: url_pattern::excessive_subdomains,
    },
    CheckDef {
        id: "encoded_url_tricks",
        category: "url_pattern",
        default_weight: 12.0,
        deep: false,
        run: url_pattern::encoded_url_tricks,
    },
    CheckDef {
        id: "tls_invalid",
        category: "tls",
        default_weight: 30.0,
        deep: false,
        run: tls::tls_invalid,
    },
    CheckDef {
        id: "cert_expired",
        category: "tls",
        default_weight: 25.0,
        deep: false,
        run: tls::cert_expired,
    },
    CheckDef {
        id: "cert_hostname_mismatch",
        category: "tls",
        default_weight: 25.0,
        deep: false,
        run: tls::cert_hostname_mismatch,
    },
    CheckDef {
        id: "cert_self_signed",
        category: "tls",
        default_weight: 20.0,
        deep: false,
        run: tls::cert_self_signed,
    },
    CheckDef {
        id: "cert_very_new",
        category: "tls",
        default_weight: 10.0,
        deep: false,
        run: tls::cert_very_new,
    },
    CheckDef {
        id: "plain_http",
        category: "tls",
        default_weight: 15.0,
        deep: false,
        run: tls::plain_http,
    },
    CheckDef {
        id: "login_form",
        category: "content",
        default_weight: 10.0,
        deep: false,
        run: content::login_form,
    },
    CheckDef {
        id: "password_on_http",
        category: "content",
        default_weight: 25.0,
        deep: false,
        run: content::password_on_http,
    },
    CheckDef {
        id: "auto_download",
        category: "content",
        default_weight: 30.0,
        deep: false,
        run: content::auto_download,
    },
    CheckDef {
        id: "obfuscated_script",
        category: "content",
        default_weight: 20.0,
        deep: false,
        run: content::obfuscated_script,
    },
    CheckDef {
        id: "meta_refresh",
        category: "content",
        default_weight: 10.0,
        deep: false,
        run: content::meta_refresh,
    },
    CheckDef {
        id: "persuasion_language",
        category: "content",
        default_weight: 20.0,
        deep: true,
        run: content::persuasion_language,
    },
    CheckDef {
        id: "screenshot_brand_spoof",
        category: "content",
        default_weight: 25.0,
        deep: true,
        run: content::screenshot_brand_spoof,
    },
    CheckDef {
        id: "form_origin_mismatch",
        category: "phishing",
        default_weight: 30.0,
        deep: false,
        run: phishing::form_origin_mismatch,
    },
    CheckDef {
        id: "brand_infra_divergence",
        category: "phishing",
        default_weight: 30.0,
        deep: false,
        run: phishing::brand_infra_divergence,
    },
    CheckDef {
        id: "credential_keyword_density",
        category: "phishing",
        default_weight: 15.0,
        deep: false,
        run: phishing::credential_keyword_density,
    },
    CheckDef {
        id: "redirect_homoglyph",
        category: "phishing",
        default_weight: 25.0,
        deep: false,
        run: phishing::redirect_homoglyph,
    },
];

/// Scores every category applicable to the branch. `checks_total` counts the
/// enabled roster; `checks_run` what was actually evaluated (deep checks sit
/// out the fast pass).
pub struct CategoryScorer<'a> {
    cfg: &'a ScoringConfig,
}

impl<'a> CategoryScorer<'a> {
    pub fn new(cfg: &'a ScoringConfig) -> Self {
        Self { cfg }
    }

    pub fn score(&self, ev: &Evidence, branch: Branch, include_deep: bool) -> Vec<CategoryResult> {
        self.cfg
            .categories
            .iter()
            .filter(|cat| cat.applies_to(branch))
            .map(|cat| {
                let mut findings = Vec::new();
                let mut run = 0usize;
                let mut total = 0usize;
                for def in REGISTRY.iter().filter(|d| d.category == cat.id) {
                    let weight = match self.cfg.check_weight(def.id, def.default_weight) {
                        Some(w) => w,
                        None => continue,
                    };
                    total += 1;
                    if def.deep && !include_deep {
                        continue;
                    }
                    run += 1;
                    if let Some(finding) = (def.run)(ev, weight) {
                        findings.push(finding);
                    }
                }
                CategoryResult::from_findings(
                    &cat.id,
                    &cat.name,
                    cat.max_weight,
                    findings,
                    run,
                    total,
                )
            })
            .collect()
    }
}
