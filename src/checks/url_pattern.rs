// src/checks/url_pattern.rs
//! URL Pattern Analysis checks: brand impersonation, lookalike domains,
//! lexical tricks. These run on every branch; a dead phishing page is still
//! lexically a phishing page.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::checks::lexicon::{self, HOMOGLYPH_SIMILARITY};
use crate::evidence::Evidence;
use crate::verdict::{Finding, Severity};

const CATEGORY: &str = "url_pattern";

// Long hex runs show up in kit-generated hostnames and paths.
static HEX_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9a-f]{8,}").expect("hex run regex"));

pub fn brand_in_subdomain(ev: &Evidence, weight: f64) -> Option<Finding> {
    let brand = lexicon::brand_in(&ev.target.subdomain)?;
    if lexicon::official_domains(brand).contains(&ev.target.registrable_domain.as_str()) {
        return None;
    }
    Some(
        Finding::new(
            "brand_in_subdomain",
            CATEGORY,
            Severity::Critical,
            weight,
            format!(
                "Brand '{brand}' appears in the subdomain of {}",
                ev.target.registrable_domain
            ),
        )
        .with_evidence("target.subdomain"),
    )
}

pub fn brand_in_path(ev: &Evidence, weight: f64) -> Option<Finding> {
    let brand = lexicon::brand_in(&ev.target.path)?;
    if lexicon::official_domains(brand).contains(&ev.target.registrable_domain.as_str()) {
        return None;
    }
    Some(
        Finding::new(
            "brand_in_path",
            CATEGORY,
            Severity::High,
            weight,
            format!("Brand '{brand}' appears in the URL path of an unrelated domain"),
        )
        .with_evidence("target.path"),
    )
}

pub fn free_host_with_brand(ev: &Evidence, weight: f64) -> Option<Finding> {
    let suffix = lexicon::free_host_suffix(&ev.target.host)?;
    let brand = lexicon::brand_in(&ev.target.host).or_else(|| lexicon::brand_in(&ev.target.path))?;
    Some(
        Finding::new(
            "free_host_with_brand",
            CATEGORY,
            Severity::Critical,
            weight,
            format!("Brand '{brand}' impersonated on free hosting ({suffix})"),
        )
        .with_evidence("target.host"),
    )
}

pub fn homoglyph_lookalike(ev: &Evidence, weight: f64) -> Option<Finding> {
    if ev.target.is_ip_literal {
        return None;
    }
    let (official, sim) = lexicon::closest_brand_domain(&ev.target.registrable_domain)?;
    if sim < HOMOGLYPH_SIMILARITY {
        return None;
    }
    Some(
        Finding::new(
            "homoglyph_lookalike",
            CATEGORY,
            Severity::Critical,
            weight,
            format!(
                "{} is a lookalike of {official} (similarity {sim:.2})",
                ev.target.registrable_domain
            ),
        )
        .with_evidence("target.registrable_domain"),
    )
}

pub fn phishing_path_keywords(ev: &Evidence, weight: f64) -> Option<Finding> {
    let lower = ev.target.path.to_ascii_lowercase();
    let hits: Vec<&str> = lexicon::PHISHING_PATH_KEYWORDS
        .iter()
        .filter(|k| {
            lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|t| t == **k)
        })
        .copied()
        .collect();
    if hits.is_empty() {
        return None;
    }
    Some(
        Finding::new(
            "phishing_path_keywords",
            CATEGORY,
            Severity::Medium,
            weight,
            format!("Path contains phishing keywords: {}", hits.join(", ")),
        )
        .with_evidence("target.path"),
    )
}

pub fn ip_literal_host(ev: &Evidence, weight: f64) -> Option<Finding> {
    if !ev.target.is_ip_literal {
        return None;
    }
    Some(
        Finding::new(
            "ip_literal_host",
            CATEGORY,
            Severity::High,
            weight,
            format!("Target is a raw IP address ({})", ev.target.host),
        )
        .with_evidence("target.host"),
    )
}

pub fn excessive_subdomains(ev: &Evidence, weight: f64) -> Option<Finding> {
    if ev.target.is_ip_literal {
        return None;
    }
    let depth = ev
        .target
        .subdomain
        .split('.')
        .filter(|l| !l.is_empty())
        .count();
    if depth < 3 {
        return None;
    }
    Some(
        Finding::new(
            "excessive_subdomains",
            CATEGORY,
            Severity::Low,
            weight,
            format!("{depth} labels left of the registrable domain"),
        )
        .with_evidence("target.host"),
    )
}

pub fn encoded_url_tricks(ev: &Evidence, weight: f64) -> Option<Finding> {
    let raw = &ev.target.raw;
    let authority = raw
        .split_once("://")
        .map(|(_, r)| r)
        .unwrap_or(raw)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");
    let userinfo_trick = authority.contains('@');
    let percent_runs = raw.matches('%').count() >= 3;
    let haystack = format!(
        "{}{}",
        ev.target.host.to_ascii_lowercase(),
        ev.target.path.to_ascii_lowercase()
    );
    let hex_run = HEX_RUN.is_match(&haystack);
    if !(userinfo_trick || percent_runs || hex_run) {
        return None;
    }
    let mut tricks = Vec::new();
    if userinfo_trick {
        tricks.push("userinfo '@'");
    }
    if percent_runs {
        tricks.push("dense percent-encoding");
    }
    if hex_run {
        tricks.push("long hex run");
    }
    Some(
        Finding::new(
            "encoded_url_tricks",
            CATEGORY,
            Severity::Medium,
            weight,
            format!("URL obfuscation: {}", tricks.join(", ")),
        )
        .with_evidence("target.raw"),
    )
}
