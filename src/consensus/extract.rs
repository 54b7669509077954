// src/consensus/extract.rs
//! Prioritized verdict extraction over model free text.
//!
//! Tier 1: an explicit `Verdict: X` label (first occurrence wins).
//! Tier 2: a fixed keyword vocabulary, most severe match wins.
//! Tier 3: UNKNOWN.
//!
//! A `Confidence: NN%` (or 0.NN) is parsed when present; otherwise the
//! extraction tier supplies a default.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::verdict::Verdict;

static VERDICT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*\**\s*verdict\s*\**\s*[:=]\s*\**\s*([a-z]+)").expect("verdict label regex")
});

static CONFIDENCE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)confidence\s*\**\s*[:=]\s*\**\s*(\d+(?:\.\d+)?)\s*(%)?")
        .expect("confidence label regex")
});

const MALICIOUS_WORDS: &[&str] = &["malicious", "phishing", "scam", "dangerous", "fraudulent"];
const SUSPICIOUS_WORDS: &[&str] = &["suspicious", "risky", "caution", "questionable"];
const SAFE_WORDS: &[&str] = &["safe", "benign", "legitimate", "clean", "harmless"];

const LABEL_DEFAULT_CONFIDENCE: f64 = 0.9;
const KEYWORD_DEFAULT_CONFIDENCE: f64 = 0.6;

/// Verdict plus the confidence either parsed from the text or defaulted by
/// extraction tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extraction {
    pub verdict: Verdict,
    pub confidence: f64,
}

pub fn extract(text: &str) -> Extraction {
    let (verdict, tier_default) = extract_verdict(text);
    let confidence = match verdict {
        Verdict::Unknown => 0.0,
        _ => parse_confidence(text).unwrap_or(tier_default),
    };
    Extraction {
        verdict,
        confidence,
    }
}

fn extract_verdict(text: &str) -> (Verdict, f64) {
    if let Some(caps) = VERDICT_LABEL.captures(text) {
        let word = caps[1].to_ascii_lowercase();
        let labeled = match word.as_str() {
            "safe" | "benign" | "clean" => Some(Verdict::Safe),
            "suspicious" | "risky" => Some(Verdict::Suspicious),
            "malicious" | "phishing" | "dangerous" => Some(Verdict::Malicious),
            "unknown" => Some(Verdict::Unknown),
            _ => None,
        };
        if let Some(v) = labeled {
            return (v, LABEL_DEFAULT_CONFIDENCE);
        }
    }

    let lower = text.to_ascii_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(MALICIOUS_WORDS) {
        return (Verdict::Malicious, KEYWORD_DEFAULT_CONFIDENCE);
    }
    if has(SUSPICIOUS_WORDS) {
        return (Verdict::Suspicious, KEYWORD_DEFAULT_CONFIDENCE);
    }
    if has(SAFE_WORDS) {
        return (Verdict::Safe, KEYWORD_DEFAULT_CONFIDENCE);
    }
    (Verdict::Unknown, 0.0)
}

fn parse_confidence(text: &str) -> Option<f64> {
    let caps = CONFIDENCE_LABEL.captures(text)?;
    let value: f64 = caps[1].parse().ok()?;
    let normalized = if caps.get(2).is_some() || value > 1.0 {
        value / 100.0
    } else {
        value
    };
    Some(normalized.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_label_wins() {
        let e = extract("Verdict: MALICIOUS\nConfidence: 85%\nThe page mimics a bank.");
        assert_eq!(e.verdict, Verdict::Malicious);
        assert_eq!(e.confidence, 0.85);
    }

    #[test]
    fn label_beats_contradicting_keywords() {
        // The prose says "safe" but the label is authoritative.
        let e = extract("This looks safe at first glance.\nVerdict: suspicious");
        assert_eq!(e.verdict, Verdict::Suspicious);
        assert_eq!(e.confidence, 0.9);
    }

    #[test]
    fn markdown_and_case_variants_parse() {
        let e = extract("**Verdict:** Phishing\n**Confidence:** 0.72");
        assert_eq!(e.verdict, Verdict::Malicious);
        assert_eq!(e.confidence, 0.72);

        let e = extract("verdict = SAFE");
        assert_eq!(e.verdict, Verdict::Safe);
    }

    #[test]
    fn keyword_scan_orders_by_severity() {
        let e = extract("The site is risky, arguably dangerous for visitors.");
        assert_eq!(e.verdict, Verdict::Malicious);
        assert_eq!(e.confidence, 0.6);

        let e = extract("Nothing conclusive, but the redirect chain is risky.");
        assert_eq!(e.verdict, Verdict::Suspicious);
    }

    #[test]
    fn keyword_fallback_finds_safe() {
        let e = extract("I would call this page benign; it is a plain blog.");
        assert_eq!(e.verdict, Verdict::Safe);
        assert_eq!(e.confidence, 0.6);
    }

    #[test]
    fn garbage_is_unknown_with_zero_confidence() {
        let e = extract("Lorem ipsum dolor sit amet.");
        assert_eq!(e.verdict, Verdict::Unknown);
        assert_eq!(e.confidence, 0.0);

        let e = extract("");
        assert_eq!(e.verdict, Verdict::Unknown);
    }

    #[test]
    fn unknown_label_word_falls_through_to_keywords() {
        let e = extract("Verdict: inconclusive, though the form is a phishing kit.");
        assert_eq!(e.verdict, Verdict::Malicious);
    }

    #[test]
    fn percent_and_fraction_confidences_normalize() {
        assert_eq!(parse_confidence("Confidence: 90%"), Some(0.9));
        assert_eq!(parse_confidence("confidence: 0.35"), Some(0.35));
        // Bare integers above 1 are read as percentages.
        assert_eq!(parse_confidence("Confidence: 75"), Some(0.75));
        assert_eq!(parse_confidence("no number here"), None);
    }
}
