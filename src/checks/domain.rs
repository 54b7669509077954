// src/checks/domain.rs
//! Domain Analysis checks: registration age, hosting class, TLD reputation.

use crate::checks::lexicon;
use crate::evidence::Evidence;
use crate::verdict::{Finding, Severity};

const CATEGORY: &str = "domain";

/// Tiered by age; points scale with the configured weight so the default
/// weight of 35 yields 35 / 25 / 10.
pub fn young_domain(ev: &Evidence, weight: f64) -> Option<Finding> {
    let age = ev.domain.age_days?;
    let scale = weight / 35.0;
    let (points, severity) = if age < 7 {
        (35.0 * scale, Severity::Critical)
    } else if age < 30 {
        (25.0 * scale, Severity::High)
    } else if age < 90 {
        (10.0 * scale, Severity::Low)
    } else {
        return None;
    };
    Some(
        Finding::new(
            "young_domain",
            CATEGORY,
            severity,
            points,
            format!("Domain registered {age} days ago"),
        )
        .with_evidence("domain.age_days"),
    )
}

pub fn free_hosting(ev: &Evidence, weight: f64) -> Option<Finding> {
    let suffix = lexicon::free_host_suffix(&ev.target.host)?;
    Some(
        Finding::new(
            "free_hosting",
            CATEGORY,
            Severity::Medium,
            weight,
            format!("Hosted on free platform {suffix}"),
        )
        .with_evidence("target.host"),
    )
}

pub fn suspicious_tld(ev: &Evidence, weight: f64) -> Option<Finding> {
    if ev.target.is_ip_literal {
        return None;
    }
    let tld = ev.target.host.rsplit('.').next()?;
    if !lexicon::SUSPICIOUS_TLDS.contains(&tld) {
        return None;
    }
    Some(
        Finding::new(
            "suspicious_tld",
            CATEGORY,
            Severity::Medium,
            weight,
            format!("Top-level domain .{tld} is heavily abused"),
        )
        .with_evidence("target.host"),
    )
}

pub fn punycode_domain(ev: &Evidence, weight: f64) -> Option<Finding> {
    if !ev.target.is_punycode {
        return None;
    }
    Some(
        Finding::new(
            "punycode_domain",
            CATEGORY,
            Severity::High,
            weight,
            "Hostname uses punycode-encoded labels",
        )
        .with_evidence("target.host"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::Evidence;

    fn ev(url: &str, age_days: Option<i64>) -> Evidence {
        let mut e = Evidence::for_target(url);
        e.domain.age_days = age_days;
        e
    }

    #[test]
    fn young_domain_tiers_by_age() {
        let f = young_domain(&ev("https://fresh.example", Some(2)), 35.0).unwrap();
        assert_eq!(f.points, 35.0);
        assert_eq!(f.severity, Severity::Critical);

        let f = young_domain(&ev("https://fresh.example", Some(20)), 35.0).unwrap();
        assert_eq!(f.points, 25.0);

        let f = young_domain(&ev("https://fresh.example", Some(60)), 35.0).unwrap();
        assert_eq!(f.points, 10.0);

        assert!(young_domain(&ev("https://old.example", Some(1500)), 35.0).is_none());
    }

    #[test]
    fn missing_age_stays_silent() {
        assert!(young_domain(&ev("https://unknown.example", None), 35.0).is_none());
    }

    #[test]
    fn young_domain_scales_with_weight() {
        let f = young_domain(&ev("https://fresh.example", Some(2)), 70.0).unwrap();
        assert_eq!(f.points, 70.0);
    }

    #[test]
    fn free_hosting_triggers_on_suffix() {
        assert!(free_hosting(&ev("https://promo.weebly.com/x", None), 20.0).is_some());
        assert!(free_hosting(&ev("https://example.com/", None), 20.0).is_none());
    }

    #[test]
    fn suspicious_tld_triggers() {
        assert!(suspicious_tld(&ev("http://win-prize.tk/", None), 15.0).is_some());
        assert!(suspicious_tld(&ev("http://example.com/", None), 15.0).is_none());
        assert!(suspicious_tld(&ev("http://1.2.3.4/", None), 15.0).is_none());
    }

    #[test]
    fn punycode_flagged() {
        assert!(punycode_domain(&ev("https://xn--pypal-4ve.com/", None), 20.0).is_some());
    }
}
