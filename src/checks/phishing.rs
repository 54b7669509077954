// src/checks/phishing.rs
//! Phishing Pattern checks: origin mismatches, brand/infrastructure
//! divergence, credential harvesting language, lookalike redirects.

use strsim::jaro_winkler;

use crate::checks::lexicon::{self, HOMOGLYPH_SIMILARITY};
use crate::evidence::{Evidence, TargetUrl};
use crate::verdict::{Finding, Severity};

const CATEGORY: &str = "phishing";

pub fn form_origin_mismatch(ev: &Evidence, weight: f64) -> Option<Finding> {
    let content = ev.content.as_ref()?;
    let page_registrable = ev.target.registrable_domain.as_str();
    for action in &content.form_actions {
        // Relative actions stay on the page origin.
        if !action.contains("://") {
            continue;
        }
        let action_url = TargetUrl::parse(action);
        if !action_url.registrable_domain.is_empty()
            && action_url.registrable_domain != page_registrable
        {
            return Some(
                Finding::new(
                    "form_origin_mismatch",
                    CATEGORY,
                    Severity::Critical,
                    weight,
                    format!(
                        "Form posts to {} instead of {page_registrable}",
                        action_url.registrable_domain
                    ),
                )
                .with_evidence("content.form_actions"),
            );
        }
    }
    None
}

pub fn brand_infra_divergence(ev: &Evidence, weight: f64) -> Option<Finding> {
    let content = ev.content.as_ref()?;
    let claimed = content
        .detected_brands
        .iter()
        .map(|b| b.to_ascii_lowercase())
        .find(|b| !lexicon::official_domains(b).is_empty())
        .or_else(|| {
            content
                .title
                .as_deref()
                .and_then(lexicon::brand_in)
                .map(|b| b.to_string())
        })?;
    let registrable = ev.target.registrable_domain.as_str();
    if lexicon::official_domains(&claimed).contains(&registrable) {
        return None;
    }
    Some(
        Finding::new(
            "brand_infra_divergence",
            CATEGORY,
            Severity::Critical,
            weight,
            format!("Page presents as '{claimed}' but is served from {registrable}"),
        )
        .with_evidence("content.detected_brands"),
    )
}

pub fn credential_keyword_density(ev: &Evidence, weight: f64) -> Option<Finding> {
    let text = ev.content.as_ref()?.text_snippet.as_deref()?;
    let hits = lexicon::count_distinct(text, lexicon::CREDENTIAL_KEYWORDS);
    if hits < 2 {
        return None;
    }
    Some(
        Finding::new(
            "credential_keyword_density",
            CATEGORY,
            Severity::Medium,
            weight,
            format!("{hits} distinct credential prompts in page text"),
        )
        .with_evidence("content.text_snippet"),
    )
}

/// The redirect chain ends on a lookalike of where it started.
pub fn redirect_homoglyph(ev: &Evidence, weight: f64) -> Option<Finding> {
    let http = ev.probe.as_ref()?.http.as_ref()?;
    let final_url = http.final_url.as_deref()?;
    let start = http
        .redirect_chain
        .first()
        .map(|u| TargetUrl::parse(u))
        .unwrap_or_else(|| ev.target.clone());
    let end = TargetUrl::parse(final_url);
    if start.registrable_domain.is_empty()
        || end.registrable_domain.is_empty()
        || start.registrable_domain == end.registrable_domain
    {
        return None;
    }
    let sim = jaro_winkler(&start.registrable_domain, &end.registrable_domain);
    if sim < HOMOGLYPH_SIMILARITY {
        return None;
    }
    Some(
        Finding::new(
            "redirect_homoglyph",
            CATEGORY,
            Severity::High,
            weight,
            format!(
                "Redirect lands on lookalike {} of {} (similarity {sim:.2})",
                end.registrable_domain, start.registrable_domain
            ),
        )
        .with_evidence("probe.http.redirect_chain"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{ContentEvidence, DnsProbe, HttpProbe, ProbeEvidence};

    fn ev_with_content(url: &str, content: ContentEvidence) -> Evidence {
        let mut e = Evidence::for_target(url);
        e.content = Some(content);
        e
    }

    #[test]
    fn foreign_form_action_triggers() {
        let e = ev_with_content(
            "https://login.bank-secure.com/",
            ContentEvidence {
                form_actions: vec![
                    "/local".into(),
                    "https://collector.evil.example/post".into(),
                ],
                ..ContentEvidence::default()
            },
        );
        let f = form_origin_mismatch(&e, 30.0).unwrap();
        assert!(f.message.contains("evil.example"));
    }

    #[test]
    fn relative_and_same_origin_actions_are_fine() {
        let e = ev_with_content(
            "https://shop.example.com/",
            ContentEvidence {
                form_actions: vec!["/checkout".into(), "https://pay.example.com/x".into()],
                ..ContentEvidence::default()
            },
        );
        assert!(form_origin_mismatch(&e, 30.0).is_none());
    }

    #[test]
    fn claimed_brand_on_foreign_infrastructure() {
        let e = ev_with_content(
            "https://account-verify.top/",
            ContentEvidence {
                detected_brands: vec!["PayPal".into()],
                ..ContentEvidence::default()
            },
        );
        assert!(brand_infra_divergence(&e, 30.0).is_some());

        let e = ev_with_content(
            "https://www.paypal.com/",
            ContentEvidence {
                detected_brands: vec!["paypal".into()],
                ..ContentEvidence::default()
            },
        );
        assert!(brand_infra_divergence(&e, 30.0).is_none());
    }

    #[test]
    fn brand_claim_can_come_from_title() {
        let e = ev_with_content(
            "https://signin-check.click/",
            ContentEvidence {
                title: Some("Amazon Sign-In".into()),
                ..ContentEvidence::default()
            },
        );
        assert!(brand_infra_divergence(&e, 30.0).is_some());
    }

    #[test]
    fn credential_density_needs_two_distinct_prompts() {
        let e = ev_with_content(
            "https://x.example/",
            ContentEvidence {
                text_snippet: Some("Please confirm your password and CVV code".into()),
                ..ContentEvidence::default()
            },
        );
        assert!(credential_keyword_density(&e, 15.0).is_some());

        let e = ev_with_content(
            "https://x.example/",
            ContentEvidence {
                text_snippet: Some("Enter your password".into()),
                ..ContentEvidence::default()
            },
        );
        assert!(credential_keyword_density(&e, 15.0).is_none());
    }

    #[test]
    fn lookalike_redirect_triggers() {
        let mut e = Evidence::for_target("https://paypal.com/");
        e.probe = Some(ProbeEvidence {
            dns: DnsProbe::default(),
            tcp_connected: Some(true),
            http: Some(HttpProbe {
                status: Some(200),
                redirect_chain: vec!["https://paypal.com/".into()],
                final_url: Some("https://paypa1.com/login".into()),
                ..HttpProbe::default()
            }),
            error: None,
        });
        let f = redirect_homoglyph(&e, 25.0).unwrap();
        assert!(f.message.contains("paypa1.com"));
    }

    #[test]
    fn unrelated_redirect_is_silent() {
        let mut e = Evidence::for_target("https://shortener.example/x");
        e.probe = Some(ProbeEvidence {
            http: Some(HttpProbe {
                status: Some(200),
                redirect_chain: vec!["https://shortener.example/x".into()],
                final_url: Some("https://completely-different.org/".into()),
                ..HttpProbe::default()
            }),
            ..ProbeEvidence::default()
        });
        assert!(redirect_homoglyph(&e, 25.0).is_none());
    }
}
