// src/checks/content.rs
//! Content Analysis checks over rendered-page evidence, including the two
//! deep-gated checks that only run after confidence escalation.

use crate::checks::lexicon;
use crate::evidence::Evidence;
use crate::verdict::{Finding, Severity};

const CATEGORY: &str = "content";

/// Classifier probability at or above which a screenshot counts as a spoof.
const SCREENSHOT_SPOOF_PROB: f64 = 0.8;

pub fn login_form(ev: &Evidence, weight: f64) -> Option<Finding> {
    let content = ev.content.as_ref()?;
    if !content.has_login_form {
        return None;
    }
    Some(
        Finding::new(
            "login_form",
            CATEGORY,
            Severity::Low,
            weight,
            "Page contains a login form",
        )
        .with_evidence("content.has_login_form"),
    )
}

pub fn password_on_http(ev: &Evidence, weight: f64) -> Option<Finding> {
    let content = ev.content.as_ref()?;
    let insecure = content.password_field_on_http
        || (content.has_login_form && !ev.target.is_https());
    if !insecure {
        return None;
    }
    Some(
        Finding::new(
            "password_on_http",
            CATEGORY,
            Severity::High,
            weight,
            "Credentials are collected over an unencrypted connection",
        )
        .with_evidence("content.password_field_on_http"),
    )
}

pub fn auto_download(ev: &Evidence, weight: f64) -> Option<Finding> {
    let content = ev.content.as_ref()?;
    if !content.auto_download {
        return None;
    }
    Some(
        Finding::new(
            "auto_download",
            CATEGORY,
            Severity::Critical,
            weight,
            "Page starts a file download without interaction",
        )
        .with_evidence("content.auto_download"),
    )
}

pub fn obfuscated_script(ev: &Evidence, weight: f64) -> Option<Finding> {
    let content = ev.content.as_ref()?;
    if !content.obfuscated_script {
        return None;
    }
    Some(
        Finding::new(
            "obfuscated_script",
            CATEGORY,
            Severity::Medium,
            weight,
            "Heavily obfuscated script detected",
        )
        .with_evidence("content.obfuscated_script"),
    )
}

pub fn meta_refresh(ev: &Evidence, weight: f64) -> Option<Finding> {
    let content = ev.content.as_ref()?;
    if !content.meta_refresh {
        return None;
    }
    Some(
        Finding::new(
            "meta_refresh",
            CATEGORY,
            Severity::Low,
            weight,
            "Page redirects via meta refresh",
        )
        .with_evidence("content.meta_refresh"),
    )
}

/// Deep: persuasion classifier score, with an urgency-phrase fallback when
/// the classifier produced nothing.
pub fn persuasion_language(ev: &Evidence, weight: f64) -> Option<Finding> {
    let deep = ev.deep.as_ref()?;
    if let Some(score) = deep.persuasion_score {
        if score < 0.6 {
            return None;
        }
        return Some(
            Finding::new(
                "persuasion_language",
                CATEGORY,
                Severity::High,
                weight,
                format!("Persuasion classifier scored {score:.2}"),
            )
            .with_evidence("deep.persuasion_score"),
        );
    }
    let text = ev
        .content
        .as_ref()
        .and_then(|c| c.text_snippet.as_deref())
        .or(deep.ocr_text.as_deref())?;
    let hits = lexicon::count_distinct(text, lexicon::URGENCY_PHRASES);
    if hits < 2 {
        return None;
    }
    Some(
        Finding::new(
            "persuasion_language",
            CATEGORY,
            Severity::High,
            0.75 * weight,
            format!("{hits} urgency phrases in page text"),
        )
        .with_evidence("content.text_snippet"),
    )
}

/// Deep: screenshot classifier recognized a brand the infrastructure
/// does not belong to.
pub fn screenshot_brand_spoof(ev: &Evidence, weight: f64) -> Option<Finding> {
    let signal = ev.deep.as_ref()?.screenshot_brand.as_ref()?;
    if signal.probability < SCREENSHOT_SPOOF_PROB {
        return None;
    }
    let registrable = ev.target.registrable_domain.as_str();
    if lexicon::official_domains(&signal.brand.to_ascii_lowercase()).contains(&registrable) {
        return None;
    }
    Some(
        Finding::new(
            "screenshot_brand_spoof",
            CATEGORY,
            Severity::Critical,
            weight,
            format!(
                "Rendered page imitates {} (p={:.2}) on foreign infrastructure",
                signal.brand, signal.probability
            ),
        )
        .with_evidence("deep.screenshot_brand"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{ContentEvidence, DeepEvidence, Evidence, ScreenshotSignal};

    fn ev_with_content(content: ContentEvidence) -> Evidence {
        let mut e = Evidence::for_target("https://site.example/");
        e.content = Some(content);
        e
    }

    #[test]
    fn missing_content_keeps_checks_silent() {
        let e = Evidence::for_target("https://site.example/");
        assert!(login_form(&e, 10.0).is_none());
        assert!(auto_download(&e, 30.0).is_none());
    }

    #[test]
    fn login_form_over_http_raises_both_findings() {
        let mut e = ev_with_content(ContentEvidence {
            has_login_form: true,
            ..ContentEvidence::default()
        });
        e.target = crate::evidence::TargetUrl::parse("http://site.example/login");
        assert!(login_form(&e, 10.0).is_some());
        assert!(password_on_http(&e, 25.0).is_some());
    }

    #[test]
    fn persuasion_uses_classifier_score_first() {
        let mut e = Evidence::for_target("https://site.example/");
        e.deep = Some(DeepEvidence {
            persuasion_score: Some(0.85),
            ..DeepEvidence::default()
        });
        let f = persuasion_language(&e, 20.0).unwrap();
        assert_eq!(f.points, 20.0);

        e.deep = Some(DeepEvidence {
            persuasion_score: Some(0.3),
            ..DeepEvidence::default()
        });
        assert!(persuasion_language(&e, 20.0).is_none());
    }

    #[test]
    fn persuasion_falls_back_to_urgency_phrases() {
        let mut e = ev_with_content(ContentEvidence {
            text_snippet: Some(
                "Your account suspended! Verify now or it will be closed.".into(),
            ),
            ..ContentEvidence::default()
        });
        e.deep = Some(DeepEvidence::default());
        let f = persuasion_language(&e, 20.0).unwrap();
        assert_eq!(f.points, 15.0);
    }

    #[test]
    fn screenshot_spoof_requires_foreign_infrastructure() {
        let mut e = Evidence::for_target("https://paypa1-login.top/");
        e.deep = Some(DeepEvidence {
            screenshot_brand: Some(ScreenshotSignal {
                brand: "PayPal".into(),
                probability: 0.93,
            }),
            ..DeepEvidence::default()
        });
        assert!(screenshot_brand_spoof(&e, 25.0).is_some());

        let mut e = Evidence::for_target("https://www.paypal.com/");
        e.deep = Some(DeepEvidence {
            screenshot_brand: Some(ScreenshotSignal {
                brand: "paypal".into(),
                probability: 0.93,
            }),
            ..DeepEvidence::default()
        });
        assert!(screenshot_brand_spoof(&e, 25.0).is_none());
    }

    #[test]
    fn low_probability_screenshot_is_ignored() {
        let mut e = Evidence::for_target("https://shady.example/");
        e.deep = Some(DeepEvidence {
            screenshot_brand: Some(ScreenshotSignal {
                brand: "paypal".into(),
                probability: 0.5,
            }),
            ..DeepEvidence::default()
        });
        assert!(screenshot_brand_spoof(&e, 25.0).is_none());
    }
}
