// src/checks/tls.rs
//! TLS Security checks over certificate evidence collected by the probe
//! collaborators. Absent TLS evidence keeps the certificate checks silent;
//! only `plain_http` fires without it.

use crate::evidence::Evidence;
use crate::verdict::{Finding, Severity};

const CATEGORY: &str = "tls";

pub fn tls_invalid(ev: &Evidence, weight: f64) -> Option<Finding> {
    let tls = ev.tls.as_ref()?;
    if tls.valid {
        return None;
    }
    Some(
        Finding::new(
            "tls_invalid",
            CATEGORY,
            Severity::High,
            weight,
            "TLS handshake failed or certificate did not validate",
        )
        .with_evidence("tls.valid"),
    )
}

pub fn cert_expired(ev: &Evidence, weight: f64) -> Option<Finding> {
    let tls = ev.tls.as_ref()?;
    if !tls.expired {
        return None;
    }
    Some(
        Finding::new(
            "cert_expired",
            CATEGORY,
            Severity::High,
            weight,
            "Certificate has expired",
        )
        .with_evidence("tls.expired"),
    )
}

pub fn cert_hostname_mismatch(ev: &Evidence, weight: f64) -> Option<Finding> {
    let tls = ev.tls.as_ref()?;
    if !tls.hostname_mismatch {
        return None;
    }
    Some(
        Finding::new(
            "cert_hostname_mismatch",
            CATEGORY,
            Severity::High,
            weight,
            "Certificate was issued for a different hostname",
        )
        .with_evidence("tls.hostname_mismatch"),
    )
}

pub fn cert_self_signed(ev: &Evidence, weight: f64) -> Option<Finding> {
    let tls = ev.tls.as_ref()?;
    if !tls.self_signed {
        return None;
    }
    Some(
        Finding::new(
            "cert_self_signed",
            CATEGORY,
            Severity::Medium,
            weight,
            "Certificate is self-signed",
        )
        .with_evidence("tls.self_signed"),
    )
}

pub fn cert_very_new(ev: &Evidence, weight: f64) -> Option<Finding> {
    let tls = ev.tls.as_ref()?;
    let issued = tls.issued_days_ago?;
    if issued >= 7 {
        return None;
    }
    Some(
        Finding::new(
            "cert_very_new",
            CATEGORY,
            Severity::Low,
            weight,
            format!("Certificate issued {issued} days ago"),
        )
        .with_evidence("tls.issued_days_ago"),
    )
}

pub fn plain_http(ev: &Evidence, weight: f64) -> Option<Finding> {
    if ev.target.is_https() || ev.tls.is_some() {
        return None;
    }
    Some(
        Finding::new(
            "plain_http",
            CATEGORY,
            Severity::Medium,
            weight,
            "Site is served over plain HTTP",
        )
        .with_evidence("target.scheme"),
    )
}
