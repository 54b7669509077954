// src/evidence.rs
//! Scan input types: the request, the parsed target, and the immutable
//! evidence tree collected by external providers.
//!
//! Evidence is owned by one scan run and never mutated after collection.
//! Absent sub-structures simply keep the related checks silent.

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Second-level public suffixes the registrable-domain split must keep
/// together. A coarse subset is enough for brand/origin comparisons.
static MULTI_PART_TLDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "co.jp", "ne.jp", "or.jp",
        "com.au", "net.au", "org.au", "co.nz", "com.br", "com.mx", "com.ar",
        "com.tr", "com.cn", "com.hk", "com.sg", "com.my", "co.in", "co.za",
        "co.kr", "com.tw", "com.ua", "co.id", "com.ph", "com.vn", "com.sa",
        "co.th", "gov.au", "gc.ca",
    ]
    .into_iter()
    .collect()
});

/// A scan request as handed to the engine by the embedding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub target: String,
    /// Stored configuration to scan with; `None` uses the active snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_ref: Option<String>,
    #[serde(default)]
    pub options: ScanOptions,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            configuration_ref: None,
            options: ScanOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    #[serde(default)]
    pub skip_deep_analysis: bool,
    /// Marks domain-age evidence as deliberately absent; the young-domain
    /// check stays silent instead of treating the gap as suspicious.
    #[serde(default)]
    pub skip_whois: bool,
}

/// The target URL parsed once per scan. Parsing is best-effort and never
/// fails: lexical checks must run even over garbage input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetUrl {
    pub raw: String,
    pub scheme: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// eTLD+1 ownership boundary used for brand and origin comparisons.
    pub registrable_domain: String,
    /// Labels left of the registrable domain, joined with `.` (may be empty).
    pub subdomain: String,
    pub path: String,
    pub query: String,
    pub is_ip_literal: bool,
    pub is_punycode: bool,
}

impl TargetUrl {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let (scheme, rest) = match trimmed.split_once("://") {
            Some((s, r)) => (s.to_ascii_lowercase(), r),
            // Pasted targets often omit the scheme; assume plain http.
            None => ("http".to_string(), trimmed),
        };

        let (authority, tail) = match rest.find(['/', '?', '#']) {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        // Userinfo before '@' is never part of the host.
        let authority = authority.rsplit_once('@').map_or(authority, |(_, h)| h);

        let (host_raw, port) = split_host_port(authority);
        let host = host_raw.to_ascii_lowercase();

        let (path, query) = match tail.split_once('?') {
            Some((p, q)) => (p.to_string(), q.split('#').next().unwrap_or("").to_string()),
            None => (tail.split('#').next().unwrap_or("").to_string(), String::new()),
        };

        let is_ip_literal = is_ip_host(&host);
        let registrable_domain = if is_ip_literal {
            host.clone()
        } else {
            registrable_of(&host)
        };
        let subdomain = if is_ip_literal || host == registrable_domain {
            String::new()
        } else {
            host.strip_suffix(&format!(".{registrable_domain}"))
                .unwrap_or("")
                .to_string()
        };
        let is_punycode = host.split('.').any(|l| l.starts_with("xn--"));

        Self {
            raw: trimmed.to_string(),
            scheme,
            host,
            port,
            registrable_domain,
            subdomain,
            path,
            query,
            is_ip_literal,
            is_punycode,
        }
    }

    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// Labels in the hostname, most-specific first.
    pub fn label_count(&self) -> usize {
        if self.host.is_empty() {
            0
        } else {
            self.host.split('.').count()
        }
    }
}

fn split_host_port(authority: &str) -> (&str, Option<u16>) {
    if let Some(rest) = authority.strip_prefix('[') {
        // Bracketed IPv6 literal, optionally followed by :port.
        if let Some((h, t)) = rest.split_once(']') {
            let port = t.strip_prefix(':').and_then(|p| p.parse().ok());
            return (h, port);
        }
        return (rest, None);
    }
    match authority.rsplit_once(':') {
        Some((h, p)) => match p.parse::<u16>() {
            Ok(port) => (h, Some(port)),
            Err(_) => (authority, None),
        },
        None => (authority, None),
    }
}

fn is_ip_host(host: &str) -> bool {
    host.parse::<Ipv4Addr>().is_ok() || host.parse::<Ipv6Addr>().is_ok()
}

fn registrable_of(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => String::new(),
        1 => labels[0].to_string(),
        n => {
            let last_two = format!("{}.{}", labels[n - 2], labels[n - 1]);
            if MULTI_PART_TLDS.contains(last_two.as_str()) && n >= 3 {
                format!("{}.{}", labels[n - 3], last_two)
            } else {
                last_two
            }
        }
    }
}

/// DNS resolution outcome across all retry attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsProbe {
    pub resolved: bool,
    pub addresses: Vec<String>,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpProbe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_header: Option<String>,
    #[serde(default)]
    pub redirect_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_snippet: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeEvidence {
    pub dns: DnsProbe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpProbe>,
    /// Probe infrastructure failure (not target refusal).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainEvidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsEvidence {
    pub valid: bool,
    pub expired: bool,
    pub self_signed: bool,
    pub hostname_mismatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_days_ago: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentEvidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_snippet: Option<String>,
    pub has_login_form: bool,
    pub password_field_on_http: bool,
    #[serde(default)]
    pub form_actions: Vec<String>,
    pub auto_download: bool,
    pub obfuscated_script: bool,
    pub meta_refresh: bool,
    /// Brands the content renderer recognized in markup/text.
    #[serde(default)]
    pub detected_brands: Vec<String>,
}

/// Expensive stage-2 artifacts; present only when the renderer produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeepEvidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persuasion_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_brand: Option<ScreenshotSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotSignal {
    pub brand: String,
    pub probability: f64,
}

/// Everything a scan run knows about its target. Immutable once collected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    pub target: TargetUrl,
    #[serde(default)]
    pub domain: DomainEvidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeEvidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsEvidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentEvidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep: Option<DeepEvidence>,
}

impl Evidence {
    /// Evidence with only the parsed target; everything else absent.
    pub fn for_target(raw: &str) -> Self {
        Self {
            target: TargetUrl::parse(raw),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_https_url() {
        let t = TargetUrl::parse("https://www.example.com/login?next=/home");
        assert_eq!(t.scheme, "https");
        assert_eq!(t.host, "www.example.com");
        assert_eq!(t.registrable_domain, "example.com");
        assert_eq!(t.subdomain, "www");
        assert_eq!(t.path, "/login");
        assert_eq!(t.query, "next=/home");
        assert!(!t.is_ip_literal);
    }

    #[test]
    fn schemeless_input_defaults_to_http() {
        let t = TargetUrl::parse("example.com/verify");
        assert_eq!(t.scheme, "http");
        assert_eq!(t.host, "example.com");
        assert_eq!(t.path, "/verify");
    }

    #[test]
    fn multi_part_tld_keeps_three_labels() {
        let t = TargetUrl::parse("https://secure.bank.co.uk/");
        assert_eq!(t.registrable_domain, "bank.co.uk");
        assert_eq!(t.subdomain, "secure");
    }

    #[test]
    fn ip_literal_host_is_flagged() {
        let t = TargetUrl::parse("http://192.168.10.5:8080/admin");
        assert!(t.is_ip_literal);
        assert_eq!(t.port, Some(8080));
        assert_eq!(t.registrable_domain, "192.168.10.5");
    }

    #[test]
    fn userinfo_is_stripped_from_host() {
        let t = TargetUrl::parse("http://paypal.com@evil.example/");
        assert_eq!(t.host, "evil.example");
    }

    #[test]
    fn punycode_labels_are_flagged() {
        let t = TargetUrl::parse("https://xn--pypal-4ve.com/signin");
        assert!(t.is_punycode);
    }

    #[test]
    fn garbage_input_still_yields_a_target() {
        let t = TargetUrl::parse("not a url at all");
        assert_eq!(t.scheme, "http");
        assert!(!t.raw.is_empty());
    }

    #[test]
    fn bracketed_ipv6_with_port() {
        let t = TargetUrl::parse("http://[2001:db8::1]:8443/x");
        assert!(t.is_ip_literal);
        assert_eq!(t.port, Some(8443));
    }
}
