// src/reachability.rs
//! Reachability probing and branch classification.
//!
//! A `Prober` collaborator collects DNS/TCP/HTTP evidence; classification
//! itself is a pure function over that evidence. DNS failure after all
//! retries is a normal outcome (OFFLINE), never a scan error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use crate::config::scoring::ProbeParams;
use crate::evidence::{DnsProbe, HttpProbe, ProbeEvidence, TargetUrl};

/// Branch state selecting which categories apply and, in per-branch mode,
/// which threshold set the bander uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Branch {
    Online,
    Offline,
    Waf,
    Parked,
    Sinkhole,
    Error,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Online => "ONLINE",
            Branch::Offline => "OFFLINE",
            Branch::Waf => "WAF",
            Branch::Parked => "PARKED",
            Branch::Sinkhole => "SINKHOLE",
            Branch::Error => "ERROR",
        }
    }
}

/// Addresses well-known takedown sinkholes answer from.
const SINKHOLE_ADDRS: &[&str] = &[
    "131.253.18.11",
    "131.253.18.12",
    "148.81.111.111",
    "212.227.20.19",
    "95.211.172.143",
    "199.2.137.29",
    "38.102.150.27",
];

const SINKHOLE_MARKERS: &[&str] = &[
    "sinkhole",
    "domain has been seized",
    "seized by law enforcement",
    "shadowserver",
];

const WAF_VENDORS: &[&str] = &[
    "cloudflare",
    "akamai",
    "sucuri",
    "imperva",
    "incapsula",
    "awselb",
    "big-ip",
];

const WAF_CHALLENGE_MARKERS: &[&str] = &[
    "attention required",
    "checking your browser",
    "request blocked",
    "access denied",
    "captcha",
];

const PARKED_MARKERS: &[&str] = &[
    "domain is parked",
    "this domain is for sale",
    "buy this domain",
    "parked free",
    "domain parking",
    "sedoparking",
    "hugedomains",
    "afternic",
];

/// Evidence provider for network reachability.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &TargetUrl, params: &ProbeParams) -> Result<ProbeEvidence>;
    fn name(&self) -> &'static str;
}

/// Production prober: retried DNS lookups, a bounded TCP connect, and a
/// manual redirect-following HTTP probe so the hop chain is recorded.
pub struct NetProber {
    http: reqwest::Client,
}

impl NetProber {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .context("building probe http client")?;
        Ok(Self { http })
    }

    async fn resolve(&self, target: &TargetUrl, params: &ProbeParams) -> DnsProbe {
        let port = target.port.unwrap_or(if target.is_https() { 443 } else { 80 });
        let mut attempts = 0u32;
        for attempt in 0..params.dns_attempts.max(1) {
            attempts = attempt + 1;
            match tokio::net::lookup_host((target.host.as_str(), port)).await {
                Ok(addrs) => {
                    let addresses: Vec<String> =
                        addrs.map(|a| a.ip().to_string()).collect();
                    if !addresses.is_empty() {
                        return DnsProbe {
                            resolved: true,
                            addresses,
                            attempts,
                        };
                    }
                }
                Err(e) => {
                    tracing::debug!(error = ?e, host = %target.host, attempt, "dns lookup failed");
                }
            }
            if attempt + 1 < params.dns_attempts {
                let backoff = params.backoff_base_ms.saturating_mul(1 << attempt).min(2_000);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }
        DnsProbe {
            resolved: false,
            addresses: Vec::new(),
            attempts,
        }
    }

    async fn tcp_connect(&self, target: &TargetUrl, params: &ProbeParams) -> Option<bool> {
        let port = target.port.unwrap_or(if target.is_https() { 443 } else { 80 });
        let addr = format!("{}:{port}", target.host);
        let connect = TcpStream::connect(addr);
        match tokio::time::timeout(Duration::from_millis(params.connect_timeout_ms), connect).await
        {
            Ok(Ok(_)) => Some(true),
            Ok(Err(_)) | Err(_) => Some(false),
        }
    }

    /// Follow redirects by hand (bounded) so the chain ends up in evidence.
    async fn http_probe(&self, target: &TargetUrl, params: &ProbeParams) -> Result<HttpProbe> {
        let mut url = target.raw.clone();
        if !url.contains("://") {
            url = format!("http://{url}");
        }
        let mut chain = Vec::new();
        let mut server_header = None;

        for _hop in 0..params.max_redirects.max(1) {
            let resp = tokio::time::timeout(
                Duration::from_millis(params.http_timeout_ms),
                self.http.get(&url).send(),
            )
            .await
            .context("http probe timed out")??;

            let status = resp.status().as_u16();
            if server_header.is_none() {
                server_header = resp
                    .headers()
                    .get(reqwest::header::SERVER)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
            }

            if resp.status().is_redirection() {
                let next = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                match next {
                    Some(next) => {
                        chain.push(url.clone());
                        url = if next.contains("://") {
                            next
                        } else {
                            // Relative redirect: stay on the current host.
                            let base = TargetUrl::parse(&url);
                            format!("{}://{}{}", base.scheme, base.host, next)
                        };
                        continue;
                    }
                    None => {
                        return Ok(HttpProbe {
                            status: Some(status),
                            server_header,
                            redirect_chain: chain,
                            final_url: Some(url),
                            body_snippet: None,
                        });
                    }
                }
            }

            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(2_048).collect();
            return Ok(HttpProbe {
                status: Some(status),
                server_header,
                redirect_chain: chain,
                final_url: Some(url),
                body_snippet: Some(snippet),
            });
        }
        anyhow::bail!("redirect ceiling reached");
    }
}

#[async_trait]
impl Prober for NetProber {
    async fn probe(&self, target: &TargetUrl, params: &ProbeParams) -> Result<ProbeEvidence> {
        let dns = self.resolve(target, params).await;
        if !dns.resolved {
            return Ok(ProbeEvidence {
                dns,
                tcp_connected: None,
                http: None,
                error: None,
            });
        }
        let tcp_connected = self.tcp_connect(target, params).await;
        let http = match self.http_probe(target, params).await {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::debug!(error = ?e, host = %target.host, "http probe failed");
                None
            }
        };
        Ok(ProbeEvidence {
            dns,
            tcp_connected,
            http,
            error: None,
        })
    }

    fn name(&self) -> &'static str {
        "net"
    }
}

/// Fixed-evidence prober for tests, offline runs, and the demo binary.
pub struct StaticProber {
    evidence: ProbeEvidence,
}

impl StaticProber {
    pub fn new(evidence: ProbeEvidence) -> Self {
        Self { evidence }
    }
}

#[async_trait]
impl Prober for StaticProber {
    async fn probe(&self, _target: &TargetUrl, _params: &ProbeParams) -> Result<ProbeEvidence> {
        Ok(self.evidence.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Pure classification of probe evidence into a branch.
pub fn classify(probe: &ProbeEvidence) -> Branch {
    if probe.error.is_some() {
        return Branch::Error;
    }
    if !probe.dns.resolved {
        return Branch::Offline;
    }
    if probe
        .dns
        .addresses
        .iter()
        .any(|a| SINKHOLE_ADDRS.contains(&a.as_str()))
    {
        return Branch::Sinkhole;
    }

    let http = match &probe.http {
        Some(h) => h,
        None => return Branch::Offline,
    };
    let server = http
        .server_header
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();
    let body = http
        .body_snippet
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();

    if contains_any(&server, SINKHOLE_MARKERS) || contains_any(&body, SINKHOLE_MARKERS) {
        return Branch::Sinkhole;
    }

    let blocked_status = matches!(http.status, Some(401 | 403 | 405 | 406 | 429 | 503));
    if (contains_any(&server, WAF_VENDORS) && blocked_status)
        || contains_any(&body, WAF_CHALLENGE_MARKERS)
    {
        return Branch::Waf;
    }
    if contains_any(&body, PARKED_MARKERS) {
        return Branch::Parked;
    }
    if http.status.is_some() {
        return Branch::Online;
    }
    Branch::Offline
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Runs the prober (unless evidence was pre-collected) and classifies.
pub struct ReachabilityClassifier {
    prober: Arc<dyn Prober>,
}

impl ReachabilityClassifier {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    /// Returns the probe evidence used and the branch derived from it.
    /// Prober infrastructure failure yields ERROR, not a scan failure.
    pub async fn classify_target(
        &self,
        target: &TargetUrl,
        params: &ProbeParams,
        pre_collected: Option<ProbeEvidence>,
    ) -> (ProbeEvidence, Branch) {
        let probe = match pre_collected {
            Some(p) => p,
            None => match self.prober.probe(target, params).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(error = ?e, prober = self.prober.name(), host = %target.host, "probe failed");
                    ProbeEvidence {
                        error: Some(e.to_string()),
                        ..ProbeEvidence::default()
                    }
                }
            },
        };
        let branch = classify(&probe);
        (probe, branch)
    }
}
