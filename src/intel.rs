// src/intel.rs
//! Threat-intelligence combination: a bounded concurrent fan-out over the
//! configured source book. A MALICIOUS verdict contributes the source's
//! weight, anything else 0; the sum is capped at `ti.max_score`. A source
//! that errors or times out contributes 0 and never fails the combiner.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::scoring::TiConfig;
use crate::evidence::Evidence;
use crate::verdict::Verdict;

/// One external threat-intelligence feed. `lookup` answers with the feed's
/// verdict for the evidence target; failures are the caller's to degrade.
#[async_trait]
pub trait TiSource: Send + Sync {
    async fn lookup(&self, evidence: &Evidence) -> Result<Verdict>;
    fn name(&self) -> &str;
}

/// Per-source outcome as recorded in the scan result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiResult {
    pub source: String,
    pub verdict: Verdict,
    pub score: f64,
    pub tier: u8,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Combined threat-intel outcome for one scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TiSummary {
    pub results: Vec<TiResult>,
    /// Weighted sum capped at `ti.max_score`.
    pub score: f64,
    pub max_score: f64,
    /// MALICIOUS verdicts from tier-1 sources, counted before the cap.
    pub tier1_hits: usize,
    pub sources_queried: usize,
    pub sources_responded: usize,
}

/// abuse.ch URLhaus URL lookup. The one production source shipped with the
/// crate; other feeds plug in through the same trait.
pub struct UrlhausSource {
    http: reqwest::Client,
    endpoint: String,
}

impl UrlhausSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .context("building urlhaus http client")?,
            endpoint: "https://urlhaus-api.abuse.ch/v1/url/".to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Deserialize)]
struct UrlhausReply {
    query_status: String,
    #[serde(default)]
    url_status: Option<String>,
}

#[async_trait]
impl TiSource for UrlhausSource {
    async fn lookup(&self, evidence: &Evidence) -> Result<Verdict> {
        let resp = self
            .http
            .post(&self.endpoint)
            .form(&[("url", evidence.target.raw.as_str())])
            .send()
            .await
            .context("urlhaus request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("urlhaus returned {}", resp.status());
        }
        let reply: UrlhausReply = resp.json().await.context("urlhaus reply parse")?;
        Ok(match reply.query_status.as_str() {
            "ok" => match reply.url_status.as_deref() {
                Some("online") => Verdict::Malicious,
                Some(_) => Verdict::Suspicious,
                None => Verdict::Malicious,
            },
            "no_results" => Verdict::Safe,
            _ => Verdict::Unknown,
        })
    }

    fn name(&self) -> &str {
        "urlhaus"
    }
}

/// Scripted source for tests, offline runs, and the demo binary.
pub struct StaticTiSource {
    name: String,
    verdict: Verdict,
    delay: Option<Duration>,
    fail: bool,
}

impl StaticTiSource {
    pub fn new(name: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            name: name.into(),
            verdict,
            delay: None,
            fail: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl TiSource for StaticTiSource {
    async fn lookup(&self, _evidence: &Evidence) -> Result<Verdict> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            anyhow::bail!("simulated source failure");
        }
        Ok(self.verdict)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Runs the configured sources concurrently under a semaphore bound and
/// folds their verdicts into one capped score.
pub struct ThreatIntelCombiner {
    sources: Vec<Arc<dyn TiSource>>,
}

impl ThreatIntelCombiner {
    pub fn new(sources: Vec<Arc<dyn TiSource>>) -> Self {
        Self { sources }
    }

    pub async fn combine(&self, evidence: Arc<Evidence>, cfg: &TiConfig) -> TiSummary {
        let semaphore = Arc::new(Semaphore::new(cfg.max_concurrency.max(1)));
        let per_source = Duration::from_millis(cfg.per_source_timeout_ms.max(1));

        let mut set: JoinSet<TiResult> = JoinSet::new();
        let mut queried = 0usize;
        for source in &self.sources {
            let Some(sc) = cfg.sources.get(source.name()) else {
                continue;
            };
            if !sc.enabled {
                continue;
            }
            queried += 1;
            let (weight, tier) = (sc.weight, sc.tier);
            let source = Arc::clone(source);
            let evidence = Arc::clone(&evidence);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                // Closed only if the set is dropped mid-flight.
                let _permit = semaphore.acquire_owned().await;
                let started = std::time::Instant::now();
                let outcome =
                    tokio::time::timeout(per_source, source.lookup(evidence.as_ref())).await;
                let duration_ms = started.elapsed().as_millis() as u64;
                match outcome {
                    Ok(Ok(verdict)) => TiResult {
                        source: source.name().to_string(),
                        verdict,
                        score: if verdict == Verdict::Malicious { weight } else { 0.0 },
                        tier,
                        duration_ms,
                        error: None,
                    },
                    Ok(Err(e)) => {
                        tracing::warn!(error = ?e, source = source.name(), "ti source error");
                        counter!("ti_source_errors_total").increment(1);
                        TiResult {
                            source: source.name().to_string(),
                            verdict: Verdict::Unknown,
                            score: 0.0,
                            tier,
                            duration_ms,
                            error: Some(e.to_string()),
                        }
                    }
                    Err(_) => {
                        tracing::warn!(source = source.name(), "ti source timed out");
                        counter!("ti_source_errors_total").increment(1);
                        TiResult {
                            source: source.name().to_string(),
                            verdict: Verdict::Unknown,
                            score: 0.0,
                            tier,
                            duration_ms,
                            error: Some("timed out".to_string()),
                        }
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(queried);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(r) => results.push(r),
                Err(e) => {
                    tracing::warn!(error = ?e, "ti task join failed");
                    counter!("ti_source_errors_total").increment(1);
                }
            }
        }

        let raw: f64 = results.iter().map(|r| r.score).sum();
        let tier1_hits = results
            .iter()
            .filter(|r| r.tier == 1 && r.verdict == Verdict::Malicious)
            .count();
        let responded = results.iter().filter(|r| r.error.is_none()).count();
        TiSummary {
            score: raw.clamp(0.0, cfg.max_score.max(0.0)),
            max_score: cfg.max_score.max(0.0),
            tier1_hits,
            sources_queried: queried,
            sources_responded: responded,
            results,
        }
    }
}
