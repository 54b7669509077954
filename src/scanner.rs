// src/scanner.rs
//! The scan pipeline. One `Scanner` orchestrates every stage behind a
//! pluggable scoring strategy so consensus, override, and banding logic
//! exists once:
//!
//! probe/classify → category scoring ∥ TI combination → base aggregation →
//! confidence estimate → fast AI pass → optional deep blend + deep AI pass
//! → AI adjustment → false-positive mitigation → banding → policy override
//! → result assembly.
//!
//! A scan is stateless over (evidence, config snapshot); concurrent scans
//! share nothing mutable. The wall-clock ceiling wraps the whole pipeline:
//! exceeding it fails the scan outright, no partial score is ever reported.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, histogram};
use sha2::{Digest, Sha256};

use crate::banding::RiskBander;
use crate::checks::CategoryScorer;
use crate::confidence::{ConfidenceEstimator, FastSignal};
use crate::config::scoring::{ScoringConfig, ScoringStrategy};
use crate::consensus::{self, AiConsensusEngine, ConsensusResult, ModelClient};
use crate::error::{EngineError, EngineResult};
use crate::evidence::{Evidence, ScanRequest};
use crate::intel::{ThreatIntelCombiner, TiSource, TiSummary};
use crate::telemetry::ensure_metrics_described;
use crate::mitigation::FalsePositiveMitigator;
use crate::overrides::{OverrideContext, PolicyOverrideEngine};
use crate::reachability::{Branch, Prober, ReachabilityClassifier};
use crate::report::{PerformanceMetrics, ScanResult, Stage, TrailEntry};
use crate::verdict::{CategoryResult, Verdict};

pub struct Scanner {
    reachability: ReachabilityClassifier,
    ti: ThreatIntelCombiner,
    consensus: AiConsensusEngine,
}

impl Scanner {
    pub fn new(
        prober: Arc<dyn Prober>,
        ti_sources: Vec<Arc<dyn TiSource>>,
        model_clients: Vec<Arc<dyn ModelClient>>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            reachability: ReachabilityClassifier::new(prober),
            ti: ThreatIntelCombiner::new(ti_sources),
            consensus: AiConsensusEngine::new(model_clients),
        }
    }

    /// Runs one scan under the configured wall-clock ceiling. The config is
    /// the caller's snapshot: swaps at the store never reach a running scan.
    pub async fn scan(
        &self,
        request: &ScanRequest,
        evidence: Evidence,
        config: ScoringConfig,
    ) -> EngineResult<ScanResult> {
        let ceiling_ms = config.limits.wall_clock_ms;
        let ceiling = Duration::from_millis(ceiling_ms.max(1));
        match tokio::time::timeout(ceiling, self.run_pipeline(request, evidence, config)).await {
            Ok(result) => Ok(result),
            Err(_) => {
                tracing::warn!(target = %request.target, ceiling_ms, "scan exceeded wall clock");
                counter!("scan_failed_total").increment(1);
                Err(EngineError::ScanTimeout { ceiling_ms })
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &ScanRequest,
        mut evidence: Evidence,
        config: ScoringConfig,
    ) -> ScanResult {
        let scan_started = Instant::now();
        let mut trail: Vec<TrailEntry> = Vec::new();
        let mut perf = PerformanceMetrics::default();

        if request.options.skip_whois {
            // Deliberately absent, not "young": the age checks stay silent.
            evidence.domain.age_days = None;
        }

        // Reachability first; it gates everything downstream.
        let stage_started = Instant::now();
        let pre_collected = evidence.probe.take();
        let (probe, branch) = self
            .reachability
            .classify_target(&evidence.target, &config.limits.probe, pre_collected)
            .await;
        evidence.probe = Some(probe);
        perf.probe_ms = stage_started.elapsed().as_millis() as u64;
        trail.push(TrailEntry {
            stage: Stage::Reachability,
            detail: format!("branch {}", branch.as_str()),
            score_before: 0.0,
            score_after: 0.0,
            duration_ms: perf.probe_ms,
        });

        // Category checks and TI sources read the same immutable evidence.
        let evidence = Arc::new(evidence);
        let checks_started = Instant::now();
        let scorer = CategoryScorer::new(&config);
        let (mut categories, ti) = tokio::join!(
            async { scorer.score(&evidence, branch, false) },
            self.ti.combine(Arc::clone(&evidence), &config.ti),
        );
        perf.checks_ms = checks_started.elapsed().as_millis() as u64;
        perf.ti_ms = perf.checks_ms;
        perf.sources_queried = ti.sources_queried;
        perf.sources_responded = ti.sources_responded;
        histogram!("ti_duration_ms").record(perf.ti_ms as f64);

        let (mut base_score, mut active_max) = aggregate(&categories, &ti);
        trail.push(TrailEntry {
            stage: Stage::CategoryScoring,
            detail: format!("{} categories scored", categories.len()),
            score_before: 0.0,
            score_after: categories.iter().map(|c| c.score).sum(),
            duration_ms: perf.checks_ms,
        });
        trail.push(TrailEntry {
            stage: Stage::ThreatIntel,
            detail: format!(
                "{}/{} sources responded, {} tier-1 hits",
                ti.sources_responded, ti.sources_queried, ti.tier1_hits
            ),
            score_before: 0.0,
            score_after: ti.score,
            duration_ms: perf.ti_ms,
        });
        trail.push(TrailEntry {
            stage: Stage::BaseAggregation,
            detail: format!("base {base_score:.1} of {active_max:.1}"),
            score_before: 0.0,
            score_after: base_score,
            duration_ms: 0,
        });

        // Confidence interval over the fast signals decides on escalation.
        let stage_started = Instant::now();
        let signals = ConfidenceEstimator::signals(&categories, &ti, &config.blend);
        let estimate = ConfidenceEstimator::estimate(signals, config.ai.escalation_width);
        trail.push(TrailEntry {
            stage: Stage::ConfidenceEstimate,
            detail: format!(
                "width {:.2}, {}",
                estimate.interval.width,
                if estimate.escalate { "escalating" } else { "fast path" }
            ),
            score_before: base_score,
            score_after: base_score,
            duration_ms: stage_started.elapsed().as_millis() as u64,
        });

        // Fast AI pass always runs.
        let consensus_started = Instant::now();
        let prompt = build_prompt(&evidence, branch, base_score, active_max, &categories, &ti);
        let fast = self.consensus.run(&prompt, &config.ai).await;
        perf.consensus_ms = consensus_started.elapsed().as_millis() as u64;
        trail.push(TrailEntry {
            stage: Stage::ConsensusFast,
            detail: consensus_detail(&fast),
            score_before: base_score,
            score_after: base_score,
            duration_ms: perf.consensus_ms,
        });

        // Deep pass: deep-gated checks over already-collected deep evidence
        // plus a second consensus round. Canonical when it runs.
        let escalate = estimate.escalate
            && branch == Branch::Online
            && !request.options.skip_deep_analysis
            && evidence.deep.is_some();
        perf.escalated = escalate;
        let mut consensus = fast;
        if escalate {
            let deep_started = Instant::now();
            let before = base_score;
            categories = scorer.score(&evidence, branch, true);
            let (rescored, remax) = aggregate(&categories, &ti);
            base_score = rescored;
            active_max = remax;
            trail.push(TrailEntry {
                stage: Stage::DeepBlend,
                detail: "deep findings blended into category results".into(),
                score_before: before,
                score_after: base_score,
                duration_ms: deep_started.elapsed().as_millis() as u64,
            });

            let deep_consensus_started = Instant::now();
            let prompt =
                build_prompt(&evidence, branch, base_score, active_max, &categories, &ti);
            let deep = self.consensus.run(&prompt, &config.ai).await;
            let deep_ms = deep_consensus_started.elapsed().as_millis() as u64;
            perf.deep_ms = Some(deep_started.elapsed().as_millis() as u64);
            perf.consensus_ms += deep_ms;
            trail.push(TrailEntry {
                stage: Stage::ConsensusDeep,
                detail: consensus_detail(&deep),
                score_before: base_score,
                score_after: base_score,
                duration_ms: deep_ms,
            });
            consensus = deep;
        }
        perf.models_queried = consensus.models_queried;
        perf.models_responded = consensus
            .opinions
            .iter()
            .filter(|o| o.error.is_none())
            .count();

        let ai_adjusted =
            consensus::apply_multiplier(base_score, consensus.final_multiplier, active_max);
        trail.push(TrailEntry {
            stage: Stage::AiAdjustment,
            detail: format!("multiplier {:.2}", consensus.final_multiplier),
            score_before: base_score,
            score_after: ai_adjusted,
            duration_ms: 0,
        });

        // Mitigation applies strictly after the multiplier, before override.
        let stage_started = Instant::now();
        let adjustment = FalsePositiveMitigator::assess(&evidence, &config.mitigation);
        let final_score = adjustment.apply(ai_adjusted, active_max);
        trail.push(TrailEntry {
            stage: Stage::Mitigation,
            detail: if adjustment.signals.is_empty() {
                "no legitimacy signals".to_string()
            } else {
                format!(
                    "{} signals, damping {:.2}, delta {:.1}",
                    adjustment.signals.len(),
                    adjustment.damping_multiplier,
                    adjustment.score_delta
                )
            },
            score_before: ai_adjusted,
            score_after: final_score,
            duration_ms: stage_started.elapsed().as_millis() as u64,
        });

        // Strategy-specific banding input, one bander for both.
        let bander = RiskBander::new(&config.thresholds);
        let (computed_level, probability) = match config.strategy {
            ScoringStrategy::WeightedCategory => {
                let normalized = if active_max > 0.0 {
                    final_score / active_max * 100.0
                } else {
                    0.0
                };
                (bander.band_score(normalized, branch), None)
            }
            ScoringStrategy::Probability => {
                let p = blend_probability(&estimate.signals, &consensus, &config);
                (bander.band_probability(p), Some(p))
            }
        };
        trail.push(TrailEntry {
            stage: Stage::Banding,
            detail: match probability {
                Some(p) => format!("probability {p:.2} -> {}", computed_level.as_str()),
                None => format!("score {final_score:.1} -> {}", computed_level.as_str()),
            },
            score_before: final_score,
            score_after: final_score,
            duration_ms: 0,
        });

        // Hard rules run last and can only raise the level.
        let ctx = OverrideContext {
            branch,
            tier1_hits: ti.tier1_hits,
            categories: &categories,
        };
        let (policy_override, risk_level) =
            PolicyOverrideEngine::evaluate(&config.overrides, &ctx, computed_level);
        trail.push(TrailEntry {
            stage: Stage::PolicyOverride,
            detail: match &policy_override {
                Some(r) => format!("{} -> {}", r.rule.as_str(), r.action.as_str()),
                None => "no rule matched".to_string(),
            },
            score_before: final_score,
            score_after: final_score,
            duration_ms: 0,
        });

        perf.total_ms = scan_started.elapsed().as_millis() as u64;
        counter!("scan_completed_total", "branch" => branch.as_str()).increment(1);
        histogram!("scan_duration_ms").record(perf.total_ms as f64);

        let completed_at = Utc::now();
        let scan_id = scan_id(&request.target, &config.id, config.version, completed_at);
        tracing::info!(
            scan_id = %scan_id,
            target = %request.target,
            branch = branch.as_str(),
            final_score,
            risk = risk_level.as_str(),
            "scan completed"
        );

        ScanResult {
            scan_id,
            target: request.target.clone(),
            branch,
            strategy: config.strategy,
            base_score,
            active_max_score: active_max,
            ai_multiplier: consensus.final_multiplier,
            false_positive_adjustment: adjustment,
            final_score,
            probability,
            confidence: estimate.interval,
            categories,
            ti,
            consensus,
            policy_override,
            risk_level,
            performance: perf,
            decision_trail: trail,
            config_id: config.id,
            config_version: config.version,
            completed_at,
        }
    }
}

/// Base aggregation: pure and deterministic. A category skipped by branch
/// gating contributes neither score nor max.
pub fn aggregate(categories: &[CategoryResult], ti: &TiSummary) -> (f64, f64) {
    let cat_score: f64 = categories.iter().map(|c| c.score).sum();
    let cat_max: f64 = categories.iter().map(|c| c.max_weight).sum();
    (cat_score + ti.score, cat_max + ti.max_score)
}

fn consensus_detail(c: &ConsensusResult) -> String {
    format!(
        "{} verdict from {}/{} opinions, agreement {:.0}%, multiplier {:.2}",
        c.consensus_verdict.as_str(),
        c.opinions.iter().filter(|o| o.verdict != Verdict::Unknown).count(),
        c.models_queried,
        c.agreement_rate * 100.0,
        c.final_multiplier
    )
}

/// Blends the fast signals and the consensus direction into p ∈ [0, 1] for
/// the probability strategy.
fn blend_probability(
    signals: &[FastSignal],
    consensus: &ConsensusResult,
    config: &ScoringConfig,
) -> f64 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for s in signals {
        weighted += s.weight * s.ratio;
        weight_sum += s.weight;
    }
    if consensus.consensus_verdict != Verdict::Unknown {
        let lean = (consensus.final_multiplier - consensus::MULTIPLIER_FLOOR)
            / (consensus::MULTIPLIER_CEILING - consensus::MULTIPLIER_FLOOR);
        weighted += config.blend.consensus * lean;
        weight_sum += config.blend.consensus;
    }
    if weight_sum <= 0.0 {
        return 0.0;
    }
    (weighted / weight_sum).clamp(0.0, 1.0)
}

fn build_prompt(
    evidence: &Evidence,
    branch: Branch,
    base_score: f64,
    active_max: f64,
    categories: &[CategoryResult],
    ti: &TiSummary,
) -> String {
    let mut findings: Vec<&str> = categories
        .iter()
        .flat_map(|c| c.findings.iter())
        .map(|f| f.message.as_str())
        .collect();
    findings.truncate(5);
    let findings = if findings.is_empty() {
        "none".to_string()
    } else {
        findings.join("; ")
    };
    format!(
        "Target: {}\nReachability: {}\nStatic score: {:.0} of {:.0}\n\
         Threat-intel hits: {} of {} sources\nTop findings: {}\n\
         Is this URL malicious?",
        evidence.target.raw,
        branch.as_str(),
        base_score,
        active_max,
        ti.results
            .iter()
            .filter(|r| r.verdict == Verdict::Malicious)
            .count(),
        ti.sources_queried,
        findings,
    )
}

/// Derived, stable scan identifier: a short sha2 fingerprint of the target,
/// the configuration identity, and the completion instant.
fn scan_id(
    target: &str,
    config_id: &str,
    config_version: u32,
    completed_at: chrono::DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(target.as_bytes());
    hasher.update(config_id.as_bytes());
    hasher.update(config_version.to_le_bytes());
    hasher.update(completed_at.timestamp_micros().to_le_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
