// src/consensus/mod.rs
//! Multi-model AI consensus: a `JoinSet` fan-out with per-call timeouts
//! racing an aggregate timeout. When the aggregate fires first, pending
//! tasks are aborted, not merely ignored. Consensus failure never blocks
//! scan completion: zero usable opinions yield multiplier 1.0 and UNKNOWN.

pub mod adapter;
pub mod extract;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

pub use adapter::{ChatCompletionsClient, MockModelClient, ModelClient};

use crate::config::scoring::AiConfig;
use crate::verdict::Verdict;

pub const MULTIPLIER_FLOOR: f64 = 0.7;
pub const MULTIPLIER_CEILING: f64 = 1.3;

/// One model's answer, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOpinion {
    pub model: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub opinions: Vec<ModelOpinion>,
    /// Fraction of non-UNKNOWN opinions matching the majority, in [0, 1].
    pub agreement_rate: f64,
    pub average_confidence: f64,
    pub consensus_verdict: Verdict,
    /// Weighted multiplier over base score, clamped to [0.7, 1.3].
    pub final_multiplier: f64,
    pub aggregate_timeout_hit: bool,
    pub models_queried: usize,
}

impl Default for ConsensusResult {
    fn default() -> Self {
        Self {
            opinions: Vec::new(),
            agreement_rate: 0.0,
            average_confidence: 0.0,
            consensus_verdict: Verdict::Unknown,
            final_multiplier: 1.0,
            aggregate_timeout_hit: false,
            models_queried: 0,
        }
    }
}

/// Score direction a verdict pushes the multiplier in.
fn direction(verdict: Verdict) -> f64 {
    match verdict {
        Verdict::Malicious => 1.0,
        Verdict::Suspicious => 0.5,
        Verdict::Safe => -1.0,
        Verdict::Unknown => 0.0,
    }
}

pub struct AiConsensusEngine {
    clients: Vec<Arc<dyn ModelClient>>,
}

impl AiConsensusEngine {
    pub fn new(clients: Vec<Arc<dyn ModelClient>>) -> Self {
        Self { clients }
    }

    /// Fan the prompt out to every configured, enabled model and fold the
    /// replies into a consensus. Per-call and aggregate timeouts come from
    /// the config snapshot.
    pub async fn run(&self, prompt: &str, cfg: &AiConfig) -> ConsensusResult {
        let started = std::time::Instant::now();
        let per_call = Duration::from_millis(cfg.per_call_timeout_ms.max(1));
        let aggregate = Duration::from_millis(cfg.aggregate_timeout_ms.max(1));
        let weights: HashMap<String, f64> = cfg
            .models
            .iter()
            .filter(|m| m.enabled)
            .map(|m| (m.id.clone(), m.weight))
            .collect();

        let mut set: JoinSet<ModelOpinion> = JoinSet::new();
        let mut queried = 0usize;
        for client in &self.clients {
            let Some(&weight) = weights.get(client.id()) else {
                continue;
            };
            queried += 1;
            let client = Arc::clone(client);
            let prompt = prompt.to_string();
            set.spawn(async move {
                let started = std::time::Instant::now();
                let outcome = tokio::time::timeout(per_call, client.generate(&prompt)).await;
                let duration_ms = started.elapsed().as_millis() as u64;
                match outcome {
                    Ok(Ok(text)) => {
                        let parsed = extract::extract(&text);
                        ModelOpinion {
                            model: client.id().to_string(),
                            verdict: parsed.verdict,
                            confidence: parsed.confidence,
                            weight,
                            reasoning: Some(text),
                            duration_ms,
                            error: None,
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = ?e, model = client.id(), "model call failed");
                        counter!("consensus_model_errors_total").increment(1);
                        ModelOpinion {
                            model: client.id().to_string(),
                            verdict: Verdict::Unknown,
                            confidence: 0.0,
                            weight,
                            reasoning: None,
                            duration_ms,
                            error: Some(e.to_string()),
                        }
                    }
                    Err(_) => {
                        tracing::warn!(model = client.id(), "model call timed out");
                        counter!("consensus_model_errors_total").increment(1);
                        ModelOpinion {
                            model: client.id().to_string(),
                            verdict: Verdict::Unknown,
                            confidence: 0.0,
                            weight,
                            reasoning: None,
                            duration_ms,
                            error: Some("timed out".to_string()),
                        }
                    }
                }
            });
        }

        // Collect in arrival order; the aggregate deadline races the joins
        // and aborts whatever is still pending when it fires.
        let mut opinions = Vec::with_capacity(queried);
        let mut aggregate_timeout_hit = false;
        let deadline = tokio::time::Instant::now() + aggregate;
        loop {
            let next = tokio::time::timeout_at(deadline, set.join_next()).await;
            match next {
                Ok(Some(Ok(op))) => opinions.push(op),
                Ok(Some(Err(e))) => {
                    tracing::warn!(error = ?e, "model task join failed");
                    counter!("consensus_model_errors_total").increment(1);
                }
                Ok(None) => break,
                Err(_) => {
                    let pending = queried.saturating_sub(opinions.len());
                    tracing::warn!(pending, "aggregate consensus timeout, aborting stragglers");
                    counter!("consensus_aggregate_timeouts_total").increment(1);
                    set.abort_all();
                    while set.join_next().await.is_some() {}
                    aggregate_timeout_hit = true;
                    break;
                }
            }
        }

        let mut result = Self::fold(opinions);
        result.aggregate_timeout_hit = aggregate_timeout_hit;
        result.models_queried = queried;
        histogram!("consensus_duration_ms").record(started.elapsed().as_millis() as f64);
        histogram!("consensus_opinions").record(
            result
                .opinions
                .iter()
                .filter(|o| o.verdict != Verdict::Unknown)
                .count() as f64,
        );
        result
    }

    /// Pure aggregation over collected opinions (arrival order preserved).
    pub fn fold(opinions: Vec<ModelOpinion>) -> ConsensusResult {
        let usable: Vec<&ModelOpinion> = opinions
            .iter()
            .filter(|o| o.verdict != Verdict::Unknown)
            .collect();
        if usable.is_empty() {
            return ConsensusResult {
                opinions,
                ..ConsensusResult::default()
            };
        }

        // Majority vote; ties resolve toward the earliest-arriving opinion
        // among the tied verdicts.
        let mut counts: Vec<(Verdict, usize)> = Vec::new();
        for op in &usable {
            match counts.iter_mut().find(|(v, _)| *v == op.verdict) {
                Some((_, n)) => *n += 1,
                None => counts.push((op.verdict, 1)),
            }
        }
        let top = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
        let consensus_verdict = usable
            .iter()
            .find(|o| {
                counts
                    .iter()
                    .any(|(v, n)| *v == o.verdict && *n == top)
            })
            .map(|o| o.verdict)
            .unwrap_or(Verdict::Unknown);

        let matching = usable
            .iter()
            .filter(|o| o.verdict == consensus_verdict)
            .count();
        let agreement_rate = matching as f64 / usable.len() as f64;
        let average_confidence =
            usable.iter().map(|o| o.confidence).sum::<f64>() / usable.len() as f64;

        let weight_sum: f64 = usable.iter().map(|o| o.weight).sum();
        let final_multiplier = if weight_sum > 0.0 {
            let lean: f64 = usable
                .iter()
                .map(|o| o.weight * o.confidence * direction(o.verdict))
                .sum::<f64>()
                / weight_sum;
            (1.0 + (MULTIPLIER_CEILING - 1.0) * lean).clamp(MULTIPLIER_FLOOR, MULTIPLIER_CEILING)
        } else {
            1.0
        };

        let models_queried = opinions.len();
        ConsensusResult {
            opinions,
            agreement_rate,
            average_confidence,
            consensus_verdict,
            final_multiplier,
            aggregate_timeout_hit: false,
            models_queried,
        }
    }
}

/// AI-adjusted score: base times the multiplier, re-clamped to the active
/// maximum.
pub fn apply_multiplier(base_score: f64, multiplier: f64, active_max: f64) -> f64 {
    (base_score * multiplier).clamp(0.0, active_max.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opinion(model: &str, verdict: Verdict, confidence: f64) -> ModelOpinion {
        ModelOpinion {
            model: model.to_string(),
            verdict,
            confidence,
            weight: 1.0,
            reasoning: None,
            duration_ms: 10,
            error: None,
        }
    }

    #[test]
    fn unanimous_malicious_pushes_multiplier_to_ceiling() {
        let result = AiConsensusEngine::fold(vec![
            opinion("a", Verdict::Malicious, 0.95),
            opinion("b", Verdict::Malicious, 0.9),
            opinion("c", Verdict::Malicious, 0.92),
        ]);
        assert_eq!(result.consensus_verdict, Verdict::Malicious);
        assert_eq!(result.agreement_rate, 1.0);
        assert!(result.final_multiplier > 1.25, "{}", result.final_multiplier);
        assert!(result.final_multiplier <= MULTIPLIER_CEILING);
    }

    #[test]
    fn unanimous_safe_pulls_multiplier_to_floor() {
        let result = AiConsensusEngine::fold(vec![
            opinion("a", Verdict::Safe, 0.95),
            opinion("b", Verdict::Safe, 0.9),
        ]);
        assert_eq!(result.consensus_verdict, Verdict::Safe);
        assert!(result.final_multiplier >= MULTIPLIER_FLOOR);
        assert!(result.final_multiplier < 0.8, "{}", result.final_multiplier);
    }

    #[test]
    fn zero_opinions_default_to_neutral() {
        let result = AiConsensusEngine::fold(vec![]);
        assert_eq!(result.final_multiplier, 1.0);
        assert_eq!(result.consensus_verdict, Verdict::Unknown);
        assert_eq!(result.agreement_rate, 0.0);
    }

    #[test]
    fn all_unknown_behaves_like_zero_opinions() {
        let result = AiConsensusEngine::fold(vec![
            opinion("a", Verdict::Unknown, 0.0),
            opinion("b", Verdict::Unknown, 0.0),
        ]);
        assert_eq!(result.final_multiplier, 1.0);
        assert_eq!(result.consensus_verdict, Verdict::Unknown);
        assert_eq!(result.opinions.len(), 2);
    }

    #[test]
    fn majority_vote_ignores_unknowns() {
        let result = AiConsensusEngine::fold(vec![
            opinion("a", Verdict::Unknown, 0.0),
            opinion("b", Verdict::Malicious, 0.8),
            opinion("c", Verdict::Malicious, 0.7),
            opinion("d", Verdict::Safe, 0.9),
        ]);
        assert_eq!(result.consensus_verdict, Verdict::Malicious);
        assert!((result.agreement_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn tie_resolves_to_earliest_arrival() {
        let result = AiConsensusEngine::fold(vec![
            opinion("first", Verdict::Suspicious, 0.6),
            opinion("second", Verdict::Safe, 0.6),
        ]);
        assert_eq!(result.consensus_verdict, Verdict::Suspicious);
        assert_eq!(result.agreement_rate, 0.5);
    }

    #[test]
    fn multiplier_respects_model_weights() {
        let mut heavy_safe = opinion("a", Verdict::Safe, 0.9);
        heavy_safe.weight = 3.0;
        let result = AiConsensusEngine::fold(vec![
            heavy_safe,
            opinion("b", Verdict::Malicious, 0.9),
        ]);
        // The heavier SAFE vote drags the blend below neutral.
        assert!(result.final_multiplier < 1.0);
    }

    #[test]
    fn apply_multiplier_reclamps_to_active_max() {
        assert_eq!(apply_multiplier(90.0, 1.3, 100.0), 100.0);
        assert_eq!(apply_multiplier(50.0, 1.2, 100.0), 60.0);
        assert_eq!(apply_multiplier(0.0, 0.7, 100.0), 0.0);
    }

    fn cfg_with_models(ids: &[&str]) -> AiConfig {
        use crate::config::scoring::ModelConfig;
        AiConfig {
            models: ids
                .iter()
                .map(|id| ModelConfig {
                    id: id.to_string(),
                    provider: "mock".into(),
                    model: String::new(),
                    base_url: None,
                    api_key_env: None,
                    weight: 1.0,
                    enabled: true,
                })
                .collect(),
            ..AiConfig::default()
        }
    }

    #[tokio::test]
    async fn fan_out_collects_all_replies() {
        let engine = AiConsensusEngine::new(vec![
            Arc::new(MockModelClient::new("a", "Verdict: MALICIOUS\nConfidence: 90%")),
            Arc::new(MockModelClient::new("b", "Verdict: MALICIOUS\nConfidence: 85%")),
            Arc::new(MockModelClient::new("c", "Verdict: SAFE\nConfidence: 60%")),
        ]);
        let result = engine.run("prompt", &cfg_with_models(&["a", "b", "c"])).await;
        assert_eq!(result.opinions.len(), 3);
        assert_eq!(result.consensus_verdict, Verdict::Malicious);
        assert!(!result.aggregate_timeout_hit);
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_timeout_degrades_one_model() {
        let engine = AiConsensusEngine::new(vec![
            Arc::new(MockModelClient::new("fast", "Verdict: SUSPICIOUS")),
            Arc::new(
                MockModelClient::new("slow", "Verdict: SAFE")
                    .with_delay(Duration::from_secs(30)),
            ),
        ]);
        let result = engine.run("prompt", &cfg_with_models(&["fast", "slow"])).await;
        assert_eq!(result.consensus_verdict, Verdict::Suspicious);
        let slow = result.opinions.iter().find(|o| o.model == "slow").unwrap();
        assert_eq!(slow.error.as_deref(), Some("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn aggregate_timeout_aborts_stragglers() {
        let mut cfg = cfg_with_models(&["fast", "slow1", "slow2"]);
        cfg.per_call_timeout_ms = 60_000;
        cfg.aggregate_timeout_ms = 5_000;
        let engine = AiConsensusEngine::new(vec![
            Arc::new(MockModelClient::new("fast", "Verdict: MALICIOUS\nConfidence: 80%")),
            Arc::new(
                MockModelClient::new("slow1", "Verdict: SAFE")
                    .with_delay(Duration::from_secs(50)),
            ),
            Arc::new(
                MockModelClient::new("slow2", "Verdict: SAFE")
                    .with_delay(Duration::from_secs(50)),
            ),
        ]);
        let result = engine.run("prompt", &cfg).await;
        assert!(result.aggregate_timeout_hit);
        // Only the fast opinion made it in; consensus comes from it alone.
        assert_eq!(result.opinions.len(), 1);
        assert_eq!(result.consensus_verdict, Verdict::Malicious);
        assert_eq!(result.agreement_rate, 1.0);
    }

    #[tokio::test]
    async fn disabled_models_are_not_queried() {
        let mut cfg = cfg_with_models(&["a", "b"]);
        cfg.models[1].enabled = false;
        let engine = AiConsensusEngine::new(vec![
            Arc::new(MockModelClient::new("a", "Verdict: SAFE")),
            Arc::new(MockModelClient::new("b", "Verdict: MALICIOUS")),
        ]);
        let result = engine.run("prompt", &cfg).await;
        assert_eq!(result.opinions.len(), 1);
        assert_eq!(result.consensus_verdict, Verdict::Safe);
    }
}
