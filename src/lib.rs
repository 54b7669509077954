// src/lib.rs
//! URL verdict engine: risk scoring and multi-model AI consensus for
//! malicious-site detection.
//!
//! The crate is the scoring core only. Evidence collection, persistence,
//! and presentation are external collaborators reached through the
//! `Prober`, `TiSource`, and `ModelClient` seams; the engine consumes
//! immutable evidence plus a configuration snapshot and emits exactly one
//! `ScanResult` with an auditable decision trail.

pub mod banding;
pub mod checks;
pub mod confidence;
pub mod config;
pub mod consensus;
pub mod error;
pub mod evidence;
pub mod intel;
pub mod mitigation;
pub mod overrides;
pub mod reachability;
pub mod report;
pub mod scanner;
pub mod telemetry;
pub mod verdict;

pub use config::{ConfigStore, ScoringConfig, ScoringStrategy};
pub use consensus::{AiConsensusEngine, ChatCompletionsClient, MockModelClient, ModelClient};
pub use error::{EngineError, EngineResult};
pub use evidence::{Evidence, ScanOptions, ScanRequest};
pub use intel::{StaticTiSource, ThreatIntelCombiner, TiSource, UrlhausSource};
pub use reachability::{Branch, NetProber, Prober, StaticProber};
pub use report::ScanResult;
pub use scanner::Scanner;
pub use verdict::{RiskLevel, Verdict};
