// src/config/mod.rs
pub mod scoring;
pub mod store;

pub use scoring::{preset, preset_names, ScoringConfig, ScoringStrategy};
pub use store::{ConfigRevision, ConfigStore};
