// src/config/store.rs
//! In-memory versioned configuration store.
//!
//! Invariants: exactly one configuration is active at any time; every save
//! validates first and appends an immutable history snapshot; scans take a
//! copy-by-value snapshot, so an activation or save mid-flight never changes
//! a running scan. Last-writer-wins is fine at this layer.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::scoring::{self, ScoringConfig};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRevision {
    pub config: ScoringConfig,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    latest: HashMap<String, ScoringConfig>,
    history: Vec<ConfigRevision>,
    active_id: String,
}

pub struct ConfigStore {
    state: RwLock<StoreState>,
}

impl ConfigStore {
    /// A store seeded with the balanced preset saved and activated, so the
    /// exactly-one-active invariant holds from construction on.
    pub fn new() -> Self {
        let store = Self {
            state: RwLock::new(StoreState::default()),
        };
        // The balanced preset validates by construction.
        if let Ok(saved) = store.save(ScoringConfig::default()) {
            let _ = store.activate(&saved.id);
        }
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and persist a configuration. Assigns `version = latest + 1`
    /// and appends a history snapshot. A rejected save leaves the store
    /// untouched.
    pub fn save(&self, mut cfg: ScoringConfig) -> EngineResult<ScoringConfig> {
        cfg.validate().map_err(EngineError::ConfigInvalid)?;

        let mut state = self.write();
        if cfg.id.is_empty() {
            cfg.id = format!("cfg-{}", cfg.fingerprint());
        }
        cfg.version = state.latest.get(&cfg.id).map(|c| c.version).unwrap_or(0) + 1;
        cfg.is_active = state.active_id == cfg.id;

        state.latest.insert(cfg.id.clone(), cfg.clone());
        state.history.push(ConfigRevision {
            config: cfg.clone(),
            saved_at: Utc::now(),
        });
        tracing::info!(config = %cfg.id, version = cfg.version, "configuration saved");
        Ok(cfg)
    }

    /// Make `id` the single active configuration.
    pub fn activate(&self, id: &str) -> EngineResult<ScoringConfig> {
        let mut state = self.write();
        if !state.latest.contains_key(id) {
            return Err(EngineError::ConfigInvalid(format!(
                "cannot activate unknown configuration '{id}'"
            )));
        }
        state.active_id = id.to_string();
        for (cid, cfg) in state.latest.iter_mut() {
            cfg.is_active = cid == id;
        }
        tracing::info!(config = %id, "configuration activated");
        // Just set above; the id is a known key.
        Ok(state.latest[id].clone())
    }

    /// Copy-by-value snapshot of the active configuration for one scan.
    pub fn snapshot(&self) -> ScoringConfig {
        let state = self.read();
        match state.latest.get(&state.active_id) {
            Some(cfg) => cfg.clone(),
            None => {
                tracing::error!("active configuration missing; falling back to defaults");
                ScoringConfig::default()
            }
        }
    }

    /// Snapshot by reference: a stored id, a preset name, or (with a warn
    /// log) the active configuration when the reference is unknown.
    pub fn resolve(&self, config_ref: Option<&str>) -> ScoringConfig {
        match config_ref {
            None => self.snapshot(),
            Some(r) => {
                if let Some(cfg) = self.get(r) {
                    return cfg;
                }
                if let Some(cfg) = scoring::preset(r) {
                    return cfg;
                }
                tracing::warn!(config_ref = %r, "unknown configuration reference, using active");
                self.snapshot()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<ScoringConfig> {
        self.read().latest.get(id).cloned()
    }

    pub fn history(&self, id: &str) -> Vec<ConfigRevision> {
        self.read()
            .history
            .iter()
            .filter(|r| r.config.id == id)
            .cloned()
            .collect()
    }

    pub fn list(&self) -> Vec<ScoringConfig> {
        let mut all: Vec<ScoringConfig> = self.read().latest.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn preset_names() -> &'static [&'static str] {
        scoring::preset_names()
    }

    /// Clone a named preset into a new stored configuration.
    pub fn save_preset(&self, name: &str, new_id: Option<&str>) -> EngineResult<ScoringConfig> {
        let mut cfg = scoring::preset(name).ok_or_else(|| {
            EngineError::ConfigInvalid(format!("unknown preset '{name}'"))
        })?;
        if let Some(id) = new_id {
            cfg.id = id.to_string();
        }
        self.save(cfg)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_has_one_active_config() {
        let store = ConfigStore::new();
        let snap = store.snapshot();
        assert_eq!(snap.id, "balanced");
        assert_eq!(snap.version, 1);
        assert!(snap.is_active);
    }

    #[test]
    fn save_bumps_version_and_appends_history() {
        let store = ConfigStore::new();
        let mut cfg = store.snapshot();
        cfg.ti.max_score = 90.0;
        let v2 = store.save(cfg).unwrap();
        assert_eq!(v2.version, 2);

        let history = store.history("balanced");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].config.version, 1);
        assert_eq!(history[1].config.version, 2);
        assert_eq!(history[0].config.ti.max_score, 80.0);
    }

    #[test]
    fn rejected_save_leaves_store_untouched() {
        let store = ConfigStore::new();
        let before = store.history("balanced").len();

        let mut bad = store.snapshot();
        bad.thresholds.global = crate::banding::ThresholdSet(vec![10.0, 10.0, 30.0, 50.0, 70.0]);
        let err = store.save(bad).unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid(_)));

        assert_eq!(store.history("balanced").len(), before);
        assert_eq!(store.snapshot().ti.max_score, 80.0);
    }

    #[test]
    fn activation_is_exclusive() {
        let store = ConfigStore::new();
        let strict = store.save_preset("strict", None).unwrap();
        store.activate(&strict.id).unwrap();

        assert!(store.get(&strict.id).unwrap().is_active);
        assert!(!store.get("balanced").unwrap().is_active);
        assert_eq!(store.snapshot().id, strict.id);

        let err = store.activate("does-not-exist").unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid(_)));
    }

    #[test]
    fn snapshot_is_isolated_from_later_saves() {
        let store = ConfigStore::new();
        let snap = store.snapshot();

        let mut newer = store.snapshot();
        newer.ti.max_score = 120.0;
        store.save(newer).unwrap();

        assert_eq!(snap.ti.max_score, 80.0);
        assert_eq!(store.snapshot().ti.max_score, 120.0);
    }

    #[test]
    fn resolve_falls_back_for_unknown_refs() {
        let store = ConfigStore::new();
        assert_eq!(store.resolve(Some("strict")).id, "strict");
        assert_eq!(store.resolve(Some("no-such-config")).id, "balanced");
        assert_eq!(store.resolve(None).id, "balanced");
    }

    #[test]
    fn empty_id_gets_a_fingerprint_id() {
        let store = ConfigStore::new();
        let mut cfg = ScoringConfig::default();
        cfg.id = String::new();
        let saved = store.save(cfg).unwrap();
        assert!(saved.id.starts_with("cfg-"));
        assert_eq!(saved.version, 1);
    }
}
