//! Engine error taxonomy.
//!
//! Only two failures are ever user-visible: configuration validation at save
//! time and the per-scan wall-clock ceiling. Every other failure (missing
//! evidence, a model timing out, a threat-intel source erroring) is caught at
//! its stage, logged, and converted into a zero contribution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A configuration failed validation and was rejected before becoming
    /// active. Scans never see this: they run on pre-validated snapshots.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The scan exceeded its wall-clock ceiling. The scan is failed as a
    /// whole; no partial score is ever reported.
    #[error("scan exceeded wall-clock ceiling of {ceiling_ms} ms")]
    ScanTimeout { ceiling_ms: u64 },
}

pub type EngineResult<T> = Result<T, EngineError>;
