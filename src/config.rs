//! Pipeline configuration: the frozen set of parameters read once at
//! process start and carried through every phase instead of read from
//! ambient global state.
//!
//! A plain serde struct with a sane default, overridden from environment
//! variables at the process boundary rather than scattered `env::var`
//! calls through the library.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub run_id: String,
    pub artifacts_dir: String,
    pub worker_pool_size: usize,
    pub calibration_threshold: f64,
    pub default_method_timeout_ms: u64,
    pub default_method_max_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            artifacts_dir: "./artifacts".to_string(),
            worker_pool_size: default_worker_pool_size(),
            calibration_threshold: 0.7,
            default_method_timeout_ms: 5_000,
            default_method_max_retries: 2,
        }
    }
}

fn default_worker_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl PipelineConfig {
    /// Build from environment variables named in the kernel's configured
    /// env surface (`RUN_ID`, `ARTIFACTS_DIR`, `WORKER_POOL_SIZE`,
    /// `CALIBRATION_THRESHOLD`), falling back to defaults for anything
    /// unset. Reads the environment exactly once, here, never elsewhere.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(run_id) = std::env::var("RUN_ID") {
            if run_id.trim().is_empty() {
                return Err(Error::config("RUN_ID is set but empty"));
            }
            config.run_id = run_id;
        }

        if let Ok(dir) = std::env::var("ARTIFACTS_DIR") {
            config.artifacts_dir = dir;
        }

        if let Ok(raw) = std::env::var("WORKER_POOL_SIZE") {
            config.worker_pool_size = raw
                .parse()
                .map_err(|_| Error::config(format!("WORKER_POOL_SIZE '{raw}' is not a positive integer")))?;
            if config.worker_pool_size == 0 {
                return Err(Error::config("WORKER_POOL_SIZE must be at least 1"));
            }
        }

        if let Ok(raw) = std::env::var("CALIBRATION_THRESHOLD") {
            let value: f64 = raw
                .parse()
                .map_err(|_| Error::config(format!("CALIBRATION_THRESHOLD '{raw}' is not a number")))?;
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!("CALIBRATION_THRESHOLD {value} out of range [0,1]")));
            }
            config.calibration_threshold = value;
        }

        Ok(config)
    }
}
