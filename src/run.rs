use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to sample: which interface, how often, how many times.
///
/// Loadable from a JSON file so a recurring measurement can be kept next to
/// the device it belongs to; CLI flags override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlan {
    /// Interface index to sample.
    pub interface: u32,
    /// Seconds between samples.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Number of samples to take.
    #[serde(default = "default_samples")]
    pub samples: u32,
}

fn default_interval() -> u64 {
    1
}

fn default_samples() -> u32 {
    50
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("could not read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RunPlan {
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let raw = fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| PlanError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
