//! Pool configuration.
//!
//! A [`PoolConfig`] controls how many buffers each size class may retain and
//! which classes are filled up front.  It can be built in code or loaded from
//! a JSON document; missing fields take their defaults.
//!
//! ```json
//! { "max_retained_per_class": 256, "prewarm": [{ "size": 4096, "count": 16 }] }
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::size_class::MAX_POOLABLE_SIZE;

/// Default retention limit for each size class.
pub const DEFAULT_MAX_RETAINED_PER_CLASS: usize = 1024;

/// Buffers to allocate into a class when the pool is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrewarmSpec {
    /// Request size; the buffers land in the class serving this size.
    pub size: usize,
    /// Number of buffers to allocate.
    pub count: usize,
}

/// Tunables for a [`BytePool`](crate::BytePool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on buffers kept per size class.  Releases into a full
    /// class drop the buffer.  Zero disables retention entirely.
    pub max_retained_per_class: usize,
    /// Classes to fill at construction.
    pub prewarm: Vec<PrewarmSpec>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_retained_per_class: DEFAULT_MAX_RETAINED_PER_CLASS,
            prewarm: Vec::new(),
        }
    }
}

impl PoolConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading pool config {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("parsing pool config {}", path.display()))?;
        info!(path = %path.display(), "Loaded pool config");
        Ok(config)
    }

    /// Check that every prewarm entry names a poolable size.
    pub fn validate(&self) -> Result<()> {
        for spec in &self.prewarm {
            if spec.size == 0 || spec.size > MAX_POOLABLE_SIZE {
                return Err(Error::InvalidConfig(format!(
                    "prewarm size {} outside poolable range 1..={}",
                    spec.size, MAX_POOLABLE_SIZE
                )));
            }
            if spec.count > self.max_retained_per_class {
                return Err(Error::InvalidConfig(format!(
                    "prewarm count {} for size {} exceeds max_retained_per_class {}",
                    spec.count, spec.size, self.max_retained_per_class
                )));
            }
        }
        Ok(())
    }
}
