//! Configuration for the document processing pipeline.
//!
//! All pipeline behaviour is controlled through [`ProcessorConfig`], built
//! via its [`ProcessorConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across concurrent runs, serialise them for
//! logging, and diff two runs to understand why their outcomes differ.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for document processing.
///
/// Built via [`ProcessorConfig::builder()`] or using
/// [`ProcessorConfig::default()`].
///
/// # Example
/// ```rust
/// use tradedoc_pipeline::ProcessorConfig;
///
/// let config = ProcessorConfig::builder()
///     .max_attempts(3)
///     .oracle_timeout_secs(90)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Directory holding stored upload files. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Maximum oracle attempts per call (initial try included). Default: 3.
    ///
    /// Rate limits and 5xx responses are frequent under concurrent load and
    /// almost always clear within seconds. Three attempts catch the vast
    /// majority without blocking a run for long. Parse failures are never
    /// retried — a model that returned broken JSON once will return it again.
    pub max_attempts: u32,

    /// Base retry delay in seconds (exponential backoff). Default: 1.
    ///
    /// Doubles after each failed attempt: 1 s → 2 s → 4 s. Exponential
    /// backoff avoids the thundering-herd problem where N concurrent runs
    /// retry simultaneously against a recovering endpoint.
    pub retry_backoff_secs: u64,

    /// Caller-enforced upper bound on one oracle call, in seconds.
    /// Default: 120.
    ///
    /// Without this, one slow document can pin a worker indefinitely. The
    /// timeout counts as a transport failure and consumes one retry attempt.
    pub oracle_timeout_secs: u64,

    /// Maximum rendered page dimension (width or height) in pixels.
    /// Default: 2048.
    ///
    /// Scanned trade documents carry small print (port codes, IEC numbers);
    /// 2048 px keeps that legible to the vision oracle while bounding memory
    /// for oversized pages.
    pub max_raster_pixels: u32,

    /// Number of concurrent pipeline runs in a batch or pool. Default: 4.
    ///
    /// Oracle calls are network-bound; a handful of concurrent runs cuts
    /// batch wall-clock substantially. Lower this if the provider rate-limits.
    pub concurrency: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_attempts: 3,
            retry_backoff_secs: 1,
            oracle_timeout_secs: 120,
            max_raster_pixels: 2048,
            concurrency: 4,
        }
    }
}

impl ProcessorConfig {
    /// Create a new builder for `ProcessorConfig`.
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessorConfig`].
#[derive(Debug)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_secs(mut self, secs: u64) -> Self {
        self.config.retry_backoff_secs = secs;
        self
    }

    pub fn oracle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.oracle_timeout_secs = secs;
        self
    }

    pub fn max_raster_pixels(mut self, px: u32) -> Self {
        self.config.max_raster_pixels = px.max(256);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessorConfig, PipelineError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.oracle_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "oracle_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(PipelineError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ProcessorConfig::default();
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_backoff_secs, 1);
        assert_eq!(c.max_raster_pixels, 2048);
        assert_eq!(c.concurrency, 4);
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = ProcessorConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn zero_attempts_rejected() {
        let result = ProcessorConfig::builder().max_attempts(0).build();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }
}
