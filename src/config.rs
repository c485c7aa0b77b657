//! Engine configuration.
//!
//! Built in code with the `with_*` methods or loaded from JSON; every field
//! has a default so partial JSON objects are accepted.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Signature capacity reserved in `/Contents` by default (16 KiB).
pub const DEFAULT_SIGNATURE_RESERVE: usize = 16 * 1024;

/// Engine-wide settings. Immutable once handed to a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL encoded in the verification QR code.
    pub verification_base_url: String,

    /// Issuer name fragments considered trusted. Matching is a
    /// case-insensitive substring test on the issuer DN.
    pub trusted_issuers: Vec<String>,

    /// Certificates expiring within this many days raise a warning.
    pub expiry_warning_days: i64,

    /// Bytes of signature capacity reserved in the placeholder.
    pub signature_reserve_bytes: usize,

    /// Upper bound for a single render or sign job.
    pub operation_timeout_ms: u64,

    /// Worker threads; `None` uses the CPU count.
    pub worker_threads: Option<usize>,

    /// Page width in points.
    pub page_width: f32,

    /// Page height in points.
    pub page_height: f32,

    /// Flate-compress page content streams.
    pub compress_streams: bool,

    /// Side length of the QR code in points.
    pub qr_size: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create new configuration with defaults (A4, 16 KiB reserve, 5 s timeout).
    pub fn new() -> Self {
        Self {
            verification_base_url: "https://verificar.medsign.local/d".to_string(),
            trusted_issuers: vec!["ICP-Brasil".to_string()],
            expiry_warning_days: 30,
            signature_reserve_bytes: DEFAULT_SIGNATURE_RESERVE,
            operation_timeout_ms: 5_000,
            worker_threads: None,
            page_width: 595.0,
            page_height: 842.0,
            compress_streams: false,
            qr_size: 72.0,
        }
    }

    /// Set the verification base URL.
    pub fn with_verification_base_url(mut self, url: impl Into<String>) -> Self {
        self.verification_base_url = url.into();
        self
    }

    /// Replace the trusted issuer list.
    pub fn with_trusted_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_issuers = issuers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the expiry warning window in days.
    pub fn with_expiry_warning_days(mut self, days: i64) -> Self {
        self.expiry_warning_days = days;
        self
    }

    /// Set the signature placeholder capacity in bytes.
    pub fn with_signature_reserve_bytes(mut self, bytes: usize) -> Self {
        self.signature_reserve_bytes = bytes;
        self
    }

    /// Set the per-operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the number of worker threads.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compress_streams(mut self, compress: bool) -> Self {
        self.compress_streams = compress;
        self
    }

    /// Per-operation timeout as a `Duration`.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject values no operation can work with.
    pub fn validate(&self) -> Result<()> {
        if self.signature_reserve_bytes < 1024 {
            return Err(Error::Config(format!(
                "signature_reserve_bytes must be at least 1024, got {}",
                self.signature_reserve_bytes
            )));
        }
        if self.operation_timeout_ms == 0 {
            return Err(Error::Config("operation_timeout_ms must be positive".to_string()));
        }
        if self.worker_threads == Some(0) {
            return Err(Error::Config("worker_threads must be positive".to_string()));
        }
        if self.page_width < 200.0 || self.page_height < 300.0 {
            return Err(Error::Config(format!(
                "page size {}x{} is too small",
                self.page_width, self.page_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.signature_reserve_bytes, 16384);
        assert_eq!(config.expiry_warning_days, 30);
        assert_eq!(config.operation_timeout(), Duration::from_secs(5));
        assert_eq!(config.trusted_issuers, vec!["ICP-Brasil".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_verification_base_url("https://v.example/doc")
            .with_trusted_issuers(["AC Teste"])
            .with_worker_threads(2)
            .with_operation_timeout(Duration::from_millis(250));
        assert_eq!(config.verification_base_url, "https://v.example/doc");
        assert_eq!(config.trusted_issuers, vec!["AC Teste".to_string()]);
        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.operation_timeout_ms, 250);
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(r#"{"expiry_warning_days": 10}"#).unwrap();
        assert_eq!(config.expiry_warning_days, 10);
        assert_eq!(config.signature_reserve_bytes, DEFAULT_SIGNATURE_RESERVE);
    }

    #[test]
    fn test_invalid_json_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"signature_reserve_bytes": 10}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"worker_threads": 0}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(EngineConfig::from_json("not json"), Err(Error::Json(_))));
    }
}
