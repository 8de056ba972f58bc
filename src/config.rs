use std::time::Duration;

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::constants;

/// Tuning knobs and limits of an upload.
///
/// # Examples
///
/// ```
/// use formstream::UploadConfig;
///
/// let config = UploadConfig::new()
///     .buffer_size(8 * 1024)
///     .max_upload_size(10 * 1024 * 1024)
///     .cpu_limit(64)
///     .buf_sleep_ms(2);
///
/// assert_eq!(config.effective_buffer_size(), 8 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UploadConfig {
    pub(crate) buffer_size: usize,
    pub(crate) max_upload_size: u64,
    pub(crate) cpu_limit: u64,
    pub(crate) buf_sleep_ms: u64,
    pub(crate) max_text_field_size: u64,
    pub(crate) max_header_size: usize,
}

impl UploadConfig {
    /// Creates the default configuration: a 1 KiB buffer, a 50 MiB upload
    /// limit and a 1 ms pause after every 1024 buffer flushes.
    pub fn new() -> UploadConfig {
        UploadConfig::default()
    }

    /// Sets the size of the reusable read buffer. Values below 1024 bytes are raised to 1024.
    pub fn buffer_size(mut self, size: usize) -> UploadConfig {
        self.buffer_size = size;
        self
    }

    /// Sets the largest accepted request body, both declared and actually read.
    pub fn max_upload_size(mut self, limit: u64) -> UploadConfig {
        self.max_upload_size = limit;
        self
    }

    /// Sets after how many buffer flushes the upload pauses.
    pub fn cpu_limit(mut self, flushes: u64) -> UploadConfig {
        self.cpu_limit = flushes;
        self
    }

    /// Sets the pause, in milliseconds, taken every `cpu_limit` flushes. `0` disables pausing.
    pub fn buf_sleep_ms(mut self, millis: u64) -> UploadConfig {
        self.buf_sleep_ms = millis;
        self
    }

    /// Sets the largest text field value kept in memory.
    pub fn max_text_field_size(mut self, limit: u64) -> UploadConfig {
        self.max_text_field_size = limit;
        self
    }

    /// Sets the largest header block accepted for a single part.
    pub fn max_header_size(mut self, limit: usize) -> UploadConfig {
        self.max_header_size = limit;
        self
    }

    /// The buffer size actually used, never below 1024 bytes.
    pub fn effective_buffer_size(&self) -> usize {
        std::cmp::max(self.buffer_size, constants::MIN_BUFFER_SIZE)
    }

    pub fn get_max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    pub fn get_cpu_limit(&self) -> u64 {
        self.cpu_limit
    }

    pub fn buf_sleep(&self) -> Duration {
        Duration::from_millis(self.buf_sleep_ms)
    }

    /// Reads a configuration from `JSON`; missing keys keep their defaults.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> crate::Result<UploadConfig> {
        serde_json::from_str(json).map_err(crate::Error::DecodeJson)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            buffer_size: constants::MIN_BUFFER_SIZE,
            max_upload_size: constants::DEFAULT_MAX_UPLOAD_SIZE,
            cpu_limit: constants::DEFAULT_CPU_LIMIT,
            buf_sleep_ms: constants::DEFAULT_BUF_SLEEP_MS,
            max_text_field_size: constants::DEFAULT_MAX_TEXT_FIELD_SIZE,
            max_header_size: constants::DEFAULT_MAX_HEADER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_floor() {
        assert_eq!(UploadConfig::new().buffer_size(10).effective_buffer_size(), 1024);
        assert_eq!(UploadConfig::new().buffer_size(4096).effective_buffer_size(), 4096);
    }

    #[test]
    fn test_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.get_max_upload_size(), 52_428_800);
        assert_eq!(config.get_cpu_limit(), 1024);
        assert_eq!(config.buf_sleep(), Duration::from_millis(1));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json() {
        let config = UploadConfig::from_json(r#"{ "buffer_size": 8192, "buf_sleep_ms": 0 }"#).unwrap();
        assert_eq!(config.effective_buffer_size(), 8192);
        assert_eq!(config.buf_sleep(), Duration::from_millis(0));
        assert_eq!(config.get_cpu_limit(), 1024);

        assert!(UploadConfig::from_json("[1, 2]").is_err());
    }
}
