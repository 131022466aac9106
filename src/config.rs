//! Configuration for document graphs.

use serde::{Deserialize, Serialize};

/// Default page width in points (A4).
pub const DEFAULT_PAGE_WIDTH: f64 = 595.0;

/// Default page height in points (A4).
pub const DEFAULT_PAGE_HEIGHT: f64 = 842.0;

/// Document configuration.
///
/// # Example
///
/// ```
/// use pdf_graft::config::DocumentConfig;
///
/// let config = DocumentConfig::new()
///     .with_max_nesting_depth(64)
///     .with_compress_streams(true);
/// assert_eq!(config.max_nesting_depth, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Maximum nesting depth of direct arrays/dictionaries while grafting.
    ///
    /// Indirect references do not count toward the limit.
    pub max_nesting_depth: u32,

    /// Page size (width, height) reported by `page_bounds` for pages with no
    /// usable media box.
    pub default_page_size: (f64, f64),

    /// Default for `SaveOptions::compress`.
    pub compress_streams: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_nesting_depth: 100,
            default_page_size: (DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT),
            compress_streams: false,
        }
    }

    /// Set the maximum direct nesting depth.
    pub fn with_max_nesting_depth(mut self, depth: u32) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Set the default page size.
    pub fn with_default_page_size(mut self, width: f64, height: f64) -> Self {
        self.default_page_size = (width, height);
        self
    }

    /// Compress unfiltered streams on save by default.
    pub fn with_compress_streams(mut self, enable: bool) -> Self {
        self.compress_streams = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocumentConfig::default();
        assert_eq!(config.max_nesting_depth, 100);
        assert_eq!(config.default_page_size, (595.0, 842.0));
        assert!(!config.compress_streams);
    }

    #[test]
    fn test_builder() {
        let config = DocumentConfig::new()
            .with_default_page_size(612.0, 792.0)
            .with_compress_streams(true);
        assert_eq!(config.default_page_size, (612.0, 792.0));
        assert!(config.compress_streams);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = DocumentConfig::new().with_max_nesting_depth(7);
        let json = serde_json::to_string(&config).unwrap();
        let back: DocumentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
