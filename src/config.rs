//! Decode options shared by the file-backed constructors.
//!
//! ```
//! use beadchip::DecodeOptions;
//!
//! let options = DecodeOptions::new()
//!     .with_mmap_threshold(8 * 1024 * 1024)
//!     .with_cluster_count_check(false);
//! assert!(!options.verify_cluster_counts());
//! ```

/// Memory-mapped file threshold (50 MB)
///
/// Local files at or above this size are memory-mapped; smaller files go
/// through a buffered reader where mapping overhead dominates.
pub const MMAP_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Options controlling how BPM, EGT and CSV manifest files are opened and
/// validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    mmap_threshold: u64,
    verify_cluster_counts: bool,
}

impl DecodeOptions {
    /// Default options: 50 MB mmap threshold, cluster count check enabled.
    pub fn new() -> Self {
        Self {
            mmap_threshold: MMAP_THRESHOLD,
            verify_cluster_counts: true,
        }
    }

    /// Set the file size at which local files are memory-mapped.
    pub fn with_mmap_threshold(mut self, bytes: u64) -> Self {
        self.mmap_threshold = bytes;
        self
    }

    /// Enable or disable cross-checking the redundant AA/AB/BB counts at the
    /// end of a cluster file against the per-record sample counts.
    pub fn with_cluster_count_check(mut self, enabled: bool) -> Self {
        self.verify_cluster_counts = enabled;
        self
    }

    /// File size at which local files are memory-mapped.
    pub fn mmap_threshold(&self) -> u64 {
        self.mmap_threshold
    }

    /// Whether redundant cluster counts are verified.
    pub fn verify_cluster_counts(&self) -> bool {
        self.verify_cluster_counts
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DecodeOptions::default();
        assert_eq!(options.mmap_threshold(), MMAP_THRESHOLD);
        assert!(options.verify_cluster_counts());
    }

    #[test]
    fn test_builder() {
        let options = DecodeOptions::new()
            .with_mmap_threshold(0)
            .with_cluster_count_check(false);
        assert_eq!(options.mmap_threshold(), 0);
        assert!(!options.verify_cluster_counts());
    }
}
