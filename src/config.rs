//! Tunable constants the core algorithms depend on.
//!
//! None of these change behavior, only memory/throughput trade-offs: the size of the chunk used
//! to scan backward for the end-of-central-directory signature, the size of the two buffers the
//! inflate pump allocates, and the `version_needed` ceiling a record must stay under to be
//! considered supported.

/// Configuration for an [`Unzipper`](crate::Unzipper).
///
/// `Unzipper::new` uses [`UnzipperConfig::default`]; embedders that need to tune memory usage
/// (e.g. many concurrent archives open on a memory-constrained host) can construct their own via
/// `Unzipper::with_config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnzipperConfig {
    /// Size, in bytes, of each chunk read while scanning backward for a signature.
    pub scan_chunk_size: usize,
    /// Size, in bytes, of the compressed-input and uncompressed-output buffers the inflate pump
    /// allocates. Both buffers use the same size.
    pub pump_buffer_size: usize,
    /// The maximum supported low byte of `version_needed`; records above this are rejected with
    /// [`UnzipperError::UnsupportedRecordVersion`](crate::UnzipperError::UnsupportedRecordVersion).
    pub supported_version_max: u8,
}

impl Default for UnzipperConfig {
    fn default() -> Self {
        Self {
            scan_chunk_size: 4 * 1024,
            pump_buffer_size: 32 * 1024,
            supported_version_max: 20,
        }
    }
}
