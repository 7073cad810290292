//! Error types for unzip-core.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, UnzipperError>;

/// The closed set of failures the core can report.
///
/// Structural failures (bad signatures, misaligned counts, unsupported records) carry a
/// descriptive message; genuine OS-level failures that don't fit one of those categories surface
/// through [`UnzipperError::Io`].
#[derive(Error, Debug)]
pub enum UnzipperError {
    /// The archive file does not exist, or could not be opened for reading.
    #[error("cannot open zip archive: {0}")]
    CannotOpenZip(#[source] std::io::Error),

    /// No end-of-central-directory record was found within the scan window.
    #[error("file is not a valid zip archive (end-of-central-directory record not found)")]
    InvalidArchive,

    /// `read_central_directory`/`record_at`/`stream_entry` etc. called before a successful `open`.
    #[error("operation requires an open archive; call open() first")]
    MustOpenFirst,

    /// A short read or a bad signature was encountered while parsing the EOCD or central
    /// directory.
    #[error("cannot read central directory: {0}")]
    CannotReadCD(String),

    /// `disk_number` or `cd_start_disk` is non-zero; spanned archives are not supported.
    #[error("zip archive spans multiple disks, which is not supported")]
    MultipleDisksUnsupported,

    /// The number of parsed central directory entries does not match the EOCD's declared count.
    #[error("central directory entry count mismatch: expected {expected}, found {actual}")]
    CDEntryCountMismatch { expected: u16, actual: u16 },

    /// The byte position after the last parsed central directory entry does not equal the EOCD
    /// position (gap or overlap).
    #[error("central directory does not end where the end-of-central-directory record begins")]
    CDDoesNotCompleteWithEOCD,

    /// `version_needed`'s low byte exceeds the supported maximum.
    #[error("entry requires zip version {0} which is not supported")]
    UnsupportedRecordVersion(u8),

    /// `bit_flag & 1 != 0`; encrypted entries are recognized but not implemented.
    #[error("encrypted entries are not supported")]
    EncryptionNotSupported,

    /// `compression_method != 8`; only DEFLATE is implemented.
    #[error("compression method {0} is not supported (only DEFLATE is implemented)")]
    CompressionMethodNotSupported(u16),

    /// `record_at` was called with an index past the end of the directory.
    #[error("record index {0} is out of bounds")]
    IndexOutOfBounds(usize),

    /// The local file header signature didn't match, its name length disagreed with the central
    /// directory, or the record does not belong to the currently loaded central directory.
    #[error("cannot read entry: {0}")]
    CannotReadEntry(String),

    /// The inflate pump reported an error, the CRC-32 didn't match, or streaming was cancelled
    /// before reaching the end of the DEFLATE stream.
    #[error("cannot decompress entry: {0}")]
    CannotDecompress(String),

    /// An I/O failure that doesn't fit one of the categories above.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Maps a raw `io::Result` onto the error variant matching the phase of work it failed during,
/// so callers can write `reader.read_exact(&mut buf).cd_err()?` instead of a `match` at every
/// call site.
pub(crate) trait IoResultExt<T> {
    fn cd_err(self) -> Result<T>;
    fn entry_err(self) -> Result<T>;
    fn decompress_err(self) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn cd_err(self) -> Result<T> {
        self.map_err(|e| UnzipperError::CannotReadCD(e.to_string()))
    }

    fn entry_err(self) -> Result<T> {
        self.map_err(|e| UnzipperError::CannotReadEntry(e.to_string()))
    }

    fn decompress_err(self) -> Result<T> {
        self.map_err(|e| UnzipperError::CannotDecompress(e.to_string()))
    }
}
