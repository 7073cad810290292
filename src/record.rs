//! In-memory representation of a central directory entry, its read-only accessors, and the
//! per-record validation rules of §4.2.

use crate::config::UnzipperConfig;
use crate::error::{Result, UnzipperError};

/// The compression method code for DEFLATE, the only method this crate can decompress.
pub const DEFLATE: u16 = 8;
/// The compression method code for STORED (no compression), recognized but not decompressed.
pub const STORED: u16 = 0;

/// The compression-level hint carried in bits 1-2 of a record's `bit_flag`.
///
/// This is advisory metadata about how the archiver compressed the entry; it has no bearing on
/// how the entry is decompressed (that's always governed by `compression_method`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    SuperFast,
    Fast,
    Max,
    Default,
}

/// One entry of a central directory, as parsed from its on-disk fields (§6). Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub(crate) version_made_by: u16,
    pub(crate) version_needed: u16,
    pub(crate) bit_flag: u16,
    pub(crate) compression_method: u16,
    pub(crate) dos_time: u16,
    pub(crate) dos_date: u16,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u32,
    pub(crate) uncompressed_size: u32,
    pub(crate) name: String,
    pub(crate) name_size: u16,
    pub(crate) extra_field_size: u16,
    pub(crate) comment: Option<String>,
    pub(crate) disk_start: u16,
    pub(crate) internal_attrs: u16,
    pub(crate) external_attrs: u32,
    pub(crate) local_header_offset: u32,
}

impl FileEntry {
    pub fn version_made_by(&self) -> u16 {
        self.version_made_by
    }

    pub fn version_needed(&self) -> u16 {
        self.version_needed
    }

    pub fn bit_flag(&self) -> u16 {
        self.bit_flag
    }

    pub fn compression_method(&self) -> u16 {
        self.compression_method
    }

    pub fn dos_time(&self) -> u16 {
        self.dos_time
    }

    pub fn dos_date(&self) -> u16 {
        self.dos_date
    }

    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    pub fn compressed_size(&self) -> u32 {
        self.compressed_size
    }

    pub fn uncompressed_size(&self) -> u32 {
        self.uncompressed_size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_size(&self) -> u16 {
        self.name_size
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn disk_start(&self) -> u16 {
        self.disk_start
    }

    pub fn internal_attrs(&self) -> u16 {
        self.internal_attrs
    }

    pub fn external_attrs(&self) -> u32 {
        self.external_attrs
    }

    pub fn local_header_offset(&self) -> u32 {
        self.local_header_offset
    }

    /// Derives the compression-level hint from bits 1-2 of `bit_flag`, checked in the order
    /// super-fast, fast, max; any other pattern (including the all-zero default) yields
    /// `Default`.
    pub fn compression_level(&self) -> CompressionLevel {
        let bits = (self.bit_flag >> 1) & 0b11;
        if bits == 0b11 {
            CompressionLevel::SuperFast
        } else if bits == 0b10 {
            CompressionLevel::Fast
        } else if bits == 0b01 {
            CompressionLevel::Max
        } else {
            CompressionLevel::Default
        }
    }

    pub fn is_zero_length(&self) -> bool {
        self.compressed_size == 0
    }

    /// True for macOS archiver metadata: anything under a `__MACOSX` path component, or any
    /// `.DS_Store` file, regardless of its directory. These are validation-exempt (§4.2) since
    /// they're a byproduct of how macOS's Archive Utility writes zips, not user data.
    pub fn is_macosx_metadata(&self) -> bool {
        let mut components = self.name.split('/').filter(|c| !c.is_empty());
        let mut last = "";
        let mut saw_macosx = false;
        for component in components.by_ref() {
            if component == "__MACOSX" {
                saw_macosx = true;
            }
            last = component;
        }
        saw_macosx || last == ".DS_Store"
    }

    /// Validates this record against §4.2: zero-length entries and macOS metadata are exempt
    /// from everything else; otherwise the supported version ceiling, absence of encryption, and
    /// DEFLATE-only compression are all enforced, in that order.
    pub(crate) fn validate(&self, config: &UnzipperConfig) -> Result<()> {
        if self.is_zero_length() || self.is_macosx_metadata() {
            return Ok(());
        }

        let version_low_byte = (self.version_needed & 0x00FF) as u8;
        if version_low_byte > config.supported_version_max {
            tracing::warn!(
                name = %self.name,
                version_needed = version_low_byte,
                supported_max = config.supported_version_max,
                "entry requires an unsupported zip version"
            );
            return Err(UnzipperError::UnsupportedRecordVersion(version_low_byte));
        }

        if self.bit_flag & 1 != 0 {
            tracing::warn!(name = %self.name, "entry is encrypted, which is not supported");
            return Err(UnzipperError::EncryptionNotSupported);
        }

        if self.compression_method != DEFLATE {
            tracing::warn!(
                name = %self.name,
                compression_method = self.compression_method,
                "entry uses an unsupported compression method"
            );
            return Err(UnzipperError::CompressionMethodNotSupported(
                self.compression_method,
            ));
        }

        Ok(())
    }
}

/// A read-only, borrowed view of a [`FileEntry`] stamped with the generation of the
/// [`CentralDirectory`](crate::CentralDirectory) it came from.
///
/// The stamp lets [`Unzipper::stream_entry`](crate::Unzipper::stream_entry) perform the identity
/// check required by §4.4's precondition: a record is only accepted if it was produced by the
/// currently-loaded directory, not merely one that looks the same.
#[derive(Debug, Clone, Copy)]
pub struct Record<'cd> {
    entry: &'cd FileEntry,
    generation: u64,
}

impl<'cd> Record<'cd> {
    pub(crate) fn new(entry: &'cd FileEntry, generation: u64) -> Self {
        Self { entry, generation }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn entry(&self) -> &'cd FileEntry {
        self.entry
    }

    pub fn name(&self) -> &str {
        self.entry.name()
    }

    pub fn comment(&self) -> Option<&str> {
        self.entry.comment()
    }

    pub fn compression_level(&self) -> CompressionLevel {
        self.entry.compression_level()
    }

    pub fn compression_method(&self) -> u16 {
        self.entry.compression_method()
    }

    pub fn compressed_size(&self) -> u32 {
        self.entry.compressed_size()
    }

    pub fn uncompressed_size(&self) -> u32 {
        self.entry.uncompressed_size()
    }

    pub fn crc32(&self) -> u32 {
        self.entry.crc32()
    }

    pub fn is_zero_length(&self) -> bool {
        self.entry.is_zero_length()
    }

    pub fn is_macosx_metadata(&self) -> bool {
        self.entry.is_macosx_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(bit_flag: u16) -> FileEntry {
        FileEntry {
            version_made_by: 20,
            version_needed: 20,
            bit_flag,
            compression_method: DEFLATE,
            dos_time: 0,
            dos_date: 0,
            crc32: 0,
            compressed_size: 10,
            uncompressed_size: 20,
            name: "a/b.bin".to_string(),
            name_size: 7,
            extra_field_size: 0,
            comment: None,
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: 0,
            local_header_offset: 0,
        }
    }

    #[test]
    fn compression_level_checks_bits_in_order() {
        assert_eq!(entry(0b000).compression_level(), CompressionLevel::Default);
        assert_eq!(entry(0b010).compression_level(), CompressionLevel::Max);
        assert_eq!(entry(0b100).compression_level(), CompressionLevel::Fast);
        assert_eq!(
            entry(0b110).compression_level(),
            CompressionLevel::SuperFast
        );
    }

    #[test]
    fn macosx_metadata_detects_directory_component_and_ds_store() {
        let mut e = entry(0);
        e.name = "__MACOSX/a/b.bin".to_string();
        assert!(e.is_macosx_metadata());

        let mut e = entry(0);
        e.name = "some/dir/.DS_Store".to_string();
        assert!(e.is_macosx_metadata());

        let e = entry(0);
        assert!(!e.is_macosx_metadata());
    }

    #[test]
    fn validate_rejects_encryption_and_unsupported_method() {
        let config = UnzipperConfig::default();

        let encrypted = entry(1);
        assert!(matches!(
            encrypted.validate(&config),
            Err(UnzipperError::EncryptionNotSupported)
        ));

        let mut stored = entry(0);
        stored.compression_method = STORED;
        assert!(matches!(
            stored.validate(&config),
            Err(UnzipperError::CompressionMethodNotSupported(0))
        ));
    }

    #[test]
    fn validate_exempts_zero_length_and_macosx_entries() {
        let config = UnzipperConfig::default();

        let mut zero_length = entry(1);
        zero_length.compressed_size = 0;
        assert!(zero_length.validate(&config).is_ok());

        let mut macosx = entry(1);
        macosx.name = "__MACOSX/a".to_string();
        assert!(macosx.validate(&config).is_ok());
    }

    #[test]
    fn validate_rejects_unsupported_version() {
        let config = UnzipperConfig::default();
        let mut e = entry(0);
        e.version_needed = 45;
        assert!(matches!(
            e.validate(&config),
            Err(UnzipperError::UnsupportedRecordVersion(45))
        ));
    }
}
