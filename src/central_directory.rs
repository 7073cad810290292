//! End-of-central-directory discovery, central directory traversal, cross-validation, and
//! lookup by index or name (§4.3).

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::UnzipperConfig;
use crate::error::{IoResultExt, Result, UnzipperError};
use crate::reader::{read_bytes, skip, LittleEndianRead};
use crate::record::{FileEntry, Record};

pub(crate) const EOCD_SIGNATURE: [u8; 4] = 0x06054B50u32.to_le_bytes();
const CD_SIGNATURE: [u8; 4] = 0x02014B50u32.to_le_bytes();
pub(crate) const LFH_SIGNATURE: [u8; 4] = 0x04034B50u32.to_le_bytes();

/// Crate-wide source of generation stamps, so that `CentralDirectory` instances loaded by
/// different `Unzipper`s never collide, not just instances loaded by the same one. A `Record`
/// carries the generation of the directory it came from; `stream_entry`'s ownership check (§9)
/// compares against this rather than any per-instance counter that could coincidentally repeat.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// The trailer record of a ZIP archive (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Eocd {
    pub(crate) disk_number: u16,
    pub(crate) cd_start_disk: u16,
    pub(crate) records_on_disk: u16,
    pub(crate) total_records: u16,
    pub(crate) cd_size: u32,
    pub(crate) cd_offset: u32,
    pub(crate) comment: Option<String>,
}

impl Eocd {
    pub fn disk_number(&self) -> u16 {
        self.disk_number
    }

    pub fn cd_start_disk(&self) -> u16 {
        self.cd_start_disk
    }

    pub fn records_on_disk(&self) -> u16 {
        self.records_on_disk
    }

    pub fn total_records(&self) -> u16 {
        self.total_records
    }

    pub fn cd_size(&self) -> u32 {
        self.cd_size
    }

    pub fn cd_offset(&self) -> u32 {
        self.cd_offset
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// An ordered central directory: the parsed EOCD, the parsed entries in on-disk order, the
/// archive's total size, and the byte positions that tie the two regions together (§3).
///
/// `PartialEq` compares everything except the load generation, so that repeated calls to
/// [`Unzipper::read_central_directory`](crate::Unzipper::read_central_directory) on the same
/// archive produce directories that compare equal (§8 Idempotence) even though each carries a
/// distinct generation for ownership checks (§9).
#[derive(Debug, Clone)]
pub struct CentralDirectory {
    eocd: Eocd,
    entries: Vec<FileEntry>,
    file_size: u64,
    eocd_position: u64,
    cd_end_position: u64,
    generation: u64,
}

impl PartialEq for CentralDirectory {
    fn eq(&self, other: &Self) -> bool {
        self.eocd == other.eocd
            && self.entries == other.entries
            && self.file_size == other.file_size
            && self.eocd_position == other.eocd_position
            && self.cd_end_position == other.cd_end_position
    }
}

impl CentralDirectory {
    pub(crate) fn load(
        file: &mut File,
        eocd_position: u64,
        file_size: u64,
        config: &UnzipperConfig,
        generation: u64,
    ) -> Result<Self> {
        let eocd = read_eocd(file, eocd_position)?;

        file.seek(SeekFrom::Start(eocd.cd_offset as u64)).cd_err()?;

        let mut entries = Vec::with_capacity(eocd.total_records as usize);
        let mut cd_end_position = eocd.cd_offset as u64;
        loop {
            let pos = file.stream_position().cd_err()?;
            if pos >= eocd_position {
                break;
            }
            let entry = read_cd_entry(file)?;
            cd_end_position = file.stream_position().cd_err()?;
            entries.push(entry);
        }

        let cd = CentralDirectory {
            eocd,
            entries,
            file_size,
            eocd_position,
            cd_end_position,
            generation,
        };
        cd.validate(config)?;
        Ok(cd)
    }

    fn validate(&self, config: &UnzipperConfig) -> Result<()> {
        if self.eocd.disk_number != 0 || self.eocd.cd_start_disk != 0 {
            tracing::warn!(
                disk_number = self.eocd.disk_number,
                cd_start_disk = self.eocd.cd_start_disk,
                "central directory spans multiple disks"
            );
            return Err(UnzipperError::MultipleDisksUnsupported);
        }
        if self.entries.is_empty() {
            tracing::warn!("central directory has no entries");
            return Err(UnzipperError::CannotReadCD(
                "central directory has no entries".to_string(),
            ));
        }
        if self.entries.len() as u16 != self.eocd.total_records {
            tracing::warn!(
                expected = self.eocd.total_records,
                actual = self.entries.len(),
                "central directory entry count does not match EOCD"
            );
            return Err(UnzipperError::CDEntryCountMismatch {
                expected: self.eocd.total_records,
                actual: self.entries.len() as u16,
            });
        }
        if self.cd_end_position != self.eocd_position {
            tracing::warn!(
                cd_end_position = self.cd_end_position,
                eocd_position = self.eocd_position,
                "central directory does not complete where the EOCD begins"
            );
            return Err(UnzipperError::CDDoesNotCompleteWithEOCD);
        }
        for entry in &self.entries {
            entry.validate(config)?;
        }
        Ok(())
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub fn record_count(&self) -> usize {
        self.entries.len()
    }

    pub fn record_at(&self, index: usize) -> Result<Record<'_>> {
        self.entries
            .get(index)
            .map(|entry| Record::new(entry, self.generation))
            .ok_or(UnzipperError::IndexOutOfBounds(index))
    }

    /// O(n) linear scan with exact, case-sensitive equality.
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name() == name)
    }

    pub fn enumerate_records(&self, mut f: impl FnMut(Record<'_>, usize, &mut bool)) {
        for (index, entry) in self.entries.iter().enumerate() {
            let mut stop = false;
            f(Record::new(entry, self.generation), index, &mut stop);
            if stop {
                break;
            }
        }
    }

    pub fn global_comment(&self) -> Option<&str> {
        self.eocd.comment.as_deref()
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn eocd(&self) -> &Eocd {
        &self.eocd
    }
}

fn read_eocd(file: &mut File, position: u64) -> Result<Eocd> {
    file.seek(SeekFrom::Start(position)).cd_err()?;

    let mut sig = [0u8; 4];
    file.read_exact_sig(&mut sig)?;
    if sig != EOCD_SIGNATURE {
        tracing::warn!(?sig, "end-of-central-directory signature mismatch");
        return Err(UnzipperError::CannotReadCD(
            "end-of-central-directory signature mismatch".to_string(),
        ));
    }

    let disk_number = file.read_u16_le().cd_err()?;
    let cd_start_disk = file.read_u16_le().cd_err()?;
    let records_on_disk = file.read_u16_le().cd_err()?;
    let total_records = file.read_u16_le().cd_err()?;
    let cd_size = file.read_u32_le().cd_err()?;
    let cd_offset = file.read_u32_le().cd_err()?;
    let comment_size = file.read_u16_le().cd_err()?;
    let comment = if comment_size > 0 {
        let bytes = read_bytes(file, comment_size as usize).cd_err()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        None
    };

    Ok(Eocd {
        disk_number,
        cd_start_disk,
        records_on_disk,
        total_records,
        cd_size,
        cd_offset,
        comment,
    })
}

fn read_cd_entry(file: &mut File) -> Result<FileEntry> {
    let mut sig = [0u8; 4];
    file.read_exact_sig(&mut sig)?;
    if sig != CD_SIGNATURE {
        tracing::warn!(?sig, "central directory entry signature mismatch");
        return Err(UnzipperError::CannotReadCD(
            "central directory entry signature mismatch".to_string(),
        ));
    }

    let version_made_by = file.read_u16_le().cd_err()?;
    let version_needed = file.read_u16_le().cd_err()?;
    let bit_flag = file.read_u16_le().cd_err()?;
    let compression_method = file.read_u16_le().cd_err()?;
    let dos_time = file.read_u16_le().cd_err()?;
    let dos_date = file.read_u16_le().cd_err()?;
    let crc32 = file.read_u32_le().cd_err()?;
    let compressed_size = file.read_u32_le().cd_err()?;
    let uncompressed_size = file.read_u32_le().cd_err()?;
    let name_size = file.read_u16_le().cd_err()?;
    let extra_field_size = file.read_u16_le().cd_err()?;
    let comment_size = file.read_u16_le().cd_err()?;
    let disk_start = file.read_u16_le().cd_err()?;
    let internal_attrs = file.read_u16_le().cd_err()?;
    let external_attrs = file.read_u32_le().cd_err()?;
    let local_header_offset = file.read_u32_le().cd_err()?;

    if name_size == 0 {
        tracing::warn!("central directory entry has an empty name");
        return Err(UnzipperError::CannotReadCD(
            "central directory entry has an empty name".to_string(),
        ));
    }

    let name_bytes = read_bytes(file, name_size as usize).cd_err()?;
    skip(file, extra_field_size as i64).cd_err()?;
    let comment_bytes = read_bytes(file, comment_size as usize).cd_err()?;

    let name = String::from_utf8_lossy(&name_bytes).into_owned();
    let comment = if comment_size > 0 {
        Some(String::from_utf8_lossy(&comment_bytes).into_owned())
    } else {
        None
    };

    Ok(FileEntry {
        version_made_by,
        version_needed,
        bit_flag,
        compression_method,
        dos_time,
        dos_date,
        crc32,
        compressed_size,
        uncompressed_size,
        name,
        name_size,
        extra_field_size,
        comment,
        disk_start,
        internal_attrs,
        external_attrs,
        local_header_offset,
    })
}

/// Small helper so signature reads surface `CannotReadCD` on a short read exactly like every
/// other field in this module, instead of the bare `Io` variant `read_exact` would otherwise
/// produce.
trait ReadSignature {
    fn read_exact_sig(&mut self, buf: &mut [u8; 4]) -> Result<()>;
}

impl ReadSignature for File {
    fn read_exact_sig(&mut self, buf: &mut [u8; 4]) -> Result<()> {
        use std::io::Read;
        self.read_exact(buf).cd_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eocd_disk_fields_default_to_zero_for_single_disk_archives() {
        let eocd = Eocd {
            disk_number: 0,
            cd_start_disk: 0,
            records_on_disk: 1,
            total_records: 1,
            cd_size: 0,
            cd_offset: 0,
            comment: None,
        };
        assert_eq!(eocd.disk_number(), 0);
        assert_eq!(eocd.cd_start_disk(), 0);
    }
}
