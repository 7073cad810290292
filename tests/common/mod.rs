//! Hand-assembled ZIP fixtures for exercising `unzip_core` against genuine file I/O.
//!
//! Mirrors the byte layouts of §6: a local file header, payload, central directory entry, and
//! EOCD, written directly rather than produced by any zip-writing library (there is none in this
//! crate's dependency graph).

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

pub struct EntrySpec {
    pub name: &'static str,
    pub data: Vec<u8>,
    pub bit_flag: u16,
    pub compression_method: u16,
}

impl EntrySpec {
    pub fn deflate(name: &'static str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            data: data.into(),
            bit_flag: 0,
            compression_method: unzip_core::DEFLATE,
        }
    }

    pub fn encrypted(name: &'static str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            data: data.into(),
            bit_flag: 1,
            compression_method: unzip_core::DEFLATE,
        }
    }

    pub fn stored(name: &'static str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            data: data.into(),
            bit_flag: 0,
            compression_method: unzip_core::STORED,
        }
    }
}

fn deflate_raw(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory write cannot fail");
    encoder.finish().expect("in-memory finish cannot fail")
}

/// Builds a complete single-disk archive from `entries` with the given global comment.
pub fn build_zip(entries: &[EntrySpec], comment: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut local_offsets = Vec::with_capacity(entries.len());
    let mut compressed_payloads = Vec::with_capacity(entries.len());
    let mut crcs = Vec::with_capacity(entries.len());

    for entry in entries {
        let crc = crc32fast::hash(&entry.data);
        let compressed = if entry.compression_method == unzip_core::DEFLATE {
            deflate_raw(&entry.data)
        } else {
            entry.data.clone()
        };

        local_offsets.push(buf.len() as u32);

        buf.extend_from_slice(&0x04034B50u32.to_le_bytes());
        buf.extend_from_slice(&20u16.to_le_bytes());
        buf.extend_from_slice(&entry.bit_flag.to_le_bytes());
        buf.extend_from_slice(&entry.compression_method.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(entry.name.as_bytes());
        buf.extend_from_slice(&compressed);

        compressed_payloads.push(compressed);
        crcs.push(crc);
    }

    let cd_offset = buf.len() as u32;

    for (i, entry) in entries.iter().enumerate() {
        buf.extend_from_slice(&0x02014B50u32.to_le_bytes());
        buf.extend_from_slice(&20u16.to_le_bytes());
        buf.extend_from_slice(&20u16.to_le_bytes());
        buf.extend_from_slice(&entry.bit_flag.to_le_bytes());
        buf.extend_from_slice(&entry.compression_method.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&crcs[i].to_le_bytes());
        buf.extend_from_slice(&(compressed_payloads[i].len() as u32).to_le_bytes());
        buf.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&local_offsets[i].to_le_bytes());
        buf.extend_from_slice(entry.name.as_bytes());
    }

    let cd_size = buf.len() as u32 - cd_offset;

    buf.extend_from_slice(&0x06054B50u32.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    buf.extend_from_slice(&cd_size.to_le_bytes());
    buf.extend_from_slice(&cd_offset.to_le_bytes());
    buf.extend_from_slice(&(comment.len() as u16).to_le_bytes());
    buf.extend_from_slice(comment.as_bytes());

    buf
}

/// Builds an archive whose EOCD claims `claimed_total_records` entries while the central
/// directory region physically holds only `entries.len()`, simulating truncation.
pub fn build_zip_with_count_mismatch(entries: &[EntrySpec], claimed_total_records: u16) -> Vec<u8> {
    let mut buf = build_zip(entries, "");
    // Overwrite `total_records` (two occurrences) in the trailing EOCD record.
    let eocd_pos = buf.len() - 22;
    let claimed = claimed_total_records.to_le_bytes();
    buf[eocd_pos + 8..eocd_pos + 10].copy_from_slice(&claimed);
    buf[eocd_pos + 10..eocd_pos + 12].copy_from_slice(&claimed);
    buf
}
