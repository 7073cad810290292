//! The streaming DEFLATE pump: per-record local-header confirmation, bounded inflate loop, CRC
//! verification, and progress/cancellation plumbing (§4.4).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use flate2::{Decompress, FlushDecompress, Status};

use crate::central_directory::LFH_SIGNATURE;
use crate::config::UnzipperConfig;
use crate::error::{IoResultExt, Result, UnzipperError};
use crate::reader::{skip, LittleEndianRead};
use crate::record::{FileEntry, Record};

/// Reported to an optional progress callback after each chunk the sink receives.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// `uncompressed_size` of the entry being streamed.
    pub total: u64,
    /// Total bytes delivered to the sink so far, including this chunk.
    pub consumed: u64,
    /// Bytes delivered to the sink in this chunk.
    pub delta: u64,
}

/// A sink callback: receives a chunk of uncompressed bytes and the half-open range `[start, end)`
/// it occupies in the entry's uncompressed byte stream. Returns `true` to request cancellation.
pub type SinkCallback<'a> = dyn FnMut(&[u8], Range<u64>) -> bool + 'a;
/// A progress callback: receives a [`Progress`] snapshot. Returns `true` to request
/// cancellation.
pub type ProgressCallback<'a> = dyn FnMut(Progress) -> bool + 'a;

pub(crate) fn stream_entry(
    file: &mut File,
    record: &Record<'_>,
    config: &UnzipperConfig,
    mut progress_cb: Option<&mut ProgressCallback<'_>>,
    sink_cb: &mut SinkCallback<'_>,
) -> Result<()> {
    let entry = record.entry();

    locate_compressed_data(file, entry)?;

    if entry.compressed_size() == 0 {
        return Ok(());
    }

    let mut decoder = Decompress::new(false);
    let mut in_buf = vec![0u8; config.pump_buffer_size];
    let mut out_buf = vec![0u8; config.pump_buffer_size];

    let mut compressed_left = entry.compressed_size() as u64;
    let mut consumed_out: u64 = 0;
    let mut crc = crc32fast::Hasher::new();
    let mut stopped = false;
    let mut last_status = Status::Ok;

    while !stopped {
        let in_size = (in_buf.len() as u64).min(compressed_left) as usize;
        file.read_exact(&mut in_buf[..in_size]).decompress_err()?;
        compressed_left -= in_size as u64;

        let mut in_pos = 0usize;
        loop {
            let before_out = decoder.total_out();
            let before_in = decoder.total_in();
            let status = decoder
                .decompress(&in_buf[in_pos..in_size], &mut out_buf, FlushDecompress::None)
                .map_err(|e| UnzipperError::CannotDecompress(e.to_string()))?;
            last_status = status;

            let produced = (decoder.total_out() - before_out) as usize;
            in_pos += (decoder.total_in() - before_in) as usize;

            if produced > 0 {
                crc.update(&out_buf[..produced]);

                let range = consumed_out..consumed_out + produced as u64;
                tracing::trace!(
                    range_start = range.start,
                    range_end = range.end,
                    produced,
                    "pump produced a chunk"
                );
                let sink_stop = sink_cb(&out_buf[..produced], range);
                consumed_out += produced as u64;

                let progress_stop = match progress_cb.as_deref_mut() {
                    Some(cb) => cb(Progress {
                        total: entry.uncompressed_size() as u64,
                        consumed: consumed_out,
                        delta: produced as u64,
                    }),
                    None => false,
                };

                if sink_stop || progress_stop {
                    stopped = true;
                }
            }

            if status != Status::Ok {
                stopped = true;
            }

            let output_was_full = produced == out_buf.len();
            if stopped || !output_was_full {
                break;
            }
        }

        if stopped || compressed_left == 0 {
            break;
        }
    }

    if last_status != Status::StreamEnd || crc.finalize() != entry.crc32() {
        return Err(UnzipperError::CannotDecompress(
            "inflate did not reach stream end, or the CRC-32 did not match".to_string(),
        ));
    }

    Ok(())
}

/// Seeks to the record's local file header, confirms its signature and name length against the
/// central directory entry, and leaves the cursor at the first byte of compressed payload.
///
/// The rest of the local header's fixed portion (version, flags, method, dos time/date, crc32,
/// sizes) is deliberately not re-verified: the central directory is the source of truth, and a
/// mismatch there would only surface later as a CRC failure.
fn locate_compressed_data(file: &mut File, entry: &FileEntry) -> Result<()> {
    file.seek(SeekFrom::Start(entry.local_header_offset() as u64))
        .entry_err()?;

    let mut sig = [0u8; 4];
    file.read_exact(&mut sig).entry_err()?;
    if sig != LFH_SIGNATURE {
        tracing::warn!(?sig, name = entry.name(), "local file header signature mismatch");
        return Err(UnzipperError::CannotReadEntry(
            "local file header signature mismatch".to_string(),
        ));
    }

    // version_needed, bit_flag, method, dos_time, dos_date, crc32, compressed_size,
    // uncompressed_size: 2+2+2+2+2+4+4+4 = 22 bytes, redundant with the central directory entry.
    skip(file, 22).entry_err()?;

    let name_size = file.read_u16_le().entry_err()?;
    let extra_field_size = file.read_u16_le().entry_err()?;

    if name_size != entry.name_size() {
        tracing::warn!(
            name = entry.name(),
            local_header_name_size = name_size,
            cd_name_size = entry.name_size(),
            "local file header name length disagrees with the central directory"
        );
        return Err(UnzipperError::CannotReadEntry(
            "local file header name length disagrees with the central directory".to_string(),
        ));
    }

    skip(file, extra_field_size as i64 + name_size as i64).entry_err()?;

    Ok(())
}
