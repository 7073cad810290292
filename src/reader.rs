//! Little-endian primitive reads over a random-access file, and the reverse signature scan used
//! to locate the end-of-central-directory record.

use std::io::{self, Read, Seek, SeekFrom};

/// Little-endian primitive reads, usable over any [`Read`] impl (a [`std::fs::File`] in
/// production, a `Cursor<&[u8]>` in tests).
pub(crate) trait LittleEndianRead: Read {
    fn read_u16_le(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

impl<R: Read + ?Sized> LittleEndianRead for R {}

pub(crate) fn read_bytes<R: Read + ?Sized>(r: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub(crate) fn skip<S: Seek + ?Sized>(s: &mut S, len: i64) -> io::Result<u64> {
    s.seek(SeekFrom::Current(len))
}

/// Maximum comment size plus the fixed EOCD size: the bound on how far back a signature scan for
/// the EOCD record needs to search.
const EOCD_TAIL_MAX: u64 = 22 + u16::MAX as u64;

/// Scans a bounded suffix of `file` backward for `signature`, in `chunk_size`-byte pages with a
/// 3-byte overlap between pages so a signature straddling a page boundary is still found.
///
/// Returns the absolute position of the first (rightmost) match, or `None` if no match is found
/// within the scan window. Runs in O(scan window) time and holds at most one `chunk_size` buffer
/// in memory.
pub(crate) fn scan_backward_for_signature<F: Read + Seek>(
    file: &mut F,
    signature: [u8; 4],
    chunk_size: usize,
) -> io::Result<Option<u64>> {
    if chunk_size < 4 {
        return Ok(None);
    }

    let file_size = file.seek(SeekFrom::End(0))?;
    let max_scan = file_size.min(EOCD_TAIL_MAX);

    let mut bytes_read: u64 = 0;
    let mut buf = vec![0u8; chunk_size];

    while bytes_read < max_scan {
        let remaining = max_scan - bytes_read;
        let this_chunk = (chunk_size as u64).min(remaining) as usize;
        if this_chunk < 4 {
            break;
        }

        let pos = file_size - bytes_read - this_chunk as u64;
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(&mut buf[..this_chunk])?;

        if let Some(idx) = find_signature_rev(&buf[..this_chunk], signature) {
            return Ok(Some(pos + idx as u64));
        }

        bytes_read += this_chunk as u64 - 3;
    }

    Ok(None)
}

/// Scans `buf` from the highest index to the lowest for `signature`, returning the offset of the
/// rightmost match.
fn find_signature_rev(buf: &[u8], signature: [u8; 4]) -> Option<usize> {
    if buf.len() < 4 {
        return None;
    }
    (0..=buf.len() - 4).rev().find(|&i| buf[i..i + 4] == signature)
}
