//! Core of a single-disk ZIP archive reader.
//!
//! [`Unzipper`] is the only type external collaborators construct directly. It sequences the
//! four components of the core in the documented control flow: *open* locates the
//! end-of-central-directory record; `read_central_directory` loads and cross-validates the
//! central directory; `record_at`/`index_for_name`/`enumerate_records` expose its entries;
//! `stream_entry` streams the raw bytes of a selected entry through a caller-supplied sink with
//! progress reporting and cooperative cancellation.
//!
//! Writing archives, multi-disk (spanned) archives, encrypted entries, and compression methods
//! other than DEFLATE are recognized and rejected, not implemented (§1 Out of scope / Non-goals).

mod central_directory;
mod config;
mod error;
mod reader;
mod record;
mod stream;

pub use central_directory::{CentralDirectory, Eocd};
pub use config::UnzipperConfig;
pub use error::{Result, UnzipperError};
pub use record::{CompressionLevel, FileEntry, Record, DEFLATE, STORED};
pub use stream::{Progress, ProgressCallback, SinkCallback};

use std::fs::File;
use std::io::Seek;
use std::path::Path;

/// A synchronous, single-threaded ZIP archive reader.
///
/// Owns at most one open file handle and one loaded [`CentralDirectory`] at a time; concurrent
/// `stream_entry` calls on the same instance are a programming error, not a supported usage
/// (§5).
pub struct Unzipper {
    file: Option<File>,
    eocd_position: Option<u64>,
    file_size: u64,
    cd: Option<CentralDirectory>,
    config: UnzipperConfig,
}

impl Unzipper {
    /// Creates an unzipper with the default [`UnzipperConfig`].
    pub fn new() -> Self {
        Self::with_config(UnzipperConfig::default())
    }

    /// Creates an unzipper with an explicit configuration, e.g. to tune buffer sizes.
    pub fn with_config(config: UnzipperConfig) -> Self {
        Self {
            file: None,
            eocd_position: None,
            file_size: 0,
            cd: None,
            config,
        }
    }

    /// Opens `path` and locates its end-of-central-directory record.
    ///
    /// Does not load the central directory itself; call [`Unzipper::read_central_directory`]
    /// next. Replaces any previously open file and discards any previously loaded directory.
    #[tracing::instrument(skip(self, path))]
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::open(path.as_ref()).map_err(UnzipperError::CannotOpenZip)?;

        let eocd_position = reader::scan_backward_for_signature(
            &mut file,
            central_directory::EOCD_SIGNATURE,
            self.config.scan_chunk_size,
        )
        .map_err(UnzipperError::Io)?
        .ok_or(UnzipperError::InvalidArchive)?;

        let file_size = file
            .seek(std::io::SeekFrom::End(0))
            .map_err(UnzipperError::Io)?;

        tracing::debug!(eocd_position, file_size, "located end-of-central-directory record");

        self.file = Some(file);
        self.eocd_position = Some(eocd_position);
        self.file_size = file_size;
        self.cd = None;
        Ok(())
    }

    /// Loads and cross-validates the central directory, replacing any previously loaded one.
    ///
    /// Calling this repeatedly on the same open archive yields directories that compare equal
    /// field-wise (§8 Idempotence), though each carries a distinct internal generation used by
    /// [`Unzipper::stream_entry`]'s ownership check.
    #[tracing::instrument(skip(self))]
    pub fn read_central_directory(&mut self) -> Result<CentralDirectory> {
        let eocd_position = self.eocd_position.ok_or(UnzipperError::MustOpenFirst)?;
        let file = self.file.as_mut().ok_or(UnzipperError::MustOpenFirst)?;

        let cd = CentralDirectory::load(
            file,
            eocd_position,
            self.file_size,
            &self.config,
            central_directory::next_generation(),
        )?;

        tracing::debug!(records = cd.record_count(), "loaded central directory");
        self.cd = Some(cd.clone());
        Ok(cd)
    }

    /// Number of entries in the loaded central directory.
    pub fn record_count(&self) -> Result<usize> {
        Ok(self.cd()?.record_count())
    }

    /// The record at `index`, in on-disk order.
    pub fn record_at(&self, index: usize) -> Result<Record<'_>> {
        self.cd()?.record_at(index)
    }

    /// O(n) linear scan for an exact, case-sensitive name match.
    pub fn index_for_name(&self, name: &str) -> Result<Option<usize>> {
        Ok(self.cd()?.index_for_name(name))
    }

    /// Invokes `f(record, index, &mut stop)` for each record in order; set `stop` to `true` from
    /// within the closure to end enumeration early.
    pub fn enumerate_records(&self, f: impl FnMut(Record<'_>, usize, &mut bool)) -> Result<()> {
        self.cd()?.enumerate_records(f);
        Ok(())
    }

    /// Streams the raw uncompressed bytes of `record` to `sink_cb`, reporting progress to the
    /// optional `progress_cb`, per the algorithm in §4.4.
    ///
    /// `record` must have been produced by the currently-loaded central directory; a record from
    /// a stale or different directory fails with [`UnzipperError::CannotReadEntry`] before any
    /// I/O is performed.
    #[tracing::instrument(skip(self, record, progress_cb, sink_cb), fields(entry = record.name()))]
    pub fn stream_entry(
        &mut self,
        record: &Record<'_>,
        progress_cb: Option<&mut ProgressCallback<'_>>,
        sink_cb: &mut SinkCallback<'_>,
    ) -> Result<()> {
        let cd = self.cd.as_ref().ok_or(UnzipperError::MustOpenFirst)?;
        if record.generation() != cd.generation() {
            return Err(UnzipperError::CannotReadEntry(
                "record does not belong to the currently loaded central directory".to_string(),
            ));
        }

        let file = self.file.as_mut().ok_or(UnzipperError::MustOpenFirst)?;

        tracing::trace!("starting entry stream");
        let result = stream::stream_entry(file, record, &self.config, progress_cb, sink_cb);
        match &result {
            Ok(()) => tracing::debug!("entry stream completed"),
            Err(err) => tracing::warn!(%err, "entry stream failed"),
        }
        result
    }

    /// Closes the open file and discards the loaded central directory. A no-op if nothing is
    /// open.
    pub fn close(&mut self) {
        self.file = None;
        self.eocd_position = None;
        self.file_size = 0;
        self.cd = None;
    }

    fn cd(&self) -> Result<&CentralDirectory> {
        self.cd.as_ref().ok_or(UnzipperError::MustOpenFirst)
    }
}

impl Default for Unzipper {
    fn default() -> Self {
        Self::new()
    }
}
