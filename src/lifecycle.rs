//! Lifecycle controller
//!
//! Owns the declared [`ResourceDescriptor`], the dirty flag that makes repeated
//! renders idempotent, and the transient resources of a remote load: the
//! download file and the in-flight transfer handle. Every mutation of that state
//! goes through the methods here.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::descriptor::{ResourceDescriptor, UrlProps};
use crate::error::{LoadError, Result};
use crate::fetch::{FetchHandle, FetchId};

const TRANSIENT_PREFIX: &str = "pdfDocument";
const TRANSIENT_SUFFIX: &str = ".pdf";

/// Exclusively owned temporary file staging a remote download
///
/// Dropping it removes the file silently; [`TransientFile::delete`] reports
/// failures instead.
#[derive(Debug)]
pub struct TransientFile {
    path: TempPath,
}

impl TransientFile {
    /// Create a uniquely named empty file inside `dir`
    pub fn create_in(dir: &Path) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(TRANSIENT_PREFIX)
            .suffix(TRANSIENT_SUFFIX)
            .tempfile_in(dir)?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    /// Remove the file from disk
    ///
    /// A file that is already gone counts as deleted. Another failure is
    /// retried once, since an aborted transfer may still hold the file.
    pub fn delete(self) -> io::Result<()> {
        let path = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(first) => match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(_) => Err(first),
            },
        }
    }
}

/// Descriptor state plus ownership of transient load resources
#[derive(Debug)]
pub struct Lifecycle {
    descriptor: ResourceDescriptor,
    source_changed: bool,
    /// Bumped on every change that sets the dirty flag
    revision: u64,
    transient: Option<TransientFile>,
    in_flight: Option<FetchHandle>,
    /// Revision the in-flight transfer was started for
    fetch_revision: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            descriptor: ResourceDescriptor::default(),
            source_changed: true,
            revision: 0,
            transient: None,
            in_flight: None,
            fetch_revision: 0,
        }
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Whether the descriptor changed since the last dispatched load
    pub fn is_dirty(&self) -> bool {
        self.source_changed
    }

    /// Current descriptor revision
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn invalidate(&mut self) {
        self.source_changed = true;
        self.revision += 1;
    }

    pub fn set_source(&mut self, source: Option<String>) {
        if source != self.descriptor.source {
            self.invalidate();
        }
        self.descriptor.source = source;
    }

    pub fn set_resource_type(&mut self, resource_type: Option<String>) {
        if resource_type != self.descriptor.resource_type {
            self.invalidate();
        }
        self.descriptor.resource_type = resource_type;
    }

    /// Transport properties do not affect the dirty flag
    pub fn set_url_props(&mut self, props: Option<UrlProps>) {
        self.descriptor.url_props = props;
    }

    /// Record that a load was dispatched for descriptor `revision`
    ///
    /// Ignored when the descriptor changed since, so the newer one still loads.
    pub(crate) fn mark_dispatched(&mut self, revision: u64) {
        if revision == self.revision {
            self.source_changed = false;
        }
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether a transfer is already running for the current descriptor
    pub fn is_fetching_current(&self) -> bool {
        self.in_flight.is_some() && self.fetch_revision == self.revision
    }

    pub fn in_flight_id(&self) -> Option<FetchId> {
        self.in_flight.as_ref().map(FetchHandle::id)
    }

    pub fn transient_path(&self) -> Option<PathBuf> {
        self.transient.as_ref().map(|f| f.path().to_path_buf())
    }

    /// Take ownership of a freshly started download
    pub(crate) fn begin_fetch(&mut self, file: TransientFile, handle: FetchHandle) {
        debug_assert!(
            self.in_flight.is_none() && self.transient.is_none(),
            "cleanup must run before a new fetch starts"
        );
        // Anything left behind is dropped here, which aborts it or removes it.
        self.in_flight = Some(handle);
        self.transient = Some(file);
        self.fetch_revision = self.revision;
    }

    /// Release the handle of a finished transfer
    ///
    /// Returns the revision the transfer was started for, or `None` when `id`
    /// is not the current transfer, i.e. the completion belongs to a fetch that
    /// was already cancelled.
    pub(crate) fn finish_fetch(&mut self, id: FetchId) -> Option<u64> {
        match &self.in_flight {
            Some(handle) if handle.id() == id => {
                self.in_flight = None;
                Some(self.fetch_revision)
            }
            _ => None,
        }
    }

    pub(crate) fn open_transient(&self) -> io::Result<File> {
        match &self.transient {
            Some(file) => file.open(),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no downloaded file to open",
            )),
        }
    }

    /// Delete the transient file, if any, and clear the reference
    pub fn discard_transient(&mut self) -> Result<()> {
        match self.transient.take() {
            Some(file) => {
                let path = file.path().to_path_buf();
                file.delete().map_err(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete downloaded file");
                    LoadError::Cleanup(e)
                })
            }
            None => Ok(()),
        }
    }

    /// Cancel any in-flight transfer, then delete any transient file
    ///
    /// Does not wait for the transfer to observe the cancellation.
    pub fn cleanup(&mut self) -> Result<()> {
        if let Some(handle) = self.in_flight.take() {
            handle.cancel();
        }
        self.discard_transient()
    }

    /// Release everything and force the next render to do work
    ///
    /// Safe to call when nothing is in flight.
    pub fn teardown(&mut self) -> Result<()> {
        let result = self.cleanup();
        self.invalidate();
        result
    }
}
