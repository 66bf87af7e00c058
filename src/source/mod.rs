//! Log sources: on-disk files and generic streams.
//!
//! A [`LogSource`] owns a sequential cursor used for discovering lines and a
//! random-access [`LineHandle`] used for re-reading them. Streams are teed
//! into a temporary file so both kinds behave the same downstream.

pub mod error;

pub use error::SourceError;

use crate::index::{EntryIndex, IndexedLine};
use crate::reader::{LineCursor, LineHandle, TeeReader};
use log::{debug, info};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Display name used for sources wrapped from a reader
pub const STREAM_NAME: &str = "<stdin>";

pub struct LogSource {
    name: String,
    /// Set only for regular on-disk files, which can be followed
    path: Option<PathBuf>,
    cursor: LineCursor,
    handle: LineHandle,
}

impl LogSource {
    /// Open a source by path.
    ///
    /// Regular files are read in place and can be tailed. Anything else
    /// (FIFOs, character devices) is treated as a one-shot stream.
    pub fn open<P: AsRef<Path>>(path: P, max_bytes: u64) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let name = path.display().to_string();

        let metadata = fs::metadata(path).map_err(|e| SourceError::open(&name, e))?;
        let file = File::open(path).map_err(|e| SourceError::open(&name, e))?;

        if !metadata.file_type().is_file() {
            debug!("{} is not a regular file, reading it as a stream", name);
            return Self::from_named_reader(name, file, max_bytes);
        }

        let random = File::open(path).map_err(|e| SourceError::open(&name, e))?;
        info!("Opened {} ({} bytes)", name, metadata.len());

        Ok(Self {
            handle: LineHandle::from_file(name.clone(), random),
            cursor: LineCursor::new(Box::new(file), max_bytes),
            path: Some(path.to_path_buf()),
            name,
        })
    }

    /// Wrap a generic reader, duplicating its bytes into a temporary file
    pub fn from_reader<R: Read + Send + 'static>(
        reader: R,
        max_bytes: u64,
    ) -> Result<Self, SourceError> {
        Self::from_named_reader(STREAM_NAME.to_string(), reader, max_bytes)
    }

    fn from_named_reader<R: Read + Send + 'static>(
        name: String,
        reader: R,
        max_bytes: u64,
    ) -> Result<Self, SourceError> {
        let teed = TeeReader::to_tempfile(reader).map_err(|e| SourceError::open(&name, e))?;
        debug!("Buffering {} into {}", name, teed.temp.display());

        Ok(Self {
            handle: LineHandle::from_temp(name.clone(), teed.random, teed.temp),
            cursor: LineCursor::new(Box::new(teed.reader), max_bytes),
            path: None,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Random-access handle shared by every index built from this source
    pub fn handle(&self) -> LineHandle {
        self.handle.clone()
    }

    /// Whether reaching the end of input means "wait for more" rather than "done"
    pub fn can_follow(&self) -> bool {
        self.path.is_some() && !self.cursor.budget_exhausted()
    }

    /// Bytes consumed by the sequential cursor so far
    pub fn offset(&self) -> u64 {
        self.cursor.consumed()
    }

    /// Read the next complete line, `Ok(None)` at the current end of input
    pub fn next_line(&mut self) -> Result<Option<IndexedLine>, SourceError> {
        self.cursor
            .next_line()
            .map_err(|e| SourceError::read(&self.name, e))
    }

    /// Final line of a drained stream that ended without a terminator.
    ///
    /// Followable files keep their unterminated tail pending instead, and
    /// a tail cut off by the byte budget is never indexed.
    pub fn finish(&mut self) -> Option<IndexedLine> {
        if self.path.is_some() || self.cursor.budget_exhausted() {
            return None;
        }
        self.cursor.take_partial()
    }

    /// Index every complete line currently available
    pub fn index_all(&mut self) -> Result<EntryIndex, SourceError> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line()? {
            lines.push(line);
        }
        if !self.can_follow() {
            lines.extend(self.finish());
        }

        debug!("Indexed {} lines from {}", lines.len(), self.name);
        Ok(EntryIndex::new(self.handle.clone(), lines))
    }

    /// Fail with [`SourceError::Truncated`] if the file shrank below what was read
    pub fn check_truncation(&self) -> Result<(), SourceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let size = fs::metadata(path)
            .map_err(|e| SourceError::read(&self.name, e))?
            .len();
        let offset = self.cursor.consumed();

        if size < offset {
            return Err(SourceError::Truncated {
                name: self.name.clone(),
                size,
                offset,
            });
        }
        Ok(())
    }

    /// Release both handles, reporting every failure
    pub fn close(self) -> Result<(), SourceError> {
        let mut errors = Vec::new();

        if let Err(e) = self.cursor.close() {
            errors.push(e);
        }
        match self.handle.close() {
            Ok(()) => {}
            Err(SourceError::Close { errors: more, .. }) => errors.extend(more),
            Err(other) => errors.push(std::io::Error::new(
                std::io::ErrorKind::Other,
                other.to_string(),
            )),
        }

        if errors.is_empty() {
            debug!("Closed {}", self.name);
            Ok(())
        } else {
            Err(SourceError::Close {
                name: self.name,
                errors,
            })
        }
    }
}
