use crate::source::SourceError;
use log::debug;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tempfile::TempPath;

/// Random-access, read-only handle used to re-read indexed lines.
///
/// Cloning is cheap and every clone refers to the same open file. Reads are
/// positional, so the render path, filters and the publisher can all read
/// concurrently without coordinating a shared seek position.
#[derive(Clone, Debug)]
pub struct LineHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    name: String,
    file: RwLock<Option<File>>,
    /// Backing temporary file for stream sources, removed on close
    temp: Mutex<Option<TempPath>>,
}

impl LineHandle {
    /// Wrap an already opened on-disk file
    pub fn from_file(name: impl Into<String>, file: File) -> Self {
        Self::build(name.into(), file, None)
    }

    /// Wrap the read side of a temporary file that is deleted on close
    pub fn from_temp(name: impl Into<String>, file: File, temp: TempPath) -> Self {
        Self::build(name.into(), file, Some(temp))
    }

    fn build(name: String, file: File, temp: Option<TempPath>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name,
                file: RwLock::new(Some(file)),
                temp: Mutex::new(temp),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Read exactly `length` bytes starting at `offset`
    pub fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>, SourceError> {
        let guard = self
            .inner
            .file
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let file = guard.as_ref().ok_or_else(|| SourceError::Closed {
            name: self.inner.name.clone(),
        })?;

        // A length that does not fit in memory is a read error, not an abort
        let mut buf = Vec::new();
        let Some(len) = usize::try_from(length)
            .ok()
            .filter(|&len| buf.try_reserve_exact(len).is_ok())
        else {
            return Err(SourceError::read(
                &self.inner.name,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("line of {} bytes at offset {} is too long", length, offset),
                ),
            ));
        };
        buf.resize(len, 0);
        read_exact_at(file, &mut buf, offset).map_err(|e| SourceError::read(&self.inner.name, e))?;
        Ok(buf)
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .file
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Location of the backing temporary file, if this handle owns one
    pub fn temp_path(&self) -> Option<PathBuf> {
        self.inner
            .temp
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|path| path.to_path_buf())
    }

    /// Release the file and delete the backing temporary file.
    ///
    /// Closing an already closed handle is a no-op.
    pub fn close(&self) -> Result<(), SourceError> {
        let file = self
            .inner
            .file
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(file);

        let temp = self
            .inner
            .temp
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(temp) = temp {
            debug!("Removing temporary copy of {}: {}", self.inner.name, temp.display());
            temp.close().map_err(|e| SourceError::Close {
                name: self.inner.name.clone(),
                errors: vec![e],
            })?;
        }

        Ok(())
    }
}

/// Handles are equal when they share the same open file
impl PartialEq for LineHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
