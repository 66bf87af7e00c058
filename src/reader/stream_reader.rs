use super::SequentialInput;
use std::fs::File;
use std::io::{self, Read, Write};
use tempfile::{NamedTempFile, TempPath};

/// Reader for non-seekable streams (pipes, stdin, process substitution).
///
/// Every byte handed to the caller is first appended to a hidden temporary
/// file, so lines of a stream can later be re-read by offset exactly like
/// lines of a regular file.
pub struct TeeReader<R> {
    inner: R,
    sink: File,
}

/// The pieces produced when a stream is teed to disk
pub struct TeedStream<R> {
    /// Sequential side: reading from it fills the temporary file
    pub reader: TeeReader<R>,
    /// Independent handle opened on the temporary file for random access
    pub random: File,
    /// Owner of the temporary file's path, deletes it when closed
    pub temp: TempPath,
}

impl<R: Read> TeeReader<R> {
    /// Create a fresh temporary file and wrap `inner` so it copies into it
    pub fn to_tempfile(inner: R) -> io::Result<TeedStream<R>> {
        let temp_file = NamedTempFile::new()?;
        let random = temp_file.reopen()?;
        let (sink, temp) = temp_file.into_parts();

        Ok(TeedStream {
            reader: TeeReader { inner, sink },
            random,
            temp,
        })
    }
}

impl<R: Read> Read for TeeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.sink.write_all(&buf[..read])?;
        Ok(read)
    }
}

impl<R: Read + Send> SequentialInput for TeeReader<R> {
    fn close(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
