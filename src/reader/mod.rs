//! Byte-level access to a log source.
//!
//! Every source is read through two handles: a sequential [`LineCursor`]
//! that discovers line boundaries, and a random-access [`LineHandle`] that
//! re-reads a single line by `(offset, length)` when it is about to be shown.

pub mod file_reader;
pub mod line_cursor;
pub mod stream_reader;

pub use file_reader::LineHandle;
pub use line_cursor::LineCursor;
pub use stream_reader::TeeReader;

use std::fs::File;
use std::io::{self, Read};

/// Input consumed by the sequential cursor.
///
/// `close` releases whatever the input owns besides its read side and
/// reports failures instead of swallowing them on drop.
pub trait SequentialInput: Read + Send {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SequentialInput for File {}
