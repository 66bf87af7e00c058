use super::SequentialInput;
use crate::index::IndexedLine;
use std::io::{self, BufRead, BufReader, Read, Take};

/// Sequential cursor that turns a byte stream into `(offset, length)` pairs.
///
/// The cursor never keeps line content around: it only holds the bytes of
/// the line currently being assembled, which matters while a writer is half
/// way through appending a record.
pub struct LineCursor {
    reader: BufReader<Take<Box<dyn SequentialInput>>>,
    /// Offset of the first byte not yet covered by a complete line
    offset: u64,
    /// Bytes of an unterminated line read so far
    pending: Vec<u8>,
}

impl LineCursor {
    /// Create a cursor that reads at most `max_bytes` from `input`
    pub fn new(input: Box<dyn SequentialInput>, max_bytes: u64) -> Self {
        Self {
            reader: BufReader::new(input.take(max_bytes)),
            offset: 0,
            pending: Vec::new(),
        }
    }

    /// Read the next complete, non-blank line.
    ///
    /// Returns `Ok(None)` at the current end of input. An unterminated tail
    /// is kept and completed by a later call once its terminator arrives.
    pub fn next_line(&mut self) -> io::Result<Option<IndexedLine>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.pending)?;
            if read == 0 || self.pending.last() != Some(&b'\n') {
                return Ok(None);
            }

            let line = IndexedLine::new(self.offset, self.pending.len() as u64);
            self.offset += line.length;

            let blank = self.pending.iter().all(u8::is_ascii_whitespace);
            self.pending.clear();

            if !blank {
                return Ok(Some(line));
            }
        }
    }

    /// Index the unterminated tail as a final line.
    ///
    /// Only meaningful once the input can never grow again.
    pub fn take_partial(&mut self) -> Option<IndexedLine> {
        if self.pending.is_empty() {
            return None;
        }

        let line = IndexedLine::new(self.offset, self.pending.len() as u64);
        self.offset += line.length;

        let blank = self.pending.iter().all(u8::is_ascii_whitespace);
        self.pending.clear();

        (!blank).then_some(line)
    }

    /// Bytes covered by complete lines, blank ones included
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes consumed from the input, including an unterminated tail
    pub fn consumed(&self) -> u64 {
        self.offset + self.pending.len() as u64
    }

    /// Whether the byte budget has been used up and fully consumed
    pub fn budget_exhausted(&self) -> bool {
        self.reader.get_ref().limit() == 0 && self.reader.buffer().is_empty()
    }

    pub fn close(self) -> io::Result<()> {
        let mut input = self.reader.into_inner().into_inner();
        input.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cursor_for(temp_file: &NamedTempFile, max_bytes: u64) -> LineCursor {
        let file = File::open(temp_file.path()).unwrap();
        LineCursor::new(Box::new(file), max_bytes)
    }

    fn drain(cursor: &mut LineCursor) -> Vec<IndexedLine> {
        let mut lines = Vec::new();
        while let Some(line) = cursor.next_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_offsets_include_terminator() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"abc\nde\r\nf\n").unwrap();
        temp_file.flush().unwrap();

        let mut cursor = cursor_for(&temp_file, u64::MAX);
        let lines = drain(&mut cursor);

        assert_eq!(
            lines,
            vec![
                IndexedLine::new(0, 4),
                IndexedLine::new(4, 4),
                IndexedLine::new(8, 2),
            ]
        );
        let total: u64 = lines.iter().map(|l| l.length).sum();
        assert_eq!(total, cursor.consumed());
    }

    #[test]
    fn test_blank_lines_are_skipped_but_counted() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"one\n\n   \ntwo\n").unwrap();
        temp_file.flush().unwrap();

        let mut cursor = cursor_for(&temp_file, u64::MAX);
        let lines = drain(&mut cursor);

        assert_eq!(lines, vec![IndexedLine::new(0, 4), IndexedLine::new(9, 4)]);
        assert_eq!(cursor.offset(), 13);
    }

    #[test]
    fn test_unterminated_tail_waits_for_terminator() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"done\npart").unwrap();
        temp_file.flush().unwrap();

        let mut cursor = cursor_for(&temp_file, u64::MAX);
        assert_eq!(drain(&mut cursor), vec![IndexedLine::new(0, 5)]);
        assert_eq!(cursor.offset(), 5);
        assert_eq!(cursor.consumed(), 9);

        let mut file = OpenOptions::new()
            .append(true)
            .open(temp_file.path())
            .unwrap();
        file.write_all(b"ial\n").unwrap();
        file.flush().unwrap();

        assert_eq!(cursor.next_line().unwrap(), Some(IndexedLine::new(5, 8)));
        assert!(cursor.next_line().unwrap().is_none());
    }

    #[test]
    fn test_take_partial() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"a\nlast").unwrap();
        temp_file.flush().unwrap();

        let mut cursor = cursor_for(&temp_file, u64::MAX);
        drain(&mut cursor);

        assert_eq!(cursor.take_partial(), Some(IndexedLine::new(2, 4)));
        assert_eq!(cursor.take_partial(), None);
    }

    #[test]
    fn test_budget_stops_indexing_without_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        for i in 0..10 {
            writeln!(temp_file, "line {:04}", i).unwrap();
        }
        temp_file.flush().unwrap();

        // 10 bytes per line, budget covers three and a half lines
        let mut cursor = cursor_for(&temp_file, 35);
        let lines = drain(&mut cursor);

        assert_eq!(lines.len(), 3);
        assert!(cursor.consumed() <= 35);
        assert!(cursor.budget_exhausted());
    }

    #[test]
    fn test_budget_not_exhausted_for_small_input() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"x\n").unwrap();
        temp_file.flush().unwrap();

        let mut cursor = cursor_for(&temp_file, 1024);
        drain(&mut cursor);

        assert!(!cursor.budget_exhausted());
    }
}
