//! Offset index over the lines of a log source.
//!
//! An [`EntryIndex`] stores only `(offset, length)` pairs; content is
//! re-read through the shared [`LineHandle`] whenever a row is needed.
//!
//! Lines live in immutable runs shared between clones. Appending seals a
//! new run, so a snapshot of a growing index costs one pointer per run.

use crate::cancel::CancelToken;
use crate::filter::string_filter::StringFilter;
use crate::filter::Filter;
use crate::reader::LineHandle;
use crate::renderer::{EntryParser, ParsedEntry};
use crate::source::SourceError;
use rayon::prelude::*;
use std::io;
use std::sync::Arc;

/// Lines per rayon work item when filtering
const FILTER_CHUNK_SIZE: usize = 4096;

/// Appends are folded into the last run while it stays below this size
const MIN_RUN_LEN: usize = 4096;

/// Position of one line in the source, terminator included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedLine {
    pub offset: u64,
    pub length: u64,
}

impl IndexedLine {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }
}

/// Ordered lines of one source, cheap to clone.
#[derive(Debug, Clone)]
pub struct EntryIndex {
    handle: LineHandle,
    runs: Vec<Arc<[IndexedLine]>>,
    /// Cumulative line count at the end of each run
    ends: Vec<usize>,
}

impl PartialEq for EntryIndex {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl EntryIndex {
    pub fn new(handle: LineHandle, lines: Vec<IndexedLine>) -> Self {
        let mut index = Self {
            handle,
            runs: Vec::new(),
            ends: Vec::new(),
        };
        index.extend(lines);
        index
    }

    /// Index with no lines on the same handle
    pub fn empty(handle: LineHandle) -> Self {
        Self::new(handle, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, pos: usize) -> Option<IndexedLine> {
        let run = self.ends.partition_point(|&end| end <= pos);
        let base = self.run_start(run);
        self.runs.get(run)?.get(pos - base).copied()
    }

    /// Every line, in order
    pub fn iter(&self) -> impl Iterator<Item = IndexedLine> + '_ {
        self.runs.iter().flat_map(|run| run.iter().copied())
    }

    pub fn handle(&self) -> &LineHandle {
        &self.handle
    }

    /// Append lines as a new run.
    ///
    /// Clones keep sharing every earlier run. A short last run is merged
    /// with the new lines instead, which bounds the number of runs.
    pub fn extend(&mut self, more: impl IntoIterator<Item = IndexedLine>) {
        let more: Vec<IndexedLine> = more.into_iter().collect();
        if more.is_empty() {
            return;
        }

        let len = self.len() + more.len();
        let merge = self
            .runs
            .last()
            .is_some_and(|last| last.len() + more.len() <= MIN_RUN_LEN);
        if !merge {
            self.runs.push(more.into());
            self.ends.push(len);
        } else if let (Some(last), Some(end)) = (self.runs.last_mut(), self.ends.last_mut()) {
            *last = last.iter().copied().chain(more).collect();
            *end = len;
        }
    }

    fn run_start(&self, run: usize) -> usize {
        match run {
            0 => 0,
            _ => self.ends.get(run - 1).copied().unwrap_or(0),
        }
    }

    /// Line slices covering positions `start..`
    fn slices_from(&self, start: usize) -> impl Iterator<Item = &[IndexedLine]> + '_ {
        self.runs.iter().enumerate().filter_map(move |(i, run)| {
            let base = self.run_start(i);
            let skip = start.saturating_sub(base);
            run.get(skip..).filter(|slice| !slice.is_empty())
        })
    }

    #[cfg(test)]
    pub(crate) fn runs(&self) -> &[Arc<[IndexedLine]>] {
        &self.runs
    }

    /// Re-read the line at `pos`, without its terminator
    pub fn raw_line(&self, pos: usize) -> Result<Vec<u8>, SourceError> {
        let line = self.get(pos).ok_or_else(|| {
            SourceError::read(
                self.handle.name(),
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("entry {} is out of range ({} indexed)", pos, self.len()),
                ),
            )
        })?;
        read_trimmed(&self.handle, line)
    }

    /// Re-read and parse the line at `pos`.
    ///
    /// Read failures yield an entry carrying the error instead of an `Err`.
    pub fn entry(&self, pos: usize, parser: &EntryParser) -> ParsedEntry {
        match self.raw_line(pos) {
            Ok(bytes) => parser.parse(&bytes),
            Err(e) => parser.failed(e.to_string()),
        }
    }

    /// New index holding only the lines accepted by `filter`
    pub fn filter(&self, filter: &dyn Filter) -> Result<EntryIndex, SourceError> {
        let matches = self.filter_from(0, filter, &CancelToken::new())?;
        Ok(self.derive(matches.unwrap_or_default()))
    }

    /// Case-insensitive substring filter; an empty term keeps every line
    pub fn filter_substring(&self, term: &str) -> Result<EntryIndex, SourceError> {
        if term.is_empty() {
            return Ok(self.clone());
        }
        self.filter(&StringFilter::new(term))
    }

    /// Matching lines at positions `start..`, in order.
    ///
    /// Returns `Ok(None)` if `cancel` fires before the scan completes.
    pub fn filter_from(
        &self,
        start: usize,
        filter: &dyn Filter,
        cancel: &CancelToken,
    ) -> Result<Option<Vec<IndexedLine>>, SourceError> {
        let pieces: Vec<&[IndexedLine]> = self
            .slices_from(start)
            .flat_map(|slice| slice.chunks(FILTER_CHUNK_SIZE))
            .collect();

        let chunks: Vec<Vec<IndexedLine>> = pieces
            .par_iter()
            .map(|chunk| -> Result<Vec<IndexedLine>, SourceError> {
                let mut matches = Vec::new();
                for line in chunk.iter() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let bytes = read_trimmed(&self.handle, *line)?;
                    if filter.matches(&String::from_utf8_lossy(&bytes)) {
                        matches.push(*line);
                    }
                }
                Ok(matches)
            })
            .collect::<Result<_, _>>()?;

        if cancel.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(chunks.into_iter().flatten().collect()))
    }

    /// Index on the same handle with other lines
    pub fn derive(&self, lines: Vec<IndexedLine>) -> EntryIndex {
        EntryIndex::new(self.handle.clone(), lines)
    }
}

fn read_trimmed(handle: &LineHandle, line: IndexedLine) -> Result<Vec<u8>, SourceError> {
    let mut bytes = handle.read_at(line.offset, line.length)?;
    while bytes.last().is_some_and(u8::is_ascii_whitespace) {
        bytes.pop();
    }
    Ok(bytes)
}
