//! Windowed render table.
//!
//! Only the entries inside the viewport are ever re-read and parsed. Rows
//! are never kept between renders, so every call reflects the current
//! state of the source.

use crate::index::EntryIndex;
use crate::renderer::{EntryParser, ParsedEntry};
use crate::viewport::Viewport;
use std::cell::Cell;
use std::sync::Arc;

/// A materialized table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Position in the current index
    pub index: usize,
    pub entry: ParsedEntry,
}

pub struct LogTable {
    parser: Arc<EntryParser>,
    index: Option<EntryIndex>,
    viewport: Viewport,
    rendered: Cell<usize>,
}

impl LogTable {
    pub fn new(parser: Arc<EntryParser>, follow: bool, reverse: bool) -> Self {
        Self {
            parser,
            index: None,
            viewport: Viewport::new(follow, reverse),
            rendered: Cell::new(0),
        }
    }

    pub fn parser(&self) -> &EntryParser {
        &self.parser
    }

    pub fn index(&self) -> Option<&EntryIndex> {
        self.index.as_ref()
    }

    pub fn len(&self) -> usize {
        self.index.as_ref().map_or(0, EntryIndex::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Navigation goes straight to the viewport
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Entries parsed since creation
    pub fn rendered_count(&self) -> usize {
        self.rendered.get()
    }

    /// A longer snapshot of the same lines arrived
    pub fn grow(&mut self, index: EntryIndex) {
        self.viewport.set_len(index.len());
        self.index = Some(index);
    }

    /// Different lines (another filter, a reload) replace the current ones
    pub fn replace(&mut self, index: EntryIndex) {
        self.viewport.reset_len(index.len());
        self.index = Some(index);
    }

    /// Drop the index, keeping follow and reverse settings
    pub fn clear(&mut self) {
        self.viewport.reset_len(0);
        self.index = None;
    }

    pub fn set_height(&mut self, height: usize) {
        self.viewport.set_height(height);
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.viewport.selected_index()
    }

    /// Freshly parsed selected entry
    pub fn selected_entry(&self) -> Option<ParsedEntry> {
        let index = self.index.as_ref()?;
        let pos = self.viewport.selected_index()?;
        Some(index.entry(pos, &self.parser))
    }

    /// Visible rows, top to bottom, freshly re-read and parsed
    pub fn rows(&self) -> Vec<Row> {
        let Some(index) = &self.index else {
            return Vec::new();
        };

        let rows: Vec<Row> = self
            .viewport
            .visible_indices()
            .map(|pos| Row {
                index: pos,
                entry: index.entry(pos, &self.parser),
            })
            .collect();
        self.rendered.set(self.rendered.get() + rows.len());
        rows
    }
}
