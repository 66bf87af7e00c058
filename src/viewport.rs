//! Viewport state of the log table.
//!
//! Positions are tracked in display order: row 0 is the top of the table.
//! In reverse mode display position `p` shows index `len - 1 - p`, so the
//! newest entry is on top. The selection is `scroll_offset + cursor`, with
//! `cursor` relative to the window.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    /// First visible display position
    scroll_offset: usize,
    /// Selected row within the window
    cursor: usize,
    follow: bool,
    reverse: bool,
    height: usize,
    len: usize,
}

impl Viewport {
    pub fn new(follow: bool, reverse: bool) -> Self {
        Self {
            scroll_offset: 0,
            cursor: 0,
            follow,
            reverse,
            height: 0,
            len: 0,
        }
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rows used for navigation; a zero-height window still has a selection
    fn rows(&self) -> usize {
        self.height.max(1)
    }

    fn max_scroll(&self) -> usize {
        self.len.saturating_sub(self.rows())
    }

    fn selected_position(&self) -> usize {
        self.scroll_offset + self.cursor
    }

    /// Index shown at display position `pos`
    pub fn index_at(&self, pos: usize) -> usize {
        if self.reverse {
            self.len - 1 - pos
        } else {
            pos
        }
    }

    fn position_of(&self, index: usize) -> usize {
        // Same mapping in both directions
        self.index_at(index)
    }

    fn tail_position(&self) -> usize {
        if self.reverse {
            0
        } else {
            self.len.saturating_sub(1)
        }
    }

    /// Index of the selected entry, `None` when there are no entries
    pub fn selected_index(&self) -> Option<usize> {
        (self.len > 0).then(|| self.index_at(self.selected_position()))
    }

    /// Display positions currently visible, never more than the height
    pub fn visible_range(&self) -> Range<usize> {
        let end = (self.scroll_offset + self.height).min(self.len);
        self.scroll_offset.min(end)..end
    }

    /// Indices currently visible, top to bottom
    pub fn visible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.visible_range().map(|pos| self.index_at(pos))
    }

    pub fn set_height(&mut self, height: usize) {
        if self.height == height {
            return;
        }
        self.height = height;
        if self.follow {
            self.select_tail();
        } else {
            self.clamp();
        }
    }

    /// The index grew (or shrank) to `len`.
    ///
    /// Following keeps the newest entry selected. Otherwise the selection
    /// stays on the same entry, which in reverse mode means shifting the
    /// window down by the number of new entries.
    pub fn set_len(&mut self, len: usize) {
        let grown = len.saturating_sub(self.len);
        self.len = len;

        if self.follow {
            self.select_tail();
            return;
        }
        if self.reverse && grown > 0 && len > grown {
            self.scroll_offset += grown;
        }
        self.clamp();
    }

    /// A different index replaced the current one; keep the window position
    pub fn reset_len(&mut self, len: usize) {
        self.len = len;
        if self.follow {
            self.select_tail();
        } else {
            self.clamp();
        }
    }

    pub fn line_up(&mut self) {
        if self.selected_position() == 0 {
            return;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
        } else {
            self.scroll_offset -= 1;
        }
        self.update_follow();
    }

    pub fn line_down(&mut self) {
        if self.selected_position() + 1 >= self.len {
            return;
        }
        if self.cursor + 1 < self.rows() {
            self.cursor += 1;
        } else {
            self.scroll_offset += 1;
        }
        self.update_follow();
    }

    pub fn page_up(&mut self) {
        let target = self.selected_position().saturating_sub(self.rows());
        self.scroll_offset = self.scroll_offset.saturating_sub(self.rows());
        self.select_position(target);
        self.update_follow();
    }

    pub fn page_down(&mut self) {
        if self.len == 0 {
            return;
        }
        let target = (self.selected_position() + self.rows()).min(self.len - 1);
        self.scroll_offset = (self.scroll_offset + self.rows()).min(self.max_scroll());
        self.select_position(target);
        self.update_follow();
    }

    /// Select index 0 and stop following
    pub fn go_to_start(&mut self) {
        self.follow = false;
        if self.len == 0 {
            return;
        }
        let pos = self.position_of(0);
        self.scroll_offset = if self.reverse { self.max_scroll() } else { 0 };
        self.select_position(pos);
    }

    /// Select the most recently appended index and follow the tail,
    /// whichever end of the table it is displayed at
    pub fn go_to_end(&mut self) {
        self.follow = true;
        self.select_tail();
    }

    pub fn toggle_follow(&mut self) {
        if self.follow {
            self.follow = false;
        } else {
            self.go_to_end();
        }
    }

    /// Flip the display direction, keeping the same entry selected
    pub fn toggle_reverse(&mut self) {
        let selected = self.selected_index();
        self.reverse = !self.reverse;

        match selected {
            Some(index) => {
                let pos = self.position_of(index);
                self.scroll_offset = pos.saturating_sub(self.cursor);
                self.select_position(pos);
            }
            None => self.clamp(),
        }
    }

    fn select_tail(&mut self) {
        if self.len == 0 {
            self.scroll_offset = 0;
            self.cursor = 0;
            return;
        }
        let pos = self.tail_position();
        self.scroll_offset = if self.reverse { 0 } else { self.max_scroll() };
        self.select_position(pos);
    }

    /// Select `pos`, scrolling only as far as needed to show it
    fn select_position(&mut self, pos: usize) {
        if pos < self.scroll_offset {
            self.scroll_offset = pos;
        } else if pos >= self.scroll_offset + self.rows() {
            self.scroll_offset = pos + 1 - self.rows();
        }
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
        self.cursor = pos - self.scroll_offset;
    }

    fn update_follow(&mut self) {
        self.follow = self.len > 0 && self.selected_position() == self.tail_position();
    }

    fn clamp(&mut self) {
        if self.len == 0 {
            self.scroll_offset = 0;
            self.cursor = 0;
            return;
        }
        let pos = self.selected_position().min(self.len - 1);
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
        self.select_position(pos);
    }
}
