use crate::cancel::CancelToken;
use crate::event::AppEvent;
use crate::filter::engine::{FilterEngine, FilterProgress};
use crate::filter::{Filter, FilterMode};
use crate::handlers;
use crate::index::EntryIndex;
use crate::table::LogTable;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;

/// What the main area shows
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    /// Waiting for the first snapshot
    Loading,
    Loaded,
    /// A fatal source error replaces the table until acknowledged
    Error(String),
    /// Pretty-printed selected row
    ViewRow { text: String, scroll: u16 },
}

/// Input mode for user interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EnteringFilter,
}

/// Filter applied to the table
pub struct ActiveFilter {
    pub pattern: String,
    pub mode: FilterMode,
    filter: Arc<dyn Filter>,
}

/// Background filter run in flight
struct FilterJob {
    rx: Receiver<FilterProgress>,
    cancel: CancelToken,
    /// First unfiltered position scanned by this run
    start: usize,
}

/// Main application state
pub struct App {
    pub state: AppState,
    pub input_mode: InputMode,

    /// Input buffer for filter entry
    pub input_buffer: String,

    /// Mode used for the next submitted filter
    pub filter_mode: FilterMode,

    active_filter: Option<ActiveFilter>,
    filter_job: Option<FilterJob>,

    /// Latest unfiltered snapshot from the streamer
    snapshot: Option<EntryIndex>,

    /// Unfiltered lines already covered by the filtered table
    filtered_through: usize,

    pub table: LogTable,

    /// One-line message shown in the status bar
    pub status: Option<String>,

    /// Whether live updates are still arriving
    pub tailing: bool,

    pub show_help: bool,
    pub should_quit: bool,

    /// Set when the user asked for a reload the main loop has to perform
    pub reload_requested: bool,

    source_name: String,
    can_reload: bool,
}

impl App {
    pub fn new(source_name: impl Into<String>, table: LogTable, can_reload: bool) -> Self {
        Self {
            state: AppState::Loading,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            filter_mode: FilterMode::default(),
            active_filter: None,
            filter_job: None,
            snapshot: None,
            filtered_through: 0,
            table,
            status: None,
            tailing: true,
            show_help: false,
            should_quit: false,
            reload_requested: false,
            source_name: source_name.into(),
            can_reload,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Lines indexed so far, before filtering
    pub fn total_lines(&self) -> usize {
        self.snapshot.as_ref().map_or(0, EntryIndex::len)
    }

    pub fn active_filter(&self) -> Option<&ActiveFilter> {
        self.active_filter.as_ref()
    }

    pub fn is_filtering(&self) -> bool {
        self.filter_job.is_some()
    }

    pub fn is_entering_filter(&self) -> bool {
        self.input_mode == InputMode::EnteringFilter
    }

    pub fn is_error(&self) -> bool {
        matches!(self.state, AppState::Error(_))
    }

    pub fn is_viewing_row(&self) -> bool {
        matches!(self.state, AppState::ViewRow { .. })
    }

    /// Collect the result of the running filter, if it finished
    pub fn poll_filter(&mut self) -> Vec<AppEvent> {
        let Some(job) = &self.filter_job else {
            return Vec::new();
        };

        match job.rx.try_recv() {
            Ok(progress) => handlers::filter::handle_filter_progress(progress, job.start),
            Err(TryRecvError::Empty) => Vec::new(),
            Err(TryRecvError::Disconnected) => {
                debug!("Filter run ended without a result");
                self.filter_job = None;
                Vec::new()
            }
        }
    }

    /// Forget everything loaded from the previous source instance.
    ///
    /// The active filter survives and is re-applied to the new snapshots.
    pub fn begin_reload(&mut self) {
        info!("Reloading {}", self.source_name);
        self.cancel_filter_job();
        self.snapshot = None;
        self.filtered_through = 0;
        self.table.clear();
        self.state = AppState::Loading;
        self.status = None;
        self.tailing = true;
        self.reload_requested = false;
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::EntriesUpdated(index) => self.entries_updated(index),
            AppEvent::SourceFailed { message, truncated } => {
                self.source_failed(message, truncated)
            }
            AppEvent::Reload => {
                if self.can_reload {
                    self.reload_requested = true;
                } else {
                    self.status = Some("Streams cannot be reloaded".to_string());
                }
            }

            // Navigation events
            AppEvent::ScrollDown => self.table.viewport_mut().line_down(),
            AppEvent::ScrollUp => self.table.viewport_mut().line_up(),
            AppEvent::PageDown => self.table.viewport_mut().page_down(),
            AppEvent::PageUp => self.table.viewport_mut().page_up(),
            AppEvent::JumpToStart => self.table.viewport_mut().go_to_start(),
            AppEvent::JumpToEnd => self.table.viewport_mut().go_to_end(),
            AppEvent::ToggleFollowMode => self.table.viewport_mut().toggle_follow(),
            AppEvent::ToggleReverse => self.table.viewport_mut().toggle_reverse(),

            // Filter input events
            AppEvent::StartFilterInput => {
                self.input_mode = InputMode::EnteringFilter;
                self.input_buffer = self
                    .active_filter
                    .as_ref()
                    .map(|f| f.pattern.clone())
                    .unwrap_or_default();
            }
            AppEvent::FilterInputChar(c) => self.input_buffer.push(c),
            AppEvent::FilterInputBackspace => {
                self.input_buffer.pop();
            }
            AppEvent::FilterInputSubmit => {
                self.input_mode = InputMode::Normal;
                let pattern = std::mem::take(&mut self.input_buffer);
                if pattern.is_empty() {
                    self.clear_filter();
                } else {
                    self.set_filter(pattern);
                }
            }
            AppEvent::FilterInputCancel => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            AppEvent::ToggleFilterMode => self.filter_mode = self.filter_mode.toggle(),
            AppEvent::ClearFilter => self.clear_filter(),
            AppEvent::FilterComplete {
                matches,
                start,
                scanned,
            } => self.filter_complete(matches, start, scanned),
            AppEvent::FilterError(err) => {
                warn!("Filter failed: {}", err);
                self.filter_job = None;
                self.status = Some(format!("Filter failed: {}", err));
            }

            // Row inspector
            AppEvent::OpenRow => self.open_row(),
            AppEvent::CloseRow => {
                if self.is_viewing_row() {
                    self.state = AppState::Loaded;
                }
            }
            AppEvent::InspectorDown => {
                if let AppState::ViewRow { scroll, .. } = &mut self.state {
                    *scroll = scroll.saturating_add(1);
                }
            }
            AppEvent::InspectorUp => {
                if let AppState::ViewRow { scroll, .. } = &mut self.state {
                    *scroll = scroll.saturating_sub(1);
                }
            }

            AppEvent::ShowHelp => self.show_help = true,
            AppEvent::HideHelp => self.show_help = false,

            AppEvent::Acknowledge => {
                if self.table.index().is_some() {
                    self.state = AppState::Loaded;
                } else {
                    self.should_quit = true;
                }
            }

            AppEvent::Quit => self.should_quit = true,
        }
    }

    fn entries_updated(&mut self, index: EntryIndex) {
        if self.state == AppState::Loading {
            self.state = AppState::Loaded;
        }

        let len = index.len();
        self.snapshot = Some(index.clone());

        if self.active_filter.is_none() {
            self.table.grow(index);
        } else if self.filter_job.is_none() && len > self.filtered_through {
            self.start_filter_job(self.filtered_through);
        }
    }

    fn source_failed(&mut self, message: String, truncated: bool) {
        self.tailing = false;

        if truncated {
            self.status = Some(format!("{}, press R to reload", message));
        } else {
            self.state = AppState::Error(message);
        }
    }

    fn set_filter(&mut self, pattern: String) {
        let filter = match self.filter_mode.build(&pattern) {
            Ok(filter) => filter,
            Err(e) => {
                self.status = Some(format!("Invalid regex: {}", e));
                return;
            }
        };

        info!("Filtering {} by '{}' ({})", self.source_name, pattern, self.filter_mode.label());
        self.status = None;
        self.active_filter = Some(ActiveFilter {
            pattern,
            mode: self.filter_mode,
            filter: Arc::from(filter),
        });
        self.filtered_through = 0;
        self.start_filter_job(0);
    }

    fn clear_filter(&mut self) {
        if self.active_filter.take().is_none() {
            return;
        }

        self.cancel_filter_job();
        self.filtered_through = 0;
        match &self.snapshot {
            Some(snapshot) => self.table.replace(snapshot.clone()),
            None => self.table.clear(),
        }
    }

    /// Filter the current snapshot from `start` on a background thread,
    /// superseding any run already in flight
    fn start_filter_job(&mut self, start: usize) {
        self.cancel_filter_job();

        let (Some(snapshot), Some(active)) = (&self.snapshot, &self.active_filter) else {
            return;
        };

        let cancel = CancelToken::new();
        let rx = FilterEngine::run_filter(
            snapshot.clone(),
            start,
            Arc::clone(&active.filter),
            cancel.clone(),
        );
        self.filter_job = Some(FilterJob { rx, cancel, start });
    }

    fn cancel_filter_job(&mut self) {
        if let Some(job) = self.filter_job.take() {
            job.cancel.cancel();
        }
    }

    fn filter_complete(&mut self, matches: EntryIndex, start: usize, scanned: usize) {
        self.filter_job = None;
        if self.active_filter.is_none() {
            return;
        }

        match self.table.index() {
            Some(current) if start > 0 => {
                let mut grown = current.clone();
                grown.extend(matches.iter());
                self.table.grow(grown);
            }
            _ => self.table.replace(matches),
        }
        self.filtered_through = scanned;

        // Lines that arrived while this run was in flight
        if self.total_lines() > scanned {
            self.start_filter_job(scanned);
        }
    }

    fn open_row(&mut self) {
        let Some(entry) = self.table.selected_entry() else {
            return;
        };

        if let Some(err) = entry.error {
            self.status = Some(err);
            return;
        }

        let text = serde_json::from_str::<Value>(&entry.raw)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .unwrap_or(entry.raw);
        self.state = AppState::ViewRow { text, scroll: 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::renderer::EntryParser;
    use crate::source::LogSource;
    use crate::test_utils::write_lines;
    use std::time::{Duration, Instant};
    use tempfile::NamedTempFile;

    fn app() -> App {
        let parser = Arc::new(EntryParser::new(&Config::default()));
        let mut table = LogTable::new(parser, true, false);
        table.set_height(10);
        App::new("test.log", table, true)
    }

    fn indexed(lines: &[&str]) -> (NamedTempFile, LogSource, EntryIndex) {
        let temp_file = write_lines(lines);
        let mut source = LogSource::open(temp_file.path(), u64::MAX).unwrap();
        let index = source.index_all().unwrap();
        (temp_file, source, index)
    }

    /// Apply filter results until no run is in flight
    fn settle(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.is_filtering() {
            assert!(Instant::now() < deadline, "filter did not finish");
            for event in app.poll_filter() {
                app.apply_event(event);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn submit_filter(app: &mut App, pattern: &str) {
        app.apply_event(AppEvent::StartFilterInput);
        for c in pattern.chars() {
            app.apply_event(AppEvent::FilterInputChar(c));
        }
        app.apply_event(AppEvent::FilterInputSubmit);
    }

    fn messages(app: &App) -> Vec<String> {
        app.table
            .rows()
            .iter()
            .map(|row| row.entry.fields[2].clone())
            .collect()
    }

    #[test]
    fn test_first_snapshot_loads() {
        let (_temp, _source, index) = indexed(&[r#"{"msg":"a"}"#]);
        let mut app = app();
        assert_eq!(app.state, AppState::Loading);

        app.apply_event(AppEvent::EntriesUpdated(index));

        assert_eq!(app.state, AppState::Loaded);
        assert_eq!(app.total_lines(), 1);
        assert_eq!(messages(&app), vec!["a"]);
    }

    #[test]
    fn test_filter_then_clear() {
        let (_temp, _source, index) = indexed(&[
            r#"{"msg":"first X"}"#,
            r#"{"msg":"second"}"#,
            r#"{"msg":"third"}"#,
        ]);
        let mut app = app();
        app.apply_event(AppEvent::EntriesUpdated(index));

        submit_filter(&mut app, "x");
        assert!(!app.is_entering_filter());
        settle(&mut app);

        assert_eq!(messages(&app), vec!["first X"]);
        assert_eq!(app.active_filter().unwrap().pattern, "x");

        app.apply_event(AppEvent::ClearFilter);
        assert!(app.active_filter().is_none());
        assert_eq!(app.table.len(), 3);
    }

    #[test]
    fn test_new_snapshot_is_filtered_incrementally() {
        let (_temp, _source, index) = indexed(&[
            r#"{"msg":"hit 1"}"#,
            r#"{"msg":"miss"}"#,
            r#"{"msg":"hit 2"}"#,
        ]);
        let mut app = app();
        app.apply_event(AppEvent::EntriesUpdated(index.derive(index.iter().take(2).collect())));

        submit_filter(&mut app, "hit");
        settle(&mut app);
        assert_eq!(messages(&app), vec!["hit 1"]);

        app.apply_event(AppEvent::EntriesUpdated(index));
        settle(&mut app);
        assert_eq!(messages(&app), vec!["hit 1", "hit 2"]);
    }

    #[test]
    fn test_invalid_regex_keeps_previous_view() {
        let (_temp, _source, index) = indexed(&[r#"{"msg":"a"}"#]);
        let mut app = app();
        app.apply_event(AppEvent::EntriesUpdated(index));

        app.apply_event(AppEvent::StartFilterInput);
        app.apply_event(AppEvent::ToggleFilterMode);
        app.apply_event(AppEvent::FilterInputChar('('));
        app.apply_event(AppEvent::FilterInputSubmit);

        assert!(app.active_filter().is_none());
        assert!(app.status.as_deref().unwrap().starts_with("Invalid regex"));
        assert_eq!(app.table.len(), 1);
    }

    #[test]
    fn test_cancel_filter_input_keeps_filter() {
        let mut app = app();
        app.apply_event(AppEvent::StartFilterInput);
        app.apply_event(AppEvent::FilterInputChar('a'));
        app.apply_event(AppEvent::FilterInputCancel);

        assert!(!app.is_entering_filter());
        assert!(app.input_buffer.is_empty());
        assert!(app.active_filter().is_none());
    }

    #[test]
    fn test_truncation_keeps_rows() {
        let (_temp, _source, index) = indexed(&[r#"{"msg":"a"}"#]);
        let mut app = app();
        app.apply_event(AppEvent::EntriesUpdated(index));

        app.apply_event(AppEvent::SourceFailed {
            message: "test.log was truncated".to_string(),
            truncated: true,
        });

        assert_eq!(app.state, AppState::Loaded);
        assert!(!app.tailing);
        assert!(app.status.as_deref().unwrap().contains("R to reload"));
        assert_eq!(app.table.len(), 1);
    }

    #[test]
    fn test_error_acknowledged_returns_to_rows() {
        let (_temp, _source, index) = indexed(&[r#"{"msg":"a"}"#]);
        let mut app = app();
        app.apply_event(AppEvent::EntriesUpdated(index));

        app.apply_event(AppEvent::SourceFailed {
            message: "cannot read test.log".to_string(),
            truncated: false,
        });
        assert!(app.is_error());

        app.apply_event(AppEvent::Acknowledge);
        assert_eq!(app.state, AppState::Loaded);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_error_before_any_rows_quits() {
        let mut app = app();
        app.apply_event(AppEvent::SourceFailed {
            message: "cannot open test.log".to_string(),
            truncated: false,
        });

        app.apply_event(AppEvent::Acknowledge);
        assert!(app.should_quit);
    }

    #[test]
    fn test_open_row_pretty_prints() {
        let (_temp, _source, index) = indexed(&[r#"{"msg":"a","n":1}"#]);
        let mut app = app();
        app.apply_event(AppEvent::EntriesUpdated(index));

        app.apply_event(AppEvent::OpenRow);
        match &app.state {
            AppState::ViewRow { text, scroll } => {
                assert!(text.contains("\n  \"msg\": \"a\""));
                assert_eq!(*scroll, 0);
            }
            other => panic!("unexpected state: {:?}", other),
        }

        app.apply_event(AppEvent::InspectorDown);
        app.apply_event(AppEvent::CloseRow);
        assert_eq!(app.state, AppState::Loaded);
    }

    #[test]
    fn test_open_plain_row_shows_raw_text() {
        let (_temp, _source, index) = indexed(&["not json"]);
        let mut app = app();
        app.apply_event(AppEvent::EntriesUpdated(index));

        app.apply_event(AppEvent::OpenRow);
        assert_eq!(
            app.state,
            AppState::ViewRow {
                text: "not json".to_string(),
                scroll: 0
            }
        );
    }

    #[test]
    fn test_reload_request() {
        let (_temp, _source, index) = indexed(&[r#"{"msg":"a"}"#]);
        let mut app = app();
        app.apply_event(AppEvent::EntriesUpdated(index));

        app.apply_event(AppEvent::Reload);
        assert!(app.reload_requested);

        app.begin_reload();
        assert_eq!(app.state, AppState::Loading);
        assert!(!app.reload_requested);
        assert_eq!(app.total_lines(), 0);
        assert!(app.table.rows().is_empty());
    }

    #[test]
    fn test_stream_cannot_reload() {
        let parser = Arc::new(EntryParser::new(&Config::default()));
        let mut app = App::new("<stdin>", LogTable::new(parser, true, true), false);

        app.apply_event(AppEvent::Reload);
        assert!(!app.reload_requested);
        assert!(app.status.is_some());
    }

    #[test]
    fn test_help_toggle() {
        let mut app = app();
        app.apply_event(AppEvent::ShowHelp);
        assert!(app.show_help);
        app.apply_event(AppEvent::HideHelp);
        assert!(!app.show_help);
    }
}
