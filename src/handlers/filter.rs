use crate::event::AppEvent;
use crate::filter::engine::FilterProgress;

/// Process filter progress updates and return corresponding events
pub fn handle_filter_progress(progress: FilterProgress, start: usize) -> Vec<AppEvent> {
    match progress {
        FilterProgress::Complete { index, scanned } => vec![AppEvent::FilterComplete {
            matches: index,
            start,
            scanned,
        }],
        FilterProgress::Error(err) => vec![AppEvent::FilterError(err)],
    }
}
