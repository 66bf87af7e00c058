use crate::event::AppEvent;
use crate::streamer::StreamUpdate;

/// Translate a streamer update into app events
pub fn handle_stream_update(update: StreamUpdate) -> Vec<AppEvent> {
    match update {
        StreamUpdate::Snapshot(index) => vec![AppEvent::EntriesUpdated(index)],
        StreamUpdate::Failed(err) => vec![AppEvent::SourceFailed {
            truncated: err.is_truncation(),
            message: err.to_string(),
        }],
    }
}
