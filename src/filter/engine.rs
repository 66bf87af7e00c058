use super::Filter;
use crate::cancel::CancelToken;
use crate::index::EntryIndex;
use log::debug;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Outcome of a background filter run
#[derive(Debug, Clone)]
pub enum FilterProgress {
    /// Filtering complete: lines matching from the start position, and the
    /// length of the index that was scanned
    Complete { index: EntryIndex, scanned: usize },
    /// Error occurred
    Error(String),
}

/// Filter engine that processes filters in the background
pub struct FilterEngine;

impl FilterEngine {
    /// Filter the lines of `index` at positions `start..` on a background
    /// thread.
    ///
    /// Nothing is sent if `cancel` fires first; the receiver then observes
    /// a disconnected channel.
    pub fn run_filter(
        index: EntryIndex,
        start: usize,
        filter: Arc<dyn Filter>,
        cancel: CancelToken,
    ) -> Receiver<FilterProgress> {
        let (tx, rx) = channel();

        thread::spawn(move || {
            let started = Instant::now();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                index.filter_from(start, filter.as_ref(), &cancel)
            }));

            let progress = match result {
                Ok(Ok(Some(lines))) => {
                    debug!(
                        "Filtered {} lines to {} in {:?}",
                        index.len().saturating_sub(start),
                        lines.len(),
                        started.elapsed()
                    );
                    FilterProgress::Complete {
                        scanned: index.len(),
                        index: index.derive(lines),
                    }
                }
                Ok(Ok(None)) => {
                    debug!("Filter cancelled after {:?}", started.elapsed());
                    return;
                }
                Ok(Err(e)) => FilterProgress::Error(e.to_string()),
                Err(_) => FilterProgress::Error("Filter thread panicked".to_string()),
            };

            let _ = tx.send(progress);
        });

        rx
    }
}
