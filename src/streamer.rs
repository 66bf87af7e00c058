//! Live tail: keeps an index growing while the source grows.
//!
//! Two workers share one lock-guarded line vector. The reader appends to
//! it; the publisher copies whatever is new on every tick into its own
//! [`EntryIndex`] and hands the consumer a clone that shares earlier lines.

use crate::cancel::CancelToken;
use crate::index::{EntryIndex, IndexedLine};
use crate::reader::LineHandle;
use crate::source::{LogSource, SourceError};
use log::{debug, error, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lines appended per lock acquisition while catching up
const READ_BATCH: usize = 4096;

/// Message delivered to the streaming callback
#[derive(Debug)]
pub enum StreamUpdate {
    /// Every line indexed so far
    Snapshot(EntryIndex),
    /// Ingestion stopped; no further updates follow
    Failed(SourceError),
}

type SharedLines = Arc<Mutex<Vec<IndexedLine>>>;

pub struct Streamer {
    cancel: CancelToken,
    handle: LineHandle,
    /// Streams can block in a read indefinitely, files cannot
    may_block: bool,
    reader: Option<JoinHandle<LogSource>>,
    publisher: Option<JoinHandle<()>>,
}

impl Streamer {
    /// Start both workers on `source`.
    ///
    /// `on_update` runs on the publisher thread. The first tick always
    /// publishes, even an empty index. Once the reader stops, one final
    /// snapshot is published, followed by the failure if there was one.
    pub fn start<F>(source: LogSource, poll: Duration, on_update: F) -> Self
    where
        F: Fn(StreamUpdate) + Send + 'static,
    {
        let cancel = CancelToken::new();
        let handle = source.handle();
        let may_block = source.path().is_none();
        let shared: SharedLines = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();

        info!("Streaming {} (poll every {:?})", source.name(), poll);

        let reader = {
            let shared = Arc::clone(&shared);
            let cancel = cancel.clone();
            thread::spawn(move || run_reader(source, shared, cancel, poll, done_tx))
        };

        let publisher = {
            let cancel = cancel.clone();
            let handle = handle.clone();
            thread::spawn(move || run_publisher(handle, shared, cancel, poll, done_rx, on_update))
        };

        Self {
            cancel,
            handle,
            may_block,
            reader: Some(reader),
            publisher: Some(publisher),
        }
    }

    pub fn handle(&self) -> &LineHandle {
        &self.handle
    }

    /// Cancel both workers and close the source.
    ///
    /// The publisher stops within one tick. A reader blocked inside a read
    /// cannot be interrupted; it is left to exit on its own and only the
    /// random-access handle is closed here.
    pub fn stop(mut self) -> Result<(), SourceError> {
        self.cancel.cancel();

        if let Some(publisher) = self.publisher.take() {
            if publisher.join().is_err() {
                error!("Publisher thread panicked");
            }
        }

        match self.reader.take() {
            Some(reader) if !self.may_block || reader.is_finished() => match reader.join() {
                Ok(source) => source.close(),
                Err(_) => {
                    error!("Reader thread panicked");
                    self.handle.close()
                }
            },
            Some(_) => {
                warn!(
                    "Reader of {} is blocked in a read, detaching it",
                    self.handle.name()
                );
                self.handle.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for Streamer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn lock_lines(shared: &SharedLines) -> std::sync::MutexGuard<'_, Vec<IndexedLine>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_reader(
    mut source: LogSource,
    shared: SharedLines,
    cancel: CancelToken,
    poll: Duration,
    done: Sender<Option<SourceError>>,
) -> LogSource {
    let outcome = read_until_done(&mut source, &shared, &cancel, poll);
    // The publisher may already be gone after a cancel
    let _ = done.send(outcome);
    source
}

fn read_until_done(
    source: &mut LogSource,
    shared: &SharedLines,
    cancel: &CancelToken,
    poll: Duration,
) -> Option<SourceError> {
    let mut batch = Vec::new();

    loop {
        if cancel.is_cancelled() {
            debug!("Reader of {} cancelled", source.name());
            return None;
        }

        match source.next_line() {
            Ok(Some(line)) => {
                batch.push(line);
                if batch.len() >= READ_BATCH {
                    lock_lines(shared).append(&mut batch);
                }
            }
            Ok(None) => {
                if !source.can_follow() {
                    batch.extend(source.finish());
                    lock_lines(shared).append(&mut batch);
                    info!("Finished reading {} at byte {}", source.name(), source.offset());
                    return None;
                }

                if !batch.is_empty() {
                    lock_lines(shared).append(&mut batch);
                }
                if cancel.wait_timeout(poll) {
                    return None;
                }
                if let Err(e) = source.check_truncation() {
                    warn!("{}", e);
                    return Some(e);
                }
            }
            Err(e) => {
                lock_lines(shared).append(&mut batch);
                error!("Reading {} failed: {}", source.name(), e);
                return Some(e);
            }
        }
    }
}

fn run_publisher<F>(
    handle: LineHandle,
    shared: SharedLines,
    cancel: CancelToken,
    poll: Duration,
    done: Receiver<Option<SourceError>>,
    on_update: F,
) where
    F: Fn(StreamUpdate),
{
    let mut published = EntryIndex::empty(handle.clone());
    let mut last_len: Option<usize> = None;

    // Only lines not yet published are copied; snapshots share the rest
    let mut publish = |published: &mut EntryIndex| {
        let fresh: Vec<IndexedLine> = lock_lines(&shared)
            .get(published.len()..)
            .map(<[IndexedLine]>::to_vec)
            .unwrap_or_default();
        published.extend(fresh);
        if last_len != Some(published.len()) {
            last_len = Some(published.len());
            on_update(StreamUpdate::Snapshot(published.clone()));
        }
    };

    loop {
        let outcome = match done.recv_timeout(poll) {
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    return;
                }
                publish(&mut published);
                continue;
            }
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Disconnected) => None,
        };

        if cancel.is_cancelled() {
            return;
        }
        publish(&mut published);
        if let Some(e) = outcome {
            on_update(StreamUpdate::Failed(e));
        }
        debug!("Publisher of {} finished", handle.name());
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{append_lines, write_lines};
    use std::io::Cursor;
    use std::time::Instant;

    const POLL: Duration = Duration::from_millis(20);
    const WAIT: Duration = Duration::from_secs(5);

    fn start(source: LogSource) -> (Streamer, Receiver<StreamUpdate>) {
        let (tx, rx) = mpsc::channel();
        let streamer = Streamer::start(source, POLL, move |update| {
            let _ = tx.send(update);
        });
        (streamer, rx)
    }

    /// Receive snapshots until one has `len` lines
    fn wait_for_len(rx: &Receiver<StreamUpdate>, len: usize) -> EntryIndex {
        let deadline = Instant::now() + WAIT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(StreamUpdate::Snapshot(index)) if index.len() == len => return index,
                Ok(StreamUpdate::Snapshot(index)) => assert!(index.len() < len),
                Ok(StreamUpdate::Failed(e)) => panic!("unexpected failure: {}", e),
                Err(e) => panic!("no snapshot with {} lines: {:?}", len, e),
            }
        }
    }

    #[test]
    fn test_first_tick_publishes_empty_index() {
        let temp_file = write_lines(&[]);
        let source = LogSource::open(temp_file.path(), u64::MAX).unwrap();
        let (streamer, rx) = start(source);

        let index = wait_for_len(&rx, 0);
        assert!(index.is_empty());

        streamer.stop().unwrap();
    }

    #[test]
    fn test_stream_is_drained_then_publisher_stops() {
        let data = b"{\"msg\":\"a\"}\n{\"msg\":\"b\"}\n{\"msg\":\"c\"}".to_vec();
        let source = LogSource::from_reader(Cursor::new(data), u64::MAX).unwrap();
        let (streamer, rx) = start(source);

        let index = wait_for_len(&rx, 3);
        assert_eq!(index.raw_line(2).unwrap(), b"{\"msg\":\"c\"}");

        // The callback is dropped with the publisher
        assert!(matches!(
            rx.recv_timeout(WAIT),
            Err(RecvTimeoutError::Disconnected)
        ));

        let temp_path = streamer.handle().temp_path().unwrap();
        streamer.stop().unwrap();
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_append_produces_one_snapshot() {
        let temp_file = write_lines(&["one", "two"]);
        let source = LogSource::open(temp_file.path(), u64::MAX).unwrap();
        let (streamer, rx) = start(source);

        wait_for_len(&rx, 2);
        append_lines(&temp_file, &["three"]);

        match rx.recv_timeout(WAIT).unwrap() {
            StreamUpdate::Snapshot(index) => {
                assert_eq!(index.len(), 3);
                assert_eq!(index.raw_line(2).unwrap(), b"three");
            }
            StreamUpdate::Failed(e) => panic!("unexpected failure: {}", e),
        }

        // Nothing changes, nothing is published
        assert!(matches!(
            rx.recv_timeout(POLL * 5),
            Err(RecvTimeoutError::Timeout)
        ));

        streamer.stop().unwrap();
        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_consecutive_snapshots_share_lines() {
        let lines: Vec<String> = (0..5000).map(|i| format!("line {}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let temp_file = write_lines(&refs);
        let source = LogSource::open(temp_file.path(), u64::MAX).unwrap();
        let (streamer, rx) = start(source);

        let before = wait_for_len(&rx, 5000);
        append_lines(&temp_file, &["line 5000"]);
        let after = wait_for_len(&rx, 5001);

        assert!(Arc::ptr_eq(&before.runs()[0], &after.runs()[0]));
        assert_eq!(after.raw_line(5000).unwrap(), b"line 5000");

        streamer.stop().unwrap();
    }

    #[test]
    fn test_partial_line_waits_for_terminator() {
        let temp_file = write_lines(&["one"]);
        let source = LogSource::open(temp_file.path(), u64::MAX).unwrap();
        let (streamer, rx) = start(source);

        wait_for_len(&rx, 1);
        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(temp_file.path())
                .unwrap();
            file.write_all(b"{\"msg\":").unwrap();
            file.flush().unwrap();
        }
        assert!(matches!(
            rx.recv_timeout(POLL * 5),
            Err(RecvTimeoutError::Timeout)
        ));

        append_lines(&temp_file, &["\"late\"}"]);
        let index = wait_for_len(&rx, 2);
        assert_eq!(index.raw_line(1).unwrap(), b"{\"msg\":\"late\"}");

        streamer.stop().unwrap();
    }

    #[test]
    fn test_truncation_is_reported_and_stops_tailing() {
        let temp_file = write_lines(&["first line", "second line"]);
        let source = LogSource::open(temp_file.path(), u64::MAX).unwrap();
        let (streamer, rx) = start(source);

        let before = wait_for_len(&rx, 2);
        temp_file.as_file().set_len(0).unwrap();

        let deadline = Instant::now() + WAIT;
        let failure = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(StreamUpdate::Failed(e)) => break e,
                Ok(StreamUpdate::Snapshot(index)) => assert_eq!(index.len(), before.len()),
                Err(e) => panic!("truncation not reported: {:?}", e),
            }
        };
        assert!(failure.is_truncation());

        append_lines(&temp_file, &["after truncation"]);
        assert!(matches!(
            rx.recv_timeout(POLL * 5),
            Err(RecvTimeoutError::Disconnected)
        ));

        streamer.stop().unwrap();
    }

    #[test]
    fn test_stop_is_prompt() {
        let temp_file = write_lines(&["one"]);
        let source = LogSource::open(temp_file.path(), u64::MAX).unwrap();
        let (tx, rx) = mpsc::channel();
        let streamer = Streamer::start(source, Duration::from_secs(60), move |update| {
            let _ = tx.send(update);
        });

        let started = Instant::now();
        streamer.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            rx.recv_timeout(WAIT),
            Err(RecvTimeoutError::Disconnected)
        ));
    }
}
