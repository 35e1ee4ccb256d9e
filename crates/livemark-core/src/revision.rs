//! Document revisions, background parsing and reparse debouncing.
//!
//! Every text change bumps a shared [`RevisionCounter`]. Parse requests
//! carry the revision they were made for; the worker skips requests that
//! are already stale when it dequeues them, and the session drops results
//! whose revision is no longer current. Nothing is ever cancelled mid-parse.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use web_time::Instant;

use crate::error::WorkerError;
use crate::parse::{ParseOptions, ParsedDocument, parse_document};

/// Monotonic document revision, shared with the worker.
#[derive(Debug, Clone, Default)]
pub struct RevisionCounter(Arc<AtomicU64>);

impl RevisionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advance and return the new revision.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

#[derive(Debug, Clone)]
pub struct ParseRequest {
    pub generation: u64,
    pub text: String,
    pub options: ParseOptions,
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub generation: u64,
    pub document: ParsedDocument,
}

enum WorkerInput {
    Parse(ParseRequest),
    Shutdown,
}

/// A background thread that parses documents.
pub struct ParseWorker {
    input: Sender<WorkerInput>,
    output: Receiver<ParseOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl ParseWorker {
    pub fn spawn(counter: RevisionCounter) -> Result<Self, WorkerError> {
        let (input, requests) = mpsc::channel();
        let (results, output) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("livemark-parse".into())
            .spawn(move || worker_loop(requests, results, counter))?;
        Ok(Self {
            input,
            output,
            handle: Some(handle),
        })
    }

    pub fn request(&self, request: ParseRequest) -> Result<(), WorkerError> {
        self.input
            .send(WorkerInput::Parse(request))
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Next finished parse, if any, without blocking.
    pub fn try_recv(&self) -> Result<Option<ParseOutcome>, WorkerError> {
        match self.output.try_recv() {
            Ok(outcome) => Ok(Some(outcome)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<ParseOutcome>, WorkerError> {
        match self.output.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }
}

impl Drop for ParseWorker {
    fn drop(&mut self) {
        let _ = self.input.send(WorkerInput::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ParseWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseWorker")
            .field("running", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

fn worker_loop(
    requests: Receiver<WorkerInput>,
    results: Sender<ParseOutcome>,
    counter: RevisionCounter,
) {
    while let Ok(WorkerInput::Parse(mut request)) = requests.recv() {
        // Only the newest queued request can still be current.
        let mut shutdown = false;
        loop {
            match requests.try_recv() {
                Ok(WorkerInput::Parse(newer)) => request = newer,
                Ok(WorkerInput::Shutdown) => {
                    shutdown = true;
                    break;
                }
                Err(_) => break,
            }
        }
        if shutdown {
            break;
        }

        if !counter.is_current(request.generation) {
            tracing::trace!(
                target: "livemark::parse",
                generation = request.generation,
                current = counter.current(),
                "skipping superseded parse request"
            );
            continue;
        }

        let started = Instant::now();
        let generation = request.generation;
        let document = parse_document(request.text, request.options);
        tracing::debug!(
            target: "livemark::parse",
            generation,
            elapsed_us = started.elapsed().as_micros() as u64,
            "background parse finished"
        );
        if results.send(ParseOutcome { generation, document }).is_err() {
            break;
        }
    }
}

/// Coalesces bursts of edits into one reparse after a quiet window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Restart the window.
    pub fn note_edit(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// `true` once per window: clears the pending edit when due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn counter_bumps_and_checks() {
        let counter = RevisionCounter::new();
        assert!(counter.is_current(0));
        assert_eq!(counter.bump(), 1);
        let shared = counter.clone();
        assert_eq!(shared.bump(), 2);
        assert!(!counter.is_current(1));
        assert!(counter.is_current(2));
    }

    #[test]
    fn debouncer_waits_for_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        assert!(!debouncer.is_due(start));

        debouncer.note_edit(start);
        assert!(!debouncer.is_due(start + Duration::from_millis(50)));

        // Another keystroke restarts the window.
        debouncer.note_edit(start + Duration::from_millis(50));
        assert!(!debouncer.is_due(start + Duration::from_millis(120)));
        assert!(debouncer.take_due(start + Duration::from_millis(150)));
        assert!(!debouncer.take_due(start + Duration::from_millis(200)));
        assert!(!debouncer.is_pending());
    }

    fn request(generation: u64, text: &str) -> ParseRequest {
        ParseRequest {
            generation,
            text: text.to_string(),
            options: ParseOptions::default(),
        }
    }

    #[test]
    fn worker_parses_current_requests() {
        let counter = RevisionCounter::new();
        let worker = ParseWorker::spawn(counter.clone()).unwrap();
        let generation = counter.bump();
        worker.request(request(generation, "# hi")).unwrap();

        let outcome = worker.recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(outcome.generation, generation);
        assert_eq!(outcome.document.text, "# hi");
    }

    #[test]
    fn worker_skips_superseded_requests() {
        let counter = RevisionCounter::new();
        let worker = ParseWorker::spawn(counter.clone()).unwrap();
        counter.bump();
        counter.bump();
        worker.request(request(1, "old")).unwrap();
        worker.request(request(2, "new")).unwrap();

        let outcome = worker.recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(outcome.generation, 2);
        assert_eq!(outcome.document.text, "new");
        assert!(worker.recv_timeout(Duration::from_millis(50)).unwrap().is_none());
    }
}
