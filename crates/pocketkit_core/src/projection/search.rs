//! Search-as-you-type with a cancellable delay.
//!
//! # Invariants
//! - Each keystroke restarts the delay and replaces the pending query.
//! - Results computed for a superseded generation are discarded.
//! - An empty query yields empty results without running a search.

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Searcher<T> = Box<dyn Fn(&str) -> Vec<T> + Send>;

enum Command {
    Search { generation: u64, text: String },
    Shutdown,
}

struct SearchState<T> {
    results: RwLock<Arc<Vec<T>>>,
    query: Mutex<String>,
    generation: AtomicU64,
    executed: AtomicU64,
}

impl<T> SearchState<T> {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }
}

pub struct DebouncedSearch<T> {
    commands: Sender<Command>,
    state: Arc<SearchState<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> DebouncedSearch<T> {
    /// Starts the search worker; `searcher` runs only on that worker.
    pub fn new(
        delay: Duration,
        searcher: impl Fn(&str) -> Vec<T> + Send + 'static,
    ) -> std::io::Result<Self> {
        let (commands, receiver) = unbounded();
        let state = Arc::new(SearchState {
            results: RwLock::new(Arc::new(Vec::new())),
            query: Mutex::new(String::new()),
            generation: AtomicU64::new(0),
            executed: AtomicU64::new(0),
        });

        let worker_state = Arc::clone(&state);
        let searcher: Searcher<T> = Box::new(searcher);
        let worker = thread::Builder::new()
            .name("pocketkit-search".to_string())
            .spawn(move || run_worker(receiver, &worker_state, &searcher, delay))?;

        Ok(Self {
            commands,
            state,
            worker: Some(worker),
        })
    }

    /// Replaces the query text, cancelling any search still waiting.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        *self.state.query.lock() = text.clone();
        let generation = self.state.generation.fetch_add(1, Ordering::AcqRel) + 1;

        if text.is_empty() {
            *self.state.results.write() = Arc::new(Vec::new());
            return;
        }
        self.send(Command::Search { generation, text });
    }

    /// Cancels the pending search and empties the results.
    pub fn clear(&self) {
        self.set_query(String::new());
    }

    /// Schedules the current query again, e.g. after the data changed.
    pub fn refresh(&self) {
        let text = self.state.query.lock().clone();
        if text.is_empty() {
            return;
        }
        let generation = self.state.generation.load(Ordering::Acquire);
        self.send(Command::Search { generation, text });
    }

    pub fn query(&self) -> String {
        self.state.query.lock().clone()
    }

    pub fn results(&self) -> Arc<Vec<T>> {
        self.state.results.read().clone()
    }

    /// Searches actually executed by the worker.
    pub fn executed_searches(&self) -> u64 {
        self.state.executed.load(Ordering::Acquire)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("event=search_schedule module=projection status=error error_code=worker_gone");
        }
    }
}

impl<T> Drop for DebouncedSearch<T> {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                warn!("event=search_shutdown module=projection status=error error_code=worker_panicked");
            }
        }
    }
}

fn run_worker<T>(
    receiver: Receiver<Command>,
    state: &SearchState<T>,
    searcher: &Searcher<T>,
    delay: Duration,
) {
    let mut pending: Option<(u64, String)> = None;
    loop {
        let received = match pending {
            None => receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
            Some(_) => receiver.recv_timeout(delay),
        };

        match received {
            Ok(Command::Search { generation, text }) => pending = Some((generation, text)),
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if let Some((generation, text)) = pending.take() {
                    execute(state, searcher, generation, &text);
                }
            }
        }
    }
}

fn execute<T>(state: &SearchState<T>, searcher: &Searcher<T>, generation: u64, text: &str) {
    if !state.is_current(generation) {
        debug!("event=search_run module=projection status=skip reason=superseded");
        return;
    }

    let found = searcher(text);
    state.executed.fetch_add(1, Ordering::AcqRel);

    if !state.is_current(generation) {
        debug!("event=search_run module=projection status=skip reason=stale_result");
        return;
    }
    let count = found.len();
    *state.results.write() = Arc::new(found);
    debug!("event=search_run module=projection status=ok results={count}");
}
