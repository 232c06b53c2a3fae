//! Background search worker.
//!
//! One search runs at a time on its own OS thread. The control side starts
//! it with [`SearchEngine::go`] and ends it with [`SearchEngine::stop`],
//! which raises the shared stop flag and blocks on a condition variable
//! until the worker reports that it has finished.

use log::{debug, error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::core::position::Position;

use super::searcher::Searcher;
use super::types::{SearchLimits, SearchObserver, SearchResult};

const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Searching,
    /// Ended by a stop request
    Stopped,
    /// Ended by reaching its limits
    Completed,
}

struct Shared {
    searcher: Mutex<Searcher>,
    state: Mutex<EngineState>,
    condvar: Condvar,
    stop: Arc<AtomicBool>,
    last_result: Mutex<Option<SearchResult>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SearchEngine {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl SearchEngine {
    pub fn new(searcher: Searcher) -> Self {
        let stop = searcher.stop_flag();
        SearchEngine {
            shared: Arc::new(Shared {
                searcher: Mutex::new(searcher),
                state: Mutex::new(EngineState::Idle),
                condvar: Condvar::new(),
                stop,
                last_result: Mutex::new(None),
            }),
            handle: None,
        }
    }

    pub fn state(&self) -> EngineState {
        *lock(&self.shared.state)
    }

    pub fn is_searching(&self) -> bool {
        self.state() == EngineState::Searching
    }

    /// Start searching a copy of `position`. Returns false, doing nothing,
    /// while another search is running.
    pub fn go(&mut self, position: &Position, limits: SearchLimits, observer: Box<dyn SearchObserver>) -> bool {
        {
            let mut state = lock(&self.shared.state);
            if *state == EngineState::Searching {
                debug!(target: "kestrel::search", "go ignored, already searching");
                return false;
            }
            *state = EngineState::Searching;
        }
        self.reap();
        self.shared.stop.store(false, Ordering::Relaxed);
        *lock(&self.shared.last_result) = None;

        let shared = Arc::clone(&self.shared);
        let mut position = position.clone();
        let spawned = std::thread::Builder::new()
            .name("kestrel-search".to_string())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let result = {
                    let mut searcher = lock(&shared.searcher);
                    searcher.set_observer(observer);
                    searcher.search(&mut position, &limits)
                };
                let stopped = result.stopped;
                *lock(&shared.last_result) = Some(result);

                let mut state = lock(&shared.state);
                *state = if stopped {
                    EngineState::Stopped
                } else {
                    EngineState::Completed
                };
                shared.condvar.notify_all();
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                true
            }
            Err(e) => {
                error!(target: "kestrel::search", "failed to spawn search thread: {}", e);
                *lock(&self.shared.state) = EngineState::Idle;
                false
            }
        }
    }

    /// Ask the running search to finish and block until it has. A no-op
    /// when idle.
    pub fn stop(&mut self) {
        if self.state() == EngineState::Searching {
            self.shared.stop.store(true, Ordering::Relaxed);
        }
        self.wait();
    }

    /// Block until the current search, if any, ends on its own
    pub fn wait(&mut self) {
        {
            let mut state = lock(&self.shared.state);
            while *state == EngineState::Searching {
                state = self
                    .shared
                    .condvar
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        }
        self.reap();
    }

    /// Join a finished worker and go back to idle
    fn reap(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(target: "kestrel::search", "search thread panicked");
            }
            let mut state = lock(&self.shared.state);
            if *state != EngineState::Searching {
                *state = EngineState::Idle;
            }
        }
    }

    /// Result of the most recent finished search
    pub fn last_result(&self) -> Option<SearchResult> {
        lock(&self.shared.last_result).clone()
    }

    /// Run `f` on the searcher, waiting for a running search to end first
    pub fn with_searcher<R>(&mut self, f: impl FnOnce(&mut Searcher) -> R) -> R {
        self.wait();
        let mut searcher = lock(&self.shared.searcher);
        f(&mut searcher)
    }
}

impl Drop for SearchEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moves::Move;
    use crate::engine::search::types::SearchInfo;
    use std::sync::mpsc;
    use std::time::Duration;

    struct ChannelObserver(mpsc::Sender<Option<Move>>);

    impl SearchObserver for ChannelObserver {
        fn info(&mut self, _info: &SearchInfo) {}

        fn best_move(&mut self, best: Option<Move>, _ponder: Option<Move>) {
            let _ = self.0.send(best);
        }
    }

    #[test]
    fn test_go_and_complete() {
        let mut engine = SearchEngine::new(Searcher::default());
        let (tx, rx) = mpsc::channel();
        assert!(engine.go(&Position::startpos(), SearchLimits::depth(2), Box::new(ChannelObserver(tx))));
        let best = rx.recv_timeout(Duration::from_secs(30)).unwrap();
        assert!(best.is_some());
        engine.wait();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.last_result().is_some());
    }

    #[test]
    fn test_stop_infinite_search() {
        let mut engine = SearchEngine::new(Searcher::default());
        let (tx, rx) = mpsc::channel();
        let limits = SearchLimits {
            infinite: true,
            ..Default::default()
        };
        assert!(engine.go(&Position::startpos(), limits.clone(), Box::new(ChannelObserver(tx))));
        assert!(engine.is_searching());

        // A second go while searching is ignored
        let (tx2, _rx2) = mpsc::channel();
        assert!(!engine.go(&Position::startpos(), limits, Box::new(ChannelObserver(tx2))));

        std::thread::sleep(Duration::from_millis(50));
        engine.stop();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(rx.try_recv().unwrap().is_some());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut engine = SearchEngine::new(Searcher::default());
        engine.stop();
        assert_eq!(engine.state(), EngineState::Idle);
    }
}
