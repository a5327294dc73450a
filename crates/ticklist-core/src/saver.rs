use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::datastore::PersistenceAdapter;
use crate::todo::Todo;

#[derive(Debug, Default)]
struct QueueState {
    pending: Option<Vec<Todo>>,
    in_flight: bool,
    shutdown: bool,
    completed: u64,
    coalesced: u64,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    wake: Condvar,
    idle: Condvar,
}

/// Background writer for todo snapshots.
///
/// Holds at most one waiting snapshot and runs at most one save at a time.
/// Scheduling while a snapshot is still waiting replaces it, so a burst of
/// mutations ends up as a single write of the newest list.
#[derive(Debug)]
pub struct SaveQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl SaveQueue {
    #[tracing::instrument(skip(adapter))]
    pub fn spawn(adapter: PersistenceAdapter, debounce: Duration) -> anyhow::Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("ticklist-saver".to_string())
            .spawn(move || run_worker(&worker_shared, &adapter, debounce))
            .context("failed to spawn save worker")?;

        debug!(?debounce, "save queue started");
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    #[tracing::instrument(skip(self, snapshot), fields(count = snapshot.len()))]
    pub fn schedule(&self, snapshot: Vec<Todo>) {
        let mut state = self.shared.state.lock();
        if state.pending.replace(snapshot).is_some() {
            state.coalesced += 1;
            trace!("replaced waiting snapshot");
        }
        self.shared.wake.notify_one();
    }

    /// Blocks until nothing is waiting or being written.
    pub fn flush(&self) {
        let mut state = self.shared.state.lock();
        while state.pending.is_some() || state.in_flight {
            self.shared.idle.wait(&mut state);
        }
    }

    pub fn saves_completed(&self) -> u64 {
        self.shared.state.lock().completed
    }

    pub fn snapshots_coalesced(&self) -> u64 {
        self.shared.state.lock().coalesced
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.wake.notify_all();
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("save worker panicked");
        }
    }
}

fn run_worker(shared: &Shared, adapter: &PersistenceAdapter, debounce: Duration) {
    loop {
        let mut state = shared.state.lock();
        while state.pending.is_none() && !state.shutdown {
            shared.wake.wait(&mut state);
        }
        if state.pending.is_none() {
            break;
        }

        if !debounce.is_zero() {
            let deadline = Instant::now() + debounce;
            while !state.shutdown {
                if shared.wake.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
        }

        let Some(snapshot) = state.pending.take() else {
            continue;
        };
        state.in_flight = true;
        drop(state);

        adapter.save(&snapshot);

        let mut state = shared.state.lock();
        state.in_flight = false;
        state.completed += 1;
        shared.idle.notify_all();
    }

    shared.idle.notify_all();
    debug!("save worker stopped");
}
