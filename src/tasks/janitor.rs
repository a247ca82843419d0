//! Janitor Task
//!
//! Background task that periodically removes expired cache entries.
//!
//! The task is stopped through a `watch` channel: `request_stop` never blocks,
//! and dropping the [`Janitor`] (and with it the sender) ends the task too.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::StoreState;

// == Janitor State ==
/// Lifecycle of the sweep task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JanitorState {
    Running,
    StopRequested,
    Stopped,
}

impl JanitorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => JanitorState::Running,
            1 => JanitorState::StopRequested,
            _ => JanitorState::Stopped,
        }
    }
}

// == Janitor Status ==
/// Read-only view of a janitor's state, usable while the janitor itself is
/// borrowed elsewhere.
#[derive(Debug, Clone)]
pub struct JanitorStatus(Arc<AtomicU8>);

impl JanitorStatus {
    pub fn get(&self) -> JanitorState {
        JanitorState::from_u8(self.0.load(Ordering::Acquire))
    }
}

// == Janitor ==
/// Handle to a running sweep task.
#[derive(Debug)]
pub struct Janitor {
    shutdown: watch::Sender<bool>,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl Janitor {
    /// Spawns the sweep task on `runtime`, sweeping `store` every `interval`.
    ///
    /// `interval` must be non-zero.
    pub fn spawn(runtime: &Handle, store: Arc<RwLock<StoreState>>, interval: Duration) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let state = Arc::new(AtomicU8::new(JanitorState::Running as u8));

        let handle = runtime.spawn(run(store, interval, shutdown_rx, Arc::clone(&state)));

        Self {
            shutdown,
            state,
            handle: Some(handle),
        }
    }

    pub fn state(&self) -> JanitorState {
        JanitorState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn status(&self) -> JanitorStatus {
        JanitorStatus(Arc::clone(&self.state))
    }

    /// Signals the task to stop without waiting for it.
    pub fn request_stop(&self) {
        let _ = self.state.compare_exchange(
            JanitorState::Running as u8,
            JanitorState::StopRequested as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        // Err only means the task already exited
        let _ = self.shutdown.send(true);
    }

    /// Signals the task to stop and waits for it to finish.
    pub async fn stop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Janitor task ended abnormally: {}", e);
            }
        }
        self.state.store(JanitorState::Stopped as u8, Ordering::Release);
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.request_stop();
    }
}

// == Sweep Loop ==
async fn run(
    store: Arc<RwLock<StoreState>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    state: Arc<AtomicU8>,
) {
    info!("Starting janitor with interval of {:?}", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // Err means every sender is gone
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Janitor stopping");
                    break;
                }
            }
            _ = ticker.tick() => {
                let removed = {
                    let mut guard = store.write().await;
                    guard.purge_expired()
                };

                if removed > 0 {
                    info!("Janitor sweep: removed {} expired entries", removed);
                } else {
                    debug!("Janitor sweep: no expired entries found");
                }
            }
        }
    }

    state.store(JanitorState::Stopped as u8, Ordering::Release);
}
