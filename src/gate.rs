//! The lock gate: decides whether the protected console is usable.
//!
//! A super-admin can revoke console access at any moment. The gate tracks
//! that external signal with two sources -- a fixed-interval poll of the
//! status endpoint and a push feed over WebSocket -- composed behind a
//! single reconciler that applies updates in arrival order, last update
//! wins. The merged state is published through a `watch` channel so any
//! number of consumers can react to transitions.
//!
//! Failure never corrupts the state: a failed or malformed status read is
//! logged and the previous state stands. The gate fails to *last known*,
//! never to unlocked and never to a crash.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::ApiClient;
use crate::config::ConsoleConfig;
use crate::push::run_push_source;
use crate::retry::RetryPolicy;

/// The gate's state machine.
///
/// `Checking` exists only until the first successful status resolution;
/// after that the state is always a definite boolean and flips between
/// `Unlocked` and `Locked` for the lifetime of the gate. Consumers should
/// render nothing while `Checking` -- flashing protected content before
/// authorization is confirmed is exactly what the initial state prevents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Initial determination is still outstanding.
    Checking,
    /// The console is usable.
    Unlocked,
    /// Access has been revoked; only the lock screen should be reachable.
    Locked,
}

impl LockState {
    /// `true` only for [`LockState::Locked`].
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Locked)
    }

    /// `true` once the initial determination has resolved either way.
    pub fn is_definite(self) -> bool {
        !matches!(self, Self::Checking)
    }

    fn from_locked(locked: bool) -> Self {
        if locked { Self::Locked } else { Self::Unlocked }
    }
}

/// Which source produced a status update. Logged on transitions; the
/// reconciler itself treats both sources identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Poll,
    Push,
}

/// One resolved status observation on its way to the reconciler.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StatusUpdate {
    pub locked: bool,
    pub source: Source,
}

/// Spawns the gate's background tasks.
pub struct LockGate;

impl LockGate {
    /// Start the gate: one poll source, one push source, one reconciler.
    ///
    /// The poll source issues an immediate initial status check and then
    /// polls at `config.poll_interval`; the push source holds the status
    /// feed open, reconnecting at `config.push_reconnect_delay` forever.
    /// Consumers observe the merged state via [`GateHandle::subscribe`].
    pub fn spawn(client: ApiClient, config: &ConsoleConfig) -> GateHandle {
        let (state_tx, state_rx) = watch::channel(LockState::Checking);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (update_tx, update_rx) = mpsc::channel(16);

        let poll = tokio::spawn(run_poll_source(
            client.clone(),
            config.poll_interval,
            update_tx.clone(),
            shutdown_rx.clone(),
        ));
        let push = tokio::spawn(run_push_source(
            client.push_feed_url(),
            client.app_id().to_string(),
            RetryPolicy::fixed(config.push_reconnect_delay),
            update_tx,
            shutdown_rx.clone(),
        ));
        let reconciler = tokio::spawn(run_reconciler(update_rx, state_tx, shutdown_rx));

        GateHandle {
            state_rx,
            shutdown_tx,
            tasks: Arc::new(Mutex::new(Some(GateTasks {
                reconciler,
                sources: vec![poll, push],
            }))),
        }
    }
}

struct GateTasks {
    reconciler: JoinHandle<()>,
    sources: Vec<JoinHandle<()>>,
}

/// Handle for observing and controlling a running lock gate.
///
/// Dropping the last handle stops the gate: the background tasks observe
/// the closed shutdown channel and exit on their own, without being joined.
/// Call [`shutdown`](GateHandle::shutdown) instead to wait for teardown
/// deterministically.
///
/// `Clone` is cheap: all fields are channel handles or `Arc`-wrapped.
#[derive(Clone)]
pub struct GateHandle {
    state_rx: watch::Receiver<LockState>,
    shutdown_tx: watch::Sender<bool>,
    /// Taken and awaited exactly once by [`shutdown`](GateHandle::shutdown).
    tasks: Arc<Mutex<Option<GateTasks>>>,
}

impl GateHandle {
    /// The current lock state.
    pub fn state(&self) -> LockState {
        *self.state_rx.borrow()
    }

    /// Subscribe to lock state changes.
    ///
    /// The receiver sees every transition; unchanged reads (e.g. a poll
    /// confirming the current state) do not wake it.
    pub fn subscribe(&self) -> watch::Receiver<LockState> {
        self.state_rx.clone()
    }

    /// Stop the gate and wait for its tasks to exit.
    ///
    /// Source tasks are aborted after signaling so a poll blocked on a
    /// status request or a push transport mid-connect does not delay
    /// teardown. Calling `shutdown` more than once is safe -- subsequent
    /// calls return immediately.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);

        let tasks = self.tasks.lock().await.take();
        if let Some(GateTasks {
            reconciler,
            sources,
        }) = tasks
        {
            for source in sources {
                source.abort();
                let _ = source.await;
            }
            let _ = reconciler.await;
        }
    }
}

/// Poll the status endpoint on a fixed cadence.
///
/// The first tick fires immediately, which doubles as the gate's initial
/// status check. Failures are logged and produce no update, so the
/// reconciler keeps the previous state.
async fn run_poll_source(
    client: ApiClient,
    interval: std::time::Duration,
    updates: mpsc::Sender<StatusUpdate>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match client.status().await {
                    Ok(report) => {
                        let update = StatusUpdate {
                            locked: report.locked(),
                            source: Source::Poll,
                        };
                        if updates.send(update).await.is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "status poll failed, keeping previous lock state");
                    }
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return;
                }
            }
        }
    }
}

/// Apply status updates in arrival order; the last update wins.
///
/// This is the only writer of the lock state. No sequence numbers, no
/// merging -- acceptable because the state is a simple boolean projection,
/// not a multi-writer structure.
async fn run_reconciler(
    mut updates: mpsc::Receiver<StatusUpdate>,
    state_tx: watch::Sender<LockState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => apply_update(&state_tx, update),
                // Both sources gone; nothing further can arrive.
                None => return,
            },
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return;
                }
            }
        }
    }
}

fn apply_update(state_tx: &watch::Sender<LockState>, update: StatusUpdate) {
    let next = LockState::from_locked(update.locked);
    let changed = state_tx.send_if_modified(|state| {
        if *state == next {
            return false;
        }
        *state = next;
        true
    });
    if changed {
        tracing::info!(state = ?next, source = ?update.source, "lock state changed");
    }
}

/// Run a protected task under the gate's supervision.
///
/// While the state is `Unlocked`, one task built by `factory` runs; a
/// transition to `Locked` aborts it (unmount), and a later transition back
/// to `Unlocked` builds a fresh one -- no state carries over from a
/// previous unlocked session, so remounted views re-fetch their data.
/// Nothing runs while the state is `Checking`.
///
/// Aborting the protected task does not destructively cancel its in-flight
/// one-shot requests; they complete on the backend and are simply ignored.
///
/// The supervisor exits (tearing down any protected task) when the gate
/// shuts down and the state channel closes.
pub fn supervise<F, Fut>(mut states: watch::Receiver<LockState>, mut factory: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut protected: Option<JoinHandle<()>> = None;
        loop {
            match *states.borrow_and_update() {
                LockState::Unlocked => {
                    if protected.is_none() {
                        tracing::info!("gate unlocked: mounting protected views");
                        protected = Some(tokio::spawn(factory()));
                    }
                }
                LockState::Locked => {
                    if let Some(task) = protected.take() {
                        tracing::info!("gate locked: unmounting protected views");
                        task.abort();
                    }
                }
                // Render nothing until the first definite resolution.
                LockState::Checking => {}
            }

            if states.changed().await.is_err() {
                if let Some(task) = protected.take() {
                    task.abort();
                }
                return;
            }
        }
    })
}
