use super::ClientId;
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Identifies one armed timer; never reused within a scheduler
pub type TimerId = u64;

enum TimerCommand {
    Arm {
        client_id: ClientId,
        timer: TimerId,
        deadline: Instant,
    },
    Cancel {
        timer: TimerId,
    },
}

/// One-shot per-client expiry timers driven by a background thread
///
/// The scheduler only reports that a timer ran out. Whether that timer is
/// still the client's current one is decided by the caller under its own
/// lock, which is what makes cancellation take effect immediately.
pub struct TimeoutScheduler {
    commands: Option<Sender<TimerCommand>>,
    handle: Option<JoinHandle<()>>,
    next_timer: AtomicU64,
}

impl TimeoutScheduler {
    /// Spawn the timer thread; `on_expire` runs on it for every due timer
    pub fn start<F>(on_expire: F) -> Self
    where
        F: Fn(ClientId, TimerId) + Send + 'static,
    {
        let (tx, rx) = unbounded();

        let handle = thread::Builder::new()
            .name("bayeux-timeouts".to_string())
            .spawn(move || {
                info!("Timeout scheduler started");
                let mut deadlines: BTreeMap<(Instant, TimerId), ClientId> = BTreeMap::new();
                let mut armed: HashMap<TimerId, Instant> = HashMap::new();

                loop {
                    let now = Instant::now();
                    while let Some(entry) = deadlines.first_entry() {
                        if entry.key().0 > now {
                            break;
                        }
                        let ((_, timer), client_id) = entry.remove_entry();
                        armed.remove(&timer);
                        debug!("Timer {} expired for client {}", timer, client_id);
                        on_expire(client_id, timer);
                    }

                    let command = match deadlines.keys().next() {
                        Some((deadline, _)) => {
                            rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                        }
                        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match command {
                        Ok(TimerCommand::Arm {
                            client_id,
                            timer,
                            deadline,
                        }) => {
                            deadlines.insert((deadline, timer), client_id);
                            armed.insert(timer, deadline);
                        }
                        Ok(TimerCommand::Cancel { timer }) => {
                            if let Some(deadline) = armed.remove(&timer) {
                                deadlines.remove(&(deadline, timer));
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                info!("Timeout scheduler stopped");
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to spawn timeout thread, clients will not expire: {}", e);
                None
            }
        };

        Self {
            commands: Some(tx),
            handle,
            next_timer: AtomicU64::new(1),
        }
    }

    /// Arm a timer for `client_id` firing after `after`
    pub fn arm(&self, client_id: ClientId, after: Duration) -> TimerId {
        let timer = self.next_timer.fetch_add(1, Ordering::Relaxed);
        let Some(deadline) = Instant::now().checked_add(after) else {
            warn!("Timer for client {} is out of range, not armed", client_id);
            return timer;
        };
        if let Some(tx) = &self.commands {
            let _ = tx.send(TimerCommand::Arm {
                client_id,
                timer,
                deadline,
            });
        }
        timer
    }

    /// Forget a pending timer; a no-op if it already fired
    pub fn cancel(&self, timer: TimerId) {
        if let Some(tx) = &self.commands {
            let _ = tx.send(TimerCommand::Cancel { timer });
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimeoutScheduler {
    fn drop(&mut self) {
        // Closing the channel stops the thread.
        self.commands.take();
        if let Some(handle) = self.handle.take() {
            // The last engine handle may be released from inside an expiry
            // callback, in which case the thread is left to exit on its own.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}
