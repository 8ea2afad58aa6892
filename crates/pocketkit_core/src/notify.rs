//! Debounced, payload-less change notification.
//!
//! # Responsibility
//! - Collapse bursts of commit signals into one delivery per quiet window.
//! - Deliver to subscribers on a dedicated dispatcher thread.
//!
//! # Invariants
//! - Handlers never run on the thread that called `notify()`.
//! - A burst is delivered at most `max_delay` after its first signal.
//! - A dropped `Subscription` is never invoked by a later dispatch.
//! - The dispatcher thread exits once every notifier clone is dropped.

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

type Handler = Arc<dyn Fn() + Send + Sync>;

struct Entry {
    handler: Handler,
    active: Arc<AtomicBool>,
}

type Registry = Mutex<BTreeMap<u64, Entry>>;

struct NotifierInner {
    signals: Sender<()>,
    registry: Arc<Registry>,
    next_id: AtomicU64,
    deliveries: Arc<AtomicU64>,
}

/// Commit-triggered change notifier shared by one store.
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<NotifierInner>,
}

impl ChangeNotifier {
    /// Starts the dispatcher thread.
    ///
    /// `debounce` is the quiet window; `max_delay` caps how long a steady
    /// stream of signals can postpone delivery.
    pub fn new(debounce: Duration, max_delay: Duration) -> std::io::Result<Self> {
        let (signals, receiver) = unbounded();
        let registry: Arc<Registry> = Arc::new(Mutex::new(BTreeMap::new()));
        let deliveries = Arc::new(AtomicU64::new(0));

        let worker_registry = Arc::clone(&registry);
        let worker_deliveries = Arc::clone(&deliveries);
        let max_delay = max_delay.max(debounce);
        thread::Builder::new()
            .name("pocketkit-notify".to_string())
            .spawn(move || {
                run_dispatcher(
                    receiver,
                    &worker_registry,
                    &worker_deliveries,
                    debounce,
                    max_delay,
                )
            })?;

        Ok(Self {
            inner: Arc::new(NotifierInner {
                signals,
                registry,
                next_id: AtomicU64::new(1),
                deliveries,
            }),
        })
    }

    /// Records that committed data changed. Never blocks on handlers.
    pub fn notify(&self) {
        if self.inner.signals.send(()).is_err() {
            warn!("event=notify_signal module=notify status=error error_code=dispatcher_gone");
        }
    }

    /// Registers `handler`; it stays registered while the returned
    /// `Subscription` is alive.
    pub fn subscribe(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.inner.registry.lock().insert(
            id,
            Entry {
                handler: Arc::new(handler),
                active: Arc::clone(&active),
            },
        );
        Subscription {
            id,
            active,
            registry: Arc::downgrade(&self.inner.registry),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Number of debounced deliveries dispatched so far.
    pub fn deliveries(&self) -> u64 {
        self.inner.deliveries.load(Ordering::Acquire)
    }
}

/// Scoped registration returned by [`ChangeNotifier::subscribe`].
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Explicit form of dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(&self.id);
        }
    }
}

fn run_dispatcher(
    receiver: Receiver<()>,
    registry: &Registry,
    deliveries: &AtomicU64,
    debounce: Duration,
    max_delay: Duration,
) {
    while receiver.recv().is_ok() {
        let burst_started = Instant::now();
        let cap = burst_started + max_delay;
        let mut deadline = (burst_started + debounce).min(cap);
        let mut disconnected = false;
        let mut collapsed = 1u64;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match receiver.recv_timeout(deadline - now) {
                Ok(()) => {
                    collapsed += 1;
                    deadline = (Instant::now() + debounce).min(cap);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        dispatch(registry, collapsed);
        deliveries.fetch_add(1, Ordering::AcqRel);
        if disconnected {
            break;
        }
    }
    debug!("event=notify_stop module=notify status=ok");
}

fn dispatch(registry: &Registry, collapsed: u64) {
    // Snapshot first so handlers may subscribe/unsubscribe without deadlock.
    let entries: Vec<(Handler, Arc<AtomicBool>)> = registry
        .lock()
        .values()
        .map(|entry| (Arc::clone(&entry.handler), Arc::clone(&entry.active)))
        .collect();

    debug!(
        "event=notify_dispatch module=notify status=ok subscribers={} collapsed_signals={}",
        entries.len(),
        collapsed
    );

    for (handler, active) in entries {
        if !active.load(Ordering::Acquire) {
            continue;
        }
        if catch_unwind(AssertUnwindSafe(|| handler())).is_err() {
            error!("event=notify_dispatch module=notify status=error error_code=handler_panicked");
        }
    }
}
