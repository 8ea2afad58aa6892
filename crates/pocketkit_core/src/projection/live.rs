use crate::notify::Subscription;
use crate::store::Store;
use log::debug;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Loader<T> = Box<dyn Fn() -> T + Send + Sync>;

struct LiveState<T> {
    snapshot: RwLock<Arc<T>>,
    loader: Loader<T>,
    reloads: AtomicU64,
}

impl<T> LiveState<T> {
    fn reload(&self) {
        let next = Arc::new((self.loader)());
        *self.snapshot.write() = next;
        let reloads = self.reloads.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("event=projection_reload module=projection status=ok reloads={reloads}");
    }
}

/// Snapshot that reloads itself after every debounced store change.
///
/// The store subscription lives exactly as long as the projection.
pub struct LiveProjection<T> {
    state: Arc<LiveState<T>>,
    _subscription: Subscription,
}

impl<T: Send + Sync + 'static> LiveProjection<T> {
    /// Loads the first snapshot synchronously and subscribes to `store`.
    pub fn new(store: &Store, loader: impl Fn() -> T + Send + Sync + 'static) -> Self {
        let initial = Arc::new(loader());
        let state = Arc::new(LiveState {
            snapshot: RwLock::new(initial),
            loader: Box::new(loader),
            reloads: AtomicU64::new(0),
        });

        let weak = Arc::downgrade(&state);
        let subscription = store.subscribe(move || {
            if let Some(state) = weak.upgrade() {
                state.reload();
            }
        });

        Self {
            state,
            _subscription: subscription,
        }
    }

    pub fn snapshot(&self) -> Arc<T> {
        self.state.snapshot.read().clone()
    }

    /// Reloads immediately on the calling thread.
    pub fn reload(&self) {
        self.state.reload();
    }

    /// Reloads performed since construction, manual or signalled.
    pub fn reload_count(&self) -> u64 {
        self.state.reloads.load(Ordering::Acquire)
    }
}
