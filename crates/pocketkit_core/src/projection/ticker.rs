//! Cancellable periodic callback, used for elapsed-time displays.

use crossbeam::channel::{bounded, tick, Sender};
use crossbeam::select;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Invokes a callback every `interval` on a worker thread until stopped.
///
/// Once [`Ticker::stop`] returns, the callback never runs again.
pub struct Ticker {
    stop: Option<Sender<()>>,
    stopped: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn start(
        interval: Duration,
        mut on_tick: impl FnMut() + Send + 'static,
    ) -> std::io::Result<Self> {
        let (stop, stop_signal) = bounded::<()>(0);
        let stopped = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let worker_stopped = Arc::clone(&stopped);
        let worker_ticks = Arc::clone(&ticks);
        let worker = thread::Builder::new()
            .name("pocketkit-ticker".to_string())
            .spawn(move || {
                let timer = tick(interval);
                loop {
                    select! {
                        recv(stop_signal) -> _ => break,
                        recv(timer) -> _ => {
                            if worker_stopped.load(Ordering::Acquire) {
                                break;
                            }
                            on_tick();
                            worker_ticks.fetch_add(1, Ordering::AcqRel);
                        }
                    }
                }
                debug!("event=ticker_exit module=projection status=ok");
            })?;

        Ok(Self {
            stop: Some(stop),
            stopped,
            ticks,
            worker: Some(worker),
        })
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Stops the ticker and waits for the worker to exit.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        // Disconnecting wakes the worker's select.
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                warn!("event=ticker_stop module=projection status=error error_code=worker_panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
