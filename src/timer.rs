use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::trace;

/// Cancellable periodic tick emitter. `start` is idempotent: at most one
/// emitting thread exists at a time, even across rapid stop/start
/// sequences. `stop` cancels future emissions only; an emission already
/// racing the stop flag may still land and is dropped by the receiver's
/// phase guard.
pub struct TickTimer {
    interval: Duration,
    emit: Arc<dyn Fn() + Send + Sync>,
    live: Option<Arc<AtomicBool>>,
}

impl TickTimer {
    pub fn new(interval: Duration, emit: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            interval,
            emit: Arc::new(emit),
            live: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|stop| !stop.load(Ordering::Relaxed))
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let stop = Arc::new(AtomicBool::new(false));
        self.live = Some(stop.clone());
        let emit = self.emit.clone();
        let interval = self.interval;
        thread::spawn(move || {
            loop {
                thread::sleep(interval);
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                trace!("tick timer fired");
                emit();
            }
        });
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.live.take() {
            stop.store(true, Ordering::Relaxed);
        }
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
