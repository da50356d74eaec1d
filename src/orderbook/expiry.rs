//! Background expiry reaper: periodically sweeps an engine for GTD orders
//! past their expiry and cancels them through the normal cancel path.

use super::engine::MatchingEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub struct ExpiryReaper {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ExpiryReaper {
    /// Spawns the reaper thread for `engine` if its configured
    /// `check_expiry_interval` is positive; returns `None` when disabled.
    pub fn spawn(engine: Arc<MatchingEngine>, symbol: String) -> Option<Self> {
        let interval = engine.check_expiry_interval();
        if interval <= 0.0 {
            return None;
        }
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = Arc::clone(&stop);
        let sleep_for = Duration::from_secs_f64(interval);

        let handle = std::thread::Builder::new()
            .name(format!("expiry-reaper-{symbol}"))
            .spawn(move || {
                while !stop_thread.load(Ordering::Relaxed) {
                    std::thread::sleep(sleep_for);
                    if stop_thread.load(Ordering::Relaxed) {
                        break;
                    }
                    let removed = engine.sweep_expired();
                    if removed > 0 {
                        tracing::info!(symbol = %symbol, removed, "expiry sweep cancelled GTD orders");
                    }
                }
            })
            .expect("failed to spawn expiry reaper thread");

        Some(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for ExpiryReaper {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
