//! Periodic idle-timeout sweep (§4.3). Runs on its own OS thread; destroys
//! expired sessions outside the registry lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::registry::SessionRegistry;

pub struct IdleSweepHandle {
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl IdleSweepHandle {
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns a thread that wakes every `poll_interval` and sweeps sessions
/// idle longer than `timeout`.
pub fn spawn(registry: Arc<SessionRegistry>, timeout: Duration, poll_interval: Duration) -> IdleSweepHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let thread_shutdown = shutdown.clone();

    let join = std::thread::Builder::new()
        .name("aura-idle-sweep".into())
        .spawn(move || {
            while !thread_shutdown.load(Ordering::SeqCst) {
                std::thread::sleep(poll_interval);
                if thread_shutdown.load(Ordering::SeqCst) {
                    break;
                }
                for id in registry.sweep_expired(timeout) {
                    aura_domain::trace::TraceEvent::SessionExpired {
                        session_id: id,
                        idle_secs: timeout.as_secs(),
                    }
                    .emit();
                    registry.destroy(id);
                }
            }
        })
        .expect("spawning idle sweep thread");

    IdleSweepHandle {
        shutdown,
        join: Some(join),
    }
}
