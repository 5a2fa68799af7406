// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the connection monitor which polls the controller connection on its own thread.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info};

/// Connection health written by the monitor and read by everyone else.
#[derive(Debug, Clone)]
pub struct ConnectionHealth {
    connected: Arc<AtomicBool>,
}

impl ConnectionHealth {
    pub fn new(connected: bool) -> Self {
        ConnectionHealth {
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
    fn set(&self, connected: bool) -> bool {
        self.connected.swap(connected, Ordering::Relaxed)
    }
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        ConnectionHealth::new(true)
    }
}

/// Polls a probe once per period until it is shut down.
///
/// The probe returns whether the controller connection is alive. A lost connection is only
/// logged and published through [`ConnectionHealth`], it never stops a running motion.
pub struct ConnectionMonitor {
    handle: Option<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    health: ConnectionHealth,
}

impl ConnectionMonitor {
    pub fn start<P>(probe: P, period: Duration) -> Self
    where
        P: FnMut() -> bool + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let health = ConnectionHealth::default();
        let handle = {
            let shutdown = shutdown.clone();
            let health = health.clone();
            thread::spawn(move || Self::monitor_loop(probe, period, shutdown, health))
        };
        ConnectionMonitor {
            handle: Some(handle),
            shutdown,
            health,
        }
    }

    fn monitor_loop<P: FnMut() -> bool>(
        mut probe: P,
        period: Duration,
        shutdown: Arc<AtomicBool>,
        health: ConnectionHealth,
    ) {
        while !shutdown.load(Ordering::Relaxed) {
            let connected = probe();
            let was_connected = health.set(connected);
            if !connected {
                error!("connect error");
            } else if !was_connected {
                info!("connection restored");
            }
            Self::sleep_unless_shutdown(period, &shutdown);
        }
    }

    fn sleep_unless_shutdown(period: Duration, shutdown: &AtomicBool) {
        let slice = Duration::from_millis(10);
        let mut slept = Duration::ZERO;
        while slept < period && !shutdown.load(Ordering::Relaxed) {
            let step = slice.min(period - slept);
            thread::sleep(step);
            slept += step;
        }
    }

    pub fn health(&self) -> ConnectionHealth {
        self.health.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    /// Stops the monitor thread and waits for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionMonitor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(2) {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn lost_connection_is_published() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let monitor = ConnectionMonitor::start(
            move || counter.fetch_add(1, Ordering::SeqCst) < 2,
            Duration::from_millis(5),
        );
        let health = monitor.health();
        assert!(wait_for(|| !health.is_connected()));
        monitor.shutdown();
        let after_shutdown = polls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(polls.load(Ordering::SeqCst), after_shutdown);
    }

    #[test]
    fn shutdown_does_not_wait_for_a_full_period() {
        let monitor = ConnectionMonitor::start(|| true, Duration::from_secs(60));
        assert!(monitor.is_running());
        let start = Instant::now();
        monitor.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
