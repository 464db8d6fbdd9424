// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Inactivity watchdog.
//!
//! Every request touches an [`Activity`] clock. A background thread checks the
//! clock once per tick and runs its expiry action when the server has been
//! idle longer than the threshold.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default idle time before the server exits.
pub const DEFAULT_INACTIVITY: Duration = Duration::from_secs(60);

/// Default interval between idle checks.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Last-activity timestamp shared between connection threads and the watchdog.
#[derive(Clone)]
pub struct Activity {
    last: Arc<Mutex<Instant>>,
}

impl Activity {
    pub fn new() -> Self {
        Self {
            last: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record activity now.
    pub fn touch(&self) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle(&self) -> Duration {
        self.last.lock().unwrap_or_else(|e| e.into_inner()).elapsed()
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the watchdog thread.
///
/// `on_expire` runs at most once, after which the thread stops.
pub fn spawn<F>(
    activity: Activity,
    threshold: Duration,
    tick: Duration,
    on_expire: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name("watchdog".to_string())
        .spawn(move || loop {
            thread::sleep(tick);
            let idle = activity.idle();
            if idle > threshold {
                tracing::warn!(
                    "no activity for {:?} (threshold {:?}), terminating",
                    idle,
                    threshold
                );
                on_expire();
                return;
            }
        })
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
