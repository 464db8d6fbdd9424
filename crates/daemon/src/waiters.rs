// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server-side half of wait-for-event.
//!
//! Checkers are closures and stay with the driver. The server registers a
//! checker that records every event delivered for the room and never matches,
//! then hands the recorded events out on each poll.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rcc_core::{Checker, Error, Event, Result, Waiter};
use rcc_ipc::WaiterId;

/// Events recorded for one waiter since its last poll.
#[derive(Clone, Default)]
pub struct EventBuffer {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A checker that appends every event to this buffer and never matches.
    pub fn recorder(&self) -> Checker {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: &Event| {
            events
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event.clone());
            false
        })
    }

    /// Take everything recorded so far.
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

struct Started {
    deadline: Instant,
    timeout: Duration,
    message: String,
}

struct Entry {
    room_id: String,
    buffer: EventBuffer,
    /// The concrete waiter, until `start` moves it to its worker thread.
    waiter: Option<Box<dyn Waiter>>,
    started: Option<Started>,
}

#[derive(Default)]
struct Inner {
    next_id: WaiterId,
    entries: HashMap<WaiterId, Entry>,
}

/// All waiters created over the server's lifetime.
///
/// Entries are never removed; the server process is scoped to one test.
#[derive(Default)]
pub struct WaiterRegistry {
    inner: Mutex<Inner>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter whose checker was built from `buffer`.
    pub fn register(
        &self,
        room_id: &str,
        waiter: Box<dyn Waiter>,
        buffer: EventBuffer,
    ) -> WaiterId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.insert(
            id,
            Entry {
                room_id: room_id.to_string(),
                buffer,
                waiter: Some(waiter),
                started: None,
            },
        );
        tracing::debug!("registered waiter {} for {}", id, room_id);
        id
    }

    /// Start accumulating events for a waiter. Starting twice is a no-op.
    pub fn start(&self, id: WaiterId, timeout: Duration, message: &str) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(&id).ok_or(Error::UnknownWaiter(id))?;
        if entry.started.is_some() {
            return Ok(());
        }
        entry.started = Some(Started {
            deadline: Instant::now() + timeout,
            timeout,
            message: message.to_string(),
        });

        let Some(mut waiter) = entry.waiter.take() else {
            return Ok(());
        };
        let room_id = entry.room_id.clone();
        let message = message.to_string();
        thread::Builder::new()
            .name(format!("waiter-{}", id))
            .spawn(move || {
                // The recorder never matches, so this only returns on timeout or close.
                if let Err(e) = waiter.wait(timeout, &message) {
                    tracing::debug!("waiter {} in {} finished: {}", id, room_id, e);
                }
            })?;
        Ok(())
    }

    /// Return and clear the events recorded since the last poll.
    pub fn poll(&self, id: WaiterId) -> Result<Vec<Event>> {
        let inner = self.lock();
        let entry = inner.entries.get(&id).ok_or(Error::UnknownWaiter(id))?;
        let started = entry.started.as_ref().ok_or(Error::WaiterNotStarted(id))?;
        if Instant::now() >= started.deadline {
            return Err(Error::timeout(started.timeout, &started.message));
        }
        Ok(entry.buffer.drain())
    }

    /// Number of waiters registered so far.
    pub fn count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "waiters_tests.rs"]
mod tests;
