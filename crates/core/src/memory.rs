// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory loopback client.
//!
//! Implements the whole client contract without a homeserver: sent messages
//! land in a local room timeline and are echoed back to listeners for that
//! room, the way a real client sees its own messages come down sync. The
//! control server hosts this client when no FFI or browser bindings are built
//! in, and the test suites use it as the concrete client.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::bindings::LanguageBindings;
use crate::client::{Client, StopSyncing, Waiter};
use crate::error::{Error, Result};
use crate::event::{Checker, Event, Notification};
use crate::opts::{ClientCreationOpts, Lang};

/// Bindings creating [`MemoryClient`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryBindings {
    send_delay: Duration,
}

impl MemoryBindings {
    /// Create bindings with no simulated latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `send_message` by `delay`, simulating a slow homeserver.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }
}

impl LanguageBindings for MemoryBindings {
    fn lang(&self) -> Lang {
        Lang::Memory
    }

    fn pre_test_run(&self, context_id: &str) {
        tracing::debug!("memory bindings: pre test run for {}", context_id);
    }

    fn post_test_run(&self, context_id: &str) {
        tracing::debug!("memory bindings: post test run for {}", context_id);
    }

    fn create_client(&self, opts: &ClientCreationOpts) -> Result<Box<dyn Client>> {
        let client = MemoryClient::new(opts.clone())?.with_send_delay(self.send_delay);
        Ok(Box::new(client))
    }
}

/// A listener registered by [`Client::wait_until_event_in_room`].
struct Listener {
    room_id: String,
    tx: Sender<Event>,
}

#[derive(Default)]
struct State {
    device_id: Option<String>,
    access_token: Option<String>,
    syncing: bool,
    /// Bumped on every start so a stale stop handle cannot stop a newer sync.
    sync_generation: u64,
    closed: bool,
    rooms: HashMap<String, Vec<Event>>,
    /// Events sent while not syncing, delivered when syncing starts.
    pending: Vec<(String, Event)>,
    listeners: Vec<Listener>,
    next_event: u64,
    backups: u64,
    recovery_key: Option<String>,
}

impl State {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn ensure_logged_in(&self, op: &str) -> Result<()> {
        self.ensure_open()?;
        if self.access_token.is_none() {
            return Err(Error::domain(format!("{}: not logged in: M_MISSING_TOKEN", op)));
        }
        Ok(())
    }

    fn deliver(&mut self, room_id: &str, event: &Event) {
        // Drop listeners whose waiter has gone away.
        self.listeners
            .retain(|l| l.room_id != room_id || l.tx.send(event.clone()).is_ok());
    }

    fn find_event(&self, room_id: &str, event_id: &str) -> Result<Event> {
        let timeline = self
            .rooms
            .get(room_id)
            .ok_or_else(|| Error::domain(format!("unknown room {}: M_NOT_FOUND", room_id)))?;
        timeline
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
            .ok_or_else(|| {
                Error::domain(format!(
                    "event {} not found in room {}: M_NOT_FOUND",
                    event_id, room_id
                ))
            })
    }
}

/// A client whose "homeserver" is a map of room timelines.
pub struct MemoryClient {
    opts: ClientCreationOpts,
    send_delay: Duration,
    state: Arc<Mutex<State>>,
}

impl MemoryClient {
    /// Create a client. A client created with an access token starts logged in.
    pub fn new(opts: ClientCreationOpts) -> Result<Self> {
        if !opts.user_id.starts_with('@') || !opts.user_id.contains(':') {
            return Err(Error::domain(format!(
                "invalid user ID '{}': expected @localpart:server",
                opts.user_id
            )));
        }
        let state = State {
            device_id: opts.device_id.clone(),
            access_token: opts.access_token.clone(),
            ..Default::default()
        };
        Ok(Self {
            opts,
            send_delay: Duration::ZERO,
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Delay every `send_message` by `delay`.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    fn localpart(&self) -> &str {
        let user = self.opts.user_id.trim_start_matches('@');
        user.split(':').next().unwrap_or(user)
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn sha256_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    hex::encode(hasher.finalize())
}

impl Client for MemoryClient {
    fn close(&self) -> Result<()> {
        let mut st = self.state();
        st.closed = true;
        st.syncing = false;
        st.listeners.clear();
        Ok(())
    }

    fn force_close(&self) -> Result<()> {
        self.close()
    }

    fn delete_persistent_storage(&self) -> Result<()> {
        if !self.opts.persistent_storage {
            return Ok(());
        }
        let mut st = self.state();
        st.rooms.clear();
        st.pending.clear();
        st.recovery_key = None;
        Ok(())
    }

    fn login(&self, opts: &ClientCreationOpts) -> Result<()> {
        let mut st = self.state();
        st.ensure_open()?;
        if opts.user_id != self.opts.user_id {
            return Err(Error::domain(format!(
                "login failed: client is for {}, not {}",
                self.opts.user_id, opts.user_id
            )));
        }
        if opts.password.is_empty() {
            return Err(Error::domain("login failed: M_FORBIDDEN: invalid password"));
        }
        let device_id = match opts.device_id.clone().or_else(|| st.device_id.clone()) {
            Some(d) => d,
            None => {
                let digest = sha256_hex(&[&opts.user_id, &opts.base_url]);
                format!("DEV{}", digest[..8].to_uppercase())
            }
        };
        let token = sha256_hex(&[&opts.user_id, &device_id, &opts.password]);
        st.device_id = Some(device_id);
        st.access_token = Some(token);
        Ok(())
    }

    fn start_syncing(&self) -> Result<StopSyncing> {
        let mut st = self.state();
        st.ensure_logged_in("StartSyncing")?;
        st.syncing = true;
        st.sync_generation += 1;
        let generation = st.sync_generation;

        let pending = std::mem::take(&mut st.pending);
        for (room_id, event) in &pending {
            st.deliver(room_id, event);
        }

        let state = Arc::clone(&self.state);
        Ok(StopSyncing::new(move || {
            let mut st = lock(&state);
            if st.sync_generation == generation {
                st.syncing = false;
            }
        }))
    }

    fn current_access_token(&self) -> Result<String> {
        let st = self.state();
        st.ensure_logged_in("CurrentAccessToken")?;
        Ok(st.access_token.clone().unwrap_or_default())
    }

    fn is_room_encrypted(&self, room_id: &str) -> Result<bool> {
        let st = self.state();
        st.ensure_open()?;
        if st.rooms.contains_key(room_id) {
            Ok(true)
        } else {
            Err(Error::domain(format!("unknown room {}: M_NOT_FOUND", room_id)))
        }
    }

    fn send_message(&self, room_id: &str, text: &str) -> Result<String> {
        if !room_id.starts_with('!') {
            return Err(Error::domain(format!(
                "SendMessage: invalid room ID '{}': M_INVALID_PARAM",
                room_id
            )));
        }
        self.state().ensure_logged_in("SendMessage")?;

        if !self.send_delay.is_zero() {
            thread::sleep(self.send_delay);
        }

        let mut st = self.state();
        st.ensure_open()?;
        st.next_event += 1;
        let event_id = format!("${}:{}", st.next_event, self.opts.server_name());
        let event = Event::message(&event_id, &self.opts.user_id, text);
        st.rooms
            .entry(room_id.to_string())
            .or_default()
            .push(event.clone());
        if st.syncing {
            st.deliver(room_id, &event);
        } else {
            st.pending.push((room_id.to_string(), event));
        }
        Ok(event_id)
    }

    fn wait_until_event_in_room(
        &self,
        room_id: &str,
        checker: Checker,
    ) -> Result<Box<dyn Waiter>> {
        let mut st = self.state();
        st.ensure_open()?;
        let (tx, rx) = mpsc::channel();
        st.listeners.push(Listener {
            room_id: room_id.to_string(),
            tx,
        });
        Ok(Box::new(MemoryWaiter { rx, checker }))
    }

    fn backpaginate(&self, room_id: &str, count: usize) -> Result<()> {
        let st = self.state();
        st.ensure_logged_in("Backpaginate")?;
        match st.rooms.get(room_id) {
            Some(timeline) => {
                tracing::debug!(
                    "backpaginate {} by {}: {} events held locally",
                    room_id,
                    count,
                    timeline.len()
                );
                Ok(())
            }
            None => Err(Error::domain(format!(
                "Backpaginate: unknown room {}: M_NOT_FOUND",
                room_id
            ))),
        }
    }

    fn get_event(&self, room_id: &str, event_id: &str) -> Result<Event> {
        let st = self.state();
        st.ensure_open()?;
        st.find_event(room_id, event_id)
    }

    fn get_notification(&self, room_id: &str, event_id: &str) -> Result<Notification> {
        let st = self.state();
        st.ensure_logged_in("GetNotification")?;
        let event = st.find_event(room_id, event_id)?;
        let has_mentions = event
            .text
            .as_deref()
            .is_some_and(|t| t.contains(self.localpart()));
        Ok(Notification {
            event,
            has_mentions,
        })
    }

    fn backup_keys(&self) -> Result<String> {
        let mut st = self.state();
        st.ensure_logged_in("BackupKeys")?;
        st.backups += 1;
        let digest = sha256_hex(&[
            &self.opts.user_id,
            st.device_id.as_deref().unwrap_or(""),
            &st.backups.to_string(),
        ]);
        let key = digest[..48]
            .as_bytes()
            .chunks(4)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        st.recovery_key = Some(key.clone());
        Ok(key)
    }

    fn load_backup(&self, recovery_key: &str) -> Result<()> {
        let st = self.state();
        st.ensure_logged_in("LoadBackup")?;
        match &st.recovery_key {
            Some(key) if key == recovery_key => Ok(()),
            Some(_) => Err(Error::domain("LoadBackup: invalid recovery key")),
            None => Err(Error::domain("LoadBackup: no backup exists")),
        }
    }

    fn logf(&self, message: &str) {
        tracing::info!("[{}] {}", self.opts.user_id, message);
    }

    fn user_id(&self) -> String {
        self.opts.user_id.clone()
    }

    fn client_type(&self) -> Lang {
        Lang::Memory
    }

    fn opts(&self) -> ClientCreationOpts {
        self.opts.clone()
    }
}

/// Waiter fed by a room listener.
struct MemoryWaiter {
    rx: Receiver<Event>,
    checker: Checker,
}

impl Waiter for MemoryWaiter {
    fn wait(&mut self, timeout: Duration, message: &str) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::timeout(timeout, message));
            }
            match self.rx.recv_timeout(remaining) {
                Ok(event) => {
                    if (self.checker)(&event) {
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(Error::timeout(timeout, message)),
                Err(RecvTimeoutError::Disconnected) => return Err(Error::Closed),
            }
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
