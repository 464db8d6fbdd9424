// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The client contract.
//!
//! Tests drive every client through [`Client`], whether the concrete client
//! lives in the test process or behind a control server in a child process.

use std::fmt;
use std::time::Duration;

use crate::error::Result;
use crate::event::{Checker, Event, Notification};
use crate::opts::{ClientCreationOpts, Lang};

/// Operations every client implementation supports.
pub trait Client: Send + Sync {
    /// Clean up resources. The client must not be used afterwards.
    fn close(&self) -> Result<()>;

    /// Tear the client down even if it is unresponsive.
    ///
    /// For a remote client this kills the hosting process outright.
    fn force_close(&self) -> Result<()>;

    /// Remove any persistent storage, if it was enabled.
    fn delete_persistent_storage(&self) -> Result<()>;

    /// Log in with the given options.
    fn login(&self, opts: &ClientCreationOpts) -> Result<()>;

    /// Start syncing. Blocks until the initial sync has completed.
    fn start_syncing(&self) -> Result<StopSyncing>;

    /// The access token currently in use.
    fn current_access_token(&self) -> Result<String>;

    /// Returns true if the room is encrypted. Fails for unknown rooms.
    fn is_room_encrypted(&self, room_id: &str) -> Result<bool>;

    /// Send a text message and return its event ID once it has been sent.
    fn send_message(&self, room_id: &str, text: &str) -> Result<String>;

    /// Register interest in events from `room_id`.
    ///
    /// Events delivered after this call are candidates for the returned
    /// waiter, even if [`Waiter::wait`] is called later.
    fn wait_until_event_in_room(&self, room_id: &str, checker: Checker)
        -> Result<Box<dyn Waiter>>;

    /// Backpaginate in this room by `count` events.
    fn backpaginate(&self, room_id: &str, count: usize) -> Result<()>;

    /// The client's view of an event. Fails if the event cannot be found.
    fn get_event(&self, room_id: &str, event_id: &str) -> Result<Event>;

    /// Fetch the notification for an event, as a push extension would.
    fn get_notification(&self, room_id: &str, event_id: &str) -> Result<Notification>;

    /// Back up E2EE keys and return the recovery key.
    fn backup_keys(&self) -> Result<String>;

    /// Restore E2EE keys from the latest backup.
    fn load_backup(&self, recovery_key: &str) -> Result<()>;

    /// Write a line to the client's log.
    fn logf(&self, message: &str);

    /// The user this client logs in as.
    fn user_id(&self) -> String;

    /// The implementation language of this client.
    fn client_type(&self) -> Lang;

    /// The options this client was created with.
    fn opts(&self) -> ClientCreationOpts;
}

/// Waits for an event accepted by a checker.
pub trait Waiter: Send {
    /// Block until the checker accepts an event or `timeout` elapses.
    ///
    /// On timeout the error includes `message`.
    fn wait(&mut self, timeout: Duration, message: &str) -> Result<()>;
}

/// Handle returned by [`Client::start_syncing`].
pub struct StopSyncing(Box<dyn FnOnce() + Send>);

impl StopSyncing {
    /// Wrap the function that stops syncing.
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(stop))
    }

    /// Stop syncing.
    pub fn stop(self) {
        (self.0)()
    }
}

impl fmt::Debug for StopSyncing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StopSyncing").field(&"<fn>").finish()
    }
}

/// Decorator that logs every contract call before delegating.
pub struct LoggedClient {
    inner: Box<dyn Client>,
}

impl LoggedClient {
    /// Wrap a client.
    pub fn new(inner: Box<dyn Client>) -> Self {
        Self { inner }
    }

    fn prefix(&self) -> String {
        format!("[{}]({})", self.inner.user_id(), self.inner.client_type())
    }
}

impl Client for LoggedClient {
    fn close(&self) -> Result<()> {
        tracing::info!("{} Close", self.prefix());
        self.inner.close()
    }

    fn force_close(&self) -> Result<()> {
        tracing::info!("{} ForceClose", self.prefix());
        self.inner.force_close()
    }

    fn delete_persistent_storage(&self) -> Result<()> {
        tracing::info!("{} DeletePersistentStorage", self.prefix());
        self.inner.delete_persistent_storage()
    }

    fn login(&self, opts: &ClientCreationOpts) -> Result<()> {
        tracing::info!("{} Login {}", self.prefix(), opts.user_id);
        self.inner.login(opts)
    }

    fn start_syncing(&self) -> Result<StopSyncing> {
        tracing::info!("{} StartSyncing starting to sync", self.prefix());
        let stop = self.inner.start_syncing()?;
        tracing::info!("{} StartSyncing now syncing", self.prefix());
        Ok(stop)
    }

    fn current_access_token(&self) -> Result<String> {
        self.inner.current_access_token()
    }

    fn is_room_encrypted(&self, room_id: &str) -> Result<bool> {
        tracing::info!("{} IsRoomEncrypted {}", self.prefix(), room_id);
        self.inner.is_room_encrypted(room_id)
    }

    fn send_message(&self, room_id: &str, text: &str) -> Result<String> {
        tracing::info!("{} SendMessage {} => {}", self.prefix(), room_id, text);
        let event_id = self.inner.send_message(room_id, text)?;
        tracing::info!("{} SendMessage {} => {}", self.prefix(), room_id, event_id);
        Ok(event_id)
    }

    fn wait_until_event_in_room(
        &self,
        room_id: &str,
        checker: Checker,
    ) -> Result<Box<dyn Waiter>> {
        tracing::info!("{} WaitUntilEventInRoom {}", self.prefix(), room_id);
        self.inner.wait_until_event_in_room(room_id, checker)
    }

    fn backpaginate(&self, room_id: &str, count: usize) -> Result<()> {
        tracing::info!("{} Backpaginate {} {}", self.prefix(), count, room_id);
        self.inner.backpaginate(room_id, count)
    }

    fn get_event(&self, room_id: &str, event_id: &str) -> Result<Event> {
        tracing::debug!("{} GetEvent {} {}", self.prefix(), room_id, event_id);
        self.inner.get_event(room_id, event_id)
    }

    fn get_notification(&self, room_id: &str, event_id: &str) -> Result<Notification> {
        tracing::info!("{} GetNotification {} {}", self.prefix(), room_id, event_id);
        self.inner.get_notification(room_id, event_id)
    }

    fn backup_keys(&self) -> Result<String> {
        tracing::info!("{} BackupKeys", self.prefix());
        self.inner.backup_keys()
    }

    fn load_backup(&self, recovery_key: &str) -> Result<()> {
        tracing::info!("{} LoadBackup", self.prefix());
        self.inner.load_backup(recovery_key)
    }

    fn logf(&self, message: &str) {
        self.inner.logf(message)
    }

    fn user_id(&self) -> String {
        self.inner.user_id()
    }

    fn client_type(&self) -> Lang {
        self.inner.client_type()
    }

    fn opts(&self) -> ClientCreationOpts {
        self.inner.opts()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
