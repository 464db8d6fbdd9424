// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! A [`Client`] backed by a control server in a child process.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rcc_core::{
    Checker, Client, ClientCreationOpts, Error, Event, Lang, Notification, Result, StopSyncing,
    Waiter,
};
use rcc_ipc::{Request, Response};

use crate::config::SupervisorConfig;
use crate::connection::{unexpected, Connection};
use crate::supervisor::{self, ChildProcess};
use crate::waiter::RemoteWaiter;

/// State shared between a [`RemoteClient`] and its waiters.
pub(crate) struct Inner {
    conn: Mutex<Connection>,
    child: Mutex<ChildProcess>,
    closed: AtomicBool,
    pub(crate) context_id: String,
    pub(crate) config: SupervisorConfig,
}

impl Inner {
    /// Make a call, failing with [`Error::Closed`] once the client is closed.
    fn call(&self, request: &Request) -> Result<Response> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        self.call_unchecked(request)
    }

    fn call_unchecked(&self, request: &Request) -> Result<Response> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.call(request)
    }

    /// Make a call on a connection of its own, e.g. a waiter's.
    pub(crate) fn call_on(&self, conn: &mut Connection, request: &Request) -> Result<Response> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        conn.call(request)
    }

    /// Open another connection to the same control server.
    ///
    /// The server serves each connection on its own thread, so calls on it
    /// never queue behind a slow call on the main connection.
    fn dial(&self) -> Result<Connection> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        let port = self.child().port();
        Connection::connect(port, &self.config)
    }

    fn call_ok(&self, request: &Request) -> Result<()> {
        match self.call(request)? {
            Response::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    fn child(&self) -> MutexGuard<'_, ChildProcess> {
        self.child.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Client contract implementation that forwards every call to `rccd`.
///
/// Dropping a `RemoteClient` that was never closed kills the child.
pub struct RemoteClient {
    inner: Arc<Inner>,
    opts: ClientCreationOpts,
    lang: Lang,
}

impl RemoteClient {
    /// Spawn the control server at `binary` and create a `lang` client in it.
    pub fn spawn(
        binary: &Path,
        lang: Lang,
        opts: &ClientCreationOpts,
        context_id: &str,
        config: SupervisorConfig,
    ) -> Result<Self> {
        let child = supervisor::spawn(binary, &config, context_id)?;
        let mut conn = Connection::connect(child.port(), &config)?;
        conn.hello()?;
        match conn.call(&Request::CreateClient {
            opts: opts.clone(),
            lang,
            context_id: context_id.to_string(),
        })? {
            Response::Ok => {}
            other => return Err(unexpected(&other)),
        }
        tracing::info!(
            "{}: {} client for {} hosted by pid {} on {}",
            context_id,
            lang,
            opts.user_id,
            child.pid(),
            conn.addr()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                child: Mutex::new(child),
                closed: AtomicBool::new(false),
                context_id: context_id.to_string(),
                config,
            }),
            opts: opts.clone(),
            lang,
        })
    }

    /// Test context id this client was created with.
    pub fn context_id(&self) -> &str {
        &self.inner.context_id
    }

    /// PID of the hosting control server.
    pub fn pid(&self) -> u32 {
        self.inner.child().pid()
    }

    fn ctx(&self) -> String {
        self.inner.context_id.clone()
    }

    fn mark_closed(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

impl Client for RemoteClient {
    fn close(&self) -> Result<()> {
        self.mark_closed()?;
        let closed = self.inner.call_unchecked(&Request::Close { context_id: self.ctx() });
        if let Err(e) = self.inner.call_unchecked(&Request::Shutdown) {
            tracing::debug!("{}: shutdown: {}", self.inner.context_id, e);
        }

        let grace = self.inner.config.shutdown_grace;
        let mut child = self.inner.child();
        match child.wait_timeout(grace)? {
            Some(status) => {
                tracing::debug!("{}: rccd exited: {}", self.inner.context_id, status);
            }
            None => {
                tracing::warn!(
                    "{}: rccd still running after {:?}, killing it",
                    self.inner.context_id,
                    grace
                );
                child.kill()?;
            }
        }

        match closed? {
            Response::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    fn force_close(&self) -> Result<()> {
        self.mark_closed()?;
        tracing::info!("{}: killing rccd", self.inner.context_id);
        self.inner.child().kill()
    }

    fn delete_persistent_storage(&self) -> Result<()> {
        self.inner.call_ok(&Request::DeletePersistentStorage { context_id: self.ctx() })
    }

    fn login(&self, opts: &ClientCreationOpts) -> Result<()> {
        self.inner.call_ok(&Request::Login { opts: opts.clone() })
    }

    fn start_syncing(&self) -> Result<StopSyncing> {
        self.inner.call_ok(&Request::StartSyncing { context_id: self.ctx() })?;
        let inner = Arc::clone(&self.inner);
        Ok(StopSyncing::new(move || {
            let request = Request::StopSyncing {
                context_id: inner.context_id.clone(),
            };
            if let Err(e) = inner.call_ok(&request) {
                tracing::warn!("{}: StopSyncing: {}", inner.context_id, e);
            }
        }))
    }

    fn current_access_token(&self) -> Result<String> {
        match self.inner.call(&Request::CurrentAccessToken { context_id: self.ctx() })? {
            Response::AccessToken { token } => Ok(token),
            other => Err(unexpected(&other)),
        }
    }

    fn is_room_encrypted(&self, room_id: &str) -> Result<bool> {
        let request = Request::IsRoomEncrypted {
            room_id: room_id.to_string(),
        };
        match self.inner.call(&request)? {
            Response::Bool { value } => Ok(value),
            other => Err(unexpected(&other)),
        }
    }

    fn send_message(&self, room_id: &str, text: &str) -> Result<String> {
        let request = Request::SendMessage {
            context_id: self.ctx(),
            room_id: room_id.to_string(),
            text: text.to_string(),
        };
        match self.inner.call(&request)? {
            Response::EventId { event_id } => Ok(event_id),
            other => Err(unexpected(&other)),
        }
    }

    fn wait_until_event_in_room(
        &self,
        room_id: &str,
        checker: Checker,
    ) -> Result<Box<dyn Waiter>> {
        let conn = self.inner.dial()?;
        let request = Request::WaitUntilEvent {
            context_id: self.ctx(),
            room_id: room_id.to_string(),
        };
        match self.inner.call(&request)? {
            Response::WaiterId { waiter_id } => Ok(Box::new(RemoteWaiter::new(
                Arc::clone(&self.inner),
                conn,
                waiter_id,
                room_id,
                checker,
            ))),
            other => Err(unexpected(&other)),
        }
    }

    fn backpaginate(&self, room_id: &str, count: usize) -> Result<()> {
        self.inner.call_ok(&Request::Backpaginate {
            context_id: self.ctx(),
            room_id: room_id.to_string(),
            count,
        })
    }

    fn get_event(&self, room_id: &str, event_id: &str) -> Result<Event> {
        let request = Request::GetEvent {
            context_id: self.ctx(),
            room_id: room_id.to_string(),
            event_id: event_id.to_string(),
        };
        match self.inner.call(&request)? {
            Response::Event { event } => Ok(event),
            other => Err(unexpected(&other)),
        }
    }

    fn get_notification(&self, room_id: &str, event_id: &str) -> Result<Notification> {
        let request = Request::GetNotification {
            room_id: room_id.to_string(),
            event_id: event_id.to_string(),
        };
        match self.inner.call(&request)? {
            Response::Notification { notification } => Ok(notification),
            other => Err(unexpected(&other)),
        }
    }

    fn backup_keys(&self) -> Result<String> {
        match self.inner.call(&Request::BackupKeys { context_id: self.ctx() })? {
            Response::RecoveryKey { recovery_key } => Ok(recovery_key),
            other => Err(unexpected(&other)),
        }
    }

    fn load_backup(&self, recovery_key: &str) -> Result<()> {
        self.inner.call_ok(&Request::LoadBackup {
            recovery_key: recovery_key.to_string(),
        })
    }

    fn logf(&self, message: &str) {
        tracing::info!("[{}] {}", self.inner.context_id, message);
        let request = Request::Logf {
            message: message.to_string(),
        };
        if let Err(e) = self.inner.call_ok(&request) {
            tracing::debug!("{}: Logf: {}", self.inner.context_id, e);
        }
    }

    fn user_id(&self) -> String {
        self.opts.user_id.clone()
    }

    fn client_type(&self) -> Lang {
        self.lang
    }

    fn opts(&self) -> ClientCreationOpts {
        self.opts.clone()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
