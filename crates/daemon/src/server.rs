// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch for the control server.
//!
//! A [`Server`] owns at most one concrete client for its whole lifetime and
//! maps every [`Request`] onto the matching client contract call.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use rcc_core::{
    BindingsRegistry, Client, ClientCreationOpts, Error, LanguageBindings, Lang, LoggedClient,
    Result, StopSyncing,
};
use rcc_ipc::{Request, Response, ServerStatus, PROTOCOL_VERSION};

use crate::waiters::{EventBuffer, WaiterRegistry};

/// The hosted client and the bindings that created it.
struct Active {
    client: Arc<dyn Client>,
    bindings: Arc<dyn LanguageBindings>,
    context_id: String,
}

#[derive(Default)]
struct State {
    active: Option<Active>,
    /// Set once `CreateClient` succeeded; never cleared.
    created: bool,
    stop_syncing: Option<StopSyncing>,
}

pub struct Server {
    bindings: BindingsRegistry,
    started: Instant,
    started_at: DateTime<Utc>,
    state: Mutex<State>,
    waiters: WaiterRegistry,
}

impl Server {
    pub fn new(bindings: BindingsRegistry) -> Self {
        Self {
            bindings,
            started: Instant::now(),
            started_at: Utc::now(),
            state: Mutex::new(State::default()),
            waiters: WaiterRegistry::new(),
        }
    }

    /// Handle one request. Failures are returned as [`Response::Error`].
    pub fn handle(&self, request: Request) -> Response {
        let name = request.name();
        tracing::debug!("handling {}", name);
        match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{} failed: {}", name, e);
                Response::error(&e)
            }
        }
    }

    fn dispatch(&self, request: Request) -> Result<Response> {
        match request {
            Request::Ping => Ok(Response::Pong),
            Request::Hello { version } => {
                if version != PROTOCOL_VERSION {
                    tracing::warn!(
                        "driver speaks v{}, server is v{}",
                        version,
                        PROTOCOL_VERSION
                    );
                }
                Ok(Response::Hello {
                    version: PROTOCOL_VERSION.to_string(),
                })
            }
            Request::Status => Ok(Response::Status(self.status())),
            Request::Shutdown => Ok(Response::ShuttingDown),
            Request::CreateClient {
                opts,
                lang,
                context_id,
            } => {
                self.create_client(&opts, lang, context_id)?;
                Ok(Response::Ok)
            }
            Request::Login { opts } => {
                self.client()?.login(&opts)?;
                Ok(Response::Ok)
            }
            Request::StartSyncing { context_id } => {
                let client = self.client()?;
                tracing::debug!("{}: start syncing", context_id);
                let stop = client.start_syncing()?;
                self.state().stop_syncing = Some(stop);
                Ok(Response::Ok)
            }
            Request::StopSyncing { context_id } => {
                self.client()?;
                let stop = self.state().stop_syncing.take().ok_or(Error::NotSyncing)?;
                tracing::debug!("{}: stop syncing", context_id);
                stop.stop();
                Ok(Response::Ok)
            }
            Request::Close { context_id } => {
                self.close(&context_id)?;
                Ok(Response::Ok)
            }
            Request::ForceClose { context_id } => {
                self.force_close(&context_id)?;
                Ok(Response::Ok)
            }
            Request::DeletePersistentStorage { .. } => {
                self.client()?.delete_persistent_storage()?;
                Ok(Response::Ok)
            }
            Request::CurrentAccessToken { .. } => Ok(Response::AccessToken {
                token: self.client()?.current_access_token()?,
            }),
            Request::IsRoomEncrypted { room_id } => Ok(Response::Bool {
                value: self.client()?.is_room_encrypted(&room_id)?,
            }),
            Request::SendMessage { room_id, text, .. } => Ok(Response::EventId {
                event_id: self.client()?.send_message(&room_id, &text)?,
            }),
            Request::WaitUntilEvent { room_id, .. } => {
                let client = self.client()?;
                let buffer = EventBuffer::new();
                let waiter = client.wait_until_event_in_room(&room_id, buffer.recorder())?;
                Ok(Response::WaiterId {
                    waiter_id: self.waiters.register(&room_id, waiter, buffer),
                })
            }
            Request::WaitStart {
                context_id,
                waiter_id,
                room_id,
                message,
                timeout_ms,
            } => {
                tracing::debug!(
                    "{}: start waiter {} in {} ({})",
                    context_id,
                    waiter_id,
                    room_id,
                    message
                );
                self.waiters
                    .start(waiter_id, Duration::from_millis(timeout_ms), &message)?;
                Ok(Response::Ok)
            }
            Request::WaitPoll { waiter_id } => Ok(Response::Events {
                events: self.waiters.poll(waiter_id)?,
            }),
            Request::Backpaginate { room_id, count, .. } => {
                self.client()?.backpaginate(&room_id, count)?;
                Ok(Response::Ok)
            }
            Request::GetEvent {
                room_id, event_id, ..
            } => Ok(Response::Event {
                event: self.client()?.get_event(&room_id, &event_id)?,
            }),
            Request::GetNotification { room_id, event_id } => Ok(Response::Notification {
                notification: self.client()?.get_notification(&room_id, &event_id)?,
            }),
            Request::BackupKeys { .. } => Ok(Response::RecoveryKey {
                recovery_key: self.client()?.backup_keys()?,
            }),
            Request::LoadBackup { recovery_key } => {
                self.client()?.load_backup(&recovery_key)?;
                Ok(Response::Ok)
            }
            Request::Logf { message } => {
                self.client()?.logf(&message);
                Ok(Response::Ok)
            }
            Request::UserId => Ok(Response::UserId {
                user_id: self.client()?.user_id(),
            }),
            Request::ClientType => Ok(Response::ClientType {
                lang: self.client()?.client_type(),
            }),
            Request::Opts => Ok(Response::Opts {
                opts: self.client()?.opts(),
            }),
        }
    }

    fn create_client(
        &self,
        opts: &ClientCreationOpts,
        lang: Lang,
        context_id: String,
    ) -> Result<()> {
        let mut state = self.state();
        if state.created {
            return Err(Error::ClientExists);
        }
        let bindings = self.bindings.get(lang)?;
        bindings.pre_test_run(&context_id);
        let client = bindings.create_client(opts)?;
        tracing::info!("{}: created {} client for {}", context_id, lang, opts.user_id);
        state.active = Some(Active {
            client: Arc::new(LoggedClient::new(client)),
            bindings,
            context_id,
        });
        state.created = true;
        Ok(())
    }

    fn close(&self, context_id: &str) -> Result<()> {
        let (active, syncing) = self.take_active()?;
        if let Some(stop) = syncing {
            stop.stop();
        }
        active.client.close()?;
        active.bindings.post_test_run(&active.context_id);
        tracing::info!("{}: closed", context_id);
        Ok(())
    }

    fn force_close(&self, context_id: &str) -> Result<()> {
        let (active, syncing) = self.take_active()?;
        if let Some(stop) = syncing {
            stop.stop();
        }
        active.client.force_close()?;
        active.bindings.post_test_run(&active.context_id);
        tracing::info!("{}: force closed", context_id);
        Ok(())
    }

    /// Take the hosted client and its sync handle out of the server.
    fn take_active(&self) -> Result<(Active, Option<StopSyncing>)> {
        let mut state = self.state();
        if !state.created {
            return Err(Error::NoActiveClient);
        }
        let active = state.active.take().ok_or(Error::Closed)?;
        Ok((active, state.stop_syncing.take()))
    }

    /// The hosted client, cloned out so calls run without holding the lock.
    fn client(&self) -> Result<Arc<dyn Client>> {
        let state = self.state();
        match &state.active {
            Some(active) => Ok(Arc::clone(&active.client)),
            None if state.created => Err(Error::Closed),
            None => Err(Error::NoActiveClient),
        }
    }

    fn status(&self) -> ServerStatus {
        ServerStatus {
            pid: std::process::id(),
            uptime_secs: self.started.elapsed().as_secs(),
            started_at: self.started_at,
            has_client: self.state().active.is_some(),
            waiters: self.waiters.count(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
