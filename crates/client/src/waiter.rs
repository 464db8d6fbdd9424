// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Driver-side half of wait-for-event.
//!
//! The server accumulates every event for the room; this waiter polls them
//! and runs the checker locally, since a closure cannot cross the process
//! boundary. Each waiter polls over its own connection.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rcc_core::{Checker, Error, ErrorKind, Result, Waiter};
use rcc_ipc::{Request, Response, WaiterId};

use crate::client::Inner;
use crate::connection::{unexpected, Connection};

pub struct RemoteWaiter {
    inner: Arc<Inner>,
    conn: Connection,
    waiter_id: WaiterId,
    room_id: String,
    checker: Checker,
}

impl RemoteWaiter {
    pub(crate) fn new(
        inner: Arc<Inner>,
        conn: Connection,
        waiter_id: WaiterId,
        room_id: &str,
        checker: Checker,
    ) -> Self {
        Self {
            inner,
            conn,
            waiter_id,
            room_id: room_id.to_string(),
            checker,
        }
    }

    fn start(&mut self, timeout: Duration, message: &str) -> Result<()> {
        let request = Request::WaitStart {
            context_id: self.inner.context_id.clone(),
            waiter_id: self.waiter_id,
            room_id: self.room_id.clone(),
            message: message.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
        match self.inner.call_on(&mut self.conn, &request)? {
            Response::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }
}

impl Waiter for RemoteWaiter {
    fn wait(&mut self, timeout: Duration, message: &str) -> Result<()> {
        let deadline = Instant::now() + timeout;
        self.start(timeout, message)?;

        loop {
            if Instant::now() >= deadline {
                return Err(Error::timeout(timeout, message));
            }
            let poll = Request::WaitPoll {
                waiter_id: self.waiter_id,
            };
            match self.inner.call_on(&mut self.conn, &poll) {
                Ok(Response::Events { events }) => {
                    if events.iter().any(|e| (self.checker)(e)) {
                        return Ok(());
                    }
                }
                Ok(other) => return Err(unexpected(&other)),
                Err(e) if e.kind() == ErrorKind::Timeout => {
                    return Err(Error::timeout(timeout, message));
                }
                Err(e) => return Err(e),
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            thread::sleep(self.inner.config.poll_interval.min(remaining));
        }
    }
}
