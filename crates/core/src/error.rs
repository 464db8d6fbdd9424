// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared by every side of the remote client control protocol.
//!
//! Errors fall into four broad kinds (see [`ErrorKind`]): setup failures that
//! abort a test before it starts, protocol misuse reported by the control
//! server, domain failures raised by the concrete client, and wait timeouts.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::opts::Lang;

/// Coarse classification of an [`Error`].
///
/// This is what travels over the wire next to the error message so the
/// driver side can rebuild an error of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing binary, handshake timeout, connection failure.
    Setup,
    /// Misuse of the control server (no client, unknown waiter, ...).
    Protocol,
    /// Failure reported by the concrete client (login, send, decrypt).
    Domain,
    /// A wait-for-event deadline elapsed.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Setup => "setup",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Domain => "domain",
            ErrorKind::Timeout => "timeout",
        };
        write!(f, "{}", s)
    }
}

/// All possible errors raised by clients, the control server and the supervisor.
#[derive(Debug, Error)]
pub enum Error {
    // Setup errors
    #[error("rpc binary at {path} does not exist or cannot be executed: {reason}")]
    BinaryNotFound { path: String, reason: String },

    #[error("cannot start rpc binary {path}: {reason}")]
    Spawn { path: String, reason: String },

    #[error("timed out waiting for port number to be echoed to stdout by {path}\n  hint: did the binary run, and is it actually the rpc binary?\n{output}")]
    Handshake { path: String, output: String },

    #[error("cannot connect to control server at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("control server version mismatch: server is v{server}, client is v{client}")]
    VersionMismatch { server: String, client: String },

    // Protocol errors
    #[error("no active client: CreateClient was not called")]
    NoActiveClient,

    #[error("CreateClient: already have an active client")]
    ClientExists,

    #[error("unknown language bindings {0}\n  hint: was rccd built with support for it?")]
    UnknownBindings(Lang),

    #[error("unknown waiter id {0}")]
    UnknownWaiter(u64),

    #[error("waiter {0} has not been started")]
    WaiterNotStarted(u64),

    #[error("cannot stop syncing as StartSyncing wasn't called")]
    NotSyncing,

    #[error("client is closed")]
    Closed,

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("{0}")]
    Protocol(String),

    // Domain errors, passed through verbatim
    #[error("{0}")]
    Domain(String),

    // Timeout errors
    #[error("{message}")]
    Timeout { message: String },

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl Error {
    /// Build a wait timeout carrying the caller's diagnostic message.
    pub fn timeout(after: Duration, message: &str) -> Self {
        Error::Timeout {
            message: format!("timed out after {:?}: {}", after, message),
        }
    }

    /// Build a domain error from anything printable.
    pub fn domain(message: impl Into<String>) -> Self {
        Error::Domain(message.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BinaryNotFound { .. }
            | Error::Spawn { .. }
            | Error::Handshake { .. }
            | Error::Connect { .. }
            | Error::VersionMismatch { .. } => ErrorKind::Setup,
            Error::NoActiveClient
            | Error::ClientExists
            | Error::UnknownBindings(_)
            | Error::UnknownWaiter(_)
            | Error::WaiterNotStarted(_)
            | Error::NotSyncing
            | Error::Closed
            | Error::UnexpectedResponse(_)
            | Error::Protocol(_)
            | Error::Transport(_) => ErrorKind::Protocol,
            Error::Domain(_) => ErrorKind::Domain,
            Error::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Rebuild an error received from a control server.
    ///
    /// Domain and timeout messages are kept verbatim. A remote setup error
    /// cannot happen once connected, so it is reported as a protocol error.
    pub fn from_remote(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Domain => Error::Domain(message),
            ErrorKind::Timeout => Error::Timeout { message },
            ErrorKind::Setup | ErrorKind::Protocol => Error::Protocol(message),
        }
    }
}

/// A specialized Result type for remote client control operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
