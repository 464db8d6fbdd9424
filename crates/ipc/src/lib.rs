// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared wire protocol between the rcc driver and the rccd control server.
//!
//! Every client contract operation is one [`Request`] variant answered by one
//! [`Response`]. Messages are serialized as JSON with length-prefixed framing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rcc_core::{ClientCreationOpts, ErrorKind, Event, Lang, Notification};

/// Protocol version exchanged in the `Hello` handshake.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier of a waiter registered on the control server.
pub type WaiterId = u64;

/// Request sent from the driver to the control server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Ping to check if the server is alive.
    Ping,
    /// Version handshake request.
    Hello { version: String },
    /// Get server status.
    Status,
    /// Graceful shutdown of the server process.
    Shutdown,
    /// Create the one concrete client this server hosts.
    CreateClient {
        opts: ClientCreationOpts,
        lang: Lang,
        context_id: String,
    },
    /// Log the client in.
    Login { opts: ClientCreationOpts },
    /// Start syncing; answered once the initial sync completed.
    StartSyncing { context_id: String },
    /// Stop a sync started by `StartSyncing`.
    StopSyncing { context_id: String },
    /// Close the client gracefully.
    Close { context_id: String },
    /// Close the client without waiting for it to clean up.
    ForceClose { context_id: String },
    /// Remove persistent storage.
    DeletePersistentStorage { context_id: String },
    /// Get the current access token.
    CurrentAccessToken { context_id: String },
    /// Check whether a room is encrypted.
    IsRoomEncrypted { room_id: String },
    /// Send a text message.
    SendMessage {
        context_id: String,
        room_id: String,
        text: String,
    },
    /// Register interest in events from a room.
    WaitUntilEvent { context_id: String, room_id: String },
    /// Start accumulating events for a registered waiter.
    WaitStart {
        context_id: String,
        waiter_id: WaiterId,
        room_id: String,
        message: String,
        timeout_ms: u64,
    },
    /// Fetch and clear the events accumulated since the last poll.
    WaitPoll { waiter_id: WaiterId },
    /// Backpaginate in a room.
    Backpaginate {
        context_id: String,
        room_id: String,
        count: usize,
    },
    /// Get the client's view of an event.
    GetEvent {
        context_id: String,
        room_id: String,
        event_id: String,
    },
    /// Get the notification for an event.
    GetNotification { room_id: String, event_id: String },
    /// Back up E2EE keys.
    BackupKeys { context_id: String },
    /// Restore E2EE keys.
    LoadBackup { recovery_key: String },
    /// Write to the client log.
    Logf { message: String },
    /// Get the client's user ID.
    UserId,
    /// Get the client's language.
    ClientType,
    /// Get the client's creation options.
    Opts,
}

impl Request {
    /// Short procedure name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping => "Ping",
            Request::Hello { .. } => "Hello",
            Request::Status => "Status",
            Request::Shutdown => "Shutdown",
            Request::CreateClient { .. } => "CreateClient",
            Request::Login { .. } => "Login",
            Request::StartSyncing { .. } => "StartSyncing",
            Request::StopSyncing { .. } => "StopSyncing",
            Request::Close { .. } => "Close",
            Request::ForceClose { .. } => "ForceClose",
            Request::DeletePersistentStorage { .. } => "DeletePersistentStorage",
            Request::CurrentAccessToken { .. } => "CurrentAccessToken",
            Request::IsRoomEncrypted { .. } => "IsRoomEncrypted",
            Request::SendMessage { .. } => "SendMessage",
            Request::WaitUntilEvent { .. } => "WaitUntilEvent",
            Request::WaitStart { .. } => "WaitStart",
            Request::WaitPoll { .. } => "WaitPoll",
            Request::Backpaginate { .. } => "Backpaginate",
            Request::GetEvent { .. } => "GetEvent",
            Request::GetNotification { .. } => "GetNotification",
            Request::BackupKeys { .. } => "BackupKeys",
            Request::LoadBackup { .. } => "LoadBackup",
            Request::Logf { .. } => "Logf",
            Request::UserId => "UserId",
            Request::ClientType => "ClientType",
            Request::Opts => "Opts",
        }
    }
}

/// Response sent from the control server to the driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Pong response.
    Pong,
    /// Version handshake response.
    Hello { version: String },
    /// Status response.
    Status(ServerStatus),
    /// Shutdown acknowledged.
    ShuttingDown,
    /// The procedure succeeded with no result.
    Ok,
    /// ID of a sent event.
    EventId { event_id: String },
    /// ID of a registered waiter.
    WaiterId { waiter_id: WaiterId },
    /// Events accumulated since the last poll.
    Events { events: Vec<Event> },
    /// A single event.
    Event { event: Event },
    /// A notification.
    Notification { notification: Notification },
    /// Recovery key from a key backup.
    RecoveryKey { recovery_key: String },
    /// Current access token.
    AccessToken { token: String },
    /// Boolean result.
    Bool { value: bool },
    /// User ID of the client.
    UserId { user_id: String },
    /// Language of the client.
    ClientType { lang: Lang },
    /// Creation options of the client.
    Opts { opts: ClientCreationOpts },
    /// Error response.
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Build an error response from an error.
    pub fn error(err: &rcc_core::Error) -> Self {
        Response::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Control server status information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerStatus {
    /// Server PID.
    pub pid: u32,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    /// When the server started.
    pub started_at: DateTime<Utc>,
    /// True once `CreateClient` succeeded and the client is not closed.
    pub has_client: bool,
    /// Number of waiters registered over the server's lifetime.
    pub waiters: usize,
}

// ============================================================================
// Message framing
// ============================================================================

/// IPC message framing.
///
/// Messages are framed as:
/// - 4 bytes: message length (big-endian u32)
/// - N bytes: JSON-encoded message
pub mod framing {
    use std::io::{Read, Write};

    use serde::de::DeserializeOwned;
    use serde::Serialize;

    /// Maximum message size (1MB) to prevent malformed messages from causing hangs.
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    /// Write a serializable message to the given writer.
    pub fn write_message<W: Write, T: Serialize>(
        writer: &mut W,
        message: &T,
    ) -> std::io::Result<()> {
        let json = serde_json::to_vec(message)
            .map_err(|e| std::io::Error::other(format!("serialize error: {}", e)))?;
        if json.len() > MAX_MESSAGE_SIZE {
            return Err(std::io::Error::other(format!(
                "message too large: {} bytes (max {})",
                json.len(),
                MAX_MESSAGE_SIZE
            )));
        }
        let len =
            u32::try_from(json.len()).map_err(|_| std::io::Error::other("message too large"))?;
        writer.write_all(&len.to_be_bytes())?;
        writer.write_all(&json)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a deserializable message from the given reader.
    pub fn read_message<R: Read, T: DeserializeOwned>(reader: &mut R) -> std::io::Result<T> {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len > MAX_MESSAGE_SIZE {
            return Err(std::io::Error::other(format!(
                "message too large: {} bytes (max {})",
                len, MAX_MESSAGE_SIZE
            )));
        }

        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;

        serde_json::from_slice(&buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
