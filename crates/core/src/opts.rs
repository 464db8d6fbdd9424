// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client creation options and client language identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The implementation language of a concrete client.
///
/// The control server uses this to pick the right [`LanguageBindings`](crate::LanguageBindings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lang {
    /// FFI-bound client.
    Rust,
    /// Browser-driven client.
    Js,
    /// In-memory loopback client.
    Memory,
}

impl Lang {
    /// Returns the string representation used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Rust => "rust",
            Lang::Js => "js",
            Lang::Memory => "memory",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "rust" => Ok(Lang::Rust),
            "js" => Ok(Lang::Js),
            "memory" => Ok(Lang::Memory),
            _ => Err(format!("invalid client language: '{}'", s)),
        }
    }
}

/// Options used to instantiate a concrete client.
///
/// Copied by value across the process boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCreationOpts {
    /// Base URL of the homeserver.
    pub base_url: String,
    /// The user to log in as, e.g. `@alice:hs1`.
    pub user_id: String,
    /// The password for this account.
    pub password: String,
    /// Log in with this device ID if set.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Reuse an existing access token instead of logging in.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Keep client state on disk across restarts.
    #[serde(default)]
    pub persistent_storage: bool,
    /// Name of the cross-process lock holder, when several processes share storage.
    #[serde(default)]
    pub cross_process_lock_name: Option<String>,
}

impl ClientCreationOpts {
    /// Create options for the given homeserver and credentials.
    pub fn new(base_url: &str, user_id: &str, password: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            user_id: user_id.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    /// Set the device ID.
    pub fn with_device_id(mut self, device_id: &str) -> Self {
        self.device_id = Some(device_id.to_string());
        self
    }

    /// Set an existing access token.
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Enable persistent storage.
    pub fn with_persistent_storage(mut self) -> Self {
        self.persistent_storage = true;
        self
    }

    /// Set the cross-process lock holder name.
    pub fn with_cross_process_lock_name(mut self, name: &str) -> Self {
        self.cross_process_lock_name = Some(name.to_string());
        self
    }

    /// The server name part of the user ID (`hs1` for `@alice:hs1`).
    pub fn server_name(&self) -> &str {
        self.user_id
            .split_once(':')
            .map(|(_, server)| server)
            .unwrap_or("localhost")
    }
}

/// Derive the context ID (`prefix` + user + device) used to label logs.
///
/// `@alice:hs1` on device `DEV` with prefix `t1_` becomes `t1_alice_hs1_DEV`.
pub fn context_id(prefix: &str, opts: &ClientCreationOpts) -> String {
    let user = opts.user_id.strip_prefix('@').unwrap_or(&opts.user_id);
    format!(
        "{}{}_{}",
        prefix,
        user.replace(':', "_"),
        opts.device_id.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
#[path = "opts_tests.rs"]
mod tests;
