// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for rccd.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`names`] submodule.

use std::time::Duration;

/// Generated environment variable name constants.
pub mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

/// Returns the inactivity threshold from `RCCD_INACTIVITY_SECS`, if set and valid.
pub fn inactivity() -> Option<Duration> {
    parse_u64(names::RCCD_INACTIVITY_SECS).map(Duration::from_secs)
}

/// Returns the loopback send delay from `RCCD_MEMORY_SEND_DELAY_MS`, if set and valid.
pub fn memory_send_delay() -> Option<Duration> {
    parse_u64(names::RCCD_MEMORY_SEND_DELAY_MS).map(Duration::from_millis)
}

fn parse_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a number", name, raw);
            None
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
