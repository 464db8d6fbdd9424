// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration.

use std::time::Duration;

/// Timeouts and environment used when spawning and talking to a control server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// How long to wait for the port line on the child's stdout.
    pub handshake_timeout: Duration,
    /// How long to wait for the TCP connection to the child.
    pub connect_timeout: Duration,
    /// Read timeout applied to each call; `None` waits forever.
    pub call_timeout: Option<Duration>,
    /// Delay between polls of a remote waiter.
    pub poll_interval: Duration,
    /// How long `close` waits for the child to exit before killing it.
    pub shutdown_grace: Duration,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            call_timeout: None,
            poll_interval: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(1),
            env: Vec::new(),
        }
    }
}

impl SupervisorConfig {
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set an environment variable for the child.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
