// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rcc: drive clients hosted by `rccd` control server processes.
//!
//! [`RemoteBindings`] spawns one `rccd` per client, reads its port from the
//! first line of stdout and returns a [`RemoteClient`] that implements the
//! client contract by forwarding each call over TCP.

pub mod bindings;
pub mod client;
pub mod config;
pub mod connection;
pub mod env;
pub mod supervisor;
pub mod waiter;

#[cfg(test)]
mod testing;

pub use bindings::RemoteBindings;
pub use client::RemoteClient;
pub use config::SupervisorConfig;
pub use supervisor::ChildProcess;
pub use waiter::RemoteWaiter;
