// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rcc-core: the client contract shared by the rcc driver and rccd server.
//!
//! This crate provides the [`Client`] and [`Waiter`] traits every client
//! implementation satisfies, the data exchanged between them, the error
//! taxonomy, the language-binding registry, and an in-memory loopback client.

pub mod bindings;
pub mod client;
pub mod error;
pub mod event;
pub mod memory;
pub mod opts;

pub use bindings::{BindingsRegistry, LanguageBindings};
pub use client::{Client, LoggedClient, StopSyncing, Waiter};
pub use error::{Error, ErrorKind, Result};
pub use event::{
    check_event_has_body, check_event_has_event_id, check_event_has_membership, Checker, Event,
    Notification,
};
pub use memory::{MemoryBindings, MemoryClient};
pub use opts::{context_id, ClientCreationOpts, Lang};
