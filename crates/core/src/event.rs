// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized room events and the checker helpers used to wait for them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A received message or state event, normalized across client implementations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID.
    pub id: String,
    /// Sender user ID.
    pub sender: String,
    /// Plaintext body, if this is a message that could be decrypted.
    #[serde(default)]
    pub text: Option<String>,
    /// Membership target (state key), if this is a membership event.
    #[serde(default)]
    pub target: Option<String>,
    /// Membership state, if this is a membership event.
    #[serde(default)]
    pub membership: Option<String>,
    /// True if the event could not be decrypted.
    #[serde(default)]
    pub fail_to_decrypt: bool,
}

impl Event {
    /// Create a text message event.
    pub fn message(id: &str, sender: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            sender: sender.to_string(),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    /// Create a membership event.
    pub fn membership(id: &str, sender: &str, target: &str, membership: &str) -> Self {
        Self {
            id: id.to_string(),
            sender: sender.to_string(),
            target: Some(target.to_string()),
            membership: Some(membership.to_string()),
            ..Default::default()
        }
    }
}

/// A push notification as seen by a notification extension process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// The event that triggered the notification.
    pub event: Event,
    /// True if the event mentions the receiving user.
    pub has_mentions: bool,
}

/// A predicate over events.
///
/// Checkers are code, not data: they never cross the process boundary.
pub type Checker = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Matches events whose body equals `body`.
pub fn check_event_has_body(body: &str) -> Checker {
    let body = body.to_string();
    Arc::new(move |e: &Event| e.text.as_deref() == Some(body.as_str()))
}

/// Matches the event with the given ID.
pub fn check_event_has_event_id(event_id: &str) -> Checker {
    let event_id = event_id.to_string();
    Arc::new(move |e: &Event| e.id == event_id)
}

/// Matches membership events for `target` with the given membership state.
pub fn check_event_has_membership(target: &str, membership: &str) -> Checker {
    let target = target.to_string();
    let membership = membership.to_string();
    Arc::new(move |e: &Event| {
        e.target.as_deref() == Some(target.as_str())
            && e.membership.as_deref() == Some(membership.as_str())
    })
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
