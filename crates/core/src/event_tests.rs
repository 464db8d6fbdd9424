// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn body_checker_matches_exact_text() {
    let check = check_event_has_body("ping");
    assert!(check(&Event::message("$1", "@a:hs1", "ping")));
    assert!(!check(&Event::message("$1", "@a:hs1", "ping!")));
    assert!(!check(&Event::membership("$2", "@a:hs1", "@b:hs1", "join")));
}

#[test]
fn event_id_checker() {
    let check = check_event_has_event_id("$abc");
    assert!(check(&Event::message("$abc", "@a:hs1", "x")));
    assert!(!check(&Event::message("$abd", "@a:hs1", "x")));
}

#[test]
fn membership_checker_requires_target_and_state() {
    let check = check_event_has_membership("@b:hs1", "join");
    assert!(check(&Event::membership("$1", "@b:hs1", "@b:hs1", "join")));
    assert!(!check(&Event::membership("$1", "@b:hs1", "@b:hs1", "leave")));
    assert!(!check(&Event::membership("$1", "@c:hs1", "@c:hs1", "join")));
}

#[test]
fn event_deserializes_with_defaults() {
    let json = r#"{"id":"$1","sender":"@a:hs1"}"#;
    let ev: Event = serde_json::from_str(json).unwrap();
    assert_eq!(ev.text, None);
    assert!(!ev.fail_to_decrypt);
}

#[test]
fn undecryptable_event_keeps_flag_across_serde() {
    let ev = Event {
        id: "$utd".to_string(),
        sender: "@a:hs1".to_string(),
        fail_to_decrypt: true,
        ..Default::default()
    };
    let json = serde_json::to_string(&ev).unwrap();
    let parsed: Event = serde_json::from_str(&json).unwrap();
    assert!(parsed.fail_to_decrypt);
    assert_eq!(parsed.text, None);
}
