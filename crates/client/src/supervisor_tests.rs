// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::fs;

use rcc_core::ErrorKind;
use tempfile::TempDir;

use super::*;
use crate::testing::{script, spawning};

fn quick() -> SupervisorConfig {
    SupervisorConfig::default().with_handshake_timeout(Duration::from_millis(300))
}

#[test]
fn missing_binary_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope");
    let err = validate_binary(&path).unwrap_err();
    assert!(matches!(err, Error::BinaryNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Setup);
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[test]
fn directory_is_rejected() {
    let dir = TempDir::new().unwrap();
    let err = validate_binary(dir.path()).unwrap_err();
    assert!(err.to_string().contains("not a regular file"));
}

#[cfg(unix)]
#[test]
fn non_executable_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain");
    fs::write(&path, "#!/bin/sh\necho 1\n").unwrap();
    let err = spawn(&path, &quick(), "ctx").err().unwrap();
    assert!(err.to_string().contains("not executable"));
}

#[test]
fn first_numeric_line_is_the_port() {
    let dir = TempDir::new().unwrap();
    let path = script(
        dir.path(),
        "server",
        "echo starting up\necho 'not 1 a port'\necho 4242\necho after\nsleep 5",
    );
    let _spawning = spawning();
    let mut child = spawn(&path, &quick(), "ctx").unwrap();
    assert_eq!(child.port(), 4242);
    assert_eq!(child.path(), path.as_path());
    assert!(child.try_wait().unwrap().is_none());
    child.kill().unwrap();
}

#[test]
fn no_port_fails_within_handshake_timeout() {
    let dir = TempDir::new().unwrap();
    let path = script(dir.path(), "silent", "echo hello from the wrong binary\nsleep 5");
    let _spawning = spawning();

    let started = Instant::now();
    let err = spawn(&path, &quick(), "ctx").err().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    assert!(matches!(err, Error::Handshake { .. }));
    let message = err.to_string();
    assert!(message.contains("timed out waiting for port number"));
    assert!(message.contains(&path.display().to_string()));
    assert!(message.contains("hello from the wrong binary"));
}

#[test]
fn default_handshake_timeout_is_bounded() {
    let dir = TempDir::new().unwrap();
    let path = script(dir.path(), "slow", "sleep 5");
    let _spawning = spawning();

    let started = Instant::now();
    let err = spawn(&path, &SupervisorConfig::default(), "ctx").err().unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(900), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "{:?}", elapsed);
    assert_eq!(err.kind(), ErrorKind::Setup);
}

#[test]
fn early_exit_reports_status_and_stdout() {
    let dir = TempDir::new().unwrap();
    let path = script(dir.path(), "crash", "echo about to fail\nexit 3");
    let _spawning = spawning();

    let err = spawn(&path, &quick(), "ctx").err().unwrap();
    let message = err.to_string();
    assert!(message.contains("stdout closed"), "{}", message);
    assert!(message.contains("about to fail"), "{}", message);
}

#[test]
fn config_env_reaches_the_child() {
    let dir = TempDir::new().unwrap();
    let path = script(dir.path(), "env", "echo \"$RCC_TEST_PORT\"\nsleep 5");
    let config = quick().with_env("RCC_TEST_PORT", "5151");
    let _spawning = spawning();

    let child = spawn(&path, &config, "ctx").unwrap();
    assert_eq!(child.port(), 5151);
}

#[test]
fn wait_timeout_sees_exit() {
    let dir = TempDir::new().unwrap();
    let path = script(dir.path(), "brief", "echo 4000\nsleep 0.1");
    let _spawning = spawning();

    let mut child = spawn(&path, &quick(), "ctx").unwrap();
    let status = child.wait_timeout(Duration::from_secs(3)).unwrap();
    assert!(status.unwrap().success());
    // Reaped children are not killed again.
    child.kill().unwrap();
}

#[test]
fn wait_timeout_gives_up_on_running_child() {
    let dir = TempDir::new().unwrap();
    let path = script(dir.path(), "long", "echo 4001\nsleep 5");
    let _spawning = spawning();

    let mut child = spawn(&path, &quick(), "ctx").unwrap();
    assert!(child
        .wait_timeout(Duration::from_millis(50))
        .unwrap()
        .is_none());
}
