// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scratch shell scripts standing in for the control server binary.
//!
//! A script cannot be executed while any process still holds a write handle
//! to it (ETXTBSY), and a concurrent fork inherits open handles. Writers take
//! [`FORK_LOCK`] exclusively; tests that spawn hold it shared.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

static FORK_LOCK: RwLock<()> = RwLock::new(());

/// Write an executable `/bin/sh` script named `name` into `dir`.
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let _guard = FORK_LOCK.write().unwrap_or_else(|e| e.into_inner());
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

/// Hold while spawning a child process.
pub fn spawning() -> RwLockReadGuard<'static, ()> {
    FORK_LOCK.read().unwrap_or_else(|e| e.into_inner())
}
