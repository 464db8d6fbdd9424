// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use rcc_core::{BindingsRegistry, Error};
use tempfile::TempDir;
use yare::parameterized;

use super::*;

#[parameterized(
    with_device = { ClientCreationOpts::new("http://hs1", "@alice:hs1", "pw").with_device_id("DEV"), "rpc_alice_hs1_DEV" },
    without_device = { ClientCreationOpts::new("http://hs1", "@bob:hs2", "pw"), "rpc_bob_hs2_" },
)]
fn context_id_uses_prefix_and_opts(opts: ClientCreationOpts, expected: &str) {
    let bindings = RemoteBindings::new("/usr/bin/rccd", Lang::Memory, "rpc_");
    assert_eq!(bindings.context_id(&opts), expected);
}

#[test]
fn registers_under_its_lang() {
    let bindings = RemoteBindings::new("/usr/bin/rccd", Lang::Rust, "rpc_");
    let mut registry = BindingsRegistry::new();
    registry.register(std::sync::Arc::new(bindings));
    assert_eq!(registry.get(Lang::Rust).unwrap().lang(), Lang::Rust);
}

#[test]
fn with_config_replaces_defaults() {
    let config = SupervisorConfig::default().with_poll_interval(Duration::from_millis(5));
    let bindings =
        RemoteBindings::new("/usr/bin/rccd", Lang::Memory, "rpc_").with_config(config.clone());
    assert_eq!(bindings.config(), &config);
    assert_eq!(bindings.binary(), Path::new("/usr/bin/rccd"));
}

#[test]
fn create_client_with_missing_binary_fails_fast() {
    let dir = TempDir::new().unwrap();
    let bindings = RemoteBindings::new(dir.path().join("rccd"), Lang::Memory, "rpc_");
    let opts = ClientCreationOpts::new("http://hs1", "@alice:hs1", "pw");
    let err = bindings.create_client(&opts).err().unwrap();
    assert!(matches!(err, Error::BinaryNotFound { .. }));
}
