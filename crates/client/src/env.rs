// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

/// Returns the value of `RCC_RPC_BINARY` if set and non-empty.
pub fn rpc_binary() -> Option<PathBuf> {
    std::env::var(names::RCC_RPC_BINARY)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
