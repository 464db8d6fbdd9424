// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Language bindings whose clients live in a control server process.

use std::path::{Path, PathBuf};

use rcc_core::{context_id, Client, ClientCreationOpts, Lang, LanguageBindings, Result};

use crate::client::RemoteClient;
use crate::config::SupervisorConfig;
use crate::env;

/// Creates one [`RemoteClient`], and so one `rccd` process, per client.
#[derive(Debug, Clone)]
pub struct RemoteBindings {
    binary: PathBuf,
    lang: Lang,
    context_prefix: String,
    config: SupervisorConfig,
}

impl RemoteBindings {
    /// Bindings spawning `binary` to host `lang` clients.
    ///
    /// `context_prefix` starts every test context id, e.g. `rpc_`.
    pub fn new(binary: impl Into<PathBuf>, lang: Lang, context_prefix: &str) -> Self {
        Self {
            binary: binary.into(),
            lang,
            context_prefix: context_prefix.to_string(),
            config: SupervisorConfig::default(),
        }
    }

    /// Bindings for the binary named by `RCC_RPC_BINARY`.
    ///
    /// Returns `None` when the variable is unset, so remote tests can be skipped.
    pub fn from_env(lang: Lang, context_prefix: &str) -> Option<Self> {
        env::rpc_binary().map(|binary| Self::new(binary, lang, context_prefix))
    }

    pub fn with_config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Test context id for a client created with `opts`.
    pub fn context_id(&self, opts: &ClientCreationOpts) -> String {
        context_id(&self.context_prefix, opts)
    }

    /// Like [`LanguageBindings::create_client`], keeping the concrete type.
    pub fn spawn_client(&self, opts: &ClientCreationOpts) -> Result<RemoteClient> {
        RemoteClient::spawn(
            &self.binary,
            self.lang,
            opts,
            &self.context_id(opts),
            self.config.clone(),
        )
    }
}

impl LanguageBindings for RemoteBindings {
    fn lang(&self) -> Lang {
        self.lang
    }

    // The control server runs the hosted bindings' hooks itself.
    fn pre_test_run(&self, context_id: &str) {
        tracing::debug!("remote {} bindings: pre test run {}", self.lang, context_id);
    }

    fn post_test_run(&self, context_id: &str) {
        tracing::debug!("remote {} bindings: post test run {}", self.lang, context_id);
    }

    fn create_client(&self, opts: &ClientCreationOpts) -> Result<Box<dyn Client>> {
        Ok(Box::new(self.spawn_client(opts)?))
    }
}

#[cfg(test)]
#[path = "bindings_tests.rs"]
mod tests;
