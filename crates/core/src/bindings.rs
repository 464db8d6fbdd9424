// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Language bindings and the registry the control server picks them from.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::opts::{ClientCreationOpts, Lang};

/// A way of creating concrete clients in one language.
pub trait LanguageBindings: Send + Sync {
    /// The language these bindings create clients for.
    fn lang(&self) -> Lang;

    /// Hook run before a client for `context_id` is created (e.g. to clear old logs).
    fn pre_test_run(&self, context_id: &str);

    /// Hook run after the client for `context_id` is closed (e.g. to flush logs).
    fn post_test_run(&self, context_id: &str);

    /// Create a new client.
    fn create_client(&self, opts: &ClientCreationOpts) -> Result<Box<dyn Client>>;
}

/// Known language bindings, keyed by language.
#[derive(Default, Clone)]
pub struct BindingsRegistry {
    known: HashMap<Lang, Arc<dyn LanguageBindings>>,
}

impl BindingsRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bindings for their language. Last write wins.
    pub fn register(&mut self, bindings: Arc<dyn LanguageBindings>) {
        self.known.insert(bindings.lang(), bindings);
    }

    /// Look up the bindings for `lang`.
    pub fn get(&self, lang: Lang) -> Result<Arc<dyn LanguageBindings>> {
        self.known
            .get(&lang)
            .cloned()
            .ok_or(Error::UnknownBindings(lang))
    }

    /// Languages with registered bindings.
    pub fn langs(&self) -> Vec<Lang> {
        let mut langs: Vec<Lang> = self.known.keys().copied().collect();
        langs.sort_by_key(|l| l.as_str());
        langs
    }
}

#[cfg(test)]
#[path = "bindings_tests.rs"]
mod tests;
