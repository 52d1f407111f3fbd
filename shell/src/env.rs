//! Variable storage: shell-local variables layered over the process
//! environment.
//!
//! `set` writes the local layer (expansion only); `export` publishes to
//! the real environment so children inherit. Lookup checks local first.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Vars {
    local: HashMap<String, String>,
}

impl Vars {
    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.local.get(name) {
            return Some(value.clone());
        }
        std::env::var(name).ok()
    }

    /// Assign a shell-local variable.
    pub fn set_local(&mut self, name: &str, value: &str) {
        self.local.insert(name.to_string(), value.to_string());
    }

    /// Publish to the process environment (children see it). A name
    /// already set locally keeps its local value too.
    pub fn export(&mut self, name: &str, value: &str) {
        // Single-threaded: nothing else reads the environment concurrently.
        unsafe { std::env::set_var(name, value) };
    }

    /// Export a name that only exists locally so far; no-op otherwise.
    pub fn promote(&mut self, name: &str) {
        if let Some(value) = self.local.get(name).cloned() {
            self.export(name, &value);
        }
    }

    /// Drop a variable from both layers.
    pub fn unset(&mut self, name: &str) {
        self.local.remove(name);
        unsafe { std::env::remove_var(name) };
    }

    /// Local variables, sorted by name, for `set` with no arguments.
    pub fn locals_sorted(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .local
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort();
        pairs
    }
}

/// Split a `KEY=VALUE` argument. The key must be non-empty.
pub fn split_assignment(arg: &str) -> Option<(&str, &str)> {
    let (key, value) = arg.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}
