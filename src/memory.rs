//! In-memory implementations of the harness interfaces.
//!
//! These back the test suite, and give embedding harnesses a zero-setup
//! substrate for local runs.

use std::collections::BTreeMap;

use crate::context::{EventSink, StateStore};
use crate::error::Result;

/// A [`StateStore`] over a sorted in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub fn range<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a [u8])> + 'a {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl StateStore for MemStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// An [`EventSink`] that records every emitted event in order.
#[derive(Debug, Clone, Default)]
pub struct MemEvents {
    events: Vec<(String, Vec<u8>)>,
}

impl MemEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// The names of all emitted events, in emission order.
    pub fn names(&self) -> Vec<&str> {
        self.events.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The most recently emitted event, if any.
    pub fn last(&self) -> Option<(&str, &[u8])> {
        self.events
            .last()
            .map(|(name, payload)| (name.as_str(), payload.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for MemEvents {
    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<()> {
        self.events.push((name.to_string(), payload));
        Ok(())
    }
}
