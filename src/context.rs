//! Interfaces to the surrounding execution harness.
//!
//! The contract core never talks to storage, identity resolution or the
//! event channel directly; the harness hands each invocation a [`Context`]
//! carrying implementations of the traits below.

use crate::error::Result;

/// The identity of the invoking client, as resolved by the harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Stable unique identity string. Doubles as the account and voter identity.
    pub id: String,
    /// Organisational identifier, checked against the minter allow-list.
    pub org: String,
}

impl Caller {
    pub fn new(id: impl Into<String>, org: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            org: org.into(),
        }
    }
}

/// Key/value persistence substrate.
///
/// Values are opaque byte strings; everything numeric this crate stores is a
/// UTF-8 decimal integer. An absent key reads as `None`, never as an error.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// Channel for attaching a named payload to the current operation, consumed
/// off-band by listeners on the harness side.
pub trait EventSink {
    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<()>;
}

/// Per-invocation state handed in by the harness. Each public contract
/// operation runs to completion against exactly one of these.
pub struct Context<'a, S: StateStore, E: EventSink> {
    pub store: &'a mut S,
    pub events: &'a mut E,
    pub caller: Caller,
}

impl<'a, S: StateStore, E: EventSink> Context<'a, S, E> {
    pub fn new(store: &'a mut S, events: &'a mut E, caller: Caller) -> Self {
        Self {
            store,
            events,
            caller,
        }
    }
}

// NUL cannot appear in a plain key, so composite keys can never collide
// with the singleton metadata keys.
const KEY_SEPARATOR: char = '\u{0}';

/// Build a composite key from a prefix tag and its parts.
pub fn composite_key(prefix: &str, parts: &[&str]) -> String {
    let mut key = String::with_capacity(prefix.len() + parts.len() * 8 + 1);
    key.push(KEY_SEPARATOR);
    key.push_str(prefix);
    for part in parts {
        key.push(KEY_SEPARATOR);
        key.push_str(part);
    }
    key
}
