//! Opaque keys identifying concurrently running test sessions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one execution context.
///
/// Runners usually key contexts by the driving thread, but any stable value
/// works as long as each concurrently running suite gets its own key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextKey(String);

impl ContextKey {
    /// Creates a fresh, unique key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a key from a caller-chosen name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates the key for the calling thread.
    #[must_use]
    pub fn current_thread() -> Self {
        let thread = std::thread::current();
        match thread.name() {
            Some(name) => Self(format!("thread:{name}:{:?}", thread.id())),
            None => Self(format!("thread:{:?}", thread.id())),
        }
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContextKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}

impl From<String> for ContextKey {
    fn from(value: String) -> Self {
        Self::named(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keys_are_unique() {
        assert_ne!(ContextKey::new(), ContextKey::new());
    }

    #[test]
    fn test_named_key() {
        let key = ContextKey::named("suite-a");
        assert_eq!(key.as_str(), "suite-a");
        assert_eq!(key, ContextKey::from("suite-a"));
    }

    #[test]
    fn test_current_thread_key_is_stable_per_thread() {
        let here = ContextKey::current_thread();
        assert_eq!(here, ContextKey::current_thread());

        let there = std::thread::spawn(ContextKey::current_thread).join().unwrap();
        assert_ne!(here, there);
    }
}
