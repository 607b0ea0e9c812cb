use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a root (commit) snapshot.
///
/// Only the backing source knows how to parse and render a `RootId`; the
/// cache carries it around unchanged.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RootId(String);

impl RootId {
    /// Wrap a backing-source specific root string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The underlying string value.
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootId({})", self.0)
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RootId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RootId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_is_kept_verbatim() {
        let root = RootId::new("0123abcd");
        assert_eq!(root.value(), "0123abcd");
        assert_eq!(root.to_string(), "0123abcd");
        assert_eq!(format!("{root:?}"), "RootId(0123abcd)");
    }

    #[test]
    fn conversions_agree() {
        assert_eq!(RootId::from("main"), RootId::from(String::from("main")));
    }
}
