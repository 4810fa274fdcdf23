//! Dimension tags.

use std::fmt;
use std::sync::Arc;

/// Identifies the broadcast universe an endpoint lives in.
///
/// Opaque to the topology: two dimensions are the same iff their names are
/// equal. Cloning is a reference-count bump.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionId(Arc<str>);

impl DimensionId {
    /// Create a dimension identifier from its name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The dimension's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DimensionId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for DimensionId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_name() {
        let a = DimensionId::new("overworld");
        let b = DimensionId::from(String::from("overworld"));
        let c = DimensionId::from("nether");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "overworld");
        assert_eq!(c.to_string(), "nether");
    }
}
