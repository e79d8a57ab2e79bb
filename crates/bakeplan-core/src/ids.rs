//! Typed identifiers for planning entities.
//!
//! Nodes, products, and trucks are keyed by the natural string ids of the
//! source data (location codes, SKU codes). Newtypes keep them from being
//! mixed up and give them a stable `Ord` so they can key `BTreeMap`s
//! deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a network node (manufacturing site, hub, buffer, breadroom).
    NodeId
);
string_id!(
    /// Canonical SKU identifier.
    ProductId
);
string_id!(
    /// Identifier of a scheduled truck.
    TruckId
);

/// Identifier of a traceability batch, assigned sequentially during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub usize);

impl BatchId {
    pub fn new(id: usize) -> Self {
        BatchId(id)
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = NodeId::new("6122");
        assert_eq!(id.as_str(), "6122");
        assert_eq!(id.to_string(), "6122");
        assert_eq!(NodeId::from("6122"), id);
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // NodeId and ProductId with the same string must not compare;
        // this is a compile-time property, so just exercise both.
        let n = NodeId::new("x");
        let p = ProductId::new("x");
        assert_eq!(n.as_str(), p.as_str());
    }

    #[test]
    fn test_batch_id_display() {
        assert_eq!(BatchId::new(7).to_string(), "batch-7");
    }
}
