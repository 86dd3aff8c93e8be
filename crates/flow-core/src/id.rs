use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for canvas IDs (fast comparisons, low memory).
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Counter shared by every generated ID, so prefixes never collide with each other.
static COUNTER: AtomicU64 = AtomicU64::new(0);

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an ID, or return the existing one.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a new ID with a prefix (e.g. `http_request_3`).
            ///
            /// Uniqueness is only guaranteed among generated IDs; callers that
            /// also hold imported IDs must check for collisions.
            pub fn with_prefix(prefix: &str) -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                Self::intern(&format!("{prefix}_{n}"))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::intern(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id! {
    /// Identifier of a node on the canvas. 4 bytes, `Copy`, O(1) `Eq`/`Hash`.
    NodeId
}

interned_id! {
    /// Identifier of a connection between two nodes.
    ConnectionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("http_request");
        let b = NodeId::intern("http_request");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "http_request");
        assert_eq!(a.to_string(), "http_request");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = NodeId::with_prefix("node");
        let b = NodeId::with_prefix("node");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("node_"));
    }

    #[test]
    fn node_and_connection_ids_share_spelling_not_type() {
        let n = NodeId::intern("shared");
        let c = ConnectionId::intern("shared");
        assert_eq!(n.as_str(), c.as_str());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ConnectionId::intern("conn_a_b");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""conn_a_b""#);
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
