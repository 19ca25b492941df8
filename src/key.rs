//! Identifier types for catalog content.
//!
//! All identifiers are interned strings (`Arc<str>`) so that the many
//! clones made during a computation share one allocation and compare
//! cheaply. Four distinct types keep statistic keys, entity ids, modifier
//! ids and toggle ids from being mixed up at API boundaries.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

macro_rules! interned_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create a new identifier from a string slice.
            pub fn new(s: &str) -> Self {
                Self(Arc::from(s))
            }

            /// Get the string representation of this identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            ///
            /// Empty identifiers mark malformed catalog entries and are
            /// skipped defensively during activation.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.0.as_ref().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from(s))
            }
        }
    };
}

interned_id! {
    /// Key of a derived statistic (e.g. `vit`, `initiative`).
    ///
    /// Statistic keys double as formula variable names: a formula that
    /// mentions `vit` reads the previous pass's resolved value of the
    /// statistic keyed `vit`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use buildstat::StatKey;
    ///
    /// let vit = StatKey::new("vit");
    /// let vit2: StatKey = "vit".into();
    /// assert_eq!(vit, vit2);
    /// assert_eq!(vit.as_str(), "vit");
    /// ```
    StatKey
}

interned_id! {
    /// Id of a catalog entity (race, class, item, set, ...).
    EntityId
}

interned_id! {
    /// Id of a single modifier within an entity.
    ModifierId
}

interned_id! {
    /// Id of a boolean toggle in the build selection.
    ToggleId
}
