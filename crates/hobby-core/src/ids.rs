//! Branded ID newtypes.
//!
//! Milestones, users and photos each get their own ID type so a photo ID
//! can never be handed to a milestone lookup. Fresh IDs are a short entity
//! prefix followed by a UUID v7, which keeps them time-ordered.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix used for freshly generated IDs.
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new time-ordered ID.
            #[must_use]
            pub fn new() -> Self {
                Self(format!("{}-{}", Self::PREFIX, Uuid::now_v7()))
            }

            /// Wrap an existing string value (e.g. read back from storage).
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of one milestone node.
    MilestoneId, "ms"
}

branded_id! {
    /// Identifier of the user owning a milestone tree.
    UserId, "user"
}

branded_id! {
    /// Identifier of an uploaded photo that milestones may be tagged with.
    PhotoId, "photo"
}
