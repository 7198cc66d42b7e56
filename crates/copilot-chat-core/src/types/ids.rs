use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Macro to define a newtype ID around an opaque string.
///
/// Identifiers handed out by the agent service carry no structure we can rely
/// on (GUIDs, bot-framework ids, `turn1search0` style tokens), so the newtype
/// only prevents mixing one kind of id with another.
macro_rules! define_id_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the service sent an empty identifier.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id_type!(
    /// Conversation ID
    ///
    /// Assigned by the agent service during the start handshake and required
    /// for every subsequent turn.
    ConversationId
);

define_id_type!(
    /// Activity ID
    ///
    /// Identifies a single activity record within a conversation.
    ActivityId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ConversationId::new("8f1c-conv");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""8f1c-conv""#);

        let parsed: ConversationId = serde_json::from_str(r#""8f1c-conv""#).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed, "8f1c-conv");
    }

    #[test]
    fn empty_ids_are_detectable() {
        assert!(ActivityId::from("").is_empty());
        assert!(!ActivityId::from("a1").is_empty());
    }
}
