//! Strongly typed identifiers.
//!
//! All ids are opaque to the client: they are compared and used as map keys,
//! never parsed for meaning or generated locally for server-confirmed items.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifier of a stream or video whose comment feed is synchronized.
    SubjectId
);
define_id!(
    /// Identifier of a top-level message or reply, unique within a subject.
    MessageId
);
define_id!(
    /// Identifier of the viewer driving the client.
    ViewerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_transparently() {
        let raw = Uuid::parse_str("6f1c0d52-3e33-4bb1-9a54-1d2f0c7b8e11").unwrap();
        let id = MessageId::from_uuid(raw);
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"6f1c0d52-3e33-4bb1-9a54-1d2f0c7b8e11\""
        );
        let back: MessageId = serde_json::from_str("\"6f1c0d52-3e33-4bb1-9a54-1d2f0c7b8e11\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ids_parse_from_str() {
        let id: SubjectId = "00000000-0000-0000-0000-000000000001".parse().unwrap();
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000001");
        assert!("not-a-uuid".parse::<ViewerId>().is_err());
    }
}
