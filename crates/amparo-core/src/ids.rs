//! Strongly typed identifiers.
//!
//! Newtype wrappers around UUIDs so that a `ChildId` can never be passed
//! where a `ClaimId` is expected. The database layer stores plain UUIDs;
//! these types live at the service boundaries.
//!
//! # Example
//!
//! ```
//! use amparo_core::{ChildId, ClaimId};
//!
//! fn requires_child(id: ChildId) -> String {
//!     id.to_string()
//! }
//!
//! let child = ChildId::new();
//! let _ = requires_child(child);
//! // requires_child(ClaimId::new()); // does not compile
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The underlying UUID parse error message.
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Consumes the ID, returning the underlying UUID.
            #[must_use]
            pub const fn into_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Identifier for a family in the resource catalog.
    FamilyId
);

define_id!(
    /// Identifier for a child in the resource catalog.
    ChildId
);

define_id!(
    /// Identifier for a single-child claim ledger row.
    ClaimId
);

define_id!(
    /// Identifier for a multi-child reservation ledger row.
    ReservationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ChildId::new();
        let b = ChildId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip_through_uuid() {
        let id = ReservationId::new();
        let uuid = id.into_uuid();
        assert_eq!(ReservationId::from_uuid(uuid), id);
    }

    #[test]
    fn test_display_and_parse() {
        let id = ClaimId::new();
        let parsed: ClaimId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_failure_names_the_type() {
        let err = "not-a-uuid".parse::<FamilyId>().unwrap_err();
        assert_eq!(err.id_type, "FamilyId");
        assert!(err.to_string().contains("FamilyId"));
    }

    #[test]
    fn test_serde_transparent() {
        let id = ChildId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: ChildId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
