//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier the engine handles. Each wraps a
//! UUID and serializes as the bare UUID string, so the wire format matches
//! the persistence layer while the type system keeps namespaces apart.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            /// Parse from a bare UUID string (the serialized form).
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of the project that owns points, models, and readings.
    ProjectId,
    "project"
);

uuid_newtype!(
    /// Identifier of a structural member (column, beam, slab) within a project.
    MemberId,
    "member"
);

uuid_newtype!(
    /// Identifier of a single core-verified calibration point.
    ///
    /// Ordered, because the fitter sorts points by id to make the design
    /// matrix independent of input order.
    PointId,
    "point"
);

uuid_newtype!(
    /// Identifier of a generated calibration model.
    ModelId,
    "model"
);

uuid_newtype!(
    /// Identifier of a stored field reading.
    ReadingId,
    "reading"
);
