use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::borrow::Borrow;
use std::fmt;

/// Declares a name-keyed identifier. Names are the campaign's primary keys,
/// so each entity kind gets its own newtype to keep them from mixing.
macro_rules! name_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
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
            fn from(name: &str) -> Self {
                Self(name.to_string())
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self(name)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

name_id! {
    /// Identifies a planet in the galaxy graph.
    PlanetId
}

name_id! {
    /// Identifies a player.
    PlayerId
}

name_id! {
    /// Identifies a faction. Factions exist implicitly through their members
    /// and through planet control/alignment.
    FactionId
}

name_id! {
    /// Identifies a ship template in the catalog.
    ShipTypeId
}

name_id! {
    /// Names a fleet. Unique per (planet, player) fleet table.
    FleetName
}

new_key_type! {
    /// Identifies an in-flight transit order on its owning player.
    pub struct TransitId;
}
