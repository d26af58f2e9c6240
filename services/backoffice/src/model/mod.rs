//! Back-office data model.
//!
//! # Purpose
//! Re-exports role and profile-mapping records, their create/patch inputs,
//! and the closed value sets (permissions, role names, profile kinds) shared
//! by the store and API layers.
use thiserror::Error;

/// Raised when a string is not a member of one of the closed value sets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

// Closed string-backed enums: canonical token, catalog order, serde as the token.
macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $token:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            /// Every member, in catalog order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($token => Ok($name::$variant),)+
                    _ => Err($crate::model::UnknownValue {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <String as serde::Deserialize>::deserialize(deserializer)?;
                value.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

mod permission;
mod profile_mapping;
mod role;

pub use permission::{Permission, RoleName, normalize_permissions};
pub use profile_mapping::{
    NewProfileMapping, ProfileKind, ProfileMapping, ProfileMappingFilter, ProfileMappingPatch,
    ProfileRef, ProfileRefError,
};
pub use role::{NewRole, Role, RolePatch};
