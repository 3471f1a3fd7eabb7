//! Identifier support: store-side ID generation and typed UUID identifiers.

use uuid::Uuid;

/// Identifier types a store can generate on first persistence.
///
/// `sequence` is a per-store counter starting at 1. Numeric identifiers use
/// it directly; UUID-based identifiers ignore it and draw a fresh UUIDv7.
pub trait GenerateId: Sized {
    fn generate(sequence: u64) -> Self;
}

impl GenerateId for i32 {
    fn generate(sequence: u64) -> Self {
        i32::try_from(sequence).unwrap_or(i32::MAX)
    }
}

impl GenerateId for i64 {
    fn generate(sequence: u64) -> Self {
        i64::try_from(sequence).unwrap_or(i64::MAX)
    }
}

impl GenerateId for u32 {
    fn generate(sequence: u64) -> Self {
        u32::try_from(sequence).unwrap_or(u32::MAX)
    }
}

impl GenerateId for u64 {
    fn generate(sequence: u64) -> Self {
        sequence
    }
}

impl GenerateId for Uuid {
    fn generate(_sequence: u64) -> Self {
        Uuid::now_v7()
    }
}

impl GenerateId for String {
    fn generate(_sequence: u64) -> Self {
        Uuid::now_v7().to_string()
    }
}

/// Defines a `Uuid` newtype identifier.
///
/// The generated type is `Copy`, serializes transparently as the inner UUID,
/// parses from its string form and implements [`GenerateId`].
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name($crate::__private::Uuid);

        impl $name {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self($crate::__private::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: $crate::__private::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &$crate::__private::Uuid {
                &self.0
            }
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::convert::From<$crate::__private::Uuid> for $name {
            fn from(value: $crate::__private::Uuid) -> Self {
                Self(value)
            }
        }

        impl ::core::convert::From<$name> for $crate::__private::Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::CrudError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                $crate::__private::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| {
                        $crate::CrudError::validation(format!("{}: {}", stringify!($name), e))
                    })
            }
        }

        impl $crate::GenerateId for $name {
            fn generate(_sequence: u64) -> Self {
                Self::new()
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                $crate::__private::serde::Serialize::serialize(&self.0, serializer)
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                <$crate::__private::Uuid as $crate::__private::serde::Deserialize<'de>>::deserialize(
                    deserializer,
                )
                .map(Self)
            }
        }
    };
}
