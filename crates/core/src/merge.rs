//! Partial merge: copy present source fields onto a target.
//!
//! A field is copied when the target declares it, it is not in the
//! [`IgnoredFields`] list, and the source value is present. `Option::None`
//! is absent; every other value is present. The target is mutated in place.
//!
//! Merge implementations are generated at compile time with
//! [`partial_merge!`](crate::partial_merge), so a type mismatch between a
//! source and target field is a compile error rather than a runtime failure.
//! Hand-written [`Merge`] impls may still fail with [`MergeError`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::MergeError;

/// Fields a merge never writes by default.
pub const DEFAULT_IGNORED_FIELDS: [&str; 4] = ["id", "version", "createdAt", "updatedAt"];

/// Names of fields a merge must leave untouched.
///
/// Names are compared ignoring case and underscores, so `createdAt` also
/// covers a Rust field named `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredFields {
    fields: BTreeSet<String>,
}

impl IgnoredFields {
    /// Ignore nothing.
    pub fn none() -> Self {
        Self {
            fields: BTreeSet::new(),
        }
    }

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fields: fields.into_iter().map(|f| normalize(f.as_ref())).collect(),
        }
    }

    pub fn with(mut self, field: impl AsRef<str>) -> Self {
        self.fields.insert(normalize(field.as_ref()));
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(&normalize(field))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for IgnoredFields {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED_FIELDS)
    }
}

fn normalize(field: &str) -> String {
    field
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A target field that can receive a merged value.
pub trait MergeSlot {
    type Value;

    fn put(&mut self, value: Self::Value);
}

/// A source field that may or may not carry a value.
pub trait MergeSource {
    type Value;

    fn present(&self) -> Option<&Self::Value>;
}

impl<T> MergeSlot for Option<T> {
    type Value = T;

    fn put(&mut self, value: T) {
        *self = Some(value);
    }
}

impl<T> MergeSource for Option<T> {
    type Value = T;

    fn present(&self) -> Option<&T> {
        self.as_ref()
    }
}

/// Declares plain (always present) types as merge slots and sources.
///
/// Use it for your own field types, e.g. `merge_value!(Money, Address);`.
#[macro_export]
macro_rules! merge_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::merge::MergeSlot for $t {
                type Value = $t;

                fn put(&mut self, value: $t) {
                    *self = value;
                }
            }

            impl $crate::merge::MergeSource for $t {
                type Value = $t;

                fn present(&self) -> ::core::option::Option<&$t> {
                    ::core::option::Option::Some(self)
                }
            }
        )*
    };
}

merge_value!(
    String,
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    uuid::Uuid,
    chrono::DateTime<chrono::Utc>,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    serde_json::Value,
);

macro_rules! merge_collection {
    ($($t:ident<$($p:ident),+>),* $(,)?) => {
        $(
            impl<$($p),+> MergeSlot for $t<$($p),+> {
                type Value = $t<$($p),+>;

                fn put(&mut self, value: Self::Value) {
                    *self = value;
                }
            }

            impl<$($p),+> MergeSource for $t<$($p),+> {
                type Value = $t<$($p),+>;

                fn present(&self) -> Option<&Self::Value> {
                    Some(self)
                }
            }
        )*
    };
}

merge_collection!(Vec<T>, BTreeSet<T>, HashSet<T>, BTreeMap<K, V>, HashMap<K, V>);

/// Partial merge of `S` onto `Self`.
pub trait Merge<S: ?Sized> {
    fn merge_from(&mut self, source: &S, ignored: &IgnoredFields) -> Result<(), MergeError>;
}

/// Merges `source` onto `target` and hands the target back.
pub fn merge<'t, S, T>(source: &S, target: &'t mut T, ignored: &IgnoredFields) -> Result<&'t mut T, MergeError>
where
    S: ?Sized,
    T: Merge<S>,
{
    target.merge_from(source, ignored)?;
    Ok(target)
}

/// Generates a [`Merge`] implementation from a field list.
///
/// Every listed field must exist on both types; the source field's present
/// value must have the same type as the target slot's value.
///
/// ```ignore
/// partial_merge!(ModelRequest => Model { text, number });
/// partial_merge!(Model => Model { id, version, text, number });
/// ```
#[macro_export]
macro_rules! partial_merge {
    ($source:ty => $target:ty { $($field:ident),* $(,)? }) => {
        impl $crate::merge::Merge<$source> for $target {
            #[allow(unused_variables)]
            fn merge_from(
                &mut self,
                source: &$source,
                ignored: &$crate::merge::IgnoredFields,
            ) -> ::core::result::Result<(), $crate::MergeError> {
                $(
                    if !ignored.contains(stringify!($field)) {
                        if let ::core::option::Option::Some(value) =
                            $crate::merge::MergeSource::present(&source.$field)
                        {
                            $crate::merge::MergeSlot::put(
                                &mut self.$field,
                                ::core::clone::Clone::clone(value),
                            );
                        }
                    }
                )*
                ::core::result::Result::Ok(())
            }
        }
    };
}
