//! Field descriptors and the generic schema walker.
//!
//! A configuration type describes itself through a `const` table of
//! [`FieldDescriptor`]s and hands out mutable [`FieldSlot`]s on request. Every
//! resolution stage is a [`Visitor`] driven by the single [`walk`] function,
//! so no stage knows anything about the concrete type it is filling.
//!
//! Types are normally declared with [`config_schema!`](crate::config_schema),
//! which generates the table and both trait impls:
//!
//! ```
//! qr_svr::config_schema! {
//!     #[derive(Debug, Default)]
//!     pub struct Redis {
//!         #[config(key = "redis_host", default = "$ENV$REDIS_HOST")]
//!         pub host: String,
//!         #[config(default = "6379")]
//!         pub port: i64,
//!     }
//! }
//!
//! assert_eq!(Redis::FIELDS[0].document_key(), "redis_host");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use super::error::ConfigError;

/// The closed set of kinds the resolver understands, plus a catch-all for
/// everything else.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    /// A nested structure, carrying that structure's own descriptor table.
    Nested(&'static [FieldDescriptor]),
    /// Any other Rust type. The label is used in diagnostics.
    Unsupported(&'static str),
}

impl FieldKind {
    pub const fn name(&self) -> &'static str {
        match *self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Nested(_) => "nested structure",
            FieldKind::Unsupported(label) => label,
        }
    }
}

/// Structural metadata about one schema field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Default literal, in string form. Parsed according to `kind`.
    pub default: Option<&'static str>,
    /// Key used to match this field in the config document.
    pub key: Option<&'static str>,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            default: None,
            key: None,
        }
    }

    pub const fn with_default(self, literal: &'static str) -> Self {
        Self {
            default: Some(literal),
            ..self
        }
    }

    pub const fn with_key(self, key: &'static str) -> Self {
        Self {
            key: Some(key),
            ..self
        }
    }

    /// The document key, falling back to the field name.
    pub fn document_key(&self) -> &'static str {
        self.key.unwrap_or(self.name)
    }
}

/// Mutable access to the storage behind one field.
pub enum FieldSlot<'a> {
    String(&'a mut String),
    Integer(&'a mut i64),
    Boolean(&'a mut bool),
    Nested(&'a mut dyn Schema),
    Unsupported,
}

impl FieldSlot<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldSlot::String(_) => "string",
            FieldSlot::Integer(_) => "integer",
            FieldSlot::Boolean(_) => "boolean",
            FieldSlot::Nested(_) => "nested structure",
            FieldSlot::Unsupported => "unsupported",
        }
    }
}

/// A configuration structure the resolver can fill in place.
pub trait Schema {
    /// Descriptors for every declared field, in declaration order.
    fn descriptors(&self) -> &'static [FieldDescriptor];

    /// Mutable access to the named field. `None` marks the field as not
    /// settable.
    fn field_slot(&mut self, name: &str) -> Option<FieldSlot<'_>>;
}

/// Maps a Rust field type onto a [`FieldKind`].
pub trait FieldType {
    const KIND: FieldKind;

    fn as_slot(&mut self) -> FieldSlot<'_>;
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::String;

    fn as_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::String(self)
    }
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn as_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Integer(self)
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn as_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Boolean(self)
    }
}

macro_rules! unsupported_field_type {
    ($($ty:ty => $label:literal),* $(,)?) => {
        $(
            impl FieldType for $ty {
                const KIND: FieldKind = FieldKind::Unsupported($label);

                fn as_slot(&mut self) -> FieldSlot<'_> {
                    FieldSlot::Unsupported
                }
            }
        )*
    };
}

unsupported_field_type!(
    f32 => "f32",
    f64 => "f64",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    char => "char",
    PathBuf => "path",
);

impl<T> FieldType for Vec<T> {
    const KIND: FieldKind = FieldKind::Unsupported("list");

    fn as_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Unsupported
    }
}

impl<T> FieldType for Option<T> {
    const KIND: FieldKind = FieldKind::Unsupported("optional");

    fn as_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Unsupported
    }
}

impl<K, V, S> FieldType for HashMap<K, V, S> {
    const KIND: FieldKind = FieldKind::Unsupported("map");

    fn as_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Unsupported
    }
}

impl<T: ?Sized> FieldType for Box<T> {
    const KIND: FieldKind = FieldKind::Unsupported("pointer");

    fn as_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Unsupported
    }
}

/// Dotted path of the field being visited, e.g. `redis.host`.
#[derive(Debug, Default, Clone)]
pub struct FieldPath(Vec<&'static str>);

impl FieldPath {
    pub fn push(&mut self, name: &'static str) {
        self.0.push(name);
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}

/// One resolution stage.
pub trait Visitor {
    /// Called for every non-nested field. `slot` is `None` when the schema
    /// declines to expose the field.
    fn visit(
        &mut self,
        path: &FieldPath,
        field: &FieldDescriptor,
        slot: Option<FieldSlot<'_>>,
    ) -> Result<(), ConfigError>;

    /// Called before descending into a nested field. Returning `false` skips
    /// the subtree (and the matching [`leave`](Visitor::leave)).
    fn enter(&mut self, _path: &FieldPath, _field: &FieldDescriptor) -> Result<bool, ConfigError> {
        Ok(true)
    }

    fn leave(&mut self, _path: &FieldPath, _field: &FieldDescriptor) {}
}

/// Visit every field of `schema` depth-first, in declaration order.
pub fn walk(schema: &mut dyn Schema, visitor: &mut dyn Visitor) -> Result<(), ConfigError> {
    let mut path = FieldPath::default();
    walk_fields(schema, &mut path, visitor)
}

fn walk_fields(
    schema: &mut dyn Schema,
    path: &mut FieldPath,
    visitor: &mut dyn Visitor,
) -> Result<(), ConfigError> {
    for field in schema.descriptors() {
        path.push(field.name);
        let result = walk_field(schema, field, path, visitor);
        path.pop();
        result?;
    }
    Ok(())
}

fn walk_field(
    schema: &mut dyn Schema,
    field: &FieldDescriptor,
    path: &mut FieldPath,
    visitor: &mut dyn Visitor,
) -> Result<(), ConfigError> {
    if let FieldKind::Nested(_) = field.kind {
        let child = match schema.field_slot(field.name) {
            Some(FieldSlot::Nested(child)) => child,
            Some(other) => return Err(kind_mismatch(path, field, &other)),
            None => return Err(not_settable(path)),
        };
        if visitor.enter(path, field)? {
            walk_fields(child, path, visitor)?;
            visitor.leave(path, field);
        }
        return Ok(());
    }

    let slot = schema.field_slot(field.name);
    if let Some(slot) = &slot {
        if !kind_matches(field.kind, slot) {
            return Err(kind_mismatch(path, field, slot));
        }
    }
    visitor.visit(path, field, slot)
}

fn kind_matches(kind: FieldKind, slot: &FieldSlot<'_>) -> bool {
    matches!(
        (kind, slot),
        (FieldKind::String, FieldSlot::String(_))
            | (FieldKind::Integer, FieldSlot::Integer(_))
            | (FieldKind::Boolean, FieldSlot::Boolean(_))
            | (FieldKind::Nested(_), FieldSlot::Nested(_))
            | (FieldKind::Unsupported(_), FieldSlot::Unsupported)
    )
}

fn kind_mismatch(path: &FieldPath, field: &FieldDescriptor, slot: &FieldSlot<'_>) -> ConfigError {
    ConfigError::Schema {
        field: path.to_string(),
        reason: format!(
            "declared as {} but its storage is {}",
            field.kind.name(),
            slot.kind_name()
        ),
    }
}

pub(crate) fn not_settable(path: &FieldPath) -> ConfigError {
    ConfigError::Schema {
        field: path.to_string(),
        reason: "field is not settable".into(),
    }
}

/// Declare a configuration struct together with its descriptor table.
///
/// Each field may carry one `#[config(...)]` attribute with `key = "..."`
/// and/or `default = "..."`. Doc comments go before it. Field types must be
/// `String`, `i64`, `bool`, or another `config_schema!` struct; any other
/// type is accepted but treated as an unsupported kind.
#[macro_export]
macro_rules! config_schema {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[config($($opt:ident = $val:literal),* $(,)?)])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $fvis $field: $ty,
            )*
        }

        impl $name {
            /// Field descriptors in declaration order.
            pub const FIELDS: &'static [$crate::config::FieldDescriptor] = &[
                $(
                    $crate::config::FieldDescriptor {
                        name: ::core::stringify!($field),
                        kind: <$ty as $crate::config::FieldType>::KIND,
                        default: $crate::__schema_opt!(default; $($($opt = $val),*)?),
                        key: $crate::__schema_opt!(key; $($($opt = $val),*)?),
                    },
                )*
            ];
        }

        impl $crate::config::Schema for $name {
            fn descriptors(&self) -> &'static [$crate::config::FieldDescriptor] {
                Self::FIELDS
            }

            #[allow(unused_variables)]
            fn field_slot(
                &mut self,
                name: &str,
            ) -> ::core::option::Option<$crate::config::FieldSlot<'_>> {
                $(
                    if name == ::core::stringify!($field) {
                        return ::core::option::Option::Some(
                            $crate::config::FieldType::as_slot(&mut self.$field),
                        );
                    }
                )*
                ::core::option::Option::None
            }
        }

        impl $crate::config::FieldType for $name {
            const KIND: $crate::config::FieldKind = $crate::config::FieldKind::Nested($name::FIELDS);

            fn as_slot(&mut self) -> $crate::config::FieldSlot<'_> {
                $crate::config::FieldSlot::Nested(self)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __schema_opt {
    ($want:ident;) => {
        ::core::option::Option::None
    };
    (default; default = $val:literal $(, $($rest:tt)*)?) => {
        ::core::option::Option::Some($val)
    };
    (key; key = $val:literal $(, $($rest:tt)*)?) => {
        ::core::option::Option::Some($val)
    };
    ($want:ident; default = $val:literal $(, $($rest:tt)*)?) => {
        $crate::__schema_opt!($want; $($($rest)*)?)
    };
    ($want:ident; key = $val:literal $(, $($rest:tt)*)?) => {
        $crate::__schema_opt!($want; $($($rest)*)?)
    };
}
