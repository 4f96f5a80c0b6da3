//! Discovers the JSON shape a type expects by probing its `Deserialize` impl.
//!
//! The probe is a deserializer that answers every request with an error
//! naming the kind of value that was asked for. A struct asks for a struct, a
//! `HashMap` asks for a map, a `String` asks for a string, and so on.
//! `Option<T>` and newtype wrappers are unwrapped so the inner type decides.

use std::fmt;

use serde::de::{self, DeserializeOwned, Visitor};

/// The kind of JSON value a type deserializes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A keyed record: a struct or a map.
    Record,
    /// A sequence, tuple, or tuple struct.
    Sequence,
    /// A string, character, or byte buffer.
    Text,
    /// An integer or floating point number.
    Number,
    /// A boolean.
    Boolean,
    /// A unit value or unit struct.
    Unit,
    /// An enum.
    Enum,
    /// A self-describing value such as `serde_json::Value`.
    Dynamic,
}

impl Shape {
    /// Probes `T` for the shape it deserializes from.
    #[must_use]
    pub fn of<T: DeserializeOwned>() -> Self {
        match T::deserialize(Probe) {
            Err(Found::Shape(shape)) => shape,
            Err(Found::Custom) | Ok(_) => Self::Dynamic,
        }
    }

    /// Returns `true` when a value of this shape can hold a keyed record.
    #[must_use]
    pub const fn is_record(self) -> bool {
        matches!(self, Self::Record | Self::Dynamic)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Record => "record",
            Self::Sequence => "sequence",
            Self::Text => "string",
            Self::Number => "number",
            Self::Boolean => "bool",
            Self::Unit => "unit",
            Self::Enum => "enum",
            Self::Dynamic => "dynamic",
        })
    }
}

#[derive(Debug)]
enum Found {
    Shape(Shape),
    Custom,
}

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(shape) => write!(f, "probed {shape}"),
            Self::Custom => f.write_str("probe rejected"),
        }
    }
}

impl std::error::Error for Found {}

impl de::Error for Found {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self::Custom
    }
}

struct Probe;

macro_rules! probe {
    ($($method:ident => $shape:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Found> {
                Err(Found::Shape(Shape::$shape))
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Probe {
    type Error = Found;

    probe! {
        deserialize_any => Dynamic,
        deserialize_bool => Boolean,
        deserialize_i8 => Number,
        deserialize_i16 => Number,
        deserialize_i32 => Number,
        deserialize_i64 => Number,
        deserialize_i128 => Number,
        deserialize_u8 => Number,
        deserialize_u16 => Number,
        deserialize_u32 => Number,
        deserialize_u64 => Number,
        deserialize_u128 => Number,
        deserialize_f32 => Number,
        deserialize_f64 => Number,
        deserialize_char => Text,
        deserialize_str => Text,
        deserialize_string => Text,
        deserialize_bytes => Text,
        deserialize_byte_buf => Text,
        deserialize_unit => Unit,
        deserialize_seq => Sequence,
        deserialize_map => Record,
        deserialize_identifier => Text,
        deserialize_ignored_any => Dynamic,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Found> {
        visitor.visit_some(self)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Found> {
        Err(Found::Shape(Shape::Unit))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Found> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Found> {
        Err(Found::Shape(Shape::Sequence))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Found> {
        Err(Found::Shape(Shape::Sequence))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Found> {
        Err(Found::Shape(Shape::Record))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Found> {
        Err(Found::Shape(Shape::Enum))
    }
}
