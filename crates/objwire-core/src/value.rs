//! Member and array-cell values.
//!
//! A [`Value`] is what a single member slot or array cell holds: nothing,
//! an inline primitive, a string, or a handle to a node in the owning
//! [`ObjectGraph`](crate::graph::ObjectGraph).

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::graph::NodeId;
use crate::types::PrimitiveType;

/// A decimal number kept in its invariant textual form.
///
/// The wire carries decimals as strings, so the text is preserved exactly
/// (including trailing zeros) and only validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal(String);

/// Error returned for text that is not a decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal: {0:?}")]
pub struct DecimalParseError(pub String);

impl Decimal {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn zero() -> Self {
        Decimal("0".to_string())
    }

    /// Parse into an arbitrary-precision number for arithmetic or comparison.
    pub fn to_big(&self) -> BigDecimal {
        // Validated at construction.
        BigDecimal::from_str(&self.0).unwrap_or_default()
    }
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let plain = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+');
        if plain && BigDecimal::from_str(s).is_ok() {
            Ok(Decimal(s.to_string()))
        } else {
            Err(DecimalParseError(s.to_string()))
        }
    }
}

impl TryFrom<String> for Decimal {
    type Error = DecimalParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Decimal> for String {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a [`DateTime`] relates to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateTimeKind {
    Unspecified,
    Utc,
    Local,
}

/// A timestamp as 100-nanosecond ticks since 0001-01-01 plus a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateTime {
    pub ticks: i64,
    pub kind: DateTimeKind,
}

const TICKS_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;

impl DateTime {
    pub fn new(ticks: i64, kind: DateTimeKind) -> Self {
        Self { ticks, kind }
    }

    /// Pack into the 64-bit wire form: 62 bits of ticks, 2 bits of kind.
    pub fn to_bits(self) -> i64 {
        let kind: u64 = match self.kind {
            DateTimeKind::Unspecified => 0,
            DateTimeKind::Utc => 1,
            DateTimeKind::Local => 2,
        };
        ((self.ticks as u64 & TICKS_MASK) | (kind << 62)) as i64
    }

    pub fn from_bits(bits: i64) -> Self {
        let raw = bits as u64;
        let kind = match raw >> 62 {
            1 => DateTimeKind::Utc,
            // Kind 3 is a local time in the ambiguous DST hour.
            2 | 3 => DateTimeKind::Local,
            _ => DateTimeKind::Unspecified,
        };
        Self {
            ticks: (raw & TICKS_MASK) as i64,
            kind,
        }
    }
}

/// An inline primitive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Boolean(bool),
    Byte(u8),
    Char(char),
    Decimal(Decimal),
    Double(f64),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    SByte(i8),
    Single(f32),
    /// Duration in 100-nanosecond ticks.
    TimeSpan(i64),
    DateTime(DateTime),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveType {
        match self {
            Primitive::Boolean(_) => PrimitiveType::Boolean,
            Primitive::Byte(_) => PrimitiveType::Byte,
            Primitive::Char(_) => PrimitiveType::Char,
            Primitive::Decimal(_) => PrimitiveType::Decimal,
            Primitive::Double(_) => PrimitiveType::Double,
            Primitive::Int16(_) => PrimitiveType::Int16,
            Primitive::Int32(_) => PrimitiveType::Int32,
            Primitive::Int64(_) => PrimitiveType::Int64,
            Primitive::SByte(_) => PrimitiveType::SByte,
            Primitive::Single(_) => PrimitiveType::Single,
            Primitive::TimeSpan(_) => PrimitiveType::TimeSpan,
            Primitive::DateTime(_) => PrimitiveType::DateTime,
            Primitive::UInt16(_) => PrimitiveType::UInt16,
            Primitive::UInt32(_) => PrimitiveType::UInt32,
            Primitive::UInt64(_) => PrimitiveType::UInt64,
        }
    }

    /// The zero value of a primitive type.
    pub fn default_for(ty: PrimitiveType) -> Self {
        match ty {
            PrimitiveType::Boolean => Primitive::Boolean(false),
            PrimitiveType::Byte => Primitive::Byte(0),
            PrimitiveType::Char => Primitive::Char('\0'),
            PrimitiveType::Decimal => Primitive::Decimal(Decimal::zero()),
            PrimitiveType::Double => Primitive::Double(0.0),
            PrimitiveType::Int16 => Primitive::Int16(0),
            PrimitiveType::Int32 => Primitive::Int32(0),
            PrimitiveType::Int64 => Primitive::Int64(0),
            PrimitiveType::SByte => Primitive::SByte(0),
            PrimitiveType::Single => Primitive::Single(0.0),
            PrimitiveType::TimeSpan => Primitive::TimeSpan(0),
            PrimitiveType::DateTime => {
                Primitive::DateTime(DateTime::new(0, DateTimeKind::Unspecified))
            }
            PrimitiveType::UInt16 => Primitive::UInt16(0),
            PrimitiveType::UInt32 => Primitive::UInt32(0),
            PrimitiveType::UInt64 => Primitive::UInt64(0),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Boolean(v) => write!(f, "{v}"),
            Primitive::Byte(v) => write!(f, "{v}"),
            Primitive::Char(v) => write!(f, "{v:?}"),
            Primitive::Decimal(v) => write!(f, "{v}m"),
            Primitive::Double(v) => write!(f, "{v}"),
            Primitive::Int16(v) => write!(f, "{v}"),
            Primitive::Int32(v) => write!(f, "{v}"),
            Primitive::Int64(v) => write!(f, "{v}"),
            Primitive::SByte(v) => write!(f, "{v}"),
            Primitive::Single(v) => write!(f, "{v}"),
            Primitive::TimeSpan(v) => write!(f, "{v} ticks"),
            Primitive::DateTime(v) => write!(f, "@{} ({:?})", v.ticks, v.kind),
            Primitive::UInt16(v) => write!(f, "{v}"),
            Primitive::UInt32(v) => write!(f, "{v}"),
            Primitive::UInt64(v) => write!(f, "{v}"),
        }
    }
}

/// The content of one member slot or array cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Primitive(Primitive),
    /// Strings are shared by content within one serialization call.
    String(String),
    /// A handle to an object or array node.
    Ref(NodeId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Value::Primitive(p) => Some(p),
            _ => None,
        }
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        Value::Primitive(value)
    }
}

impl From<NodeId> for Value {
    fn from(value: NodeId) -> Self {
        Value::Ref(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

macro_rules! primitive_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Primitive(Primitive::$variant(value))
                }
            }
        )*
    };
}

primitive_from! {
    bool => Boolean,
    u8 => Byte,
    char => Char,
    f64 => Double,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i8 => SByte,
    f32 => Single,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
}
