//! The objwire type universe.
//!
//! Types appear in two places: as the declared type of a member or array
//! element ([`TypeRef`]) and as the concrete runtime type of an object
//! ([`TypeName`]). Primitive types carry a one-byte wire code shared by the
//! record model and the primitive codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed set of primitive value types with their wire codes.
///
/// Codes 4, 17 (null) and 18 (string) are not primitive value types and
/// have no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Decimal,
    Double,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    TimeSpan,
    DateTime,
    UInt16,
    UInt32,
    UInt64,
}

impl PrimitiveType {
    /// Every primitive type, in wire-code order.
    pub const ALL: [PrimitiveType; 15] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Char,
        PrimitiveType::Decimal,
        PrimitiveType::Double,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::SByte,
        PrimitiveType::Single,
        PrimitiveType::TimeSpan,
        PrimitiveType::DateTime,
        PrimitiveType::UInt16,
        PrimitiveType::UInt32,
        PrimitiveType::UInt64,
    ];

    /// The one-byte wire code.
    pub fn code(self) -> u8 {
        match self {
            PrimitiveType::Boolean => 1,
            PrimitiveType::Byte => 2,
            PrimitiveType::Char => 3,
            PrimitiveType::Decimal => 5,
            PrimitiveType::Double => 6,
            PrimitiveType::Int16 => 7,
            PrimitiveType::Int32 => 8,
            PrimitiveType::Int64 => 9,
            PrimitiveType::SByte => 10,
            PrimitiveType::Single => 11,
            PrimitiveType::TimeSpan => 12,
            PrimitiveType::DateTime => 13,
            PrimitiveType::UInt16 => 14,
            PrimitiveType::UInt32 => 15,
            PrimitiveType::UInt64 => 16,
        }
    }

    /// Look up a primitive type by wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.code() == code)
    }

    /// Name of the core-library type that boxes this primitive.
    pub fn core_type_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "System.Boolean",
            PrimitiveType::Byte => "System.Byte",
            PrimitiveType::Char => "System.Char",
            PrimitiveType::Decimal => "System.Decimal",
            PrimitiveType::Double => "System.Double",
            PrimitiveType::Int16 => "System.Int16",
            PrimitiveType::Int32 => "System.Int32",
            PrimitiveType::Int64 => "System.Int64",
            PrimitiveType::SByte => "System.SByte",
            PrimitiveType::Single => "System.Single",
            PrimitiveType::TimeSpan => "System.TimeSpan",
            PrimitiveType::DateTime => "System.DateTime",
            PrimitiveType::UInt16 => "System.UInt16",
            PrimitiveType::UInt32 => "System.UInt32",
            PrimitiveType::UInt64 => "System.UInt64",
        }
    }

    /// Inverse of [`PrimitiveType::core_type_name`].
    pub fn from_core_type_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.core_type_name() == name)
    }

    /// Short lowercase name used in textual type references.
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "bool",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Decimal => "decimal",
            PrimitiveType::Double => "double",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::SByte => "sbyte",
            PrimitiveType::Single => "single",
            PrimitiveType::TimeSpan => "timespan",
            PrimitiveType::DateTime => "datetime",
            PrimitiveType::UInt16 => "uint16",
            PrimitiveType::UInt32 => "uint32",
            PrimitiveType::UInt64 => "uint64",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.keyword() == keyword)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Name of the core-library string type.
pub const CORE_STRING: &str = "System.String";

/// Name of the core-library root object type.
pub const CORE_OBJECT: &str = "System.Object";

/// A concrete type: full type name plus the assembly that defines it.
///
/// `assembly == None` denotes the core runtime library, which is never
/// transmitted explicitly (assembly id 0 on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
}

impl TypeName {
    pub fn new(name: impl Into<String>, assembly: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assembly: Some(assembly.into()),
        }
    }

    /// A type defined by the core runtime library.
    pub fn core(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assembly: None,
        }
    }

    pub fn is_core(&self) -> bool {
        self.assembly.is_none()
    }

    /// Whether the name denotes an array type (`Foo[]`, `Foo[,]`, `Foo[][]`).
    pub fn is_array(&self) -> bool {
        self.name.ends_with(']') && array_base_name(&self.name).1 > 0
    }

    /// The assembly's simple name, if any.
    pub fn simple_assembly(&self) -> Option<&str> {
        self.assembly.as_deref().map(simple_assembly_name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.assembly {
            Some(asm) => write!(f, "{}, {}", self.name, asm),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for TypeName {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypeParseError(s.to_string()));
        }
        match s.split_once(',') {
            Some((name, asm)) if !name.trim().is_empty() && !asm.trim().is_empty() => {
                Ok(TypeName::new(name.trim(), asm.trim()))
            }
            Some(_) => Err(TypeParseError(s.to_string())),
            None => Ok(TypeName::core(s)),
        }
    }
}

/// Strip version, culture and key information from an assembly name.
///
/// `"App, Version=1.0.0.0, Culture=neutral"` becomes `"App"`.
pub fn simple_assembly_name(assembly: &str) -> &str {
    assembly.split(',').next().unwrap_or(assembly).trim()
}

/// Split trailing array rank specifiers off a type name.
///
/// Returns the element base name and the number of `[...]` groups removed.
pub fn array_base_name(name: &str) -> (&str, usize) {
    let mut base = name;
    let mut depth = 0;
    while let Some(stripped) = base.strip_suffix(']') {
        match stripped.rfind('[') {
            Some(open) if stripped[open + 1..].chars().all(|c| c == ',') => {
                base = &stripped[..open];
                depth += 1;
            }
            _ => break,
        }
    }
    (base, depth)
}

/// The declared type of a member or array element.
///
/// Mirrors the eight binary type kinds of the wire format: the declared
/// type decides whether a value travels as an untagged primitive, a tagged
/// primitive, a string record, or an object/array record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Primitive(PrimitiveType),
    String,
    /// Any value; primitives are tagged with their type code.
    Object,
    /// A named class or struct type.
    Class(TypeName),
    ObjectArray,
    StringArray,
    PrimitiveArray(PrimitiveType),
}

impl TypeRef {
    pub fn class(name: impl Into<String>, assembly: impl Into<String>) -> Self {
        TypeRef::Class(TypeName::new(name, assembly))
    }

    pub fn core_class(name: impl Into<String>) -> Self {
        TypeRef::Class(TypeName::core(name))
    }

    /// Whether values of this type are themselves arrays.
    pub fn is_array(&self) -> bool {
        match self {
            TypeRef::ObjectArray | TypeRef::StringArray | TypeRef::PrimitiveArray(_) => true,
            TypeRef::Class(name) => name.is_array(),
            TypeRef::Primitive(_) | TypeRef::String | TypeRef::Object => false,
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeRef::Primitive(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => write!(f, "{p}"),
            TypeRef::String => f.write_str("string"),
            TypeRef::Object => f.write_str("object"),
            TypeRef::Class(name) => write!(f, "{name}"),
            TypeRef::ObjectArray => f.write_str("object[]"),
            TypeRef::StringArray => f.write_str("string[]"),
            TypeRef::PrimitiveArray(p) => write!(f, "{p}[]"),
        }
    }
}

/// Error returned when a textual type reference cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type reference: {0:?}")]
pub struct TypeParseError(pub String);

impl FromStr for TypeRef {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "string" => return Ok(TypeRef::String),
            "object" => return Ok(TypeRef::Object),
            "object[]" => return Ok(TypeRef::ObjectArray),
            "string[]" => return Ok(TypeRef::StringArray),
            _ => {}
        }
        if let Some(p) = PrimitiveType::from_keyword(s) {
            return Ok(TypeRef::Primitive(p));
        }
        if let Some(p) = s.strip_suffix("[]").and_then(PrimitiveType::from_keyword) {
            return Ok(TypeRef::PrimitiveArray(p));
        }
        s.parse::<TypeName>().map(TypeRef::Class)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}
