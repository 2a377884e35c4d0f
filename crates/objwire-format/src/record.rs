//! The record model: tags, member type kinds, array shapes and the records
//! themselves, each with its exact field layout.

use std::fmt;
use std::io::{Read, Write};

use objwire_core::graph::ArrayKind;
use objwire_core::types::PrimitiveType;
use objwire_core::value::Primitive;

use crate::codec::{WireReader, WireWriter};
use crate::error::FormatError;

/// Current stream format version.
pub const MAJOR_VERSION: i32 = 1;
pub const MINOR_VERSION: i32 = 0;

/// Header id sent when a stream carries no out-of-band headers.
pub const NO_HEADERS: i32 = -1;

/// One-byte record tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordTag {
    Header = 0,
    Object = 1,
    ObjectWithSchema = 2,
    ObjectWithSchemaAssembly = 3,
    ObjectWithSchemaTyped = 4,
    ObjectWithSchemaTypedAssembly = 5,
    ObjectString = 6,
    Array = 7,
    MemberPrimitiveTyped = 8,
    MemberReference = 9,
    ObjectNull = 10,
    MessageEnd = 11,
    Assembly = 12,
    ObjectNullMultiple256 = 13,
    ObjectNullMultiple = 14,
    ArraySinglePrimitive = 15,
    ArraySingleObject = 16,
    ArraySingleString = 17,
    CrossDomainMap = 18,
    CrossDomainString = 19,
    CrossDomainAssembly = 20,
    MethodCall = 21,
    MethodReturn = 22,
}

impl RecordTag {
    pub fn from_u8(byte: u8) -> Option<Self> {
        use RecordTag::*;
        Some(match byte {
            0 => Header,
            1 => Object,
            2 => ObjectWithSchema,
            3 => ObjectWithSchemaAssembly,
            4 => ObjectWithSchemaTyped,
            5 => ObjectWithSchemaTypedAssembly,
            6 => ObjectString,
            7 => Array,
            8 => MemberPrimitiveTyped,
            9 => MemberReference,
            10 => ObjectNull,
            11 => MessageEnd,
            12 => Assembly,
            13 => ObjectNullMultiple256,
            14 => ObjectNullMultiple,
            15 => ArraySinglePrimitive,
            16 => ArraySingleObject,
            17 => ArraySingleString,
            18 => CrossDomainMap,
            19 => CrossDomainString,
            20 => CrossDomainAssembly,
            21 => MethodCall,
            22 => MethodReturn,
            _ => return None,
        })
    }
}

/// Kind byte describing a member's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinaryType {
    Primitive = 0,
    String = 1,
    Object = 2,
    SystemClass = 3,
    Class = 4,
    ObjectArray = 5,
    StringArray = 6,
    PrimitiveArray = 7,
}

impl BinaryType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => BinaryType::Primitive,
            1 => BinaryType::String,
            2 => BinaryType::Object,
            3 => BinaryType::SystemClass,
            4 => BinaryType::Class,
            5 => BinaryType::ObjectArray,
            6 => BinaryType::StringArray,
            7 => BinaryType::PrimitiveArray,
            _ => return None,
        })
    }
}

/// A member's declared type as transmitted: the kind byte plus its extra
/// information.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WireType {
    Primitive(PrimitiveType),
    String,
    Object,
    /// A type from the core library, by name.
    SystemClass(String),
    /// A type from a declared assembly.
    Class { name: String, assembly_id: i32 },
    ObjectArray,
    StringArray,
    PrimitiveArray(PrimitiveType),
}

impl WireType {
    pub fn binary_type(&self) -> BinaryType {
        match self {
            WireType::Primitive(_) => BinaryType::Primitive,
            WireType::String => BinaryType::String,
            WireType::Object => BinaryType::Object,
            WireType::SystemClass(_) => BinaryType::SystemClass,
            WireType::Class { .. } => BinaryType::Class,
            WireType::ObjectArray => BinaryType::ObjectArray,
            WireType::StringArray => BinaryType::StringArray,
            WireType::PrimitiveArray(_) => BinaryType::PrimitiveArray,
        }
    }

    pub fn write_extra<W: Write>(&self, w: &mut WireWriter<W>) -> Result<(), FormatError> {
        match self {
            WireType::Primitive(p) | WireType::PrimitiveArray(p) => w.write_u8(p.code()),
            WireType::SystemClass(name) => w.write_string(name),
            WireType::Class { name, assembly_id } => {
                w.write_string(name)?;
                w.write_i32(*assembly_id)
            }
            WireType::String | WireType::Object | WireType::ObjectArray | WireType::StringArray => {
                Ok(())
            }
        }
    }

    pub fn read_extra<R: Read>(
        kind: BinaryType,
        r: &mut WireReader<R>,
    ) -> Result<Self, FormatError> {
        Ok(match kind {
            BinaryType::Primitive => WireType::Primitive(r.read_primitive_type()?),
            BinaryType::String => WireType::String,
            BinaryType::Object => WireType::Object,
            BinaryType::SystemClass => WireType::SystemClass(r.read_string()?),
            BinaryType::Class => WireType::Class {
                name: r.read_string()?,
                assembly_id: r.read_i32()?,
            },
            BinaryType::ObjectArray => WireType::ObjectArray,
            BinaryType::StringArray => WireType::StringArray,
            BinaryType::PrimitiveArray => WireType::PrimitiveArray(r.read_primitive_type()?),
        })
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireType::Primitive(p) => write!(f, "{p}"),
            WireType::String => f.write_str("string"),
            WireType::Object => f.write_str("object"),
            WireType::SystemClass(name) => f.write_str(name),
            WireType::Class { name, assembly_id } => write!(f, "{name}@{assembly_id}"),
            WireType::ObjectArray => f.write_str("object[]"),
            WireType::StringArray => f.write_str("string[]"),
            WireType::PrimitiveArray(p) => write!(f, "{p}[]"),
        }
    }
}

fn read_binary_type<R: Read>(r: &mut WireReader<R>) -> Result<BinaryType, FormatError> {
    let offset = r.offset();
    let code = r.read_u8()?;
    BinaryType::from_u8(code).ok_or(FormatError::UnknownBinaryType { code, offset })
}

/// Shape kind byte of a general array record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArrayShape {
    Single = 0,
    Jagged = 1,
    Rectangular = 2,
    SingleOffset = 3,
    JaggedOffset = 4,
    RectangularOffset = 5,
}

impl ArrayShape {
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => ArrayShape::Single,
            1 => ArrayShape::Jagged,
            2 => ArrayShape::Rectangular,
            3 => ArrayShape::SingleOffset,
            4 => ArrayShape::JaggedOffset,
            5 => ArrayShape::RectangularOffset,
            _ => return None,
        })
    }

    pub fn new(kind: ArrayKind, offset: bool) -> Self {
        match (kind, offset) {
            (ArrayKind::Single, false) => ArrayShape::Single,
            (ArrayKind::Jagged, false) => ArrayShape::Jagged,
            (ArrayKind::Rectangular, false) => ArrayShape::Rectangular,
            (ArrayKind::Single, true) => ArrayShape::SingleOffset,
            (ArrayKind::Jagged, true) => ArrayShape::JaggedOffset,
            (ArrayKind::Rectangular, true) => ArrayShape::RectangularOffset,
        }
    }

    pub fn kind(self) -> ArrayKind {
        match self {
            ArrayShape::Single | ArrayShape::SingleOffset => ArrayKind::Single,
            ArrayShape::Jagged | ArrayShape::JaggedOffset => ArrayKind::Jagged,
            ArrayShape::Rectangular | ArrayShape::RectangularOffset => ArrayKind::Rectangular,
        }
    }

    /// Whether lower bounds follow the lengths.
    pub fn has_offset(self) -> bool {
        matches!(
            self,
            ArrayShape::SingleOffset | ArrayShape::JaggedOffset | ArrayShape::RectangularOffset
        )
    }
}

/// Stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRecord {
    pub top_id: i32,
    pub header_id: i32,
    pub major: i32,
    pub minor: i32,
}

impl HeaderRecord {
    pub fn new(top_id: i32) -> Self {
        Self {
            top_id,
            header_id: NO_HEADERS,
            major: MAJOR_VERSION,
            minor: MINOR_VERSION,
        }
    }
}

/// Declares the id of an assembly name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRecord {
    pub id: i32,
    pub name: String,
}

/// An object carrying its full schema.
///
/// Four wire variants share this layout: member types are present for the
/// typed variants, and an assembly id for types outside the core library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub object_id: i32,
    pub type_name: String,
    pub member_names: Vec<String>,
    pub member_types: Option<Vec<WireType>>,
    pub assembly_id: Option<i32>,
}

impl ClassRecord {
    pub fn tag(&self) -> RecordTag {
        match (self.member_types.is_some(), self.assembly_id.is_some()) {
            (false, false) => RecordTag::ObjectWithSchema,
            (false, true) => RecordTag::ObjectWithSchemaAssembly,
            (true, false) => RecordTag::ObjectWithSchemaTyped,
            (true, true) => RecordTag::ObjectWithSchemaTypedAssembly,
        }
    }

    fn write_body<W: Write>(&self, w: &mut WireWriter<W>) -> Result<(), FormatError> {
        w.write_i32(self.object_id)?;
        w.write_string(&self.type_name)?;
        w.write_i32(self.member_names.len() as i32)?;
        for name in &self.member_names {
            w.write_string(name)?;
        }
        if let Some(types) = &self.member_types {
            for ty in types {
                w.write_u8(ty.binary_type() as u8)?;
            }
            for ty in types {
                ty.write_extra(w)?;
            }
        }
        if let Some(id) = self.assembly_id {
            w.write_i32(id)?;
        }
        Ok(())
    }

    fn read_body<R: Read>(
        r: &mut WireReader<R>,
        typed: bool,
        with_assembly: bool,
    ) -> Result<Self, FormatError> {
        let object_id = r.read_i32()?;
        let type_name = r.read_string()?;
        let count = r.read_count("member count")?;
        let mut member_names = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            member_names.push(r.read_string()?);
        }
        let member_types = if typed {
            let mut kinds = Vec::with_capacity(count.min(PREALLOC_LIMIT));
            for _ in 0..count {
                kinds.push(read_binary_type(r)?);
            }
            let mut types = Vec::with_capacity(kinds.len());
            for kind in kinds {
                types.push(WireType::read_extra(kind, r)?);
            }
            Some(types)
        } else {
            None
        };
        let assembly_id = if with_assembly {
            Some(r.read_i32()?)
        } else {
            None
        };
        Ok(Self {
            object_id,
            type_name,
            member_names,
            member_types,
            assembly_id,
        })
    }
}

/// Upper bound on capacity reserved from an untrusted count.
const PREALLOC_LIMIT: usize = 1024;

/// An object reusing the schema of an earlier object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRecord {
    pub object_id: i32,
    pub schema_id: i32,
}

/// A string with its own id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
    pub object_id: i32,
    pub value: String,
}

/// General array header: jagged, rectangular or offset arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayRecord {
    pub object_id: i32,
    pub shape: ArrayShape,
    pub lengths: Vec<i32>,
    /// Empty unless the shape is an offset kind.
    pub lower_bounds: Vec<i32>,
    pub element: WireType,
}

impl ArrayRecord {
    fn write_body<W: Write>(&self, w: &mut WireWriter<W>) -> Result<(), FormatError> {
        w.write_i32(self.object_id)?;
        w.write_u8(self.shape as u8)?;
        w.write_i32(self.lengths.len() as i32)?;
        for len in &self.lengths {
            w.write_i32(*len)?;
        }
        if self.shape.has_offset() {
            for lb in &self.lower_bounds {
                w.write_i32(*lb)?;
            }
        }
        w.write_u8(self.element.binary_type() as u8)?;
        self.element.write_extra(w)
    }

    fn read_body<R: Read>(r: &mut WireReader<R>) -> Result<Self, FormatError> {
        let object_id = r.read_i32()?;
        let offset = r.offset();
        let code = r.read_u8()?;
        let shape = ArrayShape::from_u8(code).ok_or(FormatError::UnknownArrayShape { code, offset })?;
        let rank_offset = r.offset();
        let rank = r.read_count("array rank")?;
        let rank_ok = match shape.kind() {
            ArrayKind::Rectangular => rank >= 1,
            ArrayKind::Single | ArrayKind::Jagged => rank == 1,
        };
        if !rank_ok || rank > 32 {
            return Err(FormatError::InvalidLength {
                what: "array rank",
                value: rank as i64,
                offset: rank_offset,
            });
        }
        let mut lengths = Vec::with_capacity(rank);
        for _ in 0..rank {
            let offset = r.offset();
            let len = r.read_i32()?;
            if len < 0 {
                return Err(FormatError::InvalidLength {
                    what: "array length",
                    value: len.into(),
                    offset,
                });
            }
            lengths.push(len);
        }
        let mut lower_bounds = Vec::new();
        if shape.has_offset() {
            for _ in 0..rank {
                lower_bounds.push(r.read_i32()?);
            }
        }
        let kind = read_binary_type(r)?;
        let element = WireType::read_extra(kind, r)?;
        Ok(Self {
            object_id,
            shape,
            lengths,
            lower_bounds,
            element,
        })
    }
}

/// One-dimensional zero-based array of primitives; raw values follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySinglePrimitiveRecord {
    pub object_id: i32,
    pub length: i32,
    pub element: PrimitiveType,
}

/// One-dimensional zero-based array of objects or strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySingleRecord {
    pub object_id: i32,
    pub length: i32,
}

fn read_length<R: Read>(r: &mut WireReader<R>) -> Result<i32, FormatError> {
    Ok(r.read_count("array length")? as i32)
}

/// A decoded wire record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(HeaderRecord),
    Object(ObjectRecord),
    ObjectWithSchema(ClassRecord),
    ObjectString(StringRecord),
    Array(ArrayRecord),
    MemberPrimitiveTyped(Primitive),
    /// A raw value whose type is implied by its position; carries no tag.
    MemberPrimitiveUnTyped(Primitive),
    MemberReference(i32),
    ObjectNull,
    MessageEnd,
    Assembly(AssemblyRecord),
    ObjectNullMultiple256(u8),
    ObjectNullMultiple(i32),
    ArraySinglePrimitive(ArraySinglePrimitiveRecord),
    ArraySingleObject(ArraySingleRecord),
    ArraySingleString(ArraySingleRecord),
}

impl Record {
    /// The shortest record encoding a run of `count` nulls.
    pub fn null_run(count: usize) -> Record {
        match count {
            1 => Record::ObjectNull,
            2..=255 => Record::ObjectNullMultiple256(count as u8),
            _ => Record::ObjectNullMultiple(i32::try_from(count).unwrap_or(i32::MAX)),
        }
    }

    /// Number of nulls a null record stands for.
    pub fn null_count(&self) -> Option<i64> {
        match self {
            Record::ObjectNull => Some(1),
            Record::ObjectNullMultiple256(n) => Some(i64::from(*n)),
            Record::ObjectNullMultiple(n) => Some(i64::from(*n)),
            _ => None,
        }
    }

    /// The tag byte, or `None` for untagged inline values.
    pub fn tag(&self) -> Option<RecordTag> {
        Some(match self {
            Record::Header(_) => RecordTag::Header,
            Record::Object(_) => RecordTag::Object,
            Record::ObjectWithSchema(c) => c.tag(),
            Record::ObjectString(_) => RecordTag::ObjectString,
            Record::Array(_) => RecordTag::Array,
            Record::MemberPrimitiveTyped(_) => RecordTag::MemberPrimitiveTyped,
            Record::MemberPrimitiveUnTyped(_) => return None,
            Record::MemberReference(_) => RecordTag::MemberReference,
            Record::ObjectNull => RecordTag::ObjectNull,
            Record::MessageEnd => RecordTag::MessageEnd,
            Record::Assembly(_) => RecordTag::Assembly,
            Record::ObjectNullMultiple256(_) => RecordTag::ObjectNullMultiple256,
            Record::ObjectNullMultiple(_) => RecordTag::ObjectNullMultiple,
            Record::ArraySinglePrimitive(_) => RecordTag::ArraySinglePrimitive,
            Record::ArraySingleObject(_) => RecordTag::ArraySingleObject,
            Record::ArraySingleString(_) => RecordTag::ArraySingleString,
        })
    }

    /// Encode the record, tag first.
    pub fn write<W: Write>(&self, w: &mut WireWriter<W>) -> Result<(), FormatError> {
        if let Some(tag) = self.tag() {
            w.write_u8(tag as u8)?;
        }
        match self {
            Record::Header(h) => {
                w.write_i32(h.top_id)?;
                w.write_i32(h.header_id)?;
                w.write_i32(h.major)?;
                w.write_i32(h.minor)
            }
            Record::Object(o) => {
                w.write_i32(o.object_id)?;
                w.write_i32(o.schema_id)
            }
            Record::ObjectWithSchema(c) => c.write_body(w),
            Record::ObjectString(s) => {
                w.write_i32(s.object_id)?;
                w.write_string(&s.value)
            }
            Record::Array(a) => a.write_body(w),
            Record::MemberPrimitiveTyped(p) => {
                w.write_u8(p.kind().code())?;
                w.write_primitive(p)
            }
            Record::MemberPrimitiveUnTyped(p) => w.write_primitive(p),
            Record::MemberReference(id) => w.write_i32(*id),
            Record::ObjectNull | Record::MessageEnd => Ok(()),
            Record::Assembly(a) => {
                w.write_i32(a.id)?;
                w.write_string(&a.name)
            }
            Record::ObjectNullMultiple256(n) => w.write_u8(*n),
            Record::ObjectNullMultiple(n) => w.write_i32(*n),
            Record::ArraySinglePrimitive(a) => {
                w.write_i32(a.object_id)?;
                w.write_i32(a.length)?;
                w.write_u8(a.element.code())
            }
            Record::ArraySingleObject(a) | Record::ArraySingleString(a) => {
                w.write_i32(a.object_id)?;
                w.write_i32(a.length)
            }
        }
    }

    /// Read one tag and its record.
    pub fn read<R: Read>(r: &mut WireReader<R>) -> Result<Record, FormatError> {
        let offset = r.offset();
        let byte = r.read_u8()?;
        let tag = RecordTag::from_u8(byte)
            .ok_or(FormatError::UnknownRecordTag { tag: byte, offset })?;
        Self::read_body(tag, offset, r)
    }

    /// Read the body of a record whose tag (found at `offset`) was already
    /// consumed.
    pub fn read_body<R: Read>(
        tag: RecordTag,
        offset: u64,
        r: &mut WireReader<R>,
    ) -> Result<Record, FormatError> {
        Ok(match tag {
            RecordTag::Header => {
                let header = HeaderRecord {
                    top_id: r.read_i32()?,
                    header_id: r.read_i32()?,
                    major: r.read_i32()?,
                    minor: r.read_i32()?,
                };
                if header.major > MAJOR_VERSION {
                    return Err(FormatError::UnsupportedVersion {
                        major: header.major,
                        minor: header.minor,
                    });
                }
                Record::Header(header)
            }
            RecordTag::Object => Record::Object(ObjectRecord {
                object_id: r.read_i32()?,
                schema_id: r.read_i32()?,
            }),
            RecordTag::ObjectWithSchema => {
                Record::ObjectWithSchema(ClassRecord::read_body(r, false, false)?)
            }
            RecordTag::ObjectWithSchemaAssembly => {
                Record::ObjectWithSchema(ClassRecord::read_body(r, false, true)?)
            }
            RecordTag::ObjectWithSchemaTyped => {
                Record::ObjectWithSchema(ClassRecord::read_body(r, true, false)?)
            }
            RecordTag::ObjectWithSchemaTypedAssembly => {
                Record::ObjectWithSchema(ClassRecord::read_body(r, true, true)?)
            }
            RecordTag::ObjectString => Record::ObjectString(StringRecord {
                object_id: r.read_i32()?,
                value: r.read_string()?,
            }),
            RecordTag::Array => Record::Array(ArrayRecord::read_body(r)?),
            RecordTag::MemberPrimitiveTyped => {
                let ty = r.read_primitive_type()?;
                Record::MemberPrimitiveTyped(r.read_primitive(ty)?)
            }
            RecordTag::MemberReference => Record::MemberReference(r.read_i32()?),
            RecordTag::ObjectNull => Record::ObjectNull,
            RecordTag::MessageEnd => Record::MessageEnd,
            RecordTag::Assembly => Record::Assembly(AssemblyRecord {
                id: r.read_i32()?,
                name: r.read_string()?,
            }),
            RecordTag::ObjectNullMultiple256 => Record::ObjectNullMultiple256(r.read_u8()?),
            RecordTag::ObjectNullMultiple => Record::ObjectNullMultiple(r.read_i32()?),
            RecordTag::ArraySinglePrimitive => {
                Record::ArraySinglePrimitive(ArraySinglePrimitiveRecord {
                    object_id: r.read_i32()?,
                    length: read_length(r)?,
                    element: r.read_primitive_type()?,
                })
            }
            RecordTag::ArraySingleObject => Record::ArraySingleObject(ArraySingleRecord {
                object_id: r.read_i32()?,
                length: read_length(r)?,
            }),
            RecordTag::ArraySingleString => Record::ArraySingleString(ArraySingleRecord {
                object_id: r.read_i32()?,
                length: read_length(r)?,
            }),
            RecordTag::CrossDomainMap
            | RecordTag::CrossDomainString
            | RecordTag::CrossDomainAssembly
            | RecordTag::MethodCall
            | RecordTag::MethodReturn => {
                return Err(FormatError::UnsupportedRecord { tag, offset });
            }
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Header(h) => write!(
                f,
                "Header top={} headers={} version={}.{}",
                h.top_id, h.header_id, h.major, h.minor
            ),
            Record::Object(o) => write!(f, "Object #{} schema=#{}", o.object_id, o.schema_id),
            Record::ObjectWithSchema(c) => {
                let label = match c.member_types {
                    Some(_) => "ObjectWithSchemaTyped",
                    None => "ObjectWithSchema",
                };
                write!(f, "{label} #{} {}", c.object_id, c.type_name)?;
                if let Some(id) = c.assembly_id {
                    write!(f, " assembly={id}")?;
                }
                f.write_str(" [")?;
                for (i, name) in c.member_names.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(name)?;
                    if let Some(ty) = c.member_types.as_ref().and_then(|t| t.get(i)) {
                        write!(f, ": {ty}")?;
                    }
                }
                f.write_str("]")
            }
            Record::ObjectString(s) => write!(f, "ObjectString #{} {:?}", s.object_id, s.value),
            Record::Array(a) => {
                write!(f, "Array #{} {:?} {}{:?}", a.object_id, a.shape, a.element, a.lengths)?;
                if !a.lower_bounds.is_empty() {
                    write!(f, " from {:?}", a.lower_bounds)?;
                }
                Ok(())
            }
            Record::MemberPrimitiveTyped(p) => {
                write!(f, "MemberPrimitiveTyped {}: {p}", p.kind())
            }
            Record::MemberPrimitiveUnTyped(p) => write!(f, "MemberPrimitiveUnTyped {p}"),
            Record::MemberReference(id) => write!(f, "MemberReference -> #{id}"),
            Record::ObjectNull => f.write_str("ObjectNull"),
            Record::MessageEnd => f.write_str("MessageEnd"),
            Record::Assembly(a) => write!(f, "Assembly #{} {:?}", a.id, a.name),
            Record::ObjectNullMultiple256(n) => write!(f, "ObjectNullMultiple256 x{n}"),
            Record::ObjectNullMultiple(n) => write!(f, "ObjectNullMultiple x{n}"),
            Record::ArraySinglePrimitive(a) => write!(
                f,
                "ArraySinglePrimitive #{} {}[{}]",
                a.object_id, a.element, a.length
            ),
            Record::ArraySingleObject(a) => {
                write!(f, "ArraySingleObject #{} object[{}]", a.object_id, a.length)
            }
            Record::ArraySingleString(a) => {
                write!(f, "ArraySingleString #{} string[{}]", a.object_id, a.length)
            }
        }
    }
}
