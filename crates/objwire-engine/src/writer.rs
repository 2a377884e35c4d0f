//! The writer engine.
//!
//! Reference nodes are written breadth-first from a FIFO queue: the first
//! time a node is reached it gets an id and is queued, and its referrers
//! get a `MemberReference`. Value-type members are written inline, in
//! place, under a transient id. Member emission uses an explicit frame
//! stack, so deep value-type nesting does not grow the call stack.

use std::collections::VecDeque;

use objwire_core::describe::{infer_type, TypeDescriber, TypeLayout};
use objwire_core::graph::{ArrayNode, Node, NodeId, ObjectGraph, ObjectNode};
use objwire_core::surrogate::{SerializationInfo, SurrogateSelector};
use objwire_core::types::{simple_assembly_name, TypeName, TypeRef};
use objwire_core::value::{Primitive, Value};
use objwire_format::{
    ArrayRecord, ArrayShape, ArraySinglePrimitiveRecord, ArraySingleRecord, AssemblyRecord,
    ClassRecord, HeaderRecord, ObjectRecord, Record, StringRecord, WireType, WireWriter,
};

use crate::error::{EncodeError, EncodeResult};
use crate::ids::IdentityTable;
use crate::options::{AssemblyFormat, FormatterOptions, TypeFormat};
use crate::schema::{AssemblyCache, SchemaCache, SchemaKey};

/// Member name of the single field of a boxed primitive.
pub(crate) const BOXED_VALUE_MEMBER: &str = "m_value";

/// Names, declared types and values of one object, from whichever source
/// describes it.
#[derive(Debug)]
struct MemberList {
    wire: TypeName,
    names: Vec<String>,
    types: Vec<TypeRef>,
    values: Vec<Value>,
    typed: bool,
}

impl MemberList {
    fn from_info(info: SerializationInfo) -> Self {
        let wire = info.type_name().clone();
        let mut list = MemberList {
            wire,
            names: Vec::with_capacity(info.len()),
            types: Vec::with_capacity(info.len()),
            values: Vec::with_capacity(info.len()),
            typed: true,
        };
        for entry in info.entries() {
            list.names.push(entry.name.clone());
            list.types.push(entry.ty.clone());
            list.values.push(entry.value.clone());
        }
        list
    }

    /// Self-describing objects: the instance's own fields, types inferred.
    fn from_fields(wire: TypeName, object: &ObjectNode) -> Self {
        MemberList {
            wire,
            names: object.fields.iter().map(|f| f.name.clone()).collect(),
            types: object.fields.iter().map(|f| infer_type(&f.value)).collect(),
            values: object.fields.iter().map(|f| f.value.clone()).collect(),
            typed: true,
        }
    }
}

/// Member values still to be written for one object or array.
#[derive(Debug)]
enum EmitFrame {
    Members {
        node: NodeId,
        list: MemberList,
        pos: usize,
    },
    Cells {
        node: NodeId,
        element: TypeRef,
        pos: usize,
        len: usize,
    },
}

impl EmitFrame {
    fn node(&self) -> NodeId {
        match self {
            EmitFrame::Members { node, .. } | EmitFrame::Cells { node, .. } => *node,
        }
    }

    /// Human-readable location of the value at `index`.
    fn site(&self, index: usize) -> String {
        match self {
            EmitFrame::Members { list, .. } => {
                format!("{}.{}", list.wire.name, list.names[index])
            }
            EmitFrame::Cells { node, .. } => format!("{node}[{index}]"),
        }
    }
}

pub(crate) struct Writer<'a, D: TypeDescriber + ?Sized> {
    graph: &'a ObjectGraph,
    describer: &'a D,
    surrogates: &'a SurrogateSelector,
    options: &'a FormatterOptions,
    out: WireWriter<Vec<u8>>,
    ids: IdentityTable,
    schemas: SchemaCache,
    assemblies: AssemblyCache,
    queue: VecDeque<(i32, NodeId)>,
}

impl<'a, D: TypeDescriber + ?Sized> Writer<'a, D> {
    pub(crate) fn new(
        graph: &'a ObjectGraph,
        describer: &'a D,
        surrogates: &'a SurrogateSelector,
        options: &'a FormatterOptions,
    ) -> Self {
        Self {
            graph,
            describer,
            surrogates,
            options,
            out: WireWriter::new(Vec::new()),
            ids: IdentityTable::new(),
            schemas: SchemaCache::new(),
            assemblies: AssemblyCache::new(),
            queue: VecDeque::new(),
        }
    }

    /// Encode the graph reachable from `root` into a complete stream.
    pub(crate) fn write(mut self, root: &Value) -> EncodeResult<Vec<u8>> {
        if let Value::Ref(node) = root {
            if self.graph.node(*node).is_none() {
                return Err(EncodeError::MissingNode(*node));
            }
        }
        self.emit(&Record::Header(HeaderRecord::new(1)))?;
        match root {
            Value::Null => return Err(EncodeError::NullGraph),
            Value::String(s) => {
                let (id, _) = self.ids.string_id(s);
                self.emit(&Record::ObjectString(StringRecord {
                    object_id: id,
                    value: s.clone(),
                }))?;
            }
            Value::Primitive(p) => self.write_boxed(p)?,
            Value::Ref(node) => {
                let (id, _) = self.ids.node_id(*node);
                self.queue.push_back((id, *node));
                while let Some((id, node)) = self.queue.pop_front() {
                    self.write_node(id, node)?;
                }
            }
        }
        self.emit(&Record::MessageEnd)?;
        log::debug!(
            "wrote {} bytes, {} distinct schema(s)",
            self.out.offset(),
            self.schemas.len()
        );
        Ok(self.out.into_inner())
    }

    fn emit(&mut self, record: &Record) -> EncodeResult<()> {
        log::trace!("@{} {record}", self.out.offset());
        record.write(&mut self.out)?;
        Ok(())
    }

    /// A primitive root travels as its core boxing type with one member.
    fn write_boxed(&mut self, value: &Primitive) -> EncodeResult<()> {
        let id = self.ids.reserve();
        let kind = value.kind();
        self.emit(&Record::ObjectWithSchema(ClassRecord {
            object_id: id,
            type_name: kind.core_type_name().to_string(),
            member_names: vec![BOXED_VALUE_MEMBER.to_string()],
            member_types: Some(vec![WireType::Primitive(kind)]),
            assembly_id: None,
        }))?;
        self.out.write_primitive(value)?;
        Ok(())
    }

    fn write_node(&mut self, id: i32, node: NodeId) -> EncodeResult<()> {
        let graph = self.graph;
        match graph.node(node).ok_or(EncodeError::MissingNode(node))? {
            Node::Object(object) => {
                let list = self.members_of(object)?;
                self.write_schema(id, &list)?;
                self.write_frames(EmitFrame::Members { node, list, pos: 0 })
            }
            Node::Array(array) => self.write_array(id, node, array),
        }
    }

    /// Member list of an object: a surrogate first, then the instance
    /// itself for placeholders and custom layouts, then the layout.
    fn members_of(&self, object: &ObjectNode) -> EncodeResult<MemberList> {
        let layout = self.describer.describe(&object.ty);
        if let Some(surrogate) = self.surrogates.get(&object.ty) {
            let wire = layout
                .map(TypeLayout::wire_name)
                .unwrap_or_else(|| object.ty.clone());
            let mut info = SerializationInfo::new(wire);
            surrogate.get_object_data(object, &mut info)?;
            return Ok(MemberList::from_info(info));
        }
        if object.unresolved {
            return Ok(MemberList::from_fields(object.ty.clone(), object));
        }
        let layout = layout.ok_or_else(|| EncodeError::UnsupportedType(object.ty.clone()))?;
        if layout.custom {
            return Ok(MemberList::from_fields(layout.wire_name(), object));
        }
        let names = layout.member_names();
        let values = self.describer.get_values(object, &names);
        Ok(MemberList {
            wire: layout.wire_name(),
            names,
            types: layout.member_types(),
            values,
            typed: self.options.type_format == TypeFormat::Always,
        })
    }

    fn wire_type_name(&self, ty: &TypeName) -> TypeName {
        match (&ty.assembly, self.options.assembly_format) {
            (Some(asm), AssemblyFormat::Simple) => {
                TypeName::new(ty.name.clone(), simple_assembly_name(asm))
            }
            _ => ty.clone(),
        }
    }

    /// Id of an assembly, declaring it on first use.
    fn assembly_id(&mut self, name: &str) -> EncodeResult<i32> {
        let (id, new) = self.assemblies.intern(name);
        if new {
            log::debug!("declaring assembly #{id} {name:?}");
            self.emit(&Record::Assembly(AssemblyRecord {
                id,
                name: name.to_string(),
            }))?;
        }
        Ok(id)
    }

    fn wire_type(&mut self, ty: &TypeRef) -> EncodeResult<WireType> {
        Ok(match ty {
            TypeRef::Primitive(p) => WireType::Primitive(*p),
            TypeRef::String => WireType::String,
            TypeRef::Object => WireType::Object,
            TypeRef::ObjectArray => WireType::ObjectArray,
            TypeRef::StringArray => WireType::StringArray,
            TypeRef::PrimitiveArray(p) => WireType::PrimitiveArray(*p),
            TypeRef::Class(name) => {
                let name = self.wire_type_name(name);
                match name.assembly {
                    None => WireType::SystemClass(name.name),
                    Some(asm) => WireType::Class {
                        assembly_id: self.assembly_id(&asm)?,
                        name: name.name,
                    },
                }
            }
        })
    }

    /// Emit the full schema the first time a shape is seen, a compact
    /// reuse record afterwards.
    fn write_schema(&mut self, id: i32, list: &MemberList) -> EncodeResult<()> {
        let wire = self.wire_type_name(&list.wire);
        let key = SchemaKey {
            ty: wire.clone(),
            names: list.names.clone(),
            types: list.types.clone(),
            typed: list.typed,
        };
        if let Some(schema_id) = self.schemas.lookup(&key) {
            log::debug!("#{id} reuses schema of #{schema_id} ({})", wire.name);
            return self.emit(&Record::Object(ObjectRecord {
                object_id: id,
                schema_id,
            }));
        }

        let assembly_id = match &wire.assembly {
            Some(asm) => Some(self.assembly_id(asm)?),
            None => None,
        };
        let member_types = if list.typed {
            let mut types = Vec::with_capacity(list.types.len());
            for ty in &list.types {
                types.push(self.wire_type(ty)?);
            }
            Some(types)
        } else {
            None
        };
        log::debug!("schema for {} sent with #{id}", wire.name);
        self.emit(&Record::ObjectWithSchema(ClassRecord {
            object_id: id,
            type_name: wire.name,
            member_names: list.names.clone(),
            member_types,
            assembly_id,
        }))?;
        self.schemas.insert(key, id);
        Ok(())
    }

    fn write_array(&mut self, id: i32, node: NodeId, array: &ArrayNode) -> EncodeResult<()> {
        let len = array.len();
        if array.rank() == 1 && !array.has_offset() {
            let length = array.lengths()[0];
            match array.element() {
                TypeRef::Primitive(kind) => {
                    self.emit(&Record::ArraySinglePrimitive(ArraySinglePrimitiveRecord {
                        object_id: id,
                        length,
                        element: *kind,
                    }))?;
                    for (index, cell) in array.cells().iter().enumerate() {
                        match cell {
                            Value::Primitive(p) if p.kind() == *kind => self.out.write_primitive(p)?,
                            _ => {
                                return Err(EncodeError::ArrayElementMismatch {
                                    node,
                                    index,
                                    expected: *kind,
                                })
                            }
                        }
                    }
                    return Ok(());
                }
                TypeRef::String => {
                    self.emit(&Record::ArraySingleString(ArraySingleRecord {
                        object_id: id,
                        length,
                    }))?;
                    return self.write_cells(node, TypeRef::String, len);
                }
                TypeRef::Object => {
                    self.emit(&Record::ArraySingleObject(ArraySingleRecord {
                        object_id: id,
                        length,
                    }))?;
                    return self.write_cells(node, TypeRef::Object, len);
                }
                _ => {}
            }
        }

        let shape = ArrayShape::new(array.kind(), array.has_offset());
        let element = self.wire_type(array.element())?;
        let lower_bounds = if shape.has_offset() {
            array.lower_bounds().to_vec()
        } else {
            Vec::new()
        };
        self.emit(&Record::Array(ArrayRecord {
            object_id: id,
            shape,
            lengths: array.lengths().to_vec(),
            lower_bounds,
            element,
        }))?;
        self.write_cells(node, array.element().clone(), len)
    }

    fn write_cells(&mut self, node: NodeId, element: TypeRef, len: usize) -> EncodeResult<()> {
        self.write_frames(EmitFrame::Cells {
            node,
            element,
            pos: 0,
            len,
        })
    }

    fn write_frames(&mut self, first: EmitFrame) -> EncodeResult<()> {
        let graph = self.graph;
        let mut stack = vec![first];
        while let Some(frame) = stack.last_mut() {
            let (index, declared, value) = match frame {
                EmitFrame::Members { list, pos, .. } => {
                    if *pos == list.values.len() {
                        stack.pop();
                        continue;
                    }
                    let index = *pos;
                    *pos += 1;
                    (index, list.types[index].clone(), list.values[index].clone())
                }
                EmitFrame::Cells {
                    node,
                    element,
                    pos,
                    len,
                } => {
                    if *pos == *len {
                        stack.pop();
                        continue;
                    }
                    let cells = graph
                        .array(*node)
                        .map_err(|_| EncodeError::MissingNode(*node))?
                        .cells();
                    let index = *pos;
                    if cells[index].is_null() && element.as_primitive().is_none() {
                        let run = cells[index..*len]
                            .iter()
                            .take_while(|c| c.is_null())
                            .count();
                        *pos += run;
                        self.emit(&Record::null_run(run))?;
                        continue;
                    }
                    *pos += 1;
                    (index, element.clone(), cells[index].clone())
                }
            };

            if let TypeRef::Primitive(kind) = declared {
                match &value {
                    Value::Primitive(p) if p.kind() == kind => {
                        self.out.write_primitive(p)?;
                        continue;
                    }
                    other => {
                        let site = stack.last().map(|f| f.site(index)).unwrap_or_default();
                        return Err(EncodeError::MemberTypeMismatch {
                            member: site,
                            expected: declared,
                            found: describe_value(other),
                        });
                    }
                }
            }

            if let Some(child) = self.write_value(&declared, &value, &stack)? {
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Write one value whose declared type is not a primitive. Returns a
    /// frame when the value is a value type to be written inline.
    fn write_value(
        &mut self,
        declared: &TypeRef,
        value: &Value,
        stack: &[EmitFrame],
    ) -> EncodeResult<Option<EmitFrame>> {
        match value {
            Value::Null => self.emit(&Record::ObjectNull)?,
            Value::Primitive(p) => self.emit(&Record::MemberPrimitiveTyped(p.clone()))?,
            Value::String(s) => {
                let (id, new) = self.ids.string_id(s);
                if new {
                    self.emit(&Record::ObjectString(StringRecord {
                        object_id: id,
                        value: s.clone(),
                    }))?;
                } else {
                    self.emit(&Record::MemberReference(id))?;
                }
            }
            Value::Ref(node) => return self.write_reference(declared, *node, stack),
        }
        Ok(None)
    }

    fn write_reference(
        &mut self,
        declared: &TypeRef,
        node: NodeId,
        stack: &[EmitFrame],
    ) -> EncodeResult<Option<EmitFrame>> {
        let graph = self.graph;
        let target = graph.node(node).ok_or(EncodeError::MissingNode(node))?;
        // A value type in an `object` slot is boxed and shared like any
        // reference; only a slot declared with a class type embeds it.
        if let (TypeRef::Class(_), Node::Object(object)) = (declared, target) {
            if self.is_value_type(object) {
                if stack.iter().any(|f| f.node() == node) {
                    return Err(EncodeError::CyclicValueType(object.ty.clone()));
                }
                let id = self.ids.transient();
                let list = self.members_of(object)?;
                self.write_schema(id, &list)?;
                return Ok(Some(EmitFrame::Members { node, list, pos: 0 }));
            }
        }
        let (id, new) = self.ids.node_id(node);
        if new {
            self.queue.push_back((id, node));
        }
        self.emit(&Record::MemberReference(id))?;
        Ok(None)
    }

    fn is_value_type(&self, object: &ObjectNode) -> bool {
        !object.unresolved
            && self
                .describer
                .describe(&object.ty)
                .is_some_and(|layout| layout.value_type)
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Primitive(p) => p.kind().to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Ref(node) => format!("a reference to {node}"),
    }
}
