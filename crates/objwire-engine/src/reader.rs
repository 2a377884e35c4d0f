//! The reader engine.
//!
//! A single-pass pull parser over the record stream. Each object or array
//! record pushes a [`Frame`] that buffers member values until its declared
//! count is reached; the frame is then popped, its node populated, its id
//! registered, and any fixups waiting on that id replayed. Raw primitive
//! values carry no tag, so whenever the top frame's next slot is declared
//! primitive the value is read directly instead of a record.

use std::io::Read;
use std::rc::Rc;

use objwire_core::binder::TypeBinder;
use objwire_core::describe::{TypeDescriber, TypeLayout};
use objwire_core::graph::{ArrayNode, GraphError, Node, NodeId, ObjectGraph, ObjectNode};
use objwire_core::surrogate::{SerializationInfo, SurrogateSelector};
use objwire_core::types::{
    array_base_name, simple_assembly_name, PrimitiveType, TypeName, TypeRef, CORE_OBJECT,
    CORE_STRING,
};
use objwire_core::value::Value;
use objwire_format::{ClassRecord, Record, WireReader, WireType};

use crate::error::{DecodeError, DecodeResult};
use crate::fixup::{FixupLedger, Slot};
use crate::ids::ObjectTable;
use crate::options::{FormatterOptions, MissingMembers, UnknownMembers};
use crate::schema::{AssemblyTable, ObjectMap, SchemaTable, Target};
use crate::writer::BOXED_VALUE_MEMBER;

/// Frames kept for reuse.
const POOL_LIMIT: usize = 64;

/// Capacity reserved up front from an untrusted count.
const PREALLOC_LIMIT: usize = 1024;

#[derive(Debug)]
enum FrameKind {
    Object(Rc<ObjectMap>),
    Array {
        element: TypeRef,
        lengths: Vec<i32>,
        lower_bounds: Vec<i32>,
    },
}

/// Progress through one object or array.
#[derive(Debug)]
struct Frame {
    id: i32,
    /// `None` only for boxed primitives, which become plain values.
    node: Option<NodeId>,
    kind: FrameKind,
    values: Vec<Value>,
    expected: usize,
    /// Position in the parent frame this frame's value fills.
    parent_slot: Option<usize>,
}

impl Frame {
    fn is_complete(&self) -> bool {
        self.values.len() >= self.expected
    }

    fn remaining(&self) -> usize {
        self.expected.saturating_sub(self.values.len())
    }

    /// Declared type of the next slot.
    fn next_type(&self) -> Option<&TypeRef> {
        if self.is_complete() {
            return None;
        }
        match &self.kind {
            FrameKind::Object(map) => map.member_types.get(self.values.len()),
            FrameKind::Array { element, .. } => Some(element),
        }
    }

    fn slot(&self, index: usize) -> Slot {
        match &self.kind {
            FrameKind::Object(map) => Slot::Member(map.member_names[index].clone()),
            FrameKind::Array { .. } => Slot::Cell(index),
        }
    }

    fn slot_index(&self, slot: &Slot) -> Option<usize> {
        match (&self.kind, slot) {
            (FrameKind::Object(map), Slot::Member(name)) => map.position(name),
            (FrameKind::Array { .. }, Slot::Cell(index)) => Some(*index),
            _ => None,
        }
    }
}

/// Freelist of frames.
#[derive(Debug, Default)]
struct FramePool {
    free: Vec<Frame>,
}

impl FramePool {
    fn acquire(
        &mut self,
        id: i32,
        node: Option<NodeId>,
        kind: FrameKind,
        expected: usize,
        parent_slot: Option<usize>,
    ) -> Frame {
        match self.free.pop() {
            Some(mut frame) => {
                frame.id = id;
                frame.node = node;
                frame.kind = kind;
                frame.values.clear();
                frame.values.reserve(expected.min(PREALLOC_LIMIT));
                frame.expected = expected;
                frame.parent_slot = parent_slot;
                frame
            }
            None => Frame {
                id,
                node,
                kind,
                values: Vec::with_capacity(expected.min(PREALLOC_LIMIT)),
                expected,
                parent_slot,
            },
        }
    }

    fn release(&mut self, mut frame: Frame) {
        if self.free.len() < POOL_LIMIT {
            frame.values.clear();
            self.free.push(frame);
        }
    }
}

/// A surrogate object whose data is handed over once its fixups land.
#[derive(Debug)]
struct Deferred {
    node: NodeId,
    surrogate: TypeName,
    map: Rc<ObjectMap>,
    values: Vec<Value>,
}

/// What a completed read produces.
#[derive(Debug)]
pub(crate) struct ReadOutcome {
    pub graph: ObjectGraph,
    pub root: Value,
    pub records: Option<Vec<Record>>,
}

pub(crate) struct Reader<'a, R, D: TypeDescriber + ?Sized> {
    input: WireReader<R>,
    describer: &'a D,
    surrogates: &'a SurrogateSelector,
    binder: Option<&'a dyn TypeBinder>,
    options: &'a FormatterOptions,
    graph: ObjectGraph,
    objects: ObjectTable,
    schemas: SchemaTable,
    assemblies: AssemblyTable,
    fixups: FixupLedger,
    stack: Vec<Frame>,
    pool: FramePool,
    deferred: Vec<Deferred>,
    /// Surrogate objects, in completion order, notified once all
    /// references are linked.
    completed: Vec<(NodeId, TypeName)>,
    trace: Option<Vec<Record>>,
}

impl<'a, R: Read, D: TypeDescriber + ?Sized> Reader<'a, R, D> {
    pub(crate) fn new(
        input: R,
        describer: &'a D,
        surrogates: &'a SurrogateSelector,
        binder: Option<&'a dyn TypeBinder>,
        options: &'a FormatterOptions,
    ) -> Self {
        Self {
            input: WireReader::new(input),
            describer,
            surrogates,
            binder,
            options,
            graph: ObjectGraph::new(),
            objects: ObjectTable::new(),
            schemas: SchemaTable::new(),
            assemblies: AssemblyTable::new(),
            fixups: FixupLedger::new(),
            stack: Vec::new(),
            pool: FramePool::default(),
            deferred: Vec::new(),
            completed: Vec::new(),
            trace: None,
        }
    }

    /// Keep every decoded record, including untagged primitive values.
    pub(crate) fn with_trace(mut self) -> Self {
        self.trace = Some(Vec::new());
        self
    }

    pub(crate) fn read(mut self) -> DecodeResult<ReadOutcome> {
        let top_id = match self.next_record()? {
            Record::Header(header) => header.top_id,
            other => {
                return Err(corrupt(0, format!("stream starts with {other} instead of a header")))
            }
        };

        loop {
            self.complete_frames()?;

            if let Some(kind) = self.pending_primitive() {
                let value = self.input.read_primitive(kind)?;
                self.push_trace(Record::MemberPrimitiveUnTyped(value.clone()));
                self.assign(Value::Primitive(value));
                continue;
            }

            let offset = self.input.offset();
            match self.next_record()? {
                Record::Header(_) => return Err(corrupt(offset, "second stream header")),
                Record::MessageEnd => {
                    if !self.stack.is_empty() {
                        return Err(corrupt(offset, "end of message inside an open object"));
                    }
                    break;
                }
                Record::Assembly(a) => {
                    log::debug!("assembly #{} is {:?}", a.id, a.name);
                    self.assemblies.declare(a.id, a.name);
                }
                Record::ObjectWithSchema(class) => {
                    let map = Rc::new(self.object_map(&class, offset)?);
                    self.schemas.insert(class.object_id, Rc::clone(&map));
                    self.open_object(class.object_id, map, offset)?;
                }
                Record::Object(o) => {
                    let map = self.schemas.get(o.schema_id).ok_or_else(|| {
                        corrupt(offset, format!("schema #{} was never declared", o.schema_id))
                    })?;
                    self.open_object(o.object_id, map, offset)?;
                }
                Record::ObjectString(s) => {
                    let value = Value::String(s.value);
                    if !self.stack.is_empty() {
                        self.assign(value.clone());
                    }
                    self.register(s.object_id, value, offset)?;
                }
                Record::Array(a) => {
                    let element = self.array_element(&a.element, offset)?;
                    let lower_bounds = if a.shape.has_offset() {
                        a.lower_bounds
                    } else {
                        vec![0; a.lengths.len()]
                    };
                    self.open_array(a.object_id, element, a.lengths, lower_bounds, offset)?;
                }
                Record::ArraySinglePrimitive(a) => {
                    let element = TypeRef::Primitive(a.element);
                    self.open_array(a.object_id, element, vec![a.length], vec![0], offset)?;
                }
                Record::ArraySingleObject(a) => {
                    self.open_array(a.object_id, TypeRef::Object, vec![a.length], vec![0], offset)?;
                }
                Record::ArraySingleString(a) => {
                    self.open_array(a.object_id, TypeRef::String, vec![a.length], vec![0], offset)?;
                }
                Record::MemberPrimitiveTyped(p) => {
                    self.require_frame(offset)?;
                    self.assign(Value::Primitive(p));
                }
                Record::MemberPrimitiveUnTyped(p) => {
                    self.require_frame(offset)?;
                    self.assign(Value::Primitive(p));
                }
                Record::MemberReference(id) => self.assign_reference(id, offset)?,
                record @ (Record::ObjectNull
                | Record::ObjectNullMultiple256(_)
                | Record::ObjectNullMultiple(_)) => {
                    let count = record.null_count().unwrap_or(1);
                    self.assign_nulls(count, offset)?;
                }
            }
        }

        self.finish(top_id)
    }

    fn next_record(&mut self) -> DecodeResult<Record> {
        let offset = self.input.offset();
        let record = Record::read(&mut self.input)?;
        log::trace!("@{offset} {record}");
        self.push_trace(record.clone());
        Ok(record)
    }

    fn push_trace(&mut self, record: Record) {
        if let Some(trace) = &mut self.trace {
            trace.push(record);
        }
    }

    fn pending_primitive(&self) -> Option<PrimitiveType> {
        self.stack.last()?.next_type()?.as_primitive()
    }

    fn require_frame(&self, offset: u64) -> DecodeResult<()> {
        match self.stack.last() {
            Some(_) => Ok(()),
            None => Err(corrupt(offset, "member value outside of any object")),
        }
    }

    /// Fill the next slot of the top frame. Callers ensure a frame is open.
    fn assign(&mut self, value: Value) {
        if let Some(frame) = self.stack.last_mut() {
            frame.values.push(value);
        }
    }

    fn assign_reference(&mut self, id: i32, offset: u64) -> DecodeResult<()> {
        self.require_frame(offset)?;
        if id <= 0 {
            return Err(corrupt(offset, format!("reference to transient id {id}")));
        }
        if let Some(value) = self.objects.get(id) {
            let value = value.clone();
            self.assign(value);
            return Ok(());
        }
        let Some(frame) = self.stack.last_mut() else {
            return Ok(());
        };
        let owner = frame
            .node
            .ok_or_else(|| corrupt(offset, "reference inside a boxed primitive"))?;
        let slot = frame.slot(frame.values.len());
        frame.values.push(Value::Null);
        self.fixups.record(owner, slot, id);
        Ok(())
    }

    fn assign_nulls(&mut self, count: i64, offset: u64) -> DecodeResult<()> {
        self.require_frame(offset)?;
        let Some(frame) = self.stack.last_mut() else {
            return Ok(());
        };
        let remaining = frame.remaining();
        let n = match usize::try_from(count) {
            Ok(n) if n > 0 && n <= remaining => n,
            _ => {
                return Err(corrupt(
                    offset,
                    format!("null run of {count} with {remaining} slot(s) remaining"),
                ))
            }
        };
        if let FrameKind::Object(map) = &frame.kind {
            let start = frame.values.len();
            if let Some(name) = map
                .member_types
                .get(start..start + n)
                .unwrap_or_default()
                .iter()
                .position(|ty| ty.as_primitive().is_some())
                .map(|i| &map.member_names[start + i])
            {
                return Err(corrupt(
                    offset,
                    format!("null run covers primitive member {:?} of {}", name, map.wire),
                ));
            }
        }
        frame
            .values
            .try_reserve(n)
            .map_err(|_| corrupt(offset, format!("no room for a run of {n} nulls")))?;
        frame.values.resize(frame.values.len() + n, Value::Null);
        Ok(())
    }

    /// Reserve the parent's next slot for a nested record, if any.
    fn parent_slot(&mut self) -> Option<usize> {
        let parent = self.stack.last_mut()?;
        let index = parent.values.len();
        parent.values.push(Value::Null);
        Some(index)
    }

    fn open_object(&mut self, id: i32, map: Rc<ObjectMap>, offset: u64) -> DecodeResult<()> {
        if self.stack.is_empty() && id <= 0 {
            return Err(corrupt(offset, format!("top-level object with transient id {id}")));
        }
        let node = match &map.target {
            Target::Boxed(_) => None,
            Target::Layout { ty, custom } => {
                let object = match (custom, self.describer.describe(ty)) {
                    (false, Some(layout)) => self.describer.allocate_uninitialized(layout),
                    _ => ObjectNode::new(ty.clone()),
                };
                Some(self.graph.add_object(object))
            }
            Target::Surrogate(ty) => Some(self.graph.add_object(ObjectNode::new(ty.clone()))),
            Target::Unresolved => {
                Some(self.graph.add_object(ObjectNode::placeholder(map.wire.clone())))
            }
        };
        let expected = map.member_count();
        let parent_slot = self.parent_slot();
        let frame = self
            .pool
            .acquire(id, node, FrameKind::Object(map), expected, parent_slot);
        self.stack.push(frame);
        Ok(())
    }

    fn open_array(
        &mut self,
        id: i32,
        element: TypeRef,
        lengths: Vec<i32>,
        lower_bounds: Vec<i32>,
        offset: u64,
    ) -> DecodeResult<()> {
        if self.stack.is_empty() && id <= 0 {
            return Err(corrupt(offset, format!("top-level array with transient id {id}")));
        }
        let expected = ArrayNode::check_shape(&lengths, &lower_bounds)
            .map_err(|e| corrupt(offset, e.to_string()))?;
        if expected > self.options.max_array_cells {
            return Err(corrupt(
                offset,
                format!(
                    "array of {expected} cells exceeds the limit of {}",
                    self.options.max_array_cells
                ),
            ));
        }
        let node = self
            .graph
            .add_array(ArrayNode::new(element.clone(), Vec::new()));
        let parent_slot = self.parent_slot();
        let kind = FrameKind::Array {
            element,
            lengths,
            lower_bounds,
        };
        let frame = self
            .pool
            .acquire(id, Some(node), kind, expected, parent_slot);
        self.stack.push(frame);
        Ok(())
    }

    fn complete_frames(&mut self) -> DecodeResult<()> {
        while self.stack.last().is_some_and(Frame::is_complete) {
            self.pop_frame()?;
        }
        Ok(())
    }

    fn pop_frame(&mut self) -> DecodeResult<()> {
        let Some(mut frame) = self.stack.pop() else {
            return Ok(());
        };
        let offset = self.input.offset();
        let values = std::mem::take(&mut frame.values);
        let value = match &frame.kind {
            FrameKind::Object(map) => self.finish_object(frame.node, map, values, offset)?,
            FrameKind::Array {
                element,
                lengths,
                lower_bounds,
            } => {
                let node = frame
                    .node
                    .ok_or_else(|| corrupt(offset, "array frame without a node"))?;
                let array = ArrayNode::from_parts(
                    element.clone(),
                    lengths.clone(),
                    lower_bounds.clone(),
                    values,
                )
                .map_err(|e| corrupt(offset, e.to_string()))?;
                self.graph
                    .replace(node, Node::Array(array))
                    .map_err(|e| graph_error(offset, e))?;
                Value::Ref(node)
            }
        };
        if let (Some(slot), Some(parent)) = (frame.parent_slot, self.stack.last_mut()) {
            parent.values[slot] = value.clone();
        }
        let id = frame.id;
        self.pool.release(frame);
        if id > 0 {
            self.register(id, value, offset)?;
        }
        Ok(())
    }

    fn finish_object(
        &mut self,
        node: Option<NodeId>,
        map: &Rc<ObjectMap>,
        values: Vec<Value>,
        offset: u64,
    ) -> DecodeResult<Value> {
        if let Target::Boxed(kind) = map.target {
            return match values.into_iter().next() {
                Some(value @ Value::Primitive(_)) => Ok(value),
                _ => Err(corrupt(offset, format!("boxed {kind} without a value"))),
            };
        }
        let node = node.ok_or_else(|| corrupt(offset, "object frame without a node"))?;
        match &map.target {
            Target::Layout { custom: false, .. } => {
                let mut names = Vec::with_capacity(values.len());
                let mut kept = Vec::with_capacity(values.len());
                for ((name, value), keep) in map.member_names.iter().zip(values).zip(&map.keep) {
                    if *keep {
                        names.push(name.clone());
                        kept.push(value);
                    }
                }
                let object = self
                    .graph
                    .object_mut(node)
                    .map_err(|e| graph_error(offset, e))?;
                self.describer.populate(object, &names, kept);
            }
            Target::Surrogate(ty) => {
                self.completed.push((node, ty.clone()));
                if self.fixups.has_owner(node) {
                    log::debug!("deferring surrogate data for {node} until its references resolve");
                    self.deferred.push(Deferred {
                        node,
                        surrogate: ty.clone(),
                        map: Rc::clone(map),
                        values,
                    });
                } else {
                    self.run_surrogate(node, ty, map, values, offset)?;
                }
            }
            Target::Layout { custom: true, .. } | Target::Unresolved | Target::Boxed(_) => {
                let object = self
                    .graph
                    .object_mut(node)
                    .map_err(|e| graph_error(offset, e))?;
                for (name, value) in map.member_names.iter().zip(values) {
                    object.set(name.clone(), value);
                }
            }
        }
        Ok(Value::Ref(node))
    }

    fn run_surrogate(
        &mut self,
        node: NodeId,
        ty: &TypeName,
        map: &ObjectMap,
        values: Vec<Value>,
        offset: u64,
    ) -> DecodeResult<()> {
        let surrogate = self.surrogates.get(ty).ok_or_else(|| DecodeError::TypeRequired {
            ty: ty.to_string(),
            reason: "surrogate is no longer registered".to_string(),
        })?;
        let mut info = SerializationInfo::new(map.wire.clone());
        for ((name, member_ty), value) in map.member_names.iter().zip(&map.member_types).zip(values)
        {
            info.add_typed(name.clone(), member_ty.clone(), value);
        }
        let object = self
            .graph
            .object_mut(node)
            .map_err(|e| graph_error(offset, e))?;
        surrogate.set_object_data(object, &info)?;
        Ok(())
    }

    /// Mark an id as materialized and replay the fixups waiting on it.
    fn register(&mut self, id: i32, value: Value, offset: u64) -> DecodeResult<()> {
        if id <= 0 {
            return Ok(());
        }
        if !self.objects.register(id, value.clone()) {
            return Err(corrupt(offset, format!("object id #{id} defined twice")));
        }
        for (owner, slot) in self.fixups.drain(id) {
            self.apply_fixup(owner, slot, value.clone(), offset)?;
        }
        Ok(())
    }

    fn apply_fixup(&mut self, owner: NodeId, slot: Slot, value: Value, offset: u64) -> DecodeResult<()> {
        if let Some(frame) = self.stack.iter_mut().rev().find(|f| f.node == Some(owner)) {
            if let Some(cell) = frame
                .slot_index(&slot)
                .and_then(|index| frame.values.get_mut(index))
            {
                *cell = value;
            }
            return Ok(());
        }
        if let Some(pending) = self.deferred.iter_mut().find(|d| d.node == owner) {
            if let Slot::Member(name) = &slot {
                if let Some(index) = pending.map.position(name) {
                    pending.values[index] = value;
                }
            }
            return Ok(());
        }
        match (self.graph.node_mut(owner), slot) {
            (Some(Node::Object(object)), Slot::Member(name)) => {
                // Members dropped by the unknown-member policy stay dropped.
                if object.get(&name).is_some() {
                    object.set(name, value);
                }
                Ok(())
            }
            (Some(Node::Array(array)), Slot::Cell(index)) => {
                if let Some(cell) = array.cells_mut().get_mut(index) {
                    *cell = value;
                }
                Ok(())
            }
            _ => Err(corrupt(offset, format!("fixup owner {owner} does not match its slot"))),
        }
    }

    fn finish(mut self, top_id: i32) -> DecodeResult<ReadOutcome> {
        let offset = self.input.offset();
        if let Some(id) = self.fixups.first_unresolved() {
            return Err(corrupt(offset, format!("reference to #{id} never resolved")));
        }
        for pending in std::mem::take(&mut self.deferred) {
            self.run_surrogate(
                pending.node,
                &pending.surrogate,
                &pending.map,
                pending.values,
                offset,
            )?;
        }
        for (node, ty) in std::mem::take(&mut self.completed) {
            if let Some(surrogate) = self.surrogates.get(&ty) {
                surrogate.on_deserialized(node, &mut self.graph)?;
            }
        }
        let root = self
            .objects
            .get(top_id)
            .cloned()
            .ok_or_else(|| corrupt(offset, format!("top object #{top_id} never defined")))?;
        log::debug!(
            "read {offset} bytes: {} node(s), {} id(s)",
            self.graph.len(),
            self.objects.len()
        );
        Ok(ReadOutcome {
            graph: self.graph,
            root,
            records: self.trace,
        })
    }

    fn assembly_name(&self, id: i32, offset: u64) -> DecodeResult<String> {
        self.assemblies
            .get(id)
            .map(str::to_string)
            .ok_or_else(|| corrupt(offset, format!("assembly #{id} was never declared")))
    }

    fn type_ref(&self, wire: &WireType, offset: u64) -> DecodeResult<TypeRef> {
        Ok(match wire {
            WireType::Primitive(p) => TypeRef::Primitive(*p),
            WireType::String => TypeRef::String,
            WireType::Object => TypeRef::Object,
            WireType::SystemClass(name) => TypeRef::Class(TypeName::core(name.clone())),
            WireType::Class { name, assembly_id } => {
                TypeRef::Class(TypeName::new(name.clone(), self.assembly_name(*assembly_id, offset)?))
            }
            WireType::ObjectArray => TypeRef::ObjectArray,
            WireType::StringArray => TypeRef::StringArray,
            WireType::PrimitiveArray(p) => TypeRef::PrimitiveArray(*p),
        })
    }

    /// Element type of a general array. Unlike member types, it must
    /// resolve: a placeholder cannot stand in for an element type.
    fn array_element(&self, wire: &WireType, offset: u64) -> DecodeResult<TypeRef> {
        let ty = self.type_ref(wire, offset)?;
        if let TypeRef::Class(name) = &ty {
            let (base, _) = array_base_name(&name.name);
            let builtin = name.is_core()
                && (base == CORE_STRING
                    || base == CORE_OBJECT
                    || PrimitiveType::from_core_type_name(base).is_some());
            if !builtin {
                let base_type = TypeName {
                    name: base.to_string(),
                    assembly: name.assembly.clone(),
                };
                if self.resolve_target(&base_type)? == Target::Unresolved {
                    return Err(DecodeError::TypeRequired {
                        ty: name.to_string(),
                        reason: "array element type could not be resolved".to_string(),
                    });
                }
            }
        }
        Ok(ty)
    }

    fn object_map(&self, class: &ClassRecord, offset: u64) -> DecodeResult<ObjectMap> {
        let assembly = match class.assembly_id {
            Some(id) => Some(self.assembly_name(id, offset)?),
            None => None,
        };
        let wire = TypeName {
            name: class.type_name.clone(),
            assembly,
        };
        for (i, name) in class.member_names.iter().enumerate() {
            if class.member_names[..i].contains(name) {
                return Err(corrupt(offset, format!("{wire} lists member {name:?} twice")));
            }
        }
        let stream_types = match &class.member_types {
            Some(types) => Some(
                types
                    .iter()
                    .map(|t| self.type_ref(t, offset))
                    .collect::<DecodeResult<Vec<_>>>()?,
            ),
            None => None,
        };

        if wire.is_core() && class.member_names == [BOXED_VALUE_MEMBER] {
            if let Some(kind) = PrimitiveType::from_core_type_name(&wire.name) {
                return Ok(ObjectMap {
                    wire,
                    member_names: class.member_names.clone(),
                    member_types: vec![TypeRef::Primitive(kind)],
                    target: Target::Boxed(kind),
                    keep: vec![true],
                });
            }
        }

        let target = self.resolve_target(&wire)?;
        let keep = self.check_members(&target, &class.member_names)?;
        let member_types = match (stream_types, &target) {
            (Some(types), _) => types,
            (None, Target::Layout { ty, custom: false }) => {
                let layout = self.layout(ty)?;
                let mut types = Vec::with_capacity(class.member_names.len());
                for name in &class.member_names {
                    let member = layout.find(name).ok_or_else(|| DecodeError::MemberMismatch {
                        ty: ty.clone(),
                        member: name.clone(),
                        reason: "untyped record names a member the layout does not declare",
                    })?;
                    types.push(member.ty.clone());
                }
                types
            }
            (None, _) => {
                return Err(DecodeError::TypeRequired {
                    ty: wire.to_string(),
                    reason: "schema record carries no member types and no layout describes it"
                        .to_string(),
                })
            }
        };

        Ok(ObjectMap {
            wire,
            member_names: class.member_names.clone(),
            member_types,
            target,
            keep,
        })
    }

    fn layout(&self, ty: &TypeName) -> DecodeResult<&'a TypeLayout> {
        self.describer
            .describe(ty)
            .ok_or_else(|| DecodeError::TypeRequired {
                ty: ty.to_string(),
                reason: "resolved type has no layout".to_string(),
            })
    }

    /// Binder first, then the describer. Unresolvable types become
    /// placeholders.
    fn resolve_target(&self, wire: &TypeName) -> DecodeResult<Target> {
        if self.surrogates.get(wire).is_some() {
            return Ok(Target::Surrogate(wire.clone()));
        }
        let bound = self
            .binder
            .and_then(|b| b.bind(wire.assembly.as_deref(), &wire.name));
        let layout = match bound {
            Some(bound) => {
                if self.surrogates.get(&bound).is_some() {
                    check_trust(wire, &bound, None)?;
                    return Ok(Target::Surrogate(bound));
                }
                match self.describer.describe(&bound) {
                    Some(layout) => Some(layout),
                    None => {
                        log::warn!("{wire} was bound to {bound}, which has no layout; reading a placeholder");
                        return Ok(Target::Unresolved);
                    }
                }
            }
            None => self.describer.resolve(&wire.name, wire.assembly.as_deref()),
        };
        match layout {
            Some(layout) => {
                check_trust(wire, &layout.ty, layout.forwarded_from.as_deref())?;
                if self.surrogates.get(&layout.ty).is_some() {
                    return Ok(Target::Surrogate(layout.ty.clone()));
                }
                Ok(Target::Layout {
                    ty: layout.ty.clone(),
                    custom: layout.custom,
                })
            }
            None => {
                log::warn!("type {wire} could not be resolved; reading a placeholder");
                Ok(Target::Unresolved)
            }
        }
    }

    /// Apply the member policies; returns which stream members to keep.
    fn check_members(&self, target: &Target, names: &[String]) -> DecodeResult<Vec<bool>> {
        let Target::Layout { ty, custom: false } = target else {
            return Ok(vec![true; names.len()]);
        };
        let layout = self.layout(ty)?;
        let mut keep = Vec::with_capacity(names.len());
        for name in names {
            let known = layout.find(name).is_some();
            if !known && self.options.unknown_members == UnknownMembers::Reject {
                return Err(DecodeError::MemberMismatch {
                    ty: ty.clone(),
                    member: name.clone(),
                    reason: "not declared by the layout",
                });
            }
            keep.push(known);
        }
        for member in &layout.members {
            if names.contains(&member.name) {
                continue;
            }
            let allowed = match self.options.missing_members {
                MissingMembers::Reject => false,
                MissingMembers::AllowOptional => member.optional,
                MissingMembers::AllowAll => true,
            };
            if !allowed {
                return Err(DecodeError::MemberMismatch {
                    ty: ty.clone(),
                    member: member.name.clone(),
                    reason: "missing from the stream",
                });
            }
        }
        Ok(keep)
    }
}

/// A stream type naming a real assembly may only land in the core library
/// through a layout that declares it was forwarded from that assembly.
fn check_trust(wire: &TypeName, resolved: &TypeName, forwarded_from: Option<&str>) -> DecodeResult<()> {
    let Some(assembly) = wire.assembly.as_deref() else {
        return Ok(());
    };
    if !resolved.is_core() {
        return Ok(());
    }
    let wanted = simple_assembly_name(assembly);
    if forwarded_from.is_some_and(|from| simple_assembly_name(from) == wanted) {
        return Ok(());
    }
    Err(DecodeError::TrustViolation {
        ty: wire.name.clone(),
        assembly: assembly.to_string(),
    })
}

fn corrupt(offset: u64, reason: impl Into<String>) -> DecodeError {
    DecodeError::CorruptStream {
        offset,
        reason: reason.into(),
    }
}

fn graph_error(offset: u64, err: GraphError) -> DecodeError {
    corrupt(offset, err.to_string())
}
