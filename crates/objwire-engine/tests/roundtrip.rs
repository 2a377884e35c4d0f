//! Integration tests for the objwire writer and reader engines.

use objwire_core::{
    ArrayNode, MapBinder, NodeId, ObjectGraph, ObjectNode, Primitive, PrimitiveType,
    SerializationInfo, Surrogate, SurrogateError, TypeLayout, TypeName, TypeRef, TypeRegistry,
    Value,
};
use objwire_engine::{
    AssemblyFormat, DecodeError, EncodeError, Formatter, FormatterOptions, MissingMembers,
    TypeFormat, UnknownMembers,
};
use objwire_format::{
    ArraySingleRecord, AssemblyRecord, ClassRecord, HeaderRecord, ObjectRecord, Record,
    StringRecord, WireType, WireWriter,
};

const APP: &str = "DemoApp";

fn person() -> TypeName {
    TypeName::new("Demo.Person", APP)
}

fn person_layout() -> TypeLayout {
    TypeLayout::new(person())
        .member("id", TypeRef::Primitive(PrimitiveType::Int32))
        .member("name", TypeRef::String)
        .member("friend", TypeRef::Class(person()))
}

fn link() -> TypeName {
    TypeName::new("Demo.Link", APP)
}

fn link_layout() -> TypeLayout {
    TypeLayout::new(link())
        .member("value", TypeRef::Primitive(PrimitiveType::Int32))
        .member("next", TypeRef::Class(link()))
}

fn formatter(layouts: impl IntoIterator<Item = TypeLayout>) -> Formatter<TypeRegistry> {
    Formatter::new(layouts.into_iter().collect())
}

fn round_trip(f: &Formatter<TypeRegistry>, graph: &ObjectGraph, root: Value) {
    let bytes = f.serialize_to_vec(graph, &root).expect("serialize");
    let decoded = f.deserialize_from_slice(&bytes).expect("deserialize");
    assert!(
        graph.equivalent(&root, &decoded.graph, &decoded.root),
        "decoded graph differs: {decoded:#?}"
    );
}

#[test]
fn self_referencing_person_record_sequence() {
    let f = formatter([person_layout()]);
    let mut graph = ObjectGraph::new();
    let ann = graph.add_object(ObjectNode::new(person()).with("id", 1i32).with("name", "Ann"));
    graph.object_mut(ann).unwrap().set("friend", ann);

    let bytes = f.serialize_to_vec(&graph, &ann.into()).expect("serialize");
    let records = f.inspect(&bytes[..]).expect("inspect");
    assert_eq!(
        records,
        vec![
            Record::Header(HeaderRecord::new(1)),
            Record::Assembly(AssemblyRecord {
                id: 1,
                name: APP.to_string(),
            }),
            Record::ObjectWithSchema(ClassRecord {
                object_id: 1,
                type_name: "Demo.Person".to_string(),
                member_names: vec!["id".into(), "name".into(), "friend".into()],
                member_types: Some(vec![
                    WireType::Primitive(PrimitiveType::Int32),
                    WireType::String,
                    WireType::Class {
                        name: "Demo.Person".to_string(),
                        assembly_id: 1,
                    },
                ]),
                assembly_id: Some(1),
            }),
            Record::MemberPrimitiveUnTyped(Primitive::Int32(1)),
            Record::ObjectString(StringRecord {
                object_id: 2,
                value: "Ann".to_string(),
            }),
            Record::MemberReference(1),
            Record::MessageEnd,
        ]
    );

    let decoded = f.deserialize_from_slice(&bytes).expect("deserialize");
    let root = decoded.root.as_node().expect("root is an object");
    let object = decoded.graph.object(root).unwrap();
    assert_eq!(object.get("friend"), Some(&Value::Ref(root)));
    assert_eq!(object.get("name"), Some(&Value::from("Ann")));
    assert_eq!(decoded.graph.len(), 1);
}

#[test]
fn shared_references_stay_shared() {
    let f = formatter([person_layout()]);
    let mut graph = ObjectGraph::new();
    let carol = graph.add_object(ObjectNode::new(person()).with("id", 3i32).with("name", "Carol"));
    let alice = graph.add_object(
        ObjectNode::new(person())
            .with("id", 1i32)
            .with("name", "Alice")
            .with("friend", carol),
    );
    let bob = graph.add_object(
        ObjectNode::new(person())
            .with("id", 2i32)
            .with("name", "Bob")
            .with("friend", carol),
    );
    let list = graph.add_array(ArrayNode::new(
        TypeRef::Object,
        vec![alice.into(), bob.into(), carol.into()],
    ));

    round_trip(&f, &graph, list.into());

    let bytes = f.serialize_to_vec(&graph, &list.into()).unwrap();
    let decoded = f.deserialize_from_slice(&bytes).unwrap();
    let cells = decoded.graph.array(decoded.root.as_node().unwrap()).unwrap().cells().to_vec();
    let friend_of = |v: &Value| {
        decoded
            .graph
            .object(v.as_node().unwrap())
            .unwrap()
            .get("friend")
            .cloned()
    };
    assert_eq!(friend_of(&cells[0]), Some(cells[2].clone()));
    assert_eq!(friend_of(&cells[1]), Some(cells[2].clone()));
    assert_eq!(decoded.graph.len(), 4);
}

#[test]
fn forward_references_in_a_cycle_are_fixed_up() {
    let f = formatter([link_layout()]);
    let mut graph = ObjectGraph::new();
    let a = graph.add_object(ObjectNode::new(link()).with("value", 1i32));
    let b = graph.add_object(ObjectNode::new(link()).with("value", 2i32));
    let c = graph.add_object(ObjectNode::new(link()).with("value", 3i32).with("next", a));
    graph.object_mut(a).unwrap().set("next", b);
    graph.object_mut(b).unwrap().set("next", c);

    round_trip(&f, &graph, a.into());
}

#[test]
fn long_chains_do_not_recurse() {
    let f = formatter([link_layout()]);
    let mut graph = ObjectGraph::new();
    let mut next = Value::Null;
    for i in 0..10_000 {
        let node = graph.add_object(ObjectNode::new(link()).with("value", i).with("next", next));
        next = node.into();
    }
    round_trip(&f, &graph, next);
}

#[test]
fn lower_bounds_round_trip() {
    let f = formatter([]);
    let mut array =
        ArrayNode::with_shape(TypeRef::Primitive(PrimitiveType::Int32), vec![3], vec![5]).unwrap();
    for (i, index) in [5, 6, 7].into_iter().enumerate() {
        array.set(&[index], Value::from(i as i32 * 10)).unwrap();
    }
    let mut graph = ObjectGraph::new();
    let root = graph.add_array(array);

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    let decoded = f.deserialize_from_slice(&bytes).unwrap();
    let array = decoded.graph.array(decoded.root.as_node().unwrap()).unwrap();
    assert_eq!(array.lower_bounds(), &[5]);
    assert_eq!(array.lengths(), &[3]);
    assert_eq!(array.get(&[5]), Some(&Value::from(0i32)));
    assert_eq!(array.get(&[7]), Some(&Value::from(20i32)));
    assert_eq!(array.get(&[4]), None);
}

#[test]
fn null_runs_are_lossless() {
    let f = formatter([]);
    let mut cells = vec![Value::Null; 1000];
    cells[500] = Value::from("x");
    let mut graph = ObjectGraph::new();
    let root = graph.add_array(ArrayNode::new(TypeRef::Object, cells.clone()));

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    let runs: Vec<_> = records.iter().filter_map(Record::null_count).collect();
    assert_eq!(runs, vec![500, 499]);
    assert!(records.contains(&Record::ObjectNullMultiple(500)));

    let decoded = f.deserialize_from_slice(&bytes).unwrap();
    let array = decoded.graph.array(decoded.root.as_node().unwrap()).unwrap();
    assert_eq!(array.cells(), &cells[..]);
}

#[test]
fn short_null_runs_use_the_compact_records() {
    let f = formatter([]);
    let mut cells = vec![Value::Null; 12];
    cells[1] = Value::from(7i32);
    let mut graph = ObjectGraph::new();
    let root = graph.add_array(ArrayNode::new(TypeRef::Object, cells.clone()));

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    assert!(records.contains(&Record::ObjectNull));
    assert!(records.contains(&Record::ObjectNullMultiple256(10)));

    let decoded = f.deserialize_from_slice(&bytes).unwrap();
    let array = decoded.graph.array(decoded.root.as_node().unwrap()).unwrap();
    assert_eq!(array.cells(), &cells[..]);
}

#[test]
fn schemas_are_sent_once_per_shape() {
    let f = formatter([link_layout()]);
    let mut graph = ObjectGraph::new();
    let items: Vec<Value> = (0..100)
        .map(|i| graph.add_object(ObjectNode::new(link()).with("value", i)).into())
        .collect();
    let root = graph.add_array(ArrayNode::new(TypeRef::Object, items));

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    let full = records
        .iter()
        .filter(|r| matches!(r, Record::ObjectWithSchema(_)))
        .count();
    let compact = records
        .iter()
        .filter(|r| matches!(r, Record::Object(_)))
        .count();
    assert_eq!((full, compact), (1, 99));
    round_trip(&f, &graph, root.into());
}

#[test]
fn truncated_streams_are_corrupt() {
    let f = formatter([person_layout(), link_layout()]);
    let mut graph = ObjectGraph::new();
    let ann = graph.add_object(ObjectNode::new(person()).with("id", 1i32).with("name", "Ann"));
    graph.object_mut(ann).unwrap().set("friend", ann);
    let tail = graph.add_object(ObjectNode::new(link()).with("value", 9i32));
    let head = graph.add_object(ObjectNode::new(link()).with("value", 8i32).with("next", tail));
    let mut cells = vec![Value::Null; 300];
    cells[0] = ann.into();
    cells[299] = head.into();
    cells[150] = Value::from(2.5f64);
    let root = graph.add_array(ArrayNode::new(TypeRef::Object, cells));

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    f.deserialize_from_slice(&bytes).expect("full stream decodes");
    for cut in 0..bytes.len() {
        match f.deserialize_from_slice(&bytes[..cut]) {
            Err(DecodeError::CorruptStream { .. }) => {}
            other => panic!("cut at {cut} of {}: {other:?}", bytes.len()),
        }
    }
}

#[test]
fn garbage_is_rejected() {
    let f = formatter([]);
    assert!(matches!(
        f.deserialize_from_slice(&[0xFF, 0, 0]),
        Err(DecodeError::CorruptStream { offset: 0, .. })
    ));

    let mut graph = ObjectGraph::new();
    let root = graph.add_array(ArrayNode::new(TypeRef::String, vec!["a".into()]));
    let mut bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    // A second header where the message end belongs.
    let end = bytes.len() - 1;
    bytes[end] = 0;
    assert!(matches!(
        f.deserialize_from_slice(&bytes),
        Err(DecodeError::CorruptStream { .. })
    ));
}

/// Encode a hand-built record sequence.
fn stream(records: &[Record]) -> Vec<u8> {
    let mut w = WireWriter::new(Vec::new());
    for record in records {
        record.write(&mut w).expect("write record");
    }
    w.into_inner()
}

fn assert_corrupt(f: &Formatter<TypeRegistry>, bytes: &[u8], needle: &str) {
    match f.deserialize_from_slice(bytes) {
        Err(DecodeError::CorruptStream { reason, .. }) => {
            assert!(reason.contains(needle), "unexpected reason: {reason}")
        }
        other => panic!("expected a corrupt stream mentioning {needle:?}, got {other:?}"),
    }
}

fn demo_assembly() -> Record {
    Record::Assembly(AssemblyRecord {
        id: 1,
        name: APP.to_string(),
    })
}

fn two_member_class(names: [&str; 2], types: [WireType; 2]) -> Record {
    Record::ObjectWithSchema(ClassRecord {
        object_id: 1,
        type_name: "Demo.Pair".to_string(),
        member_names: names.iter().map(|n| n.to_string()).collect(),
        member_types: Some(types.to_vec()),
        assembly_id: Some(1),
    })
}

#[test]
fn oversized_arrays_are_rejected_before_allocating() {
    let bytes = stream(&[
        Record::Header(HeaderRecord::new(1)),
        Record::ArraySingleObject(ArraySingleRecord {
            object_id: 1,
            length: i32::MAX,
        }),
        Record::ObjectNullMultiple(i32::MAX),
        Record::MessageEnd,
    ]);
    assert_eq!(bytes.len(), 32);
    assert_corrupt(&formatter([]), &bytes, "exceeds the limit");

    let mut graph = ObjectGraph::new();
    let root = graph.add_array(ArrayNode::new(TypeRef::Object, vec![Value::Null; 5]));
    let bytes = formatter([]).serialize_to_vec(&graph, &root.into()).unwrap();
    let limited = |max_array_cells| {
        formatter([]).with_options(FormatterOptions {
            max_array_cells,
            ..Default::default()
        })
    };
    assert_corrupt(&limited(4), &bytes, "exceeds the limit");
    assert!(limited(5).deserialize_from_slice(&bytes).is_ok());
}

#[test]
fn null_runs_never_cover_primitive_members() {
    let int32 = WireType::Primitive(PrimitiveType::Int32);
    let bad = stream(&[
        Record::Header(HeaderRecord::new(1)),
        demo_assembly(),
        two_member_class(["a", "b"], [WireType::Object, int32]),
        Record::ObjectNullMultiple256(2),
        Record::MessageEnd,
    ]);
    assert_corrupt(&formatter([]), &bad, "primitive member \"b\"");

    let good = stream(&[
        Record::Header(HeaderRecord::new(1)),
        demo_assembly(),
        two_member_class(["a", "b"], [WireType::Object, WireType::String]),
        Record::ObjectNullMultiple256(2),
        Record::MessageEnd,
    ]);
    let decoded = formatter([]).deserialize_from_slice(&good).expect("nulls over references");
    let pair = decoded.graph.object(decoded.root.as_node().unwrap()).unwrap();
    assert_eq!(pair.get("b"), Some(&Value::Null));
}

#[test]
fn repeated_member_names_are_corrupt() {
    let bytes = stream(&[
        Record::Header(HeaderRecord::new(1)),
        demo_assembly(),
        two_member_class(["a", "a"], [WireType::Object, WireType::Object]),
        Record::ObjectNull,
        Record::MemberReference(1),
        Record::MessageEnd,
    ]);
    assert_corrupt(&formatter([]), &bytes, "twice");
}

#[test]
fn references_left_dangling_at_message_end_are_corrupt() {
    let bytes = stream(&[
        Record::Header(HeaderRecord::new(1)),
        Record::ArraySingleObject(ArraySingleRecord {
            object_id: 1,
            length: 1,
        }),
        Record::MemberReference(5),
        Record::MessageEnd,
    ]);
    assert_corrupt(&formatter([]), &bytes, "never resolved");
}

#[test]
fn schema_reuse_needs_a_declared_schema() {
    let bytes = stream(&[
        Record::Header(HeaderRecord::new(1)),
        Record::Object(ObjectRecord {
            object_id: 1,
            schema_id: 9,
        }),
        Record::MessageEnd,
    ]);
    assert_corrupt(&formatter([]), &bytes, "schema #9 was never declared");
}

#[test]
fn class_member_types_need_a_declared_assembly() {
    let bytes = stream(&[
        Record::Header(HeaderRecord::new(1)),
        demo_assembly(),
        two_member_class(
            ["a", "b"],
            [
                WireType::Object,
                WireType::Class {
                    name: "Other.Thing".to_string(),
                    assembly_id: 7,
                },
            ],
        ),
        Record::ObjectNull,
        Record::ObjectNull,
        Record::MessageEnd,
    ]);
    assert_corrupt(&formatter([]), &bytes, "assembly #7 was never declared");
}

#[test]
fn unresolved_types_become_placeholders() {
    let holder = TypeName::new("Demo.Holder", APP);
    let gadget = TypeName::new("Gadgets.Gadget", "Gadgets");
    let holder_layout = TypeLayout::new(holder.clone())
        .member("label", TypeRef::String)
        .member("gadget", TypeRef::Object);
    let writer = formatter([
        holder_layout.clone(),
        TypeLayout::new(gadget.clone())
            .member("size", TypeRef::Primitive(PrimitiveType::Int32))
            .member("owner", TypeRef::Object),
    ]);
    let mut graph = ObjectGraph::new();
    let h = graph.add_object(ObjectNode::new(holder.clone()).with("label", "box"));
    let g = graph.add_object(ObjectNode::new(gadget.clone()).with("size", 4i32).with("owner", h));
    graph.object_mut(h).unwrap().set("gadget", g);
    let bytes = writer.serialize_to_vec(&graph, &h.into()).unwrap();

    let reader = formatter([holder_layout]);
    let decoded = reader.deserialize_from_slice(&bytes).expect("siblings still decode");
    let root = decoded.root.as_node().unwrap();
    let holder_node = decoded.graph.object(root).unwrap();
    assert!(!holder_node.unresolved);
    let placeholder = decoded
        .graph
        .object(holder_node.get("gadget").and_then(Value::as_node).unwrap())
        .unwrap();
    assert!(placeholder.unresolved);
    assert_eq!(placeholder.ty, gadget);
    assert_eq!(placeholder.get("size"), Some(&Value::from(4i32)));
    assert_eq!(placeholder.get("owner"), Some(&Value::Ref(root)));

    // Placeholders carry enough to be written back unchanged.
    let again = reader.serialize_to_vec(&decoded.graph, &decoded.root).unwrap();
    assert_eq!(again, bytes);
}

#[test]
fn unresolved_array_element_type_is_required() {
    let gadget = TypeName::new("Gadgets.Gadget", "Gadgets");
    let writer = formatter([TypeLayout::new(gadget.clone())]);
    let mut graph = ObjectGraph::new();
    let g = graph.add_object(ObjectNode::new(gadget.clone()));
    let root = graph.add_array(ArrayNode::new(TypeRef::Class(gadget), vec![g.into()]));
    let bytes = writer.serialize_to_vec(&graph, &root.into()).unwrap();

    assert!(writer.deserialize_from_slice(&bytes).is_ok());
    assert!(matches!(
        formatter([]).deserialize_from_slice(&bytes),
        Err(DecodeError::TypeRequired { .. })
    ));
}

#[test]
fn binding_into_the_core_library_needs_a_matching_forward() {
    let foreign = TypeName::new("Plugin.Handle", "Plugin");
    let writer = formatter([TypeLayout::new(foreign.clone()).member("raw", TypeRef::String)]);
    let mut graph = ObjectGraph::new();
    let root = graph.add_object(ObjectNode::new(foreign).with("raw", "x"));
    let bytes = writer.serialize_to_vec(&graph, &root.into()).unwrap();

    let core = TypeName::core("System.Handle");
    let binder = MapBinder::new().map(Some("Plugin"), "Plugin.Handle", core.clone());

    let unforwarded = formatter([TypeLayout::new(core.clone()).member("raw", TypeRef::String)])
        .with_binder(binder.clone());
    assert!(matches!(
        unforwarded.deserialize_from_slice(&bytes),
        Err(DecodeError::TrustViolation { .. })
    ));

    let forwarded = formatter([TypeLayout::new(core.clone())
        .member("raw", TypeRef::String)
        .forwarded_from("Plugin, Version=2.0.0.0")])
    .with_binder(binder);
    let decoded = forwarded.deserialize_from_slice(&bytes).expect("forward declared");
    let object = decoded.graph.object(decoded.root.as_node().unwrap()).unwrap();
    assert_eq!(object.ty, core);
}

#[test]
fn forwarded_layouts_round_trip_under_their_old_name() {
    let moved = TypeName::core("System.Moved");
    let f = formatter([TypeLayout::new(moved.clone())
        .member("n", TypeRef::Primitive(PrimitiveType::Int64))
        .forwarded_from("OldLib")]);
    let mut graph = ObjectGraph::new();
    let root = graph.add_object(ObjectNode::new(moved).with("n", 5i64));

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    assert!(records.contains(&Record::Assembly(AssemblyRecord {
        id: 1,
        name: "OldLib".to_string(),
    })));
    round_trip(&f, &graph, root.into());
}

fn versioned(extra: Option<&str>) -> TypeLayout {
    let layout = TypeLayout::new(person())
        .member("id", TypeRef::Primitive(PrimitiveType::Int32))
        .member("name", TypeRef::String);
    match extra {
        Some(name) => layout.optional_member(name, TypeRef::String),
        None => layout,
    }
}

fn person_v1_bytes() -> Vec<u8> {
    let f = formatter([versioned(None)]);
    let mut graph = ObjectGraph::new();
    let root = graph.add_object(ObjectNode::new(person()).with("id", 7i32).with("name", "Ann"));
    f.serialize_to_vec(&graph, &root.into()).unwrap()
}

#[test]
fn missing_optional_members_are_tolerated_by_default() {
    let bytes = person_v1_bytes();
    let v2 = formatter([versioned(Some("nickname"))]);
    let decoded = v2.deserialize_from_slice(&bytes).expect("optional member may be missing");
    let object = decoded.graph.object(decoded.root.as_node().unwrap()).unwrap();
    assert_eq!(object.get("nickname"), Some(&Value::Null));
    assert_eq!(object.get("id"), Some(&Value::from(7i32)));

    let strict = formatter([versioned(Some("nickname"))]).with_options(FormatterOptions {
        missing_members: MissingMembers::Reject,
        ..Default::default()
    });
    assert!(matches!(
        strict.deserialize_from_slice(&bytes),
        Err(DecodeError::MemberMismatch { .. })
    ));
}

#[test]
fn missing_required_members_need_allow_all() {
    let bytes = person_v1_bytes();
    let required = versioned(None).member("email", TypeRef::String);
    assert!(matches!(
        formatter([required.clone()]).deserialize_from_slice(&bytes),
        Err(DecodeError::MemberMismatch { .. })
    ));
    let lenient = formatter([required]).with_options(FormatterOptions {
        missing_members: MissingMembers::AllowAll,
        ..Default::default()
    });
    assert!(lenient.deserialize_from_slice(&bytes).is_ok());
}

#[test]
fn unknown_members_are_rejected_unless_ignored() {
    let bytes = person_v1_bytes();
    let narrow = || TypeLayout::new(person()).member("name", TypeRef::String);
    assert!(matches!(
        formatter([narrow()]).deserialize_from_slice(&bytes),
        Err(DecodeError::MemberMismatch { .. })
    ));

    let ignoring = formatter([narrow()]).with_options(FormatterOptions {
        unknown_members: UnknownMembers::Ignore,
        ..Default::default()
    });
    let decoded = ignoring.deserialize_from_slice(&bytes).unwrap();
    let object = decoded.graph.object(decoded.root.as_node().unwrap()).unwrap();
    assert_eq!(object.get("name"), Some(&Value::from("Ann")));
    assert_eq!(object.get("id"), None);
}

/// Stores a pair of `Int32` members packed into one `Int64`.
struct PackedPair;

impl Surrogate for PackedPair {
    fn get_object_data(
        &self,
        object: &ObjectNode,
        info: &mut SerializationInfo,
    ) -> Result<(), SurrogateError> {
        let half = |name: &str| match object.get(name) {
            Some(Value::Primitive(Primitive::Int32(v))) => Ok(*v),
            _ => Err(SurrogateError::Failed {
                ty: object.ty.clone(),
                reason: format!("{name} is not an int"),
            }),
        };
        let packed = (i64::from(half("hi")?) << 32) | i64::from(half("lo")? as u32);
        info.add("packed", packed);
        Ok(())
    }

    fn set_object_data(
        &self,
        object: &mut ObjectNode,
        info: &SerializationInfo,
    ) -> Result<(), SurrogateError> {
        let packed = match info.require("packed")? {
            Value::Primitive(Primitive::Int64(v)) => *v,
            _ => {
                return Err(SurrogateError::Failed {
                    ty: info.type_name().clone(),
                    reason: "packed is not a long".into(),
                })
            }
        };
        object.set("hi", (packed >> 32) as i32);
        object.set("lo", packed as i32);
        Ok(())
    }
}

#[test]
fn surrogates_replace_the_member_list() {
    let pair = TypeName::new("Demo.Pair", APP);
    let f = formatter([]).with_surrogate(pair.clone(), PackedPair);
    let mut graph = ObjectGraph::new();
    let root = graph.add_object(ObjectNode::new(pair).with("hi", -2i32).with("lo", 7i32));

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    assert!(records.iter().any(|r| matches!(
        r,
        Record::ObjectWithSchema(c) if c.member_names == ["packed"]
    )));
    round_trip(&f, &graph, root.into());

    let plain = formatter([]);
    assert!(matches!(
        plain.serialize_to_vec(&graph, &root.into()),
        Err(EncodeError::UnsupportedType(_))
    ));
}

#[test]
fn surrogate_data_waits_for_forward_references() {
    let tagged = TypeName::new("Demo.Tagged", APP);

    struct Tagged;
    impl Surrogate for Tagged {
        fn get_object_data(
            &self,
            object: &ObjectNode,
            info: &mut SerializationInfo,
        ) -> Result<(), SurrogateError> {
            info.add("peer", object.get("peer").cloned().unwrap_or_default());
            Ok(())
        }

        fn set_object_data(
            &self,
            object: &mut ObjectNode,
            info: &SerializationInfo,
        ) -> Result<(), SurrogateError> {
            match info.require("peer")? {
                Value::Null => Err(SurrogateError::Failed {
                    ty: info.type_name().clone(),
                    reason: "peer arrived unresolved".into(),
                }),
                peer => {
                    object.set("peer", peer.clone());
                    Ok(())
                }
            }
        }
    }

    let f = formatter([]).with_surrogate(tagged.clone(), Tagged);
    let mut graph = ObjectGraph::new();
    let a = graph.add_object(ObjectNode::new(tagged.clone()));
    let b = graph.add_object(ObjectNode::new(tagged).with("peer", a));
    graph.object_mut(a).unwrap().set("peer", b);
    round_trip(&f, &graph, a.into());
}

/// Copies the peer's name onto each object once the graph is linked.
struct Named;

impl Surrogate for Named {
    fn get_object_data(
        &self,
        object: &ObjectNode,
        info: &mut SerializationInfo,
    ) -> Result<(), SurrogateError> {
        info.add("name", object.get("name").cloned().unwrap_or_default());
        info.add("peer", object.get("peer").cloned().unwrap_or_default());
        Ok(())
    }

    fn set_object_data(
        &self,
        object: &mut ObjectNode,
        info: &SerializationInfo,
    ) -> Result<(), SurrogateError> {
        object.set("name", info.require("name")?.clone());
        object.set("peer", info.require("peer")?.clone());
        Ok(())
    }

    fn on_deserialized(&self, node: NodeId, graph: &mut ObjectGraph) -> Result<(), SurrogateError> {
        let peer = graph
            .object(node)
            .ok()
            .and_then(|o| o.get("peer"))
            .and_then(Value::as_node);
        let peer_name = peer
            .and_then(|p| graph.object(p).ok())
            .and_then(|o| o.get("name"))
            .cloned()
            .unwrap_or_default();
        if let Ok(object) = graph.object_mut(node) {
            object.set("peer_name", peer_name);
        }
        Ok(())
    }
}

#[test]
fn completion_hooks_see_the_linked_graph() {
    let named = TypeName::new("Demo.Named", APP);
    let f = formatter([]).with_surrogate(named.clone(), Named);
    let mut graph = ObjectGraph::new();
    let a = graph.add_object(ObjectNode::new(named.clone()).with("name", "a"));
    let b = graph.add_object(ObjectNode::new(named).with("name", "b").with("peer", a));
    graph.object_mut(a).unwrap().set("peer", b);

    // `a.peer` is a forward reference to `b` in the stream.
    let bytes = f.serialize_to_vec(&graph, &a.into()).unwrap();
    let decoded = f.deserialize_from_slice(&bytes).expect("deserialize");
    let a = decoded.root.as_node().unwrap();
    let a_node = decoded.graph.object(a).unwrap();
    assert_eq!(a_node.get("peer_name"), Some(&Value::from("b")));
    let b = a_node.get("peer").and_then(Value::as_node).unwrap();
    let b_node = decoded.graph.object(b).unwrap();
    assert_eq!(b_node.get("peer_name"), Some(&Value::from("a")));
    assert_eq!(b_node.get("peer"), Some(&Value::Ref(a)));
}

#[test]
fn primitive_and_string_roots() {
    let f = formatter([]);
    let graph = ObjectGraph::new();

    let bytes = f.serialize_to_vec(&graph, &Value::from(42i32)).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    assert!(matches!(
        &records[1],
        Record::ObjectWithSchema(c) if c.type_name == "System.Int32" && c.member_names == ["m_value"]
    ));
    let decoded = f.deserialize_from_slice(&bytes).unwrap();
    assert_eq!(decoded.root, Value::from(42i32));
    assert!(decoded.graph.is_empty());

    let bytes = f.serialize_to_vec(&graph, &Value::from("hello")).unwrap();
    let decoded = f.deserialize_from_slice(&bytes).unwrap();
    assert_eq!(decoded.root, Value::from("hello"));
}

#[test]
fn rectangular_and_jagged_arrays() {
    let f = formatter([]);
    let mut graph = ObjectGraph::new();

    let mut grid =
        ArrayNode::with_shape(TypeRef::Primitive(PrimitiveType::Double), vec![2, 3], vec![0, 0])
            .unwrap();
    grid.set(&[1, 2], Value::from(1.5f64)).unwrap();
    grid.set(&[0, 1], Value::from(-0.0f64)).unwrap();
    let grid = graph.add_array(grid);

    let row_a = graph.add_array(ArrayNode::new(
        TypeRef::Primitive(PrimitiveType::Int32),
        vec![1i32.into(), 2i32.into()],
    ));
    let row_b = graph.add_array(ArrayNode::new(TypeRef::Primitive(PrimitiveType::Int32), vec![]));
    let jagged = graph.add_array(ArrayNode::new(
        TypeRef::PrimitiveArray(PrimitiveType::Int32),
        vec![row_a.into(), Value::Null, row_b.into(), row_a.into()],
    ));
    let root = graph.add_array(ArrayNode::new(TypeRef::Object, vec![grid.into(), jagged.into()]));

    round_trip(&f, &graph, root.into());
}

#[test]
fn when_needed_schemas_omit_member_types() {
    let f = formatter([person_layout()]).with_options(FormatterOptions {
        type_format: TypeFormat::WhenNeeded,
        ..Default::default()
    });
    let mut graph = ObjectGraph::new();
    let ann = graph.add_object(ObjectNode::new(person()).with("id", 1i32).with("name", "Ann"));
    let bob = graph.add_object(
        ObjectNode::new(person())
            .with("id", 2i32)
            .with("name", "Bob")
            .with("friend", ann),
    );
    graph.object_mut(ann).unwrap().set("friend", bob);

    let bytes = f.serialize_to_vec(&graph, &ann.into()).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    assert!(records.iter().any(|r| matches!(
        r,
        Record::ObjectWithSchema(c) if c.member_types.is_none()
    )));
    round_trip(&f, &graph, ann.into());

    // Without a layout the untyped record cannot be parsed.
    assert!(matches!(
        formatter([]).deserialize_from_slice(&bytes),
        Err(DecodeError::TypeRequired { .. })
    ));
}

#[test]
fn simple_assembly_format_strips_version() {
    let full = TypeName::new("Demo.Thing", "DemoApp, Version=1.2.0.0, Culture=neutral");
    let f = formatter([TypeLayout::new(full.clone()).member("v", TypeRef::String)]).with_options(
        FormatterOptions {
            assembly_format: AssemblyFormat::Simple,
            ..Default::default()
        },
    );
    let mut graph = ObjectGraph::new();
    let root = graph.add_object(ObjectNode::new(full).with("v", "x"));

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    assert!(records.contains(&Record::Assembly(AssemblyRecord {
        id: 1,
        name: "DemoApp".to_string(),
    })));
    round_trip(&f, &graph, root.into());
}

#[test]
fn value_types_are_inlined_under_transient_ids() {
    let point = TypeName::new("Demo.Point", APP);
    let shape = TypeName::new("Demo.Shape", APP);
    let f = formatter([
        TypeLayout::new(point.clone())
            .member("x", TypeRef::Primitive(PrimitiveType::Int32))
            .member("y", TypeRef::Primitive(PrimitiveType::Int32))
            .value_type(),
        TypeLayout::new(shape.clone())
            .member("origin", TypeRef::Class(point.clone()))
            .member("extent", TypeRef::Class(point.clone())),
    ]);
    let mut graph = ObjectGraph::new();
    let origin = graph.add_object(ObjectNode::new(point.clone()).with("x", 1i32).with("y", 2i32));
    let extent = graph.add_object(ObjectNode::new(point).with("x", 3i32).with("y", 4i32));
    let root = graph.add_object(
        ObjectNode::new(shape)
            .with("origin", origin)
            .with("extent", extent),
    );

    let bytes = f.serialize_to_vec(&graph, &root.into()).unwrap();
    let records = f.inspect(&bytes[..]).unwrap();
    let ids: Vec<i32> = records.iter().filter_map(Record::object_id).collect();
    assert_eq!(ids, vec![1, -1, -2]);
    assert!(records.iter().all(|r| !matches!(r, Record::MemberReference(_))));
    round_trip(&f, &graph, root.into());
}

#[test]
fn value_types_cannot_contain_themselves() {
    let knot = TypeName::new("Demo.Knot", APP);
    let f = formatter([TypeLayout::new(knot.clone())
        .member("inner", TypeRef::Class(knot.clone()))
        .value_type()]);
    let holder = TypeName::new("Demo.KnotHolder", APP);
    let f = Formatter::new(
        f.describer()
            .clone()
            .with(TypeLayout::new(holder.clone()).member("knot", TypeRef::Class(knot.clone()))),
    );
    let mut graph = ObjectGraph::new();
    let k = graph.add_object(ObjectNode::new(knot));
    graph.object_mut(k).unwrap().set("inner", k);
    let root = graph.add_object(ObjectNode::new(holder).with("knot", k));

    let mut out = Vec::new();
    assert!(matches!(
        f.serialize(&graph, &root.into(), &mut out),
        Err(EncodeError::CyclicValueType(_))
    ));
    assert!(out.is_empty());
}

#[test]
fn caller_errors_write_nothing() {
    let f = formatter([]);
    let mut graph = ObjectGraph::new();
    let mut out = Vec::new();
    assert!(matches!(
        f.serialize(&graph, &Value::Null, &mut out),
        Err(EncodeError::NullGraph)
    ));

    let root = graph.add_object(ObjectNode::new(person()));
    assert!(matches!(
        f.serialize(&graph, &root.into(), &mut out),
        Err(EncodeError::UnsupportedType(ty)) if ty == person()
    ));

    let ints = graph.add_array(ArrayNode::new(
        TypeRef::Primitive(PrimitiveType::Int32),
        vec![Value::from("nope")],
    ));
    assert!(matches!(
        f.serialize(&graph, &ints.into(), &mut out),
        Err(EncodeError::ArrayElementMismatch { index: 0, .. })
    ));
    assert!(out.is_empty());
}

#[test]
fn primitive_members_must_match_their_declared_kind() {
    let f = formatter([person_layout()]);
    let mut graph = ObjectGraph::new();
    let root = graph.add_object(ObjectNode::new(person()).with("id", "one"));
    match f.serialize_to_vec(&graph, &root.into()) {
        Err(EncodeError::MemberTypeMismatch { member, .. }) => {
            assert_eq!(member, "Demo.Person.id")
        }
        other => panic!("expected a member type mismatch, got {other:?}"),
    }
}
