//! Type descriptions: the member layout of each serializable type.
//!
//! The engines never inspect a type on their own. They ask a
//! [`TypeDescriber`] for the ordered member list of a runtime type, for a
//! type matching a name read off the wire, and to move member values in and
//! out of object nodes. [`TypeRegistry`] is the table-driven default.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::ObjectNode;
use crate::types::{simple_assembly_name, TypeName, TypeRef};
use crate::value::{Primitive, Value};

/// One declared member of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// May be absent from a stream written by another version of the type.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl MemberInfo {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }
}

/// The serialization layout of a class or struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeLayout {
    #[serde(flatten)]
    pub ty: TypeName,
    /// Members in serialization order.
    #[serde(default)]
    pub members: Vec<MemberInfo>,
    /// Value types are embedded inline in their owner rather than shared.
    #[serde(default)]
    pub value_type: bool,
    /// Instances describe their own members; `members` is ignored.
    #[serde(default)]
    pub custom: bool,
    /// Assembly the type historically lived in. Written in place of the
    /// real assembly and accepted when reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_from: Option<String>,
}

impl TypeLayout {
    pub fn new(ty: TypeName) -> Self {
        Self {
            ty,
            members: Vec::new(),
            value_type: false,
            custom: false,
            forwarded_from: None,
        }
    }

    pub fn member(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.members.push(MemberInfo::new(name, ty));
        self
    }

    pub fn optional_member(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        let mut info = MemberInfo::new(name, ty);
        info.optional = true;
        self.members.push(info);
        self
    }

    pub fn value_type(mut self) -> Self {
        self.value_type = true;
        self
    }

    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn forwarded_from(mut self, assembly: impl Into<String>) -> Self {
        self.forwarded_from = Some(assembly.into());
        self
    }

    pub fn find(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    pub fn member_types(&self) -> Vec<TypeRef> {
        self.members.iter().map(|m| m.ty.clone()).collect()
    }

    /// The type name as it should appear on the wire.
    pub fn wire_name(&self) -> TypeName {
        match &self.forwarded_from {
            Some(asm) => TypeName::new(self.ty.name.clone(), asm.clone()),
            None => self.ty.clone(),
        }
    }
}

/// Declared type for a value that carries no declaration of its own.
pub fn infer_type(value: &Value) -> TypeRef {
    match value {
        Value::Primitive(p) => TypeRef::Primitive(p.kind()),
        Value::String(_) => TypeRef::String,
        Value::Null | Value::Ref(_) => TypeRef::Object,
    }
}

/// Provider of type layouts and member access.
pub trait TypeDescriber {
    /// Layout of a runtime type.
    fn describe(&self, ty: &TypeName) -> Option<&TypeLayout>;

    /// Find the layout matching a type name read from a stream.
    fn resolve(&self, name: &str, assembly: Option<&str>) -> Option<&TypeLayout>;

    /// Read member values in the given order; absent members read as null.
    fn get_values(&self, object: &ObjectNode, names: &[String]) -> Vec<Value> {
        names
            .iter()
            .map(|name| object.get(name).cloned().unwrap_or_default())
            .collect()
    }

    /// Store member values into an allocated instance.
    fn populate(&self, object: &mut ObjectNode, names: &[String], values: Vec<Value>) {
        for (name, value) in names.iter().zip(values) {
            object.set(name.clone(), value);
        }
    }

    /// A fresh instance with every member at its zero value.
    fn allocate_uninitialized(&self, layout: &TypeLayout) -> ObjectNode {
        let mut object = ObjectNode::new(layout.ty.clone());
        for member in &layout.members {
            let zero = match member.ty.as_primitive() {
                Some(p) => Value::Primitive(Primitive::default_for(p)),
                None => Value::Null,
            };
            object.set(member.name.clone(), zero);
        }
        object
    }
}

/// Table of layouts registered up front.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    layouts: HashMap<TypeName, TypeLayout>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layout, replacing any previous one for the same type.
    pub fn register(&mut self, layout: TypeLayout) -> Option<TypeLayout> {
        self.layouts.insert(layout.ty.clone(), layout)
    }

    pub fn with(mut self, layout: TypeLayout) -> Self {
        self.register(layout);
        self
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeLayout> {
        self.layouts.values()
    }
}

impl FromIterator<TypeLayout> for TypeRegistry {
    fn from_iter<I: IntoIterator<Item = TypeLayout>>(iter: I) -> Self {
        let mut registry = TypeRegistry::new();
        for layout in iter {
            registry.register(layout);
        }
        registry
    }
}

impl TypeDescriber for TypeRegistry {
    fn describe(&self, ty: &TypeName) -> Option<&TypeLayout> {
        self.layouts.get(ty)
    }

    /// Exact match first, then the same simple assembly name (ignoring
    /// version and culture), then a layout forwarded from that assembly.
    fn resolve(&self, name: &str, assembly: Option<&str>) -> Option<&TypeLayout> {
        let exact = TypeName {
            name: name.to_string(),
            assembly: assembly.map(str::to_string),
        };
        if let Some(layout) = self.layouts.get(&exact) {
            return Some(layout);
        }
        let wanted = simple_assembly_name(assembly?);
        let by_simple = self
            .layouts
            .values()
            .find(|l| l.ty.name == name && l.ty.simple_assembly() == Some(wanted));
        by_simple.or_else(|| {
            self.layouts.values().find(|l| {
                l.ty.name == name
                    && l.forwarded_from
                        .as_deref()
                        .is_some_and(|from| simple_assembly_name(from) == wanted)
            })
        })
    }
}
