//! Node types stored in an [`ObjectGraph`](super::ObjectGraph).
//!
//! A node is one distinct heap instance: a class/struct object or an array.
//! Strings and primitives are values, not nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::array::ArrayNode;
use crate::types::TypeName;
use crate::value::Value;

/// Handle to a node within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named member slot of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

/// An instance of a class or struct type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    /// Concrete runtime type.
    pub ty: TypeName,
    /// Member values in declaration order.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Set on placeholders whose type could not be resolved while reading.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unresolved: bool,
}

impl ObjectNode {
    /// Create an object with no fields.
    pub fn new(ty: TypeName) -> Self {
        Self {
            ty,
            fields: Vec::new(),
            unresolved: false,
        }
    }

    /// Create a placeholder for a type that could not be loaded.
    pub fn placeholder(ty: TypeName) -> Self {
        Self {
            ty,
            fields: Vec::new(),
            unresolved: true,
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Assign a field, appending it if it does not exist yet.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field { name, value }),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// A node in an object graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Object(ObjectNode),
    Array(ArrayNode),
}

impl Node {
    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Node::Object(o) => Some(o),
            Node::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            Node::Array(a) => Some(a),
            Node::Object(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }
}
