//! Per-type serialization overrides.
//!
//! A [`Surrogate`] replaces the layout-driven member list of a type with a
//! `{name, type, value}` list it builds itself. Surrogate-written objects
//! always travel with typed schema records so the reader can rebuild the
//! [`SerializationInfo`] without consulting a layout.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::describe::infer_type;
use crate::graph::{NodeId, ObjectGraph, ObjectNode};
use crate::types::{TypeName, TypeRef};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurrogateError {
    #[error("surrogate for {ty} is missing member {name:?}")]
    MissingMember { ty: TypeName, name: String },

    #[error("surrogate for {ty} failed: {reason}")]
    Failed { ty: TypeName, reason: String },
}

/// One entry of a [`SerializationInfo`].
#[derive(Debug, Clone, PartialEq)]
pub struct InfoEntry {
    pub name: String,
    pub ty: TypeRef,
    pub value: Value,
}

/// The member list produced or consumed by a surrogate.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializationInfo {
    ty: TypeName,
    entries: Vec<InfoEntry>,
}

impl SerializationInfo {
    pub fn new(ty: TypeName) -> Self {
        Self {
            ty,
            entries: Vec::new(),
        }
    }

    /// The type name written for this object.
    pub fn type_name(&self) -> &TypeName {
        &self.ty
    }

    /// Write the object under a different type name.
    pub fn set_type(&mut self, ty: TypeName) {
        self.ty = ty;
    }

    /// Add a member whose declared type is inferred from its value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let ty = infer_type(&value);
        self.add_typed(name, ty, value);
    }

    pub fn add_typed(&mut self, name: impl Into<String>, ty: TypeRef, value: impl Into<Value>) {
        self.entries.push(InfoEntry {
            name: name.into(),
            ty,
            value: value.into(),
        });
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.value)
    }

    /// Like [`get`](Self::get) but absent members are an error.
    pub fn require(&self, name: &str) -> Result<&Value, SurrogateError> {
        self.get(name).ok_or_else(|| SurrogateError::MissingMember {
            ty: self.ty.clone(),
            name: name.to_string(),
        })
    }

    pub fn entries(&self) -> &[InfoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Custom member extraction and population for one type.
pub trait Surrogate {
    fn get_object_data(
        &self,
        object: &ObjectNode,
        info: &mut SerializationInfo,
    ) -> Result<(), SurrogateError>;

    fn set_object_data(
        &self,
        object: &mut ObjectNode,
        info: &SerializationInfo,
    ) -> Result<(), SurrogateError>;

    /// Called for every object this surrogate rebuilt, after the whole
    /// graph is read and every reference in it is linked.
    fn on_deserialized(&self, _node: NodeId, _graph: &mut ObjectGraph) -> Result<(), SurrogateError> {
        Ok(())
    }
}

/// Surrogates keyed by the type they handle.
#[derive(Default)]
pub struct SurrogateSelector {
    by_type: HashMap<TypeName, Box<dyn Surrogate>>,
}

impl SurrogateSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ty: TypeName, surrogate: impl Surrogate + 'static) {
        self.by_type.insert(ty, Box::new(surrogate));
    }

    pub fn get(&self, ty: &TypeName) -> Option<&dyn Surrogate> {
        self.by_type.get(ty).map(|s| s.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for SurrogateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_type.keys()).finish()
    }
}
