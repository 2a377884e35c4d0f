//! Schema and assembly caches.
//!
//! Both sides keep their own tables, scoped to one call. The writer maps a
//! schema key to the id of the object whose record first carried it; the
//! reader maps that id to the decoded [`ObjectMap`]. Assembly names get
//! running ids starting at 1; id 0 is the core library and never declared.

use std::collections::HashMap;
use std::rc::Rc;

use objwire_core::types::{PrimitiveType, TypeName, TypeRef};

/// Everything that must match for a compact record to reuse a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub ty: TypeName,
    pub names: Vec<String>,
    pub types: Vec<TypeRef>,
    pub typed: bool,
}

/// Writer side: schemas already sent.
#[derive(Debug, Default)]
pub struct SchemaCache {
    sent: HashMap<SchemaKey, i32>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the object that first carried this schema.
    pub fn lookup(&self, key: &SchemaKey) -> Option<i32> {
        self.sent.get(key).copied()
    }

    /// Remember a schema. The first object to carry it wins.
    pub fn insert(&mut self, key: SchemaKey, object_id: i32) {
        self.sent.entry(key).or_insert(object_id);
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }
}

/// What the reader builds for records of one schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A type described by the layout registered for `ty`.
    Layout { ty: TypeName, custom: bool },
    /// A type handled by a surrogate.
    Surrogate(TypeName),
    /// A type that could not be resolved; read as a placeholder.
    Unresolved,
    /// A boxed primitive; the object stands for its single value.
    Boxed(PrimitiveType),
}

/// A decoded schema: wire member list plus the resolved target.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMap {
    pub wire: TypeName,
    pub member_names: Vec<String>,
    pub member_types: Vec<TypeRef>,
    pub target: Target,
    /// Per stream member, whether its value is handed to the instance.
    pub keep: Vec<bool>,
}

impl ObjectMap {
    pub fn member_count(&self) -> usize {
        self.member_names.len()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.member_names.iter().position(|n| n == name)
    }
}

/// Reader side: schemas keyed by the id of the record that declared them.
#[derive(Debug, Default)]
pub struct SchemaTable {
    maps: HashMap<i32, Rc<ObjectMap>>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object_id: i32, map: Rc<ObjectMap>) {
        self.maps.insert(object_id, map);
    }

    pub fn get(&self, schema_id: i32) -> Option<Rc<ObjectMap>> {
        self.maps.get(&schema_id).cloned()
    }
}

/// Writer side: assembly names already declared.
#[derive(Debug, Default)]
pub struct AssemblyCache {
    ids: HashMap<String, i32>,
}

impl AssemblyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for an assembly name, and whether it must be declared now.
    pub fn intern(&mut self, name: &str) -> (i32, bool) {
        if let Some(&id) = self.ids.get(name) {
            return (id, false);
        }
        let id = self.ids.len() as i32 + 1;
        self.ids.insert(name.to_string(), id);
        (id, true)
    }
}

/// Reader side: declared assembly names by id.
#[derive(Debug, Default)]
pub struct AssemblyTable {
    names: HashMap<i32, String>,
}

impl AssemblyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration. A later declaration of the same id replaces
    /// the earlier one.
    pub fn declare(&mut self, id: i32, name: String) {
        self.names.insert(id, name);
    }

    pub fn get(&self, id: i32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}
