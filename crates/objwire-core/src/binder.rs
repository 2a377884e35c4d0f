//! Type binding overrides.
//!
//! A [`TypeBinder`] is consulted before the type describer when reading a
//! stream: it may redirect a wire (assembly, type) pair to a different
//! runtime type, which is then looked up with
//! [`TypeDescriber::describe`](crate::describe::TypeDescriber::describe).

use std::collections::HashMap;

use crate::types::{simple_assembly_name, TypeName};

pub trait TypeBinder {
    /// Map a wire type to a runtime type, or `None` to fall back to the
    /// describer's own resolution.
    fn bind(&self, assembly: Option<&str>, name: &str) -> Option<TypeName>;
}

/// A binder backed by an explicit mapping table.
///
/// Keys use the simple assembly name, so version and culture on the wire
/// do not affect the lookup.
#[derive(Debug, Clone, Default)]
pub struct MapBinder {
    map: HashMap<(Option<String>, String), TypeName>,
}

impl MapBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, assembly: Option<&str>, name: &str, target: TypeName) -> Self {
        let key = (assembly.map(|a| simple_assembly_name(a).to_string()), name.to_string());
        self.map.insert(key, target);
        self
    }
}

impl TypeBinder for MapBinder {
    fn bind(&self, assembly: Option<&str>, name: &str) -> Option<TypeName> {
        let key = (assembly.map(|a| simple_assembly_name(a).to_string()), name.to_string());
        self.map.get(&key).cloned()
    }
}
