//! Object identity on both sides of the wire.
//!
//! The writer's [`IdentityTable`] hands out stream ids: positive ids for
//! reference nodes and strings from one counter, negative transient ids for
//! value types embedded in their owner. The reader's [`ObjectTable`] records
//! which ids have been fully materialized.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use objwire_core::graph::NodeId;
use objwire_core::value::Value;

#[derive(Debug)]
pub struct IdentityTable {
    nodes: HashMap<NodeId, i32>,
    strings: HashMap<String, i32>,
    next: i32,
    next_transient: i32,
}

impl Default for IdentityTable {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            strings: HashMap::new(),
            next: 1,
            next_transient: -1,
        }
    }
}

impl IdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh id not tied to any node, e.g. for a boxed root.
    pub fn reserve(&mut self) -> i32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Id of a reference node, and whether it was assigned just now.
    pub fn node_id(&mut self, node: NodeId) -> (i32, bool) {
        match self.nodes.get(&node) {
            Some(&id) => (id, false),
            None => {
                let id = self.reserve();
                self.nodes.insert(node, id);
                (id, true)
            }
        }
    }

    /// Id of a string by content, and whether it was assigned just now.
    pub fn string_id(&mut self, s: &str) -> (i32, bool) {
        if let Some(&id) = self.strings.get(s) {
            return (id, false);
        }
        let id = self.reserve();
        self.strings.insert(s.to_string(), id);
        (id, true)
    }

    /// A negative id for an embedded value-type occurrence. Never registered.
    pub fn transient(&mut self) -> i32 {
        let id = self.next_transient;
        self.next_transient -= 1;
        id
    }
}

/// Ids whose objects have completed, with the value that stands for them.
#[derive(Debug, Default)]
pub struct ObjectTable {
    registered: HashMap<i32, Value>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a completed object. Returns `false` if the id is taken.
    pub fn register(&mut self, id: i32, value: Value) -> bool {
        match self.registered.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn get(&self, id: i32) -> Option<&Value> {
        self.registered.get(&id)
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }
}
