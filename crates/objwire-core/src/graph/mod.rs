//! The object graph container.
//!
//! An [`ObjectGraph`] is an arena of heap instances addressed by [`NodeId`].
//! Sharing and cycles are expressed by multiple [`Value::Ref`] handles to the
//! same node, so the container itself never needs reference counting.

pub mod array;
pub mod node;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::array::{cell_count, ArrayKind, ArrayNode, IndexCursor};
pub use self::node::{Field, Node, NodeId, ObjectNode};

use crate::value::{Primitive, Value};

/// Errors raised while building or validating a graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("node {from} refers to missing node {to}")]
    DanglingRef { from: NodeId, to: NodeId },

    #[error("node {0} is not an object")]
    NotAnObject(NodeId),

    #[error("node {0} is not an array")]
    NotAnArray(NodeId),

    #[error("invalid array shape: {0}")]
    InvalidShape(String),

    #[error("array shape needs {expected} cells, found {found}")]
    CellCountMismatch { expected: usize, found: usize },

    #[error("array index {0:?} out of bounds")]
    IndexOutOfBounds(Vec<i32>),
}

/// An arena of object and array nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectGraph {
    nodes: Vec<Node>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its handle.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn add_object(&mut self, object: ObjectNode) -> NodeId {
        self.add(Node::Object(object))
    }

    pub fn add_array(&mut self, array: ArrayNode) -> NodeId {
        self.add(Node::Array(array))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Swap in a new node at an existing handle.
    pub fn replace(&mut self, id: NodeId, node: Node) -> Result<Node, GraphError> {
        let slot = self
            .nodes
            .get_mut(id.index())
            .ok_or(GraphError::NodeNotFound(id))?;
        Ok(std::mem::replace(slot, node))
    }

    pub fn object(&self, id: NodeId) -> Result<&ObjectNode, GraphError> {
        match self.node(id) {
            Some(Node::Object(o)) => Ok(o),
            Some(Node::Array(_)) => Err(GraphError::NotAnObject(id)),
            None => Err(GraphError::NodeNotFound(id)),
        }
    }

    pub fn object_mut(&mut self, id: NodeId) -> Result<&mut ObjectNode, GraphError> {
        match self.node_mut(id) {
            Some(Node::Object(o)) => Ok(o),
            Some(Node::Array(_)) => Err(GraphError::NotAnObject(id)),
            None => Err(GraphError::NodeNotFound(id)),
        }
    }

    pub fn array(&self, id: NodeId) -> Result<&ArrayNode, GraphError> {
        match self.node(id) {
            Some(Node::Array(a)) => Ok(a),
            Some(Node::Object(_)) => Err(GraphError::NotAnArray(id)),
            None => Err(GraphError::NodeNotFound(id)),
        }
    }

    pub fn array_mut(&mut self, id: NodeId) -> Result<&mut ArrayNode, GraphError> {
        match self.node_mut(id) {
            Some(Node::Array(a)) => Ok(a),
            Some(Node::Object(_)) => Err(GraphError::NotAnArray(id)),
            None => Err(GraphError::NodeNotFound(id)),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i as u32), n))
    }

    /// Check that every reference held by a node points into this graph.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (id, node) in self.iter() {
            let values: Box<dyn Iterator<Item = &Value>> = match node {
                Node::Object(o) => Box::new(o.fields.iter().map(|f| &f.value)),
                Node::Array(a) => Box::new(a.cells().iter()),
            };
            for target in values.filter_map(Value::as_node) {
                if self.node(target).is_none() {
                    return Err(GraphError::DanglingRef {
                        from: id,
                        to: target,
                    });
                }
            }
        }
        Ok(())
    }

    /// Structural equivalence of two rooted graphs.
    ///
    /// Nodes are matched by a bijection discovered during the walk, so two
    /// graphs are equivalent only if they share and cycle in the same places.
    /// Object fields are compared by name irrespective of order, and an
    /// absent field equals an explicit null. Floating point values compare
    /// by bit pattern.
    pub fn equivalent(&self, root: &Value, other: &ObjectGraph, other_root: &Value) -> bool {
        Equivalence::new(self, other).run(root, other_root)
    }
}

struct Equivalence<'a> {
    left: &'a ObjectGraph,
    right: &'a ObjectGraph,
    forward: HashMap<NodeId, NodeId>,
    backward: HashMap<NodeId, NodeId>,
    pending: Vec<(NodeId, NodeId)>,
}

impl<'a> Equivalence<'a> {
    fn new(left: &'a ObjectGraph, right: &'a ObjectGraph) -> Self {
        Self {
            left,
            right,
            forward: HashMap::new(),
            backward: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn run(mut self, a: &Value, b: &Value) -> bool {
        if !self.values(a, b) {
            return false;
        }
        while let Some((a, b)) = self.pending.pop() {
            if !self.nodes(a, b) {
                return false;
            }
        }
        true
    }

    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Primitive(a), Value::Primitive(b)) => primitives_equal(a, b),
            (Value::Ref(a), Value::Ref(b)) => self.pair(*a, *b),
            _ => false,
        }
    }

    fn pair(&mut self, a: NodeId, b: NodeId) -> bool {
        match (self.forward.get(&a), self.backward.get(&b)) {
            (Some(&fa), Some(&bb)) => fa == b && bb == a,
            (None, None) => {
                self.forward.insert(a, b);
                self.backward.insert(b, a);
                self.pending.push((a, b));
                true
            }
            _ => false,
        }
    }

    fn nodes(&mut self, a: NodeId, b: NodeId) -> bool {
        let (left, right) = (self.left, self.right);
        match (left.node(a), right.node(b)) {
            (Some(Node::Object(a)), Some(Node::Object(b))) => {
                if a.ty != b.ty || a.unresolved != b.unresolved {
                    return false;
                }
                let extra = b.field_names().filter(|name| a.get(name).is_none());
                a.field_names().chain(extra).all(|name| {
                    let x = a.get(name).unwrap_or(&Value::Null);
                    let y = b.get(name).unwrap_or(&Value::Null);
                    self.values(x, y)
                })
            }
            (Some(Node::Array(a)), Some(Node::Array(b))) => {
                a.element() == b.element()
                    && a.lengths() == b.lengths()
                    && a.lower_bounds() == b.lower_bounds()
                    && a
                        .cells()
                        .iter()
                        .zip(b.cells())
                        .all(|(x, y)| self.values(x, y))
            }
            _ => false,
        }
    }
}

fn primitives_equal(a: &Primitive, b: &Primitive) -> bool {
    match (a, b) {
        (Primitive::Double(a), Primitive::Double(b)) => a.to_bits() == b.to_bits(),
        (Primitive::Single(a), Primitive::Single(b)) => a.to_bits() == b.to_bits(),
        _ => a == b,
    }
}
