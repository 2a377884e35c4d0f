//! Object graph model and type-description seams for objwire.
//!
//! # Architecture
//!
//! - **Graph**: an arena of object and array nodes addressed by [`NodeId`];
//!   shared and cyclic references are plain handles.
//! - **Types**: primitive kinds with their wire codes, concrete type names,
//!   and declared member types.
//! - **Collaborators**: the [`TypeDescriber`] that supplies member layouts,
//!   [`Surrogate`] overrides, and the [`TypeBinder`] consulted while reading.

pub mod binder;
pub mod describe;
pub mod graph;
pub mod surrogate;
pub mod types;
pub mod value;

pub use binder::{MapBinder, TypeBinder};
pub use describe::{infer_type, MemberInfo, TypeDescriber, TypeLayout, TypeRegistry};
pub use graph::{
    ArrayKind, ArrayNode, Field, GraphError, IndexCursor, Node, NodeId, ObjectGraph, ObjectNode,
};
pub use surrogate::{InfoEntry, SerializationInfo, Surrogate, SurrogateError, SurrogateSelector};
pub use types::{PrimitiveType, TypeName, TypeParseError, TypeRef, CORE_OBJECT, CORE_STRING};
pub use value::{DateTime, DateTimeKind, Decimal, DecimalParseError, Primitive, Value};
