//! Writer and reader engines for objwire streams.
//!
//! [`Formatter`] is the entry point. Serializing walks an
//! [`ObjectGraph`](objwire_core::ObjectGraph) breadth-first from a root
//! value, assigning stream ids by identity and caching member schemas;
//! deserializing replays the records, resolving forward references
//! through a fixup ledger once their targets complete.
//!
//! ```no_run
//! use objwire_core::{ObjectGraph, ObjectNode, TypeLayout, TypeName, TypeRef, TypeRegistry};
//! use objwire_engine::Formatter;
//!
//! let person = TypeName::new("Demo.Person", "DemoApp");
//! let registry = TypeRegistry::new().with(
//!     TypeLayout::new(person.clone()).member("name", TypeRef::String),
//! );
//! let mut graph = ObjectGraph::new();
//! let root = graph.add_object(ObjectNode::new(person).with("name", "Ann"));
//!
//! let formatter = Formatter::new(registry);
//! let bytes = formatter.serialize_to_vec(&graph, &root.into()).unwrap();
//! let decoded = formatter.deserialize_from_slice(&bytes).unwrap();
//! assert!(graph.equivalent(&root.into(), &decoded.graph, &decoded.root));
//! ```

mod error;
mod fixup;
mod formatter;
mod ids;
mod options;
mod reader;
mod schema;
mod writer;

pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use formatter::{Deserialized, Formatter};
pub use options::{
    AssemblyFormat, FormatterOptions, MissingMembers, TypeFormat, UnknownMembers,
    DEFAULT_MAX_ARRAY_CELLS,
};
