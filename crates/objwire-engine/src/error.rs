//! Engine error types.

use objwire_core::graph::NodeId;
use objwire_core::types::{PrimitiveType, TypeName, TypeRef};
use objwire_core::SurrogateError;
use objwire_format::FormatError;

/// Errors raised while serializing a graph. No bytes reach the output when
/// any of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The root value is null.
    #[error("cannot serialize a null graph")]
    NullGraph,

    /// The describer has no layout for a type reachable from the root.
    #[error("type {0} is not serializable: no layout registered")]
    UnsupportedType(TypeName),

    /// A reference points outside the graph.
    #[error("reference to missing node {0}")]
    MissingNode(NodeId),

    /// A member value does not fit its declared type.
    #[error("member {member} is declared {expected} but holds {found}")]
    MemberTypeMismatch {
        member: String,
        expected: TypeRef,
        found: String,
    },

    /// A primitive array holds a cell of another kind.
    #[error("array {node} cell {index} is not a {expected}")]
    ArrayElementMismatch {
        node: NodeId,
        index: usize,
        expected: PrimitiveType,
    },

    /// A value type contains itself.
    #[error("value type {0} contains itself")]
    CyclicValueType(TypeName),

    #[error(transparent)]
    Surrogate(#[from] SurrogateError),

    #[error("write failed: {0}")]
    Format(#[from] FormatError),
}

/// Errors raised while reading a stream. No partial graph is returned.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The bytes do not form a valid stream.
    #[error("corrupt stream at offset {offset}: {reason}")]
    CorruptStream { offset: u64, reason: String },

    /// A type that could not be resolved is needed to keep parsing.
    #[error("type {ty} is required to read the stream: {reason}")]
    TypeRequired { ty: String, reason: String },

    /// A type resolved across a trust boundary it does not declare.
    #[error("type {ty} from assembly {assembly} resolved into the core library without a matching forward")]
    TrustViolation { ty: String, assembly: String },

    /// Stream members and the resolved layout disagree beyond what the
    /// member policy allows.
    #[error("member {member:?} of {ty}: {reason}")]
    MemberMismatch {
        ty: TypeName,
        member: String,
        reason: &'static str,
    },

    #[error(transparent)]
    Surrogate(#[from] SurrogateError),

    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl From<FormatError> for DecodeError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Io(e) => DecodeError::Io(e),
            other => DecodeError::CorruptStream {
                offset: other.offset().unwrap_or(0),
                reason: other.to_string(),
            },
        }
    }
}

pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
