//! Wire format for objwire streams: the primitive codec and record model.
//!
//! A stream is a sequence of records, each starting with a one-byte tag,
//! except for raw primitive values whose type is implied by the member or
//! array cell they fill.
//!
//! ## Stream Layout
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header                               │  tag 0
//! │   top_id, header_id, major, minor    │  4 x i32
//! ├──────────────────────────────────────┤
//! │ Assembly declarations                │  tag 12, before first use
//! │ Object / array records               │  tags 1-7, 15-17
//! │   member values                      │  raw, or tags 6, 8-10, 13-14
//! ├──────────────────────────────────────┤
//! │ MessageEnd                           │  tag 11
//! └──────────────────────────────────────┘
//! ```
//!
//! Integers are little-endian. Strings are UTF-8 with a 7-bit encoded
//! length prefix of at most five bytes.

mod codec;
mod error;
mod record;

pub use codec::{WireReader, WireWriter};
pub use error::FormatError;
pub use record::{
    ArrayRecord, ArrayShape, ArraySinglePrimitiveRecord, ArraySingleRecord, AssemblyRecord,
    BinaryType, ClassRecord, HeaderRecord, ObjectRecord, Record, RecordTag, StringRecord,
    WireType, MAJOR_VERSION, MINOR_VERSION, NO_HEADERS,
};
