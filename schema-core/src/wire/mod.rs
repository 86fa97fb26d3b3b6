//! Wire Codec: byte framing primitives shared by
//! every other component. Nothing here knows about types or schemas.

mod kind;
mod reader;
mod varint;
mod writer;

pub use kind::{PrimitiveKind, WireKind};
pub use reader::ByteReader;
pub use writer::{ByteWriter, MAX_SPAN_SIZE};
