//! Dispatch Engine: walks a [`TypeDescriptor`]
//! and a [`WireValue`] together, in lockstep, to encode or decode one value.
//! Nothing here is generated per-type; the same recursive walk handles every
//! registered shape, driven entirely by what the registry already knows.

mod blocks;
mod context;
mod encode;
mod decode;
mod path;
mod traverse;
mod util;

pub use context::{Context, DecodeContext, EncodeContext};
pub use path::MemberPath;
pub use traverse::{traverse_refs, RefVisitor};

use crate::error::Result;
use crate::registry::{Registry, TypeId};
use crate::value::WireValue;
use crate::wire::{ByteReader, ByteWriter};

/// Implemented by `#[derive(Serializable)]` for every record type. Bridges a
/// concrete Rust struct to the dynamic [`WireValue`] the dispatch engine
/// actually walks.
pub trait Serializable: Sized {
	fn to_wire_value(&self, type_id: TypeId) -> WireValue;
	fn from_wire_value(value: &WireValue) -> Result<Self>;
}

/// Encodes `value` as a standalone object of `type_id`: wire kind byte
/// followed by the value's body. This is what a top-level payload or a
/// `ConfigDataContent` member writes.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(type_id = type_id.0)))]
pub fn encode_object(registry: &Registry, type_id: TypeId, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	let desc = registry.get(type_id);
	writer.write_wire_kind(desc.physical_kind);
	encode::encode_body(registry, desc, value, ctx, writer)
}

/// Decodes a standalone object of `type_id`, reading its own wire kind byte
/// first.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(type_id = type_id.0)))]
pub fn decode_object(registry: &Registry, type_id: TypeId, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	let desc = registry.get(type_id);
	let found = reader.read_wire_kind()?;
	decode::decode_found(registry, desc, found, ctx, reader)
}

/// Encodes just the member loop of a struct/tuple, with no leading wire kind
/// byte and no trailing `EndStruct` re-check — used when the container (an
/// `ObjectTable`, or an enclosing struct that already wrote the kind byte)
/// owns that framing.
pub fn encode_members(registry: &Registry, type_id: TypeId, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	let desc = registry.get(type_id);
	encode::encode_struct_members(registry, desc, value, ctx, writer)
}

pub fn decode_members(registry: &Registry, type_id: TypeId, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	let desc = registry.get(type_id);
	decode::decode_struct_members(registry, desc, ctx, reader)
}

/// Bulk transport of a config/event-log table: a length prefix followed by
/// each item's member loop.
pub fn encode_table(registry: &Registry, item_type: TypeId, items: &[WireValue], ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	writer.write_length(Some(items.len()));
	for item in items {
		encode_members(registry, item_type, item, ctx, writer)?;
	}
	Ok(())
}

pub fn decode_table(registry: &Registry, item_type: TypeId, ctx: &mut Context, reader: &mut ByteReader) -> Result<Vec<WireValue>> {
	let Some(len) = reader.read_length()? else { return Ok(Vec::new()) };
	if len > ctx.max_collection_size {
		return Err(crate::error::Error::BoundExceeded {
			bound: crate::error::BoundKind::CollectionSize,
			limit: ctx.max_collection_size,
			actual: len,
			path: ctx.path.clone(),
		});
	}
	let mut items = Vec::with_capacity(len);
	for i in 0..len {
		ctx.path.push_index(i);
		items.push(decode_members(registry, item_type, ctx, reader)?);
		ctx.path.pop();
	}
	Ok(items)
}
