//! Event-Log Adapter: a segmented, append-only
//! sequence of typed entries. Unlike the rest of the dispatch engine, entry
//! decoding never fails outright — a payload that can't be decoded against
//! its declared type is replaced with a [`Placeholder`] carrying enough of
//! the original bytes and failure context to diagnose later.

use uuid::Uuid;

use crate::dispatch::{decode_object, encode_object, Context};
use crate::error::{Error, Result};
use crate::registry::{Registry, TypeId};
use crate::value::WireValue;
use crate::wire::{ByteReader, ByteWriter, WireKind};

/// Raw payload bytes kept on a decode failure are capped to bound memory use
/// against an adversarial or simply very large corrupt entry.
pub const PLACEHOLDER_RAW_CAP: usize = 10 * 1024;

#[derive(Debug, Clone)]
pub struct Entry {
	pub sequential_id: u64,
	pub collected_at: i64,
	pub unique_id: Uuid,
	pub model_time: i64,
	pub payload_schema_version: u32,
	pub payload: EntryPayload,
}

#[derive(Debug, Clone)]
pub enum EntryPayload {
	Decoded(WireValue),
	Placeholder(Placeholder),
}

/// Substituted in place of a payload that failed to deserialize.
#[derive(Debug, Clone)]
pub struct Placeholder {
	pub raw: Vec<u8>,
	pub attempted_type: Box<str>,
	pub reason: Box<str>,
	pub discriminator: Option<PayloadFailureDiscriminator>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PayloadFailureDiscriminator {
	UnknownTypeCode(i32),
	UnexpectedWireKind { expected: WireKind, found: WireKind },
}

/// Extracts the discriminator for a failed payload decode, unwrapping through
/// `MemberDeserialization` wrappers to reach the failure that actually
/// triggered the substitution.
fn discriminator_of(err: &Error) -> Option<PayloadFailureDiscriminator> {
	match err {
		Error::UnknownDerivedType { type_code, .. } => Some(PayloadFailureDiscriminator::UnknownTypeCode(*type_code)),
		Error::WireKindMismatch { expected, found, .. } => {
			Some(PayloadFailureDiscriminator::UnexpectedWireKind { expected: *expected, found: *found })
		},
		Error::MemberDeserialization { source, .. } => discriminator_of(source),
		_ => None,
	}
}

/// A contiguous run of entries, sealed once `latest_segment_entries` fills up.
#[derive(Debug, Clone)]
pub struct Segment {
	pub segment_id: u64,
	pub entries: Vec<Entry>,
}

/// The event-log adapter: `running_entry_id` is the next
/// sequential id to assign, `running_segment_id` the id of the segment
/// currently being filled. `oldest_available_segment_id` tracks retention —
/// segments older than it have been dropped by the caller (this type never
/// drops a segment on its own; callers evict via [`EventLog::evict_before`]).
#[derive(Debug, Clone)]
pub struct EventLog {
	running_entry_id: u64,
	latest_segment_entries: Vec<Entry>,
	running_segment_id: u64,
	pending_segments: Vec<Segment>,
	oldest_available_segment_id: u64,
	segment_capacity: usize,
}

impl EventLog {
	pub fn new(segment_capacity: usize) -> Self {
		assert!(segment_capacity > 0, "segment capacity must be positive");
		Self {
			running_entry_id: 0,
			latest_segment_entries: Vec::new(),
			running_segment_id: 0,
			pending_segments: Vec::new(),
			oldest_available_segment_id: 0,
			segment_capacity,
		}
	}

	pub fn running_entry_id(&self) -> u64 {
		self.running_entry_id
	}

	pub fn running_segment_id(&self) -> u64 {
		self.running_segment_id
	}

	pub fn oldest_available_segment_id(&self) -> u64 {
		self.oldest_available_segment_id
	}

	pub fn latest_segment_entries(&self) -> &[Entry] {
		&self.latest_segment_entries
	}

	pub fn pending_segments(&self) -> &[Segment] {
		&self.pending_segments
	}

	/// Appends a new entry, assigning it the next `sequential_id`. Seals the
	/// active segment into `pending_segments` and advances
	/// `running_segment_id` once it reaches capacity.
	pub fn append(&mut self, collected_at: i64, unique_id: Uuid, model_time: i64, payload_schema_version: u32, payload: EntryPayload) -> u64 {
		let sequential_id = self.running_entry_id;
		self.running_entry_id += 1;
		self.latest_segment_entries.push(Entry { sequential_id, collected_at, unique_id, model_time, payload_schema_version, payload });
		if self.latest_segment_entries.len() >= self.segment_capacity {
			self.seal_segment();
		}
		sequential_id
	}

	/// Seals whatever is currently in `latest_segment_entries`, even if it
	/// hasn't reached capacity — used on shutdown/rotation.
	pub fn seal_segment(&mut self) {
		if self.latest_segment_entries.is_empty() {
			return;
		}
		let entries = std::mem::take(&mut self.latest_segment_entries);
		self.pending_segments.push(Segment { segment_id: self.running_segment_id, entries });
		self.running_segment_id += 1;
	}

	/// Drops pending segments older than `segment_id` and raises the
	/// retention floor. A segment equal to `segment_id` is kept.
	pub fn evict_before(&mut self, segment_id: u64) {
		self.pending_segments.retain(|s| s.segment_id >= segment_id);
		self.oldest_available_segment_id = self.oldest_available_segment_id.max(segment_id);
	}
}

/// Encodes one entry: fixed header fields followed by a length-prefixed
/// payload blob, so the raw bytes remain recoverable even when the reader's
/// registry can't decode the payload (a schema-skewed consumer, say).
pub fn encode_entry(registry: &Registry, payload_type: TypeId, entry: &Entry, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	writer.write_varint_i64(entry.sequential_id as i64);
	writer.write_varint_i64(entry.collected_at);
	writer.write_guid(entry.unique_id);
	writer.write_varint_i64(entry.model_time);
	writer.write_varint_i64(entry.payload_schema_version as i64);

	let payload = match &entry.payload {
		EntryPayload::Decoded(v) => v,
		EntryPayload::Placeholder(_) => {
			return Err(Error::Converter {
				from: WireKind::Invalid,
				to: "EventLog entry".into(),
				reason: "cannot re-encode a placeholder payload".into(),
			});
		},
	};
	let mut body = ByteWriter::new();
	encode_object(registry, payload_type, payload, ctx, &mut body)?;
	writer.write_bytes(Some(body.as_slice()));
	Ok(())
}

/// Decodes one entry. A payload that fails to decode against `payload_type`
/// never propagates the error: it becomes an [`EntryPayload::Placeholder`]
/// carrying the raw bytes (capped to [`PLACEHOLDER_RAW_CAP`]), the attempted
/// type's name, and whatever discriminator could be extracted from the
/// failure.
pub fn decode_entry(registry: &Registry, payload_type: TypeId, ctx: &mut Context, reader: &mut ByteReader) -> Result<Entry> {
	let sequential_id = reader.read_varint_i64()? as u64;
	let collected_at = reader.read_varint_i64()?;
	let unique_id = reader.read_guid()?;
	let model_time = reader.read_varint_i64()?;
	let payload_schema_version = reader.read_varint_i64()? as u32;

	let raw = reader.read_bytes()?.unwrap_or_default();
	let attempted_type = registry.get(payload_type).name.clone();
	let payload = {
		let mut body_reader = ByteReader::new(&raw);
		match decode_object(registry, payload_type, ctx, &mut body_reader) {
			Ok(value) => EntryPayload::Decoded(value),
			Err(err) => {
				let discriminator = discriminator_of(&err);
				let mut truncated = raw;
				truncated.truncate(PLACEHOLDER_RAW_CAP);
				EntryPayload::Placeholder(Placeholder { raw: truncated, attempted_type, reason: err.to_string().into(), discriminator })
			},
		}
	};

	Ok(Entry { sequential_id, collected_at, unique_id, model_time, payload_schema_version, payload })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn append_seals_segment_at_capacity() {
		let mut log = EventLog::new(2);
		log.append(0, Uuid::nil(), 0, 1, EntryPayload::Decoded(WireValue::Null));
		assert!(log.pending_segments().is_empty());
		log.append(0, Uuid::nil(), 0, 1, EntryPayload::Decoded(WireValue::Null));
		assert_eq!(log.pending_segments().len(), 1);
		assert!(log.latest_segment_entries().is_empty());
		assert_eq!(log.running_segment_id(), 1);
	}

	#[test]
	fn sequential_ids_are_monotonic() {
		let mut log = EventLog::new(8);
		let a = log.append(0, Uuid::nil(), 0, 1, EntryPayload::Decoded(WireValue::Null));
		let b = log.append(0, Uuid::nil(), 0, 1, EntryPayload::Decoded(WireValue::Null));
		assert_eq!(a, 0);
		assert_eq!(b, 1);
	}

	#[test]
	fn evict_before_drops_old_segments_and_raises_floor() {
		let mut log = EventLog::new(1);
		log.append(0, Uuid::nil(), 0, 1, EntryPayload::Decoded(WireValue::Null));
		log.append(0, Uuid::nil(), 0, 1, EntryPayload::Decoded(WireValue::Null));
		log.append(0, Uuid::nil(), 0, 1, EntryPayload::Decoded(WireValue::Null));
		assert_eq!(log.pending_segments().len(), 3);
		log.evict_before(2);
		assert_eq!(log.pending_segments().len(), 1);
		assert_eq!(log.oldest_available_segment_id(), 2);
	}
}
