use uuid::Uuid;

use crate::error::{Error, IntegrityError};
use crate::wire::kind::WireKind;
use crate::wire::varint::{read_uvarint, zigzag_decode_128, zigzag_decode_32, zigzag_decode_64};

/// A cursor over an in-memory byte buffer. Every read is bounds-checked;
/// truncated input surfaces as `std::io::Error` (`UnexpectedEof`).
pub struct ByteReader<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> ByteReader<'a> {
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	pub fn position(&self) -> usize {
		self.pos
	}

	pub fn remaining(&self) -> usize {
		self.bytes.len() - self.pos
	}

	pub fn is_empty(&self) -> bool {
		self.pos >= self.bytes.len()
	}

	fn eof() -> Error {
		Error::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "unexpected end of wire stream"))
	}

	pub fn read_u8(&mut self) -> Result<u8, Error> {
		let byte = *self.bytes.get(self.pos).ok_or_else(Self::eof)?;
		self.pos += 1;
		Ok(byte)
	}

	pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8], Error> {
		let end = self.pos.checked_add(len).ok_or_else(Self::eof)?;
		let slice = self.bytes.get(self.pos..end).ok_or_else(Self::eof)?;
		self.pos = end;
		Ok(slice)
	}

	pub fn read_wire_kind(&mut self) -> Result<WireKind, Error> {
		let byte = self.read_u8()?;
		WireKind::from_byte(byte).ok_or_else(|| Error::Integrity(IntegrityError::InvalidTypeCode(byte as i32)))
	}

	pub fn read_uvarint(&mut self) -> Result<u128, Error> {
		read_uvarint(self.bytes, &mut self.pos).ok_or_else(Self::eof)
	}

	pub fn read_varint_i32(&mut self) -> Result<i32, Error> {
		Ok(zigzag_decode_32(self.read_uvarint()? as u32))
	}

	pub fn read_varint_i64(&mut self) -> Result<i64, Error> {
		Ok(zigzag_decode_64(self.read_uvarint()? as u64))
	}

	pub fn read_varint_i128(&mut self) -> Result<i128, Error> {
		Ok(zigzag_decode_128(self.read_uvarint()?))
	}

	/// Reads a length-style varint: -1 is the null/absent sentinel, any other
	/// negative value is malformed input and reported as an `IntegrityError`.
	pub fn read_length(&mut self) -> Result<Option<usize>, Error> {
		let raw = self.read_varint_i64()?;
		match raw {
			-1 => Ok(None),
			n if n >= 0 => Ok(Some(n as usize)),
			n => Err(Error::Integrity(IntegrityError::NegativeCollectionLength(n))),
		}
	}

	pub fn read_f32(&mut self) -> Result<f32, Error> {
		let bytes: [u8; 4] = self.read_exact(4)?.try_into().expect("checked length");
		Ok(f32::from_le_bytes(bytes))
	}

	pub fn read_f64(&mut self) -> Result<f64, Error> {
		let bytes: [u8; 8] = self.read_exact(8)?.try_into().expect("checked length");
		Ok(f64::from_le_bytes(bytes))
	}

	pub fn read_guid(&mut self) -> Result<Uuid, Error> {
		let bytes: [u8; 16] = self.read_exact(16)?.try_into().expect("checked length");
		Ok(Uuid::from_bytes(bytes))
	}

	pub fn read_string(&mut self) -> Result<Option<String>, Error> {
		let Some(len) = self.read_length()? else { return Ok(None) };
		self.read_string_body(len).map(Some)
	}

	/// Reads `len` bytes as UTF-8 text. Callers that read untrusted input
	/// should validate `len` against a context bound before calling this —
	/// `read_exact` itself doesn't allocate, but the owned `String` this
	/// produces does.
	pub fn read_string_body(&mut self, len: usize) -> Result<String, Error> {
		let bytes = self.read_exact(len)?;
		let s = std::str::from_utf8(bytes)
			.map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
		Ok(s.to_owned())
	}

	pub fn read_bytes(&mut self) -> Result<Option<Vec<u8>>, Error> {
		let Some(len) = self.read_length()? else { return Ok(None) };
		self.read_bytes_body(len).map(Some)
	}

	/// Reads `len` raw bytes. Same allocation caveat as [`Self::read_string_body`].
	pub fn read_bytes_body(&mut self, len: usize) -> Result<Vec<u8>, Error> {
		Ok(self.read_exact(len)?.to_vec())
	}
}
