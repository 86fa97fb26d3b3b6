use crate::error::{BoundKind, Error, Result};
use crate::value::WireValue;
use crate::wire::WireKind;

use super::Context;

pub(super) fn kind_error(ctx: &Context, expected: WireKind, value: &WireValue) -> Error {
	Error::WireKindMismatch { expected, found: value.physical_kind(), path: ctx.path().clone() }
}

pub(super) fn check_len(ctx: &Context, bound: BoundKind, limit: usize, len: Option<usize>) -> Result<()> {
	if let Some(n) = len {
		if n > limit {
			return Err(Error::BoundExceeded { bound, limit, actual: n, path: ctx.path().clone() });
		}
	}
	Ok(())
}
