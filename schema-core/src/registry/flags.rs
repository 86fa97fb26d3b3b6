use bitflags::bitflags;

bitflags! {
	/// Per-member attributes captured by the schema scanner.
	#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
	pub struct MemberFlags: u32 {
		/// Excluded from the protocol hash; still encoded/decoded on the
		/// wire. The only flag the protocol hash skips.
		const HIDDEN = 1 << 0;
		/// Carried on the wire but dropped before the value reaches game
		/// state snapshots taken outside this crate. Does not affect the
		/// protocol hash.
		const EXCLUDE_FROM_GAME_STATE = 1 << 1;
		/// Kept for backward wire compatibility; no longer assignable by new
		/// schema authors but still decodable.
		const OBSOLETE = 1 << 2;
		/// Excluded from whatever content-integrity checksum a caller
		/// computes over a decoded value. The checksum itself is an
		/// external-collaborator concern; this crate only carries the flag
		/// through so a caller's visitor can gate on it the same way
		/// `exclude_flags` gates encode/decode.
		const NO_CHECKSUM = 1 << 3;
	}
}
