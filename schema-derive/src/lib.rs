mod serializable;
mod wire_repr;

use proc_macro::TokenStream;

/// Derives `from_repr` for a fieldless `#[repr(_)]` enum with explicit
/// discriminants. Used internally for `WireKind` and by consumers for their
/// own `DynamicEnum`/enum-backed wire representations.
#[proc_macro_derive(WireRepr)]
pub fn derive_wire_repr(input: TokenStream) -> TokenStream {
	wire_repr::derive(input).into()
}

/// Derives the schema registration glue (`Describe`) and the runtime
/// conversion glue (`Serializable`) for a record struct. Field tags default
/// to declaration order (1-based) and can be pinned explicitly with
/// `#[tag(N)]`; `#[hidden]` and `#[exclude_from_game_state]` mirror the
/// member flags of the same name.
#[proc_macro_derive(Serializable, attributes(tag, hidden, exclude_from_game_state))]
pub fn derive_serializable(input: TokenStream) -> TokenStream {
	serializable::derive(input).into()
}
