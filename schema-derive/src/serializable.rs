use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Field, Fields, Lit, Meta};

struct TaggedField {
	ident: syn::Ident,
	ty: syn::Type,
	tag_id: i32,
	hidden: bool,
	exclude_from_game_state: bool,
}

/// If `ty` is `wrapper<X>` (or `wrapper<K, V>`), returns its generic
/// arguments; otherwise `None`. Purely syntactic — good enough to recognize
/// `Option<T>`/`Vec<T>`/`HashMap<K, V>` written directly, which is how every
/// field in this crate's own types and tests spells them.
fn generic_args_of<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<Vec<&'a syn::Type>> {
	let syn::Type::Path(p) = ty else { return None };
	let seg = p.path.segments.last()?;
	if seg.ident != wrapper {
		return None;
	}
	let syn::PathArguments::AngleBracketed(args) = &seg.arguments else { return None };
	Some(
		args.args
			.iter()
			.filter_map(|a| match a {
				syn::GenericArgument::Type(t) => Some(t),
				_ => None,
			})
			.collect(),
	)
}

/// Computes the `(element_type_name_expr, key_type_name_expr)` pair for a
/// field's [`MemberSpec`]: the element name for scalars/structs/`Vec<T>`
/// elements/map values, and `Some(key name)` only for `HashMap<K, V>`.
/// Unwraps one layer of `Option<T>` first since nullability is a flag on the
/// descriptor, not a distinct registered type.
fn member_type_exprs(ty: &syn::Type) -> (TokenStream, TokenStream) {
	let unwrapped = generic_args_of(ty, "Option").and_then(|args| args.first().copied()).unwrap_or(ty);
	if let Some(args) = generic_args_of(unwrapped, "Vec") {
		let elem = args[0];
		return (quote! { <#elem as ::schema_core::value::WireSchema>::type_name() }, quote! { None });
	}
	if let Some(args) = generic_args_of(unwrapped, "HashMap") {
		let (key, value) = (args[0], args[1]);
		return (
			quote! { <#value as ::schema_core::value::WireSchema>::type_name() },
			quote! { Some(<#key as ::schema_core::value::WireSchema>::type_name()) },
		);
	}
	(quote! { <#unwrapped as ::schema_core::value::WireSchema>::type_name() }, quote! { None })
}

fn tag_id_of(field: &Field, implicit: i32) -> (i32, bool, bool) {
	let mut explicit = None;
	let mut hidden = false;
	let mut exclude = false;
	for attr in &field.attrs {
		if attr.path().is_ident("tag") {
			if let Meta::List(list) = &attr.meta {
				let lit: Lit = list.parse_args().expect("`#[tag(N)]` expects an integer literal");
				if let Lit::Int(i) = lit {
					explicit = Some(i.base10_parse::<i32>().expect("tag id must fit in i32"));
				}
			}
		}
		if attr.path().is_ident("hidden") {
			hidden = true;
		}
		if attr.path().is_ident("exclude_from_game_state") {
			exclude = true;
		}
	}
	(explicit.unwrap_or(implicit), hidden, exclude)
}

/// Walks the struct's fields in declaration order and emits code that
/// reads/writes each one as a dynamic [`::schema_core::value::WireValue`]
/// struct member.
pub fn derive(tokens: proc_macro::TokenStream) -> TokenStream {
	let DeriveInput { ident, data, .. } = syn::parse(tokens).unwrap();

	let data = match data {
		Data::Struct(data) => data,
		Data::Enum(_) => panic!("use `#[derive(Serializable)]` on the concrete record structs, not the enum root"),
		Data::Union(_) => panic!("Unions are not supported"),
	};

	let fields = match data.fields {
		Fields::Named(named) => named.named,
		Fields::Unnamed(_) | Fields::Unit => panic!("Serializable requires named fields"),
	};

	let mut tagged = Vec::with_capacity(fields.len());
	for (i, field) in fields.iter().enumerate() {
		let (tag_id, hidden, exclude_from_game_state) = tag_id_of(field, (i + 1) as i32);
		tagged.push(TaggedField {
			ident: field.ident.clone().expect("named field"),
			ty: field.ty.clone(),
			tag_id,
			hidden,
			exclude_from_game_state,
		});
	}

	let member_specs = tagged.iter().map(|f| {
		let name = f.ident.to_string();
		let tag_id = f.tag_id;
		let hidden = f.hidden;
		let exclude = f.exclude_from_game_state;
		let ty = &f.ty;
		let (element_type, key_type) = member_type_exprs(ty);
		quote! {
			::schema_core::scanner::MemberSpec {
				name: #name.into(),
				tag_id: #tag_id,
				hidden: #hidden,
				exclude_from_game_state: #exclude,
				descriptor_kind: <#ty as ::schema_core::value::WireSchema>::descriptor_kind(),
				element_type: #element_type,
				key_type: #key_type,
				version_window: None,
				max_collection_size: None,
				substitute: None,
				converters: Vec::new(),
			}
		}
	});

	let to_wire_fields = tagged.iter().map(|f| {
		let ident = &f.ident;
		let tag_id = f.tag_id;
		quote! {
			members.insert(#tag_id, ::schema_core::value::ToWireValue::to_wire_value(&self.#ident));
		}
	});

	let from_wire_fields = tagged.iter().map(|f| {
		let ident = &f.ident;
		let tag_id = f.tag_id;
		quote! {
			#ident: ::schema_core::value::FromWireValue::from_wire_value(members.get(&#tag_id))?
		}
	});

	let type_name = ident.to_string();

	quote! {
		impl ::schema_core::scanner::Describe for #ident {
			fn type_name() -> &'static str {
				#type_name
			}

			fn member_specs() -> Vec<::schema_core::scanner::MemberSpec> {
				vec![#(#member_specs),*]
			}
		}

		impl ::schema_core::value::WireSchema for #ident {
			fn descriptor_kind() -> ::schema_core::registry::DescriptorKind {
				::schema_core::registry::DescriptorKind::Struct
			}

			fn type_name() -> Box<str> {
				#type_name.into()
			}
		}

		impl ::schema_core::dispatch::Serializable for #ident {
			fn to_wire_value(&self, type_id: ::schema_core::registry::TypeId) -> ::schema_core::value::WireValue {
				let mut members = std::collections::BTreeMap::new();
				#(#to_wire_fields)*
				::schema_core::value::WireValue::Struct(::schema_core::value::StructValue { type_id, members })
			}

			fn from_wire_value(value: &::schema_core::value::WireValue) -> ::schema_core::error::Result<Self> {
				let members = match value {
					::schema_core::value::WireValue::Struct(s) => &s.members,
					other => return Err(::schema_core::error::Error::Converter {
						from: other.physical_kind(),
						to: #type_name.into(),
						reason: "expected a struct value".into(),
					}),
				};
				Ok(Self { #(#from_wire_fields),* })
			}
		}

		// Lets this type nest inside `Vec<T>`/`Option<T>`/`HashMap<K, V>`
		// fields of another `#[derive(Serializable)]` struct, which only know
		// how to reach their elements through `ToWireValue`/`FromWireValue`,
		// never through `dispatch::Serializable::to_wire_value`'s explicit
		// `TypeId` (a nested field has no registry lookup to get one from).
		// The dispatch engine never reads a plain struct's own `type_id` back
		// off the `StructValue` it was given, so the placeholder is inert.
		impl ::schema_core::value::ToWireValue for #ident {
			fn to_wire_value(&self) -> ::schema_core::value::WireValue {
				::schema_core::dispatch::Serializable::to_wire_value(self, ::schema_core::registry::TypeId::placeholder())
			}
		}

		impl ::schema_core::value::FromWireValue for #ident {
			fn from_wire_value(value: Option<&::schema_core::value::WireValue>) -> ::schema_core::error::Result<Self> {
				match value {
					None | Some(::schema_core::value::WireValue::Null) => Err(::schema_core::error::Error::Converter {
						from: ::schema_core::wire::WireKind::Null,
						to: #type_name.into(),
						reason: "missing required struct value".into(),
					}),
					Some(v) => <Self as ::schema_core::dispatch::Serializable>::from_wire_value(v),
				}
			}
		}
	}
}
