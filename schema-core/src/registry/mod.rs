//! Type Registry: the frozen, queryable result
//! of scanning a set of [`TypeSpec`](crate::scanner::spec::TypeSpec)s.

mod descriptor;
mod flags;
pub(crate) mod hash;
#[allow(clippy::module_inception)]
mod registry;

pub use descriptor::{ConverterFn, DescriptorKind, HookFn, MemberDescriptor, SubstituteFn, TypeDescriptor, TypeId};
pub use flags::MemberFlags;
pub use registry::Registry;
