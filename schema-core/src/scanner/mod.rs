//! Schema Scanner: turns author-declared
//! [`TypeSpec`]s into a frozen [`crate::registry::Registry`].

mod build;
mod spec;

pub use build::Scanner;
pub use spec::{Describe, MemberSpec, RecordRole, RecordSpec, TypeSpec};
