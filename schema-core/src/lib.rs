//! Schema-driven tagged binary serialization core.
//!
//! The crate is organized around a handful of cooperating components: a wire codec
//! ([`wire`]), a type registry ([`registry`]) built by the schema scanner
//! ([`scanner`]), a dispatch engine ([`dispatch`]) that walks a descriptor
//! and a [`value::WireValue`] together to encode/decode/traverse, a dynamic
//! [`visitor`] for read-only tooling, a reachability analysis
//! ([`reachability`]) over a reverse-reference index, and an event-log
//! adapter ([`event_log`]) built on top of the same dispatch primitives.
//!
//! `#[derive(Serializable)]` (re-exported from `schema-derive`) is the
//! intended entry point for application code: it implements
//! [`dispatch::Serializable`] and [`scanner::Describe`] for a struct so the
//! scanner can register it and the dispatch engine can encode/decode it
//! without any generated per-type wire-walking code.

// `#[derive(Serializable)]` always emits fully-qualified `::schema_core::`
// paths so the same derive works unmodified for downstream consumers and for
// this crate's own tests/fixtures.
extern crate self as schema_core;

pub mod dispatch;
pub mod error;
pub mod event_log;
pub mod reachability;
pub mod registry;
pub mod scanner;
pub mod value;
pub mod visitor;
pub mod wire;

pub use schema_derive::{Serializable, WireRepr};

pub use error::{Error, Result};
