//! pcschema - Bidirectional codec for point-cloud schema XML documents
//!
//! A schema document describes the byte layout of a point cloud: an
//! ordered list of named dimensions, each with a canonical storage
//! type and a linear scale/offset transform, plus a typed tree of
//! auxiliary metadata. This crate parses such documents (validated
//! against a caller-supplied XSD grammar) into typed structures and
//! serializes those structures back into documents, with round-trip
//! fidelity down to individual Unicode bytes.
//!
//! # Architecture
//!
//! - [`schema`] - The [`Schema`](schema::Schema) façade: parse, build, serialize
//! - [`grammar`] - Grammar compilation and document validation
//! - [`dimension`] - Dimension descriptors, primitive types, transforms
//! - [`metadata`] - The typed metadata tree
//!
//! File access is deliberately absent: the codec consumes and
//! produces in-memory text, and callers own all I/O.
//!
//! # Correctness Invariants
//!
//! 1. No structural extraction runs on a document the grammar has
//!    not accepted
//! 2. Dimension order is preserved exactly; it encodes byte layout
//! 3. Parse and serialize are all-or-nothing: an error means no
//!    partial structures
//! 4. Serializing a schema and re-parsing it yields an equal schema,
//!    with all text byte-for-byte intact

pub mod dimension;
pub mod grammar;
pub mod metadata;
pub mod schema;

mod dom;
mod parser;
mod writer;

pub use dom::XmlError;
