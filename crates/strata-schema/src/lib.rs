//! An in-memory schema object model with a typed delta engine.
//!
//! The crate has three layers:
//!
//! * [`Object`] and [`Schema`] — the object model: typed schema objects
//!   described by static per-kind field tables, held in an immutable
//!   name-indexed container that is threaded by value through every
//!   mutation.
//! * [`inherit`] and [`refdict`] — the inheritance machinery: C3
//!   linearization, field merge by per-field strategy, and the
//!   inheritance-aware merge of parent-owned child collections.
//! * [`delta`] — the command engine: delta trees built from DDL AST
//!   nodes or by diffing two schema revisions, applied to produce the
//!   next revision, and rendered back to AST.

pub mod ddl;
pub mod delta;
pub mod error;
pub mod inherit;
pub mod name;
pub mod object;
pub mod refdict;
pub mod schema;
pub mod topo;

pub use error::{Error, ErrorKind, Span};
pub use name::Name;
pub use object::{Object, ObjectKind, Value};
pub use schema::Schema;

pub type Result<T, E = Error> = std::result::Result<T, E>;
