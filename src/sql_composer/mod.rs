//! SQL fragment algebra: immutable `{text, params}` values, dialect-aware
//! placeholder/identifier handling, and the tag helpers (`eq`, `in_list`,
//! `values`, ...) the association engine composes its queries from.

mod dialect;
mod errors;
mod fragment;
mod tags;

pub use dialect::Dialect;
pub use errors::ComposeError;
pub use fragment::{merge, Sql, SqlArg, PLACEHOLDER};
pub use tags::Composer;

pub(crate) use tags::ColumnItem;
