//! nestql - Batched nested-association loading over a raw SQL driver
//!
//! This crate turns a declarative indented relation spec into nested object
//! graphs through:
//! - A dialect-aware SQL fragment algebra with bound parameters
//! - Convention-based relationship resolution (to-one, to-many, bridged,
//!   polymorphic)
//! - A batched-fetch walker: one `IN`-collapsed query per relation per level
//! - An equivalent single-query LEFT JOIN strategy for to-one chains
//! - Transactions over any driver implementing the pool/connection traits

pub mod config;
pub mod driver;
pub mod loader;
pub mod relation_resolver;
pub mod spec_parser;
pub mod sql_composer;

pub use config::DebugConfig;
pub use driver::{DriverError, Row, SqlConnection, SqlDriver, SqlPool};
pub use loader::{Catalog, LoadError, Loader, Transaction};
pub use relation_resolver::{resolve, RelationNode};
pub use spec_parser::{
    parse_spec, ColumnSpec, Hook, NodeOptions, PolyType, RelationKind, SpecBlock, SpecParseError,
};
pub use sql_composer::{merge, ComposeError, Composer, Dialect, Sql, SqlArg};
