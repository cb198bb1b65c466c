use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::sql_composer::Sql;

/// The three supported relation kinds, each with its own join-key naming
/// convention (see the relation resolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `-`: to-one; the parent row carries the foreign key.
    BelongsTo,
    /// `<`: to-many; the child row carries the foreign key.
    HasMany,
    /// `x`: to-many through a bridge table.
    ManyToMany,
}

/// One parsed spec line: tree position (depth), relation kind, alias, and the
/// caller's options merged on by line order.
#[derive(Debug, Clone)]
pub struct RawNode {
    pub depth: usize,
    pub alias: String,
    /// `None` for the root line (no relation to a parent).
    pub kind: Option<RelationKind>,
    pub polymorphic: bool,
    pub options: NodeOptions,
}

/// Post-fetch transform applied to a node's folded child collection (or the
/// whole root sequence) before attachment; the result replaces the input.
pub type Hook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Column selection for one node.
#[derive(Debug, Clone, Default)]
pub enum ColumnSpec {
    /// `alias.*`
    #[default]
    All,
    /// Explicit column names, qualified with the node's alias.
    List(Vec<String>),
    /// A ready-made fragment used verbatim.
    Raw(Sql),
}

/// Polymorphic discriminator filter: a bare type value matched against the
/// default `attached_type` column, or an explicit column/value map.
#[derive(Debug, Clone)]
pub enum PolyType {
    Type(String),
    Filter(Vec<(String, Value)>),
}

/// Per-node options, matched to spec lines by declaration order.
#[derive(Clone, Default)]
pub struct NodeOptions {
    /// Physical table override (defaults by naming convention).
    pub table: Option<String>,
    pub column: Option<ColumnSpec>,
    /// Extra WHERE conditions; a leading `WHERE` is rewritten to `AND` when
    /// the engine has already opened the clause.
    pub query: Option<Sql>,
    /// Extra JOIN fragment appended after the FROM clause.
    pub join: Option<Sql>,
    /// Column on the parent rows whose values are collapsed into the IN set.
    pub left_key: Option<String>,
    /// Column on this node's rows matched against the parent keys.
    pub key: Option<String>,
    /// Bridge table name (ManyToMany only).
    pub xtable: Option<String>,
    pub xtable_alias: Option<String>,
    /// Bridge column joined to this node's rows (ManyToMany only).
    pub xkey: Option<String>,
    /// Bridge column matched against the parent keys (ManyToMany only).
    pub left_xkey: Option<String>,
    pub poly_type: Option<PolyType>,
    /// Top-N-per-parent windowed fetch: `(limit, ORDER BY fragment)`.
    pub row_limit: Option<(u32, Sql)>,
    pub hook: Option<Hook>,
}

impl NodeOptions {
    /// Shorthand for the most common option: an extra filter fragment.
    pub fn filter(query: Sql) -> Self {
        NodeOptions {
            query: Some(query),
            ..Default::default()
        }
    }
}

impl fmt::Debug for NodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeOptions")
            .field("table", &self.table)
            .field("column", &self.column)
            .field("query", &self.query)
            .field("join", &self.join)
            .field("left_key", &self.left_key)
            .field("key", &self.key)
            .field("xtable", &self.xtable)
            .field("xtable_alias", &self.xtable_alias)
            .field("xkey", &self.xkey)
            .field("left_xkey", &self.left_xkey)
            .field("poly_type", &self.poly_type)
            .field("row_limit", &self.row_limit)
            .field("hook", &self.hook.as_ref().map(|_| "<hook>"))
            .finish()
    }
}
