//! Turns the flat parsed line sequence into a fully-specified relationship
//! tree: stack-based depth nesting plus convention-over-configuration
//! defaults for every join key, bridge table and polymorphic filter.

use std::fmt;

use serde_json::Value;

use crate::spec_parser::{ColumnSpec, Hook, RawNode, RelationKind, PolyType};
use crate::sql_composer::{merge, Composer, Sql, SqlArg};

pub mod naming;

/// Default polymorphic discriminator column.
const ATTACHED_TYPE: &str = "attached_type";
/// Default polymorphic foreign-key column.
const ATTACHED_ID: &str = "attached_id";

/// One fully-specified node of the relationship tree.
#[derive(Clone)]
pub struct RelationNode {
    pub alias: String,
    pub depth: usize,
    /// `None` for the root.
    pub kind: Option<RelationKind>,
    pub polymorphic: bool,
    pub table: String,
    /// Column on the parent rows whose values feed the IN set (empty for the
    /// root).
    pub left_key: String,
    /// Column on this node's rows matched against the parent keys; for
    /// ManyToMany this is a `bridge_alias.column` path (empty for the root).
    pub where_key: String,
    pub column: ColumnSpec,
    pub filter: Sql,
    pub join: Sql,
    /// INNER JOIN against the bridge table (ManyToMany only, else empty).
    pub bridge_join: Sql,
    pub bridge_alias: Option<String>,
    /// `AND "attached_type" = ??` discriminator filter (else empty).
    pub poly_filter: Sql,
    pub row_limit: Option<(u32, Sql)>,
    pub hook: Option<Hook>,
    pub children: Vec<RelationNode>,
}

impl RelationNode {
    pub fn is_root(&self) -> bool {
        self.kind.is_none()
    }

    /// The `where_key` as it appears in the child query's WHERE clause:
    /// alias-qualified, except for ManyToMany where it already names the
    /// bridge alias.
    pub fn qualified_where_key(&self) -> String {
        if self.bridge_alias.is_some() {
            self.where_key.clone()
        } else {
            format!("{}.{}", self.alias, self.where_key)
        }
    }

    /// Column under which fetched child rows are grouped. ManyToMany selects
    /// the bridge column under a synthesized alias so it cannot collide with
    /// one of the child table's own columns.
    pub fn fold_key(&self) -> String {
        match self.bridge_alias {
            Some(_) => {
                let column = self
                    .where_key
                    .split('.')
                    .nth(1)
                    .unwrap_or(self.where_key.as_str());
                format!("_#_{}_#_", column)
            }
            None => self.where_key.clone(),
        }
    }
}

impl fmt::Debug for RelationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationNode")
            .field("alias", &self.alias)
            .field("kind", &self.kind)
            .field("polymorphic", &self.polymorphic)
            .field("table", &self.table)
            .field("left_key", &self.left_key)
            .field("where_key", &self.where_key)
            .field("children", &self.children)
            .finish()
    }
}

/// Resolve the parsed line sequence into the relationship tree. Nesting uses
/// an explicit ancestor stack: pop until the top is strictly shallower, then
/// attach. The root is never popped, so lines written flush with the root
/// still nest beneath it.
pub fn resolve(nodes: Vec<RawNode>, composer: &Composer) -> RelationNode {
    let mut iter = nodes.into_iter();
    let root_raw = iter
        .next()
        .expect("parse_spec guarantees at least the root line");
    let root = specify(root_raw, None, composer);

    let mut stack: Vec<RelationNode> = vec![root];
    for raw in iter {
        while stack.len() > 1 && stack.last().is_some_and(|top| top.depth >= raw.depth) {
            let done = stack.pop().expect("stack is non-empty");
            stack
                .last_mut()
                .expect("stack keeps the root")
                .children
                .push(done);
        }
        let parent_table = stack.last().expect("stack keeps the root").table.clone();
        let node = specify(raw, Some(&parent_table), composer);
        stack.push(node);
    }
    while stack.len() > 1 {
        let done = stack.pop().expect("stack is non-empty");
        stack
            .last_mut()
            .expect("stack keeps the root")
            .children
            .push(done);
    }
    stack.pop().expect("stack keeps the root")
}

fn specify(raw: RawNode, parent_table: Option<&str>, composer: &Composer) -> RelationNode {
    let options = raw.options;
    let table = options.table.clone().unwrap_or_else(|| match raw.kind {
        Some(RelationKind::BelongsTo) => naming::plural(&raw.alias),
        _ => raw.alias.clone(),
    });

    let mut left_key = String::new();
    let mut where_key = String::new();
    let mut bridge_join = Sql::empty();
    let mut bridge_alias = None;

    match raw.kind {
        None => {}
        Some(RelationKind::BelongsTo) => {
            left_key = options.left_key.clone().unwrap_or_else(|| {
                if raw.polymorphic {
                    "id".to_string()
                } else {
                    format!("{}_id", naming::singular(&table))
                }
            });
            where_key = options.key.clone().unwrap_or_else(|| {
                if raw.polymorphic {
                    ATTACHED_ID.to_string()
                } else {
                    "id".to_string()
                }
            });
        }
        Some(RelationKind::HasMany) => {
            let parent = parent_table.expect("non-root nodes have a parent");
            left_key = options.left_key.clone().unwrap_or_else(|| "id".to_string());
            where_key = options.key.clone().unwrap_or_else(|| {
                if raw.polymorphic {
                    ATTACHED_ID.to_string()
                } else {
                    format!("{}_id", naming::singular(parent))
                }
            });
        }
        Some(RelationKind::ManyToMany) => {
            let parent = parent_table.expect("non-root nodes have a parent");
            left_key = options.left_key.clone().unwrap_or_else(|| "id".to_string());
            let xtable = options
                .xtable
                .clone()
                .unwrap_or_else(|| format!("{}_{}", parent, table));
            let xalias = options.xtable_alias.clone().unwrap_or_else(|| xtable.clone());
            let bridge_left = options
                .left_xkey
                .clone()
                .unwrap_or_else(|| format!("{}_id", naming::singular(parent)));
            where_key = format!("{}.{}", xalias, bridge_left);

            let bridge_right = options
                .xkey
                .clone()
                .unwrap_or_else(|| format!("{}_id", naming::singular(&table)));
            let own_key = options.key.clone().unwrap_or_else(|| "id".to_string());
            let on = composer.eq(vec![(
                format!("{}.{}", xalias, bridge_right),
                SqlArg::Frag(composer.column(&[&format!("{}.{}", raw.alias, own_key)])),
            )]);
            bridge_join = merge(
                vec![
                    Sql::raw("INNER JOIN"),
                    composer.table(&xtable),
                    Sql::raw("AS"),
                    composer.table(&xalias),
                    Sql::raw("ON"),
                    on,
                ],
                " ",
            );
            bridge_alias = Some(xalias);
        }
    }

    let poly_filter = if raw.polymorphic {
        let pairs: Vec<(String, SqlArg)> = match &options.poly_type {
            Some(PolyType::Filter(pairs)) => pairs
                .iter()
                .map(|(k, v)| (k.clone(), SqlArg::Value(v.clone())))
                .collect(),
            Some(PolyType::Type(t)) => vec![(
                ATTACHED_TYPE.to_string(),
                SqlArg::Value(Value::String(t.clone())),
            )],
            None => vec![(
                ATTACHED_TYPE.to_string(),
                SqlArg::Value(Value::String(
                    parent_table.expect("non-root nodes have a parent").to_string(),
                )),
            )],
        };
        merge(vec![Sql::raw("AND"), composer.eq(pairs)], " ")
    } else {
        Sql::empty()
    };

    RelationNode {
        alias: raw.alias,
        depth: raw.depth,
        kind: raw.kind,
        polymorphic: raw.polymorphic,
        table,
        left_key,
        where_key,
        column: options.column.clone().unwrap_or_default(),
        filter: options.query.clone().unwrap_or_default(),
        join: options.join.clone().unwrap_or_default(),
        bridge_join,
        bridge_alias,
        poly_filter,
        row_limit: options.row_limit.clone(),
        hook: options.hook.clone(),
        children: Vec::new(),
    }
}
