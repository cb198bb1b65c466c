//! The batched-fetch walker: one query per relation per level, parent keys
//! collapsed into a single IN set, results folded back under each parent's
//! `_` object.

use std::collections::HashSet;

use futures_util::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{json, Value};

use crate::driver::Row;
use crate::relation_resolver::{resolve, RelationNode};
use crate::spec_parser::{parse_spec, ColumnSpec, SpecBlock};
use crate::sql_composer::{merge, ColumnItem, Composer, Sql, SqlArg};

use super::errors::LoadError;
use super::fold::{fold_rows, key_string, FoldedRows};
use super::Fetch;

/// Synthesized rank column for `row_limit` window queries, stripped from
/// results before folding.
pub(crate) const RANK_COLUMN: &str = "--row_number--";
const RANK_TABLE: &str = "--row_number_table--";

pub(crate) async fn run(fetch: &Fetch<'_>, block: &SpecBlock) -> Result<Vec<Value>, LoadError> {
    let nodes = parse_spec(block)?;
    let root = resolve(nodes, fetch.composer);

    let sql = root_query(fetch.composer, &root);
    let mut rows = fetch.run(&sql).await?;
    if !rows.is_empty() {
        load_children(fetch, &root, &mut rows).await?;
    }

    let values: Vec<Value> = rows.into_iter().map(Value::Object).collect();
    Ok(match &root.hook {
        Some(hook) => match hook(Value::Array(values)) {
            Value::Array(items) => items,
            other => vec![other],
        },
        None => values,
    })
}

pub(crate) fn root_query(composer: &Composer, root: &RelationNode) -> Sql {
    merge(
        vec![
            Sql::raw("SELECT"),
            select_columns(composer, root),
            Sql::raw("FROM"),
            composer.table(&root.table),
            Sql::raw("AS"),
            composer.table(&root.alias),
            root.join.clone(),
            root.filter.clone(),
        ],
        " ",
    )
}

/// Fetch and attach every child relation of `node` onto `parents`, then
/// recurse. Siblings run concurrently; attachment is sequential afterwards.
pub(crate) fn load_children<'a>(
    fetch: &'a Fetch<'a>,
    node: &'a RelationNode,
    parents: &'a mut [Row],
) -> BoxFuture<'a, Result<(), LoadError>> {
    async move {
        if node.children.is_empty() || parents.is_empty() {
            return Ok(());
        }

        let folded = {
            let shared: &[Row] = parents;
            try_join_all(
                node.children
                    .iter()
                    .map(|child| fetch_child(fetch, child, shared)),
            )
            .await?
        };

        for (child, mut group) in node.children.iter().zip(folded) {
            for parent in parents.iter_mut() {
                let mut value = key_string(parent.get(&child.left_key))
                    .and_then(|key| group.take(&key))
                    .unwrap_or_else(|| group.missing());
                if let Some(hook) = &child.hook {
                    value = hook(value);
                }
                let slot = parent
                    .entry("_".to_string())
                    .or_insert_with(|| Value::Object(Row::new()));
                if let Value::Object(map) = slot {
                    map.insert(child.alias.clone(), value);
                }
            }
        }
        Ok(())
    }
    .boxed()
}

/// One relation at one level: collect the parents' distinct keys, issue the
/// batched query (or nothing when the key set is empty), recurse into the
/// fetched rows, then fold them by the relation's fold key.
async fn fetch_child(
    fetch: &Fetch<'_>,
    child: &RelationNode,
    parents: &[Row],
) -> Result<FoldedRows, LoadError> {
    let kind = child.kind.expect("child nodes carry a relation kind");
    let keys = distinct_keys(parents, &child.left_key);
    let mut rows = if keys.is_empty() {
        Vec::new()
    } else {
        let sql = child_query(fetch.composer, child, keys);
        let mut rows = fetch.run(&sql).await?;
        if child.row_limit.is_some() {
            for row in &mut rows {
                row.remove(RANK_COLUMN);
            }
        }
        rows
    };
    if !rows.is_empty() {
        load_children(fetch, child, &mut rows).await?;
    }
    Ok(fold_rows(
        rows,
        kind,
        &child.fold_key(),
        child.bridge_alias.is_some(),
    ))
}

/// Dedup uses the same key normalization as the fold, so a key column
/// mixing `7` and `"7"` queries once and folds onto one group.
fn distinct_keys(parents: &[Row], left_key: &str) -> Vec<Value> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for row in parents {
        let Some(value) = row.get(left_key) else {
            continue;
        };
        if let Some(key) = key_string(Some(value)) {
            if seen.insert(key) {
                out.push(value.clone());
            }
        }
    }
    out
}

pub(crate) fn child_query(composer: &Composer, child: &RelationNode, keys: Vec<Value>) -> Sql {
    let core = merge(
        vec![
            Sql::raw("SELECT"),
            select_columns(composer, child),
            window_column(composer, child),
            Sql::raw("FROM"),
            composer.table(&child.table),
            Sql::raw("AS"),
            composer.table(&child.alias),
            child.join.clone(),
            child.bridge_join.clone(),
            Sql::raw("WHERE"),
            composer.in_list(&child.qualified_where_key(), keys),
            child.poly_filter.clone(),
            filter_as_and(&child.filter),
        ],
        " ",
    );
    match &child.row_limit {
        None => core,
        Some((limit, _)) => {
            let tail = format!(
                ") AS \"{t}\" WHERE \"{t}\".\"{c}\" <= ",
                t = RANK_TABLE,
                c = RANK_COLUMN
            );
            composer.sql(
                &["SELECT * FROM (", tail.as_str()],
                vec![SqlArg::Frag(core), SqlArg::Value(json!(limit))],
            )
        }
    }
}

/// Selected columns for one node: the configured set, every child's
/// `left_key` (key extraction must never miss), and the node's own fold key.
fn select_columns(composer: &Composer, node: &RelationNode) -> Sql {
    let mut items: Vec<ColumnItem> = Vec::new();
    match &node.column {
        ColumnSpec::All => items.push(ColumnItem::Name(format!("{}.*", node.alias))),
        ColumnSpec::List(cols) => {
            for col in cols {
                items.push(ColumnItem::Name(format!("{}.{}", node.alias, col)));
            }
            for grandchild in &node.children {
                items.push(ColumnItem::Name(format!(
                    "{}.{}",
                    node.alias, grandchild.left_key
                )));
            }
        }
        ColumnSpec::Raw(frag) => items.push(ColumnItem::Frag(frag.clone())),
    }
    if !node.is_root() {
        if node.bridge_alias.is_some() {
            items.push(ColumnItem::Name(format!(
                "{} as {}",
                node.where_key,
                node.fold_key()
            )));
        } else if !matches!(node.column, ColumnSpec::All) {
            items.push(ColumnItem::Name(format!(
                "{}.{}",
                node.alias, node.where_key
            )));
        }
    }
    composer.column_items(items)
}

/// `ROW_NUMBER() OVER (...)` selection appended when the node carries a
/// `row_limit`, partitioned by the fold key and ordered by the given
/// fragment.
fn window_column(composer: &Composer, node: &RelationNode) -> Sql {
    match &node.row_limit {
        None => Sql::empty(),
        Some((_, order)) => {
            let prefix = format!(
                ", ROW_NUMBER() OVER (PARTITION BY {} ORDER BY",
                composer.columnize(&node.qualified_where_key())
            );
            let tail = format!(") AS \"{}\"", RANK_COLUMN);
            composer.sql(
                &[prefix.as_str(), tail.as_str()],
                vec![SqlArg::Frag(order.clone())],
            )
        }
    }
}

/// A per-node filter joins a query that already has a WHERE clause, so a
/// leading WHERE keyword is rewritten to AND.
pub(crate) fn filter_as_and(filter: &Sql) -> Sql {
    match filter {
        Sql::Injection => Sql::Injection,
        Sql::Fragment { text, params } => {
            let trimmed = text.trim_start();
            // Byte-wise compare: slicing the str at 5 could split a
            // multibyte character in the filter text.
            if trimmed.len() >= 5 && trimmed.as_bytes()[..5].eq_ignore_ascii_case(b"where") {
                Sql::fragment(format!("AND{}", &trimmed[5..]), params.clone())
            } else {
                filter.clone()
            }
        }
    }
}
