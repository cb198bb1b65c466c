//! Single-query LEFT JOIN strategy: the root and every descendant reachable
//! through unbroken to-one edges are fetched in one statement, with every
//! selected column aliased by its `>_<`-separated path so the flat rows
//! unflatten losslessly. Remaining relations fall back to the batched walker
//! over the unflattened rows.

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::driver::Row;
use crate::relation_resolver::{resolve, RelationNode};
use crate::spec_parser::{parse_spec, ColumnSpec, RelationKind, SpecBlock};
use crate::sql_composer::{merge, ColumnItem, Sql, SqlArg};

use super::associate::{filter_as_and, load_children};
use super::errors::LoadError;
use super::Fetch;

/// Path separator inside column aliases. Never appears in a real identifier.
const PATH_SEP: &str = ">_<";

pub(crate) async fn run(fetch: &Fetch<'_>, block: &SpecBlock) -> Result<Vec<Value>, LoadError> {
    let nodes = parse_spec(block)?;
    let root = resolve(nodes, fetch.composer);

    let sql = joined_query(fetch, &root)?;
    let flat = fetch.run(&sql).await?;
    let mut rows = unflatten(&root, flat);
    for row in &mut rows {
        normalize_misses(&root, row);
    }
    if !rows.is_empty() {
        load_unjoined(fetch, &root, &mut rows).await?;
    }
    Ok(rows.into_iter().map(Value::Object).collect())
}

fn is_joined(node: &RelationNode) -> bool {
    node.kind == Some(RelationKind::BelongsTo)
}

pub(crate) fn joined_query(fetch: &Fetch<'_>, root: &RelationNode) -> Result<Sql, LoadError> {
    let mut items: Vec<ColumnItem> = Vec::new();
    let mut joins: Vec<Sql> = Vec::new();
    let mut path: Vec<String> = Vec::new();
    build_region(fetch, root, None, &mut path, &mut items, &mut joins)?;

    let mut pieces = vec![
        Sql::raw("SELECT"),
        fetch.composer.column_items(items),
        Sql::raw("FROM"),
        fetch.composer.table(&root.table),
        Sql::raw("AS"),
        fetch.composer.table(&root.alias),
        root.join.clone(),
    ];
    pieces.extend(joins);
    pieces.push(root.filter.clone());
    Ok(merge(pieces, " "))
}

fn build_region(
    fetch: &Fetch<'_>,
    node: &RelationNode,
    parent_alias: Option<&str>,
    path: &mut Vec<String>,
    items: &mut Vec<ColumnItem>,
    joins: &mut Vec<Sql>,
) -> Result<(), LoadError> {
    path.push(node.alias.clone());
    let alias_path = path.join(PATH_SEP);
    for col in node_columns(fetch, node)? {
        items.push(ColumnItem::Name(format!(
            "{}.{} as {}{}{}",
            node.alias, col, alias_path, PATH_SEP, col
        )));
    }

    if let Some(parent) = parent_alias {
        let on = fetch.composer.eq(vec![(
            format!("{}.{}", parent, node.left_key),
            SqlArg::Frag(
                fetch
                    .composer
                    .column(&[&format!("{}.{}", node.alias, node.where_key)]),
            ),
        )]);
        joins.push(merge(
            vec![
                Sql::raw("LEFT JOIN"),
                fetch.composer.table(&node.table),
                Sql::raw("AS"),
                fetch.composer.table(&node.alias),
                Sql::raw("ON"),
                on,
                node.poly_filter.clone(),
                filter_as_and(&node.filter),
            ],
            " ",
        ));
    }

    for child in node.children.iter().filter(|c| is_joined(c)) {
        build_region(fetch, child, Some(&node.alias), path, items, joins)?;
    }
    path.pop();
    Ok(())
}

/// Concrete column list for a joined node, plus every child's `left_key` so
/// both the join conditions and the fallback walker see their keys.
fn node_columns(fetch: &Fetch<'_>, node: &RelationNode) -> Result<Vec<String>, LoadError> {
    let mut columns = match &node.column {
        ColumnSpec::List(cols) => cols.clone(),
        _ => fetch
            .catalog
            .and_then(|catalog| catalog.columns(&node.table))
            .map(|cols| cols.to_vec())
            .ok_or_else(|| LoadError::ColumnsRequired(node.table.clone()))?,
    };
    for child in &node.children {
        if !columns.iter().any(|c| c == &child.left_key) {
            columns.push(child.left_key.clone());
        }
    }
    Ok(columns)
}

pub(crate) fn unflatten(root: &RelationNode, flat: Vec<Row>) -> Vec<Row> {
    flat.into_iter()
        .map(|source| {
            let mut row = Row::new();
            for (key, value) in source {
                let segments: Vec<String> =
                    key.split(PATH_SEP).map(str::to_string).collect();
                if segments.len() >= 2 && segments[0] == root.alias {
                    let column = &segments[segments.len() - 1];
                    let path = &segments[1..segments.len() - 1];
                    assign(&mut row, path, column, value);
                } else {
                    row.insert(key, value);
                }
            }
            row
        })
        .collect()
}

fn assign(row: &mut Row, path: &[String], column: &str, value: Value) {
    let mut current = row;
    for alias in path {
        let children = match current
            .entry("_".to_string())
            .or_insert_with(|| Value::Object(Row::new()))
        {
            Value::Object(map) => map,
            _ => return,
        };
        current = match children
            .entry(alias.clone())
            .or_insert_with(|| Value::Object(Row::new()))
        {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(column.to_string(), value);
}

/// A LEFT JOIN miss materializes as an all-NULL child object; both fetch
/// strategies must represent a missing to-one association as `{}`.
fn normalize_misses(node: &RelationNode, row: &mut Row) -> bool {
    let all_null = row
        .iter()
        .filter(|(key, _)| key.as_str() != "_")
        .all(|(_, value)| value.is_null());
    if let Some(Value::Object(children)) = row.get_mut("_") {
        for child in node.children.iter().filter(|c| is_joined(c)) {
            let missed = match children.get_mut(&child.alias) {
                Some(Value::Object(child_row)) => normalize_misses(child, child_row),
                _ => false,
            };
            if missed {
                children.insert(child.alias.clone(), Value::Object(Row::new()));
            }
        }
    }
    all_null
}

/// Load every relation the single query could not cover: non-to-one children
/// of each joined node run through the batched walker, with the unflattened
/// (or nested) rows as parents.
fn load_unjoined<'a>(
    fetch: &'a Fetch<'a>,
    node: &'a RelationNode,
    parents: &'a mut [Row],
) -> BoxFuture<'a, Result<(), LoadError>> {
    async move {
        let walker_view = RelationNode {
            children: node
                .children
                .iter()
                .filter(|c| !is_joined(c))
                .cloned()
                .collect(),
            ..node.clone()
        };
        load_children(fetch, &walker_view, parents).await?;

        for child in node.children.iter().filter(|c| is_joined(c)) {
            let mut extracted: Vec<Row> = Vec::new();
            let mut slots: Vec<usize> = Vec::new();
            for (index, parent) in parents.iter_mut().enumerate() {
                let Some(Value::Object(children)) = parent.get_mut("_") else {
                    continue;
                };
                if let Some(Value::Object(child_row)) = children.get_mut(&child.alias) {
                    if child_row.is_empty() {
                        continue;
                    }
                    extracted.push(std::mem::take(child_row));
                    slots.push(index);
                }
            }
            if extracted.is_empty() {
                continue;
            }
            load_unjoined(fetch, child, &mut extracted).await?;
            for (index, child_row) in slots.into_iter().zip(extracted) {
                if let Some(Value::Object(children)) = parents[index].get_mut("_") {
                    children.insert(child.alias.clone(), Value::Object(child_row));
                }
            }
        }
        Ok(())
    }
    .boxed()
}
