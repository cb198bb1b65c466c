use std::collections::HashSet;

use serde_json::{json, Map, Value};

use super::dialect::Dialect;
use super::errors::ComposeError;
use super::fragment::{merge, Sql, SqlArg, PLACEHOLDER};

/// Fragment factory bound to one dialect. Every piece of SQL text this crate
/// emits is produced here, so placeholder syntax and identifier quoting stay
/// consistent across a whole query.
#[derive(Debug, Clone)]
pub struct Composer {
    dialect: Dialect,
}

/// One entry of a column list: a name (optionally `a as b` or dotted) or an
/// already-built fragment spliced verbatim.
#[derive(Debug, Clone)]
pub(crate) enum ColumnItem {
    Name(String),
    Frag(Sql),
}

impl Composer {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Template-zipper composition: `parts[0] arg[0] parts[1] arg[1] ...`.
    /// A bind arg appends its placeholder directly after the preceding text;
    /// a fragment arg is spliced as its own space-separated piece.
    pub fn sql(&self, parts: &[&str], args: Vec<SqlArg>) -> Sql {
        let mut pieces: Vec<Sql> = Vec::new();
        let mut args = args.into_iter();
        for part in parts {
            match args.next() {
                Some(SqlArg::Value(v)) => {
                    let mut text = (*part).to_string();
                    text.push_str(PLACEHOLDER);
                    pieces.push(Sql::fragment(text, vec![v]));
                }
                Some(SqlArg::Frag(frag)) => {
                    pieces.push(Sql::raw(*part));
                    pieces.push(frag);
                }
                None => pieces.push(Sql::raw(*part)),
            }
        }
        for arg in args {
            match arg {
                SqlArg::Value(v) => pieces.push(Sql::fragment(PLACEHOLDER, vec![v])),
                SqlArg::Frag(frag) => pieces.push(frag),
            }
        }
        merge(pieces, " ")
    }

    /// Quoted identifier list. Entries may be dotted paths, `*`, or
    /// case-insensitive `a as b` renames.
    pub fn column(&self, cols: &[&str]) -> Sql {
        self.column_items(cols.iter().map(|c| ColumnItem::Name((*c).to_string())).collect())
    }

    pub(crate) fn column_items(&self, items: Vec<ColumnItem>) -> Sql {
        let mut seen: HashSet<String> = HashSet::new();
        let mut pieces: Vec<Sql> = Vec::new();
        for item in items {
            match item {
                ColumnItem::Name(name) => {
                    if seen.insert(name.clone()) {
                        pieces.push(Sql::raw(self.columnize(&name)));
                    }
                }
                ColumnItem::Frag(frag) => pieces.push(frag),
            }
        }
        merge(pieces, ", ")
    }

    /// Quoted table (or other identifier path) reference.
    pub fn table(&self, name: &str) -> Sql {
        Sql::raw(self.dialect.quote_path(name))
    }

    /// `"k" = ??` pairs joined with ` AND `. A fragment value is spliced in
    /// place of the placeholder (column-to-column equality).
    pub fn eq(&self, pairs: Vec<(String, SqlArg)>) -> Sql {
        self.eq_sep(pairs, " AND ")
    }

    pub fn eq_sep(&self, pairs: Vec<(String, SqlArg)>, sep: &str) -> Sql {
        let mut pieces: Vec<Sql> = Vec::new();
        for (key, arg) in pairs {
            match arg {
                SqlArg::Value(v) => pieces.push(Sql::fragment(
                    format!("{} = {}", self.columnize(&key), PLACEHOLDER),
                    vec![v],
                )),
                SqlArg::Frag(Sql::Injection) => return Sql::Injection,
                SqlArg::Frag(Sql::Fragment { text, params }) => pieces.push(Sql::fragment(
                    format!("{} = {}", self.columnize(&key), text),
                    params,
                )),
            }
        }
        merge(pieces, sep)
    }

    /// `SET "k" = ??, ...` assignment list.
    pub fn set(&self, pairs: Vec<(String, Value)>) -> Sql {
        let assignments = self.eq_sep(
            pairs.into_iter().map(|(k, v)| (k, SqlArg::Value(v))).collect(),
            ", ",
        );
        merge(vec![Sql::raw("SET"), assignments], " ")
    }

    /// `"key" IN (??, ...)` over deduplicated values. An empty list emits the
    /// statically-false `1=??` (bound 0) instead of invalid `()` SQL.
    pub fn in_list(&self, key: &str, values: Vec<Value>) -> Sql {
        self.base_in(key, "IN", values)
    }

    pub fn not_in_list(&self, key: &str, values: Vec<Value>) -> Sql {
        self.base_in(key, "NOT IN", values)
    }

    fn base_in(&self, key: &str, operator: &str, values: Vec<Value>) -> Sql {
        let values = dedup_values(values);
        if values.is_empty() {
            return empty_in();
        }
        let slots = vec![PLACEHOLDER; values.len()].join(", ");
        Sql::fragment(
            format!("{} {} ({})", self.columnize(key), operator, slots),
            values,
        )
    }

    /// Composite-key tuple IN: `("a", "b") IN ((??, ??), ...)` over
    /// deduplicated tuples, each tuple bound positionally.
    pub fn in_tuples(&self, keys: &[&str], tuples: Vec<Vec<Value>>) -> Sql {
        self.base_in_tuples(keys, "IN", tuples)
    }

    pub fn not_in_tuples(&self, keys: &[&str], tuples: Vec<Vec<Value>>) -> Sql {
        self.base_in_tuples(keys, "NOT IN", tuples)
    }

    fn base_in_tuples(&self, keys: &[&str], operator: &str, tuples: Vec<Vec<Value>>) -> Sql {
        let tuples = dedup_tuples(tuples);
        if tuples.is_empty() {
            return empty_in();
        }
        let keys_text = keys
            .iter()
            .map(|k| self.columnize(k))
            .collect::<Vec<_>>()
            .join(", ");
        let slots = tuples
            .iter()
            .map(|t| format!("({})", vec![PLACEHOLDER; t.len()].join(", ")))
            .collect::<Vec<_>>()
            .join(", ");
        let params = tuples.into_iter().flatten().collect();
        Sql::fragment(
            format!("({}) {} ({})", keys_text, operator, slots),
            params,
        )
    }

    /// `("c1", "c2") VALUES (??, DEFAULT), ...`: the column set is the union
    /// across all rows in first-seen order; missing fields emit the literal
    /// `DEFAULT` and bind nothing.
    pub fn values(&self, rows: &[Map<String, Value>]) -> Sql {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for row in rows {
            for key in row.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }

        let mut params: Vec<Value> = Vec::new();
        let tuples = rows
            .iter()
            .map(|row| {
                let slots = columns
                    .iter()
                    .map(|col| match row.get(col) {
                        Some(v) => {
                            params.push(v.clone());
                            PLACEHOLDER
                        }
                        None => "DEFAULT",
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", slots)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let column_text = columns
            .iter()
            .map(|c| self.columnize(c))
            .collect::<Vec<_>>()
            .join(", ");
        Sql::fragment(format!("({}) VALUES {}", column_text, tuples), params)
    }

    /// Substitute dialect placeholders and surface the bind list. The
    /// injection sentinel fails closed here, before any I/O.
    pub fn finalize(&self, sql: &Sql) -> Result<(String, Vec<Value>), ComposeError> {
        match sql {
            Sql::Injection => Err(ComposeError::UnsafeComposition),
            Sql::Fragment { text, params } => {
                let mut out = String::with_capacity(text.len());
                let mut rest = text.as_str();
                let mut index = 0;
                while let Some(pos) = rest.find(PLACEHOLDER) {
                    out.push_str(&rest[..pos]);
                    index += 1;
                    out.push_str(&self.dialect.placeholder(index));
                    rest = &rest[pos + PLACEHOLDER.len()..];
                }
                out.push_str(rest);
                Ok((out, params.clone()))
            }
        }
    }

    /// Quote one column expression: `*` passes through, `a as b` becomes a
    /// quoted rename, anything else is a quoted dotted path.
    pub(crate) fn columnize(&self, v: &str) -> String {
        if v == "*" {
            return "*".to_string();
        }
        match split_as(v) {
            Some((from, to)) => format!(
                "{} AS {}",
                self.dialect.quote_path(from),
                self.dialect.quote_path(to)
            ),
            None => self.dialect.quote_path(v),
        }
    }
}

/// Statically-false predicate used for empty IN lists.
fn empty_in() -> Sql {
    Sql::fragment(format!("1={}", PLACEHOLDER), vec![json!(0)])
}

fn dedup_values(values: Vec<Value>) -> Vec<Value> {
    let mut seen: HashSet<String> = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.to_string()))
        .collect()
}

fn dedup_tuples(tuples: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    let mut seen: HashSet<String> = HashSet::new();
    tuples
        .into_iter()
        .filter(|t| {
            let key = t.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("\u{1f}");
            seen.insert(key)
        })
        .collect()
}

/// Split a case-insensitive ` as ` rename with whitespace on both sides.
fn split_as(v: &str) -> Option<(&str, &str)> {
    let lower = v.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut search = 0;
    while let Some(found) = lower[search..].find("as") {
        let pos = search + found;
        let before_ws = pos > 0 && bytes[pos - 1].is_ascii_whitespace();
        let after = pos + 2;
        let after_ws = after < bytes.len() && bytes[after].is_ascii_whitespace();
        if before_ws && after_ws {
            return Some((v[..pos].trim(), v[after..].trim()));
        }
        search = after;
    }
    None
}
