//! Table-to-columns map used to default column lists for the left-join
//! strategy. Filled by hand or from `information_schema` on Postgres.

use std::collections::HashMap;

use crate::driver::SqlDriver;
use crate::sql_composer::{Composer, SqlArg};

use super::errors::LoadError;
use super::Fetch;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: HashMap<String, Vec<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<String>) {
        self.tables.insert(table.into(), columns);
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(|c| c.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Load column lists for every table and view owned by `owner` in
    /// `database` from `information_schema`. Two round-trips total.
    pub async fn introspect(
        driver: &dyn SqlDriver,
        composer: &Composer,
        owner: &str,
        database: &str,
    ) -> Result<Self, LoadError> {
        let fetch = Fetch::plain(driver, composer);
        let mut catalog = Catalog::new();

        let tables = composer.sql(
            &[
                "SELECT table_name, column_name FROM information_schema.columns \
                 WHERE table_catalog =",
                "AND table_schema NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY table_name, ordinal_position",
            ],
            vec![SqlArg::Value(database.into())],
        );
        for row in fetch.run(&tables).await? {
            let (Some(table), Some(column)) = (
                row.get("table_name").and_then(|v| v.as_str()),
                row.get("column_name").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            catalog
                .tables
                .entry(table.to_string())
                .or_default()
                .push(column.to_string());
        }

        let views = composer.sql(
            &[
                "SELECT view_name, column_name FROM information_schema.view_column_usage \
                 WHERE view_catalog =",
                "AND table_owner =",
                "ORDER BY view_name",
            ],
            vec![SqlArg::Value(database.into()), SqlArg::Value(owner.into())],
        );
        for row in fetch.run(&views).await? {
            let (Some(view), Some(column)) = (
                row.get("view_name").and_then(|v| v.as_str()),
                row.get("column_name").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            let columns = catalog.tables.entry(view.to_string()).or_default();
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }

        Ok(catalog)
    }
}
