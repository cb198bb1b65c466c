//! Query execution layer: `Loader` ties a driver, a `Composer`, debug
//! options and an optional `Catalog` together, and exposes the two fetch
//! strategies plus plain query helpers and transactions.

use serde_json::Value;

use crate::config::DebugConfig;
use crate::driver::{Row, SqlDriver, SqlPool};
use crate::spec_parser::SpecBlock;
use crate::sql_composer::{merge, Composer, Dialect, Sql};

mod associate;
mod catalog;
mod errors;
mod fold;
mod left_join;
mod transaction;

pub use catalog::Catalog;
pub use errors::LoadError;
pub use transaction::Transaction;

/// Borrowed execution context shared by the fetch strategies, so the same
/// code runs over a pool-backed loader and a single transaction connection.
pub(crate) struct Fetch<'a> {
    pub(crate) driver: &'a dyn SqlDriver,
    pub(crate) composer: &'a Composer,
    pub(crate) debug: DebugConfig,
    pub(crate) catalog: Option<&'a Catalog>,
}

impl<'a> Fetch<'a> {
    pub(crate) fn plain(driver: &'a dyn SqlDriver, composer: &'a Composer) -> Self {
        Fetch {
            driver,
            composer,
            debug: DebugConfig::default(),
            catalog: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_catalog(
        driver: &'a dyn SqlDriver,
        composer: &'a Composer,
        catalog: &'a Catalog,
    ) -> Self {
        Fetch {
            driver,
            composer,
            debug: DebugConfig::default(),
            catalog: Some(catalog),
        }
    }

    /// Finalize, log and execute one fragment.
    pub(crate) async fn run(&self, sql: &Sql) -> Result<Vec<Row>, LoadError> {
        let (text, params) = self.composer.finalize(sql)?;
        if self.debug.log_sql {
            log::info!("sql: {} params: {:?}", text, params);
        } else {
            log::debug!("sql: {} params: {:?}", text, params);
        }
        self.driver.execute(&text, &params).await.map_err(|source| {
            if self.debug.error_with_sql {
                LoadError::DriverWithSql {
                    source,
                    sql: text,
                    params,
                }
            } else {
                LoadError::Driver(source)
            }
        })
    }
}

pub struct Loader<D> {
    driver: D,
    composer: Composer,
    debug: DebugConfig,
    catalog: Catalog,
}

impl<D: SqlDriver> Loader<D> {
    pub fn new(driver: D, dialect: Dialect) -> Self {
        Loader {
            driver,
            composer: Composer::new(dialect),
            debug: DebugConfig::default(),
            catalog: Catalog::new(),
        }
    }

    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn fetch(&self) -> Fetch<'_> {
        Fetch {
            driver: &self.driver,
            composer: &self.composer,
            debug: self.debug,
            catalog: Some(&self.catalog),
        }
    }

    pub async fn query(&self, sql: &Sql) -> Result<Vec<Row>, LoadError> {
        self.fetch().run(sql).await
    }

    pub async fn query_one(&self, sql: &Sql) -> Result<Option<Row>, LoadError> {
        Ok(self.query(sql).await?.into_iter().next())
    }

    /// Value-list insert over the union of the rows' columns.
    pub async fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<Row>, LoadError> {
        let sql = merge(
            vec![
                Sql::raw("INSERT INTO"),
                self.composer.table(table),
                self.composer.values(rows),
            ],
            " ",
        );
        self.query(&sql).await
    }

    /// Batched-fetch walker over the declarative spec: one query per relation
    /// per level, results folded into a nested graph.
    pub async fn associate(&self, block: &SpecBlock) -> Result<Vec<Value>, LoadError> {
        associate::run(&self.fetch(), block).await
    }

    pub async fn associate_one(&self, block: &SpecBlock) -> Result<Option<Value>, LoadError> {
        Ok(self.associate(block).await?.into_iter().next())
    }

    /// Single-query LEFT JOIN strategy over the to-one region of the spec;
    /// produces the same nested shape as [`associate`](Self::associate).
    pub async fn left_join(&self, block: &SpecBlock) -> Result<Vec<Value>, LoadError> {
        left_join::run(&self.fetch(), block).await
    }
}

impl<D: SqlPool> Loader<D> {
    /// Acquire one connection from the pool, issue BEGIN, and return a
    /// [`Transaction`] bound to it.
    pub async fn transaction(&self) -> Result<Transaction, LoadError> {
        Transaction::begin(self).await
    }
}
