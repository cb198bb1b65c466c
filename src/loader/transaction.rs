//! A loader bound to one dedicated connection inside BEGIN..COMMIT/ROLLBACK.

use serde_json::Value;

use crate::driver::{Row, SqlConnection, SqlPool};
use crate::spec_parser::SpecBlock;
use crate::sql_composer::Sql;

use super::errors::LoadError;
use super::Loader;

/// Exactly one of [`commit`](Transaction::commit) /
/// [`rollback`](Transaction::rollback) consumes the transaction; the
/// connection is released on both outcomes. Query failures do not roll back
/// by themselves, the caller keeps that decision.
pub struct Transaction {
    inner: Loader<Box<dyn SqlConnection>>,
}

impl Transaction {
    pub(crate) async fn begin<D: SqlPool>(loader: &Loader<D>) -> Result<Self, LoadError> {
        let connection = loader.driver.acquire().await.map_err(LoadError::Driver)?;
        connection.begin().await.map_err(LoadError::Driver)?;
        Ok(Transaction {
            inner: Loader {
                driver: connection,
                composer: loader.composer.clone(),
                debug: loader.debug,
                catalog: loader.catalog.clone(),
            },
        })
    }

    pub async fn query(&self, sql: &Sql) -> Result<Vec<Row>, LoadError> {
        self.inner.query(sql).await
    }

    pub async fn query_one(&self, sql: &Sql) -> Result<Option<Row>, LoadError> {
        self.inner.query_one(sql).await
    }

    pub async fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<Row>, LoadError> {
        self.inner.insert(table, rows).await
    }

    pub async fn associate(&self, block: &SpecBlock) -> Result<Vec<Value>, LoadError> {
        self.inner.associate(block).await
    }

    pub async fn associate_one(&self, block: &SpecBlock) -> Result<Option<Value>, LoadError> {
        self.inner.associate_one(block).await
    }

    pub async fn left_join(&self, block: &SpecBlock) -> Result<Vec<Value>, LoadError> {
        self.inner.left_join(block).await
    }

    pub async fn commit(self) -> Result<(), LoadError> {
        let result = self.inner.driver.commit().await;
        self.inner.driver.release().await;
        result.map_err(LoadError::Driver)
    }

    pub async fn rollback(self) -> Result<(), LoadError> {
        let result = self.inner.driver.rollback().await;
        self.inner.driver.release().await;
        result.map_err(LoadError::Driver)
    }
}
