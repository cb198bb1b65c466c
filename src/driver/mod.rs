//! External driver boundary. The engine only needs `execute(text, params)`
//! returning ordered rows, plus transaction primitives on a single
//! connection; everything else belongs to the driver crate behind this trait.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[cfg(feature = "postgres")]
pub mod postgres;

/// One result row: column name to JSON value, in driver column order.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        DriverError {
            message: message.into(),
        }
    }
}

/// Something that can execute one parameterized statement. Parameters are
/// always bound, never interpolated into the SQL text.
#[async_trait]
pub trait SqlDriver: Send + Sync {
    async fn execute(&self, text: &str, params: &[Value]) -> Result<Vec<Row>, DriverError>;
}

/// A dedicated connection supporting transaction primitives. `commit` and
/// `rollback` consume the connection; implementations must release it on
/// both paths.
#[async_trait]
pub trait SqlConnection: SqlDriver {
    async fn begin(&self) -> Result<(), DriverError>;
    async fn commit(&self) -> Result<(), DriverError>;
    async fn rollback(&self) -> Result<(), DriverError>;
    /// Unconditional cleanup; called exactly once after commit or rollback.
    async fn release(&self);
}

/// A connection source: executes statements itself and hands out dedicated
/// connections for transactions.
#[async_trait]
pub trait SqlPool: SqlDriver {
    async fn acquire(&self) -> Result<Box<dyn SqlConnection>, DriverError>;
}

#[async_trait]
impl SqlDriver for Box<dyn SqlConnection> {
    async fn execute(&self, text: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        (**self).execute(text, params).await
    }
}
