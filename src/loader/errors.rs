use serde_json::Value;
use thiserror::Error;

use crate::driver::DriverError;
use crate::spec_parser::SpecParseError;
use crate::sql_composer::ComposeError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    SpecParse(#[from] SpecParseError),

    #[error("driver error: {0}")]
    Driver(DriverError),

    /// Driver failure annotated with the statement that caused it. Only
    /// produced when `DebugConfig::error_with_sql` is on.
    #[error("driver error: {source} (sql: {sql}, params: {params:?})")]
    DriverWithSql {
        source: DriverError,
        sql: String,
        params: Vec<Value>,
    },

    #[error("no column list for table '{0}' (pass `column` in the node options or register the table in the catalog)")]
    ColumnsRequired(String),
}
