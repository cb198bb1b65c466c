//! `tokio-postgres` implementation of the driver traits.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_postgres::types::{ToSql, Type};

use super::{DriverError, Row, SqlConnection, SqlDriver};

/// A driver over a single `tokio_postgres::Client`. For pooled usage wrap
/// the pool in an [`SqlPool`](super::SqlPool) impl that hands out `PgDriver`
/// connections.
pub struct PgDriver {
    client: tokio_postgres::Client,
}

impl PgDriver {
    pub fn new(client: tokio_postgres::Client) -> Self {
        PgDriver { client }
    }
}

fn bind_param(value: &Value) -> Box<dyn ToSql + Sync + Send> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else {
                Box::new(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.clone()),
    }
}

fn cell_to_json(row: &tokio_postgres::Row, index: usize) -> Result<Value, DriverError> {
    let ty = row.columns()[index].type_();
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(index)
            .map(|v| v.map_or(Value::Null, Value::Bool))
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(index)
            .map(|v| v.map_or(Value::Null, |n| json!(n)))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(index)
            .map(|v| v.map_or(Value::Null, |n| json!(n)))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(index)
            .map(|v| v.map_or(Value::Null, |n| json!(n)))
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index)
            .map(|v| v.map_or(Value::Null, |n| json!(n)))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index)
            .map(|v| v.map_or(Value::Null, |n| json!(n)))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Value>>(index)
            .map(|v| v.unwrap_or(Value::Null))
    } else {
        row.try_get::<_, Option<String>>(index)
            .map(|v| v.map_or(Value::Null, Value::String))
    };
    value.map_err(|e| DriverError::new(e.to_string()))
}

#[async_trait]
impl SqlDriver for PgDriver {
    async fn execute(&self, text: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        let bound: Vec<Box<dyn ToSql + Sync + Send>> = params.iter().map(bind_param).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|b| &**b as &(dyn ToSql + Sync))
            .collect();
        let rows = self
            .client
            .query(text, &refs)
            .await
            .map_err(|e| DriverError::new(e.to_string()))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut map = Row::new();
            for (i, column) in row.columns().iter().enumerate() {
                map.insert(column.name().to_string(), cell_to_json(&row, i)?);
            }
            out.push(map);
        }
        Ok(out)
    }
}

#[async_trait]
impl SqlConnection for PgDriver {
    async fn begin(&self) -> Result<(), DriverError> {
        self.client
            .batch_execute("BEGIN")
            .await
            .map_err(|e| DriverError::new(e.to_string()))
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| DriverError::new(e.to_string()))
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| DriverError::new(e.to_string()))
    }

    async fn release(&self) {}
}
