//! Scripted in-memory drivers for the loader tests: canned result sets
//! matched by SQL substring, with a recorded statement log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use nestql::{DriverError, Row, SqlConnection, SqlDriver, SqlPool};

/// Capture `log::debug!` SQL output in test runs.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rows_from(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => map,
                other => panic!("scripted rows must be objects, got {other}"),
            })
            .collect(),
        other => panic!("scripted result must be an array, got {other}"),
    }
}

#[derive(Default)]
pub struct MockDriver {
    scripts: Vec<(String, Vec<Row>)>,
    failures: Vec<(String, String)>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `rows` (a JSON array of objects) for any statement whose text
    /// contains `pattern`. First matching script wins.
    pub fn on(mut self, pattern: &str, rows: Value) -> Self {
        self.scripts.push((pattern.to_string(), rows_from(rows)));
        self
    }

    /// Fail any statement whose text contains `pattern`.
    pub fn fail_on(mut self, pattern: &str, message: &str) -> Self {
        self.failures.push((pattern.to_string(), message.to_string()));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn params_of(&self, pattern: &str) -> Option<Vec<Value>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .find(|(text, _)| text.contains(pattern))
            .map(|(_, params)| params.clone())
    }
}

#[async_trait]
impl SqlDriver for MockDriver {
    async fn execute(&self, text: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        self.log
            .lock()
            .unwrap()
            .push((text.to_string(), params.to_vec()));
        for (pattern, message) in &self.failures {
            if text.contains(pattern.as_str()) {
                return Err(DriverError::new(message.clone()));
            }
        }
        for (pattern, rows) in &self.scripts {
            if text.contains(pattern.as_str()) {
                return Ok(rows.clone());
            }
        }
        Ok(Vec::new())
    }
}

/// Pool handing out connections that share one statement log, so the
/// BEGIN/COMMIT/ROLLBACK sequencing stays observable after the transaction
/// is consumed.
#[derive(Default)]
pub struct MockPool {
    scripts: Vec<(String, Vec<Row>)>,
    pub statements: Arc<Mutex<Vec<String>>>,
    pub released: Arc<AtomicBool>,
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, pattern: &str, rows: Value) -> Self {
        self.scripts.push((pattern.to_string(), rows_from(rows)));
        self
    }

    pub fn statement_log(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn was_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlDriver for MockPool {
    async fn execute(&self, text: &str, _params: &[Value]) -> Result<Vec<Row>, DriverError> {
        panic!("pool executed '{text}' outside a transaction connection");
    }
}

#[async_trait]
impl SqlPool for MockPool {
    async fn acquire(&self) -> Result<Box<dyn SqlConnection>, DriverError> {
        Ok(Box::new(MockConnection {
            scripts: self.scripts.clone(),
            statements: Arc::clone(&self.statements),
            released: Arc::clone(&self.released),
        }))
    }
}

struct MockConnection {
    scripts: Vec<(String, Vec<Row>)>,
    statements: Arc<Mutex<Vec<String>>>,
    released: Arc<AtomicBool>,
}

impl MockConnection {
    fn record(&self, text: &str) {
        self.statements.lock().unwrap().push(text.to_string());
    }
}

#[async_trait]
impl SqlDriver for MockConnection {
    async fn execute(&self, text: &str, _params: &[Value]) -> Result<Vec<Row>, DriverError> {
        self.record(text);
        for (pattern, rows) in &self.scripts {
            if text.contains(pattern.as_str()) {
                return Ok(rows.clone());
            }
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl SqlConnection for MockConnection {
    async fn begin(&self) -> Result<(), DriverError> {
        self.record("BEGIN");
        Ok(())
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.record("COMMIT");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.record("ROLLBACK");
        Ok(())
    }

    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
