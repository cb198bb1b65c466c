//! Debug options, passed explicitly at loader construction. No process-wide
//! mutable state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Emit every executed statement at `info` level instead of `debug`.
    pub log_sql: bool,
    /// Annotate driver errors with the offending SQL text and parameters.
    pub error_with_sql: bool,
}
