/// Dialect descriptor: placeholder syntax and identifier quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    /// The driver-facing placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::MySql => "?".to_string(),
        }
    }

    /// Quote a single identifier segment, escaping embedded quote characters.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::Postgres => {
                format!(
                    "\"{}\"",
                    name.replace('\\', "\\\\").replace('"', "\"\"")
                )
            }
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
        }
    }

    /// Quote a dot-separated identifier path; the literal segment `*` passes
    /// through unquoted.
    pub fn quote_path(&self, path: &str) -> String {
        path.split('.')
            .map(|segment| {
                if segment == "*" {
                    segment.to_string()
                } else {
                    self.quote_identifier(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}
