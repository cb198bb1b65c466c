use serde_json::Value;

/// Internal placeholder token. Fragments stay dialect-neutral until
/// [`Composer::finalize`](super::Composer::finalize) rewrites every token
/// into the driver's placeholder syntax.
pub const PLACEHOLDER: &str = "??";

/// An immutable SQL fragment: text with `??` placeholders plus the bound
/// parameters in placeholder order.
///
/// The `Injection` variant is the poison value: it means some composition was
/// unsafe or ambiguous, and it taints every merge it participates in. A query
/// containing it fails closed before any I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum Sql {
    Fragment { text: String, params: Vec<Value> },
    Injection,
}

impl Sql {
    pub fn empty() -> Self {
        Sql::Fragment {
            text: String::new(),
            params: Vec::new(),
        }
    }

    pub fn fragment(text: impl Into<String>, params: Vec<Value>) -> Self {
        Sql::Fragment {
            text: text.into(),
            params,
        }
    }

    /// A literal text fragment with no bound parameters.
    pub fn raw(text: impl Into<String>) -> Self {
        Sql::fragment(text, Vec::new())
    }

    pub fn injection() -> Self {
        Sql::Injection
    }

    pub fn is_injection(&self) -> bool {
        matches!(self, Sql::Injection)
    }

    /// True for a fragment with no text (an `Injection` is never empty).
    pub fn is_empty(&self) -> bool {
        matches!(self, Sql::Fragment { text, .. } if text.is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Sql::Fragment { text, .. } => Some(text),
            Sql::Injection => None,
        }
    }

    pub fn params(&self) -> &[Value] {
        match self {
            Sql::Fragment { params, .. } => params,
            Sql::Injection => &[],
        }
    }
}

impl Default for Sql {
    fn default() -> Self {
        Sql::empty()
    }
}

/// One interpolated slot of a composition, decided at the API boundary:
/// either a plain bind value or a fragment to splice.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Value(Value),
    Frag(Sql),
}

impl From<Value> for SqlArg {
    fn from(v: Value) -> Self {
        SqlArg::Value(v)
    }
}

impl From<Sql> for SqlArg {
    fn from(sql: Sql) -> Self {
        SqlArg::Frag(sql)
    }
}

/// Concatenate fragments with `sep`, splicing parameter lists in order.
/// Empty texts contribute no separator; any `Injection` poisons the result.
/// The merged text is whitespace-normalized (runs collapse to one space) so
/// fragments can be written as multi-line literals.
pub fn merge<I>(parts: I, sep: &str) -> Sql
where
    I: IntoIterator<Item = Sql>,
{
    let mut text = String::new();
    let mut params = Vec::new();
    for part in parts {
        match part {
            Sql::Injection => return Sql::Injection,
            Sql::Fragment { text: t, params: p } => {
                if !t.is_empty() {
                    if !text.is_empty() {
                        text.push_str(sep);
                    }
                    text.push_str(&t);
                }
                params.extend(p);
            }
        }
    }
    Sql::Fragment {
        text: normalize_whitespace(&text),
        params,
    }
}

fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            in_run = true;
        } else {
            if in_run && !out.is_empty() {
                out.push(' ');
            }
            in_run = false;
            out.push(ch);
        }
    }
    out
}
