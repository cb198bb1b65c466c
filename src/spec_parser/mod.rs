//! Parser for the indented declarative relation spec: depth from leading
//! spaces, relation-kind markers (`-`, `<`, `x`, `p <kind>`), and per-node
//! options matched to lines by declaration order.

use std::collections::HashSet;

mod ast;
mod errors;
mod line;

pub use ast::{ColumnSpec, Hook, NodeOptions, PolyType, RawNode, RelationKind};
pub use errors::SpecParseError;

/// One declarative spec: the indented text block plus the per-node options,
/// matched by flattened line order (line 0 is the root).
#[derive(Debug, Clone, Default)]
pub struct SpecBlock {
    pub text: String,
    pub options: Vec<NodeOptions>,
}

impl SpecBlock {
    pub fn new(text: impl Into<String>) -> Self {
        SpecBlock {
            text: text.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options(text: impl Into<String>, options: Vec<NodeOptions>) -> Self {
        SpecBlock {
            text: text.into(),
            options,
        }
    }

    /// Append the options for the next spec line.
    pub fn option(mut self, options: NodeOptions) -> Self {
        self.options.push(options);
        self
    }

    /// Import a sub-spec module: its lines are inserted after the spec line
    /// at `line_index` (counting non-blank lines, 0 = root), re-based to that
    /// line's indentation with the module's internal relative indentation
    /// preserved. The module's options are spliced into the options vector at
    /// the matching position.
    pub fn splice(&mut self, line_index: usize, module: SpecBlock) -> Result<(), SpecParseError> {
        let lines: Vec<&str> = self.text.lines().collect();
        let mut spec_line = 0;
        let mut anchor = None;
        for (i, raw) in lines.iter().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            if spec_line == line_index {
                anchor = Some(i);
                break;
            }
            spec_line += 1;
        }
        let anchor = anchor.ok_or_else(|| {
            let total = lines.iter().filter(|l| !l.trim().is_empty()).count();
            SpecParseError::SpliceOutOfRange(line_index, total)
        })?;
        let anchor_indent = indent_of(lines[anchor]);

        let module_lines: Vec<&str> = module
            .text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let common = module_lines
            .iter()
            .map(|l| indent_of(l))
            .min()
            .unwrap_or(0);
        let rebased: Vec<String> = module_lines
            .iter()
            .map(|l| {
                let relative = indent_of(l) - common;
                format!("{}{}", " ".repeat(anchor_indent + relative), l.trim_start())
            })
            .collect();

        let mut out: Vec<String> = lines.iter().map(|l| (*l).to_string()).collect();
        for (offset, inserted) in rebased.into_iter().enumerate() {
            out.insert(anchor + 1 + offset, inserted);
        }
        self.text = out.join("\n");

        while self.options.len() < line_index + 1 {
            self.options.push(NodeOptions::default());
        }
        for (offset, opts) in module.options.into_iter().enumerate() {
            self.options.insert(line_index + 1 + offset, opts);
        }
        Ok(())
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Parse a spec block into the flat line sequence, validated fail-fast
/// (tabs, misplaced markers, duplicate aliases, excess options).
pub fn parse_spec(block: &SpecBlock) -> Result<Vec<RawNode>, SpecParseError> {
    let mut nodes: Vec<RawNode> = Vec::new();
    let mut aliases: HashSet<String> = HashSet::new();

    for (index, raw_line) in block.text.lines().enumerate() {
        let lineno = index + 1;
        if raw_line.trim().is_empty() {
            continue;
        }
        let content = raw_line.trim_start();
        let leading = &raw_line[..raw_line.len() - content.len()];
        if leading.contains('\t') {
            return Err(SpecParseError::TabIndentation(lineno));
        }
        let depth = leading.len();
        let content = content.trim_end();

        let (kind, polymorphic, alias) = match line::parse_marker(content) {
            Ok((rest, (kind, polymorphic))) => (Some(kind), polymorphic, rest.trim()),
            Err(_) => (None, false, content),
        };

        if kind.is_none() {
            // A lone marker or a malformed `p` prefix would otherwise leak
            // through as an alias.
            if matches!(alias, "-" | "<" | "x" | "p") {
                return Err(SpecParseError::MissingAlias(lineno));
            }
            if alias.starts_with("p ") {
                return Err(SpecParseError::InvalidMarker(lineno, content.to_string()));
            }
        }
        if alias.is_empty() {
            return Err(SpecParseError::MissingAlias(lineno));
        }
        if nodes.is_empty() && kind.is_some() {
            return Err(SpecParseError::MarkedRoot(lineno));
        }
        if !nodes.is_empty() && kind.is_none() {
            return Err(SpecParseError::MissingMarker(lineno));
        }
        if !aliases.insert(alias.to_string()) {
            return Err(SpecParseError::DuplicateAlias(alias.to_string()));
        }

        nodes.push(RawNode {
            depth,
            alias: alias.to_string(),
            kind,
            polymorphic,
            options: NodeOptions::default(),
        });
    }

    if nodes.is_empty() {
        return Err(SpecParseError::EmptySpec);
    }
    if block.options.len() > nodes.len() {
        return Err(SpecParseError::TooManyOptions {
            supplied: block.options.len(),
            lines: nodes.len(),
        });
    }
    for (i, node) in nodes.iter_mut().enumerate() {
        if let Some(options) = block.options.get(i) {
            node.options = options.clone();
        }
    }
    Ok(nodes)
}
