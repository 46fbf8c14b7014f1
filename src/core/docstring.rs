use regex::Regex;

use super::cst::{NodeId, Symbol, SyntaxTree, TokenKind};

/// Extracts and normalizes docstrings from a body block.
///
/// Two sources are recognized: a bare string literal as the first
/// statement, and a comment block sitting in the trivia directly above the
/// first statement. A missing docstring is always legal; unrecognized
/// quoting yields none rather than an error.
pub struct DocstringExtractor {
    /// Regex stripping a comment marker and one following space
    comment_marker: Regex,
}

impl DocstringExtractor {
    pub fn new() -> Self {
        Self {
            comment_marker: Regex::new(r"^#\s?").expect("Invalid comment marker regex"),
        }
    }

    /// Docstring for a body block (or the file root for module scope).
    ///
    /// If the first statement is a bare string literal, its normalized
    /// text wins; otherwise the trivia above the first statement is
    /// scanned for an adjacent comment block.
    pub fn from_first_statement(&self, tree: &SyntaxTree, parent: NodeId) -> Option<String> {
        let node = tree
            .children(parent)
            .iter()
            .copied()
            .find(|&child| tree.is_interior(child))?;
        if tree.symbol(node) == Some(Symbol::SimpleStmt) {
            if let Some(&first) = tree.children(node).first() {
                if tree.token(first) == Some(TokenKind::String) {
                    return self.normalize(tree.value(first));
                }
            }
        }
        self.from_comment_block(tree, node)
    }

    /// Docstring for an assignment statement.
    ///
    /// The comment must sit directly on the line above: the trailing
    /// whitespace run of the preceding trivia has to contain exactly one
    /// newline, so a blank line between comment and statement defeats it.
    pub fn for_assignment(&self, tree: &SyntaxTree, stmt: NodeId) -> Option<String> {
        let prefix = most_recent_prefix(tree, stmt);
        let newlines = prefix
            .chars()
            .rev()
            .take_while(|c| c.is_whitespace())
            .filter(|&c| c == '\n')
            .count();
        if newlines == 1 {
            self.from_comment_block(tree, stmt)
        } else {
            None
        }
    }

    /// Collects the contiguous comment block directly above `anchor`.
    ///
    /// The final whitespace-only trivia segment (the statement's own
    /// indentation) is dropped, then lines are collected backward until a
    /// blank or non-comment line.
    pub fn from_comment_block(&self, tree: &SyntaxTree, anchor: NodeId) -> Option<String> {
        let prefix = most_recent_prefix(tree, anchor);
        let mut lines: Vec<&str> = prefix.split('\n').collect();
        if let Some(last) = lines.last() {
            if last.trim().is_empty() {
                lines.pop();
            }
        }
        let mut collected: Vec<&str> = Vec::new();
        for line in lines.iter().rev() {
            let trimmed = line.trim();
            if !trimmed.starts_with('#') {
                break;
            }
            collected.push(trimmed);
        }
        if collected.is_empty() {
            return None;
        }
        collected.reverse();
        self.normalize(&collected.join("\n"))
    }

    /// Normalizes raw docstring text: comment markers stripped per line,
    /// or quote delimiters removed and the body dedented. Unrecognized
    /// quoting yields `None`.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let s = raw.trim();
        if s.starts_with('#') {
            let text = s
                .lines()
                .map(|line| self.comment_marker.replace(line.trim(), "").into_owned())
                .collect::<Vec<_>>()
                .join("\n");
            let text = text.trim();
            return (!text.is_empty()).then(|| text.to_string());
        }
        let body = strip_quotes(s)?;
        let text = dedent_docstring(body);
        (!text.is_empty()).then_some(text)
    }
}

impl Default for DocstringExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    for delim in ["\"\"\"", "'''"] {
        if s.len() >= 6 && s.starts_with(delim) && s.ends_with(delim) {
            return Some(&s[3..s.len() - 3]);
        }
    }
    for delim in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(delim) && s.ends_with(delim) {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

/// First line trimmed, remaining lines dedented by their common leading
/// whitespace, whole result trimmed.
fn dedent_docstring(s: &str) -> String {
    let mut lines: Vec<&str> = s.split('\n').collect();
    let first = lines.remove(0).trim();
    let margin = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut out = vec![first.to_string()];
    for line in lines {
        if line.len() >= margin {
            out.push(line[margin..].to_string());
        } else {
            out.push(line.trim_start().to_string());
        }
    }
    out.join("\n").trim().to_string()
}

/// The trivia most recently seen before `id` in source order.
///
/// A node's own first-token trivia wins; otherwise the walk climbs to the
/// nearest ancestor with a previous sibling and descends to that subtree's
/// last token.
pub fn most_recent_prefix(tree: &SyntaxTree, id: NodeId) -> &str {
    if !tree.prefix(id).is_empty() {
        return tree.prefix(id);
    }
    let mut current = id;
    while tree.prev_sibling(current).is_none() && tree.prefix(current).is_empty() {
        match tree.parent(current) {
            Some(parent) => current = parent,
            None => return "",
        }
    }
    if !tree.prefix(current).is_empty() {
        return tree.prefix(current);
    }
    let mut current = match tree.prev_sibling(current) {
        Some(sibling) => sibling,
        None => return "",
    };
    while tree.is_interior(current) {
        match tree.children(current).last() {
            Some(&last) => current = last,
            None => break,
        }
    }
    tree.prefix(current)
}
