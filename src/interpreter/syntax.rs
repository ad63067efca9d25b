//! Indentation-structured document syntax
//!
//! A document is a sequence of lines. Each non-blank line is either a block
//! header or a `Key: Value` entry; a header owns every following line that
//! is indented strictly deeper.
//!
//! ```text
//! ReactionSystem:                          Block [ReactionSystem]
//!     MineralReaction Calcite:             └─ Block [MineralReaction, Calcite]
//!         Equation: -1:Calcite -1:H+ ...      ├─ Entry [Equation] = "-1:Calcite -1:H+ ..."
//!         Mechanism Acid:                     └─ Block [Mechanism, Acid]
//!             ActivityPower H+: 1.0              └─ Entry [ActivityPower, H+] = "1.0"
//! ```
//!
//! Rules:
//! - `#` starts a comment that runs to the end of the line
//! - blank lines are ignored
//! - indentation is spaces only; siblings share the same indentation
//! - a line ending in `:` is a header; so is a line without `:` that opens
//!   a body (`Plot 2` followed by deeper lines)
//! - an entry never opens a body

use crate::error::SyntaxError;
use std::fmt;

/// Indentation of the canonical form.
const CANONICAL_INDENT: usize = 4;

// =================================================================================================
// Tree
// =================================================================================================

/// A node of the syntax tree.
///
/// Equality compares structure only; line numbers are ignored.
#[derive(Debug, Clone)]
pub enum SyntaxNode {
    Block(Block),
    Entry(Entry),
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SyntaxNode::Block(a), SyntaxNode::Block(b)) => a == b,
            (SyntaxNode::Entry(a), SyntaxNode::Entry(b)) => a == b,
            _ => false,
        }
    }
}

impl SyntaxNode {
    /// 1-based line of the node.
    pub fn line(&self) -> usize {
        match self {
            SyntaxNode::Block(block) => block.line,
            SyntaxNode::Entry(entry) => entry.line,
        }
    }
}

/// A header with its body.
#[derive(Debug, Clone)]
pub struct Block {
    /// Header tokens, e.g. `["MineralReaction", "Calcite"]`.
    pub header: Vec<String>,
    /// Body, in document order.
    pub children: Vec<SyntaxNode>,
    /// 1-based line of the header.
    pub line: usize,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.children == other.children
    }
}

impl Block {
    /// First header token.
    pub fn keyword(&self) -> &str {
        self.header.first().map_or("", String::as_str)
    }

    /// Remaining header tokens joined by a space, if any.
    pub fn argument(&self) -> Option<String> {
        (self.header.len() > 1).then(|| self.header[1..].join(" "))
    }

    /// Header as written, e.g. `Plot 1`.
    pub fn title(&self) -> String {
        self.header.join(" ")
    }

    /// Child blocks.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.children.iter().filter_map(|node| match node {
            SyntaxNode::Block(block) => Some(block),
            SyntaxNode::Entry(_) => None,
        })
    }

    /// Child entries.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.children.iter().filter_map(|node| match node {
            SyntaxNode::Entry(entry) => Some(entry),
            SyntaxNode::Block(_) => None,
        })
    }

    /// First child block whose keyword is `keyword`.
    pub fn block(&self, keyword: &str) -> Option<&Block> {
        self.blocks().find(|b| b.keyword() == keyword)
    }

    /// First child entry whose key is exactly `key`.
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries().find(|e| e.key.len() == 1 && e.key[0] == key)
    }
}

/// A `Key: Value` line.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Key tokens, e.g. `["ActivityPower", "H+"]`.
    pub key: Vec<String>,
    /// Value text, trimmed.
    pub value: String,
    /// 1-based line.
    pub line: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl Entry {
    /// First key token.
    pub fn keyword(&self) -> &str {
        self.key.first().map_or("", String::as_str)
    }

    /// Remaining key tokens joined by a space, if any.
    pub fn argument(&self) -> Option<String> {
        (self.key.len() > 1).then(|| self.key[1..].join(" "))
    }

    /// Whitespace-separated value tokens.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.value.split_whitespace()
    }
}

/// A parsed document: its top-level nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub nodes: Vec<SyntaxNode>,
}

impl Document {
    /// Top-level blocks.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.nodes.iter().filter_map(|node| match node {
            SyntaxNode::Block(block) => Some(block),
            SyntaxNode::Entry(_) => None,
        })
    }
}

// =================================================================================================
// Parser
// =================================================================================================

struct Line<'a> {
    number: usize,
    indent: usize,
    text: &'a str,
}

/// Header or entry, before looking at the next line.
enum Head {
    Header(Vec<String>),
    Entry(Vec<String>, String),
    Bare(Vec<String>),
}

fn split_line(line: &Line<'_>) -> Result<Head, SyntaxError> {
    let Some((key, value)) = line.text.split_once(':') else {
        return Ok(Head::Bare(line.text.split_whitespace().map(str::to_string).collect()));
    };

    let tokens: Vec<String> = key.split_whitespace().map(str::to_string).collect();
    if tokens.is_empty() {
        return Err(SyntaxError::new(line.number, "missing name before ':'"));
    }

    let value = value.trim();
    if value.is_empty() { Ok(Head::Header(tokens)) } else { Ok(Head::Entry(tokens, value.to_string())) }
}

fn significant_lines(text: &str) -> Result<Vec<Line<'_>>, SyntaxError> {
    let mut lines = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let number = i + 1;
        let content = raw.split_once('#').map_or(raw, |(before, _)| before).trim_end();
        if content.trim().is_empty() {
            continue;
        }

        let body = content.trim_start();
        let leading = &content[..content.len() - body.len()];
        if leading.contains('\t') {
            return Err(SyntaxError::new(number, "tab in indentation; use spaces"));
        }

        lines.push(Line { number, indent: leading.len(), text: body });
    }
    Ok(lines)
}

fn parse_level(lines: &[Line<'_>], pos: &mut usize, indent: usize) -> Result<Vec<SyntaxNode>, SyntaxError> {
    let mut nodes = Vec::new();

    while let Some(line) = lines.get(*pos) {
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(SyntaxError::new(
                line.number,
                format!("unexpected indentation of {} (expected {})", line.indent, indent),
            ));
        }
        *pos += 1;

        let head = split_line(line)?;
        let body_indent = lines.get(*pos).map(|next| next.indent).filter(|&next| next > indent);

        let node = match (head, body_indent) {
            (Head::Entry(key, value), None) => SyntaxNode::Entry(Entry { key, value, line: line.number }),
            (Head::Entry(key, _), Some(_)) => {
                return Err(SyntaxError::new(
                    line.number,
                    format!("entry '{}' has a value and cannot open a body", key.join(" ")),
                ));
            }
            (Head::Header(header), None) => SyntaxNode::Block(Block { header, children: Vec::new(), line: line.number }),
            (Head::Bare(tokens), None) => {
                return Err(SyntaxError::new(line.number, format!("expected ':' after '{}'", tokens.join(" "))));
            }
            (Head::Header(header) | Head::Bare(header), Some(child_indent)) => {
                let children = parse_level(lines, pos, child_indent)?;
                SyntaxNode::Block(Block { header, children, line: line.number })
            }
        };
        nodes.push(node);
    }

    Ok(nodes)
}

/// Parse a document.
///
/// # Errors
///
/// [`SyntaxError`] with the offending line for tabs in indentation, an entry
/// followed by deeper lines, an inconsistent dedent, or a line that is
/// neither a header nor an entry.
///
/// ```rust
/// use kinpath::interpreter::syntax::{parse, SyntaxNode};
///
/// let document = parse("KineticPath:\n    From: 0\n    To: 1 month\n").unwrap();
/// let path = document.blocks().next().unwrap();
/// assert_eq!(path.keyword(), "KineticPath");
/// assert_eq!(path.entry("To").unwrap().value, "1 month");
/// ```
pub fn parse(text: &str) -> Result<Document, SyntaxError> {
    let lines = significant_lines(text)?;
    let nodes = parse_level(&lines, &mut 0, 0)?;
    Ok(Document { nodes })
}

// =================================================================================================
// Canonical form
// =================================================================================================

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[SyntaxNode], depth: usize) -> fmt::Result {
    let pad = " ".repeat(depth * CANONICAL_INDENT);
    for node in nodes {
        match node {
            SyntaxNode::Block(block) => {
                writeln!(f, "{}{}:", pad, block.header.join(" "))?;
                write_nodes(f, &block.children, depth + 1)?;
            }
            SyntaxNode::Entry(entry) => writeln!(f, "{}{}: {}", pad, entry.key.join(" "), entry.value)?,
        }
    }
    Ok(())
}

/// Canonical text: four-space indentation, single spaces between tokens,
/// no comments. Parsing it yields an equal tree.
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.nodes, 0)
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
ChemicalSystem:
    Database: supcrt98.xml   # built-in
    AqueousPhase:
        Species: H2O(l) H+ OH- Ca+2 HCO3-
    MineralPhases: Calcite

ReactionSystem:
    MineralReaction Calcite:
        Equation: -1:Calcite -1:H+ 1:Ca+2 1:HCO3-
        Mechanism Acid:
            RateConstant: 10**(-0.30) mol/(m2*s)
            ActivityPower H+: 1.0

KineticPath:
    Plot 1:
        x: t:month
        y: pH
";

    #[test]
    fn test_tree_shape() {
        let document = parse(SAMPLE).unwrap();
        let blocks: Vec<&Block> = document.blocks().collect();
        assert_eq!(blocks.len(), 3);

        let system = blocks[0];
        assert_eq!(system.line, 2);
        assert_eq!(system.entry("Database").unwrap().value, "supcrt98.xml");
        assert_eq!(system.block("AqueousPhase").unwrap().entry("Species").unwrap().values().count(), 5);

        let calcite = blocks[1].block("MineralReaction").unwrap();
        assert_eq!(calcite.argument().as_deref(), Some("Calcite"));
        let acid = calcite.block("Mechanism").unwrap();
        let power = acid.entries().find(|e| e.keyword() == "ActivityPower").unwrap();
        assert_eq!(power.argument().as_deref(), Some("H+"));
        assert_eq!(power.value, "1.0");

        let plot = blocks[2].block("Plot").unwrap();
        assert_eq!(plot.title(), "Plot 1");
        assert_eq!(plot.entry("x").unwrap().value, "t:month");
    }

    #[test]
    fn test_canonical_form_is_idempotent() {
        let document = parse(SAMPLE).unwrap();
        let canonical = document.to_string();
        let reparsed = parse(&canonical).unwrap();

        assert_eq!(reparsed, document);
        assert_eq!(reparsed.to_string(), canonical);
    }

    #[test]
    fn test_header_without_colon() {
        let document = parse("Plot 2\n  x: t\n  y: pH\n").unwrap();
        let plot = document.blocks().next().unwrap();
        assert_eq!(plot.header, vec!["Plot", "2"]);
        assert_eq!(parse(&document.to_string()).unwrap(), document);
    }

    #[test]
    fn test_sibling_blocks_with_same_keyword() {
        let document = parse("A:\n  Plot 1:\n    x: t\n  Plot 2:\n    x: t\n").unwrap();
        let a = document.blocks().next().unwrap();
        let titles: Vec<String> = a.blocks().map(Block::title).collect();
        assert_eq!(titles, vec!["Plot 1", "Plot 2"]);
    }

    #[test]
    fn test_empty_header_block() {
        let document = parse("InertSpecies:\nKineticPath:\n    From: 0\n").unwrap();
        assert_eq!(document.blocks().count(), 2);
        assert!(document.blocks().next().unwrap().children.is_empty());
    }

    #[test]
    fn test_inconsistent_dedent() {
        let error = parse("A:\n    b: 1\n  c: 2\n").unwrap_err();
        assert_eq!(error.line, 3);
    }

    #[test]
    fn test_unexpected_indentation() {
        let error = parse("A:\n    b: 1\n        c: 2\n").unwrap_err();
        assert_eq!(error.line, 2);
        assert!(error.message.contains("cannot open a body"));

        let error = parse("   A: 1\n").unwrap_err();
        assert_eq!(error.line, 1);
    }

    #[test]
    fn test_tabs_rejected() {
        let error = parse("A:\n\tb: 1\n").unwrap_err();
        assert_eq!(error.line, 2);
        assert!(error.message.contains("tab"));
    }

    #[test]
    fn test_bare_line_without_body() {
        let error = parse("A:\n    just words\n").unwrap_err();
        assert_eq!(error.line, 2);
    }

    #[test]
    fn test_missing_key() {
        assert!(parse(": value\n").is_err());
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let document = parse("# header\n\nA:   # trailing\n\n    b: 1 # note\n").unwrap();
        let a = document.blocks().next().unwrap();
        assert_eq!(a.entry("b").unwrap().value, "1");
        assert_eq!(a.entry("b").unwrap().line, 5);
    }
}
