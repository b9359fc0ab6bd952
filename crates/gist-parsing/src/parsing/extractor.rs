//! Syntax-tree walk that turns source files into code blocks
//!
//! The extractor is grammar-agnostic: every language-specific decision comes
//! from the [`LanguageConfig`] lookup table. Containers (classes, structs,
//! impls) are emitted as blocks of their own *and* their member functions are
//! emitted separately, each tagged with the name of the nearest enclosing
//! container.

use crate::parsing::languages::{LanguageConfig, get_language_config};
use crate::{ParsingError, ParsingResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tree_sitter::{Node, Parser, Point, Tree};

/// Category of an extracted block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Function or method
    Function,
    /// Class, struct, impl, trait or other type definition
    Class,
}

impl BlockKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(Self::Function),
            "class" => Ok(Self::Class),
            other => Err(format!("unknown block kind: {other}")),
        }
    }
}

/// A contiguous, line-addressed slice of one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedBlock {
    /// Path of the originating file, relative to the indexing root
    pub source_path: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive; never less than `start_line`
    pub end_line: usize,
    pub kind: BlockKind,
    /// Verbatim source text of the block
    pub content: String,
    /// Name of the nearest enclosing container, if any
    pub enclosing_class: Option<String>,
    /// The block's own identifier, when the grammar exposes one
    pub name: Option<String>,
}

/// Extracts function and class blocks using the language registry
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockExtractor {
    tolerate_syntax_errors: bool,
}

impl BlockExtractor {
    pub const fn new() -> Self {
        Self {
            tolerate_syntax_errors: false,
        }
    }

    /// Extract from trees that contain error nodes instead of rejecting them
    #[must_use]
    pub const fn with_syntax_error_tolerance(mut self, tolerate: bool) -> Self {
        self.tolerate_syntax_errors = tolerate;
        self
    }

    /// Extract blocks from `content`, ordered by `(start_line, end_line)`
    ///
    /// Unsupported languages yield an empty list.
    ///
    /// # Errors
    /// Returns `ParsingError::Parse` if the source has syntax errors (unless
    /// tolerated) and `ParsingError::TreeSitter` if the grammar cannot be loaded.
    pub fn extract(
        &self,
        source_path: &str,
        content: &str,
        language: &str,
    ) -> ParsingResult<Vec<ExtractedBlock>> {
        let Some(config) = get_language_config(language) else {
            return Ok(Vec::new());
        };
        let Some(ts_language) = config.tree_sitter_language.as_ref() else {
            return Ok(Vec::new());
        };

        let mut parser = Parser::new();
        parser
            .set_language(ts_language)
            .map_err(|e| ParsingError::TreeSitter {
                language: language.to_string(),
                message: e.to_string(),
            })?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParsingError::parse_error(source_path, "parser produced no tree"))?;

        if tree.root_node().has_error() {
            let location = first_error_position(&tree)
                .map(|p| {
                    format!(
                        " at line {}, column {}",
                        p.row.saturating_add(1),
                        p.column.saturating_add(1)
                    )
                })
                .unwrap_or_default();

            if !self.tolerate_syntax_errors {
                return Err(ParsingError::parse_error(
                    source_path,
                    format!("syntax error{location}"),
                ));
            }
            tracing::warn!("Extracting from {source_path} despite syntax error{location}");
        }

        let mut blocks = walk(&tree, config, source_path, content)?;
        blocks.sort_by_key(|b| (b.start_line, b.end_line));

        tracing::debug!(
            "Extracted {} blocks from {source_path} ({language})",
            blocks.len()
        );
        Ok(blocks)
    }
}

/// Depth-first walk keeping a stack of open containers
fn walk(
    tree: &Tree,
    config: &LanguageConfig,
    source_path: &str,
    content: &str,
) -> ParsingResult<Vec<ExtractedBlock>> {
    let source = content.as_bytes();
    let mut blocks = Vec::new();
    // (node id, resolved name) for every container we are currently inside
    let mut containers: Vec<(usize, Option<String>)> = Vec::new();
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        let kind = node.kind();
        let enclosing_class = containers.last().and_then(|(_, name)| name.clone());

        if config.is_unit(kind) {
            blocks.push(make_block(
                node,
                BlockKind::Function,
                source_path,
                source,
                enclosing_class,
                unit_name(node, source),
            )?);
        } else if config.is_container(kind)
            && !(config.container_requires_body && node.child_by_field_name("body").is_none())
        {
            let name = container_name(node, config, source);
            blocks.push(make_block(
                node,
                BlockKind::Class,
                source_path,
                source,
                enclosing_class,
                name.clone(),
            )?);
            containers.push((node.id(), name));
        }

        if cursor.goto_first_child() {
            continue;
        }

        loop {
            let leaving = cursor.node().id();
            if containers.last().is_some_and(|(id, _)| *id == leaving) {
                containers.pop();
            }
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    Ok(blocks)
}

fn make_block(
    node: Node<'_>,
    kind: BlockKind,
    source_path: &str,
    source: &[u8],
    enclosing_class: Option<String>,
    name: Option<String>,
) -> ParsingResult<ExtractedBlock> {
    let content = node
        .utf8_text(source)
        .map_err(|e| ParsingError::parse_error(source_path, e.to_string()))?;
    let (start_line, end_line) = line_span(node);

    Ok(ExtractedBlock {
        source_path: source_path.to_string(),
        start_line,
        end_line,
        kind,
        content: content.to_string(),
        enclosing_class,
        name,
    })
}

/// 1-based inclusive line range of a node
///
/// A node that ends at column 0 of a later row stops on the previous line.
fn line_span(node: Node<'_>) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    let start_line = start.row.saturating_add(1);
    let end_line = if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row.saturating_add(1)
    };
    (start_line, end_line)
}

fn node_text(node: Node<'_>, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().map(ToString::to_string)
}

fn container_name(node: Node<'_>, config: &LanguageConfig, source: &[u8]) -> Option<String> {
    for field in config.container_name_fields {
        if let Some(name_node) = node.child_by_field_name(field) {
            return node_text(name_node, source);
        }
    }

    let mut cursor = node.walk();
    let fallback = node
        .named_children(&mut cursor)
        .find(|child| matches!(child.kind(), "identifier" | "type_identifier"));
    fallback.and_then(|child| node_text(child, source))
}

fn unit_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    if let Some(name_node) = node.child_by_field_name("name") {
        return node_text(name_node, source);
    }

    // C and C++ bury the identifier under one or more declarators
    let mut current = node.child_by_field_name("declarator");
    while let Some(declarator) = current {
        match declarator.child_by_field_name("declarator") {
            Some(inner) => current = Some(inner),
            None => return node_text(declarator, source),
        }
    }
    None
}

fn first_error_position(tree: &Tree) -> Option<Point> {
    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node.start_position());
        }
        // Only descend into subtrees that contain the error
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}
