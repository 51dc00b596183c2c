//! # Parsing Python source into a tree of statements.
//!
//! The tree only keeps what tag extraction needs: where every statement
//! starts and ends, which statements are function or class declarations, and
//! which statements own an indented body that may hold more declarations.
//!
//! Parsing itself is done by tree-sitter's Python grammar. Any error or
//! missing node in its tree makes the whole source a syntax error.
use snafu::prelude::*;
use tree_sitter::{Node, Parser as TSParser};

use crate::{Error, LanguageSnafu, Result, SyntaxSnafu};

pub mod lex;
pub mod visit;

/// A range of bytes in the source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// The text this span covers, if it lies within `src` on character
    /// boundaries.
    ///
    /// ```rust
    /// use tag_finder_lib::syntax::Span;
    ///
    /// assert_eq!(Span::new(4, 9).render("def hello():"), Some("hello"));
    /// assert_eq!(Span::new(4, 90).render("def hello():"), None);
    /// ```
    pub fn render<'a>(&self, src: &'a str) -> Option<&'a str> {
        src.get(self.start..self.end)
    }
}

/// Maps byte offsets to 1-based line numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(src: &str) -> Self {
        let bytes = src.as_bytes();
        let mut starts = vec![0];
        for (n, b) in bytes.iter().enumerate() {
            let breaks = match b {
                b'\n' => true,
                b'\r' => bytes.get(n + 1) != Some(&b'\n'),
                _ => false,
            };
            if breaks {
                starts.push(n + 1);
            }
        }
        LineIndex {
            starts,
            len: src.len(),
        }
    }

    /// The line holding the byte at `offset`, or `None` if the offset is past
    /// the end of the source.
    ///
    /// ```rust
    /// use tag_finder_lib::syntax::LineIndex;
    ///
    /// let index = LineIndex::new("a\nb\r\nc");
    /// assert_eq!(index.line_of(0), Some(1));
    /// assert_eq!(index.line_of(2), Some(2));
    /// assert_eq!(index.line_of(5), Some(3));
    /// assert_eq!(index.line_of(60), None);
    /// ```
    pub fn line_of(&self, offset: usize) -> Option<usize> {
        if offset > self.len {
            return None;
        }
        Some(self.starts.partition_point(|&start| start <= offset))
    }

    /// Byte offset of the start of a 1-based line.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.starts.get(line.checked_sub(1)?).copied()
    }

    /// The text of a 1-based line, without its line ending, and where it
    /// starts.
    ///
    /// ```rust
    /// use tag_finder_lib::syntax::LineIndex;
    ///
    /// let src = "a\r\n  b\nc";
    /// let index = LineIndex::new(src);
    /// assert_eq!(index.line(src, 2), Some((3, "  b")));
    /// assert_eq!(index.line(src, 3), Some((7, "c")));
    /// assert_eq!(index.line(src, 4), None);
    /// ```
    pub fn line<'a>(&self, src: &'a str, line: usize) -> Option<(usize, &'a str)> {
        let start = self.line_start(line)?;
        let end = self.line_start(line + 1).unwrap_or(self.len);
        let text = src.get(start..end)?.trim_end_matches(['\r', '\n']);
        Some((start, text))
    }
}

/// A function or class declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Def {
    pub name: String,
    /// From the start of the line of the first comment directly above the
    /// declaration, or of its first decorator, or of its keyword, through the
    /// end of the body.
    pub span: Span,
    /// Offset of the `def`, `async` or `class` keyword.
    pub keyword: usize,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    Function(Def),
    Class(Def),
    /// Any other statement with an indented body, eg. `if`, `with` or `try`.
    Block { span: Span, body: Vec<Stmt> },
    Simple(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Function(def) | Stmt::Class(def) => def.span,
            Stmt::Block { span, .. } | Stmt::Simple(span) => *span,
        }
    }
}

/// A parsed source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    pub body: Vec<Stmt>,
}

fn is_compound(kind: &str) -> bool {
    matches!(
        kind,
        "if_statement"
            | "for_statement"
            | "while_statement"
            | "try_statement"
            | "with_statement"
            | "match_statement"
    )
}

/// The first error or missing node in document order.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children = node.children(&mut cursor).collect::<Vec<_>>();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

/// Builds statements out of a tree-sitter syntax tree.
struct TreeBuilder<'a, 'tree> {
    src: &'a str,
    index: LineIndex,
    root: Node<'tree>,
}

impl<'tree> TreeBuilder<'_, 'tree> {
    fn error(&self, node: Node<'_>, reason: impl Into<std::borrow::Cow<'static, str>>) -> Error {
        SyntaxSnafu {
            line: node.start_position().row + 1,
            reason,
        }
        .build()
    }

    /// The end of `node` with trailing whitespace trimmed.
    fn end_of(&self, node: Node<'_>) -> usize {
        let start = node.start_byte();
        let end = node.end_byte().min(self.src.len());
        self.src
            .get(start..end)
            .map_or(end, |text| start + text.trim_end().len())
    }

    /// Whether a `comment` node starts at `offset`, so that a line that looks
    /// like a comment is not inside a string.
    fn is_comment_at(&self, offset: usize) -> bool {
        self.root
            .descendant_for_byte_range(offset, offset + 1)
            .is_some_and(|node| node.kind() == "comment" && node.start_byte() == offset)
    }

    /// The offset of the first of the comment lines directly above the line
    /// holding `offset`, or the start of that line when there are none.
    fn leading_comments_start(&self, offset: usize) -> usize {
        let Some(mut line) = self.index.line_of(offset) else {
            return offset;
        };
        let mut start = self.index.line_start(line).unwrap_or(offset);
        while line > 1 {
            let Some((line_start, text)) = self.index.line(self.src, line - 1) else {
                break;
            };
            let Ok((_, (_, comment))) = lex::comment_line(text) else {
                break;
            };
            if !self.is_comment_at(line_start + text.len() - comment.len()) {
                break;
            }
            start = line_start;
            line -= 1;
        }
        start
    }

    /// Extend `end` over the comment lines that follow it at `indent` or
    /// deeper. Blank lines between them are allowed.
    fn trailing_comments_end(&self, end: usize, indent: usize) -> usize {
        let Some(mut line) = self.index.line_of(end) else {
            return end;
        };
        let mut new_end = end;
        while let Some((line_start, text)) = self.index.line(self.src, line + 1) {
            line += 1;
            if lex::is_blank(text) {
                continue;
            }
            match lex::comment_line(text) {
                Ok((_, (depth, comment)))
                    if depth >= indent
                        && self.is_comment_at(line_start + text.len() - comment.len()) =>
                {
                    new_end = line_start + text.len();
                }
                _ => break,
            }
        }
        new_end
    }

    /// Indentation of the first statement of an indented body, or `None`
    /// for a body on the same line as its header.
    fn body_indent(&self, header: Node<'_>, body: Node<'_>) -> Option<usize> {
        let mut cursor = body.walk();
        let first = body
            .named_children(&mut cursor)
            .find(|stmt| stmt.kind() != "comment")?;
        if first.start_position().row == header.start_position().row {
            return None;
        }
        let line = self.index.line_of(first.start_byte())?;
        let (_, text) = self.index.line(self.src, line)?;
        let (_, indent) = lex::indentation(text).ok()?;
        Some(indent)
    }

    fn statements(&self, block: Node<'tree>) -> Result<Vec<Stmt>> {
        let mut cursor = block.walk();
        let children = block.named_children(&mut cursor).collect::<Vec<_>>();
        let mut body = vec![];
        for child in children {
            match child.kind() {
                "comment" => {}
                "function_definition" | "class_definition" => {
                    body.push(self.definition(child, child)?)
                }
                "decorated_definition" => {
                    let def = child
                        .child_by_field_name("definition")
                        .context(SyntaxSnafu {
                            line: child.start_position().row + 1,
                            reason: "decorator must precede a function or class definition",
                        })?;
                    body.push(self.definition(child, def)?);
                }
                kind if is_compound(kind) => {
                    let span = Span::new(child.start_byte(), self.end_of(child));
                    body.push(Stmt::Block {
                        span,
                        body: self.nested(child)?,
                    });
                }
                _ => body.push(Stmt::Simple(Span::new(
                    child.start_byte(),
                    self.end_of(child),
                ))),
            }
        }
        Ok(body)
    }

    /// The statements of every block below a compound statement, eg. the
    /// branches of an `if`.
    fn nested(&self, node: Node<'tree>) -> Result<Vec<Stmt>> {
        let mut cursor = node.walk();
        let children = node.named_children(&mut cursor).collect::<Vec<_>>();
        let mut body = vec![];
        for child in children {
            if child.kind() == "block" {
                body.extend(self.statements(child)?);
            } else {
                body.extend(self.nested(child)?);
            }
        }
        Ok(body)
    }

    /// A declaration. `outer` is the decorated definition when there are
    /// decorators, otherwise the definition itself.
    fn definition(&self, outer: Node<'tree>, def: Node<'tree>) -> Result<Stmt> {
        let name = def
            .child_by_field_name("name")
            .and_then(|name| self.src.get(name.byte_range()))
            .with_context(|| SyntaxSnafu {
                line: def.start_position().row + 1,
                reason: format!("{} has no name", def.kind().replace('_', " ")),
            })?;

        let end = self.end_of(def);
        let (body, end) = match def.child_by_field_name("body") {
            Some(block) => {
                let end = match self.body_indent(def, block) {
                    Some(indent) => self.trailing_comments_end(end, indent),
                    None => end,
                };
                (self.statements(block)?, end)
            }
            None => (vec![], end),
        };

        let is_class = def.kind() == "class_definition";
        let def = Def {
            name: name.to_string(),
            span: Span::new(self.leading_comments_start(outer.start_byte()), end),
            keyword: def.start_byte(),
            body,
        };
        log::trace!("'{}' spans {:?}", def.name, def.span);
        Ok(if is_class {
            Stmt::Class(def)
        } else {
            Stmt::Function(def)
        })
    }
}

/// Parse a whole Python source file.
///
/// ```rust
/// use tag_finder_lib::syntax::*;
///
/// let src = "class Shape:\n    def area(self):\n        pass\n";
/// let module = parse_module(src).unwrap();
/// let Stmt::Class(shape) = &module.body[0] else {
///     panic!("expected a class");
/// };
/// assert_eq!(shape.name, "Shape");
/// assert_eq!(shape.span.render(src), Some(src.trim_end()));
/// assert!(matches!(&shape.body[0], Stmt::Function(area) if area.name == "area"));
/// ```
pub fn parse_module(src: &str) -> Result<Module> {
    let mut parser = TSParser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .context(LanguageSnafu)?;
    let tree = parser.parse(src, None).context(SyntaxSnafu {
        line: 1usize,
        reason: "the parser gave up",
    })?;

    let root = tree.root_node();
    let builder = TreeBuilder {
        src,
        index: LineIndex::new(src),
        root,
    };
    if let Some(node) = first_error(root).or_else(|| root.has_error().then_some(root)) {
        let reason = if node.is_missing() {
            format!("expected '{}'", node.kind())
        } else {
            "invalid syntax".to_string()
        };
        return Err(builder.error(node, reason));
    }

    let body = builder.statements(root)?;
    Ok(Module { body })
}
