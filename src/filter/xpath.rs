//! Path expressions: an XPath subset over configuration trees.
//!
//! Supported: absolute location paths with child (`/`) and descendant (`//`)
//! steps, `name`, `prefix:name`, `*` and `prefix:*` name tests, position
//! predicates (`[1]`, `[last()]`, `[last()-1]`), value predicates
//! (`[name='eth0']`, `[a/b='x']`, `[.='42']`), existence predicates
//! (`[mtu]`) and unions (`/a | /b`).
//!
//! An unprefixed name matches nodes of any namespace with that local name.

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::filter::selection::{children_at, descendants, node_at, Selection};
use crate::model::{ConfigTree, DataNode};
use crate::schema::Schema;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathSyntaxError {
    #[error("empty path expression")]
    Empty,
    #[error("path must be absolute (start with '/') at offset {0}")]
    ExpectedRoot(usize),
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unclosed string literal starting at offset {0}")]
    UnclosedString(usize),
    #[error("invalid number at offset {0}")]
    InvalidNumber(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    /// Any depth below the context node.
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    Any,
    AnyInPrefix(String),
    Name { prefix: Option<String>, local: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// 1-based position among the step's candidates.
    Position(usize),
    /// `last()` minus `offset`.
    Last { offset: usize },
    /// Some node reached by `path` (self when empty) has value `literal`.
    Equals { path: Vec<NameTest>, literal: String },
    Exists(Vec<NameTest>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub test: NameTest,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPath {
    pub steps: Vec<Step>,
}

/// A parsed path expression: a union of absolute location paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    source: String,
    paths: Vec<LocationPath>,
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PathExpr {
    pub fn parse(input: &str) -> Result<Self, PathSyntaxError> {
        let paths = PathParser::parse(input)?;
        Ok(Self {
            source: input.trim().to_string(),
            paths,
        })
    }

    /// Index paths of every node the expression selects.
    pub fn evaluate(&self, schema: &Schema, tree: &ConfigTree) -> Selection {
        let mut selection = Selection::new();
        for path in &self.paths {
            selection.extend(eval_location_path(schema, tree.roots(), path));
        }
        selection
    }

    /// The selected nodes themselves, in document order.
    pub fn select_nodes<'t>(&self, schema: &Schema, tree: &'t ConfigTree) -> Vec<&'t DataNode> {
        self.evaluate(schema, tree)
            .iter()
            .filter_map(|path| node_at(tree.roots(), path))
            .collect()
    }
}

impl NameTest {
    fn matches(&self, node: &DataNode, schema: &Schema) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::AnyInPrefix(prefix) => {
                schema.resolve_namespace(prefix) == Some(node.name.namespace.as_str())
            }
            NameTest::Name { prefix, local } => {
                if node.name.name != *local {
                    return false;
                }
                match prefix {
                    Some(p) => schema.resolve_namespace(p) == Some(node.name.namespace.as_str()),
                    None => true,
                }
            }
        }
    }
}

fn eval_location_path(schema: &Schema, roots: &[DataNode], path: &LocationPath) -> Vec<Vec<usize>> {
    if path.steps.is_empty() {
        return (0..roots.len()).map(|i| vec![i]).collect();
    }

    let mut context: Vec<Vec<usize>> = vec![Vec::new()];
    for step in &path.steps {
        let parents = match step.axis {
            Axis::Child => context,
            Axis::Descendant => {
                let mut all: BTreeSet<Vec<usize>> = BTreeSet::new();
                for ctx in &context {
                    let mut below = Vec::new();
                    descendants(roots, ctx, &mut below);
                    all.insert(ctx.clone());
                    all.extend(below);
                }
                all.into_iter().collect()
            }
        };

        let mut next = BTreeSet::new();
        for parent in parents {
            let children = children_at(roots, &parent);
            let mut candidates: Vec<usize> = children
                .iter()
                .enumerate()
                .filter(|(_, c)| step.test.matches(c, schema))
                .map(|(i, _)| i)
                .collect();
            for predicate in &step.predicates {
                candidates = apply_predicate(schema, predicate, candidates, children);
            }
            for index in candidates {
                let mut selected = parent.clone();
                selected.push(index);
                next.insert(selected);
            }
        }
        context = next.into_iter().collect();
    }
    context
}

fn apply_predicate(
    schema: &Schema,
    predicate: &Predicate,
    candidates: Vec<usize>,
    siblings: &[DataNode],
) -> Vec<usize> {
    match predicate {
        Predicate::Position(n) => nth(candidates, *n),
        Predicate::Last { offset } => match candidates.len().checked_sub(*offset) {
            Some(position) => nth(candidates, position),
            None => Vec::new(),
        },
        Predicate::Equals { path, literal } => candidates
            .into_iter()
            .filter(|i| {
                relative_nodes(schema, &siblings[*i], path)
                    .iter()
                    .any(|n| n.value.as_deref() == Some(literal.as_str()))
            })
            .collect(),
        Predicate::Exists(path) => candidates
            .into_iter()
            .filter(|i| !relative_nodes(schema, &siblings[*i], path).is_empty())
            .collect(),
    }
}

fn nth(candidates: Vec<usize>, position: usize) -> Vec<usize> {
    position
        .checked_sub(1)
        .and_then(|i| candidates.get(i).copied())
        .into_iter()
        .collect()
}

fn relative_nodes<'t>(schema: &Schema, node: &'t DataNode, path: &[NameTest]) -> Vec<&'t DataNode> {
    let mut frontier = vec![node];
    for test in path {
        frontier = frontier
            .into_iter()
            .flat_map(|n| n.children.iter())
            .filter(|c| test.matches(c, schema))
            .collect();
    }
    frontier
}

/// Hand-written recursive-descent parser.
struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn parse(input: &'a str) -> Result<Vec<LocationPath>, PathSyntaxError> {
        let mut parser = Self { input, pos: 0 };
        parser.skip_whitespace();
        if parser.is_at_end() {
            return Err(PathSyntaxError::Empty);
        }

        let mut paths = Vec::new();
        loop {
            parser.skip_whitespace();
            paths.push(parser.parse_location_path()?);
            parser.skip_whitespace();
            match parser.peek() {
                Some('|') => parser.advance(),
                None => break,
                Some(ch) => {
                    return Err(PathSyntaxError::UnexpectedChar { ch, pos: parser.pos })
                }
            }
        }
        Ok(paths)
    }

    fn parse_location_path(&mut self) -> Result<LocationPath, PathSyntaxError> {
        if self.peek() != Some('/') {
            return Err(PathSyntaxError::ExpectedRoot(self.pos));
        }
        self.advance();

        let mut steps = Vec::new();
        self.skip_whitespace();
        if matches!(self.peek(), None | Some('|')) {
            return Ok(LocationPath { steps });
        }

        loop {
            let axis = if self.peek() == Some('/') {
                self.advance();
                Axis::Descendant
            } else {
                Axis::Child
            };
            self.skip_whitespace();
            steps.push(self.parse_step(axis)?);
            self.skip_whitespace();
            if self.peek() == Some('/') {
                self.advance();
            } else {
                break;
            }
        }
        Ok(LocationPath { steps })
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step, PathSyntaxError> {
        let test = self.parse_name_test()?;
        let mut predicates = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('[') {
                break;
            }
            predicates.push(self.parse_predicate()?);
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_name_test(&mut self) -> Result<NameTest, PathSyntaxError> {
        if self.peek() == Some('*') {
            self.advance();
            return Ok(NameTest::Any);
        }
        let first = self.parse_identifier()?;
        if self.peek() != Some(':') {
            return Ok(NameTest::Name {
                prefix: None,
                local: first,
            });
        }
        self.advance();
        if self.peek() == Some('*') {
            self.advance();
            return Ok(NameTest::AnyInPrefix(first));
        }
        let local = self.parse_identifier()?;
        Ok(NameTest::Name {
            prefix: Some(first),
            local,
        })
    }

    fn parse_predicate(&mut self) -> Result<Predicate, PathSyntaxError> {
        self.expect('[')?;
        self.skip_whitespace();

        let predicate = match self.peek() {
            Some(c) if c.is_ascii_digit() => Predicate::Position(self.parse_number()?),
            Some('.') => {
                self.advance();
                self.skip_whitespace();
                self.expect('=')?;
                self.skip_whitespace();
                Predicate::Equals {
                    path: Vec::new(),
                    literal: self.parse_literal()?,
                }
            }
            Some(_) if self.peek_str("last(") => {
                self.pos += "last(".len();
                self.skip_whitespace();
                self.expect(')')?;
                self.skip_whitespace();
                let offset = if self.peek() == Some('-') {
                    self.advance();
                    self.skip_whitespace();
                    self.parse_number()?
                } else {
                    0
                };
                Predicate::Last { offset }
            }
            Some(_) => {
                let mut path = vec![self.parse_name_test()?];
                while self.peek() == Some('/') {
                    self.advance();
                    path.push(self.parse_name_test()?);
                }
                self.skip_whitespace();
                if self.peek() == Some('=') {
                    self.advance();
                    self.skip_whitespace();
                    Predicate::Equals {
                        path,
                        literal: self.parse_literal()?,
                    }
                } else {
                    Predicate::Exists(path)
                }
            }
            None => return Err(PathSyntaxError::UnexpectedEnd),
        };

        self.skip_whitespace();
        self.expect(']')?;
        Ok(predicate)
    }

    fn parse_literal(&mut self) -> Result<String, PathSyntaxError> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                let start = self.pos;
                self.advance();
                let body_start = self.pos;
                while let Some(c) = self.peek() {
                    if c == quote {
                        let literal = self.input[body_start..self.pos].to_string();
                        self.advance();
                        return Ok(literal);
                    }
                    self.advance();
                }
                Err(PathSyntaxError::UnclosedString(start))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let start = self.pos;
                self.advance();
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.advance();
                }
                Ok(self.input[start..self.pos].to_string())
            }
            Some(ch) => Err(PathSyntaxError::UnexpectedChar { ch, pos: self.pos }),
            None => Err(PathSyntaxError::UnexpectedEnd),
        }
    }

    fn parse_number(&mut self) -> Result<usize, PathSyntaxError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| PathSyntaxError::InvalidNumber(start))
    }

    fn parse_identifier(&mut self) -> Result<String, PathSyntaxError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => self.advance(),
            Some(ch) => return Err(PathSyntaxError::UnexpectedChar { ch, pos: self.pos }),
            None => return Err(PathSyntaxError::UnexpectedEnd),
        }
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            self.advance();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect(&mut self, expected: char) -> Result<(), PathSyntaxError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(PathSyntaxError::UnexpectedChar { ch, pos: self.pos }),
            None => Err(PathSyntaxError::UnexpectedEnd),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QName;
    use crate::schema::{LeafType, Module, SchemaNode};

    const NS: &str = "urn:rfc2";

    fn q(name: &str) -> QName {
        QName::new(NS, name)
    }

    fn schema() -> Schema {
        Schema::new(vec![Module::new(
            "rfc2",
            NS,
            [SchemaNode::container("top").with_children([SchemaNode::list("area", ["name"])
                .with_children([
                    SchemaNode::leaf("name", LeafType::string()),
                    SchemaNode::leaf_list("tag", LeafType::string()),
                ])])],
        )
        .with_prefix("r2")])
        .unwrap()
    }

    fn tree() -> ConfigTree {
        let area = |name: &str, tags: &[&str]| {
            DataNode::list_entry(q("area"))
                .with_child(DataNode::leaf(q("name"), name))
                .with_children(tags.iter().map(|t| DataNode::leaf_list_entry(q("tag"), *t)))
        };
        ConfigTree::from_roots(vec![DataNode::container(q("top")).with_children([
            area("0.0.0.0", &["a"]),
            area("0.0.0.1", &["b", "c"]),
        ])])
    }

    fn select(expr: &str) -> Vec<Vec<usize>> {
        PathExpr::parse(expr)
            .unwrap()
            .evaluate(&schema(), &tree())
            .into_iter()
            .collect()
    }

    #[test]
    fn position_last_and_key_agree() {
        let expected = vec![vec![0, 0]];
        assert_eq!(select("/top/area[1]"), expected);
        assert_eq!(select("/top/area[last()-1]"), expected);
        assert_eq!(select("/top/area[name='0.0.0.0']"), expected);
        assert_eq!(select("/top/area[last()]"), vec![vec![0, 1]]);
    }

    #[test]
    fn prefixes_resolve_by_name_or_prefix() {
        assert_eq!(select("/rfc2:top/r2:area[r2:name=\"0.0.0.1\"]"), vec![vec![0, 1]]);
        assert!(select("/other:top").is_empty());
        assert_eq!(select("/r2:*").len(), 1);
    }

    #[test]
    fn descendant_and_self_value() {
        assert_eq!(select("//tag[.='c']"), vec![vec![0, 1, 2]]);
        assert_eq!(select("//area/tag").len(), 3);
        assert_eq!(select("//tag[1]").len(), 2);
    }

    #[test]
    fn union_is_deduplicated_in_document_order() {
        assert_eq!(
            select("/top/area[2] | /top/area[1] | /top/area[name='0.0.0.0']"),
            vec![vec![0, 0], vec![0, 1]]
        );
    }

    #[test]
    fn existence_and_out_of_range() {
        assert_eq!(select("/top/area[tag='b']"), vec![vec![0, 1]]);
        assert_eq!(select("/top/area[tag]").len(), 2);
        assert!(select("/top/area[3]").is_empty());
        assert!(select("/top/area[last()-5]").is_empty());
        assert!(select("/top/area[0]").is_empty());
    }

    #[test]
    fn root_only_selects_everything() {
        assert_eq!(select("/"), vec![vec![0]]);
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(PathExpr::parse("  "), Err(PathSyntaxError::Empty));
        assert!(matches!(PathExpr::parse("top/area"), Err(PathSyntaxError::ExpectedRoot(0))));
        assert!(matches!(
            PathExpr::parse("/top/area[name='x"),
            Err(PathSyntaxError::UnclosedString(_))
        ));
        assert!(matches!(PathExpr::parse("/top/area[1"), Err(PathSyntaxError::UnexpectedEnd)));
        assert!(matches!(
            PathExpr::parse("/top/area]"),
            Err(PathSyntaxError::UnexpectedChar { ch: ']', .. })
        ));
    }
}
