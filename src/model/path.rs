//! Instance paths used in error reports.
//!
//! Rendered in instance-identifier form, e.g.
//! `/rfc2:top/protocols/ospf/area[name='0.0.0.0']`. The module prefix is only
//! written where it differs from the parent's.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    prefix: String,
    name: String,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Key(String, String),
    Value(String),
}

/// Path from the tree root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataPath {
    segments: Vec<Segment>,
}

impl DataPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to a container or leaf child.
    pub fn child(&self, prefix: &str, name: &str) -> Self {
        self.extend(prefix, name, Vec::new())
    }

    /// Path to a list entry identified by its key values.
    pub fn entry<'a>(
        &self,
        prefix: &str,
        name: &str,
        keys: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let predicates = keys
            .into_iter()
            .map(|(k, v)| Predicate::Key(k.to_string(), v.to_string()))
            .collect();
        self.extend(prefix, name, predicates)
    }

    /// Path to a leaf-list value.
    pub fn value(&self, prefix: &str, name: &str, value: &str) -> Self {
        self.extend(prefix, name, vec![Predicate::Value(value.to_string())])
    }

    fn extend(&self, prefix: &str, name: &str, predicates: Vec<Predicate>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            prefix: prefix.to_string(),
            name: name.to_string(),
            predicates,
        });
        Self { segments }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if value.contains('\'') {
        write!(f, "\"{}\"", value)
    } else {
        write!(f, "'{}'", value)
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        let mut current_prefix: Option<&str> = None;
        for segment in &self.segments {
            f.write_str("/")?;
            if current_prefix != Some(segment.prefix.as_str()) {
                write!(f, "{}:", segment.prefix)?;
                current_prefix = Some(segment.prefix.as_str());
            }
            f.write_str(&segment.name)?;
            for predicate in &segment.predicates {
                match predicate {
                    Predicate::Key(key, value) => {
                        write!(f, "[{}=", key)?;
                        write_literal(f, value)?;
                        f.write_str("]")?;
                    }
                    Predicate::Value(value) => {
                        f.write_str("[.=")?;
                        write_literal(f, value)?;
                        f.write_str("]")?;
                    }
                }
            }
        }
        Ok(())
    }
}
