use std::fmt::Display;

use itertools::Itertools;
use ncdap_dds::{Dds, NodeId};

use crate::Segment;

/// A variable path: one segment per component, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathVar {
    pub segments: Vec<Segment>,
    /// The node the last segment resolves to.
    pub leaf: Option<NodeId>,
}

impl PathVar {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            leaf: None,
        }
    }

    /// An unsliced path from its component names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Segment::new).collect())
    }

    /// The fully qualified whole-variable path to `node`.
    pub fn whole(dds: &Dds, node: NodeId) -> Self {
        Self {
            segments: dds
                .path_below_root(node)
                .into_iter()
                .map(|n| Segment::whole(dds, n))
                .collect(),
            leaf: Some(node),
        }
    }

    pub fn is_whole(&self) -> bool {
        self.segments.iter().all(Segment::is_whole)
    }

    /// Dot separated component names, without slices.
    pub fn name(&self) -> String {
        self.segments.iter().map(|s| s.name.as_str()).join(".")
    }

    /// Drop every resolved handle.
    pub fn detach(&mut self) {
        self.leaf = None;
        for seg in &mut self.segments {
            seg.node = None;
        }
    }
}

impl Display for PathVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.iter().format("."))
    }
}

/// A server-side function applied to its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Value>,
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().format(","))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
        }
    }
}

/// An operand of a selection or a function argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(Constant),
    Var(PathVar),
    Function(FunctionCall),
}

impl Value {
    pub fn var(&self) -> Option<&PathVar> {
        match self {
            Self::Var(v) => Some(v),
            _ => None,
        }
    }

    /// Every variable path this operand mentions, function arguments included.
    pub fn vars_mut(&mut self) -> Vec<&mut PathVar> {
        match self {
            Self::Constant(_) => vec![],
            Self::Var(v) => vec![v],
            Self::Function(call) => call.args.iter_mut().flat_map(Self::vars_mut).collect(),
        }
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Self::Constant(c)
    }
}

impl From<PathVar> for Value {
    fn from(v: PathVar) -> Self {
        Self::Var(v)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(c) => c.fmt(f),
            Self::Var(v) => v.fmt(f),
            Self::Function(call) => call.fmt(f),
        }
    }
}

/// What to retrieve: a (sliced) variable path, or a function call whose result is retrieved.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Var(PathVar),
    Function(FunctionCall),
}

impl Projection {
    /// An unsliced variable projection from its component names.
    pub fn path<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Var(PathVar::from_names(names))
    }

    /// The fully qualified whole-variable projection of `node`.
    pub fn whole(dds: &Dds, node: NodeId) -> Self {
        Self::Var(PathVar::whole(dds, node))
    }

    pub fn var(&self) -> Option<&PathVar> {
        match self {
            Self::Var(v) => Some(v),
            Self::Function(_) => None,
        }
    }

    pub fn var_mut(&mut self) -> Option<&mut PathVar> {
        match self {
            Self::Var(v) => Some(v),
            Self::Function(_) => None,
        }
    }

    pub fn leaf(&self) -> Option<NodeId> {
        self.var().and_then(|v| v.leaf)
    }

    /// A variable projection that selects its leaf entirely.
    pub fn is_whole(&self) -> bool {
        self.var().is_some_and(PathVar::is_whole)
    }

    /// Every variable path this projection mentions.
    pub fn vars_mut(&mut self) -> Vec<&mut PathVar> {
        match self {
            Self::Var(v) => vec![v],
            Self::Function(call) => call.args.iter_mut().flat_map(Value::vars_mut).collect(),
        }
    }
}

impl From<PathVar> for Projection {
    fn from(v: PathVar) -> Self {
        Self::Var(v)
    }
}

impl Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Var(v) => v.fmt(f),
            Self::Function(call) => call.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Slice;

    #[test]
    fn display() {
        let var = PathVar::new(vec![
            Segment::new("g"),
            Segment::with_slices("x", vec![Slice::new(0, 2, 8), Slice::new(3, 1, 3)]),
        ]);
        assert_eq!(var.to_string(), "g.x[0:2:8][3]");
        assert_eq!(var.name(), "g.x");

        let call = Projection::Function(FunctionCall {
            name: "geogrid".into(),
            args: vec![
                Value::Var(PathVar::from_names(["sst"])),
                Constant::Float(62.5).into(),
                Constant::Int(-10).into(),
                Constant::Str(r#"say "hi""#.into()).into(),
            ],
        });
        assert_eq!(call.to_string(), r#"geogrid(sst,62.5,-10,"say \"hi\"")"#);
        assert!(!call.is_whole());
        assert!(Projection::path(["a", "b"]).is_whole());
    }
}
