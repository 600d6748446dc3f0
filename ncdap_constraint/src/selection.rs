use std::fmt::Display;

use itertools::Itertools;

use crate::{PathVar, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Regex,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Regex => "=~",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server-side filter `lhs op rhs`; a multi-valued `rhs` matches if any value does.
///
/// Selections are forwarded to the server and never evaluated locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub lhs: Value,
    pub op: Operator,
    pub rhs: Vec<Value>,
}

impl Selection {
    pub fn new(lhs: impl Into<Value>, op: Operator, rhs: Vec<Value>) -> Self {
        Self {
            lhs: lhs.into(),
            op,
            rhs,
        }
    }

    /// Every variable path mentioned on either side.
    pub fn vars_mut(&mut self) -> Vec<&mut PathVar> {
        let mut vars = self.lhs.vars_mut();
        vars.extend(self.rhs.iter_mut().flat_map(Value::vars_mut));
        vars
    }
}

impl Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.lhs, self.op)?;
        match self.rhs.as_slice() {
            [single] => write!(f, "{single}"),
            many => write!(f, "{{{}}}", many.iter().format(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Constant;

    #[test]
    fn display() {
        let single = Selection::new(
            PathVar::from_names(["obs", "depth"]),
            Operator::Ge,
            vec![Constant::Float(10.5).into()],
        );
        assert_eq!(single.to_string(), "obs.depth>=10.5");

        let many = Selection::new(
            PathVar::from_names(["station"]),
            Operator::Eq,
            vec![
                Constant::Str("a".into()).into(),
                Constant::Str("b".into()).into(),
            ],
        );
        assert_eq!(many.to_string(), r#"station={"a","b"}"#);
        assert_eq!(Operator::Regex.to_string(), "=~");
    }
}
