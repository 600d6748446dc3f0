use std::fmt::Display;

use itertools::Itertools;
use ncdap_dds::Dds;

use crate::{Error, PathVar, Projection, Result, Selection};

/// Projections and selections together: one complete request expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraint {
    pub projections: Vec<Projection>,
    pub selections: Vec<Selection>,
}

impl Constraint {
    pub fn new(projections: Vec<Projection>, selections: Vec<Selection>) -> Self {
        Self {
            projections,
            selections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.projections.is_empty() && self.selections.is_empty()
    }

    /// Whether every projection selects a whole variable; selections are not considered.
    pub fn is_whole(&self) -> bool {
        self.projections.iter().all(Projection::is_whole)
    }

    /// Every variable path in the expression, selections included.
    pub fn vars_mut(&mut self) -> Vec<&mut PathVar> {
        let mut vars: Vec<&mut PathVar> = self
            .projections
            .iter_mut()
            .flat_map(Projection::vars_mut)
            .collect();
        vars.extend(self.selections.iter_mut().flat_map(Selection::vars_mut));
        vars
    }

    /// Drop every handle into the metadata tree, keeping names and slices.
    pub fn detach(&mut self) {
        for var in self.vars_mut() {
            var.detach();
        }
    }

    /// Re-resolve every fully qualified path by exact name against `dds`.
    ///
    /// Used after the tree an expression was resolved against has been replaced by a new one.
    pub fn attach(&mut self, dds: &Dds) -> Result<()> {
        for var in self.vars_mut() {
            let names = var
                .segments
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>();
            let leaf = dds.find(&names).ok_or_else(|| Error::NotFound { path: var.name() })?;
            for (seg, node) in var.segments.iter_mut().zip(dds.path_below_root(leaf)) {
                seg.node = Some(node);
            }
            var.leaf = Some(leaf);
        }
        Ok(())
    }
}

impl Display for Constraint {
    /// The textual constraint: comma separated projections, each selection prefixed by `&`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.projections.iter().format(","))?;
        for sel in &self.selections {
            write!(f, "&{sel}")?;
        }
        Ok(())
    }
}
