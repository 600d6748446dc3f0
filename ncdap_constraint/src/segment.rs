use std::fmt::Display;

use ncdap_dds::{Dds, NodeId};

use crate::Slice;

/// One component of a variable path and how it is sliced.
///
/// `node` is a non-owning handle into the metadata tree, set by resolution. A segment whose
/// slices were never written (`slices_defined == false`) selects the whole node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub node: Option<NodeId>,
    pub slices: Vec<Slice>,
    pub slices_defined: bool,
}

impl Segment {
    /// An unresolved, unsliced path component.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node: None,
            slices: vec![],
            slices_defined: false,
        }
    }

    /// An unresolved path component with explicit slices.
    pub fn with_slices(name: impl Into<String>, slices: Vec<Slice>) -> Self {
        Self {
            name: name.into(),
            node: None,
            slices,
            slices_defined: true,
        }
    }

    /// The resolved segment selecting every element of `node`, pseudo dimensions included.
    pub fn whole(dds: &Dds, node: NodeId) -> Self {
        let n = dds.node(node);
        Self {
            name: n.name().to_string(),
            node: Some(node),
            slices: n.local_dims().into_iter().map(Slice::whole).collect(),
            slices_defined: true,
        }
    }

    pub fn rank(&self) -> usize {
        self.slices.len()
    }

    /// Whether the segment selects its node entirely.
    pub fn is_whole(&self) -> bool {
        !self.slices_defined || self.slices.iter().all(Slice::is_whole)
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.is_whole() {
            for slice in &self.slices {
                write!(f, "{slice}")?;
            }
        }
        Ok(())
    }
}
