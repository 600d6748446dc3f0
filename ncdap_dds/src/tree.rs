use std::fmt::Display;

use ncdap_id::NodeId;
use ncdap_types::NcType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Dataset,
    Structure,
    Grid,
    Sequence,
    Primitive,
}

impl NodeKind {
    /// Kinds that group other nodes.
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Primitive)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Dataset => "dataset",
            Self::Structure => "structure",
            Self::Grid => "grid",
            Self::Sequence => "sequence",
            Self::Primitive => "primitive",
        };
        f.write_str(s)
    }
}

/// A declared dimension: an optional name and its full size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: Option<String>,
    pub size: usize,
}

impl Dimension {
    pub fn anonymous(size: usize) -> Self {
        Self { name: None, size }
    }

    pub fn named(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: Some(name.into()),
            size,
        }
    }
}

impl From<usize> for Dimension {
    fn from(size: usize) -> Self {
        Self::anonymous(size)
    }
}

impl From<(&str, usize)> for Dimension {
    fn from((name, size): (&str, usize)) -> Self {
        Self::named(name, size)
    }
}

/// One node of the metadata tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) nc_type: NcType,
    pub(crate) dims: Vec<Dimension>,
    pub(crate) container: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Maximum length of string values, exposed as a trailing character dimension.
    pub(crate) string_dim: Option<Dimension>,
    /// Record count of a sequence, exposed as a dimension of the sequence itself.
    pub(crate) sequence_dim: Option<Dimension>,
    /// Present in the metadata tree but absent from fetched payloads.
    pub(crate) is_virtual: bool,
    pub(crate) visible: bool,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Element type; [`NcType::Nat`] for containers.
    pub fn nc_type(&self) -> NcType {
        self.nc_type
    }

    /// Declared dimensions, not counting the pseudo dimensions.
    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn string_dim(&self) -> Option<&Dimension> {
        self.string_dim.as_ref()
    }

    pub fn sequence_dim(&self) -> Option<&Dimension> {
        self.sequence_dim.as_ref()
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Sizes of every dimension this node contributes to a path: declared dimensions first, then
    /// the sequence and string pseudo dimensions.
    pub fn local_dims(&self) -> Vec<usize> {
        self.dims
            .iter()
            .chain(self.sequence_dim.as_ref())
            .chain(self.string_dim.as_ref())
            .map(|d| d.size)
            .collect()
    }

    pub fn local_rank(&self) -> usize {
        self.dims.len()
            + usize::from(self.sequence_dim.is_some())
            + usize::from(self.string_dim.is_some())
    }
}

/// The metadata tree of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dds {
    pub(crate) nodes: Vec<Node>,
}

impl Dds {
    /// The dataset node; always the first node in the arena.
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Look up a node by handle.
    ///
    /// # Panics
    ///
    /// If `id` was not issued by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handles from the dataset root down to `id`, both included.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.get(current).and_then(Node::container) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Handles from the first node below the dataset root down to `id`.
    pub fn path_below_root(&self, id: NodeId) -> Vec<NodeId> {
        self.path(id)
            .into_iter()
            .filter(|n| self.node(*n).kind != NodeKind::Dataset)
            .collect()
    }

    /// Dot separated name of `id`, without the dataset name.
    pub fn full_name(&self, id: NodeId) -> String {
        self.path_below_root(id)
            .into_iter()
            .map(|n| self.node(n).name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Dimension sizes along the path to `id`, pseudo dimensions included.
    pub fn full_dims(&self, id: NodeId) -> Vec<usize> {
        self.path_below_root(id)
            .into_iter()
            .flat_map(|n| self.node(n).local_dims())
            .collect()
    }

    /// Whether `id` lies in the subtree of `ancestor` (or is it), with every node on the way
    /// visible.
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            let Some(node) = self.get(n) else {
                return false;
            };
            if !node.visible {
                return false;
            }
            if n == ancestor {
                return true;
            }
            current = node.container;
        }
        false
    }

    /// Every primitive leaf reachable through visible nodes, in arena order.
    pub fn variables(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Primitive && self.contains(self.root(), n.id))
            .map(|n| n.id)
    }

    /// Whether any container above `id` is a sequence.
    pub fn is_in_sequence(&self, id: NodeId) -> bool {
        self.path(id)
            .into_iter()
            .filter(|n| *n != id)
            .any(|n| self.node(n).kind == NodeKind::Sequence)
    }

    /// Number of data elements `id` holds, counting declared dimensions along its path only.
    pub fn element_count(&self, id: NodeId) -> usize {
        self.path_below_root(id)
            .into_iter()
            .flat_map(|n| self.node(n).dims.iter().map(|d| d.size))
            .product()
    }

    /// Exact lookup of a dot path below the root.
    pub fn find(&self, names: &[&str]) -> Option<NodeId> {
        let mut current = self.root();
        for name in names {
            current = self
                .node(current)
                .children
                .iter()
                .copied()
                .find(|c| self.node(*c).name == *name)?;
        }
        Some(current)
    }
}
