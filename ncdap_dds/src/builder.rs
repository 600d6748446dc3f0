use ncdap_id::NodeId;
use ncdap_types::NcType;

use crate::{Dds, Dimension, Error, Node, NodeKind, Result};

/// Incrementally assembles a [`Dds`].
///
/// This is the surface a metadata parser drives: one call per declaration, parents before
/// children.
///
/// # Example
/// ```
/// # use ncdap_dds::DdsBuilder;
/// # use ncdap_types::NcType;
/// let mut builder = DdsBuilder::new("ocean");
/// let root = builder.root();
/// let grid = builder.grid(root, "sst").unwrap();
/// builder.primitive(grid, "sst", NcType::Float, &[12, 90]).unwrap();
/// builder.primitive(grid, "time", NcType::Double, &[12]).unwrap();
/// builder.primitive(grid, "lat", NcType::Float, &[90]).unwrap();
/// let dds = builder.build();
/// assert_eq!(dds.full_name(dds.find(&["sst", "lat"]).unwrap()), "sst.lat");
/// ```
#[derive(Debug)]
pub struct DdsBuilder {
    nodes: Vec<Node>,
}

impl DdsBuilder {
    pub fn new(dataset_name: impl Into<String>) -> Self {
        let root = Node {
            id: NodeId::new(0),
            name: dataset_name.into(),
            kind: NodeKind::Dataset,
            nc_type: NcType::Nat,
            dims: vec![],
            container: None,
            children: vec![],
            string_dim: None,
            sequence_dim: None,
            is_virtual: false,
            visible: true,
        };
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn structure(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        dims: &[usize],
    ) -> Result<NodeId> {
        self.add(parent, name.into(), NodeKind::Structure, NcType::Nat, anonymous(dims))
    }

    pub fn grid(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId> {
        self.add(parent, name.into(), NodeKind::Grid, NcType::Nat, vec![])
    }

    /// A sequence; `records` is the record count exposed as its dimension, when known.
    pub fn sequence(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        records: Option<usize>,
    ) -> Result<NodeId> {
        let id = self.add(parent, name.into(), NodeKind::Sequence, NcType::Nat, vec![])?;
        let size = records.unwrap_or(0);
        self.nodes[id.index()].sequence_dim = Some(Dimension::named("records", size));
        Ok(id)
    }

    pub fn primitive(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        nc_type: NcType,
        dims: &[usize],
    ) -> Result<NodeId> {
        self.add(parent, name.into(), NodeKind::Primitive, nc_type, anonymous(dims))
    }

    /// Like [`Self::primitive`], with named dimensions.
    pub fn primitive_with_dims(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        nc_type: NcType,
        dims: Vec<Dimension>,
    ) -> Result<NodeId> {
        self.add(parent, name.into(), NodeKind::Primitive, nc_type, dims)
    }

    /// A string-typed primitive whose values are at most `max_len` characters long.
    pub fn string(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        dims: &[usize],
        max_len: usize,
    ) -> Result<NodeId> {
        let name = name.into();
        let strlen = format!("{name}_strlen");
        let id = self.add(parent, name, NodeKind::Primitive, NcType::String, anonymous(dims))?;
        self.nodes[id.index()].string_dim = Some(Dimension::named(strlen, max_len));
        Ok(id)
    }

    /// Mark a node as absent from fetched payloads.
    pub fn set_virtual(&mut self, id: NodeId) -> Result<()> {
        self.get_mut(id)?.is_virtual = true;
        Ok(())
    }

    /// Hide a node (and so its subtree) from containment queries.
    pub fn set_hidden(&mut self, id: NodeId) -> Result<()> {
        self.get_mut(id)?.visible = false;
        Ok(())
    }

    pub fn build(self) -> Dds {
        Dds { nodes: self.nodes }
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(Error::UnknownNode(id))
    }

    fn add(
        &mut self,
        parent: NodeId,
        name: String,
        kind: NodeKind,
        nc_type: NcType,
        dims: Vec<Dimension>,
    ) -> Result<NodeId> {
        let id = NodeId::new(self.nodes.len() as u32);
        let p = self.get_mut(parent)?;
        if !p.kind.is_container() {
            return Err(Error::NotAContainer {
                name: p.name.clone(),
                kind: p.kind,
            });
        }
        if p.kind == NodeKind::Grid && kind != NodeKind::Primitive {
            return Err(Error::GridMember {
                grid: p.name.clone(),
            });
        }
        p.children.push(id);
        self.nodes.push(Node {
            id,
            name,
            kind,
            nc_type,
            dims,
            container: Some(parent),
            children: vec![],
            string_dim: None,
            sequence_dim: None,
            is_virtual: false,
            visible: true,
        });
        Ok(id)
    }
}

fn anonymous(dims: &[usize]) -> Vec<Dimension> {
    dims.iter().copied().map(Dimension::anonymous).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Dds {
        let mut b = DdsBuilder::new("ds");
        let root = b.root();
        let s = b.structure(root, "s", &[4]).unwrap();
        b.primitive(s, "x", NcType::Int, &[3]).unwrap();
        b.string(s, "label", &[2], 8).unwrap();
        let seq = b.sequence(root, "obs", Some(10)).unwrap();
        b.primitive(seq, "depth", NcType::Float, &[]).unwrap();
        b.primitive(root, "scalar", NcType::Double, &[]).unwrap();
        b.build()
    }

    #[test]
    fn paths_and_dims() {
        let dds = sample();
        let x = dds.find(&["s", "x"]).unwrap();
        assert_eq!(dds.full_name(x), "s.x");
        assert_eq!(dds.path(x).len(), 3);
        assert_eq!(dds.full_dims(x), vec![4, 3]);
        assert_eq!(dds.element_count(x), 12);

        let label = dds.find(&["s", "label"]).unwrap();
        assert_eq!(dds.full_dims(label), vec![4, 2, 8]);
        assert_eq!(dds.node(label).local_rank(), 2);
        assert_eq!(dds.element_count(label), 8);

        let depth = dds.find(&["obs", "depth"]).unwrap();
        assert!(dds.is_in_sequence(depth));
        assert!(!dds.is_in_sequence(x));
        assert_eq!(dds.full_dims(depth), vec![10]);
        assert_eq!(dds.node(dds.find(&["obs"]).unwrap()).local_rank(), 1);
    }

    #[test]
    fn containment_respects_visibility() {
        let mut b = DdsBuilder::new("ds");
        let root = b.root();
        let s = b.structure(root, "s", &[]).unwrap();
        let x = b.primitive(s, "x", NcType::Int, &[2]).unwrap();
        let y = b.primitive(root, "y", NcType::Int, &[2]).unwrap();
        let mut hidden = DdsBuilder::new("ds");
        let hr = hidden.root();
        let hs = hidden.structure(hr, "s", &[]).unwrap();
        let hx = hidden.primitive(hs, "x", NcType::Int, &[2]).unwrap();
        hidden.set_hidden(hs).unwrap();

        let dds = b.build();
        assert!(dds.contains(s, x));
        assert!(dds.contains(x, x));
        assert!(!dds.contains(s, y));
        assert!(!dds.contains(x, s));

        let hidden = hidden.build();
        assert!(!hidden.contains(hs, hx));
        assert_eq!(hidden.variables().count(), 0);
    }

    #[test]
    fn builder_rejects_bad_parents() {
        let mut b = DdsBuilder::new("ds");
        let root = b.root();
        let x = b.primitive(root, "x", NcType::Int, &[2]).unwrap();
        let err = b.primitive(x, "y", NcType::Int, &[2]).unwrap_err();
        assert_eq!(err.to_string(), "a primitive node ('x') cannot contain other nodes");
        let g = b.grid(root, "g").unwrap();
        assert!(matches!(
            b.structure(g, "s", &[]),
            Err(Error::GridMember { .. })
        ));
        assert!(matches!(
            b.set_virtual(NodeId::new(99)),
            Err(Error::UnknownNode(_))
        ));
    }

    #[test]
    fn serde_round_trip() {
        let dds = sample();
        let json = serde_json::to_string(&dds).unwrap();
        let back: Dds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dds);
    }
}
