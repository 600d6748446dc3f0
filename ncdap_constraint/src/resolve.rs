//! Binding expression paths to nodes of a metadata tree.
//!
//! A path may name only the tail of a variable's full name (`x` for `s.x`). Resolution finds
//! the candidate nodes whose full path ends with the written components, and qualification then
//! rewrites the path into its fully qualified form with every slice sized against the tree.
use ncdap_dds::{Dds, Node, NodeId, NodeKind};
use tracing::debug;

use crate::{Constraint, Error, PathVar, Result, Segment, Slice};

/// Find the single node `var` names.
///
/// Candidates are the non-dataset nodes named like the last segment. A candidate matches if the
/// written segments equal the tail of its full path, name by name, with each written rank
/// compatible with the node it lands on. Several matches resolve to the one with the strictly
/// shortest full path; a tie for the shortest is ambiguous.
pub fn resolve_suffix(dds: &Dds, var: &PathVar) -> Result<NodeId> {
    let Some(last) = var.segments.last() else {
        return Err(Error::NotFound { path: var.name() });
    };

    let mut matches: Vec<(NodeId, usize)> = vec![];
    for node in dds
        .nodes()
        .filter(|n| n.kind() != NodeKind::Dataset && n.name() == last.name)
    {
        let path = dds.path_below_root(node.id());
        let Some(start) = path.len().checked_sub(var.segments.len()) else {
            continue;
        };
        let is_match = var.segments.iter().zip(&path[start..]).all(|(seg, id)| {
            let n = dds.node(*id);
            n.name() == seg.name && rank_matches(n, seg)
        });
        if is_match {
            matches.push((node.id(), path.len()));
        }
    }

    let Some(shortest) = matches.iter().map(|(_, len)| *len).min() else {
        return Err(Error::NotFound { path: var.name() });
    };
    let mut best = matches.iter().filter(|(_, len)| *len == shortest);
    match (best.next(), best.next()) {
        (Some((id, _)), None) => Ok(*id),
        _ => {
            let candidates = matches
                .iter()
                .filter(|(_, len)| *len == shortest)
                .map(|(id, _)| dds.full_name(*id))
                .collect::<Vec<_>>();
            debug!(path = %var.name(), ?candidates, "ambiguous variable path");
            Err(Error::Ambiguous {
                path: var.name(),
                candidates,
            })
        }
    }
}

/// A written rank of zero always matches; a sequence takes exactly its record index; anything
/// else takes its declared rank, optionally followed by its pseudo dimensions.
fn rank_matches(node: &Node, seg: &Segment) -> bool {
    let rank = if seg.slices_defined { seg.rank() } else { 0 };
    rank == 0
        || match node.kind() {
            NodeKind::Sequence => rank == 1,
            _ => rank == node.dims().len() || rank == node.local_rank(),
        }
}

/// Rewrite `var`, already known to name `leaf`, into its fully qualified form.
///
/// Missing ancestors are prepended as whole segments, every segment gets its node handle, and
/// every slice gets its declared size. Unsliced segments become whole, and pseudo dimensions
/// the expression left out are appended whole.
pub fn qualify(dds: &Dds, var: &mut PathVar, leaf: NodeId) -> Result<()> {
    let path = dds.path_below_root(leaf);
    let Some(missing) = path.len().checked_sub(var.segments.len()) else {
        return Err(Error::NotFound { path: var.name() });
    };

    let mut segments = Vec::with_capacity(path.len());
    segments.extend(path[..missing].iter().map(|n| Segment::whole(dds, *n)));
    for (seg, node) in std::mem::take(&mut var.segments)
        .into_iter()
        .zip(&path[missing..])
    {
        segments.push(qualify_segment(dds, seg, *node)?);
    }
    var.segments = segments;
    var.leaf = Some(leaf);
    Ok(())
}

fn qualify_segment(dds: &Dds, mut seg: Segment, id: NodeId) -> Result<Segment> {
    let node = dds.node(id);
    if !seg.slices_defined || seg.slices.is_empty() {
        return Ok(Segment::whole(dds, id));
    }

    let local = node.local_dims();
    let declared = match node.kind() {
        NodeKind::Sequence => 1,
        _ => node.dims().len(),
    };
    let given = seg.slices.len();
    if given != declared && given != local.len() {
        return Err(Error::RankMismatch {
            name: dds.full_name(id),
            expected: declared,
            actual: given,
        });
    }

    for (dim, (slice, size)) in seg.slices.iter_mut().zip(&local).enumerate() {
        // A size of zero is an unknown record count; only the server can bound it.
        if *size > 0 && slice.stop > *size {
            return Err(Error::OutOfBounds {
                name: dds.full_name(id),
                dim,
                start: slice.first,
                count: slice.count,
                stride: slice.stride,
                size: *size,
            });
        }
        slice.declsize = *size;
    }
    seg.slices
        .extend(local[given..].iter().map(|size| Slice::whole(*size)));
    seg.node = Some(id);
    Ok(seg)
}

/// Resolve and qualify every variable path of `constraint`, selections included.
pub fn map_constraint(dds: &Dds, constraint: &mut Constraint) -> Result<()> {
    for var in constraint.vars_mut() {
        let leaf = resolve_suffix(dds, var)?;
        qualify(dds, var, leaf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Projection;
    use ncdap_dds::DdsBuilder;
    use ncdap_types::NcType;
    use pretty_assertions::assert_eq;

    /// ```text
    /// ds
    ///   x[4]
    ///   g { x[4] }
    ///   a { g { x[4] } }
    ///   b { g { x[4] } }
    ///   name[3] (string, 8 chars)
    ///   obs (sequence) { depth }
    /// ```
    fn dds() -> Dds {
        let mut b = DdsBuilder::new("ds");
        let root = b.root();
        b.primitive(root, "x", NcType::Float, &[4]).unwrap();
        let g = b.structure(root, "g", &[]).unwrap();
        b.primitive(g, "x", NcType::Float, &[4]).unwrap();
        for outer in ["a", "b"] {
            let o = b.structure(root, outer, &[]).unwrap();
            let g = b.structure(o, "g", &[]).unwrap();
            b.primitive(g, "x", NcType::Float, &[4]).unwrap();
        }
        b.string(root, "name", &[3], 8).unwrap();
        let obs = b.sequence(root, "obs", Some(20)).unwrap();
        b.primitive(obs, "depth", NcType::Double, &[]).unwrap();
        b.build()
    }

    fn resolve(dds: &Dds, names: &[&str]) -> Result<String> {
        resolve_suffix(dds, &PathVar::from_names(names.iter().copied())).map(|id| dds.full_name(id))
    }

    #[test_log::test]
    fn shortest_path_wins() {
        let dds = dds();
        assert_eq!(resolve(&dds, &["x"]).unwrap(), "x");
        assert_eq!(resolve(&dds, &["g", "x"]).unwrap(), "g.x");
        assert_eq!(resolve(&dds, &["a", "g", "x"]).unwrap(), "a.g.x");
    }

    #[test_log::test]
    fn equal_length_matches_are_ambiguous() {
        let mut b = DdsBuilder::new("ds");
        let root = b.root();
        for outer in ["a", "b"] {
            let o = b.structure(root, outer, &[]).unwrap();
            b.primitive(o, "x", NcType::Int, &[]).unwrap();
        }
        let dds = b.build();

        let err = resolve(&dds, &["x"]).unwrap_err();
        assert_eq!(
            err,
            Error::Ambiguous {
                path: "x".into(),
                candidates: vec!["a.x".into(), "b.x".into()],
            }
        );
        assert_eq!(resolve(&dds, &["b", "x"]).unwrap(), "b.x");
    }

    #[test]
    fn missing_names() {
        let dds = dds();
        assert!(matches!(resolve(&dds, &["nope"]), Err(Error::NotFound { .. })));
        assert!(matches!(resolve(&dds, &["q", "x"]), Err(Error::NotFound { .. })));
        assert!(matches!(
            resolve_suffix(&dds, &PathVar::new(vec![])),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn written_rank_filters_candidates() {
        let dds = dds();
        let var = PathVar::new(vec![Segment::with_slices(
            "x",
            vec![Slice::new(0, 1, 1), Slice::new(0, 1, 1)],
        )]);
        assert!(matches!(resolve_suffix(&dds, &var), Err(Error::NotFound { .. })));

        let var = PathVar::new(vec![Segment::with_slices("obs", vec![Slice::new(0, 1, 4)])]);
        assert_eq!(dds.full_name(resolve_suffix(&dds, &var).unwrap()), "obs");
    }

    #[test]
    fn qualification_fills_in_the_path() {
        let dds = dds();
        let mut c = Constraint::new(
            vec![
                Projection::Var(PathVar::new(vec![
                    Segment::new("a"),
                    Segment::new("g"),
                    Segment::with_slices("x", vec![Slice::new(1, 2, 3)]),
                ])),
                Projection::Var(PathVar::new(vec![Segment::with_slices(
                    "name",
                    vec![Slice::new(2, 1, 2)],
                )])),
            ],
            vec![],
        );
        map_constraint(&dds, &mut c).unwrap();
        assert_eq!(c.to_string(), "a.g.x[1:2:3],name[2][0:7]");

        let x = c.projections[0].var().unwrap();
        assert_eq!(x.leaf, dds.find(&["a", "g", "x"]));
        assert!(x.segments.iter().all(|s| s.node.is_some()));
        assert_eq!(x.segments[2].slices[0].declsize, 4);

        let name = c.projections[1].var().unwrap();
        assert_eq!(name.segments[0].slices.len(), 2);
        assert_eq!(name.segments[0].slices[1], Slice::whole(8));
    }

    #[test]
    fn qualification_prepends_ancestors() {
        let mut b = DdsBuilder::new("ds");
        let root = b.root();
        let s = b.structure(root, "s", &[5]).unwrap();
        b.primitive(s, "v", NcType::Int, &[2]).unwrap();
        let dds = b.build();

        let mut var = PathVar::from_names(["v"]);
        let leaf = resolve_suffix(&dds, &var).unwrap();
        qualify(&dds, &mut var, leaf).unwrap();
        assert_eq!(var.name(), "s.v");
        assert!(var.is_whole());
        assert_eq!(var.segments[0].slices, vec![Slice::whole(5)]);
    }

    #[test]
    fn qualification_checks_bounds() {
        let dds = dds();
        let mut c = Constraint::new(
            vec![Projection::Var(PathVar::new(vec![
                Segment::with_slices("g", vec![]),
                Segment::with_slices("x", vec![Slice::new(2, 1, 4)]),
            ]))],
            vec![],
        );
        let err = map_constraint(&dds, &mut c).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { size: 4, .. }), "{err}");
        assert!(err.is_invalid_coordinates());
    }
}
