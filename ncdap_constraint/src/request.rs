//! Turning a get-vars request into projections.
//!
//! A request addresses a variable through its *visible* shape: the declared dimensions of
//! every node on its path, pseudo dimensions included, or the counts a standing projection
//! narrowed them to. Slices built here are relative to that visible shape; composing them onto
//! the standing projection with [`crate::restrict_to_variable`] makes them absolute.
use ncdap_dds::{Dds, NodeId, NodeKind};

use crate::{Error, PathVar, Projection, Result, Segment, Slice, restrict::standing_projection};

/// The shape a request for `var` is validated against.
pub fn visible_shape(dds: &Dds, standing: &[Projection], var: NodeId) -> Vec<usize> {
    match standing_projection(dds, standing, var) {
        Some(p) => p
            .segments
            .iter()
            .flat_map(|s| s.slices.iter().map(|slice| slice.count))
            .collect(),
        None => dds.full_dims(var),
    }
}

/// Validate a `(start, count, stride)` request against `shape` and build the projection it
/// describes, one segment per node on the path to `var`.
///
/// A dimension of size zero is a sequence of unknown length and is not bounds checked; reading
/// past the records the server returns fails during the walk instead.
pub fn vara_projection(
    dds: &Dds,
    var: NodeId,
    shape: &[usize],
    start: &[usize],
    count: &[usize],
    stride: &[usize],
    max_rank: usize,
) -> Result<Projection> {
    let name = || dds.full_name(var);
    let rank = shape.len();
    if rank > max_rank {
        return Err(Error::TooManyDimensions {
            rank,
            max: max_rank,
        });
    }
    for given in [start.len(), count.len(), stride.len()] {
        if given != rank {
            return Err(Error::RankMismatch {
                name: name(),
                expected: rank,
                actual: given,
            });
        }
    }

    let mut slices = Vec::with_capacity(rank);
    for dim in 0..rank {
        let (first, n, step, size) = (start[dim], count[dim], stride[dim], shape[dim]);
        if step == 0 {
            return Err(Error::ZeroStride { name: name(), dim });
        }
        let out_of_bounds = || Error::OutOfBounds {
            name: name(),
            dim,
            start: first,
            count: n,
            stride: step,
            size,
        };
        // the last index must leave room for an exclusive stop
        let last = match n {
            0 => None,
            n => Some(
                (n - 1)
                    .checked_mul(step)
                    .and_then(|l| l.checked_add(first))
                    .filter(|l| *l < usize::MAX)
                    .ok_or_else(out_of_bounds)?,
            ),
        };
        if size > 0 && (first > size || last.is_some_and(|l| l >= size)) {
            return Err(out_of_bounds());
        }
        slices.push(request_slice(first, n, step, size, last));
    }

    let mut remaining = slices.into_iter();
    let mut segments = vec![];
    for node in dds.path_below_root(var) {
        let mut seg = Segment::whole(dds, node);
        let local = seg.slices.len();
        seg.slices = remaining.by_ref().take(local).collect();
        if seg.slices.len() != local {
            return Err(Error::RankMismatch {
                name: name(),
                expected: dds.full_dims(var).len(),
                actual: rank,
            });
        }
        segments.push(seg);
    }
    if remaining.next().is_some() {
        return Err(Error::RankMismatch {
            name: name(),
            expected: dds.full_dims(var).len(),
            actual: rank,
        });
    }

    Ok(Projection::Var(PathVar {
        segments,
        leaf: Some(var),
    }))
}

fn request_slice(
    first: usize,
    count: usize,
    stride: usize,
    size: usize,
    last: Option<usize>,
) -> Slice {
    if size > 0 {
        return Slice::from_request(first, count, stride, size);
    }
    let stop = last.map_or(first, |l| l + 1);
    Slice {
        first,
        stride,
        length: stop - first,
        stop,
        declsize: 0,
        count,
    }
}

/// Which of a node's slices stand for pseudo dimensions a server does not accept.
fn pseudo_slices(dds: &Dds, node: NodeId) -> std::ops::Range<usize> {
    let n = dds.node(node);
    let declared = match n.kind() {
        NodeKind::Sequence => 0,
        _ => n.dims().len(),
    };
    declared..n.local_rank()
}

/// The projection as a server can be asked for it: record and string-length slices removed.
pub fn strip_pseudo_dims(dds: &Dds, projection: &Projection) -> Projection {
    let mut stripped = projection.clone();
    if let Some(var) = stripped.var_mut() {
        for seg in &mut var.segments {
            let Some(node) = seg.node else { continue };
            let pseudo = pseudo_slices(dds, node);
            seg.slices.truncate(pseudo.start.min(seg.slices.len()));
        }
    }
    stripped
}

/// Re-base `projection` onto a payload fetched with its pseudo-stripped form.
///
/// Slices that were sent to the server are replaced by whole slices over what they selected.
/// Pseudo-dimension slices were never sent, so the payload still holds every record and
/// character and they stay absolute.
pub fn walk_projection(dds: &Dds, projection: &Projection) -> Projection {
    let mut shifted = projection.clone();
    if let Some(var) = shifted.var_mut() {
        for seg in &mut var.segments {
            let sent = match seg.node {
                Some(node) => pseudo_slices(dds, node).start,
                None => seg.slices.len(),
            };
            for slice in seg.slices.iter_mut().take(sent) {
                *slice = slice.shifted();
            }
        }
    }
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Constraint, map_constraint, restrict_to_variable};
    use ncdap_dds::DdsBuilder;
    use ncdap_types::NcType;
    use pretty_assertions::assert_eq;

    /// ```text
    /// ds
    ///   v[10]
    ///   name[3] (string, 8 chars)
    ///   obs (sequence, 5 records) { depth }
    /// ```
    fn dds() -> Dds {
        let mut b = DdsBuilder::new("ds");
        let root = b.root();
        b.primitive(root, "v", NcType::Int, &[10]).unwrap();
        b.string(root, "name", &[3], 8).unwrap();
        let obs = b.sequence(root, "obs", Some(5)).unwrap();
        b.primitive(obs, "depth", NcType::Double, &[]).unwrap();
        b.build()
    }

    fn request(
        dds: &Dds,
        var: &str,
        start: &[usize],
        count: &[usize],
        stride: &[usize],
    ) -> Result<Projection> {
        let var = dds.find(&var.split('.').collect::<Vec<_>>()).unwrap();
        let shape = visible_shape(dds, &[], var);
        vara_projection(dds, var, &shape, start, count, stride, crate::DEFAULT_MAX_RANK)
    }

    #[test]
    fn builds_the_requested_slices() {
        let dds = dds();
        let p = request(&dds, "v", &[2], &[3], &[2]).unwrap();
        assert_eq!(p.to_string(), "v[2:2:7]");
        let p = request(&dds, "v", &[0], &[10], &[1]).unwrap();
        assert!(p.is_whole());
        let p = request(&dds, "name", &[1, 2], &[2, 4], &[1, 1]).unwrap();
        assert_eq!(p.to_string(), "name[1:2][2:5]");
    }

    #[test]
    fn rejects_bad_coordinates() {
        let dds = dds();
        let cases: [(&[usize], &[usize], &[usize]); 5] = [
            (&[11], &[0], &[1]),
            (&[8], &[3], &[1]),
            (&[1], &[4], &[3]),
            (&[0], &[1], &[0]),
            (&[0, 0], &[1, 1], &[1, 1]),
        ];
        for (start, count, stride) in cases {
            let err = request(&dds, "v", start, count, stride).unwrap_err();
            assert!(err.is_invalid_coordinates(), "{err}");
        }
        // Empty selections may start at the end.
        assert!(request(&dds, "v", &[10], &[0], &[1]).is_ok());

        let err = vara_projection(&dds, dds.find(&["v"]).unwrap(), &[10], &[0], &[1], &[1], 0)
            .unwrap_err();
        assert_eq!(err, Error::TooManyDimensions { rank: 1, max: 0 });
    }

    #[test]
    fn unknown_record_counts_are_unbounded_but_must_not_overflow() {
        let mut b = DdsBuilder::new("ds");
        let root = b.root();
        let obs = b.sequence(root, "obs", None).unwrap();
        b.primitive(obs, "id", NcType::Int, &[]).unwrap();
        let dds = b.build();

        let p = request(&dds, "obs.id", &[3], &[4], &[2]).unwrap();
        let records = p.var().unwrap().segments[0].slices[0];
        assert_eq!((records.first, records.stop, records.count), (3, 10, 4));

        let p = request(&dds, "obs.id", &[0], &[usize::MAX], &[1]).unwrap();
        assert_eq!(p.var().unwrap().segments[0].slices[0].stop, usize::MAX);

        for (start, count, stride) in [(0, usize::MAX, 2), (1, usize::MAX, 1), (usize::MAX, 1, 1)] {
            let err = request(&dds, "obs.id", &[start], &[count], &[stride]).unwrap_err();
            assert!(
                matches!(err, Error::OutOfBounds { size: 0, .. }),
                "{start} {count} {stride}: {err}"
            );
        }
    }

    #[test]
    fn pseudo_dims_are_stripped_for_the_server_only() {
        let dds = dds();
        let name = request(&dds, "name", &[1], &[2], &[1]);
        // The string length is part of the visible shape.
        assert!(name.is_err());

        let name = request(&dds, "name", &[1, 2], &[2, 3], &[1, 2]).unwrap();
        let fetch = strip_pseudo_dims(&dds, &name);
        assert_eq!(fetch.to_string(), "name[1:2]");

        let walk = walk_projection(&dds, &name);
        let slices = &walk.var().unwrap().segments[0].slices;
        assert_eq!(slices[0], Slice::whole(2));
        assert_eq!(slices[1], Slice::from_request(2, 3, 2, 8));

        let depth = request(&dds, "obs.depth", &[1], &[3], &[1]).unwrap();
        assert_eq!(depth.to_string(), "obs[1:3].depth");
        let fetch = strip_pseudo_dims(&dds, &depth);
        assert_eq!(fetch.to_string(), "obs.depth");
        assert!(fetch.is_whole());
        let walk = walk_projection(&dds, &depth);
        assert_eq!(walk.to_string(), "obs[1:3].depth");
    }

    #[test]
    fn standing_projection_narrows_the_visible_shape() {
        let dds = dds();
        let v = dds.find(&["v"]).unwrap();
        let mut standing = Constraint::new(
            vec![Projection::Var(PathVar::new(vec![Segment::with_slices(
                "v",
                vec![Slice::new(1, 3, 9)],
            )]))],
            vec![],
        );
        map_constraint(&dds, &mut standing).unwrap();
        let shape = visible_shape(&dds, &standing.projections, v);
        assert_eq!(shape, vec![3]);

        let vara = vara_projection(&dds, v, &shape, &[1], &[2], &[1], 8).unwrap();
        let fetch = restrict_to_variable(&dds, &standing.projections, &vara).unwrap();
        assert_eq!(fetch.to_string(), "v[4:3:7]");
        let walk = walk_projection(&dds, &fetch);
        assert!(walk.is_whole());
        assert_eq!(walk.var().unwrap().segments[0].slices[0].count, 2);
    }
}
