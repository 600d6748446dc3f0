//! Combining and pruning projections.
use indexmap::IndexSet;
use ncdap_dds::{Dds, NodeId};
use tracing::trace;

use crate::{Error, PathVar, Projection, Result, Segment};

/// Merge `src` into `dst`.
///
/// Projections with the same leaf are composed slice by slice, `dst`'s slices being the outer
/// ones; projections with different leaves are unioned, keeping first-seen order. `dst` is left
/// untouched on error.
pub fn merge_projections(dst: &mut Vec<Projection>, src: &[Projection]) -> Result<()> {
    let mut merged: Vec<Projection> = Vec::with_capacity(dst.len() + src.len());
    for p in dst.iter().chain(src) {
        let existing = match p.leaf() {
            Some(leaf) => merged.iter_mut().find(|m| m.leaf() == Some(leaf)),
            None => None,
        };
        match existing {
            Some(target) => merge_into(target, p)?,
            None => merged.push(p.clone()),
        }
    }
    *dst = merged;
    Ok(())
}

/// Compose `src`'s slices onto `target`'s. Both must be qualified against the same tree.
fn merge_into(target: &mut Projection, src: &Projection) -> Result<()> {
    let (Some(target), Some(src)) = (target.var_mut(), src.var()) else {
        return Ok(());
    };
    for (tseg, sseg) in target.segments.iter_mut().zip(&src.segments) {
        if !sseg.slices_defined {
            continue;
        }
        for (tslice, sslice) in tseg.slices.iter_mut().zip(&sseg.slices) {
            *tslice = tslice.merge(sslice)?;
        }
        tseg.slices_defined = true;
    }
    Ok(())
}

/// Keep only the projections relevant to `vars`.
///
/// With no projections at all, every variable gets a whole projection, after collapsing
/// complete sibling sets into their container (see [`unify`]). Otherwise variable projections
/// unrelated to every variable are dropped, and of two projections where one leaf contains the
/// other only the inner, more restrictive one is kept.
pub fn restrict(dds: &Dds, vars: &[NodeId], projections: &[Projection]) -> Vec<Projection> {
    if vars.is_empty() {
        return vec![];
    }
    if projections.is_empty() {
        return unify(dds, vars)
            .into_iter()
            .map(|n| Projection::whole(dds, n))
            .collect();
    }

    let mut kept: Vec<Projection> = projections
        .iter()
        .filter(|p| match p.leaf() {
            Some(leaf) => vars
                .iter()
                .any(|v| dds.contains(leaf, *v) || dds.contains(*v, leaf)),
            None => true,
        })
        .cloned()
        .collect();

    while let Some(redundant) = redundant_projection(dds, &kept) {
        trace!(projection = %kept[redundant], "dropping containing projection");
        kept.remove(redundant);
    }
    kept
}

/// Index of a projection whose leaf contains another projection's leaf.
fn redundant_projection(dds: &Dds, projections: &[Projection]) -> Option<usize> {
    for (i, pi) in projections.iter().enumerate() {
        let Some(li) = pi.leaf() else { continue };
        for (j, pj) in projections[..i].iter().enumerate() {
            let Some(lj) = pj.leaf() else { continue };
            if dds.contains(lj, li) {
                return Some(j);
            }
            if dds.contains(li, lj) {
                return Some(i);
            }
        }
    }
    None
}

/// Replace every set of siblings that makes up all children of their container by the
/// container itself, until nothing more collapses.
///
/// A set that collapses all the way to the dataset node becomes empty: the whole dataset is
/// what an empty projection list already means.
pub fn unify(dds: &Dds, vars: &[NodeId]) -> Vec<NodeId> {
    let mut set: IndexSet<NodeId> = vars.iter().copied().collect();
    loop {
        let containers: IndexSet<NodeId> = set
            .iter()
            .filter_map(|n| dds.node(*n).container())
            .collect();
        let mut changed = false;
        for c in containers {
            let children = dds.node(c).children();
            if !children.is_empty() && children.iter().all(|ch| set.contains(ch)) {
                for ch in children {
                    set.shift_remove(ch);
                }
                set.insert(c);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    if set.len() == 1 && set.contains(&dds.root()) {
        set.clear();
    }
    set.into_iter().collect()
}

/// The standing projection that governs `var`: one on `var` itself, or failing that one on an
/// ancestor, extended with whole segments down to `var`.
pub fn standing_projection(dds: &Dds, standing: &[Projection], var: NodeId) -> Option<PathVar> {
    let vars = || standing.iter().filter_map(Projection::var);
    if let Some(own) = vars().find(|p| p.leaf == Some(var)) {
        return Some(own.clone());
    }
    let ancestor = vars().find(|p| p.leaf.is_some_and(|a| a != var && dds.contains(a, var)))?;
    let mut extended = ancestor.clone();
    let path = dds.path_below_root(var);
    extended.segments.extend(
        path[ancestor.segments.len().min(path.len())..]
            .iter()
            .map(|n| Segment::whole(dds, *n)),
    );
    extended.leaf = Some(var);
    Some(extended)
}

/// The projection to fetch for one variable request: the request composed onto whatever
/// standing projection governs the variable, or the request alone if none does.
pub fn restrict_to_variable(
    dds: &Dds,
    standing: &[Projection],
    vara: &Projection,
) -> Result<Projection> {
    let Some(leaf) = vara.leaf() else {
        return Err(Error::Unresolved {
            path: vara.to_string(),
        });
    };
    match standing_projection(dds, standing, leaf) {
        None => Ok(vara.clone()),
        Some(base) => {
            let mut merged = Projection::Var(base);
            merge_into(&mut merged, vara)?;
            Ok(merged)
        }
    }
}
