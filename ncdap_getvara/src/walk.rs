//! Extraction of a variable's values from a fetched payload.
//!
//! The walk descends the payload in step with the path from the dataset root to the variable,
//! consuming one projection segment per node below the root. Values are collected in the type
//! the payload stores them in; conversion to the caller's type happens afterwards, once.
use ncdap_client::{Content, Mode, Payload};
use ncdap_constraint::{Odometer, Projection, Segment, Slice, WholeSuffix};
use ncdap_dds::{Dds, NodeId, NodeKind};
use ncdap_types::{NC_FILL_CHAR, NcType, Values, expand_escapes};
use tracing::trace;

use crate::{Error, Result};

/// How primitive leaves are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tactic {
    /// Read the longest contiguous runs the slices allow.
    Runs,
    /// Read one value per odometer position; the reference the runs are checked against.
    #[cfg(test)]
    PerElement,
}

/// Extract the elements of `var` selected by `projection` from `payload`.
///
/// Slices in `projection` must be expressed in the coordinates of the payload.
pub(crate) fn extract(
    dds: &Dds,
    var: NodeId,
    projection: &Projection,
    payload: &dyn Payload,
    max_rank: usize,
) -> Result<Values> {
    Walk::new(dds, var, projection, max_rank, Tactic::Runs)?.run(payload)
}

#[derive(Debug)]
pub(crate) struct Walk<'a> {
    dds: &'a Dds,
    /// Root to leaf; `segments[d - 1]` slices `path[d]`.
    path: Vec<NodeId>,
    segments: &'a [Segment],
    max_rank: usize,
    tactic: Tactic,
    /// Number of elements the projection selects.
    expected: usize,
    out: Option<Values>,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(
        dds: &'a Dds,
        var: NodeId,
        projection: &'a Projection,
        max_rank: usize,
        tactic: Tactic,
    ) -> Result<Self> {
        let path = dds.path(var);
        let segments = match projection.var() {
            Some(v) if v.segments.len() + 1 == path.len() => v.segments.as_slice(),
            _ => {
                return Err(Error::Resolution(ncdap_constraint::Error::Unresolved {
                    path: projection.to_string(),
                }));
            }
        };
        // records of an open-ended sequence are counted as they arrive
        let slices = || segments.iter().flat_map(|s| s.slices.iter());
        let expected = if slices().any(|s| s.declsize == 0) {
            0
        } else {
            slices().fold(1usize, |n, s| n.saturating_mul(s.count))
        };
        Ok(Self {
            dds,
            path,
            segments,
            max_rank,
            tactic,
            expected,
            out: None,
        })
    }

    pub(crate) fn run(mut self, payload: &dyn Payload) -> Result<Values> {
        self.descend(payload.root(), 0)?;
        match self.out {
            Some(values) => Ok(values),
            None => {
                let leaf = self.node_type(self.path.len() - 1);
                Ok(Values::try_with_capacity(leaf, 0)?)
            }
        }
    }

    fn descend(&mut self, content: &dyn Content, depth: usize) -> Result<()> {
        let id = self.path[depth];
        let node = self.dds.node(id);
        match (node.kind(), content.mode()) {
            (
                NodeKind::Dataset | NodeKind::Structure | NodeKind::Grid | NodeKind::Sequence,
                Mode::Field,
            ) => {
                let mut next = depth + 1;
                if self.path.get(next).is_some_and(|n| self.dds.node(*n).is_virtual()) {
                    next += 1;
                }
                let Some(child) = self.path.get(next) else {
                    return Err(self.mismatch(id, "path ends at a container"));
                };
                let name = self.dds.node(*child).name();
                let field = content
                    .field(name)
                    .ok_or_else(|| self.mismatch(id, format!("no field named '{name}'")))?;
                self.descend(field, next)
            }
            (NodeKind::Structure | NodeKind::Grid, Mode::Array) => {
                let mut odom = Odometer::new(&self.segment(depth)?.slices, self.max_rank)?;
                while odom.has_more() {
                    let offset = odom.flat_offset();
                    let instance = content.element(offset).ok_or_else(|| {
                        self.mismatch(id, format!("instance {offset} is missing"))
                    })?;
                    self.descend(instance, depth)?;
                    odom.advance();
                }
                Ok(())
            }
            (NodeKind::Sequence, Mode::Record) => {
                let Some(records) = self.segment(depth)?.slices.first().copied() else {
                    return Err(self.mismatch(id, "no record slice"));
                };
                for index in records.indices() {
                    let Some(record) = content.element(index) else {
                        return Err(Error::OutOfRange {
                            name: self.dds.full_name(id),
                            index,
                            available: content.len(),
                        });
                    };
                    self.descend(record, depth)?;
                }
                Ok(())
            }
            (NodeKind::Primitive, Mode::Scalar | Mode::Array) => self.leaf(content, depth),
            (kind, mode) => Err(self.mismatch(id, format!("{mode:?} content for a {kind}"))),
        }
    }

    fn leaf(&mut self, content: &dyn Content, depth: usize) -> Result<()> {
        let id = self.path[depth];
        let slices = &self.segment(depth)?.slices;
        if self.dds.node(id).nc_type().is_string() {
            let Some((chars, outer)) = slices.split_last() else {
                return Err(self.mismatch(id, "string without a length dimension"));
            };
            let mut odom = Odometer::new(outer, self.max_rank)?;
            while odom.has_more() {
                let raw = self.read(content, id, odom.flat_offset(), 1)?;
                let Some([s]) = raw.strings() else {
                    let reason = format!("{} values for a string", raw.nc_type());
                    return Err(self.mismatch(id, reason));
                };
                let row = string_slice(&expand_escapes(s), chars);
                self.push(Values::Char(row))?;
                odom.advance();
            }
            return Ok(());
        }

        let odom = Odometer::new(slices, self.max_rank)?;
        let suffix = match self.tactic {
            Tactic::Runs => odom.whole_suffix(),
            #[cfg(test)]
            Tactic::PerElement => WholeSuffix::None,
        };
        trace!(variable = %self.dds.full_name(id), ?suffix, "reading leaf");
        match suffix {
            WholeSuffix::All => {
                let values = self.read(content, id, 0, odom.sub_space(0))?;
                self.push(values)
            }
            WholeSuffix::From(p) => {
                let run = odom.sub_space(p);
                let mut outer = odom.truncated(p);
                while outer.has_more() {
                    let values = self.read(content, id, outer.flat_offset() * run, run)?;
                    self.push(values)?;
                    outer.advance();
                }
                Ok(())
            }
            WholeSuffix::None => {
                let mut odom = odom;
                while odom.has_more() {
                    let values = self.read(content, id, odom.flat_offset(), 1)?;
                    self.push(values)?;
                    odom.advance();
                }
                Ok(())
            }
        }
    }

    fn read(&self, content: &dyn Content, id: NodeId, offset: usize, count: usize) -> Result<Values> {
        content.read(offset, count).ok_or_else(|| {
            self.mismatch(
                id,
                format!(
                    "{count} values at offset {offset} requested, {} present",
                    content.len()
                ),
            )
        })
    }

    fn push(&mut self, values: Values) -> Result<()> {
        match &mut self.out {
            Some(out) => out.append(values)?,
            None => {
                let mut out = Values::try_with_capacity(values.nc_type(), self.expected)?;
                out.append(values)?;
                self.out = Some(out);
            }
        }
        Ok(())
    }

    fn segment(&self, depth: usize) -> Result<&'a Segment> {
        depth
            .checked_sub(1)
            .and_then(|d| self.segments.get(d))
            .ok_or_else(|| self.mismatch(self.path[depth], "no segment"))
    }

    /// The type the walk collects for the node at `depth`; strings become characters.
    fn node_type(&self, depth: usize) -> NcType {
        let nc_type = self.dds.node(self.path[depth]).nc_type();
        if nc_type.is_string() {
            NcType::Char
        } else {
            nc_type
        }
    }

    fn mismatch(&self, id: NodeId, reason: impl Into<String>) -> Error {
        Error::invalid_payload(self.dds.full_name(id), reason)
    }
}

/// The characters of `s` that `chars` selects, padded with fill characters past its end.
fn string_slice(s: &[u8], chars: &Slice) -> Vec<u8> {
    chars
        .indices()
        .map(|i| s.get(i).copied().unwrap_or(NC_FILL_CHAR))
        .collect()
}
