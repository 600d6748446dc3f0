//! A multi-dimensional strided counter.
//!
//! The odometer visits the cross product of its slices in row-major order (the last dimension
//! moves fastest) and turns each position into a flat offset into a row-major array whose shape
//! is the slices' declared sizes.
use crate::{Error, Result, Slice};

#[derive(Debug, Clone)]
pub struct Odometer {
    slices: Vec<Slice>,
    index: Vec<usize>,
    done: bool,
}

/// Where the trailing run of whole slices of an odometer begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WholeSuffix {
    /// Every slice is whole: the positions cover one contiguous block.
    All,
    /// Slices from this dimension on are whole, the one before it is not.
    From(usize),
    /// The innermost slice is not whole.
    None,
}

impl Odometer {
    /// An odometer positioned at the first index of every slice.
    ///
    /// A rank-0 odometer has exactly one position, offset zero. An odometer with an empty slice
    /// has no positions at all.
    pub fn new(slices: &[Slice], max_rank: usize) -> Result<Self> {
        if slices.len() > max_rank {
            return Err(Error::TooManyDimensions {
                rank: slices.len(),
                max: max_rank,
            });
        }
        Ok(Self {
            slices: slices.to_vec(),
            index: slices.iter().map(|s| s.first).collect(),
            done: slices.iter().any(|s| s.count == 0 || s.first >= s.stop),
        })
    }

    /// An odometer over every element of an array with the given shape.
    pub fn whole(shape: &[usize], max_rank: usize) -> Result<Self> {
        let slices = shape.iter().map(|d| Slice::whole(*d)).collect::<Vec<_>>();
        Self::new(&slices, max_rank)
    }

    /// An odometer over the first `rank` dimensions only.
    pub fn truncated(&self, rank: usize) -> Self {
        let rank = rank.min(self.rank());
        Self {
            slices: self.slices[..rank].to_vec(),
            index: self.slices[..rank].iter().map(|s| s.first).collect(),
            done: self.slices[..rank].iter().any(|s| s.count == 0),
        }
    }

    pub fn rank(&self) -> usize {
        self.slices.len()
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// The current position.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Whether the current position is valid; false once the outermost dimension has overflowed.
    pub fn has_more(&self) -> bool {
        !self.done
    }

    /// Step to the next position, returning whether there is one.
    ///
    /// The innermost dimension advances by its stride and carries outward on overflow. When the
    /// outermost dimension overflows it is left past its stop rather than wrapped.
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        let mut dim = self.rank();
        while dim > 0 {
            dim -= 1;
            let slice = &self.slices[dim];
            self.index[dim] = self.index[dim].saturating_add(slice.stride);
            if self.index[dim] < slice.stop {
                return true;
            }
            if dim == 0 {
                break;
            }
            self.index[dim] = slice.first;
        }
        self.done = true;
        false
    }

    /// Row-major offset of the current position.
    pub fn flat_offset(&self) -> usize {
        self.slices
            .iter()
            .zip(&self.index)
            .fold(0, |offset, (slice, index)| offset * slice.declsize + index)
    }

    /// Number of elements in the dimensions from `from` inward.
    pub fn sub_space(&self, from: usize) -> usize {
        self.slices
            .iter()
            .skip(from)
            .map(|s| s.declsize)
            .product()
    }

    /// Number of positions the odometer visits in total.
    pub fn count(&self) -> usize {
        self.slices.iter().map(|s| s.count).product()
    }

    /// Position of the current element in a caller buffer laid out by `imap`, the per-dimension
    /// distance between consecutive selected elements. `None` if it does not fit in a `usize`.
    pub fn mapped_offset(&self, imap: &[usize]) -> Option<usize> {
        self.slices
            .iter()
            .zip(&self.index)
            .zip(imap)
            .try_fold(0usize, |offset, ((slice, index), step)| {
                ((index - slice.first) / slice.stride)
                    .checked_mul(*step)
                    .and_then(|d| offset.checked_add(d))
            })
    }

    /// Length of the shortest buffer laid out by `imap` that holds every position.
    ///
    /// Zero when there are no positions, `None` if the length does not fit in a `usize`.
    pub fn mapped_extent(&self, imap: &[usize]) -> Option<usize> {
        if self.slices.iter().any(|s| s.count == 0) {
            return Some(0);
        }
        self.slices
            .iter()
            .zip(imap)
            .try_fold(1usize, |extent, (slice, step)| {
                (slice.count - 1)
                    .checked_mul(*step)
                    .and_then(|d| extent.checked_add(d))
            })
    }

    /// Find the innermost dimension from which every remaining slice is whole.
    pub fn whole_suffix(&self) -> WholeSuffix {
        match self.slices.iter().rposition(|s| !s.is_whole()) {
            None => WholeSuffix::All,
            Some(p) if p + 1 == self.rank() => WholeSuffix::None,
            Some(p) => WholeSuffix::From(p + 1),
        }
    }
}
