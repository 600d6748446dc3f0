use std::fmt::Display;

use crate::{Error, Result};

/// A half-open strided range `[first, stop)` over one dimension, together with the declared
/// size of that dimension.
///
/// `length` is `stop - first`, and `count` the number of indices the range selects,
/// `ceil(length / stride)`. A `declsize` of zero means the size is not known yet; qualification
/// against the metadata tree fills it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    pub first: usize,
    pub stride: usize,
    pub length: usize,
    pub stop: usize,
    pub declsize: usize,
    pub count: usize,
}

impl Slice {
    /// The whole of a dimension of size `declsize`.
    pub fn whole(declsize: usize) -> Self {
        Self {
            first: 0,
            stride: 1,
            length: declsize,
            stop: declsize,
            declsize,
            count: declsize,
        }
    }

    /// The inclusive `[first:stride:last]` form a constraint expression is written in.
    ///
    /// The declared size is left unknown.
    pub fn new(first: usize, stride: usize, last: usize) -> Self {
        let stride = stride.max(1);
        let stop = last.max(first) + 1;
        let length = stop - first;
        Self {
            first,
            stride,
            length,
            stop,
            declsize: 0,
            count: length.div_ceil(stride),
        }
    }

    /// The slice selecting `count` indices from `first` in steps of `stride` in a dimension of
    /// size `declsize`, as a get-vars request spells it.
    ///
    /// The range is clipped to the dimension; callers validate the request first.
    pub fn from_request(first: usize, count: usize, stride: usize, declsize: usize) -> Self {
        let stride = stride.max(1);
        let stop = first
            .saturating_add(count.saturating_mul(stride))
            .min(declsize)
            .max(first);
        let length = stop - first;
        Self {
            first,
            stride,
            length,
            stop,
            declsize,
            count: length.div_ceil(stride),
        }
    }

    /// The identity slice: the whole dimension, unit stride.
    pub fn is_whole(&self) -> bool {
        self.first == 0 && self.stride == 1 && self.stop == self.declsize
    }

    /// Index of the last selected element, if any.
    pub fn last(&self) -> Option<usize> {
        self.count
            .checked_sub(1)
            .map(|n| n.saturating_mul(self.stride).saturating_add(self.first))
    }

    /// The selected indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.first..self.stop).step_by(self.stride)
    }

    /// Compose `src`, a slice relative to the range `self` selects, onto `self`.
    ///
    /// `self` is the outer (standing) slice and `src` the inner (request-local) one; the result is
    /// expressed in `self`'s coordinates and keeps its declared size. Strides multiply, so the
    /// result selects exactly `src.count` elements, all of them inside `self`.
    pub fn merge(&self, src: &Self) -> Result<Self> {
        // saturated values always fail the bounds check below
        let stride = self.stride.saturating_mul(src.stride);
        let first = src.first.saturating_mul(self.stride).saturating_add(self.first);
        let length = match src.length {
            0 => 0,
            n => ((n - 1) / src.stride).saturating_mul(stride).saturating_add(1),
        };
        let stop = first.saturating_add(length);
        if first >= self.stop || stop > self.stop {
            return Err(Error::SliceEscapes {
                slice: Self {
                    first,
                    stride,
                    length,
                    stop,
                    declsize: self.declsize,
                    count: length.div_ceil(stride),
                }
                .to_string(),
                outer: self.to_string(),
            });
        }
        Ok(Self {
            first,
            stride,
            length,
            stop,
            declsize: self.declsize,
            count: length.div_ceil(stride),
        })
    }

    /// The same selection re-based onto a payload that holds only the selected elements.
    pub fn shifted(&self) -> Self {
        Self::whole(self.count)
    }
}

impl Display for Slice {
    /// `[first]`, `[first:last]` or `[first:stride:last]`; `last` is inclusive.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut last = self.first.saturating_add(self.length).saturating_sub(1).max(self.first);
        if self.declsize > 0 && last >= self.declsize {
            last = self.declsize - 1;
        }
        if self.count == 1 {
            write!(f, "[{}]", self.first)
        } else if self.stride == 1 {
            write!(f, "[{}:{}]", self.first, last)
        } else {
            write!(f, "[{}:{}:{}]", self.first, self.stride, last)
        }
    }
}
