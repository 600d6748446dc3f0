/// One get-vars request: which variable, and which of its elements.
///
/// `start`, `stride` and `count` default to all zeros, all ones and the whole visible extent of
/// each dimension. Every vector that is given must have one entry per visible dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubsetRequest {
    /// Path components of the variable, outermost first. Trailing components are enough when
    /// they identify the variable uniquely.
    pub variable: Vec<String>,
    pub start: Option<Vec<usize>>,
    pub count: Option<Vec<usize>>,
    pub stride: Option<Vec<usize>>,
}

impl SubsetRequest {
    /// A request for the whole of the variable with the dot separated path `name`.
    pub fn new(name: &str) -> Self {
        Self::path(name.split('.'))
    }

    pub fn path<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variable: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn start(mut self, start: impl Into<Vec<usize>>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn count(mut self, count: impl Into<Vec<usize>>) -> Self {
        self.count = Some(count.into());
        self
    }

    pub fn stride(mut self, stride: impl Into<Vec<usize>>) -> Self {
        self.stride = Some(stride.into());
        self
    }

    /// The `(start, count, stride)` vectors for a variable of the given visible shape.
    ///
    /// The default count of a dimension is the number of elements its stride reaches from its
    /// start, which is the whole dimension when both are defaulted.
    pub(crate) fn resolve(&self, shape: &[usize]) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
        let start = self.start.clone().unwrap_or_else(|| vec![0; shape.len()]);
        let stride = self.stride.clone().unwrap_or_else(|| vec![1; shape.len()]);
        let count = self.count.clone().unwrap_or_else(|| {
            shape
                .iter()
                .enumerate()
                .map(|(dim, size)| {
                    let first = start.get(dim).copied().unwrap_or_default();
                    let step = stride.get(dim).copied().unwrap_or(1).max(1);
                    size.saturating_sub(first).div_ceil(step)
                })
                .collect()
        });
        (start, count, stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_cover_the_shape() {
        let req = SubsetRequest::new("s.a");
        assert_eq!(req.variable, vec!["s", "a"]);
        assert_eq!(
            req.resolve(&[4, 5]),
            (vec![0, 0], vec![4, 5], vec![1, 1])
        );
    }

    #[test]
    fn default_count_follows_start_and_stride() {
        let req = SubsetRequest::new("v").start([3]).stride([2]);
        assert_eq!(req.resolve(&[10]), (vec![3], vec![4], vec![2]));

        let req = SubsetRequest::new("v").start([12]);
        assert_eq!(req.resolve(&[10]).1, vec![0]);
    }

    #[test]
    fn explicit_vectors_are_kept() {
        let req = SubsetRequest::path(["t"]).start([1, 0]).count([1, 2]).stride([1, 2]);
        assert_eq!(req.resolve(&[2, 3]), (vec![1, 0], vec![1, 2], vec![1, 2]));
    }
}
