use ncdap_types::{NcType, Values};

/// How a position in a payload tree is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A structure instance, grid or dataset: children are looked up by name.
    Field,
    /// An array, either of structure instances or of primitive values.
    Array,
    /// A sequence: records are visited in order.
    Record,
    /// A single primitive value.
    Scalar,
}

/// A cursor position in a fetched payload tree.
pub trait Content: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn mode(&self) -> Mode;

    /// In [`Mode::Field`], the child called `name`.
    fn field(&self, name: &str) -> Option<&dyn Content>;

    /// In [`Mode::Array`] over structures and in [`Mode::Record`], the instance at `index`.
    fn element(&self, index: usize) -> Option<&dyn Content>;

    /// Number of instances, records or values below this position.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the values at this position, [`NcType::Nat`] for non-primitives.
    fn nc_type(&self) -> NcType;

    /// `count` values from the row-major element `offset` onwards, or `None` if the payload
    /// holds fewer.
    fn read(&self, offset: usize, count: usize) -> Option<Values>;
}

/// The root of one fetched response.
pub trait Payload: std::fmt::Debug + Send + Sync {
    fn root(&self) -> &dyn Content;

    /// Bytes attributed to this payload by cache accounting.
    fn size(&self) -> usize;
}
