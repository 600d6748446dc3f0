//! The constraint algebra: strided slices, path segments, projections and selections, the
//! odometer that walks a set of slices, and the name resolution and restriction passes that tie
//! expressions to a metadata tree.
//!
//! Expressions are plain owned values. Their references into the metadata tree are [`NodeId`]
//! handles, so cloning an expression never clones or borrows the tree.
//!
//! [`NodeId`]: ncdap_id::NodeId
pub mod constraint;
pub mod odometer;
pub mod projection;
pub mod request;
pub mod resolve;
pub mod restrict;
pub mod segment;
pub mod selection;
pub mod slice;

pub use constraint::Constraint;
pub use odometer::{Odometer, WholeSuffix};
pub use projection::{Constant, FunctionCall, PathVar, Projection, Value};
pub use request::{strip_pseudo_dims, vara_projection, visible_shape, walk_projection};
pub use resolve::{map_constraint, qualify, resolve_suffix};
pub use restrict::{
    merge_projections, restrict, restrict_to_variable, standing_projection, unify,
};
pub use segment::Segment;
pub use selection::{Operator, Selection};
pub use slice::Slice;

/// Default cap on the number of dimensions a slice vector may have.
pub const DEFAULT_MAX_RANK: usize = 1024;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("slice {slice} does not fit inside {outer}")]
    SliceEscapes { slice: String, outer: String },

    #[error(
        "dimension {dim} of '{name}': start {start}, count {count}, stride {stride} \
        exceeds its size of {size}"
    )]
    OutOfBounds {
        name: String,
        dim: usize,
        start: usize,
        count: usize,
        stride: usize,
        size: usize,
    },

    #[error("dimension {dim} of '{name}': stride must be positive")]
    ZeroStride { name: String, dim: usize },

    #[error("'{name}' has rank {expected} but {actual} indices were given")]
    RankMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("rank {rank} exceeds the limit of {max} dimensions")]
    TooManyDimensions { rank: usize, max: usize },

    #[error("no variable matches '{path}'")]
    NotFound { path: String },

    #[error("'{path}' is ambiguous, it matches {}", candidates.join(", "))]
    Ambiguous {
        path: String,
        candidates: Vec<String>,
    },

    #[error("'{path}' has not been resolved against the metadata tree")]
    Unresolved { path: String },
}

impl Error {
    /// Errors that report a request or expression outside the declared bounds.
    pub fn is_invalid_coordinates(&self) -> bool {
        matches!(
            self,
            Self::SliceEscapes { .. }
                | Self::OutOfBounds { .. }
                | Self::ZeroStride { .. }
                | Self::RankMismatch { .. }
                | Self::TooManyDimensions { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
