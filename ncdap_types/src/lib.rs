//! Primitive element types, typed value vectors and the conversions between them.
pub mod convert;
pub mod escape;
pub mod nc_type;
pub mod values;

pub use convert::{check_conversion, convert};
pub use escape::expand_escapes;
pub use nc_type::NcType;
pub use values::{NcElement, Values};

/// Byte written past the natural end of a string when a character slice runs longer than it.
pub const NC_FILL_CHAR: u8 = 0;

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum Error {
    #[error("cannot convert {src} values to {dst}")]
    TypeMismatch { src: NcType, dst: NcType },

    #[error("failed to allocate space for {count} {nc_type} values")]
    AllocationFailure { count: usize, nc_type: NcType },

    #[error("cannot append {actual} values to a {expected} buffer")]
    MixedTypes { expected: NcType, actual: NcType },

    #[error("{0} has no values")]
    NoValues(NcType),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
