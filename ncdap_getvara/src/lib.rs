//! Client-side subsetting of remote DAP variables.
//!
//! A [`Session`] owns everything one open dataset needs to answer get-vars requests: the
//! metadata tree, the standing URL constraint, the fetch cache and the transport. Each request is
//! validated locally, answered from the cache when a cached payload holds the whole variable,
//! and otherwise fetched with a constraint narrowed to just the requested elements. The values
//! are then extracted by walking the payload in step with the metadata tree.
mod request;
mod session;
mod shared;
mod walk;

pub use request::SubsetRequest;
pub use session::{FetchState, Session, SessionBuilder, http_fetcher, mark_prefetch};
pub use shared::SharedSession;

use ncdap_types::NcType;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid coordinates: {source}")]
    InvalidCoordinates {
        #[source]
        source: ncdap_constraint::Error,
    },

    #[error("output buffer of {len} elements is too small, {needed} are needed")]
    OutputTooSmall { needed: usize, len: usize },

    #[error("index map {imap:?} for '{name}' addresses elements past usize::MAX")]
    IndexMapOverflow { name: String, imap: Vec<usize> },

    #[error(transparent)]
    Resolution(ncdap_constraint::Error),

    #[error("'{name}' is a {kind}, only primitive variables can be read")]
    NotAVariable { name: String, kind: ncdap_dds::NodeKind },

    #[error(transparent)]
    Values(#[from] ncdap_types::Error),

    #[error("fetch failed: {0}")]
    Fetch(#[from] ncdap_client::Error),

    #[error("record {index} of '{name}' was requested but the server returned {available}")]
    OutOfRange {
        name: String,
        index: usize,
        available: usize,
    },

    #[error("payload for '{name}' does not match the metadata tree: {reason}")]
    InvalidPayload { name: String, reason: String },
}

impl From<ncdap_constraint::Error> for Error {
    fn from(e: ncdap_constraint::Error) -> Self {
        if e.is_invalid_coordinates() {
            Self::InvalidCoordinates { source: e }
        } else {
            Self::Resolution(e)
        }
    }
}

/// The category of an [`Error`], independent of its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidCoordinates,
    NotFound,
    Ambiguous,
    TypeMismatch,
    ServiceError,
    AuthRequired,
    AccessDenied,
    OutOfRange,
    AllocationFailure,
    Io,
    InvalidPayload,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use ncdap_client::Error as Fetch;
        use ncdap_constraint::Error as Constraint;
        use ncdap_types::Error as Values;

        match self {
            Self::InvalidCoordinates { .. }
            | Self::OutputTooSmall { .. }
            | Self::IndexMapOverflow { .. } => ErrorKind::InvalidCoordinates,
            Self::Resolution(Constraint::Ambiguous { .. }) => ErrorKind::Ambiguous,
            Self::Resolution(Constraint::NotFound { .. } | Constraint::Unresolved { .. }) => {
                ErrorKind::NotFound
            }
            Self::Resolution(_) => ErrorKind::InvalidCoordinates,
            Self::NotAVariable { .. } => ErrorKind::NotFound,
            Self::Values(Values::TypeMismatch { .. } | Values::NoValues(_)) => {
                ErrorKind::TypeMismatch
            }
            Self::Values(Values::AllocationFailure { .. }) => ErrorKind::AllocationFailure,
            Self::Values(Values::MixedTypes { .. }) => ErrorKind::InvalidPayload,
            Self::Fetch(Fetch::AuthRequired { .. }) => ErrorKind::AuthRequired,
            Self::Fetch(Fetch::NotFound { .. }) => ErrorKind::NotFound,
            Self::Fetch(Fetch::ServiceError { .. }) => ErrorKind::ServiceError,
            Self::Fetch(Fetch::AccessDenied { .. }) => ErrorKind::AccessDenied,
            Self::Fetch(_) => ErrorKind::Io,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InvalidPayload { .. } => ErrorKind::InvalidPayload,
        }
    }

    fn invalid_payload(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            name: name.into(),
            reason: reason.into(),
        }
    }

    fn type_mismatch(src: NcType, dst: NcType) -> Self {
        Self::Values(ncdap_types::Error::TypeMismatch { src, dst })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
