//! The boundary to the remote data source: issuing DAP requests, translating transport
//! statuses, and the cursor over a fetched payload tree.
mod content;
mod http;
pub mod memory;

use std::{fmt::Display, sync::Arc};

use url::Url;

pub use content::{Content, Mode, Payload};
pub use http::{HttpFetcher, PayloadDecoder};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid dataset URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("authorization is required to access {url}")]
    AuthRequired { url: String },

    #[error("{url} was not found")]
    NotFound { url: String },

    #[error("server error [{status}] while fetching {url}")]
    ServiceError { status: u16, url: String },

    #[error("access to {url} was denied [{status}]")]
    AccessDenied { status: u16, url: String },

    #[error("failed to send request to {url}: {source}")]
    RequestSend {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read the response bytes: {0}")]
    Bytes(#[source] reqwest::Error),

    #[error("failed to decode the {kind} response: {source}")]
    Decode {
        kind: FetchKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to build the HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The three DAP responses a dataset URL serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// The structure description.
    Dds,
    /// The attribute tables.
    Das,
    /// Structure and data together.
    DataDds,
}

impl FetchKind {
    /// Suffix appended to the dataset URL to request this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Dds => ".dds",
            Self::Das => ".das",
            Self::DataDds => ".dods",
        }
    }
}

impl Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Dds => "DDS",
            Self::Das => "DAS",
            Self::DataDds => "DATADDS",
        })
    }
}

/// What a fetch returned: the transport status and, when the request succeeded, the payload.
#[derive(Debug)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub payload: Option<Arc<dyn Payload>>,
}

impl FetchResponse {
    pub fn ok(url: impl Into<String>, payload: Arc<dyn Payload>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            payload: Some(payload),
        }
    }

    pub fn failed(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            payload: None,
        }
    }

    /// The payload, or the error the status translates to.
    pub fn into_payload(self) -> Result<Arc<dyn Payload>> {
        translate_status(self.status, &self.url)?;
        self.payload.ok_or(Error::ServiceError {
            status: self.status,
            url: self.url,
        })
    }
}

/// Map a transport status onto the fetch error taxonomy. Anything below 400 is success.
pub fn translate_status(status: u16, url: &str) -> Result<()> {
    let url = url.to_string();
    match status {
        0..400 => Ok(()),
        401 | 403 => Err(Error::AuthRequired { url }),
        404 => Err(Error::NotFound { url }),
        500.. => Err(Error::ServiceError { status, url }),
        _ => Err(Error::AccessDenied { status, url }),
    }
}

/// Something that can issue DAP requests against one dataset.
///
/// `constraint` is the serialized constraint expression, `None` for an unconstrained request.
/// Implementations do not retry.
pub trait Fetch: std::fmt::Debug + Send + Sync {
    fn fetch(&self, constraint: Option<&str>, kind: FetchKind) -> Result<FetchResponse>;
}

/// Whether the server behind `url` can evaluate constraint expressions; local files cannot.
pub fn is_constrainable(url: &Url) -> bool {
    url.scheme() != "file"
}
