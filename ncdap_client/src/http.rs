use std::{sync::Arc, time::Duration};

use secrecy::{ExposeSecret, Secret};
use tracing::debug;
use url::Url;

use crate::{Error, Fetch, FetchKind, FetchResponse, Payload, Result};

/// Turns a response body into a payload tree.
pub trait PayloadDecoder: std::fmt::Debug + Send + Sync {
    fn decode(
        &self,
        kind: FetchKind,
        body: &[u8],
    ) -> Result<Arc<dyn Payload>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Fetches DAP responses over HTTP.
///
/// The request URL is the dataset URL with the response kind's extension appended and the
/// constraint expression, if any, as its query.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// The dataset URL, without extension or query
    base_url: Url,
    /// The `Bearer` token sent with each request
    auth_token: Option<Secret<String>>,
    http_client: reqwest::blocking::Client,
    decoder: Arc<dyn PayloadDecoder>,
}

impl HttpFetcher {
    pub fn new(base_url: Url, decoder: Arc<dyn PayloadDecoder>) -> Result<Self> {
        Ok(Self {
            base_url,
            auth_token: None,
            http_client: reqwest::blocking::Client::builder()
                .build()
                .map_err(Error::Client)?,
            decoder,
        })
    }

    /// Set the `Bearer` token that will be sent with each request to the server
    pub fn with_auth_token<S: Into<String>>(mut self, auth_token: S) -> Self {
        self.auth_token = Some(Secret::new(auth_token.into()));
        self
    }

    /// Give up on requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;
        Ok(self)
    }

    pub fn request_url(&self, constraint: Option<&str>, kind: FetchKind) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}{}", url.path(), kind.extension());
        url.set_path(&path);
        url.set_query(constraint);
        url
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, constraint: Option<&str>, kind: FetchKind) -> Result<FetchResponse> {
        let url = self.request_url(constraint, kind);
        let mut req = self.http_client.get(url.clone());
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token.expose_secret());
        }
        let resp = req.send().map_err(|source| Error::RequestSend {
            url: url.to_string(),
            source,
        })?;
        let status = resp.status().as_u16();
        if !(resp.status().is_success() || resp.status().is_redirection()) {
            debug!(%url, status, "fetch failed");
            return Ok(FetchResponse::failed(url, status));
        }
        let body = resp.bytes().map_err(Error::Bytes)?;
        let payload = self
            .decoder
            .decode(kind, &body)
            .map_err(|source| Error::Decode { kind, source })?;
        Ok(FetchResponse {
            url: url.into(),
            status,
            payload: Some(payload),
        })
    }
}
