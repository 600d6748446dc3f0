//! Fakes and fixtures for exercising the subsetting pipeline without a server.
use std::{collections::HashMap, sync::Arc};

use ncdap_client::{Fetch, FetchKind, FetchResponse, Payload, Result, memory::MemoryPayload};
use parking_lot::Mutex;

pub mod fixtures;

pub use ncdap_client::memory::MemoryContent;

/// URL reported by [`MockFetcher`] responses.
pub const MOCK_URL: &str = "http://mock.test/ds.nc";

/// One request received by a [`MockFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub constraint: Option<String>,
    pub kind: FetchKind,
}

#[derive(Debug, Clone)]
enum Canned {
    Payload(Arc<dyn Payload>),
    Status(u16),
}

/// A [`Fetch`] implementation answering from canned responses keyed by the exact constraint
/// string, recording every request it receives.
///
/// Requests without a canned response get a 404.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<Option<String>, Canned>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests carrying `constraint` with `content` as the payload root.
    pub fn respond(self, constraint: Option<&str>, content: MemoryContent) -> Self {
        self.responses.lock().insert(
            constraint.map(ToString::to_string),
            Canned::Payload(Arc::new(MemoryPayload::new(content))),
        );
        self
    }

    /// Like [`Self::respond`], with an explicit payload.
    pub fn respond_with(self, constraint: Option<&str>, payload: Arc<dyn Payload>) -> Self {
        self.responses
            .lock()
            .insert(constraint.map(ToString::to_string), Canned::Payload(payload));
        self
    }

    /// Answer requests carrying `constraint` with a bare transport status.
    pub fn fail(self, constraint: Option<&str>, status: u16) -> Self {
        self.responses
            .lock()
            .insert(constraint.map(ToString::to_string), Canned::Status(status));
        self
    }

    /// Every request received so far, oldest first.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The constraint strings of every request received so far.
    pub fn constraints(&self) -> Vec<Option<String>> {
        self.calls.lock().iter().map(|c| c.constraint.clone()).collect()
    }
}

impl Fetch for MockFetcher {
    fn fetch(&self, constraint: Option<&str>, kind: FetchKind) -> Result<FetchResponse> {
        self.calls.lock().push(FetchCall {
            constraint: constraint.map(ToString::to_string),
            kind,
        });
        let url = match constraint {
            Some(c) => format!("{MOCK_URL}{}?{c}", kind.extension()),
            None => format!("{MOCK_URL}{}", kind.extension()),
        };
        let canned = self
            .responses
            .lock()
            .get(&constraint.map(ToString::to_string))
            .cloned();
        Ok(match canned {
            Some(Canned::Payload(payload)) => FetchResponse::ok(url, payload),
            Some(Canned::Status(status)) => FetchResponse::failed(url, status),
            None => FetchResponse::failed(url, 404),
        })
    }
}
