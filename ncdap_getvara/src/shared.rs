use std::sync::Arc;

use ncdap_types::{NcElement, NcType, Values};
use parking_lot::Mutex;

use crate::{Result, Session, SubsetRequest};

/// A [`Session`] that can be used from several threads; requests are served one at a time.
#[derive(Debug, Clone)]
pub struct SharedSession(Arc<Mutex<Session>>);

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub fn get_values(&self, request: &SubsetRequest, nc_type: NcType) -> Result<Values> {
        self.0.lock().get_values(request, nc_type)
    }

    pub fn get_vars<T: NcElement>(&self, request: &SubsetRequest) -> Result<Vec<T>> {
        self.0.lock().get_vars(request)
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.0.lock())
    }
}

impl From<Session> for SharedSession {
    fn from(session: Session) -> Self {
        Self::new(session)
    }
}
