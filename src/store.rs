//! Request-scoped viewer store.
//!
//! Every request owns one `QueryStore`. It is filled by a single viewer fetch and then
//! handed by reference to the layout and the page; nothing is cached across requests.

use std::time::Duration;

use crate::{auth::Session, error::BackendError, models::Viewer, repository::Repository};

/// ViewerState
///
/// Outcome of the viewer fetch. `Pending` means the fetch did not settle before the
/// request's deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Pending,
    Failed(BackendError),
    Absent,
    Present(Viewer),
}

impl ViewerState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, ViewerState::Pending)
    }
}

/// QueryStore
#[derive(Debug, Clone)]
pub struct QueryStore {
    viewer: ViewerState,
}

impl QueryStore {
    pub fn new(viewer: ViewerState) -> Self {
        Self { viewer }
    }

    /// Fetches the viewer for `session`.
    ///
    /// Without a session the viewer is known to be absent and the service is not asked.
    /// A fetch that exceeds `deadline` leaves the store pending; the in-flight request is
    /// dropped with it.
    pub async fn load(
        repo: &dyn Repository,
        session: Option<&Session>,
        deadline: Duration,
    ) -> Self {
        let Some(session) = session else {
            return Self::new(ViewerState::Absent);
        };

        let viewer = match tokio::time::timeout(deadline, repo.current_user(Some(&session.token)))
            .await
        {
            Ok(Ok(Some(viewer))) => ViewerState::Present(viewer),
            Ok(Ok(None)) => ViewerState::Absent,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "viewer query failed");
                ViewerState::Failed(e)
            }
            Err(_) => {
                tracing::warn!(?deadline, "viewer query still pending at deadline");
                ViewerState::Pending
            }
        };

        Self::new(viewer)
    }

    pub fn state(&self) -> &ViewerState {
        &self.viewer
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        match &self.viewer {
            ViewerState::Present(viewer) => Some(viewer),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&BackendError> {
        match &self.viewer {
            ViewerState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn fetching(&self) -> bool {
        !self.viewer.is_settled()
    }
}
