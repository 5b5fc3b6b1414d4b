use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{HeaderMap, Method, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    auth::Session,
    config::AppConfig,
    flash::{self, Notice},
    models::{Lang, Viewer},
    repository::RepositoryState,
    store::QueryStore,
};

/// RenderMode
///
/// Whether a human is looking at the response. Speculative loads must not consume or
/// queue one-time notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Interactive,
    Prefetch,
}

impl RenderMode {
    pub fn detect(method: &Method, headers: &HeaderMap) -> Self {
        let prefetch_header = ["sec-purpose", "purpose", "x-moz"]
            .into_iter()
            .filter_map(|name| headers.get(name))
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.to_ascii_lowercase().contains("prefetch"));

        if prefetch_header || method == Method::HEAD {
            RenderMode::Prefetch
        } else {
            RenderMode::Interactive
        }
    }

    pub fn is_interactive(self) -> bool {
        self == RenderMode::Interactive
    }
}

/// PageContext Extractor
///
/// Everything a page needs before it renders: the session, the request-scoped viewer
/// store (already loaded), the full current path and the request's presentation hints.
///
/// Nested routers see a stripped URI, so the current path comes from `OriginalUri`.
/// Never rejects: a missing or invalid session simply leaves the viewer absent.
pub struct PageContext {
    pub repo: RepositoryState,
    pub config: AppConfig,
    pub store: QueryStore,
    pub session: Option<Session>,
    pub path: String,
    pub query: Option<String>,
    pub mode: RenderMode,
    pub lang: Lang,
    pub is_mobile: bool,
    pub jar: CookieJar,
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());

        let session = Session::from_headers(&parts.headers, &config);
        let store = QueryStore::load(repo.as_ref(), session.as_ref(), config.viewer_timeout).await;

        let is_mobile = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|agent| agent.contains("Mobi"));

        Ok(PageContext {
            store,
            session,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            mode: RenderMode::detect(&parts.method, &parts.headers),
            lang: Lang::from_headers(&parts.headers),
            is_mobile,
            jar: CookieJar::from_headers(&parts.headers),
            repo,
            config,
        })
    }
}

impl PageContext {
    pub fn viewer(&self) -> Option<&Viewer> {
        self.store.viewer()
    }

    /// Bearer token forwarded to the data service.
    pub fn auth(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.token.as_str())
    }

    /// Path plus query string, as the browser requested it.
    pub fn current_url(&self) -> String {
        with_query(&self.path, self.query.as_deref())
    }

    pub fn notices(&self) -> Vec<Notice> {
        flash::read(&self.jar)
    }
}

pub fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}
