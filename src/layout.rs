//! Shared page layout: access guard, error tier, header and footer chrome.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Datelike, Utc};

use crate::{
    access::{self, AccessDecision, AuthRestrict},
    context::PageContext,
    error::{AppError, BackendError},
    flash::{self, Notice},
    views::{ErrorPage, LayoutView, NoticeView, PendingPage, UserMenu},
};

/// SharedLayout
///
/// Per-page layout props. Built by each handler and entered before any page data is
/// fetched, so forbidden viewers never trigger page queries.
#[derive(Debug, Clone)]
pub struct SharedLayout {
    title: String,
    title_href: Option<String>,
    forbid_when: AuthRestrict,
    no_pad: bool,
    no_handle_errors: bool,
    display_footer: bool,
    return_to: Option<String>,
}

impl SharedLayout {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            title_href: None,
            forbid_when: AuthRestrict::NEVER,
            no_pad: false,
            no_handle_errors: false,
            display_footer: true,
            return_to: None,
        }
    }

    pub fn title_href(mut self, href: impl Into<String>) -> Self {
        self.title_href = Some(href.into());
        self
    }

    pub fn forbid_when(mut self, restrict: AuthRestrict) -> Self {
        self.forbid_when = restrict;
        self
    }

    pub fn no_pad(mut self) -> Self {
        self.no_pad = true;
        self
    }

    /// The page renders viewer query errors itself.
    pub fn no_handle_errors(mut self) -> Self {
        self.no_handle_errors = true;
        self
    }

    pub fn hide_footer(mut self) -> Self {
        self.display_footer = false;
        self
    }

    /// Overrides the `next` target of the login redirect.
    pub fn return_to(mut self, href: impl Into<String>) -> Self {
        self.return_to = Some(href.into());
        self
    }

    /// enter
    ///
    /// Runs the access guard and the query-error tier. `Err` carries the response that
    /// replaces the page: a redirect, the pending placeholder or the error page.
    pub fn enter(&self, ctx: &PageContext) -> Result<Shell, Response> {
        let next = self.return_to.clone().unwrap_or_else(|| ctx.current_url());

        match access::evaluate(ctx.store.state(), self.forbid_when, &next) {
            AccessDecision::Render => {}
            AccessDecision::RedirectHome => {
                tracing::info!(path = %ctx.path, "viewer forbidden on page, redirecting home");
                let jar = if ctx.mode.is_interactive() {
                    flash::push(ctx.jar.clone(), Notice::AccessDenied, &ctx.config)
                } else {
                    ctx.jar.clone()
                };
                return Err((jar, Redirect::to("/")).into_response());
            }
            AccessDecision::RedirectLogin(href) => {
                return Err(Redirect::to(&href).into_response());
            }
            AccessDecision::Pending => {
                let mut layout = self.view(ctx, false);
                layout.refresh = true;
                return Err(render_page(StatusCode::OK, &PendingPage { layout }));
            }
        }

        if let Some(error) = ctx.store.error().filter(|_| !self.no_handle_errors) {
            return Err(error_page(self.view(ctx, false), error));
        }

        let notices = ctx.mode.is_interactive() && !ctx.notices().is_empty();
        let jar = if notices {
            flash::clear(ctx.jar.clone(), &ctx.config)
        } else {
            CookieJar::new()
        };

        Ok(Shell {
            layout: self.view(ctx, notices),
            jar,
        })
    }

    fn view(&self, ctx: &PageContext, with_notices: bool) -> LayoutView {
        let project_name = ctx.config.project_name.clone();
        let document_title = if self.title.is_empty() {
            project_name.clone()
        } else {
            format!("{} — {}", self.title, project_name)
        };

        let user = ctx.viewer().map(|viewer| UserMenu {
            initial: viewer.initial(),
            name: viewer.name.clone(),
            is_admin: viewer.is_admin,
            warn_unverified: !viewer.is_verified,
        });
        let forbids_logged_in = self.forbid_when.forbids(AuthRestrict::LOGGED_IN);

        let notices = if with_notices {
            ctx.notices()
                .into_iter()
                .map(|notice| NoticeView {
                    css: notice.level().css(),
                    message: notice.message(),
                })
                .collect()
        } else {
            Vec::new()
        };

        LayoutView {
            lang: ctx.lang.code(),
            document_title,
            project_name,
            title: self.title.clone(),
            title_href: self.title_href.clone(),
            show_title: !ctx.is_mobile,
            padded: !self.no_pad,
            refresh: false,
            show_sign_in: user.is_none() && !forbids_logged_in,
            show_register: user.is_none() && ctx.config.enable_registration,
            user,
            sign_in_href: access::login_href(&ctx.current_url()),
            notices,
            display_footer: self.display_footer,
            footer_text: format!("© {} {}.", Utc::now().year(), ctx.config.org_name),
            privacy_url: ctx.config.privacy_url.clone(),
        }
    }
}

/// Shell
///
/// A page that passed the guard. Holds the layout chrome and the cookie changes that
/// must ride along with the rendered page.
pub struct Shell {
    layout: LayoutView,
    jar: CookieJar,
}

impl Shell {
    pub fn render<T: Template>(self, build: impl FnOnce(LayoutView) -> T) -> Response {
        self.render_status(StatusCode::OK, build)
    }

    pub fn render_status<T: Template>(
        self,
        status: StatusCode,
        build: impl FnOnce(LayoutView) -> T,
    ) -> Response {
        let page = build(self.layout);
        (self.jar, render_page(status, &page)).into_response()
    }

    /// Replaces the page content with the error result of a failed page query.
    pub fn error(self, error: &BackendError) -> Response {
        (self.jar, error_page(self.layout, error)).into_response()
    }
}

fn render_page<T: Template>(status: StatusCode, page: &T) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

fn error_page(layout: LayoutView, error: &BackendError) -> Response {
    let status = match error {
        BackendError::Unauthenticated => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_GATEWAY,
    };
    render_page(
        status,
        &ErrorPage {
            layout,
            message: error.to_string(),
            code_label: error.code().map(|code| format!("ERR_{code}")),
        },
    )
}
