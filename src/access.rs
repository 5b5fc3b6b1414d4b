//! Access guard shared by every page.

use std::ops::{BitOr, BitOrAssign};

use url::form_urlencoded;

use crate::store::ViewerState;

/// AuthRestrict
///
/// Declarative per-page access constraint. Flags combine with `|`, so a page can forbid
/// several viewer states at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct AuthRestrict(u8);

impl AuthRestrict {
    pub const NEVER: AuthRestrict = AuthRestrict(0);
    pub const LOGGED_OUT: AuthRestrict = AuthRestrict(1 << 0);
    pub const LOGGED_IN: AuthRestrict = AuthRestrict(1 << 1);
    pub const NOT_ADMIN: AuthRestrict = AuthRestrict(1 << 2);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when every flag of `flag` is set.
    pub fn forbids(self, flag: AuthRestrict) -> bool {
        flag.0 != 0 && self.0 & flag.0 == flag.0
    }

    pub fn is_never(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AuthRestrict {
    type Output = AuthRestrict;

    fn bitor(self, rhs: AuthRestrict) -> AuthRestrict {
        AuthRestrict(self.0 | rhs.0)
    }
}

impl BitOrAssign for AuthRestrict {
    fn bitor_assign(&mut self, rhs: AuthRestrict) {
        self.0 |= rhs.0;
    }
}

/// AccessDecision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The viewer may see the page.
    Render,
    /// The viewer is not known yet; render a placeholder and decide later.
    Pending,
    /// A logged-in viewer hit a page that forbids them.
    RedirectHome,
    /// An anonymous viewer hit a page that requires login. Carries the full login URL.
    RedirectLogin(String),
}

/// evaluate
///
/// Decides what to do with a request for a page restricted by `restrict`.
///
/// Home redirects are checked before login redirects. A failed viewer fetch never
/// redirects; the layout renders the error instead. A pending fetch never redirects, and
/// unrestricted pages render without waiting for it.
pub fn evaluate(viewer: &ViewerState, restrict: AuthRestrict, current_path: &str) -> AccessDecision {
    match viewer {
        ViewerState::Pending if restrict.is_never() => AccessDecision::Render,
        ViewerState::Pending => AccessDecision::Pending,
        ViewerState::Present(viewer)
            if restrict.forbids(AuthRestrict::LOGGED_IN)
                || (restrict.forbids(AuthRestrict::NOT_ADMIN) && !viewer.is_admin) =>
        {
            AccessDecision::RedirectHome
        }
        ViewerState::Absent if restrict.forbids(AuthRestrict::LOGGED_OUT) => {
            AccessDecision::RedirectLogin(login_href(current_path))
        }
        _ => AccessDecision::Render,
    }
}

/// `/login?next=<current path>`, with the return target URL-encoded.
pub fn login_href(next: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("/login?{query}")
}

/// Accepts a post-login return target only if it stays on this site.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        // Browsers drop tab, CR and LF from a Location value, so "/\t/x" would become "//x".
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_ascii_control()) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
