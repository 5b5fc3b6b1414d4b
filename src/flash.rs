//! One-time notices carried across a redirect in a short-lived cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::AppConfig;

pub const FLASH_COOKIE: &str = "ilmo_flash";

const FLASH_TTL_SECS: i64 = 60;

/// NoticeLevel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl NoticeLevel {
    pub fn css(self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        }
    }
}

/// Notice
///
/// A message shown once on the next rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    AccessDenied,
    EventDeleted,
    EventCategoryDeleted,
    EventCategoryCreated,
    LoggedIn,
    LoggedOut,
    Registered,
}

impl Notice {
    const ALL: [Notice; 7] = [
        Notice::AccessDenied,
        Notice::EventDeleted,
        Notice::EventCategoryDeleted,
        Notice::EventCategoryCreated,
        Notice::LoggedIn,
        Notice::LoggedOut,
        Notice::Registered,
    ];

    /// Cookie representation.
    pub fn key(self) -> &'static str {
        match self {
            Notice::AccessDenied => "access-denied",
            Notice::EventDeleted => "event-deleted",
            Notice::EventCategoryDeleted => "event-category-deleted",
            Notice::EventCategoryCreated => "event-category-created",
            Notice::LoggedIn => "logged-in",
            Notice::LoggedOut => "logged-out",
            Notice::Registered => "registered",
        }
    }

    pub fn from_key(key: &str) -> Option<Notice> {
        Self::ALL.into_iter().find(|notice| notice.key() == key)
    }

    pub fn level(self) -> NoticeLevel {
        match self {
            Notice::AccessDenied => NoticeLevel::Error,
            Notice::LoggedOut => NoticeLevel::Info,
            _ => NoticeLevel::Success,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::AccessDenied => "You do not have permission to access that page.",
            Notice::EventDeleted => "Event deleted.",
            Notice::EventCategoryDeleted => "Event category deleted.",
            Notice::EventCategoryCreated => "Event category created.",
            Notice::LoggedIn => "Signed in.",
            Notice::LoggedOut => "Signed out.",
            Notice::Registered => "Account created. Welcome!",
        }
    }
}

/// Notices queued on the incoming request. Unknown keys are ignored.
pub fn read(jar: &CookieJar) -> Vec<Notice> {
    jar.get(FLASH_COOKIE)
        .map(|cookie| {
            cookie
                .value()
                .split('.')
                .filter_map(Notice::from_key)
                .collect()
        })
        .unwrap_or_default()
}

/// Appends `notice` to the queue, keeping notices already queued on this request.
pub fn push(jar: CookieJar, notice: Notice, config: &AppConfig) -> CookieJar {
    let mut queued = read(&jar);
    if !queued.contains(&notice) {
        queued.push(notice);
    }
    let value = queued
        .iter()
        .map(|notice| notice.key())
        .collect::<Vec<_>>()
        .join(".");

    jar.add(flash_cookie(value, time::Duration::seconds(FLASH_TTL_SECS), config))
}

/// Drops the queue once it has been shown.
pub fn clear(jar: CookieJar, config: &AppConfig) -> CookieJar {
    jar.add(flash_cookie(String::new(), time::Duration::ZERO, config))
}

fn flash_cookie(value: String, max_age: time::Duration, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure())
        .max_age(max_age)
        .build()
}
