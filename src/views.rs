//! Askama view models. Every value a template prints is computed here, templates only
//! branch and loop.

use askama::Template;

use crate::{
    error::ActionError,
    settings::{NavEntry, SettingsSection},
    table::{ClosedEventsTable, Tag},
};

// --- Shared Chrome ---

/// UserMenu
pub struct UserMenu {
    pub initial: String,
    pub name: String,
    pub is_admin: bool,
    pub warn_unverified: bool,
}

/// NoticeView
pub struct NoticeView {
    pub css: &'static str,
    pub message: &'static str,
}

/// LayoutView
///
/// Header, notices and footer of the shared layout.
pub struct LayoutView {
    pub lang: &'static str,
    pub document_title: String,
    pub project_name: String,
    pub title: String,
    pub title_href: Option<String>,
    pub show_title: bool,
    pub padded: bool,
    pub refresh: bool,
    pub user: Option<UserMenu>,
    pub show_sign_in: bool,
    pub sign_in_href: String,
    pub show_register: bool,
    pub notices: Vec<NoticeView>,
    pub display_footer: bool,
    pub footer_text: String,
    pub privacy_url: Option<String>,
}

/// Banner
///
/// Inline, dismissible error banner of a failed action.
pub struct Banner {
    pub message: String,
    pub code_label: Option<String>,
    pub dismiss_href: String,
}

impl Banner {
    pub fn new(error: &ActionError, dismiss_href: impl Into<String>) -> Self {
        Self {
            message: error.message.clone(),
            code_label: error.code.as_ref().map(|code| format!("ERR_{code}")),
            dismiss_href: dismiss_href.into(),
        }
    }
}

// --- Generic Pages ---

#[derive(Template)]
#[template(path = "pages/pending.html")]
pub struct PendingPage {
    pub layout: LayoutView,
}

#[derive(Template)]
#[template(path = "pages/error.html")]
pub struct ErrorPage {
    pub layout: LayoutView,
    pub message: String,
    pub code_label: Option<String>,
}

// --- Home ---

/// EventCard
pub struct EventCard {
    pub name: String,
    pub href: String,
    pub organizer: Option<Tag>,
    pub category: Option<Tag>,
    pub registration: String,
    pub event_time: String,
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomePage {
    pub layout: LayoutView,
    pub open_events: Vec<EventCard>,
    pub upcoming_events: Vec<EventCard>,
    pub table: ClosedEventsTable,
}

// --- Settings ---

#[derive(Template)]
#[template(path = "pages/settings.html")]
pub struct SettingsView {
    pub layout: LayoutView,
    pub nav: Vec<NavEntry>,
    pub section: SettingsSection,
}

// --- Event Categories ---

/// SelectOption
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "pages/create_event_category.html")]
pub struct CreateEventCategoryPage {
    pub layout: LayoutView,
    pub organizations: Vec<SelectOption>,
    pub name_fi: String,
    pub name_en: String,
    pub description_fi: String,
    pub description_en: String,
    pub errors: Vec<String>,
    pub alert: Option<Banner>,
}

// --- Admin ---

/// AdminRow
pub struct AdminRow {
    pub cells: Vec<String>,
    pub update_href: String,
    pub delete_href: String,
}

#[derive(Template)]
#[template(path = "pages/admin_list.html")]
pub struct AdminListPage {
    pub layout: LayoutView,
    pub tabs: Vec<AdminTab>,
    pub columns: Vec<&'static str>,
    pub rows: Vec<AdminRow>,
    pub banner: Option<Banner>,
}

/// AdminTab
pub struct AdminTab {
    pub href: String,
    pub title: &'static str,
    pub active: bool,
}

#[derive(Template)]
#[template(path = "pages/confirm_delete.html")]
pub struct ConfirmDeletePage {
    pub layout: LayoutView,
    pub prompt: String,
    pub action_href: String,
    pub cancel_href: String,
}

// --- Session ---

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginPage {
    pub layout: LayoutView,
    pub next: String,
    pub username: String,
    pub alert: Option<Banner>,
    pub register_href: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterPage {
    pub layout: LayoutView,
    pub username: String,
    pub name: String,
    pub email: String,
    pub errors: Vec<String>,
    pub alert: Option<Banner>,
    pub terms_url: Option<String>,
}
