//! Settings area: fixed page descriptors and the side navigation built from them.

use crate::models::Viewer;

/// TitleStyle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStyle {
    Normal,
    Danger,
}

/// SettingsPage
///
/// The settings sub-pages, in navigation order. The first variant is the fallback for
/// unknown paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsPage {
    Profile,
    Security,
    Accounts,
    Emails,
    Delete,
}

impl SettingsPage {
    pub const ALL: [SettingsPage; 5] = [
        SettingsPage::Profile,
        SettingsPage::Security,
        SettingsPage::Accounts,
        SettingsPage::Emails,
        SettingsPage::Delete,
    ];

    pub fn href(self) -> &'static str {
        match self {
            SettingsPage::Profile => "/settings",
            SettingsPage::Security => "/settings/security",
            SettingsPage::Accounts => "/settings/accounts",
            SettingsPage::Emails => "/settings/emails",
            SettingsPage::Delete => "/settings/delete",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SettingsPage::Profile => "Profile",
            SettingsPage::Security => "Password",
            SettingsPage::Accounts => "Linked accounts",
            SettingsPage::Emails => "Emails",
            SettingsPage::Delete => "Delete account",
        }
    }

    pub fn warn_if_unverified(self) -> bool {
        matches!(self, SettingsPage::Emails)
    }

    pub fn title_style(self) -> TitleStyle {
        match self {
            SettingsPage::Delete => TitleStyle::Danger,
            _ => TitleStyle::Normal,
        }
    }

    /// Stable hook for end-to-end tests.
    pub fn test_id(self) -> &'static str {
        match self {
            SettingsPage::Profile => "settingslayout-link-profile",
            SettingsPage::Security => "settingslayout-link-password",
            SettingsPage::Accounts => "settingslayout-link-accounts",
            SettingsPage::Emails => "settingslayout-link-emails",
            SettingsPage::Delete => "settingslayout-link-delete",
        }
    }

    /// Exact match on the descriptor path, or the first descriptor.
    pub fn resolve(href: &str) -> SettingsPage {
        let href = match href.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Self::ALL
            .into_iter()
            .find(|page| page.href() == href)
            .unwrap_or(Self::ALL[0])
    }
}

/// NavEntry
///
/// One line of the settings side menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub href: &'static str,
    pub title: &'static str,
    pub test_id: &'static str,
    pub active: bool,
    pub warn: bool,
    pub danger: bool,
}

/// Builds the side menu with `active` highlighted. Entries that ask for it carry a
/// warning while the viewer is unverified.
pub fn compose(active: SettingsPage, viewer: Option<&Viewer>) -> Vec<NavEntry> {
    let unverified = viewer.is_some_and(|viewer| !viewer.is_verified);
    SettingsPage::ALL
        .into_iter()
        .map(|page| NavEntry {
            href: page.href(),
            title: page.title(),
            test_id: page.test_id(),
            active: page == active,
            warn: unverified && page.warn_if_unverified(),
            danger: page.title_style() == TitleStyle::Danger,
        })
        .collect()
}

/// SettingsSection
///
/// Body of a settings page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSection {
    pub heading: String,
    pub lines: Vec<String>,
    pub warning: Option<String>,
}

pub fn section(page: SettingsPage, viewer: Option<&Viewer>) -> SettingsSection {
    let name = viewer.map(|v| v.name.clone()).unwrap_or_default();
    let username = viewer.map(|v| v.username.clone()).unwrap_or_default();
    let verified = viewer.is_some_and(|v| v.is_verified);

    match page {
        SettingsPage::Profile => SettingsSection {
            heading: "Edit profile".to_string(),
            lines: vec![format!("Name: {name}"), format!("Username: {username}")],
            warning: None,
        },
        SettingsPage::Security => SettingsSection {
            heading: "Change password".to_string(),
            lines: vec!["Passwords are managed by the sign-in service.".to_string()],
            warning: None,
        },
        SettingsPage::Accounts => SettingsSection {
            heading: "Linked accounts".to_string(),
            lines: vec!["No external accounts are linked to this user.".to_string()],
            warning: None,
        },
        SettingsPage::Emails => SettingsSection {
            heading: "Email addresses".to_string(),
            lines: vec![if verified {
                "Your primary email address is verified.".to_string()
            } else {
                "Your primary email address has not been verified yet.".to_string()
            }],
            warning: (!verified)
                .then(|| "Check your inbox for the verification link.".to_string()),
        },
        SettingsPage::Delete => SettingsSection {
            heading: "Delete account".to_string(),
            lines: vec![
                "Deleting your account removes your registrations permanently.".to_string(),
            ],
            warning: Some("This cannot be undone.".to_string()),
        },
    }
}
