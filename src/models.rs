use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Service Schemas (as returned by the GraphQL service) ---

/// Lang
///
/// The two content languages the service stores translated fields in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Fi,
    En,
}

impl Lang {
    /// Picks the first supported language from an `Accept-Language` header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| {
                raw.split(',')
                    .map(|tag| tag.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
                    .find_map(|tag| match tag.split('-').next() {
                        Some("fi") => Some(Lang::Fi),
                        Some("en") => Some(Lang::En),
                        _ => None,
                    })
            })
            .unwrap_or_default()
    }

    pub fn code(self) -> &'static str {
        match self {
            Lang::Fi => "fi",
            Lang::En => "en",
        }
    }
}

/// Translated
///
/// A text field stored in both content languages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Translated {
    #[serde(default)]
    pub fi: String,
    #[serde(default)]
    pub en: String,
}

impl Translated {
    pub fn new(fi: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            fi: fi.into(),
            en: en.into(),
        }
    }

    /// Returns the text in `lang`, falling back to the other language when empty.
    pub fn get(&self, lang: Lang) -> &str {
        let (wanted, other) = match lang {
            Lang::Fi => (&self.fi, &self.en),
            Lang::En => (&self.en, &self.fi),
        };
        if wanted.trim().is_empty() { other } else { wanted }
    }
}

/// Connection
///
/// The `{ nodes, totalCount }` list envelope used by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    #[serde(default)]
    pub total_count: Option<i64>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            total_count: None,
        }
    }
}

impl<T> Connection<T> {
    pub fn from_nodes(nodes: Vec<T>) -> Self {
        let total_count = Some(nodes.len() as i64);
        Self { nodes, total_count }
    }
}

/// Organization
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// OrganizationMembership
///
/// Membership row of the viewer. The organization may be hidden by row-level policies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMembership {
    #[serde(default)]
    pub organization: Option<Organization>,
}

/// Viewer
///
/// The authenticated user of the current request. Read-only to pages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub organization_memberships: Connection<OrganizationMembership>,
}

impl Viewer {
    /// Organizations the viewer is a member of, in service order.
    pub fn organizations(&self) -> impl Iterator<Item = &Organization> {
        self.organization_memberships
            .nodes
            .iter()
            .filter_map(|membership| membership.organization.as_ref())
    }

    /// Avatar letter: first character of the name, or `?`.
    pub fn initial(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// EventCategory
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCategory {
    pub id: Uuid,
    pub name: Translated,
    #[serde(default)]
    pub description: Option<Translated>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub owner_organization: Option<Organization>,
}

/// Event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub slug: String,
    pub name: Translated,
    pub event_start_time: DateTime<Utc>,
    pub event_end_time: DateTime<Utc>,
    pub registration_start_time: DateTime<Utc>,
    pub registration_end_time: DateTime<Utc>,
    #[serde(default)]
    pub owner_organization: Option<Organization>,
    #[serde(default)]
    pub category: Option<EventCategory>,
}

/// HomePageData
///
/// Result of the home page query: the two card sections plus the filter sources
/// for the closed events table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePageData {
    #[serde(default)]
    pub signup_open_events: Connection<Event>,
    #[serde(default)]
    pub signup_upcoming_events: Connection<Event>,
    #[serde(default)]
    pub event_categories: Connection<EventCategory>,
    #[serde(default)]
    pub organizations: Connection<Organization>,
}

/// PageRequest
///
/// Offset pagination window for server paginated tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub first: u32,
    pub offset: u32,
}

// --- Mutation Inputs ---

/// NewEventCategory
///
/// Validated input of the create-event-category mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEventCategory {
    pub name: Translated,
    pub description: Translated,
    pub organization_id: Uuid,
}

/// Credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// NewAccount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
}
