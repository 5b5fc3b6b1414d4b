//! Closed-events table of the home page: server pagination plus per-page sorting and
//! filtering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use url::form_urlencoded;

use crate::models::{Event, EventCategory, Lang, Organization, PageRequest};

pub const PAGE_SIZE: u32 = 10;

const DEFAULT_TAG_COLOR: &str = "#8c8c8c";

/// TableQuery
///
/// Query string of the home page. Everything is optional; unknown sort keys are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TableQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub organizer: Option<String>,
    pub category: Option<String>,
}

/// A hand-edited `?page=` never rejects the request; anything but a number reads as unset.
fn lenient_page<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

impl TableQuery {
    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            first: PAGE_SIZE,
            offset: (self.page() - 1).saturating_mul(PAGE_SIZE),
        }
    }

    pub fn sort_key(&self) -> Option<SortKey> {
        self.sort.as_deref().and_then(SortKey::parse)
    }

    pub fn sort_order(&self) -> SortOrder {
        match self.order.as_deref() {
            Some("descend") => SortOrder::Descend,
            _ => SortOrder::Ascend,
        }
    }

    fn non_empty(&self, value: &Option<String>) -> Option<String> {
        value.clone().filter(|v| !v.is_empty())
    }

    /// Query string with the given overrides, dropping empty values.
    fn href(&self, page: u32, sort: Option<(SortKey, SortOrder)>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if page > 1 {
            query.append_pair("page", &page.to_string());
        }
        if let Some((key, order)) = sort {
            query.append_pair("sort", key.as_str());
            query.append_pair("order", order.as_str());
        }
        if let Some(organizer) = self.non_empty(&self.organizer) {
            query.append_pair("organizer", &organizer);
        }
        if let Some(category) = self.non_empty(&self.category) {
            query.append_pair("category", &category);
        }
        let query = query.finish();
        if query.is_empty() {
            "/".to_string()
        } else {
            format!("/?{query}")
        }
    }

    fn current_sort(&self) -> Option<(SortKey, SortOrder)> {
        self.sort_key().map(|key| (key, self.sort_order()))
    }
}

/// SortKey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Organizer,
    Category,
    EndTime,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<SortKey> {
        match raw {
            "name" => Some(SortKey::Name),
            "organizer" => Some(SortKey::Organizer),
            "category" => Some(SortKey::Category),
            "end" => Some(SortKey::EndTime),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Organizer => "organizer",
            SortKey::Category => "category",
            SortKey::EndTime => "end",
        }
    }
}

/// SortOrder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascend,
    Descend,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascend => "ascend",
            SortOrder::Descend => "descend",
        }
    }
}

/// Case-insensitive text comparison.
pub fn text_sorter(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

pub fn date_sorter(a: &DateTime<Utc>, b: &DateTime<Utc>) -> Ordering {
    a.cmp(b)
}

/// Accepts `#rgb` and `#rrggbb` colors, anything else gets the neutral tag color.
pub fn safe_color(color: Option<&str>) -> String {
    match color {
        Some(c)
            if c.starts_with('#')
                && matches!(c.len(), 4 | 7)
                && c[1..].chars().all(|ch| ch.is_ascii_hexdigit()) =>
        {
            c.to_string()
        }
        _ => DEFAULT_TAG_COLOR.to_string(),
    }
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%d.%m.%Y %H:%M").to_string()
}

/// Tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub label: String,
    pub color: String,
}

impl Tag {
    pub fn organizer(event: &Event) -> Option<Tag> {
        event.owner_organization.as_ref().map(|org| Tag {
            label: org.name.clone(),
            color: safe_color(org.color.as_deref()),
        })
    }

    pub fn category(event: &Event, lang: Lang) -> Option<Tag> {
        event.category.as_ref().map(|category| Tag {
            label: category.name.get(lang).to_string(),
            color: safe_color(category.color.as_deref()),
        })
    }
}

/// Column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub sort_href: String,
    pub sorted: Option<&'static str>,
}

/// Row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub name: String,
    pub href: String,
    pub organizer: Option<Tag>,
    pub category: Option<Tag>,
    pub end_time: String,
}

/// FilterOption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub label: String,
    pub selected: bool,
}

/// ClosedEventsTable
///
/// Fully prepared table. `compact` tables (mobile) show only the name and end columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedEventsTable {
    pub compact: bool,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub organizer_filters: Vec<FilterOption>,
    pub category_filters: Vec<FilterOption>,
    pub sort: Option<&'static str>,
    pub order: &'static str,
    pub page: u32,
    pub page_count: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub reset_href: String,
}

/// Distinct non-empty names, first occurrence wins.
fn distinct(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for name in names {
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

fn filter_options(names: Vec<String>, selected: Option<&str>) -> Vec<FilterOption> {
    names
        .into_iter()
        .map(|label| FilterOption {
            selected: selected == Some(label.as_str()),
            label,
        })
        .collect()
}

/// build
///
/// Applies the filters and the sorter of `query` to one page of closed events fetched
/// from the service, and prepares headers, filters and pagination links.
pub fn build(
    page: Vec<Event>,
    total_count: Option<i64>,
    organizations: &[Organization],
    categories: &[EventCategory],
    query: &TableQuery,
    lang: Lang,
    compact: bool,
) -> ClosedEventsTable {
    let organizer_filter = query.non_empty(&query.organizer);
    let category_filter = query.non_empty(&query.category);

    let mut events: Vec<Event> = page
        .into_iter()
        .filter(|event| match &organizer_filter {
            Some(wanted) => event
                .owner_organization
                .as_ref()
                .is_some_and(|org| &org.name == wanted),
            None => true,
        })
        .filter(|event| match &category_filter {
            Some(wanted) => event
                .category
                .as_ref()
                .is_some_and(|category| category.name.get(lang) == wanted),
            None => true,
        })
        .collect();

    if let Some((key, order)) = query.current_sort() {
        let organizer = |e: &Event| e.owner_organization.as_ref().map(|o| o.name.clone()).unwrap_or_default();
        let category = |e: &Event| {
            e.category
                .as_ref()
                .map(|c| c.name.get(lang).to_string())
                .unwrap_or_default()
        };
        events.sort_by(|a, b| {
            let ordering = match key {
                SortKey::Name => text_sorter(a.name.get(lang), b.name.get(lang)),
                SortKey::Organizer => text_sorter(&organizer(a), &organizer(b)),
                SortKey::Category => text_sorter(&category(a), &category(b)),
                SortKey::EndTime => date_sorter(&a.event_end_time, &b.event_end_time),
            };
            match order {
                SortOrder::Ascend => ordering,
                SortOrder::Descend => ordering.reverse(),
            }
        });
    }

    let keys: &[(SortKey, &'static str)] = if compact {
        &[(SortKey::Name, "Name"), (SortKey::EndTime, "Ended")]
    } else {
        &[
            (SortKey::Name, "Name"),
            (SortKey::Organizer, "Organizer"),
            (SortKey::Category, "Category"),
            (SortKey::EndTime, "Ended"),
        ]
    };
    let current = query.current_sort();
    let columns = keys
        .iter()
        .map(|&(key, title)| {
            let next_order = match current {
                Some((k, SortOrder::Ascend)) if k == key => SortOrder::Descend,
                _ => SortOrder::Ascend,
            };
            Column {
                title,
                sort_href: query.href(1, Some((key, next_order))),
                sorted: current
                    .filter(|(k, _)| *k == key)
                    .map(|(_, order)| order.as_str()),
            }
        })
        .collect();

    let rows = events
        .iter()
        .map(|event| Row {
            name: event.name.get(lang).to_string(),
            href: format!("/event/{}", event.slug),
            organizer: Tag::organizer(event),
            category: Tag::category(event, lang),
            end_time: format_time(&event.event_end_time),
        })
        .collect();

    let total = total_count.unwrap_or(0).max(0) as u32;
    let page_count = total.div_ceil(PAGE_SIZE).max(1);
    // The rows come from the requested window, so the label follows it too.
    let current_page = query.page();
    let prev_page = (current_page > 1).then(|| (current_page - 1).min(page_count));

    ClosedEventsTable {
        compact,
        columns,
        rows,
        organizer_filters: filter_options(
            distinct(organizations.iter().map(|org| org.name.clone())),
            organizer_filter.as_deref(),
        ),
        category_filters: filter_options(
            distinct(categories.iter().map(|c| c.name.get(lang).to_string())),
            category_filter.as_deref(),
        ),
        sort: current.map(|(key, _)| key.as_str()),
        order: query.sort_order().as_str(),
        page: current_page,
        page_count,
        prev_href: prev_page.map(|page| query.href(page, current)),
        next_href: (current_page < page_count).then(|| query.href(current_page + 1, current)),
        reset_href: "/".to_string(),
    }
}
