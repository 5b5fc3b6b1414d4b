use axum::{extract::Query, http::Uri};
use chrono::{TimeZone, Utc};
use ilmo::{
    models::{Event, EventCategory, Lang, Organization, Translated},
    table::{self, PAGE_SIZE, SortKey, TableQuery, safe_color, text_sorter},
};
use std::cmp::Ordering;
use uuid::Uuid;

fn organization(name: &str) -> Organization {
    Organization {
        id: Uuid::new_v4(),
        name: name.to_string(),
        color: Some("#002851".to_string()),
    }
}

fn category(fi: &str, en: &str) -> EventCategory {
    EventCategory {
        id: Uuid::new_v4(),
        name: Translated::new(fi, en),
        ..Default::default()
    }
}

fn event(name: &str, end_day: u32, org: &Organization, cat: &EventCategory) -> Event {
    let end = Utc.with_ymd_and_hms(2024, 5, end_day, 18, 0, 0).unwrap();
    Event {
        id: Uuid::new_v4(),
        slug: name.to_lowercase(),
        name: Translated::new(name, name),
        event_start_time: end,
        event_end_time: end,
        registration_start_time: end,
        registration_end_time: end,
        owner_organization: Some(org.clone()),
        category: Some(cat.clone()),
    }
}

struct Fixture {
    organizations: Vec<Organization>,
    categories: Vec<EventCategory>,
    events: Vec<Event>,
}

fn fixture() -> Fixture {
    let prodeko = organization("Prodeko");
    let athene = organization("Athene");
    let party = category("Juhlat", "Parties");
    let sports = category("Urheilu", "Sports");
    let events = vec![
        event("banquet", 3, &prodeko, &party),
        event("Appro", 1, &athene, &party),
        event("Cup", 2, &athene, &sports),
    ];
    Fixture {
        organizations: vec![prodeko, athene.clone(), athene],
        categories: vec![party, sports],
        events,
    }
}

fn build(query: &TableQuery, compact: bool) -> table::ClosedEventsTable {
    let f = fixture();
    table::build(
        f.events,
        Some(23),
        &f.organizations,
        &f.categories,
        query,
        Lang::En,
        compact,
    )
}

fn names(t: &table::ClosedEventsTable) -> Vec<String> {
    t.rows.iter().map(|r| r.name.clone()).collect()
}

#[test]
fn test_page_request_windows() {
    assert_eq!(TableQuery::default().page_request().offset, 0);
    let third = TableQuery {
        page: Some(3),
        ..Default::default()
    };
    assert_eq!(third.page_request().first, PAGE_SIZE);
    assert_eq!(third.page_request().offset, 20);
    let zero = TableQuery {
        page: Some(0),
        ..Default::default()
    };
    assert_eq!(zero.page(), 1);
}

#[test]
fn test_text_sorter_ignores_case() {
    assert_eq!(text_sorter("appro", "Banquet"), Ordering::Less);
    assert_eq!(text_sorter("ABC", "abc"), Ordering::Equal);
}

#[test]
fn test_unsorted_table_keeps_service_order() {
    let t = build(&TableQuery::default(), false);
    assert_eq!(names(&t), vec!["banquet", "Appro", "Cup"]);
    assert!(t.columns.iter().all(|c| c.sorted.is_none()));
}

#[test]
fn test_name_sort_ascending_and_descending() {
    let asc = build(
        &TableQuery {
            sort: Some("name".into()),
            ..Default::default()
        },
        false,
    );
    assert_eq!(names(&asc), vec!["Appro", "banquet", "Cup"]);
    assert_eq!(asc.columns[0].sorted, Some("ascend"));
    // Clicking the sorted column again flips the order
    assert_eq!(asc.columns[0].sort_href, "/?sort=name&order=descend");

    let desc = build(
        &TableQuery {
            sort: Some("name".into()),
            order: Some("descend".into()),
            ..Default::default()
        },
        false,
    );
    assert_eq!(names(&desc), vec!["Cup", "banquet", "Appro"]);
}

#[test]
fn test_date_sort_by_end_time() {
    let t = build(
        &TableQuery {
            sort: Some(SortKey::EndTime.as_str().into()),
            ..Default::default()
        },
        false,
    );
    assert_eq!(names(&t), vec!["Appro", "Cup", "banquet"]);
}

#[test]
fn test_filters_by_organizer_and_category() {
    let by_org = build(
        &TableQuery {
            organizer: Some("Athene".into()),
            ..Default::default()
        },
        false,
    );
    assert_eq!(names(&by_org), vec!["Appro", "Cup"]);

    let both = build(
        &TableQuery {
            organizer: Some("Athene".into()),
            category: Some("Parties".into()),
            ..Default::default()
        },
        false,
    );
    assert_eq!(names(&both), vec!["Appro"]);
}

#[test]
fn test_filter_options_are_distinct_names() {
    let t = build(
        &TableQuery {
            organizer: Some("Athene".into()),
            ..Default::default()
        },
        false,
    );
    let orgs: Vec<&str> = t.organizer_filters.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(orgs, vec!["Prodeko", "Athene"]);
    assert!(t.organizer_filters[1].selected);

    let cats: Vec<&str> = t.category_filters.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(cats, vec!["Parties", "Sports"]);
}

#[test]
fn test_compact_table_shows_name_and_end_only() {
    let t = build(&TableQuery::default(), true);
    let titles: Vec<&str> = t.columns.iter().map(|c| c.title).collect();
    assert_eq!(titles, vec!["Name", "Ended"]);
}

#[test]
fn test_pagination_links_keep_filters() {
    let t = build(
        &TableQuery {
            page: Some(2),
            organizer: Some("Athene".into()),
            ..Default::default()
        },
        false,
    );
    assert_eq!(t.page, 2);
    assert_eq!(t.page_count, 3);
    assert_eq!(t.prev_href.as_deref(), Some("/?organizer=Athene"));
    assert_eq!(t.next_href.as_deref(), Some("/?page=3&organizer=Athene"));
}

#[test]
fn test_page_past_the_end_keeps_requested_label() {
    let f = fixture();
    let query = TableQuery {
        page: Some(5),
        ..Default::default()
    };
    let t = table::build(
        Vec::new(),
        Some(3),
        &f.organizations,
        &f.categories,
        &query,
        Lang::En,
        false,
    );
    assert!(t.rows.is_empty());
    assert_eq!(t.page, 5);
    assert_eq!(t.page_count, 1);
    // Back leads to the last real page
    assert_eq!(t.prev_href.as_deref(), Some("/"));
    assert_eq!(t.next_href, None);
}

#[test]
fn test_page_query_parses_leniently() {
    let parse = |uri: &'static str| -> TableQuery {
        Query::try_from_uri(&Uri::from_static(uri)).unwrap().0
    };
    assert_eq!(parse("/?page=4").page(), 4);
    assert_eq!(parse("/?page=abc").page(), 1);
    assert_eq!(parse("/?page=-1").page(), 1);
    assert_eq!(parse("/?page=").page(), 1);
    assert_eq!(parse("/?page=abc&organizer=Athene").organizer.as_deref(), Some("Athene"));
}

#[test]
fn test_rows_link_to_event_pages() {
    let t = build(&TableQuery::default(), false);
    assert_eq!(t.rows[0].href, "/event/banquet");
    assert_eq!(t.rows[0].end_time, "03.05.2024 18:00");
}

#[test]
fn test_safe_color() {
    assert_eq!(safe_color(Some("#abc")), "#abc");
    assert_eq!(safe_color(Some("#A1B2C3")), "#A1B2C3");
    assert_eq!(safe_color(Some("red; background: url(x)")), "#8c8c8c");
    assert_eq!(safe_color(Some("#12345g")), "#8c8c8c");
    assert_eq!(safe_color(None), "#8c8c8c");
}
