use std::convert::Infallible;

use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse, Redirect, Response,
        sse::{self, KeepAlive, Sse},
    },
};
use axum_extra::extract::cookie::CookieJar;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    access::{self, AuthRestrict},
    actions::{self, AdminResource},
    auth::{self, Session},
    config::AppConfig,
    context::{PageContext, with_query},
    error::ActionError,
    flash::{self, Notice},
    layout::SharedLayout,
    models::{Credentials, Event, Lang, NewAccount, NewEventCategory, Translated, Viewer},
    repository::RepositoryState,
    settings::{self, SettingsPage},
    table::{self, Tag, TableQuery, format_time},
    views::{
        AdminListPage, AdminRow, AdminTab, Banner, ConfirmDeletePage, CreateEventCategoryPage,
        EventCard, HomePage, LayoutView, LoginPage, RegisterPage, SelectOption, SettingsView,
    },
};

/// Handlers return the page on `Ok` and a guard outcome (redirect, pending, error) on `Err`.
type PageResult = Result<Response, Response>;

fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

// --- Home ---

enum CardKind {
    Open,
    Upcoming,
}

fn event_card(event: &Event, kind: &CardKind, lang: Lang) -> EventCard {
    let registration = match kind {
        CardKind::Open => format!(
            "Registration open until {}",
            format_time(&event.registration_end_time)
        ),
        CardKind::Upcoming => format!(
            "Registration opens {}",
            format_time(&event.registration_start_time)
        ),
    };
    EventCard {
        name: event.name.get(lang).to_string(),
        href: format!("/event/{}", event.slug),
        organizer: Tag::organizer(event),
        category: Tag::category(event, lang),
        registration,
        event_time: format!(
            "{} - {}",
            format_time(&event.event_start_time),
            format_time(&event.event_end_time)
        ),
    }
}

/// home
///
/// [Public Route] Event cards for open and upcoming registrations followed by the
/// paginated table of closed registrations. Both queries run concurrently.
pub async fn home(ctx: PageContext, Query(query): Query<TableQuery>) -> PageResult {
    let shell = SharedLayout::new("").enter(&ctx)?;
    let auth = ctx.auth();

    let (home, closed) = tokio::join!(
        ctx.repo.home_page(auth),
        ctx.repo.closed_events(auth, query.page_request()),
    );
    let (home, closed) = match (home, closed) {
        (Ok(home), Ok(closed)) => (home, closed),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(
                error = %e,
                telemetry = ctx.config.telemetry_enabled(),
                "home page query failed"
            );
            return Ok(shell.error(&e));
        }
    };

    let table = table::build(
        closed.nodes,
        closed.total_count,
        &home.organizations.nodes,
        &home.event_categories.nodes,
        &query,
        ctx.lang,
        ctx.is_mobile,
    );
    let cards = |events: &[Event], kind: CardKind| -> Vec<EventCard> {
        events.iter().map(|e| event_card(e, &kind, ctx.lang)).collect()
    };

    Ok(shell.render(|layout| HomePage {
        layout,
        open_events: cards(&home.signup_open_events.nodes, CardKind::Open),
        upcoming_events: cards(&home.signup_upcoming_events.nodes, CardKind::Upcoming),
        table,
    }))
}

// --- Settings ---

/// settings
///
/// [Authenticated Route] Serves every `/settings/*` path. Unknown sub-paths fall back to
/// the first settings page. The login redirect returns to the resolved page.
pub async fn settings(ctx: PageContext) -> PageResult {
    let page = SettingsPage::resolve(&ctx.path);
    let shell = SharedLayout::new(format!("Settings: {}", page.title()))
        .title_href(page.href())
        .forbid_when(AuthRestrict::LOGGED_OUT)
        .no_pad()
        .return_to(with_query(page.href(), ctx.query.as_deref()))
        .enter(&ctx)?;

    let viewer = ctx.viewer();
    Ok(shell.render(|layout| SettingsView {
        layout,
        nav: settings::compose(page, viewer),
        section: settings::section(page, viewer),
    }))
}

// --- Event Categories ---

/// EventCategoryForm
///
/// Raw form body of the create-event-category page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventCategoryForm {
    pub organization_id: String,
    pub name_fi: String,
    pub name_en: String,
    pub description_fi: String,
    pub description_en: String,
}

impl EventCategoryForm {
    /// Every field is required, and the organizer must be one of the viewer's.
    pub fn validate(&self, viewer: &Viewer) -> Result<NewEventCategory, Vec<String>> {
        let mut errors = Vec::new();

        let organization_id = Uuid::parse_str(self.organization_id.trim())
            .ok()
            .filter(|id| viewer.organizations().any(|org| org.id == *id));
        if organization_id.is_none() {
            errors.push("Select an organizer.".to_string());
        }
        if self.name_fi.trim().is_empty() || self.name_en.trim().is_empty() {
            errors.push("Provide a name in both languages.".to_string());
        }
        if self.description_fi.trim().is_empty() || self.description_en.trim().is_empty() {
            errors.push("Provide a description in both languages.".to_string());
        }

        match organization_id {
            Some(organization_id) if errors.is_empty() => Ok(NewEventCategory {
                name: Translated::new(self.name_fi.trim(), self.name_en.trim()),
                description: Translated::new(self.description_fi.trim(), self.description_en.trim()),
                organization_id,
            }),
            _ => Err(errors),
        }
    }
}

fn category_layout() -> SharedLayout {
    SharedLayout::new("Create event category").forbid_when(AuthRestrict::LOGGED_OUT)
}

fn category_page(
    layout: LayoutView,
    viewer: Option<&Viewer>,
    form: &EventCategoryForm,
    errors: Vec<String>,
    alert: Option<Banner>,
) -> CreateEventCategoryPage {
    let organizations = viewer
        .map(|viewer| {
            viewer
                .organizations()
                .map(|org| SelectOption {
                    value: org.id.to_string(),
                    label: org.name.clone(),
                    selected: org.id.to_string() == form.organization_id,
                })
                .collect()
        })
        .unwrap_or_default();

    CreateEventCategoryPage {
        layout,
        organizations,
        name_fi: form.name_fi.clone(),
        name_en: form.name_en.clone(),
        description_fi: form.description_fi.clone(),
        description_en: form.description_en.clone(),
        errors,
        alert,
    }
}

/// Viewers without organization memberships cannot own a category.
fn has_memberships(ctx: &PageContext) -> bool {
    ctx.viewer()
        .is_some_and(|viewer| viewer.organizations().next().is_some())
}

/// create_event_category_form
///
/// [Authenticated Route] Renders the empty create-event-category form.
pub async fn create_event_category_form(ctx: PageContext) -> PageResult {
    let shell = category_layout().enter(&ctx)?;
    if !has_memberships(&ctx) {
        return Ok(Redirect::to("/").into_response());
    }

    let form = EventCategoryForm::default();
    Ok(shell.render(|layout| category_page(layout, ctx.viewer(), &form, Vec::new(), None)))
}

/// create_event_category
///
/// [Authenticated Route] Validates and submits the form. A rejected mutation re-renders
/// the form with the error alert and is reported to the telemetry log.
pub async fn create_event_category(
    ctx: PageContext,
    Form(form): Form<EventCategoryForm>,
) -> PageResult {
    let shell = category_layout().enter(&ctx)?;
    let Some(viewer) = ctx.viewer().filter(|_| has_memberships(&ctx)) else {
        return Ok(Redirect::to("/").into_response());
    };

    let input = match form.validate(viewer) {
        Ok(input) => input,
        Err(errors) => {
            return Ok(shell.render_status(StatusCode::UNPROCESSABLE_ENTITY, |layout| {
                category_page(layout, Some(viewer), &form, errors, None)
            }));
        }
    };

    match ctx.repo.create_event_category(ctx.auth(), &input).await {
        Ok(category) => {
            tracing::info!(id = %category.id, "event category created");
            let jar = flash::push(ctx.jar.clone(), Notice::EventCategoryCreated, &ctx.config);
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                code = e.code().unwrap_or("-"),
                telemetry = ctx.config.telemetry_enabled(),
                "event category creation failed"
            );
            let alert = Banner::new(&ActionError::from(&e), "/create-event-category");
            Ok(shell.render(|layout| category_page(layout, Some(viewer), &form, Vec::new(), Some(alert))))
        }
    }
}

// --- Admin ---

fn admin_layout(resource: AdminResource) -> SharedLayout {
    SharedLayout::new(resource.list_title())
        .title_href(resource.list_href())
        .forbid_when(AuthRestrict::LOGGED_OUT | AuthRestrict::NOT_ADMIN)
        .hide_footer()
}

fn admin_resource(segment: &str) -> Result<AdminResource, Response> {
    AdminResource::from_segment(segment).ok_or_else(not_found)
}

/// Renders the list of `resource`, optionally with the banner of a failed action.
async fn render_admin_list(
    ctx: &PageContext,
    resource: AdminResource,
    banner: Option<Banner>,
) -> PageResult {
    let shell = admin_layout(resource).enter(ctx)?;
    let auth = ctx.auth();
    let lang = ctx.lang;

    let listed = match resource {
        AdminResource::Event => ctx.repo.admin_events(auth).await.map(|events| {
            let columns = vec!["Name", "Organizer", "Starts"];
            let rows = events
                .iter()
                .map(|event| AdminRow {
                    cells: vec![
                        event.name.get(lang).to_string(),
                        event
                            .owner_organization
                            .as_ref()
                            .map(|org| org.name.clone())
                            .unwrap_or_default(),
                        format_time(&event.event_start_time),
                    ],
                    update_href: resource.update_href(event.id),
                    delete_href: resource.delete_href(event.id),
                })
                .collect();
            (columns, rows)
        }),
        AdminResource::EventCategory => {
            ctx.repo.admin_event_categories(auth).await.map(|categories| {
                let columns = vec!["Name", "Organizer", "Description"];
                let rows = categories
                    .iter()
                    .map(|category| AdminRow {
                        cells: vec![
                            category.name.get(lang).to_string(),
                            category
                                .owner_organization
                                .as_ref()
                                .map(|org| org.name.clone())
                                .unwrap_or_default(),
                            category
                                .description
                                .as_ref()
                                .map(|d| d.get(lang).to_string())
                                .unwrap_or_default(),
                        ],
                        update_href: resource.update_href(category.id),
                        delete_href: resource.delete_href(category.id),
                    })
                    .collect();
                (columns, rows)
            })
        }
    };

    let (columns, rows) = match listed {
        Ok(listed) => listed,
        Err(e) => {
            tracing::error!(
                error = %e,
                resource = resource.segment(),
                telemetry = ctx.config.telemetry_enabled(),
                "admin list query failed"
            );
            return Ok(shell.error(&e));
        }
    };

    let tabs = AdminResource::ALL
        .into_iter()
        .map(|tab| AdminTab {
            href: tab.list_href(),
            title: tab.list_title(),
            active: tab == resource,
        })
        .collect();

    Ok(shell.render(|layout| AdminListPage {
        layout,
        tabs,
        columns,
        rows,
        banner,
    }))
}

/// admin_list
///
/// [Admin Route] Table of events or event categories with update and delete actions.
pub async fn admin_list(ctx: PageContext, Path(segment): Path<String>) -> PageResult {
    let resource = admin_resource(&segment)?;
    render_admin_list(&ctx, resource, None).await
}

/// confirm_delete
///
/// [Admin Route] Confirmation prompt of the delete action.
pub async fn confirm_delete(
    ctx: PageContext,
    Path((segment, id)): Path<(String, Uuid)>,
) -> PageResult {
    let resource = admin_resource(&segment)?;
    let shell = admin_layout(resource).enter(&ctx)?;

    Ok(shell.render(|layout| ConfirmDeletePage {
        layout,
        prompt: resource.confirm_prompt(),
        action_href: resource.delete_href(id),
        cancel_href: resource.list_href(),
    }))
}

/// DeleteForm
#[derive(Debug, Default, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub confirm: Option<String>,
}

/// delete_entity
///
/// [Admin Route] Runs the delete mutation once confirmed. Success flashes a notice and
/// returns to the list; failure re-renders the list with the item intact and an
/// inline banner. Unconfirmed submissions go back to the prompt without mutating.
pub async fn delete_entity(
    ctx: PageContext,
    Path((segment, id)): Path<(String, Uuid)>,
    Form(form): Form<DeleteForm>,
) -> PageResult {
    let resource = admin_resource(&segment)?;
    admin_layout(resource).enter(&ctx)?;

    if form.confirm.as_deref() != Some("yes") {
        return Ok(Redirect::to(&resource.delete_href(id)).into_response());
    }

    match actions::delete_entity(ctx.repo.as_ref(), ctx.auth(), resource, id).await {
        Ok(()) => {
            let jar = flash::push(ctx.jar.clone(), resource.deleted_notice(), &ctx.config);
            Ok((jar, Redirect::to(&resource.list_href())).into_response())
        }
        Err(error) => {
            let banner = Banner::new(&error, resource.list_href());
            render_admin_list(&ctx, resource, Some(banner)).await
        }
    }
}

// --- Session ---

fn register_href(config: &AppConfig) -> Option<String> {
    config.enable_registration.then(|| "/register".to_string())
}

/// NextQuery
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// A broken session must not block signing in again.
fn login_layout() -> SharedLayout {
    SharedLayout::new("Sign in")
        .forbid_when(AuthRestrict::LOGGED_IN)
        .no_handle_errors()
}

/// login_form
///
/// [Public Route] Login page. Signed-in viewers are sent home.
pub async fn login_form(ctx: PageContext, Query(query): Query<NextQuery>) -> PageResult {
    let shell = login_layout().enter(&ctx)?;
    Ok(shell.render(|layout| LoginPage {
        layout,
        next: access::safe_next(query.next.as_deref()),
        username: String::new(),
        alert: None,
        register_href: register_href(&ctx.config),
    }))
}

/// LoginForm
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

/// login
///
/// [Public Route] Exchanges credentials for a session token, stores it in the session
/// cookie and continues to the local `next` path.
pub async fn login(ctx: PageContext, Form(form): Form<LoginForm>) -> PageResult {
    let shell = login_layout().enter(&ctx)?;
    let credentials = Credentials {
        username: form.username.trim().to_string(),
        password: form.password,
    };
    let next = access::safe_next(form.next.as_deref());

    match ctx.repo.login(&credentials).await {
        Ok(token) => {
            tracing::info!(username = %credentials.username, "user signed in");
            let jar = ctx.jar.clone().add(auth::session_cookie(token, &ctx.config));
            let jar = flash::push(jar, Notice::LoggedIn, &ctx.config);
            Ok((jar, Redirect::to(&next)).into_response())
        }
        Err(e) => {
            tracing::warn!(username = %credentials.username, error = %e, "sign in rejected");
            let alert = Banner::new(&ActionError::from(&e), "/login");
            Ok(shell.render_status(StatusCode::UNAUTHORIZED, |layout| LoginPage {
                layout,
                next,
                username: credentials.username.clone(),
                alert: Some(alert),
                register_href: register_href(&ctx.config),
            }))
        }
    }
}

/// RegisterForm
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

const MIN_PASSWORD_LEN: usize = 8;

impl RegisterForm {
    pub fn validate(&self) -> Result<NewAccount, Vec<String>> {
        let mut errors = Vec::new();
        let username = self.username.trim();
        let valid_username = (2..=24).contains(&username.chars().count())
            && username.starts_with(|c: char| c.is_ascii_alphabetic())
            && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_username {
            errors.push(
                "Username must be 2-24 letters, digits or underscores and start with a letter."
                    .to_string(),
            );
        }
        if self.name.trim().is_empty() {
            errors.push("Provide your name.".to_string());
        }
        if !self.email.contains('@') {
            errors.push("Provide a valid email address.".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters."
            ));
        }
        if self.password != self.confirm {
            errors.push("Passwords do not match.".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewAccount {
            username: username.to_string(),
            email: self.email.trim().to_string(),
            name: self.name.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

fn register_layout() -> SharedLayout {
    SharedLayout::new("Register")
        .forbid_when(AuthRestrict::LOGGED_IN)
        .no_handle_errors()
}

fn register_page(
    layout: LayoutView,
    config: &AppConfig,
    form: &RegisterForm,
    errors: Vec<String>,
    alert: Option<Banner>,
) -> RegisterPage {
    RegisterPage {
        layout,
        username: form.username.clone(),
        name: form.name.clone(),
        email: form.email.clone(),
        errors,
        alert,
        terms_url: config.t_and_c_url.clone(),
    }
}

/// register_form
///
/// [Public Route] Registration page. Answers 404 while registration is disabled.
pub async fn register_form(ctx: PageContext) -> PageResult {
    if !ctx.config.enable_registration {
        return Err(not_found());
    }
    let shell = register_layout().enter(&ctx)?;
    Ok(shell.render(|layout| {
        register_page(layout, &ctx.config, &RegisterForm::default(), Vec::new(), None)
    }))
}

/// register
///
/// [Public Route] Creates the account and signs the new user in.
pub async fn register(ctx: PageContext, Form(form): Form<RegisterForm>) -> PageResult {
    if !ctx.config.enable_registration {
        return Err(not_found());
    }
    let shell = register_layout().enter(&ctx)?;

    let account = match form.validate() {
        Ok(account) => account,
        Err(errors) => {
            return Ok(shell.render_status(StatusCode::UNPROCESSABLE_ENTITY, |layout| {
                register_page(layout, &ctx.config, &form, errors, None)
            }));
        }
    };

    match ctx.repo.register(&account).await {
        Ok(token) => {
            tracing::info!(username = %account.username, "account registered");
            let jar = ctx.jar.clone().add(auth::session_cookie(token, &ctx.config));
            let jar = flash::push(jar, Notice::Registered, &ctx.config);
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(e) => {
            tracing::warn!(username = %account.username, error = %e, "registration rejected");
            let alert = Banner::new(&ActionError::from(&e), "/register");
            Ok(shell.render(|layout| {
                register_page(layout, &ctx.config, &form, Vec::new(), Some(alert))
            }))
        }
    }
}

fn signed_out(jar: CookieJar, config: &AppConfig) -> Response {
    let jar = jar.add(auth::clear_session_cookie(config));
    let jar = flash::push(jar, Notice::LoggedOut, config);
    (jar, Redirect::to("/")).into_response()
}

/// logout
///
/// [Public Route] Ends the session with the data service. If the service call fails the
/// browser is sent to the hard `GET /logout`, which clears the session unconditionally.
pub async fn logout(
    State(repo): State<RepositoryState>,
    State(config): State<AppConfig>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let Some(session) = Session::from_headers(&headers, &config) else {
        return signed_out(jar, &config);
    };

    match repo.logout(&session.token).await {
        Ok(()) => {
            tracing::info!(user_id = %session.user_id, "user signed out");
            signed_out(jar, &config)
        }
        Err(e) => {
            tracing::error!(
                user_id = %session.user_id,
                error = %e,
                telemetry = config.telemetry_enabled(),
                "logout failed, forcing hard logout"
            );
            Redirect::to("/logout").into_response()
        }
    }
}

/// hard_logout
///
/// [Public Route] Drops the session cookie without asking the data service.
pub async fn hard_logout(State(config): State<AppConfig>, jar: CookieJar) -> Response {
    signed_out(jar, &config)
}

// --- Live Updates ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUserUpdate {
    current_user: Option<Viewer>,
}

fn current_user_event(update: Option<Viewer>) -> sse::Event {
    sse::Event::default()
        .event("currentUserUpdated")
        .json_data(CurrentUserUpdate {
            current_user: update,
        })
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not encode current user update");
            sse::Event::default().comment("update dropped")
        })
}

/// live_current_user
///
/// [Public Route] Server-sent events carrying every change of the current user. Without
/// a session there is nothing to watch and the stream is not opened. The subscription
/// ends with the connection: dropping the stream drops the subscription handle.
pub async fn live_current_user(
    State(repo): State<RepositoryState>,
    State(config): State<AppConfig>,
    headers: HeaderMap,
) -> Response {
    let Some(session) = Session::from_headers(&headers, &config) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let subscription = repo.subscribe_current_user(session.token);
    let updates = stream::unfold(subscription, |mut subscription| async move {
        let update = subscription.next().await?;
        Some((Ok::<_, Infallible>(current_user_event(update)), subscription))
    });

    Sse::new(updates)
        .keep_alive(KeepAlive::default())
        .into_response()
}
