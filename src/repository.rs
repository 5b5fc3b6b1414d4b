use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::BackendError,
    graphql::{self, GraphqlRequest, GraphqlResponse},
    models::{
        Connection, Credentials, Event, EventCategory, HomePageData, NewAccount, NewEventCategory,
        PageRequest, Viewer,
    },
    subscription::{UPDATE_BUFFER, ViewerSubscription},
};

/// Repository Trait
///
/// Abstract contract for every operation the pages consume from the data service. Handlers
/// only see this trait, so the GraphQL client and the in-memory service are interchangeable.
///
/// `auth` is the bearer token of the current session, if any.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Queries ---
    async fn current_user(&self, auth: Option<&str>) -> Result<Option<Viewer>, BackendError>;
    async fn home_page(&self, auth: Option<&str>) -> Result<HomePageData, BackendError>;
    // Events whose registration has closed, newest first.
    async fn closed_events(
        &self,
        auth: Option<&str>,
        page: PageRequest,
    ) -> Result<Connection<Event>, BackendError>;
    async fn admin_events(&self, auth: Option<&str>) -> Result<Vec<Event>, BackendError>;
    async fn admin_event_categories(
        &self,
        auth: Option<&str>,
    ) -> Result<Vec<EventCategory>, BackendError>;

    // --- Session ---
    // Both return the session token issued by the service.
    async fn login(&self, credentials: &Credentials) -> Result<String, BackendError>;
    async fn register(&self, account: &NewAccount) -> Result<String, BackendError>;
    async fn logout(&self, auth: &str) -> Result<(), BackendError>;

    // --- Admin Mutations ---
    async fn create_event_category(
        &self,
        auth: Option<&str>,
        input: &NewEventCategory,
    ) -> Result<EventCategory, BackendError>;
    async fn delete_event(&self, auth: Option<&str>, id: Uuid) -> Result<(), BackendError>;
    async fn delete_event_category(&self, auth: Option<&str>, id: Uuid)
    -> Result<(), BackendError>;

    // --- Subscriptions ---
    // Pushes the viewer of `auth` whenever it changes. Dropping the handle unsubscribes.
    fn subscribe_current_user(&self, auth: String) -> ViewerSubscription;
}

// tokio intervals panic on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// RepositoryState
///
/// The concrete type used to share the data service across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Response Shapes ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharedData {
    current_user: Option<Viewer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosedEventsData {
    signup_closed_events: Connection<Event>,
}

#[derive(Deserialize)]
struct AdminEventsData {
    events: Connection<Event>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminEventCategoriesData {
    event_categories: Connection<EventCategory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JwtPayload {
    jwt_token: Option<String>,
}

#[derive(Deserialize)]
struct LoginData {
    login: Option<JwtPayload>,
}

#[derive(Deserialize)]
struct RegisterData {
    register: Option<JwtPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedEventCategory {
    event_category: Option<EventCategory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventCategoryData {
    create_event_category: Option<CreatedEventCategory>,
}

fn token_or_error(payload: Option<JwtPayload>) -> Result<String, BackendError> {
    payload
        .and_then(|payload| payload.jwt_token)
        .ok_or_else(|| BackendError::Decode("no session token in response".into()))
}

/// GraphqlRepository
///
/// The concrete implementation of the `Repository` trait, speaking GraphQL over HTTP.
#[derive(Clone)]
pub struct GraphqlRepository {
    client: reqwest::Client,
    endpoint: String,
    poll_interval: Duration,
}

impl GraphqlRepository {
    pub fn new(endpoint: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            poll_interval,
        }
    }

    /// execute
    ///
    /// Sends one operation and unwraps the response envelope. GraphQL errors win over
    /// HTTP status codes because the service reports most failures with a JSON body.
    async fn execute<T: DeserializeOwned + Send>(
        &self,
        auth: Option<&str>,
        operation: &str,
        variables: Value,
    ) -> Result<T, BackendError> {
        let mut request = self.client.post(&self.endpoint).json(&GraphqlRequest {
            query: graphql::document(operation),
            variables,
        });
        if let Some(token) = auth {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<GraphqlResponse<T>>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if status == reqwest::StatusCode::UNAUTHORIZED => {
                Err(BackendError::Unauthenticated)
            }
            Err(_) if !status.is_success() => {
                Err(BackendError::Network(format!("data service returned {status}")))
            }
            Err(e) => Err(BackendError::Decode(e.to_string())),
        }
    }
}

#[async_trait]
impl Repository for GraphqlRepository {
    async fn current_user(&self, auth: Option<&str>) -> Result<Option<Viewer>, BackendError> {
        let data: SharedData = self.execute(auth, graphql::SHARED_QUERY, json!({})).await?;
        Ok(data.current_user)
    }

    async fn home_page(&self, auth: Option<&str>) -> Result<HomePageData, BackendError> {
        self.execute(auth, graphql::HOME_PAGE_QUERY, json!({})).await
    }

    async fn closed_events(
        &self,
        auth: Option<&str>,
        page: PageRequest,
    ) -> Result<Connection<Event>, BackendError> {
        let data: ClosedEventsData = self
            .execute(
                auth,
                graphql::HOME_PAGE_EVENTS_QUERY,
                json!({ "first": page.first, "offset": page.offset }),
            )
            .await?;
        Ok(data.signup_closed_events)
    }

    async fn admin_events(&self, auth: Option<&str>) -> Result<Vec<Event>, BackendError> {
        let data: AdminEventsData = self
            .execute(auth, graphql::ADMIN_EVENTS_QUERY, json!({}))
            .await?;
        Ok(data.events.nodes)
    }

    async fn admin_event_categories(
        &self,
        auth: Option<&str>,
    ) -> Result<Vec<EventCategory>, BackendError> {
        let data: AdminEventCategoriesData = self
            .execute(auth, graphql::ADMIN_EVENT_CATEGORIES_QUERY, json!({}))
            .await?;
        Ok(data.event_categories.nodes)
    }

    async fn login(&self, credentials: &Credentials) -> Result<String, BackendError> {
        let data: LoginData = self
            .execute(
                None,
                graphql::LOGIN_MUTATION,
                json!({ "username": credentials.username, "password": credentials.password }),
            )
            .await?;
        token_or_error(data.login)
    }

    async fn register(&self, account: &NewAccount) -> Result<String, BackendError> {
        let data: RegisterData = self
            .execute(
                None,
                graphql::REGISTER_MUTATION,
                json!({
                    "username": account.username,
                    "email": account.email,
                    "name": account.name,
                    "password": account.password,
                }),
            )
            .await?;
        token_or_error(data.register)
    }

    async fn logout(&self, auth: &str) -> Result<(), BackendError> {
        let _: Value = self
            .execute(Some(auth), graphql::LOGOUT_MUTATION, json!({}))
            .await?;
        Ok(())
    }

    async fn create_event_category(
        &self,
        auth: Option<&str>,
        input: &NewEventCategory,
    ) -> Result<EventCategory, BackendError> {
        let data: CreateEventCategoryData = self
            .execute(
                auth,
                graphql::CREATE_EVENT_CATEGORY_MUTATION,
                json!({
                    "name": input.name,
                    "desc": input.description,
                    "org_id": input.organization_id,
                }),
            )
            .await?;
        data.create_event_category
            .and_then(|created| created.event_category)
            .ok_or_else(|| BackendError::Decode("created event category missing".into()))
    }

    async fn delete_event(&self, auth: Option<&str>, id: Uuid) -> Result<(), BackendError> {
        let _: Value = self
            .execute(auth, graphql::DELETE_EVENT_MUTATION, json!({ "id": id }))
            .await?;
        Ok(())
    }

    async fn delete_event_category(
        &self,
        auth: Option<&str>,
        id: Uuid,
    ) -> Result<(), BackendError> {
        let _: Value = self
            .execute(
                auth,
                graphql::DELETE_EVENT_CATEGORY_MUTATION,
                json!({ "id": id }),
            )
            .await?;
        Ok(())
    }

    /// subscribe_current_user
    ///
    /// The service's websocket subscription is replaced by polling the shared query and
    /// emitting only when the viewer changed. The first poll runs immediately.
    fn subscribe_current_user(&self, auth: String) -> ViewerSubscription {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let repo = self.clone();

        let task = tokio::spawn(async move {
            let mut last: Option<Option<Viewer>> = None;
            let mut ticker = tokio::time::interval(repo.poll_interval.max(MIN_POLL_INTERVAL));
            loop {
                ticker.tick().await;
                let viewer = match repo.current_user(Some(&auth)).await {
                    Ok(viewer) => viewer,
                    Err(e) => {
                        tracing::warn!(error = %e, "current user poll failed");
                        continue;
                    }
                };
                if last.as_ref() == Some(&viewer) {
                    continue;
                }
                last = Some(viewer.clone());
                let gone = viewer.is_none();
                if tx.send(viewer).await.is_err() || gone {
                    break;
                }
            }
        });

        ViewerSubscription::new(rx, task)
    }
}
