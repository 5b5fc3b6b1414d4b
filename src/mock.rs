use std::{
    collections::HashMap,
    sync::{
        PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Duration as TimeDelta, Utc};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::{
    auth,
    error::BackendError,
    models::{
        Connection, Credentials, Event, EventCategory, HomePageData, NewAccount, NewEventCategory,
        Organization, OrganizationMembership, PageRequest, Translated, Viewer,
    },
    repository::Repository,
    subscription::{UPDATE_BUFFER, ViewerSubscription},
};

/// jsonwebtoken's default validation leeway; a token stays usable this long past `exp`.
const EXP_LEEWAY_SECS: usize = 60;

/// MockUser
#[derive(Debug, Clone)]
pub struct MockUser {
    pub viewer: Viewer,
    pub password: String,
}

#[derive(Debug, Default)]
struct MockData {
    users: Vec<MockUser>,
    organizations: Vec<Organization>,
    categories: Vec<EventCategory>,
    events: Vec<Event>,
    /// Logged-out tokens and their `exp`; expired entries are dropped on the next logout.
    revoked: HashMap<String, usize>,
}

/// Injected failures, one slot per operation family.
#[derive(Debug, Default)]
struct Failures {
    viewer: Option<BackendError>,
    home: Option<BackendError>,
    admin_lists: Option<BackendError>,
    create: Option<BackendError>,
    delete: Option<BackendError>,
    logout: Option<BackendError>,
}

/// MockRepository
///
/// In-memory implementation of `Repository`. Backs the local demo mode when no GraphQL
/// endpoint is configured, and the integration tests. Session tokens are real JWTs signed
/// with the configured secret, so the web layer validates them exactly like the service's.
pub struct MockRepository {
    secret: String,
    data: RwLock<MockData>,
    failures: RwLock<Failures>,
    viewer_delay: Option<Duration>,
    updates: broadcast::Sender<(Uuid, Option<Viewer>)>,
    delete_calls: AtomicUsize,
}

fn permission_denied() -> BackendError {
    BackendError::graphql("Permission denied", Some("42501"))
}

impl MockRepository {
    pub fn new(secret: impl Into<String>) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            secret: secret.into(),
            data: RwLock::new(MockData::default()),
            failures: RwLock::new(Failures::default()),
            viewer_delay: None,
            updates,
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// A small, self-consistent data set relative to the current time.
    pub fn demo(secret: impl Into<String>) -> Self {
        let prodeko = Organization {
            id: Uuid::new_v4(),
            name: "Prodeko".to_string(),
            color: Some("#002851".to_string()),
        };
        let athene = Organization {
            id: Uuid::new_v4(),
            name: "Athene".to_string(),
            color: Some("#a51890".to_string()),
        };
        let party = EventCategory {
            id: Uuid::new_v4(),
            name: Translated::new("Juhlat", "Parties"),
            description: Some(Translated::new("Juhlia", "Parties")),
            color: Some("#ff4d4f".to_string()),
            owner_organization: Some(prodeko.clone()),
        };
        let sports = EventCategory {
            id: Uuid::new_v4(),
            name: Translated::new("Urheilu", "Sports"),
            description: Some(Translated::new("Liikuntaa", "Sports")),
            color: Some("#52c41a".to_string()),
            owner_organization: Some(athene.clone()),
        };

        let admin = Viewer {
            id: Uuid::new_v4(),
            name: "Admin".to_string(),
            username: "admin".to_string(),
            is_admin: true,
            is_verified: true,
            organization_memberships: Connection::from_nodes(vec![OrganizationMembership {
                organization: Some(prodeko.clone()),
            }]),
        };
        let member = Viewer {
            id: Uuid::new_v4(),
            name: "Teemu Teekkari".to_string(),
            username: "teemu".to_string(),
            is_admin: false,
            is_verified: false,
            organization_memberships: Connection::default(),
        };

        let mut repo = Self::new(secret)
            .with_user(admin, "admin")
            .with_user(member, "teemu")
            .with_organization(prodeko.clone())
            .with_organization(athene.clone())
            .with_category(party.clone())
            .with_category(sports.clone());

        let samples = [
            ("Vappusitsit", "May Day sitsit", -2, 5, &prodeko, &party),
            ("Sählyturnaus", "Floorball tournament", 3, 10, &athene, &sports),
            ("Pikkujoulut", "Christmas party", -40, -20, &prodeko, &party),
            ("Laskettelureissu", "Ski trip", -60, -45, &athene, &sports),
        ];
        for (fi, en, start_offset, end_offset, org, category) in samples {
            repo = repo.with_event(sample_event(fi, en, start_offset, end_offset, org, category));
        }
        repo
    }

    // --- Builders ---

    pub fn with_user(self, viewer: Viewer, password: &str) -> Self {
        self.data_mut().users.push(MockUser {
            viewer,
            password: password.to_string(),
        });
        self
    }

    pub fn with_organization(self, organization: Organization) -> Self {
        self.data_mut().organizations.push(organization);
        self
    }

    pub fn with_category(self, category: EventCategory) -> Self {
        self.data_mut().categories.push(category);
        self
    }

    pub fn with_event(self, event: Event) -> Self {
        self.data_mut().events.push(event);
        self
    }

    /// Makes every viewer fetch take `delay` before answering.
    pub fn with_viewer_delay(mut self, delay: Duration) -> Self {
        self.viewer_delay = Some(delay);
        self
    }

    pub fn fail_viewer(self, error: BackendError) -> Self {
        self.failures_mut().viewer = Some(error);
        self
    }

    pub fn fail_home(self, error: BackendError) -> Self {
        self.failures_mut().home = Some(error);
        self
    }

    pub fn fail_admin_lists(self, error: BackendError) -> Self {
        self.failures_mut().admin_lists = Some(error);
        self
    }

    pub fn fail_create(self, error: BackendError) -> Self {
        self.failures_mut().create = Some(error);
        self
    }

    pub fn fail_deletes(self, error: BackendError) -> Self {
        self.failures_mut().delete = Some(error);
        self
    }

    pub fn fail_logout(self, error: BackendError) -> Self {
        self.failures_mut().logout = Some(error);
        self
    }

    // --- Inspection ---

    /// Issues a session token for `user_id`, as a successful login would.
    pub fn token_for(&self, user_id: Uuid) -> String {
        auth::issue_token(&self.secret, user_id, Duration::from_secs(3600)).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.data().events.clone()
    }

    pub fn categories(&self) -> Vec<EventCategory> {
        self.data().categories.clone()
    }

    /// Logged-out tokens still remembered.
    pub fn revoked_sessions(&self) -> usize {
        self.data().revoked.len()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Replaces a stored viewer and pushes the change to its subscribers.
    pub fn push_viewer_update(&self, viewer: Viewer) {
        {
            let mut data = self.data_mut();
            if let Some(user) = data.users.iter_mut().find(|u| u.viewer.id == viewer.id) {
                user.viewer = viewer.clone();
            }
        }
        // No subscribers is not an error.
        let _ = self.updates.send((viewer.id, Some(viewer)));
    }

    // --- Internals ---

    fn data(&self) -> RwLockReadGuard<'_, MockData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn data_mut(&self) -> RwLockWriteGuard<'_, MockData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn failures_mut(&self) -> RwLockWriteGuard<'_, Failures> {
        self.failures.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected(&self, pick: impl FnOnce(&Failures) -> Option<BackendError>) -> Result<(), BackendError> {
        let failures = self.failures.read().unwrap_or_else(PoisonError::into_inner);
        match pick(&failures) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn lookup(&self, auth: Option<&str>) -> Option<Viewer> {
        let token = auth?;
        let data = self.data();
        if data.revoked.contains_key(token) {
            return None;
        }
        let claims = auth::decode_token(token, &self.secret)?;
        data.users
            .iter()
            .find(|user| user.viewer.id == claims.sub)
            .map(|user| user.viewer.clone())
    }

    fn require_viewer(&self, auth: Option<&str>) -> Result<Viewer, BackendError> {
        self.lookup(auth).ok_or(BackendError::Unauthenticated)
    }

    fn require_admin(&self, auth: Option<&str>) -> Result<Viewer, BackendError> {
        let viewer = self.require_viewer(auth)?;
        if viewer.is_admin {
            Ok(viewer)
        } else {
            Err(permission_denied())
        }
    }
}

fn sample_event(
    fi: &str,
    en: &str,
    registration_start_days: i64,
    registration_end_days: i64,
    organization: &Organization,
    category: &EventCategory,
) -> Event {
    let now = Utc::now();
    let registration_start_time = now + TimeDelta::days(registration_start_days);
    let registration_end_time = now + TimeDelta::days(registration_end_days);
    Event {
        id: Uuid::new_v4(),
        slug: en.to_lowercase().replace(' ', "-"),
        name: Translated::new(fi, en),
        event_start_time: registration_end_time + TimeDelta::days(2),
        event_end_time: registration_end_time + TimeDelta::days(2) + TimeDelta::hours(6),
        registration_start_time,
        registration_end_time,
        owner_organization: Some(organization.clone()),
        category: Some(category.clone()),
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn current_user(&self, auth: Option<&str>) -> Result<Option<Viewer>, BackendError> {
        if let Some(delay) = self.viewer_delay {
            tokio::time::sleep(delay).await;
        }
        self.injected(|f| f.viewer.clone())?;
        Ok(self.lookup(auth))
    }

    async fn home_page(&self, _auth: Option<&str>) -> Result<HomePageData, BackendError> {
        self.injected(|f| f.home.clone())?;
        let now = Utc::now();
        let data = self.data();

        let mut open: Vec<Event> = data
            .events
            .iter()
            .filter(|e| e.registration_start_time <= now && now < e.registration_end_time)
            .cloned()
            .collect();
        open.sort_by_key(|e| e.registration_end_time);

        let mut upcoming: Vec<Event> = data
            .events
            .iter()
            .filter(|e| e.registration_start_time > now)
            .cloned()
            .collect();
        upcoming.sort_by_key(|e| e.registration_start_time);

        Ok(HomePageData {
            signup_open_events: Connection::from_nodes(open),
            signup_upcoming_events: Connection::from_nodes(upcoming),
            event_categories: Connection::from_nodes(data.categories.clone()),
            organizations: Connection::from_nodes(data.organizations.clone()),
        })
    }

    async fn closed_events(
        &self,
        _auth: Option<&str>,
        page: PageRequest,
    ) -> Result<Connection<Event>, BackendError> {
        self.injected(|f| f.home.clone())?;
        let now = Utc::now();
        let mut closed: Vec<Event> = self
            .data()
            .events
            .iter()
            .filter(|e| e.registration_end_time <= now)
            .cloned()
            .collect();
        closed.sort_by(|a, b| b.event_end_time.cmp(&a.event_end_time));

        let total_count = Some(closed.len() as i64);
        let nodes = closed
            .into_iter()
            .skip(page.offset as usize)
            .take(page.first as usize)
            .collect();
        Ok(Connection { nodes, total_count })
    }

    async fn admin_events(&self, auth: Option<&str>) -> Result<Vec<Event>, BackendError> {
        self.injected(|f| f.admin_lists.clone())?;
        self.require_admin(auth)?;
        let mut events = self.data().events.clone();
        events.sort_by(|a, b| b.event_start_time.cmp(&a.event_start_time));
        Ok(events)
    }

    async fn admin_event_categories(
        &self,
        auth: Option<&str>,
    ) -> Result<Vec<EventCategory>, BackendError> {
        self.injected(|f| f.admin_lists.clone())?;
        self.require_admin(auth)?;
        let mut categories = self.data().categories.clone();
        categories.sort_by(|a, b| a.name.fi.cmp(&b.name.fi));
        Ok(categories)
    }

    async fn login(&self, credentials: &Credentials) -> Result<String, BackendError> {
        let user_id = self
            .data()
            .users
            .iter()
            .find(|u| u.viewer.username == credentials.username && u.password == credentials.password)
            .map(|u| u.viewer.id)
            .ok_or_else(|| BackendError::graphql("Incorrect username or passphrase", Some("CREDS")))?;

        auth::issue_token(&self.secret, user_id, Duration::from_secs(3600))
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn register(&self, account: &NewAccount) -> Result<String, BackendError> {
        let viewer = {
            let mut data = self.data_mut();
            if data.users.iter().any(|u| u.viewer.username == account.username) {
                return Err(BackendError::graphql(
                    "An account with this username has already been registered",
                    Some("NUNIQ"),
                ));
            }
            let viewer = Viewer {
                id: Uuid::new_v4(),
                name: account.name.clone(),
                username: account.username.clone(),
                is_admin: false,
                is_verified: false,
                organization_memberships: Connection::default(),
            };
            data.users.push(MockUser {
                viewer: viewer.clone(),
                password: account.password.clone(),
            });
            viewer
        };

        auth::issue_token(&self.secret, viewer.id, Duration::from_secs(3600))
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn logout(&self, auth: &str) -> Result<(), BackendError> {
        self.injected(|f| f.logout.clone())?;
        let viewer = self.lookup(Some(auth));
        {
            let now = Utc::now().timestamp().max(0) as usize;
            let mut data = self.data_mut();
            data.revoked.retain(|_, exp| *exp + EXP_LEEWAY_SECS > now);
            // A token that no longer decodes is already rejected by `lookup`.
            if let Some(claims) = auth::decode_token(auth, &self.secret) {
                data.revoked.insert(auth.to_string(), claims.exp);
            }
        }
        if let Some(viewer) = viewer {
            let _ = self.updates.send((viewer.id, None));
        }
        Ok(())
    }

    async fn create_event_category(
        &self,
        auth: Option<&str>,
        input: &NewEventCategory,
    ) -> Result<EventCategory, BackendError> {
        self.injected(|f| f.create.clone())?;
        let viewer = self.require_viewer(auth)?;
        let organization = viewer
            .organizations()
            .find(|org| org.id == input.organization_id)
            .cloned()
            .ok_or_else(permission_denied)?;

        let category = EventCategory {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            description: Some(input.description.clone()),
            color: None,
            owner_organization: Some(organization),
        };
        self.data_mut().categories.push(category.clone());
        Ok(category)
    }

    async fn delete_event(&self, auth: Option<&str>, id: Uuid) -> Result<(), BackendError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(|f| f.delete.clone())?;
        self.require_admin(auth)?;

        let mut data = self.data_mut();
        let before = data.events.len();
        data.events.retain(|event| event.id != id);
        if data.events.len() == before {
            return Err(BackendError::graphql(
                "No values were deleted in collection 'events'",
                Some("NTFND"),
            ));
        }
        Ok(())
    }

    async fn delete_event_category(
        &self,
        auth: Option<&str>,
        id: Uuid,
    ) -> Result<(), BackendError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(|f| f.delete.clone())?;
        self.require_admin(auth)?;

        let mut data = self.data_mut();
        let in_use = data
            .events
            .iter()
            .any(|event| event.category.as_ref().is_some_and(|c| c.id == id));
        if in_use {
            return Err(BackendError::graphql(
                "update or delete on table \"event_categories\" violates foreign key constraint",
                Some("23503"),
            ));
        }
        let before = data.categories.len();
        data.categories.retain(|category| category.id != id);
        if data.categories.len() == before {
            return Err(BackendError::graphql(
                "No values were deleted in collection 'eventCategories'",
                Some("NTFND"),
            ));
        }
        Ok(())
    }

    fn subscribe_current_user(&self, auth: String) -> ViewerSubscription {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let mut updates = self.updates.subscribe();
        let initial = self.lookup(Some(&auth));
        let user_id = auth::decode_token(&auth, &self.secret).map(|claims| claims.sub);

        let task = tokio::spawn(async move {
            let gone = initial.is_none();
            if tx.send(initial).await.is_err() || gone {
                return;
            }
            loop {
                match updates.recv().await {
                    Ok((id, viewer)) if Some(id) == user_id => {
                        let gone = viewer.is_none();
                        if tx.send(viewer).await.is_err() || gone {
                            break;
                        }
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        ViewerSubscription::new(rx, task)
    }
}
