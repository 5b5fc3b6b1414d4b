//! GraphQL wire format: operation documents, the request/response envelope and error code
//! extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;

const EVENT_FIELDS: &str = r#"
fragment EventFields on Event {
  id
  slug
  name
  eventStartTime
  eventEndTime
  registrationStartTime
  registrationEndTime
  ownerOrganization { id name color }
  category { id name color }
}
"#;

pub const SHARED_QUERY: &str = r#"
query Shared {
  currentUser {
    id
    name
    username
    isAdmin
    isVerified
    organizationMemberships { nodes { organization { id name color } } }
  }
}
"#;

pub const HOME_PAGE_QUERY: &str = r#"
query HomePage {
  signupOpenEvents { nodes { ...EventFields } }
  signupUpcomingEvents { nodes { ...EventFields } }
  eventCategories { nodes { id name color } }
  organizations { nodes { id name color } }
}
"#;

pub const HOME_PAGE_EVENTS_QUERY: &str = r#"
query HomePageEvents($first: Int!, $offset: Int!) {
  signupClosedEvents(first: $first, offset: $offset, orderBy: EVENT_END_TIME_DESC) {
    totalCount
    nodes { ...EventFields }
  }
}
"#;

pub const ADMIN_EVENTS_QUERY: &str = r#"
query AdminEvents {
  events(orderBy: EVENT_START_TIME_DESC) { totalCount nodes { ...EventFields } }
}
"#;

pub const ADMIN_EVENT_CATEGORIES_QUERY: &str = r#"
query AdminEventCategories {
  eventCategories(orderBy: NAME_ASC) {
    totalCount
    nodes { id name description color ownerOrganization { id name color } }
  }
}
"#;

pub const LOGIN_MUTATION: &str = r#"
mutation Login($username: String!, $password: String!) {
  login(input: { username: $username, password: $password }) { jwtToken }
}
"#;

pub const REGISTER_MUTATION: &str = r#"
mutation Register($username: String!, $email: String!, $name: String!, $password: String!) {
  register(input: { username: $username, email: $email, name: $name, password: $password }) {
    jwtToken
  }
}
"#;

pub const LOGOUT_MUTATION: &str = r#"
mutation Logout {
  logout { success }
}
"#;

pub const CREATE_EVENT_CATEGORY_MUTATION: &str = r#"
mutation CreateEventCategory($name: JSON!, $desc: JSON!, $org_id: UUID!) {
  createEventCategory(
    input: { eventCategory: { name: $name, description: $desc, ownerOrganizationId: $org_id } }
  ) {
    eventCategory { id name description color ownerOrganization { id name color } }
  }
}
"#;

pub const DELETE_EVENT_MUTATION: &str = r#"
mutation DeleteEvent($id: UUID!) {
  deleteEvent(input: { id: $id }) { clientMutationId }
}
"#;

pub const DELETE_EVENT_CATEGORY_MUTATION: &str = r#"
mutation DeleteEventCategory($id: UUID!) {
  deleteEventCategory(input: { id: $id }) { clientMutationId }
}
"#;

/// Appends the shared event fragment to documents that spread it.
pub fn document(operation: &str) -> String {
    if operation.contains("...EventFields") {
        format!("{operation}{EVENT_FIELDS}")
    } else {
        operation.to_string()
    }
}

/// GraphqlRequest
#[derive(Debug, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Value,
}

/// GraphqlResponse
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// GraphqlError
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    /// Error code of a service error. The database error code wins over the generic one.
    pub fn code(&self) -> Option<String> {
        let extensions = self.extensions.as_ref()?;
        [
            extensions.pointer("/exception/errcode"),
            extensions.pointer("/errcode"),
            extensions.pointer("/code"),
        ]
        .into_iter()
        .flatten()
        .find_map(|value| match value {
            Value::String(code) if !code.is_empty() => Some(code.clone()),
            _ => None,
        })
    }
}

impl<T> GraphqlResponse<T> {
    /// The first error wins; a response without errors must carry data.
    pub fn into_result(self) -> Result<T, BackendError> {
        if let Some(error) = self.errors.into_iter().next() {
            let code = error.code();
            return Err(BackendError::GraphQl {
                message: error.message,
                code,
            });
        }
        self.data
            .ok_or_else(|| BackendError::Decode("response carried neither data nor errors".into()))
    }
}
