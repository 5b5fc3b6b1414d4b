//! Admin table actions.

use uuid::Uuid;

use crate::{error::ActionError, flash::Notice, repository::Repository};

/// AdminResource
///
/// Entity kinds managed through the admin list views. The URL segment doubles as the
/// resource name in admin paths: `/admin/{segment}/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminResource {
    Event,
    EventCategory,
}

impl AdminResource {
    pub const ALL: [AdminResource; 2] = [AdminResource::Event, AdminResource::EventCategory];

    pub fn from_segment(segment: &str) -> Option<AdminResource> {
        Self::ALL.into_iter().find(|r| r.segment() == segment)
    }

    pub fn segment(self) -> &'static str {
        match self {
            AdminResource::Event => "event",
            AdminResource::EventCategory => "event-category",
        }
    }

    pub fn list_title(self) -> &'static str {
        match self {
            AdminResource::Event => "Events",
            AdminResource::EventCategory => "Event categories",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            AdminResource::Event => "event",
            AdminResource::EventCategory => "event category",
        }
    }

    pub fn list_href(self) -> String {
        format!("/admin/{}/list", self.segment())
    }

    pub fn update_href(self, id: Uuid) -> String {
        format!("/admin/{}/update/{id}", self.segment())
    }

    pub fn delete_href(self, id: Uuid) -> String {
        format!("/admin/{}/delete/{id}", self.segment())
    }

    pub fn confirm_prompt(self) -> String {
        format!("Are you sure you want to delete this {}?", self.singular())
    }

    pub fn deleted_notice(self) -> Notice {
        match self {
            AdminResource::Event => Notice::EventDeleted,
            AdminResource::EventCategory => Notice::EventCategoryDeleted,
        }
    }
}

/// delete_entity
///
/// Runs the delete mutation for `resource`. Confirmation happens before this is called;
/// failures are returned for the inline banner and never retried.
pub async fn delete_entity(
    repo: &dyn Repository,
    auth: Option<&str>,
    resource: AdminResource,
    id: Uuid,
) -> Result<(), ActionError> {
    let result = match resource {
        AdminResource::Event => repo.delete_event(auth, id).await,
        AdminResource::EventCategory => repo.delete_event_category(auth, id).await,
    };

    match result {
        Ok(()) => {
            tracing::info!(resource = resource.segment(), %id, "entity deleted");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                resource = resource.segment(),
                %id,
                error = %e,
                code = e.code().unwrap_or("-"),
                "delete rejected"
            );
            Err(ActionError::from(e))
        }
    }
}
