use crate::client::{ApiResult, GuildApi};
use crate::{Event, EventRole, Signup};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outcome of creating an event and announcing it on Discord.
///
/// The announcement is a side effect: its failure never undoes the creation.
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: Event,
    pub discord_warning: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Events<'a> {
    api: &'a GuildApi,
}

impl GuildApi {
    pub fn events(&self) -> Events<'_> {
        Events { api: self }
    }
}

impl Events<'_> {
    pub async fn upcoming(&self) -> ApiResult<Vec<Event>> {
        self.api.get_query("/events", &[("upcoming", "1")]).await
    }

    pub async fn get(&self, slug: &str) -> ApiResult<Event> {
        self.api.get(&format!("/events/{slug}")).await
    }

    pub async fn create(&self, new: &NewEvent) -> ApiResult<Event> {
        self.api.post("/events", new).await
    }

    /// Creates the event, then asks the backend to publish it to Discord.
    pub async fn create_and_publish(&self, new: &NewEvent) -> ApiResult<PublishedEvent> {
        let event = self.create(new).await?;
        let discord_warning = match self.api.discord().publish_event(event.id).await {
            Ok(()) => None,
            Err(e) => {
                warn!("event {} created but Discord publish failed: {e}", event.slug);
                Some(format!(
                    "Event created, but the Discord announcement failed: {}",
                    e.user_message()
                ))
            }
        };
        Ok(PublishedEvent { event, discord_warning })
    }

    pub async fn update(&self, slug: &str, update: &EventUpdate) -> ApiResult<Event> {
        self.api.put(&format!("/events/{slug}"), update).await
    }

    pub async fn delete(&self, slug: &str) -> ApiResult<()> {
        self.api.delete(&format!("/events/{slug}")).await
    }

    pub async fn sign_up(&self, slug: &str, role_id: Option<u64>) -> ApiResult<Signup> {
        self.api
            .post(
                &format!("/events/{slug}/signups"),
                &serde_json::json!({ "role_id": role_id }),
            )
            .await
    }

    pub async fn withdraw(&self, slug: &str) -> ApiResult<()> {
        self.api.delete(&format!("/events/{slug}/signups/me")).await
    }

    pub async fn check_in(&self, slug: &str) -> ApiResult<Signup> {
        self.api
            .post(&format!("/events/{slug}/checkin"), &serde_json::json!({}))
            .await
    }

    pub async fn add_role(&self, slug: &str, name: &str, capacity: Option<u32>) -> ApiResult<EventRole> {
        self.api
            .post(
                &format!("/events/{slug}/roles"),
                &serde_json::json!({ "name": name, "capacity": capacity }),
            )
            .await
    }

    pub async fn remove_role(&self, slug: &str, role_id: u64) -> ApiResult<()> {
        self.api.delete(&format!("/events/{slug}/roles/{role_id}")).await
    }
}
