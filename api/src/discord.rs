use crate::DiscordConfig;
use crate::client::{ApiResult, GuildApi};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscordConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcement_channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_publish_events: Option<bool>,
}

/// Thin wrapper over the backend's Discord endpoints; the bot itself lives server-side.
#[derive(Debug, Clone, Copy)]
pub struct Discord<'a> {
    api: &'a GuildApi,
}

impl GuildApi {
    pub fn discord(&self) -> Discord<'_> {
        Discord { api: self }
    }
}

impl Discord<'_> {
    pub async fn config(&self, organization_id: u64) -> ApiResult<DiscordConfig> {
        self.api
            .get(&format!("/organizations/{organization_id}/discord"))
            .await
    }

    pub async fn update_config(
        &self,
        organization_id: u64,
        update: &DiscordConfigUpdate,
    ) -> ApiResult<DiscordConfig> {
        self.api
            .put(&format!("/organizations/{organization_id}/discord"), update)
            .await
    }

    pub async fn publish_event(&self, event_id: u64) -> ApiResult<()> {
        self.api
            .post_empty(&format!("/discord/events/{event_id}/publish"))
            .await
    }
}
