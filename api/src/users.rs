use crate::User;
use crate::client::{ApiResult, GuildApi};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Users<'a> {
    api: &'a GuildApi,
}

impl GuildApi {
    pub fn users(&self) -> Users<'_> {
        Users { api: self }
    }
}

impl Users<'_> {
    pub async fn me(&self) -> ApiResult<User> {
        self.api.get("/users/me").await
    }

    pub async fn get(&self, id: u64) -> ApiResult<User> {
        self.api.get(&format!("/users/{id}")).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        self.api.patch("/users/me", update).await
    }

    pub async fn search(&self, handle: &str) -> ApiResult<Vec<User>> {
        self.api.get_query("/users", &[("search", handle)]).await
    }
}
