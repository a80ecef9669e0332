use crate::client::{ApiResult, GuildApi};
use crate::{JoinRequest, MemberRole, MembershipPolicy, Membership, Organization, Visibility};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct NewOrganization {
    pub tag: String,
    pub name: String,
    pub visibility: Visibility,
    pub membership_policy: MembershipPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_policy: Option<MembershipPolicy>,
}

#[derive(Debug, Clone, Copy)]
pub struct Organizations<'a> {
    api: &'a GuildApi,
}

impl GuildApi {
    pub fn organizations(&self) -> Organizations<'_> {
        Organizations { api: self }
    }
}

impl Organizations<'_> {
    pub async fn list(&self) -> ApiResult<Vec<Organization>> {
        self.api.get("/organizations").await
    }

    pub async fn get(&self, id: u64) -> ApiResult<Organization> {
        self.api.get(&format!("/organizations/{id}")).await
    }

    pub async fn create(&self, new: &NewOrganization) -> ApiResult<Organization> {
        self.api.post("/organizations", new).await
    }

    pub async fn update(&self, id: u64, update: &OrganizationUpdate) -> ApiResult<Organization> {
        self.api.put(&format!("/organizations/{id}"), update).await
    }

    /// Join an organization with an open membership policy.
    pub async fn join(&self, id: u64) -> ApiResult<Membership> {
        self.api
            .post(&format!("/organizations/{id}/join"), &serde_json::json!({}))
            .await
    }

    /// Apply to a `request_only` organization; a moderator decides later.
    pub async fn request_join(&self, id: u64, message: Option<&str>) -> ApiResult<JoinRequest> {
        self.api
            .post(
                &format!("/organizations/{id}/join-requests"),
                &serde_json::json!({ "message": message }),
            )
            .await
    }

    pub async fn leave(&self, id: u64) -> ApiResult<()> {
        self.api.post_empty(&format!("/organizations/{id}/leave")).await
    }

    pub async fn members(&self, id: u64) -> ApiResult<Vec<Membership>> {
        self.api.get(&format!("/organizations/{id}/members")).await
    }

    pub async fn set_member_role(&self, id: u64, user_id: u64, role: MemberRole) -> ApiResult<Membership> {
        self.api
            .put(
                &format!("/organizations/{id}/members/{user_id}"),
                &serde_json::json!({ "role": role }),
            )
            .await
    }

    pub async fn remove_member(&self, id: u64, user_id: u64) -> ApiResult<()> {
        self.api
            .delete(&format!("/organizations/{id}/members/{user_id}"))
            .await
    }

    pub async fn join_requests(&self, id: u64) -> ApiResult<Vec<JoinRequest>> {
        self.api.get(&format!("/organizations/{id}/join-requests")).await
    }

    pub async fn approve(&self, id: u64, request_id: u64) -> ApiResult<Membership> {
        self.api
            .post(
                &format!("/organizations/{id}/join-requests/{request_id}/approve"),
                &serde_json::json!({}),
            )
            .await
    }

    pub async fn reject(&self, id: u64, request_id: u64) -> ApiResult<()> {
        self.api
            .post_empty(&format!("/organizations/{id}/join-requests/{request_id}/reject"))
            .await
    }
}
