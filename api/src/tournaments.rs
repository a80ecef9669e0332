use crate::client::{ApiError, ApiResult, GuildApi};
use crate::permissions::MIN_TEAMS_TO_START;
use crate::{
    Attachment, Match, PlayerSearch, Team, TeamInvitation, Tournament, TournamentFormat,
    TournamentState,
};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

pub const EQUAL_SCORES: &str = "scores cannot be equal";
pub const NOT_ENOUGH_TEAMS: &str = "tournament needs at least 2 teams";
pub const SCHEDULE_IN_PAST: &str = "match cannot be scheduled in the past";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub score_a: u32,
    pub score_b: u32,
}

impl ScoreReport {
    pub fn new(score_a: u32, score_b: u32) -> Self {
        Self { score_a, score_b }
    }

    /// Draws are not representable in a bracket; reject before hitting the server.
    pub fn validate(&self) -> ApiResult<()> {
        if self.score_a == self.score_b {
            return Err(ApiError::Invalid(EQUAL_SCORES.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTournament {
    pub name: String,
    pub format: TournamentFormat,
    pub team_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_teams: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TournamentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_teams: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TournamentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TournamentState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<u64>,
}

/// Tournament, team, match and attachment endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Tournaments<'a> {
    api: &'a GuildApi,
}

impl GuildApi {
    pub fn tournaments(&self) -> Tournaments<'_> {
        Tournaments { api: self }
    }
}

impl Tournaments<'_> {
    pub async fn list(&self, filter: &TournamentFilter) -> ApiResult<Vec<Tournament>> {
        self.api.get_query("/tournaments", filter).await
    }

    pub async fn get(&self, slug: &str) -> ApiResult<Tournament> {
        self.api.get(&format!("/tournaments/{slug}")).await
    }

    pub async fn create(&self, new: &NewTournament) -> ApiResult<Tournament> {
        self.api.post("/tournaments", new).await
    }

    pub async fn update(&self, slug: &str, update: &TournamentUpdate) -> ApiResult<Tournament> {
        self.api.put(&format!("/tournaments/{slug}"), update).await
    }

    // -----------------------------------------------------------------------
    // Lifecycle transitions
    // -----------------------------------------------------------------------

    pub async fn open_registration(&self, slug: &str) -> ApiResult<Tournament> {
        self.transition(slug, "open-registration").await
    }

    pub async fn close_registration(&self, slug: &str) -> ApiResult<Tournament> {
        self.transition(slug, "close-registration").await
    }

    pub async fn reopen_registration(&self, slug: &str) -> ApiResult<Tournament> {
        self.transition(slug, "reopen-registration").await
    }

    /// Starts the tournament. The team-count check runs client-side first.
    pub async fn start(&self, tournament: &Tournament) -> ApiResult<Tournament> {
        if tournament.team_count() < MIN_TEAMS_TO_START {
            return Err(ApiError::Invalid(NOT_ENOUGH_TEAMS.to_string()));
        }
        self.transition(&tournament.slug, "start").await
    }

    pub async fn cancel(&self, slug: &str) -> ApiResult<Tournament> {
        self.transition(slug, "cancel").await
    }

    async fn transition(&self, slug: &str, action: &str) -> ApiResult<Tournament> {
        debug!("tournament {slug}: {action}");
        self.api
            .post(&format!("/tournaments/{slug}/{action}"), &serde_json::json!({}))
            .await
    }

    // -----------------------------------------------------------------------
    // Teams, invitations, player searches
    // -----------------------------------------------------------------------

    pub async fn register_team(&self, slug: &str, name: &str) -> ApiResult<Team> {
        self.api
            .post(&format!("/tournaments/{slug}/teams"), &serde_json::json!({ "name": name }))
            .await
    }

    pub async fn withdraw_team(&self, slug: &str, team_id: u64) -> ApiResult<()> {
        self.api.delete(&format!("/tournaments/{slug}/teams/{team_id}")).await
    }

    pub async fn invite(&self, slug: &str, team_id: u64, user_id: u64) -> ApiResult<TeamInvitation> {
        self.api
            .post(
                &format!("/tournaments/{slug}/teams/{team_id}/invitations"),
                &serde_json::json!({ "user_id": user_id }),
            )
            .await
    }

    pub async fn my_invitations(&self) -> ApiResult<Vec<TeamInvitation>> {
        self.api.get("/invitations").await
    }

    pub async fn accept_invitation(&self, invitation_id: u64) -> ApiResult<TeamInvitation> {
        self.api
            .post(&format!("/invitations/{invitation_id}/accept"), &serde_json::json!({}))
            .await
    }

    pub async fn decline_invitation(&self, invitation_id: u64) -> ApiResult<TeamInvitation> {
        self.api
            .post(&format!("/invitations/{invitation_id}/decline"), &serde_json::json!({}))
            .await
    }

    pub async fn player_searches(&self, slug: &str) -> ApiResult<Vec<PlayerSearch>> {
        self.api.get(&format!("/tournaments/{slug}/player-searches")).await
    }

    pub async fn create_player_search(&self, slug: &str, message: &str) -> ApiResult<PlayerSearch> {
        self.api
            .post(
                &format!("/tournaments/{slug}/player-searches"),
                &serde_json::json!({ "message": message }),
            )
            .await
    }

    pub async fn close_player_search(&self, slug: &str, search_id: u64) -> ApiResult<()> {
        self.api
            .delete(&format!("/tournaments/{slug}/player-searches/{search_id}"))
            .await
    }

    // -----------------------------------------------------------------------
    // Matches
    // -----------------------------------------------------------------------

    pub async fn report_score(&self, match_id: u64, report: ScoreReport) -> ApiResult<Match> {
        report.validate()?;
        self.api.post(&format!("/matches/{match_id}/report"), &report).await
    }

    pub async fn verify(&self, match_id: u64) -> ApiResult<Match> {
        self.api
            .post(&format!("/matches/{match_id}/verify"), &serde_json::json!({}))
            .await
    }

    pub async fn dispute(&self, match_id: u64, reason: &str) -> ApiResult<Match> {
        self.api
            .post(
                &format!("/matches/{match_id}/dispute"),
                &serde_json::json!({ "reason": reason }),
            )
            .await
    }

    pub async fn schedule(
        &self,
        match_id: u64,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ApiResult<Match> {
        if at <= now {
            return Err(ApiError::Invalid(SCHEDULE_IN_PAST.to_string()));
        }
        self.api
            .post(
                &format!("/matches/{match_id}/schedule"),
                &serde_json::json!({ "scheduled_at": at }),
            )
            .await
    }

    pub async fn attachments(&self, match_id: u64) -> ApiResult<Vec<Attachment>> {
        self.api.get(&format!("/matches/{match_id}/attachments")).await
    }

    pub async fn download_attachment(&self, attachment_id: u64) -> ApiResult<Vec<u8>> {
        self.api
            .download(&format!("/attachments/{attachment_id}/download"))
            .await
    }

    pub async fn delete_attachment(&self, attachment_id: u64) -> ApiResult<()> {
        self.api.delete(&format!("/attachments/{attachment_id}")).await
    }
}
