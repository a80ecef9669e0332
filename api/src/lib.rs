pub mod bracket;
pub mod chat;
pub mod client;
pub mod discord;
pub mod events;
pub mod notifications;
pub mod organizations;
pub mod permissions;
pub mod session;
pub mod tournaments;
pub mod users;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub handle: String,
    #[serde(default)]
    pub discord_id: Option<String>,
    #[serde(default)]
    pub discord_username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Platform-wide roles, e.g. "admin" or "referee".
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub reputation: i32,
}

impl User {
    pub const ADMIN_ROLE: &'static str = "admin";
    pub const REFEREE_ROLE: &'static str = "referee";

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Self::ADMIN_ROLE)
    }
}

// ---------------------------------------------------------------------------
// Organizations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipPolicy {
    #[default]
    Open,
    RequestOnly,
}

/// Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    #[default]
    Member,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: u64,
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub membership_policy: MembershipPolicy,
    pub owner_id: u64,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub event_count: u32,
    #[serde(default)]
    pub tournament_count: u32,
    /// The current user's role in this organization, if a member.
    #[serde(default)]
    pub my_role: Option<MemberRole>,
    #[serde(default)]
    pub has_pending_request: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: u64,
    pub handle: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: u64,
    pub user_id: u64,
    pub handle: String,
    #[serde(default)]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form category chosen by the organizer ("raid", "scrim", ...).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub organization_id: Option<u64>,
    pub created_by: u64,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub checkin_opens_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub roles: Vec<EventRole>,
    #[serde(default)]
    pub signups: Vec<Signup>,
}

impl Event {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// The user's signup, ignoring withdrawn ones.
    pub fn active_signup(&self, user_id: u64) -> Option<&Signup> {
        self.signups
            .iter()
            .find(|s| s.user_id == user_id && s.status != SignupStatus::Withdrawn)
    }

    pub fn confirmed_count(&self) -> usize {
        self.signups
            .iter()
            .filter(|s| matches!(s.status, SignupStatus::Confirmed | SignupStatus::CheckedIn))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRole {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub filled: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupStatus {
    Confirmed,
    Waitlist,
    CheckedIn,
    Withdrawn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signup {
    pub id: u64,
    pub user_id: u64,
    pub handle: String,
    #[serde(default)]
    pub role_id: Option<u64>,
    pub status: SignupStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tournaments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentFormat {
    #[default]
    #[serde(rename = "se")]
    SingleElimination,
    #[serde(rename = "de")]
    DoubleElimination,
    #[serde(rename = "rr")]
    RoundRobin,
    #[serde(rename = "swiss")]
    Swiss,
}

impl TournamentFormat {
    pub fn label(&self) -> &'static str {
        match self {
            TournamentFormat::SingleElimination => "Single elimination",
            TournamentFormat::DoubleElimination => "Double elimination",
            TournamentFormat::RoundRobin => "Round robin",
            TournamentFormat::Swiss => "Swiss",
        }
    }
}

/// Server-driven lifecycle. The client mirrors it for gating only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    #[default]
    Draft,
    OpenRegistration,
    RegistrationClosed,
    Ongoing,
    Finished,
    Cancelled,
}

impl TournamentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TournamentState::Finished | TournamentState::Cancelled)
    }

    /// Whether the backend accepts a request moving the tournament to `next`.
    pub fn can_transition_to(&self, next: TournamentState) -> bool {
        use TournamentState::*;
        match (self, next) {
            (from, Cancelled) => !from.is_terminal(),
            (Draft, OpenRegistration) => true,
            (OpenRegistration, RegistrationClosed) => true,
            (RegistrationClosed, OpenRegistration) => true,
            (OpenRegistration | RegistrationClosed, Ongoing) => true,
            (Ongoing, Finished) => true,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TournamentState::Draft => "Draft",
            TournamentState::OpenRegistration => "Registration open",
            TournamentState::RegistrationClosed => "Registration closed",
            TournamentState::Ongoing => "Ongoing",
            TournamentState::Finished => "Finished",
            TournamentState::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: u64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub format: TournamentFormat,
    #[serde(default)]
    pub state: TournamentState,
    pub team_size: u32,
    #[serde(default)]
    pub max_teams: Option<u32>,
    #[serde(default)]
    pub organization_id: Option<u64>,
    pub created_by: u64,
    /// Number of rounds in the main bracket, when the server has generated it.
    #[serde(default)]
    pub rounds_total: Option<u32>,
    #[serde(default)]
    pub can_manage: bool,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

impl Tournament {
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn find_match(&self, match_id: u64) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    /// The team the user belongs to, as captain or member.
    pub fn team_of(&self, user_id: u64) -> Option<&Team> {
        self.teams
            .iter()
            .find(|t| t.captain_id == user_id || t.members.iter().any(|m| m.user_id == user_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    pub captain_id: u64,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub points: i32,
    #[serde(default)]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: u64,
    pub handle: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: u64,
    pub name: String,
    pub captain_id: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    #[default]
    Pending,
    Live,
    Reported,
    Verified,
    Disputed,
}

impl MatchState {
    pub fn label(&self) -> &'static str {
        match self {
            MatchState::Pending => "pending",
            MatchState::Live => "live",
            MatchState::Reported => "reported",
            MatchState::Verified => "verified",
            MatchState::Disputed => "disputed",
        }
    }
}

/// Which side of a double-elimination bracket a match belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketSide {
    #[default]
    Winners,
    Losers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: u64,
    pub round: u32,
    #[serde(default)]
    pub bracket: BracketSide,
    #[serde(default)]
    pub team_a: Option<TeamRef>,
    #[serde(default)]
    pub team_b: Option<TeamRef>,
    #[serde(default)]
    pub score_a: Option<u32>,
    #[serde(default)]
    pub score_b: Option<u32>,
    #[serde(default)]
    pub winner_id: Option<u64>,
    #[serde(default)]
    pub state: MatchState,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Granted server-side, e.g. to organizers reporting on behalf of a team.
    #[serde(default)]
    pub can_report: bool,
    /// Granted server-side to referees and admins.
    #[serde(default)]
    pub can_verify: bool,
}

impl Match {
    pub fn is_captain(&self, user_id: u64) -> bool {
        [&self.team_a, &self.team_b]
            .into_iter()
            .flatten()
            .any(|t| t.captain_id == user_id)
    }

    pub fn winner(&self) -> Option<&TeamRef> {
        let winner_id = self.winner_id?;
        [&self.team_a, &self.team_b]
            .into_iter()
            .flatten()
            .find(|t| t.id == winner_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub filename: String,
    pub uploaded_by: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSearch {
    pub id: u64,
    pub tournament_id: u64,
    pub user_id: u64,
    pub handle: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInvitation {
    pub id: u64,
    pub tournament_id: u64,
    pub team_id: u64,
    pub team_name: String,
    pub invited_user_id: u64,
    pub status: InvitationStatus,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    MatchScheduled,
    MatchReady,
    ScoreReported,
    ScoreVerified,
    ScoreDisputed,
    TournamentRegistrationOpened,
    TournamentRegistrationClosed,
    TournamentStarted,
    TournamentFinished,
    TournamentCancelled,
    TeamInvitation,
    TeamJoined,
    TeamLeft,
    PlayerSearchResponse,
    EventCreated,
    EventReminder,
    EventCancelled,
    SignupPromoted,
    CheckinOpen,
    OrgJoinRequest,
    OrgJoinApproved,
    OrgJoinRejected,
    OrgRoleChanged,
    ChatMention,
    /// Kinds added server-side after this client was built.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub action_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadSummary {
    pub unread_count: u32,
    #[serde(default)]
    pub urgent_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default)]
    pub in_app: bool,
    #[serde(default)]
    pub discord_dm: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub muted_types: Vec<NotificationType>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatContextKind {
    Event,
    Match,
}

impl ChatContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatContextKind::Event => "event",
            ChatContextKind::Match => "match",
        }
    }
}

/// Identifies one chat stream: the messages attached to an event or a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatContext {
    pub kind: ChatContextKind,
    pub id: u64,
}

impl ChatContext {
    pub fn event(id: u64) -> Self {
        Self { kind: ChatContextKind::Event, id }
    }

    pub fn match_room(id: u64) -> Self {
        Self { kind: ChatContextKind::Match, id }
    }
}

impl fmt::Display for ChatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub sender_id: u64,
    pub sender_handle: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Discord integration settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub organization_id: u64,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub announcement_channel_id: Option<String>,
    #[serde(default)]
    pub auto_publish_events: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tournament_state_transitions_follow_lifecycle() {
        use TournamentState::*;
        assert!(Draft.can_transition_to(OpenRegistration));
        assert!(OpenRegistration.can_transition_to(RegistrationClosed));
        assert!(RegistrationClosed.can_transition_to(OpenRegistration));
        assert!(RegistrationClosed.can_transition_to(Ongoing));
        assert!(Ongoing.can_transition_to(Finished));
        assert!(!Draft.can_transition_to(Ongoing));
        assert!(!Finished.can_transition_to(Ongoing));
    }

    #[test]
    fn cancel_reachable_from_every_non_terminal_state() {
        use TournamentState::*;
        for state in [Draft, OpenRegistration, RegistrationClosed, Ongoing] {
            assert!(state.can_transition_to(Cancelled), "{state:?}");
        }
        assert!(!Finished.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn unknown_notification_type_falls_back() {
        let raw = r#"{
            "id": 3,
            "type": "season_pass_expired",
            "title": "Heads up",
            "created_at": "2026-03-01T10:00:00Z"
        }"#;
        let n: Notification = serde_json::from_str(raw).unwrap();
        assert_eq!(n.kind, NotificationType::Unknown);
        assert_eq!(n.priority, Priority::Normal);
        assert!(!n.is_read);
    }

    #[test]
    fn unknown_match_state_is_rejected() {
        let raw = r#"{"id": 1, "round": 1, "state": "abandoned"}"#;
        assert!(serde_json::from_str::<Match>(raw).is_err());
    }

    #[test]
    fn tournament_format_uses_short_codes() {
        let t: Tournament = serde_json::from_str(
            r#"{"id": 1, "slug": "cup", "name": "Cup", "format": "de",
                "state": "open_registration", "team_size": 5, "created_by": 9}"#,
        )
        .unwrap();
        assert_eq!(t.format, TournamentFormat::DoubleElimination);
        assert_eq!(t.state, TournamentState::OpenRegistration);
        assert!(t.teams.is_empty());
    }

    #[test]
    fn match_winner_resolves_to_one_of_its_teams() {
        let m = Match {
            id: 1,
            round: 1,
            team_a: Some(TeamRef { id: 10, name: "Alpha".into(), captain_id: 100 }),
            team_b: Some(TeamRef { id: 20, name: "Bravo".into(), captain_id: 200 }),
            winner_id: Some(20),
            ..Default::default()
        };
        assert_eq!(m.winner().map(|t| t.name.as_str()), Some("Bravo"));
        assert!(m.is_captain(100));
        assert!(!m.is_captain(300));
    }
}
