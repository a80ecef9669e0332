use crate::state::network::LoadingState;
use chrono::{DateTime, Utc};
use crossterm::event::KeyEvent;
use guild_api::tournaments::ScoreReport;
use guild_api::{
    ChatContext, ChatMessage, Event, Notification, Tournament, UnreadSummary, User,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TournamentAction {
    OpenRegistration,
    CloseRegistration,
    ReopenRegistration,
    Start,
    Cancel,
    RegisterTeam { name: String },
    WithdrawTeam { team_id: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchAction {
    ReportScore(ScoreReport),
    Verify,
    Dispute { reason: String },
    Schedule { at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    SignUp,
    Withdraw,
    CheckIn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkRequest {
    RestoreSession,
    LoginWithToken { token: String },
    CompleteLogin { code: String, state: String },
    FetchLoginUrl,
    Logout,
    LoadTournaments,
    LoadTournament { slug: String },
    Tournament { slug: String, action: TournamentAction },
    Match { slug: String, match_id: u64, action: MatchAction },
    LoadEvents,
    Event { slug: String, action: EventAction },
    LoadNotifications,
    RefreshUnread,
    MarkRead { id: u64 },
    MarkAllRead,
    LoadChatHistory { context: ChatContext },
    SendChat { context: ChatContext, content: String },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    SessionChanged { user: Option<User> },
    LoginUrl { url: String },
    TournamentsLoaded { tournaments: Vec<Tournament> },
    TournamentLoaded { tournament: Tournament },
    EventsLoaded { events: Vec<Event> },
    NotificationsLoaded { items: Vec<Notification>, summary: UnreadSummary },
    UnreadSummary { summary: UnreadSummary },
    NotificationRead { id: u64, read_at: DateTime<Utc> },
    AllNotificationsRead { read_at: DateTime<Utc> },
    ChatHistoryLoaded { context: ChatContext, messages: Vec<ChatMessage> },
    ChatMessageSent { context: ChatContext, message: ChatMessage },
    /// Success message shown as a toast.
    Notice { message: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
    Tick,
}
