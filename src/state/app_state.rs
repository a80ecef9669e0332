use crate::app::MenuItem;
use crate::state::chat::ConnectionState;
use crate::state::messages::{MatchAction, NetworkRequest, TournamentAction};
use chrono::{DateTime, NaiveDateTime, Utc};
use guild_api::bracket::{BracketRound, BracketView, Locale};
use guild_api::client::ApiError;
use guild_api::notifications::Inbox;
use guild_api::tournaments::ScoreReport;
use guild_api::{ChatContext, ChatMessage, Event, Match, Notification, Tournament, User};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

pub const MAX_CHAT_MESSAGES: usize = 200;
pub const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 3;

fn step_down(selected: &mut usize, len: usize) {
    if *selected + 1 < len {
        *selected += 1;
    }
}

fn step_up(selected: &mut usize) {
    *selected = selected.saturating_sub(1);
}

// ---------------------------------------------------------------------------
// Tournament list
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TournamentListState {
    pub items: Vec<Tournament>,
    pub selected: usize,
    pub loaded: bool,
}

impl TournamentListState {
    pub fn load(&mut self, items: Vec<Tournament>) {
        self.items = items;
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
        self.loaded = true;
    }

    pub fn down(&mut self) {
        step_down(&mut self.selected, self.items.len());
    }

    pub fn up(&mut self) {
        step_up(&mut self.selected);
    }

    pub fn selected_slug(&self) -> Option<&str> {
        self.items.get(self.selected).map(|t| t.slug.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bracket / tournament detail
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BracketState {
    pub tournament: Option<Tournament>,
    /// Index into `BracketView::rounds()`.
    pub selected_round: usize,
    pub selected_match: usize,
    pub scroll_offset: u16,
}

impl BracketState {
    /// Store a fresh copy. Re-fetches of the same tournament keep the cursor.
    pub fn load(&mut self, tournament: Tournament) {
        let same = self.tournament.as_ref().is_some_and(|t| t.slug == tournament.slug);
        self.tournament = Some(tournament);
        if !same {
            self.selected_round = 0;
            self.selected_match = 0;
            self.scroll_offset = 0;
        }
        self.clamp();
    }

    pub fn view(&self) -> Option<BracketView<'_>> {
        self.tournament.as_ref().map(BracketView::build)
    }

    pub fn slug(&self) -> Option<&str> {
        self.tournament.as_ref().map(|t| t.slug.as_str())
    }

    pub fn round_count(&self) -> usize {
        self.view().map(|v| v.rounds().len()).unwrap_or(0)
    }

    fn matches_in_round(&self, round: usize) -> usize {
        self.view()
            .and_then(|v| v.rounds().get(round).map(|r| r.matches.len()))
            .unwrap_or(0)
    }

    pub fn next_round(&mut self) {
        if self.selected_round + 1 < self.round_count() {
            self.selected_round += 1;
            self.clamp();
        }
    }

    pub fn prev_round(&mut self) {
        if self.selected_round > 0 {
            self.selected_round -= 1;
            self.clamp();
        }
    }

    pub fn match_down(&mut self) {
        let n = self.matches_in_round(self.selected_round);
        step_down(&mut self.selected_match, n);
    }

    pub fn match_up(&mut self) {
        step_up(&mut self.selected_match);
    }

    pub fn selected_match(&self) -> Option<&Match> {
        let tournament = self.tournament.as_ref()?;
        let view = BracketView::build(tournament);
        let rounds = view.rounds();
        let round: &BracketRound = rounds.get(self.selected_round)?;
        let id = round.matches.get(self.selected_match)?.id;
        tournament.find_match(id)
    }

    fn clamp(&mut self) {
        let rounds = self.round_count();
        self.selected_round = self.selected_round.min(rounds.saturating_sub(1));
        let matches = self.matches_in_round(self.selected_round);
        self.selected_match = self.selected_match.min(matches.saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct EventListState {
    pub items: Vec<Event>,
    pub selected: usize,
    pub loaded: bool,
}

impl EventListState {
    pub fn load(&mut self, items: Vec<Event>) {
        self.items = items;
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
        self.loaded = true;
    }

    pub fn down(&mut self) {
        step_down(&mut self.selected, self.items.len());
    }

    pub fn up(&mut self) {
        step_up(&mut self.selected);
    }

    pub fn selected_event(&self) -> Option<&Event> {
        self.items.get(self.selected)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct NotificationState {
    pub inbox: Inbox,
    pub selected: usize,
}

impl NotificationState {
    pub fn load(&mut self, items: Vec<Notification>) {
        self.inbox.replace(items);
        self.selected = self.selected.min(self.inbox.items.len().saturating_sub(1));
    }

    pub fn down(&mut self) {
        step_down(&mut self.selected, self.inbox.items.len());
    }

    pub fn up(&mut self) {
        step_up(&mut self.selected);
    }

    pub fn selected_notification(&self) -> Option<&Notification> {
        self.inbox.items.get(self.selected)
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ChatState {
    pub context: Option<ChatContext>,
    pub messages: Vec<ChatMessage>,
    pub connection: ConnectionState,
    pub input: String,
    pub composing: bool,
    pub scroll_offset: u16,
    seen_ids: HashSet<u64>,
}

impl ChatState {
    pub fn open(&mut self, context: ChatContext) {
        *self = Self { context: Some(context), ..Self::default() };
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn is_current(&self, context: ChatContext) -> bool {
        self.context == Some(context)
    }

    /// History arrives oldest first. Messages already received live are skipped.
    pub fn load_history(&mut self, history: Vec<ChatMessage>) {
        let live = std::mem::take(&mut self.messages);
        self.seen_ids.clear();
        for message in history.into_iter().chain(live) {
            self.push(message);
        }
    }

    /// Append an inbound message. Returns toast text when it is new and was
    /// written by someone other than `me`.
    pub fn ingest(&mut self, message: ChatMessage, me: Option<u64>) -> Option<String> {
        let toast = (Some(message.sender_id) != me)
            .then(|| format!("{}: {}", message.sender_handle, message.content));
        if self.push(message) { toast } else { None }
    }

    fn push(&mut self, message: ChatMessage) -> bool {
        if !self.seen_ids.insert(message.id) {
            return false;
        }
        self.messages.push(message);
        if self.messages.len() > MAX_CHAT_MESSAGES {
            let excess = self.messages.len() - MAX_CHAT_MESSAGES;
            self.messages.drain(0..excess);
        }
        true
    }

    pub fn submit_input(&mut self) -> Option<String> {
        let content = self.input.trim().to_string();
        self.composing = false;
        self.input.clear();
        self.scroll_offset = 0;
        (!content.is_empty()).then_some(content)
    }
}

// ---------------------------------------------------------------------------
// Toasts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct Toasts {
    items: VecDeque<Toast>,
}

impl Toasts {
    pub fn push(&mut self, text: impl Into<String>, level: ToastLevel, now: Instant) {
        self.items.push_back(Toast { text: text.into(), level, expires_at: now + TOAST_TTL });
        while self.items.len() > MAX_TOASTS {
            self.items.pop_front();
        }
    }

    /// Drop expired toasts; true if anything was removed.
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        self.items.retain(|t| t.expires_at > now);
        before != self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Text prompts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PromptKind {
    Login,
    ReportScore { slug: String, match_id: u64 },
    Dispute { slug: String, match_id: u64 },
    Schedule { slug: String, match_id: u64 },
    RegisterTeam { slug: String },
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::Login => "Sign in: paste a token or the callback URL",
            PromptKind::ReportScore { .. } => "Report score (e.g. 3-1)",
            PromptKind::Dispute { .. } => "Dispute reason",
            PromptKind::Schedule { .. } => "Schedule (YYYY-MM-DD HH:MM, UTC)",
            PromptKind::RegisterTeam { .. } => "Team name",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        Self { kind, input: String::new() }
    }

    /// Turn the typed text into a request, or explain why it is unusable.
    pub fn submit(&self, now: DateTime<Utc>) -> Result<NetworkRequest, String> {
        let input = self.input.trim();
        if input.is_empty() {
            return Err("nothing entered".to_string());
        }
        match &self.kind {
            PromptKind::Login => Ok(parse_login_input(input)),
            PromptKind::ReportScore { slug, match_id } => {
                let report = parse_score(input)?;
                report.validate().map_err(|e| e.user_message())?;
                Ok(NetworkRequest::Match {
                    slug: slug.clone(),
                    match_id: *match_id,
                    action: MatchAction::ReportScore(report),
                })
            }
            PromptKind::Dispute { slug, match_id } => Ok(NetworkRequest::Match {
                slug: slug.clone(),
                match_id: *match_id,
                action: MatchAction::Dispute { reason: input.to_string() },
            }),
            PromptKind::Schedule { slug, match_id } => {
                let at = parse_schedule(input)?;
                if at <= now {
                    return Err(ApiError::Invalid(
                        guild_api::tournaments::SCHEDULE_IN_PAST.to_string(),
                    )
                    .user_message());
                }
                Ok(NetworkRequest::Match {
                    slug: slug.clone(),
                    match_id: *match_id,
                    action: MatchAction::Schedule { at },
                })
            }
            PromptKind::RegisterTeam { slug } => Ok(NetworkRequest::Tournament {
                slug: slug.clone(),
                action: TournamentAction::RegisterTeam { name: input.to_string() },
            }),
        }
    }
}

/// `3-1`, `3:1` or `3 1`. Signs and missing sides are rejected.
fn parse_score(input: &str) -> Result<ScoreReport, String> {
    let (a, b) = match input.split_once(['-', ':']) {
        Some((a, b)) => (a.trim(), b.trim()),
        None => {
            let mut parts = input.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(a), Some(b), None) => (a, b),
                _ => return Err(format!("expected two scores, got {input:?}")),
            }
        }
    };
    let parse = |s: &str| {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("expected two scores, got {input:?}"));
        }
        s.parse::<u32>().map_err(|_| format!("{s:?} is not a score"))
    };
    Ok(ScoreReport::new(parse(a)?, parse(b)?))
}

fn parse_schedule(input: &str) -> Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("expected YYYY-MM-DD HH:MM, got {input:?}"))
}

/// A pasted callback URL (or bare query) carries `code` and `state`;
/// anything else is taken as a pre-issued token.
fn parse_login_input(input: &str) -> NetworkRequest {
    let query = input.split_once('?').map(|(_, q)| q).unwrap_or(input);
    let mut code = None;
    let mut state = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("code", v)) => code = Some(v.to_string()),
            Some(("state", v)) => state = Some(v.to_string()),
            _ => {}
        }
    }
    match (code, state) {
        (Some(code), Some(state)) => NetworkRequest::CompleteLogin { code, state },
        _ => NetworkRequest::LoginWithToken { token: input.to_string() },
    }
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub user: Option<User>,
    pub login_url: Option<String>,
    pub locale: Locale,
    pub tournaments: TournamentListState,
    pub bracket: BracketState,
    pub events: EventListState,
    pub notifications: NotificationState,
    pub chat: ChatState,
    pub toasts: Toasts,
    pub prompt: Option<Prompt>,
}

impl AppState {
    pub fn new(locale: Locale) -> Self {
        Self { locale, ..Self::default() }
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|u| u.id)
    }
}
