use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, ToastLevel};
use crate::state::chat::{ChatEvent, ConnectionState};
use chrono::{DateTime, Utc};
use guild_api::permissions::{
    EventCapabilities, MatchCapabilities, TournamentCapabilities, event_capabilities,
    match_capabilities, tournament_capabilities,
};
use guild_api::{
    ChatContext, ChatMessage, Event, Notification, Tournament, UnreadSummary, User,
};
use log::{info, warn};
use std::time::Instant;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Tournaments,
    Bracket,
    Events,
    Notifications,
    Chat,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            state: AppState::new(settings.locale),
            settings,
        }
    }

    // -----------------------------------------------------------------------
    // Network response handlers
    // -----------------------------------------------------------------------

    /// Returns true when this transitions into a signed-in session.
    pub fn on_session_changed(&mut self, user: Option<User>) -> bool {
        let was_signed_in = self.state.user.is_some();
        match user {
            Some(user) => {
                info!("signed in as {}", user.handle);
                self.state.login_url = None;
                self.state.user = Some(user);
                self.state.last_error = None;
                !was_signed_in
            }
            None => {
                if was_signed_in {
                    self.toast("Signed out", ToastLevel::Info);
                }
                self.state.user = None;
                self.state.notifications.inbox.clear();
                self.state.notifications.selected = 0;
                self.state.chat.close();
                false
            }
        }
    }

    pub fn on_login_url(&mut self, url: String) {
        info!("open this URL to sign in: {url}");
        self.state.login_url = Some(url);
    }

    pub fn on_tournaments_loaded(&mut self, tournaments: Vec<Tournament>) {
        self.state.last_error = None;
        self.state.tournaments.load(tournaments);
    }

    pub fn on_tournament_loaded(&mut self, tournament: Tournament) {
        self.state.last_error = None;
        if let Some(entry) = self
            .state
            .tournaments
            .items
            .iter_mut()
            .find(|t| t.slug == tournament.slug)
        {
            *entry = tournament.clone();
        }
        self.state.bracket.load(tournament);
    }

    pub fn on_events_loaded(&mut self, events: Vec<Event>) {
        self.state.last_error = None;
        self.state.events.load(events);
    }

    pub fn on_notifications_loaded(&mut self, items: Vec<Notification>, summary: UnreadSummary) {
        self.state.notifications.load(items);
        self.state.notifications.inbox.apply_summary(summary);
    }

    pub fn on_unread_summary(&mut self, summary: UnreadSummary) {
        self.state.notifications.inbox.apply_summary(summary);
    }

    pub fn on_notification_read(&mut self, id: u64, read_at: DateTime<Utc>) {
        self.state.notifications.inbox.apply_read(id, read_at);
    }

    pub fn on_all_notifications_read(&mut self, read_at: DateTime<Utc>) {
        self.state.notifications.inbox.apply_all_read(read_at);
    }

    pub fn on_chat_history(&mut self, context: ChatContext, messages: Vec<ChatMessage>) {
        if self.state.chat.is_current(context) {
            self.state.chat.load_history(messages);
        }
    }

    /// Our own message echoed back by the REST call. The socket may deliver
    /// it again; the id check drops the duplicate.
    pub fn on_chat_message_sent(&mut self, context: ChatContext, message: ChatMessage) {
        if self.state.chat.is_current(context) {
            let me = self.state.user_id();
            self.state.chat.ingest(message, me);
        }
    }

    pub fn on_notice(&mut self, message: String) {
        self.toast(message, ToastLevel::Info);
    }

    pub fn on_error(&mut self, message: String) {
        self.toast(message.clone(), ToastLevel::Error);
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Chat socket events
    // -----------------------------------------------------------------------

    /// Events for a room other than the open one are stale and dropped.
    pub fn on_chat_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::State { context, state } => {
                if self.state.chat.is_current(context) {
                    self.state.chat.connection = state;
                }
            }
            ChatEvent::Message { context, message } => {
                if !self.state.chat.is_current(context) {
                    return;
                }
                let me = self.state.user_id();
                if let Some(text) = self.state.chat.ingest(message, me) {
                    self.toast(text, ToastLevel::Info);
                }
            }
            ChatEvent::Error { context, message } => {
                warn!("chat {context}: {message}");
                if self.state.chat.is_current(context) {
                    self.toast(message, ToastLevel::Error);
                }
            }
        }
    }

    /// Switch the chat pane to `context`. Returns false if it was already open.
    pub fn open_chat(&mut self, context: ChatContext) -> bool {
        let changed = !self.state.chat.is_current(context);
        if changed {
            self.state.chat.open(context);
            self.state.chat.connection = ConnectionState::Connecting;
        }
        self.update_tab(MenuItem::Chat);
        changed
    }

    pub fn leave_chat(&mut self) {
        self.state.chat.close();
    }

    // -----------------------------------------------------------------------
    // Capabilities for the current selection
    // -----------------------------------------------------------------------

    pub fn tournament_capabilities(&self) -> Option<TournamentCapabilities> {
        let tournament = self.state.bracket.tournament.as_ref()?;
        Some(tournament_capabilities(self.state.user.as_ref(), tournament))
    }

    pub fn match_capabilities(&self) -> Option<MatchCapabilities> {
        let tournament = self.state.bracket.tournament.as_ref()?;
        let m = self.state.bracket.selected_match()?;
        Some(match_capabilities(self.state.user.as_ref(), m, tournament.state))
    }

    pub fn event_capabilities(&self, now: DateTime<Utc>) -> Option<EventCapabilities> {
        let event = self.state.events.selected_event()?;
        Some(event_capabilities(self.state.user.as_ref(), event, now))
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        if next == MenuItem::Chat {
            self.state.chat.scroll_offset = 0;
        }
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Toasts
    // -----------------------------------------------------------------------

    pub fn toast(&mut self, text: impl Into<String>, level: ToastLevel) {
        self.state.toasts.push(text, level, Instant::now());
    }

    /// Returns true when the screen needs a redraw.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        self.state.toasts.prune(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn app() -> App {
        App::new(AppSettings::from_lookup(|_| None))
    }

    fn user(id: u64) -> User {
        User { id, handle: format!("player{id}"), ..Default::default() }
    }

    fn message(id: u64, sender_id: u64) -> ChatMessage {
        ChatMessage {
            id,
            sender_id,
            sender_handle: format!("player{sender_id}"),
            content: "gl hf".into(),
            created_at: Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn stale_room_events_are_ignored() {
        let mut app = app();
        app.on_session_changed(Some(user(1)));
        app.open_chat(ChatContext::match_room(7));

        app.on_chat_event(ChatEvent::Message { context: ChatContext::match_room(6), message: message(1, 2) });
        assert!(app.state.chat.messages.is_empty());

        app.on_chat_event(ChatEvent::State {
            context: ChatContext::match_room(7),
            state: ConnectionState::Connected,
        });
        assert_eq!(app.state.chat.connection, ConnectionState::Connected);
    }

    #[test]
    fn inbound_chat_message_toasts_even_with_chat_open() {
        let mut app = app();
        app.on_session_changed(Some(user(1)));
        let room = ChatContext::event(3);
        app.open_chat(room);
        app.update_tab(MenuItem::Chat);

        app.on_chat_event(ChatEvent::Message { context: room, message: message(1, 2) });
        assert_eq!(app.state.toasts.len(), 1);
        assert_eq!(app.state.chat.messages.len(), 1);

        app.update_tab(MenuItem::Bracket);
        app.on_chat_event(ChatEvent::Message { context: room, message: message(2, 1) });
        assert_eq!(app.state.toasts.len(), 1, "own message does not toast");
        assert_eq!(app.state.chat.messages.len(), 2);
    }

    #[test]
    fn sent_message_echo_is_not_duplicated() {
        let mut app = app();
        app.on_session_changed(Some(user(1)));
        let room = ChatContext::match_room(9);
        app.open_chat(room);
        app.on_chat_message_sent(room, message(40, 1));
        app.on_chat_event(ChatEvent::Message { context: room, message: message(40, 1) });
        assert_eq!(app.state.chat.messages.len(), 1);
    }

    #[test]
    fn sign_out_clears_private_state() {
        let mut app = app();
        assert!(app.on_session_changed(Some(user(1))));
        assert!(!app.on_session_changed(Some(user(1))), "refresh is not a new sign-in");
        app.on_unread_summary(UnreadSummary { unread_count: 4, urgent_count: 1 });
        app.open_chat(ChatContext::event(1));

        app.on_session_changed(None);
        assert!(app.state.user.is_none());
        assert_eq!(app.state.notifications.inbox.unread_count, 0);
        assert!(app.state.chat.context.is_none());
    }

    #[test]
    fn help_returns_to_previous_tab() {
        let mut app = app();
        app.update_tab(MenuItem::Events);
        app.update_tab(MenuItem::Help);
        app.exit_help();
        assert_eq!(app.state.active_tab, MenuItem::Events);
    }
}
