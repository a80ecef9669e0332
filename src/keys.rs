use crate::app::{App, MenuItem};
use crate::state::app_state::{Prompt, PromptKind, ToastLevel};
use crate::state::chat::ChatCommand;
use crate::state::messages::{EventAction, MatchAction, NetworkRequest, TournamentAction};
use chrono::Utc;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use guild_api::{ChatContext, TournamentState};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

const NOT_AVAILABLE: &str = "Not available for this selection";

/// What a key press asks the workers to do once the app lock is released.
#[derive(Debug, Default, PartialEq)]
struct Effects {
    requests: Vec<NetworkRequest>,
    chat: Option<ChatCommand>,
}

impl Effects {
    fn request(&mut self, request: NetworkRequest) {
        self.requests.push(request);
    }
}

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) {
    if key_event.kind == KeyEventKind::Release {
        return;
    }
    if let (Char('c'), KeyModifiers::CONTROL) = (key_event.code, key_event.modifiers) {
        crate::cleanup_terminal();
        std::process::exit(0);
    }

    let mut guard = app.lock().await;
    let Some(effects) = dispatch(&mut guard, key_event) else {
        crate::cleanup_terminal();
        std::process::exit(0);
    };
    drop(guard);

    if let Some(command) = effects.chat {
        let _ = chat_commands.send(command).await;
    }
    for request in effects.requests {
        let _ = network_requests.send(request).await;
    }
}

/// Apply a key to the app. `None` means quit.
fn dispatch(app: &mut App, key: KeyEvent) -> Option<Effects> {
    let mut fx = Effects::default();

    if app.state.prompt.is_some() {
        handle_prompt(app, key, &mut fx);
        return Some(fx);
    }
    if app.state.active_tab == MenuItem::Chat && app.state.chat.composing {
        handle_compose(app, key, &mut fx);
        return Some(fx);
    }

    match (app.state.active_tab, key.code, key.modifiers) {
        (_, Char('q'), _) => return None,

        // Tab switching
        (_, Char('1'), _) => app.update_tab(MenuItem::Tournaments),
        (_, Char('2'), _) => app.update_tab(MenuItem::Bracket),
        (_, Char('3'), _) => {
            app.update_tab(MenuItem::Events);
            if !app.state.events.loaded {
                fx.request(NetworkRequest::LoadEvents);
            }
        }
        (_, Char('4'), _) => {
            app.update_tab(MenuItem::Notifications);
            if app.state.user.is_some() {
                fx.request(NetworkRequest::LoadNotifications);
            }
        }
        (_, Char('5'), _) => app.update_tab(MenuItem::Chat),
        (_, Char('?'), _) => app.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => app.exit_help(),

        // Session
        (_, Char('l'), KeyModifiers::CONTROL) => {
            if app.state.user.is_some() {
                app.toast("Already signed in", ToastLevel::Info);
            } else {
                app.state.prompt = Some(Prompt::new(PromptKind::Login));
                fx.request(NetworkRequest::FetchLoginUrl);
            }
        }
        (_, Char('x'), KeyModifiers::CONTROL) => {
            if app.state.user.is_some() {
                fx.chat = Some(ChatCommand::Leave);
                fx.request(NetworkRequest::Logout);
            }
        }

        // Tournament list
        (MenuItem::Tournaments, Char('j') | KeyCode::Down, _) => app.state.tournaments.down(),
        (MenuItem::Tournaments, Char('k') | KeyCode::Up, _) => app.state.tournaments.up(),
        (MenuItem::Tournaments, Char('r'), _) => fx.request(NetworkRequest::LoadTournaments),
        (MenuItem::Tournaments, KeyCode::Enter, _) => {
            if let Some(slug) = app.state.tournaments.selected_slug() {
                fx.request(NetworkRequest::LoadTournament { slug: slug.to_string() });
                app.update_tab(MenuItem::Bracket);
            }
        }

        // Global
        (_, Char('f'), _) => app.toggle_full_screen(),
        (_, Char('"'), _) => app.toggle_show_logs(),

        (MenuItem::Bracket, ..) => handle_bracket(app, key, &mut fx),
        (MenuItem::Events, ..) => handle_events(app, key, &mut fx),

        // Notifications
        (MenuItem::Notifications, Char('j') | KeyCode::Down, _) => app.state.notifications.down(),
        (MenuItem::Notifications, Char('k') | KeyCode::Up, _) => app.state.notifications.up(),
        (MenuItem::Notifications, Char('r'), _) => fx.request(NetworkRequest::LoadNotifications),
        (MenuItem::Notifications, KeyCode::Enter, _) => {
            if let Some(n) = app.state.notifications.selected_notification()
                && !n.is_read
            {
                fx.request(NetworkRequest::MarkRead { id: n.id });
            }
        }
        (MenuItem::Notifications, Char('a'), _) => {
            if app.state.notifications.inbox.unread_count > 0 {
                fx.request(NetworkRequest::MarkAllRead);
            }
        }

        // Chat
        (MenuItem::Chat, Char('i') | KeyCode::Enter, _) => {
            if app.state.chat.context.is_some() {
                app.state.chat.composing = true;
            }
        }
        (MenuItem::Chat, Char('j') | KeyCode::Down, _) => {
            app.state.chat.scroll_offset = app.state.chat.scroll_offset.saturating_sub(1);
        }
        (MenuItem::Chat, Char('k') | KeyCode::Up, _) => {
            app.state.chat.scroll_offset = app.state.chat.scroll_offset.saturating_add(1);
        }
        (MenuItem::Chat, Char('x'), _) => {
            if app.state.chat.context.is_some() {
                app.leave_chat();
                fx.chat = Some(ChatCommand::Leave);
            }
        }
        (MenuItem::Chat, KeyCode::Esc, _) => {
            let previous = app.state.previous_tab;
            app.update_tab(previous);
        }

        _ => {}
    }

    Some(fx)
}

fn handle_bracket(app: &mut App, key: KeyEvent, fx: &mut Effects) {
    let Some(slug) = app.state.bracket.slug().map(str::to_string) else {
        return;
    };
    let match_id = app.state.bracket.selected_match().map(|m| m.id);
    let match_caps = app.match_capabilities().unwrap_or_default();
    let caps = app.tournament_capabilities().unwrap_or_default();

    let lifecycle = |action: TournamentAction| NetworkRequest::Tournament {
        slug: slug.clone(),
        action,
    };

    match key.code {
        Char('l') | KeyCode::Right => app.state.bracket.next_round(),
        Char('h') | KeyCode::Left => app.state.bracket.prev_round(),
        Char('j') | KeyCode::Down => app.state.bracket.match_down(),
        Char('k') | KeyCode::Up => app.state.bracket.match_up(),
        Char('r') => fx.request(NetworkRequest::LoadTournament { slug: slug.clone() }),

        // Match actions
        Char('s') if match_caps.report_score => {
            if let Some(match_id) = match_id {
                app.state.prompt = Some(Prompt::new(PromptKind::ReportScore { slug: slug.clone(), match_id }));
            }
        }
        Char('v') if match_caps.verify => {
            if let Some(match_id) = match_id {
                fx.request(NetworkRequest::Match { slug: slug.clone(), match_id, action: MatchAction::Verify });
            }
        }
        Char('d') if match_caps.dispute => {
            if let Some(match_id) = match_id {
                app.state.prompt = Some(Prompt::new(PromptKind::Dispute { slug: slug.clone(), match_id }));
            }
        }
        Char('t') if match_caps.schedule => {
            if let Some(match_id) = match_id {
                app.state.prompt = Some(Prompt::new(PromptKind::Schedule { slug: slug.clone(), match_id }));
            }
        }
        Char('m') => {
            if let Some(match_id) = match_id {
                join_chat(app, ChatContext::match_room(match_id), fx);
            }
        }

        // Tournament lifecycle
        Char('O') if caps.open_registration => fx.request(lifecycle(TournamentAction::OpenRegistration)),
        Char('C') if caps.close_registration => fx.request(lifecycle(TournamentAction::CloseRegistration)),
        Char('R') if caps.reopen_registration => fx.request(lifecycle(TournamentAction::ReopenRegistration)),
        Char('S') if caps.start => fx.request(lifecycle(TournamentAction::Start)),
        Char('X') if caps.cancel => fx.request(lifecycle(TournamentAction::Cancel)),
        Char('g') if caps.register_team => {
            app.state.prompt = Some(Prompt::new(PromptKind::RegisterTeam { slug: slug.clone() }));
        }
        Char('W') => match own_team_id(app) {
            Some(team_id) => fx.request(lifecycle(TournamentAction::WithdrawTeam { team_id })),
            None => app.toast(NOT_AVAILABLE, ToastLevel::Error),
        },

        Char('s' | 'v' | 'd' | 't' | 'O' | 'C' | 'R' | 'S' | 'X' | 'g') => {
            app.toast(NOT_AVAILABLE, ToastLevel::Error);
        }
        _ => {}
    }
}

/// The captain's own team, while registration still accepts changes.
fn own_team_id(app: &App) -> Option<u64> {
    let user = app.state.user.as_ref()?;
    let tournament = app.state.bracket.tournament.as_ref()?;
    if tournament.state.is_terminal() || tournament.state == TournamentState::Ongoing {
        return None;
    }
    tournament
        .team_of(user.id)
        .filter(|team| team.captain_id == user.id)
        .map(|team| team.id)
}

fn handle_events(app: &mut App, key: KeyEvent, fx: &mut Effects) {
    let caps = app.event_capabilities(Utc::now()).unwrap_or_default();
    let selected = app.state.events.selected_event().map(|e| (e.id, e.slug.clone()));

    let action = match key.code {
        Char('j') | KeyCode::Down => {
            app.state.events.down();
            return;
        }
        Char('k') | KeyCode::Up => {
            app.state.events.up();
            return;
        }
        Char('r') => {
            fx.request(NetworkRequest::LoadEvents);
            return;
        }
        Char('m') => {
            if let Some((id, _)) = selected {
                join_chat(app, ChatContext::event(id), fx);
            }
            return;
        }
        Char('u') if caps.sign_up => EventAction::SignUp,
        Char('w') if caps.withdraw => EventAction::Withdraw,
        Char('i') if caps.check_in => EventAction::CheckIn,
        Char('u' | 'w' | 'i') => {
            app.toast(NOT_AVAILABLE, ToastLevel::Error);
            return;
        }
        _ => return,
    };

    if let Some((_, slug)) = selected {
        fx.request(NetworkRequest::Event { slug, action });
    }
}

fn join_chat(app: &mut App, context: ChatContext, fx: &mut Effects) {
    if app.state.user.is_none() {
        app.toast("Sign in to join the chat", ToastLevel::Error);
        return;
    }
    if app.open_chat(context) {
        fx.chat = Some(ChatCommand::Join(context));
        fx.request(NetworkRequest::LoadChatHistory { context });
    }
}

fn handle_prompt(app: &mut App, key: KeyEvent, fx: &mut Effects) {
    let Some(prompt) = app.state.prompt.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => app.state.prompt = None,
        KeyCode::Backspace => {
            prompt.input.pop();
        }
        KeyCode::Enter => match prompt.submit(Utc::now()) {
            Ok(request) => {
                app.state.prompt = None;
                fx.request(request);
            }
            Err(message) => app.toast(message, ToastLevel::Error),
        },
        Char(c) => prompt.input.push(c),
        _ => {}
    }
}

fn handle_compose(app: &mut App, key: KeyEvent, fx: &mut Effects) {
    let chat = &mut app.state.chat;
    match key.code {
        KeyCode::Esc => {
            chat.composing = false;
            chat.input.clear();
        }
        KeyCode::Backspace => {
            chat.input.pop();
        }
        KeyCode::Enter => {
            let context = chat.context;
            if let (Some(context), Some(content)) = (context, chat.submit_input()) {
                fx.request(NetworkRequest::SendChat { context, content });
            }
        }
        Char(c) if chat.input.chars().count() < guild_api::chat::MAX_MESSAGE_LEN => {
            chat.input.push(c)
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::app_settings::AppSettings;
    use guild_api::{Match, MatchState, TeamRef, Tournament, User};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn signed_in_app(user_id: u64) -> App {
        let mut app = App::new(AppSettings::from_lookup(|_| None));
        app.on_session_changed(Some(User { id: user_id, handle: "cap".into(), ..Default::default() }));
        app
    }

    fn ongoing_cup(state: MatchState) -> Tournament {
        let team = |id: u64| Some(TeamRef { id, name: format!("T{id}"), captain_id: id * 10 });
        Tournament {
            slug: "cup".into(),
            state: TournamentState::Ongoing,
            rounds_total: Some(1),
            matches: vec![Match { id: 5, round: 1, team_a: team(1), team_b: team(2), state, ..Default::default() }],
            ..Default::default()
        }
    }

    #[test]
    fn captain_report_opens_score_prompt() {
        let mut app = signed_in_app(10);
        app.on_tournament_loaded(ongoing_cup(MatchState::Pending));
        app.update_tab(MenuItem::Bracket);

        let fx = dispatch(&mut app, press(Char('s'))).unwrap();
        assert!(fx.requests.is_empty());
        assert_eq!(
            app.state.prompt.as_ref().map(|p| &p.kind),
            Some(&PromptKind::ReportScore { slug: "cup".into(), match_id: 5 })
        );

        for c in "2-1".chars() {
            dispatch(&mut app, press(Char(c)));
        }
        let fx = dispatch(&mut app, press(KeyCode::Enter)).unwrap();
        assert!(app.state.prompt.is_none());
        assert!(matches!(
            fx.requests.as_slice(),
            [NetworkRequest::Match { match_id: 5, action: MatchAction::ReportScore(_), .. }]
        ));
    }

    #[test]
    fn gated_actions_are_refused_locally() {
        let mut app = signed_in_app(99);
        app.on_tournament_loaded(ongoing_cup(MatchState::Pending));
        app.update_tab(MenuItem::Bracket);

        let fx = dispatch(&mut app, press(Char('s'))).unwrap();
        assert!(fx.requests.is_empty());
        assert!(app.state.prompt.is_none());
        assert_eq!(app.state.toasts.len(), 1);

        let fx = dispatch(&mut app, press(Char('S'))).unwrap();
        assert!(fx.requests.is_empty(), "not an organizer");
    }

    #[test]
    fn match_chat_joins_once() {
        let mut app = signed_in_app(10);
        app.on_tournament_loaded(ongoing_cup(MatchState::Live));
        app.update_tab(MenuItem::Bracket);

        let fx = dispatch(&mut app, press(Char('m'))).unwrap();
        let room = ChatContext::match_room(5);
        assert_eq!(fx.chat, Some(ChatCommand::Join(room)));
        assert_eq!(fx.requests, vec![NetworkRequest::LoadChatHistory { context: room }]);
        assert_eq!(app.state.active_tab, MenuItem::Chat);

        app.update_tab(MenuItem::Bracket);
        let fx = dispatch(&mut app, press(Char('m'))).unwrap();
        assert_eq!(fx, Effects::default(), "room already open");
    }

    #[test]
    fn compose_sends_trimmed_message() {
        let mut app = signed_in_app(10);
        let room = ChatContext::event(2);
        app.open_chat(room);

        dispatch(&mut app, press(KeyCode::Enter));
        assert!(app.state.chat.composing);
        for c in " gg wp ".chars() {
            dispatch(&mut app, press(Char(c)));
        }
        let fx = dispatch(&mut app, press(KeyCode::Enter)).unwrap();
        assert_eq!(fx.requests, vec![NetworkRequest::SendChat { context: room, content: "gg wp".into() }]);
        assert!(!app.state.chat.composing);
    }

    #[test]
    fn q_while_typing_is_text() {
        let mut app = signed_in_app(10);
        app.open_chat(ChatContext::event(2));
        dispatch(&mut app, press(Char('i')));
        assert!(dispatch(&mut app, press(Char('q'))).is_some());
        assert_eq!(app.state.chat.input, "q");

        app.state.chat.composing = false;
        assert!(dispatch(&mut app, press(Char('q'))).is_none());
    }
}
