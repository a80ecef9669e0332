mod app;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::AppSettings;
use crate::state::chat::{ChatCommand, ChatEvent, ChatWorker};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use guild_api::client::GuildApi;
use guild_api::session::{FileTokenStore, Session};
use log::{LevelFilter, error, info};
use std::io::Stdout;
use std::sync::Arc;
use std::time::Instant;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::Duration;
use tui::{Terminal, backend::CrosstermBackend};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let settings = AppSettings::load();
    let level = settings.log_level.unwrap_or(LevelFilter::Error);
    tui_logger::init_logger(level)?;
    tui_logger::set_default_level(level);

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    let api = GuildApi::new(settings.api_url.clone());
    let session = Session::new(api.clone(), FileTokenStore::new(settings.session_file.clone()));
    info!("using {} (session file {})", api.base_url(), settings.session_file.display());

    let startup_session = match settings.token.clone() {
        Some(token) => NetworkRequest::LoginWithToken { token },
        None => NetworkRequest::RestoreSession,
    };
    let ws_base = settings.ws_url.clone();
    let app = Arc::new(Mutex::new(App::new(settings)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);
    let (chat_cmd_tx, chat_cmd_rx) = mpsc::channel::<ChatCommand>(100);
    let (chat_evt_tx, chat_evt_rx) = mpsc::channel::<ChatEvent>(100);
    let (auth_tx, auth_rx) = watch::channel(false);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(session, network_req_rx, network_resp_tx, auth_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Chat thread
    let chat_worker = ChatWorker {
        api,
        ws_base,
        commands: chat_cmd_rx,
        events: chat_evt_tx,
    };
    let chat_task = tokio::spawn(chat_worker.run());

    // Unread notification polling, only while signed in
    let periodic_updater = PeriodicRefresher::new(network_req_tx.clone(), auth_rx);
    let periodic_task = tokio::spawn(periodic_updater.run());

    // Toast expiry
    let tick_tx = ui_event_tx.clone();
    let tick_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;
            if tick_tx.send(UiEvent::Tick).await.is_err() {
                break;
            }
        }
    });

    let _ = network_req_tx.send(startup_session).await;
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(
        terminal,
        app,
        ui_event_rx,
        network_req_tx,
        network_resp_rx,
        chat_cmd_tx,
        chat_evt_rx,
    )
    .await;

    input_handler.abort();
    network_task.abort();
    chat_task.abort();
    periodic_task.abort();
    tick_task.abort();

    Ok(())
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("guildtui {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "guildtui - terminal client for tournaments, events and match chat

Usage:
  guildtui
  guildtui --help
  guildtui --version

Environment:
  GUILDTUI_API_URL        Backend base URL (default http://127.0.0.1:8000)
  GUILDTUI_WS_URL         Chat WebSocket base URL (default ws://127.0.0.1:8000)
  GUILDTUI_TOKEN          Pre-issued API token, skips the stored session
  GUILDTUI_SESSION_FILE   Where the session token is kept
                          (default ~/.config/guildtui/session.json)
  GUILDTUI_LOCALE         Round names: fr (default) or en
  GUILDTUI_LOG            Log level: error (default), warn, info, debug, trace"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
    chat_commands: mpsc::Sender<ChatCommand>,
    mut chat_events: mpsc::Receiver<ChatEvent>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests, &chat_commands).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &chat_commands, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(chat_event) = chat_events.recv() => {
                app.lock().await.on_chat_event(chat_event);
                if !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let _ = network_requests.send(NetworkRequest::LoadTournaments).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests, chat_commands).await;
            true
        }
        UiEvent::Resize => true,
        UiEvent::Tick => app.lock().await.on_tick(Instant::now()),
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::SessionChanged { user } => {
            let signed_out = user.is_none();
            let signed_in = app.lock().await.on_session_changed(user);
            if signed_in {
                let _ = network_requests.send(NetworkRequest::LoadNotifications).await;
            }
            if signed_out {
                let _ = chat_commands.send(ChatCommand::Leave).await;
            }
        }
        NetworkResponse::LoginUrl { url } => app.lock().await.on_login_url(url),
        NetworkResponse::TournamentsLoaded { tournaments } => {
            app.lock().await.on_tournaments_loaded(tournaments)
        }
        NetworkResponse::TournamentLoaded { tournament } => {
            app.lock().await.on_tournament_loaded(tournament)
        }
        NetworkResponse::EventsLoaded { events } => app.lock().await.on_events_loaded(events),
        NetworkResponse::NotificationsLoaded { items, summary } => {
            app.lock().await.on_notifications_loaded(items, summary)
        }
        NetworkResponse::UnreadSummary { summary } => app.lock().await.on_unread_summary(summary),
        NetworkResponse::NotificationRead { id, read_at } => {
            app.lock().await.on_notification_read(id, read_at)
        }
        NetworkResponse::AllNotificationsRead { read_at } => {
            app.lock().await.on_all_notifications_read(read_at)
        }
        NetworkResponse::ChatHistoryLoaded { context, messages } => {
            app.lock().await.on_chat_history(context, messages)
        }
        NetworkResponse::ChatMessageSent { context, message } => {
            app.lock().await.on_chat_message_sent(context, message)
        }
        NetworkResponse::Notice { message } => app.lock().await.on_notice(message),
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            app.lock().await.on_error(message);
        }
    }
    !loading.is_loading
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        let event = tokio::task::block_in_place(crossterm_event::read);
        if let Ok(event) = event {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    terminal::enable_raw_mode()
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
