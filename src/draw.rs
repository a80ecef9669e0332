use chrono::{DateTime, Local, Utc};
use log::error;
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{
    Block, BorderType, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
    TableState, Tabs, Wrap,
};
use tui::{Frame, Terminal};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use crate::app::{App, MenuItem};
use crate::components::bracket::{BracketGrid, BracketWidget, HEADER_HEIGHT};
use crate::state::app_state::{PromptKind, ToastLevel};
use crate::state::chat::ConnectionState;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use guild_api::bracket::BracketView;
use guild_api::{Match, Priority, SignupStatus, Team, TeamRef, Tournament};

static TABS: &[&str; 5] = &["Tournaments", "Bracket", "Events", "Notifications", "Chat"];

const HELP_TEXT: &str = "\
Global
  1-5       switch tab           ?  help          q  quit
  f         full screen          \"  logs
  ctrl-l    sign in              ctrl-x  sign out

Tournaments
  j/k       move                 Enter  open bracket     r  refresh

Bracket
  h/l       round                j/k  match              r  refresh
  s         report score         v  verify               d  dispute
  t         schedule             m  match chat
  O/C/R     open, close, reopen registration
  S/X       start, cancel        g  register team        W  withdraw team

Events
  j/k       move                 u  sign up              w  withdraw
  i         check in             m  event chat           r  refresh

Notifications
  j/k       move                 Enter  mark read        a  mark all read

Chat
  i/Enter   type                 Esc  cancel             x  leave room
  j/k       scroll";

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let drawn = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Tournaments => draw_tournaments(f, layout.main, app),
            MenuItem::Bracket => draw_bracket(f, layout.main, app),
            MenuItem::Events => draw_events(f, layout.main, app),
            MenuItem::Notifications => draw_notifications(f, layout.main, app),
            MenuItem::Chat => draw_chat(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }

        draw_prompt(f, f.area(), app);
        draw_toasts(f, f.area(), app);
        draw_loading_spinner(f, f.area(), app, loading);
    });
    if let Err(e) = drawn {
        error!("draw failed: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%d/%m %H:%M").to_string()
}

fn dim(text: impl Into<String>) -> Paragraph<'static> {
    Paragraph::new(text.into())
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Tournaments => 0,
        MenuItem::Bracket => 1,
        MenuItem::Events => 2,
        MenuItem::Notifications => 3,
        MenuItem::Chat => 4,
        MenuItem::Help => 0,
    };

    let inbox = &app.state.notifications.inbox;
    let titles: Vec<Line> = TABS
        .iter()
        .map(|t| match *t {
            "Notifications" if inbox.unread_count > 0 => {
                let badge_color = if inbox.urgent_count > 0 { Color::Red } else { Color::Yellow };
                Line::from(vec![
                    Span::raw("Notifications "),
                    Span::styled(format!("({})", inbox.unread_count), Style::default().fg(badge_color)),
                ])
            }
            _ => Line::from(*t),
        })
        .collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let who = match &app.state.user {
        Some(user) => format!("{} | ?: help ", user.handle),
        None => "ctrl-l: sign in | ?: help ".to_string(),
    };
    let help = Paragraph::new(who)
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

// ---------------------------------------------------------------------------
// Tournaments
// ---------------------------------------------------------------------------

fn draw_tournaments(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Tournaments ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let list = &app.state.tournaments;
    if list.items.is_empty() {
        let msg = match (&app.state.last_error, list.loaded) {
            (Some(err), _) => format!("Could not load tournaments:\n{err}"),
            (None, true) => "No tournaments yet".to_string(),
            (None, false) => "Loading tournaments...".to_string(),
        };
        f.render_widget(dim(msg), inner);
        return;
    }

    let rows = list.items.iter().map(|t| {
        let teams = match t.max_teams {
            Some(max) => format!("{}/{max}", t.team_count()),
            None => t.team_count().to_string(),
        };
        Row::new(vec![
            Cell::from(t.name.clone()),
            Cell::from(t.format.label()),
            Cell::from(Span::styled(t.state.label(), state_style(t))),
            Cell::from(teams),
            Cell::from(format!("{}v{}", t.team_size, t.team_size)),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Fill(3),
            Constraint::Length(20),
            Constraint::Length(20),
            Constraint::Length(7),
            Constraint::Length(6),
        ],
    )
    .header(
        Row::new(vec!["Name", "Format", "State", "Teams", "Size"])
            .style(Style::default().fg(Color::DarkGray)),
    )
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default().with_selected(Some(list.selected));
    f.render_stateful_widget(table, inner, &mut state);
}

fn state_style(t: &Tournament) -> Style {
    use guild_api::TournamentState::*;
    match t.state {
        OpenRegistration => Style::default().fg(Color::Green),
        Ongoing => Style::default().fg(Color::Yellow),
        Cancelled => Style::default().fg(Color::Red),
        Draft | RegistrationClosed | Finished => Style::default().fg(Color::Gray),
    }
}

// ---------------------------------------------------------------------------
// Bracket
// ---------------------------------------------------------------------------

fn draw_bracket(f: &mut Frame, area: Rect, app: &mut App) {
    let block = default_border(Color::White).title(" Bracket ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(tournament) = app.state.bracket.tournament.as_ref() else {
        f.render_widget(dim("Pick a tournament on tab 1 and press Enter"), inner);
        return;
    };

    let [header, legend, content] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Fill(1)]).areas(inner);

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(tournament.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(" | {} | ", tournament.format.label())),
            Span::styled(tournament.state.label(), state_style(tournament)),
            Span::raw(format!(" | {} teams", tournament.team_count())),
        ])),
        header,
    );
    f.render_widget(
        Paragraph::new(lifecycle_legend(app)).style(Style::default().fg(Color::DarkGray)),
        legend,
    );

    let (board_area, detail_area) = if content.width >= 100 {
        let [left, right] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Length(36)]).areas(content);
        (left, Some(right))
    } else {
        (content, None)
    };

    let view = BracketView::build(tournament);
    let rounds = view.rounds();

    let grid_area = match view.standings() {
        Some(teams) if rounds.is_empty() => {
            draw_standings(f, board_area, teams);
            None
        }
        Some(teams) => {
            let height = (teams.len() as u16 + 3).min(board_area.height / 2);
            let [top, bottom] =
                Layout::vertical([Constraint::Length(height), Constraint::Fill(1)]).areas(board_area);
            draw_standings(f, top, teams);
            Some(bottom)
        }
        None => Some(board_area),
    };

    let mut scroll = None;
    if let Some(grid_area) = grid_area {
        if rounds.is_empty() {
            f.render_widget(dim("The bracket is generated when the tournament starts"), grid_area);
        } else {
            let sizes: Vec<usize> = rounds.iter().map(|r| r.matches.len()).collect();
            let grid = BracketGrid::compute(grid_area.width, &sizes);
            let bracket = &app.state.bracket;
            let first_column =
                grid.first_column_for(bracket.selected_round, grid_area.width, 0);
            let scroll_offset = grid.scroll_for(
                bracket.selected_round,
                bracket.selected_match,
                grid_area.height.saturating_sub(HEADER_HEIGHT),
                bracket.scroll_offset,
            );
            f.render_widget(
                BracketWidget {
                    rounds: &rounds,
                    grid: &grid,
                    selected_round: bracket.selected_round,
                    selected_match: bracket.selected_match,
                    scroll_offset,
                    first_column,
                    locale: app.state.locale,
                },
                grid_area,
            );
            scroll = Some(scroll_offset);
        }
    }

    if let Some(detail_area) = detail_area {
        draw_match_detail(f, detail_area, app);
    }
    if let Some(scroll) = scroll {
        app.state.bracket.scroll_offset = scroll;
    }
}

fn lifecycle_legend(app: &App) -> String {
    let Some(caps) = app.tournament_capabilities() else {
        return String::new();
    };
    let mut keys = vec!["h/l round", "j/k match"];
    for (allowed, label) in [
        (caps.open_registration, "O open"),
        (caps.close_registration, "C close"),
        (caps.reopen_registration, "R reopen"),
        (caps.start, "S start"),
        (caps.cancel, "X cancel"),
        (caps.register_team, "g register"),
    ] {
        if allowed {
            keys.push(label);
        }
    }
    keys.join("  ")
}

fn draw_standings(f: &mut Frame, area: Rect, teams: &[&Team]) {
    let rows = teams.iter().enumerate().map(|(i, t)| {
        let position = t.position.map(|p| p as usize).unwrap_or(i + 1);
        Row::new(vec![
            Cell::from(position.to_string()),
            Cell::from(t.name.clone()),
            Cell::from(t.wins.to_string()),
            Cell::from(t.losses.to_string()),
            Cell::from(t.points.to_string()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Fill(1),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(5),
        ],
    )
    .header(Row::new(vec!["#", "Team", "W", "L", "Pts"]).style(Style::default().fg(Color::DarkGray)))
    .block(default_border(Color::DarkGray).title(" Standings "));
    f.render_widget(table, area);
}

fn draw_match_detail(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::DarkGray).title(" Match ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(m) = app.state.bracket.selected_match() else {
        f.render_widget(dim("No match selected"), inner);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(format!("Match #{}", m.id), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(""),
        team_line(m, m.team_a.as_ref(), m.score_a),
        team_line(m, m.team_b.as_ref(), m.score_b),
        Line::from(""),
        Line::from(format!("State: {}", m.state.label())),
    ];
    if let Some(at) = m.scheduled_at {
        lines.push(Line::from(format!("Scheduled: {}", local_time(at))));
    }
    if let Some(winner) = m.winner() {
        lines.push(Line::from(Span::styled(
            format!("Winner: {}", winner.name),
            Style::default().fg(Color::Green),
        )));
    }
    if !m.attachments.is_empty() {
        lines.push(Line::from(format!("Attachments: {}", m.attachments.len())));
    }

    let caps = app.match_capabilities().unwrap_or_default();
    lines.push(Line::from(""));
    for (allowed, label) in [
        (caps.report_score, "s  report score"),
        (caps.verify, "v  verify"),
        (caps.dispute, "d  dispute"),
        (caps.schedule, "t  schedule"),
        (app.state.user.is_some(), "m  match chat"),
    ] {
        if allowed {
            lines.push(Line::from(Span::styled(label, Style::default().fg(Color::Cyan))));
        }
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn team_line(m: &Match, team: Option<&TeamRef>, score: Option<u32>) -> Line<'static> {
    let name = team.map(|t| t.name.clone()).unwrap_or_else(|| "TBD".to_string());
    let score = score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
    let won = matches!((m.winner_id, team), (Some(w), Some(t)) if t.id == w);
    let style = if won {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![Span::styled(name, style), Span::raw(format!("  {score}"))])
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

fn draw_events(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Upcoming events ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let events = &app.state.events;
    if events.items.is_empty() {
        let msg = if events.loaded { "No upcoming events" } else { "Loading events..." };
        f.render_widget(dim(msg), inner);
        return;
    }

    let [list_area, detail_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(7)]).areas(inner);

    let me = app.state.user_id();
    let items: Vec<ListItem> = events
        .items
        .iter()
        .map(|e| {
            let seats = match e.capacity {
                Some(cap) => format!("{}/{cap}", e.confirmed_count()),
                None => e.confirmed_count().to_string(),
            };
            let mine = me
                .and_then(|id| e.active_signup(id))
                .map(|s| signup_label(s.status))
                .unwrap_or("");
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<12}", local_time(e.starts_at)), Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{}  ", e.title)),
                Span::styled(format!("[{}] ", e.kind), Style::default().fg(Color::Cyan)),
                Span::raw(seats),
                Span::styled(format!("  {mine}"), Style::default().fg(Color::Green)),
            ]))
        })
        .collect();
    let list = List::new(items).highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(events.selected));
    f.render_stateful_widget(list, list_area, &mut state);

    let Some(event) = events.selected_event() else {
        return;
    };
    let caps = app.event_capabilities(Utc::now()).unwrap_or_default();
    let mut actions = Vec::new();
    for (allowed, label) in [
        (caps.sign_up, "u sign up"),
        (caps.withdraw, "w withdraw"),
        (caps.check_in, "i check in"),
    ] {
        if allowed {
            actions.push(label);
        }
    }
    let roles = event
        .roles
        .iter()
        .map(|r| match r.capacity {
            Some(cap) => format!("{} {}/{cap}", r.name, r.filled),
            None => format!("{} {}", r.name, r.filled),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let lines = vec![
        Line::from(event.description.clone().unwrap_or_default()),
        Line::from(format!(
            "{} - {}",
            local_time(event.starts_at),
            local_time(event.ends_at())
        )),
        Line::from(roles),
        Line::from(Span::styled(actions.join("  "), Style::default().fg(Color::Cyan))),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(default_border(Color::DarkGray).title(format!(" {} ", event.title))),
        detail_area,
    );
}

fn signup_label(status: SignupStatus) -> &'static str {
    match status {
        SignupStatus::Confirmed => "signed up",
        SignupStatus::Waitlist => "waitlist",
        SignupStatus::CheckedIn => "checked in",
        SignupStatus::Withdrawn => "",
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

fn draw_notifications(f: &mut Frame, area: Rect, app: &App) {
    let inbox = &app.state.notifications.inbox;
    let title = format!(" Notifications ({} unread) ", inbox.unread_count);
    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.state.user.is_none() {
        f.render_widget(dim("Sign in with ctrl-l to see your notifications"), inner);
        return;
    }
    if inbox.items.is_empty() {
        f.render_widget(dim("Nothing here"), inner);
        return;
    }

    let items: Vec<ListItem> = inbox
        .items
        .iter()
        .map(|n| {
            let marker = if n.is_read { "  " } else { "● " };
            let title_style = match (n.is_read, n.priority) {
                (true, _) => Style::default().fg(Color::DarkGray),
                (false, Priority::Urgent) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                (false, Priority::High) => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                (false, _) => Style::default().add_modifier(Modifier::BOLD),
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::Cyan)),
                    Span::styled(n.title.clone(), title_style),
                    Span::styled(format!("  {}", local_time(n.created_at)), Style::default().fg(Color::DarkGray)),
                ]),
                Line::from(Span::styled(
                    format!("  {}", n.message),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();
    let list = List::new(items).highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(app.state.notifications.selected));
    f.render_stateful_widget(list, inner, &mut state);
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

fn draw_chat(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Chat ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.width == 0 || inner.height < 4 {
        return;
    }

    let chat = &app.state.chat;
    let Some(context) = chat.context else {
        f.render_widget(
            dim("Open a match chat from the bracket (m) or an event chat from the events tab (m)"),
            inner,
        );
        return;
    };

    let [messages_area, input_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(3)]).areas(inner);

    let status_color = match chat.connection {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting => Color::Yellow,
        ConnectionState::Backoff(_) | ConnectionState::Disconnected => Color::Red,
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled("room ", Style::default().fg(Color::DarkGray)),
            Span::styled(context.to_string(), Style::default().fg(Color::Gray)),
            Span::styled("  status ", Style::default().fg(Color::DarkGray)),
            Span::styled(chat.connection.label(), Style::default().fg(status_color)),
        ]),
        Line::from(""),
    ];

    let me = app.state.user_id();
    for msg in &chat.messages {
        let prefix = format!(
            "[{}] {}: ",
            msg.created_at.with_timezone(&Local).format("%H:%M"),
            msg.sender_handle
        );
        let style = if Some(msg.sender_id) == me {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };
        let body_width = messages_area
            .width
            .saturating_sub(prefix.chars().count() as u16)
            .max(8) as usize;
        let clipped: String = msg.content.chars().take(body_width).collect();
        lines.push(Line::from(vec![
            Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
            Span::styled(clipped, style),
        ]));
    }

    let visible = messages_area.height as usize;
    let total = lines.len();
    let offset = chat.scroll_offset as usize;
    let end = total.saturating_sub(offset);
    let start = end.saturating_sub(visible);
    let window = if start < end { lines[start..end].to_vec() } else { Vec::new() };
    f.render_widget(Paragraph::new(window), messages_area);

    let mode = if chat.composing { "typing" } else { "idle" };
    let input = if chat.composing {
        format!("> {}_", chat.input)
    } else {
        "Press Enter/i to type. Esc cancel. j/k scroll. x leave room.".to_string()
    };
    let input_style = if chat.composing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input_block = default_border(Color::DarkGray).title(format!(" {mode} "));
    let input_inner = input_block.inner(input_area);
    f.render_widget(input_block, input_area);
    f.render_widget(Paragraph::new(input).style(input_style), input_inner);
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::DarkGray).title(" Help (Esc to close) ");
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Paragraph::new(HELP_TEXT), inner);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .output_separator(' ')
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false)
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Cyan))
        .style_debug(Style::default().fg(Color::Green))
        .style_trace(Style::default().fg(Color::Magenta));
    f.render_widget(logs, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn draw_prompt(f: &mut Frame, area: Rect, app: &App) {
    let Some(prompt) = app.state.prompt.as_ref() else {
        return;
    };
    let login_url = app
        .state
        .login_url
        .as_deref()
        .filter(|_| prompt.kind == PromptKind::Login);
    let height = if login_url.is_some() { 7 } else { 3 };
    let popup = centered(area, area.width.saturating_sub(8).min(90), height);
    f.render_widget(Clear, popup);

    let block = default_border(Color::Yellow).title(format!(" {} ", prompt.kind.title()));
    let mut lines = Vec::new();
    if let Some(url) = login_url {
        lines.push(Line::from(Span::styled(
            "Open this URL, authorize, then paste the callback URL:",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(url.to_string(), Style::default().fg(Color::Cyan))));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(format!("> {}_", prompt.input)));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), popup);
}

fn draw_toasts(f: &mut Frame, area: Rect, app: &App) {
    let width = 48.min(area.width.saturating_sub(2));
    let inner = width.saturating_sub(4) as usize;
    let mut y = area.y + 3;
    for toast in app.state.toasts.iter() {
        let lines: Vec<Line> = toast
            .text
            .lines()
            .map(|line| Line::from(line.chars().take(inner).collect::<String>()))
            .collect();
        let height = lines.len().max(1) as u16 + 2;
        if y + height > area.y + area.height {
            break;
        }
        let color = match toast.level {
            ToastLevel::Info => Color::Green,
            ToastLevel::Error => Color::Red,
        };
        let rect = Rect::new(area.x + area.width - width - 1, y, width, height);
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(lines).block(default_border(color)).style(Style::default().fg(Color::White)),
            rect,
        );
        y += height;
    }
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(3), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
