use guild_api::bracket::{BracketRound, Locale};
use guild_api::{BracketSide, Match, MatchState, TeamRef};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::widgets::Widget;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Rows per match cell: team A line, status line, team B line.
pub const MATCH_HEIGHT: u16 = 3;

/// Vertical distance between cells stacked in an unlinked column.
const STACK_SPACING: u16 = MATCH_HEIGHT + 1;

/// Width of the connector zone drawn between adjacent round columns.
pub const CONNECTOR_WIDTH: u16 = 3;

const CELL_W_MIN: u16 = 14;
const CELL_W_FULL: u16 = 22;

/// Rows reserved above the grid for round labels.
pub const HEADER_HEIGHT: u16 = 2;

const DIM: Style = Style::new().fg(Color::DarkGray);
const LIVE: Style = Style::new().fg(Color::Yellow);
const WINNER: Style = Style::new().fg(Color::Green);
const DISPUTED: Style = Style::new().fg(Color::Red);
const HEADER: Style = Style::new().fg(Color::Cyan);

// ---------------------------------------------------------------------------
// Pre-computed position for one match
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCell {
    /// Row of the status line, relative to the top of the grid.
    pub center_row: u16,
    /// Index of the round column this cell sits in.
    pub column: usize,
    pub match_idx: usize,
}

// ---------------------------------------------------------------------------
// Layout engine
// ---------------------------------------------------------------------------

/// Column layout for a list of rounds.
///
/// A column whose match count is exactly half of the previous one is
/// *linked*: each of its matches sits at the midpoint of the two matches
/// feeding it and gets box-drawing connectors. Any other column (a losers
/// round, a swiss round) is stacked from the top without connectors.
///
/// For a full elimination tree this reproduces the slot-height recurrence
/// `SH[0] = MATCH_HEIGHT, SH[d] = 2 * SH[d-1] + 1` with centers
/// `SH[d]/2 + i * (SH[d] + 1)`.
#[derive(Debug, Clone)]
pub struct BracketGrid {
    /// One entry per column, cells in match order.
    pub columns: Vec<Vec<MatchCell>>,
    /// Whether column `d` is linked to column `d - 1`. Always false for column 0.
    pub linked: Vec<bool>,
    pub cell_width: u16,
    pub total_height: u16,
}

impl BracketGrid {
    pub fn compute(area_width: u16, round_sizes: &[usize]) -> Self {
        let n = round_sizes.len().max(1) as u16;
        let per_col = area_width.saturating_sub(CONNECTOR_WIDTH * (n - 1)) / n;
        let cell_width = per_col.clamp(CELL_W_MIN, CELL_W_FULL);

        let mut columns: Vec<Vec<MatchCell>> = Vec::with_capacity(round_sizes.len());
        let mut linked = Vec::with_capacity(round_sizes.len());

        for (d, &count) in round_sizes.iter().enumerate() {
            let previous = d.checked_sub(1).map(|p| &columns[p]);
            let is_linked = previous.is_some_and(|p: &Vec<MatchCell>| count > 0 && p.len() == count * 2);

            let cells = (0..count)
                .map(|i| {
                    let center_row = match previous {
                        Some(prev) if is_linked => {
                            (prev[2 * i].center_row + prev[2 * i + 1].center_row) / 2
                        }
                        _ => MATCH_HEIGHT / 2 + i as u16 * STACK_SPACING,
                    };
                    MatchCell { center_row, column: d, match_idx: i }
                })
                .collect();

            columns.push(cells);
            linked.push(is_linked);
        }

        let total_height = columns
            .iter()
            .flatten()
            .map(|c| c.center_row + MATCH_HEIGHT / 2 + 1)
            .max()
            .unwrap_or(0);

        Self { columns, linked, cell_width, total_height }
    }

    pub fn stride(&self) -> u16 {
        self.cell_width + CONNECTOR_WIDTH
    }

    /// How many columns fit in `width`.
    pub fn visible_columns(&self, width: u16) -> usize {
        ((width + CONNECTOR_WIDTH) / self.stride()).max(1) as usize
    }

    pub fn cell(&self, column: usize, match_idx: usize) -> Option<&MatchCell> {
        self.columns.get(column)?.get(match_idx)
    }

    /// Smallest change to `current` that keeps `column` on screen.
    pub fn first_column_for(&self, column: usize, width: u16, current: usize) -> usize {
        let visible = self.visible_columns(width);
        if column < current {
            column
        } else if column >= current + visible {
            column + 1 - visible
        } else {
            current
        }
    }

    /// Smallest change to `current` that keeps the selected cell's three rows on screen.
    pub fn scroll_for(&self, column: usize, match_idx: usize, height: u16, current: u16) -> u16 {
        let Some(cell) = self.cell(column, match_idx) else {
            return 0;
        };
        let top = cell.center_row.saturating_sub(MATCH_HEIGHT / 2);
        let bottom = cell.center_row + MATCH_HEIGHT / 2;
        if top < current {
            top
        } else if height > 0 && bottom >= current + height {
            bottom + 1 - height
        } else {
            current
        }
    }
}

// ---------------------------------------------------------------------------
// BracketWidget
// ---------------------------------------------------------------------------

pub struct BracketWidget<'a> {
    pub rounds: &'a [&'a BracketRound<'a>],
    pub grid: &'a BracketGrid,
    pub selected_round: usize,
    pub selected_match: usize,
    /// Vertical scroll in grid rows.
    pub scroll_offset: u16,
    /// Leftmost round column drawn.
    pub first_column: usize,
    pub locale: Locale,
}

impl Widget for BracketWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < CELL_W_MIN || area.height <= HEADER_HEIGHT {
            return;
        }
        let grid_area = Rect {
            y: area.y + HEADER_HEIGHT,
            height: area.height - HEADER_HEIGHT,
            ..area
        };
        let stride = self.grid.stride();
        let limit_x = area.x + area.width;

        for (d, round) in self.rounds.iter().enumerate().skip(self.first_column) {
            let x = area.x + (d - self.first_column) as u16 * stride;
            if x >= limit_x {
                break;
            }
            let losers = round.matches.first().is_some_and(|m| m.bracket == BracketSide::Losers);
            let label = round.name.label(self.locale);
            let label = if losers { format!("L {label}") } else { label };
            let label: String = label
                .chars()
                .take(self.grid.cell_width as usize)
                .collect();
            let style = if d == self.selected_round {
                HEADER.add_modifier(Modifier::BOLD)
            } else {
                HEADER
            };
            buf.set_stringn(x, area.y, &label, limit_x.saturating_sub(x) as usize, style);

            for cell in self.grid.columns.get(d).into_iter().flatten() {
                let selected = d == self.selected_round && cell.match_idx == self.selected_match;
                draw_match_cell(
                    round.matches.get(cell.match_idx).copied(),
                    cell,
                    x,
                    self.grid.cell_width,
                    selected,
                    grid_area,
                    self.scroll_offset,
                    buf,
                );
            }

            if d > self.first_column && self.grid.linked.get(d).copied().unwrap_or(false) {
                let children = &self.grid.columns[d - 1];
                let conn_x = x - CONNECTOR_WIDTH;
                for (j, parent) in self.grid.columns[d].iter().enumerate() {
                    let (a, b) = (&children[2 * j], &children[2 * j + 1]);
                    let (top, bot) = if a.center_row <= b.center_row { (a, b) } else { (b, a) };
                    draw_connector(
                        top.center_row,
                        parent.center_row,
                        bot.center_row,
                        conn_x,
                        grid_area,
                        self.scroll_offset,
                        buf,
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Drawing helpers
// ---------------------------------------------------------------------------

/// Grid row to absolute screen y, or `None` when scrolled out of view.
fn screen_y(grid_row: u16, scroll: u16, area: Rect) -> Option<u16> {
    let rel = grid_row.checked_sub(scroll)?;
    (rel < area.height).then_some(area.y + rel)
}

#[allow(clippy::too_many_arguments)]
fn draw_match_cell(
    m: Option<&Match>,
    cell: &MatchCell,
    x: u16,
    width: u16,
    selected: bool,
    area: Rect,
    scroll: u16,
    buf: &mut Buffer,
) {
    let limit_x = area.x + area.width;
    if x >= limit_x {
        return;
    }
    let avail = (limit_x - x) as usize;

    let base = if selected {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(Color::Gray)
    };

    let rows = [
        (cell.center_row.saturating_sub(1), 0u8),
        (cell.center_row, 1),
        (cell.center_row + 1, 2),
    ];
    for (grid_row, slot) in rows {
        let Some(sy) = screen_y(grid_row, scroll, area) else {
            continue;
        };
        let content = format_match_row(m, slot, width as usize);
        let style = match (m, slot) {
            (Some(m), 1) => status_style(m.state),
            (Some(m), 0) if is_winner(m, m.team_a.as_ref()) => WINNER.add_modifier(Modifier::BOLD),
            (Some(m), 2) if is_winner(m, m.team_b.as_ref()) => WINNER.add_modifier(Modifier::BOLD),
            _ => base,
        };
        let style = if selected && slot != 1 { base.patch(style) } else { style };
        buf.set_stringn(x, sy, &content, avail, style);
    }
}

fn status_style(state: MatchState) -> Style {
    match state {
        MatchState::Live => LIVE,
        MatchState::Disputed => DISPUTED,
        _ => DIM,
    }
}

fn is_winner(m: &Match, team: Option<&TeamRef>) -> bool {
    matches!((m.winner_id, team), (Some(w), Some(t)) if t.id == w)
}

/// `slot`: 0 = team A, 1 = status, 2 = team B.
pub fn format_match_row(m: Option<&Match>, slot: u8, width: usize) -> String {
    match (m, slot) {
        (None, _) => " ".repeat(width),
        (Some(m), 0) => format_team_line(m.team_a.as_ref(), m.score_a, width),
        (Some(m), 2) => format_team_line(m.team_b.as_ref(), m.score_b, width),
        (Some(m), _) => format_status_line(m, width),
    }
}

/// `"name          score "`, exactly `width` chars.
pub fn format_team_line(team: Option<&TeamRef>, score: Option<u32>, width: usize) -> String {
    let name = team.map(|t| t.name.as_str()).unwrap_or("TBD");
    let score = score.map(|s| format!("{s:>3}")).unwrap_or_else(|| "   ".to_string());
    let name_w = width.saturating_sub(5);
    let name: String = name.chars().take(name_w).collect();
    let line = format!("{name:<name_w$} {score} ");
    line.chars().take(width).collect()
}

pub fn format_status_line(m: &Match, width: usize) -> String {
    let raw = match m.state {
        MatchState::Pending => m
            .scheduled_at
            .map(|t| format!(" {}", t.format("%d/%m %H:%M")))
            .unwrap_or_else(|| " pending".to_string()),
        MatchState::Live => " LIVE".to_string(),
        MatchState::Reported => " reported".to_string(),
        MatchState::Verified => " FINAL".to_string(),
        MatchState::Disputed => " DISPUTED".to_string(),
    };
    let padded = format!("{raw:<width$}");
    padded.chars().take(width).collect()
}

/// Box-drawing connector between one parent and its two children.
///
/// ```text
///  child_top  ──┐
///               │
///  parent     ──├──
///               │
///  child_bot  ──┘
/// ```
fn draw_connector(
    r_top: u16,
    r_mid: u16,
    r_bot: u16,
    conn_x: u16,
    area: Rect,
    scroll: u16,
    buf: &mut Buffer,
) {
    let (col_a, col_b, col_c) = (conn_x, conn_x + 1, conn_x + 2);
    let limit_x = area.x + area.width;

    let mut put = |x: u16, row: u16, ch: char| {
        if x < limit_x
            && let Some(sy) = screen_y(row, scroll, area)
        {
            put_char(buf, x, sy, ch, DIM);
        }
    };

    put(col_a, r_top, '─');
    put(col_b, r_top, '┐');
    for row in (r_top + 1)..r_mid {
        put(col_b, row, '│');
    }
    put(col_a, r_mid, '─');
    put(col_b, r_mid, '├');
    put(col_c, r_mid, '─');
    for row in (r_mid + 1)..r_bot {
        put(col_b, row, '│');
    }
    put(col_a, r_bot, '─');
    put(col_b, r_bot, '┘');
}

fn put_char(buf: &mut Buffer, x: u16, y: u16, ch: char, style: Style) {
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_char(ch);
        cell.set_style(style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_api::bracket::RoundName;

    fn centers(grid: &BracketGrid, column: usize) -> Vec<u16> {
        grid.columns[column].iter().map(|c| c.center_row).collect()
    }

    #[test]
    fn sixteen_team_tree_follows_slot_heights() {
        let grid = BracketGrid::compute(120, &[8, 4, 2, 1]);
        assert_eq!(centers(&grid, 0), [1, 5, 9, 13, 17, 21, 25, 29]);
        assert_eq!(centers(&grid, 1), [3, 11, 19, 27]);
        assert_eq!(centers(&grid, 2), [7, 23]);
        assert_eq!(centers(&grid, 3), [15]);
        assert_eq!(grid.total_height, 31);
        assert_eq!(grid.linked, [false, true, true, true]);
    }

    #[test]
    fn parent_sits_at_midpoint_of_children() {
        let grid = BracketGrid::compute(200, &[16, 8, 4, 2, 1]);
        for d in 1..grid.columns.len() {
            for (j, parent) in grid.columns[d].iter().enumerate() {
                let a = grid.columns[d - 1][2 * j].center_row;
                let b = grid.columns[d - 1][2 * j + 1].center_row;
                assert_eq!(parent.center_row, (a + b) / 2, "column {d} match {j}");
            }
        }
    }

    #[test]
    fn uneven_rounds_are_stacked_without_connectors() {
        // Losers rounds keep the same count from one round to the next.
        let grid = BracketGrid::compute(120, &[4, 2, 1, 2, 2, 1]);
        assert_eq!(grid.linked, [false, true, true, false, false, true]);
        assert_eq!(centers(&grid, 3), [1, 5]);
        assert_eq!(centers(&grid, 4), [1, 5]);
        assert_eq!(centers(&grid, 5), [3]);
    }

    #[test]
    fn cell_width_is_clamped() {
        assert_eq!(BracketGrid::compute(400, &[2, 1]).cell_width, CELL_W_FULL);
        assert_eq!(BracketGrid::compute(40, &[32, 16, 8, 4, 2, 1]).cell_width, CELL_W_MIN);
        let width: u16 = 70;
        let expected = (width - CONNECTOR_WIDTH * 3) / 4;
        assert_eq!(BracketGrid::compute(width, &[8, 4, 2, 1]).cell_width, expected);
    }

    #[test]
    fn selection_is_kept_on_screen() {
        let grid = BracketGrid::compute(40, &[8, 4, 2, 1]);
        assert_eq!(grid.visible_columns(40), 2);
        assert_eq!(grid.first_column_for(3, 40, 0), 2);
        assert_eq!(grid.first_column_for(0, 40, 2), 0);
        assert_eq!(grid.first_column_for(1, 40, 0), 0);

        // Last first-round match spans rows 28..=30.
        assert_eq!(grid.scroll_for(0, 7, 10, 0), 21);
        assert_eq!(grid.scroll_for(0, 0, 10, 21), 0);
        assert_eq!(grid.scroll_for(0, 1, 10, 0), 0);
    }

    #[test]
    fn team_line_has_exact_width() {
        let team = TeamRef { id: 1, name: "Les Invincibles du Dimanche".into(), captain_id: 1 };
        assert_eq!(format_team_line(Some(&team), Some(13), 18).chars().count(), 18);
        assert_eq!(format_team_line(None, None, 22).chars().count(), 22);
        assert!(format_team_line(None, None, 22).starts_with("TBD"));
    }

    #[test]
    fn status_line_reflects_match_state() {
        let m = Match { state: MatchState::Disputed, ..Default::default() };
        assert_eq!(format_status_line(&m, 12), " DISPUTED   ");
        let m = Match { state: MatchState::Pending, ..Default::default() };
        assert_eq!(format_status_line(&m, 10).trim(), "pending");
    }

    #[test]
    fn renders_labels_connectors_and_teams() {
        let team = |id: u64, name: &str| Some(TeamRef { id, name: name.into(), captain_id: id });
        let semi_1 = Match { id: 1, round: 1, team_a: team(1, "Alpha"), team_b: team(2, "Bravo"), winner_id: Some(1), state: MatchState::Verified, score_a: Some(2), score_b: Some(0), ..Default::default() };
        let semi_2 = Match { id: 2, round: 1, team_a: team(3, "Charlie"), team_b: team(4, "Delta"), ..Default::default() };
        let fin = Match { id: 3, round: 2, team_a: team(1, "Alpha"), ..Default::default() };
        let r1 = BracketRound { number: 1, name: RoundName::Semifinal, matches: vec![&semi_1, &semi_2] };
        let r2 = BracketRound { number: 2, name: RoundName::Final, matches: vec![&fin] };
        let rounds = [&r1, &r2];
        let grid = BracketGrid::compute(60, &[2, 1]);

        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        BracketWidget {
            rounds: &rounds,
            grid: &grid,
            selected_round: 1,
            selected_match: 0,
            scroll_offset: 0,
            first_column: 0,
            locale: Locale::En,
        }
        .render(area, &mut buf);

        let row = |y: u16| -> String { (0..area.width).map(|x| buf[(x, y)].symbol()).collect() };
        assert!(row(0).starts_with("Semifinal"));
        assert!(row(0).contains("Final"));
        // Semifinal 1 occupies grid rows 0..=2, i.e. screen rows 2..=4.
        assert!(row(2).starts_with("Alpha"));
        assert!(row(3).contains("FINAL"));
        // Final centered between rows 1 and 5 of the grid, connector column at cell_width.
        let w = grid.cell_width;
        assert_eq!(buf[(w + 1, 2 + 1)].symbol(), "┐");
        assert_eq!(buf[(w + 1, 2 + 3)].symbol(), "├");
        assert_eq!(buf[(w + 1, 2 + 5)].symbol(), "┘");
    }
}
