//! Layout and drawing: board, tiles, sidebar, game-over and quit overlays.

use crate::app::{QuitOption, Screen};
use crate::game::{Board, Phase};
use crate::grid::Coord;
use crate::theme::Theme;
use crate::view::{Outcome, TileView};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{CellFilter, Duration as TfxDuration, EffectRenderer, Interpolation, fx, ref_count};

/// Terminal cells per lattice cell, including the one-cell gutter.
const CELL_W: u16 = 8;
const CELL_H: u16 = 4;

const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the fade-in for freshly spawned tiles.
const SPAWN_FADE_MS: u32 = 180;

/// Board size in terminal cells (border + gutters + tiles).
fn board_pixel_size(width: usize, height: usize) -> (u16, u16) {
    let side = |cells: usize, per: u16| {
        u16::try_from(cells)
            .unwrap_or(u16::MAX)
            .saturating_mul(per)
            .saturating_add(1 + 2)
    };
    (side(width, CELL_W), side(height, CELL_H))
}

/// Screen rect of the tile at lattice position (x, y); `y` grows upward on the lattice.
fn tile_rect(inner: Rect, board_height: usize, x: f32, y: f32) -> Rect {
    let row = (board_height as f32 - 1.0) - y;
    Rect {
        x: inner
            .x
            .saturating_add(1)
            .saturating_add((x * CELL_W as f32).round().max(0.0) as u16),
        y: inner
            .y
            .saturating_add(1)
            .saturating_add((row * CELL_H as f32).round().max(0.0) as u16),
        width: CELL_W - 1,
        height: CELL_H - 1,
    }
}

fn fill(buf: &mut Buffer, rect: Rect, clip: Rect, color: Color) {
    let r = rect.intersection(clip);
    for y in r.top()..r.bottom() {
        for x in r.left()..r.right() {
            buf[(x, y)]
                .set_symbol(" ")
                .set_style(Style::default().bg(color));
        }
    }
}

/// Draw the current screen. Builds and advances the spawn fade kept in `view`.
pub fn draw<R>(
    frame: &mut Frame,
    screen: Screen,
    board: &Board<R>,
    view: &mut TileView,
    theme: &Theme,
    quit_selected: QuitOption,
    now: Instant,
) {
    let area = frame.area();
    fill(frame.buffer_mut(), area, area, theme.bg);

    let (pw, ph) = board_pixel_size(board.config().width, board.config().height);
    if area.width < pw || area.height < ph {
        draw_too_small(frame, theme, area, pw.saturating_add(SIDEBAR_WIDTH), ph);
        return;
    }

    let (board_area, sidebar_area) = game_layout(area, pw, ph);
    let inner = draw_board(frame, board, view, theme, board_area, now);
    if sidebar_area.width > 0 {
        draw_sidebar(frame, board, theme, sidebar_area);
    }
    apply_spawn_effect(frame, board, view, theme, inner, now);

    match screen {
        Screen::Playing => {}
        Screen::Finished => draw_outcome(frame, board, view, theme, area),
        Screen::QuitMenu => draw_quit_menu(frame, theme, quit_selected),
    }
}

/// Center board + sidebar; the sidebar is dropped when it does not fit.
fn game_layout(area: Rect, pw: u16, ph: u16) -> (Rect, Rect) {
    let sidebar = if area.width >= pw.saturating_add(SIDEBAR_WIDTH) {
        SIDEBAR_WIDTH
    } else {
        0
    };
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(pw),
            Constraint::Length(sidebar),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = |r: Rect| {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(ph),
                Constraint::Fill(1),
            ])
            .split(r)[1]
    };
    (vert(horiz[1]), vert(horiz[2]))
}

fn draw_too_small(frame: &mut Frame, theme: &Theme, area: Rect, need_w: u16, need_h: u16) {
    let lines = vec![
        Line::from(Span::styled(" Terminal too small ", Style::default().fg(theme.title))),
        Line::from(Span::styled(
            format!(" need {}x{}, have {}x{} ", need_w, need_h, area.width, area.height),
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(area, frame.buffer_mut());
}

/// Draw the grid and every sprite at its tweened position. Returns the inner board rect.
fn draw_board<R>(
    frame: &mut Frame,
    board: &Board<R>,
    view: &TileView,
    theme: &Theme,
    area: Rect,
    now: Instant,
) -> Rect {
    let title = format!(" 2048  | Goal: {} ", board.config().win_value);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let clip = inner.intersection(frame.area());
    let height = board.config().height;
    let buf = frame.buffer_mut();

    for coord in board.grid().coords() {
        let rect = tile_rect(inner, height, coord.x as f32, coord.y as f32);
        fill(buf, rect, clip, theme.empty);
    }

    for (_, sprite, (x, y)) in view.sprites_at(now) {
        let rect = tile_rect(inner, height, x, y);
        fill(buf, rect, clip, sprite.style.fill);
        let label = &sprite.style.label;
        let lx = rect.x.saturating_add(rect.width.saturating_sub(label.len() as u16) / 2);
        let ly = rect.y.saturating_add(rect.height / 2);
        if clip.contains(Position::new(lx, ly))
            && lx.saturating_add(label.len() as u16) <= clip.right()
            && label.len() as u16 <= rect.width
        {
            let style = Style::default()
                .fg(sprite.style.text)
                .bg(sprite.style.fill)
                .bold();
            buf.set_string(lx, ly, label, style);
        }
    }
    inner
}

/// Fade freshly spawned tiles in from the empty-cell colour (TachyonFX).
fn apply_spawn_effect<R>(
    frame: &mut Frame,
    board: &Board<R>,
    view: &mut TileView,
    theme: &Theme,
    inner: Rect,
    now: Instant,
) {
    if view.has_fresh() {
        let cells = view.take_fresh();
        if !view.animates() {
            return;
        }
        let positions = spawn_buffer_positions(inner, board.config().height, &cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            theme.empty,
            theme.empty,
            (SPAWN_FADE_MS, Interpolation::QuadOut),
        )
        .with_filter(filter)
        .with_area(inner);
        view.spawn_effect = Some(effect);
        view.spawn_effect_time = None;
    }

    let delta = view
        .spawn_effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    view.spawn_effect_time = Some(now);

    if let Some(effect) = view.spawn_effect.as_mut() {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
        if effect.done() {
            view.spawn_effect = None;
            view.spawn_effect_time = None;
        }
    }
}

/// Buffer (x, y) positions covered by tiles on `cells`.
fn spawn_buffer_positions(inner: Rect, height: usize, cells: &[Coord]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for c in cells {
        let rect = tile_rect(inner, height, c.x as f32, c.y as f32);
        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                set.insert((x, y));
            }
        }
    }
    set
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::GenerateLevel | Phase::SpawningBlocks => "Spawning",
        Phase::WaitingInput => "Your move",
        Phase::Moving => "Sliding",
        Phase::Win => "Won",
        Phase::Lose => "Lost",
    }
}

fn draw_sidebar<R>(frame: &mut Frame, board: &Board<R>, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(4), // Tiles strip
            Constraint::Length(1), // gap
            Constraint::Fill(1),   // Controls
        ])
        .split(area);

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let largest = board
        .largest_tile()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut stats = vec![
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(board.moves_made().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Largest: ", title_style),
            Span::styled(largest, fg_style),
        ]),
        Line::from(vec![
            Span::styled("State: ", title_style),
            Span::styled(phase_label(board.phase()), fg_style),
        ]),
    ];
    if board.phase() == Phase::WaitingInput && !board.has_legal_move() {
        stats.push(Line::from(Span::styled(
            "No moves left",
            Style::default().fg(Color::Red).bold(),
        )));
    }
    Paragraph::new(stats).render(stats_inner, frame.buffer_mut());

    // --- Tiles strip ---
    let strip_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let strip_inner = strip_block.inner(chunks[2]);
    strip_block.render(chunks[2], frame.buffer_mut());
    Paragraph::new(Line::from(Span::styled("Tiles", title_style)))
        .render(strip_inner, frame.buffer_mut());
    if strip_inner.height > 1 {
        let y = strip_inner.y + 1;
        let shown = board.catalog().len().min(strip_inner.width as usize);
        for (i, style) in board.catalog().iter().take(shown).enumerate() {
            let x = strip_inner.x + i as u16;
            frame.buffer_mut()[(x, y)]
                .set_symbol("█")
                .set_style(Style::default().fg(style.fill).bg(theme.bg));
        }
    }

    // --- Controls ---
    let help_style = Style::default().fg(theme.inactive_fg);
    let help = vec![
        Line::from(Span::styled("←↑↓→ hjkl wasd", help_style)),
        Line::from(Span::styled("R  new game", help_style)),
        Line::from(Span::styled("Q  quit menu", help_style)),
    ];
    Paragraph::new(help).render(chunks[4], frame.buffer_mut());
}

fn draw_outcome<R>(
    frame: &mut Frame,
    board: &Board<R>,
    view: &TileView,
    theme: &Theme,
    area: Rect,
) {
    let popup_w = 30u16;
    let popup_h = 9u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let won = match view.outcome() {
        Some(outcome) => outcome == Outcome::Win,
        None => board.phase() == Phase::Win,
    };
    let title = if won {
        Span::styled(" You win! ", Style::default().fg(Color::Black).bg(theme.title))
    } else {
        Span::styled(" Game Over ", Style::default().fg(Color::White).bg(Color::Red))
    };
    let lines = vec![
        Line::from(""),
        Line::from(title),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Moves: {} ", board.moves_made()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Largest tile: {} ", board.largest_tile().unwrap_or(0)),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R — New game    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    fill(frame.buffer_mut(), popup, area, theme.bg);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" tui2048 ", theme.title)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw.min(area.width),
        height: qh.min(area.height),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    fill(frame.buffer_mut(), quit_rect, area, theme.bg);
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::NewGame, " New game "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.bottom() {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
