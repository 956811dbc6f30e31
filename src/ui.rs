use crate::model::PlaylistCard;
use crate::view::{NowPlayingView, RowIcon};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

const APP_TITLE: &str = "Playbar  ";

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
    selected_bg: Color::Rgb(34, 55, 82),
};

/// Everything the renderer needs besides the player view.
pub struct Chrome<'a> {
    pub cards: &'a [PlaylistCard],
    pub active_card: Option<usize>,
    pub cursor: usize,
    pub list_offset: usize,
    pub message: &'a str,
}

/// Screen regions of the last frame, used to route mouse clicks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hitboxes {
    pub rows: Rect,
    pub list_offset: usize,
    pub seekbar: Rect,
    pub cards: Vec<(Rect, usize)>,
}

impl Hitboxes {
    /// Playlist row under the pointer.
    pub fn row_at(&self, x: u16, y: u16) -> Option<usize> {
        if !point_in_rect(x, y, self.rows) {
            return None;
        }
        Some(usize::from(y - self.rows.y) + self.list_offset)
    }

    /// Seek fraction for a click at horizontal position `x` on the seekbar.
    pub fn seek_fraction(&self, x: u16, y: u16) -> Option<f64> {
        if !point_in_rect(x, y, self.seekbar) {
            return None;
        }
        let offset = f64::from(x - self.seekbar.x);
        let width = f64::from(self.seekbar.width.saturating_sub(1).max(1));
        Some((offset / width).clamp(0.0, 1.0))
    }

    pub fn card_at(&self, x: u16, y: u16) -> Option<usize> {
        self.cards
            .iter()
            .find(|(rect, _)| point_in_rect(x, y, *rect))
            .map(|(_, idx)| *idx)
    }
}

pub fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn is_drawable(area: Rect) -> bool {
    area.width > 0 && area.height > 0
}

pub fn draw(frame: &mut Frame, view: &NowPlayingView, chrome: &Chrome<'_>) -> Hitboxes {
    let colors = PALETTE;
    let mut hitboxes = Hitboxes::default();
    if !is_drawable(frame.area()) {
        return hitboxes;
    }

    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    hitboxes.cards = draw_cards(frame, vertical[0], chrome, &colors);
    let (rows, offset) = draw_song_list(frame, vertical[1], view, chrome, &colors);
    hitboxes.rows = rows;
    hitboxes.list_offset = offset;
    draw_now_playing(frame, vertical[2], view, &colors);
    hitboxes.seekbar = draw_seekbar(frame, vertical[3], view, &colors);
    draw_footer(frame, vertical[4], chrome, &colors);

    hitboxes
}

fn draw_cards(
    frame: &mut Frame,
    area: Rect,
    chrome: &Chrome<'_>,
    colors: &Palette,
) -> Vec<(Rect, usize)> {
    if !is_drawable(area) {
        return Vec::new();
    }
    frame.render_widget(
        panel_block("Playlists", colors.panel_bg, colors.text, colors.border),
        area,
    );
    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    if !is_drawable(inner) {
        return Vec::new();
    }

    let mut spans = vec![Span::styled(
        APP_TITLE,
        Style::default()
            .fg(colors.accent)
            .add_modifier(Modifier::BOLD),
    )];
    let mut x = inner.x.saturating_add(APP_TITLE.chars().count() as u16);
    let mut boxes = Vec::with_capacity(chrome.cards.len());

    for (idx, card) in chrome.cards.iter().enumerate() {
        let label = if idx < 9 {
            format!("[{}] {}", idx + 1, card.name)
        } else {
            format!("[ ] {}", card.name)
        };
        let width = label.chars().count() as u16;
        let style = if chrome.active_card == Some(idx) {
            Style::default()
                .fg(Color::White)
                .bg(colors.selected_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.muted)
        };

        let right_edge = inner.x.saturating_add(inner.width);
        if x < right_edge {
            boxes.push((
                Rect {
                    x,
                    y: inner.y,
                    width: width.min(right_edge - x),
                    height: 1,
                },
                idx,
            ));
        }
        spans.push(Span::styled(label, style));
        spans.push(Span::raw("  "));
        x = x.saturating_add(width + 2);
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
    boxes
}

fn draw_song_list(
    frame: &mut Frame,
    area: Rect,
    view: &NowPlayingView,
    chrome: &Chrome<'_>,
    colors: &Palette,
) -> (Rect, usize) {
    if !is_drawable(area) {
        return (Rect::default(), 0);
    }

    let items: Vec<ListItem> = view
        .rows
        .iter()
        .map(|row| {
            let icon_style = match row.icon {
                RowIcon::Playing => Style::default().fg(colors.accent),
                RowIcon::Idle => Style::default().fg(colors.muted),
            };
            let title_style = if row.current {
                Style::default()
                    .fg(colors.alert)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.text)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", row.icon.glyph()), icon_style),
                Span::styled(row.title.as_str(), title_style),
            ]))
        })
        .collect();

    let mut state = ListState::default().with_offset(chrome.list_offset);
    let last_row = view.rows.len().saturating_sub(1);
    state.select((!view.rows.is_empty()).then_some(chrome.cursor.min(last_row)));

    let list = List::new(items)
        .block(panel_block(
            &format!("Songs ({})", view.rows.len()),
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, area, &mut state);

    let rows = area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let visible = usize::from(rows.height);
    let listed = view.rows.len().saturating_sub(state.offset()).min(visible);
    (
        Rect {
            height: listed as u16,
            ..rows
        },
        state.offset(),
    )
}

fn draw_now_playing(frame: &mut Frame, area: Rect, view: &NowPlayingView, colors: &Palette) {
    if !is_drawable(area) {
        return;
    }
    let title = if view.title.is_empty() {
        "-"
    } else {
        view.title.as_str()
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", view.transport.glyph()),
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(title, Style::default().fg(colors.text)),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(view.time.as_str(), Style::default().fg(colors.alert)),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(view.status.label(), Style::default().fg(colors.muted)),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(panel_block(
            "Now Playing",
            colors.panel_bg,
            colors.text,
            colors.border,
        )),
        area,
    );
}

fn draw_seekbar(frame: &mut Frame, area: Rect, view: &NowPlayingView, colors: &Palette) -> Rect {
    if !is_drawable(area) {
        return Rect::default();
    }
    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let bar = progress_bar(view.progress, usize::from(inner.width));
    frame.render_widget(
        Paragraph::new(Span::styled(bar, Style::default().fg(colors.accent))).block(
            panel_block("Seek", colors.panel_bg, colors.text, colors.border),
        ),
        area,
    );
    inner
}

fn draw_footer(frame: &mut Frame, area: Rect, chrome: &Chrome<'_>, colors: &Palette) {
    if !is_drawable(area) {
        return;
    }
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            concat!(
                "Space play/pause, n next, b previous, \u{2190}/\u{2192} seek, ",
                "Enter play row, 1-9/Tab playlist, q quit"
            ),
            Style::default().fg(colors.muted),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(chrome.message, Style::default().fg(colors.text)),
    ]))
    .block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(footer, area);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

/// Seekbar with the knob (`●`) at `ratio` of the width.
fn progress_bar(ratio: f64, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let clamped = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let knob = (clamped * (width - 1) as f64).round() as usize;
    let mut bar = String::with_capacity(width * 3);
    bar.push_str(&"━".repeat(knob));
    bar.push('●');
    bar.push_str(&"─".repeat(width - 1 - knob));
    bar
}
