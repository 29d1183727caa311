use std::collections::HashMap;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, List, ListItem, ListState, Padding, Paragraph, Row,
    Table, TableState, Wrap,
};

use super::super::episode::{episode_code, find_episode, format_timestamp_display, truncate};
use super::super::history::WatchHistoryEntry;
use super::super::playback::MediaKind;
use super::actions::picker_options;
use super::{DetailsKey, DetailsState, PendingDelete, PendingNotice, PickerKind, WatchView};

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);

pub(super) fn draw_library(
    frame: &mut Frame,
    items: &[WatchHistoryEntry],
    table_state: &mut TableState,
    status: &str,
    pending_delete: Option<&PendingDelete>,
    pending_notice: Option<&PendingNotice>,
    details_by_key: &HashMap<DetailsKey, DetailsState>,
) {
    let chunks = screen_chunks(frame);

    let selected_text = table_state
        .selected()
        .map(|i| (i + 1).to_string())
        .unwrap_or_else(|| "-".to_string());
    let header = header_line(vec![
        Span::styled(
            format!("{} entries", items.len()),
            Style::default().fg(MUTED),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("selected {selected_text}"),
            Style::default().fg(MUTED),
        ),
    ]);
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let rows: Vec<Row> = items
        .iter()
        .map(|item| {
            let title = details_by_key
                .get(&(item.kind, item.id.clone()))
                .and_then(DetailsState::details)
                .map(|details| details.title.clone())
                .unwrap_or_else(|| item.id.clone());
            Row::new(vec![
                Cell::from(item.kind.as_str()),
                Cell::from(title),
                Cell::from(episode_code(item.season, item.episode)),
                Cell::from(format_timestamp_display(&item.timestamp)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Percentage(50),
            Constraint::Length(8),
            Constraint::Length(17),
        ],
    )
    .header(
        Row::new(vec!["Type", "Title", "Episode", "Watched"])
            .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    )
    .block(panel_block("History"))
    .row_highlight_style(highlight_style())
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, body_chunks[0], table_state);

    let selection_text = match table_state.selected().and_then(|idx| items.get(idx)) {
        Some(item) => {
            let state = details_by_key.get(&(item.kind, item.id.clone()));
            format!(
                "{}\n\nType\n{}\n\nEpisode\n{}\n\nID\n{}\n\nWatched\n{}",
                details_text(state),
                item.kind,
                episode_code(item.season, item.episode),
                truncate(&item.id, 28),
                format_timestamp_display(&item.timestamp),
            )
        }
        None => "No watch history yet.\n\nRun `netprime watch ROUTE` to add entries.".to_string(),
    };
    let selection = Paragraph::new(selection_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .wrap(Wrap { trim: true })
        .block(panel_block("Selected"));
    frame.render_widget(selection, body_chunks[1]);

    let controls = Paragraph::new(Line::from(Span::styled(
        "↑/↓ move  Enter open  d delete  q quit",
        Style::default().fg(MUTED),
    )))
    .alignment(Alignment::Center)
    .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);
    render_status(frame, status, chunks[3]);

    if let Some(confirm) = pending_delete {
        let popup_text = format!(
            "Delete history entry?\n\n{}\n\nThis cannot be undone.\n\n[y / Enter] Delete   [n / Esc] Cancel",
            truncate(&confirm.label, 56)
        );
        render_popup(frame, "Confirm Delete", &popup_text);
    } else if let Some(notice) = pending_notice {
        render_popup(frame, notice.title, &notice.message);
    }
}

pub(super) fn draw_watch(
    frame: &mut Frame,
    view: &WatchView,
    status: &str,
    pending_notice: Option<&PendingNotice>,
    details: Option<&DetailsState>,
) {
    let chunks = screen_chunks(frame);
    let session = &view.session;
    let target = session.target();
    let selection = session.selection();

    let title = details
        .and_then(DetailsState::details)
        .map(|details| details.title.as_str())
        .unwrap_or(target.id.as_str());
    let auto_next = if session.auto_next() { "auto-next on" } else { "auto-next off" };
    let header = header_line(vec![
        Span::styled(truncate(title, 40), Style::default().fg(Color::White)),
        Span::styled("   ", Style::default()),
        Span::styled(
            episode_code(target.season, target.episode),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(auto_next, Style::default().fg(MUTED)),
    ]);
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let provider = session.current_provider();
    let source_text = format!(
        "Source {} of {}\n{}\n\n{}",
        selection.selected() + 1,
        selection.count(),
        provider.name,
        provider.url
    );
    let source = Paragraph::new(source_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .wrap(Wrap { trim: false })
        .block(panel_block("Now Playing"));
    frame.render_widget(source, body_chunks[0]);

    let mut info = details_text(details);
    let seasons = details.map(DetailsState::seasons).unwrap_or_default();
    if target.kind == MediaKind::Tv
        && let (Some(season), Some(episode)) = (target.season, target.episode)
        && let Some(ep) = find_episode(seasons, season, episode)
    {
        let season_name = seasons
            .iter()
            .find(|s| s.season_number == season)
            .map(|s| s.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("Season");
        info.push_str(&format!(
            "\n\n{season_name} · Episode {}: {}",
            ep.number, ep.name
        ));
        if !ep.overview.is_empty() {
            info.push_str(&format!("\n{}", truncate(&ep.overview, 280)));
        }
        if let Some(still) = &ep.still_url {
            info.push_str(&format!("\nStill: {still}"));
        }
    }
    let info = Paragraph::new(info)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .wrap(Wrap { trim: true })
        .block(panel_block("Details"));
    frame.render_widget(info, body_chunks[1]);

    let controls_text = match target.kind {
        MediaKind::Movie => "Enter play  p source  f source failed  Esc back",
        MediaKind::Tv => {
            "Enter play  p source  f failed  s season  l episodes  n/b next/prev  a auto-next  e finished  Esc back"
        }
        MediaKind::Anime => {
            "Enter play  p source  f failed  n/b next/prev  a auto-next  e finished  Esc back"
        }
    };
    let controls = Paragraph::new(Line::from(Span::styled(
        controls_text,
        Style::default().fg(MUTED),
    )))
    .alignment(Alignment::Center)
    .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);
    render_status(frame, status, chunks[3]);

    if selection.dropdown_open() {
        render_dropdown(frame, view, body_chunks[0]);
    } else if let Some(picker) = view.picker {
        let options = picker_options(view, picker.kind, seasons);
        let title = match picker.kind {
            PickerKind::Season => "Select Season",
            PickerKind::Episode => "Select Episode",
        };
        let labels = options
            .iter()
            .map(|option| (option.label.clone(), option.current))
            .collect();
        render_list_popup(frame, title, labels, picker.cursor, body_chunks[1]);
    } else if let Some(notice) = pending_notice {
        render_popup(frame, notice.title, &notice.message);
    }
}

fn render_dropdown(frame: &mut Frame, view: &WatchView, anchor: Rect) {
    let selected = view.session.selection().selected();
    let labels = view
        .session
        .providers()
        .iter()
        .enumerate()
        .map(|(idx, provider)| (provider.name.to_string(), idx == selected))
        .collect();
    render_list_popup(frame, "Select Source", labels, view.dropdown_cursor, anchor);
}

/// `labels` pairs each row with whether it is the active choice.
fn render_list_popup(
    frame: &mut Frame,
    title: &'static str,
    labels: Vec<(String, bool)>,
    cursor: usize,
    anchor: Rect,
) {
    let height = (labels.len() as u16 + 2).min(anchor.height.max(3));
    let items: Vec<ListItem> = labels
        .into_iter()
        .map(|(label, active)| {
            let marker = if active { "● " } else { "  " };
            ListItem::new(format!("{marker}{label}"))
        })
        .collect();

    let area = Rect::new(anchor.x + 1, anchor.y + 1, anchor.width.saturating_sub(2), height)
        .intersection(frame.area());
    render_popup_shadow(frame, area);
    frame.render_widget(Clear, area);

    let list = List::new(items)
        .block(modal_block(title).padding(Padding::ZERO))
        .highlight_style(highlight_style())
        .highlight_symbol("▸ ");
    let mut state = ListState::default();
    state.select(Some(cursor));
    frame.render_stateful_widget(list, area, &mut state);
}

fn details_text(state: Option<&DetailsState>) -> String {
    match state {
        Some(DetailsState::Ready(Some(details))) => {
            let year = details
                .year
                .as_deref()
                .map(|year| format!(" ({year})"))
                .unwrap_or_default();
            let overview = if details.overview.is_empty() {
                "No overview.".to_string()
            } else {
                truncate(&details.overview, 320)
            };
            let mut facts = Vec::new();
            if let Some(minutes) = details.runtime_minutes {
                facts.push(format!("{minutes} min"));
            }
            if let Some(rating) = &details.rating {
                facts.push(format!("★ {rating}"));
            }
            let mut text = format!("{}{year}", details.title);
            if !facts.is_empty() {
                text.push_str(&format!("\n{}", facts.join("  ")));
            }
            text.push_str(&format!("\n\n{overview}"));
            if !details.related.is_empty() {
                text.push_str(&format!("\n\nMore like this\n{}", details.related.join(", ")));
            }
            text
        }
        Some(DetailsState::Ready(None)) => "No metadata for this title.".to_string(),
        Some(DetailsState::Loading) | None => "Loading details...".to_string(),
        Some(DetailsState::Failed(err)) => format!("Details unavailable: {}", truncate(err, 120)),
        Some(DetailsState::Unavailable) => {
            "Set NETPRIME_TMDB_KEY to load title details.".to_string()
        }
    }
}

fn screen_chunks(frame: &mut Frame) -> std::rc::Rc<[Rect]> {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area())
}

fn header_line(extra: Vec<Span<'static>>) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled(
            "NETPRIME",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
    ];
    spans.extend(extra);
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel_block("Dashboard"))
}

fn render_status(frame: &mut Frame, status: &str, area: Rect) {
    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, area);
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

fn highlight_style() -> Style {
    Style::default()
        .bg(ACCENT)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}

fn render_popup(frame: &mut Frame, title: &'static str, text: &str) {
    let popup_area = popup_rect_for_text(frame.area(), text);
    render_popup_shadow(frame, popup_area);
    frame.render_widget(Clear, popup_area);
    let popup = Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(modal_block(title));
    frame.render_widget(popup, popup_area);
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        (popup_area.x + 1).min(area.x + area.width.saturating_sub(1)),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width.saturating_sub(1),
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}

fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width.max(1));
    let clamped_height = height.min(area.height.max(1));
    let x = area.x + area.width.saturating_sub(clamped_width) / 2;
    let y = area.y + area.height.saturating_sub(clamped_height) / 2;
    Rect::new(x, y, clamped_width, clamped_height)
}

fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let max_line_width = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    let line_count = text.lines().count() as u16;

    let available_width = area.width.saturating_sub(2).max(1);
    let width = max_line_width
        .saturating_add(12)
        .clamp(40.min(available_width), 72.min(available_width));

    let available_height = area.height.saturating_sub(2).max(1);
    let height = line_count
        .saturating_add(6)
        .clamp(8.min(available_height), 18.min(available_height));

    centered_fixed_rect(width, height, area)
}
