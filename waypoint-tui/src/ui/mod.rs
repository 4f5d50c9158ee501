//! UI rendering
//!
//! Render functions read the session and the front-end state and draw; they
//! never change either. Screens are drawn from the scene, so whatever the
//! orchestrator is animating shows up on the next frame.

pub mod board;
mod screens;

use libwaypoint::transition::{anchors, ElementId, Visual};
use libwaypoint::{DotState, ScreenId, Session};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};
use tui_textarea::TextArea;

use crate::app::TuiState;
use board::BoardGeometry;

/// Surfaces fainter than this are not drawn
const VISIBLE: f64 = 0.1;

/// Header, main area and status bar
fn chunks(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress
            Constraint::Min(5),    // Screens
            Constraint::Length(3), // Status bar
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

/// Where the placement board lands for a terminal of `viewport` size
pub fn board_geometry(viewport: Rect, board_width: f64, board_height: f64) -> BoardGeometry {
    let (_, main, _) = chunks(viewport);
    let inner = Block::default().borders(Borders::ALL).inner(main);
    BoardGeometry::new(inner, board_width, board_height)
}

/// Render the whole frame
pub fn render(frame: &mut Frame, state: &TuiState, session: &Session, textarea: &TextArea) {
    let area = frame.area();
    let (header, main, status) = chunks(area);

    render_progress(frame, header, state, session);

    let scene = session.scene();
    for screen in scene.active_surfaces() {
        let Some(surface) = scene.surface(screen) else {
            continue;
        };
        let Some(slot) = slide(main, &surface.visual) else {
            continue;
        };
        frame.render_widget(Clear, slot);
        screens::render(frame, slot, screen, &surface.visual, state, session, textarea);
    }

    render_flash(frame, main, session);
    render_status_bar(frame, status, state, session);

    if state.help_visible {
        render_help_overlay(frame, area);
    }

    if let Some(ref error) = state.error {
        render_error_overlay(frame, area, error);
    }
}

/// Part of `area` a surface covers after its horizontal and vertical slide.
/// Offsets are percentages of the area.
fn slide(area: Rect, visual: &Visual) -> Option<Rect> {
    if visual.opacity < VISIBLE {
        return None;
    }
    let dx = (visual.x / 100.0 * f64::from(area.width)).round() as i32;
    let dy = (visual.y / 100.0 * f64::from(area.height)).round() as i32;

    let clip = |start: u16, len: u16, offset: i32| -> Option<(u16, u16)> {
        let (start, end) = (i32::from(start), i32::from(start) + i32::from(len));
        let lo = start.max(start + offset);
        let hi = end.min(end + offset);
        (hi > lo).then(|| (lo as u16, (hi - lo) as u16))
    };

    let (x, width) = clip(area.x, area.width, dx)?;
    let (y, height) = clip(area.y, area.height, dy)?;
    Some(Rect::new(x, y, width, height))
}

/// Style for an element at `opacity`, or `None` when it should not be drawn
pub(crate) fn fade(style: Style, opacity: f64) -> Option<Style> {
    if opacity < VISIBLE {
        None
    } else if opacity < 1.0 {
        Some(style.add_modifier(Modifier::DIM))
    } else {
        Some(style)
    }
}

fn render_progress(frame: &mut Frame, area: Rect, state: &TuiState, session: &Session) {
    let progress = session.progress();
    let colors = state.config.colors_enabled;

    let dots: Vec<Span> = progress
        .dots
        .iter()
        .flat_map(|dot| {
            let (symbol, color) = match (dot, state.config.unicode_enabled) {
                (DotState::Completed, true) => ("●", Color::Green),
                (DotState::Active, true) => ("◉", Color::Cyan),
                (DotState::Pending, true) => ("○", Color::DarkGray),
                (DotState::Completed, false) => ("[x]", Color::Green),
                (DotState::Active, false) => ("[>]", Color::Cyan),
                (DotState::Pending, false) => ("[ ]", Color::DarkGray),
            };
            let style = if colors {
                Style::default().fg(color)
            } else {
                Style::default()
            };
            [Span::styled(symbol, style), Span::raw(" ")]
        })
        .collect();

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(dots).alignment(Alignment::Right))
                .title(" Waypoint "),
        )
        .gauge_style(if colors {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        })
        .percent(progress.percent.min(100) as u16);

    frame.render_widget(gauge, area);
}

fn render_flash(frame: &mut Frame, area: Rect, session: &Session) {
    let opacity = session
        .scene()
        .element(&ElementId::from(anchors::FLASH_OVERLAY))
        .map(|e| e.visual.opacity)
        .unwrap_or(0.0);
    if opacity > 0.3 {
        frame.render_widget(Clear, area);
        frame.render_widget(Block::default().style(Style::default().bg(Color::White)), area);
    }
}

fn hint(screen: ScreenId) -> &'static str {
    match screen {
        ScreenId::Intro => "Enter: Begin | F1: Help | q: Quit",
        ScreenId::Scan => "Hold Space or the left button on the sensor | q: Quit",
        ScreenId::Answer => "Type your answer, Enter to submit | Esc: Quit",
        ScreenId::Placement => "Drag tokens onto the target | Enter: Continue | r: Reset",
        ScreenId::Capture => "c: Allow camera | Enter: Capture | q: Quit",
        ScreenId::Success => "Enter: Start over | q: Quit",
    }
}

/// Render status bar with the last message and the keys for this screen
fn render_status_bar(frame: &mut Frame, area: Rect, state: &TuiState, session: &Session) {
    let id = session.id().simple().to_string();
    let short_id = id.get(..8).unwrap_or(&id);

    let mut spans = vec![Span::styled(
        format!("#{}", short_id),
        Style::default().fg(Color::DarkGray),
    )];
    if let Some(ref message) = state.status.message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            message.clone(),
            if state.config.colors_enabled {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            },
        ));
    }
    spans.push(Span::raw(" | "));
    spans.push(Span::styled(hint(state.screen), Style::default().fg(Color::Gray)));

    let status = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Global:"),
        Line::from("  q        - Quit (outside the answer field)"),
        Line::from("  F1       - Toggle help"),
        Line::from("  Ctrl+R   - Start over"),
        Line::from("  Esc      - Dismiss overlays / quit"),
        Line::from(""),
        Line::from("Stages:"),
        Line::from("  Space    - Hold the scan sensor"),
        Line::from("  Enter    - Submit / continue / capture"),
        Line::from("  Mouse    - Drag tokens on the board"),
        Line::from("  r        - Return unplaced tokens"),
        Line::from("  c        - Allow the camera"),
        Line::from(""),
        Line::from("Press Esc or F1 to close"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, popup_area);
    frame.render_widget(help, popup_area);
}

fn render_error_overlay(frame: &mut Frame, area: Rect, error: &str) {
    let popup_area = centered_rect(70, 30, area);

    let error_text = vec![
        Line::from(Span::styled(
            "Error",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(error),
        Line::from(""),
        Line::from("Press Esc to dismiss"),
    ];

    let error_widget = Paragraph::new(error_text)
        .block(
            Block::default()
                .title(" Error ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: false })
        .alignment(Alignment::Center);

    frame.render_widget(Clear, popup_area);
    frame.render_widget(error_widget, popup_area);
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting() -> Visual {
        Visual::default()
    }

    #[test]
    fn test_resting_surface_fills_area() {
        let area = Rect::new(0, 3, 80, 18);
        assert_eq!(slide(area, &resting()), Some(area));
    }

    #[test]
    fn test_half_slid_surface_is_clipped() {
        let area = Rect::new(0, 3, 80, 18);
        let visual = Visual {
            x: 50.0,
            ..resting()
        };
        assert_eq!(slide(area, &visual), Some(Rect::new(40, 3, 40, 18)));

        let visual = Visual {
            x: -25.0,
            ..resting()
        };
        assert_eq!(slide(area, &visual), Some(Rect::new(0, 3, 60, 18)));
    }

    #[test]
    fn test_offscreen_or_faded_surface_is_skipped() {
        let area = Rect::new(0, 3, 80, 18);
        let gone = Visual {
            x: 100.0,
            ..resting()
        };
        assert_eq!(slide(area, &gone), None);
        assert_eq!(slide(area, &Visual::hidden()), None);
    }

    #[test]
    fn test_fade_dims_partial_opacity() {
        assert_eq!(fade(Style::default(), 0.0), None);
        assert_eq!(
            fade(Style::default(), 0.5),
            Some(Style::default().add_modifier(Modifier::DIM))
        );
        assert_eq!(fade(Style::default(), 1.0), Some(Style::default()));
    }

    #[test]
    fn test_board_sits_inside_main_block() {
        let geometry = board_geometry(Rect::new(0, 0, 80, 24), 360.0, 560.0);
        assert_eq!(geometry.area, Rect::new(1, 4, 78, 16));
    }
}
