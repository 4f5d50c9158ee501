//! One renderer per screen

use libwaypoint::stage::answer::CORRECT;
use libwaypoint::stage::capture::DeviceStatus;
use libwaypoint::stage::device::FrameOrigin;
use libwaypoint::transition::{anchors, Element, ElementId, Scene, Visual};
use libwaypoint::{ScreenId, Session};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};
use tui_textarea::TextArea;

use super::{board, fade};
use crate::app::TuiState;

/// Shared look for one screen
struct Paint<'a> {
    scene: &'a Scene,
    colors: bool,
    unicode: bool,
}

impl<'a> Paint<'a> {
    fn element(&self, id: &str) -> Option<&'a Element> {
        self.scene.element(&ElementId::from(id))
    }

    fn text(&self, id: &str) -> &'a str {
        self.element(id).map(|e| e.text.as_str()).unwrap_or("")
    }

    fn fg(&self, color: Color) -> Style {
        if self.colors {
            Style::default().fg(color)
        } else {
            Style::default()
        }
    }

    /// A line for `id` styled by its current opacity, if it is visible
    fn line(&self, id: &str, text: impl Into<String>, style: Style) -> Option<Line<'static>> {
        let opacity = self.element(id).map(|e| e.visual.opacity).unwrap_or(1.0);
        fade(style, opacity).map(|style| Line::from(Span::styled(text.into(), style)))
    }

    fn glowing(&self, id: &str) -> bool {
        self.element(id).map(|e| e.visual.glow > 0.0).unwrap_or(false)
    }

    fn symbol(&self, unicode: &'static str, ascii: &'static str) -> &'static str {
        if self.unicode {
            unicode
        } else {
            ascii
        }
    }
}

pub(super) fn render(
    frame: &mut Frame,
    area: Rect,
    screen: ScreenId,
    surface: &Visual,
    state: &TuiState,
    session: &Session,
    textarea: &TextArea,
) {
    let paint = Paint {
        scene: session.scene(),
        colors: state.config.colors_enabled,
        unicode: state.config.unicode_enabled,
    };
    let block = Block::default()
        .title(format!(" {} ", title(screen)))
        .borders(Borders::ALL)
        .border_style(fade(paint.fg(Color::Blue), surface.opacity).unwrap_or_default());

    match screen {
        ScreenId::Intro => render_intro(frame, area, block, &paint),
        ScreenId::Scan => render_scan(frame, area, block, &paint, session),
        ScreenId::Answer => render_answer(frame, area, block, &paint, session, textarea),
        ScreenId::Placement => match session.placement() {
            Some(placement) => {
                board::render_board(frame, area, placement, paint.scene, paint.colors);
                if placement.is_revealing() {
                    render_banner(frame, area, placement.reveal_message(), &paint);
                }
            }
            None => frame.render_widget(block, area),
        },
        ScreenId::Capture => render_capture(frame, area, block, &paint, session),
        ScreenId::Success => render_success(frame, area, block, &paint),
    }
}

fn title(screen: ScreenId) -> &'static str {
    match screen {
        ScreenId::Intro => "Welcome",
        ScreenId::Scan => "1 Scan",
        ScreenId::Answer => "2 Answer",
        ScreenId::Placement => "3 Placement",
        ScreenId::Capture => "4 Capture",
        ScreenId::Success => "Complete",
    }
}

fn render_intro(frame: &mut Frame, area: Rect, block: Block, paint: &Paint) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let lines: Vec<Line> = [
        Line::from(""),
        Line::from(""),
    ]
    .into_iter()
    .chain(paint.line(
        anchors::INTRO_LOGO,
        paint.symbol("◆ ◇ ◆", "<>"),
        paint.fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
    .chain(paint.line(anchors::INTRO_TITLE, "W A Y P O I N T", bold))
    .chain(paint.line(
        anchors::INTRO_SUBTITLE,
        "Four checkpoints stand between you and the finish",
        paint.fg(Color::Gray),
    ))
    .chain([Line::from("")])
    .chain(paint.line(
        anchors::INTRO_START,
        "[ Press Enter to begin ]",
        paint.fg(Color::Green).add_modifier(Modifier::BOLD),
    ))
    .collect();

    let intro = Paragraph::new(lines).block(block).alignment(Alignment::Center);
    frame.render_widget(intro, area);
}

fn render_scan(frame: &mut Frame, area: Rect, block: Block, paint: &Paint, session: &Session) {
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Sensor
            Constraint::Length(3), // Hold gauge
            Constraint::Length(1), // Status
        ])
        .split(inner);

    let (progress, holding) = session
        .scan()
        .map(|scan| (scan.progress(), scan.is_holding()))
        .unwrap_or((0.0, false));

    let sensor_style = if paint.glowing(anchors::SCAN_SENSOR) || holding {
        paint.fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        paint.fg(Color::DarkGray)
    };
    let icon = paint.symbol("⌾", "(@)");
    let sensor = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(icon, sensor_style))])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(sensor_style)
                .title(" Sensor "),
        )
        .alignment(Alignment::Center);
    frame.render_widget(sensor, super::centered_rect(40, 100, chunks[0]));

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(paint.fg(Color::Cyan))
        .ratio(progress.clamp(0.0, 1.0));
    frame.render_widget(gauge, chunks[1]);

    let status = Paragraph::new(paint.text(anchors::SCAN_STATUS).to_string())
        .alignment(Alignment::Center)
        .style(paint.fg(Color::Yellow));
    frame.render_widget(status, chunks[2]);
}

fn render_answer(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    paint: &Paint,
    session: &Session,
    textarea: &TextArea,
) {
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(2),    // Question
            Constraint::Length(3), // Input
            Constraint::Length(1), // Feedback
            Constraint::Length(1), // Attempts
        ])
        .split(inner);

    let question = Paragraph::new(paint.text(anchors::ANSWER_QUESTION).to_string())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true });
    frame.render_widget(question, chunks[0]);

    // Shake offsets are in board units; a few per column
    let shake = paint
        .element(anchors::ANSWER_INPUT)
        .map(|e| (e.visual.x / 5.0).round() as i32)
        .unwrap_or(0);
    let field = chunks[1];
    let x = (i32::from(field.x) + shake).clamp(i32::from(inner.x), i32::from(inner.x) + 2) as u16;
    let field = Rect::new(x, field.y, field.width.saturating_sub(2), field.height);
    frame.render_widget(textarea, field);

    let feedback = paint.text(anchors::ANSWER_FEEDBACK);
    let color = if feedback == CORRECT {
        Color::Green
    } else {
        Color::Red
    };
    frame.render_widget(
        Paragraph::new(feedback.to_string()).style(paint.fg(color).add_modifier(Modifier::BOLD)),
        chunks[2],
    );

    let attempts = session.answer().map(|a| a.attempts()).unwrap_or(0);
    if attempts > 0 {
        frame.render_widget(
            Paragraph::new(format!("Attempts: {}", attempts)).style(paint.fg(Color::DarkGray)),
            chunks[3],
        );
    }
}

fn render_capture(frame: &mut Frame, area: Rect, block: Block, paint: &Paint, session: &Session) {
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(inner);

    let Some(capture) = session.capture() else {
        return;
    };

    let (frame_color, frame_title) = match capture.device_status() {
        DeviceStatus::Prompt => (Color::DarkGray, " Viewfinder "),
        DeviceStatus::Requesting => (Color::Yellow, " Connecting "),
        DeviceStatus::Live => (Color::Green, " Live "),
        DeviceStatus::Fallback => (Color::Red, " Offline "),
    };
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            paint.text(anchors::CAPTURE_STATUS).to_string(),
            paint.fg(frame_color).add_modifier(Modifier::BOLD),
        )),
    ];
    if let Some(reason) = capture.fallback_reason() {
        lines.push(Line::from(Span::styled(reason.to_string(), paint.fg(Color::DarkGray))));
    }
    if let Some(still) = capture.still() {
        let origin = match still.origin {
            FrameOrigin::Live => "live",
            FrameOrigin::Fallback => "fallback",
        };
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "Still {}x{} ({}) at {}",
            still.width,
            still.height,
            origin,
            still.captured_at.format("%H:%M:%S")
        )));
    }
    let viewfinder = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(paint.fg(frame_color))
                .title(frame_title),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(viewfinder, chunks[0]);

    let hud_lines = match capture.hud() {
        Some(hud) => vec![
            Line::from(vec![
                Span::raw("STATUS  "),
                Span::styled(hud.status, paint.fg(Color::Cyan)),
            ]),
            Line::from(format!("TIME    {}", hud.clock)),
            Line::from(format!("CONF    {}%", hud.confidence)),
            Line::from(format!("MATRIX  {}", hud.matrix)),
            Line::from(format!("RANGE   {}cm", hud.range_cm)),
            Line::from(format!("LIGHT   {}%", hud.light)),
        ],
        None => vec![Line::from(Span::styled("HUD offline", paint.fg(Color::DarkGray)))],
    };
    let hud =
        Paragraph::new(hud_lines).block(Block::default().borders(Borders::ALL).title(" HUD "));
    frame.render_widget(hud, chunks[1]);
}

fn render_success(frame: &mut Frame, area: Rect, block: Block, paint: &Paint) {
    let lines: Vec<Line> = [Line::from(""), Line::from("")]
        .into_iter()
        .chain(paint.line(
            anchors::SUCCESS_CHECKMARK,
            paint.symbol("✔", "[OK]"),
            paint.fg(Color::Green).add_modifier(Modifier::BOLD),
        ))
        .chain([Line::from("")])
        .chain(paint.line(
            anchors::SUCCESS_MESSAGE,
            "All four checkpoints cleared",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .chain([
            Line::from(""),
            Line::from(Span::styled("Press Enter to start over", paint.fg(Color::Gray))),
        ])
        .collect();

    let success = Paragraph::new(lines).block(block).alignment(Alignment::Center);
    frame.render_widget(success, area);
}

/// Banner across the middle of `area`
fn render_banner(frame: &mut Frame, area: Rect, message: &str, paint: &Paint) {
    let banner_area = super::centered_rect(70, 30, area);
    let banner = Paragraph::new(vec![
        Line::from(Span::styled(
            message.to_string(),
            paint.fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press Enter to continue"),
    ])
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    frame.render_widget(ratatui::widgets::Clear, banner_area);
    frame.render_widget(banner, banner_area);
}
