//! Placement board
//!
//! The board is drawn on a ratatui canvas in board units. Tokens are drawn
//! where the scene currently has them, so snaps and returns animate.

use libwaypoint::config::{TOKEN_HEIGHT, TOKEN_WIDTH};
use libwaypoint::stage::{PlacementStage, Point};
use libwaypoint::transition::Scene;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{
        canvas::{Canvas, Circle, Rectangle},
        Block, Borders,
    },
    Frame,
};

/// Mapping between terminal cells and board units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    /// Cells the canvas draws into
    pub area: Rect,
    pub width: f64,
    pub height: f64,
}

impl BoardGeometry {
    pub fn new(area: Rect, width: f64, height: f64) -> Self {
        Self {
            area,
            width,
            height,
        }
    }

    /// Board point under a cell, if the cell is on the board
    pub fn to_board(&self, column: u16, row: u16) -> Option<Point> {
        let inside = column >= self.area.x
            && column < self.area.x + self.area.width
            && row >= self.area.y
            && row < self.area.y + self.area.height;
        inside.then(|| self.to_board_clamped(column, row))
    }

    /// Like [`to_board`](Self::to_board), pulling outside cells onto the edge
    pub fn to_board_clamped(&self, column: u16, row: u16) -> Point {
        if self.area.width == 0 || self.area.height == 0 {
            return Point::default();
        }
        let column = column.clamp(self.area.x, self.area.x + self.area.width - 1);
        let row = row.clamp(self.area.y, self.area.y + self.area.height - 1);
        let x = (f64::from(column - self.area.x) + 0.5) * self.width / f64::from(self.area.width);
        let y = (f64::from(row - self.area.y) + 0.5) * self.height / f64::from(self.area.height);
        Point::new(x, y)
    }
}

pub fn render_board(
    frame: &mut Frame,
    area: Rect,
    placement: &PlacementStage,
    scene: &Scene,
    colors: bool,
) {
    let (width, height) = placement.board();
    let target = placement.target();
    let snap = placement.snap_distance();
    let near = placement.is_near();
    let dragging = placement.dragging();
    let color = |c: Color| if colors { c } else { Color::Reset };

    let title = format!(" Placed {}/{} ", placement.placed_count(), placement.tokens().len());
    let canvas = Canvas::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(move |ctx| {
            ctx.draw(&Circle {
                x: target.x,
                y: height - target.y,
                radius: snap,
                color: color(if near { Color::Yellow } else { Color::Cyan }),
            });

            for token in placement.tokens() {
                let (x, y) = scene
                    .element(&token.element_id())
                    .map(|e| (e.visual.x, e.visual.y))
                    .unwrap_or((token.position.x, token.position.y));
                let tint = if token.placed {
                    Color::Green
                } else if dragging == Some(token.index) {
                    Color::Yellow
                } else {
                    Color::Magenta
                };
                ctx.draw(&Rectangle {
                    x,
                    y: height - y - TOKEN_HEIGHT,
                    width: TOKEN_WIDTH,
                    height: TOKEN_HEIGHT,
                    color: color(tint),
                });
                ctx.print(
                    x + TOKEN_WIDTH / 2.0,
                    height - y - TOKEN_HEIGHT / 2.0,
                    Line::styled((token.index + 1).to_string(), Style::default().fg(color(tint))),
                );
            }
        });

    frame.render_widget(canvas, area);
}
