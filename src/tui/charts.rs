use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::canvas::{Canvas, Circle, Line as CanvasLine},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

use super::state::UiState;
use crate::model::GaugeReading;

const GAUGE_RADIUS: f64 = 40.0;

/// Color band for a probability, green to red.
pub fn gauge_color(gauge: &GaugeReading) -> Color {
    match gauge.percent {
        i64::MIN..=29 => Color::Green,
        30..=59 => Color::Yellow,
        _ => Color::Red,
    }
}

/// Canvas points along the gauge arc, starting at twelve o'clock and running
/// clockwise for `angle_deg` degrees.
pub fn arc_points(angle_deg: u16, radius: f64) -> Vec<(f64, f64)> {
    (0..=angle_deg.min(360))
        .step_by(3)
        .chain(std::iter::once(angle_deg.min(360)))
        .map(|deg| {
            let rad = (90.0 - f64::from(deg)).to_radians();
            (radius * rad.cos(), radius * rad.sin())
        })
        .collect()
}

/// Radial probability gauge with the percentage in the middle.
pub fn draw_gauge(area: Rect, f: &mut Frame, gauge: &GaugeReading) {
    let color = gauge_color(gauge);
    let points = arc_points(gauge.angle_deg, GAUGE_RADIUS);
    let label = format!("{}%", gauge.percent);

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Probability"))
        .x_bounds([-50.0, 50.0])
        .y_bounds([-50.0, 50.0])
        .paint(move |ctx| {
            ctx.draw(&Circle {
                x: 0.0,
                y: 0.0,
                radius: GAUGE_RADIUS,
                color: Color::DarkGray,
            });
            if gauge.angle_deg > 0 {
                for pair in points.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: pair[0].0,
                        y1: pair[0].1,
                        x2: pair[1].0,
                        y2: pair[1].1,
                        color,
                    });
                }
            }
            ctx.layer();
            ctx.print(
                -(label.len() as f64) * 2.0,
                0.0,
                Span::styled(
                    label.clone(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            );
        });
    f.render_widget(canvas, area);
}

pub fn draw_recommendations(area: Rect, f: &mut Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    if state.recommendations.is_empty() {
        lines.push(Line::from(Span::styled(
            "No recommended measures.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (i, rec) in state.recommendations.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(Color::Gray)),
            Span::styled(
                rec.measure.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ]));
        if !rec.reason.is_empty() {
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(rec.reason.clone(), Style::default().fg(Color::Gray)),
            ]));
        }
    }
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Recommended measures"));
    f.render_widget(p, area);
}

/// Number of filled cells for a bar at `percent` on a track of `track` cells.
pub fn bar_cells(percent: f64, track: u16) -> usize {
    ((percent.clamp(0.0, 100.0) / 100.0) * f64::from(track)).round() as usize
}

/// Similar-case frequency bars, animated by each bar's tween.
pub fn draw_similar_bars(area: Rect, f: &mut Frame, state: &UiState, now: Instant) {
    let label_width = state
        .bars
        .iter()
        .map(|b| b.case.measure.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);
    // borders, label, gap, percentage
    let track = area
        .width
        .saturating_sub(2 + label_width as u16 + 2 + 6)
        .max(1);

    let mut lines: Vec<Line> = Vec::new();
    if state.bars.is_empty() {
        lines.push(Line::from(Span::styled(
            "No similar cases.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for bar in &state.bars {
        let current = bar.tween.value_at(now);
        let filled = bar_cells(current, track);
        let label: String = bar.case.measure.chars().take(label_width).collect();
        lines.push(Line::from(vec![
            Span::styled(
                format!("{label:<label_width$}  "),
                Style::default().fg(Color::Gray),
            ),
            Span::styled("█".repeat(filled), Style::default().fg(Color::Magenta)),
            Span::styled(
                "·".repeat(usize::from(track).saturating_sub(filled)),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(format!(" {:>3}%", bar.tween.target() as u16)),
        ]));
    }
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Similar cases"));
    f.render_widget(p, area);
}

pub fn draw_labels(area: Rect, f: &mut Frame, state: &UiState) {
    let lines: Vec<Line> = state
        .labels
        .iter()
        .map(|l| {
            Line::from(vec![
                Span::styled(format!("{:<16}", l.id), Style::default().fg(Color::Gray)),
                Span::raw(format!("{:.3}", l.score)),
            ])
        })
        .collect();
    let p = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL).title("Model labels"));
    f.render_widget(p, area);
}
