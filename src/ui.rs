use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use std::time::SystemTime;
use time_humanize::HumanTime;

use crate::metrics::MetricsSnapshot;
use crate::results::{analysis_text, recommendations, SessionResult};
use crate::session::Phase;
use crate::stimulus::{PlayArea, Position, StimulusKind};
use crate::App;

const TARGET_SYMBOL: &str = "●";
const DISTRACTOR_SYMBOL: &str = "◆";
const FIXATION_SYMBOL: &str = "+";

/// Map a terminal cell inside `inner` onto the logical play area.
/// Returns None for cells outside the rect (border clicks, status bars).
pub fn cell_to_logical(inner: Rect, play: PlayArea, column: u16, row: u16) -> Option<Position> {
    if inner.width == 0 || inner.height == 0 {
        return None;
    }
    if column < inner.x
        || column >= inner.x + inner.width
        || row < inner.y
        || row >= inner.y + inner.height
    {
        return None;
    }
    let x = (column - inner.x) as f64 + 0.5;
    let y = (row - inner.y) as f64 + 0.5;
    Some(Position {
        x: x / inner.width as f64 * play.width,
        y: y / inner.height as f64 * play.height,
    })
}

/// Map a logical position back to a terminal cell inside `inner`.
pub fn logical_to_cell(inner: Rect, play: PlayArea, pos: Position) -> (u16, u16) {
    let col = (pos.x / play.width * inner.width as f64) as u16;
    let row = (pos.y / play.height * inner.height as f64) as u16;
    (
        inner.x + col.min(inner.width.saturating_sub(1)),
        inner.y + row.min(inner.height.saturating_sub(1)),
    )
}

/// Inner rect of the play-area block for the current frame size; taps are
/// hit-tested against this same rect so render and input agree.
pub fn play_area_rect(frame_area: Rect) -> Rect {
    let chunks = game_layout(frame_area);
    Block::default().borders(Borders::ALL).inner(chunks[1])
}

fn game_layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // stats bar
            Constraint::Min(8),    // play area
            Constraint::Length(1), // live metrics
            Constraint::Length(1), // key hints
        ])
        .split(area)
}

fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn render_game(app: &App, f: &mut Frame, elapsed_secs: u64) {
    let chunks = game_layout(f.area());
    let session = &app.session;
    let metrics = session.metrics();

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let stats = Line::from(vec![
        Span::styled(format!(" score {}", session.score), bold.fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(format!("streak {}", session.streak), bold.fg(Color::Green)),
        Span::raw("  "),
        Span::styled(format!("level {}", session.pacing.level), bold.fg(Color::Cyan)),
        Span::raw("  "),
        Span::raw(format_clock(elapsed_secs)),
    ]);
    f.render_widget(Paragraph::new(stats), chunks[0]);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("fokus - tap the circles, leave the diamonds");
    let inner = block.inner(chunks[1]);
    f.render_widget(block, chunks[1]);

    match session.phase {
        Phase::NotStarted => {
            let hint = Paragraph::new(Span::styled(
                "click anywhere or press space to begin",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center);
            f.render_widget(hint, centered_line(inner));
        }
        Phase::Paused => render_pause_panel(f, inner, &metrics),
        _ => {
            // Fixation marker at the center of the exclusion zone.
            let (cx, cy) = logical_to_cell(
                inner,
                session.play_area(),
                Position {
                    x: session.play_area().width / 2.0,
                    y: session.play_area().height / 2.0,
                },
            );
            draw_symbol(f, cx, cy, FIXATION_SYMBOL, Style::default().add_modifier(Modifier::DIM));

            for stimulus in &session.active {
                let (col, row) = logical_to_cell(inner, session.play_area(), stimulus.position);
                let (symbol, style) = match stimulus.kind {
                    StimulusKind::Target => (TARGET_SYMBOL, bold.fg(Color::Green)),
                    StimulusKind::Distractor => (DISTRACTOR_SYMBOL, bold.fg(Color::Red)),
                };
                draw_symbol(f, col, row, symbol, style);
            }
        }
    }

    if app.config.show_live_metrics {
        let live = Line::from(vec![
            Span::raw(format!(
                " accuracy {:.0}%  reaction {:.0}ms  attention {:.0}  impulse {}",
                metrics.accuracy,
                metrics.mean_reaction_ms,
                metrics.attention_score,
                metrics.impulse_control,
            )),
        ]);
        f.render_widget(
            Paragraph::new(live).style(Style::default().add_modifier(Modifier::DIM)),
            chunks[2],
        );
    }

    let hints = match session.phase {
        Phase::Running => " space pause | q stop | esc quit",
        Phase::Paused => " space resume | q stop | esc quit",
        _ => " space start | esc quit",
    };
    f.render_widget(
        Paragraph::new(hints).style(Style::default().add_modifier(Modifier::DIM)),
        chunks[3],
    );
}

fn centered_line(inner: Rect) -> Rect {
    Rect {
        x: inner.x,
        y: inner.y + inner.height / 2,
        width: inner.width,
        height: 1,
    }
}

fn draw_symbol(f: &mut Frame, col: u16, row: u16, symbol: &str, style: Style) {
    let cell = Rect {
        x: col,
        y: row,
        width: 1,
        height: 1,
    };
    f.render_widget(Paragraph::new(symbol).style(style), cell);
}

fn render_pause_panel(f: &mut Frame, inner: Rect, metrics: &MetricsSnapshot) {
    let lines = vec![
        Line::from(Span::styled(
            "PAUSED",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("{:.0}% accuracy", metrics.accuracy)),
        Line::from(format!("{} attention", metrics.attention_level)),
    ];
    let panel = Paragraph::new(lines).alignment(Alignment::Center);
    let rect = Rect {
        x: inner.x,
        y: inner.y + inner.height.saturating_sub(4) / 2,
        width: inner.width,
        height: 4.min(inner.height),
    };
    f.render_widget(panel, rect);
}

pub fn render_results(app: &App, f: &mut Frame) {
    let session = &app.session;
    let metrics = session.metrics();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(9),  // headline numbers
            Constraint::Length(4),  // analysis
            Constraint::Min(5),     // recommendations
            Constraint::Length(1),  // hints
        ])
        .split(f.area());

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let headline = vec![
        Line::from(Span::styled("Assessment complete", bold)),
        Line::from(""),
        Line::from(format!("attention   {}", metrics.attention_level)),
        Line::from(format!("risk        {} (not a diagnosis)", metrics.risk_level)),
        Line::from(format!(
            "hits {}   missed {}   false alarms {}",
            session.correct_hits, session.missed_targets, session.false_alarms
        )),
        Line::from(format!(
            "accuracy {:.0}%   mean reaction {:.0}ms",
            metrics.accuracy, metrics.mean_reaction_ms
        )),
        Line::from(format!(
            "score {}   max streak {}",
            session.score, session.max_streak
        )),
    ];
    f.render_widget(Paragraph::new(headline), chunks[0]);

    f.render_widget(
        Paragraph::new(analysis_text(&metrics)).wrap(Wrap { trim: true }),
        chunks[1],
    );

    let mut rec_lines = vec![Line::from(Span::styled("Recommendations", bold))];
    for rec in recommendations(metrics.risk_level) {
        rec_lines.push(Line::from(format!(" - {}", rec)));
    }
    f.render_widget(Paragraph::new(rec_lines), chunks[2]);

    let hints = match &app.status {
        Some(status) => format!(" {} | r retry | h history | esc quit", status),
        None => " r retry | s save | t tweet | h history | esc quit".to_string(),
    };
    f.render_widget(
        Paragraph::new(hints).style(Style::default().add_modifier(Modifier::DIM)),
        chunks[3],
    );
}

pub fn render_history(f: &mut Frame, history: &[SessionResult], status: Option<&str>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new("Past assessments")
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let rows: Vec<Row> = history
        .iter()
        .sorted_by(|a, b| b.timestamp.cmp(&a.timestamp))
        .map(|r| {
            Row::new(vec![
                Cell::from(HumanTime::from(SystemTime::from(r.timestamp)).to_string()),
                Cell::from(r.score.to_string()),
                Cell::from(format!("{:.0}%", r.accuracy)),
                Cell::from(r.attention_level.to_string()),
                Cell::from(r.risk_level.to_string()),
                Cell::from(format!("{:.0}s", r.duration_secs)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(18),
            Constraint::Length(14),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["when", "score", "accuracy", "attention", "risk", "length"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(table, chunks[1]);

    let footer = status.unwrap_or(" b back | esc quit");
    f.render_widget(
        Paragraph::new(footer).style(Style::default().add_modifier(Modifier::DIM)),
        chunks[2],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner() -> Rect {
        Rect {
            x: 1,
            y: 2,
            width: 80,
            height: 30,
        }
    }

    #[test]
    fn cell_mapping_roundtrips_within_one_cell() {
        let play = PlayArea::default();
        let pos = cell_to_logical(inner(), play, 40, 15).unwrap();
        let (col, row) = logical_to_cell(inner(), play, pos);
        assert_eq!((col, row), (40, 15));
    }

    #[test]
    fn cells_outside_rect_are_rejected() {
        let play = PlayArea::default();
        assert!(cell_to_logical(inner(), play, 0, 5).is_none());
        assert!(cell_to_logical(inner(), play, 81, 5).is_none());
        assert!(cell_to_logical(inner(), play, 40, 1).is_none());
        assert!(cell_to_logical(inner(), play, 40, 32).is_none());
    }

    #[test]
    fn degenerate_rect_maps_nothing() {
        let play = PlayArea::default();
        let empty = Rect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
        assert!(cell_to_logical(empty, play, 0, 0).is_none());
    }

    #[test]
    fn logical_extremes_stay_inside_rect() {
        let play = PlayArea::default();
        let r = inner();
        let (col, row) = logical_to_cell(
            r,
            play,
            Position {
                x: play.width,
                y: play.height,
            },
        );
        assert!(col < r.x + r.width);
        assert!(row < r.y + r.height);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(300), "5:00");
    }
}
