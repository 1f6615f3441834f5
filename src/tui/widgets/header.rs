// Battle header widget: name, status, start time, round, timer.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::protocol::{Battle, BattleStatus};
use crate::tui::ViewState;

/// Render the battle header into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let view = &state.view;

    let mut lines = Vec::new();
    match (&view.battle, &view.battle_error) {
        (Some(battle), _) => {
            lines.push(Line::from(vec![
                Span::styled(
                    battle.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    status_label(battle.status),
                    Style::default().fg(status_color(battle.status)),
                ),
            ]));
            lines.push(Line::from(format!("Starts: {}", starts_at_display(battle))));
        }
        (None, Some(error)) => {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        (None, None) => {
            lines.push(Line::from(Span::styled(
                "Loading battle...",
                Style::default().fg(Color::Gray),
            )));
        }
    }
    // A stale snapshot with a fresh fetch error shows both.
    if view.battle.is_some() {
        if let Some(error) = &view.battle_error {
            lines.push(Line::from(Span::styled(
                format!("refresh failed: {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines.push(Line::from(vec![
        Span::raw(format!("Round {}", view.current_round)),
        Span::raw("   Timer: "),
        Span::styled(
            view.timer_display.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Battle"));
    frame.render_widget(paragraph, area);
}

/// Human-readable battle status.
pub fn status_label(status: BattleStatus) -> &'static str {
    match status {
        BattleStatus::Scheduled => "scheduled",
        BattleStatus::Live => "LIVE",
        BattleStatus::Finished => "finished",
    }
}

fn status_color(status: BattleStatus) -> Color {
    match status {
        BattleStatus::Scheduled => Color::Yellow,
        BattleStatus::Live => Color::Green,
        BattleStatus::Finished => Color::Gray,
    }
}

/// Format the start timestamp for display.
pub fn starts_at_display(battle: &Battle) -> String {
    battle.starts_at.format("%Y-%m-%d %H:%M UTC").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
