// Scoreboard widget: latest score table, one row per team.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

use crate::protocol::ScoreRow;
use crate::tui::ViewState;

/// Render the scoreboard into the given area.
///
/// The data contract yields an empty row set until the first score event;
/// in that case a placeholder hint is rendered instead of an empty table.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title("Score");
    let rows = &state.view.score_rows;

    if rows.is_empty() {
        let paragraph = Paragraph::new("No score updates yet")
            .style(Style::default().fg(Color::Gray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new([
        Cell::from("Team"),
        Cell::from("Score"),
        Cell::from("Penalty"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let table = Table::new(
        rows.iter().map(table_row),
        [
            Constraint::Percentage(50),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn table_row(row: &ScoreRow) -> Row<'static> {
    Row::new([
        Cell::from(row.team.clone()),
        Cell::from(row.score.to_string()),
        Cell::from(row.penalty.to_string()),
    ])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
