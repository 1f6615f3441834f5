// Screen layout: panel arrangement and sizing.
//
// Divides the terminal area into fixed zones for the battle dashboard:
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Battle Header (5 rows)                            |
// +-------------------------+------------------------+
// | Task Panel (60%)         | Scoreboard (40%)       |
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: link indicator, battle id, update mode.
    pub status_bar: Rect,
    /// Battle metadata: name, status, start time, round, timer.
    pub header: Rect,
    /// Left side of the middle section: current task and answer entry.
    pub task_panel: Rect,
    /// Right side of the middle section: score table.
    pub scoreboard: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

/// Build the dashboard layout from the available terminal area.
pub fn build_layout(area: Rect) -> AppLayout {
    // Vertical: status(1) | header(5) | middle(fill) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(5), // battle header
            Constraint::Min(8),    // middle section
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let status_bar = vertical[0];
    let header = vertical[1];
    let middle = vertical[2];
    let help_bar = vertical[3];

    // Horizontal: task panel (60%) | scoreboard (40%)
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(middle);

    AppLayout {
        status_bar,
        header,
        task_panel: horizontal[0],
        scoreboard: horizontal[1],
        help_bar,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
