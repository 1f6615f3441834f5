// Status bar widget: link indicator, battle id, update mode.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::protocol::{LinkStatus, UpdateMode};
use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [link indicator] [battle id] [mode]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();

    let (dot, dot_color) = link_indicator(state.view.link);
    spans.push(Span::styled(
        format!(" {} ", dot),
        Style::default().fg(dot_color),
    ));
    spans.push(Span::styled(
        link_label(state.view.link),
        Style::default().fg(Color::White),
    ));

    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    let battle = state
        .view
        .battle
        .as_ref()
        .map(|b| b.name.as_str())
        .unwrap_or("(no battle)");
    spans.push(Span::styled(
        battle.to_string(),
        Style::default().fg(Color::White),
    ));

    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    spans.push(Span::styled(
        mode_label(state.view.mode),
        Style::default().fg(match state.view.mode {
            UpdateMode::LivePush => Color::Green,
            UpdateMode::PollingFallback => Color::Yellow,
        }),
    ));

    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Return the link dot character and its color.
pub fn link_indicator(status: LinkStatus) -> (&'static str, Color) {
    match status {
        LinkStatus::Live => ("●", Color::Green),
        LinkStatus::Connecting => ("●", Color::Yellow),
        LinkStatus::Closed => ("●", Color::Red),
        LinkStatus::Idle => ("○", Color::DarkGray),
    }
}

/// Return the label for a link status.
pub fn link_label(status: LinkStatus) -> &'static str {
    match status {
        LinkStatus::Live => "Live",
        LinkStatus::Connecting => "Connecting",
        LinkStatus::Closed => "Live updates unavailable",
        LinkStatus::Idle => "Idle",
    }
}

/// Return the label for an update mode.
pub fn mode_label(mode: UpdateMode) -> &'static str {
    match mode {
        UpdateMode::LivePush => "push",
        UpdateMode::PollingFallback => "polling",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
