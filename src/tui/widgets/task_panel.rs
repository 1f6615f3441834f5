// Current task widget: task title, answer entry line, submission feedback.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::protocol::Difficulty;
use crate::tui::{InputMode, SubmitFeedback, ViewState};

/// Render the current task panel into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let view = &state.view;
    let mut lines = Vec::new();

    match &view.current_task {
        Some(task) => {
            lines.push(Line::from(Span::styled(
                task.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            if let Some(difficulty) = task.difficulty {
                lines.push(Line::from(Span::styled(
                    format!("difficulty: {}", difficulty_label(difficulty)),
                    Style::default().fg(Color::Gray),
                )));
            }
        }
        None => {
            let text = if let Some(error) = &view.tasks_error {
                format!("Task catalog unavailable: {error}")
            } else {
                "No tasks in this battle yet".to_string()
            };
            lines.push(Line::from(Span::styled(
                text,
                Style::default().fg(Color::Gray),
            )));
        }
    }

    lines.push(Line::from(""));
    if state.input_mode == InputMode::Answer {
        lines.push(Line::from(vec![
            Span::styled("Answer: ", Style::default().fg(Color::Cyan)),
            Span::raw(state.input_buffer.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]));
    } else if view.current_task.is_some() {
        lines.push(Line::from(Span::styled(
            "press 'a' to answer",
            Style::default().fg(Color::DarkGray),
        )));
    }

    if let Some(feedback) = &state.submit_feedback {
        lines.push(Line::from(feedback_span(feedback)));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Current Task"));
    frame.render_widget(paragraph, area);
}

/// Human-readable difficulty.
pub fn difficulty_label(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
    }
}

/// Build the styled feedback line for the last submission.
pub fn feedback_span(feedback: &SubmitFeedback) -> Span<'static> {
    match feedback {
        SubmitFeedback::Verdict(response) if response.correct => {
            let mut text = "Correct!".to_string();
            if let Some(delta) = response.score_delta {
                text.push_str(&format!(" (+{delta})"));
            }
            Span::styled(text, Style::default().fg(Color::Green))
        }
        SubmitFeedback::Verdict(response) => {
            let mut text = "Incorrect".to_string();
            if let Some(explanation) = &response.explanation {
                text.push_str(&format!(": {explanation}"));
            }
            Span::styled(text, Style::default().fg(Color::Red))
        }
        SubmitFeedback::Failed(message) => Span::styled(
            format!("Submission failed: {message}"),
            Style::default().fg(Color::Yellow),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
