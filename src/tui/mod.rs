// TUI dashboard: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that holds the latest view model pushed by the
// app orchestrator plus purely local input state (answer entry, battle-id
// entry). It applies `UiUpdate` messages as they arrive and re-renders at
// ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::protocol::{SubmitAnswerResponse, UiUpdate, UserCommand, ViewModel};

use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// Which input field, if any, currently captures keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing an answer for the current task.
    Answer,
    /// Typing a battle id to switch to.
    BattleId,
}

/// Outcome of the most recent answer submission, for display.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitFeedback {
    /// The server judged the answer.
    Verdict(SubmitAnswerResponse),
    /// The submission never reached the server.
    Failed(String),
}

/// TUI-local state: the latest view model plus input state.
pub struct ViewState {
    /// Latest view model pushed by the app orchestrator.
    pub view: ViewModel,
    pub input_mode: InputMode,
    /// Text being typed in the active input field.
    pub input_buffer: String,
    /// Feedback from the last answer submission, cleared when a new answer
    /// entry starts.
    pub submit_feedback: Option<SubmitFeedback>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            view: ViewModel::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            submit_feedback: None,
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::View(view) => {
            state.view = *view;
        }
        UiUpdate::SubmitResult(response) => {
            state.submit_feedback = Some(SubmitFeedback::Verdict(response));
        }
        UiUpdate::SubmitFailed(message) => {
            state.submit_feedback = Some(SubmitFeedback::Failed(message));
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete dashboard frame.
fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::header::render(frame, layout.header, state);
    widgets::task_panel::render(frame, layout.task_panel, state);
    widgets::scoreboard::render(frame, layout.scoreboard, state);
    render_help_bar(frame, layout.help_bar, state);
}

fn render_help_bar(frame: &mut Frame, area: ratatui::layout::Rect, state: &ViewState) {
    let text = match state.input_mode {
        InputMode::Normal => " q:quit  r:refresh  a:answer  b:switch battle",
        InputMode::Answer => " Enter:submit answer  Esc:cancel",
        InputMode::BattleId => " Enter:switch battle  Esc:cancel",
    };
    let paragraph = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::Gray),
    )));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop until the user quits.
///
/// Consumes `ui_rx` for view updates and sends user commands through
/// `cmd_tx`. Blocks the calling task until quit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    // Restore the terminal on panic. We capture the original hook and chain
    // ours before it.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // UI updates from the app orchestrator
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => {
                        apply_ui_update(&mut view_state, ui_update);
                    }
                    None => {
                        // Channel closed: app is shutting down
                        break;
                    }
                }
            }

            // Keyboard input
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {
                        // Mouse events, resize events, etc. -- ignore
                    }
                    Some(Err(_)) | None => {
                        break;
                    }
                }
            }

            // Render tick
            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
