// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the app
// orchestrator, or into local ViewState mutations (input field editing).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{InputMode, ViewState};
use crate::protocol::UserCommand;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to
/// the app orchestrator (refresh, submit, switch, quit). Returns `None`
/// when the key press was handled locally by mutating `ViewState`.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress; ignoring
    // non-Press events prevents double-processing.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode (escape hatch)
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    match view_state.input_mode {
        InputMode::Answer => handle_answer_mode(key_event, view_state),
        InputMode::BattleId => handle_battle_id_mode(key_event, view_state),
        InputMode::Normal => handle_normal_mode(key_event, view_state),
    }
}

fn handle_normal_mode(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('q') => Some(UserCommand::Quit),
        KeyCode::Char('r') => Some(UserCommand::Refresh),
        KeyCode::Char('a') => {
            // Answer entry only makes sense with a task on screen.
            if view_state.view.current_task.is_some() {
                view_state.input_mode = InputMode::Answer;
                view_state.input_buffer.clear();
                view_state.submit_feedback = None;
            }
            None
        }
        KeyCode::Char('b') => {
            view_state.input_mode = InputMode::BattleId;
            view_state.input_buffer.clear();
            None
        }
        _ => None,
    }
}

fn handle_answer_mode(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter => {
            let answer = view_state.input_buffer.trim().to_string();
            view_state.input_mode = InputMode::Normal;
            view_state.input_buffer.clear();
            if answer.is_empty() {
                return None;
            }
            let task_id = view_state.view.current_task.as_ref()?.id.clone();
            Some(UserCommand::SubmitAnswer { task_id, answer })
        }
        KeyCode::Esc => {
            view_state.input_mode = InputMode::Normal;
            view_state.input_buffer.clear();
            None
        }
        KeyCode::Backspace => {
            view_state.input_buffer.pop();
            None
        }
        KeyCode::Char(c) => {
            view_state.input_buffer.push(c);
            None
        }
        _ => None,
    }
}

fn handle_battle_id_mode(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter => {
            let battle_id = view_state.input_buffer.trim().to_string();
            view_state.input_mode = InputMode::Normal;
            view_state.input_buffer.clear();
            if battle_id.is_empty() {
                return None;
            }
            Some(UserCommand::SwitchBattle(battle_id))
        }
        KeyCode::Esc => {
            view_state.input_mode = InputMode::Normal;
            view_state.input_buffer.clear();
            None
        }
        KeyCode::Backspace => {
            view_state.input_buffer.pop();
            None
        }
        KeyCode::Char(c) => {
            view_state.input_buffer.push(c);
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Task, TaskStatus};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state_with_task() -> ViewState {
        let mut state = ViewState::default();
        state.view.current_task = Some(Task {
            id: "t1".into(),
            title: "Fractions".into(),
            status: TaskStatus::New,
            difficulty: None,
            created_at: None,
        });
        state
    }

    #[test]
    fn q_quits_in_normal_mode() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(press(KeyCode::Char('q')), &mut state),
            Some(UserCommand::Quit)
        );
    }

    #[test]
    fn ctrl_c_quits_in_any_mode() {
        let mut state = ViewState::default();
        state.input_mode = InputMode::Answer;
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(event, &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn r_requests_refresh() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(press(KeyCode::Char('r')), &mut state),
            Some(UserCommand::Refresh)
        );
    }

    #[test]
    fn a_enters_answer_mode_only_with_a_task() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(press(KeyCode::Char('a')), &mut state), None);
        assert_eq!(state.input_mode, InputMode::Normal);

        let mut state = state_with_task();
        assert_eq!(handle_key(press(KeyCode::Char('a')), &mut state), None);
        assert_eq!(state.input_mode, InputMode::Answer);
    }

    #[test]
    fn typed_answer_is_submitted_for_current_task() {
        let mut state = state_with_task();
        handle_key(press(KeyCode::Char('a')), &mut state);
        handle_key(press(KeyCode::Char('4')), &mut state);
        handle_key(press(KeyCode::Char('2')), &mut state);

        let cmd = handle_key(press(KeyCode::Enter), &mut state);
        assert_eq!(
            cmd,
            Some(UserCommand::SubmitAnswer {
                task_id: "t1".into(),
                answer: "42".into()
            })
        );
        assert_eq!(state.input_mode, InputMode::Normal);
        assert!(state.input_buffer.is_empty());
    }

    #[test]
    fn empty_answer_is_not_submitted() {
        let mut state = state_with_task();
        handle_key(press(KeyCode::Char('a')), &mut state);
        assert_eq!(handle_key(press(KeyCode::Enter), &mut state), None);
        assert_eq!(state.input_mode, InputMode::Normal);
    }

    #[test]
    fn esc_cancels_answer_entry() {
        let mut state = state_with_task();
        handle_key(press(KeyCode::Char('a')), &mut state);
        handle_key(press(KeyCode::Char('x')), &mut state);
        assert_eq!(handle_key(press(KeyCode::Esc), &mut state), None);
        assert_eq!(state.input_mode, InputMode::Normal);
        assert!(state.input_buffer.is_empty());
    }

    #[test]
    fn backspace_edits_the_buffer() {
        let mut state = state_with_task();
        handle_key(press(KeyCode::Char('a')), &mut state);
        handle_key(press(KeyCode::Char('4')), &mut state);
        handle_key(press(KeyCode::Char('3')), &mut state);
        handle_key(press(KeyCode::Backspace), &mut state);
        assert_eq!(state.input_buffer, "4");
    }

    #[test]
    fn q_types_into_answer_buffer_instead_of_quitting() {
        let mut state = state_with_task();
        handle_key(press(KeyCode::Char('a')), &mut state);
        assert_eq!(handle_key(press(KeyCode::Char('q')), &mut state), None);
        assert_eq!(state.input_buffer, "q");
    }

    #[test]
    fn battle_id_entry_switches_battle() {
        let mut state = ViewState::default();
        handle_key(press(KeyCode::Char('b')), &mut state);
        assert_eq!(state.input_mode, InputMode::BattleId);

        for c in "b42".chars() {
            handle_key(press(KeyCode::Char(c)), &mut state);
        }
        assert_eq!(
            handle_key(press(KeyCode::Enter), &mut state),
            Some(UserCommand::SwitchBattle("b42".into()))
        );
        assert_eq!(state.input_mode, InputMode::Normal);
    }

    #[test]
    fn empty_battle_id_is_ignored() {
        let mut state = ViewState::default();
        handle_key(press(KeyCode::Char('b')), &mut state);
        assert_eq!(handle_key(press(KeyCode::Enter), &mut state), None);
        assert_eq!(state.input_mode, InputMode::Normal);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let mut event = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(handle_key(event, &mut state), None);
    }
}
