// Wire types shared between the live channel, the REST API, the app
// orchestrator, and the TUI.
//
// The live channel speaks JSON text frames with a `type` discriminant and a
// `payload`. The set of recognized types is closed; anything else on the
// wire (including the server's connection greeting and answer
// acknowledgements) decodes to nothing and never reaches the update log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Live update events
// ---------------------------------------------------------------------------

/// One decoded message from a battle's live update channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum UpdateEvent {
    /// Round or timer change.
    #[serde(rename = "state")]
    State(StatePayload),
    /// Full replacement of the score table. The wire payload is the bare
    /// row array, exactly as the server broadcasts it.
    #[serde(rename = "score")]
    Score(Vec<ScoreRow>),
    /// The active task changed.
    #[serde(rename = "currentTask")]
    CurrentTask(CurrentTaskPayload),
}

/// Discriminant of an [`UpdateEvent`], used for latest-per-tag projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    State,
    Score,
    CurrentTask,
}

impl UpdateEvent {
    /// The event's discriminant tag.
    pub fn tag(&self) -> EventTag {
        match self {
            UpdateEvent::State(_) => EventTag::State,
            UpdateEvent::Score(_) => EventTag::Score,
            UpdateEvent::CurrentTask(_) => EventTag::CurrentTask,
        }
    }
}

/// Payload of a `state` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    /// Current round number, 1-based.
    pub round: u32,
    /// Seconds remaining on the round timer.
    pub timer_sec: u32,
}

/// One row of the scoreboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub team: String,
    pub score: i64,
    pub penalty: i64,
}

/// Payload of a `currentTask` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTaskPayload {
    pub task_id: String,
}

/// Decode a raw live-channel frame.
///
/// Returns `None` for malformed JSON, an unrecognized discriminant, missing
/// or malformed payload fields, or a zero round (rounds are 1-based).
/// Decoding failure is a normal, silent outcome: the frame is dropped and
/// logged at debug level, never surfaced as an error.
pub fn decode(raw: &str) -> Option<UpdateEvent> {
    let event: UpdateEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            debug!("dropping undecodable frame: {e}");
            return None;
        }
    };
    if let UpdateEvent::State(ref state) = event {
        if state.round == 0 {
            debug!("dropping state frame with round 0");
            return None;
        }
    }
    Some(event)
}

// ---------------------------------------------------------------------------
// REST snapshot types
// ---------------------------------------------------------------------------

/// Lifecycle status of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    Scheduled,
    Live,
    Finished,
}

/// Durable battle metadata, fetched once per activation and on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    pub id: String,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub status: BattleStatus,
}

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    New,
    InProgress,
    Done,
}

/// Difficulty rating assigned by the teacher, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One entry of the task catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for answer submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub task_id: String,
    pub answer: String,
}

/// Server verdict on a submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    pub correct: bool,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub score_delta: Option<i64>,
}

// ---------------------------------------------------------------------------
// App <-> TUI messages
// ---------------------------------------------------------------------------

/// Live subscription state machine for the battle currently bound.
///
/// There is no automatic `Closed -> Connecting` transition: reconnecting
/// requires re-activating the battle (see the polling fallback in the app
/// orchestrator for the degraded path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Idle,
    Connecting,
    Live,
    Closed,
}

/// How battle-derived views are being kept fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// The live channel pushes events as they happen.
    LivePush,
    /// The live channel is down; the snapshot is refetched on a timer.
    PollingFallback,
}

/// The merged, render-ready battle view: snapshot plus latest projections.
///
/// Purely derived -- the orchestrator recomputes it whenever either input
/// changes and pushes the result to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    /// Battle metadata from the last successful snapshot fetch, if any.
    pub battle: Option<Battle>,
    /// Human-readable error from the last failed battle fetch, if any.
    pub battle_error: Option<String>,
    /// Human-readable error from the last failed task-catalog fetch, if any.
    pub tasks_error: Option<String>,
    /// Latest known round, defaulting to 1 before any state event.
    pub current_round: u32,
    /// Formatted round timer, or a placeholder before any state event.
    pub timer_display: String,
    /// Latest score table; empty until a score event arrives.
    pub score_rows: Vec<ScoreRow>,
    /// The task currently being played, resolved against the catalog.
    pub current_task: Option<Task>,
    pub link: LinkStatus,
    pub mode: UpdateMode,
}

impl Default for ViewModel {
    fn default() -> Self {
        ViewModel {
            battle: None,
            battle_error: None,
            tasks_error: None,
            current_round: 1,
            timer_display: crate::app::TIMER_PLACEHOLDER.to_string(),
            score_rows: Vec::new(),
            current_task: None,
            link: LinkStatus::Idle,
            mode: UpdateMode::LivePush,
        }
    }
}

/// Messages pushed from the app orchestrator to the TUI render loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// A freshly recomputed view model.
    View(Box<ViewModel>),
    /// The server's verdict on the last submitted answer.
    SubmitResult(SubmitAnswerResponse),
    /// The last answer submission failed to reach the server.
    SubmitFailed(String),
}

/// Commands sent from the TUI to the app orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Tear down the current subscription and bind to another battle.
    SwitchBattle(String),
    /// Refetch the snapshot (subject to the staleness window).
    Refresh,
    /// Submit an answer for a task over REST.
    SubmitAnswer { task_id: String, answer: String },
    Quit,
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- decode: recognized frames --

    #[test]
    fn decode_state_frame() {
        let raw = r#"{"type":"state","payload":{"round":1,"timerSec":30}}"#;
        assert_eq!(
            decode(raw),
            Some(UpdateEvent::State(StatePayload {
                round: 1,
                timer_sec: 30
            }))
        );
    }

    #[test]
    fn decode_score_frame_bare_array_payload() {
        let raw = r#"{"type":"score","payload":[
            {"team":"Alpha","score":120,"penalty":10},
            {"team":"Beta","score":110,"penalty":5}
        ]}"#;
        let event = decode(raw).expect("score frame should decode");
        match event {
            UpdateEvent::Score(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].team, "Alpha");
                assert_eq!(rows[0].score, 120);
                assert_eq!(rows[0].penalty, 10);
                assert_eq!(rows[1].team, "Beta");
            }
            other => panic!("expected Score, got {other:?}"),
        }
    }

    #[test]
    fn decode_current_task_frame() {
        let raw = r#"{"type":"currentTask","payload":{"taskId":"t2"}}"#;
        assert_eq!(
            decode(raw),
            Some(UpdateEvent::CurrentTask(CurrentTaskPayload {
                task_id: "t2".into()
            }))
        );
    }

    #[test]
    fn decode_tolerates_extra_payload_fields() {
        let raw = r#"{"type":"state","payload":{"round":3,"timerSec":10,"phase":"bonus"}}"#;
        assert_eq!(
            decode(raw),
            Some(UpdateEvent::State(StatePayload {
                round: 3,
                timer_sec: 10
            }))
        );
    }

    // -- decode: dropped frames --

    #[test]
    fn decode_rejects_malformed_json() {
        assert_eq!(decode("{not json"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn decode_rejects_unrecognized_tag() {
        // The server greets new connections with this frame; it is not an
        // update event and must not enter the log.
        let raw = r#"{"type":"connection_success","message":"joined battle b1"}"#;
        assert_eq!(decode(raw), None);
    }

    #[test]
    fn decode_rejects_missing_payload_fields() {
        assert_eq!(decode(r#"{"type":"state","payload":{"round":2}}"#), None);
        assert_eq!(decode(r#"{"type":"currentTask","payload":{}}"#), None);
        assert_eq!(
            decode(r#"{"type":"score","payload":[{"team":"Alpha","score":1}]}"#),
            None
        );
    }

    #[test]
    fn decode_rejects_negative_integers() {
        assert_eq!(
            decode(r#"{"type":"state","payload":{"round":-1,"timerSec":30}}"#),
            None
        );
        assert_eq!(
            decode(r#"{"type":"state","payload":{"round":1,"timerSec":-5}}"#),
            None
        );
    }

    #[test]
    fn decode_rejects_round_zero() {
        assert_eq!(
            decode(r#"{"type":"state","payload":{"round":0,"timerSec":30}}"#),
            None
        );
    }

    #[test]
    fn decode_rejects_non_object_frame() {
        assert_eq!(decode(r#""state""#), None);
        assert_eq!(decode("42"), None);
    }

    // -- event tags --

    #[test]
    fn event_tags_match_variants() {
        let state = UpdateEvent::State(StatePayload {
            round: 1,
            timer_sec: 0,
        });
        let score = UpdateEvent::Score(vec![]);
        let task = UpdateEvent::CurrentTask(CurrentTaskPayload {
            task_id: "t1".into(),
        });
        assert_eq!(state.tag(), EventTag::State);
        assert_eq!(score.tag(), EventTag::Score);
        assert_eq!(task.tag(), EventTag::CurrentTask);
    }

    // -- REST DTO wire shapes --

    #[test]
    fn battle_deserializes_from_api_shape() {
        let raw = r#"{
            "id": "b1",
            "name": "Friday Showdown",
            "startsAt": "2024-05-17T10:00:00Z",
            "status": "live"
        }"#;
        let battle: Battle = serde_json::from_str(raw).unwrap();
        assert_eq!(battle.id, "b1");
        assert_eq!(battle.name, "Friday Showdown");
        assert_eq!(battle.status, BattleStatus::Live);
    }

    #[test]
    fn task_optional_fields_default_to_none() {
        let raw = r#"{"id":"t1","title":"Fractions","status":"new"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.difficulty, None);
        assert_eq!(task.created_at, None);
    }

    #[test]
    fn task_full_shape() {
        let raw = r#"{
            "id": "t2",
            "title": "Long division",
            "status": "in_progress",
            "difficulty": "hard",
            "createdAt": "2024-05-01T08:30:00Z"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.difficulty, Some(Difficulty::Hard));
        assert!(task.created_at.is_some());
    }

    #[test]
    fn submit_answer_request_uses_camel_case() {
        let request = SubmitAnswerRequest {
            task_id: "t1".into(),
            answer: "42".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["taskId"], "t1");
        assert_eq!(json["answer"], "42");
    }

    #[test]
    fn submit_answer_response_optional_fields() {
        let raw = r#"{"correct":true}"#;
        let response: SubmitAnswerResponse = serde_json::from_str(raw).unwrap();
        assert!(response.correct);
        assert_eq!(response.explanation, None);
        assert_eq!(response.score_delta, None);

        let raw = r#"{"correct":false,"explanation":"off by one","scoreDelta":-5}"#;
        let response: SubmitAnswerResponse = serde_json::from_str(raw).unwrap();
        assert!(!response.correct);
        assert_eq!(response.explanation.as_deref(), Some("off by one"));
        assert_eq!(response.score_delta, Some(-5));
    }

    #[test]
    fn default_view_model_matches_data_contract() {
        let view = ViewModel::default();
        assert_eq!(view.current_round, 1);
        assert_eq!(view.timer_display, crate::app::TIMER_PLACEHOLDER);
        assert!(view.score_rows.is_empty());
        assert!(view.current_task.is_none());
        assert_eq!(view.link, LinkStatus::Idle);
        assert_eq!(view.mode, UpdateMode::LivePush);
    }
}
