// Application state and orchestration: the battle reconciler.
//
// The central event loop that coordinates live WebSocket events, snapshot
// fetch completions, and user commands from the TUI. Owns the update store
// and the subscription lifecycle, and pushes recomputed view models to the
// TUI render loop.
//
// Lifecycle per battle id: Idle -> Connecting -> Live -> Closed. There is no
// automatic reconnect; when the link closes and polling fallback is enabled,
// the snapshot is refetched on a timer until the user switches battles.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, FetchError};
use crate::config::Config;
use crate::protocol::{
    decode, Battle, EventTag, LinkStatus, SubmitAnswerRequest, SubmitAnswerResponse, Task,
    UiUpdate, UpdateEvent, UpdateMode, UserCommand, ViewModel,
};
use crate::store::UpdateStore;
use crate::transport::{LiveEvent, LiveLink};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Shown in place of the round timer before any state event has arrived.
pub const TIMER_PLACEHOLDER: &str = "--:--";

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Completions from spawned snapshot/submission tasks.
///
/// Every completion carries the subscription generation it was spawned
/// under; completions from a superseded generation are discarded the same
/// way stale live frames are.
#[derive(Debug)]
pub enum FetchEvent {
    Battle {
        generation: u64,
        result: Result<Battle, FetchError>,
    },
    Tasks {
        generation: u64,
        result: Result<Vec<Task>, FetchError>,
    },
    Submission {
        generation: u64,
        result: Result<SubmitAnswerResponse, FetchError>,
    },
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub store: UpdateStore,
    /// Identifier of the battle this reconciler is currently bound to.
    pub battle_id: String,
    /// Monotonically increasing counter identifying the current
    /// subscription. Bumped on every activation; live frames and fetch
    /// completions tagged with an older generation are discarded, so a late
    /// callback from a superseded link can never touch current state.
    pub generation: u64,
    pub link: Option<LiveLink>,
    pub link_status: LinkStatus,
    pub mode: UpdateMode,
    /// Battle metadata from the last successful fetch, if any. Kept through
    /// later fetch failures so the view degrades to stale-but-present.
    pub battle: Option<Battle>,
    pub battle_error: Option<FetchError>,
    /// Task catalog in server order.
    pub tasks: Vec<Task>,
    pub tasks_error: Option<FetchError>,
    /// When the battle snapshot last finished fetching. Refreshes younger
    /// than the configured staleness window are suppressed.
    pub snapshot_fetched_at: Option<Instant>,
    /// In-flight fetch/submission tasks, aborted on teardown.
    inflight: Vec<JoinHandle<()>>,
    live_tx: mpsc::Sender<LiveEvent>,
    fetch_tx: mpsc::Sender<FetchEvent>,
}

impl AppState {
    /// Create a new AppState bound to `battle_id`.
    ///
    /// Nothing is fetched or opened until [`AppState::activate`] runs; the
    /// event loop activates the initial battle on entry.
    pub fn new(
        config: Config,
        api: ApiClient,
        battle_id: String,
        live_tx: mpsc::Sender<LiveEvent>,
        fetch_tx: mpsc::Sender<FetchEvent>,
    ) -> Self {
        AppState {
            config,
            api: Arc::new(api),
            store: UpdateStore::new(),
            battle_id,
            generation: 0,
            link: None,
            link_status: LinkStatus::Idle,
            mode: UpdateMode::LivePush,
            battle: None,
            battle_error: None,
            tasks: Vec::new(),
            tasks_error: None,
            snapshot_fetched_at: None,
            inflight: Vec::new(),
            live_tx,
            fetch_tx,
        }
    }

    /// Bind to `battle_id`: tear down any previous subscription, fetch a
    /// fresh snapshot, and open the new live link.
    ///
    /// The old link is closed and its log cleared before the new link opens;
    /// the generation bump fences off any of its frames still in flight.
    pub fn activate(&mut self, battle_id: &str) {
        self.teardown();
        self.generation += 1;
        self.battle_id = battle_id.to_string();
        self.battle = None;
        self.battle_error = None;
        self.tasks = Vec::new();
        self.tasks_error = None;
        self.snapshot_fetched_at = None;
        self.mode = UpdateMode::LivePush;

        self.spawn_snapshot_fetch();
        self.open_link();
    }

    /// Tear down the current subscription: close the link, abort in-flight
    /// fetches, and drop the battle's log.
    pub fn teardown(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        for task in self.inflight.drain(..) {
            task.abort();
        }
        self.store.clear(&self.battle_id);
        self.link_status = LinkStatus::Idle;
    }

    fn open_link(&mut self) {
        info!(
            battle = %self.battle_id,
            generation = self.generation,
            "opening live subscription"
        );
        self.link_status = LinkStatus::Connecting;
        self.link = Some(LiveLink::open(
            &self.config.server.ws_base_url,
            &self.battle_id,
            self.generation,
            self.live_tx.clone(),
        ));
    }

    /// Spawn battle + task-catalog fetches tagged with the current
    /// generation. Results arrive as [`FetchEvent`]s on the fetch channel.
    pub fn spawn_snapshot_fetch(&mut self) {
        self.inflight.retain(|task| !task.is_finished());

        let generation = self.generation;
        let battle_id = self.battle_id.clone();
        let api = Arc::clone(&self.api);
        let tx = self.fetch_tx.clone();
        self.inflight.push(tokio::spawn(async move {
            let result = api.fetch_battle(&battle_id).await;
            let _ = tx.send(FetchEvent::Battle { generation, result }).await;
        }));

        let api = Arc::clone(&self.api);
        let tx = self.fetch_tx.clone();
        self.inflight.push(tokio::spawn(async move {
            let result = api.fetch_tasks().await;
            let _ = tx.send(FetchEvent::Tasks { generation, result }).await;
        }));
    }

    /// Refetch the snapshot unless the current one is still inside the
    /// staleness window. Returns `true` when a refetch was started.
    pub fn refresh_snapshot(&mut self) -> bool {
        let staleness = Duration::from_secs(self.config.live.snapshot_staleness_secs);
        if let Some(fetched_at) = self.snapshot_fetched_at {
            if fetched_at.elapsed() < staleness {
                debug!("snapshot still fresh, skipping refetch");
                return false;
            }
        }
        self.spawn_snapshot_fetch();
        true
    }

    /// Submit an answer over REST. The verdict arrives as a
    /// [`FetchEvent::Submission`] on the fetch channel.
    pub fn submit_answer(&mut self, task_id: String, answer: String) {
        self.inflight.retain(|task| !task.is_finished());

        let generation = self.generation;
        let api = Arc::clone(&self.api);
        let tx = self.fetch_tx.clone();
        let request = SubmitAnswerRequest { task_id, answer };
        self.inflight.push(tokio::spawn(async move {
            let result = api.submit_answer(&request).await;
            let _ = tx
                .send(FetchEvent::Submission { generation, result })
                .await;
        }));
    }

    /// True when `key` and `generation` identify the currently active
    /// subscription. Late events from a superseded link fail this check.
    pub fn is_current(&self, key: &str, generation: u64) -> bool {
        generation == self.generation && key == self.battle_id
    }

    /// Build the render-ready view model from the snapshot and the latest
    /// projections.
    ///
    /// Pure with respect to (snapshot, log state): identical inputs yield an
    /// identical view model, no matter how many times it runs.
    pub fn build_view(&self) -> ViewModel {
        let state = match self.store.latest(&self.battle_id, EventTag::State) {
            Some(UpdateEvent::State(state)) => Some(state),
            _ => None,
        };
        let current_round = state.map_or(1, |s| s.round);
        let timer_display = state.map_or_else(
            || TIMER_PLACEHOLDER.to_string(),
            |s| format!("{}s", s.timer_sec),
        );

        let score_rows = match self.store.latest(&self.battle_id, EventTag::Score) {
            Some(UpdateEvent::Score(rows)) => rows.clone(),
            _ => Vec::new(),
        };

        ViewModel {
            battle: self.battle.clone(),
            battle_error: self.battle_error.as_ref().map(|e| e.to_string()),
            tasks_error: self.tasks_error.as_ref().map(|e| e.to_string()),
            current_round,
            timer_display,
            score_rows,
            current_task: self.resolve_current_task().cloned(),
            link: self.link_status,
            mode: self.mode,
        }
    }

    /// The task named by the latest `currentTask` event.
    ///
    /// Falls back to the first catalog entry when no event has arrived or
    /// the event names an id absent from the catalog; `None` only when the
    /// catalog is empty.
    fn resolve_current_task(&self) -> Option<&Task> {
        let wanted = match self.store.latest(&self.battle_id, EventTag::CurrentTask) {
            Some(UpdateEvent::CurrentTask(payload)) => Some(payload.task_id.as_str()),
            _ => None,
        };
        wanted
            .and_then(|id| self.tasks.iter().find(|t| t.id == id))
            .or_else(|| self.tasks.first())
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on three channels using `tokio::select!`:
/// 1. Live events from the WebSocket link
/// 2. Fetch completions from spawned snapshot/submission tasks
/// 3. User commands from the TUI
///
/// plus a poll timer that only fires in polling fallback mode. Pushes view
/// models through `ui_tx` for the TUI render loop.
pub async fn run(
    mut live_rx: mpsc::Receiver<LiveEvent>,
    mut fetch_rx: mpsc::Receiver<FetchEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("application event loop started");

    let initial = state.battle_id.clone();
    state.activate(&initial);
    push_view(&state, &ui_tx).await;

    let mut poll_tick =
        tokio::time::interval(Duration::from_secs(state.config.live.poll_interval_secs));
    poll_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately; consume it so fallback polling
    // starts one full interval after the mode flips.
    poll_tick.tick().await;

    loop {
        tokio::select! {
            // --- Live events ---
            live_event = live_rx.recv() => {
                match live_event {
                    Some(event) => {
                        handle_live_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("live channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Fetch completions ---
            fetch_event = fetch_rx.recv() => {
                match fetch_event {
                    Some(event) => {
                        handle_fetch_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("fetch channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Polling fallback tick ---
            _ = poll_tick.tick(), if state.mode == UpdateMode::PollingFallback => {
                debug!(battle = %state.battle_id, "polling fallback refetch");
                state.spawn_snapshot_fetch();
            }
        }
    }

    state.teardown();
    info!("application event loop exiting");
    Ok(())
}

/// Handle an event from the live link.
///
/// Every event carries the key and generation of the subscription that
/// produced it; anything from a superseded subscription is discarded before
/// it can touch the store or the lifecycle state.
pub async fn handle_live_event(
    state: &mut AppState,
    event: LiveEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        LiveEvent::Opened { key, generation } => {
            if !state.is_current(&key, generation) {
                debug!(battle = %key, generation, "discarding open from superseded subscription");
                return;
            }
            info!(battle = %key, "live subscription open");
            state.link_status = LinkStatus::Live;
            state.mode = UpdateMode::LivePush;
            push_view(state, ui_tx).await;
        }
        LiveEvent::Frame {
            key,
            generation,
            text,
        } => {
            if !state.is_current(&key, generation) {
                debug!(battle = %key, generation, "discarding frame from superseded subscription");
                return;
            }
            let Some(event) = decode(&text) else {
                // Malformed or unrecognized; decode already logged it.
                return;
            };
            state.store.append(&key, event);
            push_view(state, ui_tx).await;
        }
        LiveEvent::Closed { key, generation } => {
            if !state.is_current(&key, generation) {
                debug!(battle = %key, generation, "discarding close from superseded subscription");
                return;
            }
            state.link = None;
            state.link_status = LinkStatus::Closed;
            if state.config.live.polling_fallback {
                warn!(battle = %key, "live link closed, entering polling fallback");
                state.mode = UpdateMode::PollingFallback;
            } else {
                warn!(battle = %key, "live link closed, live updates unavailable");
            }
            push_view(state, ui_tx).await;
        }
    }
}

/// Handle a completed snapshot fetch or answer submission.
pub async fn handle_fetch_event(
    state: &mut AppState,
    event: FetchEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        FetchEvent::Battle { generation, result } => {
            if generation != state.generation {
                debug!(generation, "discarding stale battle snapshot");
                return;
            }
            state.snapshot_fetched_at = Some(Instant::now());
            match result {
                Ok(battle) => {
                    debug!(battle = %battle.id, "battle snapshot applied");
                    state.battle = Some(battle);
                    state.battle_error = None;
                }
                Err(error) => {
                    warn!(battle = %state.battle_id, "battle snapshot fetch failed: {error}");
                    let not_found = matches!(error, FetchError::NotFound { .. });
                    state.battle_error = Some(error);
                    if not_found {
                        // A battle that doesn't exist gets no live link:
                        // close it and drop whatever the log collected.
                        info!(battle = %state.battle_id, "battle not found, closing live subscription");
                        if let Some(mut link) = state.link.take() {
                            link.close();
                        }
                        state.link_status = LinkStatus::Closed;
                        state.mode = UpdateMode::LivePush;
                        state.store.clear(&state.battle_id);
                    }
                }
            }
            push_view(state, ui_tx).await;
        }
        FetchEvent::Tasks { generation, result } => {
            if generation != state.generation {
                debug!(generation, "discarding stale task catalog");
                return;
            }
            match result {
                Ok(tasks) => {
                    debug!(count = tasks.len(), "task catalog applied");
                    state.tasks = tasks;
                    state.tasks_error = None;
                }
                Err(error) => {
                    warn!("task catalog fetch failed: {error}");
                    state.tasks_error = Some(error);
                }
            }
            push_view(state, ui_tx).await;
        }
        FetchEvent::Submission { generation, result } => {
            if generation != state.generation {
                debug!(generation, "discarding stale submission verdict");
                return;
            }
            match result {
                Ok(response) => {
                    info!(correct = response.correct, "answer submission accepted");
                    let _ = ui_tx.send(UiUpdate::SubmitResult(response)).await;
                    // A scored answer changes battle-derived data; the
                    // snapshot is invalidated regardless of its age.
                    state.spawn_snapshot_fetch();
                }
                Err(error) => {
                    warn!("answer submission failed: {error}");
                    let _ = ui_tx.send(UiUpdate::SubmitFailed(error.to_string())).await;
                }
            }
        }
    }
}

/// Handle a user command from the TUI.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::SwitchBattle(battle_id) => {
            if battle_id == state.battle_id {
                debug!(battle = %battle_id, "already viewing this battle");
                return;
            }
            info!(from = %state.battle_id, to = %battle_id, "switching battle");
            state.activate(&battle_id);
            push_view(state, ui_tx).await;
        }
        UserCommand::Refresh => {
            if state.refresh_snapshot() {
                debug!("manual snapshot refresh started");
            }
        }
        UserCommand::SubmitAnswer { task_id, answer } => {
            info!(task = %task_id, "submitting answer");
            state.submit_answer(task_id, answer);
        }
        UserCommand::Quit => {
            // Handled in the main loop.
        }
    }
}

async fn push_view(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::View(Box::new(state.build_view())))
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
