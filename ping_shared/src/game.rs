//! Game state machine and controller.
//!
//! The rules live in [`transition`], a pure function from (state, event) to
//! the next state plus a list of [`Effect`]s. [`GameController`] owns the
//! live state and interprets effects: timers, the probe task, feedback calls,
//! ranking updates and UI changes.
//!
//! Everything the controller reacts to (user input, timers, probe results)
//! arrives as a signal on one channel and is applied on one task, so state is
//! never touched concurrently.
//!
//! Round lifecycle:
//! - Intro --intro delay--> Waiting
//! - Waiting --activate--> Measuring (probe in flight)
//! - Measuring --probe done + result delay--> Result (sample recorded)
//! - Result --replay--> Waiting

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    config::GameConfig,
    feedback::{emit_isolated, feedback_for, FeedbackEmitter, Tier},
    probe::{measure, LatencyProbe},
    ranking::RankingStore,
    storage::KeyValueStore,
    timer::TimerSlot,
    ui::{GameView, Screen, StatusLight, UiSnapshot, STATUS_MEASURING},
};

/// Current phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// Splash screen, before the first round.
    Intro,
    /// Ready for the user to start a measurement.
    Waiting,
    /// Probe in flight (`sample == None`) or finished and waiting out the
    /// display delay (`sample == Some(ms)`).
    Measuring { sample: Option<u32> },
    /// Round finished with this latency.
    Result { latency_ms: u32 },
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Intro => "intro",
            GameState::Waiting => "waiting",
            GameState::Measuring { .. } => "measuring",
            GameState::Result { .. } => "result",
        }
    }

    /// Latency of the finished round, if any.
    pub fn last_latency_ms(&self) -> Option<u32> {
        match self {
            GameState::Result { latency_ms } => Some(*latency_ms),
            _ => None,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    IntroElapsed,
    Activate,
    ProbeFinished(u32),
    ResultDelayElapsed,
    Replay,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Cancel timers and put the game screen back to its ready state.
    ResetRound,
    StartAmbient,
    StopAmbient,
    /// Disable activation and show the measuring status.
    DisableActivation,
    PlayClick,
    StartProbe,
    ScheduleResult,
    ShowResult { latency_ms: u32 },
    RecordSample(u32),
    PlaySuccess(Tier),
}

/// Accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: GameState,
    pub effects: Vec<Effect>,
}

/// Applies the game rules. Returns `None` if `event` is not accepted in `state`.
pub fn transition(state: &GameState, event: &GameEvent) -> Option<Transition> {
    let (next, effects) = match (*state, *event) {
        (GameState::Intro, GameEvent::IntroElapsed) => (
            GameState::Waiting,
            vec![Effect::ResetRound, Effect::StartAmbient],
        ),
        (GameState::Waiting, GameEvent::Activate) => (
            GameState::Measuring { sample: None },
            vec![
                Effect::DisableActivation,
                Effect::PlayClick,
                Effect::StartProbe,
            ],
        ),
        (GameState::Measuring { sample: None }, GameEvent::ProbeFinished(latency_ms)) => (
            GameState::Measuring {
                sample: Some(latency_ms),
            },
            vec![Effect::ScheduleResult],
        ),
        (GameState::Measuring { sample: Some(latency_ms) }, GameEvent::ResultDelayElapsed) => (
            GameState::Result { latency_ms },
            vec![
                Effect::ShowResult { latency_ms },
                Effect::RecordSample(latency_ms),
                Effect::PlaySuccess(Tier::for_latency(latency_ms)),
            ],
        ),
        (GameState::Result { .. }, GameEvent::Replay) => (
            GameState::Waiting,
            vec![
                Effect::ResetRound,
                Effect::StopAmbient,
                Effect::StartAmbient,
            ],
        ),
        _ => return None,
    };
    Some(Transition { next, effects })
}

enum Signal {
    /// Event from user input; always current.
    Input(GameEvent),
    /// Event from a timer or the probe task, tagged with the epoch it was
    /// scheduled in. Dropped if a reset happened since.
    Scheduled { epoch: u64, event: GameEvent },
    ClearRanking,
    Shutdown,
}

/// Cloneable handle used by input sources to drive a controller.
#[derive(Clone)]
pub struct InputHandle {
    tx: mpsc::UnboundedSender<Signal>,
}

impl InputHandle {
    /// Requests a measurement. Ignored unless the game is waiting.
    pub fn activate(&self) -> bool {
        self.tx.send(Signal::Input(GameEvent::Activate)).is_ok()
    }

    /// Requests another round. Ignored unless a result is showing.
    pub fn replay(&self) -> bool {
        self.tx.send(Signal::Input(GameEvent::Replay)).is_ok()
    }

    /// Empties the persisted ranking.
    pub fn clear_ranking(&self) -> bool {
        self.tx.send(Signal::ClearRanking).is_ok()
    }

    /// Stops [`GameController::run`].
    pub fn shutdown(&self) -> bool {
        self.tx.send(Signal::Shutdown).is_ok()
    }
}

/// Owns one game session.
pub struct GameController<S: KeyValueStore> {
    cfg: GameConfig,
    state: GameState,
    ui: UiSnapshot,
    ranking: RankingStore<S>,

    probe: Arc<dyn LatencyProbe>,
    feedback: Box<dyn FeedbackEmitter>,
    view: Box<dyn GameView>,

    tx: mpsc::UnboundedSender<Signal>,
    rx: mpsc::UnboundedReceiver<Signal>,

    intro_timer: TimerSlot,
    result_timer: TimerSlot,
    probe_task: Option<JoinHandle<()>>,
    /// Bumped on every reset; scheduled signals from older epochs are stale.
    epoch: u64,
}

impl<S: KeyValueStore> GameController<S> {
    pub fn new(
        cfg: GameConfig,
        probe: Arc<dyn LatencyProbe>,
        feedback: Box<dyn FeedbackEmitter>,
        view: Box<dyn GameView>,
        ranking: RankingStore<S>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut ui = UiSnapshot::intro();
        ui.ranking = ranking.entries().to_vec();
        Self {
            cfg,
            state: GameState::Intro,
            ui,
            ranking,
            probe,
            feedback,
            view,
            tx,
            rx,
            intro_timer: TimerSlot::new(),
            result_timer: TimerSlot::new(),
            probe_task: None,
            epoch: 0,
        }
    }

    pub fn input(&self) -> InputHandle {
        InputHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn ui(&self) -> &UiSnapshot {
        &self.ui
    }

    pub fn ranking(&self) -> &RankingStore<S> {
        &self.ranking
    }

    /// Shows the intro screen and schedules the first round.
    pub fn start(&mut self) {
        self.state = GameState::Intro;
        self.ui = UiSnapshot::intro();
        self.ui.ranking = self.ranking.entries().to_vec();
        self.view.render(&self.ui);

        let signal = Signal::Scheduled {
            epoch: self.epoch,
            event: GameEvent::IntroElapsed,
        };
        self.intro_timer
            .schedule(self.cfg.intro_delay(), self.tx.clone(), signal);
        info!(delay_ms = self.cfg.intro_delay_ms, "intro started");
    }

    /// Applies one event. Returns whether it was accepted.
    pub fn handle(&mut self, event: GameEvent) -> bool {
        let Some(Transition { next, effects }) = transition(&self.state, &event) else {
            debug!(state = self.state.as_str(), ?event, "event ignored");
            return false;
        };

        debug!(from = self.state.as_str(), to = next.as_str(), ?event, "transition");
        self.state = next;
        for effect in effects {
            self.apply(effect);
        }
        self.view.render(&self.ui);
        true
    }

    /// Waits for the next signal and applies it. Returns `false` once the
    /// controller has been asked to shut down.
    pub async fn pump(&mut self) -> bool {
        match self.rx.recv().await {
            Some(Signal::Input(event)) => {
                self.handle(event);
                true
            }
            Some(Signal::Scheduled { epoch, event }) => {
                if epoch == self.epoch {
                    self.handle(event);
                } else {
                    debug!(epoch, current = self.epoch, ?event, "stale signal dropped");
                }
                true
            }
            Some(Signal::ClearRanking) => {
                if let Err(err) = self.ranking.clear() {
                    warn!(?err, "failed to persist cleared ranking");
                }
                self.ui.ranking.clear();
                info!("ranking cleared");
                self.view.render(&self.ui);
                true
            }
            Some(Signal::Shutdown) | None => false,
        }
    }

    /// Runs the session until [`InputHandle::shutdown`] is called.
    pub async fn run(mut self) -> RankingStore<S> {
        self.start();
        while self.pump().await {}
        self.stop();
        info!("game stopped");
        self.ranking
    }

    fn stop(&mut self) {
        self.cancel_pending();
        emit_isolated(self.feedback.as_mut(), "stop_ambient", |f| f.stop_ambient());
    }

    fn cancel_pending(&mut self) {
        self.intro_timer.cancel();
        self.result_timer.cancel();
        if let Some(task) = self.probe_task.take() {
            task.abort();
        }
    }

    fn reset_game_state(&mut self) {
        self.cancel_pending();
        self.epoch += 1;
        self.ui.reset_for_round();
        self.ui.ranking = self.ranking.entries().to_vec();
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::ResetRound => self.reset_game_state(),
            Effect::StartAmbient => {
                emit_isolated(self.feedback.as_mut(), "start_ambient", |f| {
                    f.start_ambient()
                });
            }
            Effect::StopAmbient => {
                emit_isolated(self.feedback.as_mut(), "stop_ambient", |f| f.stop_ambient());
            }
            Effect::DisableActivation => {
                self.ui.activation_enabled = false;
                self.ui.status = StatusLight::Yellow;
                self.ui.status_text = STATUS_MEASURING;
            }
            Effect::PlayClick => {
                emit_isolated(self.feedback.as_mut(), "click", |f| f.on_click());
            }
            Effect::StartProbe => self.spawn_probe(),
            Effect::ScheduleResult => {
                let signal = Signal::Scheduled {
                    epoch: self.epoch,
                    event: GameEvent::ResultDelayElapsed,
                };
                self.result_timer
                    .schedule(self.cfg.result_delay(), self.tx.clone(), signal);
            }
            Effect::ShowResult { latency_ms } => {
                let feedback = feedback_for(latency_ms);
                self.ui.screen = Screen::Result;
                self.ui.activation_enabled = false;
                self.ui.replay_visible = true;
                self.ui.latency_ms = Some(latency_ms);
                self.ui.feedback = Some(feedback);
                info!(latency_ms, tier = %feedback.tier, "round complete");
            }
            Effect::RecordSample(latency_ms) => {
                if let Err(err) = self.ranking.record(latency_ms) {
                    warn!(?err, latency_ms, "failed to persist ranking");
                }
                self.ui.ranking = self.ranking.entries().to_vec();
            }
            Effect::PlaySuccess(tier) => {
                emit_isolated(self.feedback.as_mut(), "success", |f| f.on_success_tier(tier));
            }
        }
    }

    fn spawn_probe(&mut self) {
        let probe = Arc::clone(&self.probe);
        let tx = self.tx.clone();
        let epoch = self.epoch;
        self.probe_task = Some(tokio::spawn(async move {
            let latency_ms = measure(probe.as_ref()).await;
            let _ = tx.send(Signal::Scheduled {
                epoch,
                event: GameEvent::ProbeFinished(latency_ms),
            });
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        feedback::NullFeedback,
        probe::FALLBACK_RANGE_MS,
        ranking::RANKING_KEY,
        storage::MemoryStore,
        ui::{NullView, STATUS_READY},
    };
    use anyhow::bail;
    use async_trait::async_trait;
    use std::{sync::Mutex, time::Duration};
    use tokio::time::{self, Instant};

    struct FixedProbe(Duration);

    #[async_trait]
    impl LatencyProbe for FixedProbe {
        async fn probe(&self) -> anyhow::Result<Duration> {
            time::sleep(self.0).await;
            Ok(self.0)
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl LatencyProbe for FailingProbe {
        async fn probe(&self) -> anyhow::Result<Duration> {
            bail!("network unreachable")
        }
    }

    #[derive(Clone, Default)]
    struct RecordingFeedback {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingFeedback {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl FeedbackEmitter for RecordingFeedback {
        fn on_click(&mut self) -> anyhow::Result<()> {
            self.push("click".into());
            Ok(())
        }
        fn on_success_tier(&mut self, tier: Tier) -> anyhow::Result<()> {
            self.push(format!("success:{tier}"));
            Ok(())
        }
        fn start_ambient(&mut self) -> anyhow::Result<()> {
            self.push("ambient:on".into());
            Ok(())
        }
        fn stop_ambient(&mut self) -> anyhow::Result<()> {
            self.push("ambient:off".into());
            Ok(())
        }
    }

    struct BrokenFeedback;

    impl FeedbackEmitter for BrokenFeedback {
        fn on_click(&mut self) -> anyhow::Result<()> {
            panic!("speaker unplugged")
        }
        fn on_success_tier(&mut self, _tier: Tier) -> anyhow::Result<()> {
            bail!("no audio context")
        }
        fn start_ambient(&mut self) -> anyhow::Result<()> {
            bail!("no audio context")
        }
        fn stop_ambient(&mut self) -> anyhow::Result<()> {
            panic!("speaker unplugged")
        }
    }

    fn controller_with(
        probe: Arc<dyn LatencyProbe>,
        feedback: Box<dyn FeedbackEmitter>,
        store: MemoryStore,
    ) -> GameController<MemoryStore> {
        GameController::new(
            GameConfig::default(),
            probe,
            feedback,
            Box::new(NullView),
            RankingStore::load(store),
        )
    }

    fn fixed(ms: u64) -> Arc<dyn LatencyProbe> {
        Arc::new(FixedProbe(Duration::from_millis(ms)))
    }

    async fn pump_until(controller: &mut GameController<MemoryStore>, want: &str) {
        while controller.state().as_str() != want {
            assert!(controller.pump().await, "controller shut down early");
        }
    }

    #[test]
    fn transition_table() {
        let t = transition(&GameState::Intro, &GameEvent::IntroElapsed).unwrap();
        assert_eq!(t.next, GameState::Waiting);
        assert_eq!(t.effects, vec![Effect::ResetRound, Effect::StartAmbient]);

        let t = transition(&GameState::Waiting, &GameEvent::Activate).unwrap();
        assert_eq!(t.next, GameState::Measuring { sample: None });
        assert!(t.effects.contains(&Effect::StartProbe));

        let t = transition(
            &GameState::Measuring { sample: None },
            &GameEvent::ProbeFinished(80),
        )
        .unwrap();
        assert_eq!(t.next, GameState::Measuring { sample: Some(80) });
        assert_eq!(t.effects, vec![Effect::ScheduleResult]);

        let t = transition(
            &GameState::Measuring { sample: Some(80) },
            &GameEvent::ResultDelayElapsed,
        )
        .unwrap();
        assert_eq!(t.next, GameState::Result { latency_ms: 80 });
        assert!(t.effects.contains(&Effect::RecordSample(80)));
        assert!(t.effects.contains(&Effect::PlaySuccess(Tier::Great)));

        let t = transition(&GameState::Result { latency_ms: 80 }, &GameEvent::Replay).unwrap();
        assert_eq!(t.next, GameState::Waiting);
    }

    #[test]
    fn transition_rejects_out_of_order_events() {
        let measuring = GameState::Measuring { sample: None };
        let settled = GameState::Measuring { sample: Some(3) };
        let result = GameState::Result { latency_ms: 3 };

        assert!(transition(&GameState::Intro, &GameEvent::Activate).is_none());
        assert!(transition(&GameState::Waiting, &GameEvent::Replay).is_none());
        assert!(transition(&GameState::Waiting, &GameEvent::ResultDelayElapsed).is_none());
        assert!(transition(&measuring, &GameEvent::Activate).is_none());
        assert!(transition(&measuring, &GameEvent::ResultDelayElapsed).is_none());
        assert!(transition(&settled, &GameEvent::Activate).is_none());
        assert!(transition(&settled, &GameEvent::ProbeFinished(9)).is_none());
        assert!(transition(&result, &GameEvent::Activate).is_none());
        assert!(transition(&result, &GameEvent::IntroElapsed).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn intro_moves_to_waiting_after_delay() {
        let feedback = RecordingFeedback::default();
        let mut controller =
            controller_with(fixed(10), Box::new(feedback.clone()), MemoryStore::new());

        let start = Instant::now();
        controller.start();
        assert_eq!(controller.ui().screen, Screen::Intro);
        assert!(!controller.ui().activation_enabled);

        pump_until(&mut controller, "waiting").await;
        assert!(start.elapsed() >= Duration::from_millis(2_000));
        assert_eq!(controller.ui().screen, Screen::Game);
        assert!(controller.ui().activation_enabled);
        assert_eq!(controller.ui().status, StatusLight::Red);
        assert_eq!(feedback.calls(), vec!["ambient:on"]);
    }

    #[tokio::test(start_paused = true)]
    async fn activation_is_accepted_exactly_once() {
        let mut controller = controller_with(fixed(40), Box::new(NullFeedback), MemoryStore::new());
        controller.start();
        pump_until(&mut controller, "waiting").await;

        assert!(controller.handle(GameEvent::Activate));
        assert_eq!(controller.state(), GameState::Measuring { sample: None });
        assert!(!controller.ui().activation_enabled);
        assert_eq!(controller.ui().status, StatusLight::Yellow);

        let before = controller.ui().clone();
        assert!(!controller.handle(GameEvent::Activate));
        assert!(!controller.handle(GameEvent::Activate));
        assert_eq!(controller.state(), GameState::Measuring { sample: None });
        assert_eq!(controller.ui(), &before);
    }

    #[tokio::test(start_paused = true)]
    async fn full_round_records_probe_latency() {
        let feedback = RecordingFeedback::default();
        let mut controller =
            controller_with(fixed(120), Box::new(feedback.clone()), MemoryStore::new());
        controller.start();
        pump_until(&mut controller, "waiting").await;

        controller.input().activate();
        pump_until(&mut controller, "result").await;

        assert_eq!(controller.state(), GameState::Result { latency_ms: 120 });
        let ui = controller.ui();
        assert_eq!(ui.screen, Screen::Result);
        assert!(ui.replay_visible);
        assert_eq!(ui.latency_ms, Some(120));
        assert_eq!(ui.feedback.map(|f| f.tier), Some(Tier::Good));
        assert_eq!(ui.ranking, vec![120]);
        assert_eq!(controller.ranking().entries(), &[120]);
        assert_eq!(
            feedback.calls(),
            vec!["ambient:on", "click", "success:good"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn result_waits_for_display_delay() {
        let mut controller = controller_with(fixed(30), Box::new(NullFeedback), MemoryStore::new());
        controller.start();
        pump_until(&mut controller, "waiting").await;
        controller.handle(GameEvent::Activate);

        assert!(controller.pump().await);
        assert_eq!(controller.state(), GameState::Measuring { sample: Some(30) });
        let settled_at = Instant::now();

        pump_until(&mut controller, "result").await;
        assert!(settled_at.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_falls_back_and_updates_ranking() {
        let store = MemoryStore::with_value(RANKING_KEY, "[90,150]");
        let mut controller =
            controller_with(Arc::new(FailingProbe), Box::new(NullFeedback), store);
        controller.start();
        pump_until(&mut controller, "waiting").await;
        controller.handle(GameEvent::Activate);
        pump_until(&mut controller, "result").await;

        let latency = controller.state().last_latency_ms().unwrap();
        assert!(FALLBACK_RANGE_MS.contains(&latency));
        assert_eq!(controller.ranking().entries(), &[latency, 90, 150]);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_returns_to_waiting_with_activation_enabled() {
        let feedback = RecordingFeedback::default();
        let mut controller =
            controller_with(fixed(60), Box::new(feedback.clone()), MemoryStore::new());
        controller.start();
        pump_until(&mut controller, "waiting").await;
        controller.handle(GameEvent::Activate);
        pump_until(&mut controller, "result").await;

        assert!(controller.handle(GameEvent::Replay));
        assert_eq!(controller.state(), GameState::Waiting);
        let ui = controller.ui();
        assert_eq!(ui.screen, Screen::Game);
        assert!(ui.activation_enabled);
        assert!(!ui.replay_visible);
        assert_eq!(ui.status_text, STATUS_READY);
        assert_eq!(ui.latency_ms, None);
        assert_eq!(ui.ranking, vec![60]);
        assert_eq!(
            feedback.calls()[3..],
            ["ambient:off".to_string(), "ambient:on".to_string()]
        );

        // Second round lands in the ranking too.
        controller.handle(GameEvent::Activate);
        pump_until(&mut controller, "result").await;
        assert_eq!(controller.ranking().entries(), &[60, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_scheduled_signal_is_dropped() {
        let mut controller = controller_with(fixed(10), Box::new(NullFeedback), MemoryStore::new());
        controller.start();
        // Skip the intro by hand; the reset cancels the intro timer.
        controller.handle(GameEvent::IntroElapsed);
        assert_eq!(controller.state(), GameState::Waiting);
        assert!(!controller.intro_timer.is_pending());

        controller
            .tx
            .send(Signal::Scheduled {
                epoch: 0,
                event: GameEvent::Activate,
            })
            .unwrap();
        assert!(controller.pump().await);
        assert_eq!(controller.state(), GameState::Waiting);

        // Nothing else is queued: the cancelled intro timer never fires.
        let next = time::timeout(Duration::from_secs(10), controller.pump()).await;
        assert!(next.is_err());
        assert_eq!(controller.state(), GameState::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn broken_feedback_never_blocks_the_round() {
        let mut controller = controller_with(fixed(250), Box::new(BrokenFeedback), MemoryStore::new());
        controller.start();
        pump_until(&mut controller, "waiting").await;
        controller.handle(GameEvent::Activate);
        pump_until(&mut controller, "result").await;

        assert_eq!(controller.state(), GameState::Result { latency_ms: 250 });
        assert_eq!(controller.ui().feedback.map(|f| f.tier), Some(Tier::Poor));
        assert!(controller.handle(GameEvent::Replay));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown_and_returns_ranking() {
        let feedback = RecordingFeedback::default();
        let controller =
            controller_with(fixed(15), Box::new(feedback.clone()), MemoryStore::new());
        let input = controller.input();
        let task = tokio::spawn(controller.run());

        time::sleep(Duration::from_millis(2_100)).await;
        input.activate();
        time::sleep(Duration::from_millis(1_000)).await;
        input.clear_ranking();
        input.shutdown();

        let ranking = task.await.unwrap();
        assert!(ranking.is_empty());
        assert_eq!(feedback.calls().last().map(String::as_str), Some("ambient:off"));
    }
}
