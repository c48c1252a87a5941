//! Single-writer session runtime
//!
//! One tokio task owns the [`GameSession`]. Player input arrives as
//! [`Command`]s over a channel; the fall loop and the one-second countdown
//! are deadlines inside the same task, so input and ticks can never
//! interleave. After every event the task publishes a fresh
//! [`SessionSnapshot`] on a watch channel.

use crate::nback::{Declaration, Judgment};
use crate::session::{GameSession, SessionSnapshot};
use crate::tetromino::RotationDirection;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

/// Countdown cadence
const SECOND: Duration = Duration::from_secs(1);

/// Messages from handles to the session task
#[derive(Debug)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Reset,
    IncreaseNBackLevel,
    DecreaseNBackLevel,
    IncreaseGameDuration,
    DecreaseGameDuration,
    MoveLeft,
    MoveRight,
    Rotate(RotationDirection),
    SoftDrop {
        respond: oneshot::Sender<bool>,
    },
    HardDrop,
    Declare {
        declaration: Declaration,
        respond: oneshot::Sender<Option<Judgment>>,
    },
    /// Reply once everything sent before it is applied and published
    Flush {
        respond: oneshot::Sender<()>,
    },
    Shutdown,
}

/// The session task has stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClosed;

impl fmt::Display for SessionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("game session task has stopped")
    }
}

impl std::error::Error for SessionClosed {}

/// Cloneable front door to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Move `session` into a new task on the current tokio runtime.
    /// A session that is already running starts falling right away.
    /// The task ends on [`SessionHandle::shutdown`] or when every handle
    /// has been dropped.
    pub fn spawn(session: GameSession) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let mut actor = SessionActor {
            session,
            rx,
            snapshots: snapshot_tx,
            fall_at: None,
            second_at: None,
            second_carry: Duration::ZERO,
        };
        if actor.session.is_running() {
            actor.schedule(Instant::now());
        }
        let task = tokio::spawn(actor.run());
        let handle = SessionHandle {
            tx,
            snapshots: snapshot_rx,
        };
        (handle, task)
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.tx.send(command).map_err(|_| SessionClosed)
    }

    pub fn start(&self) -> Result<(), SessionClosed> {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> Result<(), SessionClosed> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), SessionClosed> {
        self.send(Command::Resume)
    }

    pub fn reset(&self) -> Result<(), SessionClosed> {
        self.send(Command::Reset)
    }

    pub fn increase_n_back_level(&self) -> Result<(), SessionClosed> {
        self.send(Command::IncreaseNBackLevel)
    }

    pub fn decrease_n_back_level(&self) -> Result<(), SessionClosed> {
        self.send(Command::DecreaseNBackLevel)
    }

    pub fn increase_game_duration(&self) -> Result<(), SessionClosed> {
        self.send(Command::IncreaseGameDuration)
    }

    pub fn decrease_game_duration(&self) -> Result<(), SessionClosed> {
        self.send(Command::DecreaseGameDuration)
    }

    pub fn move_left(&self) -> Result<(), SessionClosed> {
        self.send(Command::MoveLeft)
    }

    pub fn move_right(&self) -> Result<(), SessionClosed> {
        self.send(Command::MoveRight)
    }

    pub fn rotate(&self, direction: RotationDirection) -> Result<(), SessionClosed> {
        self.send(Command::Rotate(direction))
    }

    pub fn hard_drop(&self) -> Result<(), SessionClosed> {
        self.send(Command::HardDrop)
    }

    /// Move down one row; resolves to whether the piece moved
    pub async fn soft_drop(&self) -> Result<bool, SessionClosed> {
        let (respond, rx) = oneshot::channel();
        self.send(Command::SoftDrop { respond })?;
        rx.await.map_err(|_| SessionClosed)
    }

    pub async fn declare(&self, declaration: Declaration) -> Result<Option<Judgment>, SessionClosed> {
        let (respond, rx) = oneshot::channel();
        self.send(Command::Declare {
            declaration,
            respond,
        })?;
        rx.await.map_err(|_| SessionClosed)
    }

    pub async fn declare_match(&self) -> Result<Option<Judgment>, SessionClosed> {
        self.declare(Declaration::Match).await
    }

    pub async fn declare_no_match(&self) -> Result<Option<Judgment>, SessionClosed> {
        self.declare(Declaration::NoMatch).await
    }

    /// Resolves once every earlier command shows in [`SessionHandle::snapshot`]
    pub async fn flush(&self) -> Result<(), SessionClosed> {
        let (respond, rx) = oneshot::channel();
        self.send(Command::Flush { respond })?;
        rx.await.map_err(|_| SessionClosed)
    }

    pub fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(Command::Shutdown)
    }
}

struct SessionActor {
    session: GameSession,
    rx: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
    /// Next fall tick; `None` while the fall loop is cancelled
    fall_at: Option<Instant>,
    /// Next countdown second; `None` while the countdown is cancelled
    second_at: Option<Instant>,
    /// Part of the current second already elapsed when the countdown was
    /// last cancelled by a pause
    second_carry: Duration,
}

/// Sleep until `deadline`, or forever if there is none
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl SessionActor {
    async fn run(mut self) {
        debug!("session task started");
        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = wait_for(self.fall_at) => self.fall_tick(),
                _ = wait_for(self.second_at) => self.countdown_tick(),
            }

            if !self.session.is_running() {
                self.fall_at = None;
                self.second_at = None;
            }
            self.publish();
        }
        debug!("session task stopped");
    }

    fn handle(&mut self, command: Command) {
        trace!(?command, "command");
        let now = Instant::now();
        match command {
            Command::Start => {
                if self.session.start() {
                    self.second_carry = Duration::ZERO;
                    self.schedule(now);
                }
            }
            Command::Pause => {
                if self.session.pause() {
                    let left = self
                        .second_at
                        .map_or(SECOND, |at| at.saturating_duration_since(now));
                    self.second_carry = SECOND.saturating_sub(left);
                    self.fall_at = None;
                    self.second_at = None;
                }
            }
            Command::Resume => {
                if self.session.resume() {
                    self.schedule(now);
                }
            }
            Command::Reset => {
                self.session.reset();
                self.second_carry = Duration::ZERO;
            }
            Command::IncreaseNBackLevel => {
                self.session.increase_n_back_level();
            }
            Command::DecreaseNBackLevel => {
                self.session.decrease_n_back_level();
            }
            Command::IncreaseGameDuration => {
                self.session.increase_game_duration();
            }
            Command::DecreaseGameDuration => {
                self.session.decrease_game_duration();
            }
            Command::MoveLeft => {
                self.session.move_left();
            }
            Command::MoveRight => {
                self.session.move_right();
            }
            Command::Rotate(direction) => {
                self.session.rotate(direction);
            }
            Command::SoftDrop { respond } => {
                let moved = self.session.soft_drop();
                self.publish();
                let _ = respond.send(moved);
            }
            Command::HardDrop => {
                self.session.hard_drop();
            }
            Command::Declare {
                declaration,
                respond,
            } => {
                let judgment = self.session.declare(declaration);
                self.publish();
                let _ = respond.send(judgment);
            }
            Command::Flush { respond } => {
                self.publish();
                let _ = respond.send(());
            }
            Command::Shutdown => {}
        }
    }

    /// Arm both activities, the countdown resuming mid-second if a pause
    /// interrupted it
    fn schedule(&mut self, now: Instant) {
        self.fall_at = Some(now + self.session.fall_interval());
        self.second_at = Some(now + SECOND.saturating_sub(self.second_carry));
        self.second_carry = Duration::ZERO;
    }

    fn fall_tick(&mut self) {
        let outcome = self.session.tick();
        trace!(?outcome, "fall tick");
        // Re-read the interval so a speed-up applies to the very next tick
        self.fall_at = Some(Instant::now() + self.session.fall_interval());
    }

    fn countdown_tick(&mut self) {
        self.session.countdown_tick();
        // Step from the previous deadline rather than from now so late
        // wake-ups don't accumulate
        self.second_at = self.second_at.map(|at| at + SECOND);
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{GameState, SessionConfig};
    use tokio::time::sleep;

    fn spawn_session() -> (SessionHandle, JoinHandle<()>) {
        SessionHandle::spawn(GameSession::with_seed(SessionConfig::default(), 5))
    }

    fn row(handle: &SessionHandle) -> i32 {
        handle.snapshot().current.map(|active| active.position.row).unwrap_or(-1)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fall_loop_moves_piece() {
        let (handle, _task) = spawn_session();
        handle.start().unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.snapshot().state, GameState::Running);
        assert_eq!(row(&handle), 0);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(row(&handle), 1);
        assert_eq!(handle.snapshot().time_remaining_secs, 59);

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(row(&handle), 3);
        assert_eq!(handle.snapshot().time_remaining_secs, 57);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_up_applies_to_next_fall() {
        let mut session = GameSession::with_seed(SessionConfig::default(), 5);
        session.start();
        session.score_mut().points = 990;
        let (handle, _task) = SessionHandle::spawn(session);

        // The lock awards at least 20 and crosses 1000
        handle.hard_drop().unwrap();
        handle.flush().await.unwrap();
        assert_eq!(handle.snapshot().fall_interval_ms, 850);
        assert_eq!(row(&handle), 0);

        // The tick armed before the speed-up still fires at 1000ms
        sleep(Duration::from_millis(1010)).await;
        assert_eq!(row(&handle), 1);

        // The next one comes 850ms after it, well before 2000ms
        sleep(Duration::from_millis(890)).await;
        assert_eq!(row(&handle), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ends_game() {
        let (handle, _task) = spawn_session();
        handle.start().unwrap();
        sleep(Duration::from_millis(60_500)).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state, GameState::GameOver);
        assert_eq!(snapshot.time_remaining_secs, 0);

        // Nothing keeps running after game over
        let frozen = handle.snapshot();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.snapshot(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_and_resume_carries_remainder() {
        let (handle, _task) = spawn_session();
        handle.start().unwrap();
        sleep(Duration::from_millis(600)).await;
        handle.pause().unwrap();
        sleep(Duration::from_secs(10)).await;

        let paused = handle.snapshot();
        assert_eq!(paused.state, GameState::Paused);
        assert_eq!(paused.time_remaining_secs, 60);
        assert_eq!(row(&handle), 0);

        handle.resume().unwrap();
        // 600ms of the first second were already spent
        sleep(Duration::from_millis(500)).await;
        assert_eq!(handle.snapshot().time_remaining_secs, 59);
        // The fall loop restarts with a full interval
        assert_eq!(row(&handle), 0);
        sleep(Duration::from_millis(600)).await;
        assert_eq!(row(&handle), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replies_and_rejections() {
        let (handle, _task) = spawn_session();
        // Not running yet
        assert_eq!(handle.soft_drop().await, Ok(false));
        assert_eq!(handle.declare_match().await, Ok(None));

        handle.start().unwrap();
        assert_eq!(handle.soft_drop().await, Ok(true));
        let judgment = handle.declare_no_match().await.unwrap().unwrap();
        assert!(judgment.correct);
        assert_eq!(handle.declare_match().await, Ok(None));
        assert_eq!(handle.snapshot().streak, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_snapshot_is_current_after_reply() {
        let config = SessionConfig {
            initial_fall_interval: Duration::from_secs(60),
            ..SessionConfig::default()
        };
        for seed in 0..100 {
            let (handle, task) = SessionHandle::spawn(GameSession::with_seed(config.clone(), seed));
            handle.start().unwrap();
            handle.flush().await.unwrap();
            assert_eq!(row(&handle), 0);

            assert_eq!(handle.soft_drop().await, Ok(true));
            assert_eq!(row(&handle), 1);

            assert!(handle.declare_no_match().await.unwrap().is_some());
            assert!(handle.snapshot().judgment_made);

            handle.move_right().unwrap();
            handle.flush().await.unwrap();
            assert_eq!(handle.snapshot().current.map(|active| active.position.col), Some(4));

            handle.shutdown().unwrap();
            task.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_level_changes_only_before_start() {
        let (handle, _task) = spawn_session();
        handle.increase_n_back_level().unwrap();
        handle.increase_n_back_level().unwrap();
        handle.decrease_game_duration().unwrap();
        handle.start().unwrap();
        handle.increase_n_back_level().unwrap();
        sleep(Duration::from_millis(10)).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.n_back_level, 3);
        assert_eq!(snapshot.game_duration_secs, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_changes() {
        let (handle, _task) = spawn_session();
        let mut updates = handle.subscribe();
        updates.borrow_and_update();
        handle.start().unwrap();
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().state, GameState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_stops_activities() {
        let (handle, _task) = spawn_session();
        handle.start().unwrap();
        handle.hard_drop().unwrap();
        sleep(Duration::from_millis(2500)).await;
        handle.reset().unwrap();
        sleep(Duration::from_secs(5)).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state, GameState::NotStarted);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.time_remaining_secs, 60);
        assert!(snapshot.current.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_handle() {
        let (handle, task) = spawn_session();
        handle.shutdown().unwrap();
        task.await.unwrap();
        assert_eq!(handle.start(), Err(SessionClosed));
        assert_eq!(handle.soft_drop().await, Err(SessionClosed));
    }
}
