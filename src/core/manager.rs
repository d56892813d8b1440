//! Match manager - owns both boards and the match lifecycle.
//!
//! A match runs Countdown -> Playing rounds until its loop exits, at which
//! point it is PermanentlyOver. Each round deals the next slice of the
//! deterministically shuffled question pool. The match loop is the only task
//! that mutates match-level state: it starts rounds, routes attacks between
//! the boards, reacts to board exits, and serializes snapshots while holding
//! every board's lock.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::core::board::{Board, BoardLinks, BoardState};
use crate::core::question::Question;
use crate::core::rng::MatchShuffler;
use crate::core::snapshot::{BoardSnapshot, MatchSnapshot};
use crate::core::timer;
use crate::provider::{ProviderError, QuestionProvider};
use crate::types::{
    MatchStatus, ATTACK_ROUTER_CAP, INIT_COUNTDOWN, NEXT_COUNTDOWN, N_PLAYERS, TOTAL_QUESTIONS,
};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("player {0} is not in this match")]
    PlayerNotInMatch(String),
    #[error("the match has not started yet")]
    NotStarted,
    #[error("countdown already started")]
    AlreadyStarted,
    #[error("cannot destroy an ongoing match")]
    MatchInProgress,
    #[error("too few questions left")]
    TooFewQuestions,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// State shared between the public handle and the match loop. Status and the
/// board list are the only fields the external surface reads; everything
/// else is owned by the loop.
struct MatchShared {
    id: String,
    players: Vec<String>,
    status: Mutex<MatchStatus>,
    boards: Mutex<Vec<Board>>,
}

impl MatchShared {
    fn status(&self) -> MatchStatus {
        *self.status.lock().expect("match status lock poisoned")
    }

    fn set_status(&self, status: MatchStatus) {
        *self.status.lock().expect("match status lock poisoned") = status;
    }

    fn boards(&self) -> MutexGuard<'_, Vec<Board>> {
        self.boards.lock().expect("match boards lock poisoned")
    }
}

/// Public handle to a match. Created by the session layer; interacts with
/// the running loop only through channels and the shared state above.
pub struct Match {
    shared: Arc<MatchShared>,
    stop_tx: mpsc::Sender<()>,
    runner: Mutex<Option<MatchRunner>>,
}

impl Match {
    /// Build a match. Nothing runs until [`Match::start_game_countdown`].
    pub fn new(
        search_criteria: Vec<u8>,
        players: Vec<String>,
        provider: Arc<dyn QuestionProvider>,
        id: String,
        snapshot_out: mpsc::Sender<Vec<u8>>,
        seed: [u8; 32],
    ) -> Self {
        let shared = Arc::new(MatchShared {
            id,
            players,
            status: Mutex::new(MatchStatus::Countdown),
            boards: Mutex::new(Vec::new()),
        });
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (state_change_tx, state_change_rx) = mpsc::channel(1);
        let (attack_tx, attack_rx) = mpsc::channel(ATTACK_ROUTER_CAP);
        let (exited_tx, exited_rx) = mpsc::channel(N_PLAYERS);

        let runner = MatchRunner {
            shared: Arc::clone(&shared),
            provider,
            search_criteria,
            seed,
            question_offset: 0,
            snapshot_out,
            state_change_tx,
            state_change_rx,
            attack_tx,
            attack_rx,
            exited_tx,
            exited_rx,
            stop_rx,
            exited_boards: Vec::new(),
        };

        Self {
            shared,
            stop_tx,
            runner: Mutex::new(Some(runner)),
        }
    }

    /// Schedule the initial countdown and start the match loop task. May be
    /// called once.
    pub fn start_game_countdown(&self) -> Result<(), MatchError> {
        let runner = self
            .runner
            .lock()
            .expect("match runner lock poisoned")
            .take()
            .ok_or(MatchError::AlreadyStarted)?;
        tokio::spawn(runner.run(INIT_COUNTDOWN));
        Ok(())
    }

    /// Forward a guess to the board owned by `player`.
    pub fn guess(&self, player: &str, guess: &str) -> Result<(), MatchError> {
        let Some(idx) = self.shared.players.iter().position(|p| p == player) else {
            return Err(MatchError::PlayerNotInMatch(player.to_string()));
        };
        match self.shared.boards().get(idx) {
            Some(board) => {
                board.guess(guess);
                Ok(())
            }
            None => Err(MatchError::NotStarted),
        }
    }

    /// Destroy a match that has not started playing. An active game may not
    /// be destroyed from outside; it ends naturally.
    pub fn try_destroy(&self) -> Result<(), MatchError> {
        if self.shared.status() != MatchStatus::Countdown {
            return Err(MatchError::MatchInProgress);
        }
        self.stop();
        for board in self.shared.boards().iter() {
            board.quit();
        }
        Ok(())
    }

    /// Ask the match loop to exit.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn players(&self) -> &[String] {
        &self.shared.players
    }

    pub fn status(&self) -> MatchStatus {
        self.shared.status()
    }

    /// Debug helper: a random remaining answer from one board's slots. None
    /// when that board does not exist (yet).
    pub fn random_word(&self, board_idx: usize, sometimes_wrong: bool) -> Option<String> {
        self.shared
            .boards()
            .get(board_idx)
            .map(|b| b.random_word(sometimes_wrong))
    }
}

/// The match loop's state, moved into its task by `start_game_countdown`.
struct MatchRunner {
    shared: Arc<MatchShared>,
    provider: Arc<dyn QuestionProvider>,
    search_criteria: Vec<u8>,
    seed: [u8; 32],
    question_offset: usize,
    snapshot_out: mpsc::Sender<Vec<u8>>,
    state_change_tx: mpsc::Sender<()>,
    state_change_rx: mpsc::Receiver<()>,
    attack_tx: mpsc::Sender<Question>,
    attack_rx: mpsc::Receiver<Question>,
    exited_tx: mpsc::Sender<usize>,
    exited_rx: mpsc::Receiver<usize>,
    stop_rx: mpsc::Receiver<()>,
    exited_boards: Vec<bool>,
}

impl MatchRunner {
    async fn run(mut self, countdown: Duration) {
        info!(gid = %self.shared.id, "start match loop");
        let mut countdown_deadline = Some(Instant::now() + countdown);

        loop {
            tokio::select! {
                _ = timer(countdown_deadline) => {
                    countdown_deadline = None;
                    if self.shared.status() == MatchStatus::Countdown {
                        if let Err(e) = self.start_round().await {
                            error!(gid = %self.shared.id, error = %e, "start-error");
                            break;
                        }
                    }
                }

                Some(question) = self.attack_rx.recv() => {
                    // Two players: the attack goes to the owner's opponent.
                    debug_assert!(question.owner() < N_PLAYERS);
                    let opponent = 1 - question.owner();
                    let sender = self.shared.boards().get(opponent).map(|b| b.attack_sender());
                    if let Some(sender) = sender {
                        let _ = sender.send(question).await;
                    }
                }

                Some(()) = self.state_change_rx.recv() => {
                    self.emit_snapshot().await;
                }

                Some(idx) = self.exited_rx.recv() => {
                    debug!(gid = %self.shared.id, board = idx, "board exited");
                    if let Some(flag) = self.exited_boards.get_mut(idx) {
                        *flag = true;
                    }
                    if self.exited_boards.iter().all(|&done| done) {
                        // The round is fully over; count down to a rematch.
                        countdown_deadline = Some(Instant::now() + NEXT_COUNTDOWN);
                        self.shared.set_status(MatchStatus::Countdown);
                    } else {
                        // First exit ends the round for everyone else too.
                        for (i, board) in self.shared.boards().iter().enumerate() {
                            if i != idx {
                                board.set_quitting();
                            }
                        }
                    }
                }

                _ = self.stop_rx.recv() => break,
            }
        }

        self.shared.set_status(MatchStatus::PermanentlyOver);
        self.emit_snapshot().await;
        info!(gid = %self.shared.id, "leaving match loop");
    }

    /// Deal the next round: reshuffle the full pool with the match seed,
    /// take the next `TOTAL_QUESTIONS` past the offset, split them by index
    /// parity, and bring up fresh boards.
    async fn start_round(&mut self) -> Result<(), MatchError> {
        let mut shuffler = MatchShuffler::new(self.seed);
        self.exited_boards = vec![false; self.shared.players.len()];

        let mut alphagrams = self.provider.search(&self.search_criteria).await?;
        shuffler.shuffle(&mut alphagrams);

        if alphagrams.len() < self.question_offset + TOTAL_QUESTIONS {
            return Err(MatchError::TooFewQuestions);
        }
        let round = &alphagrams[self.question_offset..self.question_offset + TOTAL_QUESTIONS];

        let mut queues: Vec<Vec<Question>> = self
            .shared
            .players
            .iter()
            .map(|_| Vec::new())
            .collect();
        for (idx, alphagram) in round.iter().enumerate() {
            let owner = idx % 2;
            queues[owner].push(Question::new(alphagram, owner));
        }
        self.question_offset += TOTAL_QUESTIONS;

        // Re-allocate the boards. Each spawn runs its first scheduling tick
        // synchronously before its loop task starts selecting.
        let boards: Vec<Board> = queues
            .into_iter()
            .enumerate()
            .map(|(idx, queue)| {
                Board::spawn(
                    idx,
                    queue,
                    BoardLinks {
                        attacks_out: self.attack_tx.clone(),
                        state_change: self.state_change_tx.clone(),
                        exited: self.exited_tx.clone(),
                    },
                )
            })
            .collect();
        *self.shared.boards() = boards;

        self.shared.set_status(MatchStatus::Playing);
        let _ = self.state_change_tx.try_send(());
        Ok(())
    }

    /// Serialize the whole match under every board's lock and publish it.
    /// Locks are taken in board order and released in reverse; the send
    /// happens after all locks are dropped.
    async fn emit_snapshot(&self) {
        let status = self.shared.status();
        let bytes = {
            let boards = self.shared.boards();
            let mut guards: Vec<MutexGuard<'_, BoardState>> = boards
                .iter()
                .map(|b| b.state().lock().expect("board state lock poisoned"))
                .collect();

            let snapshot = MatchSnapshot {
                id: self.shared.id.clone(),
                players: self.shared.players.clone(),
                status,
                question_offset: self.question_offset,
                boards: guards.iter().map(|g| BoardSnapshot::from(&**g)).collect(),
            };
            let bytes = serde_json::to_vec(&snapshot).expect("snapshot serialization failed");

            while let Some(guard) = guards.pop() {
                drop(guard);
            }
            bytes
        };
        let _ = self.snapshot_out.send(bytes).await;
    }
}
