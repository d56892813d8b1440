//! Board module - one player's column and its drop scheduler.
//!
//! Slots are ordered from top (index 0) to bottom. A board owns its player
//! queue (popped from the tail), the attack queue sent over by the opponent
//! (popped from the head), and a three-state drop machine. `BoardState` is a
//! synchronous state machine; `Board` wraps it in a spawned task that selects
//! over the two timers, the guess channel, the attack inbox, and a stop
//! signal. The per-board lock exists so the match loop can serialize a
//! consistent snapshot while the board task is between events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::core::question::{alphagrammize, Question};
use crate::core::timer;
use crate::types::{
    BoardStatus, StateChange, StateChangeType, ATTACK_DELAY, ATTACK_INBOX_CAP, GUESS_CHANNEL_CAP,
    NUM_SLOTS, TICK_DURATION,
};

/// Result of applying one guess to a board.
#[derive(Debug)]
pub struct GuessOutcome {
    /// Whether the guess changed anything worth snapshotting.
    pub state_changed: bool,
    /// New main-timer duration, when the guess rescheduled the drop.
    pub reschedule: Option<Duration>,
    /// An owner-solved question to forward to the opponent, answers restored.
    pub recycled: Option<Question>,
}

impl GuessOutcome {
    fn unchanged(state_changed: bool) -> Self {
        Self {
            state_changed,
            reschedule: None,
            recycled: None,
        }
    }
}

/// A single player's column. All mutation happens on the board task (or in
/// synchronous tests); the match loop only locks it to read a snapshot.
#[derive(Debug)]
pub struct BoardState {
    pub slots: [Option<Question>; NUM_SLOTS],
    /// The player's own pending pieces, popped from the tail.
    pub queue: Vec<Question>,
    /// Pieces sent by the opponent, drained from the head.
    pub attack_queue: VecDeque<Question>,
    /// Slot index of the piece currently in flight, or -1.
    pub faller_pos: i32,
    pub status: BoardStatus,
    pub solved: u32,
    pub dead: bool,
    pub won: bool,
    pub quitting: bool,
    /// Set when the attack-delay timer has fired; the next eligible tick
    /// drains the attack queue instead of releasing a piece.
    pub attacks_ready: bool,
    pub last_change: Option<StateChange>,
    idx: usize,
}

impl BoardState {
    pub fn new(idx: usize, queue: Vec<Question>) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            queue,
            attack_queue: VecDeque::new(),
            faller_pos: -1,
            status: BoardStatus::PieceDropping,
            solved: 0,
            dead: false,
            won: false,
            quitting: false,
            attacks_ready: false,
            last_change: None,
            idx,
        }
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    /// The topmost occupied slot index, not counting the faller; `NUM_SLOTS`
    /// if the stack is empty. This is the deepest slot the faller may reach.
    pub fn top_of_stack(&self) -> usize {
        for i in 0..NUM_SLOTS {
            if self.slots[i].is_some() && i as i32 != self.faller_pos {
                return i;
            }
        }
        NUM_SLOTS
    }

    /// Pop the next piece off the player queue into the top slot.
    fn release_next_piece(&mut self) -> bool {
        match self.queue.pop() {
            Some(next) => {
                self.slots[0] = Some(next);
                true
            }
            None => false,
        }
    }

    /// Advance the board by one timer fire. Returns the duration to arm the
    /// main timer with, or None when the board should not tick again
    /// (dead, or an error path).
    pub fn tick(&mut self) -> Option<Duration> {
        let top_of_stack;
        match self.status {
            BoardStatus::PieceDropping => {
                top_of_stack = self.top_of_stack();
                if top_of_stack == 0 {
                    debug!(idx = self.idx, "stack-full-losing");
                    self.dead = true;
                    self.last_change = Some(StateChange::new(StateChangeType::Lost));
                    return None;
                }

                if self.faller_pos == -1 {
                    self.release_next_piece();
                }
                self.faller_pos += 1;
            }
            BoardStatus::PieceAboutToDrop | BoardStatus::PlayerQueueEmpty => {
                if self.attacks_ready {
                    if self.attack_queue.is_empty() {
                        error!(idx = self.idx, "attack-queue-empty-but-ready");
                    } else {
                        let added = self.drain_attacks();
                        self.attacks_ready = false;
                        if self.dead {
                            self.last_change = Some(StateChange::new(StateChangeType::Lost));
                            return None;
                        }
                        // Give the player a breather before the next piece;
                        // the status stays PieceAboutToDrop.
                        self.last_change = Some(StateChange::with_num(
                            StateChangeType::StackRise,
                            added as i32,
                        ));
                        return Some(TICK_DURATION);
                    }
                }
                if self.queue.is_empty() {
                    self.status = BoardStatus::PlayerQueueEmpty;
                    return Some(TICK_DURATION);
                }
                top_of_stack = self.top_of_stack();
                if top_of_stack == 0 {
                    debug!(idx = self.idx, "about-to-drop-stack-full-losing");
                    self.dead = true;
                    self.last_change = Some(StateChange::new(StateChangeType::Lost));
                    return None;
                }
                self.release_next_piece();
                self.faller_pos = 0;
            }
        }

        let faller = self.faller_pos;
        if faller + 1 == top_of_stack as i32 {
            // Landed naturally.
            self.last_change = Some(StateChange::with_nums(
                StateChangeType::PieceLand,
                faller,
                faller - 1,
            ));
            if faller > 0 {
                self.slots.swap(faller as usize - 1, faller as usize);
            }
            // A landing at the very top gets a more lenient pause.
            let pause = if faller == 0 {
                TICK_DURATION
            } else {
                TICK_DURATION / 4
            };
            self.faller_pos = -1;
            self.status = BoardStatus::PieceAboutToDrop;
            Some(pause)
        } else if faller == 0 && top_of_stack == 0 {
            debug!(idx = self.idx, "no-space-for-faller-losing");
            self.dead = true;
            self.last_change = Some(StateChange::new(StateChangeType::Lost));
            None
        } else {
            // Still in the air; drop the piece down a slot.
            if faller > 0 {
                self.slots.swap(faller as usize - 1, faller as usize);
            }
            self.last_change = Some(StateChange::with_nums(
                StateChangeType::PieceFall,
                faller,
                faller - 1,
            ));
            self.status = BoardStatus::PieceDropping;
            Some(TICK_DURATION)
        }
    }

    /// Drain the entire attack queue onto the board, shifting the stack up
    /// one slot per attack. Sets `dead` when the top slot is occupied with
    /// attacks still pending. Returns how many attacks were placed.
    fn drain_attacks(&mut self) -> usize {
        let mut added = 0;
        while let Some(next) = self.attack_queue.pop_front() {
            for i in 1..NUM_SLOTS {
                self.slots.swap(i, i - 1);
            }
            self.slots[NUM_SLOTS - 1] = Some(next);
            if self.slots[0].is_some() && !self.attack_queue.is_empty() {
                debug!(idx = self.idx, "attack-queue-overflow-losing");
                self.dead = true;
            }
            added += 1;
        }
        added
    }

    /// Append an incoming attack. Returns true when this was the first
    /// element, i.e. the caller should start the attack-delay timer.
    pub fn queue_attack(&mut self, question: Question) -> bool {
        let start_timer = self.attack_queue.is_empty();
        self.attack_queue.push_back(question);
        self.last_change = Some(StateChange::with_num(
            StateChangeType::StackQueue,
            self.attack_queue.len() as i32,
        ));
        start_timer
    }

    /// Resolve one guess against the board.
    ///
    /// Walks the slots top to bottom: a guess that matches a remaining answer
    /// is consumed by the first such slot; a guess whose letters match the
    /// faller without being an answer is a punishable mistake, unless a
    /// partial hit elsewhere overrides it.
    pub fn handle_guess(&mut self, guess: &str) -> GuessOutcome {
        let guess = guess.trim().to_lowercase();

        let mut partially_solved = false;
        let mut fully_solved_slot: Option<usize> = None;
        let mut punishable_mistake = false;
        let mut state_changed = false;

        for slot in 0..NUM_SLOTS {
            let Some(question) = self.slots[slot].as_mut() else {
                continue;
            };
            let (partial, fully, wrong) = question.solve(&guess);
            partially_solved = partial;
            if fully {
                fully_solved_slot = Some(slot);
            }
            if partial {
                state_changed = true;
                break;
            }
            if wrong && slot as i32 == self.faller_pos {
                state_changed = true;
                punishable_mistake = true;
            }
        }

        if !partially_solved && punishable_mistake {
            // The guess solved nothing anywhere: land the faller immediately
            // and bring up the next piece on a short timer.
            let top_of_stack = self.top_of_stack();
            if top_of_stack == 0 {
                // The piece should not have been in flight at all.
                error!(idx = self.idx, "bad-condition-top-of-stack-0");
                self.dead = true;
                self.last_change = Some(StateChange::new(StateChangeType::Lost));
                return GuessOutcome::unchanged(state_changed);
            }
            let faller = self.faller_pos;
            self.slots.swap(faller as usize, top_of_stack - 1);
            self.last_change = Some(StateChange::with_nums(
                StateChangeType::PieceLand,
                top_of_stack as i32 - 1,
                faller,
            ));
            self.faller_pos = -1;
            self.status = BoardStatus::PieceAboutToDrop;
            return GuessOutcome {
                state_changed,
                reschedule: Some(TICK_DURATION / 4),
                recycled: None,
            };
        }

        let mut recycled = None;
        if let Some(slot) = fully_solved_slot {
            if let Some(mut question) = self.slots[slot].take() {
                // Solving one's own question sends it to the opponent with
                // its answers restored.
                if question.owner() == self.idx {
                    question.repopulate();
                    recycled = Some(question);
                }
            }
            self.solved += 1;
            self.last_change = Some(StateChange::with_num(
                StateChangeType::FullySolveQuestion,
                slot as i32,
            ));

            if self.faller_pos == slot as i32 {
                // Solved the faller itself; short timer for the next piece.
                self.faller_pos = -1;
                self.status = BoardStatus::PieceAboutToDrop;
                return GuessOutcome {
                    state_changed,
                    reschedule: Some(TICK_DURATION / 4),
                    recycled,
                };
            }

            // Shift the settled pieces directly above the solved slot down.
            if slot > 0 {
                let mut last = slot - 1;
                while last > 0 && self.slots[last].is_some() && last as i32 != self.faller_pos {
                    self.slots.swap(last, last + 1);
                    last -= 1;
                }
            }

            // Purposefully not checking whether the attack queue is empty.
            if self.queue.is_empty() && self.slots.iter().all(|s| s.is_none()) {
                self.won = true;
            }
        }

        GuessOutcome {
            state_changed,
            reschedule: None,
            recycled,
        }
    }

    /// Debug helper: pick a random remaining answer from the occupied slots.
    /// With `sometimes_wrong`, occasionally return a scrambled (wrong) guess
    /// or an empty string meaning "skip this turn".
    pub fn random_word(&self, sometimes_wrong: bool) -> String {
        let mut left: Vec<&String> = Vec::new();
        for question in self.slots.iter().flatten() {
            left.extend(question.answers_remaining());
        }
        if left.is_empty() {
            return String::new();
        }

        let mut rng = rand::thread_rng();
        let pick = left[rng.gen_range(0..left.len())].clone();
        if sometimes_wrong {
            if rng.gen::<f32>() < 0.15 {
                return alphagrammize(&pick); // get it wrong
            } else if rng.gen::<f32>() < 0.35 - left.len() as f32 / 100.0 {
                return String::new();
            }
        }
        pick
    }
}

/// Capability handles a board needs to talk back to its match: the attack
/// router, the coalesced state-change channel, and the exit notifier.
#[derive(Debug, Clone)]
pub(crate) struct BoardLinks {
    pub attacks_out: mpsc::Sender<Question>,
    pub state_change: mpsc::Sender<()>,
    pub exited: mpsc::Sender<usize>,
}

/// Handle to a running board task.
#[derive(Debug)]
pub struct Board {
    state: Arc<Mutex<BoardState>>,
    guess_tx: mpsc::Sender<String>,
    attack_tx: mpsc::Sender<Question>,
    stop_tx: mpsc::Sender<()>,
}

impl Board {
    /// Build a board for one round and start its loop. The first scheduling
    /// step runs synchronously so the main timer is armed before the loop
    /// begins selecting.
    pub(crate) fn spawn(idx: usize, queue: Vec<Question>, links: BoardLinks) -> Self {
        let (guess_tx, guess_rx) = mpsc::channel(GUESS_CHANNEL_CAP);
        let (attack_tx, attack_rx) = mpsc::channel(ATTACK_INBOX_CAP);
        let (stop_tx, stop_rx) = mpsc::channel(1);

        let mut state = BoardState::new(idx, queue);
        let first_tick = state.tick();
        let state = Arc::new(Mutex::new(state));

        let task_state = Arc::clone(&state);
        tokio::spawn(async move {
            board_loop(idx, task_state, first_tick, guess_rx, attack_rx, stop_rx, links).await;
        });

        Self {
            state,
            guess_tx,
            attack_tx,
            stop_tx,
        }
    }

    /// Enqueue a guess. Dropped rather than blocking when the buffer is full.
    pub fn guess(&self, guess: &str) {
        let _ = self.guess_tx.try_send(guess.to_string());
    }

    /// Ask the board loop to exit after its current step.
    pub fn quit(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// See [`BoardState::random_word`].
    pub fn random_word(&self, sometimes_wrong: bool) -> String {
        lock(&self.state).random_word(sometimes_wrong)
    }

    pub(crate) fn attack_sender(&self) -> mpsc::Sender<Question> {
        self.attack_tx.clone()
    }

    pub(crate) fn set_quitting(&self) {
        lock(&self.state).quitting = true;
    }

    pub(crate) fn state(&self) -> &Mutex<BoardState> {
        &self.state
    }
}

fn lock(state: &Mutex<BoardState>) -> MutexGuard<'_, BoardState> {
    state.lock().expect("board state lock poisoned")
}

async fn board_loop(
    idx: usize,
    state: Arc<Mutex<BoardState>>,
    first_tick: Option<Duration>,
    mut guess_rx: mpsc::Receiver<String>,
    mut attack_rx: mpsc::Receiver<Question>,
    mut stop_rx: mpsc::Receiver<()>,
    links: BoardLinks,
) {
    debug!(idx, "start board loop");
    let mut main_deadline = first_tick.map(|d| Instant::now() + d);
    let mut attack_deadline: Option<Instant> = None;

    loop {
        if lock(&state).quitting {
            break;
        }

        tokio::select! {
            _ = timer(main_deadline) => {
                main_deadline = None;
                let (next, done) = {
                    let mut board = lock(&state);
                    let next = board.tick();
                    (next, board.won || board.dead || board.quitting)
                };
                if let Some(d) = next {
                    main_deadline = Some(Instant::now() + d);
                }
                let _ = links.state_change.try_send(());
                if done {
                    break;
                }
            }

            _ = timer(attack_deadline) => {
                // The attack queue may now land; it is added as soon as the
                // next piece would otherwise drop.
                attack_deadline = None;
                lock(&state).attacks_ready = true;
            }

            Some(guess) = guess_rx.recv() => {
                debug!(idx, guess = %guess, "guess event");
                let (outcome, done) = {
                    let mut board = lock(&state);
                    let outcome = board.handle_guess(&guess);
                    let done = board.won || board.dead;
                    (outcome, done)
                };
                if let Some(d) = outcome.reschedule {
                    main_deadline = Some(Instant::now() + d);
                }
                if outcome.state_changed {
                    let _ = links.state_change.try_send(());
                }
                if let Some(question) = outcome.recycled {
                    // Sent outside the state lock; the router preserves order.
                    let _ = links.attacks_out.send(question).await;
                }
                if done {
                    break;
                }
            }

            Some(question) = attack_rx.recv() => {
                let start_timer = lock(&state).queue_attack(question);
                let _ = links.state_change.try_send(());
                if start_timer {
                    attack_deadline = Some(Instant::now() + ATTACK_DELAY);
                }
            }

            _ = stop_rx.recv() => break,
        }
    }

    let _ = links.exited.send(idx).await;
    debug!(idx, "leave board loop");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::question::Alphagram;

    fn question(letters: &str, words: &[&str], owner: usize) -> Question {
        Question::new(
            &Alphagram::new(letters, words.iter().map(|w| w.to_string()).collect()),
            owner,
        )
    }

    fn board_with_queue(idx: usize, count: usize) -> BoardState {
        let queue = (0..count).map(|_| question("aelpp", &["apple"], idx)).collect();
        BoardState::new(idx, queue)
    }

    /// Non-faller occupied slots must always form a contiguous suffix.
    fn assert_stack_contiguous(board: &BoardState) {
        let occupied: Vec<usize> = (0..NUM_SLOTS)
            .filter(|&i| board.slots[i].is_some() && i as i32 != board.faller_pos)
            .collect();
        if let Some(&top) = occupied.first() {
            let expected: Vec<usize> = (top..NUM_SLOTS).collect();
            assert_eq!(occupied, expected, "stack is not a contiguous suffix");
        }
    }

    #[test]
    fn test_new_board() {
        let board = board_with_queue(0, 3);
        assert_eq!(board.faller_pos, -1);
        assert_eq!(board.status, BoardStatus::PieceDropping);
        assert_eq!(board.top_of_stack(), NUM_SLOTS);
        assert!(!board.dead);
        assert!(!board.won);
    }

    #[test]
    fn test_first_tick_releases_piece() {
        let mut board = board_with_queue(0, 3);
        let next = board.tick();
        assert_eq!(board.faller_pos, 0);
        assert!(board.slots[0].is_some());
        assert_eq!(board.queue.len(), 2);
        assert_eq!(next, Some(TICK_DURATION));
        assert_eq!(
            board.last_change.as_ref().unwrap().change_type,
            StateChangeType::PieceFall
        );
    }

    #[test]
    fn test_piece_falls_to_bottom_and_lands() {
        let mut board = board_with_queue(0, 1);
        board.tick(); // release, faller at 0

        // Advance until just above the bottom.
        for expected in 1..NUM_SLOTS - 1 {
            let next = board.tick();
            assert_eq!(board.faller_pos, expected as i32);
            assert_eq!(next, Some(TICK_DURATION));
            assert_stack_contiguous(&board);
        }

        // Final tick lands the piece in the bottom slot.
        let next = board.tick();
        assert_eq!(board.faller_pos, -1);
        assert!(board.slots[NUM_SLOTS - 1].is_some());
        assert_eq!(board.status, BoardStatus::PieceAboutToDrop);
        assert_eq!(next, Some(TICK_DURATION / 4));
        assert_eq!(
            board.last_change.as_ref().unwrap().change_type,
            StateChangeType::PieceLand
        );
        assert_stack_contiguous(&board);
    }

    #[test]
    fn test_landing_at_top_gets_lenient_pause() {
        let mut board = board_with_queue(0, 2);
        // Fill slots 1..NUM_SLOTS so the next piece lands at slot 0.
        for i in 1..NUM_SLOTS {
            board.slots[i] = Some(question("ab", &["ab"], 1));
        }
        board.status = BoardStatus::PieceAboutToDrop;

        let next = board.tick();
        assert_eq!(board.faller_pos, -1);
        assert!(board.slots[0].is_some());
        assert_eq!(next, Some(TICK_DURATION));
    }

    #[test]
    fn test_full_stack_loses_on_tick() {
        let mut board = board_with_queue(0, 2);
        for i in 0..NUM_SLOTS {
            board.slots[i] = Some(question("ab", &["ab"], 1));
        }

        let next = board.tick();
        assert!(board.dead);
        assert_eq!(next, None);
        assert_eq!(
            board.last_change.as_ref().unwrap().change_type,
            StateChangeType::Lost
        );
    }

    #[test]
    fn test_player_queue_empty_idles() {
        let mut board = BoardState::new(0, Vec::new());
        board.status = BoardStatus::PieceAboutToDrop;

        let next = board.tick();
        assert_eq!(board.status, BoardStatus::PlayerQueueEmpty);
        assert_eq!(next, Some(TICK_DURATION));

        // Stays idle on subsequent ticks.
        let next = board.tick();
        assert_eq!(board.status, BoardStatus::PlayerQueueEmpty);
        assert_eq!(next, Some(TICK_DURATION));
    }

    #[test]
    fn test_queue_is_lifo() {
        let mut board = BoardState::new(0, Vec::new());
        board.queue.push(question("ab", &["ab"], 0));
        board.queue.push(question("cd", &["dc"], 0));

        board.tick();
        assert_eq!(board.slots[0].as_ref().unwrap().alphagram(), "cd");
    }

    #[test]
    fn test_guess_partial_hit() {
        let mut board = BoardState::new(0, Vec::new());
        board.slots[10] = Some(question("aelpp", &["apple", "appel"], 0));

        let outcome = board.handle_guess("  APPLE ");
        assert!(outcome.state_changed);
        assert!(outcome.recycled.is_none());
        assert!(outcome.reschedule.is_none());
        assert_eq!(board.slots[10].as_ref().unwrap().answers_left(), 1);
        assert_eq!(board.solved, 0);
    }

    #[test]
    fn test_guess_exactly_one_slot_mutated() {
        let mut board = BoardState::new(0, Vec::new());
        board.slots[8] = Some(question("aelpp", &["apple", "appel"], 0));
        board.slots[9] = Some(question("aelpp", &["apple", "appel"], 1));

        board.handle_guess("apple");
        assert_eq!(board.slots[8].as_ref().unwrap().answers_left(), 1);
        assert_eq!(board.slots[9].as_ref().unwrap().answers_left(), 2);
    }

    #[test]
    fn test_guess_fully_solves_own_question_and_recycles() {
        let mut board = BoardState::new(0, Vec::new());
        board.slots[12] = Some(question("aelpp", &["apple"], 0));

        let outcome = board.handle_guess("apple");
        assert!(outcome.state_changed);
        assert!(board.slots[12].is_none());
        assert_eq!(board.solved, 1);
        assert_eq!(
            board.last_change.as_ref().unwrap().change_type,
            StateChangeType::FullySolveQuestion
        );

        let recycled = outcome.recycled.expect("own question should recycle");
        assert_eq!(recycled.owner(), 0);
        assert_eq!(recycled.alphagram(), "aelpp");
        // Answers restored for the opponent.
        assert_eq!(recycled.answers_left(), 1);
    }

    #[test]
    fn test_guess_solving_attack_piece_does_not_recycle() {
        let mut board = BoardState::new(0, Vec::new());
        board.slots[12] = Some(question("aelpp", &["apple"], 1));

        let outcome = board.handle_guess("apple");
        assert!(outcome.recycled.is_none());
        assert!(board.slots[12].is_none());
        assert_eq!(board.solved, 1);
    }

    #[test]
    fn test_guess_solved_slot_shifts_stack_down() {
        let mut board = BoardState::new(0, Vec::new());
        for i in 12..NUM_SLOTS {
            board.slots[i] = Some(question("ab", &["ab"], 0));
        }
        board.slots[13] = Some(question("aelpp", &["apple"], 0));

        board.handle_guess("apple");
        // Slot 12's piece moved down into 13; 12 is now empty.
        assert!(board.slots[12].is_none());
        assert!(board.slots[13].is_some());
        assert_stack_contiguous(&board);
    }

    #[test]
    fn test_guess_solving_faller_resets_drop() {
        let mut board = board_with_queue(0, 2);
        board.tick(); // release, faller at 0
        board.tick(); // faller at 1
        let faller = board.faller_pos as usize;
        assert!(board.slots[faller].is_some());

        let outcome = board.handle_guess("apple");
        assert_eq!(board.faller_pos, -1);
        assert_eq!(board.status, BoardStatus::PieceAboutToDrop);
        assert_eq!(outcome.reschedule, Some(TICK_DURATION / 4));
        assert!(outcome.recycled.is_some());
    }

    #[test]
    fn test_wrong_anagram_on_faller_punishes() {
        let mut board = BoardState::new(0, vec![question("aelpp", &["apple", "appel"], 0)]);
        board.tick(); // faller at 0
        assert_eq!(board.faller_pos, 0);

        let outcome = board.handle_guess("pleap");
        assert!(outcome.state_changed);
        assert_eq!(outcome.reschedule, Some(TICK_DURATION / 4));
        // Faller dropped straight to the bottom.
        assert_eq!(board.faller_pos, -1);
        assert!(board.slots[NUM_SLOTS - 1].is_some());
        assert_eq!(board.status, BoardStatus::PieceAboutToDrop);
        assert_eq!(board.slots[NUM_SLOTS - 1].as_ref().unwrap().answers_left(), 2);
        assert_eq!(
            board.last_change.as_ref().unwrap().change_type,
            StateChangeType::PieceLand
        );
    }

    #[test]
    fn test_wrong_anagram_on_settled_piece_not_punished() {
        let mut board = BoardState::new(0, Vec::new());
        board.slots[15] = Some(question("aelpp", &["apple"], 0));

        let outcome = board.handle_guess("pleap");
        assert!(!outcome.state_changed);
        assert!(outcome.reschedule.is_none());
        assert!(board.slots[15].is_some());
    }

    #[test]
    fn test_partial_hit_elsewhere_overrides_punishment() {
        // The guess is a wrong anagram of the faller but a remaining answer
        // of a settled slot further down: the hit wins, no punishment.
        let mut board = BoardState::new(0, vec![question("aelpp", &["apple"], 0)]);
        board.tick(); // faller "aelpp" at slot 0
        board.slots[15] = Some(question("aelpp", &["pleap"], 1));

        let outcome = board.handle_guess("pleap");
        assert!(outcome.state_changed);
        assert!(outcome.reschedule.is_none());
        assert!(board.slots[15].is_none());
        assert_eq!(board.faller_pos, 0);
        assert_eq!(board.solved, 1);
    }

    #[test]
    fn test_attack_queue_and_drain() {
        let mut board = BoardState::new(0, Vec::new());
        board.status = BoardStatus::PlayerQueueEmpty;

        assert!(board.queue_attack(question("ab", &["ab"], 1)));
        assert!(!board.queue_attack(question("cd", &["dc"], 1)));
        assert_eq!(board.attack_queue.len(), 2);
        assert_eq!(
            board.last_change.as_ref().unwrap().change_type,
            StateChangeType::StackQueue
        );

        board.attacks_ready = true;
        let next = board.tick();
        assert_eq!(board.attack_queue.len(), 0);
        assert!(!board.attacks_ready);
        assert_eq!(next, Some(TICK_DURATION));
        // Both attacks occupy the bottom two slots, FIFO order.
        assert_eq!(board.slots[NUM_SLOTS - 2].as_ref().unwrap().alphagram(), "ab");
        assert_eq!(board.slots[NUM_SLOTS - 1].as_ref().unwrap().alphagram(), "cd");
        assert_eq!(
            board.last_change.as_ref().unwrap().change_type,
            StateChangeType::StackRise
        );
        assert_eq!(board.last_change.as_ref().unwrap().num, 2);
        assert_stack_contiguous(&board);
    }

    #[test]
    fn test_attack_overflow_loses() {
        let mut board = BoardState::new(0, Vec::new());
        board.status = BoardStatus::PlayerQueueEmpty;
        // 15 settled pieces, only the top slot free.
        for i in 1..NUM_SLOTS {
            board.slots[i] = Some(question("ab", &["ab"], 0));
        }
        board.queue_attack(question("cd", &["dc"], 1));
        board.queue_attack(question("ef", &["fe"], 1));
        board.attacks_ready = true;

        let next = board.tick();
        assert!(board.dead);
        assert_eq!(next, None);
        assert_eq!(
            board.last_change.as_ref().unwrap().change_type,
            StateChangeType::Lost
        );
    }

    #[test]
    fn test_single_attack_into_last_space_survives() {
        let mut board = BoardState::new(0, Vec::new());
        board.status = BoardStatus::PlayerQueueEmpty;
        for i in 1..NUM_SLOTS {
            board.slots[i] = Some(question("ab", &["ab"], 0));
        }
        board.queue_attack(question("cd", &["dc"], 1));
        board.attacks_ready = true;

        board.tick();
        // Top slot now occupied, but no attacks remained: still alive.
        assert!(!board.dead);
        assert!(board.slots[0].is_some());
    }

    #[test]
    fn test_win_on_final_settled_solve() {
        let mut board = BoardState::new(0, Vec::new());
        board.slots[15] = Some(question("aelpp", &["apple"], 0));

        board.handle_guess("apple");
        assert!(board.won);
    }

    #[test]
    fn test_no_win_while_queue_nonempty() {
        let mut board = BoardState::new(0, vec![question("ab", &["ab"], 0)]);
        board.slots[15] = Some(question("aelpp", &["apple"], 0));

        board.handle_guess("apple");
        assert!(!board.won);
    }

    #[test]
    fn test_win_ignores_pending_attacks() {
        let mut board = BoardState::new(0, Vec::new());
        board.slots[15] = Some(question("aelpp", &["apple"], 0));
        board.queue_attack(question("cd", &["dc"], 1));

        board.handle_guess("apple");
        // The attack queue is deliberately not inspected.
        assert!(board.won);
    }

    #[test]
    fn test_random_word_returns_valid_answer() {
        let mut board = BoardState::new(0, Vec::new());
        board.slots[10] = Some(question("aelpp", &["apple"], 0));

        let word = board.random_word(false);
        assert_eq!(word, "apple");
    }

    #[test]
    fn test_random_word_empty_board() {
        let board = BoardState::new(0, Vec::new());
        assert_eq!(board.random_word(false), "");
    }
}
