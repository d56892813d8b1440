//! Game session bookkeeping.
//!
//! A session is a single instance of a game being played: one seeker, one
//! joiner, and the match that runs once both are present. The manager maps
//! session IDs and player names to sessions; actual matchmaking policy is
//! nothing more than first-come-first-served seeks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::{Match, MatchError};
use crate::provider::QuestionProvider;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session with that game id")]
    NoSuchSession,
    #[error("player already in game session")]
    AlreadyInSession,
    #[error("player already has a seek open")]
    AlreadySeeking,
    #[error("please cancel seek before accepting a game")]
    SeekOpen,
    #[error("not seeking a game")]
    NotSeeking,
    #[error("game already started")]
    GameStarted,
    #[error("player not in session")]
    NotInSession,
    #[error("game session id did not match")]
    SessionMismatch,
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Fill a 32-byte match seed from the OS entropy source. Failure to acquire
/// seed material is fatal.
pub fn crypto_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    seed
}

fn new_session_id() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = OsRng;
    (0..22)
        .map(|_| ALPHABET[(rng.next_u32() as usize) % ALPHABET.len()] as char)
        .collect()
}

/// A single instance of a game being played. The match handle is never
/// serialized; the lobby listing carries only the descriptive fields.
pub struct GameSession {
    /// First player is the seeker.
    pub players: Vec<String>,
    pub id: String,
    pub list_name: String,
    /// Serialized search criteria, forwarded verbatim to the provider.
    pub search_criteria: Vec<u8>,
    pub game: Option<Arc<Match>>,
}

/// Tracks open seeks and running sessions.
pub struct SessionManager {
    inner: Mutex<Sessions>,
    provider: Arc<dyn QuestionProvider>,
    events_out: mpsc::Sender<Vec<u8>>,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<String, Arc<Mutex<GameSession>>>,
    by_player: HashMap<String, Arc<Mutex<GameSession>>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn QuestionProvider>, events_out: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            inner: Mutex::new(Sessions::default()),
            provider,
            events_out,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().expect("session manager lock poisoned")
    }

    /// Open a seek: a one-player session waiting for a joiner.
    pub fn seek(
        &self,
        seeker: &str,
        list_name: &str,
        search_criteria: Vec<u8>,
    ) -> Result<String, SessionError> {
        let mut sessions = self.sessions();
        if let Some(existing) = sessions.by_player.get(seeker) {
            let started = existing
                .lock()
                .expect("session lock poisoned")
                .game
                .is_some();
            return Err(if started {
                SessionError::AlreadyInSession
            } else {
                SessionError::AlreadySeeking
            });
        }

        let id = new_session_id();
        let session = Arc::new(Mutex::new(GameSession {
            players: vec![seeker.to_string()],
            id: id.clone(),
            list_name: list_name.to_string(),
            search_criteria,
            game: None,
        }));
        sessions.by_id.insert(id.clone(), Arc::clone(&session));
        sessions.by_player.insert(seeker.to_string(), session);
        Ok(id)
    }

    /// Withdraw an open seek.
    pub fn unseek(&self, seeker: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions();
        let session = sessions
            .by_player
            .get(seeker)
            .ok_or(SessionError::NotSeeking)?;
        let id = {
            let session = session.lock().expect("session lock poisoned");
            if session.game.is_some() {
                return Err(SessionError::GameStarted);
            }
            session.id.clone()
        };
        sessions.by_id.remove(&id);
        sessions.by_player.remove(seeker);
        Ok(())
    }

    /// Join an open seek. This creates the match with a fresh crypto seed
    /// and starts its countdown.
    pub fn join(&self, joiner: &str, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions();
        if let Some(existing) = sessions.by_player.get(joiner) {
            let started = existing
                .lock()
                .expect("session lock poisoned")
                .game
                .is_some();
            return Err(if started {
                SessionError::AlreadyInSession
            } else {
                SessionError::SeekOpen
            });
        }
        let session = sessions
            .by_id
            .get(id)
            .cloned()
            .ok_or(SessionError::NoSuchSession)?;

        {
            let mut session = session.lock().expect("session lock poisoned");
            session.players.push(joiner.to_string());

            let game = Arc::new(Match::new(
                session.search_criteria.clone(),
                session.players.clone(),
                Arc::clone(&self.provider),
                session.id.clone(),
                self.events_out.clone(),
                crypto_seed(),
            ));
            game.start_game_countdown()?;
            session.game = Some(game);
        }

        sessions.by_player.insert(joiner.to_string(), session);
        Ok(())
    }

    /// Forward a guess into a running session.
    pub fn send_guess(&self, sender: &str, id: &str, guess: &str) -> Result<(), SessionError> {
        let session = {
            let sessions = self.sessions();
            sessions
                .by_id
                .get(id)
                .cloned()
                .ok_or(SessionError::NoSuchSession)?
        };
        let session = session.lock().expect("session lock poisoned");
        let game = session.game.as_ref().ok_or(SessionError::NoSuchSession)?;
        game.guess(sender, guess)?;
        Ok(())
    }

    /// Destroy a game. Any player in it can do it, but only between rounds.
    pub fn leave(&self, leaver: &str, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions();
        let session = sessions
            .by_player
            .get(leaver)
            .cloned()
            .ok_or(SessionError::NotInSession)?;

        let players = {
            let session = session.lock().expect("session lock poisoned");
            if session.id != id {
                return Err(SessionError::SessionMismatch);
            }
            if let Some(game) = session.game.as_ref() {
                game.try_destroy()?;
            }
            session.players.clone()
        };

        sessions.by_id.remove(id);
        for player in players {
            sessions.by_player.remove(&player);
        }
        Ok(())
    }

    /// All sessions, serialized for the lobby listing.
    pub fn all_sessions(&self) -> Result<Vec<u8>, serde_json::Error> {
        let sessions = self.sessions();
        let list: Vec<_> = sessions
            .by_id
            .values()
            .map(|s| {
                let s = s.lock().expect("session lock poisoned");
                serde_json::json!({
                    "players": s.players,
                    "id": s.id,
                    "list_name": s.list_name,
                })
            })
            .collect();
        serde_json::to_vec(&list)
    }
}
