//! Bot tester (demo binary).
//!
//! Runs a two-bot match over a built-in word list and prints the rendered
//! state after every snapshot. The wiring is the real one: snapshots arrive
//! as JSON bytes on the match's output channel and are decoded before
//! display; the bots guess through the same `guess` entry point a session
//! layer would use.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use wordfall::core::{Alphagram, Match, MatchSnapshot};
use wordfall::provider::StaticProvider;
use wordfall::session::crypto_seed;
use wordfall::types::MatchStatus;

const BOT_GUESS_INTERVAL: Duration = Duration::from_secs(2);

/// A small built-in pool of anagram sets, enough for one round.
#[rustfmt::skip]
const WORD_SETS: &[(&str, &[&str])] = &[
    ("aet", &["ate", "eat", "eta", "tea"]),
    ("abt", &["bat", "tab"]),
    ("act", &["act", "cat"]),
    ("adn", &["and"]),
    ("ant", &["ant", "tan"]),
    ("apt", &["apt", "pat", "tap"]),
    ("art", &["art", "rat", "tar"]),
    ("abr", &["bar", "bra"]),
    ("abd", &["bad", "dab"]),
    ("abg", &["bag", "gab"]),
    ("abn", &["ban", "nab"]),
    ("aps", &["asp", "sap", "spa"]),
    ("aer", &["are", "ear", "era"]),
    ("ads", &["ads", "sad"]),
    ("agn", &["nag"]),
    ("ahm", &["ham"]),
    ("ahs", &["ash", "has"]),
    ("dgo", &["dog", "god"]),
    ("enw", &["new", "wen"]),
    ("eno", &["eon", "one"]),
    ("ens", &["ens"]),
    ("eht", &["eth", "the"]),
    ("ert", &["ret"]),
    ("est", &["set"]),
    ("ehr", &["her"]),
    ("ino", &["ion"]),
    ("nos", &["nos", "son"]),
    ("not", &["not", "ton"]),
    ("ops", &["ops", "sop"]),
    ("opt", &["opt", "pot", "top"]),
    ("ors", &["ors"]),
    ("ort", &["ort", "rot", "tor"]),
    ("aest", &["east", "eats", "etas", "sate", "seat", "teas"]),
    ("aelt", &["late", "tale", "teal"]),
    ("aemt", &["mate", "meat", "tame", "team"]),
    ("aent", &["ante", "neat"]),
    ("aert", &["rate", "tare", "tear"]),
    ("deor", &["doer", "redo", "rode"]),
    ("enot", &["note", "tone"]),
    ("eops", &["epos", "peso", "pose"]),
    ("eilv", &["evil", "live", "veil", "vile"]),
    ("eimt", &["emit", "item", "mite", "time"]),
    ("einm", &["mine"]),
    ("eint", &["nite", "tine"]),
    ("eirt", &["rite", "tier", "tire"]),
    ("eist", &["site", "ties"]),
    ("eitx", &["exit"]),
    ("aprt", &["part", "prat", "rapt", "trap"]),
    ("aort", &["rota", "taro"]),
    ("opst", &["opts", "post", "pots", "spot", "stop", "tops"]),
    ("orst", &["rots", "sort", "tors"]),
    ("abet", &["abet", "bate", "beat", "beta"]),
];

fn builtin_pool() -> Vec<Alphagram> {
    WORD_SETS
        .iter()
        .map(|(alphagram, words)| {
            Alphagram::new(*alphagram, words.iter().map(|w| w.to_string()).collect())
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let provider = Arc::new(StaticProvider::new(builtin_pool()));
    let (snapshot_tx, mut snapshot_rx) = mpsc::channel(64);

    let players = ["bot0", "bot1"];
    let game = Arc::new(Match::new(
        Vec::new(),
        players.iter().map(|p| p.to_string()).collect(),
        provider,
        "demo".to_string(),
        snapshot_tx,
        crypto_seed(),
    ));
    game.start_game_countdown()?;

    for (idx, name) in players.into_iter().enumerate() {
        let game = Arc::clone(&game);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(BOT_GUESS_INTERVAL);
            loop {
                ticker.tick().await;
                if let Some(word) = game.random_word(idx, true) {
                    if !word.is_empty() {
                        let _ = game.guess(name, &word);
                    }
                }
            }
        });
    }

    while let Some(bytes) = snapshot_rx.recv().await {
        let snapshot: MatchSnapshot = serde_json::from_slice(&bytes)?;
        println!("{snapshot}");
        if snapshot.status == MatchStatus::PermanentlyOver {
            println!("match over");
            break;
        }
    }
    Ok(())
}
