//! Mnemonic Codex: a memory-map adventure built around timed memory puzzles.
//!
//! `domain` holds the pure rules (map, puzzles, anomalies, abilities),
//! `sim` ties them into a playable session, `ui` is the terminal front end.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
pub mod ui;
