//! Standings, progression and preview simulation for tournament brackets.
//!
//! A [`Bracket`] wraps one stage's match graph and answers, per topology,
//! who stands where, which matches are playable and which teams move on.

pub mod types;
pub mod error;
pub mod config;
pub mod layout;
pub mod progression;
pub mod skeleton;
pub mod standings;
pub mod simulation;
pub mod single_elimination;
pub mod double_elimination;
pub mod double_elimination_groups;
pub mod round_robin;
pub mod swiss;
pub mod bracket;
pub mod telemetry;
#[cfg(test)]
mod test_support;

pub use bracket::{Bracket, CreateBracketArgs};
pub use config::EngineConfig;
pub use error::BracketError;
pub use skeleton::{BracketGenerator, SkeletonGenerator};
pub use swiss::calculate_team_status;
pub use types::*;
