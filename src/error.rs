use thiserror::Error;

use crate::types::{MatchId, TeamId};

/// Structural problems with a bracket data set or an unsupported request.
///
/// These mean the input is malformed; "not yet" states are never errors.
#[derive(Debug, Error, PartialEq)]
pub enum BracketError {
    #[error("decided match {match_id} has no loser id")]
    MissingLoser { match_id: MatchId },

    #[error("decided match {match_id} has no winner id")]
    MissingWinner { match_id: MatchId },

    #[error("team {0} not found in tournament")]
    TeamNotFound(TeamId),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("positive and negative placements can't be mixed")]
    MixedPlacements,

    #[error("bracket needs either data or seeding")]
    MissingDataAndSeeding,

    #[error("invalid bracket settings: {0}")]
    InvalidSettings(String),

    #[error("config: {0}")]
    Config(String),
}
