use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use crate::config::EngineConfig;

// ── Identifiers ────────────────────────────────────────────────────────

pub type TeamId = u32;
pub type UserId = u32;
pub type MatchId = u32;
pub type RoundId = u32;
pub type GroupId = u32;
pub type BracketId = u32;

// ── Constants ──────────────────────────────────────────────────────────

pub const ENOUGH_TEAMS_TO_START: usize = 2;
pub const DEFAULT_SWISS_ROUND_COUNT: u32 = 5;
pub const SIMULATION_ITERATION_CAP: usize = 100;
pub const FALLBACK_MAP_COUNT: u32 = 5;

/// Per (group, round number) map count used before a TO overrides it.
pub type BracketMapCounts = BTreeMap<GroupId, BTreeMap<u32, RoundMapsConfig>>;

// ── Topology ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    SingleElimination,
    DoubleElimination,
    DoubleEliminationGroups,
    RoundRobin,
    Swiss,
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::SingleElimination => "single_elimination",
            Topology::DoubleElimination => "double_elimination",
            Topology::DoubleEliminationGroups => "double_elimination_groups",
            Topology::RoundRobin => "round_robin",
            Topology::Swiss => "swiss",
        }
    }

    /// Elimination formats have a fixed match graph that can be replayed.
    pub fn is_elimination(&self) -> bool {
        matches!(
            self,
            Topology::SingleElimination | Topology::DoubleElimination | Topology::DoubleEliminationGroups
        )
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Match graph ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Opponent1,
    Opponent2,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Opponent1 => Side::Opponent2,
            Side::Opponent2 => Side::Opponent1,
        }
    }

    /// Odd match numbers feed the first slot of the next match, even ones the second.
    pub fn from_match_number(number: u32) -> Side {
        if number % 2 == 1 {
            Side::Opponent1
        } else {
            Side::Opponent2
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default)]
    pub id: Option<TeamId>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub result: Option<MatchResult>,
    #[serde(default)]
    pub total_points: Option<u32>,
}

impl Slot {
    pub fn team(id: TeamId) -> Self {
        Slot {
            id: Some(id),
            ..Slot::default()
        }
    }

    pub fn is_win(&self) -> bool {
        self.result == Some(MatchResult::Win)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub round_id: RoundId,
    pub group_id: GroupId,
    pub number: u32,
    pub opponent1: Option<Slot>,
    pub opponent2: Option<Slot>,
}

impl Match {
    /// One side of the match will never be filled.
    pub fn is_bye(&self) -> bool {
        self.opponent1.is_none() || self.opponent2.is_none()
    }

    pub fn slot(&self, side: Side) -> Option<&Slot> {
        match side {
            Side::Opponent1 => self.opponent1.as_ref(),
            Side::Opponent2 => self.opponent2.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> Option<&mut Slot> {
        match side {
            Side::Opponent1 => self.opponent1.as_mut(),
            Side::Opponent2 => self.opponent2.as_mut(),
        }
    }

    pub fn winner_side(&self) -> Option<Side> {
        let first = self.opponent1.as_ref().is_some_and(Slot::is_win);
        let second = self.opponent2.as_ref().is_some_and(Slot::is_win);
        match (first, second) {
            (true, false) => Some(Side::Opponent1),
            (false, true) => Some(Side::Opponent2),
            _ => None,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.winner_side().is_some()
    }

    /// Both opponents are known teams.
    pub fn team_ids(&self) -> Option<(TeamId, TeamId)> {
        let a = self.opponent1.as_ref()?.id?;
        let b = self.opponent2.as_ref()?.id?;
        Some((a, b))
    }

    pub fn has_team(&self, team_id: TeamId) -> bool {
        [self.opponent1.as_ref(), self.opponent2.as_ref()]
            .into_iter()
            .flatten()
            .any(|slot| slot.id == Some(team_id))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapCountKind {
    BestOf,
    PlayAll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMapsConfig {
    pub count: u32,
    #[serde(rename = "type")]
    pub kind: MapCountKind,
}

impl RoundMapsConfig {
    pub fn best_of(count: u32) -> Self {
        RoundMapsConfig {
            count,
            kind: MapCountKind::BestOf,
        }
    }

    /// Map wins credited for a walkover in a round with this config.
    pub fn walkover_map_wins(&self) -> u32 {
        match self.kind {
            MapCountKind::BestOf => self.count.div_ceil(2),
            MapCountKind::PlayAll => self.count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: RoundId,
    pub number: u32,
    pub group_id: GroupId,
    #[serde(default)]
    pub maps: Option<RoundMapsConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub number: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketDataSet {
    #[serde(default)]
    pub teams: Vec<TeamId>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

impl BracketDataSet {
    pub fn group_by_number(&self, number: u32) -> Option<&Group> {
        self.groups.iter().find(|group| group.number == number)
    }

    pub fn group(&self, group_id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub fn round(&self, round_id: RoundId) -> Option<&Round> {
        self.rounds.iter().find(|round| round.id == round_id)
    }

    pub fn max_group_number(&self) -> u32 {
        self.groups.iter().map(|group| group.number).max().unwrap_or(0)
    }

    /// Rounds of a group ordered by their number.
    pub fn rounds_in_group(&self, group_id: GroupId) -> Vec<&Round> {
        let mut rounds = self
            .rounds
            .iter()
            .filter(|round| round.group_id == group_id)
            .collect::<Vec<_>>();
        rounds.sort_by_key(|round| round.number);
        rounds
    }

    pub fn max_round_number(&self, group_id: GroupId) -> u32 {
        self.rounds
            .iter()
            .filter(|round| round.group_id == group_id)
            .map(|round| round.number)
            .max()
            .unwrap_or(0)
    }

    pub fn round_by_number(&self, group_id: GroupId, number: u32) -> Option<&Round> {
        self.rounds
            .iter()
            .find(|round| round.group_id == group_id && round.number == number)
    }

    pub fn matches_in_round(&self, round_id: RoundId) -> Vec<&Match> {
        let mut matches = self
            .matches
            .iter()
            .filter(|m| m.round_id == round_id)
            .collect::<Vec<_>>();
        matches.sort_by_key(|m| m.number);
        matches
    }

    pub fn matches_in_group(&self, group_id: GroupId) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.group_id == group_id).collect()
    }

    pub fn match_at(&self, group_id: GroupId, round_number: u32, match_number: u32) -> Option<&Match> {
        let round = self.round_by_number(group_id, round_number)?;
        self.matches
            .iter()
            .find(|m| m.round_id == round.id && m.number == match_number)
    }

    pub fn match_index(&self, match_id: MatchId) -> Option<usize> {
        self.matches.iter().position(|m| m.id == match_id)
    }

    pub fn get_match(&self, match_id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    /// Round with at least one match that is not a BYE.
    pub fn round_has_real_match(&self, round_id: RoundId) -> bool {
        self.matches
            .iter()
            .any(|m| m.round_id == round_id && !m.is_bye())
    }
}

// ── Teams & standings ──────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: UserId,
    #[serde(default)]
    pub is_owner: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    #[serde(default)]
    pub name: String,
    pub seed: u32,
    #[serde(default)]
    pub dropped_out: bool,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTrackRecord {
    pub wins: u32,
    pub losses: u32,
}

impl TeamTrackRecord {
    pub fn add(&mut self, other: TeamTrackRecord) {
        self.wins += other.wins;
        self.losses += other.losses;
    }

    /// Percentage in 0..=100, zero for an empty record.
    pub fn win_percentage(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            return 0.0;
        }
        f64::from(self.wins) * 100.0 / f64::from(total)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingStats {
    pub set_wins: u32,
    pub set_losses: u32,
    pub map_wins: u32,
    pub map_losses: u32,
    pub points: u32,
    pub wins_against_tied: u32,
    pub losses_against_tied: u32,
    pub opponent_set_win_percentage: f64,
    pub opponent_map_win_percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub team: Team,
    pub placement: u32,
    pub group_id: Option<GroupId>,
    pub stats: Option<StandingStats>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResult {
    pub relevant_matches_finished: bool,
    pub teams: Vec<TeamId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    Advanced,
    Eliminated,
    Undecided,
}

// ── Settings & context ─────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BracketSettings {
    pub third_place_match: bool,
    pub grand_final_reset: bool,
    pub group_count: u32,
    pub round_count: Option<u32>,
    pub advance_threshold: Option<u32>,
}

impl Default for BracketSettings {
    fn default() -> Self {
        BracketSettings {
            third_place_match: false,
            grand_final_reset: true,
            group_count: 1,
            round_count: None,
            advance_threshold: None,
        }
    }
}

/// What the surrounding tournament hands to every bracket.
#[derive(Clone, Debug, Default)]
pub struct TournamentContext {
    pub teams: Vec<Team>,
    /// Users who actually played; `None` means no filtering.
    pub participated_users: Option<HashSet<UserId>>,
    pub config: EngineConfig,
}

impl TournamentContext {
    pub fn new(teams: Vec<Team>, config: EngineConfig) -> Self {
        TournamentContext {
            teams,
            participated_users: None,
            config,
        }
    }

    pub fn team_by_id(&self, team_id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == team_id)
    }

    pub fn owned_team_by_user(&self, user_id: UserId) -> Option<&Team> {
        self.teams.iter().find(|team| {
            team
                .members
                .iter()
                .any(|member| member.user_id == user_id && member.is_owner)
        })
    }
}
