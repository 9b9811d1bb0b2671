//! Builders shared by the unit tests.

use std::sync::Arc;

use crate::bracket::{Bracket, CreateBracketArgs};
use crate::config::EngineConfig;
use crate::layout::is_bracket_reset;
use crate::progression::{propagate_bye, record_result};
use crate::skeleton::{BracketGenerator, SkeletonGenerator};
use crate::types::{
  BracketDataSet, BracketSettings, Match, MatchId, Side, Team, TeamId, TeamMember, Topology, TournamentContext,
};

/// Team `id` seeded `id`, owned by user `id * 10`.
pub fn team(id: TeamId) -> Team {
  Team {
    id,
    name: format!("Team {id}"),
    seed: id,
    dropped_out: false,
    members: vec![
      TeamMember {
        user_id: id * 10,
        is_owner: true,
      },
      TeamMember {
        user_id: id * 10 + 1,
        is_owner: false,
      },
    ],
  }
}

pub fn teams(count: u32) -> Vec<Team> {
  (1..=count).map(team).collect()
}

pub fn context(count: u32) -> TournamentContext {
  TournamentContext::new(teams(count), EngineConfig::default())
}

pub fn generate(kind: Topology, count: u32, settings: &BracketSettings) -> BracketDataSet {
  let seeding = (1..=count).collect::<Vec<_>>();
  SkeletonGenerator.generate(kind, &seeding, settings).unwrap()
}

pub fn match_in(data: &BracketDataSet, group_number: u32, round: u32, number: u32) -> &Match {
  let group = data.group_by_number(group_number).unwrap();
  data.match_at(group.id, round, number).unwrap()
}

pub fn decide(data: &mut BracketDataSet, kind: Topology, match_id: MatchId, winner: Side) {
  let scores = match winner {
    Side::Opponent1 => [2, 1],
    Side::Opponent2 => [1, 2],
  };
  record_result(data, kind, match_id, winner, scores).unwrap();
}

/// Plays every reachable match, letting `pick` choose the winner from
/// `(opponent1, opponent2)`. Returns the number of matches played.
pub fn play_all<F>(data: &mut BracketDataSet, kind: Topology, pick: F) -> usize
where
  F: Fn(TeamId, TeamId) -> Side,
{
  let mut played = 0;
  loop {
    let mut changed = false;
    let ids = data.matches.iter().map(|m| m.id).collect::<Vec<_>>();
    for match_id in ids {
      let m = data.get_match(match_id).unwrap().clone();
      if m.is_decided() {
        continue;
      }
      if m.is_bye() {
        changed |= propagate_bye(data, kind, match_id).unwrap();
        continue;
      }
      let Some((a, b)) = m.team_ids() else {
        continue;
      };
      decide(data, kind, match_id, pick(a, b));
      played += 1;
      changed = true;
    }
    if !changed {
      return played;
    }
  }
}

/// Lower team id always wins.
pub fn favourite(a: TeamId, b: TeamId) -> Side {
  if a <= b {
    Side::Opponent1
  } else {
    Side::Opponent2
  }
}

pub fn bracket_args(kind: Topology, ctx: TournamentContext, data: BracketDataSet) -> CreateBracketArgs {
  CreateBracketArgs {
    id: 1,
    idx: 0,
    name: "Main Bracket".to_string(),
    kind,
    preview: false,
    data: Some(data),
    seeding: None,
    settings: BracketSettings::default(),
    teams_pending_check_in: None,
    ctx: Arc::new(ctx),
  }
}

pub fn bracket(kind: Topology, ctx: TournamentContext, data: BracketDataSet) -> Bracket {
  Bracket::create(bracket_args(kind, ctx, data)).unwrap()
}

pub fn placements(bracket: &Bracket) -> Vec<(TeamId, u32)> {
  bracket
    .standings()
    .unwrap()
    .into_iter()
    .map(|standing| (standing.team.id, standing.placement))
    .collect()
}

pub fn undecided_real_matches(data: &BracketDataSet) -> Vec<MatchId> {
  data
    .matches
    .iter()
    .filter(|m| !m.is_bye() && !m.is_decided() && !is_bracket_reset(data, m))
    .map(|m| m.id)
    .collect()
}
