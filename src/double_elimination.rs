use tracing::warn;

use crate::error::BracketError;
use crate::layout::{role_of_group, EliminationGroups, GroupRole};
use crate::standings::{cohort_placements, eliminations, loser_id, winner_id, PlacedTeam};
use crate::types::{
  BracketDataSet, BracketMapCounts, GroupId, Match, RoundId, RoundMapsConfig, Side, SourceResult, TeamId,
};

/// Standings of one pool: losers-side eliminations fill 3rd place and below,
/// the decisive final fills 1 and 2.
pub fn pool_standings(
  data: &BracketDataSet,
  groups: &EliminationGroups,
  participants: &[TeamId],
) -> Result<Vec<PlacedTeam>, BracketError> {
  let mut placed = Vec::with_capacity(participants.len());
  if let Some((winner, loser)) = final_result(data, groups)? {
    placed.push(PlacedTeam::new(winner, 1));
    placed.push(PlacedTeam::new(loser, 2));
  }

  if let Some(losers) = groups.losers {
    let eliminated = eliminations(data.matches.iter().filter(|m| m.group_id == losers))?;
    let still_alive = participants.len().saturating_sub(eliminated.len());
    let mut cohorts = cohort_placements(&eliminated, still_alive);
    cohorts.reverse();
    placed.extend(cohorts);
  }
  placed.sort_by_key(|entry| entry.placement);
  Ok(placed)
}

/// Winner and runner-up once the decisive match is played.
pub fn final_result(data: &BracketDataSet, groups: &EliminationGroups) -> Result<Option<(TeamId, TeamId)>, BracketError> {
  if groups.losers.is_none() {
    let Some(winners) = groups.winners else {
      return Ok(None);
    };
    let last = data.max_round_number(winners);
    return decided_pair(data.match_at(winners, last, 1));
  }
  let Some(grand_finals) = groups.grand_finals else {
    return Err(BracketError::GroupNotFound(format!("grand finals of pool {}", groups.pool)));
  };
  let Some(first) = data.match_at(grand_finals, 1, 1) else {
    return Ok(None);
  };
  let reset = data.match_at(grand_finals, 2, 1);
  match (first.winner_side(), reset) {
    (None, _) => Ok(None),
    (Some(Side::Opponent1), _) | (Some(_), None) => decided_pair(Some(first)),
    (Some(_), Some(reset)) => decided_pair(Some(reset)),
  }
}

fn decided_pair(m: Option<&Match>) -> Result<Option<(TeamId, TeamId)>, BracketError> {
  let Some(m) = m else {
    return Ok(None);
  };
  match (winner_id(m)?, loser_id(m)?) {
    (Some(winner), Some(loser)) => Ok(Some((winner, loser))),
    _ => Ok(None),
  }
}

/// Winners round whose losers drop into losers round `n`. Only round 1
/// and the even losers rounds take drop-downs.
pub fn winners_source_round(losers_round: u32) -> Option<u32> {
  if losers_round == 1 || losers_round % 2 == 0 {
    Some((losers_round + 1).div_ceil(2))
  } else {
    None
  }
}

/// Losers rounds counted from the back, skipping a first round made of BYEs.
fn losers_rounds_from_the_back(data: &BracketDataSet, losers: GroupId) -> Vec<RoundId> {
  let mut rounds = data
    .rounds_in_group(losers)
    .into_iter()
    .map(|round| round.id)
    .collect::<Vec<_>>();
  if rounds.first().is_some_and(|round_id| !data.round_has_real_match(*round_id)) {
    rounds.remove(0);
  }
  rounds.reverse();
  rounds
}

/// Teams knocked out of the losers side `|p|` rounds before the end, for
/// every negative placement `p`.
pub fn losers_source(
  data: &BracketDataSet,
  groups: &EliminationGroups,
  placements: &[i32],
) -> Result<SourceResult, BracketError> {
  let Some(losers) = groups.losers else {
    return Err(BracketError::GroupNotFound(format!("losers bracket of pool {}", groups.pool)));
  };
  if placements.contains(&0) {
    return Err(BracketError::NotImplemented("placement 0"));
  }
  let rounds = losers_rounds_from_the_back(data, losers);
  let mut result = SourceResult {
    relevant_matches_finished: true,
    teams: Vec::new(),
  };
  for placement in placements {
    let round = (placement.unsigned_abs() as usize)
      .checked_sub(1)
      .and_then(|idx| rounds.get(idx));
    let Some(round_id) = round else {
      warn!("placement {placement} reaches past the first losers round");
      result.relevant_matches_finished = false;
      continue;
    };
    for m in data.matches_in_round(*round_id) {
      if m.is_bye() {
        continue;
      }
      match loser_id(m)? {
        Some(loser) => result.teams.push(loser),
        None => result.relevant_matches_finished = false,
      }
    }
  }
  Ok(result)
}

pub fn source(data: &BracketDataSet, placements: &[i32]) -> Result<SourceResult, BracketError> {
  if placements.iter().any(|placement| *placement >= 0) {
    return Err(BracketError::NotImplemented("positive placements in double elimination"));
  }
  losers_source(data, &EliminationGroups::for_pool(data, 0), placements)
}

/// Bo5 for both finals stretches and grand finals, bo3 elsewhere.
pub fn default_round_best_ofs(data: &BracketDataSet) -> BracketMapCounts {
  let pools = EliminationGroups::all_pools(data);
  let mut counts = BracketMapCounts::new();
  for group in &data.groups {
    let in_pool = pools.iter().any(|pool| pool.contains(group.id));
    let last = data.max_round_number(group.id);
    for round in data.rounds_in_group(group.id) {
      if !data.round_has_real_match(round.id) {
        continue;
      }
      let count = if !in_pool {
        warn!("group {} (number {}) has no default map count", group.id, group.number);
        5
      } else {
        match role_of_group(group.number) {
          GroupRole::Winners | GroupRole::Losers if round.number + 1 >= last => 5,
          GroupRole::Winners | GroupRole::Losers => 3,
          GroupRole::GrandFinals => 5,
        }
      };
      counts
        .entry(group.id)
        .or_default()
        .insert(round.number, RoundMapsConfig::best_of(count));
    }
  }
  counts
}
