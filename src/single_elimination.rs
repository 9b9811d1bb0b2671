use crate::error::BracketError;
use crate::layout::{SINGLE_ELIMINATION_GROUP, THIRD_PLACE_GROUP};
use crate::standings::{cohort_placements, eliminations, loser_id, winner_id, PlacedTeam};
use crate::types::{BracketDataSet, BracketMapCounts, RoundMapsConfig, SourceResult, Standing, TeamId};

pub fn has_third_place_match(data: &BracketDataSet) -> bool {
  data.groups.len() > 1
}

pub fn standings(data: &BracketDataSet, participants: &[TeamId]) -> Result<Vec<PlacedTeam>, BracketError> {
  let Some(bracket) = data.group_by_number(SINGLE_ELIMINATION_GROUP) else {
    return Err(BracketError::GroupNotFound("single elimination bracket".to_string()));
  };
  let eliminated = eliminations(data.matches.iter().filter(|m| m.group_id == bracket.id))?;
  let still_alive = participants.len().saturating_sub(eliminated.len());

  let mut placed = Vec::with_capacity(participants.len());
  if still_alive == 1 {
    if let Some(champion) = participants
      .iter()
      .find(|team_id| !eliminated.iter().any(|(lost, _)| lost == *team_id))
    {
      placed.push(PlacedTeam::new(*champion, 1));
    }
  }
  let mut cohorts = cohort_placements(&eliminated, still_alive);
  cohorts.reverse();
  placed.extend(cohorts);

  if has_third_place_match(data) {
    apply_third_place(data, &mut placed)?;
  }
  placed.sort_by_key(|entry| entry.placement);
  Ok(placed)
}

/// A decided third-place match splits the semifinal losers into 3 and 4.
fn apply_third_place(data: &BracketDataSet, placed: &mut [PlacedTeam]) -> Result<(), BracketError> {
  let Some(group) = data.group_by_number(THIRD_PLACE_GROUP) else {
    return Ok(());
  };
  let Some(m) = data.matches.iter().find(|m| m.group_id == group.id) else {
    return Ok(());
  };
  let (Some(winner), Some(loser)) = (winner_id(m)?, loser_id(m)?) else {
    return Ok(());
  };
  for entry in placed.iter_mut() {
    if entry.team_id == winner {
      entry.placement = 3;
    } else if entry.team_id == loser {
      entry.placement = 4;
    }
  }
  Ok(())
}

pub fn source(
  standings: &[Standing],
  placements: &[i32],
  every_match_over: bool,
) -> Result<SourceResult, BracketError> {
  if placements.iter().any(|placement| *placement < 0) {
    return Err(BracketError::NotImplemented("negative placements in single elimination"));
  }
  let teams = standings
    .iter()
    .filter(|standing| placements.contains(&(standing.placement as i32)))
    .map(|standing| standing.team.id)
    .collect();
  Ok(SourceResult {
    relevant_matches_finished: every_match_over,
    teams,
  })
}

/// Bo5 for the last two rounds and the third-place match, bo3 elsewhere.
pub fn default_round_best_ofs(data: &BracketDataSet) -> BracketMapCounts {
  let mut counts = BracketMapCounts::new();
  for group in &data.groups {
    let last = data.max_round_number(group.id);
    for round in data.rounds_in_group(group.id) {
      if !data.round_has_real_match(round.id) {
        continue;
      }
      let count = if group.number == THIRD_PLACE_GROUP || round.number + 1 >= last {
        5
      } else {
        3
      };
      counts
        .entry(group.id)
        .or_default()
        .insert(round.number, RoundMapsConfig::best_of(count));
    }
  }
  counts
}
