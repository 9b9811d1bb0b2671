use crate::double_elimination::{final_result, losers_source, pool_standings};
use crate::error::BracketError;
use crate::layout::EliminationGroups;
use crate::standings::{loser_id, winner_id, PlacedTeam};
use crate::types::{BracketDataSet, SourceResult, TeamId};

/// Teams seen in any match of the pool, in order of appearance.
fn pool_participants(data: &BracketDataSet, groups: &EliminationGroups) -> Vec<TeamId> {
  let mut seen = Vec::new();
  for m in data.matches.iter().filter(|m| groups.contains(m.group_id)) {
    for slot in [m.opponent1.as_ref(), m.opponent2.as_ref()].into_iter().flatten() {
      if let Some(team_id) = slot.id {
        if !seen.contains(&team_id) {
          seen.push(team_id);
        }
      }
    }
  }
  seen
}

/// Every pool ranked on its own; pool winners all share first place.
pub fn standings(data: &BracketDataSet) -> Result<Vec<PlacedTeam>, BracketError> {
  let mut tagged = Vec::new();
  for groups in EliminationGroups::all_pools(data) {
    let participants = pool_participants(data, &groups);
    for mut entry in pool_standings(data, &groups, &participants)? {
      entry.group_id = groups.winners;
      tagged.push((groups.pool, entry));
    }
  }
  tagged.sort_by_key(|(pool, entry)| (entry.placement, *pool));
  Ok(tagged.into_iter().map(|(_, entry)| entry).collect())
}

/// Grand finalists, or the two side finalists of a pool too small for grand finals.
fn pool_finalists(data: &BracketDataSet, groups: &EliminationGroups) -> Result<Option<(TeamId, TeamId)>, BracketError> {
  if groups.grand_finals.is_some() || groups.losers.is_none() {
    return final_result(data, groups);
  }
  let Some(winners) = groups.winners else {
    return Ok(None);
  };
  let Some(winners_final) = data.match_at(winners, data.max_round_number(winners), 1) else {
    return Ok(None);
  };
  let Some(first) = winner_id(winners_final)? else {
    return Ok(None);
  };
  let second = match groups.losers {
    Some(losers) => match data.match_at(losers, data.max_round_number(losers), 1) {
      Some(losers_final) => winner_id(losers_final)?,
      None => loser_id(winners_final)?,
    },
    None => loser_id(winners_final)?,
  };
  Ok(second.map(|second| (first, second)))
}

pub fn source(data: &BracketDataSet, placements: &[i32]) -> Result<SourceResult, BracketError> {
  let has_positive = placements.iter().any(|placement| *placement > 0);
  let has_negative = placements.iter().any(|placement| *placement < 0);
  if has_positive && has_negative {
    return Err(BracketError::MixedPlacements);
  }

  let pools = EliminationGroups::all_pools(data);
  let mut result = SourceResult {
    relevant_matches_finished: true,
    teams: Vec::new(),
  };

  if has_negative {
    for groups in pools.iter().filter(|groups| groups.losers.is_some()) {
      let pool_result = losers_source(data, groups, placements)?;
      result.relevant_matches_finished &= pool_result.relevant_matches_finished;
      result.teams.extend(pool_result.teams);
    }
    return Ok(result);
  }

  if placements.iter().any(|placement| !matches!(placement, 1 | 2)) {
    return Err(BracketError::NotImplemented("pool placements other than 1st and 2nd"));
  }
  let mut finalists = Vec::with_capacity(pools.len());
  for groups in &pools {
    finalists.push(pool_finalists(data, groups)?);
  }
  for placement in placements {
    for pair in &finalists {
      match pair {
        Some((first, _)) if *placement == 1 => result.teams.push(*first),
        Some((_, second)) => result.teams.push(*second),
        None => result.relevant_matches_finished = false,
      }
    }
  }
  Ok(result)
}
