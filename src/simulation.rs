use std::collections::HashMap;

use tracing::{error, warn};

use crate::error::BracketError;
use crate::layout::is_bracket_reset;
use crate::progression::{propagate_bye, record_result};
use crate::standings::{loser_id, winner_id};
use crate::types::{BracketDataSet, Side, Team, TeamId, Topology};

/// Fractional rank per team, lower is better.
pub type TeamOrder = HashMap<TeamId, f64>;

/// Registration order, then any team only the data set knows about.
/// Real upsets already on the board swap the two ranks involved.
pub fn team_order(data: &BracketDataSet, teams: &[Team]) -> TeamOrder {
  let mut order = TeamOrder::new();
  for (idx, team) in teams.iter().enumerate() {
    order.entry(team.id).or_insert(idx as f64);
  }
  for team_id in &data.teams {
    let next = order.len() as f64;
    order.entry(*team_id).or_insert(next);
  }

  for m in &data.matches {
    let (Ok(Some(winner)), Ok(Some(loser))) = (winner_id(m), loser_id(m)) else {
      continue;
    };
    let (Some(&winner_rank), Some(&loser_rank)) = (order.get(&winner), order.get(&loser)) else {
      warn!("match {} has a team missing from the simulation order", m.id);
      continue;
    };
    if winner_rank > loser_rank {
      order.insert(winner, loser_rank);
      order.insert(loser, winner_rank + 0.1);
    }
  }
  order
}

/// Replays `data` to completion, better rank always winning 1-0. The input
/// is consumed and a new data set returned; gives up after `cap` passes and
/// returns whatever was resolved so far.
pub fn simulate(data: BracketDataSet, kind: Topology, teams: &[Team], cap: usize) -> BracketDataSet {
  let mut order = team_order(&data, teams);
  let mut data = data;
  match run_passes(&mut data, kind, &mut order, cap) {
    Ok(true) => {}
    Ok(false) => error!("{kind} simulation hit the {cap} pass cap"),
    Err(e) => error!("{kind} simulation stopped: {e}"),
  }
  data
}

/// Ok(true) when the replay settled before the cap.
fn run_passes(
  data: &mut BracketDataSet,
  kind: Topology,
  order: &mut TeamOrder,
  cap: usize,
) -> Result<bool, BracketError> {
  for _ in 0..cap {
    let mut changed = false;
    let mut unresolved = 0usize;
    for idx in 0..data.matches.len() {
      let m = data.matches[idx].clone();
      if m.is_decided() {
        continue;
      }
      if m.is_bye() {
        changed |= propagate_bye(data, kind, m.id)?;
        continue;
      }
      let Some((first, second)) = m.team_ids() else {
        if !is_bracket_reset(data, &m) {
          unresolved += 1;
        }
        continue;
      };

      let first_rank = rank_of(order, first);
      let second_rank = rank_of(order, second);
      // ties go to the top slot
      let (winner, winner_rank, loser) = if second_rank < first_rank {
        (Side::Opponent2, second_rank, first)
      } else {
        (Side::Opponent1, first_rank, second)
      };
      let scores = match winner {
        Side::Opponent1 => [1, 0],
        Side::Opponent2 => [0, 1],
      };
      record_result(data, kind, m.id, winner, scores)?;
      order.insert(loser, winner_rank + 0.1);
      changed = true;
    }

    if unresolved == 0 {
      return Ok(true);
    }
    if !changed {
      warn!("{kind} simulation stalled with {unresolved} unresolved match(es)");
      return Ok(true);
    }
  }
  Ok(false)
}

fn rank_of(order: &TeamOrder, team_id: TeamId) -> f64 {
  match order.get(&team_id) {
    Some(rank) => *rank,
    None => {
      warn!("team {team_id} missing from the simulation order");
      f64::MAX
    }
  }
}
