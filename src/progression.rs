use crate::error::BracketError;
use crate::layout::{
  grand_finals_group, losers_group, pool_of_group, role_of_group, winners_group, GroupRole,
  EliminationGroups, SINGLE_ELIMINATION_GROUP, THIRD_PLACE_GROUP,
};
use crate::types::{BracketDataSet, Match, MatchId, MatchResult, Side, TeamId, Topology};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Destination {
  pub match_id: MatchId,
  pub side: Side,
}

/// Where the winner and loser of a match continue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Destinations {
  pub winner: Option<Destination>,
  pub loser: Option<Destination>,
}

pub fn destinations(data: &BracketDataSet, kind: Topology, m: &Match) -> Destinations {
  let (Some(group), Some(round)) = (data.group(m.group_id), data.round(m.round_id)) else {
    return Destinations::default();
  };
  match kind {
    Topology::SingleElimination => single_elimination_destinations(data, group.number, round.number, m.number),
    Topology::DoubleElimination | Topology::DoubleEliminationGroups => {
      double_elimination_destinations(data, group.number, round.number, m.number)
    }
    Topology::RoundRobin | Topology::Swiss => Destinations::default(),
  }
}

fn at(data: &BracketDataSet, group_number: u32, round: u32, number: u32, side: Side) -> Option<Destination> {
  let group = data.group_by_number(group_number)?;
  let target = data.match_at(group.id, round, number)?;
  Some(Destination { match_id: target.id, side })
}

fn single_elimination_destinations(data: &BracketDataSet, group_number: u32, round: u32, number: u32) -> Destinations {
  if group_number != SINGLE_ELIMINATION_GROUP {
    return Destinations::default();
  }
  let Some(group) = data.group_by_number(group_number) else {
    return Destinations::default();
  };
  let last = data.max_round_number(group.id);
  let winner = if round < last {
    at(data, group_number, round + 1, number.div_ceil(2), Side::from_match_number(number))
  } else {
    None
  };
  let loser = if last >= 2 && round == last - 1 {
    at(data, THIRD_PLACE_GROUP, 1, 1, Side::from_match_number(number))
  } else {
    None
  };
  Destinations { winner, loser }
}

fn double_elimination_destinations(data: &BracketDataSet, group_number: u32, round: u32, number: u32) -> Destinations {
  let pool = pool_of_group(group_number);
  let groups = EliminationGroups::for_pool(data, pool);
  match role_of_group(group_number) {
    GroupRole::Winners => {
      let last = groups.winners.map(|id| data.max_round_number(id)).unwrap_or(0);
      let winner = if round < last {
        at(data, winners_group(pool), round + 1, number.div_ceil(2), Side::from_match_number(number))
      } else {
        at(data, grand_finals_group(pool), 1, 1, Side::Opponent1)
      };
      // winners round r > 1 drops into losers round 2(r-1), second slot
      let loser = if round == 1 {
        at(data, losers_group(pool), 1, number.div_ceil(2), Side::from_match_number(number))
      } else {
        at(data, losers_group(pool), 2 * (round - 1), number, Side::Opponent2)
      };
      Destinations { winner, loser }
    }
    GroupRole::Losers => {
      let last = groups.losers.map(|id| data.max_round_number(id)).unwrap_or(0);
      let winner = if round >= last {
        at(data, grand_finals_group(pool), 1, 1, Side::Opponent2)
      } else if round % 2 == 1 {
        at(data, losers_group(pool), round + 1, number, Side::Opponent1)
      } else {
        at(data, losers_group(pool), round + 1, number.div_ceil(2), Side::from_match_number(number))
      };
      Destinations { winner, loser: None }
    }
    GroupRole::GrandFinals => Destinations::default(),
  }
}

/// Writes a result onto a match and moves both teams along.
pub fn record_result(
  data: &mut BracketDataSet,
  kind: Topology,
  match_id: MatchId,
  winner: Side,
  scores: [u32; 2],
) -> Result<bool, BracketError> {
  let index = data.match_index(match_id).ok_or(BracketError::MatchNotFound(match_id))?;
  {
    let m = &mut data.matches[index];
    for (side, score) in [(Side::Opponent1, scores[0]), (Side::Opponent2, scores[1])] {
      if let Some(slot) = m.slot_mut(side) {
        slot.score = Some(score);
        slot.result = Some(if side == winner { MatchResult::Win } else { MatchResult::Loss });
      }
    }
  }
  propagate(data, kind, match_id)
}

/// Pushes the winner and loser of a decided match into their next slots.
/// Returns whether any slot changed.
pub fn propagate(data: &mut BracketDataSet, kind: Topology, match_id: MatchId) -> Result<bool, BracketError> {
  let m = data
    .get_match(match_id)
    .cloned()
    .ok_or(BracketError::MatchNotFound(match_id))?;
  let Some(winner_side) = m.winner_side() else {
    return Ok(false);
  };
  let winner_id = m
    .slot(winner_side)
    .and_then(|slot| slot.id)
    .ok_or(BracketError::MissingWinner { match_id })?;
  let loser_id = m
    .slot(winner_side.other())
    .and_then(|slot| slot.id)
    .ok_or(BracketError::MissingLoser { match_id })?;

  let mut changed = false;
  if winner_side == Side::Opponent2 && is_first_grand_final(data, &m) {
    if let Some(reset) = data.match_at(m.group_id, 2, 1).map(|reset| reset.id) {
      // bracket reset keeps the grand-final sides
      let (first, second) = m.team_ids().ok_or(BracketError::MissingLoser { match_id })?;
      changed |= place(data, Destination { match_id: reset, side: Side::Opponent1 }, first);
      changed |= place(data, Destination { match_id: reset, side: Side::Opponent2 }, second);
    }
  }

  let next = destinations(data, kind, &m);
  if let Some(dest) = next.winner {
    changed |= place(data, dest, winner_id);
  }
  if let Some(dest) = next.loser {
    changed |= place(data, dest, loser_id);
  }
  Ok(changed)
}

/// Advances the lone team of a BYE match once it is known.
pub fn propagate_bye(data: &mut BracketDataSet, kind: Topology, match_id: MatchId) -> Result<bool, BracketError> {
  let m = data
    .get_match(match_id)
    .cloned()
    .ok_or(BracketError::MatchNotFound(match_id))?;
  if !m.is_bye() {
    return Ok(false);
  }
  let present = m.opponent1.as_ref().or(m.opponent2.as_ref()).and_then(|slot| slot.id);
  let Some(team_id) = present else {
    return Ok(false);
  };
  match destinations(data, kind, &m).winner {
    Some(dest) => Ok(place(data, dest, team_id)),
    None => Ok(false),
  }
}

/// Creation-time pass: BYE winners move on, BYE "losers" turn their
/// destination slot into a BYE as well.
pub fn settle_byes(data: &mut BracketDataSet, kind: Topology) -> Result<(), BracketError> {
  let mut ids = data.matches.iter().map(|m| m.id).collect::<Vec<_>>();
  ids.sort_unstable();
  for match_id in ids {
    let Some(m) = data.get_match(match_id).cloned() else {
      continue;
    };
    if !m.is_bye() {
      continue;
    }
    let next = destinations(data, kind, &m);
    if let Some(dest) = next.loser {
      clear(data, dest);
    }
    let present = m.opponent1.as_ref().or(m.opponent2.as_ref());
    match (present, next.winner) {
      (None, Some(dest)) => clear(data, dest),
      (Some(slot), Some(dest)) => {
        if let Some(team_id) = slot.id {
          place(data, dest, team_id);
        }
      }
      (_, None) => {}
    }
  }
  Ok(())
}

fn is_first_grand_final(data: &BracketDataSet, m: &Match) -> bool {
  let Some(group) = data.group(m.group_id) else {
    return false;
  };
  role_of_group(group.number) == GroupRole::GrandFinals
    && data.round(m.round_id).is_some_and(|round| round.number == 1)
}

fn place(data: &mut BracketDataSet, dest: Destination, team_id: TeamId) -> bool {
  let Some(index) = data.match_index(dest.match_id) else {
    return false;
  };
  match data.matches[index].slot_mut(dest.side) {
    Some(slot) if slot.id.is_none() => {
      slot.id = Some(team_id);
      true
    }
    Some(slot) if slot.id != Some(team_id) => {
      tracing::warn!(
        "slot {:?} of match {} already holds team {:?}, not placing {team_id}",
        dest.side,
        dest.match_id,
        slot.id
      );
      false
    }
    _ => false,
  }
}

fn clear(data: &mut BracketDataSet, dest: Destination) {
  let Some(index) = data.match_index(dest.match_id) else {
    return;
  };
  let m = &mut data.matches[index];
  match dest.side {
    Side::Opponent1 => m.opponent1 = None,
    Side::Opponent2 => m.opponent2 = None,
  }
}
