//! Group-number conventions of the elimination formats.
//!
//! Single elimination: group 1 is the bracket, group 2 (when present) the
//! third-place match. Double elimination: group 1 winners, 2 losers, 3
//! grand finals. Pools repeat that triple per pool index `k` as
//! `3k+1, 3k+2, 3k+3`; plain double elimination is pool 0.

use crate::types::{BracketDataSet, GroupId, Match, Side};

pub const SINGLE_ELIMINATION_GROUP: u32 = 1;
pub const THIRD_PLACE_GROUP: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupRole {
  Winners,
  Losers,
  GrandFinals,
}

pub fn winners_group(pool: u32) -> u32 {
  3 * pool + 1
}

pub fn losers_group(pool: u32) -> u32 {
  3 * pool + 2
}

pub fn grand_finals_group(pool: u32) -> u32 {
  3 * pool + 3
}

pub fn pool_of_group(number: u32) -> u32 {
  number.saturating_sub(1) / 3
}

pub fn role_of_group(number: u32) -> GroupRole {
  match number.saturating_sub(1) % 3 {
    0 => GroupRole::Winners,
    1 => GroupRole::Losers,
    _ => GroupRole::GrandFinals,
  }
}

pub fn pool_count(max_group_number: u32) -> u32 {
  max_group_number.div_ceil(3)
}

/// Resolved group ids of one double-elimination pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EliminationGroups {
  pub pool: u32,
  pub winners: Option<GroupId>,
  pub losers: Option<GroupId>,
  pub grand_finals: Option<GroupId>,
}

impl EliminationGroups {
  pub fn for_pool(data: &BracketDataSet, pool: u32) -> Self {
    EliminationGroups {
      pool,
      winners: data.group_by_number(winners_group(pool)).map(|g| g.id),
      losers: data.group_by_number(losers_group(pool)).map(|g| g.id),
      grand_finals: data.group_by_number(grand_finals_group(pool)).map(|g| g.id),
    }
  }

  pub fn all_pools(data: &BracketDataSet) -> Vec<Self> {
    (0..pool_count(data.max_group_number()))
      .map(|pool| EliminationGroups::for_pool(data, pool))
      .filter(|groups| groups.winners.is_some())
      .collect()
  }

  pub fn contains(&self, group_id: GroupId) -> bool {
    [self.winners, self.losers, self.grand_finals].contains(&Some(group_id))
  }
}

/// Grand-finals round 2 only gets played when the losers-side finalist
/// takes round 1.
pub fn is_bracket_reset(data: &BracketDataSet, m: &Match) -> bool {
  let Some(group) = data.group(m.group_id) else {
    return false;
  };
  if role_of_group(group.number) != GroupRole::GrandFinals {
    return false;
  }
  data.round(m.round_id).is_some_and(|round| round.number == 2)
}

/// The reset match of a pool is unnecessary once opponent 1 won grand finals round 1.
pub fn reset_is_skipped(data: &BracketDataSet, groups: &EliminationGroups) -> bool {
  let Some(grand_finals) = groups.grand_finals else {
    return false;
  };
  data
    .match_at(grand_finals, 1, 1)
    .and_then(Match::winner_side)
    .is_some_and(|side| side == Side::Opponent1)
}
