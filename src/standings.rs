use crate::error::BracketError;
use crate::types::{GroupId, Match, RoundId, Standing, StandingStats, TeamId, TournamentContext};

/// A placement before the team row is attached.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedTeam {
  pub team_id: TeamId,
  pub placement: u32,
  pub group_id: Option<GroupId>,
  pub stats: Option<StandingStats>,
}

impl PlacedTeam {
  pub fn new(team_id: TeamId, placement: u32) -> Self {
    PlacedTeam {
      team_id,
      placement,
      group_id: None,
      stats: None,
    }
  }
}

/// Placements over an already sorted list: equal neighbours share a
/// placement, the next distinct entry gets its 1-based index.
pub fn competition_placements<T, F>(sorted: &[T], mut same: F) -> Vec<u32>
where
  F: FnMut(&T, &T) -> bool,
{
  let mut placements: Vec<u32> = Vec::with_capacity(sorted.len());
  for (idx, item) in sorted.iter().enumerate() {
    let placement = if idx > 0 && same(&sorted[idx - 1], item) {
      placements[idx - 1]
    } else {
      idx as u32 + 1
    };
    placements.push(placement);
  }
  placements
}

pub fn winner_id(m: &Match) -> Result<Option<TeamId>, BracketError> {
  let Some(side) = m.winner_side() else {
    return Ok(None);
  };
  m.slot(side)
    .and_then(|slot| slot.id)
    .map(Some)
    .ok_or(BracketError::MissingWinner { match_id: m.id })
}

pub fn loser_id(m: &Match) -> Result<Option<TeamId>, BracketError> {
  let Some(side) = m.winner_side() else {
    return Ok(None);
  };
  m.slot(side.other())
    .and_then(|slot| slot.id)
    .map(Some)
    .ok_or(BracketError::MissingLoser { match_id: m.id })
}

/// Losers of the decided matches, ordered by round id then match number.
pub fn eliminations<'a, I>(matches: I) -> Result<Vec<(TeamId, RoundId)>, BracketError>
where
  I: IntoIterator<Item = &'a Match>,
{
  let mut ordered = matches.into_iter().collect::<Vec<_>>();
  ordered.sort_by_key(|m| (m.round_id, m.number));
  let mut out = Vec::new();
  for m in ordered {
    if let Some(loser) = loser_id(m)? {
      out.push((loser, m.round_id));
    }
  }
  Ok(out)
}

/// Everyone knocked out in the same round shares a placement: one below
/// the teams still alive plus everyone knocked out later.
pub fn cohort_placements(eliminated: &[(TeamId, RoundId)], still_alive: usize) -> Vec<PlacedTeam> {
  let mut placed = Vec::with_capacity(eliminated.len());
  let mut remaining = eliminated.len();
  let mut idx = 0;
  while idx < eliminated.len() {
    let round_id = eliminated[idx].1;
    let cohort = eliminated[idx..]
      .iter()
      .take_while(|(_, lost_at)| *lost_at == round_id)
      .count();
    remaining -= cohort;
    let placement = (still_alive + remaining + 1) as u32;
    for (team_id, _) in &eliminated[idx..idx + cohort] {
      placed.push(PlacedTeam::new(*team_id, placement));
    }
    idx += cohort;
  }
  placed
}

/// Collapses placements coming from several groups: all group winners
/// first, then all runners-up and so on, ties by seed order.
pub fn merge_group_placements(ctx: &TournamentContext, mut placed: Vec<PlacedTeam>) -> Result<Vec<PlacedTeam>, BracketError> {
  let mut seeds = Vec::with_capacity(placed.len());
  for entry in &placed {
    let team = ctx.team_by_id(entry.team_id).ok_or(BracketError::TeamNotFound(entry.team_id))?;
    seeds.push((entry.team_id, team.seed));
  }
  let seed_of = |team_id: TeamId| {
    seeds
      .iter()
      .find(|(id, _)| *id == team_id)
      .map(|(_, seed)| *seed)
      .unwrap_or(u32::MAX)
  };
  placed.sort_by(|a, b| {
    a.placement
      .cmp(&b.placement)
      .then_with(|| seed_of(a.team_id).cmp(&seed_of(b.team_id)))
  });
  let global = competition_placements(&placed, |a, b| a.placement == b.placement);
  for (entry, placement) in placed.iter_mut().zip(global) {
    entry.placement = placement;
  }
  Ok(placed)
}

/// Attaches team rows and strips members who never played.
pub fn into_standings(ctx: &TournamentContext, placed: Vec<PlacedTeam>) -> Result<Vec<Standing>, BracketError> {
  placed
    .into_iter()
    .map(|entry| {
      let mut team = ctx
        .team_by_id(entry.team_id)
        .cloned()
        .ok_or(BracketError::TeamNotFound(entry.team_id))?;
      if let Some(participated) = &ctx.participated_users {
        team.members.retain(|member| participated.contains(&member.user_id));
      }
      Ok(Standing {
        team,
        placement: entry.placement,
        group_id: entry.group_id,
        stats: entry.stats,
      })
    })
    .collect()
}
