use std::cmp::Ordering;

use crate::error::BracketError;
use crate::standings::{competition_placements, loser_id, merge_group_placements, winner_id, PlacedTeam};
use crate::types::{
  BracketDataSet, BracketMapCounts, GroupId, Match, RoundMapsConfig, Side, SourceResult, Standing, StandingStats,
  TeamId, TournamentContext,
};

/// One line of a group table while it is being ranked.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TableRow {
  pub team_id: TeamId,
  pub seed: u32,
  pub dropped_out: bool,
  pub stats: StandingStats,
}

/// Per-group tally keyed by first appearance.
#[derive(Debug, Default)]
pub(crate) struct GroupTable {
  pub rows: Vec<TableRow>,
}

impl GroupTable {
  /// Registers every team named in `matches`.
  pub fn new(ctx: &TournamentContext, matches: &[&Match]) -> Result<Self, BracketError> {
    let mut table = GroupTable::default();
    for m in matches {
      for slot in [m.opponent1.as_ref(), m.opponent2.as_ref()].into_iter().flatten() {
        let Some(team_id) = slot.id else {
          continue;
        };
        if table.row(team_id).is_some() {
          continue;
        }
        let team = ctx.team_by_id(team_id).ok_or(BracketError::TeamNotFound(team_id))?;
        table.rows.push(TableRow {
          team_id,
          seed: team.seed,
          dropped_out: team.dropped_out,
          stats: StandingStats::default(),
        });
      }
    }
    Ok(table)
  }

  pub fn row(&self, team_id: TeamId) -> Option<&TableRow> {
    self.rows.iter().find(|row| row.team_id == team_id)
  }

  pub fn stats_mut(&mut self, team_id: TeamId) -> Option<&mut StandingStats> {
    self
      .rows
      .iter_mut()
      .find(|row| row.team_id == team_id)
      .map(|row| &mut row.stats)
  }

  /// Sets, maps and points of one decided match.
  pub fn record(&mut self, m: &Match) -> Result<Option<(TeamId, TeamId)>, BracketError> {
    let (Some(winner), Some(loser)) = (winner_id(m)?, loser_id(m)?) else {
      return Ok(None);
    };
    if let Some(stats) = self.stats_mut(winner) {
      stats.set_wins += 1;
    }
    if let Some(stats) = self.stats_mut(loser) {
      stats.set_losses += 1;
    }
    for side in [Side::Opponent1, Side::Opponent2] {
      let (Some(own), Some(other)) = (m.slot(side), m.slot(side.other())) else {
        continue;
      };
      let Some(team_id) = own.id else {
        continue;
      };
      if let Some(stats) = self.stats_mut(team_id) {
        stats.map_wins += own.score.unwrap_or(0);
        stats.map_losses += other.score.unwrap_or(0);
        stats.points += own.total_points.unwrap_or(0);
      }
    }
    Ok(Some((winner, loser)))
  }

  /// Sorts with `compare`, seed breaking what is left, and hands out
  /// shared placements for rows `compare` cannot separate.
  pub fn rank<F>(mut self, group_id: GroupId, compare: F) -> Vec<PlacedTeam>
  where
    F: Fn(&TableRow, &TableRow) -> Ordering,
  {
    self
      .rows
      .sort_by(|a, b| compare(a, b).then_with(|| a.seed.cmp(&b.seed)));
    let placements = competition_placements(&self.rows, |a, b| compare(a, b) == Ordering::Equal);
    self
      .rows
      .into_iter()
      .zip(placements)
      .map(|(row, placement)| PlacedTeam {
        team_id: row.team_id,
        placement,
        group_id: Some(group_id),
        stats: Some(row.stats),
      })
      .collect()
  }
}

fn compare_rows(a: &TableRow, b: &TableRow) -> Ordering {
  a.dropped_out
    .cmp(&b.dropped_out)
    .then_with(|| b.stats.set_wins.cmp(&a.stats.set_wins))
    .then_with(|| b.stats.wins_against_tied.cmp(&a.stats.wins_against_tied))
    .then_with(|| b.stats.map_wins.cmp(&a.stats.map_wins))
    .then_with(|| a.stats.map_losses.cmp(&b.stats.map_losses))
    .then_with(|| b.stats.points.cmp(&a.stats.points))
}

fn group_finished(matches: &[&Match]) -> bool {
  matches.iter().all(|m| m.is_bye() || m.is_decided())
}

pub fn standings(data: &BracketDataSet, ctx: &TournamentContext) -> Result<Vec<PlacedTeam>, BracketError> {
  let mut groups = data.groups.iter().collect::<Vec<_>>();
  groups.sort_by_key(|group| group.number);

  let mut placed = Vec::new();
  for group in groups {
    let matches = data.matches_in_group(group.id);
    if !group_finished(&matches) {
      continue;
    }
    let mut table = GroupTable::new(ctx, &matches)?;
    let mut results = Vec::new();
    for m in &matches {
      if let Some(pair) = table.record(m)? {
        results.push(pair);
      }
    }
    // head to head only between teams level on set wins
    for (winner, loser) in results {
      let (Some(w), Some(l)) = (table.row(winner), table.row(loser)) else {
        continue;
      };
      if w.stats.set_wins != l.stats.set_wins {
        continue;
      }
      if let Some(stats) = table.stats_mut(winner) {
        stats.wins_against_tied += 1;
      }
      if let Some(stats) = table.stats_mut(loser) {
        stats.losses_against_tied += 1;
      }
    }
    placed.extend(table.rank(group.id, compare_rows));
  }
  merge_group_placements(ctx, placed)
}

/// Resolves placements given on the dense 1..k scale of distinct
/// standing placements.
pub fn source_by_placement(
  standings: &[Standing],
  placements: &[i32],
  relevant_matches_finished: bool,
) -> Result<SourceResult, BracketError> {
  if placements.iter().any(|placement| *placement < 0) {
    return Err(BracketError::NotImplemented("negative placements in group stages"));
  }
  let mut distinct = standings.iter().map(|standing| standing.placement).collect::<Vec<_>>();
  distinct.sort_unstable();
  distinct.dedup();

  let teams = standings
    .iter()
    .filter(|standing| {
      distinct
        .iter()
        .position(|placement| *placement == standing.placement)
        .is_some_and(|idx| placements.contains(&(idx as i32 + 1)))
    })
    .map(|standing| standing.team.id)
    .collect();
  Ok(SourceResult {
    relevant_matches_finished,
    teams,
  })
}

pub fn default_round_best_ofs(data: &BracketDataSet) -> BracketMapCounts {
  let mut counts = BracketMapCounts::new();
  for round in &data.rounds {
    counts
      .entry(round.group_id)
      .or_default()
      .insert(round.number, RoundMapsConfig::best_of(3));
  }
  counts
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::{bracket, context, decide, favourite, generate, placements, play_all};
  use crate::types::{BracketSettings, Topology};

  const KIND: Topology = Topology::RoundRobin;

  fn cycle(a: TeamId, b: TeamId) -> Side {
    let winner = match (a.min(b), a.max(b)) {
      (low, 4) => low,
      (1, 2) => 1,
      (2, 3) => 2,
      (1, 3) => 3,
      _ => a,
    };
    if winner == a {
      Side::Opponent1
    } else {
      Side::Opponent2
    }
  }

  #[test]
  fn three_way_cycle_stays_tied() {
    let mut data = generate(KIND, 4, &BracketSettings::default());
    assert_eq!(play_all(&mut data, KIND, cycle), 6);
    let b = bracket(KIND, context(4), data);
    let standings = b.standings().unwrap();
    let order = standings
      .iter()
      .map(|standing| (standing.team.id, standing.placement))
      .collect::<Vec<_>>();
    assert_eq!(order, vec![(1, 1), (2, 1), (3, 1), (4, 4)]);
    let stats = standings[0].stats.as_ref().unwrap();
    assert_eq!((stats.set_wins, stats.set_losses), (2, 1));
    assert_eq!(stats.wins_against_tied, 1);
    assert_eq!(stats.losses_against_tied, 1);
  }

  #[test]
  fn head_to_head_breaks_a_two_way_tie() {
    let mut data = generate(KIND, 4, &BracketSettings::default());
    play_all(&mut data, KIND, |a, b| {
      let winner = match (a.min(b), a.max(b)) {
        (1, 2) => 2,
        (1, _) => 1,
        (2, 3) => 3,
        (2, 4) => 2,
        (3, 4) => 4,
        _ => a,
      };
      if winner == a {
        Side::Opponent1
      } else {
        Side::Opponent2
      }
    });
    // 1: beat 3, 4  lost 2 -> 2-1
    // 2: beat 1, 4  lost 3 -> 2-1
    // 3: beat 2     lost 1, 4 -> 1-2
    // 4: beat 3     lost 1, 2 -> 1-2
    let result = placements(&bracket(KIND, context(4), data));
    assert_eq!(result[0], (2, 1));
    assert_eq!(result[1], (1, 2));
  }

  #[test]
  fn unfinished_groups_are_left_out() {
    let settings = BracketSettings {
      group_count: 2,
      ..BracketSettings::default()
    };
    let mut data = generate(KIND, 6, &settings);
    let first_group = data.group_by_number(1).unwrap().id;
    let ids = data
      .matches
      .iter()
      .filter(|m| m.group_id == first_group && !m.is_bye())
      .map(|m| m.id)
      .collect::<Vec<_>>();
    for id in ids {
      decide(&mut data, KIND, id, Side::Opponent1);
    }
    let b = bracket(KIND, context(6), data);
    let standings = b.standings().unwrap();
    assert_eq!(standings.len(), 3);
    assert!(standings.iter().all(|standing| standing.group_id == Some(first_group)));
  }

  #[test]
  fn groups_interleave_by_placement() {
    let settings = BracketSettings {
      group_count: 2,
      ..BracketSettings::default()
    };
    let mut data = generate(KIND, 8, &settings);
    play_all(&mut data, KIND, favourite);
    let result = placements(&bracket(KIND, context(8), data));
    // snake deal: group 1 = 1 4 5 8, group 2 = 2 3 6 7
    assert_eq!(
      result,
      vec![(1, 1), (2, 1), (3, 3), (4, 3), (5, 5), (6, 5), (7, 7), (8, 7)]
    );
  }

  #[test]
  fn source_uses_normalized_placements() {
    let settings = BracketSettings {
      group_count: 2,
      ..BracketSettings::default()
    };
    let mut data = generate(KIND, 8, &settings);
    play_all(&mut data, KIND, favourite);
    let b = bracket(KIND, context(8), data);
    let result = b.source(&[1, 2], None).unwrap();
    assert!(result.relevant_matches_finished);
    assert_eq!(result.teams, vec![1, 2, 3, 4]);
    assert!(matches!(b.source(&[-1], None), Err(BracketError::NotImplemented(_))));
  }

  #[test]
  fn every_round_is_best_of_three() {
    let data = generate(KIND, 5, &BracketSettings::default());
    let counts = default_round_best_ofs(&data);
    assert_eq!(counts[&0].len(), 5);
    assert!(counts[&0].values().all(|config| config.count == 3));
  }
}
