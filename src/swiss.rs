//! Swiss standings. Everything round robin tracks plus opponents' win
//! percentages, and an early-advance mode for sourcing.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::warn;

use crate::error::BracketError;
use crate::round_robin::{GroupTable, TableRow};
use crate::standings::{merge_group_placements, PlacedTeam};
use crate::types::{
  BracketDataSet, BracketMapCounts, Match, RoundMapsConfig, SourceResult, Standing, TeamId, TeamStatus,
  TeamTrackRecord, TournamentContext, FALLBACK_MAP_COUNT,
};

/// Map count handed out by `default_round_best_ofs`.
const DEFAULT_SWISS_MAPS: u32 = 3;

pub fn calculate_team_status(wins: u32, losses: u32, round_count: u32, advance_threshold: u32) -> TeamStatus {
  if wins >= advance_threshold {
    return TeamStatus::Advanced;
  }
  // can no longer reach the threshold in the rounds left
  if losses >= (round_count + 1).saturating_sub(advance_threshold) {
    return TeamStatus::Eliminated;
  }
  TeamStatus::Undecided
}

fn bye_map_wins(data: &BracketDataSet, m: &Match) -> u32 {
  let Some(round) = data.round(m.round_id) else {
    warn!("round {} of bye match {} is missing, assuming bo{FALLBACK_MAP_COUNT}", m.round_id, m.id);
    return RoundMapsConfig::best_of(FALLBACK_MAP_COUNT).walkover_map_wins();
  };
  match round.maps {
    Some(maps) => maps.walkover_map_wins(),
    None => {
      warn!("round {} has no map count, assuming bo{FALLBACK_MAP_COUNT} for bye match {}", round.id, m.id);
      RoundMapsConfig::best_of(FALLBACK_MAP_COUNT).walkover_map_wins()
    }
  }
}

fn compare_rows(a: &TableRow, b: &TableRow) -> Ordering {
  a.dropped_out
    .cmp(&b.dropped_out)
    .then_with(|| b.stats.set_wins.cmp(&a.stats.set_wins))
    .then_with(|| a.stats.set_losses.cmp(&b.stats.set_losses))
    .then_with(|| a.stats.losses_against_tied.cmp(&b.stats.losses_against_tied))
    .then_with(|| b.stats.opponent_set_win_percentage.total_cmp(&a.stats.opponent_set_win_percentage))
    .then_with(|| b.stats.map_wins.cmp(&a.stats.map_wins))
    .then_with(|| a.stats.map_losses.cmp(&b.stats.map_losses))
    .then_with(|| b.stats.opponent_map_win_percentage.total_cmp(&a.stats.opponent_map_win_percentage))
}

pub fn standings(data: &BracketDataSet, ctx: &TournamentContext) -> Result<Vec<PlacedTeam>, BracketError> {
  let mut groups = data.groups.iter().collect::<Vec<_>>();
  groups.sort_by_key(|group| group.number);

  let mut placed = Vec::new();
  for group in groups {
    let matches = data.matches_in_group(group.id);
    let mut table = GroupTable::new(ctx, &matches)?;
    let mut match_ups: HashMap<TeamId, Vec<TeamId>> = HashMap::new();
    let mut results = Vec::new();

    for m in &matches {
      if m.is_bye() {
        let lone = m.opponent1.as_ref().or(m.opponent2.as_ref()).and_then(|slot| slot.id);
        if let Some(team_id) = lone {
          let map_wins = bye_map_wins(data, m);
          if let Some(stats) = table.stats_mut(team_id) {
            stats.set_wins += 1;
            stats.map_wins += map_wins;
          }
        }
        continue;
      }
      if let Some((winner, loser)) = table.record(m)? {
        match_ups.entry(winner).or_default().push(loser);
        match_ups.entry(loser).or_default().push(winner);
        results.push((winner, loser));
      }
    }

    for (winner, loser) in results {
      let (Some(w), Some(l)) = (table.row(winner), table.row(loser)) else {
        continue;
      };
      if (w.stats.set_wins, w.stats.set_losses) != (l.stats.set_wins, l.stats.set_losses) {
        continue;
      }
      if let Some(stats) = table.stats_mut(winner) {
        stats.wins_against_tied += 1;
      }
      if let Some(stats) = table.stats_mut(loser) {
        stats.losses_against_tied += 1;
      }
    }

    let mut percentages = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
      let mut sets = TeamTrackRecord::default();
      let mut maps = TeamTrackRecord::default();
      for opponent in match_ups.get(&row.team_id).map(Vec::as_slice).unwrap_or_default() {
        let Some(opponent_row) = table.row(*opponent) else {
          warn!("opponent {opponent} of team {} not found in group {}", row.team_id, group.id);
          continue;
        };
        sets.add(TeamTrackRecord {
          wins: opponent_row.stats.set_wins,
          losses: opponent_row.stats.set_losses,
        });
        maps.add(TeamTrackRecord {
          wins: opponent_row.stats.map_wins,
          losses: opponent_row.stats.map_losses,
        });
      }
      percentages.push((row.team_id, sets.win_percentage(), maps.win_percentage()));
    }
    for (team_id, set_percentage, map_percentage) in percentages {
      if let Some(stats) = table.stats_mut(team_id) {
        stats.opponent_set_win_percentage = set_percentage;
        stats.opponent_map_win_percentage = map_percentage;
      }
    }

    placed.extend(table.rank(group.id, compare_rows));
  }
  merge_group_placements(ctx, placed)
}

/// Every team that has clinched, usable before the last round is played.
/// No standings yet means nothing is settled.
pub fn advanced_source(standings: &[Standing], round_count: u32, advance_threshold: u32) -> SourceResult {
  let mut result = SourceResult {
    relevant_matches_finished: !standings.is_empty(),
    teams: Vec::new(),
  };
  for standing in standings {
    let (wins, losses) = standing
      .stats
      .as_ref()
      .map(|stats| (stats.set_wins, stats.set_losses))
      .unwrap_or_default();
    match calculate_team_status(wins, losses, round_count, advance_threshold) {
      TeamStatus::Advanced => result.teams.push(standing.team.id),
      TeamStatus::Eliminated => {}
      TeamStatus::Undecided => result.relevant_matches_finished = false,
    }
  }
  result
}

/// Later rounds are paired as the event runs; a round without matches
/// means the bracket can't be over yet.
pub fn every_round_scheduled(data: &BracketDataSet) -> bool {
  data
    .rounds
    .iter()
    .all(|round| data.matches.iter().any(|m| m.round_id == round.id))
}

pub fn default_round_best_ofs(data: &BracketDataSet) -> BracketMapCounts {
  let mut counts = BracketMapCounts::new();
  for round in &data.rounds {
    counts
      .entry(round.group_id)
      .or_default()
      .insert(round.number, RoundMapsConfig::best_of(DEFAULT_SWISS_MAPS));
  }
  counts
}
