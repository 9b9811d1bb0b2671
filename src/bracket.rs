use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::double_elimination;
use crate::double_elimination_groups;
use crate::error::BracketError;
use crate::layout::{is_bracket_reset, reset_is_skipped, EliminationGroups};
use crate::round_robin;
use crate::simulation::simulate;
use crate::single_elimination;
use crate::skeleton::{BracketGenerator, SkeletonGenerator};
use crate::standings::into_standings;
use crate::swiss;
use crate::types::{
  BracketDataSet, BracketId, BracketMapCounts, BracketSettings, MatchId, SourceResult, Standing, TeamId, Topology,
  TournamentContext, UserId,
};

/// Everything needed to stand up a bracket.
#[derive(Clone, Debug)]
pub struct CreateBracketArgs {
  pub id: BracketId,
  pub idx: usize,
  pub name: String,
  pub kind: Topology,
  pub preview: bool,
  /// Live data; when absent `seeding` is used to build a virtual bracket.
  pub data: Option<BracketDataSet>,
  pub seeding: Option<Vec<TeamId>>,
  pub settings: BracketSettings,
  pub teams_pending_check_in: Option<Vec<TeamId>>,
  pub ctx: Arc<TournamentContext>,
}

/// One stage of a tournament with a single topology.
#[derive(Clone, Debug)]
pub struct Bracket {
  pub id: BracketId,
  pub idx: usize,
  pub name: String,
  pub preview: bool,
  pub data: BracketDataSet,
  pub settings: BracketSettings,
  pub teams_pending_check_in: Option<Vec<TeamId>>,
  kind: Topology,
  simulated_data: Option<BracketDataSet>,
  ctx: Arc<TournamentContext>,
}

impl Bracket {
  pub fn create(args: CreateBracketArgs) -> Result<Self, BracketError> {
    Bracket::create_with(args, &SkeletonGenerator)
  }

  pub fn create_with(args: CreateBracketArgs, generator: &dyn BracketGenerator) -> Result<Self, BracketError> {
    let data = match (args.data, args.seeding) {
      (Some(data), _) => data,
      (None, Some(seeding)) => generator.generate(args.kind, &seeding, &args.settings)?,
      (None, None) => return Err(BracketError::MissingDataAndSeeding),
    };

    let config = &args.ctx.config;
    let simulated_data = if config.simulate_brackets && args.preview && args.kind.is_elimination() {
      debug!("simulating preview of bracket {} ({})", args.id, args.kind);
      Some(simulate(
        data.clone(),
        args.kind,
        &args.ctx.teams,
        config.simulation_iteration_cap,
      ))
    } else {
      None
    };

    Ok(Bracket {
      id: args.id,
      idx: args.idx,
      name: args.name,
      preview: args.preview,
      data,
      settings: args.settings,
      teams_pending_check_in: args.teams_pending_check_in,
      kind: args.kind,
      simulated_data,
      ctx: args.ctx,
    })
  }

  pub fn kind(&self) -> Topology {
    self.kind
  }

  pub fn ctx(&self) -> &TournamentContext {
    &self.ctx
  }

  pub fn simulated_data(&self) -> Option<&BracketDataSet> {
    self.simulated_data.as_ref()
  }

  /// What to show: the simulated replay of a preview, else the real data.
  pub fn view_data(&self) -> &BracketDataSet {
    self.simulated_data.as_ref().unwrap_or(&self.data)
  }

  /// Distinct team ids over every slot, in order of first appearance.
  pub fn participant_team_ids(&self) -> Vec<TeamId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for m in &self.data.matches {
      for slot in [m.opponent1.as_ref(), m.opponent2.as_ref()].into_iter().flatten() {
        if let Some(team_id) = slot.id {
          if seen.insert(team_id) {
            ids.push(team_id);
          }
        }
      }
    }
    ids
  }

  pub fn enough_teams(&self) -> bool {
    self.participant_team_ids().len() >= self.ctx.config.enough_teams_to_start
  }

  pub fn can_check_in(&self, user_id: UserId) -> bool {
    let Some(pending) = &self.teams_pending_check_in else {
      return false;
    };
    self
      .ctx
      .owned_team_by_user(user_id)
      .is_some_and(|team| pending.contains(&team.id))
  }

  pub fn standings(&self) -> Result<Vec<Standing>, BracketError> {
    if !self.enough_teams() {
      return Ok(Vec::new());
    }
    let placed = match self.kind {
      Topology::SingleElimination => single_elimination::standings(&self.data, &self.participant_team_ids())?,
      Topology::DoubleElimination => double_elimination::pool_standings(
        &self.data,
        &EliminationGroups::for_pool(&self.data, 0),
        &self.participant_team_ids(),
      )?,
      Topology::DoubleEliminationGroups => double_elimination_groups::standings(&self.data)?,
      Topology::RoundRobin => round_robin::standings(&self.data, &self.ctx)?,
      Topology::Swiss => swiss::standings(&self.data, &self.ctx)?,
    };
    into_standings(&self.ctx, placed)
  }

  /// Teams holding `placements`, for seeding the next bracket. Negative
  /// placements count from the losers side.
  pub fn source(&self, placements: &[i32], advance_threshold: Option<u32>) -> Result<SourceResult, BracketError> {
    match self.kind {
      Topology::SingleElimination => {
        single_elimination::source(&self.standings()?, placements, self.every_match_over())
      }
      Topology::DoubleElimination => double_elimination::source(&self.data, placements),
      Topology::DoubleEliminationGroups => double_elimination_groups::source(&self.data, placements),
      Topology::RoundRobin => round_robin::source_by_placement(&self.standings()?, placements, self.every_match_over()),
      Topology::Swiss => match advance_threshold.or(self.settings.advance_threshold) {
        Some(threshold) => Ok(swiss::advanced_source(
          &self.standings()?,
          self.swiss_round_count(),
          threshold,
        )),
        None => round_robin::source_by_placement(
          &self.standings()?,
          placements,
          self.every_match_over() && swiss::every_round_scheduled(&self.data),
        ),
      },
    }
  }

  fn swiss_round_count(&self) -> u32 {
    self
      .settings
      .round_count
      .unwrap_or(self.ctx.config.swiss_default_round_count)
  }

  pub fn default_round_best_ofs(&self, data: &BracketDataSet) -> BracketMapCounts {
    match self.kind {
      Topology::SingleElimination => single_elimination::default_round_best_ofs(data),
      Topology::DoubleElimination | Topology::DoubleEliminationGroups => {
        double_elimination::default_round_best_ofs(data)
      }
      Topology::RoundRobin => round_robin::default_round_best_ofs(data),
      Topology::Swiss => swiss::default_round_best_ofs(data),
    }
  }

  /// Matches both teams can play right now. A team already due in an
  /// earlier undecided match is busy for everything after it. Earlier
  /// means ordered by round id, then match number, then match id.
  pub fn ongoing_matches(&self) -> Vec<MatchId> {
    if self.kind == Topology::Swiss {
      return Vec::new();
    }
    let mut ordered = self.data.matches.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|m| (m.round_id, m.number, m.id));

    let mut busy = HashSet::new();
    let mut ongoing = Vec::new();
    for m in ordered {
      if m.is_decided() {
        continue;
      }
      let Some((first, second)) = m.team_ids() else {
        continue;
      };
      if !busy.contains(&first) && !busy.contains(&second) {
        ongoing.push(m.id);
      }
      busy.insert(first);
      busy.insert(second);
    }
    ongoing
  }

  pub fn every_match_over(&self) -> bool {
    if self.preview {
      return false;
    }
    let pools = match self.kind {
      Topology::DoubleElimination | Topology::DoubleEliminationGroups => EliminationGroups::all_pools(&self.data),
      _ => Vec::new(),
    };
    self.data.matches.iter().all(|m| {
      if m.is_bye() || m.is_decided() {
        return true;
      }
      is_bracket_reset(&self.data, m)
        && pools
          .iter()
          .any(|groups| groups.contains(m.group_id) && reset_is_skipped(&self.data, groups))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::EngineConfig;
  use crate::test_support::{
    bracket, bracket_args, context, decide, favourite, generate, match_in, play_all, teams,
  };
  use crate::types::{Side, Team};
  use proptest::prelude::*;

  fn preview_args(kind: Topology, count: u32, simulate: bool) -> CreateBracketArgs {
    let config = EngineConfig {
      simulate_brackets: simulate,
      ..EngineConfig::default()
    };
    let mut args = bracket_args(kind, TournamentContext::new(teams(count), config), BracketDataSet::default());
    args.data = None;
    args.preview = true;
    args.seeding = Some((1..=count).collect());
    args
  }

  fn is_dense(placements: &[u32]) -> bool {
    let mut sorted = placements.to_vec();
    sorted.sort_unstable();
    sorted
      .iter()
      .enumerate()
      .all(|(idx, placement)| (idx > 0 && sorted[idx - 1] == *placement) || *placement == idx as u32 + 1)
  }

  #[test]
  fn needs_data_or_seeding() {
    let mut args = bracket_args(Topology::SingleElimination, context(4), BracketDataSet::default());
    args.data = None;
    assert_eq!(Bracket::create(args).err(), Some(BracketError::MissingDataAndSeeding));
  }

  #[test]
  fn preview_bootstraps_and_simulates() {
    let b = Bracket::create(preview_args(Topology::DoubleElimination, 8, true)).unwrap();
    assert!(b.data.matches.iter().all(|m| !m.is_decided()));
    let simulated = b.simulated_data().unwrap();
    assert!(simulated.matches.iter().any(|m| m.is_decided()));
    assert_eq!(b.view_data(), simulated);
    assert!(!b.every_match_over());
  }

  #[test]
  fn group_stages_are_never_simulated() {
    let b = Bracket::create(preview_args(Topology::RoundRobin, 6, true)).unwrap();
    assert!(b.simulated_data().is_none());
    assert_eq!(b.view_data(), &b.data);
  }

  #[test]
  fn simulation_needs_the_engine_switch() {
    let b = Bracket::create(preview_args(Topology::SingleElimination, 8, false)).unwrap();
    assert!(b.simulated_data().is_none());
  }

  #[test]
  fn standings_wait_for_enough_teams() {
    let mut data = generate(Topology::SingleElimination, 4, &BracketSettings::default());
    play_all(&mut data, Topology::SingleElimination, favourite);
    let mut ctx = context(4);
    ctx.config.enough_teams_to_start = 5;
    let b = bracket(Topology::SingleElimination, ctx, data);
    assert!(!b.enough_teams());
    assert!(b.standings().unwrap().is_empty());
  }

  #[test]
  fn participants_are_deduplicated_in_order() {
    let data = generate(Topology::RoundRobin, 4, &BracketSettings::default());
    let b = bracket(Topology::RoundRobin, context(4), data);
    let mut ids = b.participant_team_ids();
    assert_eq!(ids.len(), 4);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
  }

  #[test]
  fn first_round_is_ongoing_in_a_fresh_bracket() {
    let data = generate(Topology::SingleElimination, 8, &BracketSettings::default());
    let expected = (1..=4)
      .map(|number| match_in(&data, 1, 1, number).id)
      .collect::<Vec<_>>();
    let b = bracket(Topology::SingleElimination, context(8), data);
    assert_eq!(b.ongoing_matches(), expected);
  }

  #[test]
  fn round_robin_teams_are_busy_with_their_earliest_match() {
    let data = generate(Topology::RoundRobin, 4, &BracketSettings::default());
    let first_round = data.round_by_number(0, 1).unwrap().id;
    let expected = data
      .matches
      .iter()
      .filter(|m| m.round_id == first_round)
      .map(|m| m.id)
      .collect::<Vec<_>>();
    let b = bracket(Topology::RoundRobin, context(4), data);
    assert_eq!(b.ongoing_matches(), expected);
  }

  #[test]
  fn skipped_reset_does_not_block_completion() {
    let mut data = generate(Topology::DoubleElimination, 4, &BracketSettings::default());
    play_all(&mut data, Topology::DoubleElimination, favourite);
    let b = bracket(Topology::DoubleElimination, context(4), data);
    assert!(b.every_match_over());
    assert_eq!(b.standings().unwrap().len(), b.participant_team_ids().len());
  }

  #[test]
  fn pending_reset_blocks_completion() {
    let kind = Topology::DoubleElimination;
    let mut data = generate(kind, 4, &BracketSettings::default());
    play_all(&mut data, kind, |a, b| if b == 2 { Side::Opponent2 } else { favourite(a, b) });
    let grand_final = match_in(&data, 3, 1, 1).clone();
    assert_eq!(grand_final.winner_side(), Some(Side::Opponent2));
    let reset = match_in(&data, 3, 2, 1).id;
    let index = data.match_index(reset).unwrap();
    let m = &mut data.matches[index];
    for slot in [&mut m.opponent1, &mut m.opponent2] {
      if let Some(slot) = slot.as_mut() {
        slot.result = None;
        slot.score = None;
      }
    }
    let b = bracket(kind, context(4), data);
    assert!(!b.every_match_over());
    assert_eq!(b.ongoing_matches(), vec![reset]);
  }

  #[test]
  fn check_in_needs_an_owned_pending_team() {
    let mut args = bracket_args(
      Topology::SingleElimination,
      context(4),
      generate(Topology::SingleElimination, 4, &BracketSettings::default()),
    );
    args.teams_pending_check_in = Some(vec![2]);
    let b = Bracket::create(args).unwrap();
    assert!(b.can_check_in(20));
    assert!(!b.can_check_in(21));
    assert!(!b.can_check_in(10));
    assert!(!b.can_check_in(999));
  }

  #[test]
  fn no_pending_list_means_no_check_in() {
    let data = generate(Topology::SingleElimination, 4, &BracketSettings::default());
    let b = bracket(Topology::SingleElimination, context(4), data);
    assert!(!b.can_check_in(10));
  }

  #[test]
  fn standings_only_show_participating_members() {
    let mut data = generate(Topology::SingleElimination, 2, &BracketSettings::default());
    play_all(&mut data, Topology::SingleElimination, favourite);
    let mut ctx = context(2);
    ctx.participated_users = Some(HashSet::from([10, 20, 21]));
    let b = bracket(Topology::SingleElimination, ctx, data);
    let standings = b.standings().unwrap();
    let members = standings
      .iter()
      .map(|standing| standing.team.members.len())
      .collect::<Vec<_>>();
    assert_eq!(members, vec![1, 2]);
  }

  #[test]
  fn dropped_out_teams_sink_in_round_robin() {
    let mut data = generate(Topology::RoundRobin, 4, &BracketSettings::default());
    play_all(&mut data, Topology::RoundRobin, favourite);
    let mut roster: Vec<Team> = teams(4);
    roster[0].dropped_out = true;
    let b = bracket(Topology::RoundRobin, TournamentContext::new(roster, EngineConfig::default()), data);
    let standings = b.standings().unwrap();
    assert_eq!(standings.last().map(|standing| standing.team.id), Some(1));
  }

  #[test]
  fn single_elimination_source_waits_for_the_final() {
    let kind = Topology::SingleElimination;
    let mut data = generate(kind, 4, &BracketSettings::default());
    let first = match_in(&data, 1, 1, 1).id;
    decide(&mut data, kind, first, Side::Opponent1);
    let b = bracket(kind, context(4), data.clone());
    assert!(!b.source(&[1], None).unwrap().relevant_matches_finished);

    play_all(&mut data, kind, favourite);
    let b = bracket(kind, context(4), data);
    let result = b.source(&[1, 2], None).unwrap();
    assert!(result.relevant_matches_finished);
    assert_eq!(result.teams, vec![1, 2]);
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ongoing_matches_never_share_a_team(
      kind_idx in 0usize..3,
      count in 2u32..=24,
      salt in any::<u32>(),
      decided in 0usize..40,
    ) {
      let kind = [Topology::SingleElimination, Topology::DoubleElimination, Topology::RoundRobin][kind_idx];
      let mut data = generate(kind, count, &BracketSettings::default());
      let ids = data.matches.iter().map(|m| m.id).collect::<Vec<_>>();
      for match_id in ids.into_iter().take(decided) {
        let m = data.get_match(match_id).unwrap().clone();
        if m.team_ids().is_some() && !m.is_decided() {
          let side = if (match_id ^ salt) % 2 == 0 { Side::Opponent1 } else { Side::Opponent2 };
          decide(&mut data, kind, match_id, side);
        }
      }
      let b = bracket(kind, context(count), data);
      let ongoing = b.ongoing_matches();
      let mut seen = HashSet::new();
      for match_id in ongoing {
        let (first, second) = b.data.get_match(match_id).unwrap().team_ids().unwrap();
        prop_assert!(seen.insert(first));
        prop_assert!(seen.insert(second));
      }
    }

    #[test]
    fn completed_placements_are_dense(kind_idx in 0usize..3, count in 2u32..=32, salt in any::<u32>()) {
      let kind = [Topology::SingleElimination, Topology::DoubleElimination, Topology::RoundRobin][kind_idx];
      let mut data = generate(kind, count, &BracketSettings::default());
      play_all(&mut data, kind, |a, b| {
        if (a.wrapping_mul(31) ^ b.wrapping_mul(17) ^ salt) % 2 == 0 { Side::Opponent1 } else { Side::Opponent2 }
      });
      let b = bracket(kind, context(count), data);
      prop_assert!(b.every_match_over());
      let standings = b.standings().unwrap();
      prop_assert_eq!(standings.len(), b.participant_team_ids().len());
      let placements = standings.iter().map(|standing| standing.placement).collect::<Vec<_>>();
      prop_assert!(is_dense(&placements));
    }
  }
}
