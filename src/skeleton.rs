use crate::error::BracketError;
use crate::layout::{grand_finals_group, losers_group, winners_group, SINGLE_ELIMINATION_GROUP, THIRD_PLACE_GROUP};
use crate::progression::settle_byes;
use crate::types::{
  BracketDataSet, BracketSettings, Group, GroupId, Match, MatchId, Round, RoundId, Slot, TeamId, Topology,
  DEFAULT_SWISS_ROUND_COUNT,
};

/// Builds the initial match graph of a bracket from a seeding order.
pub trait BracketGenerator {
  fn generate(
    &self,
    kind: Topology,
    seeding: &[TeamId],
    settings: &BracketSettings,
  ) -> Result<BracketDataSet, BracketError>;
}

/// Default generator producing the layouts the engine reads.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkeletonGenerator;

impl BracketGenerator for SkeletonGenerator {
  fn generate(
    &self,
    kind: Topology,
    seeding: &[TeamId],
    settings: &BracketSettings,
  ) -> Result<BracketDataSet, BracketError> {
    if seeding.len() < 2 {
      return Err(BracketError::InvalidSettings("a bracket needs at least two teams".to_string()));
    }
    let mut builder = DataSetBuilder::new(seeding);
    match kind {
      Topology::SingleElimination => {
        build_single_elimination(&mut builder, seeding, settings.third_place_match);
      }
      Topology::DoubleElimination => {
        build_double_elimination(&mut builder, seeding, 0, settings.grand_final_reset);
      }
      Topology::DoubleEliminationGroups => {
        for (pool, teams) in deal_into_groups(seeding, settings.group_count)?.iter().enumerate() {
          if teams.len() < 2 {
            return Err(BracketError::InvalidSettings(format!(
              "pool {} would have {} team(s)",
              pool + 1,
              teams.len()
            )));
          }
          build_double_elimination(&mut builder, teams, pool as u32, settings.grand_final_reset);
        }
      }
      Topology::RoundRobin => {
        for (idx, teams) in deal_into_groups(seeding, settings.group_count)?.iter().enumerate() {
          build_round_robin_group(&mut builder, teams, idx as u32 + 1);
        }
      }
      Topology::Swiss => {
        let round_count = settings.round_count.unwrap_or(DEFAULT_SWISS_ROUND_COUNT);
        if round_count == 0 {
          return Err(BracketError::InvalidSettings("swiss needs at least one round".to_string()));
        }
        for (idx, teams) in deal_into_groups(seeding, settings.group_count)?.iter().enumerate() {
          build_swiss_group(&mut builder, teams, idx as u32 + 1, round_count);
        }
      }
    }
    let mut data = builder.finish();
    settle_byes(&mut data, kind)?;
    Ok(data)
  }
}

struct DataSetBuilder {
  data: BracketDataSet,
  next_group: GroupId,
  next_round: RoundId,
  next_match: MatchId,
}

impl DataSetBuilder {
  fn new(seeding: &[TeamId]) -> Self {
    DataSetBuilder {
      data: BracketDataSet {
        teams: seeding.to_vec(),
        ..BracketDataSet::default()
      },
      next_group: 0,
      next_round: 0,
      next_match: 0,
    }
  }

  fn push_group(&mut self, number: u32) -> GroupId {
    let id = self.next_group;
    self.next_group += 1;
    self.data.groups.push(Group { id, number });
    id
  }

  fn push_round(&mut self, group_id: GroupId, number: u32) -> RoundId {
    let id = self.next_round;
    self.next_round += 1;
    self.data.rounds.push(Round {
      id,
      number,
      group_id,
      maps: None,
    });
    id
  }

  fn push_match(
    &mut self,
    group_id: GroupId,
    round_id: RoundId,
    number: u32,
    opponent1: Option<Slot>,
    opponent2: Option<Slot>,
  ) -> MatchId {
    let id = self.next_match;
    self.next_match += 1;
    self.data.matches.push(Match {
      id,
      round_id,
      group_id,
      number,
      opponent1,
      opponent2,
    });
    id
  }

  /// A round of `count` matches whose slots get filled by progression.
  fn push_pending_round(&mut self, group_id: GroupId, number: u32, count: usize) {
    let round_id = self.push_round(group_id, number);
    for idx in 0..count {
      self.push_match(group_id, round_id, idx as u32 + 1, Some(Slot::default()), Some(Slot::default()));
    }
  }

  fn finish(self) -> BracketDataSet {
    self.data
  }
}

/// Winners side shared by single and double elimination. Returns the round count.
fn build_winners_side(builder: &mut DataSetBuilder, seeding: &[TeamId], group_number: u32) -> usize {
  let bracket_size = next_power_of_two(seeding.len().max(2));
  let rounds = bracket_size.trailing_zeros() as usize;
  let group_id = builder.push_group(group_number);

  let seeds = seed_positions(bracket_size as u32);
  let round_id = builder.push_round(group_id, 1);
  for i in 0..(bracket_size / 2) {
    let slot_a = seed_slot(seeding, seeds[i * 2]);
    let slot_b = seed_slot(seeding, seeds[i * 2 + 1]);
    builder.push_match(group_id, round_id, i as u32 + 1, slot_a, slot_b);
  }

  for round in 2..=rounds {
    builder.push_pending_round(group_id, round as u32, bracket_size >> round);
  }
  rounds
}

fn build_single_elimination(builder: &mut DataSetBuilder, seeding: &[TeamId], third_place_match: bool) {
  let rounds = build_winners_side(builder, seeding, SINGLE_ELIMINATION_GROUP);
  if third_place_match && rounds >= 2 {
    let group_id = builder.push_group(THIRD_PLACE_GROUP);
    builder.push_pending_round(group_id, 1, 1);
  }
}

fn build_double_elimination(builder: &mut DataSetBuilder, seeding: &[TeamId], pool: u32, allow_reset: bool) {
  let rounds = build_winners_side(builder, seeding, winners_group(pool));
  if rounds < 2 {
    return;
  }
  let bracket_size = 1usize << rounds;

  let losers_id = builder.push_group(losers_group(pool));
  for i in 1..rounds {
    // winners round i+1 has as many matches as both losers rounds fed by it
    let count = bracket_size >> (i + 1);
    builder.push_pending_round(losers_id, (i * 2 - 1) as u32, count);
    builder.push_pending_round(losers_id, (i * 2) as u32, count);
  }

  let finals_id = builder.push_group(grand_finals_group(pool));
  builder.push_pending_round(finals_id, 1, 1);
  if allow_reset {
    builder.push_pending_round(finals_id, 2, 1);
  }
}

/// Circle method; odd groups get a BYE match each round.
fn build_round_robin_group(builder: &mut DataSetBuilder, teams: &[TeamId], group_number: u32) {
  let group_id = builder.push_group(group_number);
  let mut ring = teams.iter().copied().map(Some).collect::<Vec<Option<TeamId>>>();
  if ring.len() % 2 == 1 {
    ring.push(None);
  }
  let size = ring.len();
  for round in 0..size.saturating_sub(1) {
    let round_id = builder.push_round(group_id, round as u32 + 1);
    let mut number = 1;
    for i in 0..(size / 2) {
      let (a, b) = (ring[i], ring[size - 1 - i]);
      let (opponent1, opponent2) = match (a, b) {
        (Some(a), Some(b)) => (Some(Slot::team(a)), Some(Slot::team(b))),
        (Some(team), None) | (None, Some(team)) => (Some(Slot::team(team)), None),
        (None, None) => continue,
      };
      builder.push_match(group_id, round_id, number, opponent1, opponent2);
      number += 1;
    }
    // first entry stays put, the rest rotate
    let last = ring.remove(size - 1);
    ring.insert(1, last);
  }
}

/// Only round 1 is paired up front: top half against bottom half.
fn build_swiss_group(builder: &mut DataSetBuilder, teams: &[TeamId], group_number: u32, round_count: u32) {
  let group_id = builder.push_group(group_number);
  let first_round = builder.push_round(group_id, 1);
  for number in 2..=round_count {
    builder.push_round(group_id, number);
  }
  let half = teams.len() / 2;
  let mut number = 1;
  for i in 0..half {
    builder.push_match(
      group_id,
      first_round,
      number,
      Some(Slot::team(teams[i])),
      Some(Slot::team(teams[i + half])),
    );
    number += 1;
  }
  if teams.len() % 2 == 1 {
    builder.push_match(group_id, first_round, number, Some(Slot::team(teams[teams.len() - 1])), None);
  }
}

/// Snake order: 1 2 3 3 2 1 1 2 3 ...
pub fn deal_into_groups(seeding: &[TeamId], group_count: u32) -> Result<Vec<Vec<TeamId>>, BracketError> {
  let group_count = group_count.max(1) as usize;
  if group_count > seeding.len() {
    return Err(BracketError::InvalidSettings(format!(
      "{group_count} groups for {} teams",
      seeding.len()
    )));
  }
  let mut groups = vec![Vec::new(); group_count];
  for (idx, team_id) in seeding.iter().copied().enumerate() {
    let lap = idx / group_count;
    let offset = idx % group_count;
    let target = if lap % 2 == 0 { offset } else { group_count - 1 - offset };
    groups[target].push(team_id);
  }
  Ok(groups)
}

fn seed_slot(seeding: &[TeamId], seed: u32) -> Option<Slot> {
  seeding.get(seed as usize - 1).copied().map(Slot::team)
}

pub fn seed_positions(size: u32) -> Vec<u32> {
  let mut seeds = vec![1u32];
  while seeds.len() < size as usize {
    let n = seeds.len() as u32;
    let mut next = Vec::with_capacity(seeds.len() * 2);
    for seed in seeds.iter().copied() {
      next.push(seed);
      next.push((n * 2 + 1).saturating_sub(seed));
    }
    seeds = next;
  }
  seeds
}

pub fn next_power_of_two(n: usize) -> usize {
  n.max(1).next_power_of_two()
}
