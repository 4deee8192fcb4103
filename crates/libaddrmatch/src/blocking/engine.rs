use std::time::Instant;

use ahash::{HashMap, RandomState};
use metrics::{counter, histogram};
use rayon::prelude::*;
use tracing::instrument;

use crate::{
  blocking::rules::{BlockingRule, RuleSet},
  error::AddressMatchError,
  model::{AddressRecord, CandidatePair},
  settings::{BlockingSettings, BucketStrategy},
};

// Fixed seeds so hashed buckets are stable between runs.
const BUCKET_SEEDS: [u64; 4] = [0x5851_f42d_4c95_7f2d, 0x1405_7b7e_f767_814f, 0x2545_f491_4f6c_dd1d, 0x9e37_79b9_7f4a_7c15];

/// Lookup of canonical records by the values of the fields a rule reads on the right side.
struct RuleIndex<'r> {
  entries: HashMap<Vec<&'r str>, Vec<usize>>,
}

impl<'r> RuleIndex<'r> {
  fn build(rule: &BlockingRule, records: &'r [AddressRecord]) -> RuleIndex<'r> {
    let mut entries: HashMap<Vec<&'r str>, Vec<usize>> = HashMap::default();

    for (index, record) in records.iter().enumerate() {
      // Records missing any key field can never satisfy the rule.
      if let Some(key) = rule.predicate.right_fields().map(|field| field.value(record)).collect::<Option<Vec<_>>>() {
        entries.entry(key).or_default().push(index);
      }
    }

    RuleIndex { entries }
  }

  fn candidates(&self, rule: &BlockingRule, record: &'r AddressRecord) -> &[usize] {
    rule
      .predicate
      .left_fields()
      .map(|field| field.value(record))
      .collect::<Option<Vec<_>>>()
      .and_then(|key| self.entries.get(&key))
      .map(Vec::as_slice)
      .unwrap_or_default()
  }
}

/// Proposes candidate pairs between new and canonical records.
pub struct BlockingEngine {
  rules: RuleSet,
  full_block: bool,
  buckets: u32,
  bucket_strategy: BucketStrategy,
}

impl BlockingEngine {
  pub fn new(settings: &BlockingSettings) -> Result<BlockingEngine, AddressMatchError> {
    let rules = RuleSet::new(&settings.rules, settings.include_full_postcode_block)?;

    if rules.is_empty() && !settings.full_block {
      return Err(AddressMatchError::ConfigError("at least one blocking rule is required".into()));
    }

    if settings.buckets == 0 {
      return Err(AddressMatchError::ConfigError("at least one bucket is required".into()));
    }

    Ok(BlockingEngine {
      rules,
      full_block: settings.full_block,
      buckets: settings.buckets,
      bucket_strategy: settings.bucket_strategy,
    })
  }

  pub fn rules(&self) -> &RuleSet {
    &self.rules
  }

  /// Generate candidate pairs without building the cross product.
  ///
  /// Each rule looks up canonical records through its own index, and a pair
  /// found by a rule is kept only if no earlier rule definitely holds for it.
  /// Every pair is therefore emitted once, with the key of the first rule it
  /// satisfies. Pair order is unspecified.
  #[instrument(name = "block", skip_all, fields(new_records = lhs.len(), canonical_records = rhs.len()))]
  pub fn block<'a>(&self, lhs: &'a [AddressRecord], rhs: &'a [AddressRecord]) -> Vec<CandidatePair> {
    let then = Instant::now();

    if self.full_block {
      tracing::warn!("full block requested, emitting the whole cross product");

      return self.cross_product(lhs, rhs);
    }

    let indexes: Vec<RuleIndex<'a>> = self.rules.rules().par_iter().map(|rule| RuleIndex::build(rule, rhs)).collect();

    let pairs: Vec<CandidatePair> = lhs
      .par_iter()
      .enumerate()
      .flat_map_iter(|(left, record)| {
        let mut pairs = Vec::new();

        for (position, (rule, index)) in self.rules.rules().iter().zip(&indexes).enumerate() {
          for &right in index.candidates(rule, record) {
            let candidate = &rhs[right];

            if rule.predicate.evaluate(record, candidate).holds() && !self.rules.claimed_before(position, record, candidate) {
              pairs.push(self.pair(left, record, right, candidate, rule.match_key));
            }
          }
        }

        pairs
      })
      .collect();

    tracing::debug!(pairs = pairs.len(), "generated candidate pairs");

    counter!("addrmatch_candidate_pairs_total").increment(pairs.len() as u64);
    histogram!("addrmatch_blocking_latency_seconds").record(then.elapsed().as_secs_f64());

    pairs
  }

  fn cross_product(&self, lhs: &[AddressRecord], rhs: &[AddressRecord]) -> Vec<CandidatePair> {
    lhs
      .par_iter()
      .enumerate()
      .flat_map_iter(|(left, record)| rhs.iter().enumerate().map(move |(right, candidate)| self.pair(left, record, right, candidate, 0)))
      .collect()
  }

  fn pair(&self, left: usize, lhs: &AddressRecord, right: usize, rhs: &AddressRecord, match_key: usize) -> CandidatePair {
    CandidatePair {
      unique_id_l: lhs.unique_id.clone(),
      unique_id_r: rhs.unique_id.clone(),
      match_key,
      bucket: self.bucket(lhs, rhs),
      lhs: left,
      rhs: right,
    }
  }

  fn bucket(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> u32 {
    match self.bucket_strategy {
      BucketStrategy::Random => rand::random_range(1..=self.buckets),
      BucketStrategy::Hashed => {
        let [k0, k1, k2, k3] = BUCKET_SEEDS;
        let hash = RandomState::with_seeds(k0, k1, k2, k3).hash_one((&lhs.unique_id, &rhs.unique_id));

        (hash % self.buckets as u64) as u32 + 1
      }
    }
  }
}
