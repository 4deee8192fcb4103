use libaddrmatch_macros::comparison;

use crate::{
  model::AddressRecord,
  scoring::{Comparison, Outcome, comparisons::frequency_score},
};

// Scores below the first threshold get level 10, below the last level 1.
const WORD_FREQUENCY_THRESHOLDS: [f64; 10] = [1e-20, 1e-18, 1e-16, 1e-14, 1e-12, 1e-10, 1e-8, 1e-6, 1e-4, 1e-2];
const COMMON_END_TOKEN_THRESHOLD: f64 = 1e-2;

#[comparison(WordFrequency, name = "token_rel_freq", levels = [10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0])]
fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome {
  if lhs.token_rel_freq_list.is_empty() || rhs.token_rel_freq_list.is_empty() {
    return Outcome::not_comparable();
  }

  let score = frequency_score(&lhs.token_rel_freq_list, &rhs.token_rel_freq_list);

  let level = match WORD_FREQUENCY_THRESHOLDS.iter().position(|threshold| score < *threshold) {
    Some(index) => (WORD_FREQUENCY_THRESHOLDS.len() - index) as u8,
    None => 0,
  };

  let rarest_shared = lhs
    .token_rel_freq_list
    .iter()
    .filter(|token| rhs.token_rel_freq_list.iter().any(|other| other.token == token.token))
    .map(|token| token.rel_freq)
    .reduce(f64::min);

  Outcome::level(level).with_frequency(rarest_shared)
}

#[comparison(CommonEndTokenFrequency, name = "common_end_tokens", levels = [1, 0])]
fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome {
  if lhs.common_end_tokens.is_empty() || rhs.common_end_tokens.is_empty() {
    return Outcome::not_comparable();
  }

  match frequency_score(&lhs.common_end_tokens, &rhs.common_end_tokens) < COMMON_END_TOKEN_THRESHOLD {
    true => Outcome::level(1),
    false => Outcome::level(0),
  }
}
