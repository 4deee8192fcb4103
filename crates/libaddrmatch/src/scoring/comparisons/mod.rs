use crate::{model::TokenFrequency, scoring::Comparison};

pub(crate) mod address;
pub(crate) mod flat;
pub(crate) mod numeric;
pub(crate) mod postcode;
pub(crate) mod tokens;

/// Every dimension of the comparison vector, in output order.
pub(crate) static COMPARISONS: &[&dyn Comparison] = &[
  &flat::FlatPositional,
  &numeric::NumericToken1,
  &numeric::NumericToken2,
  &numeric::NumericToken3,
  &tokens::WordFrequency,
  &tokens::CommonEndTokenFrequency,
  &address::OriginalAddress,
  &postcode::Postcode,
];

/// Evidence carried by two token lists.
///
/// Multiplies the frequencies of left tokens also present on the right, and
/// divides by the frequencies of tokens present on one side only, dampened by
/// a 0.33 exponent. Lower is stronger evidence. Repeated tokens count once per
/// occurrence.
pub(crate) fn frequency_score(lhs: &[TokenFrequency], rhs: &[TokenFrequency]) -> f64 {
  fn contains(list: &[TokenFrequency], token: &TokenFrequency) -> bool {
    list.iter().any(|other| other.token == token.token)
  }

  let shared: f64 = lhs.iter().filter(|token| contains(rhs, token)).map(|token| token.rel_freq).product();
  let exclusive: f64 = lhs
    .iter()
    .filter(|token| !contains(rhs, token))
    .chain(rhs.iter().filter(|token| !contains(lhs, token)))
    .map(|token| token.rel_freq.powf(0.33))
    .product();

  shared / exclusive
}

/// The larger of two optional frequencies, or whichever is present.
pub(crate) fn greatest(lhs: Option<f64>, rhs: Option<f64>) -> Option<f64> {
  match (lhs, rhs) {
    (Some(lhs), Some(rhs)) => Some(lhs.max(rhs)),
    (lhs, rhs) => lhs.or(rhs),
  }
}
