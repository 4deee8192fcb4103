use std::sync::LazyLock;

use libaddrmatch_macros::comparison;
use regex::Regex;
use strsim::levenshtein;

use crate::{
  cleaning::normalize::collapse_whitespace,
  model::AddressRecord,
  scoring::{Comparison, Outcome},
};

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[[:punct:]]").unwrap());

#[comparison(OriginalAddress, name = "original_address_concat", levels = [3, 2, 1, 0])]
fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome {
  let (Some(left), Some(right)) = (lhs.original_address_concat.as_deref(), rhs.original_address_concat.as_deref()) else {
    return Outcome::not_comparable();
  };

  let (left, right) = (left.to_uppercase(), right.to_uppercase());

  if collapse_whitespace(&PUNCTUATION.replace_all(&left, "")) == collapse_whitespace(&PUNCTUATION.replace_all(&right, "")) {
    return Outcome::level(3);
  }

  match levenshtein(&left, &right) {
    distance if distance < 3 => Outcome::level(2),
    distance if distance < 10 => Outcome::level(1),
    _ => Outcome::level(0),
  }
}
