use libaddrmatch_macros::comparison;
use strsim::levenshtein;

use crate::{
  model::AddressRecord,
  scoring::{Comparison, Outcome},
};

#[comparison(Postcode, name = "postcode", levels = [5, 4, 3, 2, 1, 0])]
fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome {
  let (left, right) = match (lhs.postcode.as_deref(), rhs.postcode.as_deref()) {
    (None, None) => return Outcome::not_comparable(),
    (Some(left), Some(right)) => (left, right),
    _ => return Outcome::level(0),
  };

  if left == right {
    return Outcome::level(5);
  }

  match levenshtein(left, right) {
    1 => Outcome::level(4),
    2 => Outcome::level(3),
    _ if lhs.postcode_outward() == rhs.postcode_outward() => Outcome::level(2),
    _ if lhs.postcode_inward().is_some() && lhs.postcode_inward() == rhs.postcode_inward() => Outcome::level(1),
    _ => Outcome::level(0),
  }
}
