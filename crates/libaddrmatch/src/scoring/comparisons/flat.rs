use libaddrmatch_macros::comparison;

use crate::{
  model::AddressRecord,
  scoring::{Comparison, Outcome},
};

#[comparison(FlatPositional, name = "flat_positional", levels = [1, 0])]
fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome {
  match (&lhs.flat_positional, &rhs.flat_positional) {
    (None, None) => Outcome::not_comparable(),
    (lhs, rhs) if lhs == rhs => Outcome::level(1),
    _ => Outcome::level(0),
  }
}
