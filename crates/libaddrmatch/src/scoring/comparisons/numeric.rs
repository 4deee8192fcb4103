use libaddrmatch_macros::comparison;

use crate::{
  model::AddressRecord,
  scoring::{Comparison, Outcome, comparisons::greatest},
};

#[comparison(NumericToken1, name = "numeric_token_1", levels = [4, 3, 2, 0])]
fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome {
  let (Some(left), Some(right)) = (lhs.numeric_token(1), rhs.numeric_token(1)) else {
    return Outcome::not_comparable();
  };

  let frequency = greatest(lhs.numeric_token_frequency(1), rhs.numeric_token_frequency(1));
  let (left_alt, right_alt) = (lhs.numeric_token_alt.as_deref(), rhs.numeric_token_alt.as_deref());

  let level = if left == right {
    4
  } else if left_alt == Some(right) || right_alt == Some(left) || (left_alt.is_some() && left_alt == right_alt) {
    3
  } else if lhs.numeric_token(2) == Some(right) {
    2
  } else {
    0
  };

  Outcome::level(level).with_frequency(frequency)
}

#[comparison(NumericToken2, name = "numeric_token_2", levels = [3, 2, 1, 0])]
fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome {
  positional(lhs, rhs, 2)
}

#[comparison(NumericToken3, name = "numeric_token_3", levels = [3, 2, 1, 0])]
fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome {
  positional(lhs, rhs, 3)
}

// Agreement at `position`, then the left token one position earlier agreeing
// with the right one, then a single missing side.
fn positional(lhs: &AddressRecord, rhs: &AddressRecord, position: usize) -> Outcome {
  let frequency = greatest(lhs.numeric_token_frequency(position), rhs.numeric_token_frequency(position));

  let level = match (lhs.numeric_token(position), rhs.numeric_token(position)) {
    (None, None) => return Outcome::not_comparable(),
    (Some(left), Some(right)) if left == right => 3,
    (_, Some(right)) if lhs.numeric_token(position - 1) == Some(right) => 2,
    (None, _) | (_, None) => 1,
    _ => 0,
  };

  Outcome::level(level).with_frequency(frequency)
}

#[cfg(test)]
mod tests {
  use super::{NumericToken1, NumericToken2, NumericToken3};
  use crate::{
    model::AddressRecord,
    scoring::{Comparison, Gamma},
  };

  fn numbers(tokens: &[&str], alt: Option<&str>) -> AddressRecord {
    AddressRecord {
      numeric_tokens: tokens.iter().map(|token| (*token).into()).collect(),
      numeric_token_alt: alt.map(Into::into),
      numeric_token_frequencies: tokens.iter().map(|_| Some(0.002)).collect(),
      ..Default::default()
    }
  }

  #[test]
  fn numeric_token_1() {
    let cases = [
      (numbers(&[], None), numbers(&["10"], None), Gamma::NotComparable),
      (numbers(&["10"], None), numbers(&["10"], None), Gamma::Level(4)),
      (numbers(&["A", "12"], Some("12A")), numbers(&["12A"], None), Gamma::Level(3)),
      (numbers(&["12A"], None), numbers(&["A", "12"], Some("12A")), Gamma::Level(3)),
      (numbers(&["12-A"], Some("12A")), numbers(&["A", "12"], Some("12A")), Gamma::Level(3)),
      (numbers(&["2", "10"], None), numbers(&["10"], None), Gamma::Level(2)),
      (numbers(&["10"], None), numbers(&["11"], None), Gamma::Level(0)),
    ];

    for (lhs, rhs, expected) in cases {
      assert_eq!(NumericToken1.compare(&lhs, &rhs).gamma, expected, "{:?} / {:?}", lhs.numeric_tokens, rhs.numeric_tokens);
    }
  }

  #[test]
  fn numeric_token_1_frequency() {
    let mut lhs = numbers(&["10"], None);
    let rhs = numbers(&["10"], None);

    lhs.numeric_token_frequencies = vec![Some(0.01)];

    assert_eq!(NumericToken1.compare(&lhs, &rhs).frequency, Some(0.01));
  }

  #[test]
  fn numeric_token_2() {
    let cases = [
      (numbers(&["1"], None), numbers(&["1"], None), Gamma::NotComparable),
      (numbers(&["1", "10"], None), numbers(&["2", "10"], None), Gamma::Level(3)),
      (numbers(&["10"], None), numbers(&["2", "10"], None), Gamma::Level(2)),
      (numbers(&["1", "10"], None), numbers(&["1"], None), Gamma::Level(1)),
      (numbers(&["1", "10"], None), numbers(&["1", "11"], None), Gamma::Level(0)),
    ];

    for (lhs, rhs, expected) in cases {
      assert_eq!(NumericToken2.compare(&lhs, &rhs).gamma, expected, "{:?} / {:?}", lhs.numeric_tokens, rhs.numeric_tokens);
    }
  }

  #[test]
  fn numeric_token_3() {
    let cases = [
      (numbers(&["1", "2"], None), numbers(&["1", "2"], None), Gamma::NotComparable),
      (numbers(&["1", "2", "3"], None), numbers(&["1", "2", "3"], None), Gamma::Level(3)),
      (numbers(&["1", "3"], None), numbers(&["1", "2", "3"], None), Gamma::Level(2)),
      (numbers(&["1", "2", "3"], None), numbers(&["1", "2"], None), Gamma::Level(1)),
      (numbers(&["1", "2", "3"], None), numbers(&["1", "2", "4"], None), Gamma::Level(0)),
    ];

    for (lhs, rhs, expected) in cases {
      assert_eq!(NumericToken3.compare(&lhs, &rhs).gamma, expected, "{:?} / {:?}", lhs.numeric_tokens, rhs.numeric_tokens);
    }
  }
}
