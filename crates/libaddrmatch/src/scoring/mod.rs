use serde::{Serialize, Serializer};

use crate::model::AddressRecord;

pub(crate) mod comparisons;
pub mod model;
pub mod predict;

/// Agreement level of one comparison dimension for one pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gamma {
  /// One or both sides miss the compared attribute.
  NotComparable,
  Level(u8),
}

impl Gamma {
  pub fn as_i16(&self) -> i16 {
    match self {
      Gamma::NotComparable => -1,
      Gamma::Level(level) => *level as i16,
    }
  }
}

impl Serialize for Gamma {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i16(self.as_i16())
  }
}

/// Result of comparing one dimension of a pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
  pub gamma: Gamma,
  /// Frequency of the value both sides agreed on, for term-frequency adjustment.
  pub frequency: Option<f64>,
}

impl Outcome {
  pub fn not_comparable() -> Outcome {
    Outcome {
      gamma: Gamma::NotComparable,
      frequency: None,
    }
  }

  pub fn level(level: u8) -> Outcome {
    Outcome {
      gamma: Gamma::Level(level),
      frequency: None,
    }
  }

  pub fn with_frequency(self, frequency: Option<f64>) -> Outcome {
    Outcome { frequency, ..self }
  }
}

/// One dimension of the comparison vector.
///
/// Implementations are generated by the `comparison` attribute macro.
pub trait Comparison: Send + Sync {
  fn name(&self) -> &'static str;
  /// Gamma levels, besides "not comparable", `compare` can produce.
  fn levels(&self) -> &'static [u8];
  fn compare(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Outcome;
}

pub use predict::{predict, select_best};
