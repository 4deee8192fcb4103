mod error;

pub mod blocking;
pub mod cleaning;
pub mod model;
pub mod pipeline;
pub mod scoring;
pub mod settings;

/// Force the parsing of bundled assets, so malformed defaults surface at startup.
pub fn init() {
  let _ = *crate::settings::DEFAULT_RULES;
  let _ = *crate::settings::DEFAULT_MODEL;
}

pub mod prelude {
  pub use crate::error::AddressMatchError;
  pub use crate::pipeline::AddressMatcher;

  pub use crate::blocking::{BlockingEngine, RuleSet};
  pub use crate::cleaning::{CommonEndTokens, FrequencySnapshot, FrequencyTable, NormalizedAddress, Segment, Tokenizer, normalize_address, normalize_postcode};
  pub use crate::model::{AddressInput, AddressRecord, CandidatePair, DimensionScore, Prediction, TokenFrequency};
  pub use crate::scoring::{Gamma, model::ScoringModel};
  pub use crate::settings::{BlockingSettings, BucketStrategy, Settings, TokenizerSettings};
}
