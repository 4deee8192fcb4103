use bon::bon;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::scoring::Gamma;

/// Raw address tuple, as read from a source dataset.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AddressInput {
  pub unique_id: String,
  #[serde(default)]
  pub source_dataset: String,
  #[serde(default)]
  pub address_concat: Option<String>,
  #[serde(default)]
  pub postcode: Option<String>,
}

#[bon]
impl AddressInput {
  #[builder(finish_fn = build)]
  pub fn builder(#[builder(start_fn)] unique_id: &str, source_dataset: Option<&str>, address: Option<&str>, postcode: Option<&str>) -> AddressInput {
    AddressInput {
      unique_id: unique_id.to_string(),
      source_dataset: source_dataset.unwrap_or_default().to_string(),
      address_concat: address.map(ToOwned::to_owned),
      postcode: postcode.map(ToOwned::to_owned),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TokenFrequency {
  pub token: CompactString,
  pub rel_freq: f64,
}

impl TokenFrequency {
  pub fn new(token: impl Into<CompactString>, rel_freq: f64) -> TokenFrequency {
    TokenFrequency { token: token.into(), rel_freq }
  }
}

/// Word tokens filtered by progressively stricter rarity thresholds.
///
/// Each tier keeps the order tokens had in the address, and each is a
/// subsequence of the previous one.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RarityTiers {
  pub unusual: Vec<CompactString>,
  pub very_unusual: Vec<CompactString>,
  pub extremely_unusual: Vec<CompactString>,
}

/// A cleaned and tokenized address.
///
/// Records are produced once by the tokenizer and only read afterwards.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AddressRecord {
  pub unique_id: String,
  pub source_dataset: String,
  pub original_address_concat: Option<String>,
  pub address_concat: Option<String>,
  pub postcode: Option<String>,

  pub flat_positional: Option<CompactString>,
  pub numeric_tokens: Vec<CompactString>,
  pub numeric_token_alt: Option<CompactString>,
  pub numeric_token_frequencies: Vec<Option<f64>>,

  pub token_rel_freq_list: Vec<TokenFrequency>,
  pub rarity_tiers: RarityTiers,
  pub common_end_tokens: Vec<TokenFrequency>,
}

impl AddressRecord {
  /// Numeric token at 1-based `position`.
  pub fn numeric_token(&self, position: usize) -> Option<&str> {
    position.checked_sub(1).and_then(|index| self.numeric_tokens.get(index)).map(CompactString::as_str)
  }

  /// Numeric-token table frequency of the token at 1-based `position`.
  pub fn numeric_token_frequency(&self, position: usize) -> Option<f64> {
    position.checked_sub(1).and_then(|index| self.numeric_token_frequencies.get(index).copied().flatten())
  }

  pub fn postcode_outward(&self) -> Option<&str> {
    self.postcode.as_deref().and_then(|postcode| postcode.split(' ').next())
  }

  pub fn postcode_inward(&self) -> Option<&str> {
    self.postcode.as_deref().and_then(|postcode| postcode.split(' ').nth(1))
  }
}

/// A pair proposed by the blocking engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CandidatePair {
  pub unique_id_l: String,
  pub unique_id_r: String,
  pub match_key: usize,
  /// Partition used to spread comparison work, carries no meaning.
  pub bucket: u32,

  #[serde(skip)]
  pub(crate) lhs: usize,
  #[serde(skip)]
  pub(crate) rhs: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct DimensionScore {
  pub name: &'static str,
  pub gamma: Gamma,
  pub bayes_factor: f64,
  pub tf_adjustment: f64,
}

impl DimensionScore {
  pub fn combined(&self) -> f64 {
    self.bayes_factor * self.tf_adjustment
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct Prediction {
  pub unique_id_l: String,
  pub unique_id_r: String,
  pub source_dataset_l: String,
  pub source_dataset_r: String,
  pub match_key: usize,
  pub match_weight: f64,
  pub match_probability: f64,
  pub match_weight_cond: bool,
  pub comparisons: Vec<DimensionScore>,
}

impl Prediction {
  pub fn comparison(&self, name: &str) -> Option<&DimensionScore> {
    self.comparisons.iter().find(|score| score.name == name)
  }
}
