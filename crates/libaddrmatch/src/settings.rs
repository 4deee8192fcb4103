use std::{borrow::Cow, path::Path, sync::LazyLock};

use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use validator::{Validate, ValidationError};

use crate::{error::AddressMatchError, scoring::model::ModelSettings};

#[derive(Embed)]
#[folder = "./assets"]
struct Assets;

pub const DEFAULT_NUMERIC_TOKEN_PATTERN: &str = r"\b(?:\d*[\w\-]*\d+[\w\-]*|\w(?:-\w)?)\b";

const DEFAULT_UNUSUAL_THRESHOLD: f64 = 0.01;
const DEFAULT_VERY_UNUSUAL_THRESHOLD: f64 = 0.001;
const DEFAULT_EXTREMELY_UNUSUAL_THRESHOLD: f64 = 0.0001;
const DEFAULT_FALLBACK_THRESHOLD: f64 = 0.01;
const DEFAULT_COMMON_END_TOKEN_MIN_COUNT: u64 = 3000;
const DEFAULT_BUCKETS: u32 = 8;

pub(crate) static DEFAULT_RULES: LazyLock<Vec<RuleSettings>> = LazyLock::new(|| {
  let file = Assets::get("rules.yml").expect("missing default blocking rules");

  serde_yaml::from_slice(&file.data).expect("invalid default blocking rules")
});

pub(crate) static DEFAULT_MODEL: LazyLock<ModelSettings> = LazyLock::new(|| {
  let file = Assets::get("model.yml").expect("missing default model");

  serde_yaml::from_slice(&file.data).expect("invalid default model")
});

/// Every tunable of a matching run.
///
/// Omitted sections and fields fall back to the bundled model, so a settings
/// file only needs to carry what it overrides.
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct Settings {
  #[serde(default)]
  #[validate(nested)]
  pub tokenizer: TokenizerSettings,
  #[serde(default)]
  #[validate(nested)]
  pub blocking: BlockingSettings,
  #[serde_inline_default(DEFAULT_MODEL.clone())]
  #[validate(nested)]
  pub model: ModelSettings,
  /// Keep only the best candidate per new record, when its weight exceeds this.
  #[serde(default)]
  pub match_weight_threshold: Option<f64>,
}

impl Default for Settings {
  fn default() -> Settings {
    Settings {
      tokenizer: TokenizerSettings::default(),
      blocking: BlockingSettings::default(),
      model: DEFAULT_MODEL.clone(),
      match_weight_threshold: None,
    }
  }
}

impl Settings {
  pub fn from_yaml(input: &str) -> Result<Settings, AddressMatchError> {
    let settings: Settings = serde_yaml::from_str(input).map_err(|err| AddressMatchError::ConfigError(err.to_string()))?;

    settings.validate().map_err(|err| AddressMatchError::ConfigError(err.to_string()))?;

    Ok(settings)
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Settings, AddressMatchError> {
    Settings::from_yaml(&std::fs::read_to_string(path)?)
  }
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_rarity_tiers"))]
pub struct TokenizerSettings {
  #[serde_inline_default(DEFAULT_NUMERIC_TOKEN_PATTERN.to_string())]
  pub numeric_token_pattern: String,
  #[serde_inline_default(DEFAULT_UNUSUAL_THRESHOLD)]
  #[validate(range(exclusive_min = 0.0, max = 1.0))]
  pub unusual_threshold: f64,
  #[serde_inline_default(DEFAULT_VERY_UNUSUAL_THRESHOLD)]
  #[validate(range(exclusive_min = 0.0, max = 1.0))]
  pub very_unusual_threshold: f64,
  #[serde_inline_default(DEFAULT_EXTREMELY_UNUSUAL_THRESHOLD)]
  #[validate(range(exclusive_min = 0.0, max = 1.0))]
  pub extremely_unusual_threshold: f64,
  /// Words rarer than this may stand in for a missing house number.
  #[serde_inline_default(DEFAULT_FALLBACK_THRESHOLD)]
  #[validate(range(exclusive_min = 0.0, max = 1.0))]
  pub fallback_threshold: f64,
  #[serde_inline_default(DEFAULT_COMMON_END_TOKEN_MIN_COUNT)]
  pub common_end_token_min_count: u64,
  /// Explicit common end tokens, used instead of deriving them from counts.
  #[serde(default)]
  pub common_end_tokens: Option<Vec<String>>,
}

impl Default for TokenizerSettings {
  fn default() -> TokenizerSettings {
    TokenizerSettings {
      numeric_token_pattern: DEFAULT_NUMERIC_TOKEN_PATTERN.to_string(),
      unusual_threshold: DEFAULT_UNUSUAL_THRESHOLD,
      very_unusual_threshold: DEFAULT_VERY_UNUSUAL_THRESHOLD,
      extremely_unusual_threshold: DEFAULT_EXTREMELY_UNUSUAL_THRESHOLD,
      fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
      common_end_token_min_count: DEFAULT_COMMON_END_TOKEN_MIN_COUNT,
      common_end_tokens: None,
    }
  }
}

fn validate_rarity_tiers(settings: &TokenizerSettings) -> Result<(), ValidationError> {
  if settings.unusual_threshold > settings.very_unusual_threshold && settings.very_unusual_threshold > settings.extremely_unusual_threshold {
    return Ok(());
  }

  Err(ValidationError::new("rarity_tiers").with_message(Cow::Borrowed("rarity thresholds must be strictly decreasing from unusual to extremely unusual")))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketStrategy {
  /// Unseeded, differs between runs.
  #[default]
  Random,
  /// Derived from the pair identifiers, stable between runs.
  Hashed,
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct BlockingSettings {
  /// Append a broad postcode equality rule after all others.
  #[serde(default)]
  pub include_full_postcode_block: bool,
  /// Emit the whole cross product, for auditing rule coverage.
  #[serde(default)]
  pub full_block: bool,
  #[serde_inline_default(DEFAULT_BUCKETS)]
  #[validate(range(min = 1))]
  pub buckets: u32,
  #[serde(default)]
  pub bucket_strategy: BucketStrategy,
  #[serde_inline_default(DEFAULT_RULES.clone())]
  pub rules: Vec<RuleSettings>,
}

impl Default for BlockingSettings {
  fn default() -> BlockingSettings {
    BlockingSettings {
      include_full_postcode_block: false,
      full_block: false,
      buckets: DEFAULT_BUCKETS,
      bucket_strategy: BucketStrategy::default(),
      rules: DEFAULT_RULES.clone(),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleSettings {
  pub match_key: usize,
  pub predicate: String,
}
