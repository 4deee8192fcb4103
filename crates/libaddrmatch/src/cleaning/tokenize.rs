use std::sync::LazyLock;

use compact_str::{CompactString, format_compact};
use regex::Regex;
use validator::Validate;

use crate::{
  cleaning::{frequency::FrequencySnapshot, normalize::NormalizedAddress},
  error::AddressMatchError,
  model::{AddressRecord, RarityTiers, TokenFrequency},
  settings::TokenizerSettings,
};

const MAX_NUMERIC_TOKENS: usize = 3;

static FLAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:FLAT|APARTMENT|APT|UNIT|MAISONETTE|STUDIO) ([A-Z0-9][A-Z0-9-]*)\b").unwrap());
static DASHED_SUBUNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]+)-([A-Z])$").unwrap());

/// A normalized address split into house identifiers and words.
///
/// This is all the frequency model needs, so segments are produced for the
/// whole corpus before any record is tokenized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Segment {
  pub address: NormalizedAddress,
  pub flat_positional: Option<CompactString>,
  pub numeric_tokens: Vec<CompactString>,
  pub words: Vec<CompactString>,
}

pub struct Tokenizer {
  numeric_pattern: Regex,
  unusual_threshold: f64,
  very_unusual_threshold: f64,
  extremely_unusual_threshold: f64,
  fallback_threshold: f64,
}

impl Tokenizer {
  pub fn new(settings: &TokenizerSettings) -> Result<Tokenizer, AddressMatchError> {
    settings.validate().map_err(|err| AddressMatchError::ConfigError(err.to_string()))?;

    let numeric_pattern = Regex::new(&settings.numeric_token_pattern).map_err(|err| AddressMatchError::ConfigError(format!("invalid numeric token pattern: {err}")))?;

    Ok(Tokenizer {
      numeric_pattern,
      unusual_threshold: settings.unusual_threshold,
      very_unusual_threshold: settings.very_unusual_threshold,
      extremely_unusual_threshold: settings.extremely_unusual_threshold,
      fallback_threshold: settings.fallback_threshold,
    })
  }

  /// Extract up to three numeric tokens, left to right, and split the rest into words.
  ///
  /// Identifier-like matches past the third stay in the word sequence, so
  /// every token of the address ends up in exactly one of the two.
  pub fn segment(&self, address: NormalizedAddress) -> Segment {
    let Some(text) = address.address_concat.as_deref() else {
      return Segment { address, ..Default::default() };
    };

    let flat_positional = FLAT_PREFIX.captures(text).map(|parts| CompactString::from(&parts[1]));

    let mut numeric_tokens = Vec::with_capacity(MAX_NUMERIC_TOKENS);
    let mut remainder = String::with_capacity(text.len());
    let mut cursor = 0;

    for found in self.numeric_pattern.find_iter(text).filter(|found| !found.is_empty()).take(MAX_NUMERIC_TOKENS) {
      remainder.push_str(&text[cursor..found.start()]);
      remainder.push(' ');
      numeric_tokens.push(CompactString::from(found.as_str()));

      cursor = found.end();
    }

    remainder.push_str(&text[cursor..]);

    let words = remainder.split_whitespace().map(CompactString::from).collect();

    Segment {
      address,
      flat_positional,
      numeric_tokens,
      words,
    }
  }

  /// Attach corpus frequencies to a segment and derive the rarity-based fields.
  pub fn tokenize(&self, segment: Segment, snapshot: &FrequencySnapshot) -> AddressRecord {
    let Segment {
      address,
      flat_positional,
      mut numeric_tokens,
      mut words,
    } = segment;

    let trailing = snapshot.common_end_tokens.strip(&mut words);

    let with_frequency = |token: CompactString| {
      let rel_freq = snapshot.words.get(&token).unwrap_or_else(|| snapshot.words.min_frequency());

      TokenFrequency { token, rel_freq }
    };

    let mut token_rel_freq_list: Vec<TokenFrequency> = words.into_iter().map(with_frequency).collect();
    let common_end_tokens: Vec<TokenFrequency> = trailing.into_iter().map(with_frequency).collect();

    if numeric_tokens.is_empty()
      && let Some(fallback) = token_rel_freq_list.iter().find(|token| token.rel_freq < self.fallback_threshold).map(|token| token.token.clone())
    {
      token_rel_freq_list.retain(|token| token.token != fallback);
      numeric_tokens.push(fallback);
    }

    let tier = |threshold: f64| token_rel_freq_list.iter().filter(|token| token.rel_freq < threshold).map(|token| token.token.clone()).collect::<Vec<_>>();

    let rarity_tiers = RarityTiers {
      unusual: tier(self.unusual_threshold),
      very_unusual: tier(self.very_unusual_threshold),
      extremely_unusual: tier(self.extremely_unusual_threshold),
    };

    let numeric_token_frequencies = numeric_tokens.iter().map(|token| snapshot.numerics.as_ref().and_then(|table| table.get(token))).collect();

    AddressRecord {
      unique_id: address.unique_id,
      source_dataset: address.source_dataset,
      original_address_concat: address.original_address_concat,
      address_concat: address.address_concat,
      postcode: address.postcode,
      flat_positional,
      numeric_token_alt: numeric_alias(&numeric_tokens),
      numeric_tokens,
      numeric_token_frequencies,
      token_rel_freq_list,
      rarity_tiers,
      common_end_tokens,
    }
  }
}

/// Alternative reading of the first numeric token.
///
/// "A 12" (a lettered flat followed by a house number) and "12-A" both read
/// as "12A".
fn numeric_alias(tokens: &[CompactString]) -> Option<CompactString> {
  let first = tokens.first()?;

  if let Some(parts) = DASHED_SUBUNIT.captures(first) {
    return Some(format_compact!("{}{}", &parts[1], &parts[2]));
  }

  match tokens.get(1) {
    Some(second) if first.len() == 1 && first.chars().all(|c| c.is_ascii_alphabetic()) && second.chars().all(|c| c.is_ascii_digit()) => Some(format_compact!("{second}{first}")),
    _ => None,
  }
}
