use std::sync::Arc;

use bon::bon;
use rayon::prelude::*;
use tracing::instrument;
use validator::Validate;

use crate::{
  blocking::BlockingEngine,
  cleaning::{CommonEndTokens, FrequencySnapshot, FrequencyTable, NormalizedAddress, Segment, Tokenizer},
  error::AddressMatchError,
  model::{AddressInput, AddressRecord, CandidatePair, Prediction},
  scoring::{self, model::ScoringModel},
  settings::Settings,
};

/// The main entrypoint of the library.
///
/// An `AddressMatcher` holds the validated configuration of a run: the
/// tokenizer, the ordered blocking rules and the scoring model. Every stage
/// takes its inputs as arguments and returns a fully materialized result, so
/// stages can be run one by one or chained through [`AddressMatcher::link`].
///
/// # Examples
///
/// ```rust
/// use libaddrmatch::prelude::*;
///
/// let matcher = AddressMatcher::new(Settings::default()).build().unwrap();
///
/// let new = vec![AddressInput::builder("n1").address("10 Downing St").postcode("SW1A 2AA").build()];
/// let canonical = vec![AddressInput::builder("c1").address("10 Downing Street").postcode("SW1A2AA").build()];
///
/// for prediction in matcher.link(&new, &canonical).unwrap() {
///   println!("{} -> {}: {}", prediction.unique_id_l, prediction.unique_id_r, prediction.match_probability);
/// }
/// ```
pub struct AddressMatcher {
  settings: Settings,
  tokenizer: Tokenizer,
  blocking: BlockingEngine,
  model: ScoringModel,
  word_frequencies: Option<Arc<FrequencyTable>>,
  numeric_frequencies: Option<Arc<FrequencyTable>>,
}

#[bon]
impl AddressMatcher {
  /// Validate the settings and build every stage.
  ///
  /// Precomputed frequency tables, when given, are used as is instead of
  /// being derived from the corpus of each run. Without a numeric table,
  /// numeric token frequencies come from the run's own records, which
  /// overstates them on small inputs and weakens the rarity adjustment of
  /// numeric matches.
  #[allow(clippy::new_ret_no_self)]
  #[builder(start_fn = new, finish_fn = build)]
  pub fn _new(#[builder(start_fn)] settings: Settings, word_frequencies: Option<FrequencyTable>, numeric_frequencies: Option<FrequencyTable>) -> Result<AddressMatcher, AddressMatchError> {
    settings.validate().map_err(|err| AddressMatchError::ConfigError(err.to_string()))?;

    let tokenizer = Tokenizer::new(&settings.tokenizer)?;
    let blocking = BlockingEngine::new(&settings.blocking)?;
    let model = ScoringModel::new(&settings.model)?;

    tracing::debug!(rules = blocking.rules().len(), "initialized address matcher");

    Ok(AddressMatcher {
      settings,
      tokenizer,
      blocking,
      model,
      word_frequencies: word_frequencies.map(Arc::new),
      numeric_frequencies: numeric_frequencies.map(Arc::new),
    })
  }
}

impl AddressMatcher {
  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn blocking(&self) -> &BlockingEngine {
    &self.blocking
  }

  pub fn model(&self) -> &ScoringModel {
    &self.model
  }

  #[instrument(name = "normalize", skip_all, fields(records = inputs.len()))]
  pub fn normalize(&self, inputs: &[AddressInput]) -> Vec<NormalizedAddress> {
    inputs.par_iter().map(NormalizedAddress::from).collect()
  }

  pub fn segment(&self, addresses: Vec<NormalizedAddress>) -> Vec<Segment> {
    addresses.into_par_iter().map(|address| self.tokenizer.segment(address)).collect()
  }

  /// Build the frequency snapshot of a corpus.
  ///
  /// Word frequencies are counted over every word of the corpus, before
  /// common end tokens are stripped. Precomputed tables take precedence.
  #[instrument(name = "build_frequencies", skip_all, fields(records = corpus.len()))]
  pub fn build_frequencies(&self, corpus: &[Segment]) -> Result<FrequencySnapshot, AddressMatchError> {
    let words = match &self.word_frequencies {
      Some(table) => Arc::clone(table),
      None => Arc::new(FrequencyTable::from_tokens(corpus.iter().flat_map(|segment| segment.words.iter()))?),
    };

    let numerics = match &self.numeric_frequencies {
      Some(table) => Some(Arc::clone(table)),
      None if corpus.iter().all(|segment| segment.numeric_tokens.is_empty()) => None,
      None => {
        tracing::debug!("no numeric frequency table given, deriving numeric frequencies from the corpus");

        Some(Arc::new(FrequencyTable::from_tokens(corpus.iter().flat_map(|segment| segment.numeric_tokens.iter()))?))
      }
    };

    let common_end_tokens = match &self.settings.tokenizer.common_end_tokens {
      Some(tokens) => CommonEndTokens::from_tokens(tokens),
      None => CommonEndTokens::from_table(&words, self.settings.tokenizer.common_end_token_min_count),
    };

    tracing::debug!(words = words.len(), numerics = numerics.as_ref().map(|table| table.len()), common_end_tokens = common_end_tokens.len(), "built frequency snapshot");

    Ok(FrequencySnapshot {
      words,
      numerics,
      common_end_tokens: Arc::new(common_end_tokens),
    })
  }

  #[instrument(name = "tokenize", skip_all, fields(records = segments.len()))]
  pub fn tokenize(&self, segments: Vec<Segment>, snapshot: &FrequencySnapshot) -> Vec<AddressRecord> {
    segments.into_par_iter().map(|segment| self.tokenizer.tokenize(segment, snapshot)).collect()
  }

  /// Normalize, segment and tokenize raw inputs against an existing snapshot.
  pub fn prepare(&self, inputs: &[AddressInput], snapshot: &FrequencySnapshot) -> Vec<AddressRecord> {
    self.tokenize(self.segment(self.normalize(inputs)), snapshot)
  }

  pub fn block(&self, lhs: &[AddressRecord], rhs: &[AddressRecord]) -> Vec<CandidatePair> {
    self.blocking.block(lhs, rhs)
  }

  /// Score candidate pairs, keeping only the best per new record when a threshold is set.
  pub fn predict(&self, pairs: &[CandidatePair], lhs: &[AddressRecord], rhs: &[AddressRecord]) -> Vec<Prediction> {
    let predictions = scoring::predict(&self.model, pairs, lhs, rhs);

    match self.settings.match_weight_threshold {
      Some(threshold) => scoring::select_best(predictions, threshold),
      None => predictions,
    }
  }

  /// Match new records against a canonical set, end to end.
  ///
  /// Frequencies are built once over both sets, so the tokens of new and
  /// canonical records are weighed on the same scale.
  #[instrument(name = "link", skip_all, fields(new_records = new.len(), canonical_records = canonical.len()))]
  pub fn link(&self, new: &[AddressInput], canonical: &[AddressInput]) -> Result<Vec<Prediction>, AddressMatchError> {
    let mut segments = self.segment(self.normalize(new));
    let split = segments.len();

    segments.extend(self.segment(self.normalize(canonical)));

    let snapshot = self.build_frequencies(&segments)?;
    let canonical_segments = segments.split_off(split);

    let lhs = self.tokenize(segments, &snapshot);
    let rhs = self.tokenize(canonical_segments, &snapshot);

    let pairs = self.block(&lhs, &rhs);

    Ok(self.predict(&pairs, &lhs, &rhs))
  }
}
