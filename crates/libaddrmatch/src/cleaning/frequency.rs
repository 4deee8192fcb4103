use std::{
  fs::File,
  io::{BufReader, Read},
  path::Path,
  sync::Arc,
};

use ahash::{HashMap, HashSet};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_jsonlines::JsonLinesReader;

use crate::error::AddressMatchError;

/// Relative frequencies of tokens over a fixed corpus snapshot.
///
/// Tables are immutable. A changed corpus calls for a new table.
#[derive(Clone, Debug, Default)]
pub struct FrequencyTable {
  frequencies: HashMap<CompactString, f64>,
  counts: Option<HashMap<CompactString, u64>>,
  total: Option<u64>,
  min_frequency: f64,
}

/// One row of a precomputed frequency table.
///
/// A table file carries either raw counts or relative frequencies, never a
/// mix of both.
#[derive(Debug, Deserialize, Serialize)]
pub struct FrequencyRow {
  pub token: CompactString,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub count: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rel_freq: Option<f64>,
}

impl FrequencyTable {
  /// Count every occurrence of every token.
  pub fn from_tokens<I, S>(tokens: I) -> Result<FrequencyTable, AddressMatchError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut counts: HashMap<CompactString, u64> = HashMap::default();

    for token in tokens {
      *counts.entry(CompactString::from(token.as_ref())).or_default() += 1;
    }

    FrequencyTable::from_counts(counts)
  }

  pub fn from_counts(counts: HashMap<CompactString, u64>) -> Result<FrequencyTable, AddressMatchError> {
    let total: u64 = counts.values().sum();

    if total == 0 {
      return Err(AddressMatchError::DataError("cannot compute relative frequencies over zero tokens".into()));
    }

    let frequencies: HashMap<_, _> = counts.iter().map(|(token, count)| (token.clone(), *count as f64 / total as f64)).collect();
    let min_frequency = frequencies.values().copied().fold(f64::INFINITY, f64::min);

    Ok(FrequencyTable {
      frequencies,
      counts: Some(counts),
      total: Some(total),
      min_frequency,
    })
  }

  pub fn from_frequencies(frequencies: HashMap<CompactString, f64>) -> Result<FrequencyTable, AddressMatchError> {
    if frequencies.is_empty() {
      return Err(AddressMatchError::DataError("frequency table is empty".into()));
    }

    if let Some((token, freq)) = frequencies.iter().find(|(_, freq)| !(**freq > 0.0 && **freq <= 1.0)) {
      return Err(AddressMatchError::DataError(format!("relative frequency of '{token}' is out of range: {freq}")));
    }

    let min_frequency = frequencies.values().copied().fold(f64::INFINITY, f64::min);

    Ok(FrequencyTable {
      frequencies,
      counts: None,
      total: None,
      min_frequency,
    })
  }

  /// Load a table from JSON lines of `{"token", "count"}` or `{"token", "rel_freq"}`.
  pub fn from_reader<R: Read>(reader: R) -> Result<FrequencyTable, AddressMatchError> {
    let rows = JsonLinesReader::new(BufReader::new(reader)).read_all::<FrequencyRow>().collect::<Result<Vec<_>, _>>()?;

    let mut counts: HashMap<CompactString, u64> = HashMap::default();
    let mut frequencies: HashMap<CompactString, f64> = HashMap::default();

    for row in rows {
      let duplicate = match (row.count, row.rel_freq) {
        (Some(count), None) => counts.insert(row.token.clone(), count).is_some(),
        (None, Some(rel_freq)) => frequencies.insert(row.token.clone(), rel_freq).is_some(),
        _ => return Err(AddressMatchError::DataError(format!("row for '{}' must carry exactly one of count or rel_freq", row.token))),
      };

      if duplicate {
        return Err(AddressMatchError::DataError(format!("token '{}' appears more than once", row.token)));
      }
    }

    match (counts.is_empty(), frequencies.is_empty()) {
      (false, true) => FrequencyTable::from_counts(counts),
      (true, false) => FrequencyTable::from_frequencies(frequencies),
      (true, true) => Err(AddressMatchError::DataError("frequency table is empty".into())),
      (false, false) => Err(AddressMatchError::DataError("frequency table mixes counts and relative frequencies".into())),
    }
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FrequencyTable, AddressMatchError> {
    FrequencyTable::from_reader(File::open(path)?)
  }

  pub fn get(&self, token: &str) -> Option<f64> {
    self.frequencies.get(token).copied()
  }

  pub fn count(&self, token: &str) -> Option<u64> {
    self.counts.as_ref().and_then(|counts| counts.get(token).copied())
  }

  pub fn total(&self) -> Option<u64> {
    self.total
  }

  /// Frequency of the rarest token in the table.
  pub fn min_frequency(&self) -> f64 {
    self.min_frequency
  }

  pub fn has_counts(&self) -> bool {
    self.counts.is_some()
  }

  pub fn len(&self) -> usize {
    self.frequencies.len()
  }

  pub fn is_empty(&self) -> bool {
    self.frequencies.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.frequencies.iter().map(|(token, freq)| (token.as_str(), *freq))
  }
}

/// Frequent trailing locality tokens (towns, counties) removed from word sequences.
#[derive(Clone, Debug, Default)]
pub struct CommonEndTokens(HashSet<CompactString>);

impl CommonEndTokens {
  /// Tokens occurring more than `min_count` times in a count-bearing table.
  pub fn from_table(table: &FrequencyTable, min_count: u64) -> CommonEndTokens {
    let Some(counts) = &table.counts else {
      tracing::warn!("frequency table carries no counts, common end tokens will not be stripped");

      return CommonEndTokens::default();
    };

    CommonEndTokens(counts.iter().filter(|(_, count)| **count > min_count).map(|(token, _)| token.clone()).collect())
  }

  pub fn from_tokens<I, S>(tokens: I) -> CommonEndTokens
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    CommonEndTokens(tokens.into_iter().map(|token| CompactString::from(token.as_ref())).collect())
  }

  pub fn contains(&self, token: &str) -> bool {
    self.0.contains(token)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Remove the last word, or the last two when both are common, and return them in order.
  pub fn strip(&self, words: &mut Vec<CompactString>) -> Vec<CompactString> {
    let trailing = match words.as_slice() {
      [.., before, last] if self.contains(last) && self.contains(before) => 2,
      [.., last] if self.contains(last) => 1,
      _ => 0,
    };

    words.split_off(words.len() - trailing)
  }
}

/// The read-only frequency inputs of a run.
#[derive(Clone, Debug, Default)]
pub struct FrequencySnapshot {
  pub words: Arc<FrequencyTable>,
  pub numerics: Option<Arc<FrequencyTable>>,
  pub common_end_tokens: Arc<CommonEndTokens>,
}
