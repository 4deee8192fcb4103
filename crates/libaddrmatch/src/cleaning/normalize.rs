use std::sync::LazyLock;

use any_ascii::any_ascii;
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::AddressInput;

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,.]").unwrap());
static APOSTROPHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"['`]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SLASHED_NUMBERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d[A-Z]?)\s*/\s*(\d)").unwrap());
static DASHED_NUMBERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)").unwrap());
static FLAT_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:FLAT|APARTMENT|APT|UNIT|MAISONETTE|STUDIO) [A-Z0-9][A-Z0-9-]*\b").unwrap());
static POSTCODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Z]{1,2}[0-9][A-Z0-9]?) ?([0-9][A-Z]{2})$").unwrap());

// Cleanup converges in two or three passes on real addresses.
const MAX_PASSES: usize = 16;

/// An address after string-level cleanup, before tokenization.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NormalizedAddress {
  pub unique_id: String,
  pub source_dataset: String,
  pub original_address_concat: Option<String>,
  pub address_concat: Option<String>,
  pub postcode: Option<String>,
}

impl From<&AddressInput> for NormalizedAddress {
  fn from(input: &AddressInput) -> NormalizedAddress {
    NormalizedAddress {
      unique_id: input.unique_id.clone(),
      source_dataset: input.source_dataset.clone(),
      original_address_concat: input.address_concat.clone(),
      address_concat: input.address_concat.as_deref().map(normalize_address).filter(|address| !address.is_empty()),
      postcode: input.postcode.as_deref().and_then(normalize_postcode),
    }
  }
}

/// Canonical uppercase form of a free-text address.
///
/// The result is a fixpoint of the cleanup pipeline, so normalizing an
/// already normalized address returns it unchanged.
pub fn normalize_address(raw: &str) -> String {
  converge(clean(&any_ascii(raw).to_uppercase()), clean)
}

fn converge(mut current: String, step: impl Fn(&str) -> String) -> String {
  for _ in 0..MAX_PASSES {
    let next = step(&current);

    if next == current {
      return current;
    }

    current = next;
  }

  tracing::warn!(passes = MAX_PASSES, address = current, "address cleanup did not converge");

  current
}

fn clean(address: &str) -> String {
  let address = PUNCTUATION.replace_all(address, " ");
  let address = APOSTROPHES.replace_all(&address, "");
  let address = collapse_whitespace(&address);
  let address = SLASHED_NUMBERS.replace_all(&address, "${1}-${2}");
  let address = DASHED_NUMBERS.replace_all(&address, "${1}-${2}");
  let address = move_flat_to_front(&address);

  address.split(' ').filter(|token| !token.is_empty()).dedup().join(" ")
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
  WHITESPACE.replace_all(value, " ").trim().to_string()
}

fn move_flat_to_front(address: &str) -> String {
  match FLAT_QUALIFIER.find(address) {
    Some(qualifier) if qualifier.start() > 0 => collapse_whitespace(&format!("{} {} {}", qualifier.as_str(), &address[..qualifier.start()], &address[qualifier.end()..])),
    _ => address.to_string(),
  }
}

/// Canonical UK postcode, with a single space before the inward code.
///
/// Values that do not look like a full postcode are only uppercased and
/// whitespace-collapsed. Blank values normalize to `None`.
pub fn normalize_postcode(raw: &str) -> Option<String> {
  let postcode = collapse_whitespace(&any_ascii(raw).to_uppercase());

  if postcode.is_empty() {
    return None;
  }

  match POSTCODE.captures(&postcode) {
    Some(parts) => Some(format!("{} {}", &parts[1], &parts[2])),
    None => Some(postcode),
  }
}

#[cfg(test)]
mod tests {
  use super::{MAX_PASSES, converge, normalize_address, normalize_postcode};

  #[test]
  fn normalize_punctuation_and_case() {
    assert_eq!(normalize_address("10, Downing St."), "10 DOWNING ST");
    assert_eq!(normalize_address("  St. John's   Road "), "ST JOHNS ROAD");
    assert_eq!(normalize_address(""), "");
  }

  #[test]
  fn normalize_number_ranges() {
    assert_eq!(normalize_address("10/12 High Street"), "10-12 HIGH STREET");
    assert_eq!(normalize_address("10A / 12 High Street"), "10A-12 HIGH STREET");
    assert_eq!(normalize_address("10 - 12 High Street"), "10-12 HIGH STREET");
  }

  #[test]
  fn normalize_moves_flat_qualifier() {
    assert_eq!(normalize_address("10 High Street Flat 2"), "FLAT 2 10 HIGH STREET");
    assert_eq!(normalize_address("Rose Court, Apartment 4B, Leeds"), "APARTMENT 4B ROSE COURT LEEDS");
    assert_eq!(normalize_address("Flat 2 10A-20 High Street"), "FLAT 2 10A-20 HIGH STREET");
    assert_eq!(normalize_address("Flatford Mill"), "FLATFORD MILL");
  }

  #[test]
  fn normalize_collapses_repeated_tokens() {
    assert_eq!(normalize_address("12 Church Church Lane"), "12 CHURCH LANE");
    assert_eq!(normalize_address("12 Church, Church Lane"), "12 CHURCH LANE");
  }

  #[test]
  fn normalize_is_idempotent() {
    let addresses = [
      "Flat 2, 10/12 High St.",
      "10 - 12 - 14 Mill Lane",
      "The Old Rectory,, Church  Church Road",
      "Unit 3 Unit 3 Riverside",
      "O'Neill's Bar, 4b/5 Main Street, Flat 1",
      "Café Rouge, 2 Rue",
      "1 / 2 / 3",
    ];

    for address in addresses {
      let once = normalize_address(address);

      assert_eq!(normalize_address(&once), once, "{address}");
    }
  }

  #[test]
  fn cleanup_stops_after_bounded_passes() {
    assert_eq!(converge("10 HIGH STREET".to_string(), |value| value.to_string()), "10 HIGH STREET");

    let endless = converge(String::new(), |value| format!("{value}X"));

    assert_eq!(endless.len(), MAX_PASSES);
  }

  #[test]
  fn normalize_postcodes() {
    assert_eq!(normalize_postcode("sw1a2aa"), Some("SW1A 2AA".to_string()));
    assert_eq!(normalize_postcode(" SW1A   2AA "), Some("SW1A 2AA".to_string()));
    assert_eq!(normalize_postcode("m1 1ae"), Some("M1 1AE".to_string()));
    assert_eq!(normalize_postcode("SW1A"), Some("SW1A".to_string()));
    assert_eq!(normalize_postcode("   "), None);
  }
}
