use std::{str::FromStr, sync::LazyLock};

use compact_str::CompactString;
use regex::Regex;

use crate::{error::AddressMatchError, model::AddressRecord, settings::RuleSettings};

static CONJUNCTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+and\s+").unwrap());
static CONDITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([lr])\.(\w+)\s*=\s*([lr])\.(\w+)$").unwrap());

const FULL_POSTCODE_PREDICATE: &str = "l.postcode = r.postcode";

/// Three-valued result of a predicate, where missing data is `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Truth {
  True,
  False,
  Unknown,
}

impl Truth {
  pub fn and(self, other: Truth) -> Truth {
    match (self, other) {
      (Truth::False, _) | (_, Truth::False) => Truth::False,
      (Truth::True, Truth::True) => Truth::True,
      _ => Truth::Unknown,
    }
  }

  /// Whether the predicate definitely holds. `Unknown` does not.
  pub fn holds(self) -> bool {
    self == Truth::True
  }
}

/// A record attribute a blocking predicate can refer to.
///
/// Positions are 1-based, as in `numeric_token_1` or `unusual_token_2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
  NumericToken(usize),
  NumericTokenAlt,
  UnusualToken(usize),
  VeryUnusualToken(usize),
  ExtremelyUnusualToken(usize),
  Postcode,
  PostcodeOutward,
  PostcodeInward,
  FlatPositional,
}

impl FromStr for Field {
  type Err = AddressMatchError;

  fn from_str(name: &str) -> Result<Field, AddressMatchError> {
    let field = match name {
      "numeric_token_alt" => Some(Field::NumericTokenAlt),
      "postcode" => Some(Field::Postcode),
      "postcode_outward" => Some(Field::PostcodeOutward),
      "postcode_inward" => Some(Field::PostcodeInward),
      "flat_positional" => Some(Field::FlatPositional),

      _ => name
        .rsplit_once('_')
        .and_then(|(prefix, position)| Some((prefix, position.parse::<usize>().ok().filter(|position| *position > 0)?)))
        .and_then(|(prefix, position)| match prefix {
          "numeric_token" if position <= 3 => Some(Field::NumericToken(position)),
          "unusual_token" => Some(Field::UnusualToken(position)),
          "very_unusual_token" => Some(Field::VeryUnusualToken(position)),
          "extremely_unusual_token" => Some(Field::ExtremelyUnusualToken(position)),
          _ => None,
        }),
    };

    field.ok_or_else(|| AddressMatchError::ConfigError(format!("unknown blocking field '{name}'")))
  }
}

impl Field {
  pub fn value<'r>(&self, record: &'r AddressRecord) -> Option<&'r str> {
    let nth = |tokens: &'r [CompactString], position: usize| position.checked_sub(1).and_then(|index| tokens.get(index)).map(CompactString::as_str);

    match *self {
      Field::NumericToken(position) => record.numeric_token(position),
      Field::NumericTokenAlt => record.numeric_token_alt.as_deref(),
      Field::UnusualToken(position) => nth(&record.rarity_tiers.unusual, position),
      Field::VeryUnusualToken(position) => nth(&record.rarity_tiers.very_unusual, position),
      Field::ExtremelyUnusualToken(position) => nth(&record.rarity_tiers.extremely_unusual, position),
      Field::Postcode => record.postcode.as_deref(),
      Field::PostcodeOutward => record.postcode_outward(),
      Field::PostcodeInward => record.postcode_inward(),
      Field::FlatPositional => record.flat_positional.as_deref(),
    }
  }
}

/// A conjunction of equalities between a left and a right field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
  conditions: Vec<(Field, Field)>,
}

impl FromStr for Predicate {
  type Err = AddressMatchError;

  fn from_str(input: &str) -> Result<Predicate, AddressMatchError> {
    let conditions = CONJUNCTION
      .split(input.trim())
      .map(|condition| -> Result<(Field, Field), AddressMatchError> {
        let parts = CONDITION
          .captures(condition.trim())
          .ok_or_else(|| AddressMatchError::ConfigError(format!("cannot parse blocking condition '{condition}'")))?;

        let (lhs, rhs) = match (&parts[1], &parts[3]) {
          ("l", "r") => (parts[2].parse::<Field>()?, parts[4].parse::<Field>()?),
          ("r", "l") => (parts[4].parse::<Field>()?, parts[2].parse::<Field>()?),
          _ => return Err(AddressMatchError::ConfigError(format!("blocking condition '{condition}' must compare the left and right records"))),
        };

        Ok((lhs, rhs))
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Predicate { conditions })
  }
}

impl Predicate {
  pub fn evaluate(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Truth {
    self.conditions.iter().fold(Truth::True, |truth, (left, right)| {
      let condition = match (left.value(lhs), right.value(rhs)) {
        (Some(left), Some(right)) if left == right => Truth::True,
        (Some(_), Some(_)) => Truth::False,
        _ => Truth::Unknown,
      };

      truth.and(condition)
    })
  }

  pub fn left_fields(&self) -> impl Iterator<Item = Field> + '_ {
    self.conditions.iter().map(|(left, _)| *left)
  }

  pub fn right_fields(&self) -> impl Iterator<Item = Field> + '_ {
    self.conditions.iter().map(|(_, right)| *right)
  }
}

#[derive(Clone, Debug)]
pub struct BlockingRule {
  pub match_key: usize,
  pub predicate: Predicate,
  pub text: String,
}

/// Blocking rules, ordered by match key.
#[derive(Clone, Debug)]
pub struct RuleSet {
  rules: Vec<BlockingRule>,
}

impl RuleSet {
  /// Parse and order rules.
  ///
  /// Match keys must be exactly `0..n`. The broad postcode rule, when
  /// requested, is appended with the next match key.
  pub fn new(rules: &[RuleSettings], include_full_postcode_block: bool) -> Result<RuleSet, AddressMatchError> {
    let mut ordered = rules.iter().collect::<Vec<_>>();

    ordered.sort_by_key(|rule| rule.match_key);

    if let Some((expected, rule)) = ordered.iter().enumerate().find(|(index, rule)| rule.match_key != *index) {
      return Err(AddressMatchError::ConfigError(format!(
        "blocking rule match keys must be consecutive from 0, found {} where {} was expected",
        rule.match_key, expected
      )));
    }

    let mut rules = ordered
      .into_iter()
      .map(|rule| {
        Ok(BlockingRule {
          match_key: rule.match_key,
          predicate: rule.predicate.parse()?,
          text: rule.predicate.clone(),
        })
      })
      .collect::<Result<Vec<_>, AddressMatchError>>()?;

    if include_full_postcode_block {
      rules.push(BlockingRule {
        match_key: rules.len(),
        predicate: FULL_POSTCODE_PREDICATE.parse()?,
        text: FULL_POSTCODE_PREDICATE.to_string(),
      });
    }

    Ok(RuleSet { rules })
  }

  pub fn rules(&self) -> &[BlockingRule] {
    &self.rules
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Whether any rule ranked before `index` definitely holds for the pair.
  pub fn claimed_before(&self, index: usize, lhs: &AddressRecord, rhs: &AddressRecord) -> bool {
    self.rules[..index].iter().any(|rule| rule.predicate.evaluate(lhs, rhs).holds())
  }

  /// Index of the first rule that definitely holds for the pair.
  pub fn first_match(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Option<usize> {
    self.rules.iter().position(|rule| rule.predicate.evaluate(lhs, rhs).holds())
  }
}
