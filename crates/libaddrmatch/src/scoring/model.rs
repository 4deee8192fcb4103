use ahash::HashSet;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
  error::AddressMatchError,
  model::{AddressRecord, DimensionScore},
  scoring::{Comparison, Gamma, comparisons::COMPARISONS},
};

/// Pre-learned parameters of the Fellegi-Sunter model.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct ModelSettings {
  #[validate(range(exclusive_min = 0.0))]
  pub prior_odds: f64,
  #[validate(nested)]
  pub comparisons: Vec<ComparisonSettings>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct ComparisonSettings {
  pub name: String,
  /// Frequency of a typical value, against which matched values are compared.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  #[validate(range(exclusive_min = 0.0))]
  pub tf_baseline: Option<f64>,
  /// Upper bound of an adjusted Bayes factor.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  #[validate(range(exclusive_min = 0.0))]
  pub tf_ceiling: Option<f64>,
  #[validate(nested)]
  pub levels: Vec<LevelSettings>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct LevelSettings {
  pub gamma: u8,
  #[validate(range(exclusive_min = 0.0))]
  pub bayes_factor: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  #[validate(range(min = 0.0))]
  pub tf_exponent: Option<f64>,
}

#[derive(Clone, Copy, Debug)]
struct LevelParameters {
  bayes_factor: f64,
  tf_exponent: Option<f64>,
}

struct Dimension {
  comparison: &'static dyn Comparison,
  levels: Vec<Option<LevelParameters>>,
  tf_baseline: Option<f64>,
  tf_ceiling: Option<f64>,
}

impl Dimension {
  fn new(comparison: &'static dyn Comparison, config: &ComparisonSettings) -> Result<Dimension, AddressMatchError> {
    let name = comparison.name();
    let size = comparison.levels().iter().max().map(|level| *level as usize + 1).unwrap_or_default();
    let mut levels: Vec<Option<LevelParameters>> = vec![None; size];

    for level in &config.levels {
      if !comparison.levels().contains(&level.gamma) {
        return Err(AddressMatchError::ConfigError(format!("comparison '{name}' never emits level {}", level.gamma)));
      }

      if level.tf_exponent.is_some() && config.tf_baseline.is_none() {
        return Err(AddressMatchError::ConfigError(format!("level {} of comparison '{name}' has a tf exponent but the comparison has no tf baseline", level.gamma)));
      }

      let slot = &mut levels[level.gamma as usize];

      if slot.is_some() {
        return Err(AddressMatchError::ConfigError(format!("level {} of comparison '{name}' is configured more than once", level.gamma)));
      }

      *slot = Some(LevelParameters {
        bayes_factor: level.bayes_factor,
        tf_exponent: level.tf_exponent,
      });
    }

    if let Some(missing) = comparison.levels().iter().find(|level| levels[**level as usize].is_none()) {
      return Err(AddressMatchError::ConfigError(format!("missing Bayes factor for level {missing} of comparison '{name}'")));
    }

    Ok(Dimension {
      comparison,
      levels,
      tf_baseline: config.tf_baseline,
      tf_ceiling: config.tf_ceiling,
    })
  }

  fn score(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> DimensionScore {
    let outcome = self.comparison.compare(lhs, rhs);

    let (bayes_factor, tf_adjustment) = match outcome.gamma {
      Gamma::NotComparable => (1.0, 1.0),
      Gamma::Level(level) => match self.levels.get(level as usize).copied().flatten() {
        Some(parameters) => (parameters.bayes_factor, self.tf_adjustment(parameters, outcome.frequency)),
        None => {
          tracing::warn!(comparison = self.comparison.name(), level, "comparison emitted an undeclared level");

          (1.0, 1.0)
        }
      },
    };

    DimensionScore {
      name: self.comparison.name(),
      gamma: outcome.gamma,
      bayes_factor,
      tf_adjustment,
    }
  }

  /// `(baseline / frequency) ^ exponent`, when the level, the dimension and
  /// the matched value all allow for it.
  fn tf_adjustment(&self, parameters: LevelParameters, frequency: Option<f64>) -> f64 {
    let (Some(exponent), Some(baseline), Some(frequency)) = (parameters.tf_exponent, self.tf_baseline, frequency) else {
      return 1.0;
    };

    if frequency <= 0.0 {
      return 1.0;
    }

    let adjustment = (baseline / frequency).powf(exponent);

    match self.tf_ceiling {
      Some(ceiling) => adjustment.min(ceiling / parameters.bayes_factor),
      None => adjustment,
    }
  }
}

/// A validated scoring model, ready to score candidate pairs.
pub struct ScoringModel {
  prior_odds: f64,
  dimensions: Vec<Dimension>,
}

/// Match weight, probability and per-dimension evidence of a pair.
#[derive(Clone, Debug)]
pub struct Score {
  pub match_weight: f64,
  pub match_probability: f64,
  pub comparisons: Vec<DimensionScore>,
}

impl ScoringModel {
  /// Check the settings against the known comparison dimensions and build the model.
  ///
  /// Every dimension must be configured exactly once, with a Bayes factor
  /// for each level it can emit and none for levels it cannot.
  pub fn new(settings: &ModelSettings) -> Result<ScoringModel, AddressMatchError> {
    settings.validate().map_err(|err| AddressMatchError::ConfigError(err.to_string()))?;

    let mut seen = HashSet::default();

    for comparison in &settings.comparisons {
      if !COMPARISONS.iter().any(|known| known.name() == comparison.name) {
        return Err(AddressMatchError::ConfigError(format!("unknown comparison '{}'", comparison.name)));
      }

      if !seen.insert(comparison.name.as_str()) {
        return Err(AddressMatchError::ConfigError(format!("comparison '{}' is configured more than once", comparison.name)));
      }
    }

    let dimensions = COMPARISONS
      .iter()
      .map(|comparison| {
        let config = settings
          .comparisons
          .iter()
          .find(|config| config.name == comparison.name())
          .ok_or_else(|| AddressMatchError::ConfigError(format!("missing parameters for comparison '{}'", comparison.name())))?;

        Dimension::new(*comparison, config)
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(ScoringModel {
      prior_odds: settings.prior_odds,
      dimensions,
    })
  }

  pub fn prior_odds(&self) -> f64 {
    self.prior_odds
  }

  /// Compare two records along every dimension and combine the evidence.
  ///
  /// The product of Bayes factors is accumulated in log space, so extreme
  /// weights neither overflow nor underflow.
  pub fn score(&self, lhs: &AddressRecord, rhs: &AddressRecord) -> Score {
    let comparisons: Vec<DimensionScore> = self.dimensions.iter().map(|dimension| dimension.score(lhs, rhs)).collect();

    let match_weight = comparisons.iter().fold(self.prior_odds.log2(), |weight, score| weight + score.combined().log2());
    let match_probability = 1.0 / (1.0 + (-match_weight).exp2());

    Score {
      match_weight,
      match_probability,
      comparisons,
    }
  }
}
