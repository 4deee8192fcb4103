use std::{cmp::Ordering, collections::hash_map::Entry, time::Instant};

use ahash::HashMap;
use metrics::histogram;
use rayon::prelude::*;
use tracing::instrument;

use crate::{
  model::{AddressRecord, CandidatePair, Prediction},
  scoring::model::ScoringModel,
};

/// Score every candidate pair against the records it was blocked from.
///
/// `lhs` and `rhs` must be the slices given to the blocking engine.
#[instrument(name = "predict", skip_all, fields(pairs = pairs.len()))]
pub fn predict(model: &ScoringModel, pairs: &[CandidatePair], lhs: &[AddressRecord], rhs: &[AddressRecord]) -> Vec<Prediction> {
  let then = Instant::now();

  let predictions: Vec<Prediction> = pairs
    .par_iter()
    .filter_map(|pair| {
      let (Some(left), Some(right)) = (lhs.get(pair.lhs), rhs.get(pair.rhs)) else {
        tracing::warn!(unique_id_l = pair.unique_id_l, unique_id_r = pair.unique_id_r, "candidate pair does not belong to these records");

        return None;
      };

      let score = model.score(left, right);

      histogram!("addrmatch_scoring_weights").record(score.match_weight);

      Some(Prediction {
        unique_id_l: left.unique_id.clone(),
        unique_id_r: right.unique_id.clone(),
        source_dataset_l: left.source_dataset.clone(),
        source_dataset_r: right.source_dataset.clone(),
        match_key: pair.match_key,
        match_weight: score.match_weight,
        match_probability: score.match_probability,
        match_weight_cond: true,
        comparisons: score.comparisons,
      })
    })
    .collect();

  histogram!("addrmatch_scoring_latency_seconds").record(then.elapsed().as_secs_f64());

  predictions
}

/// Keep the best prediction of each new record, if it clears `threshold`.
///
/// Ties on match weight go to the lowest `unique_id_r`. Records whose best
/// candidate does not clear the threshold yield nothing. The result is sorted
/// by `unique_id_l`.
pub fn select_best(predictions: Vec<Prediction>, threshold: f64) -> Vec<Prediction> {
  let mut best: HashMap<String, Prediction> = HashMap::default();

  for prediction in predictions {
    match best.entry(prediction.unique_id_l.clone()) {
      Entry::Vacant(entry) => {
        entry.insert(prediction);
      }

      Entry::Occupied(mut entry) => {
        if outranks(&prediction, entry.get()) {
          entry.insert(prediction);
        }
      }
    }
  }

  let mut selected: Vec<Prediction> = best
    .into_values()
    .map(|mut prediction| {
      prediction.match_weight_cond = prediction.match_weight > threshold;
      prediction
    })
    .filter(|prediction| prediction.match_weight_cond)
    .collect();

  selected.sort_by(|lhs, rhs| lhs.unique_id_l.cmp(&rhs.unique_id_l));

  tracing::debug!(selected = selected.len(), threshold, "selected best candidates");

  selected
}

fn outranks(candidate: &Prediction, current: &Prediction) -> bool {
  match candidate.match_weight.total_cmp(&current.match_weight) {
    Ordering::Greater => true,
    Ordering::Less => false,
    Ordering::Equal => candidate.unique_id_r < current.unique_id_r,
  }
}

#[cfg(test)]
mod tests {
  use float_cmp::approx_eq;

  use super::{predict, select_best};
  use crate::{
    model::{AddressRecord, CandidatePair, Prediction},
    scoring::model::ScoringModel,
    settings::DEFAULT_MODEL,
  };

  fn prediction(lhs: &str, rhs: &str, match_weight: f64) -> Prediction {
    Prediction {
      unique_id_l: lhs.to_string(),
      unique_id_r: rhs.to_string(),
      source_dataset_l: String::new(),
      source_dataset_r: String::new(),
      match_key: 0,
      match_weight,
      match_probability: 1.0 / (1.0 + (-match_weight).exp2()),
      match_weight_cond: true,
      comparisons: Vec::new(),
    }
  }

  fn record(id: &str, postcode: &str) -> AddressRecord {
    AddressRecord {
      unique_id: id.to_string(),
      source_dataset: "test".to_string(),
      numeric_tokens: vec!["10".into()],
      numeric_token_frequencies: vec![None],
      postcode: Some(postcode.to_string()),
      ..Default::default()
    }
  }

  fn pair(lhs: (usize, &AddressRecord), rhs: (usize, &AddressRecord)) -> CandidatePair {
    CandidatePair {
      unique_id_l: lhs.1.unique_id.clone(),
      unique_id_r: rhs.1.unique_id.clone(),
      match_key: 3,
      bucket: 1,
      lhs: lhs.0,
      rhs: rhs.0,
    }
  }

  #[test]
  fn score_pairs() {
    let model = ScoringModel::new(&DEFAULT_MODEL).unwrap();
    let lhs = vec![record("n1", "SW1A 2AA")];
    let rhs = vec![record("c1", "SW1A 2AA"), record("c2", "LS1 4DT")];
    let pairs = vec![pair((0, &lhs[0]), (0, &rhs[0])), pair((0, &lhs[0]), (1, &rhs[1]))];

    let mut predictions = predict(&model, &pairs, &lhs, &rhs);
    predictions.sort_by(|a, b| a.unique_id_r.cmp(&b.unique_id_r));

    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0].match_key, 3);
    assert_eq!(predictions[0].source_dataset_r, "test");
    assert_eq!(predictions[0].comparisons.len(), 8);
    assert!(predictions.iter().all(|prediction| prediction.match_weight_cond));
    assert!(predictions[0].match_weight > predictions[1].match_weight);
    assert!(approx_eq!(f64, predictions[0].match_weight, model.score(&lhs[0], &rhs[0]).match_weight));
  }

  #[test]
  fn skip_foreign_pairs() {
    let model = ScoringModel::new(&DEFAULT_MODEL).unwrap();
    let lhs = vec![record("n1", "SW1A 2AA")];
    let rhs = vec![record("c1", "SW1A 2AA")];
    let pairs = vec![pair((0, &lhs[0]), (5, &rhs[0]))];

    assert!(predict(&model, &pairs, &lhs, &rhs).is_empty());
  }

  #[test]
  fn keep_best_above_threshold() {
    let predictions = vec![prediction("n1", "c1", 12.0), prediction("n1", "c2", 20.0), prediction("n2", "c3", 4.0), prediction("n3", "c4", 11.0)];

    let selected = select_best(predictions, 10.0);

    assert_eq!(selected.len(), 2);
    assert_eq!((selected[0].unique_id_l.as_str(), selected[0].unique_id_r.as_str()), ("n1", "c2"));
    assert_eq!((selected[1].unique_id_l.as_str(), selected[1].unique_id_r.as_str()), ("n3", "c4"));
    assert!(selected.iter().all(|prediction| prediction.match_weight_cond));
  }

  #[test]
  fn break_ties_on_canonical_id() {
    let predictions = vec![prediction("n1", "c9", 15.0), prediction("n1", "c2", 15.0), prediction("n1", "c5", 15.0)];

    let selected = select_best(predictions, 0.0);

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].unique_id_r, "c2");
  }

  #[test]
  fn best_below_threshold_yields_nothing() {
    let predictions = vec![prediction("n1", "c1", 2.0), prediction("n1", "c2", 3.0)];

    assert!(select_best(predictions, 3.0).is_empty());
  }
}
