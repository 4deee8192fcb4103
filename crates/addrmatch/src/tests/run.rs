use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{config, log_writer::LineCollector};
use crate::{run, trace::init_tracing};

fn read_output(path: &std::path::Path) -> Vec<Value> {
  std::fs::read_to_string(path).unwrap().lines().map(|line| serde_json::from_str(line).unwrap()).collect()
}

fn pairs(predictions: &[Value]) -> Vec<(String, String)> {
  let mut pairs: Vec<(String, String)> = predictions
    .iter()
    .map(|prediction| (prediction["unique_id_l"].as_str().unwrap().to_string(), prediction["unique_id_r"].as_str().unwrap().to_string()))
    .collect();

  pairs.sort();
  pairs
}

#[test]
fn write_predictions() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(dir.path());

  run(&config).unwrap();

  let predictions = read_output(config.output_path.as_deref().unwrap());

  assert_eq!(pairs(&predictions), vec![("n1".to_string(), "c1".to_string()), ("n2".to_string(), "c2".to_string())]);

  for prediction in &predictions {
    assert_eq!(prediction["match_key"], 5);
    assert_eq!(prediction["source_dataset_l"], "epc");
    assert_eq!(prediction["source_dataset_r"], "price_paid");
    assert_eq!(prediction["match_weight_cond"], true);
    assert_eq!(prediction["comparisons"].as_array().map(Vec::len), Some(8));
  }
}

#[test]
fn keep_best_above_threshold() {
  let dir = tempfile::tempdir().unwrap();
  let mut config = config(dir.path());

  config.match_weight_threshold = Some(5.0);

  run(&config).unwrap();

  let predictions = read_output(config.output_path.as_deref().unwrap());

  assert_eq!(pairs(&predictions), vec![("n2".to_string(), "c2".to_string())]);
  assert!(predictions[0]["match_weight"].as_f64().unwrap() > 5.0);
}

#[test]
fn full_block() {
  let dir = tempfile::tempdir().unwrap();
  let mut config = config(dir.path());

  config.full_block = Some(true);

  run(&config).unwrap();

  let predictions = read_output(config.output_path.as_deref().unwrap());

  assert_eq!(predictions.len(), 9);
  assert!(predictions.iter().all(|prediction| prediction["match_key"] == 0));
}

#[test]
fn reject_invalid_settings() {
  let dir = tempfile::tempdir().unwrap();
  let mut config = config(dir.path());
  let settings_path = dir.path().join("settings.yml");

  std::fs::write(&settings_path, "blocking:\n  buckets: 0\n").unwrap();

  config.settings_path = Some(settings_path);

  assert!(run(&config).is_err());
  assert!(!config.output_path.as_deref().unwrap().exists());
}

#[test]
fn reject_missing_input() {
  let dir = tempfile::tempdir().unwrap();
  let mut config = config(dir.path());

  config.canonical_path = dir.path().join("missing.jsonl");

  let err = run(&config).unwrap_err();

  assert!(err.to_string().contains("missing.jsonl"));
}

#[test]
fn logging() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(dir.path());
  let lines = Arc::new(Mutex::new(Vec::default()));

  let guard = init_tracing(&config, LineCollector::new(Arc::clone(&lines)));

  run(&config).unwrap();

  drop(guard);

  let lines = lines.lock().unwrap();

  assert!(lines.iter().any(|line| line.contains("loaded records") && line.contains("new_records=3") && line.contains("canonical_records=3")));
  assert!(lines.iter().any(|line| line.contains("wrote predictions") && line.contains("predictions=2")));
}
