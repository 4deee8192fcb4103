use std::path::{Path, PathBuf};

use crate::config::{Config, Env};

mod log_writer;
mod run;

const NEW_RECORDS: &str = r#"{"unique_id": "n1", "source_dataset": "epc", "address_concat": "10 Downing St", "postcode": "SW1A 2AA"}
{"unique_id": "n2", "source_dataset": "epc", "address_concat": "Flat 3, 41 Mill Lane", "postcode": "LS6 2AB"}
{"unique_id": "n3", "source_dataset": "epc", "address_concat": null, "postcode": null}
"#;

const CANONICAL_RECORDS: &str = r#"{"unique_id": "c1", "source_dataset": "price_paid", "address_concat": "10 Downing Street", "postcode": "SW1A2AA"}
{"unique_id": "c2", "source_dataset": "price_paid", "address_concat": "41 Mill Lane, Flat 3", "postcode": "LS6 2AB"}
{"unique_id": "c3", "source_dataset": "price_paid", "address_concat": "22 Acacia Avenue", "postcode": "LS1 4DT"}
"#;

const WORD_FREQUENCIES: &str = r#"{"token": "DOWNING", "count": 3}
{"token": "STREET", "count": 150000}
{"token": "ST", "count": 30000}
{"token": "FLAT", "count": 200000}
{"token": "MILL", "count": 2000}
{"token": "LANE", "count": 90000}
{"token": "ACACIA", "count": 40}
{"token": "AVENUE", "count": 60000}
{"token": "ROAD", "count": 2467957}
"#;

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
  let new = dir.join("new.jsonl");
  let canonical = dir.join("canonical.jsonl");

  std::fs::write(&new, NEW_RECORDS).unwrap();
  std::fs::write(&canonical, CANONICAL_RECORDS).unwrap();

  (new, canonical)
}

fn config(dir: &Path) -> Config {
  let (new_records_path, canonical_path) = write_inputs(dir);
  let word_frequencies_path = dir.join("words.jsonl");

  std::fs::write(&word_frequencies_path, WORD_FREQUENCIES).unwrap();

  Config {
    env: Env::Dev,
    new_records_path,
    canonical_path,
    output_path: Some(dir.join("predictions.jsonl")),
    settings_path: None,
    word_frequencies_path: Some(word_frequencies_path),
    numeric_frequencies_path: None,
    match_weight_threshold: None,
    include_full_postcode_block: None,
    full_block: None,
    rayon_threads: None,
  }
}
