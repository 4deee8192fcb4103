mod config;
mod errors;
mod trace;

#[cfg(test)]
mod tests;

use std::{
  fs::File,
  io::{self, BufWriter, Write},
  path::Path,
};

use anyhow::Context;
use libaddrmatch::prelude::*;
use serde_jsonlines::{JsonLinesWriter, json_lines};

use crate::{config::Config, errors::AppError};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
  let config = Config::from_env()?;
  let _guard = trace::init_tracing(&config, io::stderr());

  run(&config)
}

fn run(config: &Config) -> anyhow::Result<()> {
  libaddrmatch::init();

  if let Some(threads) = config.rayon_threads {
    rayon::ThreadPoolBuilder::new().num_threads(threads).build_global().context("could not configure worker threads")?;
  }

  let matcher = build_matcher(config)?;

  let new = read_records(&config.new_records_path)?;
  let canonical = read_records(&config.canonical_path)?;

  tracing::info!(new_records = new.len(), canonical_records = canonical.len(), "loaded records");

  let predictions = matcher.link(&new, &canonical)?;

  match &config.output_path {
    Some(path) => write_predictions(File::create(path).with_context(|| format!("could not create {}", path.display()))?, &predictions)?,
    None => write_predictions(io::stdout().lock(), &predictions)?,
  }

  tracing::info!(predictions = predictions.len(), "wrote predictions");

  Ok(())
}

fn build_matcher(config: &Config) -> Result<AddressMatcher, AppError> {
  let mut settings = match &config.settings_path {
    Some(path) => Settings::from_file(path)?,
    None => Settings::default(),
  };

  if let Some(threshold) = config.match_weight_threshold {
    settings.match_weight_threshold = Some(threshold);
  }

  if let Some(include) = config.include_full_postcode_block {
    settings.blocking.include_full_postcode_block = include;
  }

  if let Some(full_block) = config.full_block {
    settings.blocking.full_block = full_block;
  }

  let word_frequencies = config.word_frequencies_path.as_ref().map(FrequencyTable::from_file).transpose()?;
  let numeric_frequencies = config.numeric_frequencies_path.as_ref().map(FrequencyTable::from_file).transpose()?;

  if word_frequencies.is_none() {
    tracing::info!("no word frequency table given, deriving frequencies from the input records");
  }

  Ok(
    AddressMatcher::new(settings)
      .maybe_word_frequencies(word_frequencies)
      .maybe_numeric_frequencies(numeric_frequencies)
      .build()?,
  )
}

fn read_records(path: &Path) -> anyhow::Result<Vec<AddressInput>> {
  json_lines(path)
    .with_context(|| format!("could not open {}", path.display()))?
    .collect::<Result<Vec<AddressInput>, _>>()
    .with_context(|| format!("could not read records from {}", path.display()))
}

fn write_predictions(writer: impl Write, predictions: &[Prediction]) -> anyhow::Result<()> {
  let mut writer = JsonLinesWriter::new(BufWriter::new(writer));

  writer.write_all(predictions).context("could not write predictions")?;
  writer.flush().context("could not write predictions")?;

  Ok(())
}
