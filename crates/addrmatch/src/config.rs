use std::{
  env::{self, VarError},
  fmt::Display,
  path::PathBuf,
  str::FromStr,
};

use crate::errors::AppError;

#[derive(Clone, Debug)]
pub struct Config {
  pub env: Env,

  // Inputs and outputs
  pub new_records_path: PathBuf,
  pub canonical_path: PathBuf,
  pub output_path: Option<PathBuf>,
  pub settings_path: Option<PathBuf>,
  pub word_frequencies_path: Option<PathBuf>,
  pub numeric_frequencies_path: Option<PathBuf>,

  // Settings overrides
  pub match_weight_threshold: Option<f64>,
  pub include_full_postcode_block: Option<bool>,
  pub full_block: Option<bool>,

  pub rayon_threads: Option<usize>,
}

impl Config {
  pub fn from_env() -> Result<Config, AppError> {
    Ok(Config {
      env: Env::from(env::var("ENV").unwrap_or("dev".into())),
      new_records_path: required_env("NEW_RECORDS_PATH")?.into(),
      canonical_path: required_env("CANONICAL_PATH")?.into(),
      output_path: parse_optional_env("OUTPUT_PATH")?,
      settings_path: parse_optional_env("SETTINGS_PATH")?,
      word_frequencies_path: parse_optional_env("WORD_FREQUENCIES_PATH")?,
      numeric_frequencies_path: parse_optional_env("NUMERIC_FREQUENCIES_PATH")?,
      match_weight_threshold: parse_optional_env("MATCH_WEIGHT_THRESHOLD")?,
      include_full_postcode_block: parse_optional_env("INCLUDE_FULL_POSTCODE_BLOCK")?,
      full_block: parse_optional_env("FULL_BLOCK")?,
      rayon_threads: parse_optional_env("RAYON_THREADS")?,
    })
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Env {
  Dev,
  Production,
}

impl From<String> for Env {
  fn from(value: String) -> Self {
    match value.as_ref() {
      "dev" => Env::Dev,
      "production" => Env::Production,
      _ => Env::Dev,
    }
  }
}

fn required_env(name: &str) -> Result<String, AppError> {
  match env::var(name) {
    Ok(value) if !value.is_empty() => Ok(value),
    _ => Err(AppError::ConfigError(format!("{name} is required"))),
  }
}

pub fn parse_optional_env<T>(name: &str) -> Result<Option<T>, AppError>
where
  T: FromStr,
  T::Err: Display,
{
  match env::var(name) {
    Ok(value) if value.is_empty() => Ok(None),
    Ok(value) => Ok(Some(value.parse::<T>().map_err(|err| AppError::ConfigError(format!("could not read {name}: {err}")))?)),
    Err(err) => match err {
      VarError::NotPresent => Ok(None),
      _ => Err(AppError::ConfigError(format!("could not read {name}: {err}"))),
    },
  }
}

#[cfg(test)]
mod tests {
  use std::{env, path::PathBuf};

  use super::{Config, Env};
  use crate::errors::AppError;

  const VARIABLES: &[&str] = &[
    "ENV",
    "NEW_RECORDS_PATH",
    "CANONICAL_PATH",
    "OUTPUT_PATH",
    "SETTINGS_PATH",
    "WORD_FREQUENCIES_PATH",
    "NUMERIC_FREQUENCIES_PATH",
    "MATCH_WEIGHT_THRESHOLD",
    "INCLUDE_FULL_POSTCODE_BLOCK",
    "FULL_BLOCK",
    "RAYON_THREADS",
  ];

  fn clear() {
    unsafe {
      for name in VARIABLES {
        env::remove_var(name);
      }
    }
  }

  #[test]
  #[serial_test::serial]
  fn parse_config_from_env() {
    clear();

    unsafe {
      env::set_var("ENV", "production");
      env::set_var("NEW_RECORDS_PATH", "/data/new.jsonl");
      env::set_var("CANONICAL_PATH", "/data/canonical.jsonl");
      env::set_var("OUTPUT_PATH", "/data/predictions.jsonl");
      env::set_var("WORD_FREQUENCIES_PATH", "/data/words.jsonl");
      env::set_var("MATCH_WEIGHT_THRESHOLD", "12.5");
      env::set_var("FULL_BLOCK", "false");
      env::set_var("RAYON_THREADS", "4");
    }

    let config = Config::from_env().unwrap();

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.new_records_path, PathBuf::from("/data/new.jsonl"));
    assert_eq!(config.canonical_path, PathBuf::from("/data/canonical.jsonl"));
    assert_eq!(config.output_path, Some(PathBuf::from("/data/predictions.jsonl")));
    assert_eq!(config.settings_path, None);
    assert_eq!(config.word_frequencies_path, Some(PathBuf::from("/data/words.jsonl")));
    assert_eq!(config.numeric_frequencies_path, None);
    assert_eq!(config.match_weight_threshold, Some(12.5));
    assert_eq!(config.include_full_postcode_block, None);
    assert_eq!(config.full_block, Some(false));
    assert_eq!(config.rayon_threads, Some(4));

    clear();
  }

  #[test]
  #[serial_test::serial]
  fn missing_inputs() {
    clear();

    unsafe {
      env::set_var("NEW_RECORDS_PATH", "/data/new.jsonl");
    }

    assert!(matches!(Config::from_env(), Err(AppError::ConfigError(_))));

    clear();
  }

  #[test]
  #[serial_test::serial]
  fn invalid_values() {
    clear();

    unsafe {
      env::set_var("NEW_RECORDS_PATH", "/data/new.jsonl");
      env::set_var("CANONICAL_PATH", "/data/canonical.jsonl");
      env::set_var("MATCH_WEIGHT_THRESHOLD", "high");
    }

    assert!(matches!(Config::from_env(), Err(AppError::ConfigError(_))));

    clear();
  }

  #[test]
  #[serial_test::serial]
  fn parse_optional_env() {
    unsafe {
      env::set_var("INT", "42");
      env::set_var("BOOL", "true");
      env::set_var("EMPTY", "");
    }

    assert_eq!(super::parse_optional_env::<u32>("INT").unwrap(), Some(42));
    assert_eq!(super::parse_optional_env::<bool>("BOOL").unwrap(), Some(true));
    assert_eq!(super::parse_optional_env::<u32>("EMPTY").unwrap(), None);
    assert_eq!(super::parse_optional_env::<u32>("UNSET_VARIABLE").unwrap(), None);

    assert!(super::parse_optional_env::<u32>("BOOL").is_err());

    unsafe {
      env::remove_var("INT");
      env::remove_var("BOOL");
      env::remove_var("EMPTY");
    }
  }
}
