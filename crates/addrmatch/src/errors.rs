use libaddrmatch::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("invalid configuration: {0}")]
  ConfigError(String),
  #[error(transparent)]
  MatchError(#[from] AddressMatchError),
}
