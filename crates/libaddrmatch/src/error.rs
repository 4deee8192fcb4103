#[derive(Debug, thiserror::Error)]
pub enum AddressMatchError {
  #[error("invalid configuration: {0}")]
  ConfigError(String),
  #[error("invalid data: {0}")]
  DataError(String),
  #[error(transparent)]
  IoError(#[from] std::io::Error),
  #[error(transparent)]
  OtherError(#[from] anyhow::Error),
}
