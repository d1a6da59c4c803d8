use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgronomyError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgronomyError {
    #[error("Unknown season '{0}' (expected Kharif, Rabi or Zaid)")]
    UnknownSeason(String),

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
}
