use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Board dimensions must be positive")]
    EmptyBoard,
    #[error("Too many mines for the board size")]
    TooManyMines,
    #[error("Exclusion zone leaves too few cells for the mines")]
    ExclusionTooLarge,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
