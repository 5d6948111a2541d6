use shipquote_core::{CarrierError, CarrierErrorKind, ConfigError, CoreError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Carrier(#[from] CarrierError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 4,
            Self::Core(CoreError::Validation(_)) => 2,
            Self::Core(CoreError::Config(_)) => 4,
            Self::Core(_) => 10,
            Self::Carrier(error) => match error.kind() {
                CarrierErrorKind::ValidationError => 2,
                _ => 10,
            },
            Self::Serialization(_) => 10,
        }
    }
}
