use iotable_lib::GridError;
use iotable_lib::error::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("Invalid sort '{0}', expected COLUMN[:asc|desc]")]
    InvalidSort(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to encode view: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        CliError::Grid(error.into())
    }
}
