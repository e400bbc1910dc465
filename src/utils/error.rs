use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Schema violation: {message}")]
    Schema { message: String },

    #[error("Parse failure at row {row}: {message}")]
    Parse { row: u64, message: String },

    #[error("Model search failed: {message}")]
    Search { message: String },

    #[error("Configuration error in `{field}`: {message}")]
    Config { field: String, message: String },
}

impl PipelineError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn parse(row: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            row,
            message: message.into(),
        }
    }

    pub fn search(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Process exit code for the CLI: schema and parse failures exit with 2,
    /// search exhaustion with 3, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Schema { .. } | Self::Parse { .. } => 2,
            Self::Search { .. } => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
