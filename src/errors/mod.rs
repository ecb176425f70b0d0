use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    // Session errors
    #[error("Authentication failed: {0}")]
    Auth(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport failed: {0}")]
    Transport(String),

    // Parsing errors
    #[error("Page decoding failed: {0}")]
    Decode(String),

    #[error("Unparseable timestamp '{input}': {reason}")]
    UnparseableTimestamp { input: String, reason: String },

    // Output errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    pub fn unparseable(input: &str, reason: impl Into<String>) -> Self {
        HarvestError::UnparseableTimestamp {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type HarvestResult<T> = Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_message_includes_input() {
        let err = HarvestError::unparseable("Tue Jxn 10", "unknown month");
        assert_eq!(
            err.to_string(),
            "Unparseable timestamp 'Tue Jxn 10': unknown month"
        );
    }
}
