use thiserror::Error;

/// Failure modes of a single preprocessing call.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// The completion credential was never configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The model answered, but no JSON object could be recovered from the text.
    #[error("Could not extract structured data")]
    Extraction { response: String },

    #[error("completion request failed: {0}")]
    Transport(String),
}

impl PreprocessError {
    pub fn kind(&self) -> &'static str {
        match self {
            PreprocessError::Configuration(_) => "configuration",
            PreprocessError::Extraction { .. } => "extraction",
            PreprocessError::Transport(_) => "transport",
        }
    }
}

impl From<reqwest::Error> for PreprocessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PreprocessError::Transport(format!("request timed out: {}", err))
        } else {
            PreprocessError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_message_is_stable() {
        let err = PreprocessError::Extraction {
            response: "no json here".to_string(),
        };
        assert_eq!(err.to_string(), "Could not extract structured data");
        assert_eq!(err.kind(), "extraction");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            PreprocessError::Configuration("GOOGLE_API_KEY is not set".into()).kind(),
            "configuration"
        );
        assert_eq!(PreprocessError::Transport("503".into()).kind(), "transport");
    }
}
