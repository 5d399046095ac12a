//! Error types for Synheart Screen

use thiserror::Error;

/// Errors that can occur while extracting screen features
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Invalid input type: {0}")]
    InputType(String),

    #[error("Cannot convert value {value} in column '{column}' to a number")]
    TypeConversion { column: String, value: String },

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse input table: {0}")]
    Parse(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl ScreenError {
    /// Stable machine-readable code, used by the CLI and FFI error payloads
    pub fn code(&self) -> &'static str {
        match self {
            ScreenError::InputType(_) => "INPUT_TYPE_ERROR",
            ScreenError::TypeConversion { .. } => "TYPE_CONVERSION_ERROR",
            ScreenError::UnknownFeature(_) => "UNKNOWN_FEATURE",
            ScreenError::InvalidConfig(_) => "INVALID_CONFIG",
            ScreenError::Parse(_) => "PARSE_ERROR",
            ScreenError::Json(_) => "JSON_ERROR",
            ScreenError::Encoding(_) => "ENCODING_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_conversion_message_names_column() {
        let err = ScreenError::TypeConversion {
            column: "screen_status".to_string(),
            value: "\"abc\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot convert value \"abc\" in column 'screen_status' to a number"
        );
        assert_eq!(err.code(), "TYPE_CONVERSION_ERROR");
    }

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ScreenError = json_err.into();
        assert_eq!(err.code(), "JSON_ERROR");
    }
}
