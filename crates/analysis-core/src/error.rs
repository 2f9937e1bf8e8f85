use thiserror::Error;

/// Structural failures. Missing or undefined individual metrics are never
/// errors; they surface as `None` fields on the output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Raw bundle is not a JSON object")]
    NotAnObject,

    #[error("Raw bundle is missing required section '{0}'")]
    MissingSection(&'static str),

    #[error("Section '{section}' must be {expected}")]
    WrongSectionType {
        section: &'static str,
        expected: &'static str,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid assumptions: {0}")]
    InvalidAssumptions(String),
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::MalformedInput(err.to_string())
    }
}
