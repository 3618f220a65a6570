use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("Config: {0}")]
    Config(String),

    #[error("Selector `{selector}`: {detail}")]
    Selector { selector: String, detail: String },

    #[error("Interaction: {0}")]
    Interaction(String),

    #[error("Assertion failed [{scenario}]: {detail}")]
    Assertion { scenario: String, detail: String },

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl AppError {
    pub fn assertion(scenario: &str, detail: impl Into<String>) -> Self {
        AppError::Assertion {
            scenario: scenario.to_string(),
            detail: detail.into(),
        }
    }
}
