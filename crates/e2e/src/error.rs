//! Error types for E2E scenarios

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// A session resource could not be acquired during scenario set-up.
    #[error("Failed to initialize {resource}: {reason}")]
    Initialization {
        resource: &'static str,
        reason: String,
    },

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    /// An entity was resolved before the resource it is bound to exists.
    #[error("Cannot resolve '{entity}': {dependency} is not initialized")]
    ResourceNotInitialized {
        entity: String,
        dependency: &'static str,
    },

    #[error("No such entity: {0}")]
    NoSuchEntity(String),

    /// A step read a scenario state slot nothing has written yet.
    #[error("Scenario state slot '{slot}' is not set")]
    SlotNotSet { slot: &'static str },

    #[error("Scenario is not set up")]
    ScenarioNotActive,

    #[error("Undefined step: {0}")]
    UndefinedStep(String),

    #[error("Ambiguous step '{step}' matches {patterns:?}")]
    AmbiguousStep { step: String, patterns: Vec<String> },

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("{method} {url} returned {status}: {body}")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// A session resource handle was used after it was released.
    #[error("{0} is closed")]
    ResourceClosed(&'static str),

    #[error("Teardown failed: {}", .0.join("; "))]
    Teardown(Vec<String>),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Scenario spec parse error: {0}")]
    SpecParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid step pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl E2eError {
    /// HTTP status carried by an API error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            E2eError::HttpStatus { status, .. } => Some(*status),
            E2eError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status() == Some(404)
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
