/*!
 * Error types for the sitewai application.
 *
 * This module contains custom error types for the different layers of the
 * application, using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: failures talking to an LLM backend
 * - `CapabilityError`: failures of a translate/review/refine capability call
 * - `PlanError`: invalid input detected while planning batches
 * - `WorkflowError`: the only failure a workflow run surfaces to its caller
 * - `AppError`: top-level error for the command line application
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification attached to failed batches and fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The input tree could not be planned
    InvalidPlan,
    /// A translate/review/refine call failed
    Capability,
    /// A call exceeded its per-batch timeout or the run deadline
    Timeout,
    /// The run was cancelled before the batch resolved
    Cancelled,
    /// The refinement pass returned a tree that does not match its input
    RefinementIntegrity,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidPlan => "invalid_plan",
            Self::Capability => "capability",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::RefinementIntegrity => "refinement_integrity",
        };
        write!(f, "{}", name)
    }
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors returned by a translate/review/refine capability
#[derive(Error, Debug, Clone)]
pub enum CapabilityError {
    /// The underlying provider failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The capability answered, but the answer does not fit the request
    #[error("Malformed capability output: {0}")]
    MalformedOutput(String),

    /// The capability is not able to serve the request at all
    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}

/// Errors detected while planning batches and stages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The content tree has no sections
    #[error("content tree contains no sections")]
    EmptyTree,

    /// Two sections share an identifier
    #[error("duplicate section identifier: {0}")]
    DuplicateSection(String),

    /// A section has an empty identifier
    #[error("section at position {0} has an empty identifier")]
    EmptySectionId(usize),

    /// A sizing parameter is zero
    #[error("invalid plan parameter {name}: must be at least 1")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
    },
}

impl PlanError {
    /// Error kind for reporting
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidPlan
    }
}

/// The single caller-visible failure of a workflow run
#[derive(Error, Debug, Clone)]
pub enum WorkflowError {
    /// The input could not be planned; no capability was called
    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),

    /// Every batch failed, so there is nothing usable to return
    #[error("no usable output for {target_language}: all {failed_batches} batches failed ({details})")]
    NoUsableOutput {
        /// Target language of the run
        target_language: String,
        /// Number of planned batches, all of them failed
        failed_batches: usize,
        /// Short summary of the batch errors
        details: String,
    },

    /// The run was cancelled before any batch was translated
    #[error("workflow for {target_language} cancelled before any batch was translated")]
    Cancelled {
        /// Target language of the run
        target_language: String,
    },

    /// The assembled output does not hold exactly the input's sections
    #[error("incomplete output for {target_language}: {details}")]
    IncompleteOutput {
        /// Target language of the run
        target_language: String,
        /// Missing, extra or repeated section ids
        details: String,
    },
}

impl WorkflowError {
    /// Error kind for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPlan(_) => ErrorKind::InvalidPlan,
            Self::NoUsableOutput { .. } => ErrorKind::Capability,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::IncompleteOutput { .. } => ErrorKind::RefinementIntegrity,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a workflow run
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Error in the content file
    #[error("Content error: {0}")]
    Content(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::Content(error.to_string())
    }
}
