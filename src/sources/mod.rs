//! Status checkers for external legal registries.
//!
//! Every registry is wrapped in a type implementing [`StatusChecker`]. A
//! checker turns one citation into one [`Status`] and never fails: transport
//! errors, unexpected status codes and unreadable pages are logged and
//! reported as [`Status::RequestError`].
//!
//! # Available Checkers
//!
//! - `pravo` - official publication portal (publication.pravo.gov.ru), per-citation search
//! - `government` - government.ru document listing, scanned for a matching title
//! - `consultant` - ConsultantPlus search results, date-aware query
//!
//! Which checkers run for a given citation is decided by the
//! [`ResolutionPolicy`](crate::enrich::ResolutionPolicy), not by the checkers.

mod classify;
mod consultant;
mod government;
mod pravo;
mod registry;

pub mod mock;

pub use classify::{classify_entry, classify_search_page, EntryRules};
pub(crate) use classify::mentions;
pub use consultant::ConsultantChecker;
pub use government::GovernmentChecker;
pub use mock::MockChecker;
pub use pravo::PravoChecker;
pub use registry::{CheckerCapabilities, CheckerRegistry};

use async_trait::async_trait;

use crate::models::{Citation, Status};

/// Id of the official publication portal checker
pub const PRAVO_ID: &str = "pravo";

/// Id of the government.ru listing checker
pub const GOVERNMENT_ID: &str = "government";

/// Id of the ConsultantPlus checker
pub const CONSULTANT_ID: &str = "consultant";

/// Interface implemented by every registry checker.
///
/// # Implementing a New Checker
///
/// 1. Create a struct holding a shared [`HttpClient`](crate::utils::HttpClient)
/// 2. Implement `id`, `name` and `check`; override `capabilities` if the
///    checker scans listings or uses the citation date
/// 3. Register it in [`CheckerRegistry::from_config`] and reference its id
///    from a policy route
#[async_trait]
pub trait StatusChecker: Send + Sync + std::fmt::Debug {
    /// Unique identifier, used in policy routes
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Describe how this checker queries its source
    fn capabilities(&self) -> CheckerCapabilities {
        CheckerCapabilities::QUERY_SEARCH
    }

    /// Resolve the status of a citation
    async fn check(&self, citation: &Citation) -> Status;
}

/// Errors raised inside a checker before they are folded into a [`Status`]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network, timeout or TLS failure
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with an unexpected status code
    #[error("HTTP status {status}")]
    Http { status: reqwest::StatusCode },

    /// Parsing error (HTML, URL, selectors)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client-side rate limiter refused the request
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Http { status },
            None => SourceError::Network(err.to_string()),
        }
    }
}

impl From<url::ParseError> for SourceError {
    fn from(err: url::ParseError) -> Self {
        SourceError::InvalidRequest(format!("URL: {}", err))
    }
}

/// Fold a checker's internal result into a status.
///
/// Network and HTTP status failures were already logged by
/// [`HttpClient`](crate::utils::HttpClient), so they are only traced here.
pub(crate) fn status_or_request_error(
    source: &str,
    citation: &Citation,
    result: Result<Status, SourceError>,
) -> Status {
    match result {
        Ok(status) => status,
        Err(e @ (SourceError::Network(_) | SourceError::Http { .. })) => {
            tracing::debug!(source, citation = %citation.key(), "Lookup failed: {}", e);
            Status::RequestError
        }
        Err(e) => {
            tracing::error!(
                source,
                citation = %citation.key(),
                "Lookup failed: {}",
                e
            );
            Status::RequestError
        }
    }
}
