//! # normdoc-status
//!
//! Resolves the legal-force status of Russian regulatory-document citations
//! by querying public legal registries.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Citation records, statuses and extractor input parsing
//! - [`sources`]: Registry checkers behind the [`StatusChecker`] trait
//! - [`enrich`]: Resolution policy and the concurrent [`Enricher`]
//! - [`utils`]: HTTP client and status cache
//! - [`config`]: Configuration management

pub mod config;
pub mod enrich;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use enrich::{BatchReport, Enricher, ResolutionPolicy};
pub use models::{Citation, EnrichedCitation, Status};
pub use sources::{CheckerRegistry, StatusChecker};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
