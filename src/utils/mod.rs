//! Utility modules supporting status lookups.
//!
//! - [`HttpClient`]: shared HTTP client with browser headers and optional rate limiting
//! - [`Page`]: status code and body of a fetched page
//! - [`StatusCache`]: per-run cache of resolved statuses
//!
//! # HTTP Client
//!
//! ```rust,no_run
//! use normdoc_status::utils::HttpClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let page = client.get("http://publication.pravo.gov.ru/Search/").await?;
//! println!("{}", page.status);
//! # Ok(())
//! # }
//! ```

mod cache;
mod http;
#[cfg(test)]
pub(crate) mod log_capture;

pub use cache::{CacheStats, StatusCache};
pub use http::{HttpClient, Page};
