//! Government of Russia document listing (government.ru/docs).

use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use url::Url;

use crate::models::{Citation, Status};
use crate::sources::classify::{classify_entry, normalize_number, parse_selector, EntryRules};
use crate::sources::{
    status_or_request_error, CheckerCapabilities, SourceError, StatusChecker, GOVERNMENT_ID,
};
use crate::utils::HttpClient;

const GOVERNMENT_BASE_URL: &str = "https://government.ru";
const DOCS_PATH: &str = "/docs/";

/// Secondary registry checker.
///
/// government.ru has no usable search endpoint, so this checker reads the
/// fixed document listing and looks for an entry whose title names both the
/// document type and number.
#[derive(Debug, Clone)]
pub struct GovernmentChecker {
    client: Arc<HttpClient>,
    listing_url: Url,
}

impl GovernmentChecker {
    pub fn new(client: Arc<HttpClient>) -> Result<Self, SourceError> {
        Self::with_base_url(client, GOVERNMENT_BASE_URL)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: &str) -> Result<Self, SourceError> {
        let listing_url = Url::parse(base_url)?.join(DOCS_PATH)?;
        Ok(Self {
            client,
            listing_url,
        })
    }

    /// Classify the first listing entry that matches the citation
    fn classify_listing(html: &str, citation: &Citation) -> Result<Status, SourceError> {
        let document = Html::parse_document(html);
        let item_selector = parse_selector("div.doc-list-item")?;
        let link_selector = parse_selector("a[href]")?;

        let number = normalize_number(&citation.number);
        let doc_type = citation.doc_type.to_lowercase();

        for item in document.select(&item_selector) {
            let Some(link) = item.select(&link_selector).next() else {
                continue;
            };

            let title = link
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();

            if title.contains(&number) && title.contains(&doc_type) {
                tracing::debug!(title = %title, "Matched listing entry");
                return Ok(classify_entry(&title, &EntryRules::LISTING)
                    .unwrap_or(Status::Undetermined));
            }
        }

        Ok(Status::NotFound)
    }

    async fn lookup(&self, citation: &Citation) -> Result<Status, SourceError> {
        let html = self.client.fetch(self.listing_url.as_str()).await?;
        Self::classify_listing(&html, citation)
    }
}

#[async_trait]
impl StatusChecker for GovernmentChecker {
    fn id(&self) -> &str {
        GOVERNMENT_ID
    }

    fn name(&self) -> &str {
        "Правительство России"
    }

    fn capabilities(&self) -> CheckerCapabilities {
        CheckerCapabilities::LISTING_SCAN
    }

    async fn check(&self, citation: &Citation) -> Status {
        let result = self.lookup(citation).await;
        status_or_request_error(self.id(), citation, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="doc-list-item"><span>Без ссылки, Постановление №1479</span></div>
          <div class="doc-list-item">
            <a href="/docs/1/">Постановление <b>№ 100</b> от 1 января 2020 года. Утратил силу</a>
          </div>
          <div class="doc-list-item">
            <a href="/docs/2/">Постановление № 1479 о пожарной безопасности вступает в силу 1 января</a>
          </div>
          <div class="doc-list-item">
            <a href="/docs/3/">Распоряжение № 2000 о программе</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_listing_match_requires_type_and_number() {
        let status =
            GovernmentChecker::classify_listing(LISTING, &Citation::new("Распоряжение", "1479"))
                .unwrap();
        assert_eq!(status, Status::NotFound);

        let status =
            GovernmentChecker::classify_listing(LISTING, &Citation::new("Постановление", "1479"))
                .unwrap();
        assert_eq!(status, Status::Active);
    }

    #[test]
    fn test_listing_repealed_across_nested_nodes() {
        let status =
            GovernmentChecker::classify_listing(LISTING, &Citation::new("постановление", "100"))
                .unwrap();
        assert_eq!(status, Status::Repealed);
    }

    #[test]
    fn test_listing_match_without_phrase_is_undetermined() {
        let status =
            GovernmentChecker::classify_listing(LISTING, &Citation::new("Распоряжение", "2000"))
                .unwrap();
        assert_eq!(status, Status::Undetermined);
    }

    #[tokio::test]
    async fn test_check_fetches_listing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/docs/")
            .with_status(200)
            .with_body(LISTING)
            .expect(1)
            .create_async()
            .await;

        let checker =
            GovernmentChecker::with_base_url(Arc::new(HttpClient::new().unwrap()), &server.url())
                .unwrap();
        let status = checker.check(&Citation::new("Постановление", "100")).await;

        assert_eq!(status, Status::Repealed);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_listing_is_request_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/docs/")
            .with_status(404)
            .create_async()
            .await;

        let checker =
            GovernmentChecker::with_base_url(Arc::new(HttpClient::new().unwrap()), &server.url())
                .unwrap();
        let status = checker.check(&Citation::new("Постановление", "100")).await;

        assert_eq!(status, Status::RequestError);
    }

    #[tokio::test]
    async fn test_failed_fetch_logged_once() {
        let logs = crate::utils::log_capture::LogCapture::default();
        let _guard = logs.install();

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/docs/")
            .with_status(500)
            .create_async()
            .await;

        let checker =
            GovernmentChecker::with_base_url(Arc::new(HttpClient::new().unwrap()), &server.url())
                .unwrap();
        let status = checker.check(&Citation::new("Постановление", "100")).await;

        assert_eq!(status, Status::RequestError);
        let reported = logs.lines_at("WARN").len() + logs.lines_at("ERROR").len();
        assert_eq!(reported, 1, "{}", logs.contents());
    }
}
