//! ConsultantPlus search (consultant.ru).

use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use url::Url;

use crate::models::{Citation, Status};
use crate::sources::classify::{classify_entry, normalize_number, parse_selector, EntryRules};
use crate::sources::{
    status_or_request_error, CheckerCapabilities, SourceError, StatusChecker, CONSULTANT_ID,
};
use crate::utils::HttpClient;

const CONSULTANT_BASE_URL: &str = "https://www.consultant.ru";
const SEARCH_PATH: &str = "/search/";

/// Commercial aggregator checker.
///
/// Used as the fallback for government decrees the official portal does not
/// know about. The query includes the issue date when the citation has one.
#[derive(Debug, Clone)]
pub struct ConsultantChecker {
    client: Arc<HttpClient>,
    search_url: Url,
}

impl ConsultantChecker {
    pub fn new(client: Arc<HttpClient>) -> Result<Self, SourceError> {
        Self::with_base_url(client, CONSULTANT_BASE_URL)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: &str) -> Result<Self, SourceError> {
        let search_url = Url::parse(base_url)?.join(SEARCH_PATH)?;
        Ok(Self { client, search_url })
    }

    /// `"{doc_type} {number} от {date}"` without numero signs or doubled spaces
    pub(crate) fn build_query(citation: &Citation) -> String {
        let mut query = format!("{} {}", citation.doc_type, citation.number);
        if let Some(date) = &citation.date {
            query.push_str(" от ");
            query.push_str(date);
        }

        query
            .replace('№', "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn search_url(&self, citation: &Citation) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", &Self::build_query(citation));
        url
    }

    /// Classify the first result block that names the number and carries a
    /// status phrase. Blocks naming the number without a phrase are skipped.
    fn classify_results(html: &str, citation: &Citation) -> Result<Status, SourceError> {
        let document = Html::parse_document(html);
        let result_selector = parse_selector("div.search-result-item")?;
        let number = normalize_number(&citation.number);

        for block in document.select(&result_selector) {
            let text = block.text().collect::<String>().to_lowercase();
            if !text.contains(&number) {
                continue;
            }

            if let Some(status) = classify_entry(&text, &EntryRules::SEARCH_RESULT) {
                return Ok(status);
            }
        }

        Ok(Status::NotFound)
    }

    async fn lookup(&self, citation: &Citation) -> Result<Status, SourceError> {
        let url = self.search_url(citation);
        let html = self.client.fetch(url.as_str()).await?;
        Self::classify_results(&html, citation)
    }
}

#[async_trait]
impl StatusChecker for ConsultantChecker {
    fn id(&self) -> &str {
        CONSULTANT_ID
    }

    fn name(&self) -> &str {
        "КонсультантПлюс"
    }

    fn capabilities(&self) -> CheckerCapabilities {
        CheckerCapabilities::QUERY_SEARCH | CheckerCapabilities::DATE_AWARE
    }

    async fn check(&self, citation: &Citation) -> Status {
        let result = self.lookup(citation).await;
        status_or_request_error(self.id(), citation, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const RESULTS: &str = r#"
        <div class="search-result-item">Постановление Правительства РФ от 16.09.2020 N 1479</div>
        <div class="search-result-item">Постановление Правительства РФ N 1479 (ред. от 2023). Не действует</div>
        <div class="search-result-item">Постановление N 390. Действующая редакция</div>
    "#;

    #[test]
    fn test_build_query() {
        let citation = Citation::new("Постановление Правительства РФ", "№ 1479")
            .with_date("16.09.2020");
        assert_eq!(
            ConsultantChecker::build_query(&citation),
            "Постановление Правительства РФ 1479 от 16.09.2020"
        );

        let undated = Citation::new("Приказ", "12");
        assert_eq!(ConsultantChecker::build_query(&undated), "Приказ 12");
    }

    #[test]
    fn test_blocks_without_phrase_are_skipped() {
        let citation = Citation::new("Постановление Правительства РФ", "1479");
        let status = ConsultantChecker::classify_results(RESULTS, &citation).unwrap();
        assert_eq!(status, Status::Repealed);
    }

    #[test]
    fn test_active_and_not_found() {
        let active = ConsultantChecker::classify_results(
            RESULTS,
            &Citation::new("Постановление Правительства РФ", "390"),
        )
        .unwrap();
        assert_eq!(active, Status::Active);

        let missing = ConsultantChecker::classify_results(
            RESULTS,
            &Citation::new("Постановление Правительства РФ", "777"),
        )
        .unwrap();
        assert_eq!(missing, Status::NotFound);
    }

    #[tokio::test]
    async fn test_check_sends_dated_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/")
            .match_query(Matcher::UrlEncoded(
                "q".to_string(),
                "Постановление Правительства РФ 1479 от 16.09.2020".to_string(),
            ))
            .with_status(200)
            .with_body(RESULTS)
            .expect(1)
            .create_async()
            .await;

        let checker =
            ConsultantChecker::with_base_url(Arc::new(HttpClient::new().unwrap()), &server.url())
                .unwrap();
        let citation = Citation::new("Постановление Правительства РФ", "№1479")
            .with_date("16.09.2020");

        assert_eq!(checker.check(&citation).await, Status::Repealed);
        mock.assert_async().await;
    }
}
