//! Official legal publication portal (publication.pravo.gov.ru).

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use url::Url;

use crate::models::{Citation, Status};
use crate::sources::classify::classify_search_page;
use crate::sources::{
    status_or_request_error, CheckerCapabilities, SourceError, StatusChecker, PRAVO_ID,
};
use crate::utils::HttpClient;

const PRAVO_BASE_URL: &str = "http://publication.pravo.gov.ru";
const SEARCH_PATH: &str = "/Search/";

/// Primary registry checker.
///
/// Searches the portal for `"{doc_type} {number}"` and classifies the whole
/// results page. A 403 is reported as [`Status::AccessDenied`] rather than a
/// request error, since it means the portal is blocking us.
#[derive(Debug, Clone)]
pub struct PravoChecker {
    client: Arc<HttpClient>,
    search_url: Url,
}

impl PravoChecker {
    pub fn new(client: Arc<HttpClient>) -> Result<Self, SourceError> {
        Self::with_base_url(client, PRAVO_BASE_URL)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: &str) -> Result<Self, SourceError> {
        let search_url = Url::parse(base_url)?.join(SEARCH_PATH)?;
        Ok(Self { client, search_url })
    }

    /// The portal's search does not understand the numero sign
    pub(crate) fn build_query(citation: &Citation) -> String {
        format!("{} {}", citation.doc_type, citation.number).replace('№', "N")
    }

    pub(crate) fn search_url(&self, citation: &Citation) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("text", &Self::build_query(citation));
        url
    }

    async fn lookup(&self, citation: &Citation) -> Result<Status, SourceError> {
        let url = self.search_url(citation);
        let page = self.client.get(url.as_str()).await?;

        match page.status {
            StatusCode::FORBIDDEN => {
                tracing::warn!(url = %url, "Access denied (403)");
                Ok(Status::AccessDenied)
            }
            StatusCode::OK => Ok(classify_search_page(&page.body)),
            other => {
                tracing::warn!(url = %url, status = %other, "Unexpected status from portal");
                Ok(Status::RequestError)
            }
        }
    }
}

#[async_trait]
impl StatusChecker for PravoChecker {
    fn id(&self) -> &str {
        PRAVO_ID
    }

    fn name(&self) -> &str {
        "Официальный интернет-портал правовой информации"
    }

    fn capabilities(&self) -> CheckerCapabilities {
        CheckerCapabilities::QUERY_SEARCH
    }

    async fn check(&self, citation: &Citation) -> Status {
        let result = self.lookup(citation).await;
        status_or_request_error(self.id(), citation, result)
    }
}
