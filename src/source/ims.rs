//! HTTP-backed notice source for the IMS notifications page.
//!
//! The page filters its listing through a branch `<select>` in a form. Selecting a
//! branch is done by posting that form field back to the page; the response is the
//! filtered listing.

use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{debug, instrument};

use super::html::parse_listing;
use super::{NoticeSource, SourceError};
use crate::types::{BranchId, Notice};

/// The notifications page scraped by default.
pub const DEFAULT_SOURCE_URL: &str = "https://www.imsnsit.org/imsnsit/notifications.php";

/// The form field that carries the branch selection.
pub const DEFAULT_BRANCH_FIELD: &str = "branch";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scrapes one branch's listing per call, with no caching.
#[derive(Debug, Clone)]
pub struct ImsSource {
    client: Client,
    url: Url,
    branch_field: String,
}

impl ImsSource {
    /// Creates a source for the page at `url`.
    pub fn new(url: &str, branch_field: impl Into<String>) -> Result<Self, SourceError> {
        let url = Url::parse(url)
            .map_err(|e| SourceError::fetch(format!("invalid source URL {:?}: {}", url, e)))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("notice-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, url, branch_field))
    }

    /// Creates a source from a pre-configured client.
    pub fn with_client(client: Client, url: Url, branch_field: impl Into<String>) -> Self {
        ImsSource {
            client,
            url,
            branch_field: branch_field.into(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl NoticeSource for ImsSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self, branch: &BranchId) -> Result<Vec<Notice>, SourceError> {
        let response = self
            .client
            .post(self.url.clone())
            .form(&[(self.branch_field.as_str(), branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::fetch(format!(
                "notice board returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let notices = parse_listing(&body, &self.url)?;
        debug!(count = notices.len(), "Fetched listing");
        Ok(notices)
    }
}
