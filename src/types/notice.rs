//! Scraped notices and their content-derived identity.
//!
//! The notice board exposes no stable identifiers, so a notice is identified by a
//! SHA-256 digest of its title. Titles are the only field observed to repeat exactly
//! across scrapes of the same notice; links and publisher text may change formatting
//! without any semantic change.
//!
//! Two unrelated notices with identical titles share an ID. This is accepted.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content-derived notice identifier (SHA-256 of the title).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoticeId([u8; 32]);

impl NoticeId {
    /// Derives the identifier for a title.
    pub fn from_title(title: &str) -> Self {
        let digest = Sha256::digest(title.as_bytes());
        NoticeId(digest.into())
    }

    /// Returns the first 12 hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for NoticeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for NoticeId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(NoticeId(bytes))
    }
}

/// One announcement scraped from the notice board.
///
/// Constructed fresh on every scrape and never mutated. The `id` is computed from
/// `title` at construction, so it cannot drift from the title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    id: NoticeId,
    title: String,
    url: Option<String>,
    publisher: String,
    published_on: Option<NaiveDate>,
}

impl Notice {
    /// Creates a notice. The title should already be whitespace-normalized.
    pub fn new(title: impl Into<String>, url: Option<String>, publisher: impl Into<String>) -> Self {
        let title = title.into();
        Notice {
            id: NoticeId::from_title(&title),
            title,
            url: url.filter(|u| !u.trim().is_empty()),
            publisher: publisher.into(),
            published_on: None,
        }
    }

    /// Sets the upload date shown next to the notice.
    pub fn with_published_on(mut self, date: NaiveDate) -> Self {
        self.published_on = Some(date);
        self
    }

    pub fn id(&self) -> NoticeId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn published_on(&self) -> Option<NaiveDate> {
        self.published_on
    }
}

/// Returns the identity used for deduplication and cursor comparison.
pub fn identity(notice: &Notice) -> NoticeId {
    notice.id
}
