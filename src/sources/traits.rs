use crate::domain::{Cursor, RawCandidate};
use crate::errors::HarvestResult;

/// Request credential obtained from a session handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential(pub String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One fetched page. The content is opaque to the harvester; only the hint is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePayload {
    pub raw_content: String,
    pub next_cursor_hint: Option<Cursor>,
}

#[cfg_attr(test, mockall::automock)]
pub trait SessionProvider {
    /// Perform the handshake for a feed section
    fn obtain_credential(&self, section: &str) -> HarvestResult<Credential>;
}

#[cfg_attr(test, mockall::automock)]
pub trait PageFetcher {
    /// Fetch the page of items strictly older than `cursor`
    fn fetch_page(&self, cursor: Cursor, credential: &Credential) -> HarvestResult<PagePayload>;
}

#[cfg_attr(test, mockall::automock)]
pub trait PageParser {
    /// Turn one page's content into candidates, in feed order
    fn extract(&self, raw_content: &str) -> Vec<RawCandidate>;
}

impl<T: SessionProvider + ?Sized> SessionProvider for &T {
    fn obtain_credential(&self, section: &str) -> HarvestResult<Credential> {
        (**self).obtain_credential(section)
    }
}

impl<T: PageFetcher + ?Sized> PageFetcher for &T {
    fn fetch_page(&self, cursor: Cursor, credential: &Credential) -> HarvestResult<PagePayload> {
        (**self).fetch_page(cursor, credential)
    }
}

impl<T: PageParser + ?Sized> PageParser for &T {
    fn extract(&self, raw_content: &str) -> Vec<RawCandidate> {
        (**self).extract(raw_content)
    }
}
