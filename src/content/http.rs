//! HTTP content source.
//!
//! Sections are served by a web application: reference `ch1` is fetched from
//! `<base>ch1/`. The viewer page of the same application lives at
//! `<base>facing/`, which is where "open in browser" points.

use super::ContentSource;
use crate::error::{Error, FetchFailure, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// Request timeout for section fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the browser viewer page relative to the base URL.
const VIEWER_PAGE: &str = "facing/";

/// Fetches sections over HTTP with a blocking client.
///
/// Only used from the loader thread, never from the UI thread.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: Url,
    client: Client,
}

impl HttpSource {
    /// Create a source for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSource` for URLs that cannot serve sections.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = normalize_base(base_url)?;
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::InvalidSource(format!("HTTP client: {}", e)))?;
        Ok(Self { base, client })
    }

    /// URL a section reference is fetched from.
    pub fn section_url(&self, reference: &str) -> Result<Url> {
        let reference = reference.trim_matches('/');
        if reference.is_empty() {
            return Err(Error::fetch(reference, FetchFailure::NotFound, "empty reference"));
        }
        Ok(self.base.join(&format!("{}/", reference))?)
    }
}

/// Ensure the base URL is http(s) and ends with a slash so joins append.
fn normalize_base(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url.trim())?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(Error::InvalidSource(format!(
            "unsupported scheme '{}'",
            base.scheme()
        )));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_fragment(None);
    base.set_query(None);
    Ok(base)
}

fn classify(err: &reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else if let Some(status) = err.status() {
        status_failure(status)
    } else {
        FetchFailure::Network
    }
}

fn status_failure(status: StatusCode) -> FetchFailure {
    if status == StatusCode::NOT_FOUND {
        FetchFailure::NotFound
    } else {
        FetchFailure::Http(status.as_u16())
    }
}

impl ContentSource for HttpSource {
    fn fetch(&self, reference: &str) -> Result<String> {
        let url = self.section_url(reference)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::fetch(reference, classify(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(reference, status_failure(status), ""));
        }

        response
            .text()
            .map_err(|e| Error::fetch(reference, classify(&e), e.to_string()))
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }

    fn browser_url(&self, location: &str) -> Option<String> {
        let mut page = self.base.join(VIEWER_PAGE).ok()?;
        if !location.is_empty() {
            page.set_fragment(Some(location));
        }
        Some(page.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_gets_trailing_slash() {
        let source = HttpSource::new("https://example.org/texts").unwrap();
        assert_eq!(source.describe(), "https://example.org/texts/");
    }

    #[test]
    fn test_section_url() {
        let source = HttpSource::new("https://example.org/texts/").unwrap();
        assert_eq!(
            source.section_url("ch1").unwrap().as_str(),
            "https://example.org/texts/ch1/"
        );
        assert_eq!(
            source.section_url("ch2/p3").unwrap().as_str(),
            "https://example.org/texts/ch2/p3/"
        );
        assert!(source.section_url("/").is_err());
    }

    #[test]
    fn test_browser_url() {
        let source = HttpSource::new("https://example.org/texts/").unwrap();
        assert_eq!(
            source.browser_url("ch1/ch2,p3").as_deref(),
            Some("https://example.org/texts/facing/#ch1/ch2,p3")
        );
        assert_eq!(
            source.browser_url("").as_deref(),
            Some("https://example.org/texts/facing/")
        );
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(
            HttpSource::new("ftp://example.org/"),
            Err(Error::InvalidSource(_))
        ));
        assert!(HttpSource::new("not a url").is_err());
    }

    #[test]
    fn test_status_failure() {
        assert_eq!(status_failure(StatusCode::NOT_FOUND), FetchFailure::NotFound);
        assert_eq!(
            status_failure(StatusCode::INTERNAL_SERVER_ERROR),
            FetchFailure::Http(500)
        );
    }
}
