//! Pagination strategy implementations
//!
//! Each strategy turns one response into the opaque token a caller passes
//! back as `next_page`.

use super::types::{extract_path, extract_string, PageContext, Paginator, StopCondition};
use crate::error::{Error, Result};
use crate::types::value_to_string;
use crate::urlbuilder::UrlBuilder;
use url::Url;

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor in the response body
///
/// Common patterns:
/// - `{ "nextPageToken": "...", "isLast": false }`
/// - `{ "NextToken": "..." }`
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Path to the cursor in the response
    pub cursor_path: String,
    /// Extra stop condition checked before reading the cursor
    pub stop_condition: Option<StopCondition>,
}

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new(cursor_path: impl Into<String>) -> Self {
        Self {
            cursor_path: cursor_path.into(),
            stop_condition: None,
        }
    }

    /// Stop when the condition holds even if a cursor is present
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = Some(condition);
        self
    }
}

impl Paginator for CursorPaginator {
    fn next_page(&self, page: &PageContext<'_>) -> Result<String> {
        if let Some(stop) = &self.stop_condition {
            if stop.should_stop(page.body, page.records_count) {
                return Ok(String::new());
            }
        }
        Ok(extract_string(page.body, &self.cursor_path).unwrap_or_default())
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Where the current page number lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// Query parameter of the request URL
    RequestQuery(String),
    /// Field of the JSON request body
    RequestBody(String),
    /// The response names the next page directly (null or absent ends)
    ResponseField(String),
}

/// Page counter pagination
///
/// Common patterns:
/// - `?page=2&per_page=100`
/// - `{"page_number": 2, "page_size": 200}` in a search body
/// - `{"metadata": {"paging": {"next_page": 3}}}`
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    /// Where the page number is read from
    pub source: PageSource,
    /// First page number (usually 0 or 1)
    pub start_page: u64,
    /// A page shorter than this is the last one
    pub page_size: Option<usize>,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl PageNumberPaginator {
    /// Create a new page number paginator
    pub fn new(source: PageSource, start_page: u64) -> Self {
        Self {
            source,
            start_page,
            page_size: None,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    /// Treat a short page as the last one
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Set the stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }

    fn current_page(&self, page: &PageContext<'_>) -> u64 {
        let current = match &self.source {
            PageSource::RequestQuery(param) => UrlBuilder::new(page.request_url)
                .ok()
                .and_then(|u| u.get_first_query_param(param).map(ToString::to_string)),
            PageSource::RequestBody(field) => page
                .request_body
                .and_then(|b| extract_path(b, field))
                .and_then(value_to_string),
            PageSource::ResponseField(_) => None,
        };
        current
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.start_page)
    }
}

impl Paginator for PageNumberPaginator {
    fn next_page(&self, page: &PageContext<'_>) -> Result<String> {
        if self.stop_condition.should_stop(page.body, page.records_count) {
            return Ok(String::new());
        }
        if let Some(size) = self.page_size {
            if page.records_count < size {
                return Ok(String::new());
            }
        }

        if let PageSource::ResponseField(path) = &self.source {
            return Ok(extract_string(page.body, path).unwrap_or_default());
        }

        Ok((self.current_page(page) + 1).to_string())
    }
}

/// Numeric `next_page` token of a page-number or offset read; empty means `first`
pub fn numeric_token(token: &str, first: u64) -> Result<u64> {
    if token.is_empty() {
        return Ok(first);
    }
    token
        .parse()
        .map_err(|_| Error::unmarshal(format!("invalid page token '{token}'")))
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset and limit pagination
///
/// Common patterns:
/// - `?offset=100&limit=50` with `{"count": 1234}`
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter carrying the offset
    pub offset_param: String,
    /// Records per page
    pub limit: usize,
    /// Path to the total record count, if the API reports it
    pub total_path: Option<String>,
}

impl OffsetPaginator {
    /// Create a new offset paginator
    pub fn new(offset_param: impl Into<String>, limit: usize) -> Self {
        Self {
            offset_param: offset_param.into(),
            limit,
            total_path: None,
        }
    }

    /// Stop once the offset reaches the total at this path
    #[must_use]
    pub fn with_total_path(mut self, path: impl Into<String>) -> Self {
        self.total_path = Some(path.into());
        self
    }
}

impl Paginator for OffsetPaginator {
    fn next_page(&self, page: &PageContext<'_>) -> Result<String> {
        if page.records_count == 0 || page.records_count < self.limit {
            return Ok(String::new());
        }

        let offset: usize = UrlBuilder::new(page.request_url)
            .ok()
            .and_then(|u| u.get_first_query_param(&self.offset_param).map(ToString::to_string))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let next = offset + page.records_count;

        if let Some(path) = &self.total_path {
            let total = extract_path(page.body, path).and_then(serde_json::Value::as_u64);
            if total.is_some_and(|t| next as u64 >= t) {
                return Ok(String::new());
            }
        }

        Ok(next.to_string())
    }
}

// ============================================================================
// Next URL Pagination
// ============================================================================

/// Next URL in the response body
///
/// Common patterns:
/// - `{ "next": "https://api.example.com/items?page=2" }`
/// - `{ "_links": { "next": { "href": "/v3/contacts?cursor=..." } } }`
///
/// Relative hrefs are joined onto the base URL; with `reorigin` absolute
/// hrefs are moved onto it as well.
#[derive(Debug, Clone)]
pub struct NextUrlPaginator {
    /// Path to the next URL in the response
    pub path: String,
    /// Base URL for relative hrefs
    pub base_url: Option<String>,
    /// Replace the scheme and host of absolute hrefs with the base URL's
    pub reorigin: bool,
    /// Extra stop condition
    pub stop_condition: Option<StopCondition>,
}

impl NextUrlPaginator {
    /// Create a new next URL paginator
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_url: None,
            reorigin: false,
            stop_condition: None,
        }
    }

    /// Join relative hrefs onto this base
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Also move absolute hrefs onto the base URL
    #[must_use]
    pub fn reorigin(mut self) -> Self {
        self.reorigin = true;
        self
    }

    /// Stop when the condition holds even if a URL is present
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = Some(condition);
        self
    }

    fn absolutize(&self, href: &str) -> String {
        let Some(base) = self.base_url.as_deref() else {
            return href.to_string();
        };
        let base = base.trim_end_matches('/');

        if href.starts_with('/') {
            return format!("{base}{href}");
        }

        if self.reorigin {
            if let Ok(url) = Url::parse(href) {
                return match url.query() {
                    Some(query) => format!("{base}{}?{query}", url.path()),
                    None => format!("{base}{}", url.path()),
                };
            }
        }
        href.to_string()
    }
}

impl Paginator for NextUrlPaginator {
    fn next_page(&self, page: &PageContext<'_>) -> Result<String> {
        if let Some(stop) = &self.stop_condition {
            if stop.should_stop(page.body, page.records_count) {
                return Ok(String::new());
            }
        }
        Ok(extract_string(page.body, &self.path)
            .map(|href| self.absolutize(&href))
            .unwrap_or_default())
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn next_page(&self, _page: &PageContext<'_>) -> Result<String> {
        Ok(String::new())
    }
}
