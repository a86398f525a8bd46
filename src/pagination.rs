//! Pagination utilities for Connect API responses.
//!
//! Connect uses two page shapes. Offset endpoints take `page_number` and
//! `page_size` and answer `{"results": [...], "current_page": n, "total": t}`.
//! Cursor endpoints take `limit` and `next` and answer
//! `{"results": [...], "paging": {"cursors": {"next": "..."}}}`.
//! [`Paginator`] walks either shape to the end before returning anything.

use serde_json::Value;

use crate::context::Context;
use crate::error::{ConnectError, Result};
use crate::transport::{Request, Response};

/// Largest page size the server accepts.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Maximum pages to fetch (safety limit).
const MAX_PAGES: u32 = 10_000;

/// How a collection endpoint pages its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// A single response holds the whole collection.
    None,
    /// `page_number` / `page_size` requests with a `total` in each response.
    Offset { page_size: u32 },
    /// `limit` / `next` requests with a cursor in each response.
    Cursor { limit: u32 },
}

/// Pagination metadata carried by a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageMarker {
    Offset { current_page: u64, total: u64 },
    Cursor { next: Option<String> },
}

impl PageMarker {
    /// Recognize either metadata shape in a decoded body.
    pub fn detect(body: &Value) -> Option<Self> {
        let obj = body.as_object()?;

        if let Some(paging) = obj.get("paging") {
            let next = paging
                .get("cursors")
                .and_then(|c| c.get("next"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            return Some(Self::Cursor { next });
        }

        let total = obj.get("total").and_then(Value::as_u64)?;
        let current_page = obj
            .get("current_page")
            .and_then(Value::as_u64)
            .unwrap_or(1);
        Some(Self::Offset {
            current_page,
            total,
        })
    }
}

/// One page of records and its pagination metadata.
#[derive(Debug)]
pub(crate) struct Page {
    pub items: Vec<Value>,
    pub marker: Option<PageMarker>,
}

impl Page {
    /// Split a response into its records and pagination metadata.
    ///
    /// Accepts a bare JSON array or an object with a `results` array.
    pub fn from_response(path: &str, response: Response) -> Result<Self> {
        let Response {
            body, pagination, ..
        } = response;

        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("results") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None if pagination.is_some() => Vec::new(),
                _ => return Err(unexpected(path)),
            },
            Value::Null => Vec::new(),
            _ => return Err(unexpected(path)),
        };

        Ok(Self {
            items,
            marker: pagination,
        })
    }

    /// Total item count reported by an offset endpoint.
    pub fn total(&self) -> Option<u64> {
        match self.marker {
            Some(PageMarker::Offset { total, .. }) => Some(total),
            _ => None,
        }
    }

    /// Cursor for the following page, if the endpoint reported one.
    pub fn next_cursor(&self) -> Option<&str> {
        match &self.marker {
            Some(PageMarker::Cursor { next }) => next.as_deref(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

fn unexpected(path: &str) -> ConnectError {
    ConnectError::UnexpectedResponse {
        path: path.to_string(),
        reason: "expected a JSON array or a `results` array".to_string(),
    }
}

/// Walks every page of a collection endpoint.
#[derive(Debug)]
pub struct Paginator<'a> {
    ctx: &'a Context,
    path: &'a str,
    params: &'a [(String, String)],
    style: Pagination,
}

impl<'a> Paginator<'a> {
    pub fn new(ctx: &'a Context, path: &'a str, style: Pagination) -> Self {
        Self {
            ctx,
            path,
            params: &[],
            style,
        }
    }

    /// Query parameters sent with every page request.
    #[must_use]
    pub fn params(mut self, params: &'a [(String, String)]) -> Self {
        self.params = params;
        self
    }

    /// Fetch every page and concatenate the records in server order.
    ///
    /// # Errors
    ///
    /// Any failed page fails the whole walk; records already received are
    /// dropped.
    #[tracing::instrument(skip(self), fields(path = %self.path))]
    pub async fn fetch_results(&self) -> Result<Vec<Value>> {
        let results = match self.style {
            Pagination::None => self.fetch_page(Vec::new()).await?.items,
            Pagination::Offset { page_size } => self.fetch_offset(page_size).await?,
            Pagination::Cursor { limit } => self.fetch_cursor(limit).await?,
        };

        tracing::debug!(count = results.len(), "collection fetched");
        Ok(results)
    }

    async fn fetch_offset(&self, page_size: u32) -> Result<Vec<Value>> {
        let mut results = Vec::new();
        let mut page_number: u32 = 1;

        loop {
            let page = self
                .fetch_page(vec![
                    ("page_number".to_string(), page_number.to_string()),
                    ("page_size".to_string(), page_size.to_string()),
                ])
                .await?;
            tracing::debug!(page_number, items = page.len(), total = ?page.total(), "page fetched");

            if page.is_empty() {
                break;
            }

            let short_page = page.len() < page_size as usize;
            let total = page.total();
            results.extend(page.items);

            // The total can move between requests; never trust it to be exact.
            let done = match total {
                Some(total) => results.len() as u64 >= total,
                None => short_page,
            };
            if done {
                break;
            }

            page_number += 1;
            self.check_limit(page_number)?;
        }

        Ok(results)
    }

    async fn fetch_cursor(&self, limit: u32) -> Result<Vec<Value>> {
        let mut results = Vec::new();
        let mut next: Option<String> = None;
        let mut pages: u32 = 1;

        loop {
            let mut extra = vec![("limit".to_string(), limit.to_string())];
            if let Some(cursor) = &next {
                extra.push(("next".to_string(), cursor.clone()));
            }

            let page = self.fetch_page(extra).await?;
            tracing::debug!(pages, items = page.len(), "page fetched");

            next = page.next_cursor().map(str::to_string);
            results.extend(page.items);

            if next.is_none() {
                break;
            }

            pages += 1;
            self.check_limit(pages)?;
        }

        Ok(results)
    }

    async fn fetch_page(&self, extra: Vec<(String, String)>) -> Result<Page> {
        let request = Request::get(self.path)
            .params(self.params.iter().cloned())
            .params(extra);
        let response = self.ctx.send(request).await?;
        Page::from_response(self.path, response)
    }

    fn check_limit(&self, pages: u32) -> Result<()> {
        if pages > MAX_PAGES {
            tracing::warn!("Reached pagination limit of {} pages, stopping", MAX_PAGES);
            return Err(ConnectError::PaginationLimit {
                path: self.path.to_string(),
                pages: MAX_PAGES,
            });
        }
        Ok(())
    }
}
