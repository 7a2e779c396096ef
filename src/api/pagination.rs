//! Page-number pagination for listings.
//!
//! `page` is 1-based; `last` names the final page. Anything else that does
//! not land on an existing page is a 404, except page 1 of an empty listing.

use crate::config::PaginationConfig;
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

/// Query string of a listing request. Kept as raw strings so a malformed
/// value maps to the listing's own rules rather than a query rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn requested_page_size(&self) -> Option<i64> {
        self.page_size.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

/// A resolved page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub number: i64,
    pub size: i64,
    pub last: i64,
}

impl Window {
    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

/// Resolve the requested page against `count` matching rows.
pub fn window(query: &ListQuery, config: &PaginationConfig, count: i64) -> ApiResult<Window> {
    let size = i64::from(config.effective_page_size(query.requested_page_size())).max(1);
    let last = ((count + size - 1) / size).max(1);

    let number = match query.page.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some("last") => last,
        Some(raw) => raw.parse::<i64>().map_err(|_| ApiError::NotFound)?,
    };
    if number < 1 || number > last {
        return Err(ApiError::NotFound);
    }

    Ok(Window { number, size, last })
}

/// Paginated response body.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page whose links point back at `path`, keeping `search` and
    /// `page_size` from the request.
    pub fn new(path: &str, query: &ListQuery, window: Window, count: i64, results: Vec<T>) -> Self {
        let next = (window.number < window.last).then(|| link(path, query, Some(window.number + 1)));
        // The first page is linked without a page number.
        let previous = (window.number > 1)
            .then(|| link(path, query, (window.number > 2).then_some(window.number - 1)));
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn link(path: &str, query: &ListQuery, page: Option<i64>) -> String {
    let page = page.map(|p| p.to_string());
    let params: Vec<(&str, &str)> = [
        ("search", query.search.as_deref()),
        ("page_size", query.page_size.as_deref()),
        ("page", page.as_deref()),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key, v)))
    .collect();

    match serde_urlencoded::to_string(&params) {
        Ok(encoded) if !encoded.is_empty() => format!("{path}?{encoded}"),
        _ => path.to_string(),
    }
}
