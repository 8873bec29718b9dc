use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Offset-pagination failures. Mapped into each crate's own error enum so the
/// transport collaborator sees the usual taxonomy (invalid input vs not found).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Page and limit must be greater than 0")]
    NonPositive,

    /// The requested page is beyond the last page for the current total.
    /// Also raised for page 1 of an empty result set.
    #[error("Page {page} not found (total pages: {total_pages})")]
    OutOfRange { page: u32, total_pages: u32 },
}

/// A resolved pagination request: the SQL window plus the totals the
/// response envelope reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

/// One page of results plus the envelope fields callers echo back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, page: u32, window: PageWindow) -> Self {
        Self {
            results,
            current_page: page,
            total_pages: window.total_pages,
            total_results: window.total_results,
        }
    }
}

/// Validate a (page, limit) request against a known total row count.
///
/// `total_pages` is `ceil(total / limit)`; requesting past it fails, which
/// makes page 1 of an empty collection an out-of-range request as well.
pub fn window(page: u32, limit: u32, total: u64) -> Result<PageWindow, PageError> {
    if page == 0 || limit == 0 {
        return Err(PageError::NonPositive);
    }

    let total_pages = (total.div_ceil(limit as u64)) as u32;
    if page > total_pages {
        return Err(PageError::OutOfRange { page, total_pages });
    }

    Ok(PageWindow {
        offset: (page as u64 - 1) * limit as u64,
        limit,
        total_pages,
        total_results: total,
    })
}
