//! Pagination types for list, filter and history results.
//!
//! Pages are 1-based and offset-driven: page `n` skips `(n - 1) * limit`
//! items. Every [`Page`] reports the total number of matches so callers can
//! render page navigation.

use serde::{Deserialize, Serialize};

/// Pagination settings for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,

    /// Maximum number of items per page.
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl Pagination {
    /// Creates pagination for the given page and limit.
    ///
    /// A page of 0 is treated as page 1, and a limit of 0 as 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Number of items to skip before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Information about a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// The 1-based page number.
    pub page: u32,

    /// The page size the request asked for.
    pub limit: u32,

    /// Total count of matching items.
    pub total: u64,

    /// `ceil(total / limit)`.
    pub total_pages: u64,

    /// Whether there are more results after this page.
    pub has_next: bool,

    /// Whether there are results before this page.
    pub has_prev: bool,
}

impl PageInfo {
    /// Computes page info for a total under the given pagination.
    pub fn new(pagination: Pagination, total: u64) -> Self {
        let limit = u64::from(pagination.limit.max(1));
        let total_pages = total.div_ceil(limit);
        let page = u64::from(pagination.page);

        Self {
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,

    /// Pagination information.
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    /// Creates a new page with the given items and page info.
    pub fn new(items: Vec<T>, page_info: PageInfo) -> Self {
        Self { items, page_info }
    }

    /// Creates an empty page.
    pub fn empty(pagination: Pagination) -> Self {
        Self {
            items: Vec::new(),
            page_info: PageInfo::new(pagination, 0),
        }
    }

    /// Returns true if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns the total count of matching items.
    pub fn total(&self) -> u64 {
        self.page_info.total
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_info: self.page_info,
        }
    }
}
