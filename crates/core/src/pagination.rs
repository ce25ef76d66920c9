//! Page-number pagination shared by every list endpoint.
//!
//! Clients send a 1-based `page` and a `size`; repositories translate that
//! into `LIMIT`/`OFFSET` and wrap the rows in a [`Page`].

use serde::Serialize;

/// Page size used when the client does not send one.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamp a user-provided page size to `1..=max`, falling back to `default`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided 1-based page number to at least 1.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Resolved paging window for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            page: clamp_page(page),
            size: clamp_limit(size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE),
        }
    }

    /// Row offset for SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }

    /// Wrap one page of rows together with the total match count.
    pub fn wrap<T>(&self, items: Vec<T>, total_elements: i64) -> Page<T> {
        let total_pages = if total_elements == 0 {
            0
        } else {
            (total_elements + self.size - 1) / self.size
        };
        Page {
            items,
            page: self.page,
            size: self.size,
            total_elements,
            total_pages,
            last: self.page >= total_pages,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub last: bool,
}

impl<T> Page<T> {
    /// Convert every item while keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            last: self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let req = PageRequest::new(None, None);
        assert_eq!(req.page, 1);
        assert_eq!(req.size, DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn size_is_clamped() {
        assert_eq!(PageRequest::new(None, Some(0)).size, 1);
        assert_eq!(PageRequest::new(None, Some(-5)).size, 1);
        assert_eq!(PageRequest::new(None, Some(1000)).size, MAX_PAGE_SIZE);
    }

    #[test]
    fn page_is_one_based() {
        assert_eq!(PageRequest::new(Some(0), Some(20)).offset(), 0);
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn wrap_computes_total_pages() {
        let req = PageRequest::new(Some(2), Some(10));
        let page = req.wrap(vec![1, 2, 3], 23);
        assert_eq!(page.total_pages, 3);
        assert!(!page.last);

        let page = PageRequest::new(Some(3), Some(10)).wrap(vec![1], 23);
        assert!(page.last);
    }

    #[test]
    fn empty_result_is_last_page() {
        let page = PageRequest::default().wrap(Vec::<i32>::new(), 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.last);
    }

    #[test]
    fn map_keeps_metadata() {
        let page = PageRequest::new(Some(1), Some(2)).wrap(vec![1, 2], 5);
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total_elements, 5);
        assert_eq!(mapped.total_pages, 3);
    }
}
