use serde::Serialize;

/// Largest page size a client may ask for.
pub const MAX_PAGE_SIZE: i64 = 100;
/// Page size for follow, publication and feed listings.
pub const DEFAULT_PAGE_SIZE: i64 = 5;
/// Page size for the user directory.
pub const DEFAULT_USER_PAGE_SIZE: i64 = 4;

/// A normalized page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Builds a request from raw path/query text.
    ///
    /// Missing, non-numeric or non-positive values fall back to page 1 and
    /// `default_limit`; the limit is capped at `MAX_PAGE_SIZE`.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Self {
        let page = parse_positive(page).unwrap_or(1);
        let limit = parse_positive(limit)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_SIZE);

        Self { page, limit }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value >= 1)
}

/// Counters returned with every page.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    /// Items across all pages.
    pub total: i64,
    /// Number of pages, `ceil(total / limit)`.
    pub pages: i64,
    pub page: i64,
    pub limit: i64,
}

impl PageMeta {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total = total.max(0);
        Self {
            total,
            pages: (total + request.limit - 1) / request.limit,
            page: request.page,
            limit: request.limit,
        }
    }
}

/// One page of items.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            meta: PageMeta::new(request, total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Message for an empty page: nothing at all, or past the last page.
    pub fn empty_message(&self, nothing: &str) -> String {
        if self.meta.total == 0 {
            nothing.to_string()
        } else {
            format!(
                "Page {} is out of range, there are {} pages",
                self.meta.page, self.meta.pages
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_absent() {
        let request = PageRequest::parse(None, None, DEFAULT_PAGE_SIZE);
        assert_eq!(request, PageRequest { page: 1, limit: 5 });
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn non_numeric_values_fall_back_instead_of_failing() {
        let request = PageRequest::parse(Some("abc"), Some("ten"), DEFAULT_PAGE_SIZE);
        assert_eq!(request, PageRequest { page: 1, limit: 5 });
    }

    #[test]
    fn zero_and_negative_values_fall_back() {
        let request = PageRequest::parse(Some("0"), Some("-3"), DEFAULT_USER_PAGE_SIZE);
        assert_eq!(request, PageRequest { page: 1, limit: 4 });
    }

    #[test]
    fn limit_is_capped() {
        let request = PageRequest::parse(Some("2"), Some("5000"), DEFAULT_PAGE_SIZE);
        assert_eq!(request.limit, MAX_PAGE_SIZE);
        assert_eq!(request.offset(), MAX_PAGE_SIZE);
    }

    #[test]
    fn offset_does_not_overflow() {
        let request = PageRequest::parse(Some(&i64::MAX.to_string()), Some("100"), 5);
        assert_eq!(request.offset(), i64::MAX);
    }

    #[test]
    fn pages_is_ceiling_of_total_over_limit() {
        for (total, limit, pages) in [(0, 5, 0), (1, 5, 1), (5, 5, 1), (6, 5, 2), (11, 4, 3)] {
            let meta = PageMeta::new(PageRequest { page: 1, limit }, total);
            assert_eq!(meta.pages, pages, "total={total} limit={limit}");
        }
    }

    #[test]
    fn empty_message_distinguishes_out_of_range() {
        let none: Page<()> = Page::new(vec![], PageRequest { page: 1, limit: 5 }, 0);
        assert_eq!(none.empty_message("nothing here"), "nothing here");

        let past_end: Page<()> = Page::new(vec![], PageRequest { page: 4, limit: 5 }, 7);
        assert_eq!(
            past_end.empty_message("nothing here"),
            "Page 4 is out of range, there are 2 pages"
        );
    }
}
