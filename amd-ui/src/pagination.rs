//! Pagination math for list endpoints
//!
//! Reproduces the page arithmetic of the legacy admin interface exactly: an
//! empty result set still reports one page, and the displayed page-number
//! window is a sliding five-page band centered on the current page.

/// Default rows per page for list endpoints
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Total page count for a result set.
///
/// `1` when everything fits on one page (including the empty set), otherwise
/// `ceil(total_count / limit)` via integer arithmetic.
pub fn total_pages(total_count: i64, limit: i64) -> i64 {
    if total_count <= limit {
        1
    } else {
        (total_count + limit - 1) / limit
    }
}

/// SQL OFFSET for a 1-indexed page
pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1) * limit
}

/// Page-number window to display: `[max(1, page-2), min(total_pages, page+2)]`
pub fn display_window(page: i64, total_pages: i64) -> (i64, i64) {
    ((page - 2).max(1), (page + 2).min(total_pages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_empty() {
        assert_eq!(total_pages(0, 10), 1);
    }

    #[test]
    fn test_total_pages_exact_fit() {
        assert_eq!(total_pages(10, 10), 1);
    }

    #[test]
    fn test_total_pages_partial_last_page() {
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(21, 10), 3);
    }

    #[test]
    fn test_offset() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        // Page numbers below 1 clamp to the first page
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(-5, 10), 0);
    }

    #[test]
    fn test_window_single_page() {
        assert_eq!(display_window(1, 1), (1, 1));
    }

    #[test]
    fn test_window_centered() {
        assert_eq!(display_window(5, 20), (3, 7));
    }

    #[test]
    fn test_window_clipped_at_edges() {
        assert_eq!(display_window(1, 20), (1, 3));
        assert_eq!(display_window(20, 20), (18, 20));
        assert_eq!(display_window(2, 3), (1, 3));
    }
}
