use std::ops::Range;

use serde::Serialize;

use crate::config::{DEFAULT_PAGE_SIZE, DEFAULT_PAGE_WINDOW};

/// One page of a sequence of `len` items plus the page controls to show for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// 1-based current page; 0 when there are no pages.
    pub page: usize,
    pub total_pages: usize,
    /// Item positions shown on this page.
    pub rows: Range<usize>,
    /// Page numbers of the sliding control window.
    pub controls: Vec<usize>,
    pub first_enabled: bool,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub last_enabled: bool,
}

impl PageWindow {
    pub fn is_empty(&self) -> bool {
        self.total_pages == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    window: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            window: DEFAULT_PAGE_WINDOW,
        }
    }
}

impl Paginator {
    /// Both sizes are raised to at least 1.
    pub fn new(page_size: usize, window: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            window: window.max(1),
        }
    }

    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size)
    }

    /// Clamps `requested` into `[1, total_pages]` and slices the page.
    pub fn paginate(&self, len: usize, requested: usize) -> PageWindow {
        let total_pages = self.total_pages(len);
        if total_pages == 0 {
            return PageWindow {
                page: 0,
                total_pages,
                rows: 0..0,
                controls: Vec::new(),
                first_enabled: false,
                prev_enabled: false,
                next_enabled: false,
                last_enabled: false,
            };
        }
        let page = requested.clamp(1, total_pages);
        let start = (page - 1) * self.page_size;
        let end = (page * self.page_size).min(len);
        PageWindow {
            page,
            total_pages,
            rows: start..end,
            controls: self.controls(page, total_pages),
            first_enabled: page > 1,
            prev_enabled: page > 1,
            next_enabled: page < total_pages,
            last_enabled: page < total_pages,
        }
    }

    /// Sliding window of `min(window, total_pages)` page numbers around `page`,
    /// shifted left when it would run past the last page.
    pub fn controls(&self, page: usize, total_pages: usize) -> Vec<usize> {
        if total_pages == 0 {
            return Vec::new();
        }
        let count = self.window.min(total_pages);
        let page = page.clamp(1, total_pages);
        let start = page.saturating_sub(self.window / 2).max(1);
        let end = (start + count - 1).min(total_pages);
        let start = end + 1 - count;
        (start..=end).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence_has_no_pages() {
        let window = Paginator::default().paginate(0, 3);
        assert!(window.is_empty());
        assert_eq!(window.rows, 0..0);
        assert!(window.controls.is_empty());
        assert!(!window.first_enabled && !window.last_enabled);
    }

    #[test]
    fn requested_page_is_clamped() {
        let paginator = Paginator::default();
        assert_eq!(paginator.paginate(25, 0).page, 1);
        let last = paginator.paginate(25, 99);
        assert_eq!(last.page, 3);
        assert_eq!(last.rows, 20..25);
        assert!(last.prev_enabled);
        assert!(!last.next_enabled);
    }

    #[test]
    fn controls_center_on_current_page() {
        let paginator = Paginator::default();
        assert_eq!(paginator.controls(1, 10), [1, 2, 3, 4, 5]);
        assert_eq!(paginator.controls(6, 10), [4, 5, 6, 7, 8]);
        assert_eq!(paginator.controls(10, 10), [6, 7, 8, 9, 10]);
    }

    #[test]
    fn short_sequences_show_every_page() {
        let paginator = Paginator::default();
        assert_eq!(paginator.controls(4, 4), [1, 2, 3, 4]);
        assert_eq!(paginator.controls(1, 1), [1]);
        let single = paginator.paginate(7, 1);
        assert_eq!(single.total_pages, 1);
        assert!(!single.first_enabled && !single.next_enabled);
    }
}
