//! Page state machine for one open popup.
//!
//! The popup UI never mutates the DOM based on ad hoc flags; it asks the
//! pager for a [`PagerView`] and renders that. Transitions happen through
//! `begin` / `finish` / `fail`, with `begin` doubling as the single-flight
//! guard: while a fetch is outstanding every further request is a no-op.

/// Inclusive row-offset window for one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub from: u64,
    pub to: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PagerPhase {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// `max(1, ceil(count / page_size))` — an empty result set still has one
/// (empty) page so the indicator reads "Page 1 / 1".
pub fn total_pages(count: u64, page_size: usize) -> usize {
    let size = page_size.max(1) as u64;
    (count.div_ceil(size)).max(1) as usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pager {
    page_size: usize,
    page: usize,
    total_count: u64,
    /// 0 until the first successful load.
    pages: usize,
    phase: PagerPhase,
}

/// Pure display projection of a pager: what the popup shows, with no DOM
/// state of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PagerView {
    pub indicator: String,
    pub status: String,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub error: Option<String>,
}

const INDICATOR_PLACEHOLDER: &str = "Page —";

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 0,
            total_count: 0,
            pages: 0,
            phase: PagerPhase::Idle,
        }
    }

    pub fn phase(&self) -> &PagerPhase {
        &self.phase
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Request page `page`. Returns the offset window to fetch, or `None`
    /// when a fetch is already in flight or the page is out of bounds.
    pub fn begin(&mut self, page: usize) -> Option<PageWindow> {
        if self.phase == PagerPhase::Loading {
            return None;
        }
        // Bounds only exist once a load has succeeded.
        if self.pages > 0 && page >= self.pages {
            return None;
        }
        self.page = page;
        self.phase = PagerPhase::Loading;
        let from = page as u64 * self.page_size as u64;
        Some(PageWindow {
            from,
            to: from + self.page_size as u64 - 1,
        })
    }

    pub fn finish(&mut self, total_count: u64) {
        if self.phase != PagerPhase::Loading {
            return;
        }
        self.total_count = total_count;
        self.pages = total_pages(total_count, self.page_size);
        self.phase = PagerPhase::Loaded;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        if self.phase != PagerPhase::Loading {
            return;
        }
        self.phase = PagerPhase::Failed(message.into());
    }

    /// Target of a "prev" click, if one is allowed right now.
    pub fn prev_page(&self) -> Option<usize> {
        match self.phase {
            PagerPhase::Loaded if self.page > 0 => Some(self.page - 1),
            _ => None,
        }
    }

    /// Target of a "next" click, if one is allowed right now.
    pub fn next_page(&self) -> Option<usize> {
        match self.phase {
            PagerPhase::Loaded if self.page + 1 < self.pages => Some(self.page + 1),
            _ => None,
        }
    }

    pub fn view(&self) -> PagerView {
        match &self.phase {
            PagerPhase::Idle => PagerView {
                indicator: INDICATOR_PLACEHOLDER.to_string(),
                status: "Loading…".to_string(),
                prev_enabled: false,
                next_enabled: false,
                error: None,
            },
            PagerPhase::Loading => PagerView {
                indicator: if self.pages == 0 {
                    INDICATOR_PLACEHOLDER.to_string()
                } else {
                    format!("Page {} / {}", self.page + 1, self.pages)
                },
                status: "Loading…".to_string(),
                prev_enabled: false,
                next_enabled: false,
                error: None,
            },
            PagerPhase::Loaded => PagerView {
                indicator: format!("Page {} / {}", self.page + 1, self.pages),
                status: format!("{} linked item(s)", self.total_count),
                prev_enabled: self.page > 0,
                next_enabled: self.page + 1 < self.pages,
                error: None,
            },
            PagerPhase::Failed(message) => PagerView {
                indicator: INDICATOR_PLACEHOLDER.to_string(),
                status: "Load failed".to_string(),
                prev_enabled: false,
                next_enabled: false,
                error: Some(message.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 8), 1);
        assert_eq!(total_pages(1, 8), 1);
        assert_eq!(total_pages(8, 8), 1);
        assert_eq!(total_pages(9, 8), 2);
        assert_eq!(total_pages(10, 8), 2);
        assert_eq!(total_pages(16, 8), 2);
        assert_eq!(total_pages(17, 8), 3);
        assert_eq!(total_pages(100, 1), 100);
    }

    #[test]
    fn test_idle_view_disables_navigation() {
        let pager = Pager::new(8);
        let view = pager.view();
        assert_eq!(view.indicator, "Page —");
        assert!(!view.prev_enabled);
        assert!(!view.next_enabled);
        assert!(view.error.is_none());
    }

    #[test]
    fn test_first_window() {
        let mut pager = Pager::new(8);
        assert_eq!(pager.begin(0), Some(PageWindow { from: 0, to: 7 }));
    }

    #[test]
    fn test_single_flight() {
        let mut pager = Pager::new(8);
        assert!(pager.begin(0).is_some());
        let before = pager.clone();
        // Second request while loading: no request window, no state change.
        assert_eq!(pager.begin(1), None);
        assert_eq!(pager, before);
    }

    #[test]
    fn test_ten_rows_page_size_eight() {
        let mut pager = Pager::new(8);
        pager.begin(0).unwrap();
        pager.finish(10);

        let view = pager.view();
        assert_eq!(view.indicator, "Page 1 / 2");
        assert_eq!(view.status, "10 linked item(s)");
        assert!(!view.prev_enabled);
        assert!(view.next_enabled);

        assert_eq!(pager.prev_page(), None);
        assert_eq!(pager.next_page(), Some(1));
        assert_eq!(pager.begin(1), Some(PageWindow { from: 8, to: 15 }));
        pager.finish(10);

        let view = pager.view();
        assert_eq!(view.indicator, "Page 2 / 2");
        assert!(view.prev_enabled);
        assert!(!view.next_enabled);
        assert_eq!(pager.next_page(), None);
    }

    #[test]
    fn test_empty_result() {
        let mut pager = Pager::new(8);
        pager.begin(0).unwrap();
        pager.finish(0);

        let view = pager.view();
        assert_eq!(view.indicator, "Page 1 / 1");
        assert_eq!(view.status, "0 linked item(s)");
        assert!(!view.prev_enabled);
        assert!(!view.next_enabled);
    }

    #[test]
    fn test_failure_resets_indicator_and_blocks() {
        let mut pager = Pager::new(8);
        pager.begin(0).unwrap();
        pager.fail("network down");

        let view = pager.view();
        assert_eq!(view.error.as_deref(), Some("network down"));
        assert_eq!(view.indicator, "Page —");
        assert_eq!(view.status, "Load failed");
        assert!(!view.prev_enabled);
        assert!(!view.next_enabled);
        assert_eq!(pager.prev_page(), None);
        assert_eq!(pager.next_page(), None);
    }

    #[test]
    fn test_out_of_bounds_is_noop() {
        let mut pager = Pager::new(8);
        pager.begin(0).unwrap();
        pager.finish(10); // 2 pages
        let before = pager.clone();
        assert_eq!(pager.begin(2), None);
        assert_eq!(pager, before);
    }

    #[test]
    fn test_reload_same_page_is_idempotent() {
        let mut pager = Pager::new(8);
        let w1 = pager.begin(0).unwrap();
        pager.finish(10);
        let v1 = pager.view();

        let w2 = pager.begin(0).unwrap();
        pager.finish(10);
        let v2 = pager.view();

        assert_eq!(w1, w2);
        assert_eq!(v1, v2);
    }

    #[test]
    fn test_finish_outside_loading_ignored() {
        let mut pager = Pager::new(8);
        pager.finish(10);
        assert_eq!(*pager.phase(), PagerPhase::Idle);
        pager.fail("boom");
        assert_eq!(*pager.phase(), PagerPhase::Idle);
    }

    #[test]
    fn test_loading_keeps_known_page_count() {
        let mut pager = Pager::new(8);
        pager.begin(0).unwrap();
        pager.finish(10);
        pager.begin(1).unwrap();
        // Navigating to page 2 of 2: indicator stays concrete during the fetch.
        assert_eq!(pager.view().indicator, "Page 2 / 2");
        assert_eq!(pager.view().status, "Loading…");
    }
}
