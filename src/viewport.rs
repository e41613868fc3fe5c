//! A row-based [`ViewportProvider`] for plain vertical lists.
//!
//! [`ListViewport`] models a list as stacked items of known height scrolled
//! by a pixel (or terminal row) offset.  Clones share one layout, so a host
//! can keep a handle for scrolling while the tracker owns another.

use std::cell::RefCell;
use std::rc::Rc;

use crate::exposure::{Rect, ViewportProvider};

#[derive(Debug, Clone, Default, PartialEq)]
struct Layout {
    heights: Vec<f32>,
    offset: f32,
    screen_height: f32,
}

impl Layout {
    fn top_of(&self, index: usize) -> f32 {
        self.heights.iter().take(index).sum()
    }

    fn content_height(&self) -> f32 {
        self.heights.iter().sum()
    }

    fn max_offset(&self) -> f32 {
        (self.content_height() - self.screen_height).max(0.0)
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.clamp(0.0, self.max_offset());
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListViewport {
    layout: Rc<RefCell<Layout>>,
}

impl ListViewport {
    pub fn new(screen_height: f32) -> Self {
        let viewport = Self::default();
        viewport.layout.borrow_mut().screen_height = screen_height.max(0.0);
        viewport
    }

    /// Replace the item heights, keeping the scroll offset where possible.
    pub fn set_heights(&self, heights: impl IntoIterator<Item = f32>) {
        let mut layout = self.layout.borrow_mut();
        layout.heights = heights.into_iter().map(|h| h.max(0.0)).collect();
        layout.clamp_offset();
    }

    /// `count` items of the same height.
    pub fn set_uniform(&self, count: usize, height: f32) {
        self.set_heights(std::iter::repeat(height).take(count));
    }

    pub fn set_screen_height(&self, screen_height: f32) {
        let mut layout = self.layout.borrow_mut();
        layout.screen_height = screen_height.max(0.0);
        layout.clamp_offset();
    }

    pub fn offset(&self) -> f32 {
        self.layout.borrow().offset
    }

    /// Scroll by `delta` (positive is down).  Returns whether the offset
    /// actually moved.
    pub fn scroll_by(&self, delta: f32) -> bool {
        let mut layout = self.layout.borrow_mut();
        let before = layout.offset;
        layout.offset += delta;
        layout.clamp_offset();
        layout.offset != before
    }

    /// Scroll the minimum amount that puts the whole item on screen (or its
    /// top, if it is taller than the screen).
    pub fn reveal(&self, index: usize) -> bool {
        let mut layout = self.layout.borrow_mut();
        let Some(&height) = layout.heights.get(index) else {
            return false;
        };
        let before = layout.offset;
        let top = layout.top_of(index);
        let bottom = top + height;
        if top < layout.offset {
            layout.offset = top;
        } else if bottom > layout.offset + layout.screen_height {
            layout.offset = (bottom - layout.screen_height).min(top);
        }
        layout.clamp_offset();
        layout.offset != before
    }

    /// On-screen rectangles of every visible item, in index order.
    pub fn visible_rects(&self) -> Vec<(usize, Rect)> {
        let Some((first, last)) = self.visible_index_range() else {
            return Vec::new();
        };
        (first..=last)
            .filter_map(|index| self.visible_rect(index).map(|rect| (index, rect)))
            .collect()
    }
}

impl ViewportProvider for ListViewport {
    fn visible_index_range(&self) -> Option<(usize, usize)> {
        let layout = self.layout.borrow();
        let view_top = layout.offset;
        let view_bottom = layout.offset + layout.screen_height;

        let mut first = None;
        let mut last = None;
        let mut top = 0.0;
        for (index, height) in layout.heights.iter().enumerate() {
            let bottom = top + height;
            if bottom > view_top && top < view_bottom {
                first.get_or_insert(index);
                last = Some(index);
            } else if top >= view_bottom {
                break;
            }
            top = bottom;
        }
        Some((first?, last?))
    }

    fn visible_rect(&self, index: usize) -> Option<Rect> {
        let layout = self.layout.borrow();
        let height = *layout.heights.get(index)?;
        let top = layout.top_of(index) - layout.offset;
        let bottom = top + height;
        if bottom <= 0.0 || top >= layout.screen_height {
            return None;
        }
        Some(Rect::new(top, bottom))
    }

    fn total_height(&self, index: usize) -> f32 {
        self.layout.borrow().heights.get(index).copied().unwrap_or(0.0)
    }

    fn screen_height(&self) -> f32 {
        self.layout.borrow().screen_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::exposure_ratio;

    fn ratio(viewport: &ListViewport, index: usize) -> f32 {
        exposure_ratio(
            viewport.visible_rect(index),
            viewport.total_height(index),
            viewport.screen_height(),
        )
    }

    #[test]
    fn empty_list_has_no_visible_range() {
        let viewport = ListViewport::new(10.0);
        assert_eq!(viewport.visible_index_range(), None);
        assert!(viewport.visible_rects().is_empty());
    }

    #[test]
    fn range_and_ratios_follow_the_offset() {
        let viewport = ListViewport::new(10.0);
        viewport.set_uniform(10, 4.0);

        assert_eq!(viewport.visible_index_range(), Some((0, 2)));
        assert_eq!(ratio(&viewport, 0), 1.0);
        assert_eq!(ratio(&viewport, 2), 0.5);

        assert!(viewport.scroll_by(3.0));
        assert_eq!(viewport.visible_index_range(), Some((0, 3)));
        assert_eq!(ratio(&viewport, 0), 0.25);
        assert_eq!(ratio(&viewport, 3), 0.25);
    }

    #[test]
    fn offset_is_clamped_to_content() {
        let viewport = ListViewport::new(10.0);
        viewport.set_uniform(3, 4.0);

        viewport.scroll_by(100.0);
        assert_eq!(viewport.offset(), 2.0);
        assert!(!viewport.scroll_by(1.0), "already at the bottom");

        viewport.scroll_by(-100.0);
        assert_eq!(viewport.offset(), 0.0);
    }

    #[test]
    fn reveal_scrolls_the_minimum_amount() {
        let viewport = ListViewport::new(10.0);
        viewport.set_uniform(10, 4.0);

        assert!(viewport.reveal(3));
        assert_eq!(viewport.offset(), 6.0, "bottom of item 3 at the screen bottom");
        assert!(!viewport.reveal(2), "already fully visible");

        assert!(viewport.reveal(0));
        assert_eq!(viewport.offset(), 0.0);
        assert!(!viewport.reveal(42));
    }

    #[test]
    fn clones_share_one_layout() {
        let host = ListViewport::new(10.0);
        let tracked = host.clone();
        host.set_uniform(10, 4.0);
        host.scroll_by(8.0);
        assert_eq!(tracked.visible_index_range(), Some((2, 4)));
    }
}
