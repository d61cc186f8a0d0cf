//! Windowed List
//!
//! Computes which rows of a long, fixed-row-height list have to be materialized
//! for the current scroll position, plus the offsets that keep the scroll
//! container at its full height while only a slice is rendered.
//!
//! ```text
//!  0 ┌──────────────┐ ─┐
//!    │              │  │ leading_offset = start_index * item_extent
//!    ├──────────────┤ ─┘
//!    │ start_index  │ ─┐
//!    │     ...      │  │ rendered slice [start_index, end_index)
//!    │ end_index-1  │ ─┘
//!    ├──────────────┤
//!    │              │    trailing_offset
//!    └──────────────┘    total_extent = item_count * item_extent
//! ```
//!
//! Every function here is pure and total: out-of-range numbers are clamped,
//! never reported as errors.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ITEM_EXTENT, DEFAULT_OVERSCAN};

/// Scroll metrics reported by the render surface on every scroll/resize
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportWindow {
    /// Distance scrolled from the top, in the same unit as `item_extent`
    pub scroll_offset: f64,
    /// Size of one row
    pub item_extent: f64,
    /// Size of the visible area
    pub container_extent: f64,
}

impl ViewportWindow {
    /// Create a new viewport description
    pub fn new(scroll_offset: f64, item_extent: f64, container_extent: f64) -> Self {
        Self {
            scroll_offset,
            item_extent,
            container_extent,
        }
    }

    /// Clamp negative or NaN offsets and extents to zero
    ///
    /// `f64::max` ignores NaN, so `NaN.max(0.0)` is `0.0`.
    pub fn sanitized(self) -> Self {
        Self {
            scroll_offset: self.scroll_offset.max(0.0),
            item_extent: self.item_extent.max(0.0),
            container_extent: self.container_extent.max(0.0),
        }
    }

    /// The row extent, if it can be divided by
    fn usable_item_extent(&self) -> Option<f64> {
        (self.item_extent.is_finite() && self.item_extent > 0.0).then_some(self.item_extent)
    }
}

/// The slice of rows to render and where to place it
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderWindow {
    /// First rendered row
    pub start_index: usize,
    /// One past the last rendered row
    pub end_index: usize,
    /// Height of the whole list (`item_count * item_extent`)
    pub total_extent: f64,
    /// Space above the rendered slice (`start_index * item_extent`)
    pub leading_offset: f64,
    /// Row extent the window was computed with
    pub item_extent: f64,
}

impl RenderWindow {
    /// A window with nothing to render
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rendered rows as an index range
    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    /// Number of rendered rows
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    /// Check if nothing is rendered
    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }

    /// Check if a row is part of the rendered slice
    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }

    /// Space below the rendered slice
    pub fn trailing_offset(&self) -> f64 {
        (self.total_extent - self.leading_offset - self.len() as f64 * self.item_extent).max(0.0)
    }

    /// Whether the slice ends within `threshold` rows of the loaded rows
    ///
    /// This is the infinite-scroll trigger: when it turns true the caller asks
    /// the page loader for the next page. An empty list is always "near the end".
    pub fn is_near_end(&self, item_count: usize, threshold: usize) -> bool {
        self.end_index.saturating_add(threshold) >= item_count
    }
}

/// Alignment for scroll-to-row requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    /// Row at the top of the viewport
    #[default]
    Start,
    /// Row centered in the viewport
    Center,
    /// Row at the bottom of the viewport
    End,
}

/// Compute the render window for `item_count` rows
///
/// `start = floor(scroll / extent)` clamped to `item_count`,
/// `end = min(start + ceil(container / extent) + overscan, item_count)`.
/// Overscan is trailing only, so the slice holds at most `overscan` rows past
/// the last visible one and none before the first.
pub fn compute_window(item_count: usize, viewport: ViewportWindow, overscan: usize) -> RenderWindow {
    let viewport = viewport.sanitized();
    let Some(item_extent) = viewport.usable_item_extent() else {
        return RenderWindow::empty();
    };

    if item_count == 0 {
        return RenderWindow {
            item_extent,
            ..RenderWindow::default()
        };
    }

    // Float to int casts saturate, so an infinite offset lands on usize::MAX.
    let start_index = ((viewport.scroll_offset / item_extent).floor() as usize).min(item_count);
    let visible_count = (viewport.container_extent / item_extent).ceil() as usize;
    let end_index = start_index
        .saturating_add(visible_count)
        .saturating_add(overscan)
        .min(item_count);

    RenderWindow {
        start_index,
        end_index,
        total_extent: item_count as f64 * item_extent,
        leading_offset: start_index as f64 * item_extent,
        item_extent,
    }
}

/// Fixed-row-height list windowing settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowedList {
    /// Size of one row
    pub item_extent: f64,
    /// Extra rows rendered past the visible range
    pub overscan: usize,
}

impl Default for WindowedList {
    fn default() -> Self {
        Self {
            item_extent: DEFAULT_ITEM_EXTENT,
            overscan: DEFAULT_OVERSCAN,
        }
    }
}

impl WindowedList {
    /// Create a new windowing helper
    pub fn new(item_extent: f64, overscan: usize) -> Self {
        Self {
            item_extent,
            overscan,
        }
    }

    /// Compute the render window for the current scroll metrics
    pub fn window(&self, item_count: usize, scroll_offset: f64, container_extent: f64) -> RenderWindow {
        compute_window(
            item_count,
            ViewportWindow::new(scroll_offset, self.item_extent, container_extent),
            self.overscan,
        )
    }

    /// Scroll offset that brings `index` into view with the given alignment
    ///
    /// The index is clamped to the last row and the result to the scrollable range.
    pub fn offset_for_index(
        &self,
        index: usize,
        align: ScrollAlign,
        container_extent: f64,
        item_count: usize,
    ) -> f64 {
        let viewport =
            ViewportWindow::new(0.0, self.item_extent, container_extent).sanitized();
        let Some(item_extent) = viewport.usable_item_extent() else {
            return 0.0;
        };
        if item_count == 0 {
            return 0.0;
        }

        let index = index.min(item_count - 1);
        let row_start = index as f64 * item_extent;
        let container = viewport.container_extent;
        let target = match align {
            ScrollAlign::Start => row_start,
            ScrollAlign::Center => row_start + item_extent / 2.0 - container / 2.0,
            ScrollAlign::End => row_start + item_extent - container,
        };

        let max_offset = (item_count as f64 * item_extent - container).max(0.0);
        target.clamp(0.0, max_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_scenario() {
        let window = compute_window(1000, ViewportWindow::new(4000.0, 40.0, 800.0), 1);
        assert_eq!(window.start_index, 100);
        assert_eq!(window.end_index, 121);
        assert_eq!(window.len(), 21);
        assert_eq!(window.total_extent, 40000.0);
        assert_eq!(window.leading_offset, 4000.0);
        assert_eq!(window.trailing_offset(), 40000.0 - 4000.0 - 21.0 * 40.0);
    }

    #[test]
    fn test_empty_list() {
        let window = compute_window(0, ViewportWindow::new(500.0, 40.0, 800.0), 1);
        assert_eq!(window.start_index, 0);
        assert_eq!(window.end_index, 0);
        assert_eq!(window.total_extent, 0.0);
        assert!(window.is_empty());
    }

    #[test]
    fn test_scroll_past_end_clamps() {
        let window = compute_window(10, ViewportWindow::new(1.0e9, 40.0, 800.0), 1);
        assert_eq!(window.start_index, 10);
        assert_eq!(window.end_index, 10);
        assert_eq!(window.leading_offset, 400.0);

        let window = compute_window(10, ViewportWindow::new(f64::INFINITY, 40.0, 800.0), 1);
        assert_eq!(window.start_index, 10);
    }

    #[test]
    fn test_short_list_fits_viewport() {
        let window = compute_window(5, ViewportWindow::new(0.0, 40.0, 800.0), 1);
        assert_eq!(window.range(), 0..5);
    }

    #[test]
    fn test_invalid_numbers_are_clamped() {
        let window = compute_window(100, ViewportWindow::new(-50.0, 40.0, 200.0), 1);
        assert_eq!(window.start_index, 0);
        assert_eq!(window.end_index, 6);

        let window = compute_window(100, ViewportWindow::new(f64::NAN, 40.0, f64::NAN), 0);
        assert_eq!(window.range(), 0..0);

        for extent in [0.0, -4.0, f64::NAN, f64::INFINITY] {
            let window = compute_window(100, ViewportWindow::new(10.0, extent, 200.0), 1);
            assert_eq!(window, RenderWindow::empty());
        }
    }

    #[test]
    fn test_near_end_trigger() {
        let list = WindowedList::new(40.0, 1);
        let window = list.window(60, 1600.0, 400.0);
        assert_eq!(window.range(), 40..51);
        assert!(!window.is_near_end(60, 5));
        assert!(window.is_near_end(60, 10));
        assert!(RenderWindow::empty().is_near_end(0, 0));
    }

    #[test]
    fn test_offset_for_index() {
        let list = WindowedList::new(40.0, 1);
        assert_eq!(list.offset_for_index(10, ScrollAlign::Start, 400.0, 100), 400.0);
        assert_eq!(list.offset_for_index(10, ScrollAlign::End, 400.0, 100), 40.0);
        assert_eq!(list.offset_for_index(10, ScrollAlign::Center, 400.0, 100), 220.0);
        assert_eq!(list.offset_for_index(0, ScrollAlign::End, 400.0, 100), 0.0);
        // Clamped to the last scrollable position
        assert_eq!(list.offset_for_index(500, ScrollAlign::Start, 400.0, 100), 3600.0);
        assert_eq!(list.offset_for_index(3, ScrollAlign::Start, 400.0, 0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_start_index_is_monotonic(
            count in 0usize..5000,
            extent in 1u32..200,
            container in 0u32..2000,
            a in 0u32..400_000,
            b in 0u32..400_000,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let first = compute_window(count, ViewportWindow::new(lo.into(), extent.into(), container.into()), 1);
            let second = compute_window(count, ViewportWindow::new(hi.into(), extent.into(), container.into()), 1);
            prop_assert!(first.start_index <= second.start_index);
        }

        #[test]
        fn prop_window_covers_visible_rows(
            count in 0usize..2000,
            extent in 1u64..200,
            container in 0u64..2000,
            scroll in 0u64..200_000,
        ) {
            let window = compute_window(
                count,
                ViewportWindow::new(scroll as f64, extent as f64, container as f64),
                1,
            );
            for i in 0..count as u64 {
                let top = i * extent;
                let bottom = top + extent;
                if top < scroll + container && bottom > scroll {
                    prop_assert!(window.contains(i as usize), "row {} not rendered in {:?}", i, window);
                }
            }
        }

        #[test]
        fn prop_window_stays_in_bounds(
            count in 0usize..10_000,
            extent in 0.01f64..500.0,
            container in -100.0f64..5000.0,
            scroll in -1000.0f64..1.0e7,
            overscan in 0usize..4,
        ) {
            let window = compute_window(count, ViewportWindow::new(scroll, extent, container), overscan);
            prop_assert!(window.start_index <= window.end_index);
            prop_assert!(window.end_index <= count);
            prop_assert!(window.leading_offset <= window.total_extent);
        }
    }
}
