//! Viewport geometry and the scroll-position preserver.

/// Scroll geometry reported by the host, in pixels.
///
/// The all-zero default describes an empty container, which counts as being
/// at both edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportMetrics {
    /// Offset of the visible area from the top of the content.
    pub scroll_top: i32,
    /// Total content height.
    pub scroll_height: i32,
    /// Height of the visible area.
    pub client_height: i32,
}

impl ViewportMetrics {
    /// Builds metrics from raw host values.
    #[must_use]
    pub const fn new(scroll_top: i32, scroll_height: i32, client_height: i32) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Distance between the bottom of the visible area and the end of the
    /// content. Saturates on out-of-range host values.
    #[must_use]
    pub const fn distance_to_bottom(&self) -> i32 {
        self.scroll_height
            .saturating_sub(self.scroll_top)
            .saturating_sub(self.client_height)
    }

    /// Whether the viewer is within `threshold` pixels of the end.
    #[must_use]
    pub const fn near_bottom(&self, threshold: i32) -> bool {
        self.distance_to_bottom() <= threshold
    }

    /// Whether the viewer is within `threshold` pixels of the start.
    #[must_use]
    pub const fn near_top(&self, threshold: i32) -> bool {
        self.scroll_top <= threshold
    }
}

/// Geometry captured before a backward page is prepended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAnchor {
    /// Content height before the prepend.
    pub prev_scroll_height: i32,
    /// Scroll offset before the prepend.
    pub prev_scroll_top: i32,
}

impl ScrollAnchor {
    /// Records the geometry ahead of a backward fetch.
    #[must_use]
    pub const fn capture(metrics: &ViewportMetrics) -> Self {
        Self {
            prev_scroll_height: metrics.scroll_height,
            prev_scroll_top: metrics.scroll_top,
        }
    }

    /// Scroll offset that keeps the previously visible item in place once the
    /// container has grown to `new_scroll_height`.
    #[must_use]
    pub const fn restore(&self, new_scroll_height: i32) -> i32 {
        new_scroll_height
            .saturating_sub(self.prev_scroll_height)
            .saturating_add(self.prev_scroll_top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1000, 50, 1400 => 450 ; "prepend grows container")]
    #[test_case(1000, 0, 1000 => 0 ; "empty page keeps offset")]
    #[test_case(800, 12, 1600 => 812 ; "doubled height")]
    fn restore_offsets_by_growth(prev_height: i32, prev_top: i32, new_height: i32) -> i32 {
        let anchor = ScrollAnchor::capture(&ViewportMetrics::new(prev_top, prev_height, 300));
        anchor.restore(new_height)
    }

    #[test_case(ViewportMetrics::new(680, 1000, 300), 20 => true ; "exactly at bottom")]
    #[test_case(ViewportMetrics::new(690, 1000, 300), 20 => true ; "overscrolled")]
    #[test_case(ViewportMetrics::new(660, 1000, 300), 20 => true ; "at threshold")]
    #[test_case(ViewportMetrics::new(600, 1000, 300), 20 => false ; "reading older content")]
    #[test_case(ViewportMetrics::default(), 20 => true ; "empty container")]
    fn near_bottom(metrics: ViewportMetrics, threshold: i32) -> bool {
        metrics.near_bottom(threshold)
    }

    #[test_case(ViewportMetrics::new(i32::MIN, i32::MAX, 0) => i32::MAX ; "huge content")]
    #[test_case(ViewportMetrics::new(i32::MAX, i32::MIN, i32::MAX) => i32::MIN ; "negative content")]
    fn distance_saturates(metrics: ViewportMetrics) -> i32 {
        metrics.distance_to_bottom()
    }

    #[test_case(i32::MIN, 0, i32::MAX => i32::MAX ; "growth past range")]
    #[test_case(i32::MAX, i32::MIN, 0 => i32::MIN ; "shrink past range")]
    fn restore_saturates(prev_height: i32, prev_top: i32, new_height: i32) -> i32 {
        let anchor = ScrollAnchor {
            prev_scroll_height: prev_height,
            prev_scroll_top: prev_top,
        };
        anchor.restore(new_height)
    }

    #[test_case(0 => true ; "at top")]
    #[test_case(20 => true ; "at threshold")]
    #[test_case(21 => false ; "past threshold")]
    fn near_top(scroll_top: i32) -> bool {
        ViewportMetrics::new(scroll_top, 2000, 300).near_top(20)
    }
}
