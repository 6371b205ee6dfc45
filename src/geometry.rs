//! Viewport geometry calculations for fitting comic pages to containers.

/// Intrinsic page width assumed until real image metadata arrives.
pub const FALLBACK_IMAGE_WIDTH: f64 = 1075.0;
/// Intrinsic page height assumed until real image metadata arrives.
pub const FALLBACK_IMAGE_HEIGHT: f64 = 1518.0;

/// Number of pages shown side by side in one viewport spread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpreadCount {
    /// One page per viewport
    #[default]
    One,
    /// Two pages per viewport, read right-to-left
    Two,
}

impl SpreadCount {
    /// Pages per viewport as a count.
    #[inline]
    pub fn pages(&self) -> usize {
        match self {
            SpreadCount::One => 1,
            SpreadCount::Two => 2,
        }
    }
}

/// Derived per-viewport sizing for the page strip.
///
/// Recomputed on every container resize and whenever the intrinsic
/// page aspect ratio is established; never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportGeometry {
    /// Pages shown per viewport spread
    pub spread: SpreadCount,
    /// Render width of a single page in pixels
    pub page_width: f64,
    /// Inline padding centering the spread inside the container
    pub padding_inline: f64,
}

impl ViewportGeometry {
    /// Total width of one spread (one or two pages, edge to edge).
    #[inline]
    pub fn spread_width(&self) -> f64 {
        self.page_width * self.spread.pages() as f64
    }

    /// Total strip content width for `page_count` pages including
    /// the inline padding on both ends.
    pub fn content_width(&self, page_count: usize) -> f64 {
        self.page_width * page_count as f64 + self.padding_inline * 2.0
    }
}

/// Page sizing configuration: the intrinsic page aspect ratio.
///
/// Provides methods to derive [`ViewportGeometry`] from container
/// measurements while keeping pages scaled to fill viewport height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSizing {
    /// Intrinsic page aspect ratio (width / height)
    pub aspect_ratio: f64,
}

impl Default for PageSizing {
    fn default() -> Self {
        Self {
            aspect_ratio: FALLBACK_IMAGE_WIDTH / FALLBACK_IMAGE_HEIGHT,
        }
    }
}

impl PageSizing {
    /// Create a sizing with the fallback aspect ratio.
    ///
    /// Used for bootstrapping before any page image has loaded; real
    /// metadata supersedes it via [`PageSizing::from_dimensions`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sizing from intrinsic image dimensions.
    ///
    /// Returns `None` for zero or non-finite dimensions.
    pub fn from_dimensions(image_width: f64, image_height: f64) -> Option<Self> {
        if !image_width.is_finite() || !image_height.is_finite() {
            return None;
        }
        if image_width <= 0.0 || image_height <= 0.0 {
            return None;
        }
        Some(Self {
            aspect_ratio: image_width / image_height,
        })
    }

    /// Derive viewport geometry from container dimensions.
    ///
    /// Returns `None` when measurements are not yet available (zero or
    /// non-finite), so callers wait for the next resize observation
    /// instead of propagating degenerate geometry.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use comic_core_view::{PageSizing, SpreadCount};
    ///
    /// let sizing = PageSizing::new(); // fallback ratio 1075/1518
    ///
    /// // Wide container fits a two-page spread
    /// let geometry = sizing.compute_geometry(1200.0, 800.0).unwrap();
    /// assert_eq!(geometry.spread, SpreadCount::Two);
    ///
    /// // Tall container falls back to a single page
    /// let geometry = sizing.compute_geometry(600.0, 800.0).unwrap();
    /// assert_eq!(geometry.spread, SpreadCount::One);
    /// ```
    pub fn compute_geometry(
        &self,
        container_width: f64,
        container_height: f64,
    ) -> Option<ViewportGeometry> {
        if !container_width.is_finite() || !container_height.is_finite() {
            return None;
        }
        if container_width <= 0.0 || container_height <= 0.0 {
            return None;
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return None;
        }

        let container_ratio = container_width / container_height;

        // Two pages only when the viewport is wide enough to show both
        // without shrinking below single-page scale. The boundary itself
        // resolves to a two-page spread.
        let spread = if container_ratio < 2.0 * self.aspect_ratio {
            SpreadCount::One
        } else {
            SpreadCount::Two
        };

        // Pages always scale to fill container height, never cropped.
        let page_width = container_height * self.aspect_ratio;

        let block_width = page_width * spread.pages() as f64;
        let padding_inline = ((container_width - block_width) / 2.0).max(0.0);

        Some(ViewportGeometry {
            spread,
            page_width,
            padding_inline,
        })
    }

    /// Convenience: derive geometry with the fallback aspect ratio.
    pub fn calculate(container_width: f64, container_height: f64) -> Option<ViewportGeometry> {
        Self::default().compute_geometry(container_width, container_height)
    }

    /// Page render width for a given container height.
    #[inline]
    pub fn page_width_for_height(&self, container_height: f64) -> f64 {
        container_height * self.aspect_ratio
    }
}

/// Contract form of the geometry computation: explicit aspect ratio in,
/// geometry out.
pub fn compute_geometry(
    container_width: f64,
    container_height: f64,
    aspect_ratio: f64,
) -> Option<ViewportGeometry> {
    PageSizing { aspect_ratio }.compute_geometry(container_width, container_height)
}

/// Fit the outer viewer height to a window width.
///
/// Picks one or two pages per view from the window width, derives the
/// page height a full-width layout would need, and clamps the result
/// to `[min_height, max_height]`.
pub fn fit_viewer_height(
    window_width: f64,
    sizing: &PageSizing,
    min_height: f64,
    max_height: f64,
) -> f64 {
    if !(window_width.is_finite() && window_width > 0.0) {
        return max_height;
    }

    let min_page_width = (min_height * sizing.aspect_ratio).floor();
    let page_count = if window_width <= 2.0 * min_page_width {
        1.0
    } else {
        2.0
    };
    let candidate_page_width = window_width / page_count;
    let candidate_page_height = candidate_page_width / sizing.aspect_ratio;

    candidate_page_height.clamp(min_height, max_height)
}
