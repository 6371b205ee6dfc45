//! Page strip layout and snap-target selection.
//!
//! The strip is the horizontally scrollable row of page tiles, laid out
//! right-to-left: page 1 is the rightmost tile. Layout and snapping are
//! pure functions over measured rectangles, so they are unit-testable
//! without any host environment.

use crate::{SpreadCount, ViewportGeometry};

/// Horizontal extent of one tile (or the scroll viewport).
///
/// Only the horizontal axis participates in snapping; vertical extents
/// are fixed by the viewer height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileRect {
    pub left: f64,
    pub right: f64,
}

impl TileRect {
    /// Create a rect from its left edge and width.
    pub fn from_left_width(left: f64, width: f64) -> Self {
        Self {
            left,
            right: left + width,
        }
    }

    /// Horizontal center of the rect.
    #[inline]
    pub fn center(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    /// Width of the rect.
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// The rect shifted by `dx`.
    pub fn translated(&self, dx: f64) -> Self {
        Self {
            left: self.left + dx,
            right: self.right + dx,
        }
    }
}

/// Resolved strip layout: one rect per page tile in strip coordinates.
///
/// Strip coordinates run left to right from 0 to `content_width`; tiles
/// are indexed in reading order, so tile 0 (page 1) is the rightmost.
#[derive(Clone, Debug)]
pub struct StripLayout {
    /// Total scrollable content width including inline padding
    pub content_width: f64,
    tiles: Vec<TileRect>,
}

impl StripLayout {
    /// Tile rects in reading order.
    #[inline]
    pub fn tiles(&self) -> &[TileRect] {
        &self.tiles
    }

    /// Number of tiles in the strip.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Tile rects as seen through a viewport scrolled to `scroll_left`.
    ///
    /// `scroll_left` is the distance from the strip's left edge to the
    /// viewport's left edge; the returned rects are in viewport
    /// coordinates (viewport left edge at 0).
    pub fn tiles_in_viewport(&self, scroll_left: f64) -> Vec<TileRect> {
        self.tiles
            .iter()
            .map(|t| t.translated(-scroll_left))
            .collect()
    }

    /// Maximum scroll offset for a viewport of the given width.
    pub fn max_scroll(&self, viewport_width: f64) -> f64 {
        (self.content_width - viewport_width).max(0.0)
    }

    /// Initial scroll offset: right-to-left reading starts at the
    /// rightmost end of the strip.
    pub fn initial_scroll(&self, viewport_width: f64) -> f64 {
        self.max_scroll(viewport_width)
    }
}

/// Lay out `page_count` tiles right-to-left under the given geometry.
pub fn layout_strip(page_count: usize, geometry: &ViewportGeometry) -> StripLayout {
    let content_width = geometry.content_width(page_count);
    let mut tiles = Vec::with_capacity(page_count);

    for idx in 0..page_count {
        // Reading order index 0 is the rightmost tile.
        let right = content_width - geometry.padding_inline - idx as f64 * geometry.page_width;
        tiles.push(TileRect {
            left: right - geometry.page_width,
            right,
        });
    }

    StripLayout {
        content_width,
        tiles,
    }
}

/// Select the snap correction for the current scroll position.
///
/// Computes, for every tile, the signed horizontal distance from the
/// viewport's center to the tile's snap-area center and returns the
/// smallest-magnitude distance. Scrolling by the returned delta aligns
/// the nearest tile (or two-page spread) with the viewport.
///
/// When `spread` is [`SpreadCount::Two`], a margin of one page width is
/// added to the left of even tiles and to the right of odd tiles
/// (1-based reading order), which makes each adjacent even/odd pair
/// share one snap area so the pair settles as a unit.
///
/// All tiles are examined in two full passes: margins can let a later
/// area supersede an earlier exact match, and the repeated scan keeps
/// the winner stable in that case. Exact ties resolve to the first
/// tile encountered.
///
/// Returns `None` when the strip has no tiles.
pub fn snap_delta(
    tiles: &[TileRect],
    viewport: &TileRect,
    spread: SpreadCount,
    page_width: f64,
) -> Option<f64> {
    if tiles.is_empty() {
        return None;
    }

    let viewport_center = viewport.center();
    let mut best: Option<f64> = None;

    for _pass in 0..2 {
        for (idx, tile) in tiles.iter().enumerate() {
            let nth = idx + 1;

            let (margin_left, margin_right) = match spread {
                SpreadCount::Two => {
                    if nth % 2 == 0 {
                        (page_width, 0.0)
                    } else {
                        (0.0, page_width)
                    }
                }
                SpreadCount::One => (0.0, 0.0),
            };

            let area = TileRect {
                left: tile.left - margin_left,
                right: tile.right + margin_right,
            };

            let candidate = area.center() - viewport_center;

            match best {
                Some(current) if candidate.abs() >= current.abs() => {}
                _ => best = Some(candidate),
            }
        }
    }

    best
}

/// Snap correction for a strip layout at a given scroll offset.
///
/// Convenience wrapper that derives viewport-space rects from the strip
/// layout and runs [`snap_delta`]. Hosts measuring real DOM rects call
/// [`snap_delta`] directly.
pub fn snap_delta_for_scroll(
    layout: &StripLayout,
    scroll_left: f64,
    viewport_width: f64,
    geometry: &ViewportGeometry,
) -> Option<f64> {
    let tiles = layout.tiles_in_viewport(scroll_left);
    let viewport = TileRect::from_left_width(0.0, viewport_width);
    snap_delta(&tiles, &viewport, geometry.spread, geometry.page_width)
}
