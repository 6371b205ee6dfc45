//! # comic-core-view
//!
//! Core page layout, scroll snapping, and decode pipeline for comic viewers.
//!
//! This crate provides platform-agnostic data structures and logic for:
//! - Deriving per-viewport page sizing (one- or two-page spreads)
//! - Laying out a right-to-left page strip and selecting snap targets
//! - Driving pointer-drag scrolling with snap-to-page settling
//! - Unscrambling decoded page images and painting them to canvas
//!
//! ## Features
//!
//! - `serde` - Enable serialization/deserialization for data structures
//! - `toml` - Enable TOML parsing for viewer options
//! - `web` - Enable web/WASM canvas rendering and DOM event wiring
//!
//! ## Example
//!
//! ```rust
//! use comic_core_view::{layout_strip, snap_delta_for_scroll, PageSizing, ScrollController};
//!
//! // Derive geometry for the current container
//! let sizing = PageSizing::new();
//! let geometry = sizing.compute_geometry(1200.0, 800.0).unwrap();
//!
//! // Lay out a 12-page episode and find the snap correction
//! let layout = layout_strip(12, &geometry);
//! let scroll = layout.initial_scroll(1200.0);
//! let delta = snap_delta_for_scroll(&layout, scroll, 1200.0, &geometry);
//! assert!(delta.is_some());
//!
//! // Drive the drag state machine from host pointer events
//! let mut controller = ScrollController::default();
//! controller.pointer_down(640.0);
//! ```

mod data;
mod decode;
mod geometry;
mod options;
pub mod render;
mod scroll;
mod strip;
mod tile;
mod viewer;

pub use data::{resolve_image_url, Episode, ImageFormat, ImageRequest, Page};
pub use decode::{scramble, unscramble, Bitmap, DecodeError};
pub use geometry::{
    compute_geometry, fit_viewer_height, PageSizing, SpreadCount, ViewportGeometry,
    FALLBACK_IMAGE_HEIGHT, FALLBACK_IMAGE_WIDTH,
};
pub use options::ViewerOptions;
pub use render::StripStyle;
pub use scroll::{DragPhase, ScrollCommand, ScrollController, ScrollMotion};
pub use strip::{layout_strip, snap_delta, snap_delta_for_scroll, StripLayout, TileRect};
pub use tile::{DecodeBudget, DecodeTicket, PageTile, TilePhase};
pub use viewer::{
    load_episode, load_page_image, load_page_images, EpisodeProvider, ImageProvider, LoadResult,
    ViewerPhase, ViewerState,
};

#[cfg(feature = "web")]
pub use render::web::ViewerHandle;
#[cfg(feature = "web")]
pub use viewer::yield_to_event_loop;
