//! Viewer shell state management.
//!
//! The shell composes the layout engine, the scroll controller, and the
//! page tiles into one state value. Suspension maps to an explicit
//! tri-state: the embedding page decides what to render while the
//! episode loads or after it fails.

use crate::{
    Bitmap, DecodeBudget, Episode, ImageRequest, PageSizing, PageTile, ScrollController,
    StripLayout, ViewerOptions, ViewportGeometry,
};

/// Loading phase of the viewer shell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewerPhase {
    /// Episode data is being fetched; render nothing or a fallback
    #[default]
    Loading,
    /// Episode loaded; the page strip is live
    Ready,
    /// Episode fetch failed; render a neutral empty state
    Failed,
}

/// State for one mounted comic viewer.
///
/// Owns the tiles, the derived geometry, and the scroll controller.
/// Resize and metadata observations recompute geometry from current
/// measurements, so repeated or interleaved handler invocations settle
/// on the same state instead of accumulating drift.
#[derive(Clone, Debug)]
pub struct ViewerState {
    /// Current shell phase
    pub phase: ViewerPhase,
    /// The loaded episode, once fetched
    pub episode: Option<Episode>,
    /// One tile per page, in reading order
    pub tiles: Vec<PageTile>,
    /// Intrinsic page sizing (fallback until real metadata arrives)
    pub sizing: PageSizing,
    /// Whether real image metadata superseded the fallback sizing
    pub sizing_established: bool,
    /// Last derived geometry, if the container has been measured
    pub geometry: Option<ViewportGeometry>,
    /// Last observed container dimensions
    pub container: Option<(f64, f64)>,
    /// Scroll/drag controller for the strip
    pub scroll: ScrollController,
    /// Concurrent decode cap
    pub budget: DecodeBudget,
    /// Error message if the episode failed to load
    pub error: Option<String>,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new(&ViewerOptions::default())
    }
}

impl ViewerState {
    /// Create a viewer in the loading phase.
    pub fn new(options: &ViewerOptions) -> Self {
        Self {
            phase: ViewerPhase::Loading,
            episode: None,
            tiles: Vec::new(),
            sizing: options.page_sizing(),
            sizing_established: false,
            geometry: None,
            container: None,
            scroll: options.scroll_controller(),
            budget: options.decode_budget(),
            error: None,
        }
    }

    /// Whether the strip can render.
    pub fn is_ready(&self) -> bool {
        self.phase == ViewerPhase::Ready
    }

    /// Enter the loading phase for a (re)fetch.
    pub fn begin_loading(&mut self) {
        self.phase = ViewerPhase::Loading;
        self.error = None;
    }

    /// Install a fetched episode.
    ///
    /// Tiles are keyed by page id: a page that survives a refetch keeps
    /// its tile (and painted bitmap) even if its position changed; a
    /// page whose image id changed is retargeted; removed pages have
    /// their tiles detached.
    pub fn episode_loaded(&mut self, episode: Episode) {
        let mut old_tiles = std::mem::take(&mut self.tiles);

        self.tiles = episode
            .pages
            .iter()
            .map(|page| {
                match old_tiles.iter().position(|t| t.page_id() == page.id) {
                    Some(idx) => {
                        let mut tile = old_tiles.swap_remove(idx);
                        tile.retarget(page.image_id.clone());
                        tile
                    }
                    None => PageTile::new(page.id.clone(), page.image_id.clone()),
                }
            })
            .collect();

        for tile in &mut old_tiles {
            tile.detach();
        }

        self.episode = Some(episode);
        self.phase = ViewerPhase::Ready;
        self.error = None;
    }

    /// Record a failed episode fetch.
    ///
    /// The viewer renders a neutral empty state; retry policy belongs
    /// to the data provider layer.
    pub fn load_failed(&mut self, error: String) {
        log::warn!("episode load failed: {}", error);
        self.error = Some(error);
        self.phase = ViewerPhase::Failed;
        self.episode = None;
        self.tiles.clear();
    }

    /// Feed a container resize observation.
    ///
    /// Returns the new geometry when it changed, `None` when the
    /// observation left it unchanged or the container is unmeasurable.
    /// Any pending snap is invalidated on change so the next correction
    /// reads post-resize tile rects.
    pub fn observe_resize(&mut self, width: f64, height: f64) -> Option<ViewportGeometry> {
        self.container = Some((width, height));
        self.recompute_geometry()
    }

    /// Feed the intrinsic size of a decoded page image.
    ///
    /// The first real metadata supersedes the fallback aspect ratio and
    /// forces a geometry recompute; later pages are assumed to share
    /// the episode's page dimensions.
    pub fn set_page_intrinsic_size(&mut self, width: f64, height: f64) -> Option<ViewportGeometry> {
        if self.sizing_established {
            return None;
        }
        let sizing = PageSizing::from_dimensions(width, height)?;

        self.sizing = sizing;
        self.sizing_established = true;
        self.recompute_geometry()
    }

    fn recompute_geometry(&mut self) -> Option<ViewportGeometry> {
        let (width, height) = self.container?;
        let geometry = self.sizing.compute_geometry(width, height)?;

        if self.geometry == Some(geometry) {
            return None;
        }

        log::debug!(
            "geometry: {:?} spread, page width {:.1}px",
            geometry.spread,
            geometry.page_width
        );
        self.geometry = Some(geometry);
        // Layout must settle before any snap reads tile rects again.
        self.scroll.invalidate();
        Some(geometry)
    }

    /// Strip layout for the current tiles and geometry.
    pub fn strip_layout(&self) -> Option<StripLayout> {
        let geometry = self.geometry?;
        Some(crate::layout_strip(self.tiles.len(), &geometry))
    }

    /// Mutable tile lookup by page id.
    pub fn tile_for_page_mut(&mut self, page_id: &str) -> Option<&mut PageTile> {
        self.tiles.iter_mut().find(|t| t.page_id() == page_id)
    }

    /// Unmount the viewer: invalidate all in-flight decodes and reset
    /// interaction state. Called synchronously on teardown.
    pub fn detach(&mut self) {
        for tile in &mut self.tiles {
            tile.detach();
        }
        self.scroll.reset();
    }
}

/// Result type for provider operations.
pub type LoadResult<T> = Result<T, String>;

/// Trait for async episode data providers.
///
/// Implement this to supply episode data from your I/O mechanism
/// (fetch API, filesystem, test fixtures, ...).
///
/// No `Send` bounds — works in both native and WASM (single-threaded)
/// contexts.
pub trait EpisodeProvider {
    /// Fetch an episode with its ordered page list.
    fn fetch_episode(
        &self,
        episode_id: &str,
    ) -> impl std::future::Future<Output = LoadResult<Episode>>;
}

/// Trait for async image providers.
///
/// The provider fetches the encoded resource and performs the native
/// decode; the returned bitmap is still scrambled. The pipeline
/// drivers below apply [`crate::unscramble`] to it.
pub trait ImageProvider {
    /// Fetch and natively decode one page image.
    fn fetch_image(
        &self,
        request: &ImageRequest,
    ) -> impl std::future::Future<Output = LoadResult<Bitmap>>;
}

/// Fetch an episode and validate it has at least one page.
pub async fn load_episode<P: EpisodeProvider>(
    provider: &P,
    episode_id: &str,
) -> LoadResult<Episode> {
    let episode = provider.fetch_episode(episode_id).await?;

    if episode.pages.is_empty() {
        return Err("Episode has no pages".to_string());
    }

    Ok(episode)
}

/// Fetch, decode, and unscramble one page image.
pub async fn load_page_image<P: ImageProvider>(
    provider: &P,
    request: &ImageRequest,
) -> LoadResult<Bitmap> {
    let mut bitmap = provider.fetch_image(request).await?;
    crate::unscramble(&mut bitmap);
    Ok(bitmap)
}

/// Decode a set of page images cooperatively.
///
/// For each `(tile_index, request)` pair, fetches and unscrambles the
/// image, then calls `on_tile(tile_index, result)` so the caller can
/// route the outcome through the owning tile's ticket. Calls
/// `yield_fn()` around each decode to keep the UI responsive in
/// single-threaded WASM contexts. A failed page reports through
/// `on_tile` and never aborts its siblings.
pub async fn load_page_images<P, F, Y, YFut>(
    provider: &P,
    requests: &[(usize, ImageRequest)],
    on_tile: F,
    yield_fn: Y,
) where
    P: ImageProvider,
    F: Fn(usize, LoadResult<Bitmap>),
    Y: Fn() -> YFut,
    YFut: std::future::Future<Output = ()>,
{
    for (tile_index, request) in requests {
        // Let input and animation callbacks run before heavy decode work.
        yield_fn().await;

        let result = load_page_image(provider, request).await;
        on_tile(*tile_index, result);

        // Yield again after handing over the decoded frame.
        yield_fn().await;
    }
}

/// Yield control back to the browser event loop.
///
/// Useful in long-running WASM loops to keep the UI responsive while
/// background decoding progresses.
#[cfg(feature = "web")]
pub async fn yield_to_event_loop() {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 0);
        } else {
            let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Page, SpreadCount, TilePhase};

    fn episode(pages: &[(&str, &str)]) -> Episode {
        Episode::new(
            "ep1".into(),
            pages
                .iter()
                .map(|(id, img)| Page::new((*id).into(), (*img).into()))
                .collect(),
        )
    }

    fn test_bitmap() -> Bitmap {
        Bitmap::new(2, 2, vec![0; 16]).unwrap()
    }

    #[test]
    fn test_phase_transitions() {
        let mut state = ViewerState::default();
        assert_eq!(state.phase, ViewerPhase::Loading);
        assert!(!state.is_ready());

        state.episode_loaded(episode(&[("p1", "i1"), ("p2", "i2")]));
        assert_eq!(state.phase, ViewerPhase::Ready);
        assert_eq!(state.tiles.len(), 2);
        assert_eq!(state.tiles[0].page_id(), "p1");

        state.begin_loading();
        assert_eq!(state.phase, ViewerPhase::Loading);
    }

    #[test]
    fn test_load_failure_is_neutral() {
        let mut state = ViewerState::default();
        state.load_failed("503 from episode service".into());

        assert_eq!(state.phase, ViewerPhase::Failed);
        assert!(state.tiles.is_empty());
        assert_eq!(state.error.as_deref(), Some("503 from episode service"));
    }

    #[test]
    fn test_tile_identity_survives_refetch() {
        let mut state = ViewerState::default();
        state.episode_loaded(episode(&[("p1", "i1"), ("p2", "i2")]));

        // Paint page 1
        let ticket = state.tiles[0].begin_decode();
        assert!(state.tiles[0].complete_decode(ticket, test_bitmap()));

        // Refetch returns the same pages in a new order plus a new one
        state.episode_loaded(episode(&[("p3", "i3"), ("p1", "i1"), ("p2", "i2")]));

        assert_eq!(state.tiles.len(), 3);
        let p1 = &state.tiles[1];
        assert_eq!(p1.page_id(), "p1");
        // Same page id and image id: the painted bitmap survives
        assert_eq!(p1.phase(), TilePhase::Painted);
    }

    #[test]
    fn test_refetch_drops_removed_pages() {
        let mut state = ViewerState::default();
        state.episode_loaded(episode(&[("p1", "i1"), ("p2", "i2")]));
        state.tiles[1].begin_decode();

        state.episode_loaded(episode(&[("p1", "i1")]));
        assert_eq!(state.tiles.len(), 1);

        // The removed page has no tile anymore; its late decode result
        // finds no render target to write to
        assert!(state.tile_for_page_mut("p2").is_none());
    }

    #[test]
    fn test_resize_recomputes_geometry() {
        let mut state = ViewerState::default();

        // Unmeasured container: no geometry yet
        assert_eq!(state.observe_resize(0.0, 0.0), None);
        assert_eq!(state.geometry, None);

        let geometry = state.observe_resize(1200.0, 800.0).unwrap();
        assert_eq!(geometry.spread, SpreadCount::Two);

        // Same measurements: no change reported
        assert_eq!(state.observe_resize(1200.0, 800.0), None);

        // Narrower container flips to a single page
        let geometry = state.observe_resize(600.0, 800.0).unwrap();
        assert_eq!(geometry.spread, SpreadCount::One);
    }

    #[test]
    fn test_resize_invalidates_pending_snap() {
        let mut state = ViewerState::default();
        state.observe_resize(1200.0, 800.0);

        let _ = state.scroll.settle_elapsed(Some(40.0));
        assert!(state.scroll.is_settling());

        state.observe_resize(600.0, 800.0);
        assert!(!state.scroll.is_settling());
    }

    #[test]
    fn test_intrinsic_size_supersedes_fallback_once() {
        let mut state = ViewerState::default();
        state.observe_resize(1190.0, 800.0);
        // Fallback ratio ~0.708: 1190/800 = 1.4875 > 1.416, two pages
        assert_eq!(state.geometry.unwrap().spread, SpreadCount::Two);

        // First page metadata arrives with squarer pages
        let geometry = state.set_page_intrinsic_size(1000.0, 1200.0).unwrap();
        assert_eq!(geometry.spread, SpreadCount::One);
        assert!(state.sizing_established);

        // Later pages don't re-derive sizing
        assert_eq!(state.set_page_intrinsic_size(500.0, 500.0), None);
    }

    #[test]
    fn test_decode_isolation_across_tiles() {
        let mut state = ViewerState::default();
        let pages: Vec<(String, String)> = (1..=10)
            .map(|i| (format!("p{i}"), format!("i{i}")))
            .collect();
        let pages_ref: Vec<(&str, &str)> = pages
            .iter()
            .map(|(p, i)| (p.as_str(), i.as_str()))
            .collect();
        state.episode_loaded(episode(&pages_ref));

        for idx in 0..10 {
            let ticket = state.tiles[idx].begin_decode();
            if idx == 2 {
                state.tiles[idx].fail_decode(ticket, "corrupt stream".into());
            } else {
                state.tiles[idx].complete_decode(ticket, test_bitmap());
            }
        }

        for (idx, tile) in state.tiles.iter().enumerate() {
            if idx == 2 {
                assert_eq!(tile.phase(), TilePhase::Failed);
            } else {
                assert_eq!(tile.phase(), TilePhase::Painted);
            }
        }
    }

    #[test]
    fn test_strip_layout_follows_tiles() {
        let mut state = ViewerState::default();
        assert!(state.strip_layout().is_none());

        state.episode_loaded(episode(&[("p1", "i1"), ("p2", "i2"), ("p3", "i3")]));
        state.observe_resize(600.0, 800.0);

        let layout = state.strip_layout().unwrap();
        assert_eq!(layout.tile_count(), 3);
    }

    #[test]
    fn test_detach_invalidates_all_tiles() {
        let mut state = ViewerState::default();
        state.episode_loaded(episode(&[("p1", "i1"), ("p2", "i2")]));

        let tickets: Vec<_> = state.tiles.iter_mut().map(|t| t.begin_decode()).collect();
        state.detach();

        for (tile, ticket) in state.tiles.iter_mut().zip(tickets) {
            assert!(!tile.complete_decode(ticket, test_bitmap()));
        }
    }
}
