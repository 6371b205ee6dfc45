//! Page tile lifecycle and decode cancellation.
//!
//! Each page renders through one tile. A tile's decode is asynchronous
//! and independent of its siblings; completions are stamped with a
//! generation ticket so results arriving after a retarget or unmount
//! are dropped structurally instead of painting stale content.

use crate::Bitmap;

/// Lifecycle phase of a page tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TilePhase {
    /// No decode started yet
    #[default]
    Empty,
    /// A decode is in flight
    Decoding,
    /// The decoded bitmap has been painted
    Painted,
    /// Fetch or decode failed; the tile stays blank
    Failed,
}

/// Proof that a decode was started for a particular tile generation.
///
/// Returned by [`PageTile::begin_decode`] and surrendered on
/// completion; a ticket from a superseded generation is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeTicket {
    generation: u64,
}

/// State of one rendered page tile.
///
/// The decoded bitmap is cached only for the tile's lifetime; there is
/// no cross-navigation cache.
///
/// ## Example
///
/// ```rust
/// use comic_core_view::{Bitmap, PageTile, TilePhase};
///
/// let mut tile = PageTile::new("p1".into(), "img1".into());
/// let ticket = tile.begin_decode();
///
/// // The tile unmounts while the decode is still in flight...
/// tile.detach();
///
/// // ...so the late completion is dropped, never painted.
/// let bitmap = Bitmap::new(1, 1, vec![0, 0, 0, 255]).unwrap();
/// assert!(!tile.complete_decode(ticket, bitmap));
/// assert_eq!(tile.phase(), TilePhase::Empty);
/// ```
#[derive(Clone, Debug)]
pub struct PageTile {
    page_id: String,
    image_id: String,
    phase: TilePhase,
    generation: u64,
    bitmap: Option<Bitmap>,
    error: Option<String>,
}

impl PageTile {
    /// Create a tile for a page and its image resource.
    pub fn new(page_id: String, image_id: String) -> Self {
        Self {
            page_id,
            image_id,
            phase: TilePhase::Empty,
            generation: 0,
            bitmap: None,
            error: None,
        }
    }

    /// Identifier of the page this tile renders.
    #[inline]
    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// Identifier of the image resource to decode.
    #[inline]
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Current lifecycle phase.
    #[inline]
    pub fn phase(&self) -> TilePhase {
        self.phase
    }

    /// The painted bitmap, if the tile reached [`TilePhase::Painted`].
    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    /// Failure message, if the tile reached [`TilePhase::Failed`].
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a ticket still belongs to the current generation.
    #[inline]
    pub fn is_current(&self, ticket: DecodeTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Start a decode for the current image id.
    pub fn begin_decode(&mut self) -> DecodeTicket {
        self.phase = TilePhase::Decoding;
        self.error = None;
        DecodeTicket {
            generation: self.generation,
        }
    }

    /// Apply a finished decode.
    ///
    /// Returns `false` and drops the bitmap when the ticket is stale:
    /// the tile was retargeted or detached while the decode ran, and
    /// nothing may be painted for it anymore.
    pub fn complete_decode(&mut self, ticket: DecodeTicket, bitmap: Bitmap) -> bool {
        if !self.is_current(ticket) {
            log::debug!("dropping stale decode for page {}", self.page_id);
            return false;
        }

        self.bitmap = Some(bitmap);
        self.phase = TilePhase::Painted;
        true
    }

    /// Record a failed decode.
    ///
    /// The failure is isolated to this tile; siblings keep decoding.
    /// Returns `false` for stale tickets, which leave no trace.
    pub fn fail_decode(&mut self, ticket: DecodeTicket, error: String) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        log::warn!("page {} decode failed: {}", self.page_id, error);
        self.error = Some(error);
        self.phase = TilePhase::Failed;
        true
    }

    /// Point the tile at a different image resource.
    ///
    /// Invalidates any in-flight decode and clears the painted bitmap;
    /// the caller starts a fresh decode for the new source. A retarget
    /// to the same id is a no-op.
    pub fn retarget(&mut self, image_id: String) {
        if self.image_id == image_id {
            return;
        }

        self.image_id = image_id;
        self.generation += 1;
        self.bitmap = None;
        self.error = None;
        self.phase = TilePhase::Empty;
    }

    /// Unmount the tile.
    ///
    /// Invalidates in-flight decodes so late completions can never
    /// write to the render target, and releases the cached bitmap.
    pub fn detach(&mut self) {
        self.generation += 1;
        self.bitmap = None;
        self.phase = TilePhase::Empty;
    }
}

/// Cap on concurrently running decodes.
///
/// Tiles never block each other logically, but unbounded parallel
/// decodes spike memory on large episodes; hosts acquire a slot before
/// starting a decode and release it when the decode resolves.
#[derive(Clone, Debug)]
pub struct DecodeBudget {
    max: usize,
    active: usize,
}

impl DecodeBudget {
    /// Create a budget allowing up to `max` concurrent decodes.
    pub fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            active: 0,
        }
    }

    /// Number of decodes currently holding a slot.
    #[inline]
    pub fn active(&self) -> usize {
        self.active
    }

    /// Try to take a decode slot.
    pub fn try_acquire(&mut self) -> bool {
        if self.active < self.max {
            self.active += 1;
            true
        } else {
            false
        }
    }

    /// Return a decode slot.
    pub fn release(&mut self) {
        self.active = self.active.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bitmap() -> Bitmap {
        Bitmap::new(2, 2, vec![255; 16]).unwrap()
    }

    #[test]
    fn test_decode_lifecycle() {
        let mut tile = PageTile::new("p1".into(), "img1".into());
        assert_eq!(tile.phase(), TilePhase::Empty);

        let ticket = tile.begin_decode();
        assert_eq!(tile.phase(), TilePhase::Decoding);

        assert!(tile.complete_decode(ticket, test_bitmap()));
        assert_eq!(tile.phase(), TilePhase::Painted);
        assert!(tile.bitmap().is_some());
    }

    #[test]
    fn test_failed_decode_leaves_tile_blank() {
        let mut tile = PageTile::new("p1".into(), "img1".into());
        let ticket = tile.begin_decode();

        assert!(tile.fail_decode(ticket, "network unreachable".into()));
        assert_eq!(tile.phase(), TilePhase::Failed);
        assert!(tile.bitmap().is_none());
        assert_eq!(tile.error(), Some("network unreachable"));
    }

    #[test]
    fn test_retarget_invalidates_inflight_decode() {
        let mut tile = PageTile::new("p1".into(), "img1".into());
        let stale = tile.begin_decode();

        tile.retarget("img2".into());
        assert_eq!(tile.image_id(), "img2");
        assert_eq!(tile.phase(), TilePhase::Empty);

        // The old decode resolves late; its result must not paint
        assert!(!tile.complete_decode(stale, test_bitmap()));
        assert!(tile.bitmap().is_none());

        // A decode for the new source works normally
        let fresh = tile.begin_decode();
        assert!(tile.complete_decode(fresh, test_bitmap()));
        assert_eq!(tile.phase(), TilePhase::Painted);
    }

    #[test]
    fn test_retarget_same_image_keeps_state() {
        let mut tile = PageTile::new("p1".into(), "img1".into());
        let ticket = tile.begin_decode();
        tile.retarget("img1".into());

        // Same source: the in-flight decode is still valid
        assert!(tile.complete_decode(ticket, test_bitmap()));
    }

    #[test]
    fn test_detach_drops_late_completion() {
        let mut tile = PageTile::new("p5".into(), "img5".into());
        let ticket = tile.begin_decode();

        tile.detach();

        // Zero writes after unmount: both outcomes are rejected
        assert!(!tile.complete_decode(ticket, test_bitmap()));
        assert!(!tile.fail_decode(ticket, "late failure".into()));
        assert!(tile.bitmap().is_none());
        assert_eq!(tile.phase(), TilePhase::Empty);
    }

    #[test]
    fn test_decode_budget() {
        let mut budget = DecodeBudget::new(2);
        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        assert_eq!(budget.active(), 2);

        budget.release();
        assert!(budget.try_acquire());

        // Release never underflows
        budget.release();
        budget.release();
        budget.release();
        assert_eq!(budget.active(), 0);
    }
}
