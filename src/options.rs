use crate::{DecodeBudget, ImageFormat, PageSizing, ScrollController};

/// Viewer configuration.
///
/// Every field has a default, and a TOML profile may set any subset;
/// missing fields keep their defaults for forward/backward
/// compatibility with different deployments.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ViewerOptions {
    /// Intrinsic page image width in pixels
    pub image_width: f64,
    /// Intrinsic page image height in pixels
    pub image_height: f64,
    /// Encoded format requested from the image service
    pub format: ImageFormat,
    /// Quiet window after the last scroll event before snapping, in ms
    pub settle_debounce_ms: u32,
    /// Snap deltas at or below this magnitude count as settled, in px
    pub snap_epsilon: f64,
    /// Maximum concurrently running page decodes
    pub max_concurrent_decodes: usize,
    /// Minimum outer viewer height in pixels
    pub min_viewer_height: f64,
    /// Maximum outer viewer height in pixels
    pub max_viewer_height: f64,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            image_width: crate::FALLBACK_IMAGE_WIDTH,
            image_height: crate::FALLBACK_IMAGE_HEIGHT,
            format: ImageFormat::Jxl,
            settle_debounce_ms: 100,
            snap_epsilon: 0.5,
            max_concurrent_decodes: 3,
            min_viewer_height: 500.0,
            max_viewer_height: 650.0,
        }
    }
}

impl ViewerOptions {
    /// Parse a TOML profile into `ViewerOptions`.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Page sizing seeded from the configured intrinsic dimensions.
    ///
    /// Falls back to the built-in fallback ratio when the configured
    /// dimensions are unusable.
    pub fn page_sizing(&self) -> PageSizing {
        PageSizing::from_dimensions(self.image_width, self.image_height)
            .unwrap_or_default()
    }

    /// A scroll controller configured from these options.
    pub fn scroll_controller(&self) -> ScrollController {
        ScrollController::new(self.settle_debounce_ms, self.snap_epsilon)
    }

    /// A decode budget configured from these options.
    pub fn decode_budget(&self) -> DecodeBudget {
        DecodeBudget::new(self.max_concurrent_decodes)
    }

    /// Outer viewer height for a window width, clamped to the
    /// configured range.
    pub fn viewer_height(&self, window_width: f64) -> f64 {
        crate::fit_viewer_height(
            window_width,
            &self.page_sizing(),
            self.min_viewer_height,
            self.max_viewer_height,
        )
    }
}
