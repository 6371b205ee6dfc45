//! Core data structures for episodes and page images.

/// An episode of a comic: an ordered sequence of pages.
///
/// Page order is reading order and is semantically meaningful.
/// Episodes are immutable once fetched; the viewer only reads them.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Episode {
    /// Episode identifier
    pub id: String,
    /// Pages in reading order (right-to-left presentation)
    pub pages: Vec<Page>,
}

impl Episode {
    /// Create a new episode from an ordered page list.
    pub fn new(id: String, pages: Vec<Page>) -> Self {
        Self { id, pages }
    }

    /// Number of pages in the episode.
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Find the reading-order index of a page by its identifier.
    pub fn page_index(&self, page_id: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.id == page_id)
    }
}

/// One comic page, referencing exactly one image resource.
///
/// A page maps to exactly one rendered tile in the viewer.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page {
    /// Page identifier (tile identity survives episode refetches)
    pub id: String,
    /// Identifier of the encoded image resource for this page
    pub image_id: String,
}

impl Page {
    /// Create a new page.
    pub fn new(id: String, image_id: String) -> Self {
        Self { id, image_id }
    }
}

/// Encoded image formats the image service can deliver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageFormat {
    /// JPEG XL, the fixed target format for page images
    #[default]
    Jxl,
    Webp,
    Png,
    Jpeg,
}

impl ImageFormat {
    /// File extension used in resource URLs.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jxl => "jxl",
            ImageFormat::Webp => "webp",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// Parse an extension string, e.g. from a config file.
    pub fn from_extension(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "jxl" => Some(ImageFormat::Jxl),
            "webp" => Some(ImageFormat::Webp),
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}

/// A request for one encoded image resource.
///
/// Addresses the resource by identifier plus requested format and
/// optional target dimensions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageRequest {
    /// Image resource identifier
    pub image_id: String,
    /// Requested encoded format
    pub format: ImageFormat,
    /// Requested width in pixels, if the service should scale
    pub width: Option<u32>,
    /// Requested height in pixels, if the service should scale
    pub height: Option<u32>,
}

impl ImageRequest {
    /// Request an image at its natural size in the given format.
    pub fn new(image_id: String, format: ImageFormat) -> Self {
        Self {
            image_id,
            format,
            width: None,
            height: None,
        }
    }

    /// Request an image scaled to the given dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Build the resource URL for an image request.
///
/// ## Example
///
/// ```rust
/// use comic_core_view::{resolve_image_url, ImageFormat, ImageRequest};
///
/// let request = ImageRequest::new("abc123".into(), ImageFormat::Jxl);
/// let url = resolve_image_url("/images", &request);
/// assert_eq!(url, "/images/abc123.jxl");
///
/// let sized = request.with_size(1075, 1518);
/// let url = resolve_image_url("/images", &sized);
/// assert_eq!(url, "/images/abc123.jxl?width=1075&height=1518");
/// ```
pub fn resolve_image_url(base: &str, request: &ImageRequest) -> String {
    let base = base.trim_end_matches('/');
    let mut url = format!("{}/{}.{}", base, request.image_id, request.format.extension());

    match (request.width, request.height) {
        (Some(w), Some(h)) => {
            url.push_str(&format!("?width={}&height={}", w, h));
        }
        (Some(w), None) => {
            url.push_str(&format!("?width={}", w));
        }
        (None, Some(h)) => {
            url.push_str(&format!("?height={}", h));
        }
        (None, None) => {}
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_episode() -> Episode {
        Episode::new(
            "ep1".into(),
            vec![
                Page::new("p1".into(), "img1".into()),
                Page::new("p2".into(), "img2".into()),
                Page::new("p3".into(), "img3".into()),
            ],
        )
    }

    #[test]
    fn test_page_index() {
        let episode = sample_episode();
        assert_eq!(episode.page_count(), 3);
        assert_eq!(episode.page_index("p1"), Some(0));
        assert_eq!(episode.page_index("p3"), Some(2));
        assert_eq!(episode.page_index("missing"), None);
    }

    #[test]
    fn test_format_extension_roundtrip() {
        assert_eq!(ImageFormat::from_extension("jxl"), Some(ImageFormat::Jxl));
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("bmp"), None);
    }

    #[test]
    fn test_resolve_image_url() {
        let request = ImageRequest::new("abc".into(), ImageFormat::Webp);
        assert_eq!(resolve_image_url("/images/", &request), "/images/abc.webp");

        let sized = request.clone().with_size(200, 300);
        assert_eq!(
            resolve_image_url("/images", &sized),
            "/images/abc.webp?width=200&height=300"
        );

        let width_only = ImageRequest {
            width: Some(128),
            ..request
        };
        assert_eq!(
            resolve_image_url("https://cdn.example/images", &width_only),
            "https://cdn.example/images/abc.webp?width=128"
        );
    }
}
