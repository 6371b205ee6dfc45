//! Decoded bitmaps and the reversible page obfuscation transform.
//!
//! Page images are delivered scrambled: fixed-size pixel blocks are
//! permuted and some blocks have their color channels inverted, keyed
//! only by the image dimensions. [`unscramble`] undoes the transform
//! applied at encode time; both directions are pure functions, so the
//! same bytes and dimensions always produce the same pixels.

/// Side length of the square pixel blocks the transform permutes.
const BLOCK_SIZE: u32 = 32;

/// Error type for decode operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Pixel buffer length doesn't match the stated dimensions
    SizeMismatch { expected: usize, actual: usize },
    /// Zero-sized image
    InvalidDimensions { width: u32, height: u32 },
    /// Fetching the encoded resource failed
    Fetch(String),
    /// Native decode of the encoded resource failed
    Decode(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::SizeMismatch { expected, actual } => {
                write!(
                    f,
                    "Pixel buffer size mismatch: expected {} bytes, got {}",
                    expected, actual
                )
            }
            DecodeError::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            DecodeError::Fetch(msg) => write!(f, "Image fetch failed: {}", msg),
            DecodeError::Decode(msg) => write!(f, "Image decode failed: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

/// A decoded RGBA bitmap.
///
/// Pixels are laid out row-major, 4 bytes per pixel (r, g, b, a).
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA pixel data (width * height * 4 bytes)
    pub rgba: Vec<u8>,
}

impl Bitmap {
    /// Create a bitmap, validating the buffer length against the
    /// dimensions.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(DecodeError::SizeMismatch {
                expected,
                actual: rgba.len(),
            });
        }

        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Intrinsic aspect ratio (width / height).
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Keyed block schedule shared by both transform directions.
///
/// The permutation and inversion flags depend only on the image
/// dimensions, so encoder and decoder derive the identical schedule
/// without exchanging a key.
struct BlockSchedule {
    cols: u32,
    rows: u32,
    /// Scrambled block i holds source block `perm[i]`
    perm: Vec<usize>,
    /// Scrambled block i has inverted color channels when `flags[i]`
    flags: Vec<bool>,
}

/// Linear congruential step (Numerical Recipes constants).
#[inline]
fn lcg_next(state: &mut u32) -> u32 {
    *state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    *state
}

impl BlockSchedule {
    fn for_dimensions(width: u32, height: u32) -> Self {
        let cols = width / BLOCK_SIZE;
        let rows = height / BLOCK_SIZE;
        let count = cols as usize * rows as usize;

        let mut state = width
            .wrapping_mul(0x9E37_79B1)
            .wrapping_add(height.wrapping_mul(0x85EB_CA6B))
            | 1;

        // Fisher-Yates over the block indices
        let mut perm: Vec<usize> = (0..count).collect();
        for i in (1..count).rev() {
            let j = lcg_next(&mut state) as usize % (i + 1);
            perm.swap(i, j);
        }

        let flags: Vec<bool> = (0..count).map(|_| lcg_next(&mut state) & 1 == 1).collect();

        Self {
            cols,
            rows,
            perm,
            flags,
        }
    }

    #[inline]
    fn block_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Pixel origin of block `index` in the grid.
    fn block_origin(&self, index: usize) -> (u32, u32) {
        let bx = (index as u32) % self.cols;
        let by = (index as u32) / self.cols;
        (bx * BLOCK_SIZE, by * BLOCK_SIZE)
    }
}

/// Copy one block between buffers, optionally inverting color channels.
///
/// Alpha is carried through unchanged in both directions.
fn copy_block(
    src: &[u8],
    dst: &mut [u8],
    image_width: u32,
    from: (u32, u32),
    to: (u32, u32),
    invert: bool,
) {
    let row_stride = image_width as usize * 4;
    let block_row_bytes = BLOCK_SIZE as usize * 4;

    for line in 0..BLOCK_SIZE as usize {
        let src_offset = (from.1 as usize + line) * row_stride + from.0 as usize * 4;
        let dst_offset = (to.1 as usize + line) * row_stride + to.0 as usize * 4;

        let src_line = &src[src_offset..src_offset + block_row_bytes];
        let dst_line = &mut dst[dst_offset..dst_offset + block_row_bytes];

        if invert {
            for (s, d) in src_line.chunks_exact(4).zip(dst_line.chunks_exact_mut(4)) {
                d[0] = 255 - s[0];
                d[1] = 255 - s[1];
                d[2] = 255 - s[2];
                d[3] = s[3];
            }
        } else {
            dst_line.copy_from_slice(src_line);
        }
    }
}

/// Undo the obfuscation transform, recovering the displayable bitmap.
///
/// Deterministic and pure: same input bytes and dimensions always yield
/// the same output pixels. Pixels outside the full-block grid (right
/// and bottom remainders) are never touched by the transform.
///
/// ## Example
///
/// ```rust
/// use comic_core_view::{scramble, unscramble, Bitmap};
///
/// let original = Bitmap::new(64, 64, vec![127u8; 64 * 64 * 4]).unwrap();
/// let mut image = original.clone();
/// scramble(&mut image);
/// unscramble(&mut image);
/// assert_eq!(image, original);
/// ```
pub fn unscramble(bitmap: &mut Bitmap) {
    let schedule = BlockSchedule::for_dimensions(bitmap.width, bitmap.height);
    if schedule.block_count() == 0 {
        return;
    }

    let src = bitmap.rgba.clone();
    for i in 0..schedule.block_count() {
        // Scrambled block i came from source block perm[i]; put it back.
        copy_block(
            &src,
            &mut bitmap.rgba,
            bitmap.width,
            schedule.block_origin(i),
            schedule.block_origin(schedule.perm[i]),
            schedule.flags[i],
        );
    }
}

/// Apply the obfuscation transform (the encoder side).
///
/// Exact inverse of [`unscramble`]; exposed for encoding tooling and
/// for exercising the decode path with synthetic fixtures.
pub fn scramble(bitmap: &mut Bitmap) {
    let schedule = BlockSchedule::for_dimensions(bitmap.width, bitmap.height);
    if schedule.block_count() == 0 {
        return;
    }

    let src = bitmap.rgba.clone();
    for i in 0..schedule.block_count() {
        copy_block(
            &src,
            &mut bitmap.rgba,
            bitmap.width,
            schedule.block_origin(schedule.perm[i]),
            schedule.block_origin(i),
            schedule.flags[i],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A gradient image large enough for a 3x2 block grid plus
    /// remainder margins on both axes.
    fn gradient_bitmap(width: u32, height: u32) -> Bitmap {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                rgba.push((x % 256) as u8);
                rgba.push((y % 256) as u8);
                rgba.push(((x + y) % 256) as u8);
                rgba.push(255);
            }
        }
        Bitmap::new(width, height, rgba).unwrap()
    }

    #[test]
    fn test_bitmap_validation() {
        assert!(matches!(
            Bitmap::new(0, 10, vec![]),
            Err(DecodeError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Bitmap::new(2, 2, vec![0; 15]),
            Err(DecodeError::SizeMismatch {
                expected: 16,
                actual: 15
            })
        ));
        assert!(Bitmap::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_aspect_ratio() {
        let bitmap = gradient_bitmap(100, 200);
        assert!((bitmap.aspect_ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_scramble_changes_pixels() {
        let original = gradient_bitmap(100, 70);
        let mut scrambled = original.clone();
        scramble(&mut scrambled);
        assert_ne!(scrambled.rgba, original.rgba);
    }

    #[test]
    fn test_unscramble_inverts_scramble() {
        let original = gradient_bitmap(100, 70);
        let mut image = original.clone();
        scramble(&mut image);
        unscramble(&mut image);
        assert_eq!(image.rgba, original.rgba);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let mut a = gradient_bitmap(96, 64);
        let mut b = gradient_bitmap(96, 64);
        unscramble(&mut a);
        unscramble(&mut b);
        assert_eq!(a.rgba, b.rgba);
    }

    #[test]
    fn test_remainder_margins_untouched() {
        // 100x70 leaves a 4px right margin and 6px bottom margin
        let original = gradient_bitmap(100, 70);
        let mut scrambled = original.clone();
        scramble(&mut scrambled);

        let stride = 100 * 4;
        // Right margin: columns 96..100 of a row inside the block grid
        let row = 10;
        let margin = &scrambled.rgba[row * stride + 96 * 4..(row + 1) * stride];
        let expected = &original.rgba[row * stride + 96 * 4..(row + 1) * stride];
        assert_eq!(margin, expected);

        // Bottom margin: rows 64..70
        let bottom = &scrambled.rgba[64 * stride..];
        let expected = &original.rgba[64 * stride..];
        assert_eq!(bottom, expected);
    }

    #[test]
    fn test_small_image_is_identity() {
        // Smaller than one block: no full blocks, transform is identity
        let original = gradient_bitmap(20, 20);
        let mut image = original.clone();
        scramble(&mut image);
        assert_eq!(image, original);
    }

    #[test]
    fn test_alpha_carried_through() {
        let mut bitmap = gradient_bitmap(64, 64);
        for (i, px) in bitmap.rgba.chunks_exact_mut(4).enumerate() {
            px[3] = (i % 251) as u8;
        }
        let alphas_before: Vec<u8> = bitmap.rgba.chunks_exact(4).map(|p| p[3]).collect();
        let mut sorted_before = alphas_before.clone();
        sorted_before.sort_unstable();

        scramble(&mut bitmap);

        // Alpha values are permuted with their blocks but never altered
        let mut sorted_after: Vec<u8> = bitmap.rgba.chunks_exact(4).map(|p| p[3]).collect();
        sorted_after.sort_unstable();
        assert_eq!(sorted_after, sorted_before);
    }
}
