//! Contains various types needed across the crate.

use crate::{ConfigError, InputError, MAX_CLUSTERS, MAX_PIXELS};
use palette::{cast::ComponentsAs, Srgb};
use rand::{prelude::Distribution, Rng};
use rand_distr::Uniform;
use std::{fmt::Display, ops::Deref};
#[cfg(feature = "image")]
use {image::RgbImage, palette::cast::IntoComponents};

/// A borrowed, decoded RGB image.
///
/// This is a simple wrapper around `&'a [Srgb<u8>]` with the invariants that
/// the slice holds exactly `width * height` pixels, is not empty,
/// and is not longer than [`MAX_PIXELS`].
///
/// # Examples
/// From a slice of colors:
/// ```
/// # use kflow::{ImageRef, InputError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), InputError> {
/// let pixels = vec![Srgb::new(0, 0, 0); 4];
/// let image = ImageRef::new(&pixels, 2, 2)?;
/// # Ok(())
/// # }
/// ```
///
/// From a raw interleaved buffer:
/// ```
/// # use kflow::{ImageRef, InputError};
/// # fn main() -> Result<(), InputError> {
/// let bytes = [0u8; 12];
/// let image = ImageRef::from_raw(&bytes, 2, 2, 3)?;
/// # Ok(())
/// # }
/// ```
///
/// From an image (needs the `image` feature to be enabled):
/// ```no_run
/// # use kflow::ImageRef;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
/// let image = ImageRef::try_from(&img)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef<'a> {
    /// The pixels in row-major order.
    pixels: &'a [Srgb<u8>],
    /// Width of the image.
    width: u32,
    /// Height of the image.
    height: u32,
}

impl<'a> ImageRef<'a> {
    /// Creates a new [`ImageRef`] after checking the dimensions against the number of pixels.
    ///
    /// # Errors
    /// Returns an [`InputError`] if the image is empty, `pixels.len() != width * height`,
    /// or the image is above [`MAX_PIXELS`].
    pub fn new(pixels: &'a [Srgb<u8>], width: u32, height: u32) -> Result<Self, InputError> {
        if width == 0 || height == 0 {
            return Err(InputError::Empty { width, height });
        }

        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(InputError::LengthMismatch { expected, actual: pixels.len() });
        }

        if pixels.len() > MAX_PIXELS as usize {
            return Err(InputError::TooLarge);
        }

        Ok(Self { pixels, width, height })
    }

    /// Creates a new [`ImageRef`] from an interleaved byte buffer with `channels` bytes per pixel.
    ///
    /// # Errors
    /// Returns [`InputError::ChannelDepth`] if `channels` is not `3`,
    /// or any of the errors of [`ImageRef::new`].
    pub fn from_raw(
        bytes: &'a [u8],
        width: u32,
        height: u32,
        channels: usize,
    ) -> Result<Self, InputError> {
        if channels != 3 {
            return Err(InputError::ChannelDepth(channels));
        }

        if bytes.len() % 3 != 0 {
            return Err(InputError::LengthMismatch {
                expected: width as usize * height as usize * 3,
                actual: bytes.len(),
            });
        }

        Self::new(bytes.components_as(), width, height)
    }

    /// Returns the pixels of the image in row-major order.
    #[must_use]
    pub const fn pixels(&self) -> &'a [Srgb<u8>] {
        self.pixels
    }

    /// Returns the `(width, height)` of the image.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the number of pixels as a `u32`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn num_pixels(&self) -> u32 {
        self.pixels.len() as u32
    }
}

impl<'a> Deref for ImageRef<'a> {
    type Target = [Srgb<u8>];

    fn deref(&self) -> &Self::Target {
        self.pixels
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for ImageRef<'a> {
    type Error = InputError;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        let pixels = image.pixels().len();
        let buf = &image.as_raw()[..(pixels * 3)];
        Self::from_raw(buf, image.width(), image.height(), 3)
    }
}

/// The number of clusters (`K`) to quantize an image into.
///
/// This is a simple new type wrapper around `u16` with the invariant that it must be
/// in the range `1..=MAX_CLUSTERS`.
///
/// # Examples
/// ```
/// # use kflow::{ClusterCount, ConfigError};
/// # fn main() -> Result<(), ConfigError> {
/// let k = ClusterCount::try_from(8u32)?;
/// assert_eq!(k.into_inner(), 8);
/// assert!(ClusterCount::try_from(0u32).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ClusterCount(u16);

impl ClusterCount {
    /// The maximum supported cluster count (given by [`MAX_CLUSTERS`]).
    pub const MAX: Self = Self(MAX_CLUSTERS);

    /// Gets the inner `u16` value.
    #[must_use]
    pub const fn into_inner(self) -> u16 {
        self.0
    }

    /// Gets the cluster count as a `usize` for indexing and lengths.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Default for ClusterCount {
    fn default() -> Self {
        Self(8)
    }
}

impl From<ClusterCount> for u16 {
    fn from(val: ClusterCount) -> Self {
        val.into_inner()
    }
}

impl TryFrom<u32> for ClusterCount {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (1..=u32::from(MAX_CLUSTERS)).contains(&value) {
            #[allow(clippy::cast_possible_truncation)]
            let value = value as u16;
            Ok(Self(value))
        } else {
            Err(ConfigError::ClusterCount(value))
        }
    }
}

impl Display for ClusterCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_inner())
    }
}

/// The current centroid colors: one real valued RGB triple per cluster.
///
/// Channels are not clamped or rounded while the flow runs;
/// that only happens when a frame is rendered.
#[derive(Debug, Clone, PartialEq)]
#[repr(transparent)]
pub struct Centroids(Vec<[f32; 3]>);

impl Centroids {
    /// Draws `k` centroids with every channel independently uniform over `0.0..=255.0`.
    #[must_use]
    pub fn random(k: ClusterCount, rng: &mut impl Rng) -> Self {
        let channel = Uniform::new_inclusive(0.0f32, 255.0);
        Self(
            (0..k.as_usize())
                .map(|_| [0; 3].map(|_| channel.sample(rng)))
                .collect(),
        )
    }

    /// Returns the inner `Vec`.
    #[must_use]
    pub fn into_inner(self) -> Vec<[f32; 3]> {
        self.0
    }

    /// Returns the number of centroids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no centroids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the centroids as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[[f32; 3]] {
        &self.0
    }

    /// Creates centroids without validating their count.
    pub(crate) fn new_unchecked(centroids: Vec<[f32; 3]>) -> Self {
        Self(centroids)
    }
}

impl From<Centroids> for Vec<[f32; 3]> {
    fn from(value: Centroids) -> Self {
        value.into_inner()
    }
}

impl TryFrom<Vec<[f32; 3]>> for Centroids {
    type Error = ConfigError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(centroids: Vec<[f32; 3]>) -> Result<Self, Self::Error> {
        if (1..=MAX_CLUSTERS as usize).contains(&centroids.len()) {
            Ok(Self(centroids))
        } else {
            Err(ConfigError::ClusterCount(centroids.len().min(u32::MAX as usize) as u32))
        }
    }
}

/// The nearest cluster of every pixel for a single iteration.
///
/// Labels are recomputed from scratch every iteration and are always less than the number of clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    /// One label per pixel in row-major order.
    pub(crate) labels: Vec<u8>,
    /// The dimensions of the image.
    pub(crate) dimensions: (u32, u32),
}

impl LabelGrid {
    /// Returns the labels in row-major order.
    #[must_use]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Returns the `(width, height)` of the grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Returns the label at the given pixel, or `None` if it is out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        let (width, height) = self.dimensions;
        if x < width && y < height {
            Some(self.labels[y as usize * width as usize + x as usize])
        } else {
            None
        }
    }
}

/// One rendered iteration: every pixel painted with its cluster's rounded centroid color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The pixels in row-major order.
    pub(crate) pixels: Vec<Srgb<u8>>,
    /// The dimensions of the frame.
    pub(crate) dimensions: (u32, u32),
}

impl Frame {
    /// Returns the pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[Srgb<u8>] {
        &self.pixels
    }

    /// Returns the `(width, height)` of the frame.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Converts the frame into an [`RgbImage`].
    #[cfg(feature = "image")]
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn into_rgbimage(self) -> RgbImage {
        let (width, height) = self.dimensions;
        let buf = self.pixels.into_components();
        // pixels.len() is always width * height
        RgbImage::from_vec(width, height, buf).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoroshiro128PlusPlus;

    #[test]
    fn image_dimensions_must_match() {
        let pixels = checkerboard();
        assert!(ImageRef::new(&pixels, 2, 2).is_ok());
        assert_eq!(
            ImageRef::new(&pixels, 3, 2),
            Err(InputError::LengthMismatch { expected: 6, actual: 4 })
        );
        assert_eq!(
            ImageRef::new(&[], 0, 5),
            Err(InputError::Empty { width: 0, height: 5 })
        );
    }

    #[test]
    fn raw_buffer_checks_channels() {
        let bytes = [0u8; 16];
        assert_eq!(
            ImageRef::from_raw(&bytes, 2, 2, 4),
            Err(InputError::ChannelDepth(4))
        );

        let bytes = [7u8; 12];
        let image = ImageRef::from_raw(&bytes, 2, 2, 3).unwrap();
        assert_eq!(image.num_pixels(), 4);
        assert_eq!(image[3], Srgb::new(7, 7, 7));

        assert!(ImageRef::from_raw(&bytes[..11], 2, 2, 3).is_err());
    }

    #[test]
    fn cluster_count_bounds() {
        assert!(ClusterCount::try_from(0u32).is_err());
        assert!(ClusterCount::try_from(1u32).is_ok());
        assert_eq!(ClusterCount::try_from(256u32), Ok(ClusterCount::MAX));
        assert_eq!(ClusterCount::try_from(257u32), Err(ConfigError::ClusterCount(257)));
    }

    #[test]
    fn random_centroids_in_range() {
        let rng = &mut Xoroshiro128PlusPlus::seed_from_u64(7);
        let k = ClusterCount::try_from(64u32).unwrap();
        let centroids = Centroids::random(k, rng);
        assert_eq!(centroids.len(), 64);
        for centroid in centroids.as_slice() {
            for c in centroid {
                assert!((0.0..=255.0).contains(c));
            }
        }
    }

    #[test]
    fn label_grid_lookup() {
        let grid = LabelGrid { labels: vec![0, 1, 2, 3, 4, 5], dimensions: (3, 2) };
        assert_eq!(grid.get(0, 0), Some(0));
        assert_eq!(grid.get(2, 1), Some(5));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 2), None);
    }
}
