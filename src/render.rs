//! Paints every pixel with the color of its cluster's centroid.

use crate::{Centroids, Frame, LabelGrid};

use palette::Srgb;

#[cfg(feature = "threads")]
use rayon::prelude::*;

/// Rounds a real valued centroid to a displayable color.
///
/// Channels are rounded half away from zero and clamped to `0..=255`.
/// `NaN` channels become `0`.
#[must_use]
pub fn to_srgb(centroid: [f32; 3]) -> Srgb<u8> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let [red, green, blue] = centroid.map(|c| c.round().clamp(0.0, 255.0) as u8);
    Srgb::new(red, green, blue)
}

/// Returns the rounded color of every centroid.
#[must_use]
pub fn centroid_colors(centroids: &Centroids) -> Vec<Srgb<u8>> {
    centroids.as_slice().iter().copied().map(to_srgb).collect()
}

/// Renders one frame from the labels of an iteration and its updated centroids.
#[must_use]
pub fn render_frame(labels: &LabelGrid, centroids: &Centroids) -> Frame {
    let palette = centroid_colors(centroids);
    let palette = palette.as_slice();
    let pixels = labels
        .labels()
        .iter()
        .map(|&label| palette[usize::from(label)])
        .collect();

    Frame { pixels, dimensions: labels.dimensions() }
}

/// Renders one frame in parallel.
///
/// The result is identical to [`render_frame`].
#[cfg(feature = "threads")]
#[must_use]
pub fn render_frame_par(labels: &LabelGrid, centroids: &Centroids) -> Frame {
    let palette = centroid_colors(centroids);
    let palette = palette.as_slice();
    let pixels = labels
        .labels()
        .par_iter()
        .map(|&label| palette[usize::from(label)])
        .collect();

    Frame { pixels, dimensions: labels.dimensions() }
}
