//! Assigns every pixel to its nearest centroid.
//!
//! Distances are Euclidean in RGB space. Squared distances are compared instead,
//! which selects the same cluster. When several centroids are equally close,
//! the one with the lowest index wins.

use crate::{Centroids, ImageRef, LabelGrid};

use std::array;

use palette::cast;
use wide::f32x8;

#[cfg(feature = "threads")]
use rayon::prelude::*;

/// Centroids laid out in lanes of 8 for SIMD distance computations.
///
/// Unused lanes in the last chunk hold `f32::INFINITY`, so they are never the nearest.
#[derive(Debug, Clone)]
pub struct CentroidLanes {
    /// One `[red, green, blue]` triple of lane vectors per chunk of 8 centroids.
    chunks: Vec<[f32x8; 3]>,
}

impl CentroidLanes {
    /// Lays out the given centroids in chunks of 8.
    #[must_use]
    pub fn new(centroids: &Centroids) -> Self {
        let centroids = centroids.as_slice();
        let mut chunks = Vec::with_capacity(centroids.len().div_ceil(8));

        let exact = centroids.chunks_exact(8);
        let remainder = exact.remainder();
        chunks.extend(
            exact.map(|chunk| array::from_fn(|c| f32x8::new(array::from_fn(|i| chunk[i][c])))),
        );

        if !remainder.is_empty() {
            let mut arr = [[f32::INFINITY; 8]; 3];
            for (i, centroid) in remainder.iter().enumerate() {
                for (arr, &c) in arr.iter_mut().zip(centroid) {
                    arr[i] = c;
                }
            }
            chunks.push(arr.map(f32x8::new));
        }

        Self { chunks }
    }

    /// Returns the index of the centroid nearest to `color`.
    ///
    /// Ties go to the lowest index.
    #[inline]
    #[must_use]
    pub fn nearest(&self, color: [f32; 3]) -> u8 {
        let query = color.map(f32x8::splat);

        let mut min_index = 0;
        let mut min_distance = f32::INFINITY;

        for (chunk_index, chunk) in self.chunks.iter().enumerate() {
            let distance = (0..3)
                .map(|c| {
                    let diff = query[c] - chunk[c];
                    diff * diff
                })
                .fold(f32x8::splat(0.0), |a, b| a + b);

            // strict comparison in index order keeps the first minimum
            for (lane, &d) in distance.as_array_ref().iter().enumerate() {
                if d < min_distance {
                    min_distance = d;
                    min_index = chunk_index * 8 + lane;
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let label = min_index as u8;
        label
    }
}

/// Computes the nearest centroid of a single color by brute force.
///
/// This gives the same result as [`CentroidLanes::nearest`].
#[must_use]
pub fn nearest_centroid(centroids: &Centroids, color: [f32; 3]) -> u8 {
    let mut min_index = 0;
    let mut min_distance = f32::INFINITY;
    for (i, centroid) in centroids.as_slice().iter().enumerate() {
        let distance = squared_distance(*centroid, color);
        if distance < min_distance {
            min_distance = distance;
            min_index = i;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let label = min_index as u8;
    label
}

/// The squared Euclidean distance between two colors.
#[inline]
#[must_use]
pub fn squared_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let mut distance = 0.0;
    for c in 0..3 {
        let diff = a[c] - b[c];
        distance += diff * diff;
    }
    distance
}

/// Assigns every pixel of `image` to its nearest centroid.
#[must_use]
pub fn assign_labels(image: ImageRef, centroids: &Centroids) -> LabelGrid {
    let lanes = CentroidLanes::new(centroids);
    let labels = image
        .pixels()
        .iter()
        .map(|&color| lanes.nearest(cast::into_array(color).map(f32::from)))
        .collect();

    LabelGrid { labels, dimensions: image.dimensions() }
}

/// Assigns every pixel of `image` to its nearest centroid in parallel.
///
/// The result is identical to [`assign_labels`].
#[cfg(feature = "threads")]
#[must_use]
pub fn assign_labels_par(image: ImageRef, centroids: &Centroids) -> LabelGrid {
    let lanes = CentroidLanes::new(centroids);
    let labels = image
        .pixels()
        .par_iter()
        .map(|&color| lanes.nearest(cast::into_array(color).map(f32::from)))
        .collect();

    LabelGrid { labels, dimensions: image.dimensions() }
}
