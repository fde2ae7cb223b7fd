//! Computes the mean color of the pixels assigned to each cluster.
//!
//! Channel sums are accumulated as integers, so the single threaded and parallel
//! versions produce exactly the same means regardless of summation order.

use crate::{ClusterCount, EmptyClusterRule, ImageRef, LabelGrid};

use palette::cast;

#[cfg(feature = "threads")]
use rayon::prelude::*;

/// The average pull signal of a single cluster for one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusterMean {
    /// The mean color of the pixels assigned to the cluster.
    Mean([f32; 3]),
    /// No pull signal: the cluster has no pixels (or, under
    /// [`EmptyClusterRule::BlackSentinel`], its mean is pure black).
    Empty,
}

impl ClusterMean {
    /// Returns the mean color, if any.
    #[must_use]
    pub const fn mean(self) -> Option<[f32; 3]> {
        match self {
            ClusterMean::Mean(mean) => Some(mean),
            ClusterMean::Empty => None,
        }
    }
}

/// Per cluster channel sums and pixel counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSums {
    /// The sum of each channel over the pixels of each cluster.
    sums: Vec<[u64; 3]>,
    /// The number of pixels assigned to each cluster.
    counts: Vec<u32>,
}

impl ClusterSums {
    /// Creates zeroed sums for `k` clusters.
    #[must_use]
    pub fn new(k: ClusterCount) -> Self {
        Self {
            sums: vec![[0; 3]; k.as_usize()],
            counts: vec![0; k.as_usize()],
        }
    }

    /// Adds a pixel to the cluster with the given label.
    #[inline]
    pub fn add(&mut self, label: u8, color: [u8; 3]) {
        let i = usize::from(label);
        for (sum, c) in self.sums[i].iter_mut().zip(color) {
            *sum += u64::from(c);
        }
        self.counts[i] += 1;
    }

    /// Combines the sums of two disjoint sets of pixels.
    #[must_use]
    pub fn merge(mut self, other: &Self) -> Self {
        for (a, b) in self.sums.iter_mut().zip(&other.sums) {
            for c in 0..3 {
                a[c] += b[c];
            }
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self
    }

    /// Returns the number of pixels assigned to each cluster.
    #[must_use]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Divides the sums by the counts to get the mean of each cluster.
    #[must_use]
    pub fn into_means(self, rule: EmptyClusterRule) -> Vec<ClusterMean> {
        self.sums
            .into_iter()
            .zip(self.counts)
            .map(|(sum, count)| {
                if count == 0 {
                    return ClusterMean::Empty;
                }

                if rule == EmptyClusterRule::BlackSentinel && sum == [0; 3] {
                    return ClusterMean::Empty;
                }

                let count = f64::from(count);
                #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
                let mean = sum.map(|s| (s as f64 / count) as f32);
                ClusterMean::Mean(mean)
            })
            .collect()
    }
}

/// Sums the pixels of each cluster.
#[must_use]
pub fn cluster_sums(image: ImageRef, labels: &LabelGrid, k: ClusterCount) -> ClusterSums {
    let mut sums = ClusterSums::new(k);
    for (&color, &label) in image.pixels().iter().zip(labels.labels()) {
        sums.add(label, cast::into_array(color));
    }
    sums
}

/// Sums the pixels of each cluster in parallel.
///
/// The result is identical to [`cluster_sums`].
#[cfg(feature = "threads")]
#[must_use]
pub fn cluster_sums_par(image: ImageRef, labels: &LabelGrid, k: ClusterCount) -> ClusterSums {
    image
        .pixels()
        .par_iter()
        .zip(labels.labels().par_iter())
        .fold(
            || ClusterSums::new(k),
            |mut sums, (&color, &label)| {
                sums.add(label, cast::into_array(color));
                sums
            },
        )
        .reduce(|| ClusterSums::new(k), |a, b| a.merge(&b))
}

/// Computes the mean color of every cluster.
#[must_use]
pub fn cluster_means(
    image: ImageRef,
    labels: &LabelGrid,
    k: ClusterCount,
    rule: EmptyClusterRule,
) -> Vec<ClusterMean> {
    cluster_sums(image, labels, k).into_means(rule)
}

/// Computes the mean color of every cluster in parallel.
///
/// The result is identical to [`cluster_means`].
#[cfg(feature = "threads")]
#[must_use]
pub fn cluster_means_par(
    image: ImageRef,
    labels: &LabelGrid,
    k: ClusterCount,
    rule: EmptyClusterRule,
) -> Vec<ClusterMean> {
    cluster_sums_par(image, labels, k).into_means(rule)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{assign::assign_labels, tests::*, Centroids};
    use palette::Srgb;

    fn k(value: u32) -> ClusterCount {
        ClusterCount::try_from(value).unwrap()
    }

    #[test]
    fn means_of_checkerboard() {
        let pixels = checkerboard();
        let image = ImageRef::new(&pixels, 2, 2).unwrap();
        let labels = LabelGrid { labels: vec![0, 1, 0, 1], dimensions: (2, 2) };

        let means = cluster_means(image, &labels, k(3), EmptyClusterRule::Count);
        assert_eq!(
            means,
            vec![
                ClusterMean::Mean([0.0; 3]),
                ClusterMean::Mean([255.0; 3]),
                ClusterMean::Empty,
            ]
        );
    }

    #[test]
    fn black_sentinel_treats_black_as_empty() {
        let pixels = checkerboard();
        let image = ImageRef::new(&pixels, 2, 2).unwrap();
        let labels = LabelGrid { labels: vec![0, 1, 0, 1], dimensions: (2, 2) };

        let means = cluster_means(image, &labels, k(2), EmptyClusterRule::BlackSentinel);
        assert_eq!(means, vec![ClusterMean::Empty, ClusterMean::Mean([255.0; 3])]);
    }

    #[test]
    fn mean_is_per_channel_average() {
        let pixels = vec![Srgb::new(10, 0, 255), Srgb::new(20, 1, 0), Srgb::new(0, 0, 0)];
        let image = ImageRef::new(&pixels, 3, 1).unwrap();
        let labels = LabelGrid { labels: vec![0, 0, 1], dimensions: (3, 1) };

        let sums = cluster_sums(image, &labels, k(2));
        assert_eq!(sums.counts(), &[2, 1]);

        let means = sums.into_means(EmptyClusterRule::Count);
        assert_eq!(means[0], ClusterMean::Mean([15.0, 0.5, 127.5]));
        assert_eq!(means[1].mean(), Some([0.0; 3]));
    }

    #[test]
    fn counts_sum_to_pixels() {
        let pixels = test_pixels(50 * 20, 8);
        let image = ImageRef::new(&pixels, 50, 20).unwrap();
        let centroids = Centroids::try_from(test_centroids(16, 9)).unwrap();
        let labels = assign_labels(image, &centroids);

        let sums = cluster_sums(image, &labels, k(16));
        assert_eq!(sums.counts().iter().sum::<u32>(), image.num_pixels());
    }

    #[cfg(feature = "threads")]
    #[test]
    fn parallel_matches_single() {
        let pixels = test_pixels(128 * 33, 10);
        let image = ImageRef::new(&pixels, 128, 33).unwrap();
        let centroids = Centroids::try_from(test_centroids(24, 11)).unwrap();
        let labels = assign_labels(image, &centroids);

        assert_eq!(
            cluster_sums(image, &labels, k(24)),
            cluster_sums_par(image, &labels, k(24))
        );
    }
}
