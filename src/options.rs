//! Contains the [`FlowOptions`] builder struct.

use crate::{Centroids, ClusterCount, ConfigError};

/// How a cluster with no pixels assigned to it is recognized by the average pull rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyClusterRule {
    /// A cluster is empty only if no pixels were assigned to it.
    ///
    /// A cluster whose pixels average to pure black is still pulled towards black.
    #[default]
    Count,
    /// A cluster is treated as empty if its average color is exactly `(0, 0, 0)`.
    ///
    /// This reproduces a quirk of earlier versions of the animation, where an all-zero
    /// average doubled as the "no pixels" marker, so pure black clusters never move
    /// through the average pull rule.
    BlackSentinel,
}

/// A builder struct to specify the parameters of a [`Flow`](crate::Flow).
///
/// All options have defaults matching the classic animation:
/// 8 clusters, 300 frames at 30 fps, and 3 clusters perturbed every 30 frames.
///
/// # Examples
/// ```
/// # use kflow::FlowOptions;
/// let options = FlowOptions::new()
///     .clusters(12)
///     .iterations(600)
///     .pull_factor(0.05)
///     .seed(42);
/// assert!(options.validate().is_ok());
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct FlowOptions {
    /// The number of clusters `K`.
    pub(crate) clusters: u32,
    /// The number of iterations, which is also the number of frames.
    pub(crate) iterations: u32,
    /// Perturbations are triggered on every iteration that is a multiple of this.
    pub(crate) checkpoint_interval: u32,
    /// How many distinct clusters are perturbed at each checkpoint.
    pub(crate) perturbation_batch: u32,
    /// How many iterations a perturbation lasts.
    /// `None` means the same as `checkpoint_interval`.
    pub(crate) perturbation_steps: Option<u32>,
    /// The blend factor towards a cluster's average color.
    pub(crate) pull_factor: f32,
    /// The blend factor towards a perturbation target.
    pub(crate) perturbation_factor: f32,
    /// The target frame rate of the animation.
    pub(crate) fps: u32,
    /// The seed value for the random number generator.
    pub(crate) seed: u64,
    /// The initial colors/centroids to use.
    pub(crate) initial_centroids: Option<Centroids>,
    /// How empty clusters are detected.
    pub(crate) empty_cluster_rule: EmptyClusterRule,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowOptions {
    /// Creates a new [`FlowOptions`] with default values.
    pub const fn new() -> Self {
        Self {
            clusters: 8,
            iterations: 300,
            checkpoint_interval: 30,
            perturbation_batch: 3,
            perturbation_steps: None,
            pull_factor: 0.04,
            perturbation_factor: 0.08,
            fps: 30,
            seed: 0,
            initial_centroids: None,
            empty_cluster_rule: EmptyClusterRule::Count,
        }
    }

    /// Sets the number of clusters/colors `K`.
    ///
    /// The default is `8`.
    pub fn clusters(mut self, clusters: u32) -> Self {
        self.clusters = clusters;
        self
    }

    /// Sets the number of iterations. Exactly one frame is produced per iteration.
    ///
    /// The default is `300`.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the checkpoint interval: new perturbations are started on every iteration
    /// whose index is a multiple of this value, starting with iteration `0`.
    ///
    /// The default is `30`.
    pub fn checkpoint_interval(mut self, interval: u32) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Sets how many distinct clusters are perturbed at each checkpoint.
    /// A batch size of `0` turns perturbations off.
    ///
    /// The default is `3`.
    pub fn perturbation_batch(mut self, batch: u32) -> Self {
        self.perturbation_batch = batch;
        self
    }

    /// Sets how many iterations a perturbation drifts its cluster for.
    ///
    /// By default, this is the same as the checkpoint interval.
    pub fn perturbation_steps(mut self, steps: u32) -> Self {
        self.perturbation_steps = Some(steps);
        self
    }

    /// Sets the fraction of the distance to its average color a centroid moves each iteration.
    ///
    /// The default is `0.04`.
    pub fn pull_factor(mut self, factor: f32) -> Self {
        self.pull_factor = factor;
        self
    }

    /// Sets the fraction of the distance to its perturbation target a centroid moves each iteration.
    ///
    /// The default is `0.08`.
    pub fn perturbation_factor(mut self, factor: f32) -> Self {
        self.perturbation_factor = factor;
        self
    }

    /// Sets the target frame rate of the animation.
    ///
    /// The default is `30`.
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Sets the checkpoint interval so that perturbations start on the beat of a song.
    ///
    /// The interval becomes `round(fps * 60 / bpm)` frames (at least `1`),
    /// so set [`FlowOptions::fps`] first.
    /// Non-positive or non-finite `bpm` values leave the options unchanged.
    pub fn sync_to_bpm(mut self, bpm: f32) -> Self {
        if bpm.is_finite() && bpm > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let frames = (f64::from(self.fps) * 60.0 / f64::from(bpm)).round() as u32;
            self.checkpoint_interval = frames.max(1);
        }
        self
    }

    /// Sets the seed value for the random number generator.
    ///
    /// The default seed is `0`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the initial centroids instead of drawing them at random.
    /// Their count must equal the number of clusters.
    pub fn initial_centroids(mut self, centroids: Centroids) -> Self {
        self.initial_centroids = Some(centroids);
        self
    }

    /// Sets how clusters without pixels are detected.
    ///
    /// The default is [`EmptyClusterRule::Count`].
    pub fn empty_cluster_rule(mut self, rule: EmptyClusterRule) -> Self {
        self.empty_cluster_rule = rule;
        self
    }

    /// Returns the number of iterations.
    #[must_use]
    pub const fn num_iterations(&self) -> u32 {
        self.iterations
    }

    /// Returns the target frame rate.
    #[must_use]
    pub const fn frame_rate(&self) -> u32 {
        self.fps
    }

    /// Returns the effective number of steps a perturbation lasts.
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.perturbation_steps.unwrap_or(self.checkpoint_interval)
    }

    /// Checks that the options can be used to run a [`Flow`](crate::Flow).
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<ClusterCount, ConfigError> {
        let k = ClusterCount::try_from(self.clusters)?;

        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::ZeroCheckpointInterval);
        }
        if self.steps() == 0 {
            return Err(ConfigError::ZeroPerturbationSteps);
        }
        if self.fps == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if self.perturbation_batch > self.clusters {
            return Err(ConfigError::BatchTooLarge {
                batch: self.perturbation_batch,
                clusters: self.clusters,
            });
        }

        for (name, value) in [
            ("pull factor", self.pull_factor),
            ("perturbation factor", self.perturbation_factor),
        ] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(ConfigError::BlendFactor { name, value });
            }
        }

        if let Some(centroids) = &self.initial_centroids {
            if centroids.len() != k.as_usize() {
                return Err(ConfigError::InitialCentroids {
                    expected: self.clusters,
                    actual: centroids.len(),
                });
            }

            if let Some((index, &centroid)) = centroids
                .as_slice()
                .iter()
                .enumerate()
                .find(|(_, centroid)| !centroid.iter().all(|c| c.is_finite()))
            {
                return Err(ConfigError::NonFiniteCentroid { index, centroid });
            }
        }

        Ok(k)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = FlowOptions::default();
        assert_eq!(options.validate(), ClusterCount::try_from(8u32));
        assert_eq!(options.num_iterations(), 300);
        assert_eq!(options.frame_rate(), 30);
        assert_eq!(options.steps(), 30);
    }

    #[test]
    fn rejects_bad_counts() {
        assert_eq!(
            FlowOptions::new().clusters(0).perturbation_batch(0).validate(),
            Err(ConfigError::ClusterCount(0))
        );
        assert_eq!(
            FlowOptions::new().iterations(0).validate(),
            Err(ConfigError::ZeroIterations)
        );
        assert_eq!(
            FlowOptions::new().checkpoint_interval(0).validate(),
            Err(ConfigError::ZeroCheckpointInterval)
        );
        assert_eq!(
            FlowOptions::new().perturbation_steps(0).validate(),
            Err(ConfigError::ZeroPerturbationSteps)
        );
        assert_eq!(
            FlowOptions::new().fps(0).validate(),
            Err(ConfigError::ZeroFrameRate)
        );
    }

    #[test]
    fn batch_cannot_exceed_clusters() {
        assert_eq!(
            FlowOptions::new().clusters(2).validate(),
            Err(ConfigError::BatchTooLarge { batch: 3, clusters: 2 })
        );
        assert!(FlowOptions::new().clusters(3).validate().is_ok());
        assert!(FlowOptions::new().clusters(1).perturbation_batch(0).validate().is_ok());
    }

    #[test]
    fn rejects_bad_blend_factors() {
        assert!(matches!(
            FlowOptions::new().pull_factor(f32::NAN).validate(),
            Err(ConfigError::BlendFactor { name: "pull factor", .. })
        ));
        assert!(matches!(
            FlowOptions::new().perturbation_factor(1.5).validate(),
            Err(ConfigError::BlendFactor { name: "perturbation factor", .. })
        ));
    }

    #[test]
    fn initial_centroids_must_match_k() {
        let centroids = Centroids::try_from(vec![[0.0; 3]; 4]).unwrap();
        assert_eq!(
            FlowOptions::new().initial_centroids(centroids).validate(),
            Err(ConfigError::InitialCentroids { expected: 8, actual: 4 })
        );
    }

    #[test]
    fn initial_centroids_must_be_finite() {
        let centroids = Centroids::try_from(vec![[100.0; 3], [1.0, f32::INFINITY, 2.0]]).unwrap();
        assert_eq!(
            FlowOptions::new()
                .clusters(2)
                .perturbation_batch(0)
                .initial_centroids(centroids)
                .validate(),
            Err(ConfigError::NonFiniteCentroid {
                index: 1,
                centroid: [1.0, f32::INFINITY, 2.0],
            })
        );

        let centroids = Centroids::try_from(vec![[f32::NAN; 3]]).unwrap();
        assert!(matches!(
            FlowOptions::new()
                .clusters(1)
                .perturbation_batch(0)
                .initial_centroids(centroids)
                .validate(),
            Err(ConfigError::NonFiniteCentroid { index: 0, .. })
        ));
    }

    #[test]
    fn bpm_sets_interval() {
        let options = FlowOptions::new().fps(25).sync_to_bpm(95.0);
        assert_eq!(options.checkpoint_interval, 16);
        assert_eq!(options.steps(), 16);

        let options = FlowOptions::new().sync_to_bpm(0.0);
        assert_eq!(options.checkpoint_interval, 30);

        let options = FlowOptions::new().fps(1).sync_to_bpm(100_000.0);
        assert_eq!(options.checkpoint_interval, 1);
    }
}
