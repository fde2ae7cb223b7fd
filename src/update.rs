//! Moves each centroid by exactly one of three rules per iteration.
//!
//! In priority order:
//! 1. Perturbation drift: blend towards the perturbation target by the perturbation factor,
//!    then count down the perturbation.
//! 2. Average pull: blend towards the cluster's mean color by the pull factor.
//! 3. No-op: a cluster without pixels and without a perturbation stays put.

use crate::{aggregate::ClusterMean, perturb::Scheduler, Centroids};

/// The rule that moved a centroid in a given iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateRule {
    /// The centroid drifted towards its perturbation target.
    Drift,
    /// The centroid was pulled towards its cluster's mean color.
    Pull,
    /// The centroid did not move.
    Hold,
}

/// Blend factors for the two moving rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendFactors {
    /// The fraction of the way to the mean color moved by [`UpdateRule::Pull`].
    pub pull: f32,
    /// The fraction of the way to the target moved by [`UpdateRule::Drift`].
    pub perturbation: f32,
}

impl Default for BlendFactors {
    fn default() -> Self {
        Self { pull: 0.04, perturbation: 0.08 }
    }
}

#[inline]
fn blend(from: [f32; 3], to: [f32; 3], factor: f32) -> [f32; 3] {
    let mut out = from;
    for c in 0..3 {
        out[c] += factor * (to[c] - from[c]);
    }
    out
}

/// Produces the next centroids from the current ones.
///
/// `means` must have one entry per centroid. Perturbation records that take a step
/// are counted down, and cleared after their last step.
/// Returns the new centroids and the rule applied to each cluster.
#[must_use]
pub fn update_centroids(
    centroids: &Centroids,
    means: &[ClusterMean],
    scheduler: &mut Scheduler,
    factors: BlendFactors,
) -> (Centroids, Vec<UpdateRule>) {
    let (next, rules) = centroids
        .as_slice()
        .iter()
        .zip(means)
        .enumerate()
        .map(|(j, (&centroid, &mean))| {
            if let Some(perturbation) = scheduler.get(j) {
                scheduler.advance(j);
                (
                    blend(centroid, perturbation.target, factors.perturbation),
                    UpdateRule::Drift,
                )
            } else if let ClusterMean::Mean(mean) = mean {
                (blend(centroid, mean, factors.pull), UpdateRule::Pull)
            } else {
                (centroid, UpdateRule::Hold)
            }
        })
        .unzip();

    (Centroids::new_unchecked(next), rules)
}
