//! Scripted color injections.
//!
//! On every checkpoint iteration, a batch of distinct clusters is chosen uniformly at random
//! and each is given a fresh random target color. For the next few iterations those clusters
//! drift towards their target instead of towards their average color.

use crate::ClusterCount;

use rand::{prelude::Distribution, seq::index, Rng};
use rand_distr::Uniform;
use tracing::debug;

/// An active color injection for a single cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perturbation {
    /// The color the cluster drifts towards.
    pub target: [f32; 3],
    /// The number of drift steps left. Always at least `1` while the record exists.
    pub remaining: u32,
}

/// Keeps the optional [`Perturbation`] of every cluster across iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    /// The perturbation record of each cluster, if any.
    records: Vec<Option<Perturbation>>,
    /// Checkpoints are the iterations that are multiples of this.
    interval: u32,
    /// The number of clusters chosen at each checkpoint.
    batch: u32,
    /// The number of steps a new perturbation lasts.
    steps: u32,
}

impl Scheduler {
    /// Creates a scheduler with no active perturbations.
    ///
    /// `interval` and `steps` should be non-zero and `batch` at most `k`;
    /// [`FlowOptions::validate`](crate::FlowOptions::validate) ensures this.
    #[must_use]
    pub fn new(k: ClusterCount, interval: u32, batch: u32, steps: u32) -> Self {
        Self {
            records: vec![None; k.as_usize()],
            interval: interval.max(1),
            batch: batch.min(u32::from(k.into_inner())),
            steps,
        }
    }

    /// Returns whether `iteration` is a checkpoint.
    #[must_use]
    pub const fn is_checkpoint(&self, iteration: u32) -> bool {
        iteration % self.interval == 0
    }

    /// Starts new perturbations if `iteration` is a checkpoint.
    ///
    /// Existing records of the chosen clusters are overwritten, resetting their target
    /// and countdown. Returns whether this was a checkpoint.
    pub fn trigger(&mut self, iteration: u32, rng: &mut impl Rng) -> bool {
        if !self.is_checkpoint(iteration) {
            return false;
        }

        let channel = Uniform::new_inclusive(0.0f32, 255.0);
        let chosen = index::sample(rng, self.records.len(), self.batch as usize);
        for cluster in chosen {
            let target = [0; 3].map(|_| channel.sample(rng));
            debug!(iteration, cluster, ?target, "perturbation started");
            self.records[cluster] = Some(Perturbation { target, remaining: self.steps });
        }

        true
    }

    /// Returns the record of the given cluster.
    #[must_use]
    pub fn get(&self, cluster: usize) -> Option<Perturbation> {
        self.records.get(cluster).copied().flatten()
    }

    /// Returns the records of all clusters.
    #[must_use]
    pub fn records(&self) -> &[Option<Perturbation>] {
        &self.records
    }

    /// Returns the number of clusters currently under perturbation.
    #[must_use]
    pub fn active(&self) -> usize {
        self.records.iter().flatten().count()
    }

    /// Counts down the record of a cluster after it took a drift step,
    /// clearing it when no steps remain.
    pub(crate) fn advance(&mut self, cluster: usize) {
        if let Some(record) = &mut self.records[cluster] {
            record.remaining = record.remaining.saturating_sub(1);
            if record.remaining == 0 {
                self.records[cluster] = None;
            }
        }
    }

    /// Sets the record of a cluster directly.
    #[cfg(test)]
    pub(crate) fn set(&mut self, cluster: usize, record: Option<Perturbation>) {
        self.records[cluster] = record;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoroshiro128PlusPlus;

    fn scheduler(k: u32) -> Scheduler {
        Scheduler::new(ClusterCount::try_from(k).unwrap(), 30, 3, 30)
    }

    #[test]
    fn checkpoint_selects_distinct_clusters() {
        let rng = &mut Xoroshiro128PlusPlus::seed_from_u64(0);
        let mut scheduler = scheduler(8);

        assert!(scheduler.trigger(0, rng));
        assert_eq!(scheduler.active(), 3);
        for record in scheduler.records().iter().flatten() {
            assert_eq!(record.remaining, 30);
            assert!(record.target.iter().all(|c| (0.0..=255.0).contains(c)));
        }
    }

    #[test]
    fn only_triggers_on_checkpoints() {
        let rng = &mut Xoroshiro128PlusPlus::seed_from_u64(1);
        let mut scheduler = scheduler(8);

        for i in 1..30 {
            assert!(!scheduler.trigger(i, rng));
        }
        assert_eq!(scheduler.active(), 0);
        assert!(scheduler.trigger(60, rng));
        assert_eq!(scheduler.active(), 3);
    }

    #[test]
    fn batch_of_all_clusters() {
        let rng = &mut Xoroshiro128PlusPlus::seed_from_u64(2);
        let mut scheduler = Scheduler::new(ClusterCount::try_from(3u32).unwrap(), 30, 3, 5);
        scheduler.trigger(0, rng);
        assert_eq!(scheduler.active(), 3);
    }

    #[test]
    fn retrigger_overwrites_existing_records() {
        let rng = &mut Xoroshiro128PlusPlus::seed_from_u64(3);
        let mut scheduler = Scheduler::new(ClusterCount::try_from(3u32).unwrap(), 10, 3, 30);
        scheduler.trigger(0, rng);
        for cluster in 0..3 {
            for _ in 0..5 {
                scheduler.advance(cluster);
            }
            assert_eq!(scheduler.get(cluster).unwrap().remaining, 25);
        }

        scheduler.trigger(10, rng);
        for cluster in 0..3 {
            assert_eq!(scheduler.get(cluster).unwrap().remaining, 30);
        }
    }

    #[test]
    fn advance_clears_after_last_step() {
        let mut scheduler = scheduler(4);
        scheduler.set(2, Some(Perturbation { target: [1.0; 3], remaining: 2 }));

        scheduler.advance(2);
        assert_eq!(scheduler.get(2).unwrap().remaining, 1);
        scheduler.advance(2);
        assert_eq!(scheduler.get(2), None);

        // no-op without a record
        scheduler.advance(1);
        assert_eq!(scheduler.get(1), None);
    }

    #[test]
    fn same_seed_same_choices() {
        let mut a = scheduler(16);
        let mut b = scheduler(16);
        a.trigger(0, &mut Xoroshiro128PlusPlus::seed_from_u64(9));
        b.trigger(0, &mut Xoroshiro128PlusPlus::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
