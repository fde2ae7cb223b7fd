//! The sequence driver that runs the iterations and collects the frames.
//!
//! Every iteration, in order:
//! 1. assign every pixel to its nearest centroid ([`assign`](crate::assign)),
//! 2. compute the mean color of each cluster ([`aggregate`](crate::aggregate)),
//! 3. start new perturbations if this iteration is a checkpoint ([`perturb`](crate::perturb)),
//! 4. move the centroids ([`update`](crate::update)),
//! 5. paint the pixels with the updated centroid colors ([`render`](crate::render)).
//!
//! There is no convergence check; a flow always produces exactly the configured number of frames.

use crate::{
    aggregate::{self, ClusterMean},
    assign,
    perturb::Scheduler,
    render,
    update::{self, BlendFactors, UpdateRule},
    Centroids, ClusterCount, FlowError, FlowOptions, Frame, ImageRef, LabelGrid,
};

use rand::SeedableRng;
use rand_xoshiro::Xoroshiro128PlusPlus;
use tracing::{debug, info};

/// Everything computed during a single iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    /// The index of the iteration, starting at `0`.
    pub index: u32,
    /// The nearest cluster of every pixel, computed from the centroids before the update.
    pub labels: LabelGrid,
    /// The pull signal of every cluster.
    pub means: Vec<ClusterMean>,
    /// The rule that moved each centroid.
    pub rules: Vec<UpdateRule>,
    /// Whether new perturbations were started this iteration.
    pub checkpoint: bool,
    /// The rendered frame.
    pub frame: Frame,
}

/// An animated k-means run over a single image.
///
/// The flow owns all mutable state: the centroids, the perturbation scheduler, and the
/// random number generator. Two flows created with the same image and options
/// produce identical frames.
///
/// # Examples
/// ```
/// # use kflow::{Flow, FlowOptions, ImageRef};
/// # use palette::Srgb;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pixels = vec![Srgb::new(200, 30, 30); 16];
/// let image = ImageRef::new(&pixels, 4, 4)?;
/// let options = FlowOptions::new().clusters(4).iterations(10).seed(7);
///
/// let frames = Flow::new(image, options)?.run();
/// assert_eq!(frames.len(), 10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Flow<'a> {
    /// The source pixels, never modified.
    image: ImageRef<'a>,
    /// The number of clusters.
    k: ClusterCount,
    /// The total number of iterations to run.
    iterations: u32,
    /// The index of the next iteration.
    iteration: u32,
    /// The current centroids.
    centroids: Centroids,
    /// The perturbation records.
    scheduler: Scheduler,
    /// The blend factors of the update rules.
    factors: BlendFactors,
    /// The options the flow was created with.
    options: FlowOptions,
    /// The source of all random draws after initialization.
    rng: Xoroshiro128PlusPlus,
}

impl<'a> Flow<'a> {
    /// Validates the options and draws the initial centroids.
    ///
    /// # Errors
    /// Returns [`FlowError::Config`] if the options are invalid.
    pub fn new(image: ImageRef<'a>, options: FlowOptions) -> Result<Self, FlowError> {
        let k = options.validate()?;

        let mut rng = Xoroshiro128PlusPlus::seed_from_u64(options.seed);
        let centroids = match &options.initial_centroids {
            Some(centroids) => centroids.clone(),
            None => Centroids::random(k, &mut rng),
        };

        let scheduler = Scheduler::new(
            k,
            options.checkpoint_interval,
            options.perturbation_batch,
            options.steps(),
        );

        let (width, height) = image.dimensions();
        info!(
            width,
            height,
            clusters = k.into_inner(),
            iterations = options.iterations,
            seed = options.seed,
            "starting color flow"
        );

        Ok(Self {
            image,
            k,
            iterations: options.iterations,
            iteration: 0,
            centroids,
            scheduler,
            factors: BlendFactors {
                pull: options.pull_factor,
                perturbation: options.perturbation_factor,
            },
            options,
            rng,
        })
    }

    /// Returns the current centroids.
    #[must_use]
    pub fn centroids(&self) -> &Centroids {
        &self.centroids
    }

    /// Returns the perturbation scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Returns the index of the next iteration to run.
    #[must_use]
    pub const fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Returns the number of iterations left to run.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.iterations - self.iteration
    }

    /// Returns the options the flow was created with.
    #[must_use]
    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    /// Moves the centroids and finishes the iteration from the labels and means.
    fn finish(
        &mut self,
        labels: LabelGrid,
        means: Vec<ClusterMean>,
        paint: fn(&LabelGrid, &Centroids) -> Frame,
    ) -> Iteration {
        let index = self.iteration;
        let checkpoint = self.scheduler.trigger(index, &mut self.rng);

        let (centroids, rules) =
            update::update_centroids(&self.centroids, &means, &mut self.scheduler, self.factors);
        self.centroids = centroids;

        let frame = paint(&labels, &self.centroids);

        debug!(
            iteration = index,
            checkpoint,
            perturbed = self.scheduler.active(),
            "frame done"
        );

        self.iteration += 1;
        if self.iteration == self.iterations {
            info!(frames = self.iterations, "color flow finished");
        }

        Iteration { index, labels, means, rules, checkpoint, frame }
    }

    /// Runs the next iteration and returns everything it computed,
    /// or `None` once all iterations have run.
    pub fn step_detailed(&mut self) -> Option<Iteration> {
        if self.iteration >= self.iterations {
            return None;
        }

        let labels = assign::assign_labels(self.image, &self.centroids);
        let means =
            aggregate::cluster_means(self.image, &labels, self.k, self.options.empty_cluster_rule);
        Some(self.finish(labels, means, render::render_frame))
    }

    /// Runs the next iteration and returns its frame,
    /// or `None` once all iterations have run.
    pub fn step(&mut self) -> Option<Frame> {
        self.step_detailed().map(|iteration| iteration.frame)
    }

    /// Returns an iterator that runs the remaining iterations one frame at a time.
    pub fn frames(&mut self) -> Frames<'_, 'a> {
        Frames { flow: self, parallel: false }
    }

    /// Runs all remaining iterations and returns their frames in order.
    #[must_use]
    pub fn run(mut self) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(self.remaining() as usize);
        frames.extend(self.frames());
        frames
    }
}

#[cfg(feature = "threads")]
impl<'a> Flow<'a> {
    /// Runs the next iteration in parallel and returns everything it computed,
    /// or `None` once all iterations have run.
    ///
    /// The result is identical to [`Flow::step_detailed`].
    pub fn step_detailed_par(&mut self) -> Option<Iteration> {
        if self.iteration >= self.iterations {
            return None;
        }

        let labels = assign::assign_labels_par(self.image, &self.centroids);
        let means = aggregate::cluster_means_par(
            self.image,
            &labels,
            self.k,
            self.options.empty_cluster_rule,
        );
        Some(self.finish(labels, means, render::render_frame_par))
    }

    /// Runs the next iteration in parallel and returns its frame,
    /// or `None` once all iterations have run.
    pub fn step_par(&mut self) -> Option<Frame> {
        self.step_detailed_par().map(|iteration| iteration.frame)
    }

    /// Returns an iterator that runs the remaining iterations one frame at a time,
    /// parallelizing the work within each iteration.
    pub fn frames_par(&mut self) -> Frames<'_, 'a> {
        Frames { flow: self, parallel: true }
    }

    /// Runs all remaining iterations in parallel and returns their frames in order.
    ///
    /// Iterations still run one after another; only the work within an iteration is split.
    #[must_use]
    pub fn run_par(mut self) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(self.remaining() as usize);
        frames.extend(self.frames_par());
        frames
    }
}

/// An iterator over the remaining frames of a [`Flow`].
///
/// Each call to `next` runs one iteration.
#[derive(Debug)]
pub struct Frames<'f, 'a> {
    /// The flow being advanced.
    flow: &'f mut Flow<'a>,
    /// Whether to split the work within each iteration across threads.
    #[cfg_attr(not(feature = "threads"), allow(dead_code))]
    parallel: bool,
}

impl<'f, 'a> Iterator for Frames<'f, 'a> {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        #[cfg(feature = "threads")]
        {
            if self.parallel {
                return self.flow.step_par();
            }
        }

        self.flow.step()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.flow.remaining() as usize;
        (remaining, Some(remaining))
    }
}

impl<'f, 'a> ExactSizeIterator for Frames<'f, 'a> {}
