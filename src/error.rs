//! Error types for invalid configuration, malformed input, and frame export.

use thiserror::Error;

/// The options given to a [`Flow`](crate::Flow) cannot be used to run it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The number of clusters is zero or above [`MAX_CLUSTERS`](crate::MAX_CLUSTERS).
    #[error("cluster count must be between 1 and 256, got {0}")]
    ClusterCount(u32),

    /// The number of iterations is zero.
    #[error("iteration count must be at least 1")]
    ZeroIterations,

    /// The checkpoint interval is zero.
    #[error("perturbation checkpoint interval must be at least 1")]
    ZeroCheckpointInterval,

    /// A perturbation would never take a step.
    #[error("perturbation step count must be at least 1")]
    ZeroPerturbationSteps,

    /// The output frame rate is zero.
    #[error("frame rate must be at least 1")]
    ZeroFrameRate,

    /// More clusters would be perturbed at a checkpoint than exist.
    #[error("perturbation batch size {batch} exceeds the cluster count {clusters}")]
    BatchTooLarge {
        /// The configured batch size.
        batch: u32,
        /// The configured number of clusters.
        clusters: u32,
    },

    /// A blend factor is not a finite number in `0.0..=1.0`.
    #[error("{name} must be a finite number between 0 and 1, got {value}")]
    BlendFactor {
        /// Which factor is invalid.
        name: &'static str,
        /// The offending value.
        value: f32,
    },

    /// The explicitly provided initial centroids do not match the cluster count.
    #[error("expected {expected} initial centroids, got {actual}")]
    InitialCentroids {
        /// The configured number of clusters.
        expected: u32,
        /// The number of centroids provided.
        actual: usize,
    },

    /// An explicitly provided initial centroid has a channel that is infinite or `NaN`.
    #[error("initial centroid {index} has a non-finite channel")]
    NonFiniteCentroid {
        /// The index of the offending centroid.
        index: usize,
        /// Its channels.
        centroid: [f32; 3],
    },
}

/// The input image is missing, empty, or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The image has no pixels.
    #[error("image is empty ({width}x{height})")]
    Empty {
        /// Width of the image.
        width: u32,
        /// Height of the image.
        height: u32,
    },

    /// The number of pixels does not equal `width * height`.
    #[error("expected {expected} pixels for the given dimensions, got {actual}")]
    LengthMismatch {
        /// `width * height`.
        expected: usize,
        /// The actual number of pixels or bytes.
        actual: usize,
    },

    /// The raw buffer is not 3 channels per pixel.
    #[error("expected 3 color channels, got {0}")]
    ChannelDepth(usize),

    /// The image has more than [`MAX_PIXELS`](crate::MAX_PIXELS) pixels.
    #[error("image has more than {} pixels", crate::MAX_PIXELS)]
    TooLarge,
}

/// A failure that aborts the whole frame sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    /// Invalid options.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Invalid input image.
    #[error("invalid input image: {0}")]
    Input(#[from] InputError),
}

/// Writing the rendered frames failed.
#[cfg(feature = "image")]
#[derive(Debug, Error)]
pub enum ExportError {
    /// There were no frames to write.
    #[error("no frames to export")]
    NoFrames,

    /// The frame rate is zero.
    #[error("frame rate must be at least 1")]
    ZeroFrameRate,

    /// Encoding a frame failed.
    #[error("encode error: {0}")]
    Encode(#[from] image::ImageError),

    /// Creating the output file or directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
