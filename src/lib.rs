//! Animated k-means color flow.
//!
//! `kflow` quantizes an image into `K` representative colors using an iterative k-means
//! variant in RGB space and renders every iteration as a frame. Instead of jumping straight
//! to each cluster's mean, centroids are pulled a small step towards it, so the frames show
//! the palette slowly settling. At fixed checkpoints a few clusters are handed a random
//! target color and drift towards it for a while before rejoining the ordinary dynamics.
//!
//! # Features
//! - `threads`: exposes parallel versions of the per-iteration stages via [`rayon`].
//!   These give bit-identical results to the single threaded versions.
//! - `image`: enables integration with the [`image`] crate, including GIF and PNG export.
//! - `cli`: builds the `kflow` command line tool.
//!
//! # Example
//! ```no_run
//! # use kflow::{Flow, FlowOptions, ImageRef};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("some image")?.into_rgb8();
//!
//! let options = FlowOptions::new()
//!     .clusters(8)
//!     .iterations(300)
//!     .seed(42);
//!
//! let frames = Flow::new(ImageRef::try_from(&img)?, options)?.run();
//! kflow::export::write_gif(&frames, 30, "flow.gif")?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod error;
mod options;
mod types;

pub mod aggregate;
pub mod assign;
pub mod flow;
pub mod perturb;
pub mod render;
pub mod update;

#[cfg(feature = "image")]
pub mod export;

pub use error::*;
pub use flow::Flow;
pub use options::*;
pub use types::*;

/// The maximum supported image size in number of pixels is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;

/// The maximum supported number of clusters is `256`, so that every label fits in a `u8`.
pub const MAX_CLUSTERS: u16 = u8::MAX as u16 + 1;
