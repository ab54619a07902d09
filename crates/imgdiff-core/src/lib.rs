//! Image comparison engines over RGBA8 buffers.
//!
//! - [`compare_pixels`]: YIQ perceptual delta with optional anti-aliasing
//!   suppression, rendered into a diff image.
//! - [`ssim`] / [`ssim_map`]: structural similarity (direct, integral and
//!   multi-scale).
//! - [`gmsd`] / [`gmsd_map`]: gradient magnitude similarity deviation.
//!
//! Every call is synchronous and allocation-local. Callers that pick a
//! metric at runtime go through [`DiffEngine`].

pub mod antialiasing;
pub mod engine;
pub mod error;
pub mod gmsd;
pub mod image;
mod luma;
pub mod options;
pub mod pixel;
pub mod render;
mod score;
pub mod ssim;
pub mod yiq;

pub use engine::{DiffEngine, EngineReport, GmsdEngine, PixelEngine, SsimEngine};
pub use error::{DiffError, Result};
pub use gmsd::{gmsd, gmsd_map};
pub use image::{Image, ImageRef};
pub use options::{
    ComparisonOptions, Downsample, GmsdOptions, MapStyle, Metric, SsimOptions, SsimVariant,
    WindowShape,
};
pub use pixel::{ComparisonVerdict, PixelClassification, Reason, classify_pixels, compare_pixels};
pub use render::{render_classification, render_score_map};
pub use score::{ScoreMap, SimilarityResult};
pub use ssim::{ssim, ssim_map};
