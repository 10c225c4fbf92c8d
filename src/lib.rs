//! # fluence-volume library
//!
//! This crate decodes time-gated photon fluence volumes written by Monte-Carlo
//! light-transport simulators (MCX and friends) in the JNIfTI container
//! format, and prepares them for side-by-side comparison across optical media.
//!
//! A `.jnii` file is JSON. Its `NIFTIData` section is a JData annotated array:
//! a declared shape, an element type and a base-64 encoded, zlib compressed
//! payload. Decoding yields a [`FluenceVolume`] with dimensions
//! `[X, Y, Z, T]`, `T` being the number of time gates.
//!
//! The pipeline:
//!  - [`ContainerReader`] parses the container
//!  - [`payload::decode`] recovers the `f32` tensor
//!  - [`DatasetAggregator`] keeps decoded datasets keyed by material label
//!  - [`normalizer::compute_gate_ranges`] finds one `(min, max)` per gate over
//!    the union of all datasets, so every medium shares a colour scale
//!  - [`FluenceVolume::slice`] and [`stats`] extract planes and summaries
//!  - [`render`] turns slices into PNG images
//!
//! Several files can be decoded in parallel using rayon through
//! [`DatasetLoader::load_from_paths`]; registration stays serial.
//!
//! # Examples
//!
//! ## Comparing media on a shared scale
//!
//! Load two results, compute per-gate ranges across both and save the
//! Z-middle slice of the first gate of each.
//!
//! ```no_run
//! # use fluence_volume::{DatasetAggregator, DatasetLoader, normalizer, render};
//! let mut datasets = DatasetAggregator::new();
//! for (label, path) in [("Air", "air/air_result.jnii"), ("Water", "water/water_result.jnii")] {
//!     let entry = DatasetLoader::load_from_path(label, path)
//!         .expect("should have decoded the container");
//!     datasets.insert(entry).expect("labels should be unique");
//! }
//! let ranges = normalizer::compute_gate_ranges(datasets.all())
//!     .expect("volumes should share a shape");
//! let options = render::RenderOptions::default();
//! for entry in datasets.all() {
//!     let slice = entry.volume.center_slice(0).expect("gate 0 exists");
//!     let image = render::slice_to_image(&slice, Some(ranges[0].bounds()), &options)
//!         .expect("slice should not be empty");
//!     render::save(&image, format!("{}_gate1.png", entry.label)).expect("should write png");
//! }
//! ```

pub mod aggregator;
pub mod container;
pub mod dataset_loader;
pub mod enums;
pub mod error;
pub mod normalizer;
pub mod payload;
pub mod render;
pub mod report;
pub mod simulation;
pub mod stats;
pub mod volume;

pub use aggregator::{DatasetAggregator, DatasetEntry};
pub use container::{ArraySection, ContainerReader, ContainerRecord};
pub use dataset_loader::DatasetLoader;
pub use enums::{Axis, ColorMap, Compression, Interpolation, Origin};
pub use error::{FluenceError, Result};
pub use normalizer::GateRange;
pub use stats::{GateStats, Stats};
pub use volume::FluenceVolume;
