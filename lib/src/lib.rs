#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![allow(clippy::many_single_char_names)]
#![doc = include_str!("../../README.md")]

/// Points as read from a scan, scalar fields and colored clouds.
pub mod cloud;
/// Palettes mapping normalized scalars to RGB.
pub mod color;
/// Error taxonomy shared by every stage.
pub mod error;
/// Spatial hashing used for neighborhood queries.
pub(crate) mod grid;
/// Load point clouds and meshes, save meshes.
pub mod io;
/// Triangle meshes and their statistics.
pub mod mesh;
/// Min-max normalization and diagnostics.
pub mod normalize;
pub mod pipeline;
pub mod reconstruct;
#[cfg(test)]
mod test;

pub use cloud::PointCloud;
pub use cloud::ScalarField;
pub use error::Error;
pub use error::ReconstructionFailure;
pub use error::Result;
pub use mesh::Mesh;
pub use mesh::MeshInfo;
pub use pipeline::Config;
pub use pipeline::Orchestrator;
pub use reconstruct::Algorithm;
pub use reconstruct::Variant;
