//! Core types for label fusion.
//!
//! ## Type Categories
//!
//! ### Identities
//! - [`Label`]: Integer identity of a surface region (0 = unobserved)
//! - [`LabelCounter`]: Highest-issued label, minted and raised atomically
//! - [`LabelCounts`]: Voxels currently carrying each label
//!
//! ### Addressing
//! - [`GridGeometry`]: Voxel size and block layout
//! - [`GlobalVoxelIndex`] / [`BlockIndex`]: Integer grid coordinates
//!
//! ### Observations
//! - [`Segment`]: Points sharing one label, with transform and colors
//! - [`Transformation`]: Rigid sensor-to-world transform
//! - [`Color`]: RGBA with weighted blending
//!
//! ### Voxels
//! - [`LabelVoxel`]: Shared voxel storage (atomic fields)
//! - [`VoxelState`]: Label and confidence snapshot with the update rule

mod color;
mod coords;
mod label;
mod segment;
mod transform;
mod voxel;

pub use color::Color;
pub use coords::{BlockIndex, GlobalVoxelIndex, GridGeometry};
pub use label::{Label, LabelCountDeltas, LabelCounter, LabelCounts};
pub use segment::Segment;
pub use transform::Transformation;
pub use voxel::{ConfidencePolicy, LabelVoxel, VoxelState, VoxelTransition};
