//! Sparse voxel storage and concurrent access.
//!
//! - [`LabelLayer`]: installed blocks, read by all workers during a pass
//! - [`StagingBuffer`]: blocks created during a pass, installed at fold-back
//! - [`HashedLockBank`]: per-voxel write serialization without per-voxel locks
//! - [`VoxelRay`]: voxels traversed by a sensor ray

pub mod block;
pub mod layer;
pub mod lock_bank;
pub mod raycaster;
pub mod staging;

pub use block::LabelBlock;
pub use layer::LabelLayer;
pub use lock_bank::{HashedLockBank, spatial_hash};
pub use raycaster::{RayConfig, VoxelRay};
pub use staging::{BlockCursor, StagingBuffer};
