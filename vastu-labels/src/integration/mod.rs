//! Batch integration: candidates, assignment and the parallel voxel passes.
//!
//! A batch of segments flows through three phases:
//!
//! ```text
//! segments ─► candidates ─► assignment ─► bundle ─► surface pass ─► fold-back
//!             (1 thread)    (1 thread)              (n threads)     (1 thread)
//!                                                 ─► clearing pass ─► fold-back
//! ```

pub mod assignment;
pub mod backend;
pub mod bundler;
pub mod candidates;
pub mod driver;

pub use assignment::{SegmentAssignment, apply_assignments, resolve_assignments};
pub use backend::{RayTraversalBackend, ReconstructionBackend, SurfaceSample};
pub use bundler::{RayLimits, RayPass, VoxelBundle, WorkItem};
pub use candidates::{OverlapTable, SegmentCandidates, compute_segment_candidates};
pub use driver::{ParallelIntegrator, PassContext, PassStats};
