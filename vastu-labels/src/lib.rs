//! # VastuLabels
//!
//! Incremental label fusion into a sparse voxel map.
//!
//! ## Overview
//!
//! Batches of segmented 3D points are fused into a block-sparse voxel grid.
//! Every voxel carries one label and a confidence counter, and every
//! observed surface region keeps a stable integer label across batches taken
//! from different viewpoints:
//!
//! - **Candidates**: each segment is looked up in the map; overlapping labels
//!   are counted, unseen segments get a fresh label
//! - **Assignment**: the largest overlaps win, one label per segment
//! - **Integration**: rays are written in parallel under hashed voxel locks;
//!   new blocks are staged and installed after the workers join
//! - **Merging**: labels that keep co-occurring across batches are unified
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vastu_labels::{FusionConfig, Segment, SegmentMap, Transformation};
//!
//! let mut map = SegmentMap::new(FusionConfig::default())?;
//!
//! let mut segments = vec![Segment::new(pose, points, colors)];
//! let batch = map.integrate_segments(&mut segments)?;
//! println!("segment 0 → {}", batch.assignments[0].label);
//!
//! // Periodically
//! for merge in map.merge_labels() {
//!     println!("{} merged into {}", merge.superseded, merge.survivor);
//! }
//! ```
//!
//! ## Concurrency
//!
//! Integration runs in three ordered phases per batch: single-threaded
//! candidate generation and assignment, a parallel voxel pass, and a
//! single-threaded fold-back. Exclusive borrows keep merges and swaps out of
//! the parallel pass.

#![warn(missing_docs)]

// Core types
pub mod core;

// Sparse storage, locking and ray traversal
pub mod grid;

// Candidates, assignment and parallel passes
pub mod integration;

// Pairwise ledger and label rewrites
pub mod merging;

// Unified configuration
pub mod config;

// Phase timing
pub mod timing;

mod error;

use std::time::Instant;

use glam::Vec3;

pub use crate::core::{
    BlockIndex, Color, ConfidencePolicy, GlobalVoxelIndex, GridGeometry, Label, LabelCounter,
    LabelCounts, Segment, Transformation, VoxelState,
};

pub use config::{ConfigError, ConfigLoadError, FusionConfig};

pub use error::{FusionError, Result};

pub use grid::LabelLayer;

pub use integration::{
    OverlapTable, RayTraversalBackend, ReconstructionBackend, SegmentAssignment, SurfaceSample,
};

pub use merging::{LabelMerge, LabelPair, PairwiseConfidenceLedger};

pub use timing::{PhaseTimer, PhaseTiming};

use integration::{
    ParallelIntegrator, PassContext, PassStats, RayLimits, RayPass, VoxelBundle,
};

/// Result of integrating one point cloud
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrationResult {
    /// Points rejected by the ray length limits
    pub dropped_points: usize,
    /// Unique end voxels integrated
    pub work_items: usize,
    /// Voxel writes
    pub voxel_updates: usize,
    /// Voxels skipped by anti-grazing
    pub grazing_skips: usize,
    /// Writes that replaced a voxel's label
    pub labels_assigned: usize,
    /// Writes that reinforced a voxel's label
    pub labels_reinforced: usize,
    /// Writes that contested a voxel's label
    pub labels_contested: usize,
    /// Blocks installed at fold-back
    pub blocks_allocated: usize,
}

impl IntegrationResult {
    /// Merge another result into this one
    pub fn merge(&mut self, other: &IntegrationResult) {
        self.dropped_points += other.dropped_points;
        self.work_items += other.work_items;
        self.voxel_updates += other.voxel_updates;
        self.grazing_skips += other.grazing_skips;
        self.labels_assigned += other.labels_assigned;
        self.labels_reinforced += other.labels_reinforced;
        self.labels_contested += other.labels_contested;
        self.blocks_allocated += other.blocks_allocated;
    }

    fn add_pass(&mut self, stats: &PassStats, blocks_allocated: usize) {
        self.work_items += stats.work_items;
        self.voxel_updates += stats.voxel_updates;
        self.grazing_skips += stats.grazing_skips;
        self.labels_assigned += stats.assigned;
        self.labels_reinforced += stats.reinforced;
        self.labels_contested += stats.contested;
        self.blocks_allocated += blocks_allocated;
    }
}

/// Result of integrating a batch of segments
#[derive(Clone, Debug, Default)]
pub struct BatchResult {
    /// Label committed to each non-empty segment, by segment index
    pub assignments: Vec<SegmentAssignment>,
    /// Combined integration of all segments
    pub integration: IntegrationResult,
}

impl BatchResult {
    /// Labels minted during this batch
    pub fn fresh_labels(&self) -> Vec<Label> {
        self.assignments
            .iter()
            .filter(|a| a.fresh)
            .map(|a| a.label)
            .collect()
    }
}

/// Label map with batch integration and merging.
///
/// Owns all engine state: the label layer, the highest-issued counter, label
/// counts, the pairwise ledger and the worker pool.
pub struct SegmentMap<B: ReconstructionBackend = RayTraversalBackend> {
    config: FusionConfig,
    backend: B,
    layer: LabelLayer,
    integrator: ParallelIntegrator,
    counter: LabelCounter,
    counts: LabelCounts,
    ledger: PairwiseConfidenceLedger,
    timer: PhaseTimer,
}

impl SegmentMap<RayTraversalBackend> {
    /// Create an empty map with the built-in ray traversal backend.
    pub fn new(config: FusionConfig) -> Result<Self> {
        let backend = RayTraversalBackend::from_config(&config);
        Self::with_backend(config, backend)
    }
}

impl<B: ReconstructionBackend> SegmentMap<B> {
    /// Create an empty map driving an external reconstruction backend.
    pub fn with_backend(config: FusionConfig, backend: B) -> Result<Self> {
        if let Err(e) = config.validate() {
            log::warn!("Rejected label map configuration: {}", e);
            return Err(e.into());
        }

        let geometry = config.grid.geometry();
        if *backend.geometry() != geometry {
            let e = ConfigError::BackendMismatch {
                grid: geometry.voxel_size(),
                backend: backend.geometry().voxel_size(),
            };
            log::warn!("Rejected reconstruction backend: {}", e);
            return Err(e.into());
        }

        let integrator = ParallelIntegrator::new(&config)?;
        log::info!(
            "Label map: voxel size {} m, {} voxels per side, {} integrator threads",
            geometry.voxel_size(),
            geometry.voxels_per_side(),
            integrator.threads()
        );

        Ok(Self {
            layer: LabelLayer::new(geometry),
            integrator,
            counter: LabelCounter::new(),
            counts: LabelCounts::new(),
            ledger: PairwiseConfidenceLedger::new(),
            timer: PhaseTimer::new(),
            config,
            backend,
        })
    }

    /// Mint a label that has never been issued.
    pub fn fresh_label(&self) -> Result<Label> {
        self.counter.mint()
    }

    /// Highest label issued or observed so far.
    pub fn highest_label(&self) -> Label {
        self.counter.highest()
    }

    /// Assign one label to every segment of a batch and integrate them.
    ///
    /// Each non-empty segment's `labels` are overwritten with its assigned
    /// label. Empty segments are left untouched.
    ///
    /// Fails only when the label space is exhausted. No voxel, segment or
    /// ledger entry is changed in that case, but labels minted before the
    /// failure stay consumed.
    pub fn integrate_segments(&mut self, segments: &mut [Segment]) -> Result<BatchResult> {
        let start = Instant::now();
        let mut table = OverlapTable::new();
        let mut co_occurrences = PairwiseConfidenceLedger::new();
        for (index, segment) in segments.iter().enumerate() {
            integration::compute_segment_candidates(
                index,
                segment,
                &self.layer,
                &mut table,
                &mut co_occurrences,
                &self.counter,
                &self.config.labels,
            )?;
        }
        let assignments = integration::resolve_assignments(table, segments, &self.counter)?;
        self.ledger.absorb(co_occurrences);
        integration::apply_assignments(segments, &assignments);
        self.timer.record("candidates", start.elapsed());

        let mut result = IntegrationResult::default();
        for segment in segments.iter().filter(|s| s.is_labeled()) {
            let integrated = self.integrate_point_cloud(
                &segment.transform,
                &segment.points_c,
                &segment.colors,
                &segment.labels,
                false,
            );
            result.merge(&integrated);
        }

        log::debug!(
            "Integrated {} segments: {} fresh labels, {} voxel updates, {} blocks allocated",
            assignments.len(),
            assignments.iter().filter(|a| a.fresh).count(),
            result.voxel_updates,
            result.blocks_allocated
        );

        Ok(BatchResult {
            assignments,
            integration: result,
        })
    }

    /// Integrate one labeled point cloud.
    ///
    /// With `freespace` set every ray only clears. Panics if the slices
    /// differ in length or a label is [`Label::UNOBSERVED`].
    pub fn integrate_point_cloud(
        &mut self,
        transform: &Transformation,
        points_c: &[Vec3],
        colors: &[Color],
        labels: &[Label],
        freespace: bool,
    ) -> IntegrationResult {
        assert_eq!(
            points_c.len(),
            colors.len(),
            "points and colors must have equal length"
        );
        assert_eq!(
            points_c.len(),
            labels.len(),
            "points and labels must have equal length"
        );
        assert!(
            labels.iter().all(Label::is_observed),
            "integrated points must carry a label"
        );

        let bundle = VoxelBundle::build(
            transform,
            points_c,
            freespace,
            &RayLimits::from_config(&self.config.integrator),
            self.layer.geometry(),
        );
        let mut result = IntegrationResult {
            dropped_points: bundle.dropped(),
            ..Default::default()
        };

        for pass in [RayPass::Surface, RayPass::Clearing] {
            let start = Instant::now();
            let stats = {
                let ctx = PassContext {
                    backend: &self.backend,
                    layer: &self.layer,
                    counter: &self.counter,
                    transform,
                    points_c,
                    colors,
                    labels,
                    bundle: &bundle,
                };
                self.integrator.integrate_pass(pass, &ctx)
            };
            self.timer.record(pass.phase_name(), start.elapsed());

            let start = Instant::now();
            let installed = self
                .integrator
                .fold_back(&mut self.layer, &mut self.backend);
            self.timer
                .record("inserting_missed_blocks", start.elapsed());

            self.counts.apply(&stats.deltas);
            result.add_pass(&stats, installed);
        }

        log::trace!(
            "Point cloud: {} points, {} dropped, {} work items, {} voxel updates",
            points_c.len(),
            result.dropped_points,
            result.work_items,
            result.voxel_updates
        );
        result
    }

    /// Merge every label pair whose co-occurrence exceeds the threshold.
    ///
    /// Does nothing unless pairwise merging is enabled.
    pub fn merge_labels(&mut self) -> Vec<LabelMerge> {
        if !self.config.labels.enable_pairwise_confidence_merging {
            return Vec::new();
        }
        let start = Instant::now();
        let merges = merging::merge_labels(
            &self.layer,
            &mut self.ledger,
            &mut self.counts,
            self.config.labels.pairwise_confidence_threshold,
        );
        self.timer.record("merge", start.elapsed());
        merges
    }

    /// Rewrite every voxel labeled `old` to `new`. Returns voxels rewritten.
    ///
    /// Panics if either label is [`Label::UNOBSERVED`].
    pub fn swap_labels(&mut self, old: Label, new: Label) -> usize {
        assert!(
            old.is_observed() && new.is_observed(),
            "swapped labels must be observed labels"
        );
        let voxels = merging::swap_labels(&self.layer, old, new);
        if voxels > 0 {
            self.counter.observe(new);
            self.counts.transfer(old, new, voxels);
        }
        voxels
    }

    /// Labels carried by at least one voxel, ascending.
    pub fn active_labels(&self) -> Vec<Label> {
        self.counts.active_labels()
    }

    /// Per-label voxel counts.
    pub fn label_counts(&self) -> &LabelCounts {
        &self.counts
    }

    /// Label state of the voxel containing a world point.
    pub fn voxel_at(&self, point: Vec3) -> Option<VoxelState> {
        self.layer.voxel_by_point(point).map(|v| v.state())
    }

    /// Label state of a voxel by grid index.
    pub fn voxel(&self, voxel: GlobalVoxelIndex) -> Option<VoxelState> {
        self.layer.voxel(voxel).map(|v| v.state())
    }

    /// Blocks changed since the last call, clearing their flags.
    pub fn take_updated_blocks(&self) -> Vec<BlockIndex> {
        self.layer.take_updated_blocks()
    }

    /// Installed label blocks.
    pub fn layer(&self) -> &LabelLayer {
        &self.layer
    }

    /// Pairwise co-occurrence evidence.
    pub fn ledger(&self) -> &PairwiseConfidenceLedger {
        &self.ledger
    }

    /// Reconstruction backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Active configuration.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Blocks waiting for fold-back (zero between calls).
    pub fn staged_blocks(&self) -> usize {
        self.integrator.staged_blocks()
    }

    /// Per-phase timing since creation.
    pub fn timings(&self) -> Vec<PhaseTiming> {
        self.timer.stats()
    }
}

impl<B: ReconstructionBackend + std::fmt::Debug> std::fmt::Debug for SegmentMap<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentMap")
            .field("backend", &self.backend)
            .field("blocks", &self.layer.block_count())
            .field("highest_label", &self.counter.highest())
            .field("ledger_pairs", &self.ledger.len())
            .field("integrator", &self.integrator)
            .finish()
    }
}
