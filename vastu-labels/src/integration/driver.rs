//! Parallel integration driver.
//!
//! One pass integrates one work list of a [`VoxelBundle`]:
//!
//! ```text
//! items:    [0] [1] [2] [3] [4] [5] [6] ...
//! thread 0:  ●           ●           ●        item i → thread i % n
//! thread 1:      ●           ●
//! thread 2:          ●           ●
//!                         │
//!                  join (reduce stats)
//!                         │
//!               fold_back (single-threaded)
//! ```
//!
//! Each work item is merged into one [`SurfaceSample`] and written to every
//! voxel its ray traverses. A voxel write takes the lock bank entry for that
//! voxel; a block missing from the layer is created in the staging buffer.
//! Label count changes are collected per worker and returned with the stats,
//! so the shared counts are only touched after the join.

use glam::Vec3;
use rayon::prelude::*;

use super::backend::{ReconstructionBackend, SurfaceSample};
use super::bundler::{RayPass, VoxelBundle, WorkItem};
use crate::config::{ConfigError, FusionConfig};
use crate::core::{
    Color, ConfidencePolicy, Label, LabelCountDeltas, LabelCounter, Transformation,
    VoxelTransition,
};
use crate::grid::{BlockCursor, HashedLockBank, LabelLayer, StagingBuffer};

/// Read-only inputs of one pass.
pub struct PassContext<'a, B> {
    /// Reconstruction engine.
    pub backend: &'a B,
    /// Installed blocks.
    pub layer: &'a LabelLayer,
    /// Highest-issued label, raised by voxel writes.
    pub counter: &'a LabelCounter,
    /// Sensor pose.
    pub transform: &'a Transformation,
    /// Points in sensor frame.
    pub points_c: &'a [Vec3],
    /// Per-point colors.
    pub colors: &'a [Color],
    /// Per-point labels.
    pub labels: &'a [Label],
    /// Work lists for this cloud.
    pub bundle: &'a VoxelBundle,
}

/// What a pass did.
#[derive(Clone, Debug, Default)]
pub struct PassStats {
    /// Work items integrated.
    pub work_items: usize,
    /// Voxel writes performed.
    pub voxel_updates: usize,
    /// Voxels skipped by anti-grazing.
    pub grazing_skips: usize,
    /// Writes that replaced a voxel's label.
    pub assigned: usize,
    /// Writes that reinforced a voxel's label.
    pub reinforced: usize,
    /// Writes that contested a voxel's label.
    pub contested: usize,
    /// Label count changes.
    pub deltas: LabelCountDeltas,
}

impl PassStats {
    #[inline]
    fn record(&mut self, transition: VoxelTransition) {
        self.voxel_updates += 1;
        match transition {
            VoxelTransition::Assigned { .. } => self.assigned += 1,
            VoxelTransition::Reinforced => self.reinforced += 1,
            VoxelTransition::Contested => self.contested += 1,
        }
        self.deltas.record(transition);
    }

    /// Combine two workers' stats.
    pub fn merge(mut self, other: PassStats) -> PassStats {
        self.work_items += other.work_items;
        self.voxel_updates += other.voxel_updates;
        self.grazing_skips += other.grazing_skips;
        self.assigned += other.assigned;
        self.reinforced += other.reinforced;
        self.contested += other.contested;
        self.deltas.merge(other.deltas);
        self
    }
}

/// Worker pool, lock bank and staging buffer shared by every pass.
pub struct ParallelIntegrator {
    threads: usize,
    pool: Option<rayon::ThreadPool>,
    locks: HashedLockBank,
    staging: StagingBuffer,
    enable_anti_grazing: bool,
    policy: ConfidencePolicy,
}

impl ParallelIntegrator {
    /// Build the worker pool for a configuration.
    ///
    /// With one thread no pool is created and passes run on the caller.
    pub fn new(config: &FusionConfig) -> Result<Self, ConfigError> {
        let threads = config.integrator.integrator_threads;
        if threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        let pool = if threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("label-integrator-{}", i))
                .build()
                .map_err(|e| ConfigError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            threads,
            pool,
            locks: HashedLockBank::new(config.integrator.lock_bank_bits),
            staging: StagingBuffer::new(config.grid.geometry()),
            enable_anti_grazing: config.integrator.enable_anti_grazing,
            policy: config.labels.confidence_policy(),
        })
    }

    /// Worker count.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Blocks waiting for fold-back.
    pub fn staged_blocks(&self) -> usize {
        self.staging.len()
    }

    /// Lock bank used for voxel writes.
    pub fn lock_bank(&self) -> &HashedLockBank {
        &self.locks
    }

    /// Integrate one work list. Returns after every worker has finished.
    pub fn integrate_pass<B: ReconstructionBackend>(
        &self,
        pass: RayPass,
        ctx: &PassContext<'_, B>,
    ) -> PassStats {
        if ctx.bundle.items(pass).is_empty() {
            return PassStats::default();
        }
        match &self.pool {
            None => self.integrate_partition(pass, ctx, 0),
            Some(pool) => pool.install(|| {
                (0..self.threads)
                    .into_par_iter()
                    .map(|thread_idx| self.integrate_partition(pass, ctx, thread_idx))
                    .reduce(PassStats::default, PassStats::merge)
            }),
        }
    }

    /// Install staged blocks into the layer and let the backend do the same.
    ///
    /// Returns the number of label blocks installed.
    pub fn fold_back<B: ReconstructionBackend>(
        &mut self,
        layer: &mut LabelLayer,
        backend: &mut B,
    ) -> usize {
        backend.install_staged_blocks();
        self.staging.fold_into(layer)
    }

    fn integrate_partition<B: ReconstructionBackend>(
        &self,
        pass: RayPass,
        ctx: &PassContext<'_, B>,
        thread_idx: usize,
    ) -> PassStats {
        let mut stats = PassStats::default();
        let mut cursor = BlockCursor::new(ctx.layer, &self.staging);

        for item in ctx
            .bundle
            .items(pass)
            .iter()
            .skip(thread_idx)
            .step_by(self.threads)
        {
            self.integrate_item(pass, ctx, item, &mut cursor, &mut stats);
        }
        stats
    }

    fn integrate_item<B: ReconstructionBackend>(
        &self,
        pass: RayPass,
        ctx: &PassContext<'_, B>,
        item: &WorkItem,
        cursor: &mut BlockCursor<'_>,
        stats: &mut PassStats,
    ) {
        let Some(sample) = merge_sample(ctx, item, pass.is_clearing()) else {
            return;
        };
        stats.work_items += 1;

        for voxel in ctx
            .backend
            .traverse_ray(sample.origin, sample.point_g, sample.clearing)
        {
            if self.enable_anti_grazing
                && (sample.clearing || voxel != item.voxel)
                && ctx.bundle.is_surface_voxel(voxel)
            {
                stats.grazing_skips += 1;
                continue;
            }

            let label_voxel = cursor.voxel(voxel);
            let _guard = self.locks.lock(voxel);
            ctx.backend.update_voxel(voxel, &sample);
            let transition = label_voxel.observe(sample.label, 1, self.policy, ctx.counter);
            stats.record(transition);
        }
    }
}

/// Merge a work item's points into one weighted sample.
///
/// Clearing items use only their first point.
fn merge_sample<B: ReconstructionBackend>(
    ctx: &PassContext<'_, B>,
    item: &WorkItem,
    clearing: bool,
) -> Option<SurfaceSample> {
    let &first = item.points.first()?;

    let mut point_c = ctx.points_c[first];
    let mut color = Color::default();
    let mut weight = 0.0f32;
    let mut label = Label::UNOBSERVED;

    for &i in &item.points {
        let point_weight = ctx.backend.point_weight(ctx.points_c[i]);
        let total = weight + point_weight;
        if total > 0.0 {
            point_c = (point_c * weight + ctx.points_c[i] * point_weight) / total;
        }
        color = Color::blend(color, weight, ctx.colors[i], point_weight);
        weight = total;
        label = ctx.labels[i];

        if clearing {
            break;
        }
    }

    Some(SurfaceSample {
        origin: ctx.transform.position(),
        point_g: ctx.transform.transform_point(point_c),
        color,
        weight,
        label,
        clearing,
    })
}

impl std::fmt::Debug for ParallelIntegrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelIntegrator")
            .field("threads", &self.threads)
            .field("locks", &self.locks.len())
            .field("staged_blocks", &self.staging.len())
            .field("enable_anti_grazing", &self.enable_anti_grazing)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VoxelState;
    use crate::integration::backend::RayTraversalBackend;
    use crate::integration::bundler::RayLimits;
    use glam::IVec3;

    fn config(threads: usize) -> FusionConfig {
        let mut config = FusionConfig::default().with_threads(threads);
        config.grid.voxel_size = 0.1;
        config.grid.voxels_per_side = 4;
        config.integrator.voxel_carving_enabled = false;
        config.integrator.use_const_weight = true;
        config
    }

    struct Cloud {
        transform: Transformation,
        points: Vec<Vec3>,
        colors: Vec<Color>,
        labels: Vec<Label>,
    }

    fn plane_cloud(label: Label) -> Cloud {
        let mut points = Vec::new();
        for i in 0..12 {
            for j in 0..12 {
                points.push(Vec3::new(i as f32 * 0.1 - 0.55, j as f32 * 0.1 - 0.55, 1.05));
            }
        }
        let n = points.len();
        Cloud {
            transform: Transformation::IDENTITY,
            points,
            colors: vec![Color::rgb(10, 20, 30); n],
            labels: vec![label; n],
        }
    }

    fn run(threads: usize, cloud: &Cloud) -> (LabelLayer, PassStats) {
        let config = config(threads);
        let mut backend = RayTraversalBackend::from_config(&config);
        let mut layer = LabelLayer::new(config.grid.geometry());
        let mut integrator = ParallelIntegrator::new(&config).unwrap();
        let counter = LabelCounter::new();

        let bundle = VoxelBundle::build(
            &cloud.transform,
            &cloud.points,
            false,
            &RayLimits::from_config(&config.integrator),
            &config.grid.geometry(),
        );
        let stats = {
            let ctx = PassContext {
                backend: &backend,
                layer: &layer,
                counter: &counter,
                transform: &cloud.transform,
                points_c: &cloud.points,
                colors: &cloud.colors,
                labels: &cloud.labels,
                bundle: &bundle,
            };
            integrator.integrate_pass(RayPass::Surface, &ctx)
        };
        integrator.fold_back(&mut layer, &mut backend);
        assert_eq!(integrator.staged_blocks(), 0);
        assert_eq!(counter.highest(), Label(3));
        (layer, stats)
    }

    #[test]
    fn test_surface_pass_writes_band() {
        let cloud = plane_cloud(Label(3));
        let (layer, stats) = run(1, &cloud);

        // 144 items, each ray covers z voxels 9..=11.
        assert_eq!(stats.work_items, 144);
        assert_eq!(stats.voxel_updates, 144 * 3);
        assert_eq!(stats.assigned, 144 * 3);
        assert_eq!(stats.deltas.get(Label(3)), 144 * 3);
        assert_eq!(
            layer.voxel(IVec3::new(0, 0, 10)).map(|v| v.state()),
            Some(VoxelState::new(Label(3), 1))
        );
        assert!(layer.voxel(IVec3::new(0, 0, 12)).is_none_or(|v| !v.state().is_observed()));
    }

    #[test]
    fn test_thread_count_does_not_change_state() {
        let cloud = plane_cloud(Label(3));
        let (single, _) = run(1, &cloud);
        let (multi, stats) = run(4, &cloud);

        assert_eq!(stats.voxel_updates, 144 * 3);
        assert_eq!(single.block_count(), multi.block_count());

        let mut a: Vec<_> = single.observed_voxels().map(|(v, s)| ((v.x, v.y, v.z), s)).collect();
        let mut b: Vec<_> = multi.observed_voxels().map(|(v, s)| ((v.x, v.y, v.z), s)).collect();
        a.sort_by_key(|(v, _)| *v);
        b.sort_by_key(|(v, _)| *v);
        assert_eq!(a, b);
    }

    #[test]
    fn test_merge_sample_weights_points() {
        let config = config(1);
        let backend = RayTraversalBackend::from_config(&config);
        let layer = LabelLayer::new(config.grid.geometry());
        let counter = LabelCounter::new();
        let transform = Transformation::from_translation(Vec3::new(0.0, 0.0, 1.0));
        let points = vec![Vec3::new(0.01, 0.0, 1.0), Vec3::new(0.03, 0.0, 1.0)];
        let colors = vec![Color::rgb(0, 0, 0), Color::rgb(200, 100, 50)];
        let labels = vec![Label(5), Label(5)];
        let bundle = VoxelBundle::default();
        let ctx = PassContext {
            backend: &backend,
            layer: &layer,
            counter: &counter,
            transform: &transform,
            points_c: &points,
            colors: &colors,
            labels: &labels,
            bundle: &bundle,
        };
        let item = WorkItem {
            voxel: IVec3::new(0, 0, 20),
            points: vec![0, 1],
        };

        let sample = merge_sample(&ctx, &item, false).unwrap();
        assert!((sample.point_g - Vec3::new(0.02, 0.0, 2.0)).length() < 1e-5);
        assert_eq!(sample.color, Color::rgb(100, 50, 25));
        assert_eq!(sample.weight, 2.0);
        assert_eq!(sample.label, Label(5));
        assert_eq!(sample.origin, Vec3::new(0.0, 0.0, 1.0));

        let clearing = merge_sample(&ctx, &item, true).unwrap();
        assert!((clearing.point_g - Vec3::new(0.01, 0.0, 2.0)).length() < 1e-5);
        assert_eq!(clearing.weight, 1.0);
    }
}
