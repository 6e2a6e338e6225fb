//! Label-carrying voxel and its update rule.
//!
//! Each voxel keeps a single (label, confidence) pair instead of a per-label
//! histogram. An incoming observation either reinforces the current label,
//! contests it, or (once confidence has dropped to zero) replaces it:
//!
//! ```text
//! incoming L, increment c
//!
//! voxel.label == L          → confidence = min(confidence + c, cap)
//! confidence == 0           → (L, c), highest-issued counter raised to L
//! otherwise                 → confidence = confidence - c
//! ```
//!
//! Under oscillating evidence a voxel may flip back and forth; that is the
//! expected behavior of a constant-space plurality vote.

use std::sync::atomic::{AtomicU32, Ordering};

use super::label::{Label, LabelCounter};

/// Snapshot of a voxel's label state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VoxelState {
    /// Current label ([`Label::UNOBSERVED`] if never written).
    pub label: Label,
    /// Evidence counter backing `label`.
    pub confidence: u32,
}

/// What an observation did to a voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelTransition {
    /// The voxel adopted `label`, replacing `previous`.
    Assigned {
        /// Label held before the write.
        previous: Label,
        /// Label held after the write.
        label: Label,
    },
    /// Confidence in the current label grew.
    Reinforced,
    /// Confidence in a different label shrank.
    Contested,
}

/// How confidence accumulates on reinforcement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfidencePolicy {
    /// Upper bound on confidence, if capping is enabled.
    pub cap: Option<u32>,
}

impl ConfidencePolicy {
    /// Confidence grows without bound.
    pub fn uncapped() -> Self {
        Self { cap: None }
    }

    /// Confidence saturates at `cap`.
    pub fn capped(cap: u32) -> Self {
        Self { cap: Some(cap) }
    }
}

impl VoxelState {
    /// State of a voxel that was never observed.
    pub const UNOBSERVED: VoxelState = VoxelState {
        label: Label::UNOBSERVED,
        confidence: 0,
    };

    /// Create a state.
    pub fn new(label: Label, confidence: u32) -> Self {
        Self { label, confidence }
    }

    /// Has this voxel ever carried a label?
    #[inline]
    pub fn is_observed(&self) -> bool {
        self.label.is_observed()
    }

    /// Will the next differing observation replace the label?
    #[inline]
    pub fn is_open(&self) -> bool {
        self.confidence == 0
    }

    /// Apply one observation of `label` with confidence `increment`.
    pub fn observe(
        self,
        label: Label,
        increment: u32,
        policy: ConfidencePolicy,
    ) -> (VoxelState, VoxelTransition) {
        if self.label == label {
            let mut confidence = self.confidence.saturating_add(increment);
            if let Some(cap) = policy.cap {
                confidence = confidence.min(cap);
            }
            (VoxelState::new(label, confidence), VoxelTransition::Reinforced)
        } else if self.confidence == 0 {
            (
                VoxelState::new(label, increment),
                VoxelTransition::Assigned {
                    previous: self.label,
                    label,
                },
            )
        } else {
            (
                VoxelState::new(self.label, self.confidence.saturating_sub(increment)),
                VoxelTransition::Contested,
            )
        }
    }
}

/// Voxel storage shared between integration workers.
///
/// Fields are atomics so blocks can be written through shared references.
/// A read-modify-write is only atomic as a whole while the caller holds the
/// lock bank entry for this voxel's grid index.
#[derive(Debug, Default)]
pub struct LabelVoxel {
    label: AtomicU32,
    confidence: AtomicU32,
}

impl LabelVoxel {
    /// Current state.
    #[inline]
    pub fn state(&self) -> VoxelState {
        VoxelState {
            label: Label(self.label.load(Ordering::Relaxed)),
            confidence: self.confidence.load(Ordering::Relaxed),
        }
    }

    /// Overwrite the state.
    #[inline]
    pub fn store(&self, state: VoxelState) {
        self.label.store(state.label.0, Ordering::Relaxed);
        self.confidence.store(state.confidence, Ordering::Relaxed);
    }

    /// Apply one observation. Caller must hold this voxel's lock bank entry.
    ///
    /// When the voxel adopts a label larger than anything issued so far the
    /// counter is raised, so later minting cannot collide with it.
    pub fn observe(
        &self,
        label: Label,
        increment: u32,
        policy: ConfidencePolicy,
        counter: &LabelCounter,
    ) -> VoxelTransition {
        let (next, transition) = self.state().observe(label, increment, policy);
        self.store(next);
        if matches!(transition, VoxelTransition::Assigned { .. }) {
            counter.observe(label);
        }
        transition
    }

    /// Replace the label keeping confidence. Returns true if it matched `old`.
    #[inline]
    pub fn relabel(&self, old: Label, new: Label) -> bool {
        self.label
            .compare_exchange(old.0, new.0, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}
