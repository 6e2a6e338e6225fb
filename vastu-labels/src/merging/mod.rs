//! Label merging driven by cross-batch co-occurrence.
//!
//! Candidate generation records in the [`PairwiseConfidenceLedger`] every
//! pair of labels that both cover a large share of one segment. Once a pair
//! has co-occurred in more than `pairwise_confidence_threshold` segments,
//! [`merge_labels`] rewrites the smaller label to the larger everywhere.

pub mod executor;
pub mod ledger;

pub use executor::{LabelMerge, merge_labels, swap_labels};
pub use ledger::{LabelPair, PairwiseConfidenceLedger};
