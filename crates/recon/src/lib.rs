//! `sotamerge-recon`: multi-source summit matching and merge engine.
//!
//! Pure engine crate: receives pre-loaded detection layers and reference
//! entries, returns ranked canonical entities. No CLI or IO dependencies.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod group;
pub mod matcher;
pub mod model;
pub mod rank;
pub mod reference;
pub mod spatial;

pub use config::{MergeConfig, ReconcileConfig, ReconcileMode};
pub use engine::{merge_records, resolve_sources, run_merge, run_reconcile, MergeOutcome};
pub use error::ReconError;
pub use feedback::{CancelFlag, Feedback, NoFeedback};
pub use matcher::{AmbiguousLink, LinkKind, MatchParams, MutualMatcher};
pub use model::{
    CanonicalEntity, MergeResult, MergeSummary, Prominence, ReconcileResult, ReconcileSummary, RunMeta,
    SourceLayer,
};
pub use reference::{ReferenceAction, ReferenceEntry, ReferenceReconciler, RemainderEntry};
pub use spatial::SpatialIndex;
