//! Stack management module
//!
//! This module implements the core stacked branch functionality:
//! - Declared stack configuration (branch trees) and its on-disk store
//! - Status tree computation (activity, effective parents, ahead/behind)
//! - Update engine (merge and rebase propagation)
//! - Conflict resolution detection
//! - Push/pull orchestration

pub mod config;
pub mod conflict;
pub mod status;
pub mod sync;
pub mod update;

pub use config::{BranchNode, StackConfig, StackConfigStore};
pub use conflict::{wait_for_conflict_resolution, ConflictResolution};
pub use status::{
    compute_status, BranchActivity, BranchDetail, ParentBranchStatus, SourceBranchDetail,
    StackStatus,
};
pub use update::{UpdateEngine, UpdateOptions};
