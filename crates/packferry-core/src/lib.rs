//! packferry-core: catalog data model and planner
//!
//! Host and blueprint types, the per-blueprint planner that turns a catalog
//! snapshot into executable plans, and the run-log sink shared with the
//! executor layer.

pub mod model;
pub mod naming;
pub mod planner;
pub mod runlog;
pub mod snapshot;

pub use model::blueprint::{
    Blueprint, BlueprintKind, Destination, Hook, Hooks, Interval, Strategy,
};
pub use model::host::{Availability, Host, SshConfig};
pub use model::plan::{BackupPlan, CloneStrategy, DownloadLocally, Plan};
pub use naming::backup_file_name;
pub use runlog::RunLog;
pub use snapshot::Snapshot;
