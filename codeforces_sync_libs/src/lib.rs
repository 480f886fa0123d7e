pub mod activity;
pub mod codeforces;
pub mod notify;
pub mod store;
pub mod sync;

pub use sync::{BatchReport, SyncConfig, SyncError, SyncReport, Synchronizer};
