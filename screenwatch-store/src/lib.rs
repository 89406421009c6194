//! File-backed registry and telemetry store shared by the collector and the viewer.
//!
//! Every operation is one load -> mutate -> save cycle over the whole document,
//! serialized across processes by an advisory lock on a sidecar file.

mod credential;
pub mod identity;
pub mod storage;
pub mod telemetry;

pub use identity::{IdentityError, generate_family_key};
pub use storage::models::{ChildRecord, Document, ParentRecord};
pub use storage::{StorageError, Store};
pub use telemetry::{RecordedUsage, family_usage};
