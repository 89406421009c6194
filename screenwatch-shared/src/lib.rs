pub mod api;
pub mod domain;
pub mod path;
pub mod status;

pub use domain::{FamilyKey, UsageSnapshot};
pub use status::Liveness;
