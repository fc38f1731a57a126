pub use macpool_controller_core as core;
pub use macpool_controller_k8s_api as k8s;
pub use macpool_controller_mutate as mutate;

mod admission;
mod args;
mod metrics;
mod store;

pub use self::{admission::Admission, args::Args, metrics::Metrics, store::ClusterStore};
