#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod virtual_machine;

pub use self::virtual_machine::{
    Devices, DomainSpec, Interface, VirtualMachine, VirtualMachineInstanceSpec,
    VirtualMachineInstanceTemplateSpec, VirtualMachineSpec,
};
pub use k8s_openapi::{
    api::core::v1::{Pod, PodSpec},
    apimachinery::pkg::apis::meta::v1::Time,
};
pub use kube::api::{ObjectMeta, ResourceExt};

/// Annotation recording the timestamp of the last allocation pass on a
/// virtual machine. Refreshed only when the spec actually changed, so the
/// pool reconciler can correlate allocations with admission requests.
pub const TRANSACTION_TIMESTAMP_ANNOTATION: &str = "macpool.io/transaction-timestamp";

/// Multus network-selection annotation carrying a pod's secondary-network
/// MAC assignments.
pub const NETWORKS_ANNOTATION: &str = "k8s.v1.cni.cncf.io/networks";

/// Finalizer marking a virtual machine as holding pool MACs that must be
/// released before its deletion completes.
pub const MAC_POOL_FINALIZER: &str = "macpool.io/mac-pool-release";

/// Returns the transaction-timestamp annotation value, if any.
pub fn transaction_timestamp(meta: &ObjectMeta) -> Option<&str> {
    meta.annotations
        .as_ref()?
        .get(TRANSACTION_TIMESTAMP_ANNOTATION)
        .map(String::as_str)
}

/// An object with a deletion timestamp is owned by the deletion-time
/// reconciler; admission must not touch its allocations anymore.
pub fn deletion_in_progress(meta: &ObjectMeta) -> bool {
    meta.deletion_timestamp.is_some()
}
