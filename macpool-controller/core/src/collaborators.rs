use crate::TransactionTimestamp;
use anyhow::Result;
use macpool_controller_k8s_api::{Pod, VirtualMachine};

/// Owns the MAC assignment algorithm and its consistency guarantees.
///
/// Implementations mutate the working copy in place; the engine turns the
/// resulting differences into patches. The engine assumes at most one
/// successful allocation per resource name from the implementation; it takes
/// no lock of its own.
#[async_trait::async_trait]
pub trait MacAllocator: Send + Sync {
    /// Assigns MACs for a pod's secondary networks, recording them in the
    /// pod's network-selection annotation.
    async fn allocate_pod_macs(&self, pod: &mut Pod) -> Result<()>;

    /// Assigns MACs to the interfaces of a virtual machine the cluster has
    /// not seen before.
    async fn allocate_virtual_machine_macs(
        &self,
        vm: &mut VirtualMachine,
        timestamp: &TransactionTimestamp,
    ) -> Result<()>;

    /// Allocates and releases MACs so that `current`'s interfaces match the
    /// pool, given the previously persisted `previous`.
    async fn reconcile_virtual_machine_macs(
        &self,
        previous: &VirtualMachine,
        current: &mut VirtualMachine,
        timestamp: &TransactionTimestamp,
    ) -> Result<()>;
}

/// Read access to the previously persisted version of a resource.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches a virtual machine by namespace and name. `Ok(None)` means the
    /// object does not exist.
    async fn get_virtual_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<VirtualMachine>>;
}
