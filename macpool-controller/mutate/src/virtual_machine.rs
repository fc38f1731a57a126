use crate::patch;
use json_patch::Patch;
use kube::{core::admission::Operation, ResourceExt};
use macpool_controller_core::{AdmissionError, MacAllocator, ObjectStore, TransactionTimestamp};
use macpool_controller_k8s_api::{
    deletion_in_progress, Interface, ObjectMeta, VirtualMachine, MAC_POOL_FINALIZER,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Mutates virtual machines at admission time.
///
/// A create allocates MACs for a name the cluster has not seen and installs
/// the pool finalizer; an update reconciles MACs only when the interface
/// list actually changed. Every decision is made against the previously
/// persisted version fetched from the [`ObjectStore`].
#[derive(Clone)]
pub struct VirtualMachineMutator {
    allocator: Arc<dyn MacAllocator>,
    store: Arc<dyn ObjectStore>,
}

impl VirtualMachineMutator {
    pub fn new(allocator: Arc<dyn MacAllocator>, store: Arc<dyn ObjectStore>) -> Self {
        Self { allocator, store }
    }

    /// Dispatches on the admission operation, mutating a working copy in
    /// place, and returns the patches for the mutations introduced here.
    /// Operations other than create and update pass through unmodified;
    /// deletion-time cleanup belongs to the pool reconciler.
    pub async fn admit(
        &self,
        operation: &Operation,
        namespace: Option<&str>,
        mut vm: VirtualMachine,
    ) -> Result<Patch, AdmissionError> {
        let original = vm.clone();

        if vm.metadata.namespace.is_none() {
            vm.metadata.namespace = namespace.map(str::to_string);
        }
        vm.metadata.annotations.get_or_insert_with(Default::default);

        match operation {
            Operation::Create => self.mutate_create(&mut vm).await?,
            Operation::Update => self.mutate_update(&mut vm).await?,
            _ => {}
        }

        patch::virtual_machine_patches(&original, &vm)
    }

    async fn mutate_create(&self, vm: &mut VirtualMachine) -> Result<(), AdmissionError> {
        let namespace = vm.namespace().unwrap_or_default();
        let name = vm.name_any();
        debug!(%namespace, %name, "got a create virtual machine event");

        let existing = self
            .store
            .get_virtual_machine(&namespace, &name)
            .await
            .map_err(AdmissionError::Lookup)?;
        if existing.is_some() {
            // The API server will reject the duplicate create on its own;
            // there is nothing to allocate for it.
            debug!(%namespace, %name, "virtual machine already exists; skipping allocation");
            return Ok(());
        }

        let timestamp = TransactionTimestamp::now();
        timestamp.apply(&mut vm.metadata);

        if deletion_in_progress(&vm.metadata) {
            // A stale create racing a concurrent deletion of the same name.
            debug!(%namespace, %name, "virtual machine is being deleted; skipping allocation");
            return Ok(());
        }

        self.allocator
            .allocate_virtual_machine_macs(vm, &timestamp)
            .await
            .map_err(AdmissionError::Allocation)?;
        ensure_finalizer(&mut vm.metadata);

        info!(%namespace, %name, %timestamp, "allocated MAC addresses for a new virtual machine");
        Ok(())
    }

    async fn mutate_update(&self, vm: &mut VirtualMachine) -> Result<(), AdmissionError> {
        let namespace = vm.namespace().unwrap_or_default();
        let name = vm.name_any();
        debug!(%namespace, %name, "got an update virtual machine event");

        let previous = match self
            .store
            .get_virtual_machine(&namespace, &name)
            .await
            .map_err(AdmissionError::Lookup)?
        {
            Some(previous) => previous,
            // Removed while the update was in flight; nothing to reconcile.
            None => return Ok(()),
        };

        if !spec_changed(&previous, vm) {
            return Ok(());
        }

        let timestamp = TransactionTimestamp::now();
        timestamp.apply(&mut vm.metadata);

        if interfaces_changed(&previous, vm) {
            self.allocator
                .reconcile_virtual_machine_macs(&previous, vm, &timestamp)
                .await
                .map_err(AdmissionError::Allocation)?;
            info!(%namespace, %name, %timestamp, "reconciled MAC addresses for an updated virtual machine");
        }

        Ok(())
    }
}

/// True when anything in the spec subtree changed. Metadata churns on every
/// write and is deliberately excluded; an unrelated spec edit still earns a
/// fresh timestamp for traceability, without triggering reconciliation.
pub fn spec_changed(previous: &VirtualMachine, current: &VirtualMachine) -> bool {
    previous.spec != current.spec
}

/// True when the interface list itself changed, which is the only signal
/// that MACs may need to be allocated or released.
pub fn interfaces_changed(previous: &VirtualMachine, current: &VirtualMachine) -> bool {
    interfaces(previous) != interfaces(current)
}

fn interfaces(vm: &VirtualMachine) -> &[Interface] {
    &vm.spec.template.spec.domain.devices.interfaces
}

/// Appends the pool finalizer unless it is already present anywhere in the
/// list. Removal is the deletion-time reconciler's job; this engine never
/// takes the token away.
pub fn ensure_finalizer(meta: &mut ObjectMeta) {
    let finalizers = meta.finalizers.get_or_insert_with(Vec::new);
    if finalizers.iter().any(|f| f == MAC_POOL_FINALIZER) {
        return;
    }
    finalizers.push(MAC_POOL_FINALIZER.to_string());
}
