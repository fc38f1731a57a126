use crate::patch;
use json_patch::Patch;
use macpool_controller_core::{AdmissionError, MacAllocator};
use macpool_controller_k8s_api::Pod;
use std::sync::Arc;
use tracing::debug;

/// Mutates pods at admission time.
///
/// Pods only ever see a single allocation pass: the webhook admits each
/// instance once, at creation, and there is no update path for them here.
#[derive(Clone)]
pub struct PodMutator {
    allocator: Arc<dyn MacAllocator>,
}

impl PodMutator {
    pub fn new(allocator: Arc<dyn MacAllocator>) -> Self {
        Self { allocator }
    }

    /// Runs the allocation pass on a working copy of the pod and returns the
    /// patches for the mutations introduced by it. Allocator failure aborts
    /// the whole request; no partial patches escape.
    pub async fn admit(
        &self,
        namespace: Option<&str>,
        mut pod: Pod,
    ) -> Result<Patch, AdmissionError> {
        let original = pod.clone();

        if pod.metadata.namespace.is_none() {
            pod.metadata.namespace = namespace.map(str::to_string);
        }
        pod.metadata.annotations.get_or_insert_with(Default::default);

        debug!(
            namespace = pod.metadata.namespace.as_deref().unwrap_or_default(),
            name = pod.metadata.name.as_deref().unwrap_or_default(),
            "got a pod admission event"
        );

        self.allocator
            .allocate_pod_macs(&mut pod)
            .await
            .map_err(AdmissionError::Allocation)?;

        Ok(patch::pod_patches(&original, &pod))
    }
}
