use anyhow::Result;
use kube::{Api, Client};
use macpool_controller_core::ObjectStore;
use macpool_controller_k8s_api::VirtualMachine;

/// Reads previously persisted objects straight from the API server.
#[derive(Clone)]
pub struct ClusterStore {
    client: Client,
}

impl ClusterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ObjectStore for ClusterStore {
    async fn get_virtual_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<VirtualMachine>> {
        Api::<VirtualMachine>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
            .map_err(Into::into)
    }
}
