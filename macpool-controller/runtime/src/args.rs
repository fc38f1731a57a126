use crate::{admission::Admission, metrics::Metrics, store::ClusterStore};
use anyhow::{bail, Result};
use clap::Parser;
use macpool_controller_core::MacAllocator;
use prometheus_client::registry::Registry;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[clap(name = "macpool", about = "A MAC address pool admission controller")]
pub struct Args {
    #[clap(
        long,
        default_value = "macpool=info,warn",
        env = "MACPOOL_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,
}

impl Args {
    #[inline]
    pub async fn parse_and_run(allocator: Arc<dyn MacAllocator>) -> Result<()> {
        Self::parse().run(allocator).await
    }

    pub async fn run(self, allocator: Arc<dyn MacAllocator>) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
        } = self;

        let mut prom = <Registry>::default();
        let metrics = Metrics::register(prom.sub_registry_with_prefix("admission"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_optional_server(Some(server))
            .build()
            .await?;

        let store = ClusterStore::new(runtime.client());
        let admission = Admission::new(allocator, store, metrics);
        let runtime = runtime.spawn_server(move || admission);

        // Block the main thread on the shutdown signal. Once it fires, wait
        // for the background tasks to complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
