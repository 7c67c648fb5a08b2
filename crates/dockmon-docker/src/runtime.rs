use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, KillContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StatsOptions,
};
use bollard::image::{ListImagesOptions, RemoveImageOptions};
use bollard::Docker;
use futures::StreamExt;

use dockmon_types::{ContainerSummary, ImageSummary, MemoryStats};

use crate::error::RuntimeError;

/// The container-runtime collaborator.
///
/// Everything the dashboard knows about remote state comes through this
/// seam; the sync service and the UI never talk to Docker directly.
#[async_trait]
pub trait Runtime: Send + Sync + 'static {
    /// Current containers, without stats populated
    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// One-shot memory usage numbers for a single container
    async fn memory_stats(&self, id: &str) -> Result<MemoryStats, RuntimeError>;

    /// Writable-layer sizes keyed by container ID
    async fn disk_usage(&self) -> Result<HashMap<String, i64>, RuntimeError>;

    async fn list_images(&self) -> Result<Vec<ImageSummary>, RuntimeError>;

    async fn kill_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove_image(&self, id: &str) -> Result<(), RuntimeError>;

    /// Collected stdout+stderr log text
    async fn logs(&self, id: &str) -> Result<String, RuntimeError>;

    /// Pretty-printed JSON inspect document
    async fn inspect_container(&self, id: &str) -> Result<String, RuntimeError>;

    async fn inspect_image(&self, id: &str) -> Result<String, RuntimeError>;
}

/// Bollard-backed [`Runtime`] implementation.
///
/// Connection configuration comes from the environment (`DOCKER_HOST`
/// and friends), matching the CLI's behavior.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all: include_stopped,
            ..Default::default()
        };
        let list = self.docker.list_containers(Some(options)).await?;

        Ok(list
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                command: c.command.unwrap_or_default(),
                status: c.status.unwrap_or_default(),
                state: c.state.unwrap_or_default(),
                memory: MemoryStats::default(),
                disk_usage: 0,
            })
            .collect())
    }

    async fn memory_stats(&self, id: &str) -> Result<MemoryStats, RuntimeError> {
        let mut stream = self.docker.stats(
            id,
            Some(StatsOptions {
                stream: false,
                ..Default::default()
            }),
        );

        match stream.next().await {
            Some(Ok(stats)) => Ok(MemoryStats {
                usage: stats.memory_stats.usage.unwrap_or(0),
                limit: stats.memory_stats.limit.unwrap_or(0),
            }),
            Some(Err(e)) => Err(e.into()),
            None => Err(RuntimeError::EmptyResponse),
        }
    }

    async fn disk_usage(&self) -> Result<HashMap<String, i64>, RuntimeError> {
        // Listing with size populates the writable-layer size per container
        let options = ListContainersOptions::<String> {
            all: true,
            size: true,
            ..Default::default()
        };
        let list = self.docker.list_containers(Some(options)).await?;

        Ok(list
            .into_iter()
            .filter_map(|c| Some((c.id?, c.size_rw.unwrap_or(0))))
            .collect())
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, RuntimeError> {
        let options = ListImagesOptions::<String>::default();
        let list = self.docker.list_images(Some(options)).await?;

        Ok(list
            .into_iter()
            .map(|image| {
                let (repo, tag) = image
                    .repo_tags
                    .last()
                    .filter(|t| t.as_str() != "<none>:<none>")
                    .and_then(|t| t.rsplit_once(':'))
                    .map(|(r, t)| (r.to_string(), t.to_string()))
                    .unwrap_or_default();
                ImageSummary {
                    id: image.id,
                    repo,
                    tag,
                    created: image.created,
                }
            })
            .collect())
    }

    async fn kill_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .kill_container(id, Some(KillContainerOptions { signal: "SIGKILL" }))
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .remove_container(id, None::<RemoveContainerOptions>)
            .await?;
        Ok(())
    }

    async fn remove_image(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker.remove_image(id, None::<RemoveImageOptions>, None).await?;
        Ok(())
    }

    async fn logs(&self, id: &str) -> Result<String, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.logs(id, Some(options));

        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            out.push_str(&chunk?.to_string());
        }
        Ok(out)
    }

    async fn inspect_container(&self, id: &str) -> Result<String, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(serde_json::to_string_pretty(&inspect)?)
    }

    async fn inspect_image(&self, id: &str) -> Result<String, RuntimeError> {
        let inspect = self.docker.inspect_image(id).await?;
        Ok(serde_json::to_string_pretty(&inspect)?)
    }
}
