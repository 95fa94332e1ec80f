// Compose stacks discovered from the Docker daemon via bollard

mod inspect;

pub use inspect::{PROJECT_LABEL, SERVICE_LABEL};

use crate::models::Stack;
use bollard::Docker;
use bollard::query_parameters::{InspectContainerOptions, ListContainersOptions};
use futures_util::future::join_all;
use std::collections::HashMap;
use tracing::warn;

/// Seconds before a Docker API request is abandoned.
const DOCKER_TIMEOUT_SECS: u64 = 30;

pub struct DockerRepo {
    docker: Docker,
}

impl DockerRepo {
    /// Connect to the daemon: the given unix socket, or bollard's defaults when `None`.
    pub fn connect(socket: Option<&str>) -> anyhow::Result<Self> {
        let docker = match socket {
            Some(path) => {
                Docker::connect_with_unix(path, DOCKER_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)?
            }
            None => Docker::connect_with_unix_defaults()?,
        };
        Ok(Self { docker })
    }

    /// All compose projects known to the daemon, running or not.
    pub async fn list_stacks(&self) -> anyhow::Result<Vec<Stack>> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![PROJECT_LABEL.to_string()]);

        let options = ListContainersOptions {
            all: true,
            filters: Some(filters),
            ..Default::default()
        };
        let summaries = self.docker.list_containers(Some(options)).await?;

        let ids: Vec<String> = summaries.into_iter().filter_map(|c| c.id).collect();
        let inspected = join_all(ids.iter().map(|id| {
            self.docker
                .inspect_container(id, None::<InspectContainerOptions>)
        }))
        .await;

        let mut containers = Vec::with_capacity(inspected.len());
        for (id, result) in ids.iter().zip(inspected) {
            match result {
                Ok(c) => containers.push(c),
                // The container may be gone since listing.
                Err(e) => warn!(
                    error = %e,
                    container = %id,
                    operation = "inspect_container",
                    "Docker inspect failed"
                ),
            }
        }

        let stacks = inspect::group_stacks(&containers);
        tracing::debug!(
            operation = "list_stacks",
            containers = containers.len(),
            stacks = stacks.len(),
            "stacks refreshed"
        );
        Ok(stacks)
    }
}
