// Turn raw Docker inspect responses into stack view models.

use crate::models::{
    ContainerInfo, ContainerState, HealthStatus, HealthcheckSpec, PortConfig, Service, Stack,
    parse_env_list,
};
use crate::ports::port_to_compose;
use bollard::models::{ContainerInspectResponse, PortBinding};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const PROJECT_LABEL: &str = "com.docker.compose.project";
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

const NANOS_PER_CPU: f64 = 1_000_000_000.0;

fn labels(c: &ContainerInspectResponse) -> Option<&HashMap<String, String>> {
    c.config.as_ref()?.labels.as_ref()
}

fn label<'a>(c: &'a ContainerInspectResponse, key: &str) -> Option<&'a str> {
    labels(c)?.get(key).map(String::as_str)
}

/// Runtime view of one container. Exposed for unit tests.
pub(crate) fn container_info(c: &ContainerInspectResponse) -> Option<ContainerInfo> {
    let id = c.id.clone()?;
    let name = c
        .name
        .as_deref()
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.clone());
    let state = c
        .state
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .map(|s| ContainerState::from_docker(&s.to_string()))
        .unwrap_or(ContainerState::Unknown);
    let health = c
        .state
        .as_ref()
        .and_then(|s| s.health.as_ref())
        .and_then(|h| h.status.as_ref())
        .map(|s| HealthStatus::from_docker(&s.to_string()));
    let image = c
        .config
        .as_ref()
        .and_then(|cfg| cfg.image.clone())
        .unwrap_or_default();
    Some(ContainerInfo {
        id,
        name,
        image,
        state,
        health,
    })
}

fn nanos_to_duration(ns: i64) -> Option<String> {
    (ns > 0).then(|| format!("{}s", ns / 1_000_000_000))
}

fn healthcheck(c: &ContainerInspectResponse) -> Option<HealthcheckSpec> {
    let hc = c.config.as_ref()?.healthcheck.as_ref()?;
    let test = hc.test.clone().unwrap_or_default();
    if test.is_empty() {
        return None;
    }
    Some(HealthcheckSpec {
        test,
        interval: hc.interval.and_then(nanos_to_duration),
        timeout: hc.timeout.and_then(nanos_to_duration),
        retries: hc.retries.and_then(|r| u32::try_from(r).ok()),
        disable: false,
    })
}

/// Published ports from the host config, sorted by container port.
/// An IPv6 wildcard binding that mirrors an IPv4 wildcard binding is dropped.
fn port_bindings(c: &ContainerInspectResponse) -> Vec<PortConfig> {
    let Some(bindings) = c.host_config.as_ref().and_then(|h| h.port_bindings.as_ref()) else {
        return Vec::new();
    };
    let mut keys: Vec<&String> = bindings.keys().collect();
    keys.sort();

    let mut out = Vec::new();
    for key in keys {
        let (target, protocol) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
        let list: &[PortBinding] = bindings
            .get(key)
            .and_then(|b| b.as_deref())
            .unwrap_or_default();
        let v4_ports: BTreeSet<&str> = list
            .iter()
            .filter(|b| b.host_ip.as_deref() == Some("0.0.0.0"))
            .filter_map(|b| b.host_port.as_deref())
            .collect();
        for binding in list {
            let host_ip = binding.host_ip.as_deref().filter(|ip| !ip.is_empty());
            let published = binding.host_port.as_deref().filter(|p| !p.is_empty());
            if host_ip == Some("::") && published.is_some_and(|p| v4_ports.contains(p)) {
                continue;
            }
            let mut port = PortConfig::target(target);
            port.protocol = protocol.to_string();
            port.published = published.map(str::to_string);
            port.host_ip = host_ip.map(str::to_string);
            out.push(port);
        }
        if list.is_empty() {
            let mut port = PortConfig::target(target);
            port.protocol = protocol.to_string();
            out.push(port);
        }
    }
    out
}

/// Service definition as observed on one of its containers. Exposed for unit tests.
pub(crate) fn service_from_container(name: &str, c: &ContainerInspectResponse) -> Service {
    let config = c.config.as_ref();
    let host = c.host_config.as_ref();

    let restart = host
        .and_then(|h| h.restart_policy.as_ref())
        .and_then(|p| p.name.as_ref())
        .map(|n| n.to_string())
        .filter(|n| !n.is_empty());
    let mem_limit = host
        .and_then(|h| h.memory)
        .filter(|m| *m > 0)
        .map(|m| m.to_string());
    let cpus = host
        .and_then(|h| h.nano_cpus)
        .filter(|n| *n > 0)
        .map(|n| n as f64 / NANOS_PER_CPU);
    let volumes = c
        .mounts
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|m| match (m.source.as_deref(), m.destination.as_deref()) {
            (Some(src), Some(dst)) if !src.is_empty() => Some(format!("{src}:{dst}")),
            _ => None,
        })
        .collect();

    Service {
        name: name.to_string(),
        image: config.and_then(|c| c.image.clone()).unwrap_or_default(),
        ports: port_bindings(c).iter().map(port_to_compose).collect(),
        environment: parse_env_list(config.and_then(|c| c.env.as_deref()).unwrap_or_default()),
        healthcheck: healthcheck(c),
        privileged: host.and_then(|h| h.privileged).unwrap_or(false),
        user: config
            .and_then(|c| c.user.clone())
            .filter(|u| !u.is_empty()),
        restart,
        mem_limit,
        cpus,
        network_mode: host.and_then(|h| h.network_mode.clone()),
        volumes,
        read_only: host.and_then(|h| h.readonly_rootfs).unwrap_or(false),
        cap_add: host.and_then(|h| h.cap_add.clone()).unwrap_or_default(),
        containers: Vec::new(),
    }
}

/// Group compose-managed containers into stacks (by project) and services (by service label).
/// Containers without a project label are ignored. Output is sorted by name.
pub(crate) fn group_stacks(containers: &[ContainerInspectResponse]) -> Vec<Stack> {
    let mut stacks: BTreeMap<&str, Stack> = BTreeMap::new();
    let mut networks: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    let mut volumes: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();

    for c in containers {
        let Some(project) = label(c, PROJECT_LABEL) else {
            continue;
        };
        let Some(info) = container_info(c) else {
            continue;
        };
        let service_name = label(c, SERVICE_LABEL).unwrap_or(info.name.as_str()).to_string();

        let stack = stacks.entry(project).or_insert_with(|| Stack {
            name: project.to_string(),
            labels: labels(c)
                .map(|l| {
                    l.iter()
                        .filter(|(k, _)| k.starts_with(PROJECT_LABEL))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            ..Default::default()
        });
        let idx = match stack.services.iter().position(|s| s.name == service_name) {
            Some(i) => i,
            None => {
                stack.services.push(service_from_container(&service_name, c));
                stack.services.len() - 1
            }
        };
        stack.services[idx].containers.push(info);

        if let Some(nets) = c.network_settings.as_ref().and_then(|n| n.networks.as_ref()) {
            networks.entry(project).or_default().extend(nets.keys().cloned());
        }
        if let Some(mounts) = c.mounts.as_ref() {
            volumes
                .entry(project)
                .or_default()
                .extend(mounts.iter().filter_map(|m| m.name.clone()));
        }
    }

    stacks
        .into_iter()
        .map(|(project, mut stack)| {
            stack.networks = networks.remove(project).unwrap_or_default().into_iter().collect();
            stack.volumes = volumes.remove(project).unwrap_or_default().into_iter().collect();
            stack.services.sort_by(|a, b| a.name.cmp(&b.name));
            stack
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PortSpec;
    use bollard::models::{
        ContainerConfig, ContainerState as DockerState, ContainerStateStatusEnum, Health,
        HealthConfig, HealthStatusEnum, HostConfig, RestartPolicy, RestartPolicyNameEnum,
    };

    fn compose_container(id: &str, project: &str, service: &str) -> ContainerInspectResponse {
        let mut labels = HashMap::new();
        labels.insert(PROJECT_LABEL.to_string(), project.to_string());
        labels.insert(SERVICE_LABEL.to_string(), service.to_string());
        ContainerInspectResponse {
            id: Some(id.to_string()),
            name: Some(format!("/{project}-{service}-1")),
            config: Some(ContainerConfig {
                image: Some("postgres:16".to_string()),
                env: Some(vec!["POSTGRES_PASSWORD=hunter2".to_string(), "PGDATA".to_string()]),
                labels: Some(labels),
                healthcheck: Some(HealthConfig {
                    test: Some(vec!["CMD".into(), "pg_isready".into()]),
                    interval: Some(30_000_000_000),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            state: Some(DockerState {
                status: Some(ContainerStateStatusEnum::RUNNING),
                health: Some(Health {
                    status: Some(HealthStatusEnum::UNHEALTHY),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            host_config: Some(HostConfig {
                memory: Some(512 * 1024 * 1024),
                nano_cpus: Some(1_500_000_000),
                restart_policy: Some(RestartPolicy {
                    name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                    ..Default::default()
                }),
                port_bindings: Some(HashMap::from([(
                    "5432/tcp".to_string(),
                    Some(vec![
                        PortBinding {
                            host_ip: Some("0.0.0.0".into()),
                            host_port: Some("5432".into()),
                        },
                        PortBinding {
                            host_ip: Some("::".into()),
                            host_port: Some("5432".into()),
                        },
                    ]),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn container_info_reads_state_and_health() {
        let info = container_info(&compose_container("abc", "shop", "db")).unwrap();
        assert_eq!(info.id, "abc");
        assert_eq!(info.name, "shop-db-1");
        assert_eq!(info.state, ContainerState::Running);
        assert_eq!(info.health, Some(HealthStatus::Unhealthy));
    }

    #[test]
    fn service_from_container_maps_host_config() {
        let svc = service_from_container("db", &compose_container("abc", "shop", "db"));
        assert_eq!(svc.image, "postgres:16");
        assert_eq!(svc.restart.as_deref(), Some("unless-stopped"));
        assert_eq!(svc.mem_limit.as_deref(), Some("536870912"));
        assert_eq!(svc.cpus, Some(1.5));
        assert_eq!(svc.environment.get("POSTGRES_PASSWORD").map(String::as_str), Some("hunter2"));
        assert_eq!(svc.environment.get("PGDATA").map(String::as_str), Some(""));
        assert_eq!(svc.ports, vec![PortSpec::from("0.0.0.0:5432:5432")]);
        let hc = svc.healthcheck.unwrap();
        assert_eq!(hc.interval.as_deref(), Some("30s"));
    }

    #[test]
    fn group_stacks_by_project_and_service() {
        let mut unmanaged = compose_container("zzz", "x", "y");
        unmanaged.config.as_mut().unwrap().labels = None;
        let containers = vec![
            compose_container("a1", "shop", "web"),
            compose_container("a2", "shop", "web"),
            compose_container("b1", "shop", "db"),
            compose_container("c1", "blog", "app"),
            unmanaged,
        ];
        let stacks = group_stacks(&containers);
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].name, "blog");
        let shop = &stacks[1];
        assert_eq!(shop.services.len(), 2);
        assert_eq!(shop.services[0].name, "db");
        assert_eq!(shop.services[1].name, "web");
        assert_eq!(shop.services[1].containers.len(), 2);
        assert_eq!(shop.labels.get(PROJECT_LABEL).map(String::as_str), Some("shop"));
    }
}
