// Independent stack checks. Each inspects the whole stack and returns its own issues.

use super::ValidationError;
use super::size::parse_size;
use crate::models::{
    HealthStatus, ImpactLevel, IssueCategory, IssueType, PortConfig, Service, Stack,
    ValidationIssue,
};
use crate::ports::{find_port_conflicts, normalize_port, port_range};
use std::collections::BTreeMap;

pub(super) type Check = fn(&Stack) -> Result<Vec<ValidationIssue>, ValidationError>;

pub(super) const CHECKS: &[(&str, Check)] = &[
    ("privileged", privileged),
    ("capabilities", dangerous_capabilities),
    ("docker_socket", docker_socket),
    ("sensitive_ports", sensitive_ports),
    ("env_secrets", env_secrets),
    ("host_network", host_network),
    ("root_user", root_user),
    ("healthcheck", missing_healthcheck),
    ("unhealthy", unhealthy_containers),
    ("stopped", stopped_containers),
    ("restart_policy", restart_policy),
    ("memory_limit", memory_limit),
    ("cpu_limit", cpu_limit),
    ("port_conflicts", port_conflicts),
    ("image_tag", image_tag_check),
];

const WILDCARD_IPV4: &str = "0.0.0.0";

const SENSITIVE_PORTS: &[(u16, &str)] = &[
    (22, "SSH"),
    (2375, "Docker API"),
    (2376, "Docker API (TLS)"),
    (3306, "MySQL"),
    (5432, "PostgreSQL"),
    (6379, "Redis"),
    (9200, "Elasticsearch"),
    (11211, "Memcached"),
    (27017, "MongoDB"),
];

const SECRET_MARKERS: &[&str] = &["PASSWORD", "PASSWD", "SECRET", "TOKEN", "API_KEY", "PRIVATE_KEY"];

const DANGEROUS_CAPS: &[&str] = &["ALL", "SYS_ADMIN", "SYS_PTRACE", "SYS_MODULE", "NET_ADMIN"];

const DOCKER_SOCKETS: &[&str] = &["/var/run/docker.sock", "/run/docker.sock"];

const DOCS_PRIVILEGES: &str =
    "https://docs.docker.com/engine/containers/run/#runtime-privilege-and-linux-capabilities";
const DOCS_HEALTHCHECK: &str = "https://docs.docker.com/reference/compose-file/services/#healthcheck";
const DOCS_RESTART: &str = "https://docs.docker.com/reference/compose-file/services/#restart";
const DOCS_RESOURCES: &str = "https://docs.docker.com/reference/compose-file/deploy/#resources";
const DOCS_SECRETS: &str = "https://docs.docker.com/compose/how-tos/use-secrets/";
const DOCS_PORTS: &str = "https://docs.docker.com/reference/compose-file/services/#ports";

fn per_service(
    stack: &Stack,
    f: impl Fn(&Service) -> Option<ValidationIssue>,
) -> Result<Vec<ValidationIssue>, ValidationError> {
    Ok(stack
        .services
        .iter()
        .filter_map(|s| f(s).map(|issue| issue.for_service(&s.name)))
        .collect())
}

fn privileged(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        s.privileged.then(|| {
            ValidationIssue::new(
                IssueType::Error,
                IssueCategory::Security,
                ImpactLevel::Critical,
                "Privileged container",
                format!(
                    "Service '{}' runs privileged and has full access to the host kernel and devices.",
                    s.name
                ),
            )
            .with_fix("Remove `privileged: true` and grant only the capabilities the service needs with `cap_add`.")
            .with_docs(DOCS_PRIVILEGES)
        })
    })
}

fn dangerous_capabilities(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        let caps: Vec<String> = s
            .cap_add
            .iter()
            .map(|c| {
                let c = c.trim().to_uppercase();
                c.strip_prefix("CAP_").map(str::to_string).unwrap_or(c)
            })
            .filter(|c| DANGEROUS_CAPS.contains(&c.as_str()))
            .collect();
        (!caps.is_empty()).then(|| {
            ValidationIssue::new(
                IssueType::Warning,
                IssueCategory::Security,
                ImpactLevel::High,
                "Dangerous capabilities added",
                format!("Service '{}' adds {}.", s.name, caps.join(", ")),
            )
            .with_fix("Drop broad capabilities and keep the minimal set required.")
            .with_docs(DOCS_PRIVILEGES)
        })
    })
}

fn docker_socket(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        let mounted = s.volumes.iter().any(|v| {
            let source = v.split(':').next().unwrap_or_default();
            DOCKER_SOCKETS.contains(&source)
        });
        mounted.then(|| {
            ValidationIssue::new(
                IssueType::Error,
                IssueCategory::Security,
                ImpactLevel::Critical,
                "Docker socket mounted",
                format!(
                    "Service '{}' mounts the Docker socket, which grants root-equivalent control of the host.",
                    s.name
                ),
            )
            .with_fix("Remove the socket mount or put a filtering socket proxy in front of it.")
        })
    })
}

fn binds_all_interfaces(port: &PortConfig) -> bool {
    matches!(port.host_ip.as_deref(), None | Some(WILDCARD_IPV4) | Some("::"))
}

fn sensitive_ports(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    let mut issues = Vec::new();
    for service in &stack.services {
        for port in service.ports.iter().map(normalize_port) {
            let Some(published) = &port.published else {
                continue;
            };
            if !binds_all_interfaces(&port) {
                continue;
            }
            let Some((lo, hi)) = port_range(&port.target) else {
                continue;
            };
            for (number, label) in SENSITIVE_PORTS.iter().filter(|(n, _)| (lo..=hi).contains(n)) {
                issues.push(
                    ValidationIssue::new(
                        IssueType::Error,
                        IssueCategory::Security,
                        ImpactLevel::High,
                        "Sensitive port exposed",
                        format!(
                            "Service '{}' publishes {label} port {number} on {published} for all interfaces.",
                            service.name
                        ),
                    )
                    .for_service(&service.name)
                    .with_fix(format!(
                        "Bind to localhost (127.0.0.1:{published}:{}) or remove the published port.",
                        port.target
                    ))
                    .with_docs(DOCS_PORTS),
                );
            }
        }
    }
    Ok(issues)
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_uppercase();
    !key.ends_with("_FILE") && SECRET_MARKERS.iter().any(|m| key.contains(m))
}

fn env_secrets(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        let keys: Vec<&str> = s
            .environment
            .iter()
            .filter(|(k, v)| is_secret_key(k) && !v.is_empty() && !v.starts_with("${"))
            .map(|(k, _)| k.as_str())
            .collect();
        (!keys.is_empty()).then(|| {
            ValidationIssue::new(
                IssueType::Warning,
                IssueCategory::Security,
                ImpactLevel::High,
                "Plaintext secrets in environment",
                format!(
                    "Service '{}' sets {} in plain text.",
                    s.name,
                    keys.join(", ")
                ),
            )
            .with_fix("Move the values to Docker secrets or reference them as *_FILE variables.")
            .with_docs(DOCS_SECRETS)
        })
    })
}

fn host_network(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        (s.network_mode.as_deref() == Some("host")).then(|| {
            ValidationIssue::new(
                IssueType::Warning,
                IssueCategory::Security,
                ImpactLevel::Medium,
                "Host network mode",
                format!(
                    "Service '{}' shares the host network stack and bypasses network isolation.",
                    s.name
                ),
            )
            .with_fix("Use a bridge network and publish only the ports that are needed.")
        })
    })
}

fn root_user(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        let user = s
            .user
            .as_deref()
            .map(|u| u.split(':').next().unwrap_or_default().trim())
            .unwrap_or_default();
        matches!(user, "" | "root" | "0").then(|| {
            ValidationIssue::new(
                IssueType::Info,
                IssueCategory::Security,
                ImpactLevel::Low,
                "Runs as root",
                format!("Service '{}' does not set a non-root user.", s.name),
            )
            .with_fix("Set `user:` to an unprivileged UID:GID.")
        })
    })
}

fn missing_healthcheck(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        let enabled = s.healthcheck.as_ref().is_some_and(|h| h.is_enabled());
        (!enabled).then(|| {
            ValidationIssue::new(
                IssueType::Warning,
                IssueCategory::Reliability,
                ImpactLevel::Medium,
                "Missing health check",
                format!(
                    "Service '{}' has no health check, so failures inside the container go unnoticed.",
                    s.name
                ),
            )
            .with_fix("Add a `healthcheck` with a test command that verifies the service responds.")
            .with_docs(DOCS_HEALTHCHECK)
        })
    })
}

fn unhealthy_containers(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    Ok(stack
        .containers()
        .filter(|(_, c)| c.health == Some(HealthStatus::Unhealthy))
        .map(|(s, c)| {
            ValidationIssue::new(
                IssueType::Error,
                IssueCategory::Reliability,
                ImpactLevel::High,
                "Unhealthy container",
                format!("Container '{}' is failing its health check.", c.name),
            )
            .for_service(&s.name)
            .with_fix("Inspect the container logs and the health check output.")
        })
        .collect())
}

fn stopped_containers(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    Ok(stack
        .containers()
        .filter(|(_, c)| c.state.is_stopped())
        .map(|(s, c)| {
            ValidationIssue::new(
                IssueType::Warning,
                IssueCategory::Reliability,
                ImpactLevel::Medium,
                "Stopped container",
                format!("Container '{}' is not running.", c.name),
            )
            .for_service(&s.name)
            .with_fix("Check the exit code and logs, then restart the service.")
        })
        .collect())
}

fn restart_policy(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        matches!(s.restart.as_deref(), None | Some("") | Some("no")).then(|| {
            ValidationIssue::new(
                IssueType::Info,
                IssueCategory::Reliability,
                ImpactLevel::Low,
                "No restart policy",
                format!(
                    "Service '{}' will not be restarted after a crash or reboot.",
                    s.name
                ),
            )
            .with_fix("Set `restart: unless-stopped` or `restart: on-failure`.")
            .with_docs(DOCS_RESTART)
        })
    })
}

fn memory_limit(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    let mut issues = Vec::new();
    for service in &stack.services {
        let bytes = match &service.mem_limit {
            Some(raw) => parse_size(raw)?,
            None => 0,
        };
        if bytes == 0 {
            issues.push(
                ValidationIssue::new(
                    IssueType::Warning,
                    IssueCategory::Performance,
                    ImpactLevel::Medium,
                    "No memory limit",
                    format!(
                        "Service '{}' can consume all host memory.",
                        service.name
                    ),
                )
                .for_service(&service.name)
                .with_fix("Set `mem_limit` or `deploy.resources.limits.memory`.")
                .with_docs(DOCS_RESOURCES),
            );
        }
    }
    Ok(issues)
}

fn cpu_limit(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    let mut issues = Vec::new();
    for service in &stack.services {
        let cpus = service.cpus.unwrap_or(0.0);
        if !cpus.is_finite() || cpus < 0.0 {
            return Err(ValidationError::InvalidCpus {
                service: service.name.clone(),
                value: cpus,
            });
        }
        if cpus == 0.0 {
            issues.push(
                ValidationIssue::new(
                    IssueType::Info,
                    IssueCategory::Performance,
                    ImpactLevel::Low,
                    "No CPU limit",
                    format!("Service '{}' can use every CPU on the host.", service.name),
                )
                .for_service(&service.name)
                .with_fix("Set `cpus` or `deploy.resources.limits.cpus`.")
                .with_docs(DOCS_RESOURCES),
            );
        }
    }
    Ok(issues)
}

fn port_conflicts(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    let mut by_protocol: BTreeMap<String, (Vec<&str>, Vec<PortConfig>)> = BTreeMap::new();
    for service in &stack.services {
        for port in &service.ports {
            let mut port = normalize_port(port);
            // Unset host ip and 0.0.0.0 are the same wildcard bind.
            if port.host_ip.as_deref() == Some(WILDCARD_IPV4) {
                port.host_ip = None;
            }
            let (owners, ports) = by_protocol.entry(port.protocol.clone()).or_default();
            owners.push(service.name.as_str());
            ports.push(port);
        }
    }

    let mut issues = Vec::new();
    for (protocol, (owners, ports)) in &by_protocol {
        for conflict in find_port_conflicts(ports) {
            let mut services: Vec<&str> = conflict.positions.iter().map(|&i| owners[i]).collect();
            services.dedup();
            let address = match &conflict.host_ip {
                Some(ip) => format!("{ip}:{}", conflict.published),
                None => conflict.published.clone(),
            };
            issues.push(
                ValidationIssue::new(
                    IssueType::Error,
                    IssueCategory::Configuration,
                    ImpactLevel::High,
                    "Port conflict",
                    format!(
                        "Host port {address}/{protocol} is published {} times ({}).",
                        conflict.positions.len(),
                        services.join(", ")
                    ),
                )
                .with_fix("Give each published port a unique host port or host address.")
                .with_docs(DOCS_PORTS),
            );
        }
    }
    Ok(issues)
}

/// Tag of an image reference, ignoring registry ports and digests.
fn image_tag(image: &str) -> Option<&str> {
    if image.contains('@') {
        return Some("digest");
    }
    let name = image.rsplit('/').next().unwrap_or(image);
    name.split_once(':').map(|(_, tag)| tag)
}

fn image_tag_check(stack: &Stack) -> Result<Vec<ValidationIssue>, ValidationError> {
    per_service(stack, |s| {
        if s.image.is_empty() {
            return None;
        }
        matches!(image_tag(&s.image), None | Some("latest")).then(|| {
            ValidationIssue::new(
                IssueType::Info,
                IssueCategory::BestPractice,
                ImpactLevel::Low,
                "Unpinned image tag",
                format!(
                    "Service '{}' uses '{}', which can change on every pull.",
                    s.name, s.image
                ),
            )
            .with_fix("Pin the image to a version tag or digest.")
        })
    })
}
