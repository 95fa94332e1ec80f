// Shared test helpers
#![allow(dead_code)]

use stackscope::models::*;
use std::collections::BTreeMap;

/// A service that passes every check.
pub fn hardened_service(name: &str) -> Service {
    Service {
        name: name.to_string(),
        image: "nginx:1.27".to_string(),
        ports: vec![PortSpec::from("127.0.0.1:8080:80")],
        environment: BTreeMap::from([("LOG_LEVEL".to_string(), "info".to_string())]),
        healthcheck: Some(HealthcheckSpec {
            test: vec!["CMD".into(), "curl".into(), "-f".into(), "http://localhost".into()],
            interval: Some("30s".into()),
            ..Default::default()
        }),
        user: Some("1000:1000".to_string()),
        restart: Some("unless-stopped".to_string()),
        mem_limit: Some("256m".to_string()),
        cpus: Some(0.5),
        read_only: true,
        containers: vec![ContainerInfo {
            id: format!("{name}-id"),
            name: format!("{name}-1"),
            image: "nginx:1.27".to_string(),
            state: ContainerState::Running,
            health: Some(HealthStatus::Healthy),
        }],
        ..Default::default()
    }
}

pub fn stack_with(services: Vec<Service>) -> Stack {
    Stack {
        name: "demo".to_string(),
        services,
        ..Default::default()
    }
}
