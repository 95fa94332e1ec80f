// Model serialization tests (JSON camelCase, compose input forms)

use stackscope::models::*;

#[test]
fn test_service_accepts_compose_input_forms() {
    let stack: Stack = serde_json::from_value(serde_json::json!({
        "name": "shop",
        "services": [{
            "name": "db",
            "image": "postgres:16",
            "environment": ["POSTGRES_DB=shop", "PGDATA"],
            "ports": [5432, "8080:80", { "target": 80, "published": 8081, "protocol": "udp" }],
            "mem_limit": "1g",
            "network_mode": "bridge"
        }]
    }))
    .unwrap();
    let db = &stack.services[0];
    assert_eq!(db.environment.get("POSTGRES_DB").map(String::as_str), Some("shop"));
    assert_eq!(db.environment.get("PGDATA").map(String::as_str), Some(""));
    assert_eq!(db.ports[0], PortSpec::Number(5432));
    assert_eq!(db.ports[1], PortSpec::from("8080:80"));
    match &db.ports[2] {
        PortSpec::Long(p) => {
            assert_eq!(p.target, "80");
            assert_eq!(p.published.as_deref(), Some("8081"));
            assert_eq!(p.protocol, "udp");
        }
        other => panic!("expected long form, got {other:?}"),
    }
    assert_eq!(db.mem_limit.as_deref(), Some("1g"));
    assert_eq!(db.network_mode.as_deref(), Some("bridge"));
}

#[test]
fn test_environment_map_form_stringifies_scalars() {
    let svc: Service = serde_json::from_value(serde_json::json!({
        "name": "app",
        "environment": { "WORKERS": 4, "RATIO": 0.5, "DEBUG": true, "EMPTY": null, "NAME": "x" }
    }))
    .unwrap();
    assert_eq!(svc.environment["WORKERS"], "4");
    assert_eq!(svc.environment["RATIO"], "0.5");
    assert_eq!(svc.environment["DEBUG"], "true");
    assert_eq!(svc.environment["EMPTY"], "");
    assert_eq!(svc.environment["NAME"], "x");
}

#[test]
fn test_port_config_serialization_camel_case() {
    let mut p = PortConfig::target("80");
    p.host_ip = Some("127.0.0.1".into());
    p.published = Some("8080".into());
    let json = serde_json::to_string(&p).unwrap();
    assert!(json.contains("\"hostIp\""));
    assert!(!json.contains("\"mode\""));
    let back: PortConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}

#[test]
fn test_port_config_protocol_defaults_to_tcp() {
    let p: PortConfig = serde_json::from_str(r#"{"target": 443}"#).unwrap();
    assert_eq!(p.target, "443");
    assert_eq!(p.protocol, "tcp");
}

#[test]
fn test_validation_issue_shape() {
    let issue = ValidationIssue::new(
        IssueType::Warning,
        IssueCategory::BestPractice,
        ImpactLevel::Low,
        "Unpinned image tag",
        "uses latest",
    )
    .with_fix("pin it")
    .with_docs("https://docs.docker.com/");
    let json: serde_json::Value = serde_json::to_value(&issue).unwrap();
    assert_eq!(json["type"], "warning");
    assert_eq!(json["category"], "best-practice");
    assert_eq!(json["impact"], "low");
    assert_eq!(json["fix"], "pin it");
    assert_eq!(json["learnMoreUrl"], "https://docs.docker.com/");
    assert!(json.get("service").is_none());
}

#[test]
fn test_impact_weights() {
    assert_eq!(ImpactLevel::Critical.weight(), 25);
    assert_eq!(ImpactLevel::High.weight(), 15);
    assert_eq!(ImpactLevel::Medium.weight(), 8);
    assert_eq!(ImpactLevel::Low.weight(), 3);
}

#[test]
fn test_container_state_from_docker_and_unknown_json() {
    assert_eq!(ContainerState::from_docker("Running"), ContainerState::Running);
    assert_eq!(ContainerState::from_docker("dead"), ContainerState::Dead);
    assert_eq!(ContainerState::from_docker("removing"), ContainerState::Unknown);
    let s: ContainerState = serde_json::from_str("\"removing\"").unwrap();
    assert_eq!(s, ContainerState::Unknown);
    assert_eq!(serde_json::to_string(&ContainerState::Exited).unwrap(), "\"exited\"");
}

#[test]
fn test_snapshot_find_by_name() {
    let report = |name: &str| StackReport {
        stack: Stack {
            name: name.into(),
            ..Default::default()
        },
        validation: ValidationResult {
            score: 100,
            issues: vec![],
            summary: ValidationSummary::default(),
            checked_at: 0,
        },
    };
    let snapshot = StackSnapshot {
        timestamp: 1,
        stacks: vec![report("a"), report("b")],
    };
    assert_eq!(snapshot.find("b").map(|r| r.stack.name.as_str()), Some("b"));
    assert!(snapshot.find("c").is_none());
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"checkedAt\""));
}

#[test]
fn test_parse_env_list_splits_on_first_equals() {
    let env = parse_env_list(["A=1", "URL=postgres://u:p@db/x?a=b", "BARE", ""]);
    assert_eq!(env.len(), 3);
    assert_eq!(env["A"], "1");
    assert_eq!(env["URL"], "postgres://u:p@db/x?a=b");
    assert_eq!(env["BARE"], "");
}

#[test]
fn test_summary_counts_each_impact() {
    let issue = |impact| {
        ValidationIssue::new(
            IssueType::Warning,
            IssueCategory::Security,
            impact,
            "t",
            "d",
        )
    };
    let issues = vec![
        issue(ImpactLevel::Critical),
        issue(ImpactLevel::High),
        issue(ImpactLevel::High),
        issue(ImpactLevel::Low),
    ];
    let summary = ValidationSummary::from_issues(&issues);
    assert_eq!(
        summary,
        ValidationSummary {
            critical: 1,
            high: 2,
            medium: 0,
            low: 1,
        }
    );
}
