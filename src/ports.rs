// Compose port normalization, serialization and conflict detection.
//
// Short-form grammar: [host_ip:][published:]target[/protocol], protocol defaults to tcp.
// IPv6 host addresses must be bracketed: [::1]:8080:80.

use crate::models::{DEFAULT_PROTOCOL, PortConfig, PortConflict, PortSpec};
use std::collections::BTreeMap;
use std::net::IpAddr;

const SUPPORTED_PROTOCOLS: [&str; 3] = ["tcp", "udp", "sctp"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("invalid target port '{0}'")]
    InvalidTarget(String),
    #[error("invalid published port '{0}'")]
    InvalidPublished(String),
    #[error("published range '{published}' and target range '{target}' differ in length")]
    RangeMismatch { published: String, target: String },
    #[error("unsupported protocol '{0}' (expected tcp, udp or sctp)")]
    UnsupportedProtocol(String),
    #[error("invalid host ip '{0}'")]
    InvalidHostIp(String),
}

/// Convert any compose port declaration into the canonical record.
/// Unparseable strings fall back to `{target: <input>, protocol: tcp}`.
pub fn normalize_port(spec: &PortSpec) -> PortConfig {
    match spec {
        PortSpec::Number(n) => PortConfig::target(n.to_string()),
        PortSpec::Short(s) => parse_short(s).unwrap_or_else(|| {
            tracing::debug!(
                port = %s,
                operation = "normalize_port",
                "unparseable port string, using fallback"
            );
            PortConfig::target(s.trim())
        }),
        PortSpec::Long(p) => {
            let mut p = p.clone();
            if p.protocol.is_empty() {
                p.protocol = DEFAULT_PROTOCOL.to_string();
            }
            p.published = p.published.filter(|s| !s.is_empty());
            p.host_ip = p.host_ip.filter(|s| !s.is_empty());
            p
        }
    }
}

pub fn normalize_ports(specs: &[PortSpec]) -> Vec<PortConfig> {
    specs.iter().map(normalize_port).collect()
}

fn parse_short(raw: &str) -> Option<PortConfig> {
    let s = raw.trim();
    let (addr, protocol) = match s.rsplit_once('/') {
        Some((_, "")) => return None,
        Some((addr, proto)) => (addr, proto.to_lowercase()),
        None => (s, DEFAULT_PROTOCOL.to_string()),
    };
    if addr.contains('/') {
        return None;
    }

    let (bracketed_ip, rest) = match addr.strip_prefix('[') {
        Some(stripped) => {
            let (ip, rest) = stripped.split_once(']')?;
            (Some(ip), rest.strip_prefix(':')?)
        }
        None => (None, addr),
    };

    let parts: Vec<&str> = rest.split(':').collect();
    let (host_ip, published, target) = match (bracketed_ip, parts.as_slice()) {
        (None, [target]) => (None, None, *target),
        (None, [published, target]) => (None, Some(*published), *target),
        (None, [host_ip, published, target]) => (Some(*host_ip), Some(*published), *target),
        (Some(host_ip), [published, target]) => (Some(host_ip), Some(*published), *target),
        _ => return None,
    };
    if target.is_empty() {
        return None;
    }

    Some(PortConfig {
        target: target.to_string(),
        published: published.filter(|p| !p.is_empty()).map(str::to_string),
        host_ip: host_ip.filter(|h| !h.is_empty()).map(str::to_string),
        protocol,
        mode: None,
        name: None,
        app_protocol: None,
    })
}

/// Canonical short form. `/tcp` is implied and omitted.
pub fn port_to_string(port: &PortConfig) -> String {
    let mut out = String::new();
    match (&port.host_ip, &port.published) {
        (Some(ip), published) => {
            if ip.contains(':') {
                out.push('[');
                out.push_str(ip);
                out.push(']');
            } else {
                out.push_str(ip);
            }
            out.push(':');
            if let Some(p) = published {
                out.push_str(p);
            }
            out.push(':');
        }
        (None, Some(p)) => {
            out.push_str(p);
            out.push(':');
        }
        (None, None) => {}
    }
    out.push_str(&port.target);
    if !port.protocol.is_empty() && !port.protocol.eq_ignore_ascii_case(DEFAULT_PROTOCOL) {
        out.push('/');
        out.push_str(&port.protocol);
    }
    out
}

/// Inverse of [`normalize_port`]: short form unless long-only fields are set.
pub fn port_to_compose(port: &PortConfig) -> PortSpec {
    if port.mode.is_some() || port.name.is_some() || port.app_protocol.is_some() {
        PortSpec::Long(port.clone())
    } else {
        PortSpec::Short(port_to_string(port))
    }
}

/// Parse "8080" or "8000-8010" into an inclusive range.
pub fn port_range(s: &str) -> Option<(u16, u16)> {
    let parse = |p: &str| p.trim().parse::<u16>().ok().filter(|n| *n > 0);
    match s.split_once('-') {
        Some((lo, hi)) => {
            let (lo, hi) = (parse(lo)?, parse(hi)?);
            (lo <= hi).then_some((lo, hi))
        }
        None => parse(s).map(|n| (n, n)),
    }
}

/// Validate a port record the way the edit form does.
pub fn check_port(port: &PortConfig) -> Result<(), PortError> {
    let target = port_range(&port.target)
        .ok_or_else(|| PortError::InvalidTarget(port.target.clone()))?;
    if let Some(published) = &port.published {
        let range = port_range(published)
            .ok_or_else(|| PortError::InvalidPublished(published.clone()))?;
        let is_range = |(lo, hi): (u16, u16)| lo != hi;
        if is_range(range) && is_range(target) && range.1 - range.0 != target.1 - target.0 {
            return Err(PortError::RangeMismatch {
                published: published.clone(),
                target: port.target.clone(),
            });
        }
    }
    if !SUPPORTED_PROTOCOLS.contains(&port.protocol.to_lowercase().as_str()) {
        return Err(PortError::UnsupportedProtocol(port.protocol.clone()));
    }
    if let Some(ip) = &port.host_ip
        && ip.parse::<IpAddr>().is_err()
    {
        return Err(PortError::InvalidHostIp(ip.clone()));
    }
    Ok(())
}

/// Groups of ports sharing the same `(host_ip, published)` pair, two or more per group.
/// Ports without a published side never conflict.
pub fn find_port_conflicts(ports: &[PortConfig]) -> Vec<PortConflict> {
    let mut groups: BTreeMap<(Option<&str>, &str), Vec<usize>> = BTreeMap::new();
    for (i, port) in ports.iter().enumerate() {
        if let Some(published) = &port.published {
            groups
                .entry((port.host_ip.as_deref(), published.as_str()))
                .or_default()
                .push(i);
        }
    }
    groups
        .into_iter()
        .filter(|(_, positions)| positions.len() >= 2)
        .map(|((host_ip, published), positions)| PortConflict {
            host_ip: host_ip.map(str::to_string),
            published: published.to_string(),
            ports: positions.iter().map(|&i| ports[i].clone()).collect(),
            positions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(s: &str) -> PortConfig {
        normalize_port(&PortSpec::from(s))
    }

    #[test]
    fn normalize_published_target_protocol() {
        let p = short("8080:80/udp");
        assert_eq!(p.published.as_deref(), Some("8080"));
        assert_eq!(p.target, "80");
        assert_eq!(p.protocol, "udp");
        assert_eq!(p.host_ip, None);
    }

    #[test]
    fn normalize_host_ip_published_target() {
        let p = short("127.0.0.1:53:53");
        assert_eq!(p.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(p.published.as_deref(), Some("53"));
        assert_eq!(p.target, "53");
        assert_eq!(p.protocol, "tcp");
    }

    #[test]
    fn normalize_bracketed_ipv6_host() {
        let p = short("[::1]:8080:80");
        assert_eq!(p.host_ip.as_deref(), Some("::1"));
        assert_eq!(p.published.as_deref(), Some("8080"));
        assert_eq!(port_to_string(&p), "[::1]:8080:80");
    }

    #[test]
    fn normalize_empty_published_is_ephemeral() {
        let p = short("127.0.0.1::80");
        assert_eq!(p.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(p.published, None);
        assert_eq!(port_to_string(&p), "127.0.0.1::80");
    }

    #[test]
    fn malformed_strings_fall_back_to_default_record() {
        for raw in ["1:2:3:4", "8080:", "80/", "", "[::1", "8080:80/udp/tcp"] {
            let p = short(raw);
            assert_eq!(p.target, raw.trim(), "input {raw:?}");
            assert_eq!(p.published, None);
            assert_eq!(p.protocol, "tcp");
        }
    }

    #[test]
    fn number_spec_is_target_only() {
        let p = normalize_port(&PortSpec::Number(3000));
        assert_eq!(p, PortConfig::target("3000"));
    }

    #[test]
    fn canonical_string_omits_tcp() {
        assert_eq!(port_to_string(&short("8080:80/tcp")), "8080:80");
        assert_eq!(port_to_string(&short("53/udp")), "53/udp");
    }

    #[test]
    fn check_port_rejects_bad_values() {
        assert!(check_port(&short("8080:80")).is_ok());
        assert!(check_port(&short("8000-8002:9000-9002")).is_ok());
        assert_eq!(
            check_port(&short("0:80")),
            Err(PortError::InvalidPublished("0".into()))
        );
        assert_eq!(
            check_port(&short("8080:70000")),
            Err(PortError::InvalidTarget("70000".into()))
        );
        assert!(matches!(
            check_port(&short("8000-8002:9000-9005")),
            Err(PortError::RangeMismatch { .. })
        ));
        assert_eq!(
            check_port(&short("80/icmp")),
            Err(PortError::UnsupportedProtocol("icmp".into()))
        );
        assert_eq!(
            check_port(&short("myhost:80:80")),
            Err(PortError::InvalidHostIp("myhost".into()))
        );
    }
}
