// Compose port declaration models

use serde::{Deserialize, Deserializer, Serialize};

/// A port entry as written in a compose file: `8080`, `"8080:80/udp"` or the long object form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(u32),
    Short(String),
    Long(PortConfig),
}

impl From<&str> for PortSpec {
    fn from(s: &str) -> Self {
        PortSpec::Short(s.to_string())
    }
}

/// Canonical port record. Ports stay strings so ranges ("8000-8010") survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub target: String,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub published: Option<String>,
    #[serde(default, alias = "host_ip", skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "app_protocol", skip_serializing_if = "Option::is_none")]
    pub app_protocol: Option<String>,
}

pub const DEFAULT_PROTOCOL: &str = "tcp";

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

impl PortConfig {
    /// Port with only a container-side target, protocol tcp.
    pub fn target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            published: None,
            host_ip: None,
            protocol: default_protocol(),
            mode: None,
            name: None,
            app_protocol: None,
        }
    }
}

/// Two published ports bound to the same host address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConflict {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    pub published: String,
    pub ports: Vec<PortConfig>,
    /// Indices of the conflicting entries in the input slice.
    pub positions: Vec<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(d).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(d)?.map(String::from))
}
