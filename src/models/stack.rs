// Stack and service view models

use super::container::ContainerInfo;
use super::port::PortSpec;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthcheckSpec {
    #[serde(default)]
    pub test: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default)]
    pub disable: bool,
}

impl HealthcheckSpec {
    /// A check is effective unless disabled or its test is `NONE`.
    pub fn is_enabled(&self) -> bool {
        !self.disable && self.test.first().map(String::as_str) != Some("NONE")
    }
}

/// One compose service, possibly backing several running containers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub ports: Vec<PortSpec>,
    #[serde(default, deserialize_with = "environment")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthcheckSpec>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    /// Compose size notation ("512m", "1g", plain bytes).
    #[serde(default, alias = "mem_limit", skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<f64>,
    #[serde(default, alias = "network_mode", skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default, alias = "read_only")]
    pub read_only: bool,
    #[serde(default, alias = "cap_add")]
    pub cap_add: Vec<String>,
    #[serde(default)]
    pub containers: Vec<ContainerInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub name: String,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Stack {
    pub fn containers(&self) -> impl Iterator<Item = (&Service, &ContainerInfo)> {
        self.services
            .iter()
            .flat_map(|s| s.containers.iter().map(move |c| (s, c)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl EnvValue {
    fn into_string(self) -> String {
        match self {
            EnvValue::String(s) => s,
            EnvValue::Int(n) => n.to_string(),
            EnvValue::Float(f) => f.to_string(),
            EnvValue::Bool(b) => b.to_string(),
        }
    }
}

/// Compose accepts `environment` as `["KEY=VALUE"]` or as a `{KEY: VALUE}` map.
#[derive(Deserialize)]
#[serde(untagged)]
enum EnvSpec {
    List(Vec<String>),
    Map(BTreeMap<String, Option<EnvValue>>),
}

/// Fold either compose environment form into a key/value map.
/// A bare `KEY` list entry or a null map value yields an empty string.
pub fn parse_env_list<I, S>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|e| {
            let e = e.as_ref();
            if e.is_empty() {
                return None;
            }
            Some(match e.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (e.to_string(), String::new()),
            })
        })
        .collect()
}

fn environment<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    Ok(match Option::<EnvSpec>::deserialize(d)? {
        None => BTreeMap::new(),
        Some(EnvSpec::List(list)) => parse_env_list(list),
        Some(EnvSpec::Map(map)) => map
            .into_iter()
            .map(|(k, v)| (k, v.map(EnvValue::into_string).unwrap_or_default()))
            .collect(),
    })
}
