// src/system/provider.rs

//! The seam between the shell and wherever resource data comes from.
//!
//! [`InventoryProvider`] serves a JSON inventory document:
//!
//! ```json
//! {
//!   "regions": ["us-east-1", "eu-west-1"],
//!   "unavailable_regions": ["ap-south-1"],
//!   "slow_regions": [],
//!   "resources": {
//!     "vpc": [{"id": "vpc-1", "name": "prod", "region": "us-east-1", "route_tables": []}],
//!     "core-network": [{"id": "core-network-1", "global_network_id": "global-network-1"}]
//!   }
//! }
//! ```
//!
//! `discover` returns summaries (scalar fields only); `get_detail` returns the
//! full record.

use crate::models::ResourceKind;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider unavailable for region '{region}': {message}")]
    Unavailable { region: String, message: String },
    #[error("{kind} '{id}' not found.")]
    NotFound { kind: ResourceKind, id: String },
    #[error("Request to region '{region}' timed out.")]
    Timeout { region: String },
}

/// Source of resource data.
pub trait ResourceProvider: Send + Sync + fmt::Debug {
    /// Summaries of every `kind` resource in `regions`. Global kinds ignore `regions`.
    fn discover(&self, kind: ResourceKind, regions: &[String]) -> Result<Vec<Value>, ProviderError>;

    /// The full document of one resource.
    fn get_detail(&self, kind: ResourceKind, id: &str, region: Option<&str>) -> Result<Value, ProviderError>;

    /// Regions used when the user has not chosen any.
    fn default_regions(&self) -> Vec<String>;
}

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to read inventory '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Inventory '{path}' is not valid: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Inventory lists resources under unknown kind '{0}'.")]
    UnknownKind(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InventoryDocument {
    regions: Vec<String>,
    unavailable_regions: Vec<String>,
    slow_regions: Vec<String>,
    resources: HashMap<String, Vec<Value>>,
}

/// A provider backed by a static inventory document.
#[derive(Debug, Default)]
pub struct InventoryProvider {
    regions: Vec<String>,
    unavailable_regions: Vec<String>,
    slow_regions: Vec<String>,
    resources: HashMap<ResourceKind, Vec<Value>>,
}

impl InventoryProvider {
    pub fn from_path(path: &Path) -> Result<Self, InventoryError> {
        let content = fs::read_to_string(path).map_err(|e| InventoryError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json_str(&content).map_err(|e| match e {
            InventoryError::Parse { source, .. } => InventoryError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, InventoryError> {
        let document: InventoryDocument =
            serde_json::from_str(content).map_err(|e| InventoryError::Parse {
                path: "<inline>".to_string(),
                source: e,
            })?;

        let mut resources = HashMap::new();
        for (name, records) in document.resources {
            let kind = ResourceKind::from_set_name(&name)
                .ok_or_else(|| InventoryError::UnknownKind(name.clone()))?;
            resources.insert(kind, records);
        }

        log::debug!(
            "Inventory loaded: {} kind(s), {} region(s)",
            resources.len(),
            document.regions.len()
        );
        Ok(Self {
            regions: document.regions,
            unavailable_regions: document.unavailable_regions,
            slow_regions: document.slow_regions,
            resources,
        })
    }

    fn check_region(&self, region: &str) -> Result<(), ProviderError> {
        if self.unavailable_regions.iter().any(|r| r == region) {
            return Err(ProviderError::Unavailable {
                region: region.to_string(),
                message: "region is marked unavailable in the inventory".to_string(),
            });
        }
        if self.slow_regions.iter().any(|r| r == region) {
            return Err(ProviderError::Timeout {
                region: region.to_string(),
            });
        }
        Ok(())
    }

    fn records(&self, kind: ResourceKind) -> &[Value] {
        self.resources.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn region_of(record: &Value) -> Option<&str> {
    record.get("region").and_then(Value::as_str)
}

/// Keeps only scalar fields, which is what a listing call returns.
fn summarize(record: &Value) -> Value {
    match record {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(_, v)| !v.is_object() && !v.is_array())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

impl ResourceProvider for InventoryProvider {
    fn discover(&self, kind: ResourceKind, regions: &[String]) -> Result<Vec<Value>, ProviderError> {
        if !kind.is_regional() {
            return Ok(self.records(kind).iter().map(summarize).collect());
        }
        for region in regions {
            self.check_region(region)?;
        }
        let items: Vec<Value> = self
            .records(kind)
            .iter()
            .filter(|r| region_of(r).is_some_and(|reg| regions.iter().any(|q| q == reg)))
            .map(summarize)
            .collect();
        log::trace!("Inventory discover {} in {:?}: {} item(s)", kind, regions, items.len());
        Ok(items)
    }

    fn get_detail(&self, kind: ResourceKind, id: &str, region: Option<&str>) -> Result<Value, ProviderError> {
        if let Some(region) = region {
            self.check_region(region)?;
        }
        self.records(kind)
            .iter()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    fn default_regions(&self) -> Vec<String> {
        self.regions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = r#"{
        "regions": ["us-east-1", "eu-west-1"],
        "unavailable_regions": ["ap-south-1"],
        "slow_regions": ["sa-east-1"],
        "resources": {
            "vpc": [
                {"id": "vpc-1", "name": "prod", "region": "us-east-1", "route_tables": [{"id": "rtb-1"}]},
                {"id": "vpc-2", "name": "dr", "region": "eu-west-1"}
            ],
            "global-network": [{"id": "global-network-1", "name": "corp"}]
        }
    }"#;

    fn provider() -> InventoryProvider {
        InventoryProvider::from_json_str(INVENTORY).unwrap()
    }

    #[test]
    fn test_discover_filters_by_region_and_summarizes() {
        let items = provider()
            .discover(ResourceKind::Vpc, &["us-east-1".to_string()])
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "vpc-1");
        assert!(items[0].get("route_tables").is_none());
    }

    #[test]
    fn test_global_kinds_ignore_regions() {
        let items = provider().discover(ResourceKind::GlobalNetwork, &[]).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_get_detail_returns_full_record() {
        let detail = provider()
            .get_detail(ResourceKind::Vpc, "vpc-1", Some("us-east-1"))
            .unwrap();
        assert_eq!(detail["route_tables"][0]["id"], "rtb-1");
        assert_eq!(
            provider().get_detail(ResourceKind::Vpc, "vpc-9", None),
            Err(ProviderError::NotFound {
                kind: ResourceKind::Vpc,
                id: "vpc-9".to_string()
            })
        );
    }

    #[test]
    fn test_unavailable_and_slow_regions_fail() {
        let p = provider();
        assert!(matches!(
            p.discover(ResourceKind::Vpc, &["ap-south-1".to_string()]),
            Err(ProviderError::Unavailable { .. })
        ));
        assert!(matches!(
            p.discover(ResourceKind::Vpc, &["sa-east-1".to_string()]),
            Err(ProviderError::Timeout { .. })
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = InventoryProvider::from_json_str(r#"{"resources": {"subnet": []}}"#);
        assert!(matches!(result, Err(InventoryError::UnknownKind(k)) if k == "subnet"));
    }
}
