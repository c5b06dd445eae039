// src/cli/handlers/commons.rs

// Shared lookups used by the `show` and `set` handlers.

use anyhow::{Result, anyhow};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    constants::ROUTE_TABLE_NAMESPACE,
    core::routing::SegmentRouteTable,
    models::{Context, ContextType, ResourceKind},
    state::{Listing, Session},
};

/// The frame the user is standing in. Fails at root.
pub fn current_frame(session: &Session) -> Result<&Context> {
    session
        .navigator
        .current_frame()
        .ok_or_else(|| anyhow!("No resource is selected. Use 'set <resource> <number|id|name>' first."))
}

/// The list a `show <name>` prints and a `set` resolves against.
pub fn listing(session: &mut Session, show_name: &str) -> Result<Listing> {
    if show_name == "route-tables" {
        return child_route_tables(session);
    }
    let kind = ResourceKind::from_listing_name(show_name)
        .ok_or_else(|| anyhow!("'{}' does not list resources.", show_name))?;
    let listing = session.list_resources(kind, false)?;

    // Core networks are listed under the global network that owns them.
    let owner = session
        .navigator
        .current_frame()
        .filter(|f| f.context_type == ContextType::GlobalNetwork)
        .map(|f| f.reference.clone());
    match (kind, owner) {
        (ResourceKind::CoreNetwork, Some(owner)) => {
            let items: Vec<Value> = listing
                .as_slice()
                .iter()
                .filter(|item| item.get("global_network_id").and_then(Value::as_str) == Some(owner.as_str()))
                .cloned()
                .collect();
            Ok(Listing {
                items: Arc::new(Value::Array(items)),
                ..listing
            })
        }
        _ => Ok(listing),
    }
}

/// Route tables of the current vpc, transit gateway or core network.
///
/// Tables live inside the parent's detail document, so there is no provider
/// call; the normalised list is still cached so `set route-table` sees the
/// same numbering as the last `show route-tables`.
fn child_route_tables(session: &mut Session) -> Result<Listing> {
    let frame = current_frame(session)?;
    let reference = frame.reference.clone();
    let tables: Vec<Value> = frame
        .detail
        .get("route_tables")
        .and_then(Value::as_array)
        .map(|tables| tables.iter().cloned().map(normalize_route_table).collect())
        .unwrap_or_default();

    if !session.settings.no_cache {
        if let Some(items) = session.cache.get(ROUTE_TABLE_NAMESPACE, &reference) {
            return Ok(Listing {
                items,
                warnings: Vec::new(),
                from_cache: true,
            });
        }
    }

    let ttl = session.ttl_seconds();
    let items = session
        .cache
        .put(ROUTE_TABLE_NAMESPACE, &reference, Value::Array(tables), ttl);
    Ok(Listing {
        items,
        warnings: Vec::new(),
        from_cache: false,
    })
}

/// Gives core-network segment tables the `id`, `name` and `region` fields
/// every other listing has.
pub fn normalize_route_table(table: Value) -> Value {
    let Value::Object(mut fields) = table else {
        return table;
    };
    if fields.contains_key("id") {
        return Value::Object(fields);
    }
    if let Ok(segment) = serde_json::from_value::<SegmentRouteTable>(Value::Object(fields.clone())) {
        fields.insert("id".to_string(), Value::String(segment.table_id()));
        if !fields.contains_key("name") && !segment.segment_name().is_empty() {
            fields.insert("name".to_string(), Value::String(segment.segment_name().to_string()));
        }
        if !fields.contains_key("region") && !segment.edge_region().is_empty() {
            fields.insert("region".to_string(), Value::String(segment.edge_region().to_string()));
        }
    }
    Value::Object(fields)
}

pub fn region_of(item: &Value) -> Option<&str> {
    item.get("region").and_then(Value::as_str)
}
