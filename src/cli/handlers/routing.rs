// src/cli/handlers/routing.rs

use anyhow::{Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::Ordering;

use crate::{
    cli::{dispatcher::Invocation, render::CommandOutput},
    core::{
        resolver::Resolvable,
        routing::{
            self, CoreNetworkRouteSource, RouteSources, Scope, TransitGatewayRouteSource,
            VpcRouteSource,
        },
    },
    models::ResourceKind,
    state::Session,
};

fn scope_label(scope: &Scope) -> String {
    match scope {
        Scope::Root => "all sources".to_string(),
        Scope::Resource { kind, id } => format!("{} {}", kind, id),
        Scope::RouteTable { id, .. } => format!("route table {}", id),
    }
}

/// `find_prefix <cidr|ip>`: routes overlapping the query, scoped to the current context.
pub fn find_prefix(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let cidr = match inv.args.as_slice() {
        [cidr] if cidr != "?" => cidr,
        _ => return Err(anyhow!("Usage: find_prefix <cidr|ip>")),
    };
    let scope = Scope::from_frames(session.navigator.frames())?;
    let routes = session
        .routing
        .find_by_prefix(cidr, &scope, &mut session.cache)?;
    Ok(CommandOutput::Routes {
        title: format!("Routes overlapping {} in {}", cidr, scope_label(&scope)),
        routes,
    })
}

/// `find_null_routes`: blackhole routes, scoped to the current context.
pub fn find_null_routes(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let scope = Scope::from_frames(session.navigator.frames())?;
    let routes = session.routing.find_null_routes(&scope, &mut session.cache)?;
    Ok(CommandOutput::Routes {
        title: format!("Blackhole routes in {}", scope_label(&scope)),
        routes,
    })
}

/// `show routes`: every route held by the current frame, no cache required.
pub fn show_routes(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let frames = session.navigator.frames();
    let local = routing::frame_routes(frames)?;
    let label = frames.last().map(|f| f.label().to_string()).unwrap_or_default();
    Ok(CommandOutput::Routes {
        title: format!("Routes of {}", label),
        routes: local.entries().to_vec(),
    })
}

/// `show blackhole-routes`
pub fn show_blackholes(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let frames = session.navigator.frames();
    let local = routing::frame_routes(frames)?;
    let label = frames.last().map(|f| f.label().to_string()).unwrap_or_default();
    Ok(CommandOutput::Routes {
        title: format!("Blackhole routes of {}", label),
        routes: local
            .find_null_routes(&Scope::Root)
            .into_iter()
            .cloned()
            .collect(),
    })
}

/// `show routing-cache`
pub fn show_summary(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    session.routing.sync_account(&session.cache);
    if !session.routing.is_built() {
        session.routing.restore(&mut session.cache);
    }
    match session.routing.current() {
        Some(built) if !built.is_empty() => Ok(CommandOutput::RoutingSummary(built.summary())),
        _ => Ok(CommandOutput::Message(
            "Routing cache is not built. Run 'create_routing_cache' first.".to_string(),
        )),
    }
}

/// `create_routing_cache`: fetches route data for every vpc, transit gateway
/// and core network, then rebuilds the routing cache from it.
pub fn create(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let (sources, warnings) = collect_sources(session)?;
    let ttl = session.ttl_seconds();
    let built = session
        .routing
        .build_and_persist(&sources, &mut session.cache, ttl);

    let mut message = format!(
        "Routing cache built: {} route(s) from {} vpc(s), {} transit gateway(s), {} core network(s).",
        built.len(),
        sources.vpcs.len(),
        sources.transit_gateways.len(),
        sources.core_networks.len()
    );
    for warning in &warnings {
        message.push_str(&format!("\n  Warning: {}", warning));
    }
    Ok(CommandOutput::Message(message))
}

/// Discovers every route-bearing resource and fetches its detail.
/// Per-kind and per-resource failures become warnings.
fn collect_sources(session: &mut Session) -> Result<(RouteSources, Vec<String>)> {
    let mut sources = RouteSources::default();
    let mut warnings = Vec::new();
    let mut any_listed = false;

    for kind in [
        ResourceKind::Vpc,
        ResourceKind::TransitGateway,
        ResourceKind::CoreNetwork,
    ] {
        let listing = match session.list_resources(kind, false) {
            Ok(listing) => listing,
            Err(e) => {
                warnings.push(format!("{}: {:#}", kind.listing_name(), e));
                continue;
            }
        };
        any_listed = true;
        warnings.extend(listing.warnings.iter().cloned());

        for item in listing.as_slice() {
            if session.cancellation_token().load(Ordering::SeqCst) {
                warnings.push(format!("{}: interrupted, remaining resources skipped", kind.listing_name()));
                break;
            }
            let Some(id) = item.id() else {
                continue;
            };
            let region = item.get("region").and_then(Value::as_str);
            match session.resource_detail(kind, id, region) {
                Ok(detail) => {
                    if let Err(e) = push_source(&mut sources, kind, &detail) {
                        log::warn!("Skipping malformed route data of {} '{}': {}", kind, id, e);
                        warnings.push(format!("{} '{}': {}", kind, id, e));
                    }
                }
                Err(e) => warnings.push(format!("{:#}", e)),
            }
        }
    }

    if !any_listed {
        return Err(anyhow!(
            "No route data could be collected: {}",
            warnings.join("; ")
        ));
    }
    Ok((sources, warnings))
}

fn push_source(sources: &mut RouteSources, kind: ResourceKind, detail: &Value) -> serde_json::Result<()> {
    match kind {
        ResourceKind::Vpc => sources.vpcs.push(VpcRouteSource::deserialize(detail)?),
        ResourceKind::TransitGateway => sources
            .transit_gateways
            .push(TransitGatewayRouteSource::deserialize(detail)?),
        ResourceKind::CoreNetwork => sources
            .core_networks
            .push(CoreNetworkRouteSource::deserialize(detail)?),
        _ => {}
    }
    Ok(())
}
