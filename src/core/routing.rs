// src/core/routing.rs

//! # Routing Cache & Context-Aware Query Engine
//!
//! Route data arrives in three unrelated shapes: VPC route tables, transit
//! gateway route tables and core-network segment tables. [`RoutingCache::build`]
//! normalises every row into a [`RouteEntry`] and indexes the collection by
//! network start address and by blackhole state.
//!
//! Queries take a [`Scope`] derived from the navigator's frames, so the same
//! `find_prefix` answers "everywhere" at root, "this VPC" inside a VPC and
//! "this table" inside a route table.
//!
//! [`RoutingEngine`] owns the current cache, replaces it whole on every build
//! and persists its sources through the [`CacheService`] so that a later
//! session can restore it without refetching.

use crate::constants::{ROUTING_CACHE_KEY, ROUTING_CACHE_NAMESPACE};
use crate::core::cache::CacheService;
use crate::dev_utils::BlockTimer;
use crate::models::{Context, ContextType};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("Routing cache is not built. Run 'create_routing_cache' first.")]
    CacheNotBuilt,
    #[error("'{input}' is not a valid CIDR or IP address.")]
    InvalidPrefix { input: String },
    #[error("Route queries are not available in the '{context}' context.")]
    UnscopedContext { context: ContextType },
    #[error("Route data for '{owner}' is malformed: {message}")]
    MalformedSource { owner: String, message: String },
}

type QueryResult<T> = Result<T, QueryError>;

// --- Normalised Entries ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "vpc")]
    Vpc,
    #[serde(rename = "tgw")]
    TransitGateway,
    #[serde(rename = "cloudwan")]
    CoreNetwork,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vpc => "vpc",
            Self::TransitGateway => "tgw",
            Self::CoreNetwork => "cloudwan",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteState {
    Active,
    Blackhole,
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Blackhole => "blackhole",
        })
    }
}

/// One route row, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    /// `None` when the destination is not a CIDR (prefix lists, for example).
    pub prefix: Option<IpNet>,
    pub destination: String,
    pub target: String,
    pub source_kind: SourceKind,
    /// Route table id; `"<segment>|<region>"` for core-network tables.
    pub source_id: String,
    /// The VPC, transit gateway or core network owning the table.
    pub owner_id: String,
    pub owner_name: Option<String>,
    pub state: RouteState,
    pub region: String,
    pub route_type: Option<String>,
}

fn classify_state(state: &str, target: &str) -> RouteState {
    let lowered = state.to_ascii_lowercase();
    if lowered.contains("blackhole") || lowered.contains("null") || target.trim().is_empty() {
        RouteState::Blackhole
    } else {
        RouteState::Active
    }
}

fn parse_destination(destination: &str) -> Option<IpNet> {
    let trimmed = destination.trim();
    if let Ok(net) = trimmed.parse::<IpNet>() {
        return Some(net.trunc());
    }
    let addr = trimmed.parse::<IpAddr>().ok()?;
    let len = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, len).ok()
}

/// Parses a query: a CIDR, or a bare address meaning a single host.
///
/// # Errors
/// Returns [`QueryError::InvalidPrefix`] when `input` is neither.
pub fn parse_query(input: &str) -> QueryResult<IpNet> {
    parse_destination(input).ok_or_else(|| QueryError::InvalidPrefix {
        input: input.trim().to_string(),
    })
}

// --- Source Shapes ---

/// One row of a VPC route table, as the provider reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpcRoute {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub state: String,
}

/// A VPC route table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpcRouteTable {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub routes: Vec<VpcRoute>,
}

/// A VPC detail document, reduced to what routing needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpcRouteSource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub route_tables: Vec<VpcRouteTable>,
}

/// A transit gateway route. Field names follow the provider's PascalCase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TgwRoute {
    #[serde(default)]
    pub destination_cidr_block: String,
    #[serde(default)]
    pub transit_gateway_attachment_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "Type")]
    pub route_type: Option<String>,
}

/// A transit gateway route table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TgwRouteTable {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub routes: Vec<TgwRoute>,
}

/// A transit gateway detail document, reduced to what routing needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitGatewayRouteSource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub route_tables: Vec<TgwRouteTable>,
}

/// One route of a core-network segment table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentRoute {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "type")]
    pub route_type: Option<String>,
}

/// A per-segment, per-edge table of a core network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentRouteTable {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub edge: Option<String>,
    #[serde(default)]
    pub routes: Vec<SegmentRoute>,
}

impl SegmentRouteTable {
    /// `segment`, falling back to `name`.
    pub fn segment_name(&self) -> &str {
        self.segment
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    /// `region`, falling back to `edge`.
    pub fn edge_region(&self) -> &str {
        self.region
            .as_deref()
            .or(self.edge.as_deref())
            .unwrap_or_default()
    }

    /// Explicit id, or `"<segment>|<region>"`.
    pub fn table_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}|{}", self.segment_name(), self.edge_region()))
    }
}

/// A core network detail document, reduced to its segment tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreNetworkRouteSource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub route_tables: Vec<SegmentRouteTable>,
}

/// Everything a routing cache is built from. This is also what gets persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSources {
    pub vpcs: Vec<VpcRouteSource>,
    pub transit_gateways: Vec<TransitGatewayRouteSource>,
    pub core_networks: Vec<CoreNetworkRouteSource>,
}

// --- Scope ---

/// Which part of the route collection a query sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Everything.
    Root,
    /// Entries owned by one VPC, transit gateway or core network.
    Resource { kind: SourceKind, id: String },
    /// Entries of exactly one route table, under the given owner when known.
    RouteTable { owner_id: Option<String>, id: String },
}

impl Scope {
    /// Derives the scope from the navigator's frames, outermost first.
    ///
    /// # Errors
    /// [`QueryError::UnscopedContext`] for contexts that hold no routes.
    pub fn from_frames(frames: &[Context]) -> QueryResult<Self> {
        let Some(current) = frames.last() else {
            return Ok(Self::Root);
        };
        let resource = |kind| Self::Resource {
            kind,
            id: current.reference.clone(),
        };
        match current.context_type {
            ContextType::Root => Ok(Self::Root),
            ContextType::Vpc => Ok(resource(SourceKind::Vpc)),
            ContextType::TransitGateway => Ok(resource(SourceKind::TransitGateway)),
            ContextType::CoreNetwork => Ok(resource(SourceKind::CoreNetwork)),
            ContextType::RouteTable => Ok(Self::RouteTable {
                owner_id: frames
                    .len()
                    .checked_sub(2)
                    .and_then(|i| frames.get(i))
                    .map(|parent| parent.reference.clone()),
                id: current.reference.clone(),
            }),
            context => Err(QueryError::UnscopedContext { context }),
        }
    }

    pub fn matches(&self, entry: &RouteEntry) -> bool {
        match self {
            Self::Root => true,
            Self::Resource { kind, id } => entry.source_kind == *kind && entry.owner_id == *id,
            Self::RouteTable { owner_id, id } => {
                entry.source_id == *id
                    && owner_id.as_ref().is_none_or(|owner| entry.owner_id == *owner)
            }
        }
    }
}

// --- The Cache ---

/// Address family tag plus first/last address as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Span {
    family: u8,
    start: u128,
    end: u128,
}

fn addr_value(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

fn span_of(net: &IpNet) -> Span {
    Span {
        family: if matches!(net, IpNet::V4(_)) { 4 } else { 6 },
        start: addr_value(net.network()),
        end: addr_value(net.broadcast()),
    }
}

/// Per-source totals for `show routing-cache`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub kind: SourceKind,
    /// Distinct VPCs, transit gateways or core networks.
    pub owners: usize,
    /// Distinct `(owner, table)` pairs.
    pub route_tables: usize,
    pub routes: usize,
    pub blackholes: usize,
    /// Sorted, without empty values.
    pub regions: Vec<String>,
}

/// An immutable, indexed collection of normalised routes.
#[derive(Debug, Clone, Default)]
pub struct RoutingCache {
    entries: Vec<RouteEntry>,
    /// `(span, entry index)`, sorted by span.
    by_start: Vec<(Span, usize)>,
    blackholes: Vec<usize>,
}

impl RoutingCache {
    /// Normalises and indexes the three source collections. Entries keep
    /// build order: VPC rows, then transit gateway rows, then core network rows.
    pub fn build(
        vpcs: &[VpcRouteSource],
        transit_gateways: &[TransitGatewayRouteSource],
        core_networks: &[CoreNetworkRouteSource],
    ) -> Self {
        let _timer = BlockTimer::new("RoutingCache::build");
        let mut entries = Vec::new();

        for vpc in vpcs {
            for table in &vpc.route_tables {
                for route in &table.routes {
                    entries.push(RouteEntry {
                        prefix: parse_destination(&route.destination),
                        destination: route.destination.clone(),
                        target: route.target.clone(),
                        source_kind: SourceKind::Vpc,
                        source_id: table.id.clone(),
                        owner_id: vpc.id.clone(),
                        owner_name: vpc.name.clone(),
                        state: classify_state(&route.state, &route.target),
                        region: vpc.region.clone(),
                        route_type: None,
                    });
                }
            }
        }

        for tgw in transit_gateways {
            for table in &tgw.route_tables {
                for route in &table.routes {
                    entries.push(RouteEntry {
                        prefix: parse_destination(&route.destination_cidr_block),
                        destination: route.destination_cidr_block.clone(),
                        target: route.transit_gateway_attachment_id.clone(),
                        source_kind: SourceKind::TransitGateway,
                        source_id: table.id.clone(),
                        owner_id: tgw.id.clone(),
                        owner_name: tgw.name.clone(),
                        state: classify_state(&route.state, &route.transit_gateway_attachment_id),
                        region: tgw.region.clone(),
                        route_type: route.route_type.clone(),
                    });
                }
            }
        }

        for core in core_networks {
            for table in &core.route_tables {
                let table_id = table.table_id();
                for route in &table.routes {
                    entries.push(RouteEntry {
                        prefix: parse_destination(&route.prefix),
                        destination: route.prefix.clone(),
                        target: route.target.clone(),
                        source_kind: SourceKind::CoreNetwork,
                        source_id: table_id.clone(),
                        owner_id: core.id.clone(),
                        owner_name: core.name.clone(),
                        state: classify_state(&route.state, &route.target),
                        region: table.edge_region().to_string(),
                        route_type: route.route_type.clone(),
                    });
                }
            }
        }

        let mut by_start: Vec<(Span, usize)> = entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.prefix.as_ref().map(|net| (span_of(net), i)))
            .collect();
        by_start.sort_unstable();

        let blackholes: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state == RouteState::Blackhole)
            .map(|(i, _)| i)
            .collect();

        log::debug!(
            "Routing cache built: {} routes ({} indexed, {} blackholes)",
            entries.len(),
            by_start.len(),
            blackholes.len()
        );

        Self {
            entries,
            by_start,
            blackholes,
        }
    }

    pub fn from_sources(sources: &RouteSources) -> Self {
        Self::build(&sources.vpcs, &sources.transit_gateways, &sources.core_networks)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Entries in scope whose prefix overlaps `query` (either contains the other).
    pub fn find_by_prefix(&self, query: &IpNet, scope: &Scope) -> Vec<&RouteEntry> {
        let q = span_of(query);
        let lower = self.by_start.partition_point(|(s, _)| s.family < q.family);
        let upper = self
            .by_start
            .partition_point(|(s, _)| s.family < q.family || (s.family == q.family && s.start <= q.end));

        let mut hits: Vec<usize> = self
            .by_start
            .get(lower..upper)
            .unwrap_or_default()
            .iter()
            .filter(|(s, _)| s.end >= q.start)
            .map(|(_, i)| *i)
            .collect();
        hits.sort_unstable();

        hits.into_iter()
            .filter_map(|i| self.entries.get(i))
            .filter(|e| scope.matches(e))
            .collect()
    }

    /// Blackhole entries in scope.
    pub fn find_null_routes(&self, scope: &Scope) -> Vec<&RouteEntry> {
        self.blackholes
            .iter()
            .filter_map(|&i| self.entries.get(i))
            .filter(|e| scope.matches(e))
            .collect()
    }

    pub fn summary(&self) -> Vec<SourceSummary> {
        [SourceKind::Vpc, SourceKind::TransitGateway, SourceKind::CoreNetwork]
            .into_iter()
            .map(|kind| {
                let rows: Vec<&RouteEntry> =
                    self.entries.iter().filter(|e| e.source_kind == kind).collect();
                let owners: BTreeSet<&str> = rows.iter().map(|e| e.owner_id.as_str()).collect();
                let tables: BTreeSet<(&str, &str)> = rows
                    .iter()
                    .map(|e| (e.owner_id.as_str(), e.source_id.as_str()))
                    .collect();
                let regions: BTreeSet<&str> = rows
                    .iter()
                    .map(|e| e.region.as_str())
                    .filter(|r| !r.is_empty())
                    .collect();
                SourceSummary {
                    kind,
                    owners: owners.len(),
                    route_tables: tables.len(),
                    routes: rows.len(),
                    blackholes: rows.iter().filter(|e| e.state == RouteState::Blackhole).count(),
                    regions: regions.into_iter().map(str::to_string).collect(),
                }
            })
            .collect()
    }
}

// --- Frame-local Routes ---

fn from_detail<T: serde::de::DeserializeOwned>(frame: &Context, detail: Value) -> QueryResult<T> {
    serde_json::from_value(detail).map_err(|e| QueryError::MalformedSource {
        owner: frame.reference.clone(),
        message: e.to_string(),
    })
}

/// Routes held directly in the current frame's detail document. Used by
/// `show routes` and `show blackhole-routes`, which work without a built cache.
///
/// # Errors
/// Fails at root and in route-less contexts, and when the detail document
/// does not have the expected route shape.
pub fn frame_routes(frames: &[Context]) -> QueryResult<RoutingCache> {
    let Some(current) = frames.last() else {
        return Err(QueryError::UnscopedContext {
            context: ContextType::Root,
        });
    };

    match current.context_type {
        ContextType::Vpc => {
            let source: VpcRouteSource = from_detail(current, current.detail.clone())?;
            Ok(RoutingCache::build(&[source], &[], &[]))
        }
        ContextType::TransitGateway => {
            let source: TransitGatewayRouteSource = from_detail(current, current.detail.clone())?;
            Ok(RoutingCache::build(&[], &[source], &[]))
        }
        ContextType::CoreNetwork => {
            let source: CoreNetworkRouteSource = from_detail(current, current.detail.clone())?;
            Ok(RoutingCache::build(&[], &[], &[source]))
        }
        ContextType::RouteTable => {
            let parent = frames
                .len()
                .checked_sub(2)
                .and_then(|i| frames.get(i))
                .ok_or(QueryError::UnscopedContext {
                    context: ContextType::RouteTable,
                })?;
            let region = parent
                .detail
                .get("region")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            match parent.context_type {
                ContextType::Vpc => {
                    let table: VpcRouteTable = from_detail(current, current.detail.clone())?;
                    let source = VpcRouteSource {
                        id: parent.reference.clone(),
                        name: parent.display_name.clone(),
                        region,
                        route_tables: vec![table],
                    };
                    Ok(RoutingCache::build(&[source], &[], &[]))
                }
                ContextType::TransitGateway => {
                    let table: TgwRouteTable = from_detail(current, current.detail.clone())?;
                    let source = TransitGatewayRouteSource {
                        id: parent.reference.clone(),
                        name: parent.display_name.clone(),
                        region,
                        route_tables: vec![table],
                    };
                    Ok(RoutingCache::build(&[], &[source], &[]))
                }
                ContextType::CoreNetwork => {
                    let table: SegmentRouteTable = from_detail(current, current.detail.clone())?;
                    let source = CoreNetworkRouteSource {
                        id: parent.reference.clone(),
                        name: parent.display_name.clone(),
                        route_tables: vec![table],
                    };
                    Ok(RoutingCache::build(&[], &[], &[source]))
                }
                context => Err(QueryError::UnscopedContext { context }),
            }
        }
        context => Err(QueryError::UnscopedContext { context }),
    }
}

// --- The Engine ---

/// Owns the session's routing cache. Rebuilds replace it whole.
#[derive(Debug, Default)]
pub struct RoutingEngine {
    cache: Option<RoutingCache>,
    /// Account the cache was built or restored for. `None` for unbound builds.
    account: Option<String>,
}

impl RoutingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&RoutingCache> {
        self.cache.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.cache.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn build(&mut self, sources: &RouteSources) -> &RoutingCache {
        self.account = None;
        self.cache.insert(RoutingCache::from_sources(sources))
    }

    /// Drops the in-memory cache when it belongs to another account than the
    /// cache service's current one. Persisted sources are left alone.
    pub fn sync_account(&mut self, cache: &CacheService) {
        let stale = self
            .account
            .as_deref()
            .is_some_and(|owner| owner != cache.account());
        if stale {
            log::debug!(
                "Account changed to '{}'. Dropping the in-memory routing cache.",
                cache.account()
            );
            self.cache = None;
            self.account = None;
        }
    }

    /// Builds, then writes the sources through the cache service.
    pub fn build_and_persist(
        &mut self,
        sources: &RouteSources,
        cache: &mut CacheService,
        ttl_seconds: u64,
    ) -> &RoutingCache {
        match serde_json::to_value(sources) {
            Ok(payload) => {
                cache.put(ROUTING_CACHE_NAMESPACE, ROUTING_CACHE_KEY, payload, ttl_seconds);
            }
            Err(e) => log::warn!("Routing sources could not be persisted: {}", e),
        }
        self.account = Some(cache.account().to_string());
        self.cache.insert(RoutingCache::from_sources(sources))
    }

    /// Rebuilds from persisted sources. Returns whether anything was restored.
    pub fn restore(&mut self, cache: &mut CacheService) -> bool {
        let Some(payload) = cache.get(ROUTING_CACHE_NAMESPACE, ROUTING_CACHE_KEY) else {
            return false;
        };
        match RouteSources::deserialize(payload.as_ref()) {
            Ok(sources) => {
                log::debug!("Restoring routing cache from persisted sources");
                self.account = Some(cache.account().to_string());
                self.cache = Some(RoutingCache::from_sources(&sources));
                true
            }
            Err(e) => {
                log::warn!("Discarding unreadable persisted routing sources: {}", e);
                cache.invalidate(ROUTING_CACHE_NAMESPACE, ROUTING_CACHE_KEY);
                false
            }
        }
    }

    /// Drops the in-memory cache and its persisted sources.
    pub fn clear(&mut self, cache: &mut CacheService) {
        self.cache = None;
        self.account = None;
        cache.invalidate_namespace(ROUTING_CACHE_NAMESPACE);
    }

    fn ready(&mut self, cache: &mut CacheService) -> QueryResult<&RoutingCache> {
        self.sync_account(cache);
        if self.cache.is_none() {
            self.restore(cache);
        }
        match &self.cache {
            Some(built) if !built.is_empty() => Ok(built),
            _ => Err(QueryError::CacheNotBuilt),
        }
    }

    /// Routes in `scope` overlapping `cidr`, restoring persisted sources first
    /// when nothing is built.
    ///
    /// # Errors
    /// [`QueryError::InvalidPrefix`] for an unparsable query,
    /// [`QueryError::CacheNotBuilt`] when there is nothing to search.
    pub fn find_by_prefix(
        &mut self,
        cidr: &str,
        scope: &Scope,
        cache: &mut CacheService,
    ) -> QueryResult<Vec<RouteEntry>> {
        let query = parse_query(cidr)?;
        let built = self.ready(cache)?;
        let hits: Vec<RouteEntry> = built
            .find_by_prefix(&query, scope)
            .into_iter()
            .cloned()
            .collect();
        log::debug!("find_prefix {} in {:?}: {} match(es)", query, scope, hits.len());
        Ok(hits)
    }

    /// Blackhole routes in `scope`.
    ///
    /// # Errors
    /// [`QueryError::CacheNotBuilt`] when there is nothing to search.
    pub fn find_null_routes(&mut self, scope: &Scope, cache: &mut CacheService) -> QueryResult<Vec<RouteEntry>> {
        let built = self.ready(cache)?;
        Ok(built.find_null_routes(scope).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{Clock, ManualClock};
    use serde_json::json;
    use std::sync::Arc;

    fn sources() -> RouteSources {
        serde_json::from_value(json!({
            "vpcs": [{
                "id": "vpc-1", "name": "prod", "region": "us-east-1",
                "route_tables": [
                    {"id": "rtb-a", "name": "main", "routes": [
                        {"destination": "10.0.0.0/16", "target": "local", "state": "active"},
                        {"destination": "0.0.0.0/0", "target": "igw-1", "state": "active"},
                        {"destination": "192.168.50.0/24", "target": "", "state": "blackhole"},
                        {"destination": "pl-12345", "target": "vpce-1", "state": "active"}
                    ]}
                ]
            }],
            "transit_gateways": [{
                "id": "tgw-1", "name": "core", "region": "us-east-1",
                "route_tables": [
                    {"id": "tgw-rtb-1", "routes": [
                        {"DestinationCidrBlock": "10.0.0.0/8", "TransitGatewayAttachmentId": "tgw-attach-1", "State": "active", "Type": "propagated"},
                        {"DestinationCidrBlock": "172.16.0.0/12", "TransitGatewayAttachmentId": "", "State": "blackhole", "Type": "static"}
                    ]}
                ]
            }],
            "core_networks": [{
                "id": "core-network-1", "name": "global",
                "route_tables": [
                    {"segment": "prod", "region": "us-east-1", "routes": [
                        {"prefix": "10.0.1.0/24", "target": "attachment-1", "state": "ACTIVE", "type": "PROPAGATED"}
                    ]},
                    {"name": "dev", "edge": "eu-west-1", "routes": [
                        {"prefix": "10.9.0.0/16", "target": "attachment-2", "state": "BLACKHOLE", "type": "STATIC"}
                    ]}
                ]
            }]
        }))
        .unwrap()
    }

    fn frame(context_type: ContextType, reference: &str, detail: Value) -> Context {
        Context {
            context_type,
            reference: reference.to_string(),
            display_name: None,
            detail,
            selection_index: 1,
        }
    }

    fn memory_cache() -> CacheService {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1_000));
        CacheService::new(None, clock, "acct")
    }

    #[test]
    fn test_build_normalises_all_three_sources_in_order() {
        let cache = RoutingCache::from_sources(&sources());
        let kinds: Vec<SourceKind> = cache.entries().iter().map(|e| e.source_kind).collect();
        assert_eq!(
            kinds,
            vec![
                SourceKind::Vpc,
                SourceKind::Vpc,
                SourceKind::Vpc,
                SourceKind::Vpc,
                SourceKind::TransitGateway,
                SourceKind::TransitGateway,
                SourceKind::CoreNetwork,
                SourceKind::CoreNetwork,
            ]
        );
        let wan = &cache.entries()[6];
        assert_eq!(wan.source_id, "prod|us-east-1");
        assert_eq!(cache.entries()[7].source_id, "dev|eu-west-1");
        assert_eq!(cache.entries()[7].region, "eu-west-1");
        assert_eq!(cache.entries()[4].route_type.as_deref(), Some("propagated"));
        // Prefix-list rows are kept but not indexed.
        assert_eq!(cache.entries()[3].prefix, None);
    }

    #[test]
    fn test_find_by_prefix_matches_overlap_in_both_directions() {
        let cache = RoutingCache::from_sources(&sources());
        let query: IpNet = "10.0.1.0/24".parse().unwrap();

        let hits = cache.find_by_prefix(&query, &Scope::Root);
        let destinations: Vec<&str> = hits.iter().map(|e| e.destination.as_str()).collect();

        // Containing routes (10.0.0.0/16, 0.0.0.0/0, 10.0.0.0/8) and the exact one.
        assert_eq!(
            destinations,
            vec!["10.0.0.0/16", "0.0.0.0/0", "10.0.0.0/8", "10.0.1.0/24"]
        );

        let wide: IpNet = "10.0.0.0/8".parse().unwrap();
        let contained = cache.find_by_prefix(&wide, &Scope::Root);
        assert!(contained.iter().any(|e| e.destination == "10.9.0.0/16"));
        assert!(!contained.iter().any(|e| e.destination == "172.16.0.0/12"));
    }

    #[test]
    fn test_scopes_filter_by_owner_and_table() {
        let cache = RoutingCache::from_sources(&sources());
        let query: IpNet = "10.0.1.0/24".parse().unwrap();

        let vpc_scope = Scope::Resource {
            kind: SourceKind::Vpc,
            id: "vpc-1".into(),
        };
        assert_eq!(cache.find_by_prefix(&query, &vpc_scope).len(), 2);

        let tgw_scope = Scope::Resource {
            kind: SourceKind::TransitGateway,
            id: "tgw-1".into(),
        };
        assert_eq!(cache.find_by_prefix(&query, &tgw_scope).len(), 1);

        let table_scope = Scope::RouteTable {
            owner_id: Some("core-network-1".into()),
            id: "prod|us-east-1".into(),
        };
        let hits = cache.find_by_prefix(&query, &table_scope);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, "attachment-1");
    }

    #[test]
    fn test_blackhole_detection_uses_state_and_empty_target() {
        let cache = RoutingCache::from_sources(&sources());
        let nulls: Vec<&str> = cache
            .find_null_routes(&Scope::Root)
            .iter()
            .map(|e| e.destination.as_str())
            .collect();
        assert_eq!(nulls, vec!["192.168.50.0/24", "172.16.0.0/12", "10.9.0.0/16"]);

        let scoped = cache.find_null_routes(&Scope::Resource {
            kind: SourceKind::CoreNetwork,
            id: "core-network-1".into(),
        });
        assert_eq!(scoped.len(), 1);
        assert_eq!(classify_state("active", " "), RouteState::Blackhole);
        assert_eq!(classify_state("Null0", "x"), RouteState::Blackhole);
        assert_eq!(classify_state("active", "igw-1"), RouteState::Active);
    }

    #[test]
    fn test_scope_from_frames() {
        assert_eq!(Scope::from_frames(&[]), Ok(Scope::Root));

        let frames = vec![
            frame(ContextType::TransitGateway, "tgw-1", Value::Null),
            frame(ContextType::RouteTable, "tgw-rtb-1", Value::Null),
        ];
        assert_eq!(
            Scope::from_frames(&frames),
            Ok(Scope::RouteTable {
                owner_id: Some("tgw-1".into()),
                id: "tgw-rtb-1".into()
            })
        );

        let elb = vec![frame(ContextType::Elb, "elb-1", Value::Null)];
        assert_eq!(
            Scope::from_frames(&elb),
            Err(QueryError::UnscopedContext {
                context: ContextType::Elb
            })
        );
    }

    #[test]
    fn test_parse_query_accepts_bare_addresses() {
        assert_eq!(parse_query("10.1.2.3").unwrap().to_string(), "10.1.2.3/32");
        assert_eq!(parse_query("2001:db8::1").unwrap().to_string(), "2001:db8::1/128");
        assert_eq!(parse_query(" 10.1.2.3/16 ").unwrap().to_string(), "10.1.0.0/16");
        assert!(matches!(parse_query("ten"), Err(QueryError::InvalidPrefix { .. })));
    }

    #[test]
    fn test_ipv6_queries_do_not_match_ipv4_routes() {
        let cache = RoutingCache::from_sources(&sources());
        let query: IpNet = "::/0".parse().unwrap();
        assert!(cache.find_by_prefix(&query, &Scope::Root).is_empty());
    }

    #[test]
    fn test_engine_reports_cache_not_built() {
        let mut engine = RoutingEngine::new();
        let mut cache = memory_cache();

        assert_eq!(
            engine.find_null_routes(&Scope::Root, &mut cache),
            Err(QueryError::CacheNotBuilt)
        );

        engine.build(&RouteSources::default());
        assert_eq!(
            engine.find_by_prefix("10.0.0.0/8", &Scope::Root, &mut cache),
            Err(QueryError::CacheNotBuilt)
        );
    }

    #[test]
    fn test_engine_distinguishes_empty_match_from_unbuilt() {
        let mut engine = RoutingEngine::new();
        let mut cache = memory_cache();
        engine.build(&sources());

        let hits = engine
            .find_by_prefix("203.0.113.0/24", &Scope::Resource {
                kind: SourceKind::Vpc,
                id: "vpc-1".into(),
            }, &mut cache)
            .unwrap();
        // Only the default route covers it.
        assert_eq!(hits.len(), 1);

        let none = engine
            .find_by_prefix("203.0.113.0/24", &Scope::Resource {
                kind: SourceKind::CoreNetwork,
                id: "core-network-1".into(),
            }, &mut cache)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_engine_restores_persisted_sources() {
        let mut cache = memory_cache();
        RoutingEngine::new().build_and_persist(&sources(), &mut cache, 600);

        let mut fresh = RoutingEngine::new();
        let nulls = fresh.find_null_routes(&Scope::Root, &mut cache).unwrap();

        assert_eq!(nulls.len(), 3);
        assert!(fresh.is_built());

        fresh.clear(&mut cache);
        assert_eq!(
            fresh.find_null_routes(&Scope::Root, &mut cache),
            Err(QueryError::CacheNotBuilt)
        );
    }

    #[test]
    fn test_engine_drops_routes_of_a_previous_account() {
        // --- Setup ---
        let mut cache = memory_cache();
        let mut engine = RoutingEngine::new();
        engine.build_and_persist(&sources(), &mut cache, 600);

        // --- Execute ---
        cache.set_account("someone-else");

        // --- Assert ---
        assert_eq!(
            engine.find_null_routes(&Scope::Root, &mut cache),
            Err(QueryError::CacheNotBuilt)
        );
        assert!(!engine.is_built());
    }

    #[test]
    fn test_frame_routes_for_route_table_under_vpc() {
        let vpc_detail = json!({"id": "vpc-1", "region": "eu-west-1"});
        let table = json!({"id": "rtb-a", "routes": [
            {"destination": "10.0.0.0/16", "target": "local", "state": "active"},
            {"destination": "10.5.0.0/16", "target": "", "state": "active"}
        ]});
        let frames = vec![
            frame(ContextType::Vpc, "vpc-1", vpc_detail),
            frame(ContextType::RouteTable, "rtb-a", table),
        ];

        let local = frame_routes(&frames).unwrap();

        assert_eq!(local.len(), 2);
        assert_eq!(local.entries()[0].region, "eu-west-1");
        assert_eq!(local.find_null_routes(&Scope::Root).len(), 1);
    }

    #[test]
    fn test_frame_routes_rejects_malformed_detail() {
        let frames = vec![frame(ContextType::Vpc, "vpc-1", json!({"route_tables": "nope"}))];
        assert!(matches!(
            frame_routes(&frames),
            Err(QueryError::MalformedSource { .. })
        ));
    }
}
