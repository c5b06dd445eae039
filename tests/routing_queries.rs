// tests/routing_queries.rs

mod common;

use common::{fail, run, session, session_with};
use netscope::{
    cli::render::CommandOutput,
    core::routing::{QueryError, RouteEntry, SourceKind},
    models::RuntimeSettings,
};
use tempfile::TempDir;

fn routes(output: CommandOutput) -> Vec<RouteEntry> {
    match output {
        CommandOutput::Routes { routes, .. } => routes,
        other => panic!("expected routes, got {:?}", other),
    }
}

fn destinations(routes: &[RouteEntry]) -> Vec<(&str, &str)> {
    routes
        .iter()
        .map(|r| (r.source_id.as_str(), r.destination.as_str()))
        .collect()
}

#[test]
fn test_queries_require_a_built_cache() {
    let mut s = session();
    let err = fail(&mut s, "find_prefix 10.0.0.0/8");
    assert_eq!(err.downcast_ref::<QueryError>(), Some(&QueryError::CacheNotBuilt));

    match run(&mut s, "show routing-cache") {
        CommandOutput::Message(m) => assert!(m.contains("not built")),
        other => panic!("expected a message, got {:?}", other),
    }
}

#[test]
fn test_create_then_find_prefix_at_root() {
    // --- Setup ---
    let mut s = session();

    // --- Execute ---
    let message = run(&mut s, "create_routing_cache");
    let hits = routes(run(&mut s, "find_prefix 10.0.1.0/24"));

    // --- Assert ---
    assert!(matches!(&message, CommandOutput::Message(m) if m.contains("12 route(s)")));
    assert_eq!(
        destinations(&hits),
        vec![
            ("rtb-a", "10.0.0.0/16"),
            ("rtb-a", "0.0.0.0/0"),
            ("rtb-b", "10.0.0.0/16"),
            ("rtb-b", "10.0.0.0/8"),
            ("tgw-rtb-1", "10.0.0.0/16"),
            ("prod|us-east-1", "10.0.1.0/24"),
        ]
    );
    assert_eq!(hits[5].source_kind, SourceKind::CoreNetwork);
    assert_eq!(hits[5].owner_id, "core-network-1");

    // A broader query matches the more specific routes it contains.
    let hits = routes(run(&mut s, "find_prefix 10.20.5.0/24"));
    assert_eq!(hits.len(), 4);
    assert!(hits.iter().any(|r| r.owner_id == "vpc-3"));
}

#[test]
fn test_find_prefix_is_scoped_by_context() {
    let mut s = session();
    run(&mut s, "create_routing_cache");

    run(&mut s, "set vpc 1");
    let in_vpc = routes(run(&mut s, "find_prefix 10.0.1.5"));
    assert_eq!(in_vpc.len(), 4);
    assert!(in_vpc.iter().all(|r| r.owner_id == "vpc-1"));

    run(&mut s, "set route-table private");
    let in_table = routes(run(&mut s, "find_prefix 10.0.1.5"));
    assert_eq!(
        destinations(&in_table),
        vec![("rtb-b", "10.0.0.0/16"), ("rtb-b", "10.0.0.0/8")]
    );

    run(&mut s, "end");
    run(&mut s, "set transit-gateway hub");
    run(&mut s, "set route-table shared");
    let in_tgw_table = routes(run(&mut s, "find_prefix 10.0.0.0/8"));
    assert_eq!(destinations(&in_tgw_table), vec![("tgw-rtb-1", "10.0.0.0/16")]);

    run(&mut s, "end");
    run(&mut s, "set global-network 1");
    run(&mut s, "set core-network corp-wan");
    let in_core = routes(run(&mut s, "find_prefix 10.20.0.0/16"));
    assert_eq!(destinations(&in_core), vec![("prod|us-east-1", "10.20.0.0/16")]);
}

#[test]
fn test_find_null_routes_per_scope() {
    let mut s = session();
    run(&mut s, "create_routing_cache");

    let everywhere = routes(run(&mut s, "find_null_routes"));
    assert_eq!(
        destinations(&everywhere),
        vec![
            ("rtb-a", "192.168.50.0/24"),
            ("tgw-rtb-1", "172.16.0.0/12"),
            ("dev|eu-west-1", "10.99.0.0/16"),
        ]
    );

    run(&mut s, "set vpc 1");
    assert_eq!(routes(run(&mut s, "find_null_routes")).len(), 1);

    run(&mut s, "end");
    run(&mut s, "set transit-gateway 1");
    let in_tgw = routes(run(&mut s, "find_null_routes"));
    assert_eq!(destinations(&in_tgw), vec![("tgw-rtb-1", "172.16.0.0/12")]);

    run(&mut s, "end");
    run(&mut s, "set global-network corp");
    run(&mut s, "set core-network 1");
    assert_eq!(routes(run(&mut s, "find_null_routes")).len(), 1);
}

#[test]
fn test_invalid_prefix_and_usage() {
    let mut s = session();
    run(&mut s, "create_routing_cache");

    let err = fail(&mut s, "find_prefix 10.0.0.300/8");
    assert!(matches!(
        err.downcast_ref::<QueryError>(),
        Some(QueryError::InvalidPrefix { .. })
    ));
    assert!(fail(&mut s, "find_prefix").to_string().contains("Usage"));
}

#[test]
fn test_routing_cache_persists_across_sessions_of_one_account() {
    // --- Setup ---
    let dir = TempDir::new().unwrap();
    let settings = RuntimeSettings {
        profile: Some("ops".to_string()),
        ..RuntimeSettings::default()
    };
    let mut first = session_with(Some(dir.path().to_path_buf()), settings.clone());
    run(&mut first, "create_routing_cache");
    drop(first);

    // --- Execute ---
    let mut second = session_with(Some(dir.path().to_path_buf()), settings);
    let hits = routes(run(&mut second, "find_prefix 10.0.1.0/24"));

    // --- Assert ---
    assert_eq!(hits.len(), 6);

    let other_account = RuntimeSettings {
        profile: Some("audit".to_string()),
        ..RuntimeSettings::default()
    };
    let mut third = session_with(Some(dir.path().to_path_buf()), other_account);
    let err = fail(&mut third, "find_prefix 10.0.1.0/24");
    assert_eq!(err.downcast_ref::<QueryError>(), Some(&QueryError::CacheNotBuilt));
}

#[test]
fn test_profile_switch_hides_routes_of_the_previous_account() {
    // --- Setup ---
    let mut s = session();
    run(&mut s, "create_routing_cache");
    assert_eq!(routes(run(&mut s, "find_null_routes")).len(), 3);

    // --- Execute ---
    run(&mut s, "set profile audit");

    // --- Assert ---
    let err = fail(&mut s, "find_null_routes");
    assert_eq!(err.downcast_ref::<QueryError>(), Some(&QueryError::CacheNotBuilt));
    assert!(matches!(
        run(&mut s, "show routing-cache"),
        CommandOutput::Message(m) if m.contains("not built")
    ));
}

#[test]
fn test_clear_cache_drops_the_routing_cache() {
    let mut s = session();
    run(&mut s, "create_routing_cache");
    assert!(s.routing.is_built());

    run(&mut s, "clear_cache");

    assert!(!s.routing.is_built());
    let err = fail(&mut s, "find_null_routes");
    assert_eq!(err.downcast_ref::<QueryError>(), Some(&QueryError::CacheNotBuilt));
}

#[test]
fn test_routing_cache_summary_counts_sources() {
    let mut s = session();
    run(&mut s, "create_routing_cache");

    match run(&mut s, "show routing-cache") {
        CommandOutput::RoutingSummary(rows) => {
            let by_kind = |kind: SourceKind| rows.iter().find(|r| r.kind == kind).unwrap();
            let vpc = by_kind(SourceKind::Vpc);
            assert_eq!((vpc.owners, vpc.route_tables, vpc.routes, vpc.blackholes), (3, 4, 7, 1));
            let tgw = by_kind(SourceKind::TransitGateway);
            assert_eq!((tgw.owners, tgw.routes, tgw.blackholes), (1, 2, 1));
            let core = by_kind(SourceKind::CoreNetwork);
            assert_eq!((core.route_tables, core.routes), (2, 3));
            assert_eq!(core.regions, vec!["eu-west-1", "us-east-1"]);
        }
        other => panic!("expected a summary, got {:?}", other),
    }
}

#[test]
fn test_show_routes_works_without_a_built_cache() {
    let mut s = session();
    run(&mut s, "set vpc 1");
    run(&mut s, "set route-table main");
    let local = routes(run(&mut s, "show routes"));
    assert_eq!(local.len(), 3);
    assert_eq!(local[0].owner_id, "vpc-1");

    run(&mut s, "end");
    run(&mut s, "set global-network 1");
    run(&mut s, "set core-network 1");
    let blackholes = routes(run(&mut s, "show blackhole-routes"));
    assert_eq!(destinations(&blackholes), vec![("dev|eu-west-1", "10.99.0.0/16")]);
    assert!(!s.routing.is_built());
}
